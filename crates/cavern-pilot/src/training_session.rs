use std::{
    mem,
    path::Path,
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    thread::{self, JoinHandle},
};

use cavern_engine::{Action, Observation};
use cavern_policy::{
    model::PolicyModel,
    shared::SharedPolicy,
    trainer::{self, TrainError, TrainingParams, TrainingReport, TrainingSet},
};
use chrono::Utc;

use crate::config::{PilotConfig, TrainingMode};

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, derive_more::IsVariant)]
pub enum RecordingState {
    #[default]
    Idle,
    Recording,
}

#[derive(Debug, Clone, PartialEq, derive_more::IsVariant)]
pub enum ToggleOutcome {
    StartedRecording,
    /// A background run was launched on `samples` recorded pairs.
    TrainingStarted { samples: usize },
    /// A blocking run completed and its weights are live.
    TrainingFinished(TrainingReport),
    /// Recording stopped with an empty buffer; the policy is unchanged.
    NoData,
}

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    derive_more::Display,
    derive_more::Error,
    derive_more::From,
    derive_more::IsVariant,
)]
pub enum ToggleError {
    #[display("training is still in progress")]
    TrainingInProgress,
    #[display("training failed: {_0}")]
    Train(TrainError),
}

#[derive(Debug)]
struct TrainingJob {
    handle: JoinHandle<Result<TrainingReport, TrainError>>,
    cancel: Arc<AtomicBool>,
    /// Pairs handed to the run, restored to the buffer if it fails.
    samples: Vec<(Observation, Action)>,
}

/// Recording state machine and owner of the sample buffer.
///
/// `Idle --toggle--> Recording --toggle--> Idle`, where the second toggle
/// trains the shared policy on the buffered pairs. Toggles are rejected while
/// a run started by an earlier toggle is still executing. A background run
/// that failed is reported by the next toggle as [`ToggleError::Train`], with
/// its pairs back in the buffer.
///
/// Dropping the session cancels a running job and waits for it to finish.
#[derive(Debug)]
pub struct TrainingSession {
    state: RecordingState,
    samples: Vec<(Observation, Action)>,
    policy: SharedPolicy,
    config: PilotConfig,
    job: Option<TrainingJob>,
    last_report: Option<TrainingReport>,
}

impl TrainingSession {
    #[must_use]
    pub fn new(policy: SharedPolicy, config: PilotConfig) -> Self {
        Self {
            state: RecordingState::Idle,
            samples: Vec::new(),
            policy,
            config,
            job: None,
            last_report: None,
        }
    }

    #[must_use]
    pub fn state(&self) -> RecordingState {
        self.state
    }

    #[must_use]
    pub fn is_recording(&self) -> bool {
        self.state.is_recording()
    }

    /// Whether a background run is still executing.
    #[must_use]
    pub fn is_training(&self) -> bool {
        self.job.as_ref().is_some_and(|job| !job.handle.is_finished())
    }

    #[must_use]
    pub fn samples(&self) -> &[(Observation, Action)] {
        &self.samples
    }

    #[must_use]
    pub fn policy(&self) -> &SharedPolicy {
        &self.policy
    }

    #[must_use]
    pub fn config(&self) -> &PilotConfig {
        &self.config
    }

    /// Report of the most recent completed run.
    #[must_use]
    pub fn last_report(&self) -> Option<&TrainingReport> {
        self.last_report.as_ref()
    }

    /// Appends a pair if recording. Returns whether it was kept.
    pub fn record(&mut self, observation: Observation, action: Action) -> bool {
        if self.state.is_recording() {
            self.samples.push((observation, action));
        }
        self.state.is_recording()
    }

    pub fn toggle(&mut self) -> Result<ToggleOutcome, ToggleError> {
        if let Some(Err(e)) = self.poll() {
            return Err(ToggleError::Train(e));
        }
        if self.is_training() {
            tracing::warn!("toggle rejected: training is still in progress");
            return Err(ToggleError::TrainingInProgress);
        }
        match self.state {
            RecordingState::Idle => {
                self.state = RecordingState::Recording;
                tracing::info!("recording started");
                Ok(ToggleOutcome::StartedRecording)
            }
            RecordingState::Recording => {
                self.state = RecordingState::Idle;
                self.start_training()
            }
        }
    }

    /// Toggles only if `recording` differs from the current state.
    pub fn set_recording(&mut self, recording: bool) -> Result<Option<ToggleOutcome>, ToggleError> {
        if recording == self.is_recording() {
            return Ok(None);
        }
        self.toggle().map(Some)
    }

    /// Collects a finished background run, if any.
    pub fn poll(&mut self) -> Option<Result<TrainingReport, TrainError>> {
        if self.job.as_ref().is_some_and(|job| job.handle.is_finished()) {
            return self.join();
        }
        None
    }

    /// Blocks until the running background run completes.
    pub fn wait(&mut self) -> Option<Result<TrainingReport, TrainError>> {
        self.join()
    }

    /// Asks the running background run to stop after its current epoch.
    pub fn cancel(&self) {
        if let Some(job) = &self.job {
            job.cancel.store(true, Ordering::Relaxed);
        }
    }

    fn join(&mut self) -> Option<Result<TrainingReport, TrainError>> {
        let job = self.job.take()?;
        let result = match job.handle.join() {
            Ok(result) => result,
            Err(payload) => std::panic::resume_unwind(payload),
        };
        match &result {
            Ok(report) => self.last_report = Some(report.clone()),
            Err(e) => {
                tracing::error!(error = %e, samples = job.samples.len(), "training failed");
                self.restore_samples(job.samples);
            }
        }
        Some(result)
    }

    fn start_training(&mut self) -> Result<ToggleOutcome, ToggleError> {
        if self.samples.is_empty() {
            tracing::warn!("no data collected");
            return Ok(ToggleOutcome::NoData);
        }

        let samples = mem::take(&mut self.samples);
        let set = TrainingSet::from_samples(&samples);
        let policy = self.policy.clone();
        let params = self.config.training.clone();
        let model_path = self.config.model_path.clone();
        let cancel = Arc::new(AtomicBool::new(false));

        match self.config.training_mode {
            TrainingMode::Blocking => {
                match run_training(&policy, &set, &params, model_path.as_deref(), &cancel) {
                    Ok(report) => {
                        self.last_report = Some(report.clone());
                        Ok(ToggleOutcome::TrainingFinished(report))
                    }
                    Err(e) => {
                        tracing::error!(error = %e, samples = samples.len(), "training failed");
                        self.restore_samples(samples);
                        Err(ToggleError::Train(e))
                    }
                }
            }
            TrainingMode::Background => {
                let thread_cancel = Arc::clone(&cancel);
                let handle = thread::spawn(move || {
                    run_training(&policy, &set, &params, model_path.as_deref(), &thread_cancel)
                });
                tracing::info!(samples = samples.len(), "training started in background");
                let count = samples.len();
                self.job = Some(TrainingJob {
                    handle,
                    cancel,
                    samples,
                });
                Ok(ToggleOutcome::TrainingStarted { samples: count })
            }
        }
    }

    /// Puts the pairs of a failed run back in front of the buffer.
    fn restore_samples(&mut self, mut samples: Vec<(Observation, Action)>) {
        samples.append(&mut self.samples);
        self.samples = samples;
    }
}

impl Drop for TrainingSession {
    fn drop(&mut self) {
        if let Some(job) = self.job.take() {
            job.cancel.store(true, Ordering::Relaxed);
            let _ = job.handle.join();
        }
    }
}

/// Trains a copy of the live network and swaps it in.
///
/// A run that completed no epoch leaves the live network untouched. Saving is
/// best effort: a failed write is logged and the run still succeeds.
fn run_training(
    policy: &SharedPolicy,
    set: &TrainingSet,
    params: &TrainingParams,
    model_path: Option<&Path>,
    cancel: &AtomicBool,
) -> Result<TrainingReport, TrainError> {
    let mut network = (*policy.snapshot()).clone();
    let report = trainer::train(&mut network, set, params, cancel)?;
    if report.epochs == 0 {
        return Ok(report);
    }

    let model = model_path.map(|_| {
        PolicyModel::from_network(&network).with_training(report.clone(), Utc::now())
    });
    policy.replace(network);

    if let (Some(path), Some(model)) = (model_path, model) {
        match model.save(path) {
            Ok(()) => tracing::info!(path = %path.display(), "model saved"),
            Err(e) => tracing::warn!(error = %e, "failed to save model"),
        }
    }
    Ok(report)
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use cavern_policy::{
        InvalidInputError,
        model::PolicyModel,
        network::{Activation, Architecture, PolicyNetwork},
        trainer::StopReason,
    };
    use rand::SeedableRng as _;
    use rand_pcg::Pcg32;
    use tempfile::TempDir;

    use super::*;

    fn policy() -> SharedPolicy {
        SharedPolicy::new(PolicyNetwork::cavern_pilot(&mut Pcg32::seed_from_u64(4)))
    }

    /// Live weights that read 7 features instead of an observation's 5.
    fn mismatched_policy() -> SharedPolicy {
        let architecture = Architecture {
            layer_sizes: vec![7, 4, 1],
            activations: vec![Activation::Tanh, Activation::Tanh],
        };
        let network = PolicyNetwork::random(&architecture, &mut Pcg32::seed_from_u64(4)).unwrap();
        SharedPolicy::new(network)
    }

    fn shape_error() -> ToggleError {
        ToggleError::Train(TrainError::Shape(InvalidInputError {
            expected: 7,
            actual: 5,
        }))
    }

    fn config(mode: TrainingMode, max_epochs: usize) -> PilotConfig {
        PilotConfig {
            training: TrainingParams {
                max_epochs,
                ..TrainingParams::default()
            },
            training_mode: mode,
            model_path: None,
        }
    }

    fn observation(room: f64) -> Observation {
        Observation::new([room, 1.0 - room, room, 1.0 - room, 0.5])
    }

    fn record_some(session: &mut TrainingSession, count: u32) {
        for i in 0..count {
            let room = f64::from(i) / f64::from(count);
            let action = if room > 0.5 { Action::Up } else { Action::Down };
            assert!(session.record(observation(room), action));
        }
    }

    #[test]
    fn test_idle_session_drops_samples() {
        let mut session = TrainingSession::new(policy(), PilotConfig::default());
        assert!(session.state().is_idle());
        assert!(!session.record(observation(0.5), Action::Up));
        assert!(session.samples().is_empty());
    }

    #[test]
    fn test_samples_are_kept_in_arrival_order() {
        let mut session = TrainingSession::new(policy(), PilotConfig::default());
        assert_eq!(session.toggle(), Ok(ToggleOutcome::StartedRecording));
        session.record(observation(0.1), Action::Down);
        session.record(observation(0.1), Action::Down);
        session.record(observation(0.9), Action::Up);
        let actions = session.samples().iter().map(|(_, a)| *a).collect::<Vec<_>>();
        assert_eq!(actions, [Action::Down, Action::Down, Action::Up]);
    }

    #[test]
    fn test_stop_with_empty_buffer_keeps_weights() {
        let policy = policy();
        let before = policy.snapshot();
        let mut session = TrainingSession::new(policy.clone(), config(TrainingMode::Blocking, 10));

        session.toggle().unwrap();
        assert_eq!(session.toggle(), Ok(ToggleOutcome::NoData));
        assert!(session.state().is_idle());
        assert!(Arc::ptr_eq(&before, &policy.snapshot()));
        assert!(session.last_report().is_none());
    }

    #[test]
    fn test_blocking_training_swaps_weights() {
        let policy = policy();
        let before = policy.snapshot();
        let mut session = TrainingSession::new(policy.clone(), config(TrainingMode::Blocking, 20));

        session.toggle().unwrap();
        record_some(&mut session, 10);
        let report = match session.toggle().unwrap() {
            ToggleOutcome::TrainingFinished(report) => report,
            outcome => panic!("unexpected outcome {outcome:?}"),
        };
        assert_eq!(report.samples, 10);
        assert_eq!(report.epochs, 20);
        assert!(session.samples().is_empty());
        assert_ne!(*before, *policy.snapshot());
        assert_eq!(session.last_report(), Some(&report));
    }

    #[test]
    fn test_background_training_rejects_toggles_until_done() {
        let policy = policy();
        let before = policy.snapshot();
        let mut config = config(TrainingMode::Background, usize::MAX);
        config.training.timeout = Some(Duration::from_secs(60));
        let mut session = TrainingSession::new(policy.clone(), config);

        session.toggle().unwrap();
        record_some(&mut session, 10);
        assert_eq!(
            session.toggle(),
            Ok(ToggleOutcome::TrainingStarted { samples: 10 })
        );
        assert!(session.samples().is_empty());
        assert!(session.is_training());
        assert_eq!(session.toggle(), Err(ToggleError::TrainingInProgress));
        assert_eq!(
            session.set_recording(true),
            Err(ToggleError::TrainingInProgress)
        );
        assert!(session.state().is_idle());

        session.cancel();
        let report = session.wait().unwrap().unwrap();
        assert!(report.stop_reason.is_cancelled());
        assert!(!session.is_training());
        if report.epochs > 0 {
            assert_ne!(*before, *policy.snapshot());
        }

        assert_eq!(session.toggle(), Ok(ToggleOutcome::StartedRecording));
    }

    #[test]
    fn test_background_training_completes() {
        let policy = policy();
        let mut session =
            TrainingSession::new(policy.clone(), config(TrainingMode::Background, 30));
        session.toggle().unwrap();
        record_some(&mut session, 8);
        session.toggle().unwrap();

        let report = session.wait().unwrap().unwrap();
        assert_eq!(report.epochs, 30);
        assert_eq!(report.stop_reason, StopReason::MaxEpochs);
        assert!(session.wait().is_none());
        assert!(session.poll().is_none());
    }

    #[test]
    fn test_set_recording_is_idempotent() {
        let mut session = TrainingSession::new(policy(), config(TrainingMode::Blocking, 1));
        assert_eq!(session.set_recording(false), Ok(None));
        assert_eq!(
            session.set_recording(true),
            Ok(Some(ToggleOutcome::StartedRecording))
        );
        assert_eq!(session.set_recording(true), Ok(None));
        assert_eq!(
            session.set_recording(false),
            Ok(Some(ToggleOutcome::NoData))
        );
    }

    #[test]
    fn test_training_auto_saves_model() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("pilot.json");
        let policy = policy();
        let mut config = config(TrainingMode::Blocking, 5);
        config.model_path = Some(path.clone());
        let mut session = TrainingSession::new(policy.clone(), config);

        session.toggle().unwrap();
        record_some(&mut session, 4);
        session.toggle().unwrap();

        let model = PolicyModel::open(&path).unwrap();
        assert!(model.trained_at.is_some());
        assert_eq!(model.training.as_ref().map(|r| r.epochs), Some(5));
        assert_eq!(model.to_network().unwrap(), *policy.snapshot());
    }

    #[test]
    fn test_failed_background_run_is_reported_by_next_toggle() {
        let policy = mismatched_policy();
        let before = policy.snapshot();
        let mut session =
            TrainingSession::new(policy.clone(), config(TrainingMode::Background, 10));

        session.toggle().unwrap();
        record_some(&mut session, 3);
        assert_eq!(
            session.toggle(),
            Ok(ToggleOutcome::TrainingStarted { samples: 3 })
        );
        while session.is_training() {
            thread::yield_now();
        }

        assert_eq!(session.toggle(), Err(shape_error()));
        assert_eq!(session.samples().len(), 3);
        assert!(session.state().is_idle());
        assert!(session.last_report().is_none());
        assert!(Arc::ptr_eq(&before, &policy.snapshot()));

        // reported once; the next toggle resumes recording on the kept pairs
        assert_eq!(session.toggle(), Ok(ToggleOutcome::StartedRecording));
        assert_eq!(session.samples().len(), 3);
    }

    #[test]
    fn test_failed_blocking_run_keeps_samples() {
        let policy = mismatched_policy();
        let mut session = TrainingSession::new(policy, config(TrainingMode::Blocking, 10));

        session.toggle().unwrap();
        record_some(&mut session, 2);
        assert_eq!(session.toggle(), Err(shape_error()));
        assert_eq!(session.samples().len(), 2);
        assert!(session.state().is_idle());
    }

    #[test]
    fn test_drop_waits_for_running_job() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("pilot.json");
        let policy = policy();
        let mut config = config(TrainingMode::Background, usize::MAX);
        config.training.timeout = Some(Duration::from_secs(60));
        config.model_path = Some(path.clone());
        let mut session = TrainingSession::new(policy.clone(), config);

        session.toggle().unwrap();
        record_some(&mut session, 10);
        session.toggle().unwrap();
        drop(session);

        // nothing touches the live weights or the model file afterwards
        let after = policy.snapshot();
        let saved = path.exists().then(|| PolicyModel::open(&path).unwrap());
        thread::sleep(Duration::from_millis(50));
        assert!(Arc::ptr_eq(&after, &policy.snapshot()));
        assert_eq!(path.exists().then(|| PolicyModel::open(&path).unwrap()), saved);
    }
}
