use std::{path::PathBuf, thread, time::Duration};

use anyhow::Context;
use cavern_engine::{CavernSeed, CavernSession};
use cavern_pilot::{Pilot, PilotConfig, ToggleOutcome, TrainingMode};
use cavern_policy::{network::PolicyNetwork, shared::SharedPolicy, trainer::TrainingParams};
use rand::{Rng as _, SeedableRng as _};
use rand_pcg::Pcg32;

use crate::{guide::GuidePilot, util};

#[derive(Debug, Clone, clap::Args)]
pub(crate) struct TrainArg {
    /// Model file to write
    #[arg(long, short, default_value = "./data/models/cavern.json")]
    output: PathBuf,
    /// Number of recorded ticks
    #[arg(long, default_value_t = 2000)]
    ticks: u64,
    /// Seed for the cavern and the initial weights (random if omitted)
    #[arg(long)]
    seed: Option<u64>,
    /// Probability that the guide takes a random action
    #[arg(long, default_value_t = 0.05)]
    noise: f64,
    /// Milliseconds to sleep after each tick (100 flies at the design cadence)
    #[arg(long, default_value_t = 0)]
    tick_ms: u64,
    #[arg(long, default_value_t = 0.001)]
    learning_rate: f64,
    #[arg(long, default_value_t = 0.95)]
    momentum: f64,
    #[arg(long, default_value_t = 0.010)]
    l2: f64,
    #[arg(long, default_value_t = 10_000)]
    max_epochs: usize,
    /// Stop once the training error reaches this value
    #[arg(long)]
    target_error: Option<f64>,
    /// Stop training after this many seconds, keeping the weights so far
    #[arg(long)]
    timeout_secs: Option<u64>,
    /// Train inside the toggle instead of on a background thread
    #[arg(long)]
    blocking: bool,
}

impl TrainArg {
    fn pilot_config(&self) -> PilotConfig {
        PilotConfig {
            training: TrainingParams {
                learning_rate: self.learning_rate,
                momentum: self.momentum,
                l2: self.l2,
                max_epochs: self.max_epochs,
                target_error: self.target_error,
                timeout: self.timeout_secs.map(Duration::from_secs),
                ..TrainingParams::default()
            },
            training_mode: if self.blocking {
                TrainingMode::Blocking
            } else {
                TrainingMode::Background
            },
            model_path: Some(self.output.clone()),
        }
    }
}

pub(crate) fn run(arg: &TrainArg) -> anyhow::Result<()> {
    let seed = arg.seed.unwrap_or_else(|| rand::rng().random());
    let mut rng = Pcg32::seed_from_u64(seed);
    let guide = GuidePilot::new(arg.noise)?;

    if let Some(dir) = arg.output.parent().filter(|dir| !dir.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create output directory: {}", dir.display()))?;
    }

    let policy = SharedPolicy::new(PolicyNetwork::cavern_pilot(&mut rng));
    let session = CavernSession::with_seed(CavernSeed::from_u128(u128::from(seed)));
    let mut pilot = Pilot::new(session, policy, arg.pilot_config());

    eprintln!("Recording {} ticks (seed {seed})...", arg.ticks);
    pilot.toggle_recording()?;

    let mut crashes = 0_u32;
    for _ in 0..arg.ticks {
        let action = guide.choose(pilot.session(), &mut rng);
        if action.step() != 0 {
            pilot.move_player(action.step());
        }
        if pilot.tick()?.state.is_crashed() {
            crashes += 1;
            tracing::debug!(crashes, "guide crashed, restarting flight");
            pilot.reset();
        }
        if arg.tick_ms > 0 {
            thread::sleep(Duration::from_millis(arg.tick_ms));
        }
    }

    let samples = pilot.training().samples().len();
    eprintln!("  Samples: {samples}");
    eprintln!("  Crashes: {crashes}");

    let report = match pilot.toggle_recording()? {
        ToggleOutcome::TrainingFinished(report) => report,
        ToggleOutcome::TrainingStarted { .. } => {
            eprintln!("Training on {samples} samples...");
            pilot
                .training_mut()
                .wait()
                .context("Training run disappeared")??
        }
        ToggleOutcome::NoData => anyhow::bail!("No data collected"),
        ToggleOutcome::StartedRecording => anyhow::bail!("Recording was not active"),
    };

    eprintln!("Training completed ({})", report.stop_reason);
    eprintln!("  Epochs: {}", report.epochs);
    eprintln!("  Final error: {:.6}", report.final_error);
    eprintln!("  Elapsed: {:.2?}", report.elapsed);

    if report.epochs == 0 {
        anyhow::bail!("Training stopped before the first epoch; no model written");
    }
    let (model, _) = util::read_pilot_network(&arg.output)?;
    eprintln!();
    eprintln!("Model saved successfully");
    eprintln!("  Path: {}", arg.output.display());
    if let Some(trained_at) = model.trained_at {
        eprintln!("  Trained at: {trained_at}");
    }
    Ok(())
}
