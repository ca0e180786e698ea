use cavern_engine::{Action, CavernSession, Observation, RandomWalk, SessionState, WalkSource};
use cavern_policy::{InvalidInputError, shared::SharedPolicy};

use crate::{
    config::PilotConfig,
    training_session::{ToggleError, ToggleOutcome, TrainingSession},
};

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, derive_more::IsVariant)]
pub enum ControlMode {
    #[default]
    Manual,
    Autopilot,
}

/// What a single tick did.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TickOutcome {
    pub state: SessionState,
    /// Observation taken after the cavern advanced.
    pub observation: Option<Observation>,
    /// Action attributed to this tick.
    pub action: Option<Action>,
}

/// Driver context for one flight.
///
/// Owns the session and the recording state machine, and holds the control
/// mode and the last manual action. A tick advances the cavern, samples the
/// player's surroundings, picks an action (the last manual action or the
/// policy's decision), applies it in autopilot mode and records the pair.
#[derive(Debug)]
pub struct Pilot<W = RandomWalk> {
    session: CavernSession<W>,
    training: TrainingSession,
    mode: ControlMode,
    last_action: Action,
}

impl<W> Pilot<W>
where
    W: WalkSource,
{
    #[must_use]
    pub fn new(session: CavernSession<W>, policy: SharedPolicy, config: PilotConfig) -> Self {
        Self {
            session,
            training: TrainingSession::new(policy, config),
            mode: ControlMode::Manual,
            last_action: Action::Stay,
        }
    }

    #[must_use]
    pub fn session(&self) -> &CavernSession<W> {
        &self.session
    }

    #[must_use]
    pub fn training(&self) -> &TrainingSession {
        &self.training
    }

    pub fn training_mut(&mut self) -> &mut TrainingSession {
        &mut self.training
    }

    #[must_use]
    pub fn policy(&self) -> &SharedPolicy {
        self.training.policy()
    }

    #[must_use]
    pub fn mode(&self) -> ControlMode {
        self.mode
    }

    pub fn set_mode(&mut self, mode: ControlMode) {
        if self.mode != mode {
            tracing::info!(?mode, "control mode changed");
        }
        self.mode = mode;
        self.last_action = Action::Stay;
    }

    #[must_use]
    pub fn sample(&self) -> Observation {
        self.session.sample()
    }

    pub fn decide(&self, observation: &Observation) -> Result<Action, InvalidInputError> {
        self.policy().decide(observation.as_ref())
    }

    /// Runs one tick.
    ///
    /// Does nothing once the session has crashed.
    pub fn tick(&mut self) -> Result<TickOutcome, InvalidInputError> {
        if self.session.state().is_crashed() {
            return Ok(self.idle_outcome());
        }
        if self.session.tick().is_crashed() {
            tracing::debug!(ticks = self.session.ticks(), "crashed");
            return Ok(self.idle_outcome());
        }

        let observation = self.session.sample();
        let action = match self.mode {
            ControlMode::Manual => std::mem::take(&mut self.last_action),
            ControlMode::Autopilot => {
                let action = self.decide(&observation)?;
                self.session.move_player(action.step());
                action
            }
        };
        self.training.record(observation, action);

        Ok(TickOutcome {
            state: self.session.state(),
            observation: Some(observation),
            action: Some(action),
        })
    }

    /// Applies a manual move of `step` rows and records it with the label
    /// `signum(step)`.
    pub fn move_player(&mut self, step: i32) -> SessionState {
        if self.session.state().is_crashed() {
            return SessionState::Crashed;
        }
        let observation = self.session.sample();
        let action = Action::from_step(step);
        self.last_action = action;
        self.training.record(observation, action);
        self.session.move_player(step)
    }

    pub fn toggle_recording(&mut self) -> Result<ToggleOutcome, ToggleError> {
        self.training.toggle()
    }

    pub fn set_recording(&mut self, recording: bool) -> Result<Option<ToggleOutcome>, ToggleError> {
        self.training.set_recording(recording)
    }

    /// Opens the cavern, recenters the player and zeroes the clock.
    ///
    /// Recording state and the sample buffer are kept.
    pub fn reset(&mut self) {
        self.session.reset();
        self.last_action = Action::Stay;
    }

    fn idle_outcome(&self) -> TickOutcome {
        TickOutcome {
            state: self.session.state(),
            observation: None,
            action: None,
        }
    }
}
