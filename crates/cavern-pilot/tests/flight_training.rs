//! End-to-end flights through the pilot driver: record, train while ticking,
//! reload the saved model and fly on it.

use cavern_engine::{Action, CavernSeed, CavernSession, HEIGHT, Observation};
use cavern_pilot::{ControlMode, Pilot, PilotConfig, ToggleOutcome, TrainingMode};
use cavern_policy::{network::PolicyNetwork, shared::SharedPolicy, trainer::TrainingParams};
use rand::SeedableRng as _;
use rand_pcg::Pcg32;
use tempfile::TempDir;

/// Climbs when more room is above than below.
fn steer(observation: &Observation) -> Action {
    if observation.immediate_top() > observation.immediate_bottom() + 1.0 / 20.0 {
        Action::Up
    } else if observation.immediate_bottom() > observation.immediate_top() + 1.0 / 20.0 {
        Action::Down
    } else {
        Action::Stay
    }
}

fn pilot(config: PilotConfig, seed: u64) -> Pilot {
    let policy = SharedPolicy::new(PolicyNetwork::cavern_pilot(&mut Pcg32::seed_from_u64(seed)));
    let session = CavernSession::with_seed(CavernSeed::from_u128(u128::from(seed)));
    Pilot::new(session, policy, config)
}

fn fly_recorded(pilot: &mut Pilot, ticks: usize) {
    for _ in 0..ticks {
        let action = steer(&pilot.sample());
        if action != Action::Stay {
            pilot.move_player(action.step());
        }
        if pilot.tick().unwrap().state.is_crashed() {
            pilot.reset();
        }
    }
}

#[test]
fn ticks_continue_while_training_in_background() {
    let dir = TempDir::new().unwrap();
    let model_path = dir.path().join("pilot.json");
    let config = PilotConfig {
        training: TrainingParams {
            max_epochs: 200,
            ..TrainingParams::default()
        },
        training_mode: TrainingMode::Background,
        model_path: Some(model_path.clone()),
    };
    let mut pilot = pilot(config, 12);

    pilot.toggle_recording().unwrap();
    fly_recorded(&mut pilot, 300);
    let recorded = pilot.training().samples().len();
    assert!(recorded > 0);

    let outcome = pilot.toggle_recording().unwrap();
    assert_eq!(outcome, ToggleOutcome::TrainingStarted { samples: recorded });

    // the tick loop keeps running while the run executes
    while pilot.training().is_training() {
        pilot.tick().unwrap();
        if pilot.session().state().is_crashed() {
            pilot.reset();
        }
        std::thread::yield_now();
    }
    let report = pilot.training_mut().wait().unwrap().unwrap();
    assert_eq!(report.epochs, 200);
    assert_eq!(report.samples, recorded);
    assert!(pilot.training().samples().is_empty());

    // the saved model is the live one
    let saved = PolicyNetwork::load(&model_path).unwrap();
    assert_eq!(saved, *pilot.policy().snapshot());
}

#[test]
fn reloaded_model_flies_like_the_trained_one() {
    let dir = TempDir::new().unwrap();
    let model_path = dir.path().join("pilot.json");
    let config = PilotConfig {
        training: TrainingParams {
            max_epochs: 100,
            ..TrainingParams::default()
        },
        training_mode: TrainingMode::Blocking,
        model_path: Some(model_path.clone()),
    };
    let mut trained = pilot(config, 3);
    trained.toggle_recording().unwrap();
    fly_recorded(&mut trained, 200);
    assert!(trained.toggle_recording().unwrap().is_training_finished());

    let mut reloaded = pilot(PilotConfig::default(), 3);
    reloaded.policy().load(&model_path).unwrap();

    reloaded.set_mode(ControlMode::Autopilot);
    // same seed, same weights: the flights must match tick for tick
    let mut twin = pilot(PilotConfig::default(), 3);
    twin.policy().replace((*trained.policy().snapshot()).clone());
    twin.set_mode(ControlMode::Autopilot);
    for _ in 0..500 {
        let a = twin.tick().unwrap();
        let b = reloaded.tick().unwrap();
        assert_eq!(a, b);
        assert!(twin.session().player().row() < HEIGHT);
        if a.state.is_crashed() {
            break;
        }
    }
}
