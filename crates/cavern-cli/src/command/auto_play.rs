use std::{path::PathBuf, thread, time::Duration};

use cavern_engine::{CavernSeed, CavernSession};
use cavern_pilot::{ControlMode, Pilot, PilotConfig};
use cavern_policy::shared::SharedPolicy;
use rand::Rng as _;
use serde::Serialize;

use crate::util::{self, Output};

#[derive(Debug, Clone, clap::Args)]
pub(crate) struct AutoPlayArg {
    /// Path to the model file (JSON format)
    model_path: PathBuf,
    /// Number of sessions to fly
    #[arg(long, default_value_t = 10)]
    sessions: u64,
    /// Ticks after which a session counts as survived
    #[arg(long, default_value_t = 10_000)]
    max_ticks: u64,
    /// Seed of the first session; session `k` uses `seed + k`
    #[arg(long)]
    seed: Option<u64>,
    /// Milliseconds to sleep after each tick (100 flies at the design cadence)
    #[arg(long, default_value_t = 0)]
    tick_ms: u64,
    /// Write a JSON summary to this file ("-" for stdout)
    #[arg(long)]
    output: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub(crate) struct SessionResult {
    /// Seed the session's cavern was carved from.
    pub seed: CavernSeed,
    pub ticks: u64,
    pub seconds: f64,
    pub crashed: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub(crate) struct SurvivalSummary {
    pub model: PathBuf,
    pub max_ticks: u64,
    pub min_ticks: u64,
    pub mean_ticks: f64,
    pub max_ticks_flown: u64,
    pub mean_seconds: f64,
    pub crash_rate: f64,
    pub sessions: Vec<SessionResult>,
}

impl SurvivalSummary {
    #[expect(clippy::cast_precision_loss)]
    pub(crate) fn new(model: PathBuf, max_ticks: u64, sessions: Vec<SessionResult>) -> Self {
        let count = sessions.len().max(1) as f64;
        let min_ticks = sessions.iter().map(|s| s.ticks).min().unwrap_or(0);
        let max_ticks_flown = sessions.iter().map(|s| s.ticks).max().unwrap_or(0);
        let mean_ticks = sessions.iter().map(|s| s.ticks as f64).sum::<f64>() / count;
        let mean_seconds = sessions.iter().map(|s| s.seconds).sum::<f64>() / count;
        let crash_rate = sessions.iter().filter(|s| s.crashed).count() as f64 / count;
        Self {
            model,
            max_ticks,
            min_ticks,
            mean_ticks,
            max_ticks_flown,
            mean_seconds,
            crash_rate,
            sessions,
        }
    }
}

pub(crate) fn run(arg: &AutoPlayArg) -> anyhow::Result<()> {
    let (_, network) = util::read_pilot_network(&arg.model_path)?;
    let policy = SharedPolicy::new(network);
    let first_seed = arg.seed.unwrap_or_else(|| rand::rng().random());

    let results = (0..arg.sessions)
        .map(|k| -> anyhow::Result<SessionResult> {
            let seed = CavernSeed::from_u128(u128::from(first_seed.wrapping_add(k)));
            let result = fly(&policy, seed, arg.max_ticks, arg.tick_ms)?;
            eprintln!(
                "Session #{k} ({}): {} ticks ({:.1}s){}",
                result.seed,
                result.ticks,
                result.seconds,
                if result.crashed { "" } else { ", survived" }
            );
            Ok(result)
        })
        .collect::<anyhow::Result<Vec<_>>>()?;

    let summary = SurvivalSummary::new(arg.model_path.clone(), arg.max_ticks, results);
    eprintln!("Survival Stats:");
    eprintln!("  Min:  {} ticks", summary.min_ticks);
    eprintln!("  Max:  {} ticks", summary.max_ticks_flown);
    eprintln!("  Mean: {:.1} ticks ({:.1}s)", summary.mean_ticks, summary.mean_seconds);
    eprintln!("  Crash rate: {:.1}%", summary.crash_rate * 100.0);

    if let Some(output) = &arg.output {
        let path = (output.as_os_str() != "-").then(|| output.clone());
        Output::save_json(&summary, path)?;
    }
    Ok(())
}

fn fly(
    policy: &SharedPolicy,
    seed: CavernSeed,
    max_ticks: u64,
    tick_ms: u64,
) -> anyhow::Result<SessionResult> {
    let session = CavernSession::with_seed(seed);
    let mut pilot = Pilot::new(session, policy.clone(), PilotConfig::default());
    pilot.set_mode(ControlMode::Autopilot);

    while pilot.session().ticks() < max_ticks {
        if pilot.tick()?.state.is_crashed() {
            break;
        }
        if tick_ms > 0 {
            thread::sleep(Duration::from_millis(tick_ms));
        }
    }

    let session = pilot.session();
    Ok(SessionResult {
        seed,
        ticks: session.ticks(),
        seconds: session.elapsed().as_secs_f64(),
        crashed: session.state().is_crashed(),
    })
}
