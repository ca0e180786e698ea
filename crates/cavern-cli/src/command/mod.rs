use clap::{Parser, Subcommand};
use tracing_subscriber::{filter::LevelFilter, prelude::*};

use self::{auto_play::AutoPlayArg, inspect::InspectArg, train::TrainArg};

mod auto_play;
mod inspect;
mod train;

#[derive(Debug, Clone, Parser)]
#[command(author, version, about, long_about = None)]
pub struct CommandArgs {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,
    /// Only log errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,
    #[command(subcommand)]
    mode: Mode,
}

#[derive(Debug, Clone, Subcommand)]
enum Mode {
    /// Record a guided flight and train a pilot network on it
    Train(#[clap(flatten)] TrainArg),
    /// Fly headless sessions on a trained pilot network
    #[command(name = "auto-play")]
    AutoPlay(#[clap(flatten)] AutoPlayArg),
    /// Show the architecture and training metadata of a model file
    Inspect(#[clap(flatten)] InspectArg),
}

impl CommandArgs {
    fn level(&self) -> LevelFilter {
        if self.quiet {
            return LevelFilter::ERROR;
        }
        match self.verbose {
            0 => LevelFilter::WARN,
            1 => LevelFilter::INFO,
            2 => LevelFilter::DEBUG,
            _ => LevelFilter::TRACE,
        }
    }
}

pub fn run() -> anyhow::Result<()> {
    let args = CommandArgs::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .with(args.level())
        .init();

    match &args.mode {
        Mode::Train(arg) => train::run(arg)?,
        Mode::AutoPlay(arg) => auto_play::run(arg)?,
        Mode::Inspect(arg) => inspect::run(arg)?,
    }
    Ok(())
}
