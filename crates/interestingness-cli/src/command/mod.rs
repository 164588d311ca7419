use clap::{Parser, Subcommand};
use tracing_subscriber::filter::LevelFilter;

use self::{analyze::AnalyzeArg, inspect::InspectArg};

mod analyze;
mod inspect;

#[derive(Debug, Clone, Parser)]
#[command(author, version, about, long_about = None)]
pub struct CommandArgs {
    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    mode: Mode,
}

#[derive(Debug, Clone, Subcommand)]
enum Mode {
    /// Run analyses over a recorded rollout and write their reports
    Analyze(#[clap(flatten)] AnalyzeArg),
    /// Print the contents of a saved analysis archive
    Inspect(#[clap(flatten)] InspectArg),
}

pub fn run() -> anyhow::Result<()> {
    let args = CommandArgs::parse();

    let log_level = args.log_level.parse::<LevelFilter>().unwrap_or(LevelFilter::INFO);
    tracing_subscriber::fmt()
        .with_max_level(log_level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match args.mode {
        Mode::Analyze(arg) => analyze::run(&arg)?,
        Mode::Inspect(arg) => inspect::run(&arg)?,
    }
    Ok(())
}
