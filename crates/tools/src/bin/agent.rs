use std::io::{self, BufWriter};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use log::info;
use seeker::{Controller, LineOracle, RecordingOracle};
use seeker_tools::{StrategyArg, init_logging, load_config};

/// Plays the move/answer protocol on stdin and stdout.
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Optional TOML agent config
    #[arg(short, long)]
    config: Option<PathBuf>,
    #[arg(short, long, value_enum)]
    strategy: Option<StrategyArg>,
    /// Save the whole exchange as JSON for later replay
    #[arg(short, long)]
    transcript: Option<PathBuf>,
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging("info");
    let config = load_config(args.config.as_deref(), args.strategy)?;

    let stdin = io::stdin().lock();
    let stdout = BufWriter::new(io::stdout().lock());
    let mut lines = LineOracle::new(stdin, stdout);
    let setup = lines.read_setup().context("Failed to read protocol setup")?;

    let mut oracle = RecordingOracle::new(&mut lines, setup.variant, setup.goal);
    let report = Controller::new(&config, setup.variant, setup.goal, &mut oracle)
        .run()
        .context("Agent run failed")?;
    info!("answered {} after {} moves", report.outcome.answer(), report.moves);

    if let Some(path) = &args.transcript {
        oracle
            .transcript()
            .save(path)
            .with_context(|| format!("Failed to save transcript: {}", path.display()))?;
        info!("transcript saved to {}", path.display());
    }
    Ok(())
}
