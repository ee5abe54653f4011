use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use seeker::{Controller, ReplayOracle, Transcript};
use seeker_tools::{StrategyArg, init_logging, load_config};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the transcript JSON file to replay
    #[arg(short, long)]
    transcript: PathBuf,
    /// Optional TOML agent config
    #[arg(short, long)]
    config: Option<PathBuf>,
    #[arg(short, long, value_enum)]
    strategy: Option<StrategyArg>,
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging("warn");

    let transcript = Transcript::load(&args.transcript).with_context(|| {
        format!("Failed to load transcript file: {}", args.transcript.display())
    })?;
    let config = load_config(args.config.as_deref(), args.strategy)?;
    let recorded = transcript.answer;
    let (variant, goal) = (transcript.variant, transcript.goal);

    let mut replay = ReplayOracle::new(transcript);
    let report = Controller::new(&config, variant, goal, &mut replay)
        .run()
        .context("Replay failed during execution")?;

    println!("Replay complete.");
    println!("Moves: {} ({} recorded exchanges consumed)", report.moves, replay.consumed());
    println!("Answer: {}", report.outcome.answer());
    if let Some(recorded) = recorded {
        println!("Recorded answer: {recorded}");
    }
    println!("Knowledge fingerprint: {:016x}", report.fingerprint);

    Ok(())
}
