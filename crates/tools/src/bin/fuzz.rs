use anyhow::{Result, bail};
use clap::Parser;
use rand_chacha::{
    ChaCha8Rng,
    rand_core::{Rng, SeedableRng},
};
use seeker::{AgentConfig, PerceptionVariant, RunOutcome, Strategy, World};
use seeker_tools::check_world;
use serde::Serialize;

#[derive(Serialize)]
struct FuzzSummary {
    seed: u64,
    worlds: u32,
    runs: u32,
    failures: u32,
    unreachable: u32,
    inconclusive: u32,
}

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[arg(short, long, default_value_t = 42)]
    seed: u64,
    #[arg(short, long, default_value_t = 200)]
    worlds: u32,
    /// Only generate worlds without a shield, where answers must be exact
    #[arg(long)]
    no_shield: bool,
    /// Print the summary as JSON
    #[arg(long)]
    json: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();
    seeker_tools::init_logging("warn");

    if !args.json {
        println!("Starting fuzz harness on seed {} for {} worlds...", args.seed, args.worlds);
    }
    let mut rng = ChaCha8Rng::seed_from_u64(args.seed);
    let mut runs = 0;
    let mut failures = 0;
    let mut unreachable = 0;
    let mut inconclusive = 0;

    for index in 0..args.worlds {
        let world_seed = rng.next_u64();
        let variant = if rng.next_u64() % 2 == 0 {
            PerceptionVariant::Near
        } else {
            PerceptionVariant::Ears
        };
        let with_shield = !args.no_shield && rng.next_u64() % 2 == 0;

        for strategy in [Strategy::Heuristic, Strategy::Backtracking] {
            let config = AgentConfig::with_strategy(strategy);
            let world = World::generate(world_seed, &config, variant, with_shield);
            runs += 1;
            match check_world(&world, &config) {
                Ok(verdict) => match verdict.outcome {
                    RunOutcome::Unreachable => unreachable += 1,
                    RunOutcome::Inconclusive => inconclusive += 1,
                    RunOutcome::Reached { .. } => {}
                },
                Err(error) => {
                    failures += 1;
                    eprintln!(
                        "world {index} (seed {world_seed}, {variant:?}, shield {with_shield}, \
                         {strategy:?}): {error:#}"
                    );
                }
            }
        }
    }

    if args.json {
        let summary = FuzzSummary {
            seed: args.seed,
            worlds: args.worlds,
            runs,
            failures,
            unreachable,
            inconclusive,
        };
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        println!(
            "Fuzzing finished: {failures} failures, {unreachable} unreachable, \
             {inconclusive} inconclusive."
        );
    }
    if failures > 0 {
        bail!("{failures} runs disagreed with ground truth");
    }
    Ok(())
}
