//! Shared plumbing for the seeker command-line tools.
//! This module exists so every binary loads configuration and judges runs the same way.
//! It does not own any agent decision.

use std::fs;
use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result, bail};
use clap::ValueEnum;
use seeker::{AgentConfig, Controller, LogEvent, Pos, RunOutcome, Strategy, World};

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum StrategyArg {
    Heuristic,
    Backtracking,
}

impl From<StrategyArg> for Strategy {
    fn from(arg: StrategyArg) -> Self {
        match arg {
            StrategyArg::Heuristic => Strategy::Heuristic,
            StrategyArg::Backtracking => Strategy::Backtracking,
        }
    }
}

/// Reads an optional TOML config; missing fields keep their defaults. A strategy flag
/// wins over the file.
pub fn load_config(path: Option<&Path>, strategy: Option<StrategyArg>) -> Result<AgentConfig> {
    let mut config = match path {
        Some(path) => {
            let content = fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file: {}", path.display()))?;
            toml::from_str(&content)
                .with_context(|| format!("Failed to parse config file: {}", path.display()))?
        }
        None => AgentConfig::default(),
    };
    if let Some(strategy) = strategy {
        config.strategy = strategy.into();
    }
    if config.grid_size <= 0 {
        bail!("grid_size must be positive, got {}", config.grid_size);
    }
    let on_grid = 0..config.grid_size;
    if !on_grid.contains(&config.start.x) || !on_grid.contains(&config.start.y) {
        let size = config.grid_size;
        bail!("start {} lies outside the {size}x{size} grid", config.start);
    }
    Ok(config)
}

/// Logs go to stderr so stdout carries nothing but protocol lines.
pub fn init_logging(default_filter: &str) {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .format(|buf, record| {
            writeln!(buf, "[{}] {} - {}", record.level(), record.target(), record.args())
        })
        .target(env_logger::Target::Stderr)
        .init();
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WorldVerdict {
    pub outcome: RunOutcome,
    pub answer: i32,
    pub truth: Option<u32>,
    pub moves: u32,
}

/// Runs the agent on `world` and checks the answer against ground truth.
///
/// Without a shield the answer must equal the true shortest length. With one, the
/// agent may stop inconclusive or overshoot, but it never undercuts the truth, invents a
/// path, or claims a reachable goal is unreachable.
pub fn check_world(world: &World, config: &AgentConfig) -> Result<WorldVerdict> {
    let truth = world.shortest_path_len();
    let mut controller = Controller::new(config, world.variant(), world.goal(), world.oracle());
    let report = controller.run().context("agent run failed")?;

    let mut previous = config.start;
    for event in controller.log() {
        if let LogEvent::Moved { to, .. } = event {
            if previous.x.abs_diff(to.x) + previous.y.abs_diff(to.y) > 1 {
                bail!("teleport from {previous} to {to}");
            }
            previous = *to;
        }
    }

    let exact = world.shield().is_none();
    match (report.outcome, truth) {
        (RunOutcome::Reached { length }, Some(shortest)) => {
            if length < shortest || (exact && length != shortest) {
                bail!("reported {length}, truth {shortest}");
            }
            let Some(plan) = report.plan.as_ref() else {
                bail!("reported {length} without a plan");
            };
            let cells: Vec<Pos> = plan.cells().collect();
            if !world.is_valid_path(&cells) {
                bail!("plan {cells:?} is not walkable");
            }
        }
        (RunOutcome::Reached { length }, None) => {
            bail!("reported {length} for an unreachable goal");
        }
        (RunOutcome::Unreachable, Some(shortest)) => {
            bail!("proved a goal {shortest} steps away unreachable");
        }
        (RunOutcome::Inconclusive, _) if exact => {
            bail!("inconclusive run without a shield, truth {truth:?}");
        }
        (RunOutcome::Unreachable | RunOutcome::Inconclusive, _) => {}
    }

    Ok(WorldVerdict {
        outcome: report.outcome,
        answer: report.outcome.answer(),
        truth,
        moves: report.moves,
    })
}
