//! Error types for the seeker agent

use std::io;

use thiserror::Error;

use crate::types::Pos;

/// Conditions that end a run. None of them occur in a correct run against an honest oracle.
#[derive(Error, Debug)]
pub enum AgentError {
    #[error("move target {pos} lies outside the {size}x{size} grid")]
    OutOfBounds { pos: Pos, size: i32 },

    #[error("illegal move from {from} to {to}: only unit steps are allowed")]
    IllegalMove { from: Pos, to: Pos },

    #[error("refusing to enter {pos}: it is not known to be safe")]
    UnsafeMove { pos: Pos },

    #[error("protocol error: {0}")]
    Protocol(String),

    #[error("move budget of {0} exhausted")]
    MoveBudgetExhausted(u32),

    #[error("transport failure: {0}")]
    Io(#[from] io::Error),
}

/// Why a planner came back without a path.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchFailure {
    #[error("no path under current knowledge")]
    NoPathUnderCurrentKnowledge,

    #[error("goal is provably unreachable")]
    ProvenUnreachable,

    #[error("goal not reached: every remaining route crosses cells that cannot be verified safe")]
    Inconclusive,
}

pub type Result<T> = std::result::Result<T, AgentError>;
