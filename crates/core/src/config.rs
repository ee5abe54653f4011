use serde::{Deserialize, Serialize};

use crate::perception::ZoneTable;
use crate::types::{ObserverKind, Pos};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    #[default]
    Heuristic,
    Backtracking,
}

/// Which observer kinds the shield neutralizes once it is held.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShieldPolicy {
    pub neutralizes: Vec<ObserverKind>,
}

impl Default for ShieldPolicy {
    fn default() -> Self {
        Self { neutralizes: vec![ObserverKind::Hulk, ObserverKind::Thor] }
    }
}

impl ShieldPolicy {
    pub fn none() -> Self {
        Self { neutralizes: Vec::new() }
    }

    pub fn neutralizes(&self, kind: ObserverKind) -> bool {
        self.neutralizes.contains(&kind)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    pub strategy: Strategy,
    pub grid_size: i32,
    pub start: Pos,
    pub shield: ShieldPolicy,
    pub zones: ZoneTable,
    /// Walk onto the goal before answering once the shortest length is proven.
    pub walk_to_goal: bool,
    pub max_moves: u32,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            strategy: Strategy::Heuristic,
            grid_size: 9,
            start: Pos::new(0, 0),
            shield: ShieldPolicy::default(),
            zones: ZoneTable::default(),
            walk_to_goal: true,
            max_moves: 100_000,
        }
    }
}

impl AgentConfig {
    pub fn with_strategy(strategy: Strategy) -> Self {
        Self { strategy, ..Self::default() }
    }
}
