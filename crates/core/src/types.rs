use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Pos {
    pub y: i32,
    pub x: i32,
}

impl Pos {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { y, x }
    }

    pub fn offset(self, dx: i32, dy: i32) -> Self {
        Self { y: self.y + dy, x: self.x + dx }
    }
}

impl fmt::Display for Pos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ObserverKind {
    Hulk,
    Thor,
    CaptainMarvel,
}

impl ObserverKind {
    pub const ALL: [ObserverKind; 3] =
        [ObserverKind::Hulk, ObserverKind::Thor, ObserverKind::CaptainMarvel];
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemKind {
    Shield,
    Stone,
}

/// One symbol of a move answer: `P`, `H`, `T`, `M`, `S` or `I`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Marker {
    Perception,
    Observer(ObserverKind),
    Item(ItemKind),
}

impl Marker {
    pub fn from_symbol(symbol: &str) -> Option<Self> {
        match symbol {
            "P" => Some(Marker::Perception),
            "H" => Some(Marker::Observer(ObserverKind::Hulk)),
            "T" => Some(Marker::Observer(ObserverKind::Thor)),
            "M" => Some(Marker::Observer(ObserverKind::CaptainMarvel)),
            "S" => Some(Marker::Item(ItemKind::Shield)),
            "I" => Some(Marker::Item(ItemKind::Stone)),
            _ => None,
        }
    }

    pub fn symbol(self) -> char {
        match self {
            Marker::Perception => 'P',
            Marker::Observer(ObserverKind::Hulk) => 'H',
            Marker::Observer(ObserverKind::Thor) => 'T',
            Marker::Observer(ObserverKind::CaptainMarvel) => 'M',
            Marker::Item(ItemKind::Shield) => 'S',
            Marker::Item(ItemKind::Stone) => 'I',
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Observation {
    pub pos: Pos,
    pub marker: Marker,
}

impl Observation {
    pub fn new(pos: Pos, marker: Marker) -> Self {
        Self { pos, marker }
    }
}

/// Who keeps a cell under watch.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Watcher {
    Observer(ObserverKind),
    /// A reported perception marker whose source cannot be pinned down yet.
    Unattributed,
}

/// Summary of what the agent believes about one cell, strongest fact first.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Belief {
    Unknown,
    Free,
    Blocked(ObserverKind),
    HostileWatched(Vec<Watcher>),
    Item(ItemKind),
    Goal,
}

/// How certain the agent is that a cell may be entered.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum Passability {
    Safe,
    Assumed,
    Forbidden,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct AgentState {
    pub pos: Pos,
    pub shielded: bool,
    pub moves: u32,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Waypoint {
    pub pos: Pos,
    pub shielded: bool,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Plan {
    pub waypoints: Vec<Waypoint>,
}

impl Plan {
    pub fn cost(&self) -> u32 {
        self.waypoints.len().saturating_sub(1) as u32
    }

    pub fn cells(&self) -> impl Iterator<Item = Pos> + '_ {
        self.waypoints.iter().map(|waypoint| waypoint.pos)
    }

    pub fn last(&self) -> Option<Waypoint> {
        self.waypoints.last().copied()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RunOutcome {
    Reached { length: u32 },
    Unreachable,
    /// Every remaining route crosses a cell that could not be verified safe.
    Inconclusive,
}

impl RunOutcome {
    pub fn answer(self) -> i32 {
        match self {
            RunOutcome::Reached { length } => length as i32,
            RunOutcome::Unreachable | RunOutcome::Inconclusive => -1,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExploreReason {
    UnknownCell,
    UnattributedWatch,
    Frontier,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LogEvent {
    Moved { to: Pos, changed: bool },
    ShieldAcquired { at: Pos },
    Replanned { cost: u32, confirmed: bool },
    ExploreTarget { target: Pos, reason: ExploreReason, path_len: u32 },
    MarkedUnresolvable { pos: Pos },
    Reconsidered { cells: usize },
    Backtracked { from: Pos, to: Pos },
    Finished { answer: i32 },
}
