//! Reference simulator owning a fully known grid.
//! This module exists to drive the agent in tests and fuzzing and to compute ground truth.
//! It does not take part in the agent's own decisions.

use std::collections::{BTreeMap, BTreeSet, VecDeque};

use rand_chacha::ChaCha8Rng;
use rand_chacha::rand_core::{Rng, SeedableRng};
use thiserror::Error;

use crate::config::{AgentConfig, ShieldPolicy};
use crate::error::{AgentError, Result};
use crate::oracle::Oracle;
use crate::perception::{PerceptionVariant, ZoneTable, in_grid, manhattan, neighbors};
use crate::types::*;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum LayoutError {
    #[error("layout has {rows} rows but the grid is {size}x{size}")]
    RowCount { rows: usize, size: i32 },

    #[error("row {row} has {cells} cells but the grid is {size} wide")]
    RowWidth { row: usize, cells: usize, size: i32 },

    #[error("unknown symbol {symbol:?} at {pos}")]
    Symbol { symbol: char, pos: Pos },

    #[error("layout has no stone")]
    MissingStone,
}

#[derive(Clone, Debug)]
pub struct World {
    size: i32,
    start: Pos,
    variant: PerceptionVariant,
    zones: ZoneTable,
    policy: ShieldPolicy,
    observers: BTreeMap<Pos, ObserverKind>,
    shield: Option<Pos>,
    stone: Pos,
}

impl World {
    pub fn new(config: &AgentConfig, variant: PerceptionVariant, stone: Pos) -> Self {
        Self {
            size: config.grid_size,
            start: config.start,
            variant,
            zones: config.zones,
            policy: config.shield.clone(),
            observers: BTreeMap::new(),
            shield: None,
            stone,
        }
    }

    pub fn with_observer(mut self, pos: Pos, kind: ObserverKind) -> Self {
        self.observers.insert(pos, kind);
        self
    }

    pub fn with_shield(mut self, pos: Pos) -> Self {
        self.shield = Some(pos);
        self
    }

    /// Builds a world from one string per row (`y` = row index). Symbols: `.` empty,
    /// `H`/`T`/`M` observers, `S` shield, `I` stone. Whitespace is ignored.
    pub fn from_layout(
        config: &AgentConfig,
        variant: PerceptionVariant,
        rows: &[&str],
    ) -> std::result::Result<Self, LayoutError> {
        if rows.len() != config.grid_size as usize {
            return Err(LayoutError::RowCount { rows: rows.len(), size: config.grid_size });
        }

        let mut world = World::new(config, variant, Pos::new(-1, -1));
        let mut stone = None;
        for (y, row) in rows.iter().enumerate() {
            let symbols: Vec<char> = row.chars().filter(|c| !c.is_whitespace()).collect();
            if symbols.len() != config.grid_size as usize {
                return Err(LayoutError::RowWidth {
                    row: y,
                    cells: symbols.len(),
                    size: config.grid_size,
                });
            }
            for (x, symbol) in symbols.into_iter().enumerate() {
                let pos = Pos::new(x as i32, y as i32);
                match symbol {
                    '.' => {}
                    'H' => world = world.with_observer(pos, ObserverKind::Hulk),
                    'T' => world = world.with_observer(pos, ObserverKind::Thor),
                    'M' => world = world.with_observer(pos, ObserverKind::CaptainMarvel),
                    'S' => world = world.with_shield(pos),
                    'I' => stone = Some(pos),
                    _ => return Err(LayoutError::Symbol { symbol, pos }),
                }
            }
        }
        world.stone = stone.ok_or(LayoutError::MissingStone)?;
        Ok(world)
    }

    /// Random world with one observer of each kind, a stone, and optionally a shield.
    /// The start cell is never watched or occupied.
    pub fn generate(
        seed: u64,
        config: &AgentConfig,
        variant: PerceptionVariant,
        with_shield: bool,
    ) -> Self {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let size = config.grid_size;
        let random_pos = |rng: &mut ChaCha8Rng| {
            let x = (rng.next_u64() % size as u64) as i32;
            let y = (rng.next_u64() % size as u64) as i32;
            Pos::new(x, y)
        };

        loop {
            let mut taken = BTreeSet::from([config.start]);
            let mut world = World::new(config, variant, config.start);
            for kind in ObserverKind::ALL {
                let pos = random_pos(&mut rng);
                if taken.insert(pos) {
                    world.observers.insert(pos, kind);
                }
            }
            let stone = random_pos(&mut rng);
            if !taken.insert(stone) {
                continue;
            }
            world.stone = stone;
            if with_shield {
                let shield = random_pos(&mut rng);
                if !taken.insert(shield) {
                    continue;
                }
                world.shield = Some(shield);
            }
            if world.observers.len() == ObserverKind::ALL.len()
                && world.watchers(config.start).is_empty()
            {
                return world;
            }
        }
    }

    pub fn size(&self) -> i32 {
        self.size
    }

    pub fn start(&self) -> Pos {
        self.start
    }

    pub fn variant(&self) -> PerceptionVariant {
        self.variant
    }

    pub fn goal(&self) -> Pos {
        self.stone
    }

    pub fn shield(&self) -> Option<Pos> {
        self.shield
    }

    pub fn observer_at(&self, pos: Pos) -> Option<ObserverKind> {
        self.observers.get(&pos).copied()
    }

    /// Observer kinds whose zone covers `pos`. An observer does not watch its own cell.
    pub fn watchers(&self, pos: Pos) -> Vec<ObserverKind> {
        let mut kinds: Vec<ObserverKind> = self
            .observers
            .iter()
            .filter(|(observer, kind)| {
                **observer != pos && self.zones.zone(**kind, **observer, self.size).contains(&pos)
            })
            .map(|(_, kind)| *kind)
            .collect();
        kinds.sort();
        kinds.dedup();
        kinds
    }

    pub fn is_enterable(&self, pos: Pos, shielded: bool) -> bool {
        in_grid(pos, self.size)
            && !self.observers.contains_key(&pos)
            && self
                .watchers(pos)
                .iter()
                .all(|kind| shielded && self.policy.neutralizes(*kind))
    }

    /// Everything visible from `center`, in row-major order.
    pub fn observe(&self, center: Pos) -> Vec<Observation> {
        let mut observations = Vec::new();
        for pos in self.variant.window(center, self.size) {
            if let Some(kind) = self.observer_at(pos) {
                observations.push(Observation::new(pos, Marker::Observer(kind)));
                continue;
            }
            if !self.watchers(pos).is_empty() {
                observations.push(Observation::new(pos, Marker::Perception));
            }
            if self.shield == Some(pos) {
                observations.push(Observation::new(pos, Marker::Item(ItemKind::Shield)));
            }
            if self.stone == pos {
                observations.push(Observation::new(pos, Marker::Item(ItemKind::Stone)));
            }
        }
        observations
    }

    /// Ground-truth shortest safe path length from the start cell to the stone.
    pub fn shortest_path_len(&self) -> Option<u32> {
        let start = Waypoint { pos: self.start, shielded: self.shield == Some(self.start) };
        let mut dist = BTreeMap::from([(start, 0u32)]);
        let mut queue = VecDeque::from([start]);
        while let Some(current) = queue.pop_front() {
            let d = dist[&current];
            if current.pos == self.stone {
                return Some(d);
            }
            for pos in neighbors(current.pos) {
                let shielded = current.shielded || self.shield == Some(pos);
                if !self.is_enterable(pos, shielded) {
                    continue;
                }
                let next = Waypoint { pos, shielded };
                if !dist.contains_key(&next) {
                    dist.insert(next, d + 1);
                    queue.push_back(next);
                }
            }
        }
        None
    }

    /// Whether `cells` is a safe unit-step walk from the start cell to the stone.
    pub fn is_valid_path(&self, cells: &[Pos]) -> bool {
        if cells.first() != Some(&self.start) || cells.last() != Some(&self.stone) {
            return false;
        }
        let mut shielded = self.shield == Some(self.start);
        for pair in cells.windows(2) {
            if manhattan(pair[0], pair[1]) != 1 {
                return false;
            }
            shielded |= self.shield == Some(pair[1]);
            if !self.is_enterable(pair[1], shielded) {
                return false;
            }
        }
        true
    }

    pub fn oracle(&self) -> WorldOracle {
        WorldOracle {
            world: self.clone(),
            pos: self.start,
            shielded: self.shield == Some(self.start),
            moves: 0,
            answer: None,
        }
    }
}

/// Answers move requests from a [`World`] and refuses anything a real opponent would punish.
#[derive(Clone, Debug)]
pub struct WorldOracle {
    world: World,
    pos: Pos,
    shielded: bool,
    moves: u32,
    answer: Option<i32>,
}

impl WorldOracle {
    pub fn world(&self) -> &World {
        &self.world
    }

    pub fn pos(&self) -> Pos {
        self.pos
    }

    pub fn moves(&self) -> u32 {
        self.moves
    }

    pub fn answer(&self) -> Option<i32> {
        self.answer
    }
}

impl Oracle for WorldOracle {
    fn request_move(&mut self, target: Pos) -> Result<Vec<Observation>> {
        if self.answer.is_some() {
            return Err(AgentError::Protocol("move requested after the run ended".to_string()));
        }
        if !in_grid(target, self.world.size) {
            return Err(AgentError::Protocol(format!("move to {target} leaves the grid")));
        }
        if manhattan(self.pos, target) > 1 {
            return Err(AgentError::Protocol(format!("teleport from {} to {target}", self.pos)));
        }
        let shielded = self.shielded || self.world.shield == Some(target);
        if target != self.pos && !self.world.is_enterable(target, shielded) {
            return Err(AgentError::Protocol(format!("agent was caught at {target}")));
        }
        self.pos = target;
        self.shielded = shielded;
        self.moves += 1;
        Ok(self.world.observe(target))
    }

    fn finish(&mut self, answer: i32) -> Result<()> {
        if self.answer.is_some() {
            return Err(AgentError::Protocol("run already ended".to_string()));
        }
        self.answer = Some(answer);
        Ok(())
    }
}
