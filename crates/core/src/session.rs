//! Move execution against the oracle and bookkeeping of the agent's own state.
//! This module exists so every step is validated once and folded into knowledge once.
//! It does not own planning or the choice of where to go next.

use log::{debug, info};

use crate::config::AgentConfig;
use crate::error::{AgentError, Result};
use crate::knowledge::KnowledgeStore;
use crate::oracle::Oracle;
use crate::perception::{PerceptionVariant, manhattan};
use crate::types::*;

pub struct Session<O> {
    oracle: O,
    store: KnowledgeStore,
    agent: AgentState,
    log: Vec<LogEvent>,
    max_moves: u32,
    learned: u32,
}

impl<O: Oracle> Session<O> {
    pub fn new(oracle: O, config: &AgentConfig, variant: PerceptionVariant, goal: Pos) -> Self {
        Self {
            oracle,
            store: KnowledgeStore::new(config, variant, goal),
            agent: AgentState { pos: config.start, shielded: false, moves: 0 },
            log: Vec::new(),
            max_moves: config.max_moves,
            learned: 0,
        }
    }

    /// Moves to `target` (or stays put when it is the current cell) and merges what is seen
    /// there. Returns whether the knowledge store changed.
    pub fn query(&mut self, target: Pos) -> Result<bool> {
        let from = self.agent.pos;
        if !self.store.in_bounds(target) {
            return Err(AgentError::OutOfBounds { pos: target, size: self.store.size() });
        }
        if manhattan(from, target) > 1 {
            return Err(AgentError::IllegalMove { from, to: target });
        }
        let shielded_after = self.agent.shielded || self.store.grants_shield(target, false);
        if target != from && self.store.passability(target, shielded_after) != Passability::Safe {
            return Err(AgentError::UnsafeMove { pos: target });
        }
        if self.agent.moves >= self.max_moves {
            return Err(AgentError::MoveBudgetExhausted(self.max_moves));
        }

        let observations = self.oracle.request_move(target)?;
        let changed = self.store.merge(target, &observations)?;
        self.agent.pos = target;
        self.agent.moves += 1;
        if changed {
            self.learned += 1;
        }
        debug!(
            "move {} to {target}: {} observations, changed={changed}",
            self.agent.moves,
            observations.len()
        );
        self.log.push(LogEvent::Moved { to: target, changed });

        if !self.agent.shielded && self.store.grants_shield(target, false) {
            self.agent.shielded = true;
            info!("shield picked up at {target}");
            self.log.push(LogEvent::ShieldAcquired { at: target });
        }
        Ok(changed)
    }

    /// Re-observes the current cell without moving.
    pub fn look(&mut self) -> Result<bool> {
        self.query(self.agent.pos)
    }

    pub fn finish(&mut self, answer: i32) -> Result<()> {
        info!("finishing after {} moves with answer {answer}", self.agent.moves);
        self.log.push(LogEvent::Finished { answer });
        self.oracle.finish(answer)
    }

    pub fn record(&mut self, event: LogEvent) {
        self.log.push(event);
    }

    pub fn mark_unresolvable(&mut self, pos: Pos) {
        if self.store.mark_unresolvable(pos) {
            info!("giving up on resolving {pos}");
            self.log.push(LogEvent::MarkedUnresolvable { pos });
        }
    }

    /// Drops every cell given up on so planners may try them again. Returns how many there were.
    pub fn reconsider_unresolvable(&mut self) -> usize {
        let cells = self.store.clear_unresolvable();
        if cells > 0 {
            info!(
                "reconsidering {cells} cells given up on after {} informative moves",
                self.learned
            );
            self.log.push(LogEvent::Reconsidered { cells });
        }
        cells
    }

    /// Number of moves so far whose answer changed the knowledge store.
    pub fn learned(&self) -> u32 {
        self.learned
    }

    pub fn store(&self) -> &KnowledgeStore {
        &self.store
    }

    pub fn agent(&self) -> AgentState {
        self.agent
    }

    pub fn waypoint(&self) -> Waypoint {
        Waypoint { pos: self.agent.pos, shielded: self.agent.shielded }
    }

    pub fn log(&self) -> &[LogEvent] {
        &self.log
    }

    pub fn oracle(&self) -> &O {
        &self.oracle
    }

    pub fn into_oracle(self) -> O {
        self.oracle
    }
}
