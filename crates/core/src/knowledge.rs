//! Monotonic partial map of everything the agent has learned.
//! This module exists so planners share one source of truth about cells.
//! It does not own movement, oracle traffic, or search policy.

use std::collections::{BTreeMap, BTreeSet};

use crate::config::{AgentConfig, ShieldPolicy};
use crate::error::{AgentError, Result};
use crate::perception::{PerceptionVariant, ZoneTable, in_grid};
use crate::types::*;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Terrain {
    #[default]
    Unknown,
    Open,
    Occupied(ObserverKind),
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CellKnowledge {
    pub terrain: Terrain,
    pub watch_reported: bool,
    /// Observer kinds whose known zone covers this cell.
    pub watchers: BTreeSet<ObserverKind>,
    pub item: Option<ItemKind>,
}

#[derive(Clone, Debug)]
pub struct KnowledgeStore {
    size: i32,
    goal: Pos,
    variant: PerceptionVariant,
    zones: ZoneTable,
    policy: ShieldPolicy,
    cells: BTreeMap<Pos, CellKnowledge>,
    shield_at: Option<Pos>,
    unresolvable: BTreeSet<Pos>,
}

impl KnowledgeStore {
    pub fn new(config: &AgentConfig, variant: PerceptionVariant, goal: Pos) -> Self {
        let mut store = Self {
            size: config.grid_size,
            goal,
            variant,
            zones: config.zones,
            policy: config.shield.clone(),
            cells: BTreeMap::new(),
            shield_at: None,
            unresolvable: BTreeSet::new(),
        };
        store.cell_mut(goal).item = Some(ItemKind::Stone);
        store
    }

    pub fn size(&self) -> i32 {
        self.size
    }

    pub fn goal(&self) -> Pos {
        self.goal
    }

    pub fn variant(&self) -> PerceptionVariant {
        self.variant
    }

    pub fn zones(&self) -> &ZoneTable {
        &self.zones
    }

    pub fn policy(&self) -> &ShieldPolicy {
        &self.policy
    }

    pub fn shield_location(&self) -> Option<Pos> {
        self.shield_at
    }

    pub fn in_bounds(&self, pos: Pos) -> bool {
        in_grid(pos, self.size)
    }

    pub fn window(&self, center: Pos) -> Vec<Pos> {
        self.variant.window(center, self.size)
    }

    pub fn cell(&self, pos: Pos) -> Option<&CellKnowledge> {
        self.cells.get(&pos)
    }

    pub fn terrain(&self, pos: Pos) -> Terrain {
        self.cells.get(&pos).map_or(Terrain::Unknown, |cell| cell.terrain)
    }

    pub fn is_known(&self, pos: Pos) -> bool {
        self.terrain(pos) != Terrain::Unknown
    }

    pub fn unknown_count(&self) -> usize {
        let known = self.cells.values().filter(|cell| cell.terrain != Terrain::Unknown).count();
        (self.size * self.size) as usize - known
    }

    pub fn observers(&self) -> impl Iterator<Item = (Pos, ObserverKind)> + '_ {
        self.cells.iter().filter_map(|(pos, cell)| match cell.terrain {
            Terrain::Occupied(kind) => Some((*pos, kind)),
            _ => None,
        })
    }

    /// Folds one move answer into the store. Cells of the perception window around `center`
    /// that carry no observer report become open ground. Returns whether any fact changed.
    pub fn merge(&mut self, center: Pos, reports: &[Observation]) -> Result<bool> {
        if let Some(stray) = reports.iter().find(|report| !self.in_bounds(report.pos)) {
            return Err(AgentError::Protocol(format!(
                "observation at {} lies outside the grid",
                stray.pos
            )));
        }

        let mut changed = false;
        for report in reports {
            changed |= match report.marker {
                Marker::Observer(kind) => self.record_observer(center, report.pos, kind)?,
                Marker::Perception => self.record_watch(report.pos)?,
                Marker::Item(ItemKind::Shield) => self.record_shield(report.pos)?,
                Marker::Item(ItemKind::Stone) => {
                    if report.pos != self.goal {
                        return Err(AgentError::Protocol(format!(
                            "stone reported at {} but the goal is {}",
                            report.pos, self.goal
                        )));
                    }
                    false
                }
            };
        }

        for pos in self.window(center) {
            let cell = self.cell_mut(pos);
            if cell.terrain == Terrain::Unknown {
                cell.terrain = Terrain::Open;
                changed = true;
            }
        }

        Ok(changed)
    }

    fn record_observer(&mut self, center: Pos, pos: Pos, kind: ObserverKind) -> Result<bool> {
        if pos == center {
            return Err(AgentError::Protocol(format!("observer reported on the agent's cell {pos}")));
        }
        let cell = self.cell_mut(pos);
        match cell.terrain {
            Terrain::Occupied(existing) if existing == kind => return Ok(false),
            Terrain::Occupied(existing) => {
                return Err(AgentError::Protocol(format!(
                    "{pos} reported as {kind:?} but already known as {existing:?}"
                )));
            }
            Terrain::Open => {
                return Err(AgentError::Protocol(format!(
                    "{kind:?} reported at {pos} which was already seen open"
                )));
            }
            Terrain::Unknown => cell.terrain = Terrain::Occupied(kind),
        }

        for covered in self.zones.zone(kind, pos, self.size) {
            if covered == pos {
                continue;
            }
            let cell = self.cell_mut(covered);
            if cell.terrain == Terrain::Open && !cell.watch_reported {
                return Err(AgentError::Protocol(format!(
                    "{kind:?} at {pos} would watch {covered} which was seen unwatched"
                )));
            }
            cell.watchers.insert(kind);
        }
        Ok(true)
    }

    fn record_watch(&mut self, pos: Pos) -> Result<bool> {
        let cell = self.cell_mut(pos);
        if cell.terrain == Terrain::Open && !cell.watch_reported {
            return Err(AgentError::Protocol(format!(
                "watch reported at {pos} which was seen unwatched"
            )));
        }
        let changed = !cell.watch_reported;
        cell.watch_reported = true;
        Ok(changed)
    }

    fn record_shield(&mut self, pos: Pos) -> Result<bool> {
        match self.shield_at {
            Some(known) if known == pos => Ok(false),
            Some(known) => Err(AgentError::Protocol(format!(
                "shield reported at {pos} but already located at {known}"
            ))),
            None => {
                self.shield_at = Some(pos);
                self.cell_mut(pos).item = Some(ItemKind::Shield);
                Ok(true)
            }
        }
    }

    pub fn belief(&self, pos: Pos) -> Belief {
        let Some(cell) = self.cells.get(&pos) else {
            return Belief::Unknown;
        };
        if let Terrain::Occupied(kind) = cell.terrain {
            return Belief::Blocked(kind);
        }
        let mut watchers: Vec<Watcher> =
            cell.watchers.iter().copied().map(Watcher::Observer).collect();
        if self.has_unattributed_watch(pos) {
            watchers.push(Watcher::Unattributed);
        }
        if !watchers.is_empty() {
            return Belief::HostileWatched(watchers);
        }
        if pos == self.goal {
            return Belief::Goal;
        }
        if let Some(item) = cell.item {
            return Belief::Item(item);
        }
        match cell.terrain {
            Terrain::Unknown => Belief::Unknown,
            _ => Belief::Free,
        }
    }

    /// A reported watch stays unattributed while some unknown cell could still hide an observer
    /// the shield does not neutralize, or while nothing known explains it at all.
    pub fn has_unattributed_watch(&self, pos: Pos) -> bool {
        let Some(cell) = self.cells.get(&pos) else {
            return false;
        };
        if !cell.watch_reported || matches!(cell.terrain, Terrain::Occupied(_)) {
            return false;
        }
        if !self.unknown_sites(pos).is_empty() {
            return true;
        }
        cell.watchers.is_empty() && self.plausible_sources(pos).is_empty()
    }

    /// Unknown cells that might still hide an observer watching `pos` which the shield would
    /// not neutralize.
    pub fn unknown_sites(&self, pos: Pos) -> Vec<Pos> {
        let mut sites: Vec<Pos> = self
            .plausible_sources(pos)
            .into_iter()
            .filter(|(_, kind)| !self.policy.neutralizes(*kind))
            .map(|(site, _)| site)
            .collect();
        sites.dedup();
        sites
    }

    /// Unknown cells and observer kinds that could be watching `pos` without contradicting a
    /// cell already seen unwatched. Sorted by site.
    pub fn plausible_sources(&self, pos: Pos) -> Vec<(Pos, ObserverKind)> {
        self.zones
            .potential_sites(pos, self.size)
            .into_iter()
            .filter(|site| !self.is_known(*site))
            .flat_map(|site| ObserverKind::ALL.into_iter().map(move |kind| (site, kind)))
            .filter(|(site, kind)| {
                let zone = self.zones.zone(*kind, *site, self.size);
                zone.contains(&pos) && !zone.iter().any(|covered| self.seen_unwatched(*covered))
            })
            .collect()
    }

    fn seen_unwatched(&self, pos: Pos) -> bool {
        self.cells
            .get(&pos)
            .is_some_and(|cell| cell.terrain == Terrain::Open && !cell.watch_reported)
    }

    /// Unknown cells whose contents could rule out an observer that might be watching `pos`
    /// and that the shield would not neutralize: the possible sites themselves and the rest of
    /// their zones, since one of those seen unwatched excludes the site.
    pub fn evidence_cells(&self, pos: Pos) -> Vec<Pos> {
        let cells: BTreeSet<Pos> = self
            .plausible_sources(pos)
            .into_iter()
            .filter(|(_, kind)| !self.policy.neutralizes(*kind))
            .flat_map(|(site, kind)| self.zones.zone(kind, site, self.size))
            .filter(|cell| !self.is_known(*cell))
            .collect();
        cells.into_iter().collect()
    }

    pub fn passability(&self, pos: Pos, shielded: bool) -> Passability {
        if self.unresolvable.contains(&pos) {
            return Passability::Forbidden;
        }
        self.relaxed_passability(pos, shielded)
    }

    /// Like [`Self::passability`], except that cells given up on count like any other.
    pub fn relaxed_passability(&self, pos: Pos, shielded: bool) -> Passability {
        if !self.in_bounds(pos) {
            return Passability::Forbidden;
        }
        let Some(cell) = self.cells.get(&pos) else {
            return Passability::Assumed;
        };
        if matches!(cell.terrain, Terrain::Occupied(_)) {
            return Passability::Forbidden;
        }
        let watched = cell.watch_reported || !cell.watchers.is_empty();
        if watched && !shielded {
            return Passability::Forbidden;
        }
        if cell.watchers.iter().any(|kind| !self.policy.neutralizes(*kind)) {
            return Passability::Forbidden;
        }

        let mut assumed = cell.terrain == Terrain::Unknown;
        if self.has_unattributed_watch(pos) {
            if self.policy.neutralizes.is_empty() {
                return Passability::Forbidden;
            }
            assumed = true;
        }
        if assumed { Passability::Assumed } else { Passability::Safe }
    }

    pub fn is_traversable(&self, pos: Pos, shielded: bool) -> bool {
        self.passability(pos, shielded) != Passability::Forbidden
    }

    /// Whether stepping onto `pos` hands the agent the shield. Under optimism an unknown cell
    /// may still hide it while its location is unknown.
    pub fn grants_shield(&self, pos: Pos, optimistic: bool) -> bool {
        match self.shield_at {
            Some(shield) => shield == pos,
            None => optimistic && !self.is_known(pos),
        }
    }

    pub fn mark_unresolvable(&mut self, pos: Pos) -> bool {
        self.unresolvable.insert(pos)
    }

    pub fn is_unresolvable(&self, pos: Pos) -> bool {
        self.unresolvable.contains(&pos)
    }

    pub fn unresolvable_count(&self) -> usize {
        self.unresolvable.len()
    }

    /// Forgets every cell given up on. Returns how many there were.
    pub fn clear_unresolvable(&mut self) -> usize {
        let count = self.unresolvable.len();
        self.unresolvable.clear();
        count
    }

    pub fn fingerprint(&self) -> u64 {
        use std::hash::Hasher;
        use xxhash_rust::xxh3::Xxh3;

        let mut hasher = Xxh3::new();
        hasher.write_i32(self.size);
        hasher.write_i32(self.goal.x);
        hasher.write_i32(self.goal.y);
        for (pos, cell) in &self.cells {
            hasher.write_i32(pos.x);
            hasher.write_i32(pos.y);
            hasher.write_u8(match cell.terrain {
                Terrain::Unknown => 0,
                Terrain::Open => 1,
                Terrain::Occupied(kind) => 2 + kind as u8,
            });
            hasher.write_u8(u8::from(cell.watch_reported));
            for kind in &cell.watchers {
                hasher.write_u8(*kind as u8);
            }
            hasher.write_u8(cell.item.map_or(0, |item| 1 + item as u8));
        }
        if let Some(shield) = self.shield_at {
            hasher.write_i32(shield.x);
            hasher.write_i32(shield.y);
        }
        for pos in &self.unresolvable {
            hasher.write_i32(pos.x);
            hasher.write_i32(pos.y);
        }
        hasher.finish()
    }

    fn cell_mut(&mut self, pos: Pos) -> &mut CellKnowledge {
        self.cells.entry(pos).or_default()
    }
}
