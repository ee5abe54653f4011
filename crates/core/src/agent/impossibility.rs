//! Proof that the goal cannot be reached whatever the unknown cells hold.

use std::collections::{BTreeSet, VecDeque};

use super::pathfinding::step;
use super::*;

/// Every state the agent could reach from `from` if all assumptions turned out favourable.
/// Cells given up on are included: giving up is not evidence.
pub fn optimistic_closure(store: &KnowledgeStore, from: Waypoint) -> BTreeSet<Waypoint> {
    let mut visited = BTreeSet::from([from]);
    let mut queue = VecDeque::from([from]);
    while let Some(current) = queue.pop_front() {
        for neighbor in neighbors(current.pos) {
            if let Some(next) = step(store, current, neighbor, SearchMode::Relaxed)
                && visited.insert(next)
            {
                queue.push_back(next);
            }
        }
    }
    visited
}

/// True when no optimistic completion of the map connects `from` to the goal.
pub fn is_provably_unreachable(store: &KnowledgeStore, from: Waypoint) -> bool {
    let goal = store.goal();
    !optimistic_closure(store, from).iter().any(|state| state.pos == goal)
}
