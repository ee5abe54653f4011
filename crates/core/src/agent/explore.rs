//! Choosing where to stand next so an open question about a cell gets answered.
//! This module exists to keep target selection separate from the search primitives.
//! It does not own movement or the decision to give up on a cell.

use std::collections::{BTreeMap, VecDeque, btree_map::Entry};

use super::pathfinding::step;
use super::*;

#[derive(Clone, Debug, PartialEq, Eq)]
pub(super) struct ExploreRoute {
    /// The cell this route will reveal or, for frontier routes, the cell it ends on.
    pub target: Pos,
    pub plan: Plan,
}

/// Cells whose contents would settle whether `pos` may be entered.
pub(super) fn reveal_targets(store: &KnowledgeStore, pos: Pos) -> (Vec<Pos>, ExploreReason) {
    if !store.is_known(pos) {
        return (vec![pos], ExploreReason::UnknownCell);
    }
    if store.has_unattributed_watch(pos) {
        return (store.evidence_cells(pos), ExploreReason::UnattributedWatch);
    }
    (Vec::new(), ExploreReason::UnknownCell)
}

/// Nearest safely reachable cell whose perception window covers one of `targets`.
pub(super) fn route_to_reveal(
    store: &KnowledgeStore,
    from: Waypoint,
    targets: &[Pos],
) -> Option<ExploreRoute> {
    find_nearest_auto_target(
        store,
        from,
        |current| store.window(current).into_iter().any(|seen| targets.contains(&seen)),
        |current| {
            let window = store.window(current);
            targets.iter().copied().find(|target| window.contains(target)).unwrap_or(current)
        },
    )
}

/// Nearest safely reachable cell from which some unknown cell would come into view.
pub(super) fn route_to_frontier(store: &KnowledgeStore, from: Waypoint) -> Option<ExploreRoute> {
    find_nearest_auto_target(
        store,
        from,
        |current| store.window(current).into_iter().any(|seen| !store.is_known(seen)),
        |current| current,
    )
}

fn find_nearest_auto_target<IsTarget, TargetFor>(
    store: &KnowledgeStore,
    start: Waypoint,
    is_target: IsTarget,
    target_for: TargetFor,
) -> Option<ExploreRoute>
where
    IsTarget: Fn(Pos) -> bool,
    TargetFor: Fn(Pos) -> Pos,
{
    let mut visited = BTreeMap::new();
    let mut came_from = BTreeMap::new();
    let mut queue = VecDeque::new();

    visited.insert(start, 0u32);
    queue.push_back(start);

    let mut best: Option<(u32, Waypoint)> = None;

    while let Some(current) = queue.pop_front() {
        let Some(&dist) = visited.get(&current) else {
            continue;
        };

        if let Some((best_dist, _)) = best
            && dist > best_dist
        {
            break;
        }

        if current.pos != start.pos && is_target(current.pos) {
            let is_better = match best {
                None => true,
                Some((best_dist, best_state)) => {
                    dist < best_dist
                        || (dist == best_dist
                            && (current.pos.y, current.pos.x, current.shielded)
                                < (best_state.pos.y, best_state.pos.x, best_state.shielded))
                }
            };
            if is_better {
                best = Some((dist, current));
            }
        }

        for neighbor in neighbors(current.pos) {
            let Some(next) = step(store, current, neighbor, SearchMode::KnownOnly) else {
                continue;
            };
            if let Entry::Vacant(entry) = visited.entry(next) {
                entry.insert(dist + 1);
                came_from.insert(next, current);
                queue.push_back(next);
            }
        }
    }

    let (_, end) = best?;
    let mut waypoints = vec![end];
    let mut current = end;
    while let Some(previous) = came_from.get(&current) {
        current = *previous;
        waypoints.push(current);
    }
    waypoints.reverse();
    Some(ExploreRoute { target: target_for(end.pos), plan: Plan { waypoints } })
}
