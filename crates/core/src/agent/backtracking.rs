//! Depth-first search that walks the grid while it grows a candidate path.
//! This module exists for the strategy that discovers the map only along the branch it tries.
//! It does not own the optimistic planner or exploration targeting.

use std::collections::BTreeMap;

use super::pathfinding::step;
use super::*;
use crate::perception::in_grid;

struct Frame {
    state: Waypoint,
    candidates: Vec<Pos>,
    next: usize,
}

impl Frame {
    fn new(state: Waypoint, goal: Pos, size: i32) -> Self {
        let mut candidates: Vec<Pos> =
            neighbors(state.pos).into_iter().filter(|pos| in_grid(*pos, size)).collect();
        // Stable: equal distances keep the fixed direction order.
        candidates.sort_by_key(|pos| manhattan(*pos, goal));
        Self { state, candidates, next: 0 }
    }

    fn leaf(state: Waypoint) -> Self {
        Self { state, candidates: Vec::new(), next: 0 }
    }
}

/// Searches from the agent's cell and returns with the agent back on it. Each candidate
/// step is judged on what is known once the agent stands next to it; the best complete
/// path seen bounds the rest of the search.
pub(super) fn search<O: Oracle>(session: &mut Session<O>) -> Result<PlanResult> {
    let goal = session.store().goal();
    let size = session.store().size();
    let root = session.waypoint();

    let mut path = vec![root];
    let mut best_depth = BTreeMap::from([(root, 0u32)]);
    let mut best: Option<Plan> = None;
    let mut stack = if root.pos == goal {
        best = Some(Plan { waypoints: path.clone() });
        vec![Frame::leaf(root)]
    } else {
        vec![Frame::new(root, goal, size)]
    };

    while let Some(frame) = stack.last_mut() {
        let Some(&candidate) = frame.candidates.get(frame.next) else {
            stack.pop();
            let Some(left) = path.pop() else {
                break;
            };
            if let Some(parent) = path.last().copied() {
                session.query(parent.pos)?;
                session.record(LogEvent::Backtracked { from: left.pos, to: parent.pos });
            }
            continue;
        };
        frame.next += 1;
        let state = frame.state;

        if path.iter().any(|waypoint| waypoint.pos == candidate) {
            continue;
        }
        let Some(next) = step(session.store(), state, candidate, SearchMode::KnownOnly) else {
            continue;
        };

        let depth = path.len() as u32;
        if let Some(plan) = &best
            && depth + manhattan(candidate, goal) >= plan.cost()
        {
            continue;
        }
        if best_depth.get(&next).is_some_and(|seen| *seen <= depth) {
            continue;
        }
        best_depth.insert(next, depth);

        let changed = session.query(candidate)?;
        path.push(next);
        if candidate == goal {
            debug!("backtracking found a path of length {depth}");
            session.record(LogEvent::Replanned { cost: depth, confirmed: true });
            best = Some(Plan { waypoints: path.clone() });
            stack.push(Frame::leaf(next));
        } else {
            stack.push(Frame::new(next, goal, size));
        }

        if changed
            && best.is_none()
            && is_provably_unreachable(session.store(), session.waypoint())
        {
            return Ok(Err(SearchFailure::ProvenUnreachable));
        }
    }

    // Cells skipped while their watch was unexplained may have been cleared since.
    if let Ok(plan) = astar_plan(session.store(), root, goal, SearchMode::KnownOnly)
        && best.as_ref().is_none_or(|found| plan.cost() < found.cost())
    {
        debug!("known cells give a shorter path of length {}", plan.cost());
        session.record(LogEvent::Replanned { cost: plan.cost(), confirmed: true });
        best = Some(plan);
    }

    Ok(match best {
        Some(plan) => Ok(plan),
        None if is_provably_unreachable(session.store(), root) => {
            Err(SearchFailure::ProvenUnreachable)
        }
        None => Err(SearchFailure::Inconclusive),
    })
}
