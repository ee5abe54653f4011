//! Best-first search over (cell, shield held) states.
//! This module exists so every planner and navigator shares one step rule and one A*.
//! It does not own exploration policy or movement.

use std::collections::{BTreeMap, BTreeSet};

use super::*;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SearchMode {
    /// Unknown cells and unattributed watches under the shield are assumed passable.
    Optimistic,
    /// Like `Optimistic`, but cells given up on still count as passable.
    Relaxed,
    /// Only cells known to be safe.
    KnownOnly,
}

impl SearchMode {
    fn admits(self, passability: Passability) -> bool {
        match self {
            SearchMode::Optimistic | SearchMode::Relaxed => passability != Passability::Forbidden,
            SearchMode::KnownOnly => passability == Passability::Safe,
        }
    }

    fn is_optimistic(self) -> bool {
        self != SearchMode::KnownOnly
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
struct OpenNode {
    f: u32,
    h: u32,
    y: i32,
    x: i32,
    shielded: bool,
    g: u32,
}

/// The state reached by stepping from `from` onto `pos`, if `mode` admits the step.
pub fn step(store: &KnowledgeStore, from: Waypoint, pos: Pos, mode: SearchMode) -> Option<Waypoint> {
    if !store.in_bounds(pos) {
        return None;
    }
    let shielded = from.shielded || store.grants_shield(pos, mode.is_optimistic());
    let passability = match mode {
        SearchMode::Relaxed => store.relaxed_passability(pos, shielded),
        SearchMode::Optimistic | SearchMode::KnownOnly => store.passability(pos, shielded),
    };
    mode.admits(passability).then_some(Waypoint { pos, shielded })
}

pub fn astar_plan(
    store: &KnowledgeStore,
    start: Waypoint,
    target: Pos,
    mode: SearchMode,
) -> std::result::Result<Plan, SearchFailure> {
    let mut open_set = BTreeSet::new();
    let mut g_score = BTreeMap::new();
    let mut came_from = BTreeMap::new();
    let mut closed = BTreeSet::new();

    let h = manhattan(start.pos, target);
    open_set.insert(OpenNode {
        f: h,
        h,
        y: start.pos.y,
        x: start.pos.x,
        shielded: start.shielded,
        g: 0,
    });
    g_score.insert(start, 0u32);

    while let Some(curr) = open_set.pop_first() {
        let state = Waypoint { pos: Pos { y: curr.y, x: curr.x }, shielded: curr.shielded };
        if !closed.insert(state) {
            continue;
        }
        if state.pos == target {
            return Ok(reconstruct_plan(&came_from, start, state));
        }
        for n in neighbors(state.pos) {
            let Some(next) = step(store, state, n, mode) else {
                continue;
            };
            let tg = curr.g + 1;
            if tg < *g_score.get(&next).unwrap_or(&u32::MAX) {
                came_from.insert(next, state);
                g_score.insert(next, tg);
                let h = manhattan(n, target);
                open_set.insert(OpenNode {
                    f: tg + h,
                    h,
                    y: n.y,
                    x: n.x,
                    shielded: next.shielded,
                    g: tg,
                });
            }
        }
    }
    Err(SearchFailure::NoPathUnderCurrentKnowledge)
}

/// First waypoint after the start that rests on an assumption rather than on knowledge.
pub fn first_unconfirmed(store: &KnowledgeStore, plan: &Plan) -> Option<Waypoint> {
    plan.waypoints
        .iter()
        .skip(1)
        .find(|waypoint| store.passability(waypoint.pos, waypoint.shielded) != Passability::Safe)
        .copied()
}

fn reconstruct_plan(came: &BTreeMap<Waypoint, Waypoint>, start: Waypoint, end: Waypoint) -> Plan {
    let mut current = end;
    let mut waypoints = vec![current];
    while current != start {
        let Some(previous) = came.get(&current) else {
            break;
        };
        current = *previous;
        waypoints.push(current);
    }
    waypoints.reverse();
    Plan { waypoints }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::*;
    use super::*;

    #[test]
    fn optimistic_plan_crosses_unknown_cells_at_manhattan_cost() {
        let store = store_after(Pos::new(8, 8), &[(Pos::new(0, 0), vec![])]);
        let plan = astar_plan(&store, origin(), Pos::new(8, 8), SearchMode::Optimistic)
            .expect("optimistic path");
        assert_eq!(plan.cost(), 16);
        assert_adjacent(&plan);
        assert!(first_unconfirmed(&store, &plan).is_some());
    }

    #[test]
    fn known_only_search_stays_inside_the_seen_area() {
        let store = store_after(Pos::new(8, 8), &[(Pos::new(0, 0), vec![])]);
        assert_eq!(
            astar_plan(&store, origin(), Pos::new(8, 8), SearchMode::KnownOnly),
            Err(SearchFailure::NoPathUnderCurrentKnowledge)
        );
        let plan = astar_plan(&store, origin(), Pos::new(1, 1), SearchMode::KnownOnly)
            .expect("known path");
        assert_eq!(plan.cost(), 2);
        assert_eq!(first_unconfirmed(&store, &plan), None);
    }

    #[test]
    fn tie_break_prefers_the_upper_row_first() {
        let store = store_after(Pos::new(1, 1), &[(Pos::new(0, 0), vec![])]);
        let plan = astar_plan(&store, origin(), Pos::new(1, 1), SearchMode::KnownOnly)
            .expect("path");
        assert_eq!(plan.waypoints[1].pos, Pos::new(1, 0));
    }

    #[test]
    fn plans_never_touch_forbidden_cells() {
        let store = store_after(
            Pos::new(4, 0),
            &[
                (Pos::new(0, 0), vec![]),
                (Pos::new(1, 0), vec![obs(2, 1, "P")]),
                (Pos::new(2, 0), vec![obs(3, 0, "P"), obs(2, 1, "P"), obs(3, 1, "H")]),
            ],
        );
        let plan = astar_plan(&store, origin(), Pos::new(4, 0), SearchMode::Optimistic)
            .expect("detour exists");
        assert_adjacent(&plan);
        for waypoint in &plan.waypoints {
            assert_ne!(store.passability(waypoint.pos, waypoint.shielded), Passability::Forbidden);
        }
        assert!(plan.cells().all(|pos| pos != Pos::new(3, 1)));
    }

    #[test]
    fn new_watch_on_the_plan_forces_a_different_plan() {
        let mut store = store_after(Pos::new(4, 0), &[(Pos::new(0, 0), vec![])]);
        let before = astar_plan(&store, origin(), Pos::new(4, 0), SearchMode::Optimistic)
            .expect("first plan");
        assert_eq!(before.cost(), 4);
        assert!(before.cells().any(|pos| pos == Pos::new(2, 0)));

        store.merge(Pos::new(1, 0), &[obs(2, 0, "P")]).expect("merge");
        let after = astar_plan(&store, origin(), Pos::new(4, 0), SearchMode::Optimistic)
            .expect("second plan");
        assert_eq!(after.cost(), 6);
        assert!(after.cells().all(|pos| pos != Pos::new(2, 0)));
        assert_adjacent(&after);
    }

    #[test]
    fn optimistic_shield_is_taken_from_unknown_cells_only_while_unlocated() {
        let store = store_after(Pos::new(8, 8), &[(Pos::new(0, 0), vec![])]);
        let waypoint = step(&store, origin(), Pos::new(2, 0), SearchMode::Optimistic)
            .expect("unknown cell is assumed passable");
        assert!(waypoint.shielded);
        assert_eq!(step(&store, origin(), Pos::new(2, 0), SearchMode::KnownOnly), None);
        assert_eq!(step(&store, origin(), Pos::new(-1, 0), SearchMode::Optimistic), None);
    }
}
