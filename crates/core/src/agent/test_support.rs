//! Shared fixtures for the `agent` submodule test suites.
//! This module exists to avoid repeating store and world setup across many tests.
//! It does not own production planning logic.

use super::*;
use crate::world::{World, WorldOracle};

pub(super) fn obs(x: i32, y: i32, symbol: &str) -> Observation {
    Observation::new(Pos::new(x, y), Marker::from_symbol(symbol).expect("known symbol"))
}

pub(super) fn origin() -> Waypoint {
    Waypoint { pos: Pos::new(0, 0), shielded: false }
}

/// A default-config store after merging each `(center, reports)` batch in order.
pub(super) fn store_after(goal: Pos, batches: &[(Pos, Vec<Observation>)]) -> KnowledgeStore {
    let mut store = KnowledgeStore::new(&AgentConfig::default(), PerceptionVariant::Near, goal);
    for (center, reports) in batches {
        store.merge(*center, reports).expect("consistent batch");
    }
    store
}

pub(super) fn assert_adjacent(plan: &Plan) {
    for pair in plan.waypoints.windows(2) {
        assert_eq!(manhattan(pair[0].pos, pair[1].pos), 1, "{:?} -> {:?}", pair[0], pair[1]);
    }
}

/// What the agent sees from the goal of [`boxed_goal_world`].
pub(super) fn hulk_ring_reports() -> Vec<Observation> {
    vec![
        obs(3, 3, "P"),
        obs(4, 3, "H"),
        obs(5, 3, "P"),
        obs(3, 4, "H"),
        obs(4, 4, "P"),
        obs(5, 4, "H"),
        obs(3, 5, "P"),
        obs(4, 5, "H"),
        obs(5, 5, "P"),
    ]
}

pub(super) fn open_world(goal: Pos) -> World {
    World::new(&AgentConfig::default(), PerceptionVariant::Near, goal)
}

pub(super) fn layout_world(rows: &[&str]) -> World {
    layout_world_with(PerceptionVariant::Near, rows)
}

pub(super) fn layout_world_with(variant: PerceptionVariant, rows: &[&str]) -> World {
    World::from_layout(&AgentConfig::default(), variant, rows).expect("valid layout")
}

/// Stone at (4, 4) with a Hulk on each of its four sides.
pub(super) fn boxed_goal_world() -> World {
    layout_world(&[
        ". . . . . . . . .",
        ". . . . . . . . .",
        ". . . . . . . . .",
        ". . . . H . . . .",
        ". . . H I H . . .",
        ". . . . H . . . .",
        ". . . . . . . . .",
        ". . . . . . . . .",
        ". . . . . . . . .",
    ])
}

pub(super) fn run_world(world: &World, config: &AgentConfig) -> (RunReport, WorldOracle) {
    let mut controller = Controller::new(config, world.variant(), world.goal(), world.oracle());
    let report = controller.run().expect("run should finish");
    (report, controller.into_oracle())
}
