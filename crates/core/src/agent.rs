//! Exploration controller driving the oracle until the shortest safe length is proven.
//! This module exists to decide where to move next and when enough is known to answer.
//! It does not own the search primitives or how answers are folded into knowledge.

use log::{debug, info, warn};

use crate::config::{AgentConfig, Strategy};
use crate::error::{Result, SearchFailure};
use crate::knowledge::KnowledgeStore;
use crate::oracle::Oracle;
use crate::perception::{PerceptionVariant, manhattan, neighbors};
use crate::session::Session;
use crate::types::*;

mod backtracking;
mod explore;
pub mod impossibility;
pub mod pathfinding;
#[cfg(test)]
mod test_support;

use explore::*;
pub use impossibility::is_provably_unreachable;
pub use pathfinding::{SearchMode, astar_plan, first_unconfirmed};

type PlanResult = std::result::Result<Plan, SearchFailure>;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RunReport {
    pub outcome: RunOutcome,
    /// The proven plan from the start cell, when the goal is reachable.
    pub plan: Option<Plan>,
    pub moves: u32,
    pub fingerprint: u64,
}

pub struct Controller<O> {
    session: Session<O>,
    strategy: Strategy,
    start: Pos,
    walk_to_goal: bool,
    /// Informative move count at the last time cells given up on were reconsidered.
    reconsidered_at: Option<u32>,
}

impl<O: Oracle> Controller<O> {
    pub fn new(config: &AgentConfig, variant: PerceptionVariant, goal: Pos, oracle: O) -> Self {
        Self {
            session: Session::new(oracle, config, variant, goal),
            strategy: config.strategy,
            start: config.start,
            walk_to_goal: config.walk_to_goal,
            reconsidered_at: None,
        }
    }

    /// Plays one full run: observes the start cell, searches with the configured strategy
    /// and reports the answer to the oracle.
    pub fn run(&mut self) -> Result<RunReport> {
        info!(
            "seeking {} from {} with {:?} search",
            self.session.store().goal(),
            self.start,
            self.strategy
        );
        self.session.look()?;

        let found = match self.strategy {
            Strategy::Heuristic => self.run_heuristic()?,
            Strategy::Backtracking => backtracking::search(&mut self.session)?,
        };
        let (outcome, plan) = match found {
            Ok(plan) => (RunOutcome::Reached { length: plan.cost() }, Some(plan)),
            Err(SearchFailure::Inconclusive) => {
                warn!("{}", SearchFailure::Inconclusive);
                (RunOutcome::Inconclusive, None)
            }
            Err(failure) => {
                info!("{failure}");
                (RunOutcome::Unreachable, None)
            }
        };
        self.session.finish(outcome.answer())?;

        Ok(RunReport {
            outcome,
            plan,
            moves: self.session.agent().moves,
            fingerprint: self.session.store().fingerprint(),
        })
    }

    fn run_heuristic(&mut self) -> Result<PlanResult> {
        loop {
            let store = self.session.store();
            if is_provably_unreachable(store, self.session.waypoint()) {
                return Ok(Err(SearchFailure::ProvenUnreachable));
            }

            let start = Waypoint { pos: self.start, shielded: store.grants_shield(self.start, false) };
            let Ok(plan) = astar_plan(store, start, store.goal(), SearchMode::Optimistic) else {
                if store.unresolvable_count() == 0 {
                    return Ok(Err(SearchFailure::ProvenUnreachable));
                }
                // Cells were given up on, not disproved. Retry them once something new is known.
                let learned = self.session.learned();
                if self.reconsidered_at == Some(learned) {
                    return Ok(Err(SearchFailure::Inconclusive));
                }
                self.reconsidered_at = Some(learned);
                self.session.reconsider_unresolvable();
                continue;
            };
            let unconfirmed = first_unconfirmed(store, &plan);
            debug!("replanned: cost {}, first open question {unconfirmed:?}", plan.cost());
            self.session
                .record(LogEvent::Replanned { cost: plan.cost(), confirmed: unconfirmed.is_none() });

            let Some(waypoint) = unconfirmed else {
                if self.walk_to_goal {
                    self.walk_to_goal()?;
                }
                return Ok(Ok(plan));
            };
            self.explore_toward(waypoint.pos)?;
        }
    }

    /// Moves somewhere that settles the open question about `pos`, or gives up on it.
    fn explore_toward(&mut self, pos: Pos) -> Result<()> {
        let store = self.session.store();
        let (targets, reason) = reveal_targets(store, pos);
        if targets.is_empty() {
            self.session.mark_unresolvable(pos);
            return Ok(());
        }

        let from = self.session.waypoint();
        let route = route_to_reveal(store, from, &targets)
            .map(|route| (route, reason))
            .or_else(|| route_to_frontier(store, from).map(|route| (route, ExploreReason::Frontier)));
        let Some((route, reason)) = route else {
            self.session.mark_unresolvable(pos);
            return Ok(());
        };

        debug!("exploring {reason:?} {} via {} steps", route.target, route.plan.cost());
        self.session.record(LogEvent::ExploreTarget {
            target: route.target,
            reason,
            path_len: route.plan.cost(),
        });
        self.walk(&route.plan)?;
        Ok(())
    }

    /// Follows `plan` from the agent's cell. Stops early after any move that taught
    /// something new and reports whether that happened.
    fn walk(&mut self, plan: &Plan) -> Result<bool> {
        for waypoint in plan.waypoints.iter().skip(1) {
            if self.session.query(waypoint.pos)? {
                return Ok(true);
            }
        }
        Ok(false)
    }

    fn walk_to_goal(&mut self) -> Result<()> {
        let goal = self.session.store().goal();
        while self.session.agent().pos != goal {
            match astar_plan(self.session.store(), self.session.waypoint(), goal, SearchMode::KnownOnly)
            {
                Ok(plan) => {
                    self.walk(&plan)?;
                }
                Err(failure) => {
                    warn!("cannot walk onto the goal: {failure}");
                    break;
                }
            }
        }
        Ok(())
    }

    pub fn log(&self) -> &[LogEvent] {
        self.session.log()
    }

    pub fn session(&self) -> &Session<O> {
        &self.session
    }

    pub fn store(&self) -> &KnowledgeStore {
        self.session.store()
    }

    pub fn into_oracle(self) -> O {
        self.session.into_oracle()
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::*;
    use super::*;
    use crate::config::ShieldPolicy;
    use crate::world::World;

    // Hulks on the even columns of row 3 watch the odd ones; the shield sits at (2, 0).
    const HULK_ROW_LAYOUT: [&str; 9] = [
        ". . S . . . . . .",
        ". . . . . . . . .",
        ". . . . . . . . .",
        "H . H . H . H . H",
        ". . . . . . . . .",
        ". . . . . . . . .",
        ". . . . . . . . .",
        ". . . . . . . . .",
        ". . . . I . . . .",
    ];

    #[test]
    fn open_field_run_reports_manhattan_length_and_ends_on_goal() {
        let world = open_world(Pos::new(3, 1));
        for strategy in [Strategy::Heuristic, Strategy::Backtracking] {
            let (report, oracle) = run_world(&world, &AgentConfig::with_strategy(strategy));
            assert_eq!(report.outcome, RunOutcome::Reached { length: 4 }, "{strategy:?}");
            assert_eq!(oracle.answer(), Some(4));
            let plan = report.plan.expect("plan");
            assert!(world.is_valid_path(&plan.cells().collect::<Vec<_>>()));
        }
        let (_, oracle) = run_world(&world, &AgentConfig::default());
        assert_eq!(oracle.pos(), Pos::new(3, 1));
    }

    #[test]
    fn boxed_goal_is_reported_unreachable_before_the_map_is_known() {
        let world = boxed_goal_world();
        let config = AgentConfig::default();
        let mut controller = Controller::new(&config, world.variant(), world.goal(), world.oracle());
        let report = controller.run().expect("run");
        assert_eq!(report.outcome.answer(), -1);
        assert_eq!(report.plan, None);
        assert!(controller.store().unknown_count() > 0);
        assert_eq!(controller.log().last(), Some(&LogEvent::Finished { answer: -1 }));

        let (report, oracle) = run_world(&world, &AgentConfig::with_strategy(Strategy::Backtracking));
        assert_eq!(report.outcome, RunOutcome::Unreachable);
        assert_eq!(oracle.answer(), Some(-1));
    }

    #[test]
    fn first_request_observes_the_start_cell() {
        let world = open_world(Pos::new(8, 8));
        let config = AgentConfig::default();
        let mut controller = Controller::new(&config, world.variant(), world.goal(), world.oracle());
        controller.run().expect("run");
        let first = controller.log().first();
        assert_eq!(first, Some(&LogEvent::Moved { to: Pos::new(0, 0), changed: true }));
    }

    #[test]
    fn reported_length_is_the_plan_cost_not_the_moves_taken() {
        let world = layout_world(&[
            ". . . . . . . . .",
            ". . . . . . . . .",
            ". . . . . . . . .",
            ". . . . T . . . .",
            ". . . . . . . . .",
            ". . . . . . . . .",
            ". . . . . . . . .",
            ". . . . . . . . .",
            ". . . . . . . . I",
        ]);
        let (report, oracle) = run_world(&world, &AgentConfig::default());
        assert_eq!(report.outcome.answer(), 16);
        assert!(report.moves >= 16);
        assert_eq!(oracle.moves(), report.moves);
    }

    #[test]
    fn shield_opens_a_route_only_when_the_policy_allows_it() {
        let world = layout_world_with(PerceptionVariant::Ears, &HULK_ROW_LAYOUT);
        assert_eq!(world.shortest_path_len(), Some(12));

        let (report, oracle) = run_world(&world, &AgentConfig::default());
        assert_eq!(report.outcome, RunOutcome::Reached { length: 12 });
        let plan = report.plan.expect("plan");
        assert!(world.is_valid_path(&plan.cells().collect::<Vec<_>>()));
        assert_eq!(oracle.pos(), world.goal());

        let config = AgentConfig { shield: ShieldPolicy::none(), ..AgentConfig::default() };
        let strict = World::from_layout(&config, PerceptionVariant::Ears, &HULK_ROW_LAYOUT)
            .expect("layout");
        assert_eq!(strict.shortest_path_len(), None);
        let (report, _) = run_world(&strict, &config);
        assert_eq!(report.outcome, RunOutcome::Unreachable);
    }

    #[test]
    fn crossing_that_cannot_be_verified_is_inconclusive_not_unreachable() {
        // With the near window no safe cell ever sees past row 3, so a Captain Marvel
        // below the wall can never be ruled out.
        let world = layout_world(&HULK_ROW_LAYOUT);
        assert_eq!(world.shortest_path_len(), Some(12));

        let config = AgentConfig::default();
        let mut controller = Controller::new(&config, world.variant(), world.goal(), world.oracle());
        let report = controller.run().expect("run");
        assert_eq!(report.outcome, RunOutcome::Inconclusive);
        assert_eq!(report.outcome.answer(), -1);
        assert!(controller.log().iter().any(|event| matches!(event, LogEvent::Reconsidered { .. })));
        assert!(!is_provably_unreachable(controller.store(), controller.session().waypoint()));

        let (report, _) = run_world(&world, &AgentConfig::with_strategy(Strategy::Backtracking));
        assert_eq!(report.outcome, RunOutcome::Inconclusive);
    }

    #[test]
    fn shielded_detour_through_a_hulk_zone_is_found() {
        let world = layout_world_with(PerceptionVariant::Ears, &[
            ". S . . . . . . .",
            ". . . . . . . . .",
            ". . . . . . . . .",
            "H H H H H H H H .",
            ". . . . . . . . .",
            ". . . . . . . . .",
            ". . . . . . . . .",
            ". . . . . . . . .",
            "I . . . . . . . .",
        ]);
        assert_eq!(world.shortest_path_len(), Some(24));
        let (report, oracle) = run_world(&world, &AgentConfig::default());
        assert_eq!(report.outcome, RunOutcome::Reached { length: 24 });
        let plan = report.plan.expect("plan");
        assert!(world.is_valid_path(&plan.cells().collect::<Vec<_>>()));
        let crossing = Waypoint { pos: Pos::new(8, 3), shielded: true };
        assert!(plan.waypoints.contains(&crossing));
        assert_eq!(oracle.answer(), Some(24));
    }

    #[test]
    fn backtracking_ends_where_it_started() {
        let world = open_world(Pos::new(2, 2));
        let config = AgentConfig::with_strategy(Strategy::Backtracking);
        let mut controller = Controller::new(&config, world.variant(), world.goal(), world.oracle());
        let report = controller.run().expect("run");
        assert_eq!(report.outcome.answer(), 4);
        assert_eq!(controller.session().agent().pos, Pos::new(0, 0));
        assert!(controller.log().iter().any(|event| matches!(event, LogEvent::Backtracked { .. })));
    }

    #[test]
    fn goal_on_the_start_cell_costs_nothing() {
        let world = open_world(Pos::new(0, 0));
        let (report, _) = run_world(&world, &AgentConfig::default());
        assert_eq!(report.outcome, RunOutcome::Reached { length: 0 });
        assert_eq!(report.moves, 1);
    }
}
