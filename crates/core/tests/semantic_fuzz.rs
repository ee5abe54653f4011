use proptest::{
    arbitrary::any,
    test_runner::{Config as ProptestConfig, TestCaseError, TestRunner},
};
use rand_chacha::{
    ChaCha8Rng,
    rand_core::{Rng, SeedableRng},
};
use seeker::{
    AgentConfig, Controller, KnowledgeStore, LogEvent, PerceptionVariant, Pos, RunOutcome,
    Strategy, World,
};

fn variant_for(seed: u64) -> PerceptionVariant {
    if seed % 2 == 0 { PerceptionVariant::Near } else { PerceptionVariant::Ears }
}

fn run_fuzz_world(seed: u64, strategy: Strategy, with_shield: bool) -> Result<(), String> {
    let config = AgentConfig::with_strategy(strategy);
    let world = World::generate(seed, &config, variant_for(seed), with_shield);
    let truth = world.shortest_path_len();

    let mut controller = Controller::new(&config, world.variant(), world.goal(), world.oracle());
    let report = controller.run().map_err(|e| format!("seed {seed}: run failed: {e}"))?;

    let mut previous = config.start;
    for event in controller.log() {
        if let LogEvent::Moved { to, .. } = event {
            if previous.x.abs_diff(to.x) + previous.y.abs_diff(to.y) > 1 {
                return Err(format!("seed {seed}: teleport from {previous} to {to}"));
            }
            previous = *to;
        }
    }

    match (report.outcome, truth) {
        (RunOutcome::Reached { length }, Some(shortest)) => {
            if length < shortest {
                return Err(format!("seed {seed}: reported {length} below truth {shortest}"));
            }
            if !with_shield && length != shortest {
                return Err(format!("seed {seed}: reported {length}, truth {shortest}"));
            }
            let plan = report.plan.ok_or_else(|| format!("seed {seed}: no plan"))?;
            let cells: Vec<Pos> = plan.cells().collect();
            if !world.is_valid_path(&cells) {
                return Err(format!("seed {seed}: plan {cells:?} is not walkable"));
            }
        }
        (RunOutcome::Reached { length }, None) => {
            return Err(format!("seed {seed}: reported {length} for an unreachable goal"));
        }
        (RunOutcome::Unreachable, Some(shortest)) => {
            return Err(format!("seed {seed}: proved a goal {shortest} steps away unreachable"));
        }
        (RunOutcome::Inconclusive, _) if !with_shield => {
            return Err(format!("seed {seed}: inconclusive without a shield, truth {truth:?}"));
        }
        (RunOutcome::Unreachable | RunOutcome::Inconclusive, _) => {}
    }
    Ok(())
}

#[test]
fn test_fuzz_shield_free_worlds_match_ground_truth() {
    let mut runner = TestRunner::new(ProptestConfig::with_cases(24));
    runner
        .run(&any::<u64>(), |seed| {
            for strategy in [Strategy::Heuristic, Strategy::Backtracking] {
                run_fuzz_world(seed, strategy, false).map_err(TestCaseError::fail)?;
            }
            Ok(())
        })
        .expect("agent should report the exact shortest length");
}

#[test]
fn test_fuzz_shield_worlds_stay_sound() {
    let mut runner = TestRunner::new(ProptestConfig::with_cases(24));
    runner
        .run(&any::<u64>(), |seed| {
            for strategy in [Strategy::Heuristic, Strategy::Backtracking] {
                run_fuzz_world(seed, strategy, true).map_err(TestCaseError::fail)?;
            }
            Ok(())
        })
        .expect("agent answers should never undercut or invent a path");
}

#[test]
fn test_fuzz_merge_is_idempotent_and_monotone() {
    let mut runner = TestRunner::new(ProptestConfig::with_cases(32));
    let seeds = (any::<u64>(), any::<u64>());
    runner
        .run(&seeds, |(world_seed, visit_seed)| {
            let config = AgentConfig::default();
            let variant = variant_for(world_seed);
            let world = World::generate(world_seed, &config, variant, true);
            let mut store = KnowledgeStore::new(&config, variant, world.goal());
            let mut rng = ChaCha8Rng::seed_from_u64(visit_seed);

            let mut known_before = 0;
            for _ in 0..12 {
                let center = Pos::new(
                    (rng.next_u64() % config.grid_size as u64) as i32,
                    (rng.next_u64() % config.grid_size as u64) as i32,
                );
                if world.observer_at(center).is_some() {
                    continue;
                }
                let reports = world.observe(center);
                store.merge(center, &reports).map_err(|e| TestCaseError::fail(e.to_string()))?;
                let fingerprint = store.fingerprint();
                let changed =
                    store.merge(center, &reports).map_err(|e| TestCaseError::fail(e.to_string()))?;
                if changed || store.fingerprint() != fingerprint {
                    let message = format!("second merge at {center} changed the store");
                    return Err(TestCaseError::fail(message));
                }

                let known = 81 - store.unknown_count();
                if known < known_before {
                    return Err(TestCaseError::fail("knowledge shrank"));
                }
                known_before = known;

                for (pos, kind) in store.observers() {
                    if world.observer_at(pos) != Some(kind) {
                        return Err(TestCaseError::fail(format!("phantom {kind:?} at {pos}")));
                    }
                }
            }
            Ok(())
        })
        .expect("merging real observations should be idempotent");
}
