//! Arbitrary command sequences against the default fleet.

use ovenwatch_common::{
    ChamberRegistry, ChamberStatus, CommandError, FleetConfig, OFF_CYCLE_NAME,
};
use proptest::prelude::*;

#[derive(Debug, Clone)]
enum Op {
    Start(u32),
    Stop(u32),
    Resume(u32),
    ApplyCycle(u32, u32),
    PowerFailure(u32),
    PowerRestored(u32),
    Temperature(u32, f32),
}

fn arb_op() -> impl Strategy<Value = Op> {
    // Chamber 5 and cycle 4 do not exist.
    let chamber = 1u32..=5;
    prop_oneof![
        chamber.clone().prop_map(Op::Start),
        chamber.clone().prop_map(Op::Stop),
        chamber.clone().prop_map(Op::Resume),
        (chamber.clone(), 1u32..=4).prop_map(|(id, cycle)| Op::ApplyCycle(id, cycle)),
        chamber.clone().prop_map(Op::PowerFailure),
        chamber.clone().prop_map(Op::PowerRestored),
        (chamber, -100.0f32..500.0).prop_map(|(id, temp)| Op::Temperature(id, temp)),
    ]
}

fn apply(registry: &mut ChamberRegistry, op: &Op, now_ms: u64) -> Result<(), CommandError> {
    match *op {
        Op::Start(id) => registry.start(id, now_ms),
        Op::Stop(id) => registry.stop(id, now_ms),
        Op::Resume(id) => registry.resume(id, now_ms),
        Op::ApplyCycle(id, cycle) => registry.apply_cycle(id, cycle, now_ms),
        Op::PowerFailure(id) => registry.signal_power_failure(id, now_ms),
        Op::PowerRestored(id) => registry.signal_power_restored(id, now_ms),
        Op::Temperature(id, temp) => registry.record_temperature(id, temp),
    }
}

proptest! {
    #[test]
    fn invariants_hold_for_any_sequence(ops in proptest::collection::vec(arb_op(), 1..64)) {
        let mut registry = ChamberRegistry::new(FleetConfig::default(), 0).unwrap();

        for (step, op) in ops.iter().enumerate() {
            let now_ms = (step as u64 + 1) * 60_000;
            let before = registry.snapshot(now_ms);
            let events_before: Vec<_> = registry
                .chamber_ids()
                .map(|id| registry.events(id).unwrap().len())
                .collect();

            let result = apply(&mut registry, op, now_ms);
            let after = registry.snapshot(now_ms);

            if result.is_err() {
                prop_assert_eq!(&before, &after, "rejected {:?} mutated state", op);
                let events_after: Vec<_> = registry
                    .chamber_ids()
                    .map(|id| registry.events(id).unwrap().len())
                    .collect();
                prop_assert_eq!(events_before, events_after);
            }

            for chamber in &after {
                prop_assert!(
                    !(chamber.power_failure && chamber.power_restored),
                    "chamber {} reports failure and restoration",
                    chamber.id
                );
                if chamber.status == ChamberStatus::Idle {
                    prop_assert_eq!(chamber.active_cycle_name.as_str(), OFF_CYCLE_NAME);
                    prop_assert_eq!(chamber.target_temperature, None);
                }
                prop_assert_eq!(
                    chamber.resume_plan.is_some(),
                    chamber.power_failure || chamber.power_restored
                );
            }
        }
    }

    #[test]
    fn start_and_stop_stay_blocked_until_resume(
        chamber in 1u32..=4,
        ops in proptest::collection::vec(arb_op(), 0..16),
    ) {
        let mut registry = ChamberRegistry::new(FleetConfig::default(), 0).unwrap();
        registry.signal_power_failure(chamber, 0).unwrap();

        for (step, op) in ops.iter().enumerate() {
            let now_ms = (step as u64 + 1) * 1_000;
            let resumes_target = matches!(op, Op::Resume(id) if *id == chamber);
            if resumes_target {
                break;
            }

            let _ = apply(&mut registry, op, now_ms);

            prop_assert!(registry.start(chamber, now_ms).unwrap_err().is_invalid_transition());
            prop_assert!(registry.stop(chamber, now_ms).unwrap_err().is_invalid_transition());
        }
    }

    #[test]
    fn apply_cycle_twice_matches_once(chamber in 1u32..=4, cycle in 1u32..=3) {
        let mut config = FleetConfig::default();
        for seed in &mut config.chambers {
            seed.power = None;
        }
        let mut registry = ChamberRegistry::new(config, 0).unwrap();

        registry.apply_cycle(chamber, cycle, 0).unwrap();
        let once = registry.chamber(chamber, 0).unwrap();
        registry.apply_cycle(chamber, cycle, 0).unwrap();
        let twice = registry.chamber(chamber, 0).unwrap();

        prop_assert_eq!(once.active_cycle_name, twice.active_cycle_name);
        prop_assert_eq!(once.target_temperature, twice.target_temperature);
        prop_assert_eq!(once.time_remaining, twice.time_remaining);
        prop_assert_eq!(once.configured_cycle, twice.configured_cycle);
    }
}
