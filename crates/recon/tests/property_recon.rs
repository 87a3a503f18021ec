// Property-based tests for aggregation and classification.
// CI: 256 cases (default). Soak: PROPTEST_CASES=10000 cargo test --release

use std::collections::HashMap;

use proptest::prelude::*;
use stocktake_recon::classify::{audit_verdict, initial_verdict, FINAL_AUDIT_ROUND};
use stocktake_recon::model::{Action, CompositeKey, Counts, Origin, Status};
use stocktake_recon::{process_initial, FieldAliases, InitialInput, RawRow};

// ---------------------------------------------------------------------------
// Config
// ---------------------------------------------------------------------------

fn config_256() -> ProptestConfig {
    ProptestConfig {
        cases: std::env::var("PROPTEST_CASES")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(256),
        failure_persistence: None,
        ..ProptestConfig::default()
    }
}

// ---------------------------------------------------------------------------
// Generators
// ---------------------------------------------------------------------------

/// Whole-unit quantities keep float sums exact.
fn arb_qty() -> impl Strategy<Value = i32> {
    0..50i32
}

/// (location, product, lot, qty) drawn from a small key space so keys collide.
fn arb_entry() -> impl Strategy<Value = (String, String, String, i32)> {
    (
        prop::sample::select(vec!["A1", "a1", "A2", " B1 "]),
        prop::sample::select(vec!["111", "222"]),
        prop::sample::select(vec!["", "L1", "l1"]),
        arb_qty(),
    )
        .prop_map(|(l, p, lot, q)| (l.to_string(), p.to_string(), lot.to_string(), q))
}

fn system_row(e: &(String, String, String, i32)) -> RawRow {
    RawRow::new()
        .with("Localização", e.0.as_str())
        .with("GTIN", e.1.as_str())
        .with("Lote", e.2.as_str())
        .with("Armazenado", e.3.to_string())
}

fn count_row(e: &(String, String, String, i32)) -> RawRow {
    RawRow::new()
        .with("Local", e.0.as_str())
        .with("Codigo", e.1.as_str())
        .with("Batch", e.2.as_str())
        .with("Quantidade_Contada", e.3.to_string())
}

fn key_of(e: &(String, String, String, i32)) -> CompositeKey {
    CompositeKey {
        location: e.0.trim().to_uppercase(),
        product: e.1.trim().to_uppercase(),
        lot: e.2.trim().to_uppercase(),
    }
}

fn sums(entries: &[(String, String, String, i32)]) -> HashMap<CompositeKey, f64> {
    let mut out = HashMap::new();
    for e in entries {
        *out.entry(key_of(e)).or_insert(0.0) += f64::from(e.3);
    }
    out
}

// ---------------------------------------------------------------------------
// Properties
// ---------------------------------------------------------------------------

proptest! {
    #![proptest_config(config_256())]

    #[test]
    fn accumulated_quantities_equal_row_sums(
        system in prop::collection::vec(arb_entry(), 1..12),
        round1 in prop::collection::vec(arb_entry(), 0..12),
        round2 in prop::collection::vec(arb_entry(), 0..12),
    ) {
        let input = InitialInput {
            system: Some(system.iter().map(system_row).collect()),
            round1: Some(round1.iter().map(count_row).collect()),
            round2: Some(round2.iter().map(count_row).collect()),
        };
        let run = process_initial(&input, &FieldAliases::default()).unwrap();

        let (sys_sums, r1_sums, r2_sums) = (sums(&system), sums(&round1), sums(&round2));
        for item in &run.items {
            let Counts::Initial { round1: Some(t1), round2: Some(t2) } = &item.counts else {
                panic!("both rounds supplied");
            };
            prop_assert_eq!(item.system_qty, sys_sums.get(&item.key).copied().unwrap_or(0.0));
            prop_assert_eq!(t1.qty, r1_sums.get(&item.key).copied().unwrap_or(0.0));
            prop_assert_eq!(t2.qty, r2_sums.get(&item.key).copied().unwrap_or(0.0));
        }

        let mut all_keys: Vec<CompositeKey> = system.iter().chain(&round1).chain(&round2).map(key_of).collect();
        all_keys.sort();
        all_keys.dedup();
        prop_assert_eq!(run.items.len(), all_keys.len());
    }

    #[test]
    fn ok_items_always_trail(
        system in prop::collection::vec(arb_entry(), 1..12),
        round2 in prop::collection::vec(arb_entry(), 0..12),
    ) {
        let input = InitialInput {
            system: Some(system.iter().map(system_row).collect()),
            round1: None,
            round2: Some(round2.iter().map(count_row).collect()),
        };
        let run = process_initial(&input, &FieldAliases::default()).unwrap();
        let first_ok = run.items.iter().position(|i| i.status == Status::Ok).unwrap_or(run.items.len());
        prop_assert!(run.items[first_ok..].iter().all(|i| i.status == Status::Ok));
    }

    #[test]
    fn initial_ok_iff_location_matches_and_balanced(
        r1 in prop::option::of(arb_qty()),
        r2 in prop::option::of(arb_qty()),
        sys in arb_qty(),
        balanced in any::<bool>(),
    ) {
        let (r1, r2, sys) = (r1.map(f64::from), r2.map(f64::from), f64::from(sys));
        let (status, _) = initial_verdict(r1, r2, sys, balanced);
        let diverged = matches!((r1, r2), (Some(a), Some(b)) if a != b);

        if diverged {
            prop_assert_eq!(status, Status::CountDivergence);
        } else {
            prop_assert_eq!(status == Status::Ok, balanced && r2.unwrap_or(0.0) == sys);
        }
    }

    #[test]
    fn escalation_is_capped(
        round in 3u8..=6,
        audit_qty in 1..50i32,
        sys in arb_qty(),
    ) {
        let (audit_qty, sys) = (f64::from(audit_qty), f64::from(sys));
        let (status, action) = audit_verdict(Origin::Expected, audit_qty, sys, round);
        if audit_qty == sys {
            prop_assert_eq!(status, Status::Ok);
        } else if round < FINAL_AUDIT_ROUND {
            prop_assert_eq!(action, Action::SendToRound(round + 1));
        } else {
            prop_assert_eq!(action, Action::AdjustSystem);
        }
        prop_assert_ne!(action, Action::SendToRound(7));
    }
}
