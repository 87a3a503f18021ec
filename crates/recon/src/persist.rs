//! Records handed to the inventory store, and the store contract itself.
//!
//! Saving is upsert-then-insert: master records are upserted on
//! `(location, product, lot)`, the store returns identifiers, and count
//! records referencing those identifiers are appended.

use std::collections::HashMap;

use serde::Serialize;

use crate::error::{PersistStage, ReconError, StoreError};
use crate::model::{CompositeKey, Counts, PendingItem, ReconRun};

/// Status labels the store must not hand out as pending.
pub const RESOLVED_LABELS: [&str; 2] = ["OK", "Finalizado"];

/// One row per item, upserted on its composite key.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MasterRecord {
    #[serde(flatten)]
    pub key: CompositeKey,
    pub description: String,
    pub system_qty: f64,
    pub status: String,
}

/// A count waiting for its item's identifier.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CountDraft {
    pub key: CompositeKey,
    pub round: u8,
    pub quantity: f64,
    pub user: String,
}

/// Append-only count observation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CountRecord {
    pub item_id: i64,
    pub round: u8,
    pub quantity: f64,
    pub user: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PersistPayload {
    pub masters: Vec<MasterRecord>,
    pub counts: Vec<CountDraft>,
}

impl PersistPayload {
    /// Attach store identifiers to the drafts. Drafts whose key the store did
    /// not return are dropped.
    pub fn resolve_counts(&self, ids: &HashMap<CompositeKey, i64>) -> Vec<CountRecord> {
        self.counts
            .iter()
            .filter_map(|d| {
                let Some(&item_id) = ids.get(&d.key) else {
                    tracing::warn!(item = %d.key, round = d.round, "no identifier returned for item, count not saved");
                    return None;
                };
                Some(CountRecord {
                    item_id,
                    round: d.round,
                    quantity: d.quantity,
                    user: d.user.clone(),
                })
            })
            .collect()
    }
}

/// Persistent store of items and their count history.
pub trait InventoryStore {
    /// Items whose status is not in [`RESOLVED_LABELS`].
    fn pending_items(&self) -> Result<Vec<PendingItem>, StoreError>;

    /// Upsert on `(location, product, lot)`; returns the identifier of every record.
    fn upsert_items(&mut self, masters: &[MasterRecord]) -> Result<Vec<(i64, CompositeKey)>, StoreError>;

    fn insert_counts(&mut self, counts: &[CountRecord]) -> Result<(), StoreError>;
}

/// Project a run into master records and count drafts.
///
/// Initial mode records rounds 1 and 2 when their file was supplied; audit
/// mode records the round's count only when it is nonzero.
pub fn build_payload(run: &ReconRun) -> PersistPayload {
    let mut payload = PersistPayload::default();

    for item in &run.items {
        payload.masters.push(MasterRecord {
            key: item.key.clone(),
            description: item.description.clone(),
            system_qty: item.system_qty,
            status: item.status.label().to_string(),
        });

        match &item.counts {
            Counts::Initial { round1, round2 } => {
                for (round, tally) in [(1u8, round1), (2u8, round2)] {
                    if let Some(t) = tally {
                        payload.counts.push(CountDraft {
                            key: item.key.clone(),
                            round,
                            quantity: t.qty,
                            user: t.user.clone(),
                        });
                    }
                }
            }
            Counts::Audit { round, tally } => {
                if tally.qty != 0.0 {
                    payload.counts.push(CountDraft {
                        key: item.key.clone(),
                        round: *round,
                        quantity: tally.qty,
                        user: tally.user.clone(),
                    });
                }
            }
        }
    }

    payload
}

/// Outcome of a save.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SaveReport {
    pub items_upserted: usize,
    pub counts_inserted: usize,
}

/// Upsert the run's items, then append their counts.
///
/// A failure leaves `run` untouched; the caller may retry or export it.
pub fn save_run<S: InventoryStore + ?Sized>(store: &mut S, run: &ReconRun) -> Result<SaveReport, ReconError> {
    let payload = build_payload(run);

    let saved = store
        .upsert_items(&payload.masters)
        .map_err(|e| ReconError::persistence(PersistStage::UpsertItems, e))?;
    let ids: HashMap<CompositeKey, i64> = saved.into_iter().map(|(id, key)| (key, id)).collect();

    let counts = payload.resolve_counts(&ids);
    if !counts.is_empty() {
        store
            .insert_counts(&counts)
            .map_err(|e| ReconError::persistence(PersistStage::InsertCounts, e))?;
    }

    tracing::info!(
        mode = %run.meta.mode,
        items = payload.masters.len(),
        counts = counts.len(),
        "run saved"
    );

    Ok(SaveReport {
        items_upserted: ids.len(),
        counts_inserted: counts.len(),
    })
}

/// Read the pending set for an audit round.
pub fn load_pending<S: InventoryStore + ?Sized>(store: &S) -> Result<Vec<PendingItem>, ReconError> {
    store
        .pending_items()
        .map_err(|e| ReconError::persistence(PersistStage::SelectPending, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evidence::compute_summary;
    use crate::model::{Action, InventoryItem, RunMeta, RunMode, Status, Tally};

    #[derive(Default)]
    struct MemoryStore {
        items: Vec<(i64, MasterRecord)>,
        counts: Vec<CountRecord>,
        fail_insert: bool,
    }

    impl InventoryStore for MemoryStore {
        fn pending_items(&self) -> Result<Vec<PendingItem>, StoreError> {
            Ok(self
                .items
                .iter()
                .filter(|(_, m)| !RESOLVED_LABELS.contains(&m.status.as_str()))
                .map(|(id, m)| PendingItem {
                    id: *id,
                    key: m.key.clone(),
                    description: m.description.clone(),
                    system_qty: m.system_qty,
                    last_status: m.status.clone(),
                })
                .collect())
        }

        fn upsert_items(&mut self, masters: &[MasterRecord]) -> Result<Vec<(i64, CompositeKey)>, StoreError> {
            let mut out = Vec::new();
            for m in masters {
                let id = match self.items.iter_mut().find(|(_, existing)| existing.key == m.key) {
                    Some((id, existing)) => {
                        *existing = m.clone();
                        *id
                    }
                    None => {
                        let id = self.items.len() as i64 + 1;
                        self.items.push((id, m.clone()));
                        id
                    }
                };
                out.push((id, m.key.clone()));
            }
            Ok(out)
        }

        fn insert_counts(&mut self, counts: &[CountRecord]) -> Result<(), StoreError> {
            if self.fail_insert {
                return Err(StoreError::new("disk full"));
            }
            self.counts.extend_from_slice(counts);
            Ok(())
        }
    }

    fn key(location: &str) -> CompositeKey {
        CompositeKey {
            location: location.into(),
            product: "111".into(),
            lot: "L1".into(),
        }
    }

    fn item(location: &str, status: Status, counts: Counts) -> InventoryItem {
        InventoryItem {
            id: None,
            key: key(location),
            description: "Caneta".into(),
            system_qty: 5.0,
            counts,
            status,
            action: Action::Finalized,
            expected_locations: vec![],
        }
    }

    fn run(mode: RunMode, items: Vec<InventoryItem>) -> ReconRun {
        ReconRun {
            meta: RunMeta {
                mode,
                engine_version: "test".into(),
                run_at: String::new(),
            },
            summary: compute_summary(&items, 0),
            items,
        }
    }

    fn t(qty: f64, user: &str) -> Tally {
        Tally { qty, user: user.into() }
    }

    #[test]
    fn initial_payload_records_supplied_rounds() {
        let r = run(
            RunMode::Initial,
            vec![
                item("A1", Status::Ok, Counts::Initial { round1: Some(t(5.0, "ana")), round2: Some(t(5.0, "bia")) }),
                item("A2", Status::Shortage, Counts::Initial { round1: None, round2: Some(t(0.0, "")) }),
            ],
        );
        let payload = build_payload(&r);
        assert_eq!(payload.masters.len(), 2);
        assert_eq!(payload.masters[0].status, "OK");
        let rounds: Vec<(String, u8)> = payload.counts.iter().map(|c| (c.key.location.clone(), c.round)).collect();
        assert_eq!(rounds, vec![("A1".into(), 1), ("A1".into(), 2), ("A2".into(), 2)]);
    }

    #[test]
    fn audit_payload_skips_zero_counts() {
        let r = run(
            RunMode::Audit(4),
            vec![
                item("A1", Status::Pending, Counts::Audit { round: 4, tally: t(0.0, "") }),
                item("A2", Status::Ok, Counts::Audit { round: 4, tally: t(5.0, "caio") }),
            ],
        );
        let payload = build_payload(&r);
        assert_eq!(payload.masters.len(), 2);
        assert_eq!(payload.counts.len(), 1);
        assert_eq!(payload.counts[0].round, 4);
        assert_eq!(payload.counts[0].user, "caio");
    }

    #[test]
    fn save_then_reload_pending() {
        let mut store = MemoryStore::default();
        let r = run(
            RunMode::Initial,
            vec![
                item("A1", Status::Surplus, Counts::Initial { round1: Some(t(9.0, "")), round2: Some(t(9.0, "")) }),
                item("A2", Status::Ok, Counts::Initial { round1: Some(t(5.0, "")), round2: Some(t(5.0, "")) }),
            ],
        );
        let report = save_run(&mut store, &r).unwrap();
        assert_eq!(report, SaveReport { items_upserted: 2, counts_inserted: 4 });

        let pending = load_pending(&store).unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].key, key("A1"));
        assert_eq!(pending[0].last_status, "SOBRA");

        // Saving again upserts in place.
        save_run(&mut store, &r).unwrap();
        assert_eq!(store.items.len(), 2);
        assert_eq!(store.counts.len(), 8);
    }

    #[test]
    fn insert_failure_names_stage_and_keeps_run() {
        let mut store = MemoryStore {
            fail_insert: true,
            ..Default::default()
        };
        let r = run(
            RunMode::Initial,
            vec![item("A1", Status::Ok, Counts::Initial { round1: Some(t(5.0, "")), round2: Some(t(5.0, "")) })],
        );
        let err = save_run(&mut store, &r).unwrap_err();
        assert!(matches!(err, ReconError::Persistence { stage: PersistStage::InsertCounts, .. }));
        assert!(err.to_string().contains("disk full"));
        assert_eq!(r.items[0].status, Status::Ok);
    }

    #[test]
    fn unresolved_drafts_are_dropped() {
        let payload = PersistPayload {
            masters: vec![],
            counts: vec![CountDraft { key: key("A1"), round: 1, quantity: 1.0, user: String::new() }],
        };
        assert!(payload.resolve_counts(&HashMap::new()).is_empty());
    }
}
