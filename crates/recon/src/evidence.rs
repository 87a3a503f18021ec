use std::collections::HashMap;

use crate::model::{InventoryItem, RunSummary, Status};

/// Compute summary statistics from classified items.
pub fn compute_summary(items: &[InventoryItem], excluded_rows: usize) -> RunSummary {
    let mut status_counts: HashMap<String, usize> = HashMap::new();
    let mut resolved = 0;
    let mut ok_family = 0;
    let mut divergences = 0;
    let mut transfers = 0;
    let mut pending = 0;

    for item in items {
        *status_counts.entry(item.status.to_string()).or_insert(0) += 1;

        if item.status.is_resolved() {
            resolved += 1;
        }
        if item.status.is_ok_family() {
            ok_family += 1;
        } else if item.status.is_transfer() {
            transfers += 1;
        } else {
            divergences += 1;
        }
        if item.status == Status::Pending {
            pending += 1;
        }
    }

    RunSummary {
        total_items: items.len(),
        resolved,
        ok_family,
        divergences,
        transfers,
        pending,
        excluded_rows,
        status_counts,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Action, CompositeKey, Counts};

    fn item(status: Status) -> InventoryItem {
        InventoryItem {
            id: None,
            key: CompositeKey {
                location: "A1".into(),
                product: "111".into(),
                lot: String::new(),
            },
            description: String::new(),
            system_qty: 0.0,
            counts: Counts::Initial { round1: None, round2: None },
            status,
            action: Action::Finalized,
            expected_locations: Vec::new(),
        }
    }

    #[test]
    fn summary_counts() {
        let items = vec![
            item(Status::Ok),
            item(Status::Ok),
            item(Status::OkPartial),
            item(Status::LocalAlert),
            item(Status::Shortage),
            item(Status::Pending),
        ];
        let summary = compute_summary(&items, 3);
        assert_eq!(summary.total_items, 6);
        assert_eq!(summary.resolved, 2);
        assert_eq!(summary.ok_family, 3);
        assert_eq!(summary.transfers, 1);
        assert_eq!(summary.divergences, 2);
        assert_eq!(summary.pending, 1);
        assert_eq!(summary.excluded_rows, 3);
        assert_eq!(summary.status_counts["OK"], 2);
        assert_eq!(summary.status_counts["FALTA"], 1);
    }
}
