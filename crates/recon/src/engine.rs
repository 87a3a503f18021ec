use crate::aggregate::{aggregate_audit, aggregate_initial, GlobalBalances};
use crate::classify::{classify_audit, classify_initial, FINAL_AUDIT_ROUND, FIRST_AUDIT_ROUND};
use crate::error::ReconError;
use crate::evidence::compute_summary;
use crate::model::{AuditInput, InitialInput, InventoryItem, ReconRun, RunMeta, RunMode};
use crate::normalize::FieldAliases;

/// Two-round reconciliation: system file plus optional round 1 and round 2.
///
/// The global balance pass over the system file completes before any
/// per-location record is built.
pub fn process_initial(input: &InitialInput, aliases: &FieldAliases) -> Result<ReconRun, ReconError> {
    let system = input.system.as_deref().ok_or(ReconError::MissingRequiredInput {
        mode: "initial",
        input: "system file",
    })?;

    let mut balances = GlobalBalances::from_system(system, aliases);
    let aggregation = aggregate_initial(
        &mut balances,
        system,
        input.round1.as_deref(),
        input.round2.as_deref(),
        aliases,
    );
    let items = classify_initial(aggregation.items, &balances);

    tracing::info!(
        product_lots = balances.len(),
        items = items.len(),
        excluded_rows = aggregation.excluded_rows,
        "initial reconciliation complete"
    );

    Ok(finish(RunMode::Initial, items, aggregation.excluded_rows))
}

/// Audit round 3–6 over the store's pending items and the round's count file.
pub fn process_audit(input: &AuditInput, aliases: &FieldAliases) -> Result<ReconRun, ReconError> {
    if !(FIRST_AUDIT_ROUND..=FINAL_AUDIT_ROUND).contains(&input.round) {
        return Err(ReconError::InvalidRound(input.round));
    }
    let counts = input.counts.as_deref().ok_or(ReconError::MissingRequiredInput {
        mode: "audit",
        input: "count file for the current round",
    })?;
    if input.pending.is_empty() {
        return Err(ReconError::EmptyPendingSet);
    }

    let aggregation = aggregate_audit(&input.pending, input.round, counts, aliases);
    let items = classify_audit(aggregation.items);

    tracing::info!(
        round = input.round,
        pending = input.pending.len(),
        items = items.len(),
        excluded_rows = aggregation.excluded_rows,
        "audit reconciliation complete"
    );

    Ok(finish(RunMode::Audit(input.round), items, aggregation.excluded_rows))
}

fn finish(mode: RunMode, items: Vec<InventoryItem>, excluded_rows: usize) -> ReconRun {
    ReconRun {
        meta: RunMeta {
            mode,
            engine_version: env!("CARGO_PKG_VERSION").to_string(),
            run_at: chrono::Utc::now().to_rfc3339(),
        },
        summary: compute_summary(&items, excluded_rows),
        items,
    }
}
