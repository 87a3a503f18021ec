use crate::aggregate::GlobalBalances;
use crate::model::{Action, Counts, InventoryItem, Origin, Status, Tallied};

/// First round handled by the audit classifier.
pub const FIRST_AUDIT_ROUND: u8 = 3;
/// Last recount. A mismatch here is corrected in the system instead.
pub const FINAL_AUDIT_ROUND: u8 = 6;

/// Two-round decision for one location.
///
/// - Round 1 and round 2 disagree → CountDivergence (checked first; an
///   unstable count is never trusted)
/// - Balanced product/lot, location matches → Ok
/// - Balanced, location differs → LocalAlert (stock misplaced)
/// - Unbalanced, location matches → OkPartial
/// - Unbalanced, location differs → Surplus / Shortage
pub fn initial_verdict(
    round1: Option<f64>,
    round2: Option<f64>,
    system_qty: f64,
    balanced: bool,
) -> (Status, Action) {
    let recount = Action::SendToRound(FIRST_AUDIT_ROUND);

    if let (Some(r1), Some(r2)) = (round1, round2) {
        if r1 != r2 {
            return (Status::CountDivergence, recount);
        }
    }

    let counted = round2.unwrap_or(0.0);
    match (balanced, counted == system_qty) {
        (true, true) => (Status::Ok, Action::Finalized),
        (true, false) => (Status::LocalAlert, Action::PhysicalTransfer),
        (false, true) => (Status::OkPartial, Action::VerifyOthers),
        (false, false) if counted - system_qty > 0.0 => (Status::Surplus, recount),
        (false, false) => (Status::Shortage, recount),
    }
}

/// Audit-round decision for one item.
pub fn audit_verdict(origin: Origin, audit_qty: f64, system_qty: f64, round: u8) -> (Status, Action) {
    if origin == Origin::Unrequested {
        return (Status::Unrequested, Action::VerifyOrigin);
    }
    if audit_qty == 0.0 {
        return (Status::Pending, Action::NotCounted);
    }
    if audit_qty == system_qty {
        return (Status::Ok, Action::ResolvedInAudit);
    }

    let status = if audit_qty - system_qty > 0.0 {
        Status::SurplusConfirmed
    } else {
        Status::ShortageConfirmed
    };
    let action = if round < FINAL_AUDIT_ROUND {
        Action::SendToRound(round + 1)
    } else {
        Action::AdjustSystem
    };
    (status, action)
}

/// Classify every aggregated item against its product/lot balance.
pub fn classify_initial(items: Vec<Tallied>, balances: &GlobalBalances) -> Vec<InventoryItem> {
    let mut classified: Vec<InventoryItem> = items
        .into_iter()
        .map(|t| {
            let balanced = balances.get(&t.key.global()).is_some_and(|b| b.is_balanced());
            let (round1, round2) = match &t.counts {
                Counts::Initial { round1, round2 } => {
                    (round1.as_ref().map(|r| r.qty), round2.as_ref().map(|r| r.qty))
                }
                Counts::Audit { tally, .. } => (None, Some(tally.qty)),
            };
            let (status, action) = initial_verdict(round1, round2, t.system_qty, balanced);
            finalize(t, status, action)
        })
        .collect();

    order_exceptions_first(&mut classified);
    classified
}

/// Classify items carried into an audit round.
pub fn classify_audit(items: Vec<Tallied>) -> Vec<InventoryItem> {
    let mut classified: Vec<InventoryItem> = items
        .into_iter()
        .map(|t| {
            let (audit_qty, round) = match &t.counts {
                Counts::Audit { round, tally } => (tally.qty, *round),
                Counts::Initial { round2, .. } => (round2.as_ref().map_or(0.0, |r| r.qty), FIRST_AUDIT_ROUND),
            };
            let (status, action) = audit_verdict(t.origin, audit_qty, t.system_qty, round);
            finalize(t, status, action)
        })
        .collect();

    order_exceptions_first(&mut classified);
    classified
}

/// Stable: exact `OK` items move behind everything else, order kept within each group.
pub fn order_exceptions_first(items: &mut [InventoryItem]) {
    items.sort_by_key(|i| i.status == Status::Ok);
}

fn finalize(t: Tallied, status: Status, action: Action) -> InventoryItem {
    InventoryItem {
        id: t.id,
        key: t.key,
        description: t.description,
        system_qty: t.system_qty,
        counts: t.counts,
        status,
        action,
        expected_locations: t.expected_locations,
    }
}
