use std::collections::HashMap;

use serde::Serialize;

// ---------------------------------------------------------------------------
// Input
// ---------------------------------------------------------------------------

/// A single spreadsheet row as handed over by a row source.
///
/// Headers are kept verbatim; lookups go through [`crate::normalize::FieldAliases`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawRow {
    pub fields: HashMap<String, String>,
}

impl RawRow {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder used by tests and row sources.
    pub fn with(mut self, header: &str, value: impl Into<String>) -> Self {
        self.fields.insert(header.to_string(), value.into());
        self
    }

    pub fn get(&self, header: &str) -> Option<&str> {
        self.fields.get(header).map(String::as_str)
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for RawRow {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            fields: iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
        }
    }
}

/// Pre-loaded files for the two-round mode. `None` means the file was not supplied.
#[derive(Debug, Clone, Default)]
pub struct InitialInput {
    pub system: Option<Vec<RawRow>>,
    pub round1: Option<Vec<RawRow>>,
    pub round2: Option<Vec<RawRow>>,
}

/// A previously persisted item that has not reached a resolved status.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PendingItem {
    pub id: i64,
    pub key: CompositeKey,
    pub description: String,
    pub system_qty: f64,
    pub last_status: String,
}

/// Pending items from the store plus the current round's count file.
#[derive(Debug, Clone)]
pub struct AuditInput {
    pub round: u8,
    pub pending: Vec<PendingItem>,
    pub counts: Option<Vec<RawRow>>,
}

// ---------------------------------------------------------------------------
// Keys
// ---------------------------------------------------------------------------

/// Aggregation key = (location, product code, lot), all normalized.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct CompositeKey {
    pub location: String,
    pub product: String,
    pub lot: String,
}

impl CompositeKey {
    pub fn global(&self) -> GlobalKey {
        GlobalKey {
            product: self.product.clone(),
            lot: self.lot.clone(),
        }
    }
}

impl std::fmt::Display for CompositeKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}|{}|{}", self.location, self.product, self.lot)
    }
}

/// Product/lot regardless of location.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct GlobalKey {
    pub product: String,
    pub lot: String,
}

// ---------------------------------------------------------------------------
// Aggregation
// ---------------------------------------------------------------------------

/// System-wide balance for one product/lot.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct GlobalBalance {
    pub system_total: f64,
    pub counted_total: f64,
    /// Locations the system file places this product/lot in, first-seen order.
    pub expected_locations: Vec<String>,
}

impl GlobalBalance {
    pub fn is_balanced(&self) -> bool {
        self.system_total == self.counted_total
    }
}

/// Quantity and last attributed user for one round at one key.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Tally {
    pub qty: f64,
    pub user: String,
}

impl Tally {
    pub fn add(&mut self, qty: f64, user: &str) {
        self.qty += qty;
        if !user.is_empty() {
            self.user = user.to_string();
        }
    }
}

/// Per-round observations. A round whose file was not supplied is `None`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum Counts {
    Initial {
        round1: Option<Tally>,
        round2: Option<Tally>,
    },
    Audit {
        round: u8,
        tally: Tally,
    },
}

/// How an audit-mode item entered the run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Origin {
    /// Present in the store's pending set or, in initial mode, in any source file.
    Expected,
    /// Counted in an audit round without being pending.
    Unrequested,
}

/// Per-location aggregate before classification.
#[derive(Debug, Clone, PartialEq)]
pub struct Tallied {
    pub id: Option<i64>,
    pub key: CompositeKey,
    pub description: String,
    pub system_qty: f64,
    pub counts: Counts,
    pub origin: Origin,
    pub expected_locations: Vec<String>,
}

// ---------------------------------------------------------------------------
// Classification
// ---------------------------------------------------------------------------

/// Disposition of a (location, product, lot) after a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    Ok,
    OkPartial,
    LocalAlert,
    CountDivergence,
    Surplus,
    Shortage,
    Pending,
    Unrequested,
    SurplusConfirmed,
    ShortageConfirmed,
}

impl Status {
    pub const ALL: [Status; 10] = [
        Self::Ok,
        Self::OkPartial,
        Self::LocalAlert,
        Self::CountDivergence,
        Self::Surplus,
        Self::Shortage,
        Self::Pending,
        Self::Unrequested,
        Self::SurplusConfirmed,
        Self::ShortageConfirmed,
    ];

    /// Label stored in the `status` column and shown in exports.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Ok => "OK",
            Self::OkPartial => "OK (PARCIAL)",
            Self::LocalAlert => "ALERTA LOCAL",
            Self::CountDivergence => "DIVERG. CONTAGEM",
            Self::Surplus => "SOBRA",
            Self::Shortage => "FALTA",
            Self::Pending => "PENDENTE",
            Self::Unrequested => "ITEM NAO SOLICITADO",
            Self::SurplusConfirmed => "SOBRA CONFIRMADA",
            Self::ShortageConfirmed => "FALTA CONFIRMADA",
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        let label = label.trim();
        Self::ALL.into_iter().find(|s| s.label() == label)
    }

    /// Terminal: the store no longer hands this item out for audit.
    pub fn is_resolved(&self) -> bool {
        matches!(self, Self::Ok)
    }

    /// This location reconciles, fully or partially.
    pub fn is_ok_family(&self) -> bool {
        matches!(self, Self::Ok | Self::OkPartial)
    }

    pub fn is_transfer(&self) -> bool {
        matches!(self, Self::LocalAlert)
    }

    /// Needs a recount or a system correction.
    pub fn is_divergence(&self) -> bool {
        !self.is_ok_family() && !self.is_transfer()
    }
}

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Recommended corrective action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "round", rename_all = "snake_case")]
pub enum Action {
    Finalized,
    PhysicalTransfer,
    VerifyOthers,
    SendToRound(u8),
    NotCounted,
    ResolvedInAudit,
    VerifyOrigin,
    AdjustSystem,
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Finalized => write!(f, "Finalizado"),
            Self::PhysicalTransfer => write!(f, "Transferência Física"),
            Self::VerifyOthers => write!(f, "Verificar Outros"),
            Self::SendToRound(n) => write!(f, "Enviar para {n}ª Contagem"),
            Self::NotCounted => write!(f, "Item não contado na auditoria"),
            Self::ResolvedInAudit => write!(f, "Resolvido na Auditoria"),
            Self::VerifyOrigin => write!(f, "Verificar origem"),
            Self::AdjustSystem => write!(f, "Ajustar Sistema"),
        }
    }
}

/// A classified item. Never mutated after the classifier returns it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InventoryItem {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    #[serde(flatten)]
    pub key: CompositeKey,
    pub description: String,
    pub system_qty: f64,
    pub counts: Counts,
    pub status: Status,
    pub action: Action,
    pub expected_locations: Vec<String>,
}

impl InventoryItem {
    /// Quantity of the round that drives classification: round 2 or the audit round.
    pub fn deciding_qty(&self) -> f64 {
        match &self.counts {
            Counts::Initial { round2, .. } => round2.as_ref().map_or(0.0, |t| t.qty),
            Counts::Audit { tally, .. } => tally.qty,
        }
    }
}

// ---------------------------------------------------------------------------
// Summary + Output
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "round", rename_all = "snake_case")]
pub enum RunMode {
    Initial,
    Audit(u8),
}

impl std::fmt::Display for RunMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Initial => write!(f, "initial"),
            Self::Audit(round) => write!(f, "audit round {round}"),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RunSummary {
    pub total_items: usize,
    pub resolved: usize,
    pub ok_family: usize,
    pub divergences: usize,
    pub transfers: usize,
    pub pending: usize,
    pub excluded_rows: usize,
    pub status_counts: HashMap<String, usize>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RunMeta {
    pub mode: RunMode,
    pub engine_version: String,
    pub run_at: String,
}

/// The complete, immutable snapshot one processing run produces.
#[derive(Debug, Clone, Serialize)]
pub struct ReconRun {
    pub meta: RunMeta,
    pub summary: RunSummary,
    pub items: Vec<InventoryItem>,
}
