use thiserror::Error;

use crate::model::CompositeKey;

/// Failure reported by an [`crate::persist::InventoryStore`] implementation.
#[derive(Debug, Error)]
#[error("{message}")]
pub struct StoreError {
    pub message: String,
    /// Item the store rejected, when it can tell.
    pub key: Option<CompositeKey>,
}

impl StoreError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            key: None,
        }
    }

    pub fn for_key(message: impl Into<String>, key: CompositeKey) -> Self {
        Self {
            message: message.into(),
            key: Some(key),
        }
    }
}

/// Stage of a save at which the store failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PersistStage {
    SelectPending,
    UpsertItems,
    InsertCounts,
}

impl std::fmt::Display for PersistStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::SelectPending => write!(f, "select pending"),
            Self::UpsertItems => write!(f, "upsert items"),
            Self::InsertCounts => write!(f, "insert counts"),
        }
    }
}

#[derive(Debug, Error)]
pub enum ReconError {
    /// The system file (initial) or the round's count file (audit) is missing.
    #[error("{mode}: missing required input: {input}")]
    MissingRequiredInput { mode: &'static str, input: &'static str },

    /// Audit requested but the store has nothing pending.
    #[error("no pending items to audit")]
    EmptyPendingSet,

    /// Audit round outside the recount range.
    #[error("audit round must be between 3 and 6, got {0}")]
    InvalidRound(u8),

    /// Store rejected a select, upsert or insert.
    #[error("persistence failed during {stage}{}: {source}", key_suffix(.source.key.as_ref()))]
    Persistence {
        stage: PersistStage,
        #[source]
        source: StoreError,
    },

    /// TOML parse / deserialization error.
    #[error("config parse error: {0}")]
    ConfigParse(String),

    /// Config validation error (empty alias list, blank alias).
    #[error("config validation error: {0}")]
    ConfigValidation(String),
}

fn key_suffix(key: Option<&CompositeKey>) -> String {
    key.map(|k| format!(" (item {k})")).unwrap_or_default()
}

impl ReconError {
    pub fn persistence(stage: PersistStage, source: StoreError) -> Self {
        Self::Persistence { stage, source }
    }

    /// Not a failure: there was simply nothing to do.
    pub fn is_noop(&self) -> bool {
        matches!(self, Self::EmptyPendingSet)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn persistence_message_names_stage_and_key() {
        let key = CompositeKey {
            location: "A1".into(),
            product: "111".into(),
            lot: "L1".into(),
        };
        let err = ReconError::persistence(PersistStage::UpsertItems, StoreError::for_key("constraint failed", key));
        assert_eq!(
            err.to_string(),
            "persistence failed during upsert items (item A1|111|L1): constraint failed"
        );
    }

    #[test]
    fn empty_pending_is_noop() {
        assert!(ReconError::EmptyPendingSet.is_noop());
        assert!(!ReconError::InvalidRound(7).is_noop());
    }
}
