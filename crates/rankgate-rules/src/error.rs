//! Error types for rule configuration.

use thiserror::Error;

/// Errors raised while building rule configuration.
///
/// Rule *evaluation* never fails; only constructing tables or editing
/// thresholds can.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RulesError {
    #[error("level table needs at least two entries, got {0}")]
    LevelTableTooShort(usize),

    #[error("level table must start at 0 xp, got {0}")]
    LevelTableOrigin(u64),

    #[error("level table must strictly increase (level {0} does not)")]
    LevelTableNotIncreasing(u32),

    #[error("unknown badge: {0}")]
    UnknownBadge(String),

    #[error("unknown requirement: {0}")]
    UnknownRequirement(String),

    #[error("value {value} is out of range for {field}")]
    ValueOutOfRange { field: &'static str, value: u64 },
}
