//! # rankgate-rules
//!
//! Pure rule logic for the rankgate verifier: no I/O, no clocks, no global
//! state. Every function takes the configuration it needs as an argument so
//! callers can evaluate against an immutable configuration snapshot.
//!
//! - [`level`]: XP ↔ level conversion over a replaceable table
//! - [`stats`]: stat snapshots and profile selection
//! - [`requirements`]: per-badge thresholds
//! - [`eligibility`]: badge predicates and the tier cascade
//! - [`roles`]: the idempotent role reconciler
//! - [`nickname`]: display-name formatting

#![deny(clippy::all)]

pub mod eligibility;
pub mod error;
pub mod level;
pub mod nickname;
pub mod requirements;
pub mod roles;
pub mod stats;

pub use eligibility::{evaluate, Eligibility, VotingOverride};
pub use error::RulesError;
pub use level::LevelTable;
pub use nickname::{account_name_from_display, format_nickname, SymbolRule};
pub use requirements::{Badge, RequirementField, Requirements, TierRequirement};
pub use roles::{reconcile, reconcile_for_level, RoleId, RolePlan, RoleSet};
pub use stats::{BestTimes, GameProfile, StatSnapshot};
