//! # rankgate
//!
//! Links game accounts to chat-platform members, evaluates tiered
//! eligibility against game statistics and reconciles each member's roles
//! and nickname to match.
//!
//! The pure rules live in [`rankgate_rules`]; this crate adds configuration,
//! the linkage store, the external providers and the [`verify::Verifier`]
//! that sequences them.

pub mod audit;
pub mod cli;
pub mod config;
pub mod db;
pub mod linkage;
pub mod providers;
pub mod telemetry;
pub mod verify;

pub use rankgate_rules as rules;
