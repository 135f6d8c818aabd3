//! Command-line interface definition.

use crate::config::{Config, ConfigError};
use clap::{Parser, Subcommand};
use rankgate_rules::{Badge, LevelTable, RequirementField};
use std::path::{Path, PathBuf};
use tracing::warn;

/// Verify accounts and reconcile member roles.
#[derive(Parser, Debug)]
#[command(name = "rankgate")]
#[command(version)]
#[command(about = "Account verification and tiered role reconciliation")]
pub struct Cli {
    /// Configuration file
    #[arg(short, long, env = "RANKGATE_CONFIG", default_value = "config.toml")]
    pub config: PathBuf,

    /// Emit logs as JSON lines
    #[arg(long)]
    pub log_json: bool,

    /// Label recorded with every audit entry
    #[arg(long, default_value = "cli")]
    pub label: String,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Verify a member as the owner of an account
    Verify {
        /// Account name
        name: String,
        /// Chat member id
        member: String,
        /// Evaluate this profile instead of the most recent one
        #[arg(long)]
        profile: Option<String>,
        /// Skip the linked chat handle check
        #[arg(long)]
        bypass_link_check: bool,
        /// Take the linkage from another member still present
        #[arg(long)]
        allow_override: bool,
    },

    /// Staff verification, optionally without the stats provider
    ForceVerify {
        name: String,
        member: String,
        /// Level to assign with --no-api
        #[arg(long)]
        level: Option<u32>,
        /// Skip the stats provider and assign --level
        #[arg(long)]
        no_api: bool,
        #[arg(long)]
        bypass_link_check: bool,
        #[arg(long)]
        allow_override: bool,
    },

    /// Re-verify a member from their linkage or display name
    Refresh { member: String },

    /// Re-verify every linked member, one at a time
    RefreshAll,

    /// Remove a member's linkage and verified roles
    Unverify { member: String },

    /// Give a member the baseline roles
    Fix { member: String },

    /// View or edit badge thresholds
    Requirements {
        #[command(subcommand)]
        action: RequirementsAction,
    },

    /// XP needed between two levels
    Xp { from: f64, to: f64 },

    /// Validate the configuration file and exit
    CheckConfig,
}

#[derive(Subcommand, Debug)]
pub enum RequirementsAction {
    /// Print every threshold
    View,
    /// Set one threshold (omit the value to disable it) and save the file
    Set {
        badge: Badge,
        field: RequirementField,
        value: Option<u64>,
    },
}

/// Level table for the `xp` command.
///
/// A missing config file means the built-in table. A config that cannot be
/// read, parsed or turned into a table is logged and also falls back.
pub fn xp_level_table(path: &Path) -> LevelTable {
    match Config::load(path).and_then(|config| config.level_table()) {
        Ok(table) => table,
        Err(ConfigError::Io(e)) if e.kind() == std::io::ErrorKind::NotFound => {
            LevelTable::catacombs()
        }
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Unusable config; using built-in level table");
            LevelTable::catacombs()
        }
    }
}
