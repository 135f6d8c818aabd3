//! Core configuration types and loading.

use rankgate_rules::{LevelTable, Requirements, RoleId, RoleSet, SymbolRule};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

use super::ConfigError;

/// Verifier configuration, as read from TOML.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Persistence store.
    #[serde(default)]
    pub database: DatabaseConfig,
    /// External service endpoints and credentials.
    #[serde(default)]
    pub providers: ProvidersConfig,
    /// Role ids managed by the reconciler.
    pub roles: RolesConfig,
    /// Thresholds per badge.
    pub requirements: Requirements,
    /// Bracket symbols in priority order (last match wins).
    #[serde(default)]
    pub symbols: Vec<SymbolRule>,
    /// Replacement XP table; the built-in catacombs table when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub levels: Option<LevelsConfig>,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Parse configuration from TOML text.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Serialize back to TOML.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// The XP table in effect.
    pub fn level_table(&self) -> Result<LevelTable, ConfigError> {
        match &self.levels {
            Some(levels) => Ok(LevelTable::new(levels.xp.clone())?),
            None => Ok(LevelTable::catacombs()),
        }
    }
}

/// Database configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Path to SQLite database file, or `:memory:`.
    #[serde(default = "default_database_path")]
    pub path: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_database_path(),
        }
    }
}

fn default_database_path() -> String {
    "rankgate.db".to_string()
}

/// Endpoints and credentials for the account resolver, stats provider and
/// chat platform.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProvidersConfig {
    /// Name → account lookups.
    #[serde(default = "default_account_url")]
    pub account_url: String,
    /// Id → account lookups.
    #[serde(default = "default_session_url")]
    pub session_url: String,
    /// Game statistics API.
    #[serde(default = "default_stats_url")]
    pub stats_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stats_api_key: Option<String>,
    /// Chat platform REST API.
    #[serde(default = "default_chat_url")]
    pub chat_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chat_token: Option<String>,
    /// Guild whose members are managed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub guild_id: Option<String>,
    /// Per-request timeout for the shipped HTTP clients (default: 10).
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for ProvidersConfig {
    fn default() -> Self {
        Self {
            account_url: default_account_url(),
            session_url: default_session_url(),
            stats_url: default_stats_url(),
            stats_api_key: None,
            chat_url: default_chat_url(),
            chat_token: None,
            guild_id: None,
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_account_url() -> String {
    "https://api.mojang.com".to_string()
}

fn default_session_url() -> String {
    "https://sessionserver.mojang.com".to_string()
}

fn default_stats_url() -> String {
    "https://api.hypixel.net".to_string()
}

fn default_chat_url() -> String {
    "https://discord.com/api/v10".to_string()
}

fn default_timeout_secs() -> u64 {
    10
}

/// Role ids outside the badge requirements.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RolesConfig {
    /// Always present on a verified member.
    pub member: RoleId,
    /// Roles an unverified member keeps (the "fix" roles).
    #[serde(default)]
    pub baseline: Vec<RoleId>,
    /// Holding this role marks the linkage as voted out of top-plus.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub voted_out: Option<RoleId>,
    /// Holding this role marks the linkage as voted into top-plus.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plus_request: Option<RoleId>,
    /// Level roles keyed by level ("30", "35", "40" ..= "60").
    #[serde(default)]
    pub levels: BTreeMap<String, RoleId>,
}

impl RolesConfig {
    pub fn baseline_set(&self) -> RoleSet {
        self.baseline.iter().cloned().collect()
    }
}

/// Replacement XP table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LevelsConfig {
    /// Cumulative XP, index = level, starting at 0.
    pub xp: Vec<u64>,
}
