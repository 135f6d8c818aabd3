//! Configuration loading and management.
//!
//! - [`types`]: the TOML-facing structs ([`Config`], [`ProvidersConfig`], [`RolesConfig`])
//! - [`validation`]: startup checks that report every problem at once
//! - [`handle`]: versioned, immutable snapshots shared by all operations

mod handle;
mod types;
mod validation;

pub use handle::{ConfigHandle, ConfigSnapshot};
pub use types::{Config, DatabaseConfig, LevelsConfig, ProvidersConfig, RolesConfig};
pub use validation::{ValidationError, validate};

use thiserror::Error;

/// Errors that can occur when loading or saving configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),
    #[error("invalid configuration:\n{}", format_errors(.0))]
    Invalid(Vec<ValidationError>),
    #[error(transparent)]
    Rules(#[from] rankgate_rules::RulesError),
}

fn format_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(|e| format!("  - {e}"))
        .collect::<Vec<_>>()
        .join("\n")
}
