//! Configuration validation.
//!
//! Validates configuration at startup to catch common errors early.

use super::Config;
use rankgate_rules::roles::level_role_keys;
use rankgate_rules::{LevelTable, RoleId, RulesError};
use std::collections::HashMap;
use std::path::Path;
use thiserror::Error;

/// Validation errors for configuration.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("roles.levels is missing an entry for level {0}")]
    MissingLevelRole(u32),
    #[error("roles.levels key '{0}' is not one of 30, 35, 40..=60")]
    InvalidLevelKey(String),
    #[error("{0} has an empty role id")]
    EmptyRoleId(String),
    #[error("role {role} is used by both {first} and {second}")]
    DuplicateRole {
        role: RoleId,
        first: String,
        second: String,
    },
    #[error("levels.xp: {0}")]
    LevelTable(RulesError),
    #[error("database.path parent directory does not exist: {0}")]
    DatabasePathInvalid(String),
    #[error("providers.timeout_secs must be positive")]
    ZeroTimeout,
}

/// Validate a configuration, returning all errors found.
pub fn validate(config: &Config) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    // Level role map: every managed level present, nothing else.
    for key in config.roles.levels.keys() {
        let known = key
            .parse::<u32>()
            .is_ok_and(|level| level_role_keys().any(|k| k == level));
        if !known {
            errors.push(ValidationError::InvalidLevelKey(key.clone()));
        }
    }
    for level in level_role_keys() {
        if !config.roles.levels.contains_key(&level.to_string()) {
            errors.push(ValidationError::MissingLevelRole(level));
        }
    }

    // Managed roles must be distinct so the reconciler can tell them apart.
    let mut owners: HashMap<&RoleId, String> = HashMap::new();
    let managed = managed_roles(config);
    for (owner, role) in &managed {
        let role: &RoleId = role;
        if role.as_str().is_empty() {
            errors.push(ValidationError::EmptyRoleId(owner.clone()));
            continue;
        }
        if let Some(first) = owners.get(role) {
            errors.push(ValidationError::DuplicateRole {
                role: role.clone(),
                first: first.clone(),
                second: owner.clone(),
            });
        } else {
            owners.insert(role, owner.clone());
        }
    }

    if let Some(levels) = &config.levels
        && let Err(e) = LevelTable::new(levels.xp.clone())
    {
        errors.push(ValidationError::LevelTable(e));
    }

    if config.providers.timeout_secs == 0 {
        errors.push(ValidationError::ZeroTimeout);
    }

    if config.database.path != ":memory:" {
        let db_path = Path::new(&config.database.path);
        if let Some(parent) = db_path.parent()
            && !parent.as_os_str().is_empty()
            && !parent.exists()
        {
            errors.push(ValidationError::DatabasePathInvalid(
                config.database.path.clone(),
            ));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Every role the reconciler adds or removes, labelled by its config key.
fn managed_roles(config: &Config) -> Vec<(String, &RoleId)> {
    let mut roles = vec![("roles.member".to_string(), &config.roles.member)];
    roles.extend(
        config
            .roles
            .levels
            .iter()
            .map(|(level, role)| (format!("roles.levels.{level}"), role)),
    );
    roles.extend(
        config
            .requirements
            .iter()
            .map(|(badge, req)| (format!("requirements.{badge}.role"), &req.role)),
    );
    roles
}
