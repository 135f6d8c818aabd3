//! Versioned configuration snapshots.
//!
//! Operations take one [`ConfigSnapshot`] when they start and evaluate
//! against it to the end. Reloads and edits publish a new snapshot; a
//! published snapshot is never mutated.

use super::{Config, ConfigError, validate};
use parking_lot::RwLock;
use rankgate_rules::{Badge, LevelTable, RequirementField, RoleId, RolePlan, RoleSet};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;
use tracing::info;

/// An immutable, validated configuration plus the values derived from it.
#[derive(Debug)]
pub struct ConfigSnapshot {
    /// Increases by one with every published snapshot.
    pub version: u64,
    pub config: Config,
    pub levels: LevelTable,
    pub plan: RolePlan,
    pub baseline: RoleSet,
}

impl ConfigSnapshot {
    fn build(version: u64, config: Config) -> Result<Self, ConfigError> {
        validate(&config).map_err(ConfigError::Invalid)?;
        let levels = config.level_table()?;
        // Keys were checked by validate().
        let level_roles: BTreeMap<u32, RoleId> = config
            .roles
            .levels
            .iter()
            .filter_map(|(key, role)| Some((key.parse().ok()?, role.clone())))
            .collect();
        let plan = RolePlan::new(
            config.roles.member.clone(),
            level_roles,
            &config.requirements,
        );
        let baseline = config.roles.baseline_set();
        Ok(Self {
            version,
            config,
            levels,
            plan,
            baseline,
        })
    }
}

/// Shared handle publishing [`ConfigSnapshot`]s.
#[derive(Debug, Clone)]
pub struct ConfigHandle {
    current: Arc<RwLock<Arc<ConfigSnapshot>>>,
}

impl ConfigHandle {
    /// Validate `config` and publish it as version 1.
    pub fn new(config: Config) -> Result<Self, ConfigError> {
        let snapshot = ConfigSnapshot::build(1, config)?;
        Ok(Self {
            current: Arc::new(RwLock::new(Arc::new(snapshot))),
        })
    }

    /// Load, validate and publish a config file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        Self::new(Config::load(path)?)
    }

    /// The current snapshot.
    pub fn snapshot(&self) -> Arc<ConfigSnapshot> {
        Arc::clone(&self.current.read())
    }

    /// Validate and publish a replacement configuration.
    ///
    /// On error the current snapshot stays in place.
    pub fn replace(&self, config: Config) -> Result<Arc<ConfigSnapshot>, ConfigError> {
        let mut current = self.current.write();
        let snapshot = Arc::new(ConfigSnapshot::build(current.version + 1, config)?);
        *current = Arc::clone(&snapshot);
        info!(version = snapshot.version, "Configuration snapshot published");
        Ok(snapshot)
    }

    /// Re-read a config file and publish it.
    pub fn reload<P: AsRef<Path>>(&self, path: P) -> Result<Arc<ConfigSnapshot>, ConfigError> {
        let config = Config::load(path)?;
        self.replace(config)
    }

    /// Set or clear (`None`) one threshold and publish the result.
    pub fn set_requirement(
        &self,
        badge: Badge,
        field: RequirementField,
        value: Option<u64>,
    ) -> Result<Arc<ConfigSnapshot>, ConfigError> {
        let mut config = self.snapshot().config.clone();
        config.requirements.get_mut(badge).set(field, value)?;
        self.replace(config)
    }

    /// Write the current snapshot's configuration to `path` as TOML.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let snapshot = self.snapshot();
        std::fs::write(path, snapshot.config.to_toml()?)?;
        Ok(())
    }
}
