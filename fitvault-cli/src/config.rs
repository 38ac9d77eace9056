//! Configuration module
//!
//! Handles CLI configuration and builds the store and backend from it.

use anyhow::{Context, Result};
use fitvault_runner::LocalBackend;
use fitvault_store::{CarrierRegistry, PipelineStore, RuleSpec, StoreConfig};
use std::path::PathBuf;
use tracing::debug;

/// CLI configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub store: StoreConfig,
    /// Rule file appended to the built-in carrier rules
    pub registry: Option<PathBuf>,
    pub seed: u64,
}

impl Config {
    /// Built-in carrier rules, extended with the rule file if one is set
    pub fn carrier_registry(&self) -> Result<CarrierRegistry> {
        let mut registry = CarrierRegistry::builtin();
        if let Some(path) = &self.registry {
            let specs = RuleSpec::load_file(path)
                .with_context(|| format!("Failed to read carrier rules: {}", path.display()))?;
            debug!("Adding {} carrier rule(s) from {}", specs.len(), path.display());
            registry
                .extend(specs, &fitvault_nn::builtin_objects())
                .with_context(|| format!("Invalid carrier rules in {}", path.display()))?;
        }
        Ok(registry)
    }

    pub fn open_store(&self) -> Result<PipelineStore> {
        Ok(PipelineStore::new(self.store.clone(), self.carrier_registry()?))
    }

    pub fn backend(&self) -> LocalBackend {
        LocalBackend::new(self.seed)
    }
}
