//! Store configuration
//!
//! Where fitted pipelines live on disk and which extension their JSON
//! artifacts carry.

use std::path::PathBuf;

pub const DEFAULT_ROOT: &str = "fitted_pipelines";
pub const DEFAULT_EXTENSION: &str = "model";

/// Store configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreConfig {
    /// Directory holding one subdirectory per saved pipeline
    pub root: PathBuf,

    /// Extension of `fitted_pipeline`, `orders` and carrier files
    pub extension: String,
}

impl StoreConfig {
    /// Creates a new configuration with the default extension
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            extension: DEFAULT_EXTENSION.to_string(),
        }
    }

    pub fn with_extension(mut self, extension: impl Into<String>) -> Self {
        self.extension = extension.into();
        self
    }

    /// Creates configuration from environment variables
    ///
    /// Expected environment variables:
    /// - FITVAULT_ROOT (optional, default: fitted_pipelines)
    /// - FITVAULT_EXTENSION (optional, default: model)
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as `from_env`, reading variables through `lookup`
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let root = lookup("FITVAULT_ROOT").unwrap_or_else(|| DEFAULT_ROOT.to_string());
        let extension =
            lookup("FITVAULT_EXTENSION").unwrap_or_else(|| DEFAULT_EXTENSION.to_string());

        let config = Self::new(root).with_extension(extension);
        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.root.as_os_str().is_empty() {
            anyhow::bail!("root cannot be empty");
        }

        if self.extension.is_empty() {
            anyhow::bail!("extension cannot be empty");
        }

        if self
            .extension
            .chars()
            .any(|c| c == '.' || std::path::is_separator(c))
        {
            anyhow::bail!("extension must not contain '.' or path separators");
        }

        Ok(())
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self::new(DEFAULT_ROOT)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_default_config() {
        let config = StoreConfig::default();
        assert_eq!(config.root, PathBuf::from("fitted_pipelines"));
        assert_eq!(config.extension, "model");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validation() {
        let mut config = StoreConfig::default();

        config.extension = String::new();
        assert!(config.validate().is_err());

        config.extension = "tar.gz".to_string();
        assert!(config.validate().is_err());

        config.extension = "pkl".to_string();
        assert!(config.validate().is_ok());

        config.root = PathBuf::new();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_from_lookup() {
        let vars: HashMap<&str, &str> =
            [("FITVAULT_ROOT", "/srv/models"), ("FITVAULT_EXTENSION", "bin")].into();
        let config = StoreConfig::from_lookup(|k| vars.get(k).map(|v| v.to_string())).unwrap();

        assert_eq!(config.root, PathBuf::from("/srv/models"));
        assert_eq!(config.extension, "bin");

        let defaults = StoreConfig::from_lookup(|_| None).unwrap();
        assert_eq!(defaults, StoreConfig::default());
    }
}
