//! Carrier registry
//!
//! An ordered table of carrier rules. A rule says which carrier types it
//! covers (a substring of the fully qualified type path), which handle
//! fields those carriers own and which custom objects their native models
//! need at load time. Resolution is first-match-wins, so more specific
//! patterns must be registered before broader ones: `LSTMOutlierDetector`
//! before `Detector`.

use crate::error::StoreError;
use fitvault_core::native::{CustomFn, CustomObjects};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Handle field of single-model carriers
pub const MODEL_FIELD: &str = "model_";

/// How to persist one family of carriers
#[derive(Debug, Clone)]
pub struct CarrierRule {
    /// Rule id, recorded in the model index
    pub id: String,
    /// Matched as a substring of the carrier's type path
    pub pattern: String,
    /// Handle fields, in extraction order
    pub handle_fields: Vec<String>,
    /// Field whose artifact carries no `_<field>` suffix
    pub default_field: Option<String>,
    pub custom_objects: CustomObjects,
}

impl CarrierRule {
    /// A rule whose pattern is its id
    pub fn new(id: impl Into<String>) -> Self {
        let id = id.into();
        Self {
            pattern: id.clone(),
            id,
            handle_fields: Vec::new(),
            default_field: None,
            custom_objects: CustomObjects::new(),
        }
    }

    pub fn with_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.pattern = pattern.into();
        self
    }

    pub fn with_field(mut self, field: impl Into<String>) -> Self {
        self.handle_fields.push(field.into());
        self
    }

    /// Adds a field and stores its artifact under the bare stem
    pub fn with_default_field(mut self, field: impl Into<String>) -> Self {
        let field = field.into();
        self.default_field = Some(field.clone());
        self.handle_fields.push(field);
        self
    }

    pub fn with_custom_object(mut self, name: impl Into<String>, function: CustomFn) -> Self {
        self.custom_objects.insert(name, function);
        self
    }

    pub fn matches(&self, type_path: &str) -> bool {
        type_path.contains(&self.pattern)
    }

    /// Native models of this rule need custom objects to load
    pub fn requires_custom_loader(&self) -> bool {
        !self.custom_objects.is_empty()
    }

    /// File name of the artifact holding `field` for a carrier stored under `stem`
    pub fn artifact_name(&self, stem: &str, field: &str) -> String {
        if self.default_field.as_deref() == Some(field) {
            stem.to_string()
        } else {
            format!("{}_{}", stem, field)
        }
    }
}

/// Serializable form of a carrier rule
///
/// Custom objects are named by symbol and resolved against a catalog when
/// the registry is built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleSpec {
    pub id: String,
    #[serde(default)]
    pub pattern: Option<String>,
    #[serde(default)]
    pub handle_fields: Vec<String>,
    #[serde(default)]
    pub default_field: Option<String>,
    #[serde(default)]
    pub custom_objects: Vec<String>,
}

impl RuleSpec {
    /// Reads a JSON array of rule specs
    pub fn load_file(path: impl AsRef<Path>) -> Result<Vec<RuleSpec>, StoreError> {
        let path = path.as_ref();
        let raw = fs::read(path).map_err(|e| StoreError::io(path, e))?;
        serde_json::from_slice(&raw).map_err(|e| StoreError::json(path, e))
    }

    fn into_rule(self, catalog: &CustomObjects) -> Result<CarrierRule, StoreError> {
        let invalid = |message: String| StoreError::InvalidRule {
            id: self.id.clone(),
            message,
        };

        if self.handle_fields.is_empty() {
            return Err(invalid("a rule needs at least one handle field".to_string()));
        }
        if let Some(default) = &self.default_field {
            if !self.handle_fields.contains(default) {
                return Err(invalid(format!(
                    "default field '{}' is not one of its handle fields",
                    default
                )));
            }
        }

        let mut custom_objects = CustomObjects::new();
        for name in &self.custom_objects {
            let function = catalog
                .get(name)
                .cloned()
                .ok_or_else(|| StoreError::UnresolvedCustomObject(name.clone()))?;
            custom_objects.insert(name.clone(), function);
        }

        Ok(CarrierRule {
            pattern: self.pattern.unwrap_or_else(|| self.id.clone()),
            id: self.id,
            handle_fields: self.handle_fields,
            default_field: self.default_field,
            custom_objects,
        })
    }
}

/// Ordered set of carrier rules
#[derive(Debug, Clone, Default)]
pub struct CarrierRegistry {
    rules: Vec<CarrierRule>,
}

impl CarrierRegistry {
    /// Creates a new empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding the built-in detector carriers
    pub fn builtin() -> Self {
        let objects = fitvault_nn::builtin_objects();
        let mut registry = Self::new();

        registry.register(CarrierRule::new("AutoEncoder").with_default_field(MODEL_FIELD));
        let mut vae = CarrierRule::new("VAE").with_default_field(MODEL_FIELD);
        if let Some(sampling) = objects.get(fitvault_nn::SAMPLING) {
            vae = vae.with_custom_object(fitvault_nn::SAMPLING, sampling.clone());
        }
        registry.register(vae);
        registry.register(
            CarrierRule::new("SO_GAAL")
                .with_field("combine_model")
                .with_field("discriminator")
                .with_field("generator"),
        );
        registry.register(CarrierRule::new("MO_GAAL").with_field("discriminator"));
        registry.register(CarrierRule::new("LSTMOutlierDetector").with_default_field(MODEL_FIELD));
        registry.register(CarrierRule::new("DeeplogLstm").with_default_field(MODEL_FIELD));
        registry.register(CarrierRule::new("Detector").with_default_field("_model.model"));

        registry
    }

    /// Builds a registry from rule specs, in order
    pub fn from_specs(specs: Vec<RuleSpec>, catalog: &CustomObjects) -> Result<Self, StoreError> {
        let mut registry = Self::new();
        registry.extend(specs, catalog)?;
        Ok(registry)
    }

    /// Builds a registry from a JSON file of rule specs
    pub fn from_json_file(path: impl AsRef<Path>, catalog: &CustomObjects) -> Result<Self, StoreError> {
        Self::from_specs(RuleSpec::load_file(path)?, catalog)
    }

    /// Appends rules built from specs after the existing ones
    pub fn extend(&mut self, specs: Vec<RuleSpec>, catalog: &CustomObjects) -> Result<(), StoreError> {
        for spec in specs {
            if self.rule(&spec.id).is_some() {
                return Err(StoreError::InvalidRule {
                    id: spec.id,
                    message: "a rule with this id is already registered".to_string(),
                });
            }
            let rule = spec.into_rule(catalog)?;
            self.rules.push(rule);
        }
        Ok(())
    }

    /// Registers a rule after the existing ones
    ///
    /// # Panics
    /// Panics if a rule with the same ID is already registered
    pub fn register(&mut self, rule: CarrierRule) {
        if self.rule(&rule.id).is_some() {
            panic!("Carrier rule with id '{}' is already registered", rule.id);
        }
        self.rules.push(rule);
    }

    /// First rule whose pattern occurs in `type_path`
    pub fn resolve(&self, type_path: &str) -> Option<&CarrierRule> {
        self.rules.iter().find(|r| r.matches(type_path))
    }

    /// Rule by exact id
    pub fn rule(&self, id: &str) -> Option<&CarrierRule> {
        self.rules.iter().find(|r| r.id == id)
    }

    pub fn rules(&self) -> &[CarrierRule] {
        &self.rules
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::ArrayView1;
    use std::sync::Arc;

    #[test]
    fn test_builtin_resolution() {
        let registry = CarrierRegistry::builtin();
        let id_of = |path: &str| registry.resolve(path).map(|r| r.id.as_str());

        assert_eq!(id_of("fitvault.detectors.auto_encoder.AutoEncoder"), Some("AutoEncoder"));
        assert_eq!(id_of("fitvault.detectors.vae.VAE"), Some("VAE"));
        assert_eq!(id_of("fitvault.detectors.so_gaal.SO_GAAL"), Some("SO_GAAL"));
        assert_eq!(id_of("fitvault.detectors.mo_gaal.MO_GAAL"), Some("MO_GAAL"));
        assert_eq!(id_of("fitvault.detectors.telemanom.Detector"), Some("Detector"));
        assert_eq!(id_of("fitvault.detectors.zscore.ZScore"), None);
    }

    #[test]
    fn test_first_match_wins() {
        let registry = CarrierRegistry::builtin();
        let rule = registry
            .resolve("fitvault.detectors.lstm.LSTMOutlierDetector")
            .unwrap();
        assert_eq!(rule.id, "LSTMOutlierDetector");

        // Reversed order lets the broad pattern shadow the specific one
        let mut reversed = CarrierRegistry::new();
        reversed.register(CarrierRule::new("Detector").with_default_field("_model.model"));
        reversed.register(CarrierRule::new("LSTMOutlierDetector").with_default_field(MODEL_FIELD));
        let rule = reversed
            .resolve("fitvault.detectors.lstm.LSTMOutlierDetector")
            .unwrap();
        assert_eq!(rule.id, "Detector");
    }

    #[test]
    fn test_artifact_names() {
        let registry = CarrierRegistry::builtin();

        let ae = registry.rule("AutoEncoder").unwrap();
        assert_eq!(ae.artifact_name("AutoEncoder", MODEL_FIELD), "AutoEncoder");

        let so = registry.rule("SO_GAAL").unwrap();
        assert_eq!(so.artifact_name("SO_GAAL", "generator"), "SO_GAAL_generator");

        let mo = registry.rule("MO_GAAL").unwrap();
        assert_eq!(mo.artifact_name("MO_GAAL", "discriminator"), "MO_GAAL_discriminator");

        let telemanom = registry.rule("Detector").unwrap();
        assert_eq!(telemanom.artifact_name("Detector", "_model.model"), "Detector");
    }

    #[test]
    fn test_only_vae_needs_custom_loader() {
        let registry = CarrierRegistry::builtin();
        let custom: Vec<&str> = registry
            .rules()
            .iter()
            .filter(|r| r.requires_custom_loader())
            .map(|r| r.id.as_str())
            .collect();
        assert_eq!(custom, vec!["VAE"]);
        assert!(registry.rule("VAE").unwrap().custom_objects.contains("sampling"));
    }

    #[test]
    #[should_panic(expected = "already registered")]
    fn test_duplicate_registration() {
        let mut registry = CarrierRegistry::builtin();
        registry.register(CarrierRule::new("VAE"));
    }

    #[test]
    fn test_from_specs() {
        let catalog = fitvault_nn::builtin_objects();
        let specs: Vec<RuleSpec> = serde_json::from_str(
            r#"[
                {"id": "IsoNet", "handle_fields": ["encoder", "decoder"]},
                {"id": "SampledNet", "pattern": "Sampled", "handle_fields": ["model_"],
                 "default_field": "model_", "custom_objects": ["sampling"]}
            ]"#,
        )
        .unwrap();

        let registry = CarrierRegistry::from_specs(specs, &catalog).unwrap();
        let iso = registry.resolve("lab.IsoNet").unwrap();
        assert_eq!(iso.handle_fields, vec!["encoder", "decoder"]);
        assert_eq!(iso.artifact_name("IsoNet", "encoder"), "IsoNet_encoder");

        let sampled = registry.resolve("lab.SampledNetV2").unwrap();
        assert!(sampled.requires_custom_loader());
    }

    #[test]
    fn test_spec_with_unknown_symbol() {
        let specs = vec![RuleSpec {
            id: "X".to_string(),
            pattern: None,
            handle_fields: vec!["model_".to_string()],
            default_field: None,
            custom_objects: vec!["nope".to_string()],
        }];
        let result = CarrierRegistry::from_specs(specs, &CustomObjects::new());
        assert!(matches!(result, Err(StoreError::UnresolvedCustomObject(ref n)) if n == "nope"));
    }

    #[test]
    fn test_spec_validation() {
        let mut registry = CarrierRegistry::builtin();
        let bad_default = RuleSpec {
            id: "Y".to_string(),
            pattern: None,
            handle_fields: vec!["a".to_string()],
            default_field: Some("b".to_string()),
            custom_objects: vec![],
        };
        assert!(matches!(
            registry.extend(vec![bad_default], &CustomObjects::new()),
            Err(StoreError::InvalidRule { .. })
        ));

        let duplicate = RuleSpec {
            id: "VAE".to_string(),
            pattern: None,
            handle_fields: vec!["model_".to_string()],
            default_field: None,
            custom_objects: vec![],
        };
        assert!(registry.extend(vec![duplicate], &CustomObjects::new()).is_err());
    }

    #[test]
    fn test_custom_object_builder() {
        let identity: CustomFn = Arc::new(|xs: ArrayView1<'_, f64>| xs.to_owned());
        let rule = CarrierRule::new("Custom").with_custom_object("identity", identity);
        assert!(rule.requires_custom_loader());
    }

    #[test]
    fn test_load_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rules.json");
        std::fs::write(&path, r#"[{"id": "Extra", "handle_fields": ["net"]}]"#).unwrap();

        let registry = CarrierRegistry::from_json_file(&path, &CustomObjects::new()).unwrap();
        assert_eq!(registry.rules().len(), 1);

        let missing = RuleSpec::load_file(dir.path().join("absent.json"));
        assert!(matches!(missing, Err(ref e) if e.is_not_found()));
    }
}
