//! Pipeline domain types

use crate::domain::dataset::DatasetMetadata;
use crate::domain::step::StepState;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use uuid::Uuid;

/// One step of a pipeline: a primitive id plus its hyperparameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepDefinition {
    pub primitive: String,
    #[serde(default)]
    pub hyperparams: BTreeMap<String, Value>,
}

/// Pipeline definition
///
/// The unfitted description of a pipeline. Its id is the pipeline identifier
/// used for on-disk storage once fitted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineDefinition {
    #[serde(default = "Uuid::new_v4")]
    pub id: Uuid,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub steps: Vec<StepDefinition>,
}

impl PipelineDefinition {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            description: None,
            steps: Vec::new(),
        }
    }

    pub fn with_step(mut self, primitive: impl Into<String>, hyperparams: Value) -> Self {
        let hyperparams = match hyperparams {
            Value::Object(map) => map.into_iter().collect(),
            _ => BTreeMap::new(),
        };
        self.steps.push(StepDefinition {
            primitive: primitive.into(),
            hyperparams,
        });
        self
    }
}

/// A fitted runtime: the pipeline plus the state of every step
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Runtime {
    pub pipeline: PipelineDefinition,
    /// One entry per pipeline step; `None` for stateless steps
    pub steps_state: Vec<Option<StepState>>,
    pub random_seed: u64,
    pub fitted_at: DateTime<Utc>,
}

/// A fitted pipeline and the dataset annotations it was trained against
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FittedPipeline {
    pub runtime: Runtime,
    pub dataset_metadata: DatasetMetadata,
}

impl FittedPipeline {
    pub fn pipeline_id(&self) -> Uuid {
        self.runtime.pipeline.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_builder_collects_hyperparams() {
        let pipeline = PipelineDefinition::new("ae")
            .with_step("data_processing.standard_scaler", json!({}))
            .with_step("detection.auto_encoder", json!({"contamination": 0.1}));

        assert_eq!(pipeline.steps.len(), 2);
        assert_eq!(pipeline.steps[1].hyperparams["contamination"], json!(0.1));
    }

    #[test]
    fn test_definition_id_defaults_when_missing() {
        let raw = json!({
            "name": "zscore",
            "steps": [{ "primitive": "detection.zscore" }]
        });
        let a: PipelineDefinition = serde_json::from_value(raw.clone()).unwrap();
        let b: PipelineDefinition = serde_json::from_value(raw).unwrap();
        assert_ne!(a.id, b.id);
        assert!(a.steps[0].hyperparams.is_empty());
    }
}
