//! Pipeline persistence service
//!
//! Saves fitted pipelines whose carriers hold native handles and rebuilds
//! them from disk.
//!
//! Saving works on a copy of the runtime: every carrier matched by a rule is
//! written to the model directory and replaced by a placeholder, then the
//! de-handled runtime and the model index are written next to it. Loading
//! reverses this in index order.

use crate::config::StoreConfig;
use crate::error::StoreError;
use crate::handles;
use crate::index::ModelIndex;
use crate::registry::CarrierRegistry;
use crate::repository::PipelineLayout;
use crate::repository::artifacts::{list_dirs, read_json, write_json};
use crate::walker;
use chrono::{DateTime, Utc};
use fitvault_core::backend::Backend;
use fitvault_core::domain::carrier::{Carrier, HandleHost};
use fitvault_core::domain::dataset::Dataset;
use fitvault_core::domain::pipeline::FittedPipeline;
use fitvault_core::domain::step::CarrierSlot;
use fitvault_core::dto::result::PipelineResult;
use fitvault_core::native::ModelCodec;
use fitvault_nn::DirectoryCodec;
use serde::Serialize;
use std::fs;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// One saved pipeline, as listed from its model index
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PipelineSummary {
    pub pipeline_id: Uuid,
    pub pipeline_name: String,
    pub saved_at: DateTime<Utc>,
    pub carriers: usize,
}

/// Model index and artifact files of one saved pipeline
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PipelineInspection {
    pub index: ModelIndex,
    pub artifacts: Vec<String>,
}

pub struct PipelineStore {
    config: StoreConfig,
    registry: CarrierRegistry,
    codec: Box<dyn ModelCodec>,
}

impl PipelineStore {
    /// Creates a store writing native models with the directory codec
    pub fn new(config: StoreConfig, registry: CarrierRegistry) -> Self {
        Self::with_codec(config, registry, Box::new(DirectoryCodec))
    }

    pub fn with_codec(config: StoreConfig, registry: CarrierRegistry, codec: Box<dyn ModelCodec>) -> Self {
        Self {
            config,
            registry,
            codec,
        }
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    pub fn registry(&self) -> &CarrierRegistry {
        &self.registry
    }

    pub fn layout(&self, pipeline_id: Uuid) -> PipelineLayout {
        PipelineLayout::new(&self.config, &pipeline_id.to_string())
    }

    // ============================================================================
    // Save / Load
    // ============================================================================

    /// Writes a fitted pipeline under `<root>/<pipeline_id>/`
    ///
    /// The caller's pipeline is left untouched. Saving the same pipeline
    /// again replaces the previous model directory.
    pub fn save(&self, fitted: &FittedPipeline) -> Result<Uuid, StoreError> {
        let pipeline_id = fitted.pipeline_id();
        let layout = self.layout(pipeline_id);
        info!("Saving pipeline {} to {}", pipeline_id, layout.dir().display());

        self.check_registered(fitted)?;
        layout.reset_model_dir()?;

        let mut runtime = fitted.runtime.clone();
        let mut index = ModelIndex::new(pipeline_id, runtime.pipeline.name.clone());
        let codec = self.codec.as_ref();

        walker::for_each_model_step_mut::<StoreError, _>(&mut runtime.steps_state, |step, slot| {
            let CarrierSlot::Attached(carrier) = slot else {
                return Ok(());
            };

            let Some(rule) = self.registry.resolve(&carrier.type_path) else {
                debug!("Step {} carrier {} has no handles; kept in tree", step, carrier.type_name());
                return Ok(());
            };

            let entry = index.record(step, carrier.type_name(), rule.id.clone());
            handles::extract(carrier, step, rule, &layout, &entry.artifact_stem, codec)?;
            debug!("Extracted step {} as {}", step, entry.artifact_stem);
            *slot = CarrierSlot::Placeholder;
            Ok(())
        })?;

        let stored = FittedPipeline {
            runtime,
            dataset_metadata: fitted.dataset_metadata.clone(),
        };
        write_json(&layout.fitted_pipeline_path(), &stored)?;
        write_json(&layout.index_path(), &index)?;

        info!(
            "Pipeline {} saved with {} native carrier(s)",
            pipeline_id,
            index.entries.len()
        );
        Ok(pipeline_id)
    }

    /// Fails before anything is written if a carrier holds handles no rule covers
    fn check_registered(&self, fitted: &FittedPipeline) -> Result<(), StoreError> {
        for (step, carrier) in walker::model_steps(&fitted.runtime.steps_state) {
            let attached = carrier.attached_fields();
            if !attached.is_empty() && self.registry.resolve(&carrier.type_path).is_none() {
                return Err(StoreError::UnregisteredHandles {
                    step,
                    carrier_type: carrier.type_name().to_string(),
                    fields: attached,
                });
            }
        }
        Ok(())
    }

    /// Rebuilds a saved pipeline with every native handle reattached
    pub fn load(&self, pipeline_id: Uuid) -> Result<FittedPipeline, StoreError> {
        let layout = self.layout(pipeline_id);
        info!("Loading pipeline {} from {}", pipeline_id, layout.dir().display());

        let index: ModelIndex = read_json(&layout.index_path())?;
        index.check_version()?;

        let mut fitted: FittedPipeline = read_json(&layout.fitted_pipeline_path())?;
        if fitted.pipeline_id() != pipeline_id || index.pipeline_id != pipeline_id {
            return Err(StoreError::CorruptArtifact(format!(
                "directory {} holds pipeline {}",
                pipeline_id,
                fitted.pipeline_id()
            )));
        }

        for entry in &index.entries {
            let rule = self
                .registry
                .rule(&entry.rule)
                .ok_or_else(|| StoreError::UnknownCarrierType {
                    carrier_type: entry.carrier_type.clone(),
                    rule: entry.rule.clone(),
                })?;

            let slot = fitted
                .runtime
                .steps_state
                .get_mut(entry.step_index)
                .and_then(|step| step.as_mut())
                .and_then(|state| state.carrier.as_mut())
                .filter(|slot| matches!(slot, CarrierSlot::Placeholder));
            let Some(slot) = slot else {
                return Err(StoreError::CorruptArtifact(format!(
                    "step {} has no placeholder for {}",
                    entry.step_index, entry.artifact_stem
                )));
            };

            let carrier: Carrier = handles::install(rule, &layout, &entry.artifact_stem, self.codec.as_ref())?;
            if carrier.type_name() != entry.carrier_type {
                return Err(StoreError::CorruptArtifact(format!(
                    "{} holds a {} carrier, expected {}",
                    entry.artifact_stem,
                    carrier.type_name(),
                    entry.carrier_type
                )));
            }

            debug!("Restored step {} from {}", entry.step_index, entry.artifact_stem);
            *slot = CarrierSlot::Attached(carrier);
        }

        let leftover = walker::placeholder_steps(&fitted.runtime.steps_state);
        if !leftover.is_empty() {
            return Err(StoreError::CorruptArtifact(format!(
                "step(s) {:?} have no index entry",
                leftover
            )));
        }

        info!("Pipeline {} loaded", pipeline_id);
        Ok(fitted)
    }

    // ============================================================================
    // Produce
    // ============================================================================

    /// Runs a loaded pipeline on new data through `backend`
    ///
    /// The dataset is annotated with the training metadata first, so a
    /// dataset with a different column count is rejected before the backend
    /// sees it. The runtime is registered for this call only.
    pub fn produce(
        &self,
        backend: &mut dyn Backend,
        fitted: &FittedPipeline,
        dataset: &Dataset,
    ) -> Result<PipelineResult, StoreError> {
        let mut dataset = dataset.clone();
        dataset.apply_metadata(&fitted.dataset_metadata)?;

        let runtime_id = backend.register_runtime(fitted.runtime.clone());
        debug!("Pipeline {} registered as runtime {}", fitted.pipeline_id(), runtime_id);

        let result = backend.produce_pipeline(&runtime_id, &dataset);
        backend.unregister_runtime(&runtime_id);
        if result.is_errored() {
            return Err(StoreError::BackendExecution(
                result.error.unwrap_or_else(|| "produce failed".to_string()),
            ));
        }
        Ok(result)
    }

    pub fn load_and_produce(
        &self,
        backend: &mut dyn Backend,
        pipeline_id: Uuid,
        dataset: &Dataset,
    ) -> Result<PipelineResult, StoreError> {
        let fitted = self.load(pipeline_id)?;
        self.produce(backend, &fitted, dataset)
    }

    // ============================================================================
    // Listing
    // ============================================================================

    /// Saved pipelines under the root, oldest first
    ///
    /// Directories that are not pipeline ids are ignored; unreadable ones
    /// are skipped with a warning.
    pub fn list(&self) -> Result<Vec<PipelineSummary>, StoreError> {
        let mut summaries = Vec::new();

        for name in list_dirs(&self.config.root)? {
            let Ok(pipeline_id) = Uuid::parse_str(&name) else {
                continue;
            };
            match read_json::<ModelIndex>(&self.layout(pipeline_id).index_path()) {
                Ok(index) => summaries.push(PipelineSummary {
                    pipeline_id,
                    pipeline_name: index.pipeline_name,
                    saved_at: index.saved_at,
                    carriers: index.entries.len(),
                }),
                Err(e) => warn!("Skipping {}: {}", name, e),
            }
        }

        summaries.sort_by_key(|s| s.saved_at);
        Ok(summaries)
    }

    pub fn inspect(&self, pipeline_id: Uuid) -> Result<PipelineInspection, StoreError> {
        let layout = self.layout(pipeline_id);
        let index: ModelIndex = read_json(&layout.index_path())?;
        Ok(PipelineInspection {
            index,
            artifacts: layout.artifacts()?,
        })
    }

    /// Deletes a saved pipeline directory
    pub fn remove(&self, pipeline_id: Uuid) -> Result<(), StoreError> {
        let layout = self.layout(pipeline_id);
        let dir = layout.dir();
        if !dir.is_dir() {
            return Err(StoreError::StorageNotFound {
                path: dir.to_path_buf(),
            });
        }

        fs::remove_dir_all(dir).map_err(|e| StoreError::io(dir, e))?;
        info!("Removed pipeline {}", pipeline_id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::{CarrierRule, MODEL_FIELD};
    use fitvault_core::domain::pipeline::{PipelineDefinition, Runtime};
    use fitvault_core::domain::problem::{MetricSpec, PerformanceMetric, ProblemDescription, TaskKeyword};
    use fitvault_core::domain::step::StepState;
    use fitvault_core::dto::result::EvaluationResult;
    use fitvault_runner::LocalBackend;
    use ndarray::Array2;
    use serde_json::json;
    use std::path::Path;

    fn dataset() -> Dataset {
        let rows = (0..40)
            .map(|i| {
                let x = (i as f64 * 0.3).cos();
                let outlier = i % 8 == 5;
                vec![x, if outlier { 7.5 } else { x * 2.0 }, if outlier { 1.0 } else { 0.0 }]
            })
            .collect();
        let names = vec!["a".to_string(), "b".to_string(), "label".to_string()];
        Dataset::new("toy", names, rows, Some(2)).unwrap()
    }

    fn problem() -> ProblemDescription {
        ProblemDescription {
            id: "toy_problem".to_string(),
            dataset_id: "toy".to_string(),
            task_keywords: vec![TaskKeyword::AnomalyDetection],
            performance_metrics: vec![MetricSpec::new(PerformanceMetric::F1)],
            target_index: Some(2),
        }
    }

    fn fit(backend: &mut LocalBackend, pipeline: &PipelineDefinition, data: &Dataset) -> FittedPipeline {
        let result = backend.fit_pipeline(&problem(), pipeline, data);
        let runtime = backend
            .unregister_runtime(result.fitted_pipeline_id.as_deref().unwrap())
            .unwrap();
        FittedPipeline {
            runtime,
            dataset_metadata: data.metadata.clone(),
        }
    }

    fn detector_pipeline(detector: &str) -> PipelineDefinition {
        PipelineDefinition::new(detector)
            .with_step("data_processing.impute_missing", json!({}))
            .with_step("data_processing.standard_scaler", json!({}))
            .with_step(detector, json!({"contamination": 0.125}))
    }

    fn store(root: &Path) -> PipelineStore {
        PipelineStore::new(StoreConfig::new(root), CarrierRegistry::builtin())
    }

    fn detector_carrier(fitted: &FittedPipeline) -> &Carrier {
        fitted.runtime.steps_state[2].as_ref().unwrap().carrier().unwrap()
    }

    /// Local backend that remembers which runtime ids it still holds
    struct TrackingBackend {
        inner: LocalBackend,
        held: Vec<String>,
    }

    impl TrackingBackend {
        fn new() -> Self {
            Self {
                inner: LocalBackend::new(0),
                held: Vec::new(),
            }
        }
    }

    impl Backend for TrackingBackend {
        fn fit_pipeline(
            &mut self,
            problem: &ProblemDescription,
            pipeline: &PipelineDefinition,
            dataset: &Dataset,
        ) -> PipelineResult {
            self.inner.fit_pipeline(problem, pipeline, dataset)
        }

        fn produce_pipeline(&self, fitted_pipeline_id: &str, dataset: &Dataset) -> PipelineResult {
            self.inner.produce_pipeline(fitted_pipeline_id, dataset)
        }

        fn evaluate_pipeline(
            &mut self,
            problem: &ProblemDescription,
            pipeline: &PipelineDefinition,
            dataset: &Dataset,
        ) -> EvaluationResult {
            self.inner.evaluate_pipeline(problem, pipeline, dataset)
        }

        fn register_runtime(&mut self, runtime: Runtime) -> String {
            let id = self.inner.register_runtime(runtime);
            self.held.push(id.clone());
            id
        }

        fn unregister_runtime(&mut self, fitted_pipeline_id: &str) -> Option<Runtime> {
            self.held.retain(|id| id != fitted_pipeline_id);
            self.inner.unregister_runtime(fitted_pipeline_id)
        }

        fn runtime(&self, fitted_pipeline_id: &str) -> Option<&Runtime> {
            self.inner.runtime(fitted_pipeline_id)
        }
    }

    /// Saves, reloads into a fresh backend and checks the output is unchanged
    fn assert_round_trip(detector: &str) -> FittedPipeline {
        let dir = tempfile::tempdir().unwrap();
        let store = store(dir.path());
        let mut backend = LocalBackend::new(4);
        let data = dataset();
        let fitted = fit(&mut backend, &detector_pipeline(detector), &data);
        let expected = store.produce(&mut backend, &fitted, &data).unwrap();

        let id = store.save(&fitted).unwrap();
        let mut fresh = LocalBackend::new(99);
        let produced = store.load_and_produce(&mut fresh, id, &data).unwrap();
        assert_eq!(produced.output, expected.output, "{}", detector);

        let loaded = store.load(id).unwrap();
        let original = detector_carrier(&fitted);
        let restored = detector_carrier(&loaded);
        assert_eq!(
            restored.handle_fields().collect::<Vec<_>>(),
            original.handle_fields().collect::<Vec<_>>()
        );
        for field in original.handle_fields() {
            let before = original.handle(field).unwrap();
            let after = restored.handle(field).unwrap();
            let input = Array2::from_shape_fn((5, before.input_dim()), |(i, j)| i as f64 * 0.5 - j as f64);
            assert_eq!(
                after.predict(input.view()).unwrap(),
                before.predict(input.view()).unwrap(),
                "{} field {}",
                detector,
                field
            );
        }
        loaded
    }

    #[test]
    fn test_round_trip_gives_same_predictions() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(dir.path());
        let mut backend = LocalBackend::new(3);
        let data = dataset();
        let fitted = fit(&mut backend, &detector_pipeline("detection.auto_encoder"), &data);
        let expected = store.produce(&mut backend, &fitted, &data).unwrap();

        let id = store.save(&fitted).unwrap();
        let layout = store.layout(id);
        assert!(layout.index_path().is_file());
        assert!(layout.fitted_pipeline_path().is_file());
        assert_eq!(layout.artifacts().unwrap(), vec!["AutoEncoder", "AutoEncoder.model"]);

        // A fresh backend knows nothing about the fitted runtime
        let mut fresh = LocalBackend::new(99);
        let produced = store.load_and_produce(&mut fresh, id, &data).unwrap();
        assert_eq!(produced.output, expected.output);
    }

    #[test]
    fn test_multi_handle_carrier() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(dir.path());
        let mut backend = LocalBackend::new(0);
        let data = dataset();
        let fitted = fit(&mut backend, &detector_pipeline("detection.so_gaal"), &data);

        let id = store.save(&fitted).unwrap();
        assert_eq!(
            store.layout(id).artifacts().unwrap(),
            vec![
                "SO_GAAL.model",
                "SO_GAAL_combine_model",
                "SO_GAAL_discriminator",
                "SO_GAAL_generator",
            ]
        );

        let loaded = assert_round_trip("detection.so_gaal");
        let carrier = detector_carrier(&loaded);
        assert_eq!(carrier.attached_fields().len(), 3);
        // combine_model is generator then discriminator, so only it and the
        // discriminator end in a single probability
        assert_eq!(carrier.handle("combine_model").unwrap().output_dim(), 1);
        assert_eq!(carrier.handle("discriminator").unwrap().output_dim(), 1);
        assert_eq!(carrier.handle("generator").unwrap().output_dim(), 2);
    }

    #[test]
    fn test_every_network_detector_round_trips() {
        for detector in [
            "detection.auto_encoder",
            "detection.vae",
            "detection.mo_gaal",
            "detection.lstm_od",
            "detection.deeplog",
            "detection.telemanom",
        ] {
            assert_round_trip(detector);
        }
    }

    #[test]
    fn test_first_registered_rule_extracts() {
        let dir = tempfile::tempdir().unwrap();
        let mut backend = LocalBackend::new(0);
        let data = dataset();
        let fitted = fit(&mut backend, &detector_pipeline("detection.auto_encoder"), &data);

        let named = CarrierRule::new("ae_named")
            .with_pattern("AutoEncoder")
            .with_field(MODEL_FIELD);
        let bare = CarrierRule::new("ae_bare")
            .with_pattern("Encoder")
            .with_default_field(MODEL_FIELD);

        let cases = [
            (vec![named.clone(), bare.clone()], "ae_named", vec!["AutoEncoder.model", "AutoEncoder_model_"]),
            (vec![bare, named], "ae_bare", vec!["AutoEncoder", "AutoEncoder.model"]),
        ];
        for (i, (rules, winner, artifacts)) in cases.into_iter().enumerate() {
            let mut registry = CarrierRegistry::new();
            for rule in rules {
                registry.register(rule);
            }
            let store = PipelineStore::new(StoreConfig::new(dir.path().join(i.to_string())), registry);

            let id = store.save(&fitted).unwrap();
            let index = store.inspect(id).unwrap().index;
            assert_eq!(index.entries.len(), 1);
            assert_eq!(index.entries[0].rule, winner);
            assert_eq!(store.layout(id).artifacts().unwrap(), artifacts);
            assert!(store.load_and_produce(&mut backend, id, &data).is_ok());
        }
    }

    #[test]
    fn test_produce_releases_runtime() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(dir.path());
        let data = dataset();
        let mut backend = TrackingBackend::new();
        let fitted = fit(&mut backend.inner, &detector_pipeline("detection.auto_encoder"), &data);
        let id = store.save(&fitted).unwrap();

        for _ in 0..5 {
            let result = store.load_and_produce(&mut backend, id, &data).unwrap();
            let runtime_id = result.fitted_pipeline_id.unwrap();
            assert!(backend.runtime(&runtime_id).is_none());
        }
        assert!(backend.held.is_empty());

        // A failing produce releases its runtime too
        let mut broken = fitted.clone();
        if let Some(state) = broken.runtime.steps_state[2].as_mut() {
            state.carrier = Some(CarrierSlot::Placeholder);
        }
        assert!(matches!(
            store.produce(&mut backend, &broken, &data),
            Err(StoreError::BackendExecution(_))
        ));
        assert!(backend.held.is_empty());
    }

    #[test]
    fn test_custom_object_carrier() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(dir.path());
        let mut backend = LocalBackend::new(1);
        let data = dataset();
        let fitted = fit(&mut backend, &detector_pipeline("detection.vae"), &data);
        let expected = store.produce(&mut backend, &fitted, &data).unwrap();

        let id = store.save(&fitted).unwrap();
        let produced = store.load_and_produce(&mut backend, id, &data).unwrap();
        assert_eq!(produced.output, expected.output);

        // Without the custom object the model cannot be rebuilt
        let bare = PipelineStore::new(
            StoreConfig::new(dir.path()),
            {
                let mut registry = CarrierRegistry::new();
                registry.register(CarrierRule::new("VAE").with_default_field(MODEL_FIELD));
                registry
            },
        );
        assert!(matches!(bare.load(id), Err(StoreError::UnresolvedCustomObject(_))));
    }

    #[test]
    fn test_plain_carrier_stays_in_tree() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(dir.path());
        let mut backend = LocalBackend::new(0);
        let data = dataset();
        let fitted = fit(&mut backend, &detector_pipeline("detection.zscore"), &data);

        let id = store.save(&fitted).unwrap();
        assert!(store.layout(id).artifacts().unwrap().is_empty());
        assert!(store.inspect(id).unwrap().index.entries.is_empty());

        let loaded = store.load(id).unwrap();
        let carrier = loaded.runtime.steps_state[2].as_ref().unwrap().carrier().unwrap();
        assert_eq!(carrier.type_name(), "ZScore");
        assert!(store.load_and_produce(&mut backend, id, &data).is_ok());
    }

    #[test]
    fn test_unknown_rule_on_load() {
        let dir = tempfile::tempdir().unwrap();
        let mut backend = LocalBackend::new(0);
        let data = dataset();
        let fitted = fit(&mut backend, &detector_pipeline("detection.mo_gaal"), &data);
        let id = store(dir.path()).save(&fitted).unwrap();

        let other = PipelineStore::new(StoreConfig::new(dir.path()), CarrierRegistry::new());
        assert!(matches!(
            other.load(id),
            Err(StoreError::UnknownCarrierType { ref carrier_type, .. }) if carrier_type == "MO_GAAL"
        ));
    }

    #[test]
    fn test_unregistered_handles_fail_save() {
        let dir = tempfile::tempdir().unwrap();
        let mut backend = LocalBackend::new(0);
        let data = dataset();
        let fitted = fit(&mut backend, &detector_pipeline("detection.deeplog"), &data);

        let store = PipelineStore::new(StoreConfig::new(dir.path()), CarrierRegistry::new());
        assert!(matches!(
            store.save(&fitted),
            Err(StoreError::UnregisteredHandles { step: 2, .. })
        ));
        assert!(!store.layout(fitted.pipeline_id()).dir().exists());
    }

    #[test]
    fn test_unregistered_handles_keep_previous_save() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(dir.path());
        let mut backend = LocalBackend::new(0);
        let data = dataset();
        let fitted = fit(&mut backend, &detector_pipeline("detection.auto_encoder"), &data);
        let id = store.save(&fitted).unwrap();
        let artifacts = store.layout(id).artifacts().unwrap();

        // Same pipeline id, now with a handle no rule covers on step 1
        let handle = detector_carrier(&fitted).handle(MODEL_FIELD).unwrap().clone();
        let mut changed = fitted.clone();
        changed.runtime.steps_state[1] =
            Some(StepState::new().with_carrier(Carrier::new("x.Mystery").with_handle(MODEL_FIELD, handle)));

        assert!(matches!(
            store.save(&changed),
            Err(StoreError::UnregisteredHandles { step: 1, .. })
        ));
        assert_eq!(store.layout(id).artifacts().unwrap(), artifacts);
        assert!(store.load_and_produce(&mut backend, id, &data).is_ok());
    }

    #[test]
    fn test_save_is_idempotent_and_non_mutating() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(dir.path());
        let mut backend = LocalBackend::new(0);
        let data = dataset();
        let fitted = fit(&mut backend, &detector_pipeline("detection.lstm_od"), &data);

        let id = store.save(&fitted).unwrap();
        let first = store.layout(id).artifacts().unwrap();
        let again = store.save(&fitted).unwrap();
        assert_eq!(id, again);
        assert_eq!(store.layout(id).artifacts().unwrap(), first);

        let carrier = fitted.runtime.steps_state[2].as_ref().unwrap().carrier().unwrap();
        assert!(carrier.handle(MODEL_FIELD).is_some());
        assert!(!fitted.runtime.steps_state[2].as_ref().unwrap().is_placeholder());
    }

    #[test]
    fn test_nested_handle_field() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(dir.path());
        let mut backend = LocalBackend::new(0);
        let data = dataset();
        let fitted = fit(&mut backend, &detector_pipeline("detection.telemanom"), &data);

        let id = store.save(&fitted).unwrap();
        assert_eq!(store.layout(id).artifacts().unwrap(), vec!["Detector", "Detector.model"]);
        assert!(store.load_and_produce(&mut backend, id, &data).is_ok());
    }

    #[test]
    fn test_deleted_artifact_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(dir.path());
        let mut backend = LocalBackend::new(0);
        let data = dataset();
        let fitted = fit(&mut backend, &detector_pipeline("detection.auto_encoder"), &data);
        let id = store.save(&fitted).unwrap();

        fs::remove_dir_all(store.layout(id).handle_path("AutoEncoder")).unwrap();
        assert!(store.load(id).unwrap_err().is_not_found());

        assert!(store.load(Uuid::new_v4()).unwrap_err().is_not_found());
    }

    #[test]
    fn test_same_carrier_type_twice() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(dir.path());
        let mut backend = LocalBackend::new(0);
        let data = dataset();
        let fitted = fit(&mut backend, &detector_pipeline("detection.auto_encoder"), &data);

        // Second carrier of the same type on the scaler step
        let mut twin = fitted.clone();
        let first = twin.runtime.steps_state[2].clone();
        twin.runtime.steps_state[1] = first;

        let id = store.save(&twin).unwrap();
        let inspection = store.inspect(id).unwrap();
        let stems: Vec<&str> = inspection
            .index
            .entries
            .iter()
            .map(|e| e.artifact_stem.as_str())
            .collect();
        assert_eq!(stems, vec!["AutoEncoder", "AutoEncoder@2"]);

        let loaded = store.load(id).unwrap();
        assert_eq!(walker::model_steps(&loaded.runtime.steps_state).count(), 2);
    }

    #[test]
    fn test_schema_mismatch_on_produce() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(dir.path());
        let mut backend = LocalBackend::new(0);
        let fitted = fit(&mut backend, &detector_pipeline("detection.zscore"), &dataset());

        let narrow = Dataset::new("narrow", vec!["a".to_string()], vec![vec![0.0]], None).unwrap();
        assert!(matches!(
            store.produce(&mut backend, &fitted, &narrow),
            Err(StoreError::SchemaMismatch { expected: 3, found: 1 })
        ));
    }

    #[test]
    fn test_list_inspect_remove() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(dir.path());
        assert!(store.list().unwrap().is_empty());

        let mut backend = LocalBackend::new(0);
        let data = dataset();
        let ae = store
            .save(&fit(&mut backend, &detector_pipeline("detection.auto_encoder"), &data))
            .unwrap();
        let zs = store
            .save(&fit(&mut backend, &detector_pipeline("detection.zscore"), &data))
            .unwrap();
        fs::create_dir(dir.path().join("not-a-pipeline")).unwrap();

        let listed = store.list().unwrap();
        let ids: Vec<Uuid> = listed.iter().map(|s| s.pipeline_id).collect();
        assert_eq!(ids, vec![ae, zs]);
        assert_eq!(listed[0].carriers, 1);
        assert_eq!(listed[1].pipeline_name, "detection.zscore");

        store.remove(ae).unwrap();
        assert_eq!(store.list().unwrap().len(), 1);
        assert!(store.remove(ae).unwrap_err().is_not_found());
        assert!(store.inspect(ae).unwrap_err().is_not_found());
    }
}
