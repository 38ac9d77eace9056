//! Experiment service
//!
//! Thin helpers around a backend: read a dataset or pipeline definition,
//! fit, evaluate and save.

use crate::error::StoreError;
use crate::repository::artifacts::read_json;
use crate::service::persistence::PipelineStore;
use crate::service::problem::generate_problem;
use fitvault_core::backend::Backend;
use fitvault_core::domain::dataset::Dataset;
use fitvault_core::domain::pipeline::{FittedPipeline, PipelineDefinition};
use fitvault_core::dto::result::EvaluationResult;
use std::path::Path;
use tracing::info;
use uuid::Uuid;

/// Reads a CSV dataset; `target_index` marks the true-target column
pub fn generate_dataset(path: impl AsRef<Path>, target_index: Option<usize>) -> Result<Dataset, StoreError> {
    let path = path.as_ref();
    if !path.is_file() {
        return Err(StoreError::StorageNotFound {
            path: path.to_path_buf(),
        });
    }

    let dataset = Dataset::from_csv(path, target_index)?;
    info!(
        "Loaded dataset '{}': {} row(s), {} column(s)",
        dataset.metadata.dataset_id,
        dataset.len(),
        dataset.n_columns()
    );
    Ok(dataset)
}

/// Reads a JSON pipeline definition
pub fn load_pipeline(path: impl AsRef<Path>) -> Result<PipelineDefinition, StoreError> {
    read_json(path.as_ref())
}

/// Fits `pipeline` through `backend` and takes the fitted runtime back from it
pub fn fit_pipeline(
    backend: &mut dyn Backend,
    dataset: &Dataset,
    pipeline: &PipelineDefinition,
    metric: &str,
) -> Result<FittedPipeline, StoreError> {
    let problem = generate_problem(dataset, metric)?;

    let result = backend.fit_pipeline(&problem, pipeline, dataset);
    if result.is_errored() {
        return Err(StoreError::BackendExecution(
            result.error.unwrap_or_else(|| "fit failed".to_string()),
        ));
    }

    let runtime_id = result
        .fitted_pipeline_id
        .ok_or_else(|| StoreError::BackendExecution("fit returned no runtime id".to_string()))?;
    let runtime = backend.unregister_runtime(&runtime_id).ok_or_else(|| {
        StoreError::BackendExecution(format!("backend does not hold runtime {}", runtime_id))
    })?;

    Ok(FittedPipeline {
        runtime,
        dataset_metadata: dataset.metadata.clone(),
    })
}

/// Fits and scores `pipeline` on the whole dataset
pub fn evaluate_pipeline(
    backend: &mut dyn Backend,
    dataset: &Dataset,
    pipeline: &PipelineDefinition,
    metric: &str,
) -> Result<EvaluationResult, StoreError> {
    let problem = generate_problem(dataset, metric)?;

    let result = backend.evaluate_pipeline(&problem, pipeline, dataset);
    if result.is_errored() {
        return Err(StoreError::BackendExecution(
            result.error.unwrap_or_else(|| "evaluation failed".to_string()),
        ));
    }
    Ok(result)
}

/// Fits `pipeline` and saves it, returning its pipeline id
pub fn fit_and_save(
    store: &PipelineStore,
    backend: &mut dyn Backend,
    dataset: &Dataset,
    pipeline: &PipelineDefinition,
    metric: &str,
) -> Result<Uuid, StoreError> {
    let fitted = fit_pipeline(backend, dataset, pipeline, metric)?;
    store.save(&fitted)
}
