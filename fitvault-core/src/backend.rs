//! Execution backend contract
//!
//! A backend fits pipelines, holds fitted runtimes under opaque ids and
//! produces predictions from them. The store never fits anything itself; it
//! hands rebuilt runtimes to a backend through `register_runtime`.

use crate::domain::dataset::Dataset;
use crate::domain::pipeline::{PipelineDefinition, Runtime};
use crate::domain::problem::ProblemDescription;
use crate::dto::result::{EvaluationResult, PipelineResult};

pub trait Backend {
    /// Fits `pipeline` on `dataset`; on success the result carries the id
    /// of the fitted runtime and the training-data predictions.
    fn fit_pipeline(
        &mut self,
        problem: &ProblemDescription,
        pipeline: &PipelineDefinition,
        dataset: &Dataset,
    ) -> PipelineResult;

    /// Runs a previously fitted or registered runtime over `dataset`
    fn produce_pipeline(&self, fitted_pipeline_id: &str, dataset: &Dataset) -> PipelineResult;

    /// Fits and scores `pipeline` on the same data, without a split
    fn evaluate_pipeline(
        &mut self,
        problem: &ProblemDescription,
        pipeline: &PipelineDefinition,
        dataset: &Dataset,
    ) -> EvaluationResult;

    /// Registers an externally rebuilt runtime under a fresh random id
    fn register_runtime(&mut self, runtime: Runtime) -> String;

    /// Drops a held runtime, returning it if the id was known
    fn unregister_runtime(&mut self, fitted_pipeline_id: &str) -> Option<Runtime>;

    fn runtime(&self, fitted_pipeline_id: &str) -> Option<&Runtime>;
}
