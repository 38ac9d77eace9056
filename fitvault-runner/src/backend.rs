//! Local execution backend
//!
//! Runs pipelines in-process:
//! - Fitting each step in order and collecting its state
//! - Holding fitted runtimes under opaque ids
//! - Producing detector output from a held runtime
//! - Scoring fitted pipelines against the dataset target
//!
//! Failures are reported as errored results, never as panics.

use crate::error::BackendError;
use crate::primitive::{Hyperparams, PrimitiveRegistry, StepOutput};
use crate::scoring;
use chrono::Utc;
use fitvault_core::backend::Backend;
use fitvault_core::domain::dataset::Dataset;
use fitvault_core::domain::pipeline::{PipelineDefinition, Runtime};
use fitvault_core::domain::problem::{ProblemDescription, TaskKeyword};
use fitvault_core::dto::result::{EvaluationResult, MetricScore, PipelineResult, Predictions};
use rand::SeedableRng;
use rand::rngs::StdRng;
use std::collections::HashMap;
use tracing::{debug, info, warn};
use uuid::Uuid;

pub struct LocalBackend {
    random_seed: u64,
    primitives: PrimitiveRegistry,
    fitted_pipelines: HashMap<String, Runtime>,
}

impl LocalBackend {
    /// Creates a backend with every built-in primitive
    pub fn new(random_seed: u64) -> Self {
        Self::with_registry(random_seed, PrimitiveRegistry::builtin())
    }

    pub fn with_registry(random_seed: u64, primitives: PrimitiveRegistry) -> Self {
        Self {
            random_seed,
            primitives,
            fitted_pipelines: HashMap::new(),
        }
    }

    /// Fits every step in order, returning the runtime and its training output
    fn fit_runtime(
        &self,
        problem: &ProblemDescription,
        pipeline: &PipelineDefinition,
        dataset: &Dataset,
    ) -> Result<(Runtime, Predictions), BackendError> {
        if !problem.task_keywords.contains(&TaskKeyword::AnomalyDetection) {
            return Err(BackendError::UnsupportedTask);
        }
        if dataset.is_empty() {
            return Err(BackendError::EmptyDataset);
        }

        let mut rng = StdRng::seed_from_u64(self.random_seed);
        let mut steps_state = Vec::with_capacity(pipeline.steps.len());
        let mut current = StepOutput::Features(dataset.features());

        for (idx, step) in pipeline.steps.iter().enumerate() {
            let primitive = self
                .primitives
                .get(&step.primitive)
                .ok_or_else(|| BackendError::UnknownPrimitive(step.primitive.clone()))?;
            let StepOutput::Features(input) = &current else {
                return Err(BackendError::DetectorNotLast(idx));
            };

            debug!("Fitting step {}: {}", idx, step.primitive);
            let (state, output) = primitive
                .fit(input, Hyperparams::new(&step.hyperparams), &mut rng)
                .map_err(|e| e.at_step(idx, &step.primitive))?;
            steps_state.push(state);
            current = output;
        }

        let predictions = into_predictions(current, dataset)?;
        let runtime = Runtime {
            pipeline: pipeline.clone(),
            steps_state,
            random_seed: self.random_seed,
            fitted_at: Utc::now(),
        };
        Ok((runtime, predictions))
    }

    /// Applies a fitted runtime to a dataset
    pub fn run(&self, runtime: &Runtime, dataset: &Dataset) -> Result<Predictions, BackendError> {
        let steps = &runtime.pipeline.steps;
        if steps.len() != runtime.steps_state.len() {
            return Err(BackendError::StateMismatch {
                steps: steps.len(),
                states: runtime.steps_state.len(),
            });
        }

        let mut current = StepOutput::Features(dataset.features());
        for (idx, (step, state)) in steps.iter().zip(&runtime.steps_state).enumerate() {
            let primitive = self
                .primitives
                .get(&step.primitive)
                .ok_or_else(|| BackendError::UnknownPrimitive(step.primitive.clone()))?;
            let StepOutput::Features(input) = &current else {
                return Err(BackendError::DetectorNotLast(idx));
            };

            current = primitive
                .produce(state.as_ref(), Hyperparams::new(&step.hyperparams), input)
                .map_err(|e| e.at_step(idx, &step.primitive))?;
        }

        into_predictions(current, dataset)
    }

    fn evaluate(
        &self,
        problem: &ProblemDescription,
        pipeline: &PipelineDefinition,
        dataset: &Dataset,
    ) -> Result<Vec<MetricScore>, BackendError> {
        let truth: Vec<i64> = dataset
            .targets()
            .ok_or(BackendError::MissingTarget)?
            .iter()
            .map(|t| t.round() as i64)
            .collect();

        let (_, predictions) = self.fit_runtime(problem, pipeline, dataset)?;
        problem
            .performance_metrics
            .iter()
            .map(|spec| scoring::score(spec, &truth, &predictions.labels))
            .collect()
    }
}

fn into_predictions(output: StepOutput, dataset: &Dataset) -> Result<Predictions, BackendError> {
    match output {
        StepOutput::Detections { scores, labels } => Ok(Predictions {
            d3m_index: dataset.d3m_index.clone(),
            scores,
            labels,
        }),
        StepOutput::Features(_) => Err(BackendError::NoDetector),
    }
}

impl Backend for LocalBackend {
    fn fit_pipeline(
        &mut self,
        problem: &ProblemDescription,
        pipeline: &PipelineDefinition,
        dataset: &Dataset,
    ) -> PipelineResult {
        info!(
            "Fitting pipeline '{}' ({}) on {} row(s)",
            pipeline.name,
            pipeline.id,
            dataset.len()
        );

        match self.fit_runtime(problem, pipeline, dataset) {
            Ok((runtime, predictions)) => {
                let id = self.register_runtime(runtime);
                info!("Pipeline '{}' fitted as runtime {}", pipeline.name, id);
                PipelineResult::completed(id, predictions)
            }
            Err(e) => {
                warn!("Fitting pipeline '{}' failed: {}", pipeline.name, e);
                PipelineResult::errored(e.to_string())
            }
        }
    }

    fn produce_pipeline(&self, fitted_pipeline_id: &str, dataset: &Dataset) -> PipelineResult {
        let Some(runtime) = self.fitted_pipelines.get(fitted_pipeline_id) else {
            return PipelineResult::errored(
                BackendError::RuntimeNotFound(fitted_pipeline_id.to_string()).to_string(),
            );
        };

        match self.run(runtime, dataset) {
            Ok(predictions) => {
                debug!(
                    "Runtime {} flagged {} of {} row(s)",
                    fitted_pipeline_id,
                    predictions.anomalies(),
                    predictions.len()
                );
                PipelineResult::completed(fitted_pipeline_id, predictions)
            }
            Err(e) => {
                warn!("Producing runtime {} failed: {}", fitted_pipeline_id, e);
                PipelineResult::errored(e.to_string())
            }
        }
    }

    fn evaluate_pipeline(
        &mut self,
        problem: &ProblemDescription,
        pipeline: &PipelineDefinition,
        dataset: &Dataset,
    ) -> EvaluationResult {
        info!("Evaluating pipeline '{}' without a split", pipeline.name);
        match self.evaluate(problem, pipeline, dataset) {
            Ok(scores) => EvaluationResult::completed(pipeline.id, scores),
            Err(e) => {
                warn!("Evaluating pipeline '{}' failed: {}", pipeline.name, e);
                EvaluationResult::errored(pipeline.id, e.to_string())
            }
        }
    }

    fn register_runtime(&mut self, runtime: Runtime) -> String {
        let id = Uuid::new_v4().to_string();
        self.fitted_pipelines.insert(id.clone(), runtime);
        id
    }

    fn unregister_runtime(&mut self, fitted_pipeline_id: &str) -> Option<Runtime> {
        let runtime = self.fitted_pipelines.remove(fitted_pipeline_id);
        if runtime.is_some() {
            debug!("Released runtime {}", fitted_pipeline_id);
        }
        runtime
    }

    fn runtime(&self, fitted_pipeline_id: &str) -> Option<&Runtime> {
        self.fitted_pipelines.get(fitted_pipeline_id)
    }
}
