//! Problem generation

use crate::error::StoreError;
use fitvault_core::domain::dataset::Dataset;
use fitvault_core::domain::problem::{MetricSelection, MetricSpec, ProblemDescription, TaskKeyword};

/// Builds an anomaly detection problem over `dataset`.
///
/// `metric` is one of `F1`, `F1_MACRO`, `RECALL`, `PRECISION` or `ALL`.
/// Binary metrics score the positive label `"1"`.
pub fn generate_problem(dataset: &Dataset, metric: &str) -> Result<ProblemDescription, StoreError> {
    let selection: MetricSelection = metric.parse()?;
    let dataset_id = dataset.metadata.dataset_id.clone();

    Ok(ProblemDescription {
        id: format!("{}_problem", dataset_id),
        dataset_id,
        task_keywords: vec![TaskKeyword::AnomalyDetection],
        performance_metrics: selection.metrics().into_iter().map(MetricSpec::new).collect(),
        target_index: dataset.metadata.target_column(),
    })
}
