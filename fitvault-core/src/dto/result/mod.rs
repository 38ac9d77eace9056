//! Pipeline result DTOs

use crate::domain::problem::PerformanceMetric;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Outcome of a backend call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ResultStatus {
    Completed,
    Errored,
}

/// Per-row detector output
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Predictions {
    pub d3m_index: Vec<i64>,
    pub scores: Vec<f64>,
    /// 1 for an anomaly, 0 otherwise
    pub labels: Vec<i64>,
}

impl Predictions {
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn anomalies(&self) -> usize {
        self.labels.iter().filter(|&&l| l == 1).count()
    }
}

/// Result of a fit or produce call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineResult {
    pub status: ResultStatus,
    /// Id under which the backend holds the fitted runtime
    pub fitted_pipeline_id: Option<String>,
    pub output: Option<Predictions>,
    pub error: Option<String>,
}

impl PipelineResult {
    pub fn completed(fitted_pipeline_id: impl Into<String>, output: Predictions) -> Self {
        Self {
            status: ResultStatus::Completed,
            fitted_pipeline_id: Some(fitted_pipeline_id.into()),
            output: Some(output),
            error: None,
        }
    }

    pub fn errored(error: impl Into<String>) -> Self {
        Self {
            status: ResultStatus::Errored,
            fitted_pipeline_id: None,
            output: None,
            error: Some(error.into()),
        }
    }

    pub fn is_errored(&self) -> bool {
        self.status == ResultStatus::Errored
    }
}

/// Score of a single metric
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricScore {
    pub metric: PerformanceMetric,
    pub pos_label: Option<String>,
    pub value: f64,
}

/// Result of an evaluate call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationResult {
    pub status: ResultStatus,
    pub pipeline_id: Uuid,
    pub scores: Vec<MetricScore>,
    pub error: Option<String>,
}

impl EvaluationResult {
    pub fn completed(pipeline_id: Uuid, scores: Vec<MetricScore>) -> Self {
        Self {
            status: ResultStatus::Completed,
            pipeline_id,
            scores,
            error: None,
        }
    }

    pub fn errored(pipeline_id: Uuid, error: impl Into<String>) -> Self {
        Self {
            status: ResultStatus::Errored,
            pipeline_id,
            scores: Vec::new(),
            error: Some(error.into()),
        }
    }

    pub fn is_errored(&self) -> bool {
        self.status == ResultStatus::Errored
    }

    pub fn score(&self, metric: PerformanceMetric) -> Option<f64> {
        self.scores
            .iter()
            .find(|s| s.metric == metric)
            .map(|s| s.value)
    }
}
