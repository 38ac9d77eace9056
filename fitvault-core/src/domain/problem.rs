//! Problem description domain types
//!
//! The problem tells an execution backend what task a pipeline solves and
//! which performance metrics to score it with.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Positive label used by the binary metrics
pub const POSITIVE_LABEL: &str = "1";

/// Metric name outside the supported set
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Unsupported metric '{0}': expected one of F1, F1_MACRO, RECALL, PRECISION, ALL")]
pub struct UnsupportedMetric(pub String);

/// Task keywords a problem can carry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskKeyword {
    AnomalyDetection,
}

/// A single performance metric
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PerformanceMetric {
    F1,
    F1Macro,
    Recall,
    Precision,
}

impl PerformanceMetric {
    /// Whether the metric is computed for a single positive label
    pub fn needs_pos_label(&self) -> bool {
        !matches!(self, PerformanceMetric::F1Macro)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PerformanceMetric::F1 => "F1",
            PerformanceMetric::F1Macro => "F1_MACRO",
            PerformanceMetric::Recall => "RECALL",
            PerformanceMetric::Precision => "PRECISION",
        }
    }
}

impl fmt::Display for PerformanceMetric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a caller asks to be scored: one metric or all of them
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricSelection {
    Single(PerformanceMetric),
    All,
}

impl MetricSelection {
    /// Metrics this selection expands to, in reporting order
    pub fn metrics(&self) -> Vec<PerformanceMetric> {
        match self {
            MetricSelection::Single(metric) => vec![*metric],
            MetricSelection::All => vec![
                PerformanceMetric::Precision,
                PerformanceMetric::Recall,
                PerformanceMetric::F1Macro,
                PerformanceMetric::F1,
            ],
        }
    }
}

impl FromStr for MetricSelection {
    type Err = UnsupportedMetric;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "F1" => Ok(MetricSelection::Single(PerformanceMetric::F1)),
            "F1_MACRO" => Ok(MetricSelection::Single(PerformanceMetric::F1Macro)),
            "RECALL" => Ok(MetricSelection::Single(PerformanceMetric::Recall)),
            "PRECISION" => Ok(MetricSelection::Single(PerformanceMetric::Precision)),
            "ALL" => Ok(MetricSelection::All),
            other => Err(UnsupportedMetric(other.to_string())),
        }
    }
}

/// A metric together with its parameters
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricSpec {
    pub metric: PerformanceMetric,
    #[serde(default)]
    pub pos_label: Option<String>,
}

impl MetricSpec {
    pub fn new(metric: PerformanceMetric) -> Self {
        let pos_label = metric
            .needs_pos_label()
            .then(|| POSITIVE_LABEL.to_string());
        Self { metric, pos_label }
    }
}

/// Problem description handed to the backend alongside a pipeline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProblemDescription {
    pub id: String,
    pub dataset_id: String,
    pub task_keywords: Vec<TaskKeyword>,
    pub performance_metrics: Vec<MetricSpec>,
    pub target_index: Option<usize>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_single_metrics() {
        assert_eq!(
            "F1".parse::<MetricSelection>().unwrap(),
            MetricSelection::Single(PerformanceMetric::F1)
        );
        assert_eq!(
            "F1_MACRO".parse::<MetricSelection>().unwrap(),
            MetricSelection::Single(PerformanceMetric::F1Macro)
        );
        assert_eq!(
            "PRECISION".parse::<MetricSelection>().unwrap().metrics(),
            vec![PerformanceMetric::Precision]
        );
    }

    #[test]
    fn test_all_expands_in_order() {
        let all = "ALL".parse::<MetricSelection>().unwrap();
        assert_eq!(
            all.metrics(),
            vec![
                PerformanceMetric::Precision,
                PerformanceMetric::Recall,
                PerformanceMetric::F1Macro,
                PerformanceMetric::F1,
            ]
        );
    }

    #[test]
    fn test_unknown_metric() {
        let err = "BOGUS".parse::<MetricSelection>().unwrap_err();
        assert_eq!(err, UnsupportedMetric("BOGUS".to_string()));
        // Names are case-sensitive
        assert!("f1".parse::<MetricSelection>().is_err());
    }

    #[test]
    fn test_pos_label_assignment() {
        assert_eq!(
            MetricSpec::new(PerformanceMetric::Recall).pos_label.as_deref(),
            Some("1")
        );
        assert_eq!(MetricSpec::new(PerformanceMetric::F1Macro).pos_label, None);
    }

    #[test]
    fn test_metric_serializes_screaming_case() {
        let json = serde_json::to_string(&PerformanceMetric::F1Macro).unwrap();
        assert_eq!(json, "\"F1_MACRO\"");
        let keyword = serde_json::to_string(&TaskKeyword::AnomalyDetection).unwrap();
        assert_eq!(keyword, "\"ANOMALY_DETECTION\"");
    }
}
