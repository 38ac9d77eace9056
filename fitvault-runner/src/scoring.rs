//! Metric scoring
//!
//! Binary metrics are computed for the problem's positive label; macro F1
//! averages the F1 of both labels.

use crate::error::BackendError;
use fitvault_core::domain::problem::{MetricSpec, PerformanceMetric};
use fitvault_core::dto::result::MetricScore;

#[derive(Debug, Default, Clone, Copy)]
struct Counts {
    tp: usize,
    fp: usize,
    fn_: usize,
}

fn counts(truth: &[i64], predicted: &[i64], positive: i64) -> Counts {
    truth
        .iter()
        .zip(predicted)
        .fold(Counts::default(), |mut c, (&t, &p)| {
            match (t == positive, p == positive) {
                (true, true) => c.tp += 1,
                (false, true) => c.fp += 1,
                (true, false) => c.fn_ += 1,
                (false, false) => {}
            }
            c
        })
}

fn ratio(num: usize, den: usize) -> f64 {
    if den == 0 { 0.0 } else { num as f64 / den as f64 }
}

pub fn precision(truth: &[i64], predicted: &[i64], positive: i64) -> f64 {
    let c = counts(truth, predicted, positive);
    ratio(c.tp, c.tp + c.fp)
}

pub fn recall(truth: &[i64], predicted: &[i64], positive: i64) -> f64 {
    let c = counts(truth, predicted, positive);
    ratio(c.tp, c.tp + c.fn_)
}

pub fn f1(truth: &[i64], predicted: &[i64], positive: i64) -> f64 {
    let p = precision(truth, predicted, positive);
    let r = recall(truth, predicted, positive);
    if p + r == 0.0 { 0.0 } else { 2.0 * p * r / (p + r) }
}

pub fn f1_macro(truth: &[i64], predicted: &[i64]) -> f64 {
    (f1(truth, predicted, 0) + f1(truth, predicted, 1)) / 2.0
}

/// Scores `predicted` against `truth` for one metric spec
pub fn score(spec: &MetricSpec, truth: &[i64], predicted: &[i64]) -> Result<MetricScore, BackendError> {
    let positive = || -> Result<i64, BackendError> {
        let label = spec.pos_label.as_deref().unwrap_or("1");
        label
            .parse::<i64>()
            .map_err(|_| BackendError::InvalidPosLabel(label.to_string()))
    };

    let value = match spec.metric {
        PerformanceMetric::F1 => f1(truth, predicted, positive()?),
        PerformanceMetric::Precision => precision(truth, predicted, positive()?),
        PerformanceMetric::Recall => recall(truth, predicted, positive()?),
        PerformanceMetric::F1Macro => f1_macro(truth, predicted),
    };

    Ok(MetricScore {
        metric: spec.metric,
        pos_label: spec.pos_label.clone(),
        value,
    })
}
