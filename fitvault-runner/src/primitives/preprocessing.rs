//! Preprocessing primitives

use crate::error::BackendError;
use crate::primitive::{Hyperparams, Primitive, StepOutput};
use crate::primitives::{column_stats, to_matrix, to_rows};
use fitvault_core::domain::step::StepState;
use ndarray::{Array1, Array2};
use rand::rngs::StdRng;

/// Centers every column and scales it to unit variance
pub struct StandardScaler;

impl StandardScaler {
    fn transform(x: Array2<f64>, mean: &Array1<f64>, scale: &Array1<f64>) -> Result<Vec<Vec<f64>>, BackendError> {
        if x.ncols() != mean.len() || x.ncols() != scale.len() {
            return Err(BackendError::WidthMismatch {
                expected: mean.len(),
                found: x.ncols(),
            });
        }
        Ok(to_rows(&((x - mean) / scale)))
    }
}

impl Primitive for StandardScaler {
    fn id(&self) -> &'static str {
        "data_processing.standard_scaler"
    }

    fn fit(
        &self,
        input: &[Vec<f64>],
        _hyperparams: Hyperparams<'_>,
        _rng: &mut StdRng,
    ) -> Result<(Option<StepState>, StepOutput), BackendError> {
        let x = to_matrix(input)?;
        let (mean, scale) = column_stats(&x)?;

        let output = Self::transform(x, &mean, &scale)?;
        let state = StepState::new()
            .with_value("mean", mean.to_vec())
            .with_value("scale", scale.to_vec());

        Ok((Some(state), StepOutput::Features(output)))
    }

    fn produce(
        &self,
        state: Option<&StepState>,
        _hyperparams: Hyperparams<'_>,
        input: &[Vec<f64>],
    ) -> Result<StepOutput, BackendError> {
        let state = state.ok_or(BackendError::MissingState)?;
        let read = |key: &str| -> Result<Array1<f64>, BackendError> {
            state
                .value(key)
                .and_then(|v| serde_json::from_value::<Vec<f64>>(v.clone()).ok())
                .map(Array1::from_vec)
                .ok_or_else(|| BackendError::MissingAttribute(key.to_string()))
        };
        let mean = read("mean")?;
        let scale = read("scale")?;

        let output = Self::transform(to_matrix(input)?, &mean, &scale)?;
        Ok(StepOutput::Features(output))
    }
}

/// Replaces missing values with a constant fill value.
///
/// Stateless: the fill value comes from the `fill_value` hyperparameter
/// (default 0).
pub struct ImputeMissing;

impl ImputeMissing {
    fn impute(input: &[Vec<f64>], fill: f64) -> Result<Vec<Vec<f64>>, BackendError> {
        let x = to_matrix(input)?.mapv_into(|x| if x.is_nan() { fill } else { x });
        Ok(to_rows(&x))
    }
}

impl Primitive for ImputeMissing {
    fn id(&self) -> &'static str {
        "data_processing.impute_missing"
    }

    fn fit(
        &self,
        input: &[Vec<f64>],
        hyperparams: Hyperparams<'_>,
        _rng: &mut StdRng,
    ) -> Result<(Option<StepState>, StepOutput), BackendError> {
        let fill = hyperparams.f64_or("fill_value", 0.0)?;
        Ok((None, StepOutput::Features(Self::impute(input, fill)?)))
    }

    fn produce(
        &self,
        _state: Option<&StepState>,
        hyperparams: Hyperparams<'_>,
        input: &[Vec<f64>],
    ) -> Result<StepOutput, BackendError> {
        let fill = hyperparams.f64_or("fill_value", 0.0)?;
        Ok(StepOutput::Features(Self::impute(input, fill)?))
    }
}
