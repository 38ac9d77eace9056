//! Detector primitives
//!
//! Every detector fits a carrier and scores rows with it. The carrier type
//! path and handle field names are what the store keys its carrier rules on,
//! so they are part of the saved format.

use crate::error::BackendError;
use crate::primitive::{Hyperparams, Primitive, StepOutput};
use crate::primitives::{column_stats, to_matrix};
use fitvault_core::domain::carrier::Carrier;
use fitvault_core::domain::step::StepState;
use fitvault_core::native::{CustomFn, NativeHandle};
use fitvault_nn::{Activation, DenseNetwork, SAMPLING, sampling};
use ndarray::{Array1, Array2, Axis, s};
use rand::rngs::StdRng;
use std::sync::Arc;

/// Handle field of the single-model detectors
pub const MODEL_FIELD: &str = "model_";
/// Handle field of the telemanom detector's nested model
pub const NESTED_MODEL_FIELD: &str = "_model.model";
pub const DISCRIMINATOR_FIELD: &str = "discriminator";
pub const GENERATOR_FIELD: &str = "generator";
pub const COMBINE_FIELD: &str = "combine_model";

const THRESHOLD: &str = "threshold_";
const CONTAMINATION: &str = "contamination";
const N_FEATURES: &str = "n_features_";

/// Training-score quantile at `1 - contamination`, linearly interpolated
pub fn threshold_for(scores: &[f64], contamination: f64) -> f64 {
    let mut sorted = scores.to_vec();
    sorted.sort_by(f64::total_cmp);
    let Some(last) = sorted.len().checked_sub(1) else {
        return f64::INFINITY;
    };

    let position = (1.0 - contamination) * last as f64;
    let lower = position.floor() as usize;
    let upper = position.ceil() as usize;
    let weight = position - lower as f64;
    sorted[lower] + (sorted[upper] - sorted[lower]) * weight
}

fn label(scores: &[f64], threshold: f64) -> Vec<i64> {
    scores.iter().map(|&s| i64::from(s > threshold)).collect()
}

/// Mean squared error of every row against its reconstruction
fn row_errors(expected: &Array2<f64>, actual: &Array2<f64>) -> Result<Array1<f64>, BackendError> {
    if expected.dim() != actual.dim() {
        return Err(BackendError::WidthMismatch {
            expected: expected.ncols(),
            found: actual.ncols(),
        });
    }
    (expected - actual)
        .mapv_into(|d| d * d)
        .mean_axis(Axis(1))
        .ok_or(BackendError::EmptyDataset)
}

fn fit_matrix(input: &[Vec<f64>]) -> Result<Array2<f64>, BackendError> {
    let x = to_matrix(input)?;
    if x.nrows() == 0 {
        return Err(BackendError::EmptyDataset);
    }
    Ok(x)
}

fn threshold_of(carrier: &Carrier) -> Result<f64, BackendError> {
    carrier
        .attribute_as::<f64>(THRESHOLD)
        .ok_or_else(|| BackendError::MissingAttribute(THRESHOLD.to_string()))
}

fn carrier_of(state: Option<&StepState>) -> Result<&Carrier, BackendError> {
    let state = state.ok_or(BackendError::MissingState)?;
    if state.is_placeholder() {
        return Err(BackendError::Placeholder);
    }
    state.carrier().ok_or(BackendError::MissingState)
}

/// How a network detector turns model output into an anomaly score
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Scoring {
    /// Mean squared error between a row and its reconstruction
    Reconstruction,
    /// One minus the discriminator's probability that a row is real
    Discrimination,
    /// Mean squared error between a row and the forecast from the row before
    Forecast,
}

/// The neural detector families
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NetworkKind {
    AutoEncoder,
    Vae,
    SoGaal,
    MoGaal,
    Lstm,
    Deeplog,
    Telemanom,
}

impl NetworkKind {
    pub const ALL: [NetworkKind; 7] = [
        NetworkKind::AutoEncoder,
        NetworkKind::Vae,
        NetworkKind::SoGaal,
        NetworkKind::MoGaal,
        NetworkKind::Lstm,
        NetworkKind::Deeplog,
        NetworkKind::Telemanom,
    ];

    pub fn primitive_id(self) -> &'static str {
        match self {
            NetworkKind::AutoEncoder => "detection.auto_encoder",
            NetworkKind::Vae => "detection.vae",
            NetworkKind::SoGaal => "detection.so_gaal",
            NetworkKind::MoGaal => "detection.mo_gaal",
            NetworkKind::Lstm => "detection.lstm_od",
            NetworkKind::Deeplog => "detection.deeplog",
            NetworkKind::Telemanom => "detection.telemanom",
        }
    }

    pub fn type_path(self) -> &'static str {
        match self {
            NetworkKind::AutoEncoder => "fitvault.detectors.auto_encoder.AutoEncoder",
            NetworkKind::Vae => "fitvault.detectors.vae.VAE",
            NetworkKind::SoGaal => "fitvault.detectors.so_gaal.SO_GAAL",
            NetworkKind::MoGaal => "fitvault.detectors.mo_gaal.MO_GAAL",
            NetworkKind::Lstm => "fitvault.detectors.lstm.LSTMOutlierDetector",
            NetworkKind::Deeplog => "fitvault.detectors.deeplog.DeeplogLstm",
            NetworkKind::Telemanom => "fitvault.detectors.telemanom.Detector",
        }
    }

    /// Handle used to score rows
    pub fn scoring_field(self) -> &'static str {
        match self {
            NetworkKind::SoGaal | NetworkKind::MoGaal => DISCRIMINATOR_FIELD,
            NetworkKind::Telemanom => NESTED_MODEL_FIELD,
            _ => MODEL_FIELD,
        }
    }

    fn scoring(self) -> Scoring {
        match self {
            NetworkKind::AutoEncoder | NetworkKind::Vae => Scoring::Reconstruction,
            NetworkKind::SoGaal | NetworkKind::MoGaal => Scoring::Discrimination,
            NetworkKind::Lstm | NetworkKind::Deeplog | NetworkKind::Telemanom => Scoring::Forecast,
        }
    }

    /// Builds the seeded networks of this family, keyed by handle field
    fn build(
        self,
        n_features: usize,
        hyperparams: Hyperparams<'_>,
        rng: &mut StdRng,
    ) -> Result<Vec<(&'static str, DenseNetwork)>, BackendError> {
        let half = (n_features / 2).max(1);

        let networks = match self {
            NetworkKind::AutoEncoder => {
                let hidden = hyperparams.usize_or("hidden_neurons", half)?;
                let model = DenseNetwork::new("auto_encoder", n_features)
                    .dense(hidden, Activation::Relu, rng)
                    .dense(n_features, Activation::Linear, rng);
                vec![(MODEL_FIELD, model)]
            }
            NetworkKind::Vae => {
                let latent = hyperparams.usize_or("latent_dim", half)?;
                let sampling: CustomFn = Arc::new(sampling);
                let model = DenseNetwork::new("vae", n_features)
                    .dense(latent * 2, Activation::Linear, rng)
                    .lambda(SAMPLING, sampling, latent)
                    .dense(n_features, Activation::Linear, rng);
                vec![(MODEL_FIELD, model)]
            }
            NetworkKind::SoGaal => {
                let hidden = hyperparams.usize_or("hidden_neurons", n_features)?;
                let generator = DenseNetwork::new("generator", n_features)
                    .dense(n_features, Activation::Relu, rng)
                    .dense(n_features, Activation::Linear, rng);
                let discriminator = discriminator(n_features, hidden, rng);
                let combine = DenseNetwork::new("combine_model", n_features)
                    .then(&generator)?
                    .then(&discriminator)?;
                vec![
                    (COMBINE_FIELD, combine),
                    (DISCRIMINATOR_FIELD, discriminator),
                    (GENERATOR_FIELD, generator),
                ]
            }
            NetworkKind::MoGaal => {
                let hidden = hyperparams.usize_or("hidden_neurons", n_features)?;
                vec![(DISCRIMINATOR_FIELD, discriminator(n_features, hidden, rng))]
            }
            NetworkKind::Lstm => {
                let hidden = hyperparams.usize_or("hidden_dim", n_features)?;
                let model = DenseNetwork::new("lstm_od", n_features)
                    .dense(hidden, Activation::Tanh, rng)
                    .dense(n_features, Activation::Linear, rng);
                vec![(MODEL_FIELD, model)]
            }
            NetworkKind::Deeplog => {
                let hidden = hyperparams.usize_or("hidden_size", n_features)?;
                let model = DenseNetwork::new("deeplog", n_features)
                    .dense(hidden, Activation::Relu, rng)
                    .dense(hidden, Activation::Relu, rng)
                    .dense(n_features, Activation::Linear, rng);
                vec![(MODEL_FIELD, model)]
            }
            NetworkKind::Telemanom => {
                let hidden = hyperparams.usize_or("layers", n_features)?;
                let model = DenseNetwork::new("telemanom", n_features)
                    .dense(hidden, Activation::Tanh, rng)
                    .dense(n_features, Activation::Linear, rng);
                vec![(NESTED_MODEL_FIELD, model)]
            }
        };

        Ok(networks)
    }
}

fn discriminator(n_features: usize, hidden: usize, rng: &mut StdRng) -> DenseNetwork {
    DenseNetwork::new("discriminator", n_features)
        .dense(hidden, Activation::Relu, rng)
        .dense(1, Activation::Sigmoid, rng)
}

/// Detector backed by one or more native networks
pub struct NetworkDetector {
    kind: NetworkKind,
}

impl NetworkDetector {
    pub fn new(kind: NetworkKind) -> Self {
        Self { kind }
    }

    fn score(&self, model: &NativeHandle, x: &Array2<f64>) -> Result<Vec<f64>, BackendError> {
        let scores = match self.kind.scoring() {
            Scoring::Reconstruction => row_errors(x, &model.predict(x.view())?)?,
            Scoring::Discrimination => {
                let real = model.predict(x.view())?;
                if real.ncols() == 0 {
                    return Err(BackendError::WidthMismatch {
                        expected: 1,
                        found: 0,
                    });
                }
                real.column(0).mapv(|p| 1.0 - p)
            }
            Scoring::Forecast => {
                // Row i is forecast from row i - 1; the first row from itself
                let mut previous = x.clone();
                if x.nrows() > 1 {
                    previous.slice_mut(s![1.., ..]).assign(&x.slice(s![..-1, ..]));
                }
                row_errors(x, &model.predict(previous.view())?)?
            }
        };
        Ok(scores.to_vec())
    }
}

impl Primitive for NetworkDetector {
    fn id(&self) -> &'static str {
        self.kind.primitive_id()
    }

    fn fit(
        &self,
        input: &[Vec<f64>],
        hyperparams: Hyperparams<'_>,
        rng: &mut StdRng,
    ) -> Result<(Option<StepState>, StepOutput), BackendError> {
        let x = fit_matrix(input)?;
        let n_features = x.ncols();
        let contamination = hyperparams.contamination()?;

        let mut carrier = Carrier::new(self.kind.type_path())
            .with_attribute(CONTAMINATION, contamination)
            .with_attribute(N_FEATURES, n_features as u64);
        for (field, network) in self.kind.build(n_features, hyperparams, rng)? {
            carrier = carrier.with_handle(field, Arc::new(network));
        }

        let field = self.kind.scoring_field();
        let model = carrier
            .handle(field)
            .ok_or_else(|| BackendError::MissingHandle(field.to_string()))?;
        let scores = self.score(model, &x)?;
        let threshold = threshold_for(&scores, contamination);
        carrier.set_attribute(THRESHOLD, threshold);

        tracing::debug!(
            "Fitted {} on {} row(s), threshold {:.6}",
            carrier.type_name(),
            input.len(),
            threshold
        );

        let labels = label(&scores, threshold);
        Ok((
            Some(StepState::new().with_carrier(carrier)),
            StepOutput::Detections { scores, labels },
        ))
    }

    fn produce(
        &self,
        state: Option<&StepState>,
        _hyperparams: Hyperparams<'_>,
        input: &[Vec<f64>],
    ) -> Result<StepOutput, BackendError> {
        let carrier = carrier_of(state)?;
        let field = self.kind.scoring_field();
        let model = carrier
            .handle(field)
            .ok_or_else(|| BackendError::MissingHandle(field.to_string()))?;
        let threshold = threshold_of(carrier)?;

        let scores = self.score(model, &to_matrix(input)?)?;
        let labels = label(&scores, threshold);
        Ok(StepOutput::Detections { scores, labels })
    }
}

/// Largest absolute z-score across columns; keeps a plain carrier
pub struct ZScoreDetector;

pub const ZSCORE_TYPE: &str = "fitvault.detectors.zscore.ZScore";

impl ZScoreDetector {
    fn score(x: &Array2<f64>, mean: &Array1<f64>, std: &Array1<f64>) -> Result<Vec<f64>, BackendError> {
        if x.ncols() != mean.len() || x.ncols() != std.len() {
            return Err(BackendError::WidthMismatch {
                expected: mean.len(),
                found: x.ncols(),
            });
        }
        let z = ((x - mean) / std).mapv_into(f64::abs);
        Ok(z.map_axis(Axis(1), |row| row.fold(0.0_f64, |max, &v| max.max(v)))
            .to_vec())
    }
}

impl Primitive for ZScoreDetector {
    fn id(&self) -> &'static str {
        "detection.zscore"
    }

    fn fit(
        &self,
        input: &[Vec<f64>],
        hyperparams: Hyperparams<'_>,
        _rng: &mut StdRng,
    ) -> Result<(Option<StepState>, StepOutput), BackendError> {
        let x = fit_matrix(input)?;
        let contamination = hyperparams.contamination()?;
        let (mean, std) = column_stats(&x)?;

        let scores = Self::score(&x, &mean, &std)?;
        let threshold = threshold_for(&scores, contamination);
        let labels = label(&scores, threshold);

        let carrier = Carrier::new(ZSCORE_TYPE)
            .with_attribute(CONTAMINATION, contamination)
            .with_attribute("mean_", mean.to_vec())
            .with_attribute("std_", std.to_vec())
            .with_attribute(THRESHOLD, threshold);

        Ok((
            Some(StepState::new().with_carrier(carrier)),
            StepOutput::Detections { scores, labels },
        ))
    }

    fn produce(
        &self,
        state: Option<&StepState>,
        _hyperparams: Hyperparams<'_>,
        input: &[Vec<f64>],
    ) -> Result<StepOutput, BackendError> {
        let carrier = carrier_of(state)?;
        let read = |key: &str| -> Result<Array1<f64>, BackendError> {
            carrier
                .attribute_as::<Vec<f64>>(key)
                .map(Array1::from_vec)
                .ok_or_else(|| BackendError::MissingAttribute(key.to_string()))
        };
        let mean = read("mean_")?;
        let std = read("std_")?;
        let threshold = threshold_of(carrier)?;

        let scores = Self::score(&to_matrix(input)?, &mean, &std)?;
        let labels = label(&scores, threshold);
        Ok(StepOutput::Detections { scores, labels })
    }
}
