//! Dense network model

use fitvault_core::native::{CustomFn, NativeError, NativeModel};
use ndarray::{Array1, Array2, ArrayView2};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::fmt;

/// Element-wise activation of a dense layer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Activation {
    Linear,
    Relu,
    Sigmoid,
    Tanh,
}

impl Activation {
    pub fn apply(self, x: f64) -> f64 {
        match self {
            Activation::Linear => x,
            Activation::Relu => x.max(0.0),
            Activation::Sigmoid => 1.0 / (1.0 + (-x).exp()),
            Activation::Tanh => x.tanh(),
        }
    }
}

/// One network layer
#[derive(Clone)]
pub enum Layer {
    Dense {
        /// `(units, inputs)`
        weights: Array2<f64>,
        bias: Array1<f64>,
        activation: Activation,
    },
    /// A named function applied to each sample's activation vector
    Lambda {
        function: String,
        output_dim: usize,
        resolved: CustomFn,
    },
}

impl Layer {
    pub fn output_dim(&self) -> usize {
        match self {
            Layer::Dense { bias, .. } => bias.len(),
            Layer::Lambda { output_dim, .. } => *output_dim,
        }
    }

    fn forward(&self, input: Array2<f64>) -> Result<Array2<f64>, NativeError> {
        match self {
            Layer::Dense {
                weights,
                bias,
                activation,
            } => {
                let activation = *activation;
                let z = input.dot(&weights.t()) + bias;
                Ok(z.mapv_into(|x| activation.apply(x)))
            }
            Layer::Lambda {
                output_dim,
                resolved,
                ..
            } => {
                let mut output = Array2::zeros((input.nrows(), *output_dim));
                for (row, mut out) in input.rows().into_iter().zip(output.rows_mut()) {
                    let value = resolved(row);
                    if value.len() != *output_dim {
                        return Err(NativeError::ShapeMismatch {
                            expected: *output_dim,
                            found: value.len(),
                        });
                    }
                    out.assign(&value);
                }
                Ok(output)
            }
        }
    }
}

impl fmt::Debug for Layer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Layer::Dense {
                bias, activation, ..
            } => f
                .debug_struct("Dense")
                .field("units", &bias.len())
                .field("activation", activation)
                .finish(),
            Layer::Lambda {
                function,
                output_dim,
                ..
            } => f
                .debug_struct("Lambda")
                .field("function", function)
                .field("output_dim", output_dim)
                .finish(),
        }
    }
}

/// Feed-forward network of dense and lambda layers
#[derive(Debug, Clone)]
pub struct DenseNetwork {
    pub name: String,
    input_dim: usize,
    layers: Vec<Layer>,
}

impl DenseNetwork {
    pub fn new(name: impl Into<String>, input_dim: usize) -> Self {
        Self {
            name: name.into(),
            input_dim,
            layers: Vec::new(),
        }
    }

    /// Appends a dense layer with Glorot-uniform weights and zero bias
    pub fn dense<R: Rng + ?Sized>(self, units: usize, activation: Activation, rng: &mut R) -> Self {
        let inputs = self.output_dim();
        let limit = (6.0 / (inputs + units).max(1) as f64).sqrt();
        let weights = Array2::from_shape_fn((units, inputs), |_| rng.random_range(-limit..=limit));

        self.push(Layer::Dense {
            weights,
            bias: Array1::zeros(units),
            activation,
        })
    }

    /// Appends a dense layer with explicit `(units, inputs)` weights
    pub fn dense_with(
        self,
        weights: Array2<f64>,
        bias: Array1<f64>,
        activation: Activation,
    ) -> Result<Self, NativeError> {
        let inputs = self.output_dim();
        if weights.nrows() != bias.len() {
            return Err(NativeError::ShapeMismatch {
                expected: bias.len(),
                found: weights.nrows(),
            });
        }
        if weights.ncols() != inputs {
            return Err(NativeError::ShapeMismatch {
                expected: inputs,
                found: weights.ncols(),
            });
        }

        Ok(self.push(Layer::Dense {
            weights,
            bias,
            activation,
        }))
    }

    /// Appends a lambda layer calling `function` under the symbol `name`
    pub fn lambda(self, name: impl Into<String>, function: CustomFn, output_dim: usize) -> Self {
        self.push(Layer::Lambda {
            function: name.into(),
            output_dim,
            resolved: function,
        })
    }

    /// Appends copies of every layer of `next`, feeding this network's output into it
    pub fn then(self, next: &DenseNetwork) -> Result<Self, NativeError> {
        let width = self.output_dim();
        if next.input_dim != width {
            return Err(NativeError::ShapeMismatch {
                expected: width,
                found: next.input_dim,
            });
        }
        Ok(next.layers.iter().cloned().fold(self, Self::push))
    }

    fn push(mut self, layer: Layer) -> Self {
        self.layers.push(layer);
        self
    }

    pub fn layers(&self) -> &[Layer] {
        &self.layers
    }

    pub fn parameter_count(&self) -> usize {
        self.layers
            .iter()
            .map(|layer| match layer {
                Layer::Dense { weights, bias, .. } => weights.len() + bias.len(),
                Layer::Lambda { .. } => 0,
            })
            .sum()
    }
}

impl NativeModel for DenseNetwork {
    fn kind(&self) -> &str {
        "dense"
    }

    fn input_dim(&self) -> usize {
        self.input_dim
    }

    fn output_dim(&self) -> usize {
        self.layers
            .last()
            .map(Layer::output_dim)
            .unwrap_or(self.input_dim)
    }

    fn predict(&self, input: ArrayView2<'_, f64>) -> Result<Array2<f64>, NativeError> {
        if input.ncols() != self.input_dim {
            return Err(NativeError::ShapeMismatch {
                expected: self.input_dim,
                found: input.ncols(),
            });
        }

        self.layers
            .iter()
            .try_fold(input.to_owned(), |activations, layer| layer.forward(activations))
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
