//! Directory codec for dense networks
//!
//! A saved model is a directory:
//! - `graph.json`: architecture, including lambda symbols
//! - `variables.bin`: every dense parameter as little-endian `f64`, in layer
//!   order, weights row by row followed by the bias
//!
//! Loading resolves lambda symbols against the caller's custom objects.

use crate::network::{Activation, DenseNetwork, Layer};
use fitvault_core::native::{CustomObjects, ModelCodec, NativeError, NativeHandle, NativeModel};
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::sync::Arc;

pub const GRAPH_FILE: &str = "graph.json";
pub const VARIABLES_FILE: &str = "variables.bin";
pub const FORMAT_VERSION: u32 = 1;

#[derive(Debug, Serialize, Deserialize)]
struct GraphConfig {
    format_version: u32,
    kind: String,
    name: String,
    input_dim: usize,
    layers: Vec<LayerConfig>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum LayerConfig {
    Dense {
        units: usize,
        inputs: usize,
        activation: Activation,
    },
    Lambda {
        function: String,
        output_dim: usize,
    },
}

/// Codec writing `DenseNetwork`s as model directories
#[derive(Debug, Clone, Copy, Default)]
pub struct DirectoryCodec;

impl ModelCodec for DirectoryCodec {
    fn save(&self, model: &dyn NativeModel, path: &Path) -> Result<(), NativeError> {
        let network = model
            .as_any()
            .downcast_ref::<DenseNetwork>()
            .ok_or_else(|| NativeError::Unsupported(model.kind().to_string()))?;

        let mut layers = Vec::with_capacity(network.layers().len());
        let mut variables = Vec::with_capacity(network.parameter_count() * 8);
        let mut inputs = network.input_dim();

        for layer in network.layers() {
            match layer {
                Layer::Dense {
                    weights,
                    bias,
                    activation,
                } => {
                    layers.push(LayerConfig::Dense {
                        units: bias.len(),
                        inputs,
                        activation: *activation,
                    });
                    for value in weights.iter().chain(bias.iter()) {
                        variables.extend_from_slice(&value.to_le_bytes());
                    }
                }
                Layer::Lambda {
                    function,
                    output_dim,
                    ..
                } => layers.push(LayerConfig::Lambda {
                    function: function.clone(),
                    output_dim: *output_dim,
                }),
            }
            inputs = layer.output_dim();
        }

        let graph = GraphConfig {
            format_version: FORMAT_VERSION,
            kind: network.kind().to_string(),
            name: network.name.clone(),
            input_dim: network.input_dim(),
            layers,
        };
        let graph_json =
            serde_json::to_vec_pretty(&graph).map_err(|e| NativeError::Format(e.to_string()))?;

        if path.is_dir() {
            fs::remove_dir_all(path).map_err(|e| NativeError::io(path, e))?;
        } else if path.exists() {
            fs::remove_file(path).map_err(|e| NativeError::io(path, e))?;
        }
        fs::create_dir_all(path).map_err(|e| NativeError::io(path, e))?;

        let graph_path = path.join(GRAPH_FILE);
        fs::write(&graph_path, graph_json).map_err(|e| NativeError::io(&graph_path, e))?;
        let variables_path = path.join(VARIABLES_FILE);
        fs::write(&variables_path, variables).map_err(|e| NativeError::io(&variables_path, e))?;

        tracing::debug!(
            "Saved network '{}' ({} parameters) to {}",
            network.name,
            network.parameter_count(),
            path.display()
        );
        Ok(())
    }

    fn load(&self, path: &Path, custom_objects: &CustomObjects) -> Result<NativeHandle, NativeError> {
        let graph_path = path.join(GRAPH_FILE);
        let graph_json = fs::read(&graph_path).map_err(|e| NativeError::io(&graph_path, e))?;
        let graph: GraphConfig =
            serde_json::from_slice(&graph_json).map_err(|e| NativeError::Format(e.to_string()))?;

        if graph.format_version != FORMAT_VERSION {
            return Err(NativeError::Format(format!(
                "unsupported graph format version {}",
                graph.format_version
            )));
        }
        if graph.kind != "dense" {
            return Err(NativeError::Unsupported(graph.kind));
        }

        let variables_path = path.join(VARIABLES_FILE);
        let bytes = fs::read(&variables_path).map_err(|e| NativeError::io(&variables_path, e))?;
        if bytes.len() % 8 != 0 {
            return Err(NativeError::Format(format!(
                "{} is {} bytes, not a whole number of f64 values",
                VARIABLES_FILE,
                bytes.len()
            )));
        }
        let mut values = bytes.chunks_exact(8).map(|chunk| {
            let mut buf = [0u8; 8];
            buf.copy_from_slice(chunk);
            f64::from_le_bytes(buf)
        });

        let mut network = DenseNetwork::new(graph.name, graph.input_dim);
        for layer in graph.layers {
            network = match layer {
                LayerConfig::Dense {
                    units,
                    inputs,
                    activation,
                } => {
                    let weights: Vec<f64> = values.by_ref().take(units * inputs).collect();
                    let bias: Vec<f64> = values.by_ref().take(units).collect();
                    if weights.len() != units * inputs || bias.len() != units {
                        return Err(truncated());
                    }
                    let weights = Array2::from_shape_vec((units, inputs), weights)
                        .map_err(|e| NativeError::Format(e.to_string()))?;
                    network.dense_with(weights, Array1::from_vec(bias), activation)?
                }
                LayerConfig::Lambda {
                    function,
                    output_dim,
                } => {
                    let resolved = custom_objects
                        .get(&function)
                        .cloned()
                        .ok_or_else(|| NativeError::UnresolvedCustomObject(function.clone()))?;
                    network.lambda(function, resolved, output_dim)
                }
            };
        }

        if values.next().is_some() {
            return Err(NativeError::Format(format!(
                "{} holds more values than the graph declares",
                VARIABLES_FILE
            )));
        }

        tracing::debug!("Loaded network '{}' from {}", network.name, path.display());
        Ok(Arc::new(network))
    }
}

fn truncated() -> NativeError {
    NativeError::Format(format!("{} ends before every layer is filled", VARIABLES_FILE))
}
