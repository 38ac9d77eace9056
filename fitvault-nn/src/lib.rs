//! fitvault Native Networks
//!
//! A small feed-forward network family used as the native model format of
//! fitted detectors. It includes:
//! - `DenseNetwork`: dense and lambda layers, deterministic prediction
//! - Built-in custom objects referenced by lambda layers
//! - `DirectoryCodec`: writes a model as `graph.json` plus `variables.bin`

pub mod codec;
pub mod functions;
pub mod network;

pub use codec::DirectoryCodec;
pub use functions::{SAMPLING, builtin_objects, sampling};
pub use network::{Activation, DenseNetwork, Layer};
