//! Native model seam
//!
//! Native models are fitted neural networks that cannot pass through the
//! generic JSON serializer. They are held behind shared handles and written
//! to disk by a dedicated codec.

use ndarray::{Array1, Array2, ArrayView1, ArrayView2};
use std::any::Any;
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;

/// Errors raised by native models and their codecs
#[derive(Debug, Error)]
pub enum NativeError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid native model format: {0}")]
    Format(String),

    #[error("Custom object '{0}' is required to load this model but was not supplied")]
    UnresolvedCustomObject(String),

    #[error("Shape mismatch: expected {expected} value(s) per row, got {found}")]
    ShapeMismatch { expected: usize, found: usize },

    #[error("Unsupported native model: {0}")]
    Unsupported(String),
}

impl NativeError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        NativeError::Io {
            path: path.into(),
            source,
        }
    }

    /// Check if this error is a missing file or directory
    pub fn is_not_found(&self) -> bool {
        matches!(self, NativeError::Io { source, .. } if source.kind() == std::io::ErrorKind::NotFound)
    }
}

/// A fitted native model
pub trait NativeModel: fmt::Debug + Send + Sync {
    /// Short name of the model family, e.g. `dense`
    fn kind(&self) -> &str;

    fn input_dim(&self) -> usize;

    fn output_dim(&self) -> usize;

    /// Runs the model over a batch, one row per sample
    fn predict(&self, input: ArrayView2<'_, f64>) -> Result<Array2<f64>, NativeError>;

    /// Downcasting hook for codecs that only handle one concrete family
    fn as_any(&self) -> &dyn Any;
}

/// Shared, immutable reference to a native model
pub type NativeHandle = Arc<dyn NativeModel>;

/// A named function a native model graph refers to by symbol
pub type CustomFn = Arc<dyn Fn(ArrayView1<'_, f64>) -> Array1<f64> + Send + Sync>;

/// Catalog of custom objects passed to a codec at load time
#[derive(Clone, Default)]
pub struct CustomObjects {
    functions: BTreeMap<String, CustomFn>,
}

impl CustomObjects {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: impl Into<String>, function: CustomFn) -> Self {
        self.insert(name, function);
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, function: CustomFn) {
        self.functions.insert(name.into(), function);
    }

    pub fn get(&self, name: &str) -> Option<&CustomFn> {
        self.functions.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.functions.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.functions.keys().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }

    pub fn len(&self) -> usize {
        self.functions.len()
    }
}

impl fmt::Debug for CustomObjects {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.functions.keys()).finish()
    }
}

/// Writes and reads native models at a filesystem path
pub trait ModelCodec {
    /// Writes `model` to `path`, replacing whatever was there
    fn save(&self, model: &dyn NativeModel, path: &Path) -> Result<(), NativeError>;

    /// Reads a model from `path`, resolving symbols against `custom_objects`
    fn load(&self, path: &Path, custom_objects: &CustomObjects) -> Result<NativeHandle, NativeError>;
}
