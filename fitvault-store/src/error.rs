//! Store error types

use fitvault_core::domain::dataset::DatasetError;
use fitvault_core::domain::problem::UnsupportedMetric;
use fitvault_core::native::NativeError;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Backend execution failed: {0}")]
    BackendExecution(String),

    #[error("Storage not found: {}", path.display())]
    StorageNotFound { path: PathBuf },

    #[error("Unknown carrier type '{carrier_type}': no carrier rule '{rule}' is registered")]
    UnknownCarrierType { carrier_type: String, rule: String },

    #[error(transparent)]
    UnsupportedMetric(#[from] UnsupportedMetric),

    #[error("Carrier '{carrier_type}' at step {step} holds unregistered native handles: {}", fields.join(", "))]
    UnregisteredHandles {
        step: usize,
        carrier_type: String,
        fields: Vec<String>,
    },

    #[error("Carrier '{carrier_type}' has no native handle in field '{field}'")]
    MissingHandle { carrier_type: String, field: String },

    #[error("Custom object '{0}' is not available")]
    UnresolvedCustomObject(String),

    #[error("Invalid carrier rule '{id}': {message}")]
    InvalidRule { id: String, message: String },

    #[error("Unsupported store format version {found} (expected {expected})")]
    UnsupportedFormat { found: u32, expected: u32 },

    #[error("Corrupt artifact: {0}")]
    CorruptArtifact(String),

    #[error("Schema mismatch: pipeline was fitted on {expected} column(s), dataset has {found}")]
    SchemaMismatch { expected: usize, found: usize },

    #[error("Dataset error: {0}")]
    Dataset(#[source] DatasetError),

    #[error("Native model error: {0}")]
    Native(#[source] NativeError),

    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("JSON error in {}: {source}", path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

impl StoreError {
    /// I/O error on `path`; a missing file becomes `StorageNotFound`
    pub fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        let path = path.into();
        if source.kind() == io::ErrorKind::NotFound {
            StoreError::StorageNotFound { path }
        } else {
            StoreError::Io { path, source }
        }
    }

    pub fn json(path: impl Into<PathBuf>, source: serde_json::Error) -> Self {
        StoreError::Json {
            path: path.into(),
            source,
        }
    }

    /// Check if this error is a missing file or directory
    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::StorageNotFound { .. })
    }
}

impl From<NativeError> for StoreError {
    fn from(err: NativeError) -> Self {
        match err {
            NativeError::UnresolvedCustomObject(name) => StoreError::UnresolvedCustomObject(name),
            NativeError::Io { path, source } => StoreError::io(path, source),
            other => StoreError::Native(other),
        }
    }
}

impl From<DatasetError> for StoreError {
    fn from(err: DatasetError) -> Self {
        match err {
            DatasetError::SchemaMismatch { expected, found } => {
                StoreError::SchemaMismatch { expected, found }
            }
            other => StoreError::Dataset(other),
        }
    }
}
