//! Backend error types

use fitvault_core::native::NativeError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum BackendError {
    #[error("Unknown primitive '{0}'")]
    UnknownPrimitive(String),

    #[error("Fitted runtime '{0}' not found")]
    RuntimeNotFound(String),

    #[error("Step {step} ({primitive}) failed: {source}")]
    Step {
        step: usize,
        primitive: String,
        #[source]
        source: Box<BackendError>,
    },

    #[error("Runtime has {states} step state(s) for {steps} step(s)")]
    StateMismatch { steps: usize, states: usize },

    #[error("Step holds a carrier placeholder; the carrier must be installed before producing")]
    Placeholder,

    #[error("Step has no fitted state")]
    MissingState,

    #[error("Carrier is missing native handle '{0}'")]
    MissingHandle(String),

    #[error("Carrier attribute '{0}' is missing or malformed")]
    MissingAttribute(String),

    #[error("Pipeline does not end with a detector step")]
    NoDetector,

    #[error("Step {0} follows a detector; detectors must be the last step")]
    DetectorNotLast(usize),

    #[error("Invalid hyperparameter '{name}': {message}")]
    InvalidHyperparam { name: String, message: String },

    #[error("Problem does not declare the anomaly detection task")]
    UnsupportedTask,

    #[error("Dataset has no target column")]
    MissingTarget,

    #[error("Invalid positive label '{0}'")]
    InvalidPosLabel(String),

    #[error("Dataset is empty")]
    EmptyDataset,

    #[error("Row {row} has {found} column(s), expected {expected}")]
    RaggedRows {
        row: usize,
        expected: usize,
        found: usize,
    },

    #[error("Input has {found} column(s), the step was fitted on {expected}")]
    WidthMismatch { expected: usize, found: usize },

    #[error("Array shape error: {0}")]
    Shape(#[from] ndarray::ShapeError),

    #[error("Native model error: {0}")]
    Native(#[from] NativeError),
}

impl BackendError {
    /// Wraps an error raised while running one step
    pub fn at_step(self, step: usize, primitive: impl Into<String>) -> Self {
        BackendError::Step {
            step,
            primitive: primitive.into(),
            source: Box::new(self),
        }
    }

    pub fn invalid_hyperparam(name: impl Into<String>, message: impl Into<String>) -> Self {
        BackendError::InvalidHyperparam {
            name: name.into(),
            message: message.into(),
        }
    }
}
