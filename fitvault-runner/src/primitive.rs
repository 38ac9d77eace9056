//! Primitive trait and registry

use crate::error::BackendError;
use fitvault_core::domain::step::StepState;
use rand::rngs::StdRng;
use serde_json::Value;
use std::collections::BTreeMap;

/// Output of one step
#[derive(Debug, Clone, PartialEq)]
pub enum StepOutput {
    /// Transformed feature rows, passed to the next step
    Features(Vec<Vec<f64>>),
    /// Per-row anomaly scores and labels; only the last step may emit these
    Detections { scores: Vec<f64>, labels: Vec<i64> },
}

/// Typed read access to a step's hyperparameters
#[derive(Debug, Clone, Copy)]
pub struct Hyperparams<'a> {
    values: &'a BTreeMap<String, Value>,
}

impl<'a> Hyperparams<'a> {
    pub fn new(values: &'a BTreeMap<String, Value>) -> Self {
        Self { values }
    }

    pub fn f64_or(&self, name: &str, default: f64) -> Result<f64, BackendError> {
        match self.values.get(name) {
            None => Ok(default),
            Some(value) => value
                .as_f64()
                .ok_or_else(|| BackendError::invalid_hyperparam(name, "expected a number")),
        }
    }

    pub fn usize_or(&self, name: &str, default: usize) -> Result<usize, BackendError> {
        match self.values.get(name) {
            None => Ok(default),
            Some(value) => value
                .as_u64()
                .filter(|&v| v > 0)
                .map(|v| v as usize)
                .ok_or_else(|| BackendError::invalid_hyperparam(name, "expected a positive integer")),
        }
    }

    /// Expected share of anomalies, in `(0, 0.5]`, default 0.1
    pub fn contamination(&self) -> Result<f64, BackendError> {
        let contamination = self.f64_or("contamination", 0.1)?;
        if !(contamination > 0.0 && contamination <= 0.5) {
            return Err(BackendError::invalid_hyperparam(
                "contamination",
                format!("{} is outside (0, 0.5]", contamination),
            ));
        }
        Ok(contamination)
    }
}

/// A pipeline step implementation.
///
/// `fit` learns state from the step's input and also returns the step's
/// output on that input. `produce` applies fitted state to new input.
/// Stateless primitives return `None` state.
pub trait Primitive: Send + Sync {
    /// Unique identifier referenced by pipeline definitions
    fn id(&self) -> &'static str;

    fn fit(
        &self,
        input: &[Vec<f64>],
        hyperparams: Hyperparams<'_>,
        rng: &mut StdRng,
    ) -> Result<(Option<StepState>, StepOutput), BackendError>;

    fn produce(
        &self,
        state: Option<&StepState>,
        hyperparams: Hyperparams<'_>,
        input: &[Vec<f64>],
    ) -> Result<StepOutput, BackendError>;
}

/// Registry of primitives available to a backend
pub struct PrimitiveRegistry {
    primitives: Vec<Box<dyn Primitive>>,
}

impl PrimitiveRegistry {
    /// Creates a new empty registry
    pub fn new() -> Self {
        Self {
            primitives: Vec::new(),
        }
    }

    /// Registers a primitive
    ///
    /// # Panics
    /// Panics if a primitive with the same ID is already registered
    pub fn register<P: Primitive + 'static>(&mut self, primitive: P) {
        let id = primitive.id();
        if self.primitives.iter().any(|p| p.id() == id) {
            panic!("Primitive with id '{}' is already registered", id);
        }
        self.primitives.push(Box::new(primitive));
    }

    /// Gets a primitive by its ID
    pub fn get(&self, id: &str) -> Option<&dyn Primitive> {
        self.primitives
            .iter()
            .find(|p| p.id() == id)
            .map(|p| p.as_ref())
    }

    /// Returns all registered primitives
    pub fn primitives(&self) -> &[Box<dyn Primitive>] {
        &self.primitives
    }
}

impl Default for PrimitiveRegistry {
    fn default() -> Self {
        Self::new()
    }
}
