//! Step state domain types

use crate::domain::carrier::Carrier;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Contents of a step's model-carrier slot
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", content = "carrier", rename_all = "snake_case")]
pub enum CarrierSlot {
    Attached(Carrier),
    /// Carrier was stored separately and must be installed before use
    Placeholder,
}

/// Fitted state of one pipeline step
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StepState {
    /// Plain step-internal state, e.g. column means
    #[serde(default)]
    pub values: BTreeMap<String, Value>,
    #[serde(default)]
    pub carrier: Option<CarrierSlot>,
}

impl StepState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_value(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.values.insert(key.into(), value.into());
        self
    }

    pub fn with_carrier(mut self, carrier: Carrier) -> Self {
        self.carrier = Some(CarrierSlot::Attached(carrier));
        self
    }

    pub fn value(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    /// The attached carrier, if the slot holds one
    pub fn carrier(&self) -> Option<&Carrier> {
        match &self.carrier {
            Some(CarrierSlot::Attached(carrier)) => Some(carrier),
            _ => None,
        }
    }

    pub fn is_placeholder(&self) -> bool {
        matches!(self.carrier, Some(CarrierSlot::Placeholder))
    }
}
