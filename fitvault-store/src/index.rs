//! Model index
//!
//! The `orders` file of a saved pipeline. One entry per extracted carrier,
//! keyed by step index, so two steps holding the same carrier type are
//! stored and restored independently.

use crate::error::StoreError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const INDEX_FORMAT_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexEntry {
    pub step_index: usize,
    /// Carrier type id, the last segment of its type path
    pub carrier_type: String,
    /// Id of the carrier rule the carrier was saved with
    pub rule: String,
    /// File-name prefix of the carrier's artifacts
    pub artifact_stem: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelIndex {
    pub format_version: u32,
    pub pipeline_id: Uuid,
    pub pipeline_name: String,
    pub saved_at: DateTime<Utc>,
    pub entries: Vec<IndexEntry>,
}

impl ModelIndex {
    pub fn new(pipeline_id: Uuid, pipeline_name: impl Into<String>) -> Self {
        Self {
            format_version: INDEX_FORMAT_VERSION,
            pipeline_id,
            pipeline_name: pipeline_name.into(),
            saved_at: Utc::now(),
            entries: Vec::new(),
        }
    }

    /// Records a carrier and returns its entry.
    ///
    /// Carriers are recorded in step order. The first carrier of a type is
    /// stored under the type name; later ones get `<type>@<step>`.
    pub fn record(
        &mut self,
        step_index: usize,
        carrier_type: impl Into<String>,
        rule: impl Into<String>,
    ) -> IndexEntry {
        let carrier_type = carrier_type.into();
        let artifact_stem = if self.step_of(&carrier_type).is_some() {
            format!("{}@{}", carrier_type, step_index)
        } else {
            carrier_type.clone()
        };

        let entry = IndexEntry {
            step_index,
            carrier_type,
            rule: rule.into(),
            artifact_stem,
        };
        self.entries.push(entry.clone());
        entry
    }

    /// First step recorded for a carrier type
    pub fn step_of(&self, carrier_type: &str) -> Option<usize> {
        self.entries
            .iter()
            .find(|e| e.carrier_type == carrier_type)
            .map(|e| e.step_index)
    }

    pub fn check_version(&self) -> Result<(), StoreError> {
        if self.format_version != INDEX_FORMAT_VERSION {
            return Err(StoreError::UnsupportedFormat {
                found: self.format_version,
                expected: INDEX_FORMAT_VERSION,
            });
        }
        Ok(())
    }
}
