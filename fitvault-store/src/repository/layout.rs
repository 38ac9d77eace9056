//! On-disk layout of one saved pipeline
//!
//! ```text
//! <root>/<pipeline_id>/
//!   fitted_pipeline.<ext>
//!   orders.<ext>
//!   model/
//!     <stem>.<ext>
//!     <stem>            (default handle)
//!     <stem>_<field>    (named handle)
//! ```

use crate::config::StoreConfig;
use crate::error::StoreError;
use std::fs;
use std::path::{Path, PathBuf};

pub const FITTED_PIPELINE: &str = "fitted_pipeline";
pub const ORDERS: &str = "orders";
pub const MODEL_DIR: &str = "model";

#[derive(Debug, Clone)]
pub struct PipelineLayout {
    dir: PathBuf,
    extension: String,
}

impl PipelineLayout {
    pub fn new(config: &StoreConfig, pipeline_id: &str) -> Self {
        Self {
            dir: config.root.join(pipeline_id),
            extension: config.extension.clone(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn model_dir(&self) -> PathBuf {
        self.dir.join(MODEL_DIR)
    }

    pub fn fitted_pipeline_path(&self) -> PathBuf {
        self.dir.join(format!("{}.{}", FITTED_PIPELINE, self.extension))
    }

    pub fn index_path(&self) -> PathBuf {
        self.dir.join(format!("{}.{}", ORDERS, self.extension))
    }

    /// JSON file of a de-handled carrier
    pub fn carrier_path(&self, stem: &str) -> PathBuf {
        self.model_dir().join(format!("{}.{}", stem, self.extension))
    }

    /// Native model directory of one handle
    pub fn handle_path(&self, artifact_name: &str) -> PathBuf {
        self.model_dir().join(artifact_name)
    }

    /// Empties the model directory, creating it and its parents if needed
    pub fn reset_model_dir(&self) -> Result<(), StoreError> {
        let model_dir = self.model_dir();
        if model_dir.exists() {
            fs::remove_dir_all(&model_dir).map_err(|e| StoreError::io(&model_dir, e))?;
        }
        fs::create_dir_all(&model_dir).map_err(|e| StoreError::io(&model_dir, e))
    }

    /// File names in the model directory, sorted
    pub fn artifacts(&self) -> Result<Vec<String>, StoreError> {
        let model_dir = self.model_dir();
        if !model_dir.exists() {
            return Ok(Vec::new());
        }

        let mut names = Vec::new();
        for entry in fs::read_dir(&model_dir).map_err(|e| StoreError::io(&model_dir, e))? {
            let entry = entry.map_err(|e| StoreError::io(&model_dir, e))?;
            names.push(entry.file_name().to_string_lossy().into_owned());
        }
        names.sort();
        Ok(names)
    }
}
