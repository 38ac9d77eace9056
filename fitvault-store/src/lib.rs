//! fitvault Store
//!
//! Persists fitted pipelines whose step states hold native model handles,
//! and rebuilds produce-ready pipelines from disk.
//!
//! This crate contains:
//! - Carrier registry: which carrier types own which native handles
//! - Handle extraction and installation for a single carrier
//! - A walker over a runtime's step states
//! - `PipelineStore`: save, load and produce over the on-disk layout
//! - Problem generation and experiment helpers around a backend

pub mod config;
pub mod error;
pub mod handles;
pub mod index;
pub mod registry;
pub mod repository;
pub mod service;
pub mod walker;

pub use config::StoreConfig;
pub use error::StoreError;
pub use index::{IndexEntry, ModelIndex};
pub use registry::{CarrierRegistry, CarrierRule, RuleSpec};
pub use service::experiment::{
    evaluate_pipeline, fit_and_save, fit_pipeline, generate_dataset, load_pipeline,
};
pub use service::persistence::{PipelineInspection, PipelineStore, PipelineSummary};
pub use service::problem::generate_problem;
