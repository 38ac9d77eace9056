//! Repository Module
//!
//! Filesystem access for the store.
//! The layout maps a pipeline id to its paths; the artifacts module reads
//! and writes the JSON files under them.

pub mod artifacts;
pub mod layout;

pub use layout::PipelineLayout;
