//! Service Module
//!
//! Business logic layer for the store.
//! Services coordinate the registry, handle extraction and the repository,
//! and drive an injected execution backend.

pub mod experiment;
pub mod persistence;
pub mod problem;

// Re-export for convenience
pub use experiment as experiment_service;
pub use persistence as persistence_service;
