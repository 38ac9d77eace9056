//! fitvault Runner
//!
//! In-process execution backend. It fits pipeline definitions step by step,
//! keeps fitted runtimes under opaque ids and produces detector output from
//! them, including runtimes rebuilt from disk and registered by the store.

pub mod backend;
pub mod error;
pub mod primitive;
pub mod primitives;
pub mod scoring;

pub use backend::LocalBackend;
pub use error::BackendError;
pub use primitive::{Hyperparams, Primitive, PrimitiveRegistry, StepOutput};
