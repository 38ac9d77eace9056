//! fitvault Core
//!
//! Core types and abstractions for the fitvault pipeline persistence system.
//!
//! This crate contains:
//! - Domain types: datasets, problem descriptions, pipeline definitions,
//!   fitted runtimes, step states and model carriers
//! - DTOs: results exchanged with an execution backend
//! - Native model traits: the seam to the neural-network model library
//! - The `Backend` trait implemented by pipeline execution backends

pub mod backend;
pub mod domain;
pub mod dto;
pub mod native;

pub use backend::Backend;
pub use native::{CustomFn, CustomObjects, ModelCodec, NativeError, NativeHandle, NativeModel};
