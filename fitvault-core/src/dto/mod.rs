//! Data Transfer Objects exchanged with an execution backend
//!
//! Results are plain data so a backend can run in-process or be swapped for
//! a remote one without changing the store.

pub mod result;
