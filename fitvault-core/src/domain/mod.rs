//! Core domain types
//!
//! This module contains the core domain structures shared by the execution
//! backend (which fits and produces pipelines) and the store (which persists
//! and rehydrates them).

pub mod carrier;
pub mod dataset;
pub mod pipeline;
pub mod problem;
pub mod step;
