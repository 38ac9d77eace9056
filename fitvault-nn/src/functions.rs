//! Built-in custom objects
//!
//! Lambda layers refer to functions by name. A saved graph only records the
//! name, so the loader must be handed the same function again.

use fitvault_core::native::{CustomFn, CustomObjects};
use ndarray::{Array1, ArrayView1, s};
use std::sync::Arc;

/// Symbol of the variational sampling function
pub const SAMPLING: &str = "sampling";

/// Reparametrisation step of a variational encoder.
///
/// The input is `[z_mean..., z_log_var...]`. Sampling is replaced by its
/// expectation so prediction stays deterministic: the result is `z_mean`.
pub fn sampling(input: ArrayView1<'_, f64>) -> Array1<f64> {
    input.slice(s![..input.len() / 2]).to_owned()
}

/// Catalog holding every built-in function
pub fn builtin_objects() -> CustomObjects {
    let sampling: CustomFn = Arc::new(sampling);
    CustomObjects::new().with(SAMPLING, sampling)
}
