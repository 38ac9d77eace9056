//! Handle extraction and installation
//!
//! Moves the native handles of one carrier in and out of its artifact files
//! according to the carrier's rule.

use crate::error::StoreError;
use crate::registry::CarrierRule;
use crate::repository::PipelineLayout;
use crate::repository::artifacts::{read_json, write_json};
use fitvault_core::domain::carrier::HandleHost;
use fitvault_core::native::ModelCodec;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::debug;

/// Detaches every handle the rule names and writes it with the codec, then
/// writes the de-handled carrier as JSON.
///
/// Fails with `MissingHandle` if a named field holds nothing and with
/// `UnregisteredHandles` if the carrier still holds a handle afterwards.
pub fn extract<C>(
    carrier: &mut C,
    step: usize,
    rule: &CarrierRule,
    layout: &PipelineLayout,
    stem: &str,
    codec: &dyn ModelCodec,
) -> Result<(), StoreError>
where
    C: HandleHost + Serialize,
{
    for field in &rule.handle_fields {
        let handle = carrier
            .detach_handle(field)
            .ok_or_else(|| StoreError::MissingHandle {
                carrier_type: rule.id.clone(),
                field: field.clone(),
            })?;

        let path = layout.handle_path(&rule.artifact_name(stem, field));
        codec.save(handle.as_ref(), &path)?;
        debug!("Wrote handle '{}' of {} to {}", field, stem, path.display());
    }

    let leftover = carrier.attached_fields();
    if !leftover.is_empty() {
        return Err(StoreError::UnregisteredHandles {
            step,
            carrier_type: rule.id.clone(),
            fields: leftover,
        });
    }

    write_json(&layout.carrier_path(stem), &*carrier)
}

/// Reads a de-handled carrier and reattaches every handle the rule names
pub fn install<C>(
    rule: &CarrierRule,
    layout: &PipelineLayout,
    stem: &str,
    codec: &dyn ModelCodec,
) -> Result<C, StoreError>
where
    C: HandleHost + DeserializeOwned,
{
    let mut carrier: C = read_json(&layout.carrier_path(stem))?;

    for field in &rule.handle_fields {
        let path = layout.handle_path(&rule.artifact_name(stem, field));
        let handle = codec.load(&path, &rule.custom_objects)?;
        carrier.attach_handle(field, handle);
        debug!("Restored handle '{}' of {} from {}", field, stem, path.display());
    }

    Ok(carrier)
}
