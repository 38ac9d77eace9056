//! ID resolver module
//!
//! Resolves pipeline id prefixes against the pipelines saved in the store,
//! so users can type a short unambiguous prefix instead of a full UUID.

use anyhow::{Context, Result, anyhow};
use fitvault_store::PipelineStore;
use uuid::Uuid;

use crate::types::IdOrPrefix;

/// Resolve a pipeline ID or prefix to a full UUID
///
/// A full UUID is returned as is, even if nothing is saved under it.
///
/// # Errors
/// Returns an error if:
/// - No saved pipeline matches the prefix
/// - Multiple saved pipelines match the prefix (ambiguous)
/// - The store root cannot be listed
pub fn resolve_pipeline_id(store: &PipelineStore, id_or_prefix: &IdOrPrefix) -> Result<Uuid> {
    if let Some(uuid) = id_or_prefix.as_uuid() {
        return Ok(uuid);
    }

    let ids: Vec<Uuid> = store
        .list()
        .context("Failed to list saved pipelines for ID resolution")?
        .into_iter()
        .map(|s| s.pipeline_id)
        .collect();

    match_prefix(&ids, &id_or_prefix.as_str())
}

fn match_prefix(ids: &[Uuid], prefix: &str) -> Result<Uuid> {
    let prefix = prefix.to_lowercase();
    let matches: Vec<&Uuid> = ids
        .iter()
        .filter(|id| id.to_string().starts_with(&prefix))
        .collect();

    match matches.as_slice() {
        [] => Err(anyhow!(
            "No pipeline found with ID starting with '{}'",
            prefix
        )),
        [only] => Ok(**only),
        _ => {
            let ids: Vec<String> = matches.iter().map(|id| id.to_string()).collect();
            Err(anyhow!(
                "Ambiguous prefix '{}' matches multiple pipelines: {}",
                prefix,
                ids.join(", ")
            ))
        }
    }
}
