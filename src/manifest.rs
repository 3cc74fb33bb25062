use std::collections::{BTreeSet, HashSet};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{
    error::{FetchFailure, ViewerError},
    source::Fetcher,
};

pub const DEFAULT_MANIFEST: &str = "manifest.json";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestEntry {
    pub folder: String,
    pub name: String,
    pub json_path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub game: Option<String>,
}

/// Fetch and shape-check the manifest. Entries come back in manifest order.
pub fn load_manifest(
    fetcher: &dyn Fetcher,
    locator: &str,
) -> Result<Vec<ManifestEntry>, ViewerError> {
    tracing::info!(locator, "loading manifest");
    let res = fetcher.fetch(locator).map_err(ViewerError::ManifestFetch)?;
    if !res.is_success() {
        return Err(ViewerError::ManifestFetch(FetchFailure::Status(res.status)));
    }
    let doc: Value = serde_json::from_slice(&res.body).map_err(ViewerError::ManifestParse)?;
    let entries = parse_manifest(doc)?;
    warn_duplicate_paths(&entries);
    tracing::info!(count = entries.len(), "manifest loaded");
    Ok(entries)
}

/// Accepts `{"files": [...]}` or a bare `[...]`.
pub fn parse_manifest(doc: Value) -> Result<Vec<ManifestEntry>, ViewerError> {
    let items = match doc {
        Value::Array(items) => items,
        Value::Object(mut map) => match map.remove("files") {
            Some(Value::Array(items)) => items,
            Some(other) => {
                return Err(ViewerError::ManifestShape(format!(
                    "\"files\" is {}, expected an array",
                    kind_of(&other)
                )))
            }
            None => {
                return Err(ViewerError::ManifestShape(
                    "object without a \"files\" array".into(),
                ))
            }
        },
        other => {
            return Err(ViewerError::ManifestShape(format!(
                "top level is {}, expected an object or array",
                kind_of(&other)
            )))
        }
    };
    items
        .into_iter()
        .enumerate()
        .map(|(i, item)| {
            serde_json::from_value(item)
                .map_err(|e| ViewerError::ManifestShape(format!("entry {}: {}", i, e)))
        })
        .collect()
}

fn kind_of(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

fn warn_duplicate_paths(entries: &[ManifestEntry]) {
    let mut seen = HashSet::new();
    for e in entries {
        if !seen.insert(e.json_path.as_str()) {
            tracing::warn!(path = %e.json_path, "duplicate json_path in manifest; first one wins");
        }
    }
}

/// Distinct folders, sorted alphabetically.
pub fn build_folder_index(entries: &[ManifestEntry]) -> Vec<String> {
    entries
        .iter()
        .map(|e| e.folder.clone())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}
