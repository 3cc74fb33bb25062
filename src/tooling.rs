//! Offline helpers for preparing a dataset for the viewer: building the
//! manifest, pointing records at locally mirrored assets, and a headless
//! load check.

use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use serde_json::Value;

use crate::{
    manifest::{load_manifest, ManifestEntry},
    record::load_record,
    source::Fetcher,
};

pub const DEFAULT_DATA_DIR: &str = "annotation_data";
pub const IMAGE_MIRROR: &str = "gamestates/images";
pub const JSON_MIRROR: &str = "gamestates/json";

static URL_FILE: Lazy<Regex> = Lazy::new(|| Regex::new(r".*/([^/?]+)(?:\?.*)?$").unwrap());

#[derive(Serialize)]
struct ManifestFile<'a> {
    files: &'a [ManifestEntry],
}

/// `res_arcana_tier1` -> `Res Arcana`.
pub fn infer_game(folder: &str) -> String {
    let base = folder.split("_tier").next().unwrap_or(folder).replace('_', " ");
    let mut out = String::with_capacity(base.len());
    let mut prev_alpha = false;
    for ch in base.chars() {
        if prev_alpha {
            out.extend(ch.to_lowercase());
        } else {
            out.extend(ch.to_uppercase());
        }
        prev_alpha = ch.is_alphabetic();
    }
    out
}

fn sorted_dir(path: &Path) -> Result<Vec<PathBuf>> {
    let mut items = fs::read_dir(path)
        .with_context(|| format!("failed to list {}", path.display()))?
        .map(|e| e.map(|e| e.path()))
        .collect::<std::io::Result<Vec<_>>>()
        .with_context(|| format!("failed to list {}", path.display()))?;
    items.sort();
    Ok(items)
}

/// One entry per `<root>/<data_dir>/<folder>/*.json`, folders and files sorted.
pub fn build_manifest(root: &Path, data_dir: &str) -> Result<Vec<ManifestEntry>> {
    let base = root.join(data_dir);
    let mut entries = Vec::new();
    for folder_path in sorted_dir(&base)? {
        if !folder_path.is_dir() {
            continue;
        }
        let Some(folder) = folder_path.file_name().and_then(|s| s.to_str()) else {
            continue;
        };
        let game = infer_game(folder);
        for file in sorted_dir(&folder_path)? {
            let Some(name) = file.file_name().and_then(|s| s.to_str()) else {
                continue;
            };
            if !file.is_file() || !name.ends_with(".json") {
                continue;
            }
            entries.push(ManifestEntry {
                folder: folder.to_string(),
                name: name.to_string(),
                json_path: format!("{}/{}/{}", data_dir, folder, name),
                game: Some(game.clone()),
            });
        }
    }
    Ok(entries)
}

pub fn write_manifest(out: &Path, entries: &[ManifestEntry]) -> Result<()> {
    if let Some(dir) = out.parent() {
        fs::create_dir_all(dir)?;
    }
    let s = serde_json::to_string_pretty(&ManifestFile { files: entries })?;
    fs::write(out, s).with_context(|| format!("failed to write {}", out.display()))?;
    Ok(())
}

/// Point a URL (or list of URLs) at `<prefix>/<game_folder>/<file>`.
/// Blank strings and values that don't look like URLs are left alone.
fn convert_to_local(value: &mut Value, prefix: &str, game_folder: &str) {
    match value {
        Value::Array(items) => {
            for v in items {
                convert_to_local(v, prefix, game_folder);
            }
        }
        Value::String(url) if !url.trim().is_empty() => {
            if let Some(file) = URL_FILE.captures(url).and_then(|c| c.get(1)) {
                *url = format!("{}/{}/{}", prefix, game_folder, file.as_str());
            }
        }
        _ => {}
    }
}

/// Rewrite one record in place: local asset paths, blanked rationale.
pub fn sanitize_record(doc: &mut Value) {
    let Value::Object(map) = doc else {
        return;
    };
    let game_folder = map
        .get("Game")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_lowercase()
        .replace(' ', "_");
    if let Some(v) = map.get_mut("game_state_url") {
        convert_to_local(v, IMAGE_MIRROR, &game_folder);
    }
    if let Some(v) = map.get_mut("json_game_state_url") {
        convert_to_local(v, JSON_MIRROR, &game_folder);
    }
    if let Some(v) = map.get_mut("Rationale") {
        *v = Value::String(String::new());
    }
}

/// Sanitize every `.json` below `<root>/<data_dir>`. Returns how many files were rewritten.
pub fn sanitize_tree(root: &Path, data_dir: &str) -> Result<usize> {
    let mut stack = vec![root.join(data_dir)];
    let mut count = 0;
    while let Some(dir) = stack.pop() {
        for path in sorted_dir(&dir)? {
            if path.is_dir() {
                stack.push(path);
                continue;
            }
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let s = fs::read_to_string(&path)
                .with_context(|| format!("failed to read {}", path.display()))?;
            let mut doc: Value = serde_json::from_str(&s)
                .with_context(|| format!("failed to parse {}", path.display()))?;
            sanitize_record(&mut doc);
            fs::write(&path, serde_json::to_string_pretty(&doc)?)
                .with_context(|| format!("failed to write {}", path.display()))?;
            tracing::info!(path = %path.display(), "sanitized");
            count += 1;
        }
    }
    Ok(count)
}

#[derive(Debug, Default)]
pub struct CheckReport {
    pub records: usize,
    pub failures: Vec<String>,
}

/// Load the manifest and every record it lists, collecting failures instead of stopping.
pub fn check_site(fetcher: &dyn Fetcher, manifest: &str) -> Result<CheckReport> {
    let entries = load_manifest(fetcher, manifest)?;
    let mut report = CheckReport::default();
    for e in &entries {
        report.records += 1;
        if let Err(err) = load_record(fetcher, &e.json_path) {
            report.failures.push(err.to_string());
        }
    }
    Ok(report)
}
