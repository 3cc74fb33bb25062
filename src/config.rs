use std::{
    collections::HashMap,
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::{
    gallery::DEFAULT_IMAGE_BASE,
    keymap::{parse_keymap, KeyAction},
    manifest::DEFAULT_MANIFEST,
    ui::ThemeKind,
};

pub const CONFIG_FILE: &str = "viewer.toml";
pub const ROOT_ENV: &str = "LUDOBENCH_ROOT";
const DEFAULT_TIMEOUT_SECS: u64 = 10;
const DEFAULT_LEFT_WIDTH: u16 = 35;

/// `viewer.toml` as written on disk. Every key is optional.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    pub source: SourceSection,
    pub ui: UiSection,
    pub log: LogSection,
    pub keys: HashMap<String, String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SourceSection {
    pub root: Option<PathBuf>,
    pub url: Option<String>,
    pub manifest: Option<String>,
    pub image_base: Option<String>,
    pub timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct UiSection {
    pub theme: Option<ThemeKind>,
    pub left_width: Option<u16>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct LogSection {
    pub file: Option<PathBuf>,
}

/// Command-line values that override the file.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub root: Option<PathBuf>,
    pub url: Option<String>,
    pub manifest: Option<String>,
    pub image_base: Option<String>,
    pub theme: Option<ThemeKind>,
    pub log_file: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SiteLocation {
    Dir(PathBuf),
    Url(String),
}

#[derive(Debug, Clone)]
pub struct Settings {
    pub site: SiteLocation,
    pub manifest: String,
    pub image_base: String,
    pub timeout: Duration,
    pub theme: ThemeKind,
    pub left_width: u16,
    pub log_file: Option<PathBuf>,
    pub keymap: HashMap<char, KeyAction>,
}

impl FileConfig {
    /// An explicit path must exist; otherwise look for `viewer.toml` upwards from cwd.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        if let Some(p) = explicit {
            return Self::read(p);
        }
        let Ok(cwd) = std::env::current_dir() else {
            return Ok(Self::default());
        };
        match find_upwards(&cwd, CONFIG_FILE) {
            Some(p) => Self::read(&p),
            None => Ok(Self::default()),
        }
    }

    fn read(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("failed to read config: {}", path.display()))?;
        let cfg = toml::from_str(&content)
            .with_context(|| format!("failed to parse config: {}", path.display()))?;
        tracing::debug!(path = %path.display(), "config loaded");
        Ok(cfg)
    }
}

impl Settings {
    /// Precedence: command line, then `LUDOBENCH_ROOT`, then the file, then probing.
    pub fn resolve(cli: Overrides, file: FileConfig) -> Self {
        let manifest = cli
            .manifest
            .or(file.source.manifest)
            .unwrap_or_else(|| DEFAULT_MANIFEST.to_string());
        let site = if let Some(root) = cli.root {
            SiteLocation::Dir(root)
        } else if let Some(url) = cli.url {
            SiteLocation::Url(url)
        } else if let Ok(root) = std::env::var(ROOT_ENV) {
            SiteLocation::Dir(PathBuf::from(root))
        } else if let Some(url) = file.source.url {
            SiteLocation::Url(url)
        } else if let Some(root) = file.source.root {
            SiteLocation::Dir(root)
        } else {
            SiteLocation::Dir(default_root(&manifest))
        };
        Self {
            site,
            manifest,
            image_base: cli
                .image_base
                .or(file.source.image_base)
                .unwrap_or_else(|| DEFAULT_IMAGE_BASE.to_string()),
            timeout: Duration::from_secs(file.source.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS)),
            theme: cli.theme.or(file.ui.theme).unwrap_or(ThemeKind::Dark),
            left_width: file
                .ui
                .left_width
                .unwrap_or(DEFAULT_LEFT_WIDTH)
                .clamp(15, 70),
            log_file: cli.log_file.or(file.log.file),
            keymap: parse_keymap(&file.keys),
        }
    }
}

fn find_upwards(start: &Path, name: &str) -> Option<PathBuf> {
    start
        .ancestors()
        .map(|dir| dir.join(name))
        .find(|p| p.is_file())
}

/// First of `docs/` or `.` (from cwd upwards) that holds the manifest.
fn default_root(manifest: &str) -> PathBuf {
    if let Ok(cwd) = std::env::current_dir() {
        if let Some(found) = probe_root(&cwd, manifest) {
            return found;
        }
    }
    PathBuf::from("docs")
}

fn probe_root(start: &Path, manifest: &str) -> Option<PathBuf> {
    for anc in start.ancestors() {
        for candidate in [anc.join("docs"), anc.to_path_buf()] {
            if candidate.join(manifest).is_file() {
                return Some(candidate);
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn parses_all_sections() {
        let cfg: FileConfig = toml::from_str(
            r#"
            [source]
            root = "site"
            manifest = "index.json"
            timeout_secs = 3

            [ui]
            theme = "light"
            left_width = 90

            [log]
            file = "viewer.log"

            [keys]
            l = "next"
            "#,
        )
        .unwrap();
        let s = Settings::resolve(Overrides::default(), cfg);
        assert_eq!(s.manifest, "index.json");
        assert_eq!(s.image_base, "images");
        assert_eq!(s.timeout, Duration::from_secs(3));
        assert_eq!(s.theme, ThemeKind::Light);
        assert_eq!(s.left_width, 70);
        assert_eq!(s.log_file, Some(PathBuf::from("viewer.log")));
        assert_eq!(s.keymap.get(&'l'), Some(&KeyAction::NextRecord));
    }

    #[test]
    fn command_line_wins_over_file() {
        let cfg: FileConfig = toml::from_str(
            r#"
            [source]
            url = "https://example.org/site"
            image_base = "img"
            "#,
        )
        .unwrap();
        let cli = Overrides {
            root: Some(PathBuf::from("/tmp/site")),
            image_base: Some("pictures".into()),
            ..Overrides::default()
        };
        let s = Settings::resolve(cli, cfg);
        assert_eq!(s.site, SiteLocation::Dir(PathBuf::from("/tmp/site")));
        assert_eq!(s.image_base, "pictures");
    }

    #[test]
    fn probe_prefers_docs_then_self() {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("docs")).unwrap();
        fs::create_dir_all(dir.path().join("a/b")).unwrap();
        fs::write(dir.path().join("docs/manifest.json"), "[]").unwrap();
        assert_eq!(
            probe_root(&dir.path().join("a/b"), "manifest.json"),
            Some(dir.path().join("docs"))
        );
        fs::write(dir.path().join("a/manifest.json"), "[]").unwrap();
        assert_eq!(
            probe_root(&dir.path().join("a/b"), "manifest.json"),
            Some(dir.path().join("a"))
        );
        assert_eq!(probe_root(dir.path(), "other.json"), None);
    }

    #[test]
    fn explicit_missing_config_is_an_error() {
        let dir = TempDir::new().unwrap();
        assert!(FileConfig::load(Some(&dir.path().join("nope.toml"))).is_err());
        let p = dir.path().join("viewer.toml");
        fs::write(&p, "[ui]\ntheme = \"dark\"\n").unwrap();
        let cfg = FileConfig::load(Some(&p)).unwrap();
        assert_eq!(cfg.ui.theme, Some(ThemeKind::Dark));
    }
}
