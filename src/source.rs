//! Where the viewer reads its static documents from.
//!
//! The viewer only ever asks for a locator relative to the site root
//! (`manifest.json`, `annotation_data/x/1.json`, `images/res_arcana/a.png`).
//! A [`Fetcher`] answers with a status and a body, the way a browser fetch
//! would, so the loaders can tell a 404 from a malformed body.

use std::{
    fs, io,
    path::{Component, Path, PathBuf},
    time::Duration,
};

use anyhow::{Context, Result};

use crate::error::FetchFailure;

#[derive(Debug, Clone)]
pub struct Fetched {
    pub status: u16,
    pub body: Vec<u8>,
}

impl Fetched {
    pub fn ok(body: Vec<u8>) -> Self {
        Self { status: 200, body }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

pub trait Fetcher: Send + Sync {
    fn fetch(&self, locator: &str) -> Result<Fetched, FetchFailure>;

    /// Absolute path or URL for `locator`, for display and for the external opener.
    fn resolve(&self, locator: &str) -> String;
}

/// A local mirror of the static site.
#[derive(Debug, Clone)]
pub struct DirSource {
    root: PathBuf,
}

impl DirSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn path_of(&self, locator: &str) -> Option<PathBuf> {
        let rel = Path::new(locator.trim_start_matches("./"));
        let escapes = rel
            .components()
            .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
        if escapes {
            return None;
        }
        Some(self.root.join(rel))
    }
}

impl Fetcher for DirSource {
    fn fetch(&self, locator: &str) -> Result<Fetched, FetchFailure> {
        let Some(path) = self.path_of(locator) else {
            return Ok(Fetched {
                status: 403,
                body: Vec::new(),
            });
        };
        match fs::read(&path) {
            Ok(body) => Ok(Fetched::ok(body)),
            Err(e) => {
                let status = match e.kind() {
                    io::ErrorKind::NotFound => 404,
                    io::ErrorKind::PermissionDenied => 403,
                    _ => return Err(FetchFailure::Transport(format!("{}: {}", path.display(), e))),
                };
                Ok(Fetched {
                    status,
                    body: Vec::new(),
                })
            }
        }
    }

    fn resolve(&self, locator: &str) -> String {
        match self.path_of(locator) {
            Some(p) => p.display().to_string(),
            None => locator.to_string(),
        }
    }
}

/// The same site served over HTTP.
#[derive(Debug)]
pub struct HttpSource {
    base: reqwest::Url,
    client: reqwest::blocking::Client,
}

impl HttpSource {
    pub fn new(base: &str, timeout: Duration) -> Result<Self> {
        // without a trailing slash Url::join would replace the last segment
        let normalized = if base.ends_with('/') {
            base.to_string()
        } else {
            format!("{}/", base)
        };
        let base = reqwest::Url::parse(&normalized)
            .with_context(|| format!("invalid base URL: {}", base))?;
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()
            .context("failed to build HTTP client")?;
        Ok(Self { base, client })
    }

    fn url_of(&self, locator: &str) -> Result<reqwest::Url, FetchFailure> {
        self.base
            .join(locator)
            .map_err(|e| FetchFailure::Transport(format!("{}: {}", locator, e)))
    }
}

impl Fetcher for HttpSource {
    fn fetch(&self, locator: &str) -> Result<Fetched, FetchFailure> {
        let url = self.url_of(locator)?;
        let response = self
            .client
            .get(url.clone())
            .send()
            .map_err(|e| FetchFailure::Transport(format!("{}: {}", url, e)))?;
        let status = response.status().as_u16();
        let body = response
            .bytes()
            .map_err(|e| FetchFailure::Transport(format!("{}: {}", url, e)))?
            .to_vec();
        Ok(Fetched { status, body })
    }

    fn resolve(&self, locator: &str) -> String {
        match self.url_of(locator) {
            Ok(url) => url.to_string(),
            Err(_) => locator.to_string(),
        }
    }
}
