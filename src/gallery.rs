//! Game-state images. Remote URLs are mirrored locally under
//! `<image_base>/<slug(Game)>/<file name>`; only the trailing file name of the
//! URL survives.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::{error::FetchFailure, record::Record, source::Fetched};

pub const DEFAULT_IMAGE_BASE: &str = "images";

static WHITESPACE_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

/// `"Res Arcana"` -> `"res_arcana"`. Leading and trailing whitespace collapse too.
pub fn slug(game: &str) -> String {
    WHITESPACE_RUN
        .replace_all(&game.to_lowercase(), "_")
        .into_owned()
}

/// Last path segment of `url`, without query string or fragment.
/// Empty for a URL ending in `/`, so that slot fails to load.
pub fn file_name(url: &str) -> &str {
    let end = url.find(|c| c == '?' || c == '#').unwrap_or(url.len());
    let path = &url[..end];
    path.rsplit('/').next().unwrap_or(path)
}

pub fn local_path(image_base: &str, game: &str, url: &str) -> String {
    format!(
        "{}/{}/{}",
        image_base.trim_end_matches('/'),
        slug(game),
        file_name(url)
    )
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageDisplayState {
    Pending,
    Loaded { bytes: usize, format: &'static str },
    Failed { reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageSlot {
    pub url: String,
    pub file_name: String,
    pub local_path: String,
    pub state: ImageDisplayState,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Gallery {
    pub slots: Vec<ImageSlot>,
}

impl Gallery {
    /// `None` when the record has no image URLs; the region stays hidden.
    pub fn render(record: &Record, image_base: &str) -> Option<Self> {
        let urls = record.image_urls();
        if urls.is_empty() {
            return None;
        }
        let game = record.game.as_deref().unwrap_or_default();
        let slots = urls
            .into_iter()
            .map(|url| ImageSlot {
                url: url.to_string(),
                file_name: file_name(url).to_string(),
                local_path: local_path(image_base, game, url),
                state: ImageDisplayState::Pending,
            })
            .collect();
        Some(Self { slots })
    }

    pub fn resolve(&mut self, index: usize, state: ImageDisplayState) {
        if let Some(slot) = self.slots.get_mut(index) {
            slot.state = state;
        }
    }

    pub fn counts(&self) -> (usize, usize, usize) {
        let mut pending = 0;
        let mut loaded = 0;
        let mut failed = 0;
        for s in &self.slots {
            match s.state {
                ImageDisplayState::Pending => pending += 1,
                ImageDisplayState::Loaded { .. } => loaded += 1,
                ImageDisplayState::Failed { .. } => failed += 1,
            }
        }
        (pending, loaded, failed)
    }
}

/// Classify a fetched asset by its leading bytes.
pub fn sniff_format(body: &[u8]) -> Option<&'static str> {
    const SIGNATURES: [(&[u8], &str); 5] = [
        (b"\x89PNG\r\n\x1a\n", "png"),
        (b"\xff\xd8\xff", "jpeg"),
        (b"GIF87a", "gif"),
        (b"GIF89a", "gif"),
        (b"BM", "bmp"),
    ];
    for (magic, name) in SIGNATURES {
        if body.starts_with(magic) {
            return Some(name);
        }
    }
    if body.len() >= 12 && &body[0..4] == b"RIFF" && &body[8..12] == b"WEBP" {
        return Some("webp");
    }
    let head = String::from_utf8_lossy(&body[..body.len().min(256)]);
    let head = head.trim_start();
    if head.starts_with("<svg") || (head.starts_with("<?xml") && head.contains("<svg")) {
        return Some("svg");
    }
    None
}

/// Decide the display state of one fetched image.
pub fn classify(path: &str, fetched: Result<Fetched, FetchFailure>) -> ImageDisplayState {
    match fetched {
        Ok(res) if res.is_success() && !res.body.is_empty() => ImageDisplayState::Loaded {
            bytes: res.body.len(),
            format: sniff_format(&res.body).unwrap_or("unknown"),
        },
        Ok(res) if res.is_success() => ImageDisplayState::Failed {
            reason: format!("Failed to load {} (empty file)", path),
        },
        Ok(res) => ImageDisplayState::Failed {
            reason: format!("Failed to load {} ({})", path, res.status),
        },
        Err(e) => ImageDisplayState::Failed {
            reason: format!("Failed to load {} ({})", path, e),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slug_collapses_whitespace() {
        assert_eq!(slug("Res Arcana"), "res_arcana");
        assert_eq!(slug("Pax   Renaissance\t2e"), "pax_renaissance_2e");
        assert_eq!(slug(" Res Arcana"), "_res_arcana");
        assert_eq!(slug("Kingdomino \n"), "kingdomino_");
        assert_eq!(slug("Kingdomino"), "kingdomino");
    }

    #[test]
    fn file_name_drops_host_path_and_query() {
        assert_eq!(file_name("http://host/a/b/img1.png"), "img1.png");
        assert_eq!(
            file_name("https://raw.githubusercontent.com/x/y/main/s.jpg?raw=true"),
            "s.jpg"
        );
        assert_eq!(file_name("plain.png"), "plain.png");
        assert_eq!(file_name("http://host/dir/"), "");
        assert_eq!(file_name("http://host/dir/?x=1"), "");
    }

    #[test]
    fn gallery_maps_urls_to_local_paths() {
        let record: Record = serde_json::from_str(
            r#"{"Game":"Res Arcana","game_state_url":["http://host/a/b/img1.png","http://host/a/b/img2.jpg"]}"#,
        )
        .unwrap();
        let gallery = Gallery::render(&record, "images").unwrap();
        let paths: Vec<&str> = gallery.slots.iter().map(|s| s.local_path.as_str()).collect();
        assert_eq!(
            paths,
            vec!["images/res_arcana/img1.png", "images/res_arcana/img2.jpg"]
        );
        assert!(gallery
            .slots
            .iter()
            .all(|s| s.state == ImageDisplayState::Pending));
    }

    #[test]
    fn no_urls_hides_gallery() {
        let record: Record = serde_json::from_str(r#"{"Game":"Res Arcana"}"#).unwrap();
        assert!(Gallery::render(&record, "images").is_none());
    }

    #[test]
    fn slots_resolve_independently() {
        let record: Record = serde_json::from_str(
            r#"{"Game":"G","game_state_url":["u/1.png","u/2.png","u/3.png"]}"#,
        )
        .unwrap();
        let mut gallery = Gallery::render(&record, "images/").unwrap();
        assert_eq!(gallery.slots[0].local_path, "images/g/1.png");
        let gif = Fetched::ok(b"GIF89a..".to_vec());
        gallery.resolve(2, classify("images/g/3.png", Ok(gif)));
        gallery.resolve(
            0,
            classify(
                "images/g/1.png",
                Ok(Fetched {
                    status: 404,
                    body: vec![],
                }),
            ),
        );
        gallery.resolve(9, ImageDisplayState::Pending);
        assert_eq!(gallery.counts(), (1, 1, 1));
        match &gallery.slots[0].state {
            ImageDisplayState::Failed { reason } => {
                assert!(reason.contains("images/g/1.png"));
                assert!(reason.contains("404"));
            }
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(
            gallery.slots[2].state,
            ImageDisplayState::Loaded {
                bytes: 8,
                format: "gif"
            }
        );
    }

    #[test]
    fn trailing_slash_url_gets_an_empty_file_name() {
        let record: Record =
            serde_json::from_str(r#"{"Game":"G","game_state_url":"http://host/dir/"}"#).unwrap();
        let gallery = Gallery::render(&record, "images").unwrap();
        assert_eq!(gallery.slots[0].file_name, "");
        assert_eq!(gallery.slots[0].local_path, "images/g/");
    }

    #[test]
    fn classify_empty_and_transport_failures() {
        assert!(matches!(
            classify("p", Ok(Fetched::ok(vec![]))),
            ImageDisplayState::Failed { .. }
        ));
        assert!(matches!(
            classify("p", Err(FetchFailure::Transport("refused".into()))),
            ImageDisplayState::Failed { .. }
        ));
    }

    #[test]
    fn sniffs_common_formats() {
        assert_eq!(sniff_format(b"\x89PNG\r\n\x1a\nrest"), Some("png"));
        assert_eq!(sniff_format(b"\xff\xd8\xff\xe0"), Some("jpeg"));
        assert_eq!(sniff_format(b"RIFF\0\0\0\0WEBPVP8 "), Some("webp"));
        assert_eq!(sniff_format(b"  <svg xmlns=\"\"/>"), Some("svg"));
        assert_eq!(sniff_format(b"hello"), None);
    }
}
