use serde::{Deserialize, Deserializer};
use serde_json::Value;

use crate::{
    error::{FetchFailure, ViewerError},
    source::Fetcher,
};

pub const NO_QUESTION: &str = "No question provided.";
pub const UNKNOWN: &str = "?";
pub const NO_VALUE: &str = "—";

/// One annotation. Every field is optional here; fallbacks are applied when rendering.
///
/// Any well-formed JSON body yields a record. Fields of an unexpected type are
/// treated as absent rather than failing the whole document.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Record {
    pub game: Option<String>,
    pub id: Option<String>,
    pub question: Option<String>,
    pub answer: Option<String>,
    pub rationale: Option<String>,
    pub game_state_url: Vec<String>,
}

/// Strings pass through, numbers and booleans print the way JSON writes them.
fn display_text(v: Option<&Value>) -> Option<String> {
    match v? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// A single URL or a list of them; non-string and blank entries are dropped.
fn string_urls(v: Option<&Value>) -> Vec<String> {
    let urls: Vec<&str> = match v {
        Some(Value::String(s)) => vec![s.as_str()],
        Some(Value::Array(items)) => items.iter().filter_map(Value::as_str).collect(),
        _ => Vec::new(),
    };
    urls.into_iter()
        .filter(|u| !u.trim().is_empty())
        .map(str::to_string)
        .collect()
}

impl Record {
    pub fn from_value(doc: &Value) -> Self {
        Self {
            game: display_text(doc.get("Game")),
            id: display_text(doc.get("ID")),
            question: display_text(doc.get("Question")),
            answer: display_text(doc.get("Answer")),
            rationale: display_text(doc.get("Rationale")),
            game_state_url: string_urls(doc.get("game_state_url")),
        }
    }

    pub fn game_label(&self) -> &str {
        self.game.as_deref().unwrap_or(UNKNOWN)
    }

    pub fn id_label(&self) -> String {
        self.id.clone().unwrap_or_else(|| UNKNOWN.into())
    }

    pub fn question_text(&self) -> &str {
        self.question.as_deref().unwrap_or(NO_QUESTION)
    }

    /// Raw answer, trimmed. Empty when absent.
    pub fn raw_answer(&self) -> String {
        self.answer
            .as_deref()
            .map(|a| a.trim().to_string())
            .unwrap_or_default()
    }

    pub fn rationale_text(&self) -> &str {
        match self.rationale.as_deref() {
            Some(r) if !r.trim().is_empty() => r,
            _ => NO_VALUE,
        }
    }

    pub fn image_urls(&self) -> Vec<&str> {
        self.game_state_url.iter().map(String::as_str).collect()
    }
}

impl<'de> Deserialize<'de> for Record {
    fn deserialize<D: Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
        Value::deserialize(d).map(|doc| Self::from_value(&doc))
    }
}

pub fn load_record(fetcher: &dyn Fetcher, path: &str) -> Result<Record, ViewerError> {
    tracing::info!(path, "loading record");
    let res = fetcher.fetch(path).map_err(|failure| ViewerError::RecordFetch {
        path: path.to_string(),
        failure,
    })?;
    if !res.is_success() {
        return Err(ViewerError::RecordFetch {
            path: path.to_string(),
            failure: FetchFailure::Status(res.status),
        });
    }
    serde_json::from_slice(&res.body).map_err(|source| ViewerError::RecordParse {
        path: path.to_string(),
        source,
    })
}
