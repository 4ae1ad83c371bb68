//! Minimal client for the branching-story backend.
//!
//! This crate provides:
//! - A single `GET` of the complete story graph for a user
//! - Wire types for questions, answers and final variants
//! - Resolution of host-relative media references

use reqwest::StatusCode;
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

/// Production backend host; also the base for relative media paths.
pub const DEFAULT_BASE_URL: &str = "https://barsukot.brandservicebot.ru";
const GRAPH_ENDPOINT: &str = "/api/get_user_data/";
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Errors that can occur when talking to the story backend.
#[derive(Debug, Error)]
pub enum Error {
    #[error("Network error: {0}")]
    Network(String),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Failed to parse response: {0}")]
    Parse(String),

    #[error("Invalid configuration: {0}")]
    Config(String),
}

/// Story backend client.
#[derive(Clone)]
pub struct Storybot {
    client: reqwest::Client,
    base_url: String,
}

impl Storybot {
    /// Create a new client against the given base URL.
    pub fn new(base_url: impl Into<String>) -> Result<Self, Error> {
        Self::with_timeout(base_url, DEFAULT_TIMEOUT)
    }

    /// Create a client with an explicit request timeout.
    pub fn with_timeout(base_url: impl Into<String>, timeout: Duration) -> Result<Self, Error> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .connect_timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| Error::Config(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    /// Create a client from the STORYBOT_BASE_URL environment variable,
    /// falling back to the production host.
    pub fn from_env() -> Result<Self, Error> {
        let base_url =
            std::env::var("STORYBOT_BASE_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());
        Self::new(base_url)
    }

    /// The base URL every request and media path is resolved against.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Fetch the full story graph for a user.
    pub async fn fetch_graph(&self, user_id: &str) -> Result<GraphPayload, Error> {
        let url = format!("{}{GRAPH_ENDPOINT}", self.base_url);
        debug!(%url, user_id, "fetching story graph");

        let response = self
            .client
            .get(&url)
            .query(&[("user_id", user_id)])
            .send()
            .await
            .map_err(|e| Error::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(api_error(status, body));
        }

        let body = response
            .text()
            .await
            .map_err(|e| Error::Network(e.to_string()))?;

        GraphPayload::from_json(&body)
    }

    /// Resolve a media reference from the payload into an absolute URL.
    pub fn resolve_media(&self, path: Option<&str>) -> Option<String> {
        resolve_media(&self.base_url, path)
    }
}

fn api_error(status: StatusCode, message: String) -> Error {
    Error::Api {
        status: status.as_u16(),
        message,
    }
}

/// Resolve `path` against `base_url` unless it is already absolute.
///
/// Empty or absent references resolve to `None`.
pub fn resolve_media(base_url: &str, path: Option<&str>) -> Option<String> {
    let path = path?.trim();
    if path.is_empty() {
        return None;
    }
    if has_http_scheme(path) {
        return Some(path.to_string());
    }

    let base = base_url.trim_end_matches('/');
    if path.starts_with('/') {
        Some(format!("{base}{path}"))
    } else {
        Some(format!("{base}/{path}"))
    }
}

fn has_http_scheme(path: &str) -> bool {
    ["http://", "https://"].iter().any(|scheme| {
        path.get(..scheme.len())
            .is_some_and(|prefix| prefix.eq_ignore_ascii_case(scheme))
    })
}

// ============================================================================
// Wire types
// ============================================================================

/// Identifier of a question, answer, button or final variant.
///
/// The backend sends either numbers or strings.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum NodeId {
    Number(i64),
    Text(String),
}

impl NodeId {
    /// Compare against a persisted, string-coerced identifier.
    pub fn matches_str(&self, raw: &str) -> bool {
        match self {
            NodeId::Number(n) => raw.trim().parse::<i64>().is_ok_and(|parsed| parsed == *n),
            NodeId::Text(s) => s == raw,
        }
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeId::Number(n) => write!(f, "{n}"),
            NodeId::Text(s) => f.write_str(s),
        }
    }
}

impl From<i64> for NodeId {
    fn from(n: i64) -> Self {
        NodeId::Number(n)
    }
}

impl From<&str> for NodeId {
    fn from(s: &str) -> Self {
        NodeId::Text(s.to_string())
    }
}

impl From<String> for NodeId {
    fn from(s: String) -> Self {
        NodeId::Text(s)
    }
}

/// A node of the story graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Question {
    pub id: NodeId,
    #[serde(default, deserialize_with = "null_as_default")]
    pub text: String,
    #[serde(default)]
    pub audio: Option<String>,
    #[serde(default)]
    pub picture: Option<String>,
    /// Only used to pick start and result nodes, never as a traversal pointer.
    #[serde(default)]
    pub order: Option<i64>,
    #[serde(rename = "final", default, deserialize_with = "null_as_default")]
    pub is_final: bool,
    #[serde(rename = "btns", default, deserialize_with = "null_as_default")]
    pub buttons: Vec<QuestionButton>,
}

/// An action button on a terminal question.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuestionButton {
    pub id: NodeId,
    #[serde(default, deserialize_with = "null_as_default")]
    pub text: String,
    /// External destination; a button without one restarts the story.
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub logo: Option<String>,
}

impl QuestionButton {
    /// The external URL, if this is a link button.
    pub fn external_url(&self) -> Option<&str> {
        self.url.as_deref().filter(|u| !u.trim().is_empty())
    }
}

/// An edge of the story graph, labelled with the text the user picks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Answer {
    pub id: NodeId,
    pub question_id: NodeId,
    #[serde(default, deserialize_with = "null_as_default")]
    pub text: String,
    /// `None` ends the linear graph and starts the final sequence.
    #[serde(default)]
    pub next_question_id: Option<NodeId>,
    #[serde(default)]
    pub logo: Option<String>,
    #[serde(default)]
    pub send_variants: Option<bool>,
}

/// A slide of the final sequence shown after the terminal edge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinalVariant {
    pub id: NodeId,
    #[serde(default, deserialize_with = "null_as_default")]
    pub text: String,
    #[serde(default)]
    pub audio: Option<String>,
    #[serde(default)]
    pub picture: Option<String>,
    #[serde(default)]
    pub order: Option<i64>,
}

/// The complete graph returned for a user.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GraphPayload {
    #[serde(default, deserialize_with = "null_as_default")]
    pub questions: Vec<Question>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub answers: Vec<Answer>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub final_variants: Vec<FinalVariant>,
}

impl GraphPayload {
    /// Decode a payload body.
    pub fn from_json(body: &str) -> Result<Self, Error> {
        serde_json::from_str(body).map_err(|e| Error::Parse(e.to_string()))
    }

    /// True if the backend returned no questions.
    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_creation() {
        let client = Storybot::new("https://example.test/").unwrap();
        assert_eq!(client.base_url(), "https://example.test");
    }

    #[test]
    fn test_payload_tolerates_missing_and_null_collections() {
        let payload = GraphPayload::from_json(r#"{"questions": null}"#).unwrap();
        assert!(payload.questions.is_empty());
        assert!(payload.answers.is_empty());
        assert!(payload.final_variants.is_empty());

        let payload = GraphPayload::from_json("{}").unwrap();
        assert!(payload.is_empty());
    }

    #[test]
    fn test_question_fields() {
        let json = r#"{
            "questions": [
                {"id": 53, "text": "Start", "order": 1, "final": null, "btns": null},
                {"id": "end", "text": "Fin", "order": 10, "final": true,
                 "btns": [{"id": 1, "text": "Again"}, {"id": 2, "text": "Site", "url": "https://x.test"}]}
            ]
        }"#;
        let payload = GraphPayload::from_json(json).unwrap();

        let start = &payload.questions[0];
        assert_eq!(start.id, NodeId::Number(53));
        assert!(!start.is_final);
        assert!(start.buttons.is_empty());
        assert_eq!(start.audio, None);

        let end = &payload.questions[1];
        assert_eq!(end.id, NodeId::Text("end".into()));
        assert!(end.is_final);
        assert_eq!(end.buttons.len(), 2);
        assert_eq!(end.buttons[0].external_url(), None);
        assert_eq!(end.buttons[1].external_url(), Some("https://x.test"));
    }

    #[test]
    fn test_answer_terminal_edge() {
        let json = r#"{"answers": [
            {"id": 10, "question_id": 1, "text": "Go", "next_question_id": null},
            {"id": 11, "question_id": 1, "text": "Stay", "next_question_id": 2, "send_variants": true}
        ]}"#;
        let payload = GraphPayload::from_json(json).unwrap();
        assert_eq!(payload.answers[0].next_question_id, None);
        assert_eq!(payload.answers[1].next_question_id, Some(NodeId::Number(2)));
        assert_eq!(payload.answers[1].send_variants, Some(true));
    }

    #[test]
    fn test_parse_error() {
        let err = GraphPayload::from_json("<html>").unwrap_err();
        assert!(matches!(err, Error::Parse(_)));
    }

    #[test]
    fn test_node_id_display_and_match() {
        assert_eq!(NodeId::Number(5).to_string(), "5");
        assert_eq!(NodeId::from("abc").to_string(), "abc");

        assert!(NodeId::Number(5).matches_str("5"));
        assert!(!NodeId::Number(5).matches_str("05x"));
        assert!(NodeId::from("5").matches_str("5"));
        assert!(!NodeId::from("abc").matches_str("ABC"));
    }

    #[test]
    fn test_resolve_media() {
        let base = "https://cdn.test/";
        assert_eq!(resolve_media(base, None), None);
        assert_eq!(resolve_media(base, Some("  ")), None);
        assert_eq!(
            resolve_media(base, Some("/media/a.mp3")).as_deref(),
            Some("https://cdn.test/media/a.mp3")
        );
        assert_eq!(
            resolve_media(base, Some("media/a.mp3")).as_deref(),
            Some("https://cdn.test/media/a.mp3")
        );
        assert_eq!(
            resolve_media(base, Some("HTTPS://other.test/p.png")).as_deref(),
            Some("HTTPS://other.test/p.png")
        );
    }
}
