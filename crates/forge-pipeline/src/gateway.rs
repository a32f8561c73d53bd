//! Generation gateway contract
//!
//! The gateway turns one structured request into one structured artifact. It
//! is stateless; provider, prompt and transport live behind the trait.

use async_trait::async_trait;
use forge_core::PipelineError;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

/// Which pass a request belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GenerationKind {
    Analysis,
    Wireframe,
}

impl GenerationKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Analysis => "analysis",
            Self::Wireframe => "wireframe",
        }
    }
}

impl std::fmt::Display for GenerationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Input to one generation call
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase", rename_all_fields = "camelCase")]
pub enum GenerationRequest {
    /// Idea to features and screens
    Analysis { description: String },
    /// Layout for one screen
    Wireframe {
        screen_name: String,
        screen_type: String,
        app_description: String,
        feature_names: Vec<String>,
    },
}

impl GenerationRequest {
    #[must_use]
    pub fn kind(&self) -> GenerationKind {
        match self {
            Self::Analysis { .. } => GenerationKind::Analysis,
            Self::Wireframe { .. } => GenerationKind::Wireframe,
        }
    }
}

/// Output of one generation call
#[derive(Debug, Clone, PartialEq)]
pub struct GeneratedArtifact {
    /// Parsed structured payload
    pub payload: serde_json::Value,
    /// Tokens consumed, debited from the tenant's monthly quota
    pub tokens_used: u64,
}

impl GeneratedArtifact {
    #[inline]
    #[must_use]
    pub fn new(payload: serde_json::Value, tokens_used: u64) -> Self {
        Self {
            payload,
            tokens_used,
        }
    }
}

/// Gateway failures
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GenerationError {
    /// Provider answered but the answer is not valid structured output
    #[error("could not parse generated output: {0}")]
    Parse(String),

    /// Provider unreachable or returned an error
    #[error("generation transport error: {0}")]
    Transport(String),
}

impl From<GenerationError> for PipelineError {
    fn from(error: GenerationError) -> Self {
        match error {
            GenerationError::Parse(msg) => Self::MalformedResult(msg),
            GenerationError::Transport(msg) => Self::TransportFailure(msg),
        }
    }
}

/// Structured request in, structured artifact out
#[async_trait]
pub trait GenerationGateway: Send + Sync {
    async fn generate(
        &self,
        request: &GenerationRequest,
    ) -> Result<GeneratedArtifact, GenerationError>;
}

const FENCE_PATTERN: &str = r"(?s)```([A-Za-z]*)[ \t]*\r?\n?(.*?)\r?\n?```";

fn fence() -> Result<&'static Regex, GenerationError> {
    static FENCE: OnceLock<Result<Regex, regex::Error>> = OnceLock::new();
    FENCE
        .get_or_init(|| Regex::new(FENCE_PATTERN))
        .as_ref()
        .map_err(|e| GenerationError::Parse(e.to_string()))
}

/// Parse raw model text as JSON
///
/// Prefers the first ```` ```json ```` block, then the first bare fenced
/// block, then the whole text.
///
/// # Errors
/// - `GenerationError::Parse` if the selected text is not valid JSON
pub fn parse_generated_text(text: &str) -> Result<serde_json::Value, GenerationError> {
    let fence = fence()?;

    let mut bare = None;
    let mut tagged = None;
    for captures in fence.captures_iter(text) {
        let lang = captures.get(1).map_or("", |m| m.as_str());
        let body = captures.get(2).map_or("", |m| m.as_str());
        if lang.eq_ignore_ascii_case("json") {
            tagged = Some(body);
            break;
        }
        if lang.is_empty() && bare.is_none() {
            bare = Some(body);
        }
    }

    let json = tagged.or(bare).unwrap_or(text).trim();
    serde_json::from_str(json).map_err(|e| GenerationError::Parse(e.to_string()))
}
