//! File-backed generation gateway
//!
//! Answers come from a directory: `analysis.json` for the analysis call and
//! `wireframe-<screen>.json` (falling back to `wireframe.json`) for each
//! screen. Files may hold bare JSON or raw model text with a fenced block.

use async_trait::async_trait;
use forge_pipeline::{
    parse_generated_text, GeneratedArtifact, GenerationError, GenerationGateway,
    GenerationRequest,
};
use std::path::{Path, PathBuf};

pub(crate) const ANALYSIS_FILE: &str = "analysis.json";
pub(crate) const WIREFRAME_FILE: &str = "wireframe.json";

#[derive(Debug, Clone)]
pub(crate) struct FixtureGateway {
    dir: PathBuf,
}

impl FixtureGateway {
    /// Gateway over `dir`, which must contain at least `analysis.json`
    pub(crate) fn open(dir: impl Into<PathBuf>) -> anyhow::Result<Self> {
        let dir = dir.into();
        anyhow::ensure!(dir.is_dir(), "fixture directory {} not found", dir.display());
        anyhow::ensure!(
            dir.join(ANALYSIS_FILE).is_file(),
            "fixture directory {} has no {ANALYSIS_FILE}",
            dir.display()
        );
        Ok(Self { dir })
    }

    fn fixture_for(&self, request: &GenerationRequest) -> PathBuf {
        match request {
            GenerationRequest::Analysis { .. } => self.dir.join(ANALYSIS_FILE),
            GenerationRequest::Wireframe { screen_name, .. } => {
                let specific = self.dir.join(screen_fixture_name(screen_name));
                if specific.is_file() {
                    specific
                } else {
                    self.dir.join(WIREFRAME_FILE)
                }
            }
        }
    }
}

/// `Order History` -> `wireframe-order-history.json`
pub(crate) fn screen_fixture_name(screen_name: &str) -> String {
    let slug = screen_name
        .split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|part| !part.is_empty())
        .map(str::to_ascii_lowercase)
        .collect::<Vec<_>>()
        .join("-");
    format!("wireframe-{slug}.json")
}

/// Rough token count for metering: four bytes per token, at least one
pub(crate) fn estimate_tokens(text: &str) -> u64 {
    u64::try_from(text.len() / 4).unwrap_or(u64::MAX).max(1)
}

async fn read_fixture(path: &Path) -> Result<String, GenerationError> {
    tokio::fs::read_to_string(path)
        .await
        .map_err(|e| GenerationError::Transport(format!("{}: {e}", path.display())))
}

#[async_trait]
impl GenerationGateway for FixtureGateway {
    async fn generate(
        &self,
        request: &GenerationRequest,
    ) -> Result<GeneratedArtifact, GenerationError> {
        let path = self.fixture_for(request);
        tracing::debug!(kind = %request.kind(), fixture = %path.display(), "serving fixture");

        let text = read_fixture(&path).await?;
        let payload = parse_generated_text(&text)?;
        Ok(GeneratedArtifact::new(payload, estimate_tokens(&text)))
    }
}
