use std::env;
use std::path::PathBuf;

use anyhow::Result;

use crate::tags::traits::DEFAULT_TOP_N;

pub const DEFAULT_TAG_MODEL: &str = "gemini-2.5-flash";
pub const DEFAULT_NAMING_MODEL: &str = "gemini-2.5-flash";
pub const DEFAULT_EMBEDDING_MODEL: &str = "gemini-embedding-001";
pub const DEFAULT_AGENT_MODEL: &str = "claude-sonnet-4-20250514";

/// Central configuration loaded from environment variables.
///
/// Secrets come from env vars only. The .env file is loaded at startup via
/// dotenvy. Both API keys are optional: a missing key disables only the
/// endpoints that need it.
#[derive(Debug, Clone)]
pub struct Config {
    /// Embeddings, tag refinement, and cluster naming.
    pub gemini_api_key: Option<String>,
    /// The report agent.
    pub anthropic_api_key: Option<String>,
    pub tag_model: String,
    pub naming_model: String,
    pub embedding_model: String,
    pub agent_model: String,
    /// Base directory for local ONNX models
    pub model_dir: PathBuf,
    pub ner_model_dir: PathBuf,
    /// Per-extractor candidate cap
    pub top_n: usize,
}

impl Config {
    pub fn load() -> Result<Self> {
        let model_dir = non_empty("CARDLENS_MODEL_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(crate::download::default_model_dir);

        let ner_model_dir = non_empty("CARDLENS_NER_MODEL_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|| model_dir.join("ner"));

        let top_n = match non_empty("CARDLENS_TOP_N") {
            Some(raw) => raw.parse::<usize>().map_err(|_| {
                anyhow::anyhow!("CARDLENS_TOP_N must be a positive integer, got {raw:?}")
            })?,
            None => DEFAULT_TOP_N,
        };
        if top_n == 0 {
            anyhow::bail!("CARDLENS_TOP_N must be at least 1");
        }

        Ok(Self {
            gemini_api_key: non_empty("GEMINI_API_KEY"),
            anthropic_api_key: non_empty("ANTHROPIC_API_KEY"),
            tag_model: non_empty("CARDLENS_TAG_MODEL")
                .unwrap_or_else(|| DEFAULT_TAG_MODEL.to_string()),
            naming_model: non_empty("CARDLENS_NAMING_MODEL")
                .unwrap_or_else(|| DEFAULT_NAMING_MODEL.to_string()),
            embedding_model: non_empty("CARDLENS_EMBEDDING_MODEL")
                .unwrap_or_else(|| DEFAULT_EMBEDDING_MODEL.to_string()),
            agent_model: non_empty("CARDLENS_AGENT_MODEL")
                .unwrap_or_else(|| DEFAULT_AGENT_MODEL.to_string()),
            model_dir,
            ner_model_dir,
            top_n,
        })
    }

    /// Check that the Gemini key is configured.
    /// Call this before any CLI operation that needs tag refinement.
    pub fn require_gemini(&self) -> Result<&str> {
        self.gemini_api_key.as_deref().ok_or_else(|| {
            anyhow::anyhow!(
                "GEMINI_API_KEY not set. Add it to your .env file.\n\
                 See .env.example for the required variables."
            )
        })
    }
}

/// Read an env var, treating empty or whitespace-only values as unset.
fn non_empty(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_non_empty_treats_blank_as_unset() {
        env::set_var("CARDLENS_TEST_BLANK_VALUE", "   ");
        env::set_var("CARDLENS_TEST_SET_VALUE", " key ");
        assert_eq!(non_empty("CARDLENS_TEST_BLANK_VALUE"), None);
        assert_eq!(non_empty("CARDLENS_TEST_SET_VALUE"), Some("key".to_string()));
        assert_eq!(non_empty("CARDLENS_TEST_NEVER_SET"), None);
    }
}
