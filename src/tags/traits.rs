// Tag extractor trait: one independent signal source for candidate tags.
//
// The aggregator runs every configured extractor and unions the results. An
// extractor whose model failed to load is simply not configured; one that
// fails at request time contributes nothing.

use anyhow::Result;
use async_trait::async_trait;

/// Default number of candidates each extractor returns.
pub const DEFAULT_TOP_N: usize = 20;

#[async_trait]
pub trait TagExtractor: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    /// Extract candidate tags from a single text.
    async fn extract(&self, text: &str) -> Result<Vec<String>>;
}
