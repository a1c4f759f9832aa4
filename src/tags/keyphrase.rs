// Semantic keyword scoring (KeyBERT-style).
//
// Candidates are ranked by how close their sentence embedding sits to the
// embedding of the whole document. Two extractors share the scorer:
//
// - NgramExtractor scores every 1–2 word n-gram in the text, with no
//   stop-word filtering.
// - PhraseExtractor scores only the noun phrases the morphology segmenter
//   proposes.

use std::collections::HashSet;
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use tracing::debug;

use super::embeddings::{cosine_similarity, SentenceEmbedder};
use super::morphology::Morphology;
use super::traits::TagExtractor;

/// Anything that can turn texts into sentence vectors.
#[async_trait]
pub trait SentenceEncoder: Send + Sync {
    async fn encode(&self, texts: &[String]) -> Result<Vec<Vec<f64>>>;
}

#[async_trait]
impl SentenceEncoder for SentenceEmbedder {
    async fn encode(&self, texts: &[String]) -> Result<Vec<Vec<f64>>> {
        self.embed_batch(texts).await
    }
}

/// Ranks candidate phrases against a document.
#[derive(Clone)]
pub struct KeywordScorer {
    encoder: Arc<dyn SentenceEncoder>,
}

impl KeywordScorer {
    pub fn new(encoder: Arc<dyn SentenceEncoder>) -> Self {
        Self { encoder }
    }

    /// Return the `top_n` candidates most similar to `document`, best first.
    /// Equal scores keep candidate order.
    pub async fn rank(
        &self,
        document: &str,
        candidates: &[String],
        top_n: usize,
    ) -> Result<Vec<String>> {
        if candidates.is_empty() || top_n == 0 {
            return Ok(Vec::new());
        }

        let mut inputs = Vec::with_capacity(candidates.len() + 1);
        inputs.push(document.to_string());
        inputs.extend(candidates.iter().cloned());

        let vectors = self.encoder.encode(&inputs).await?;
        if vectors.len() != inputs.len() {
            anyhow::bail!(
                "Encoder returned {} vectors for {} inputs",
                vectors.len(),
                inputs.len()
            );
        }

        let doc_vec = &vectors[0];
        let mut scored: Vec<(usize, f64)> = vectors[1..]
            .iter()
            .enumerate()
            .map(|(i, v)| (i, cosine_similarity(doc_vec, v)))
            .collect();
        scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));

        debug!(
            candidates = candidates.len(),
            best = scored.first().map(|(_, s)| *s).unwrap_or(0.0),
            "Ranked keyword candidates"
        );

        Ok(scored
            .into_iter()
            .take(top_n)
            .map(|(i, _)| candidates[i].clone())
            .collect())
    }
}

/// Lowercased word tokens of at least two word characters.
pub fn word_tokens(text: &str) -> Vec<String> {
    text.split(|c: char| !(c.is_alphanumeric() || c == '_'))
        .filter(|t| t.chars().count() >= 2)
        .map(|t| t.to_lowercase())
        .collect()
}

/// Unique 1- and 2-word n-grams in first-seen order.
pub fn ngram_candidates(text: &str) -> Vec<String> {
    let tokens = word_tokens(text);
    let mut seen = HashSet::new();
    let mut candidates = Vec::new();

    for token in &tokens {
        if seen.insert(token.clone()) {
            candidates.push(token.clone());
        }
    }
    for pair in tokens.windows(2) {
        let bigram = format!("{} {}", pair[0], pair[1]);
        if seen.insert(bigram.clone()) {
            candidates.push(bigram);
        }
    }

    candidates
}

pub struct NgramExtractor {
    scorer: KeywordScorer,
    pub top_n: usize,
}

impl NgramExtractor {
    pub fn new(scorer: KeywordScorer, top_n: usize) -> Self {
        Self { scorer, top_n }
    }
}

#[async_trait]
impl TagExtractor for NgramExtractor {
    fn name(&self) -> &'static str {
        "ngram"
    }

    async fn extract(&self, text: &str) -> Result<Vec<String>> {
        let candidates = ngram_candidates(text);
        self.scorer.rank(text, &candidates, self.top_n).await
    }
}

pub struct PhraseExtractor {
    scorer: KeywordScorer,
    morphology: Arc<dyn Morphology>,
    pub top_n: usize,
}

impl PhraseExtractor {
    pub fn new(scorer: KeywordScorer, morphology: Arc<dyn Morphology>, top_n: usize) -> Self {
        Self {
            scorer,
            morphology,
            top_n,
        }
    }
}

#[async_trait]
impl TagExtractor for PhraseExtractor {
    fn name(&self) -> &'static str {
        "phrase"
    }

    async fn extract(&self, text: &str) -> Result<Vec<String>> {
        let phrases = self.morphology.phrases(text);
        if phrases.is_empty() {
            return Ok(Vec::new());
        }
        self.scorer.rank(text, &phrases, self.top_n).await
    }
}
