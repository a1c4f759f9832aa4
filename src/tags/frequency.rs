// Frequency-based noun extraction.
//
// The simplest signal: nouns that recur in a text are usually what it is
// about. Text is reduced to the Hangul/Latin/digit allowlist first, so
// punctuation never fuses onto a noun.

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use regex_lite::Regex;

use super::morphology::Morphology;
use super::traits::TagExtractor;

/// Characters outside this class are removed before segmentation.
const ALLOWLIST_PATTERN: &str = r"[^가-힣A-Za-z0-9\s]";

pub struct FrequencyExtractor {
    morphology: Arc<dyn Morphology>,
    cleanup: Regex,
    pub top_n: usize,
}

impl FrequencyExtractor {
    pub fn new(morphology: Arc<dyn Morphology>, top_n: usize) -> Self {
        Self {
            morphology,
            cleanup: Regex::new(ALLOWLIST_PATTERN).expect("allowlist pattern is valid"),
            top_n,
        }
    }

    /// Synchronous core, usable without a runtime.
    pub fn top_nouns(&self, text: &str) -> Vec<String> {
        let cleaned = self.cleanup.replace_all(text, "");
        let nouns = self.morphology.nouns(&cleaned);
        rank_by_frequency(nouns, self.top_n)
    }
}

#[async_trait]
impl TagExtractor for FrequencyExtractor {
    fn name(&self) -> &'static str {
        "frequency"
    }

    async fn extract(&self, text: &str) -> Result<Vec<String>> {
        Ok(self.top_nouns(text))
    }
}

/// Count nouns longer than one character and return the `top_n` most frequent.
///
/// Ties are broken by first occurrence, so the result is deterministic.
pub fn rank_by_frequency(nouns: Vec<String>, top_n: usize) -> Vec<String> {
    // noun -> (count, first index)
    let mut counts: HashMap<String, (usize, usize)> = HashMap::new();
    for (index, noun) in nouns.into_iter().enumerate() {
        if noun.chars().count() <= 1 {
            continue;
        }
        counts.entry(noun).or_insert((0, index)).0 += 1;
    }

    let mut ranked: Vec<(String, usize, usize)> = counts
        .into_iter()
        .map(|(noun, (count, first))| (noun, count, first))
        .collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then(a.2.cmp(&b.2)));

    ranked
        .into_iter()
        .take(top_n)
        .map(|(noun, _, _)| noun)
        .collect()
}
