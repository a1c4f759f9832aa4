// Tag aggregation: union the extractor signals, then let an LLM curate them.
//
// Extractors over-generate on purpose. The refinement call merges synonyms
// ("인공지능" and "AI" become one tag), drops generic terms, and cuts the list
// to a fixed size. When that call fails, the raw candidate union is truncated
// instead, so the endpoint still answers.

use std::collections::HashSet;
use std::sync::Arc;

use futures::future::join_all;
use tracing::{debug, info, warn};

use super::traits::TagExtractor;
use crate::providers::traits::TextGenerator;

/// How many tags the refinement step is asked to produce.
pub const TARGET_TAG_COUNT: usize = 5;

/// The refinement model answers with this token when no tag applies.
pub const NO_TAGS_MARKER: &str = "없음";

pub struct TagAggregator {
    extractors: Vec<Arc<dyn TagExtractor>>,
    refiner: Arc<dyn TextGenerator>,
    target_count: usize,
}

impl TagAggregator {
    pub fn new(extractors: Vec<Arc<dyn TagExtractor>>, refiner: Arc<dyn TextGenerator>) -> Self {
        Self {
            extractors,
            refiner,
            target_count: TARGET_TAG_COUNT,
        }
    }

    /// Run every extractor and union their candidates.
    ///
    /// A failing extractor is logged and contributes nothing.
    pub async fn candidates(&self, content: &str) -> Vec<String> {
        let runs = self.extractors.iter().map(|extractor| async move {
            match extractor.extract(content).await {
                Ok(tags) => {
                    debug!(extractor = extractor.name(), count = tags.len(), "Extracted candidates");
                    tags
                }
                Err(e) => {
                    warn!(extractor = extractor.name(), error = %e, "Extractor failed, skipping");
                    Vec::new()
                }
            }
        });

        union_candidates(join_all(runs).await)
    }

    /// Produce at most `TARGET_TAG_COUNT` tags for a card's content.
    pub async fn generate_tags(&self, content: &str) -> Vec<String> {
        let candidates = self.candidates(content).await;
        if candidates.is_empty() {
            debug!("No tag candidates, skipping refinement");
            return Vec::new();
        }

        let prompt = build_refinement_prompt(&candidates, self.target_count);

        match self.refiner.generate(&prompt).await {
            Ok(raw) => {
                let tags = parse_refinement(&raw, self.target_count);
                info!(
                    candidates = candidates.len(),
                    tags = tags.len(),
                    "Refined tags"
                );
                tags
            }
            Err(e) => {
                warn!(error = %e, "Tag refinement failed, returning raw candidates");
                fallback_tags(&candidates, self.target_count)
            }
        }
    }
}

/// Union candidate lists with exact string dedup, keeping first-seen order.
///
/// No case folding or whitespace normalization: "AI" and "ai" are distinct.
pub fn union_candidates(lists: Vec<Vec<String>>) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut union = Vec::new();
    for tag in lists.into_iter().flatten() {
        if seen.insert(tag.clone()) {
            union.push(tag);
        }
    }
    union
}

/// The first `target_count` candidates, unranked.
pub fn fallback_tags(candidates: &[String], target_count: usize) -> Vec<String> {
    candidates.iter().take(target_count).cloned().collect()
}

pub fn build_refinement_prompt(candidates: &[String], target_count: usize) -> String {
    format!(
        "다음은 특정 문서에서 다양한 알고리즘으로 추출한 태그 후보 목록입니다.\n\
         \n\
         --- 태그 후보 목록 ---\n\
         {candidates}\n\
         --------------------\n\
         \n\
         이 목록을 보고, 문서의 핵심 주제를 가장 잘 나타내는 최종 태그를 {target_count}개만 골라 다듬어주세요.\n\
         예를 들어, '인공지능'과 'AI'가 둘 다 있다면 'AI'로 합치고, 너무 광범위하거나 중요하지 않은 단어는 제거해주세요.\n\
         적절한 태그가 하나도 없다면 '{marker}'이라고만 답해주세요.\n\
         결과는 반드시 쉼표(,)로만 구분된 리스트 형태로 답해주세요. (예: 태그1,태그2,태그3)",
        candidates = candidates.join(", "),
        marker = NO_TAGS_MARKER,
    )
}

/// Parse the comma-separated refinement output.
///
/// Any occurrence of the no-tags marker empties the result. Blank pieces are
/// dropped and the list is capped at `target_count`.
pub fn parse_refinement(raw: &str, target_count: usize) -> Vec<String> {
    if raw.contains(NO_TAGS_MARKER) {
        return Vec::new();
    }

    raw.split(',')
        .map(str::trim)
        .filter(|tag| !tag.is_empty())
        .take(target_count)
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_union_is_exact_match() {
        let union = union_candidates(vec![
            vec!["AI".to_string(), "반도체".to_string()],
            vec!["ai".to_string(), "AI".to_string(), "반도체 ".to_string()],
        ]);
        assert_eq!(union, vec!["AI", "반도체", "ai", "반도체 "]);
    }

    #[test]
    fn test_parse_trims_and_caps() {
        let tags = parse_refinement(" AI , 반도체,,NLP, 번역, 코딩, 편향성 ", 5);
        assert_eq!(tags, vec!["AI", "반도체", "NLP", "번역", "코딩"]);
    }

    #[test]
    fn test_parse_marker_wins() {
        assert!(parse_refinement("AI, 없음", 5).is_empty());
        assert!(parse_refinement("태그 없음", 5).is_empty());
    }

    #[test]
    fn test_prompt_lists_candidates_and_count() {
        let prompt = build_refinement_prompt(&["AI".to_string(), "인공지능".to_string()], 5);
        assert!(prompt.contains("AI, 인공지능"));
        assert!(prompt.contains("5개"));
    }

    #[test]
    fn test_fallback_takes_first_entries() {
        let candidates: Vec<String> = (0..8).map(|i| format!("t{i}")).collect();
        assert_eq!(fallback_tags(&candidates, 5), vec!["t0", "t1", "t2", "t3", "t4"]);
    }
}
