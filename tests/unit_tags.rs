// Unit tests for the tag pipeline: candidate union, refinement parsing, and
// the degrade path when the refinement model fails.
//
// Extractors and the refinement model are in-test fakes, so nothing here
// needs network access or local model files.

use std::sync::{Arc, Mutex};

use anyhow::Result;
use async_trait::async_trait;

use cardlens::providers::traits::{ProviderError, TextGenerator};
use cardlens::tags::aggregator::{union_candidates, TagAggregator, NO_TAGS_MARKER};
use cardlens::tags::frequency::FrequencyExtractor;
use cardlens::tags::morphology::ParticleSegmenter;
use cardlens::tags::traits::TagExtractor;

struct FixedExtractor {
    name: &'static str,
    tags: Vec<&'static str>,
}

#[async_trait]
impl TagExtractor for FixedExtractor {
    fn name(&self) -> &'static str {
        self.name
    }

    async fn extract(&self, _text: &str) -> Result<Vec<String>> {
        Ok(self.tags.iter().map(|t| t.to_string()).collect())
    }
}

struct BrokenExtractor;

#[async_trait]
impl TagExtractor for BrokenExtractor {
    fn name(&self) -> &'static str {
        "broken"
    }

    async fn extract(&self, _text: &str) -> Result<Vec<String>> {
        anyhow::bail!("model session crashed")
    }
}

/// Returns a fixed answer (or error) and records every prompt it receives.
struct ScriptedGenerator {
    answer: Option<&'static str>,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedGenerator {
    fn answering(answer: &'static str) -> Arc<Self> {
        Arc::new(Self {
            answer: Some(answer),
            prompts: Mutex::new(Vec::new()),
        })
    }

    fn failing() -> Arc<Self> {
        Arc::new(Self {
            answer: None,
            prompts: Mutex::new(Vec::new()),
        })
    }

    fn calls(&self) -> usize {
        self.prompts.lock().unwrap().len()
    }
}

#[async_trait]
impl TextGenerator for ScriptedGenerator {
    async fn generate(&self, prompt: &str) -> Result<String, ProviderError> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        match self.answer {
            Some(answer) => Ok(answer.to_string()),
            None => Err(ProviderError::Status {
                provider: "gemini",
                status: 429,
                body: "quota exceeded".to_string(),
            }),
        }
    }
}

fn fixed(name: &'static str, tags: &[&'static str]) -> Arc<dyn TagExtractor> {
    Arc::new(FixedExtractor {
        name,
        tags: tags.to_vec(),
    })
}

fn aggregator(
    extractors: Vec<Arc<dyn TagExtractor>>,
    refiner: &Arc<ScriptedGenerator>,
) -> TagAggregator {
    TagAggregator::new(extractors, Arc::clone(refiner) as Arc<dyn TextGenerator>)
}

// ============================================================
// Candidate union
// ============================================================

#[test]
fn union_keeps_extractor_order_and_exact_duplicates_only() {
    let union = union_candidates(vec![
        vec!["인공지능".to_string(), "AI".to_string()],
        vec!["AI".to_string(), "ai 기술".to_string()],
        vec![],
        vec!["오픈AI".to_string(), "인공지능".to_string()],
    ]);
    assert_eq!(union, vec!["인공지능", "AI", "ai 기술", "오픈AI"]);
}

#[tokio::test]
async fn candidates_skip_failing_extractors() {
    let refiner = ScriptedGenerator::answering("AI");
    let agg = aggregator(
        vec![
            fixed("frequency", &["반도체", "수출"]),
            Arc::new(BrokenExtractor),
            fixed("ner", &["삼성전자", "반도체"]),
        ],
        &refiner,
    );
    assert_eq!(
        agg.candidates("아무 텍스트").await,
        vec!["반도체", "수출", "삼성전자"]
    );
}

// ============================================================
// generate_tags
// ============================================================

#[tokio::test]
async fn no_candidates_means_no_refinement_call() {
    let refiner = ScriptedGenerator::answering("AI, 반도체");
    let agg = aggregator(vec![fixed("frequency", &[]), fixed("ner", &[])], &refiner);

    assert!(agg.generate_tags("").await.is_empty());
    assert_eq!(refiner.calls(), 0);
}

#[tokio::test]
async fn refinement_output_is_parsed_and_capped() {
    let refiner = ScriptedGenerator::answering("AI, 반도체 , HBM,, 엔비디아, 수출, 환율, 금리");
    let agg = aggregator(vec![fixed("frequency", &["반도체", "AI"])], &refiner);

    let tags = agg.generate_tags("AI 반도체 수출").await;
    assert_eq!(tags, vec!["AI", "반도체", "HBM", "엔비디아", "수출"]);
    assert_eq!(refiner.calls(), 1);
}

#[tokio::test]
async fn refinement_prompt_carries_every_candidate() {
    let refiner = ScriptedGenerator::answering("AI");
    let agg = aggregator(
        vec![fixed("frequency", &["인공지능"]), fixed("ngram", &["AI", "딥러닝"])],
        &refiner,
    );
    agg.generate_tags("본문").await;

    let prompts = refiner.prompts.lock().unwrap();
    assert!(prompts[0].contains("인공지능, AI, 딥러닝"));
}

#[tokio::test]
async fn no_tags_marker_empties_the_result() {
    let refiner = ScriptedGenerator::answering("AI, 없음");
    let agg = aggregator(vec![fixed("frequency", &["날씨"])], &refiner);

    assert!(agg.generate_tags("오늘 날씨").await.is_empty());
    assert_eq!(NO_TAGS_MARKER, "없음");
}

#[tokio::test]
async fn refinement_failure_falls_back_to_first_five_candidates() {
    let refiner = ScriptedGenerator::failing();
    let agg = aggregator(
        vec![
            fixed("frequency", &["a1", "a2", "a3"]),
            fixed("ngram", &["b1", "a2", "b2", "b3"]),
        ],
        &refiner,
    );

    let tags = agg.generate_tags("본문").await;
    assert_eq!(tags, vec!["a1", "a2", "a3", "b1", "b2"]);
}

#[tokio::test]
async fn blank_refinement_output_yields_no_tags() {
    let refiner = ScriptedGenerator::answering(" , ,");
    let agg = aggregator(vec![fixed("frequency", &["반도체"])], &refiner);
    assert!(agg.generate_tags("반도체").await.is_empty());
}

// ============================================================
// Frequency extractor with the built-in segmenter
// ============================================================

#[tokio::test]
async fn frequency_extractor_ranks_repeated_nouns_first() {
    let extractor = FrequencyExtractor::new(Arc::new(ParticleSegmenter::new()), 20);
    let tags = extractor
        .extract("반도체 수출이 늘었다. 반도체 가격도 올랐고 반도체 기업은 투자를 늘린다.")
        .await
        .unwrap();
    assert_eq!(tags[0], "반도체");
    assert!(tags.contains(&"수출".to_string()));
    assert!(tags.len() <= 20);
}
