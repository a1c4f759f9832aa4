// Unit tests for the cluster engine.
//
// The embedder maps each card to a hand-picked vector so the partition is
// predictable, and the namer is scripted per group.

use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;

use cardlens::cards::Card;
use cardlens::cluster::engine::{cluster_count, ClusterEngine, ClusterError, UNCATEGORIZED};
use cardlens::providers::traits::{EmbeddingProvider, ProviderError, TextGenerator};

/// Embeds by keyword: "반도체" cards near one point, "요리" cards near another.
struct KeywordEmbedder {
    calls: AtomicUsize,
}

impl KeywordEmbedder {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
        })
    }
}

#[async_trait]
impl EmbeddingProvider for KeywordEmbedder {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f64>>, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(texts
            .iter()
            .enumerate()
            .map(|(i, t)| {
                let jitter = i as f64 * 0.001;
                if t.contains("반도체") {
                    vec![1.0 + jitter, 0.0]
                } else {
                    vec![0.0, 1.0 + jitter]
                }
            })
            .collect())
    }
}

struct DownEmbedder;

#[async_trait]
impl EmbeddingProvider for DownEmbedder {
    async fn embed(&self, _texts: &[String]) -> Result<Vec<Vec<f64>>, ProviderError> {
        Err(ProviderError::EmptyResponse("gemini"))
    }
}

/// Names a group after the topic its prompt mentions; fails for "요리".
struct TopicNamer;

#[async_trait]
impl TextGenerator for TopicNamer {
    async fn generate(&self, prompt: &str) -> Result<String, ProviderError> {
        if prompt.contains("요리") {
            return Err(ProviderError::Malformed {
                provider: "gemini",
                detail: "no candidates".to_string(),
            });
        }
        Ok("**반도체 산업**\n".to_string())
    }
}

/// Gives every group the same name.
struct ConstantNamer;

#[async_trait]
impl TextGenerator for ConstantNamer {
    async fn generate(&self, _prompt: &str) -> Result<String, ProviderError> {
        Ok("기타".to_string())
    }
}

fn cards() -> Vec<Card> {
    vec![
        Card::new(10, "반도체 수출 증가"),
        Card::new(11, "김치찌개 요리법"),
        Card::new(12, "HBM 반도체 가격"),
        Card::new(13, "파스타 요리 팁"),
    ]
}

fn all_ids(clusters: &[cardlens::cards::ClusterInfo]) -> Vec<i64> {
    let mut ids: Vec<i64> = clusters.iter().flat_map(|c| c.card_ids.clone()).collect();
    ids.sort();
    ids
}

// ============================================================
// k selection
// ============================================================

#[test]
fn cluster_count_matches_documented_values() {
    assert_eq!(cluster_count(3), 2);
    assert_eq!(cluster_count(4), 2);
    assert_eq!(cluster_count(11), 5);
}

#[test]
fn cluster_count_stays_in_bounds() {
    for n in 2..200 {
        let k = cluster_count(n);
        assert!((2..=5).contains(&k));
        if n / 2 > 2 {
            assert!(k <= n / 2);
        }
    }
}

// ============================================================
// Short-circuit for tiny inputs
// ============================================================

#[tokio::test]
async fn single_card_is_uncategorized_without_embedding() {
    let embedder = KeywordEmbedder::new();
    let engine = ClusterEngine::new(Some(embedder.clone()), None);

    let clusters = engine.cluster(&[Card::new(7, "혼자")]).await.unwrap();
    assert_eq!(clusters.len(), 1);
    assert_eq!(clusters[0].category_name, UNCATEGORIZED);
    assert_eq!(clusters[0].card_ids, vec![7]);
    assert_eq!(embedder.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn no_cards_still_returns_one_empty_group() {
    let engine = ClusterEngine::new(None, None);
    let clusters = engine.cluster(&[]).await.unwrap();
    assert_eq!(clusters.len(), 1);
    assert!(clusters[0].card_ids.is_empty());
}

// ============================================================
// Embedding failures propagate
// ============================================================

#[tokio::test]
async fn missing_embedder_is_an_error() {
    let engine = ClusterEngine::new(None, None);
    let err = engine.cluster(&cards()).await.unwrap_err();
    assert!(matches!(
        err,
        ClusterError::Embedding(ProviderError::Unconfigured(_))
    ));
}

#[tokio::test]
async fn embedder_failure_is_an_error() {
    let engine = ClusterEngine::new(Some(Arc::new(DownEmbedder)), None);
    let err = engine.cluster(&cards()).await.unwrap_err();
    assert!(matches!(err, ClusterError::Embedding(_)));
}

// ============================================================
// Partition and naming
// ============================================================

#[tokio::test]
async fn every_card_lands_in_exactly_one_cluster() {
    let engine = ClusterEngine::new(Some(KeywordEmbedder::new()), Some(Arc::new(TopicNamer)));
    let clusters = engine.cluster(&cards()).await.unwrap();

    assert_eq!(all_ids(&clusters), vec![10, 11, 12, 13]);
    let names: HashSet<&str> = clusters.iter().map(|c| c.category_name.as_str()).collect();
    assert_eq!(names.len(), clusters.len());
}

#[tokio::test]
async fn failed_naming_only_affects_its_own_group() {
    let engine = ClusterEngine::new(Some(KeywordEmbedder::new()), Some(Arc::new(TopicNamer)));
    let clusters = engine.cluster(&cards()).await.unwrap();

    assert_eq!(clusters.len(), 2);
    let chips = clusters
        .iter()
        .find(|c| c.card_ids.contains(&10))
        .unwrap();
    assert_eq!(chips.category_name, "반도체 산업");
    assert_eq!(chips.card_ids, vec![10, 12]);

    let food = clusters
        .iter()
        .find(|c| c.card_ids.contains(&11))
        .unwrap();
    assert!(food.category_name.starts_with("카테고리 "));
    assert_eq!(food.card_ids, vec![11, 13]);
}

#[tokio::test]
async fn no_namer_gives_placeholder_names() {
    let engine = ClusterEngine::new(Some(KeywordEmbedder::new()), None);
    let clusters = engine.cluster(&cards()).await.unwrap();
    assert!(clusters
        .iter()
        .all(|c| c.category_name.starts_with("카테고리 ")));
    assert_eq!(all_ids(&clusters), vec![10, 11, 12, 13]);
}

#[tokio::test]
async fn colliding_names_merge_into_one_cluster() {
    let engine = ClusterEngine::new(Some(KeywordEmbedder::new()), Some(Arc::new(ConstantNamer)));
    let clusters = engine.cluster(&cards()).await.unwrap();

    assert_eq!(clusters.len(), 1);
    assert_eq!(clusters[0].category_name, "기타");
    assert_eq!(clusters[0].card_ids, vec![10, 11, 12, 13]);
}
