// Cluster engine: embed cards, partition them, and name each partition.
//
// Embedding is mandatory. Without vectors there is nothing to cluster, so a
// missing or failing embedder aborts the request. Naming is best-effort:
// each group that cannot be named gets a numbered placeholder on its own.

use std::collections::HashMap;
use std::sync::Arc;

use futures::future::join_all;
use thiserror::Error;
use tracing::{debug, info, warn};

use super::kmeans::{kmeans, KMEANS_SEED};
use crate::cards::{Card, ClusterInfo};
use crate::providers::traits::{EmbeddingProvider, ProviderError, TextGenerator};

/// Name given to the single group returned for fewer than two cards.
pub const UNCATEGORIZED: &str = "미분류";

pub const MIN_CLUSTERS: usize = 2;
pub const MAX_CLUSTERS: usize = 5;

#[derive(Debug, Error)]
pub enum ClusterError {
    #[error("failed to embed cards: {0}")]
    Embedding(#[from] ProviderError),
}

/// `floor(n / 2)` clamped to `[2, 5]`.
pub fn cluster_count(n: usize) -> usize {
    (n / 2).clamp(MIN_CLUSTERS, MAX_CLUSTERS)
}

pub fn placeholder_name(label: usize) -> String {
    format!("카테고리 {label}")
}

/// Drop markdown emphasis the model sometimes wraps names in.
pub fn strip_emphasis(raw: &str) -> String {
    raw.replace('*', "").trim().to_string()
}

pub fn build_naming_prompt(contents: &[&str]) -> String {
    let listing = contents
        .iter()
        .map(|c| format!("- {c}"))
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        "다음은 하나의 그룹으로 묶인 문서들입니다.\n\
         --- 문서 목록 ---\n\
         {listing}\n\
         ------------------\n\
         이 문서들의 공통 주제를 가장 잘 나타내는 카테고리 이름을 2~3 단어의 명사구로 생성해주세요. \
         카테고리 이름만 간결하게 답변해주세요."
    )
}

/// Group card ids by name, in order of first appearance.
///
/// Names are compared exactly; two labels that received the same name end up
/// in one entry with their ids concatenated.
pub fn merge_by_name(assignments: Vec<(i64, String)>) -> Vec<ClusterInfo> {
    let mut clusters: Vec<ClusterInfo> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();

    for (id, name) in assignments {
        match index.get(&name) {
            Some(&i) => clusters[i].card_ids.push(id),
            None => {
                index.insert(name.clone(), clusters.len());
                clusters.push(ClusterInfo {
                    category_name: name,
                    card_ids: vec![id],
                });
            }
        }
    }

    clusters
}

pub struct ClusterEngine {
    embedder: Option<Arc<dyn EmbeddingProvider>>,
    namer: Option<Arc<dyn TextGenerator>>,
    seed: u64,
}

impl ClusterEngine {
    pub fn new(
        embedder: Option<Arc<dyn EmbeddingProvider>>,
        namer: Option<Arc<dyn TextGenerator>>,
    ) -> Self {
        Self {
            embedder,
            namer,
            seed: KMEANS_SEED,
        }
    }

    pub async fn cluster(&self, cards: &[Card]) -> Result<Vec<ClusterInfo>, ClusterError> {
        if cards.len() < 2 {
            debug!(cards = cards.len(), "Too few cards to cluster");
            return Ok(vec![ClusterInfo {
                category_name: UNCATEGORIZED.to_string(),
                card_ids: cards.iter().map(|c| c.id).collect(),
            }]);
        }

        let embedder = self
            .embedder
            .as_ref()
            .ok_or(ProviderError::Unconfigured("Embedding model"))?;

        let contents: Vec<String> = cards.iter().map(|c| c.content.clone()).collect();
        let vectors = embedder.embed(&contents).await?;
        check_vectors(&vectors, cards.len())?;

        let k = cluster_count(cards.len());
        let labels = kmeans(&vectors, k, self.seed);
        debug!(cards = cards.len(), k, "Partitioned cards");

        // label -> member contents, skipping labels no card received
        let mut groups: Vec<(usize, Vec<&str>)> = Vec::new();
        for label in 0..k {
            let members: Vec<&str> = cards
                .iter()
                .zip(&labels)
                .filter(|(_, &l)| l == label)
                .map(|(c, _)| c.content.as_str())
                .collect();
            if !members.is_empty() {
                groups.push((label, members));
            }
        }

        let naming = groups.iter().map(|(label, members)| async move {
            (*label, self.name_group(*label, members).await)
        });
        let names: HashMap<usize, String> = join_all(naming).await.into_iter().collect();

        let assignments = cards
            .iter()
            .zip(&labels)
            .map(|(card, label)| {
                let name = names
                    .get(label)
                    .cloned()
                    .unwrap_or_else(|| placeholder_name(*label));
                (card.id, name)
            })
            .collect();

        let clusters = merge_by_name(assignments);
        info!(
            cards = cards.len(),
            clusters = clusters.len(),
            "Clustered cards"
        );
        Ok(clusters)
    }

    async fn name_group(&self, label: usize, contents: &[&str]) -> String {
        let Some(namer) = &self.namer else {
            return placeholder_name(label);
        };

        match namer.generate(&build_naming_prompt(contents)).await {
            Ok(raw) => {
                let name = strip_emphasis(&raw);
                if name.is_empty() {
                    warn!(label, "Naming model returned an empty name, using placeholder");
                    placeholder_name(label)
                } else {
                    name
                }
            }
            Err(e) => {
                warn!(label, error = %e, "Cluster naming failed, using placeholder");
                placeholder_name(label)
            }
        }
    }
}

/// One vector per card, all of the same non-zero dimensionality.
fn check_vectors(vectors: &[Vec<f64>], expected: usize) -> Result<(), ProviderError> {
    if vectors.len() != expected {
        return Err(ProviderError::Malformed {
            provider: "embedding",
            detail: format!("{} vectors for {} cards", vectors.len(), expected),
        });
    }
    let dim = vectors.first().map(Vec::len).unwrap_or(0);
    if dim == 0 || vectors.iter().any(|v| v.len() != dim) {
        return Err(ProviderError::Malformed {
            provider: "embedding",
            detail: "embeddings have inconsistent dimensionality".to_string(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cluster_count_bounds() {
        assert_eq!(cluster_count(2), 2);
        assert_eq!(cluster_count(3), 2);
        assert_eq!(cluster_count(4), 2);
        assert_eq!(cluster_count(7), 3);
        assert_eq!(cluster_count(11), 5);
        assert_eq!(cluster_count(200), 5);
    }

    #[test]
    fn test_strip_emphasis() {
        assert_eq!(strip_emphasis("  **AI 윤리**\n"), "AI 윤리");
        assert_eq!(strip_emphasis("***"), "");
    }

    #[test]
    fn test_merge_by_name_collisions_merge() {
        let merged = merge_by_name(vec![
            (1, "AI".to_string()),
            (2, "요리".to_string()),
            (3, "AI".to_string()),
        ]);
        assert_eq!(merged.len(), 2);
        assert_eq!(merged[0].category_name, "AI");
        assert_eq!(merged[0].card_ids, vec![1, 3]);
        assert_eq!(merged[1].card_ids, vec![2]);
    }

    #[test]
    fn test_naming_prompt_lists_documents() {
        let prompt = build_naming_prompt(&["첫 문서", "둘째 문서"]);
        assert!(prompt.contains("- 첫 문서\n- 둘째 문서"));
    }

    #[test]
    fn test_check_vectors_rejects_mismatch() {
        assert!(check_vectors(&[vec![1.0]], 2).is_err());
        assert!(check_vectors(&[vec![1.0], vec![1.0, 2.0]], 2).is_err());
        assert!(check_vectors(&[vec![1.0], vec![2.0]], 2).is_ok());
    }
}
