// Named-entity extraction with a local token-classification model.
//
// The model directory must hold `model.onnx`, `tokenizer.json`, and the
// Hugging Face `config.json` (for `id2label`). Any BIO-tagged NER model
// exported to ONNX works; a Korean model such as a KLUE-NER fine-tune is the
// natural choice for this service.
//
// Aggregation follows the "simple" strategy: each token takes its argmax
// label, consecutive tokens of the same entity type merge into one entity,
// a B- label always starts a new one, and O tokens end the current one.

use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};
use async_trait::async_trait;
use ort::session::Session;
use ort::value::Tensor;
use serde::Deserialize;
use tokenizers::{Tokenizer, TruncationParams};
use tracing::debug;

use super::traits::TagExtractor;

const MAX_SEQ_LEN: usize = 512;

/// The subset of a Hugging Face model config we need.
#[derive(Debug, Deserialize)]
struct ModelConfig {
    id2label: HashMap<String, String>,
}

/// Token-level prediction fed into aggregation.
#[derive(Debug, Clone, PartialEq)]
pub struct TokenLabel {
    pub label: String,
    /// Byte offsets into the source text.
    pub start: usize,
    pub end: usize,
}

pub struct OnnxEntityRecognizer {
    session: Arc<Mutex<Session>>,
    tokenizer: Arc<Tokenizer>,
    labels: Arc<Vec<String>>,
}

impl OnnxEntityRecognizer {
    pub fn load(model_dir: &Path) -> Result<Self> {
        let model_path = model_dir.join("model.onnx");
        let tokenizer_path = model_dir.join("tokenizer.json");
        let config_path = model_dir.join("config.json");

        for path in [&model_path, &tokenizer_path, &config_path] {
            if !path.exists() {
                anyhow::bail!("NER model file not found: {}", path.display());
            }
        }

        let session = Session::builder()
            .context("Failed to create ONNX session builder")?
            .commit_from_file(&model_path)
            .with_context(|| format!("Failed to load NER model from {}", model_path.display()))?;

        let mut tokenizer = Tokenizer::from_file(&tokenizer_path)
            .map_err(|e| anyhow::anyhow!("Failed to load NER tokenizer: {}", e))?;
        tokenizer
            .with_truncation(Some(TruncationParams {
                max_length: MAX_SEQ_LEN,
                ..Default::default()
            }))
            .map_err(|e| anyhow::anyhow!("Failed to configure truncation: {}", e))?;

        let config_json = std::fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read {}", config_path.display()))?;
        let labels = labels_from_config(&config_json)?;

        debug!(
            labels = labels.len(),
            "Loaded NER model from {}",
            model_dir.display()
        );

        Ok(Self {
            session: Arc::new(Mutex::new(session)),
            tokenizer: Arc::new(tokenizer),
            labels: Arc::new(labels),
        })
    }

    /// Entity surface forms in text order, with internal whitespace removed.
    pub async fn entities(&self, text: &str) -> Result<Vec<String>> {
        if text.trim().is_empty() {
            return Ok(Vec::new());
        }

        let session = Arc::clone(&self.session);
        let tokenizer = Arc::clone(&self.tokenizer);
        let labels = Arc::clone(&self.labels);
        let text = text.to_string();

        tokio::task::spawn_blocking(move || {
            let tokens = classify_tokens(&session, &tokenizer, &labels, &text)?;
            Ok(aggregate_entities(&text, &tokens))
        })
        .await
        .context("spawn_blocking panicked")?
    }
}

#[async_trait]
impl TagExtractor for OnnxEntityRecognizer {
    fn name(&self) -> &'static str {
        "ner"
    }

    async fn extract(&self, text: &str) -> Result<Vec<String>> {
        self.entities(text).await
    }
}

/// Turn `id2label` into an index-ordered label list.
fn labels_from_config(json: &str) -> Result<Vec<String>> {
    let config: ModelConfig =
        serde_json::from_str(json).context("config.json has no usable id2label map")?;

    let mut indexed: Vec<(usize, String)> = config
        .id2label
        .into_iter()
        .map(|(id, label)| {
            id.parse::<usize>()
                .map(|i| (i, label))
                .with_context(|| format!("Non-numeric label id: {id}"))
        })
        .collect::<Result<_>>()?;
    indexed.sort_by_key(|(i, _)| *i);

    for (expected, (actual, _)) in indexed.iter().enumerate() {
        if expected != *actual {
            anyhow::bail!("id2label is not contiguous at index {expected}");
        }
    }

    Ok(indexed.into_iter().map(|(_, label)| label).collect())
}

/// Run the model and return one argmax label per non-special token.
fn classify_tokens(
    session: &Arc<Mutex<Session>>,
    tokenizer: &Arc<Tokenizer>,
    labels: &[String],
    text: &str,
) -> Result<Vec<TokenLabel>> {
    let encoding = tokenizer
        .encode(text, true)
        .map_err(|e| anyhow::anyhow!("Tokenization failed: {}", e))?;

    let seq_len = encoding.get_ids().len();
    if seq_len == 0 {
        return Ok(Vec::new());
    }

    let input_ids: Vec<i64> = encoding.get_ids().iter().map(|&id| id as i64).collect();
    let attention_mask: Vec<i64> = encoding
        .get_attention_mask()
        .iter()
        .map(|&m| m as i64)
        .collect();
    let shape = [1_i64, seq_len as i64];

    let input_ids_tensor =
        Tensor::from_array((shape, input_ids)).context("Failed to create input_ids tensor")?;
    let attention_mask_tensor = Tensor::from_array((shape, attention_mask))
        .context("Failed to create attention_mask tensor")?;

    // Output shape: [1, seq_len, num_labels], raw logits
    let logits = {
        let mut session = session
            .lock()
            .map_err(|e| anyhow::anyhow!("Session lock poisoned: {}", e))?;

        let outputs = session
            .run(ort::inputs! {
                "input_ids" => input_ids_tensor,
                "attention_mask" => attention_mask_tensor
            })
            .context("NER ONNX inference failed")?;

        let (_shape, data) = outputs[0]
            .try_extract_tensor::<f32>()
            .context("Failed to extract NER output tensor")?;

        data.to_vec()
    };

    let num_labels = labels.len();
    if num_labels == 0 || logits.len() != seq_len * num_labels {
        anyhow::bail!(
            "NER output has {} logits, expected {} x {}",
            logits.len(),
            seq_len,
            num_labels
        );
    }

    let special = encoding.get_special_tokens_mask();
    let offsets = encoding.get_offsets();

    let mut tokens = Vec::with_capacity(seq_len);
    for i in 0..seq_len {
        if special[i] == 1 {
            continue;
        }
        let row = &logits[i * num_labels..(i + 1) * num_labels];
        let best = row
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.partial_cmp(b.1).unwrap_or(std::cmp::Ordering::Equal))
            .map(|(idx, _)| idx)
            .unwrap_or(0);
        let (start, end) = offsets[i];
        tokens.push(TokenLabel {
            label: labels[best].clone(),
            start,
            end,
        });
    }

    Ok(tokens)
}

/// Split a BIO label into (is_begin, entity type). `O` yields None.
fn parse_label(label: &str) -> Option<(bool, &str)> {
    if label == "O" {
        return None;
    }
    if let Some(kind) = label.strip_prefix("B-") {
        return Some((true, kind));
    }
    if let Some(kind) = label.strip_prefix("I-") {
        return Some((false, kind));
    }
    Some((false, label))
}

/// Merge token labels into entity surface forms ("simple" aggregation).
pub fn aggregate_entities(text: &str, tokens: &[TokenLabel]) -> Vec<String> {
    let mut entities = Vec::new();
    // (entity type, start, end) of the entity being built
    let mut current: Option<(&str, usize, usize)> = None;

    let close = |span: Option<(&str, usize, usize)>, entities: &mut Vec<String>| {
        if let Some((_, start, end)) = span {
            if let Some(surface) = text.get(start..end) {
                let compact: String = surface.chars().filter(|c| !c.is_whitespace()).collect();
                if !compact.is_empty() {
                    entities.push(compact);
                }
            }
        }
    };

    for token in tokens {
        match parse_label(&token.label) {
            None => close(current.take(), &mut entities),
            Some((is_begin, kind)) => match current {
                Some((cur_kind, start, _)) if !is_begin && cur_kind == kind => {
                    current = Some((cur_kind, start, token.end));
                }
                _ => {
                    close(current.take(), &mut entities);
                    current = Some((kind, token.start, token.end));
                }
            },
        }
    }
    close(current.take(), &mut entities);

    entities
}
