// Model registry: every model handle the service uses, built once at startup.
//
// Each remote or local dependency is optional. A missing credential or model
// file leaves its slot empty and only the features that need it go dark;
// everything else keeps working. The registry is read-only after startup and
// shared through an Arc in the web state.

use std::sync::Arc;

use serde::Serialize;
use tracing::{info, warn};

use crate::agent::report::ReportAgent;
use crate::cluster::engine::ClusterEngine;
use crate::config::Config;
use crate::download::embedding_model_dir;
use crate::providers::anthropic::AnthropicChat;
use crate::providers::gemini::{GeminiEmbedder, GeminiGenerator};
use crate::providers::traits::{EmbeddingProvider, TextGenerator, ToolChatModel};
use crate::tags::aggregator::TagAggregator;
use crate::tags::embeddings::SentenceEmbedder;
use crate::tags::frequency::FrequencyExtractor;
use crate::tags::keyphrase::{KeywordScorer, NgramExtractor, PhraseExtractor};
use crate::tags::morphology::{Morphology, ParticleSegmenter};
use crate::tags::ner::OnnxEntityRecognizer;
use crate::tags::traits::TagExtractor;

#[derive(Default)]
pub struct ModelRegistry {
    /// Candidate extractors, in the order their output is unioned.
    pub extractors: Vec<Arc<dyn TagExtractor>>,
    pub refiner: Option<Arc<dyn TextGenerator>>,
    pub namer: Option<Arc<dyn TextGenerator>>,
    pub embedder: Option<Arc<dyn EmbeddingProvider>>,
    pub agent_model: Option<Arc<dyn ToolChatModel>>,
}

/// Which registry slots are filled. Served by GET /health.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Availability {
    pub tag_refinement: bool,
    pub cluster_naming: bool,
    pub embeddings: bool,
    pub agent: bool,
    pub extractors: Vec<&'static str>,
}

impl ModelRegistry {
    /// Build every client the configuration allows. Never fails: problems are
    /// logged and the affected slot stays empty.
    pub fn from_config(config: &Config) -> Self {
        let mut registry = Self {
            extractors: build_extractors(config),
            ..Default::default()
        };

        match &config.gemini_api_key {
            Some(key) => {
                registry.refiner = Some(Arc::new(GeminiGenerator::new(
                    key.clone(),
                    config.tag_model.as_str(),
                )));
                registry.namer = Some(Arc::new(GeminiGenerator::new(
                    key.clone(),
                    config.naming_model.as_str(),
                )));
                registry.embedder = Some(Arc::new(GeminiEmbedder::new(
                    key.clone(),
                    config.embedding_model.as_str(),
                )));
                info!(
                    tag_model = %config.tag_model,
                    embedding_model = %config.embedding_model,
                    "Gemini clients initialized"
                );
            }
            None => warn!(
                "GEMINI_API_KEY not set: tag generation and clustering are unavailable"
            ),
        }

        match &config.anthropic_api_key {
            Some(key) => {
                registry.agent_model = Some(Arc::new(AnthropicChat::new(
                    key.clone(),
                    config.agent_model.as_str(),
                )));
                info!(model = %config.agent_model, "Anthropic client initialized");
            }
            None => warn!("ANTHROPIC_API_KEY not set: report agent is unavailable"),
        }

        registry
    }

    /// The tag pipeline, if a refinement model is configured.
    pub fn tag_aggregator(&self) -> Option<TagAggregator> {
        let refiner = self.refiner.clone()?;
        Some(TagAggregator::new(self.extractors.clone(), refiner))
    }

    pub fn cluster_engine(&self) -> ClusterEngine {
        ClusterEngine::new(self.embedder.clone(), self.namer.clone())
    }

    pub fn report_agent(&self) -> Option<ReportAgent> {
        self.agent_model.clone().map(ReportAgent::new)
    }

    pub fn availability(&self) -> Availability {
        Availability {
            tag_refinement: self.refiner.is_some(),
            cluster_naming: self.namer.is_some(),
            embeddings: self.embedder.is_some(),
            agent: self.agent_model.is_some(),
            extractors: self.extractors.iter().map(|e| e.name()).collect(),
        }
    }
}

/// Frequency always works; the keyword and NER extractors need local models.
fn build_extractors(config: &Config) -> Vec<Arc<dyn TagExtractor>> {
    let morphology: Arc<dyn Morphology> = Arc::new(ParticleSegmenter::new());
    let mut extractors: Vec<Arc<dyn TagExtractor>> = vec![Arc::new(FrequencyExtractor::new(
        Arc::clone(&morphology),
        config.top_n,
    ))];

    let embed_dir = embedding_model_dir(&config.model_dir);
    match SentenceEmbedder::load(&embed_dir) {
        Ok(embedder) => {
            let scorer = KeywordScorer::new(Arc::new(embedder));
            extractors.push(Arc::new(NgramExtractor::new(scorer.clone(), config.top_n)));
            extractors.push(Arc::new(PhraseExtractor::new(
                scorer,
                Arc::clone(&morphology),
                config.top_n,
            )));
            info!("Keyword extractors ready ({})", embed_dir.display());
        }
        Err(e) => warn!(
            error = %e,
            "Sentence embedding model unavailable, keyword extractors disabled"
        ),
    }

    match OnnxEntityRecognizer::load(&config.ner_model_dir) {
        Ok(ner) => {
            extractors.push(Arc::new(ner));
            info!("NER extractor ready ({})", config.ner_model_dir.display());
        }
        Err(e) => warn!(error = %e, "NER model unavailable, entity extractor disabled"),
    }

    extractors
}
