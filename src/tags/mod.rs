// Tag generation: candidate extractors plus the LLM aggregation step.

pub mod aggregator;
pub mod embeddings;
pub mod frequency;
pub mod keyphrase;
pub mod morphology;
pub mod ner;
pub mod traits;
