// Semantic clustering of cards with LLM-named categories.

pub mod engine;
pub mod kmeans;
