// Remote model providers behind swappable traits.
//
// Gemini serves embeddings and plain generation; Anthropic serves the
// tool-calling agent. Pipelines only ever see the traits.

pub mod anthropic;
pub mod gemini;
pub mod traits;
