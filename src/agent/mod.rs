// Report drafting agent and its request-scoped tools.

pub mod report;
pub mod tools;
