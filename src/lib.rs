// cardlens: AI enrichment for text cards
//
// This is the library root. Each module corresponds to one subsystem:
// tag extraction, clustering, the report agent, and the HTTP layer that
// exposes them.

pub mod agent;
pub mod cards;
pub mod cluster;
pub mod config;
pub mod download;
pub mod providers;
pub mod registry;
pub mod status;
pub mod tags;
pub mod web;
