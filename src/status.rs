// System status display: which models loaded, which endpoints will answer.

use colored::Colorize;

use crate::config::Config;
use crate::download::{embedding_model_dir, onnx_files_present};
use crate::registry::ModelRegistry;

/// Print registry availability to the terminal.
pub fn show(config: &Config, registry: &ModelRegistry) {
    let availability = registry.availability();

    println!("{}", "=== cardlens status ===".bold());

    println!("\nRemote models:");
    line(
        availability.tag_refinement,
        &format!("Tag refinement ({})", config.tag_model),
    );
    line(
        availability.cluster_naming,
        &format!("Cluster naming ({})", config.naming_model),
    );
    line(
        availability.embeddings,
        &format!("Embeddings ({})", config.embedding_model),
    );
    line(
        availability.agent,
        &format!("Report agent ({})", config.agent_model),
    );

    println!("\nLocal models:");
    let embed_dir = embedding_model_dir(&config.model_dir);
    line(
        onnx_files_present(&embed_dir),
        &format!("Sentence embeddings ({})", embed_dir.display()),
    );
    line(
        onnx_files_present(&config.ner_model_dir),
        &format!("NER ({})", config.ner_model_dir.display()),
    );

    println!(
        "\nTag extractors: {}",
        if availability.extractors.is_empty() {
            "none".to_string()
        } else {
            availability.extractors.join(", ")
        }
    );

    println!("\nEndpoints:");
    line(availability.tag_refinement, "POST /tags/generate");
    line(availability.embeddings, "POST /cards/cluster");
    line(availability.agent, "POST /agent/invoke");

    if !onnx_files_present(&embed_dir) {
        println!(
            "\n{}",
            "Run `cardlens download-model` to enable keyword extraction.".dimmed()
        );
    }
}

fn line(ok: bool, label: &str) {
    let mark = if ok { "ok".green() } else { "--".red() };
    println!("  [{mark}] {label}");
}
