use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use tracing::info;

use cardlens::config::Config;
use cardlens::registry::ModelRegistry;

/// cardlens: AI enrichment for text cards.
///
/// Generates tags, clusters cards into named categories, and drafts reports
/// from a card collection.
#[derive(Parser)]
#[command(name = "cardlens", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP API server
    Serve {
        /// Port to listen on
        #[arg(long, default_value = "8000")]
        port: u16,

        /// Address to bind
        #[arg(long, default_value = "0.0.0.0")]
        bind: String,
    },

    /// Download the local sentence embedding model (~470 MB)
    DownloadModel,

    /// Generate tags for a piece of text and print them
    Tags {
        /// Text to tag
        #[arg(required_unless_present = "file", conflicts_with = "file")]
        text: Option<String>,

        /// Read the text from a file instead
        #[arg(long)]
        file: Option<PathBuf>,
    },

    /// Show which models and endpoints are available
    Status,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if missing)
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                tracing_subscriber::EnvFilter::new("cardlens=info,tower_http=info")
            }),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Serve { port, bind } => {
            let config = Config::load()?;
            info!("Loading models...");
            let registry = ModelRegistry::from_config(&config);
            cardlens::web::run_server(registry, port, &bind).await?;
        }

        Commands::DownloadModel => {
            let config = Config::load()?;
            println!("Downloading models to {}", config.model_dir.display());
            cardlens::download::download_embedding_model(&config.model_dir).await?;
            println!("\n{}", "Model download complete.".green());
            println!(
                "The NER model is not downloaded automatically. Place an ONNX token-classification\n\
                 model (model.onnx, tokenizer.json, config.json) in {}",
                config.ner_model_dir.display()
            );
        }

        Commands::Tags { text, file } => {
            let config = Config::load()?;
            config.require_gemini()?;

            let content = match (text, file) {
                (Some(text), _) => text,
                (None, Some(path)) => std::fs::read_to_string(&path)
                    .with_context(|| format!("Failed to read {}", path.display()))?,
                (None, None) => anyhow::bail!("Provide TEXT or --file"),
            };

            let registry = ModelRegistry::from_config(&config);
            let aggregator = registry
                .tag_aggregator()
                .context("Tag refinement model failed to initialize")?;

            let tags = aggregator.generate_tags(&content).await;
            if tags.is_empty() {
                println!("{}", "No tags found.".dimmed());
            } else {
                for tag in &tags {
                    println!("  #{}", tag.bold());
                }
            }
        }

        Commands::Status => {
            let config = Config::load()?;
            let registry = ModelRegistry::from_config(&config);
            cardlens::status::show(&config, &registry);
        }
    }

    Ok(())
}
