// Local model storage and the `download-model` command.
//
// Only the sentence-embedding model used for keyword scoring is downloadable.
// The NER model is user-supplied: point CARDLENS_NER_MODEL_DIR at any BIO
// token-classification model exported to ONNX.
//
// Files live in a platform data directory (~/.local/share/cardlens/models/ on
// Linux) so they persist across runs.

use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;

/// Hugging Face repo for the multilingual sentence embedding model.
const EMBEDDING_REPO: &str = "sentence-transformers/paraphrase-multilingual-MiniLM-L12-v2";

const EMBEDDING_DIR_NAME: &str = "paraphrase-multilingual-MiniLM-L12-v2";

/// (path in the repo, local file name, approximate size for the progress line)
const EMBEDDING_FILES: &[(&str, &str, Option<&str>)] = &[
    ("tokenizer.json", "tokenizer.json", None),
    ("onnx/model.onnx", "model.onnx", Some("~470 MB")),
];

/// ~/.local/share/cardlens/models on Linux.
pub fn default_model_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("cardlens")
        .join("models")
}

pub fn embedding_model_dir(base: &Path) -> PathBuf {
    base.join(EMBEDDING_DIR_NAME)
}

/// Both files a local ONNX model directory needs.
pub fn onnx_files_present(dir: &Path) -> bool {
    dir.join("model.onnx").exists() && dir.join("tokenizer.json").exists()
}

pub async fn download_embedding_model(base: &Path) -> Result<()> {
    let dir = embedding_model_dir(base);
    std::fs::create_dir_all(&dir)
        .with_context(|| format!("Failed to create model directory: {}", dir.display()))?;

    println!("\nSentence embedding model ({EMBEDDING_DIR_NAME}):");

    for (remote, local, size) in EMBEDDING_FILES {
        let dest = dir.join(local);
        if dest.exists() {
            info!(file = local, "Model file already exists, skipping");
            println!("  {local} (already exists)");
            continue;
        }

        match size {
            Some(size) => println!("  Downloading {local} ({size})..."),
            None => println!("  Downloading {local}..."),
        }
        let url = format!("https://huggingface.co/{EMBEDDING_REPO}/resolve/main/{remote}");
        download_file(&url, &dest, size.is_some()).await?;
    }

    Ok(())
}

/// Stream `url` into `dest`. Writes to a `.part` file first so an interrupted
/// download is never mistaken for a complete one.
async fn download_file(url: &str, dest: &Path, show_progress: bool) -> Result<()> {
    let mut response = reqwest::Client::new()
        .get(url)
        .send()
        .await
        .with_context(|| format!("Failed to download {url}"))?;

    if !response.status().is_success() {
        anyhow::bail!("Download failed with status {}: {}", response.status(), url);
    }

    let pb = if show_progress {
        Some(progress_bar(response.content_length())?)
    } else {
        None
    };

    let partial = dest.with_extension("part");
    let mut file = std::fs::File::create(&partial)
        .with_context(|| format!("Failed to create {}", partial.display()))?;

    while let Some(chunk) = response
        .chunk()
        .await
        .context("Failed to read response body")?
    {
        file.write_all(&chunk)
            .with_context(|| format!("Failed to write {}", partial.display()))?;
        if let Some(pb) = &pb {
            pb.inc(chunk.len() as u64);
        }
    }
    file.flush()?;
    drop(file);

    std::fs::rename(&partial, dest)
        .with_context(|| format!("Failed to move download into {}", dest.display()))?;

    if let Some(pb) = pb {
        pb.finish_and_clear();
    }

    info!("Downloaded {} to {}", url, dest.display());
    Ok(())
}

fn progress_bar(total: Option<u64>) -> Result<ProgressBar> {
    let pb = match total {
        Some(size) => {
            let pb = ProgressBar::new(size);
            pb.set_style(
                ProgressStyle::default_bar()
                    .template("    [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({eta})")?
                    .progress_chars("=> "),
            );
            pb
        }
        None => {
            let pb = ProgressBar::new_spinner();
            pb.set_style(ProgressStyle::default_spinner().template("    {spinner} {bytes}")?);
            pb
        }
    };
    Ok(pb)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_model_dir_is_under_cardlens() {
        let dir = default_model_dir();
        let path = dir.to_string_lossy();
        assert!(
            path.contains("cardlens") && path.contains("models"),
            "Expected path containing cardlens/models, got: {path}"
        );
    }

    #[test]
    fn test_embedding_model_dir_is_subdirectory() {
        let base = PathBuf::from("/tmp/test-models");
        assert_eq!(
            embedding_model_dir(&base),
            base.join("paraphrase-multilingual-MiniLM-L12-v2")
        );
    }

    #[test]
    fn test_onnx_files_present() {
        let dir = std::env::temp_dir().join("cardlens-download-test");
        assert!(!onnx_files_present(&dir));

        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("model.onnx"), b"fake").unwrap();
        assert!(!onnx_files_present(&dir));
        std::fs::write(dir.join("tokenizer.json"), b"fake").unwrap();
        assert!(onnx_files_present(&dir));

        std::fs::remove_dir_all(&dir).unwrap();
    }
}
