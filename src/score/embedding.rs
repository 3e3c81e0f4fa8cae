//! Sentence-embedding relevance using a locally run fastembed model.
//!
//! The model is downloaded to the cache directory on first use and loaded
//! once per process.

use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use anyhow::{anyhow, bail, Context, Result};
use fastembed::{EmbeddingModel, InitOptions, TextEmbedding};
use tokio::task;
use tracing::{debug, info};

use super::cosine_similarity;

/// Cosine similarity is multiplied by this to land on a 0-10 scale.
pub const SCORE_SCALE: f32 = 10.0;

pub struct EmbeddingScorer {
    model: Arc<Mutex<TextEmbedding>>,
    model_name: String,
}

impl EmbeddingScorer {
    /// Load (and if needed download) the model on a blocking thread.
    pub async fn load(model_name: &str, cache_dir: Option<PathBuf>) -> Result<Self> {
        let embedding_model = model_name_to_enum(model_name)?;
        info!(model = model_name, cache = ?cache_dir, "loading embedding model");

        let mut options = InitOptions::new(embedding_model).with_show_download_progress(true);
        if let Some(dir) = cache_dir {
            options = options.with_cache_dir(dir);
        }

        let model = task::spawn_blocking(move || TextEmbedding::try_new(options))
            .await
            .context("spawn_blocking join failed")?
            .map_err(|e| anyhow!("Failed to load embedding model '{}': {}", model_name, e))?;

        info!(model = model_name, "embedding model ready");
        Ok(Self {
            model: Arc::new(Mutex::new(model)),
            model_name: model_name.to_string(),
        })
    }

    pub fn model_name(&self) -> &str {
        &self.model_name
    }

    /// Scaled cosine between `task` and each contribution. The task and all
    /// non-empty contributions go to the model in a single batch; empty
    /// contributions score 0 without touching the model.
    pub async fn score(&self, task: &str, contributions: &[String]) -> Result<Vec<f32>> {
        let non_empty: Vec<usize> = contributions
            .iter()
            .enumerate()
            .filter(|(_, c)| !c.trim().is_empty())
            .map(|(i, _)| i)
            .collect();
        let mut scores = vec![0.0; contributions.len()];
        if non_empty.is_empty() || task.trim().is_empty() {
            return Ok(scores);
        }

        let mut texts = Vec::with_capacity(non_empty.len() + 1);
        texts.push(task.to_string());
        texts.extend(non_empty.iter().map(|&i| contributions[i].clone()));

        let model = Arc::clone(&self.model);
        let embeddings = task::spawn_blocking(move || {
            let mut guard = model
                .lock()
                .map_err(|e| anyhow!("embedding model lock poisoned: {}", e))?;
            guard
                .embed(texts, None)
                .map_err(|e| anyhow!("Embedding generation failed: {}", e))
        })
        .await
        .context("spawn_blocking join failed")??;

        let Some((task_vec, rest)) = embeddings.split_first() else {
            bail!("embedding model returned no vectors");
        };
        for (&index, vector) in non_empty.iter().zip(rest) {
            scores[index] = cosine_similarity(task_vec, vector) * SCORE_SCALE;
        }
        debug!(count = scores.len(), "contributions embedded");
        Ok(scores)
    }
}

fn model_name_to_enum(model_name: &str) -> Result<EmbeddingModel> {
    match model_name {
        "all-MiniLM-L6-v2" => Ok(EmbeddingModel::AllMiniLML6V2),
        "all-MiniLM-L12-v2" => Ok(EmbeddingModel::AllMiniLML12V2),
        "paraphrase-multilingual-MiniLM-L12-v2" => Ok(EmbeddingModel::ParaphraseMLMiniLML12V2),
        "bge-small-en-v1.5" => Ok(EmbeddingModel::BGESmallENV15),
        "bge-base-en-v1.5" => Ok(EmbeddingModel::BGEBaseENV15),
        "nomic-embed-text-v1.5" => Ok(EmbeddingModel::NomicEmbedTextV15),
        _ => bail!(
            "Unsupported EMBEDDING_MODEL '{}'. Supported: all-MiniLM-L6-v2, all-MiniLM-L12-v2, \
             paraphrase-multilingual-MiniLM-L12-v2, bge-small-en-v1.5, bge-base-en-v1.5, \
             nomic-embed-text-v1.5",
            model_name
        ),
    }
}
