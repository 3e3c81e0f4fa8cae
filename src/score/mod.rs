//! Relevance of added text to a task description.

#[cfg(feature = "embedding")]
pub mod embedding;
pub mod lexical;

use std::path::PathBuf;
use std::str::FromStr;

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use lexical::LexicalScorer;

/// Which vector space contributions are compared in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScoringStrategy {
    Lexical,
    Embedding,
}

impl FromStr for ScoringStrategy {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "lexical" | "tfidf" | "tf-idf" => Ok(ScoringStrategy::Lexical),
            "embedding" | "embeddings" => Ok(ScoringStrategy::Embedding),
            other => bail!("unknown scoring strategy '{}' (expected lexical or embedding)", other),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ScoringConfig {
    pub strategy: ScoringStrategy,
    pub embedding_model: String,
    #[cfg_attr(not(feature = "embedding"), allow(dead_code))]
    pub embedding_cache_dir: Option<PathBuf>,
    pub lexical_preprocess: bool,
}

/// Scale a score is expressed on. Scores from different scales are not
/// comparable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoreScale {
    /// Plain cosine, 0 to 1.
    UnitCosine,
    /// Cosine times 10, 0 to 10.
    ScaledTen,
}

/// One scored contribution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationResult {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub topic: Option<String>,
    pub task: String,
    pub contribution: String,
    pub score: f32,
    pub scale: ScoreScale,
}

pub enum RelevanceScorer {
    Lexical(LexicalScorer),
    #[cfg(feature = "embedding")]
    Embedding(embedding::EmbeddingScorer),
}

impl RelevanceScorer {
    /// Build the configured strategy. Model loading happens here, once.
    pub async fn from_config(config: &ScoringConfig) -> Result<Self> {
        match config.strategy {
            ScoringStrategy::Lexical => {
                info!(preprocess = config.lexical_preprocess, "using lexical scorer");
                Ok(RelevanceScorer::Lexical(LexicalScorer::new(
                    config.lexical_preprocess,
                )?))
            }
            #[cfg(feature = "embedding")]
            ScoringStrategy::Embedding => {
                let scorer = embedding::EmbeddingScorer::load(
                    &config.embedding_model,
                    config.embedding_cache_dir.clone(),
                )
                .await?;
                Ok(RelevanceScorer::Embedding(scorer))
            }
            #[cfg(not(feature = "embedding"))]
            ScoringStrategy::Embedding => bail!(
                "SCORING_STRATEGY=embedding needs a build with `--features embedding` \
                 (model '{}' unavailable)",
                config.embedding_model
            ),
        }
    }

    pub fn scale(&self) -> ScoreScale {
        match self {
            RelevanceScorer::Lexical(_) => ScoreScale::UnitCosine,
            #[cfg(feature = "embedding")]
            RelevanceScorer::Embedding(_) => ScoreScale::ScaledTen,
        }
    }

    /// One result per contribution, in input order.
    pub async fn score(
        &self,
        topic: Option<&str>,
        task: &str,
        contributions: &[String],
    ) -> Result<Vec<EvaluationResult>> {
        if contributions.is_empty() {
            return Ok(Vec::new());
        }
        let scores = match self {
            RelevanceScorer::Lexical(scorer) => scorer.score(task, contributions),
            #[cfg(feature = "embedding")]
            RelevanceScorer::Embedding(scorer) => scorer.score(task, contributions).await?,
        };
        debug!(topic, count = scores.len(), "contributions scored");

        let scale = self.scale();
        Ok(contributions
            .iter()
            .zip(scores)
            .map(|(contribution, score)| EvaluationResult {
                topic: topic.map(str::to_string),
                task: task.to_string(),
                contribution: contribution.clone(),
                score,
                scale,
            })
            .collect())
    }
}

/// Cosine similarity of two dense vectors; 0 for mismatched or zero vectors.
#[cfg_attr(not(feature = "embedding"), allow(dead_code))]
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return 0.0;
    }

    let dot_product: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let magnitude_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let magnitude_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if magnitude_a == 0.0 || magnitude_b == 0.0 {
        return 0.0;
    }

    dot_product / (magnitude_a * magnitude_b)
}
