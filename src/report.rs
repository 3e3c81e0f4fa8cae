use serde::Serialize;
use tracing::{debug, info, warn};

use crate::docs::types::{RevisionMeta, Topic};
use crate::score::EvaluationResult;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangedField {
    Description,
    Answer,
}

/// A topic field whose text differs from the previous snapshot.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TopicChange {
    pub topic: String,
    pub field: ChangedField,
    pub previous: String,
    pub current: String,
}

/// Everything one poll cycle produced.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CycleReport {
    pub revision: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<RevisionMeta>,
    /// Present in topics mode.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub topics: Vec<Topic>,
    pub changes: Vec<TopicChange>,
    pub evaluations: Vec<EvaluationResult>,
}

impl CycleReport {
    pub fn new(revision: impl Into<String>) -> Self {
        Self {
            revision: revision.into(),
            ..Default::default()
        }
    }

    /// Log the report; with `print_json` also write it to stdout.
    pub fn emit(&self, print_json: bool) {
        match &self.metadata {
            Some(meta) => info!(
                revision = %self.revision,
                author = %meta.author,
                modified = ?meta.modified_time,
                published = meta.published,
                "new revision"
            ),
            None => info!(revision = %self.revision, "new revision (no metadata)"),
        }
        for change in &self.changes {
            info!(topic = %change.topic, field = ?change.field, "topic updated");
            debug!(previous = %change.previous, current = %change.current, "topic diff");
        }
        for eval in &self.evaluations {
            info!(
                topic = eval.topic.as_deref().unwrap_or("-"),
                score = eval.score,
                scale = ?eval.scale,
                contribution = %eval.contribution,
                "contribution scored"
            );
        }

        match serde_json::to_string_pretty(self) {
            Ok(json) => {
                debug!("cycle report:\n{}", json);
                if print_json {
                    println!("{}", json);
                }
            }
            Err(e) => warn!("Failed to serialize cycle report: {}", e),
        }
    }
}
