//! Poll loop: snapshot the document on each new revision, diff it against
//! the retained snapshot and score what was added.

use std::collections::HashMap;
use std::time::Duration;

use anyhow::{Context, Result};
use tracing::{debug, info, warn};

use crate::config::{WatchConfig, WatchMode};
use crate::diff::{added_texts, Granularity};
use crate::docs::types::{RevisionMeta, Topic};
use crate::docs::DocumentSource;
use crate::extract::markdown::strip_markers;
use crate::extract::SectionExtractor;
use crate::report::{ChangedField, CycleReport, TopicChange};
use crate::score::{EvaluationResult, RelevanceScorer};
use crate::state::{Snapshot, SnapshotContent, WatchState};

/// Result of one poll.
#[derive(Debug)]
pub enum CycleOutcome {
    /// Latest revision is the one already retained.
    Unchanged,
    /// The document has no revisions to read.
    NoRevisions,
    /// First snapshot of the run; nothing to compare against.
    Baseline(CycleReport),
    /// New revision, but the extracted content is identical.
    ContentUnchanged { revision: String },
    Changed(CycleReport),
}

pub struct Watcher<S> {
    source: S,
    extractor: SectionExtractor,
    scorer: RelevanceScorer,
    document_id: String,
    task_description: String,
    mode: WatchMode,
    granularity: Granularity,
    poll_interval: Duration,
    print_json: bool,
    state: WatchState,
}

impl<S: DocumentSource> Watcher<S> {
    pub fn new(source: S, scorer: RelevanceScorer, config: &WatchConfig) -> Self {
        Self {
            source,
            extractor: SectionExtractor::new(config.classifier.clone(), config.heading_style.clone()),
            scorer,
            document_id: config.document_id.clone(),
            task_description: config.task_description.clone(),
            mode: config.mode,
            granularity: config.granularity,
            poll_interval: config.poll_interval,
            print_json: config.print_json,
            state: WatchState::default(),
        }
    }

    #[cfg(test)]
    pub fn state(&self) -> &WatchState {
        &self.state
    }

    /// Poll until the process is interrupted. Failed cycles are logged and
    /// retried on the next tick with the previous snapshot untouched.
    pub async fn run(&mut self) {
        info!(
            document = %self.document_id,
            mode = ?self.mode,
            granularity = %self.granularity,
            interval_secs = self.poll_interval.as_secs(),
            "watching document"
        );
        loop {
            match self.poll_once().await {
                Ok(CycleOutcome::Baseline(report)) => {
                    info!(topics = report.topics.len(), "baseline captured");
                    report.emit(self.print_json);
                }
                Ok(CycleOutcome::Changed(report)) => report.emit(self.print_json),
                Ok(CycleOutcome::ContentUnchanged { revision }) => {
                    debug!(revision = %revision, "revision without content changes")
                }
                Ok(CycleOutcome::Unchanged) | Ok(CycleOutcome::NoRevisions) => {}
                Err(e) => warn!("Poll cycle failed, retrying next interval: {:#}", e),
            }

            tokio::select! {
                _ = tokio::time::sleep(self.poll_interval) => {}
                _ = tokio::signal::ctrl_c() => {
                    info!("interrupted, stopping watcher");
                    return;
                }
            }
        }
    }

    /// One full cycle. The retained snapshot is replaced only if every step
    /// succeeds.
    pub async fn poll_once(&mut self) -> Result<CycleOutcome> {
        let revisions = self
            .source
            .list_revisions(&self.document_id)
            .await
            .context("Failed to list revisions")?;
        let Some(latest) = revisions.last().cloned() else {
            return Ok(CycleOutcome::NoRevisions);
        };
        if self.state.last_revision() == Some(latest.as_str()) {
            return Ok(CycleOutcome::Unchanged);
        }
        debug!(revision = %latest, "new revision detected");

        let snapshot = self.capture(&latest).await?;
        let outcome = match self.state.last() {
            None => {
                let mut report = CycleReport::new(latest);
                report.topics = snapshot.topics().to_vec();
                CycleOutcome::Baseline(report)
            }
            Some(previous) if previous.fingerprint == snapshot.fingerprint => {
                CycleOutcome::ContentUnchanged { revision: latest }
            }
            Some(previous) => CycleOutcome::Changed(self.compare(previous, &snapshot).await?),
        };

        self.state.replace(snapshot);
        Ok(outcome)
    }

    async fn capture(&self, revision: &str) -> Result<Snapshot> {
        let content = match self.mode {
            WatchMode::Topics => {
                let document = self
                    .source
                    .document(&self.document_id)
                    .await
                    .context("Failed to fetch document")?;
                SnapshotContent::Topics(self.extractor.extract(&document))
            }
            WatchMode::Document => SnapshotContent::Text(
                self.source
                    .flat_text(&self.document_id)
                    .await
                    .context("Failed to fetch document text")?,
            ),
        };
        Ok(Snapshot::new(revision, content))
    }

    async fn compare(&self, previous: &Snapshot, current: &Snapshot) -> Result<CycleReport> {
        let mut report = CycleReport::new(current.revision.clone());
        report.metadata = self.metadata(&current.revision).await;

        match &current.content {
            SnapshotContent::Topics(topics) => {
                self.compare_topics(previous.topics(), topics, &mut report)
                    .await?;
                report.topics = topics.clone();
            }
            SnapshotContent::Text(text) => {
                let added = added_texts(previous.text(), text, self.granularity);
                report.evaluations = self.evaluate(None, &self.task_description, &added).await?;
            }
        }
        Ok(report)
    }

    /// The nth topic with a given header is matched to the nth previous
    /// topic with the same header. A topic without a counterpart is compared
    /// against an empty one.
    async fn compare_topics(
        &self,
        previous: &[Topic],
        current: &[Topic],
        report: &mut CycleReport,
    ) -> Result<()> {
        let mut seen: HashMap<&str, usize> = HashMap::new();
        for topic in current {
            let occurrence = seen.entry(topic.topic.as_str()).or_insert(0);
            let before = previous
                .iter()
                .filter(|p| p.topic == topic.topic)
                .nth(*occurrence);
            *occurrence += 1;

            if let Some(before) = before {
                if before.description != topic.description {
                    report.changes.push(TopicChange {
                        topic: topic.topic.clone(),
                        field: ChangedField::Description,
                        previous: before.description.clone(),
                        current: topic.description.clone(),
                    });
                }
            }

            let old_answer = before.map(|b| b.answer.as_str()).unwrap_or("");
            if old_answer == topic.answer {
                continue;
            }
            report.changes.push(TopicChange {
                topic: topic.topic.clone(),
                field: ChangedField::Answer,
                previous: old_answer.to_string(),
                current: topic.answer.clone(),
            });

            let added = added_texts(old_answer, &topic.answer, self.granularity);
            let task = if topic.description.is_empty() {
                &self.task_description
            } else {
                &topic.description
            };
            let results = self.evaluate(Some(&topic.topic), task, &added).await?;
            report.evaluations.extend(results);
        }
        Ok(())
    }

    /// Score added blocks with formatting markers removed. Blocks that were
    /// only markers (a run turned bold, say) are not new content.
    async fn evaluate(
        &self,
        topic: Option<&str>,
        task: &str,
        added: &[String],
    ) -> Result<Vec<EvaluationResult>> {
        let contributions: Vec<String> = added
            .iter()
            .map(|block| strip_markers(block).trim().to_string())
            .filter(|block| !block.is_empty())
            .collect();
        if contributions.is_empty() {
            return Ok(Vec::new());
        }
        self.scorer
            .score(topic, &strip_markers(task), &contributions)
            .await
            .context("Failed to score contributions")
    }

    /// Metadata is informational; any failure skips it for this cycle.
    async fn metadata(&self, revision: &str) -> Option<RevisionMeta> {
        match self
            .source
            .revision_metadata(&self.document_id, revision)
            .await
        {
            Ok(meta) => Some(meta),
            Err(e) if e.is_not_found() => {
                info!(revision, "revision metadata not found (pruned?), skipping");
                None
            }
            Err(e) => {
                warn!(revision, error = %e, "revision metadata unavailable");
                None
            }
        }
    }
}
