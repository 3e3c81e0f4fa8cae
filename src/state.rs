use serde::{Deserialize, Serialize};

use crate::docs::types::Topic;

/// What a snapshot captured.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SnapshotContent {
    Topics(Vec<Topic>),
    Text(String),
}

/// Document state at one revision.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub revision: String,
    pub content: SnapshotContent,
    /// blake3 of the serialized content; equal fingerprints mean nothing to diff.
    pub fingerprint: String,
}

impl Snapshot {
    pub fn new(revision: impl Into<String>, content: SnapshotContent) -> Self {
        let bytes = serde_json::to_vec(&content).unwrap_or_default();
        let fingerprint = blake3::hash(&bytes).to_hex().to_string();
        Self {
            revision: revision.into(),
            content,
            fingerprint,
        }
    }

    pub fn topics(&self) -> &[Topic] {
        match &self.content {
            SnapshotContent::Topics(topics) => topics,
            SnapshotContent::Text(_) => &[],
        }
    }

    pub fn text(&self) -> &str {
        match &self.content {
            SnapshotContent::Text(text) => text,
            SnapshotContent::Topics(_) => "",
        }
    }
}

/// The one snapshot the watcher keeps between polls.
#[derive(Debug, Default)]
pub struct WatchState {
    last: Option<Snapshot>,
}

impl WatchState {
    pub fn last(&self) -> Option<&Snapshot> {
        self.last.as_ref()
    }

    pub fn last_revision(&self) -> Option<&str> {
        self.last.as_ref().map(|s| s.revision.as_str())
    }

    /// Swap in the snapshot of a fully processed cycle.
    pub fn replace(&mut self, snapshot: Snapshot) -> Option<Snapshot> {
        self.last.replace(snapshot)
    }
}
