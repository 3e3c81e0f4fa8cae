pub mod auth;
pub mod google;
pub mod types;

use async_trait::async_trait;

use types::{Document, RevisionMeta};

/// Failures at the document-service boundary. Everything here is treated as
/// transient by the watcher: it logs and retries on the next poll.
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error("not found: {0}")]
    NotFound(String),
    #[error("HTTP {status}: {body}")]
    Http { status: u16, body: String },
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("unexpected response shape: {0}")]
    Decode(#[from] serde_json::Error),
    #[error(transparent)]
    Auth(#[from] auth::AuthError),
}

impl SourceError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, SourceError::NotFound(_))
    }
}

pub type SourceResult<T> = std::result::Result<T, SourceError>;

/// Read access to a remotely edited document and its revision history.
#[async_trait]
pub trait DocumentSource: Send + Sync {
    /// Current structured document tree.
    async fn document(&self, document_id: &str) -> SourceResult<Document>;

    /// Current content as flat text.
    async fn flat_text(&self, document_id: &str) -> SourceResult<String> {
        Ok(self.document(document_id).await?.plain_text())
    }

    /// Revision ids, oldest first. The last entry is the latest revision.
    async fn list_revisions(&self, document_id: &str) -> SourceResult<Vec<String>>;

    /// May fail with `SourceError::NotFound` when the revision was pruned.
    async fn revision_metadata(
        &self,
        document_id: &str,
        revision_id: &str,
    ) -> SourceResult<RevisionMeta>;
}
