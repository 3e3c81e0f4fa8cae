use std::collections::BTreeMap;

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tokio::sync::Mutex;
use tracing::debug;

use super::auth::{acquire_token, AccessToken, Credentials};
use super::types::{Document, Paragraph, RevisionMeta, Rgb, TextRun, TextStyle};
use super::{DocumentSource, SourceError, SourceResult};

const DOCS_BASE: &str = "https://docs.googleapis.com/v1/documents";
const DRIVE_BASE: &str = "https://www.googleapis.com/drive/v3/files";
const TOKEN_ATTEMPTS: u32 = 3;

/// Google Docs + Drive revisions, authenticated with a refresh token.
pub struct GoogleDocsSource {
    client: reqwest::Client,
    credentials: Credentials,
    token: Mutex<Option<AccessToken>>,
}

impl GoogleDocsSource {
    /// Builds the client and acquires a first access token so bad
    /// credentials surface at startup instead of on the first poll.
    pub async fn connect(credentials: Credentials) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .context("Failed to create HTTP client")?;
        let token = acquire_token(&client, &credentials, TOKEN_ATTEMPTS)
            .await
            .context("Failed to obtain Google access token")?;
        Ok(Self {
            client,
            credentials,
            token: Mutex::new(Some(token)),
        })
    }

    async fn bearer(&self) -> SourceResult<String> {
        let mut guard = self.token.lock().await;
        if let Some(token) = guard.as_ref().filter(|t| t.is_fresh()) {
            return Ok(token.token.clone());
        }
        debug!("refreshing Google access token");
        let fresh = acquire_token(&self.client, &self.credentials, TOKEN_ATTEMPTS).await?;
        let bearer = fresh.token.clone();
        *guard = Some(fresh);
        Ok(bearer)
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&str, &str)],
    ) -> SourceResult<T> {
        let bearer = self.bearer().await?;
        let resp = self
            .client
            .get(url)
            .bearer_auth(bearer)
            .query(query)
            .send()
            .await?;
        let status = resp.status();
        let body = resp.text().await?;
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(SourceError::NotFound(url.to_string()));
        }
        if !status.is_success() {
            return Err(SourceError::Http {
                status: status.as_u16(),
                body,
            });
        }
        Ok(serde_json::from_str(&body)?)
    }
}

#[async_trait]
impl DocumentSource for GoogleDocsSource {
    async fn document(&self, document_id: &str) -> SourceResult<Document> {
        let raw: RawDocument = self
            .get_json(&format!("{}/{}", DOCS_BASE, document_id), &[])
            .await?;
        Ok(raw.into())
    }

    async fn list_revisions(&self, document_id: &str) -> SourceResult<Vec<String>> {
        let url = format!("{}/{}/revisions", DRIVE_BASE, document_id);
        let mut ids = Vec::new();
        let mut page_token: Option<String> = None;
        loop {
            let mut query = vec![("pageSize", "1000"), ("fields", "nextPageToken,revisions(id)")];
            if let Some(token) = page_token.as_deref() {
                query.push(("pageToken", token));
            }
            let page: RawRevisionList = self.get_json(&url, &query).await?;
            ids.extend(page.revisions.into_iter().map(|r| r.id));
            match page.next_page_token {
                Some(next) => page_token = Some(next),
                None => break,
            }
        }
        Ok(ids)
    }

    async fn revision_metadata(
        &self,
        document_id: &str,
        revision_id: &str,
    ) -> SourceResult<RevisionMeta> {
        let url = format!("{}/{}/revisions/{}", DRIVE_BASE, document_id, revision_id);
        let raw: RawRevision = self.get_json(&url, &[("fields", "*")]).await?;
        Ok(raw.into())
    }
}

// Wire shapes of the Docs v1 / Drive v3 JSON. Converted once into the typed
// records above; nothing past this module sees them.

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
struct RawDocument {
    document_id: String,
    title: String,
    body: RawBody,
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct RawBody {
    content: Vec<RawStructuralElement>,
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct RawStructuralElement {
    paragraph: Option<RawParagraph>,
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
struct RawParagraph {
    elements: Vec<RawParagraphElement>,
    paragraph_style: RawParagraphStyle,
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
struct RawParagraphStyle {
    named_style_type: String,
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
struct RawParagraphElement {
    text_run: Option<RawTextRun>,
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
struct RawTextRun {
    content: String,
    text_style: RawTextStyle,
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
struct RawTextStyle {
    bold: bool,
    italic: bool,
    underline: bool,
    background_color: Option<RawOptionalColor>,
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct RawOptionalColor {
    color: Option<RawColor>,
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
struct RawColor {
    rgb_color: Option<RawRgb>,
}

/// The API omits channels that are zero.
#[derive(Deserialize, Default)]
#[serde(default)]
struct RawRgb {
    red: f32,
    green: f32,
    blue: f32,
}

impl From<RawDocument> for Document {
    fn from(raw: RawDocument) -> Self {
        let paragraphs = raw
            .body
            .content
            .into_iter()
            .filter_map(|el| el.paragraph)
            .map(|p| Paragraph {
                named_style: p.paragraph_style.named_style_type,
                runs: p
                    .elements
                    .into_iter()
                    .filter_map(|e| e.text_run)
                    .map(TextRun::from)
                    .collect(),
            })
            .collect();
        Document {
            id: raw.document_id,
            title: raw.title,
            paragraphs,
        }
    }
}

impl From<RawTextRun> for TextRun {
    fn from(raw: RawTextRun) -> Self {
        let background = raw
            .text_style
            .background_color
            .and_then(|c| c.color)
            .and_then(|c| c.rgb_color)
            .map(|c| Rgb::new(c.red, c.green, c.blue));
        TextRun {
            content: raw.content,
            style: TextStyle {
                bold: raw.text_style.bold,
                italic: raw.text_style.italic,
                underline: raw.text_style.underline,
                background,
            },
        }
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawRevisionList {
    #[serde(default)]
    revisions: Vec<RawRevisionId>,
    next_page_token: Option<String>,
}

#[derive(Deserialize)]
struct RawRevisionId {
    id: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawRevision {
    id: String,
    modified_time: Option<DateTime<Utc>>,
    last_modifying_user: Option<RawUser>,
    #[serde(default)]
    export_links: BTreeMap<String, String>,
    #[serde(default)]
    published: bool,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawUser {
    display_name: Option<String>,
}

impl From<RawRevision> for RevisionMeta {
    fn from(raw: RawRevision) -> Self {
        RevisionMeta {
            id: raw.id,
            author: raw
                .last_modifying_user
                .and_then(|u| u.display_name)
                .unwrap_or_else(|| "unknown".to_string()),
            modified_time: raw.modified_time,
            export_links: raw.export_links,
            published: raw.published,
        }
    }
}
