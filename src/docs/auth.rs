use std::path::Path;
use std::time::{Duration, Instant};

use serde::Deserialize;
use tracing::{debug, warn};

pub const TOKEN_URI: &str = "https://oauth2.googleapis.com/token";

/// Tokens are treated as expired this long before Google says they are.
const EXPIRY_MARGIN: Duration = Duration::from_secs(60);

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("missing credential: {0}")]
    MissingCredential(String),
    #[error("token endpoint rejected the refresh token (HTTP {status}): {body}")]
    Rejected { status: u16, body: String },
    #[error("token request failed: {0}")]
    Transport(#[from] reqwest::Error),
}

/// OAuth2 client credentials plus a long-lived refresh token.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub client_id: String,
    pub client_secret: String,
    pub refresh_token: String,
}

impl Credentials {
    /// Reads `GOOGLE_CLIENT_ID` / `GOOGLE_CLIENT_SECRET` and the refresh token,
    /// either from `GOOGLE_REFRESH_TOKEN` or from the `refresh_token` field of
    /// the token file written by a previous consent flow.
    pub fn from_env(token_file: &Path) -> Result<Self, AuthError> {
        let client_id = required_var("GOOGLE_CLIENT_ID")?;
        let client_secret = required_var("GOOGLE_CLIENT_SECRET")?;
        let refresh_token = match dotenv::var("GOOGLE_REFRESH_TOKEN")
            .ok()
            .filter(|t| !t.is_empty())
        {
            Some(token) => token,
            None => read_refresh_token(token_file)?,
        };
        Ok(Self {
            client_id,
            client_secret,
            refresh_token,
        })
    }
}

fn required_var(name: &str) -> Result<String, AuthError> {
    dotenv::var(name)
        .ok()
        .filter(|v| !v.is_empty())
        .ok_or_else(|| AuthError::MissingCredential(name.to_string()))
}

#[derive(Deserialize)]
struct TokenFile {
    refresh_token: Option<String>,
}

/// Pull `refresh_token` out of a saved token file.
pub fn read_refresh_token(path: &Path) -> Result<String, AuthError> {
    let missing = || {
        AuthError::MissingCredential(format!(
            "GOOGLE_REFRESH_TOKEN (or refresh_token in {})",
            path.display()
        ))
    };
    let raw = std::fs::read_to_string(path).map_err(|_| missing())?;
    let file: TokenFile = serde_json::from_str(&raw).map_err(|_| missing())?;
    file.refresh_token.filter(|t| !t.is_empty()).ok_or_else(missing)
}

/// Short-lived bearer token.
#[derive(Debug, Clone)]
pub struct AccessToken {
    pub token: String,
    pub expires_at: Instant,
}

impl AccessToken {
    pub fn is_fresh(&self) -> bool {
        Instant::now() + EXPIRY_MARGIN < self.expires_at
    }
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default = "default_expires_in")]
    expires_in: u64,
}

fn default_expires_in() -> u64 {
    3600
}

/// Exchange the refresh token for an access token.
///
/// Transport failures and 5xx responses are retried up to `max_attempts`
/// times with a linear backoff. A 4xx means the credentials themselves are
/// bad, so it is returned immediately.
pub async fn acquire_token(
    client: &reqwest::Client,
    credentials: &Credentials,
    max_attempts: u32,
) -> Result<AccessToken, AuthError> {
    let params = [
        ("grant_type", "refresh_token"),
        ("client_id", credentials.client_id.as_str()),
        ("client_secret", credentials.client_secret.as_str()),
        ("refresh_token", credentials.refresh_token.as_str()),
    ];

    let mut attempt = 1;
    loop {
        match request_token(client, &params).await {
            Ok(token) => {
                debug!(attempt, "access token acquired");
                return Ok(token);
            }
            Err(AuthError::Rejected { status, body }) if status < 500 => {
                return Err(AuthError::Rejected { status, body });
            }
            Err(e) if attempt >= max_attempts => return Err(e),
            Err(e) => {
                warn!(attempt, max_attempts, error = %e, "token request failed, retrying");
                tokio::time::sleep(Duration::from_millis(500 * u64::from(attempt))).await;
                attempt += 1;
            }
        }
    }
}

async fn request_token(
    client: &reqwest::Client,
    params: &[(&str, &str)],
) -> Result<AccessToken, AuthError> {
    let resp = client.post(TOKEN_URI).form(params).send().await?;
    let status = resp.status();
    if !status.is_success() {
        let body = resp.text().await.unwrap_or_default();
        return Err(AuthError::Rejected {
            status: status.as_u16(),
            body,
        });
    }
    let token: TokenResponse = resp.json().await?;
    Ok(AccessToken {
        token: token.access_token,
        expires_at: Instant::now() + Duration::from_secs(token.expires_in),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_read_refresh_token_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"token": "ya29.x", "refresh_token": "1//abc", "client_id": "id"}}"#
        )
        .unwrap();
        assert_eq!(read_refresh_token(file.path()).unwrap(), "1//abc");
    }

    #[test]
    fn test_read_refresh_token_missing_field() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"token": "ya29.x"}}"#).unwrap();
        let err = read_refresh_token(file.path()).unwrap_err();
        assert!(matches!(err, AuthError::MissingCredential(_)));
        assert!(err.to_string().contains("GOOGLE_REFRESH_TOKEN"));
    }

    #[test]
    fn test_read_refresh_token_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = read_refresh_token(&dir.path().join("token.json")).unwrap_err();
        assert!(matches!(err, AuthError::MissingCredential(_)));
    }

    #[test]
    fn test_access_token_freshness() {
        let fresh = AccessToken {
            token: "t".to_string(),
            expires_at: Instant::now() + Duration::from_secs(3600),
        };
        assert!(fresh.is_fresh());

        let stale = AccessToken {
            token: "t".to_string(),
            expires_at: Instant::now() + Duration::from_secs(10),
        };
        assert!(!stale.is_fresh());
    }
}
