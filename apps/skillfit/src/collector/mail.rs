//! Mailbox access: the `MailSource` seam and its Gmail REST implementation.
//!
//! The Gmail client works from an authorized-user token file. When the access
//! token is missing or expired it is refreshed with the refresh token and the
//! file is rewritten. There is no interactive consent flow.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use base64::alphabet;
use base64::engine::general_purpose::{GeneralPurpose, GeneralPurposeConfig};
use base64::engine::{DecodePaddingMode, Engine as _};
use chrono::{DateTime, Duration, Utc};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::config::GmailConfig;

const GMAIL_API: &str = "https://gmail.googleapis.com/gmail/v1/users/me";
const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";
/// Refresh this long before the recorded expiry.
const EXPIRY_MARGIN_SECS: i64 = 60;

/// Base64url, padded or not.
const URL_SAFE_LENIENT: GeneralPurpose = GeneralPurpose::new(
    &alphabet::URL_SAFE,
    GeneralPurposeConfig::new()
        .with_encode_padding(false)
        .with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

#[derive(Debug, Error)]
pub enum MailError {
    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("token refresh failed: {0}")]
    TokenRefresh(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("mail API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("attachment decode error: {0}")]
    Decode(#[from] base64::DecodeError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl MailError {
    /// Unusable credentials stop a run; everything else is per message.
    pub fn is_fatal(&self) -> bool {
        matches!(self, MailError::Config(_) | MailError::TokenRefresh(_))
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Mail model
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq)]
pub struct MailMessage {
    pub id: String,
    pub headers: Vec<(String, String)>,
    pub attachments: Vec<Attachment>,
}

impl MailMessage {
    /// First header with this name, case-insensitive, trimmed.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.trim())
    }
}

/// A named file part of a message.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Attachment {
    pub filename: String,
    pub mime_type: Option<String>,
    /// Set when the content must be fetched separately.
    pub attachment_id: Option<String>,
    /// Base64url content carried inline in the message.
    pub inline_data: Option<String>,
}

/// Anything that can list messages and hand out their attachments.
#[async_trait]
pub trait MailSource: Send + Sync {
    /// Message ids, newest first as the service returns them.
    async fn list_messages(&self, max_results: u32, query: Option<&str>)
        -> Result<Vec<String>, MailError>;

    async fn get_message(&self, id: &str) -> Result<MailMessage, MailError>;

    async fn get_attachment(&self, message_id: &str, attachment_id: &str)
        -> Result<Vec<u8>, MailError>;
}

/// Attachment bytes, fetched or decoded from inline data.
pub async fn attachment_bytes(
    mail: &dyn MailSource,
    message_id: &str,
    attachment: &Attachment,
) -> Result<Vec<u8>, MailError> {
    match (&attachment.attachment_id, &attachment.inline_data) {
        (Some(id), _) => mail.get_attachment(message_id, id).await,
        (None, Some(data)) => decode_base64url(data),
        (None, None) => Ok(Vec::new()),
    }
}

pub fn decode_base64url(data: &str) -> Result<Vec<u8>, MailError> {
    Ok(URL_SAFE_LENIENT.decode(data.trim())?)
}

// ────────────────────────────────────────────────────────────────────────────
// Gmail REST payloads
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct ListResponse {
    #[serde(default)]
    messages: Vec<MessageRef>,
}

#[derive(Debug, Deserialize)]
struct MessageRef {
    id: String,
}

#[derive(Debug, Deserialize)]
struct GmailMessage {
    id: String,
    #[serde(default)]
    payload: Option<MessagePart>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MessagePart {
    #[serde(default)]
    mime_type: Option<String>,
    #[serde(default)]
    filename: Option<String>,
    #[serde(default)]
    headers: Vec<Header>,
    #[serde(default)]
    body: Option<PartBody>,
    #[serde(default)]
    parts: Vec<MessagePart>,
}

#[derive(Debug, Deserialize)]
struct Header {
    name: String,
    value: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PartBody {
    #[serde(default)]
    attachment_id: Option<String>,
    #[serde(default)]
    data: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AttachmentResponse {
    #[serde(default)]
    data: String,
}

impl From<GmailMessage> for MailMessage {
    fn from(message: GmailMessage) -> Self {
        let payload = message.payload.unwrap_or_default();
        let headers = payload
            .headers
            .iter()
            .map(|h| (h.name.clone(), h.value.clone()))
            .collect();
        let mut attachments = Vec::new();
        collect_attachments(&payload, &mut attachments);
        MailMessage {
            id: message.id,
            headers,
            attachments,
        }
    }
}

/// Depth-first walk over the MIME tree; every part with a file name counts.
fn collect_attachments(part: &MessagePart, out: &mut Vec<Attachment>) {
    if let Some(name) = part.filename.as_deref().filter(|n| !n.is_empty()) {
        let body = part.body.as_ref();
        out.push(Attachment {
            filename: name.to_string(),
            mime_type: part.mime_type.clone(),
            attachment_id: body.and_then(|b| b.attachment_id.clone()),
            inline_data: body.and_then(|b| b.data.clone()),
        });
    }
    for child in &part.parts {
        collect_attachments(child, out);
    }
}

// ────────────────────────────────────────────────────────────────────────────
// OAuth token file
// ────────────────────────────────────────────────────────────────────────────

/// Authorized-user token file. Unknown keys are written back untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AuthorizedUser {
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub token_uri: Option<String>,
    #[serde(default)]
    pub client_id: Option<String>,
    #[serde(default)]
    pub client_secret: Option<String>,
    #[serde(default)]
    pub expiry: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl AuthorizedUser {
    /// True when there is no access token or it expires within the margin.
    pub fn needs_refresh(&self, now: DateTime<Utc>) -> bool {
        if self.token.as_deref().map_or(true, str::is_empty) {
            return true;
        }
        match self.expiry.as_deref().and_then(parse_expiry) {
            Some(expiry) => expiry - Duration::seconds(EXPIRY_MARGIN_SECS) <= now,
            None => false,
        }
    }
}

/// `client_secret.json` as downloaded from the console.
#[derive(Debug, Deserialize)]
struct ClientSecrets {
    #[serde(alias = "web")]
    installed: ClientSecret,
}

#[derive(Debug, Deserialize)]
struct ClientSecret {
    client_id: String,
    client_secret: String,
    #[serde(default)]
    token_uri: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RefreshResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<i64>,
}

fn parse_expiry(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    // Some writers omit the offset; those timestamps are UTC.
    chrono::NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|naive| naive.and_utc())
}

/// Loads the token file, filling client id/secret from the credentials file when absent.
pub fn load_authorized_user(config: &GmailConfig) -> Result<AuthorizedUser, MailError> {
    let raw = std::fs::read_to_string(&config.token_path).map_err(|e| {
        MailError::Config(format!(
            "cannot read mail token file {}: {e}",
            config.token_path.display()
        ))
    })?;
    let mut user: AuthorizedUser = serde_json::from_str(&raw).map_err(|e| {
        MailError::Config(format!(
            "mail token file {} is not valid JSON: {e}",
            config.token_path.display()
        ))
    })?;

    if user.client_id.is_none() || user.client_secret.is_none() {
        if let Some(secret) = read_client_secret(&config.credentials_path) {
            user.client_id.get_or_insert(secret.client_id);
            user.client_secret.get_or_insert(secret.client_secret);
            if user.token_uri.is_none() {
                user.token_uri = secret.token_uri;
            }
        }
    }

    if user.token.is_none() && user.refresh_token.is_none() {
        return Err(MailError::Config(format!(
            "mail token file {} has neither an access token nor a refresh token",
            config.token_path.display()
        )));
    }
    Ok(user)
}

fn read_client_secret(path: &Path) -> Option<ClientSecret> {
    let raw = std::fs::read_to_string(path).ok()?;
    match serde_json::from_str::<ClientSecrets>(&raw) {
        Ok(secrets) => Some(secrets.installed),
        Err(e) => {
            warn!(path = %path.display(), error = %e, "ignoring unreadable OAuth client file");
            None
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// GmailClient
// ────────────────────────────────────────────────────────────────────────────

/// Gmail REST client scoped to one run.
pub struct GmailClient {
    client: Client,
    token_path: PathBuf,
    auth: Mutex<AuthorizedUser>,
}

impl GmailClient {
    pub fn new(config: &GmailConfig) -> Result<Self, MailError> {
        let auth = load_authorized_user(config)?;
        info!(token_path = %config.token_path.display(), "mail credentials loaded");
        Ok(Self {
            client: Client::builder()
                .timeout(std::time::Duration::from_secs(60))
                .build()?,
            token_path: config.token_path.clone(),
            auth: Mutex::new(auth),
        })
    }

    /// A valid access token, refreshing it first when needed.
    async fn access_token(&self) -> Result<String, MailError> {
        let mut auth = self.auth.lock().await;
        if auth.needs_refresh(Utc::now()) {
            self.refresh(&mut auth).await?;
        }
        auth.token
            .clone()
            .ok_or_else(|| MailError::TokenRefresh("no access token after refresh".to_string()))
    }

    async fn refresh(&self, auth: &mut AuthorizedUser) -> Result<(), MailError> {
        let (Some(refresh_token), Some(client_id), Some(client_secret)) = (
            auth.refresh_token.clone(),
            auth.client_id.clone(),
            auth.client_secret.clone(),
        ) else {
            return Err(MailError::Config(
                "access token expired and no refresh token / client credentials are available"
                    .to_string(),
            ));
        };
        let token_uri = auth
            .token_uri
            .clone()
            .unwrap_or_else(|| DEFAULT_TOKEN_URI.to_string());

        debug!("refreshing mail access token");
        let response = self
            .client
            .post(&token_uri)
            .form(&[
                ("grant_type", "refresh_token"),
                ("refresh_token", refresh_token.as_str()),
                ("client_id", client_id.as_str()),
                ("client_secret", client_secret.as_str()),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(MailError::TokenRefresh(format!("status {status}: {body}")));
        }
        let refreshed: RefreshResponse = response.json().await?;

        auth.token = Some(refreshed.access_token);
        auth.expiry = refreshed
            .expires_in
            .map(|secs| (Utc::now() + Duration::seconds(secs)).to_rfc3339());

        match serde_json::to_string_pretty(&*auth) {
            Ok(json) => {
                if let Err(e) = std::fs::write(&self.token_path, json) {
                    warn!(path = %self.token_path.display(), error = %e, "could not persist refreshed token");
                }
            }
            Err(e) => warn!(error = %e, "could not serialize refreshed token"),
        }
        info!("mail access token refreshed");
        Ok(())
    }

    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&str, String)],
    ) -> Result<T, MailError> {
        let token = self.access_token().await?;
        let response = self
            .client
            .get(url)
            .bearer_auth(token)
            .query(query)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(MailError::Api {
                status: status.as_u16(),
                message,
            });
        }
        Ok(response.json().await?)
    }
}

#[async_trait]
impl MailSource for GmailClient {
    async fn list_messages(
        &self,
        max_results: u32,
        query: Option<&str>,
    ) -> Result<Vec<String>, MailError> {
        let mut params = vec![("maxResults", max_results.to_string())];
        if let Some(q) = query {
            params.push(("q", q.to_string()));
        }
        let list: ListResponse = self
            .get_json(&format!("{GMAIL_API}/messages"), &params)
            .await?;
        Ok(list.messages.into_iter().map(|m| m.id).collect())
    }

    async fn get_message(&self, id: &str) -> Result<MailMessage, MailError> {
        let message: GmailMessage = self
            .get_json(
                &format!("{GMAIL_API}/messages/{id}"),
                &[("format", "full".to_string())],
            )
            .await?;
        Ok(message.into())
    }

    async fn get_attachment(
        &self,
        message_id: &str,
        attachment_id: &str,
    ) -> Result<Vec<u8>, MailError> {
        let attachment: AttachmentResponse = self
            .get_json(
                &format!("{GMAIL_API}/messages/{message_id}/attachments/{attachment_id}"),
                &[],
            )
            .await?;
        decode_base64url(&attachment.data)
    }
}
