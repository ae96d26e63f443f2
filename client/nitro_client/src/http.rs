//! Shared outbound gateway to the Nitro backend.
//!
//! Every call goes through [`ApiClient::dispatch`]:
//!
//! * the current bearer token (if any) is attached,
//! * a `401` wipes all stored tokens, publishes `SessionState::Expired`
//!   (the shell navigates to `/login`), and fails the call with
//!   [`ClientError::Unauthorized`],
//! * other non-2xx answers become [`ClientError::Api`] with the most
//!   specific message found in the body.
//!
//! Successful bodies are `{ success, data, message }` envelopes.
//!
//! No retries, no deduplication. Timeouts are whatever the underlying
//! [`reqwest::Client`] was built with, plus the explicit helpers at the
//! bottom of this file.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use reqwest::multipart::Form;
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::errors::{extract_message, ClientError, Result};
use crate::session::SessionContext;

/// Body fields checked, in order, for an error reason.
const ERROR_FIELDS: &[&str] = &["message", "msg", "error"];

#[derive(Debug, Deserialize)]
struct Envelope {
    #[serde(default)]
    success: Option<bool>,
    #[serde(default)]
    data: Option<Value>,
    #[serde(default)]
    message: Option<String>,
}

#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
    session: Arc<SessionContext>,
}

impl ApiClient {
    pub fn new(client: Client, base_url: impl Into<String>, session: Arc<SessionContext>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            session,
        }
    }

    pub fn session(&self) -> &SessionContext {
        &self.session
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.client.request(method, format!("{}{}", self.base_url, path))
    }

    // ── Verbs ─────────────────────────────────────────────

    pub async fn get<T: DeserializeOwned>(&self, path: &str, query: &[(&str, String)]) -> Result<T> {
        let builder = self.request(Method::GET, path).query(query);
        decode(self.dispatch(builder, None).await?).await
    }

    /// GET with an explicit token instead of the stored one. Used to verify
    /// a token before it is persisted.
    pub async fn get_with_token<T: DeserializeOwned>(&self, path: &str, token: &str) -> Result<T> {
        let builder = self.request(Method::GET, path);
        decode(self.dispatch(builder, Some(token)).await?).await
    }

    pub async fn post<B: Serialize + ?Sized, T: DeserializeOwned>(&self, path: &str, body: &B) -> Result<T> {
        let builder = self.request(Method::POST, path).json(body);
        decode(self.dispatch(builder, None).await?).await
    }

    pub async fn put<B: Serialize + ?Sized, T: DeserializeOwned>(&self, path: &str, body: &B) -> Result<T> {
        let builder = self.request(Method::PUT, path).json(body);
        decode(self.dispatch(builder, None).await?).await
    }

    pub async fn patch<B: Serialize + ?Sized, T: DeserializeOwned>(&self, path: &str, body: &B) -> Result<T> {
        let builder = self.request(Method::PATCH, path).json(body);
        decode(self.dispatch(builder, None).await?).await
    }

    pub async fn post_multipart<T: DeserializeOwned>(&self, path: &str, form: Form) -> Result<T> {
        let builder = self.request(Method::POST, path).multipart(form);
        decode(self.dispatch(builder, None).await?).await
    }

    /// Raw body download (CSV exports).
    pub async fn get_bytes(&self, path: &str) -> Result<Vec<u8>> {
        let builder = self.request(Method::GET, path);
        let response = self.dispatch(builder, None).await?;
        Ok(response.bytes().await?.to_vec())
    }

    // ── Interceptors ──────────────────────────────────────

    async fn dispatch(&self, mut builder: RequestBuilder, token: Option<&str>) -> Result<Response> {
        let token = match token {
            Some(explicit) => Some(explicit.to_string()),
            None => self.session.token().await?,
        };
        if let Some(token) = token {
            builder = builder.bearer_auth(token);
        }

        let response = builder.send().await?;
        let status = response.status();
        debug!("{} {}", status.as_u16(), response.url().path());

        if status == StatusCode::UNAUTHORIZED {
            warn!("Backend rejected the session token; signing out");
            self.session.expire().await?;
            return Err(ClientError::Unauthorized);
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(api_error(status, &body));
        }
        Ok(response)
    }
}

fn api_error(status: StatusCode, body: &str) -> ClientError {
    let message = serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| extract_message(&v, ERROR_FIELDS))
        .or_else(|| {
            let trimmed = body.trim();
            (!trimmed.is_empty() && trimmed.len() < 200 && !trimmed.starts_with('<'))
                .then(|| trimmed.to_string())
        })
        .unwrap_or_else(|| {
            status
                .canonical_reason()
                .unwrap_or("Request failed")
                .to_string()
        });
    ClientError::Api {
        status: status.as_u16(),
        message,
    }
}

/// Unwrap a `{ success, data, message }` envelope. A missing `data` decodes
/// as JSON `null`, which suits `()` and `Option<T>` targets.
async fn decode<T: DeserializeOwned>(response: Response) -> Result<T> {
    let status = response.status().as_u16();
    let bytes = response.bytes().await?;
    if bytes.is_empty() {
        return Ok(serde_json::from_value(Value::Null)?);
    }
    let envelope: Envelope = serde_json::from_slice(&bytes)?;
    if envelope.success == Some(false) {
        return Err(ClientError::Api {
            status,
            message: envelope
                .message
                .unwrap_or_else(|| "Request failed".to_string()),
        });
    }
    Ok(serde_json::from_value(envelope.data.unwrap_or(Value::Null))?)
}

// ─────────────────────────────────────────────────────────
// Timeouts and cancellation
// ─────────────────────────────────────────────────────────

/// Fail with a descriptive error after `secs`. The underlying request is not
/// cancelled server-side; its result is simply dropped.
pub async fn with_timeout<T, F>(what: &str, secs: u64, fut: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    match tokio::time::timeout(Duration::from_secs(secs), fut).await {
        Ok(result) => result,
        Err(_) => Err(ClientError::Timeout(what.to_string(), secs)),
    }
}

/// Drop `fut` as soon as `cancel` fires.
pub async fn cancellable<T, F>(cancel: &CancellationToken, fut: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    tokio::select! {
        _ = cancel.cancelled() => Err(ClientError::Cancelled),
        result = fut => result,
    }
}
