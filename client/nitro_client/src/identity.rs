//! Identity-provider adapter.
//!
//! Talks to a GoTrue-style auth API: password grant, signup, resend
//! confirmation, logout, and the implicit OAuth flow (token returned in the
//! redirect URL fragment). Every failure, network or HTTP, comes back as an
//! [`AuthFailure`] carrying the status and any retry hint. Nothing is
//! retried automatically.

use chrono::{DateTime, Utc};
use reqwest::header::{HeaderMap, RETRY_AFTER};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, warn};
use url::Url;

use crate::errors::{extract_message, AuthFailure, AuthFailureKind};

/// Provider error fields, most specific first.
const PROVIDER_ERROR_FIELDS: &[&str] = &["error_description", "msg", "message", "error"];

type AuthResult<T> = std::result::Result<T, AuthFailure>;

#[derive(Debug, Clone, Deserialize)]
pub struct TokenGrant {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub expires_in: Option<u64>,
}

#[derive(Clone)]
pub struct IdentityProvider {
    client: Client,
    auth_url: String,
    api_key: String,
}

impl IdentityProvider {
    pub fn new(client: Client, auth_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            client,
            auth_url: auth_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
        }
    }

    fn post(&self, path: &str) -> RequestBuilder {
        self.client
            .post(format!("{}{}", self.auth_url, path))
            .header("apikey", &self.api_key)
    }

    /// Exchange email + password for an access token.
    pub async fn sign_in(&self, email: &str, password: &str) -> AuthResult<TokenGrant> {
        let request = self
            .post("/token")
            .query(&[("grant_type", "password")])
            .json(&json!({ "email": email, "password": password }));
        let response = send(request).await?;
        response.json().await.map_err(|e| {
            AuthFailure::new(
                AuthFailureKind::Provider,
                200,
                format!("Unreadable token response: {e}"),
            )
        })
    }

    pub async fn sign_up(&self, email: &str, password: &str, redirect_to: Option<&str>) -> AuthResult<()> {
        let mut request = self
            .post("/signup")
            .json(&json!({ "email": email, "password": password }));
        if let Some(redirect) = redirect_to {
            request = request.query(&[("redirect_to", redirect)]);
        }
        send(request).await.map(|_| ())
    }

    pub async fn resend_confirmation(&self, email: &str) -> AuthResult<()> {
        let request = self
            .post("/resend")
            .json(&json!({ "type": "signup", "email": email }));
        send(request).await.map(|_| ())
    }

    pub async fn sign_out(&self, token: &str) -> AuthResult<()> {
        send(self.post("/logout").bearer_auth(token)).await.map(|_| ())
    }

    /// URL the user opens to start an OAuth sign-in with `provider`.
    pub fn authorize_url(&self, provider: &str, redirect_to: &str) -> AuthResult<Url> {
        let mut url = Url::parse(&format!("{}/authorize", self.auth_url)).map_err(|e| {
            AuthFailure::new(AuthFailureKind::Provider, 0, format!("Invalid auth URL: {e}"))
        })?;
        url.query_pairs_mut()
            .append_pair("provider", provider)
            .append_pair("redirect_to", redirect_to);
        Ok(url)
    }
}

async fn send(request: RequestBuilder) -> AuthResult<Response> {
    let response = request.send().await.map_err(|e| {
        warn!("Identity provider unreachable: {e}");
        AuthFailure::new(AuthFailureKind::Network, 0, format!("Could not reach the sign-in service: {e}"))
    })?;
    if response.status().is_success() {
        return Ok(response);
    }
    Err(failure_from(response).await)
}

async fn failure_from(response: Response) -> AuthFailure {
    let status = response.status();
    let retry_after = retry_after(response.headers(), Utc::now());
    let body: Value = response.json().await.unwrap_or(Value::Null);
    let failure = classify(status, &body, retry_after);
    debug!("Identity provider refused ({}): {:?}", status.as_u16(), failure.kind);
    failure
}

fn classify(status: StatusCode, body: &Value, retry_after: Option<u64>) -> AuthFailure {
    let message = extract_message(body, PROVIDER_ERROR_FIELDS).unwrap_or_else(|| {
        status
            .canonical_reason()
            .unwrap_or("Sign-in failed")
            .to_string()
    });
    let codes: Vec<String> = ["error_code", "error"]
        .iter()
        .filter_map(|k| body.get(*k).and_then(Value::as_str))
        .map(str::to_ascii_lowercase)
        .collect();
    let has_code = |code: &str| codes.iter().any(|c| c == code);
    let lowered = message.to_ascii_lowercase();

    let kind = if status == StatusCode::TOO_MANY_REQUESTS || retry_after.is_some() {
        AuthFailureKind::RateLimited
    } else if has_code("email_not_confirmed") || lowered.contains("email not confirmed") {
        AuthFailureKind::EmailNotConfirmed
    } else if has_code("invalid_credentials")
        || has_code("invalid_grant")
        || lowered.contains("invalid login credentials")
    {
        AuthFailureKind::InvalidCredentials
    } else {
        AuthFailureKind::Provider
    };

    AuthFailure::new(kind, status.as_u16(), message).with_retry_after(retry_after)
}

/// `Retry-After` as delta-seconds or an HTTP date.
fn retry_after(headers: &HeaderMap, now: DateTime<Utc>) -> Option<u64> {
    let raw = headers.get(RETRY_AFTER)?.to_str().ok()?.trim();
    if let Ok(secs) = raw.parse::<u64>() {
        return Some(secs);
    }
    let at = DateTime::parse_from_rfc2822(raw).ok()?;
    Some((at.with_timezone(&Utc) - now).num_seconds().max(0) as u64)
}

// ─────────────────────────────────────────────────────────
// OAuth redirect parsing
// ─────────────────────────────────────────────────────────

/// Pull the access token out of a redirect fragment
/// (`access_token=...&token_type=bearer` or `error_description=...`).
pub fn token_from_fragment(fragment: &str) -> AuthResult<String> {
    let fragment = fragment.trim_start_matches('#');
    let mut token = None;
    let mut error = None;
    for (key, value) in url::form_urlencoded::parse(fragment.as_bytes()) {
        match key.as_ref() {
            "access_token" if !value.is_empty() => token = Some(value.into_owned()),
            "error_description" => error = Some(value.into_owned()),
            "error" if error.is_none() => error = Some(value.into_owned()),
            _ => {}
        }
    }
    match (token, error) {
        (Some(token), _) => Ok(token),
        (None, Some(reason)) => Err(AuthFailure::new(AuthFailureKind::Provider, 400, reason)),
        (None, None) => Err(AuthFailure::new(
            AuthFailureKind::Provider,
            400,
            "The sign-in redirect did not include an access token",
        )),
    }
}

/// Same as [`token_from_fragment`] for a full pasted redirect URL.
pub fn token_from_redirect(redirect: &str) -> AuthResult<String> {
    let url = Url::parse(redirect).map_err(|e| {
        AuthFailure::new(AuthFailureKind::Provider, 400, format!("Invalid redirect URL: {e}"))
    })?;
    token_from_fragment(url.fragment().unwrap_or_default())
}

/// The redirect URL without its fragment, safe to keep in history.
pub fn strip_fragment(redirect: &str) -> String {
    match Url::parse(redirect) {
        Ok(mut url) => {
            url.set_fragment(None);
            url.to_string()
        }
        Err(_) => redirect.split('#').next().unwrap_or_default().to_string(),
    }
}
