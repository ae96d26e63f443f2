//! Loopback listener for the OAuth redirect.
//!
//! The provider redirects the browser to `/callback#access_token=...`.
//! Fragments never reach a server, so the callback page forwards
//! `location.hash` to `/token` and then drops the fragment from the address
//! bar with `history.replaceState`.

use std::sync::{Arc, Mutex};

use axum::extract::{RawQuery, State};
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse};
use axum::routing::get;
use axum::Router;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;
use tower_http::trace::TraceLayer;
use tracing::{debug, info, warn};

use crate::errors::{AuthFailure, ClientError, Result};
use crate::identity::token_from_fragment;

const CALLBACK_PAGE: &str = r#"<!doctype html>
<html>
<head><meta charset="utf-8"><title>Nitro sign-in</title></head>
<body>
<p id="status">Completing sign-in...</p>
<script>
  const fragment = window.location.hash.slice(1);
  history.replaceState(null, "", window.location.pathname);
  fetch("/token?" + fragment)
    .then((r) => r.text())
    .then((t) => { document.getElementById("status").textContent = t; });
</script>
</body>
</html>
"#;

type Outcome = std::result::Result<String, AuthFailure>;

struct CallbackState {
    sender: Mutex<Option<oneshot::Sender<Outcome>>>,
}

pub struct OAuthListener {
    listener: TcpListener,
    redirect_url: String,
}

/// Bind the loopback listener. Port `0` picks a free port.
pub async fn bind(port: u16) -> Result<OAuthListener> {
    let listener = TcpListener::bind(("127.0.0.1", port)).await?;
    let addr = listener.local_addr()?;
    Ok(OAuthListener {
        listener,
        redirect_url: format!("http://{addr}/callback"),
    })
}

impl OAuthListener {
    /// Where the provider should send the browser back to.
    pub fn redirect_url(&self) -> &str {
        &self.redirect_url
    }

    /// Serve until the callback delivers a token (or an error), or `cancel`
    /// fires.
    pub async fn wait_for_token(self, cancel: &CancellationToken) -> Result<String> {
        let Self { listener, redirect_url } = self;
        let (tx, rx) = oneshot::channel();
        let state = Arc::new(CallbackState {
            sender: Mutex::new(Some(tx)),
        });
        let app = Router::new()
            .route("/callback", get(callback))
            .route("/token", get(receive_token))
            .layer(TraceLayer::new_for_http())
            .with_state(state);

        let done = cancel.child_token();
        let shutdown = done.clone();
        info!("Waiting for the sign-in redirect on {redirect_url}");
        tokio::spawn(async move {
            let served = axum::serve(listener, app)
                .with_graceful_shutdown(async move { shutdown.cancelled().await })
                .await;
            match served {
                Ok(()) => debug!("OAuth listener stopped"),
                Err(e) => warn!("OAuth listener stopped with an error: {e}"),
            }
        });

        let outcome = tokio::select! {
            _ = cancel.cancelled() => Err(ClientError::Cancelled),
            received = rx => match received {
                Ok(Ok(token)) => Ok(token),
                Ok(Err(failure)) => Err(failure.into()),
                Err(_) => Err(ClientError::Cancelled),
            },
        };

        done.cancel();
        outcome
    }
}

/// `GET /callback`
async fn callback() -> Html<&'static str> {
    Html(CALLBACK_PAGE)
}

/// `GET /token?<fragment>`
async fn receive_token(
    State(state): State<Arc<CallbackState>>,
    RawQuery(query): RawQuery,
) -> impl IntoResponse {
    let outcome = token_from_fragment(query.as_deref().unwrap_or_default());
    let reply = match &outcome {
        Ok(_) => (StatusCode::OK, "Signed in. You can close this window.".to_string()),
        Err(failure) => (StatusCode::BAD_REQUEST, format!("Sign-in failed: {failure}")),
    };

    let sender = state
        .sender
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
        .take();
    match sender {
        Some(tx) => {
            let _ = tx.send(outcome);
        }
        None => return (StatusCode::GONE, "This sign-in link was already used.".to_string()),
    }
    reply
}
