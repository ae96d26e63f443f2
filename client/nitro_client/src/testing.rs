//! Throwaway axum servers standing in for the backend and identity provider.

use std::sync::Arc;

use axum::Router;
use reqwest::Client;
use tokio::net::TcpListener;

use crate::http::ApiClient;
use crate::session::SessionContext;
use crate::storage::{memory_store, TabStore};

/// Serve `router` on an ephemeral port and return its base URL.
pub async fn spawn_backend(router: Router) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{addr}")
}

pub async fn test_session() -> Arc<SessionContext> {
    Arc::new(SessionContext::new(memory_store().await, TabStore::new()))
}

pub async fn test_api(base_url: &str) -> ApiClient {
    ApiClient::new(Client::new(), base_url, test_session().await)
}
