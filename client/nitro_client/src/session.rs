//! Session context: the single source of truth for the bearer token and the
//! verified identity behind it.
//!
//! The token lives in exactly one of two stores. "Remember me" writes to the
//! durable store, otherwise the tab store is used; writing one always clears
//! the other first. On read the durable store wins.
//!
//! Interested parts of the client subscribe to [`SessionState`] changes
//! instead of re-reading storage.

use nitro_core::routing::LOGIN_PATH;
use nitro_core::Session;
use tokio::sync::watch;
use tracing::{debug, info};

use crate::errors::Result;
use crate::storage::{keys, DurableStore, TabStore};

#[derive(Debug, Clone, PartialEq)]
pub enum SessionState {
    Anonymous,
    Authenticated(Session),
    /// The backend rejected the token; the shell should navigate to `redirect`.
    Expired { redirect: String },
}

pub struct SessionContext {
    durable: DurableStore,
    tab: TabStore,
    state: watch::Sender<SessionState>,
}

impl SessionContext {
    pub fn new(durable: DurableStore, tab: TabStore) -> Self {
        let (state, _) = watch::channel(SessionState::Anonymous);
        Self { durable, tab, state }
    }

    pub fn durable(&self) -> &DurableStore {
        &self.durable
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state.subscribe()
    }

    pub fn current(&self) -> SessionState {
        self.state.borrow().clone()
    }

    /// The trusted token, durable store first.
    pub async fn token(&self) -> Result<Option<String>> {
        if let Some(token) = self.durable.get(keys::AUTH_TOKEN).await? {
            return Ok(Some(token));
        }
        Ok(self.tab.get(keys::AUTH_TOKEN))
    }

    pub async fn store_token(&self, token: &str, remember: bool) -> Result<()> {
        if remember {
            self.tab.remove(keys::AUTH_TOKEN);
            self.durable.set(keys::AUTH_TOKEN, token).await?;
        } else {
            self.durable.remove(keys::AUTH_TOKEN).await?;
            self.tab.set(keys::AUTH_TOKEN, token);
        }
        debug!("Stored bearer token (remember={remember})");
        Ok(())
    }

    /// Publish a verified identity.
    pub fn establish(&self, session: Session) {
        info!("Session established for {} ({})", session.user_id, session.role);
        self.state.send_replace(SessionState::Authenticated(session));
    }

    /// Forget every stored token (logout or failed verification).
    pub async fn clear(&self) -> Result<()> {
        self.wipe().await?;
        self.state.send_replace(SessionState::Anonymous);
        Ok(())
    }

    /// Forget every stored token because the backend answered 401.
    pub async fn expire(&self) -> Result<()> {
        self.wipe().await?;
        self.state.send_replace(SessionState::Expired {
            redirect: LOGIN_PATH.to_string(),
        });
        Ok(())
    }

    async fn wipe(&self) -> Result<()> {
        self.tab.remove(keys::AUTH_TOKEN);
        self.durable.remove(keys::AUTH_TOKEN).await
    }
}
