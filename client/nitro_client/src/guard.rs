//! Route guard: re-verifies the session on every protected navigation and
//! hands the result to [`nitro_core::routing::decide`].

use nitro_core::routing::{classify, decide, GuardState, Route};
use tracing::{debug, warn};

use crate::auth::verify_session;
use crate::errors::Result;
use crate::http::ApiClient;

/// Settle the guard for `path`. Never returns [`GuardState::Checking`].
pub async fn check(api: &ApiClient, path: &str) -> Result<GuardState> {
    let Route::Protected(route) = classify(path) else {
        return Ok(GuardState::Granted);
    };

    if api.session().token().await?.is_none() {
        debug!("No stored token for {path}");
        return Ok(GuardState::DeniedNoSession);
    }

    let user = match verify_session(api, None).await {
        Ok(user) => user,
        Err(e) => {
            warn!("Session verification failed for {path}: {e}");
            api.session().clear().await?;
            return Ok(GuardState::DeniedNoSession);
        }
    };

    let state = decide(&route, &user);
    debug!("Guard for {path}: {state:?}");
    Ok(state)
}
