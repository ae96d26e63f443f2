//! Sign-in, sign-up and sign-out flows built on the identity provider and
//! the backend "who am I" endpoint.

use chrono::{DateTime, Duration, Utc};
use nitro_core::validation::{validate_email, validate_signup};
use nitro_core::{ApprovalStatus, Role, Session, User, ValidationError};
use tracing::{info, warn};

use crate::accessors::users;
use crate::errors::{AuthFailure, AuthFailureKind, ClientError, Result};
use crate::http::ApiClient;
use crate::identity::IdentityProvider;
use crate::storage::DurableStore;

/// Resolve the user behind `token` (or the stored token when `None`).
///
/// Callers treat any error as "session invalid".
pub async fn verify_session(api: &ApiClient, token: Option<&str>) -> Result<User> {
    users::me(api, token).await?.ok_or(ClientError::NoBackendUser)
}

/// Accounts an admin has not approved yet may not sign in.
fn check_approval(user: &User) -> std::result::Result<(), AuthFailure> {
    match (user.role, user.approval_status) {
        (Role::Brand | Role::Admin, Some(ApprovalStatus::Pending)) => Err(AuthFailure::new(
            AuthFailureKind::PendingApproval,
            403,
            "Your account is pending admin approval",
        )),
        (_, Some(ApprovalStatus::Rejected)) => Err(AuthFailure::new(
            AuthFailureKind::Rejected,
            403,
            "Your account request was rejected",
        )),
        _ => Ok(()),
    }
}

/// Verify `token` against the backend, then persist it and publish the
/// session. Nothing is stored when verification fails.
pub async fn adopt_token(api: &ApiClient, token: &str, remember: bool) -> Result<User> {
    let user = match verify_session(api, Some(token)).await {
        Ok(user) => user,
        Err(e) => {
            api.session().clear().await?;
            return Err(e);
        }
    };
    if let Err(refused) = check_approval(&user) {
        api.session().clear().await?;
        return Err(refused.into());
    }

    api.session().store_token(token, remember).await?;
    api.session().establish(Session::new(token, &user));
    Ok(user)
}

pub async fn login(
    identity: &IdentityProvider,
    api: &ApiClient,
    email: &str,
    password: &str,
    remember: bool,
) -> Result<User> {
    validate_email(email)?;
    if password.is_empty() {
        return Err(ValidationError::MissingField("Password").into());
    }

    let grant = identity.sign_in(email, password).await?;
    let user = adopt_token(api, &grant.access_token, remember).await?;
    info!("Signed in as {} ({})", user.id, user.role);
    Ok(user)
}

/// Create an account. A provider rate limit starts a persisted cooldown
/// (`retry_after` from the provider, else `fallback_cooldown_secs`) during
/// which further attempts fail without a request.
/// Longest cooldown honoured from a provider retry hint.
pub const MAX_SIGNUP_COOLDOWN_SECS: u64 = 24 * 60 * 60;

pub async fn signup(
    identity: &IdentityProvider,
    store: &DurableStore,
    fallback_cooldown_secs: u64,
    email: &str,
    password: &str,
    confirm: &str,
    now: DateTime<Utc>,
) -> Result<()> {
    validate_signup(email, password, confirm)?;

    if let Some(until) = store.signup_cooldown_until().await? {
        if until > now {
            let left = ((until - now).num_milliseconds() + 999).max(1000) as u64 / 1000;
            return Err(AuthFailure::new(
                AuthFailureKind::CoolingDown,
                429,
                format!("Please wait {left}s before trying again"),
            )
            .with_retry_after(Some(left))
            .into());
        }
        store.clear_signup_cooldown().await?;
    }

    match identity.sign_up(email, password, None).await {
        Ok(()) => Ok(()),
        Err(failure) if failure.kind == AuthFailureKind::RateLimited => {
            let wait = failure
                .retry_after
                .unwrap_or(fallback_cooldown_secs)
                .min(MAX_SIGNUP_COOLDOWN_SECS);
            let until = i64::try_from(wait)
                .ok()
                .and_then(|secs| now.checked_add_signed(Duration::seconds(secs)))
                .unwrap_or(now);
            store.set_signup_cooldown_until(until).await?;
            warn!("Signup rate-limited; cooling down for {wait}s");
            Err(failure.with_retry_after(Some(wait)).into())
        }
        Err(failure) => Err(failure.into()),
    }
}

pub async fn resend_confirmation(identity: &IdentityProvider, email: &str) -> Result<()> {
    validate_email(email)?;
    identity.resend_confirmation(email).await?;
    info!("Confirmation email re-sent to {email}");
    Ok(())
}

/// Tell the provider (best effort) and forget the local session.
pub async fn logout(identity: &IdentityProvider, api: &ApiClient) -> Result<()> {
    if let Some(token) = api.session().token().await? {
        if let Err(e) = identity.sign_out(&token).await {
            warn!("Provider logout failed, clearing local session anyway: {e}");
        }
    }
    api.session().clear().await
}
