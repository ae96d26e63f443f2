//! Identity, profile and payment-detail endpoints.

use nitro_core::{ApprovalStatus, PaymentDetails, ProfileCompletion, Role, User};
use serde::Deserialize;
use serde_json::json;

use super::push_opt;
use crate::errors::Result;
use crate::http::ApiClient;

#[derive(Debug, Deserialize)]
struct MeResponse {
    #[serde(default)]
    user: Option<User>,
}

/// `GET /auth/me`. `None` when the backend knows the token but has no user
/// for it.
pub async fn me(api: &ApiClient, token: Option<&str>) -> Result<Option<User>> {
    let response: Option<MeResponse> = match token {
        Some(token) => api.get_with_token("/auth/me", token).await?,
        None => api.get("/auth/me", &[]).await?,
    };
    Ok(response.and_then(|r| r.user))
}

/// `GET /users/me/profile-completion`
pub async fn profile_completion(api: &ApiClient) -> Result<ProfileCompletion> {
    api.get("/users/me/profile-completion", &[]).await
}

/// `GET /users/me/payment-details`
pub async fn payment_details(api: &ApiClient) -> Result<Option<PaymentDetails>> {
    api.get("/users/me/payment-details", &[]).await
}

/// `PUT /users/me/payment-details`
pub async fn save_payment_details(api: &ApiClient, details: &PaymentDetails) -> Result<PaymentDetails> {
    api.put("/users/me/payment-details", details).await
}

/// `GET /admin/users`
pub async fn list_users(
    api: &ApiClient,
    role: Option<Role>,
    approval: Option<ApprovalStatus>,
) -> Result<Vec<User>> {
    let mut query = Vec::new();
    push_opt(&mut query, "role", role.map(Role::as_str));
    push_opt(&mut query, "approval_status", approval.map(ApprovalStatus::as_str));
    api.get("/admin/users", &query).await
}

/// `PATCH /admin/users/:id/approval`
pub async fn set_approval(api: &ApiClient, user_id: &str, status: ApprovalStatus) -> Result<User> {
    api.patch(
        &format!("/admin/users/{user_id}/approval"),
        &json!({ "approval_status": status }),
    )
    .await
}
