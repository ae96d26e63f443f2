//! Participant payouts and admin payout batches.

use nitro_core::{Payout, PayoutBatch, PayoutStatus};
use serde_json::json;

use super::push_opt;
use crate::errors::Result;
use crate::http::ApiClient;

/// `GET /payouts/me`
pub async fn my_payouts(api: &ApiClient) -> Result<Vec<Payout>> {
    api.get("/payouts/me", &[]).await
}

/// `GET /admin/payouts`
pub async fn list_payouts(api: &ApiClient, status: Option<PayoutStatus>) -> Result<Vec<Payout>> {
    let mut query = Vec::new();
    push_opt(&mut query, "status", status.map(PayoutStatus::as_str));
    api.get("/admin/payouts", &query).await
}

/// `POST /admin/payout-batches`
pub async fn create_batch(api: &ApiClient, payout_ids: &[String]) -> Result<PayoutBatch> {
    api.post("/admin/payout-batches", &json!({ "payout_ids": payout_ids }))
        .await
}

/// `GET /admin/payout-batches`
pub async fn list_batches(api: &ApiClient) -> Result<Vec<PayoutBatch>> {
    api.get("/admin/payout-batches", &[]).await
}

/// `PATCH /admin/payouts/:id/mark-paid`
pub async fn mark_paid(api: &ApiClient, payout_id: &str) -> Result<Payout> {
    api.patch(&format!("/admin/payouts/{payout_id}/mark-paid"), &json!({}))
        .await
}

/// `GET /admin/payout-batches/:id/export` (CSV body)
pub async fn export_batch(api: &ApiClient, batch_id: &str) -> Result<Vec<u8>> {
    api.get_bytes(&format!("/admin/payout-batches/{batch_id}/export"))
        .await
}
