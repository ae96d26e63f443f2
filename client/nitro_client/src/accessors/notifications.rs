//! Notifications are polled once when a dashboard loads.

use nitro_core::Notification;
use serde_json::json;

use crate::errors::Result;
use crate::http::ApiClient;

/// `GET /notifications`
pub async fn list(api: &ApiClient) -> Result<Vec<Notification>> {
    api.get("/notifications", &[]).await
}

/// `PATCH /notifications/:id/read`
pub async fn mark_read(api: &ApiClient, notification_id: &str) -> Result<()> {
    api.patch(&format!("/notifications/{notification_id}/read"), &json!({}))
        .await
}
