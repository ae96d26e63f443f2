//! Allocation tracking and the participant's evidence submissions.

use std::path::Path;

use nitro_core::{Allocation, AllocationStatus, FeedbackSubmission, PurchaseProof, ReviewSubmission};
use reqwest::multipart::{Form, Part};
use serde::Serialize;
use serde_json::{json, Value};
use tracing::warn;

use crate::errors::{ClientError, Result};
use crate::http::ApiClient;

/// An invoice file ready to upload.
#[derive(Debug, Clone)]
pub struct ProofUpload {
    pub allocation_id: String,
    /// Set for multi-product allocations; the proof belongs to that product.
    pub product_id: Option<String>,
    pub file_name: String,
    pub mime: &'static str,
    pub bytes: Vec<u8>,
}

impl ProofUpload {
    pub async fn from_path(
        allocation_id: &str,
        product_id: Option<&str>,
        path: &Path,
    ) -> Result<Self> {
        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| ClientError::Config(format!("Not a file: {}", path.display())))?
            .to_string();
        let bytes = tokio::fs::read(path).await?;
        Ok(Self {
            allocation_id: allocation_id.to_string(),
            product_id: product_id.map(str::to_string),
            mime: mime_for(&file_name),
            file_name,
            bytes,
        })
    }

    fn into_form(self) -> Result<Form> {
        let mut form = Form::new().text("allocation_id", self.allocation_id);
        if let Some(product_id) = self.product_id {
            form = form.text("product_id", product_id);
        }
        let part = Part::bytes(self.bytes)
            .file_name(self.file_name)
            .mime_str(self.mime)?;
        Ok(form.part("invoice", part))
    }
}

fn mime_for(file_name: &str) -> &'static str {
    let ext = file_name
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "pdf" => "application/pdf",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "webp" => "image/webp",
        _ => "application/octet-stream",
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ReviewDraft {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub product_id: Option<String>,
    pub review_url: Option<String>,
    pub review_text: Option<String>,
    pub screenshots: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct FeedbackDraft {
    pub rating: u8,
    pub feedback: String,
}

/// `GET /allocations/me/tracking`. Records that do not decode are skipped
/// so one bad entry does not hide the rest.
pub async fn tracking(api: &ApiClient) -> Result<Vec<Allocation>> {
    let records: Vec<Value> = api.get("/allocations/me/tracking", &[]).await?;
    Ok(records
        .into_iter()
        .filter_map(|record| {
            let id = record.get("id").and_then(Value::as_str).unwrap_or("?").to_string();
            match serde_json::from_value::<Allocation>(record) {
                Ok(allocation) => Some(allocation),
                Err(e) => {
                    warn!("Skipping allocation {id}: {e}");
                    None
                }
            }
        })
        .collect())
}

/// `GET /allocations/:id`
pub async fn get_allocation(api: &ApiClient, allocation_id: &str) -> Result<Allocation> {
    api.get(&format!("/allocations/{allocation_id}"), &[]).await
}

/// `PATCH /allocations/:id/status`
pub async fn update_status(
    api: &ApiClient,
    allocation_id: &str,
    status: AllocationStatus,
) -> Result<Allocation> {
    api.patch(
        &format!("/allocations/{allocation_id}/status"),
        &json!({ "status": status }),
    )
    .await
}

/// `POST /allocations/:id/purchase-proof` (multipart, file part `invoice`)
pub async fn upload_purchase_proof(api: &ApiClient, upload: ProofUpload) -> Result<PurchaseProof> {
    let path = format!("/allocations/{}/purchase-proof", upload.allocation_id);
    api.post_multipart(&path, upload.into_form()?).await
}

/// `POST /allocations/:id/review`
pub async fn submit_review(
    api: &ApiClient,
    allocation_id: &str,
    review: &ReviewDraft,
) -> Result<ReviewSubmission> {
    api.post(&format!("/allocations/{allocation_id}/review"), review)
        .await
}

/// `POST /allocations/:id/feedback`
pub async fn submit_feedback(
    api: &ApiClient,
    allocation_id: &str,
    feedback: &FeedbackDraft,
) -> Result<FeedbackSubmission> {
    api.post(&format!("/allocations/{allocation_id}/feedback"), feedback)
        .await
}
