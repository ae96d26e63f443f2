//! Admin verification queues for purchase proofs and reviews.

use nitro_core::{ApprovalStatus, PurchaseProof, ReviewSubmission};
use serde::Serialize;

use crate::errors::Result;
use crate::http::ApiClient;

#[derive(Debug, Clone, Serialize)]
pub struct Decision {
    pub status: ApprovalStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl Decision {
    pub fn approve() -> Self {
        Self {
            status: ApprovalStatus::Approved,
            reason: None,
        }
    }

    pub fn reject(reason: impl Into<String>) -> Self {
        Self {
            status: ApprovalStatus::Rejected,
            reason: Some(reason.into()),
        }
    }
}

fn status_query(status: ApprovalStatus) -> Vec<(&'static str, String)> {
    vec![("status", status.as_str().to_string())]
}

/// `GET /admin/verification/purchase-proofs?status=`
pub async fn purchase_proofs(api: &ApiClient, status: ApprovalStatus) -> Result<Vec<PurchaseProof>> {
    api.get("/admin/verification/purchase-proofs", &status_query(status))
        .await
}

/// `PATCH /admin/verification/purchase-proofs/:id`
pub async fn decide_purchase_proof(
    api: &ApiClient,
    proof_id: &str,
    decision: &Decision,
) -> Result<PurchaseProof> {
    api.patch(
        &format!("/admin/verification/purchase-proofs/{proof_id}"),
        decision,
    )
    .await
}

/// `GET /admin/verification/reviews?status=`
pub async fn reviews(api: &ApiClient, status: ApprovalStatus) -> Result<Vec<ReviewSubmission>> {
    api.get("/admin/verification/reviews", &status_query(status))
        .await
}

/// `PATCH /admin/verification/reviews/:id`
pub async fn decide_review(
    api: &ApiClient,
    review_id: &str,
    decision: &Decision,
) -> Result<ReviewSubmission> {
    api.patch(&format!("/admin/verification/reviews/{review_id}"), decision)
        .await
}
