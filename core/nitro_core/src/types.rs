//! # Types
//!
//! View models for the records the Nitro backend returns. The server is
//! authoritative for every one of them; the client only reads them, derives
//! display state from them, and sends mutations back.
//!
//! ## Allocation lifecycle as seen by the client
//!
//! ```text
//! RESERVED ──(participant confirms purchase)──► PURCHASED ──► COMPLETED
//!    │                                              │
//!    └── countdown runs until the required flow ────┘
//!        (invoice, review, feedback for MARKETPLACE) is done
//! ```
//!
//! Purchase proofs and reviews carry their own PENDING / APPROVED / REJECTED
//! status. A rejected sub-record reopens that step only.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ── Identity ─────────────────────────────────────────────────────────

/// Backend role of an authenticated user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Role {
    Admin,
    SuperAdmin,
    Participant,
    Brand,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Admin => "ADMIN",
            Self::SuperAdmin => "SUPER_ADMIN",
            Self::Participant => "PARTICIPANT",
            Self::Brand => "BRAND",
        }
    }

    /// First path segment of every page owned by this role.
    pub fn path_segment(self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::SuperAdmin => "super-admin",
            Self::Participant => "participant",
            Self::Brand => "brand",
        }
    }

    /// Canonical landing page for a verified user.
    ///
    /// Brand pages are not owner-scoped, so the brand dashboard carries no id.
    pub fn dashboard_path(self, user_id: &str) -> String {
        match self {
            Self::Brand => "/brand/dashboard".to_string(),
            _ => format!("/{}/{}/dashboard", self.path_segment(), user_id),
        }
    }
}

impl TryFrom<String> for Role {
    type Error = String;

    fn try_from(raw: String) -> Result<Self, Self::Error> {
        let normalized = raw.trim().to_ascii_uppercase().replace('-', "_");
        match normalized.as_str() {
            "ADMIN" => Ok(Self::Admin),
            "SUPER_ADMIN" | "SUPERADMIN" => Ok(Self::SuperAdmin),
            "PARTICIPANT" => Ok(Self::Participant),
            "BRAND" => Ok(Self::Brand),
            _ => Err(format!("unknown role: {raw}")),
        }
    }
}

impl From<Role> for String {
    fn from(role: Role) -> Self {
        role.as_str().to_string()
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Shared three-way review state used by account approval, access requests,
/// purchase proofs and review submissions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ApprovalStatus {
    Pending,
    Approved,
    Rejected,
}

impl ApprovalStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Approved => "APPROVED",
            Self::Rejected => "REJECTED",
        }
    }
}

/// The user record returned by the backend "who am I" endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub role: Role,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub approval_status: Option<ApprovalStatus>,
}

/// An authenticated session: the bearer token plus the verified identity
/// behind it.
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    pub token: String,
    pub user_id: String,
    pub role: Role,
    pub approval_status: Option<ApprovalStatus>,
}

impl Session {
    pub fn new(token: impl Into<String>, user: &User) -> Self {
        Self {
            token: token.into(),
            user_id: user.id.clone(),
            role: user.role,
            approval_status: user.approval_status,
        }
    }
}

// ── Projects ─────────────────────────────────────────────────────────

/// Campaign mode. Only MARKETPLACE campaigns ask for participant feedback.
///
/// Parsed case-insensitively; unrecognised modes are kept verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ProjectMode {
    Marketplace,
    D2c,
    Other(String),
}

impl ProjectMode {
    pub fn requires_feedback(&self) -> bool {
        matches!(self, Self::Marketplace)
    }
}

impl From<String> for ProjectMode {
    fn from(raw: String) -> Self {
        match raw.trim().to_ascii_uppercase().as_str() {
            "MARKETPLACE" => Self::Marketplace,
            "D2C" => Self::D2c,
            _ => Self::Other(raw),
        }
    }
}

impl From<&str> for ProjectMode {
    fn from(raw: &str) -> Self {
        Self::from(raw.to_string())
    }
}

impl From<ProjectMode> for String {
    fn from(mode: ProjectMode) -> Self {
        match mode {
            ProjectMode::Marketplace => "MARKETPLACE".to_string(),
            ProjectMode::D2c => "D2C".to_string(),
            ProjectMode::Other(raw) => raw,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProjectStatus {
    Draft,
    Published,
    Archived,
}

impl ProjectStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Published => "published",
            Self::Archived => "archived",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub price: Option<f64>,
}

/// A brand campaign.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Project {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub brand_id: Option<String>,
    pub mode: ProjectMode,
    pub status: ProjectStatus,
    #[serde(default)]
    pub reward: Option<f64>,
    #[serde(default)]
    pub units: Option<u32>,
    #[serde(default)]
    pub start_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub end_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub products: Vec<Product>,
}

/// Minimal project reference embedded in allocation records.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectRef {
    pub id: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub mode: Option<ProjectMode>,
    #[serde(default)]
    pub reward: Option<f64>,
}

/// Per-project gate a participant must pass before seeing its products.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccessRequest {
    pub id: String,
    pub project_id: String,
    #[serde(default)]
    pub participant_id: Option<String>,
    pub status: ApprovalStatus,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

// ── Applications ─────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ApplicationStatus {
    Pending,
    Approved,
    Rejected,
    Purchased,
    Completed,
}

impl ApplicationStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Approved => "APPROVED",
            Self::Rejected => "REJECTED",
            Self::Purchased => "PURCHASED",
            Self::Completed => "COMPLETED",
        }
    }
}

/// A participant's request for one product. One per (participant, product).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Application {
    pub id: String,
    pub project_id: String,
    pub product_id: String,
    #[serde(default)]
    pub participant_id: Option<String>,
    pub status: ApplicationStatus,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

// ── Allocations ──────────────────────────────────────────────────────

/// Lifecycle of an allocation. `Cancelled`, `Rejected` and `Expired` are
/// terminal states the participant cannot act on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AllocationStatus {
    Reserved,
    Purchased,
    Completed,
    Cancelled,
    Rejected,
    Expired,
}

impl AllocationStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Reserved => "RESERVED",
            Self::Purchased => "PURCHASED",
            Self::Completed => "COMPLETED",
            Self::Cancelled => "CANCELLED",
            Self::Rejected => "REJECTED",
            Self::Expired => "EXPIRED",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Reserved => "Reserved",
            Self::Purchased => "Purchased",
            Self::Completed => "Completed",
            Self::Cancelled => "Cancelled",
            Self::Rejected => "Rejected",
            Self::Expired => "Expired",
        }
    }

    pub fn is_closed(self) -> bool {
        matches!(self, Self::Cancelled | Self::Rejected | Self::Expired)
    }
}

/// Invoice evidence for a product or a whole allocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PurchaseProof {
    pub id: String,
    pub status: ApprovalStatus,
    #[serde(default)]
    pub file_url: Option<String>,
    #[serde(default)]
    pub allocation_id: Option<String>,
    #[serde(default)]
    pub product_id: Option<String>,
    #[serde(default)]
    pub rejection_reason: Option<String>,
    #[serde(default)]
    pub submitted_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub reviewed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewSubmission {
    pub id: String,
    pub status: ApprovalStatus,
    #[serde(default)]
    pub allocation_id: Option<String>,
    #[serde(default)]
    pub product_id: Option<String>,
    #[serde(default)]
    pub review_url: Option<String>,
    #[serde(default)]
    pub review_text: Option<String>,
    #[serde(default)]
    pub screenshots: Vec<String>,
    #[serde(default)]
    pub rejection_reason: Option<String>,
    #[serde(default)]
    pub submitted_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedbackSubmission {
    pub id: String,
    pub rating: u8,
    #[serde(default)]
    pub feedback: Option<String>,
    #[serde(default)]
    pub submitted_at: Option<DateTime<Utc>>,
}

/// One approved product inside a multi-product allocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectedProduct {
    pub product_id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub price: Option<f64>,
    #[serde(default)]
    pub purchase_proof: Option<PurchaseProof>,
    #[serde(default)]
    pub review_submission: Option<ReviewSubmission>,
}

/// A participant's task covering one or more approved products.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Allocation {
    pub id: String,
    pub status: AllocationStatus,
    #[serde(default)]
    pub project_id: Option<String>,
    #[serde(default)]
    pub project: Option<ProjectRef>,
    #[serde(default)]
    pub reserved_until: Option<DateTime<Utc>>,
    #[serde(default)]
    pub selected_products: Vec<SelectedProduct>,
    #[serde(default)]
    pub purchase_proof: Option<PurchaseProof>,
    #[serde(default)]
    pub review_submission: Option<ReviewSubmission>,
    #[serde(default)]
    pub feedback_submission: Option<FeedbackSubmission>,
    #[serde(default)]
    pub payout: Option<Payout>,
}

impl Allocation {
    /// Mode of the owning project when the backend embedded it.
    pub fn project_mode(&self) -> Option<&ProjectMode> {
        self.project.as_ref().and_then(|p| p.mode.as_ref())
    }

    pub fn project_title(&self) -> Option<&str> {
        self.project.as_ref().and_then(|p| p.title.as_deref())
    }
}

// ── Payouts ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PayoutStatus {
    Eligible,
    InBatch,
    Exported,
    Paid,
}

impl PayoutStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Eligible => "ELIGIBLE",
            Self::InBatch => "IN_BATCH",
            Self::Exported => "EXPORTED",
            Self::Paid => "PAID",
        }
    }
}

/// Batch state. A batch reported as PENDING is displayed as IN_BATCH.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BatchStatus {
    #[serde(alias = "PENDING")]
    InBatch,
    Exported,
    Paid,
}

impl BatchStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::InBatch => "IN_BATCH",
            Self::Exported => "EXPORTED",
            Self::Paid => "PAID",
        }
    }
}

/// Snapshot of the bank account a payout was issued against.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BankDetails {
    #[serde(default)]
    pub account_holder_name: Option<String>,
    pub bank_account_number: String,
    pub ifsc: String,
    #[serde(default)]
    pub bank_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Payout {
    pub id: String,
    pub amount: f64,
    pub status: PayoutStatus,
    #[serde(default)]
    pub allocation_id: Option<String>,
    #[serde(default)]
    pub participant_id: Option<String>,
    #[serde(default)]
    pub batch_id: Option<String>,
    #[serde(default)]
    pub bank_details: Option<BankDetails>,
    #[serde(default)]
    pub paid_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PayoutBatch {
    pub id: String,
    pub status: BatchStatus,
    #[serde(default)]
    pub payout_count: u32,
    #[serde(default)]
    pub total_amount: f64,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

// ── Participant profile ──────────────────────────────────────────────

/// Shipping address and bank account a participant must provide before
/// applying for products.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentDetails {
    pub address_line1: String,
    #[serde(default)]
    pub address_line2: Option<String>,
    pub city: String,
    pub state: String,
    pub pincode: String,
    pub bank_account_number: String,
    pub ifsc: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfileCompletion {
    pub percentage: u8,
    #[serde(default)]
    pub missing_fields: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub read: bool,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn project_mode_is_case_insensitive() {
        assert_eq!(ProjectMode::from("marketplace"), ProjectMode::Marketplace);
        assert_eq!(ProjectMode::from(" Marketplace "), ProjectMode::Marketplace);
        assert_eq!(ProjectMode::from("d2c"), ProjectMode::D2c);
        assert_eq!(
            ProjectMode::from("hybrid"),
            ProjectMode::Other("hybrid".to_string())
        );
    }

    #[test]
    fn role_parses_backend_spellings() {
        let role: Role = serde_json::from_str(r#""super_admin""#).unwrap();
        assert_eq!(role, Role::SuperAdmin);
        let role: Role = serde_json::from_str(r#""SUPER-ADMIN""#).unwrap();
        assert_eq!(role, Role::SuperAdmin);
        assert!(serde_json::from_str::<Role>(r#""guest""#).is_err());
    }

    #[test]
    fn dashboard_paths() {
        assert_eq!(Role::Participant.dashboard_path("u1"), "/participant/u1/dashboard");
        assert_eq!(Role::SuperAdmin.dashboard_path("u2"), "/super-admin/u2/dashboard");
        assert_eq!(Role::Brand.dashboard_path("b1"), "/brand/dashboard");
    }

    #[test]
    fn pending_batch_is_displayed_in_batch() {
        let batch: PayoutBatch =
            serde_json::from_str(r#"{"id":"b1","status":"PENDING","payout_count":3}"#).unwrap();
        assert_eq!(batch.status, BatchStatus::InBatch);
        assert_eq!(batch.status.as_str(), "IN_BATCH");
    }

    #[test]
    fn allocation_deserializes_with_sparse_fields() {
        let raw = r#"{
            "id": "a1",
            "status": "RESERVED",
            "reserved_until": "2024-05-01T12:00:00Z",
            "project": { "id": "p1", "mode": "marketplace" },
            "selected_products": [
                { "product_id": "x", "purchase_proof": { "id": "pp", "status": "PENDING" } }
            ]
        }"#;
        let allocation: Allocation = serde_json::from_str(raw).unwrap();
        assert_eq!(allocation.status, AllocationStatus::Reserved);
        assert_eq!(allocation.project_mode(), Some(&ProjectMode::Marketplace));
        assert_eq!(allocation.selected_products.len(), 1);
        assert!(allocation.review_submission.is_none());
    }

    #[test]
    fn payment_details_round_trip_preserves_fields() {
        let details = PaymentDetails {
            address_line1: "12, MG Road, Block C".to_string(),
            address_line2: Some("Near Metro".to_string()),
            city: "Bengaluru".to_string(),
            state: "Karnataka".to_string(),
            pincode: "560001".to_string(),
            bank_account_number: "000123456789012".to_string(),
            ifsc: "HDFC0001234".to_string(),
        };
        let json = serde_json::to_string(&details).unwrap();
        let back: PaymentDetails = serde_json::from_str(&json).unwrap();
        assert_eq!(back, details);
    }
}
