//! # Allocation status model
//!
//! A participant's allocation is described by several independently updated
//! backend records (purchase proofs, review, feedback, payout) plus one piece
//! of client-side state: the participant's own "I purchased this" flag. This
//! module folds all of them into a single [`AllocationView`]:
//!
//! - exactly one displayed [`AllocationStatus`],
//! - the next step the participant should be prompted for ([`NextStep`]),
//! - the reservation [`Countdown`], frozen once the required flow is done.
//!
//! Everything here is pure. Persisting the override map and calling the
//! backend is the client's job.
//!
//! ## Next step precedence (first match wins)
//!
//! ```text
//! purchase not confirmed ─► ConfirmPurchase
//! no purchase proof      ─► UploadInvoice
//! no valid review        ─► SubmitReview
//! MARKETPLACE, no feedback ─► SubmitFeedback
//! otherwise              ─► CheckPayout
//! ```

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{
    Allocation, AllocationStatus, ApplicationStatus, ApprovalStatus, ProjectMode, SelectedProduct,
};

// ── Local overrides ──────────────────────────────────────────────────

/// `allocation id → purchased?` as declared by the participant.
///
/// `true` marks a purchase the server has not confirmed yet. `false` only
/// records that the participant dismissed the purchase prompt; it never
/// affects status or next step.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PurchaseOverrides(BTreeMap<String, bool>);

impl PurchaseOverrides {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, allocation_id: &str) -> Option<bool> {
        self.0.get(allocation_id).copied()
    }

    pub fn is_confirmed(&self, allocation_id: &str) -> bool {
        self.get(allocation_id) == Some(true)
    }

    /// Record a purchase confirmation. Idempotent.
    pub fn confirm(&mut self, allocation_id: impl Into<String>) {
        self.0.insert(allocation_id.into(), true);
    }

    /// Record a dismissed prompt. Never downgrades an existing confirmation.
    pub fn dismiss(&mut self, allocation_id: impl Into<String>) {
        self.0.entry(allocation_id.into()).or_insert(false);
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

// ── Flow progress ────────────────────────────────────────────────────

/// Which parts of the required flow the backend records show as done.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlowProgress {
    pub has_purchase_proof: bool,
    pub has_valid_review: bool,
    pub has_feedback: bool,
    pub requires_feedback: bool,
    pub required_flow_completed: bool,
}

impl FlowProgress {
    pub fn of(allocation: &Allocation, mode: Option<&ProjectMode>) -> Self {
        let has_purchase_proof = allocation.purchase_proof.is_some()
            || allocation
                .selected_products
                .iter()
                .any(|p| is_live(p.purchase_proof.as_ref().map(|proof| proof.status)));
        let has_valid_review = is_live(allocation.review_submission.as_ref().map(|r| r.status));
        let has_feedback = allocation.feedback_submission.is_some();
        let requires_feedback = mode.is_some_and(ProjectMode::requires_feedback);

        Self {
            has_purchase_proof,
            has_valid_review,
            has_feedback,
            requires_feedback,
            required_flow_completed: has_purchase_proof
                && has_valid_review
                && (has_feedback || !requires_feedback),
        }
    }
}

/// Present and not rejected.
fn is_live(status: Option<ApprovalStatus>) -> bool {
    matches!(status, Some(s) if s != ApprovalStatus::Rejected)
}

// ── Next step ────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NextStep {
    ConfirmPurchase,
    UploadInvoice,
    SubmitReview,
    SubmitFeedback,
    CheckPayout,
    /// Cancelled, rejected or expired by the backend.
    Closed,
}

impl NextStep {
    pub fn prompt(self) -> &'static str {
        match self {
            Self::ConfirmPurchase => "Confirm your purchase",
            Self::UploadInvoice => "Upload your invoice",
            Self::SubmitReview => "Submit your review",
            Self::SubmitFeedback => "Submit your feedback",
            Self::CheckPayout => "All steps complete, check your payout",
            Self::Closed => "Nothing left to do",
        }
    }
}

// ── Countdown ────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Countdown {
    /// Reservation still open.
    Running(Duration),
    /// Deadline passed before the flow was completed.
    Lapsed,
    /// Flow completed or allocation closed; pinned at zero.
    Frozen,
    /// The backend sent no deadline.
    Unbounded,
}

impl Countdown {
    pub fn remaining(&self) -> Option<Duration> {
        match self {
            Self::Running(left) => Some(*left),
            Self::Lapsed | Self::Frozen => Some(Duration::zero()),
            Self::Unbounded => None,
        }
    }
}

impl fmt::Display for Countdown {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Some(left) = self.remaining() else {
            return f.write_str("--:--:--");
        };
        let secs = left.num_seconds().max(0);
        let days = secs / 86_400;
        let (h, m, s) = ((secs % 86_400) / 3600, (secs % 3600) / 60, secs % 60);
        if days > 0 {
            write!(f, "{days}d {h:02}:{m:02}:{s:02}")
        } else {
            write!(f, "{h:02}:{m:02}:{s:02}")
        }
    }
}

// ── Per-product progress ─────────────────────────────────────────────

/// Sub-record state of one product in a multi-product allocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductProgress {
    pub product_id: String,
    pub name: Option<String>,
    pub proof: Option<ApprovalStatus>,
    pub review: Option<ApprovalStatus>,
}

impl ProductProgress {
    fn of(product: &SelectedProduct) -> Self {
        Self {
            product_id: product.product_id.clone(),
            name: product.name.clone(),
            proof: product.purchase_proof.as_ref().map(|p| p.status),
            review: product.review_submission.as_ref().map(|r| r.status),
        }
    }

    /// Invoice can be (re-)uploaded.
    pub fn invoice_open(&self) -> bool {
        !is_live(self.proof)
    }

    /// Review can be (re-)submitted.
    pub fn review_open(&self) -> bool {
        !is_live(self.review)
    }
}

// ── Resolution ───────────────────────────────────────────────────────

/// Status shown to the participant. A local confirmation only ever lifts
/// RESERVED to PURCHASED.
pub fn displayed_status(allocation: &Allocation, overrides: &PurchaseOverrides) -> AllocationStatus {
    match allocation.status {
        AllocationStatus::Reserved if overrides.is_confirmed(&allocation.id) => {
            AllocationStatus::Purchased
        }
        status => status,
    }
}

pub fn purchase_confirmed(
    allocation: &Allocation,
    progress: &FlowProgress,
    overrides: &PurchaseOverrides,
) -> bool {
    overrides.is_confirmed(&allocation.id)
        || matches!(
            allocation.status,
            AllocationStatus::Purchased | AllocationStatus::Completed
        )
        || progress.has_purchase_proof
}

pub fn next_step(
    allocation: &Allocation,
    progress: &FlowProgress,
    overrides: &PurchaseOverrides,
) -> NextStep {
    if allocation.status.is_closed() {
        NextStep::Closed
    } else if !purchase_confirmed(allocation, progress, overrides) {
        NextStep::ConfirmPurchase
    } else if !progress.has_purchase_proof {
        NextStep::UploadInvoice
    } else if !progress.has_valid_review {
        NextStep::SubmitReview
    } else if progress.requires_feedback && !progress.has_feedback {
        NextStep::SubmitFeedback
    } else {
        NextStep::CheckPayout
    }
}

pub fn countdown(allocation: &Allocation, progress: &FlowProgress, now: DateTime<Utc>) -> Countdown {
    if progress.required_flow_completed
        || allocation.status == AllocationStatus::Completed
        || allocation.status.is_closed()
    {
        return Countdown::Frozen;
    }
    match allocation.reserved_until {
        None => Countdown::Unbounded,
        Some(deadline) => {
            let left = deadline - now;
            if left > Duration::zero() {
                Countdown::Running(left)
            } else {
                Countdown::Lapsed
            }
        }
    }
}

/// Everything the allocation screens render for one allocation.
#[derive(Debug, Clone, PartialEq)]
pub struct AllocationView {
    pub allocation_id: String,
    pub server_status: AllocationStatus,
    pub displayed_status: AllocationStatus,
    pub progress: FlowProgress,
    pub next_step: NextStep,
    pub countdown: Countdown,
    /// Whether to pop the "did you purchase?" prompt unasked.
    pub auto_prompt_purchase: bool,
    pub products: Vec<ProductProgress>,
}

/// Resolve one allocation. `fallback_mode` is used when the allocation record
/// does not embed its project's mode.
pub fn resolve(
    allocation: &Allocation,
    fallback_mode: Option<&ProjectMode>,
    overrides: &PurchaseOverrides,
    now: DateTime<Utc>,
) -> AllocationView {
    let mode = allocation.project_mode().or(fallback_mode);
    let progress = FlowProgress::of(allocation, mode);
    let next_step = next_step(allocation, &progress, overrides);

    AllocationView {
        allocation_id: allocation.id.clone(),
        server_status: allocation.status,
        displayed_status: displayed_status(allocation, overrides),
        progress,
        next_step,
        countdown: countdown(allocation, &progress, now),
        auto_prompt_purchase: next_step == NextStep::ConfirmPurchase
            && overrides.get(&allocation.id).is_none(),
        products: allocation
            .selected_products
            .iter()
            .map(ProductProgress::of)
            .collect(),
    }
}

// ── Catalog cards ────────────────────────────────────────────────────

/// Label on a product card in the catalog. Variants are declared in
/// ascending precedence, so the strongest record wins via `Ord`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CardLabel {
    NotApplied,
    Rejected,
    Pending,
    Approved,
    Purchased,
    Completed,
}

impl CardLabel {
    pub fn label(self) -> &'static str {
        match self {
            Self::NotApplied => "Apply",
            Self::Rejected => "Rejected",
            Self::Pending => "Requested",
            Self::Approved => "Approved",
            Self::Purchased => "Purchased",
            Self::Completed => "Completed",
        }
    }
}

impl From<ApplicationStatus> for CardLabel {
    fn from(status: ApplicationStatus) -> Self {
        match status {
            ApplicationStatus::Pending => Self::Pending,
            ApplicationStatus::Approved => Self::Approved,
            ApplicationStatus::Rejected => Self::Rejected,
            ApplicationStatus::Purchased => Self::Purchased,
            ApplicationStatus::Completed => Self::Completed,
        }
    }
}

/// Single label for a product given every application record seen for it,
/// stale ones included.
pub fn resolve_card<I>(statuses: I) -> CardLabel
where
    I: IntoIterator<Item = ApplicationStatus>,
{
    statuses
        .into_iter()
        .map(CardLabel::from)
        .max()
        .unwrap_or(CardLabel::NotApplied)
}
