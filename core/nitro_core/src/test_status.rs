use chrono::{DateTime, Duration, TimeZone, Utc};

use crate::invariants;
use crate::status::{
    countdown, displayed_status, resolve, resolve_card, CardLabel, Countdown, FlowProgress,
    NextStep, PurchaseOverrides,
};
use crate::types::{
    Allocation, AllocationStatus, ApplicationStatus, ApprovalStatus, FeedbackSubmission,
    ProjectMode, ProjectRef, PurchaseProof, ReviewSubmission, SelectedProduct,
};

fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 0).unwrap()
}

fn allocation(status: AllocationStatus) -> Allocation {
    Allocation {
        id: "alloc-1".to_string(),
        status,
        project_id: Some("proj-1".to_string()),
        project: None,
        reserved_until: Some(now() + Duration::hours(2)),
        selected_products: Vec::new(),
        purchase_proof: None,
        review_submission: None,
        feedback_submission: None,
        payout: None,
    }
}

fn marketplace(mut a: Allocation) -> Allocation {
    a.project = Some(ProjectRef {
        id: "proj-1".to_string(),
        title: Some("Summer launch".to_string()),
        mode: Some(ProjectMode::from("Marketplace")),
        reward: Some(250.0),
    });
    a
}

fn proof(status: ApprovalStatus) -> PurchaseProof {
    PurchaseProof {
        id: "proof".to_string(),
        status,
        file_url: Some("https://files/invoice.pdf".to_string()),
        allocation_id: None,
        product_id: None,
        rejection_reason: None,
        submitted_at: None,
        reviewed_at: None,
    }
}

fn review(status: ApprovalStatus) -> ReviewSubmission {
    ReviewSubmission {
        id: "review".to_string(),
        status,
        allocation_id: None,
        product_id: None,
        review_url: Some("https://shop/review/9".to_string()),
        review_text: None,
        screenshots: Vec::new(),
        rejection_reason: None,
        submitted_at: None,
    }
}

fn feedback() -> FeedbackSubmission {
    FeedbackSubmission {
        id: "fb".to_string(),
        rating: 4,
        feedback: Some("Good packaging".to_string()),
        submitted_at: None,
    }
}

fn product(id: &str, proof_status: Option<ApprovalStatus>) -> SelectedProduct {
    SelectedProduct {
        product_id: id.to_string(),
        name: Some(format!("Product {id}")),
        url: None,
        price: None,
        purchase_proof: proof_status.map(proof),
        review_submission: None,
    }
}

fn confirmed(id: &str) -> PurchaseOverrides {
    let mut overrides = PurchaseOverrides::new();
    overrides.confirm(id);
    overrides
}

// ── Flow progress ────────────────────────────────────────────────────

#[test]
fn top_level_proof_counts_regardless_of_status() {
    let mut a = allocation(AllocationStatus::Purchased);
    a.purchase_proof = Some(proof(ApprovalStatus::Rejected));
    assert!(FlowProgress::of(&a, None).has_purchase_proof);
}

#[test]
fn rejected_product_proofs_do_not_count() {
    let mut a = allocation(AllocationStatus::Purchased);
    a.selected_products = vec![
        product("p1", Some(ApprovalStatus::Rejected)),
        product("p2", None),
    ];
    assert!(!FlowProgress::of(&a, None).has_purchase_proof);

    a.selected_products[1] = product("p2", Some(ApprovalStatus::Pending));
    assert!(FlowProgress::of(&a, None).has_purchase_proof);
}

#[test]
fn rejected_review_is_not_valid() {
    let mut a = allocation(AllocationStatus::Purchased);
    a.review_submission = Some(review(ApprovalStatus::Rejected));
    assert!(!FlowProgress::of(&a, None).has_valid_review);
    a.review_submission = Some(review(ApprovalStatus::Pending));
    assert!(FlowProgress::of(&a, None).has_valid_review);
}

#[test]
fn feedback_required_only_for_marketplace() {
    let mut a = allocation(AllocationStatus::Purchased);
    a.purchase_proof = Some(proof(ApprovalStatus::Approved));
    a.review_submission = Some(review(ApprovalStatus::Approved));

    let d2c = FlowProgress::of(&a, Some(&ProjectMode::D2c));
    assert!(!d2c.requires_feedback);
    assert!(d2c.required_flow_completed);

    let mp = FlowProgress::of(&a, Some(&ProjectMode::from("MARKETPLACE")));
    assert!(mp.requires_feedback);
    assert!(!mp.required_flow_completed);

    a.feedback_submission = Some(feedback());
    assert!(FlowProgress::of(&a, Some(&ProjectMode::Marketplace)).required_flow_completed);
}

// ── Displayed status ─────────────────────────────────────────────────

#[test]
fn override_lifts_reserved_to_purchased() {
    let a = allocation(AllocationStatus::Reserved);
    assert_eq!(displayed_status(&a, &PurchaseOverrides::new()), AllocationStatus::Reserved);
    assert_eq!(displayed_status(&a, &confirmed("alloc-1")), AllocationStatus::Purchased);
}

#[test]
fn override_is_idempotent_and_never_downgrades() {
    let mut twice = confirmed("alloc-1");
    twice.confirm("alloc-1");
    twice.dismiss("alloc-1");
    assert!(twice.is_confirmed("alloc-1"));

    for status in [AllocationStatus::Purchased, AllocationStatus::Completed] {
        let a = allocation(status);
        assert_eq!(displayed_status(&a, &twice), status);
        assert_eq!(displayed_status(&a, &PurchaseOverrides::new()), status);
    }
}

#[test]
fn dismissed_prompt_does_not_change_status() {
    let a = allocation(AllocationStatus::Reserved);
    let mut overrides = PurchaseOverrides::new();
    overrides.dismiss("alloc-1");

    let view = resolve(&a, None, &overrides, now());
    assert_eq!(view.displayed_status, AllocationStatus::Reserved);
    assert_eq!(view.next_step, NextStep::ConfirmPurchase);
    assert!(!view.auto_prompt_purchase);

    let fresh = resolve(&a, None, &PurchaseOverrides::new(), now());
    assert!(fresh.auto_prompt_purchase);
}

#[test]
fn override_for_other_allocation_is_ignored() {
    let a = allocation(AllocationStatus::Reserved);
    assert_eq!(displayed_status(&a, &confirmed("alloc-2")), AllocationStatus::Reserved);
}

// ── Next step ────────────────────────────────────────────────────────

#[test]
fn next_step_walks_the_flow_in_order() {
    let mut a = marketplace(allocation(AllocationStatus::Reserved));
    let none = PurchaseOverrides::new();

    assert_eq!(resolve(&a, None, &none, now()).next_step, NextStep::ConfirmPurchase);
    assert_eq!(
        resolve(&a, None, &confirmed("alloc-1"), now()).next_step,
        NextStep::UploadInvoice
    );

    a.status = AllocationStatus::Purchased;
    assert_eq!(resolve(&a, None, &none, now()).next_step, NextStep::UploadInvoice);

    a.purchase_proof = Some(proof(ApprovalStatus::Pending));
    assert_eq!(resolve(&a, None, &none, now()).next_step, NextStep::SubmitReview);

    a.review_submission = Some(review(ApprovalStatus::Pending));
    assert_eq!(resolve(&a, None, &none, now()).next_step, NextStep::SubmitFeedback);

    a.feedback_submission = Some(feedback());
    assert_eq!(resolve(&a, None, &none, now()).next_step, NextStep::CheckPayout);
}

#[test]
fn existing_proof_skips_purchase_confirmation() {
    let mut a = allocation(AllocationStatus::Reserved);
    a.selected_products = vec![product("p1", Some(ApprovalStatus::Pending))];
    let view = resolve(&a, None, &PurchaseOverrides::new(), now());
    assert_eq!(view.next_step, NextStep::SubmitReview);
    assert_eq!(view.displayed_status, AllocationStatus::Reserved);
}

#[test]
fn rejected_review_reopens_only_the_review_step() {
    let mut a = allocation(AllocationStatus::Purchased);
    a.purchase_proof = Some(proof(ApprovalStatus::Approved));
    a.review_submission = Some(review(ApprovalStatus::Rejected));
    let view = resolve(&a, Some(&ProjectMode::D2c), &PurchaseOverrides::new(), now());
    assert_eq!(view.next_step, NextStep::SubmitReview);
    assert!(view.progress.has_purchase_proof);
}

#[test]
fn rejected_product_proof_reopens_its_invoice() {
    let mut a = allocation(AllocationStatus::Purchased);
    a.selected_products = vec![
        product("p1", Some(ApprovalStatus::Approved)),
        product("p2", Some(ApprovalStatus::Rejected)),
    ];
    let view = resolve(&a, None, &PurchaseOverrides::new(), now());
    assert!(!view.products[0].invoice_open());
    assert!(view.products[1].invoice_open());
    assert!(view.products[1].review_open());
}

#[test]
fn fallback_mode_applies_when_project_not_embedded() {
    let mut a = allocation(AllocationStatus::Purchased);
    a.purchase_proof = Some(proof(ApprovalStatus::Approved));
    a.review_submission = Some(review(ApprovalStatus::Approved));

    let view = resolve(&a, Some(&ProjectMode::Marketplace), &PurchaseOverrides::new(), now());
    assert_eq!(view.next_step, NextStep::SubmitFeedback);

    let embedded = marketplace(a.clone());
    let view = resolve(&embedded, Some(&ProjectMode::D2c), &PurchaseOverrides::new(), now());
    assert_eq!(view.next_step, NextStep::SubmitFeedback);
}

// ── Countdown ────────────────────────────────────────────────────────

#[test]
fn countdown_runs_while_flow_incomplete() {
    let a = allocation(AllocationStatus::Reserved);
    let progress = FlowProgress::of(&a, None);
    assert_eq!(countdown(&a, &progress, now()), Countdown::Running(Duration::hours(2)));
    assert_eq!(
        countdown(&a, &progress, now() + Duration::hours(3)),
        Countdown::Lapsed
    );
    assert_eq!(Countdown::Running(Duration::seconds(3723)).to_string(), "01:02:03");
}

#[test]
fn countdown_freezes_once_flow_completed() {
    let mut a = allocation(AllocationStatus::Purchased);
    a.purchase_proof = Some(proof(ApprovalStatus::Pending));
    a.review_submission = Some(review(ApprovalStatus::Pending));

    let first = resolve(&a, Some(&ProjectMode::D2c), &PurchaseOverrides::new(), now());
    assert_eq!(first.countdown, Countdown::Frozen);
    assert_eq!(first.countdown.to_string(), "00:00:00");

    for minutes in [1, 30, 600] {
        let later = resolve(
            &a,
            Some(&ProjectMode::D2c),
            &PurchaseOverrides::new(),
            now() + Duration::minutes(minutes),
        );
        assert_eq!(later.countdown, Countdown::Frozen);
        invariants::assert_countdown_monotonic(&first, &later);
        invariants::assert_all(&later);
    }
}

#[test]
fn countdown_freezes_for_completed_allocation() {
    let a = allocation(AllocationStatus::Completed);
    let view = resolve(&a, None, &PurchaseOverrides::new(), now());
    assert_eq!(view.countdown, Countdown::Frozen);
}

#[test]
fn closed_allocations_offer_no_step() {
    for status in [
        AllocationStatus::Cancelled,
        AllocationStatus::Rejected,
        AllocationStatus::Expired,
    ] {
        let view = resolve(&allocation(status), None, &confirmed("alloc-1"), now());
        assert_eq!(view.next_step, NextStep::Closed);
        assert_eq!(view.displayed_status, status);
        assert_eq!(view.countdown, Countdown::Frozen);
        assert!(!view.auto_prompt_purchase);
    }
}

#[test]
fn missing_deadline_is_unbounded() {
    let mut a = allocation(AllocationStatus::Reserved);
    a.reserved_until = None;
    let view = resolve(&a, None, &PurchaseOverrides::new(), now());
    assert_eq!(view.countdown, Countdown::Unbounded);
    assert_eq!(view.countdown.to_string(), "--:--:--");
}

#[test]
fn every_status_and_override_yields_one_consistent_view() {
    let overrides = [PurchaseOverrides::new(), confirmed("alloc-1")];
    for status in [
        AllocationStatus::Reserved,
        AllocationStatus::Purchased,
        AllocationStatus::Completed,
        AllocationStatus::Cancelled,
        AllocationStatus::Rejected,
        AllocationStatus::Expired,
    ] {
        for o in &overrides {
            let view = resolve(&allocation(status), None, o, now());
            invariants::assert_all(&view);
        }
    }
}

// ── Catalog cards ────────────────────────────────────────────────────

#[test]
fn card_precedence_is_total() {
    use ApplicationStatus::*;
    assert_eq!(resolve_card(Vec::<ApplicationStatus>::new()), CardLabel::NotApplied);
    assert_eq!(resolve_card([Rejected]), CardLabel::Rejected);
    assert_eq!(resolve_card([Rejected, Pending]), CardLabel::Pending);
    assert_eq!(resolve_card([Pending, Approved]), CardLabel::Approved);
    assert_eq!(resolve_card([Approved, Purchased]), CardLabel::Purchased);
    assert_eq!(resolve_card([Approved, Completed, Pending]), CardLabel::Completed);
}

#[test]
fn completed_card_ignores_stale_records_in_any_order() {
    use ApplicationStatus::*;
    let records = [Completed, Approved, Pending];
    assert_eq!(resolve_card(records), CardLabel::Completed);
    assert_eq!(resolve_card(records.into_iter().rev()), CardLabel::Completed);
}
