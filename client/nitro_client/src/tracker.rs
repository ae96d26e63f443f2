//! Allocation tracking: joins backend records with the participant's local
//! purchase confirmations and resolves each allocation for display.
//!
//! Loading never fails on a backend error. A failed source degrades to an
//! empty section plus a banner; only local storage errors, an expired
//! session and cancellation propagate.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use nitro_core::status::resolve;
use nitro_core::{
    Allocation, AllocationStatus, AllocationView, Notification, ProfileCompletion, Project,
    ProjectMode,
};
use tokio::task::JoinSet;
use tracing::{info, warn};

use crate::accessors::{allocations, notifications, projects, users};
use crate::errors::{ClientError, Result};
use crate::http::{with_timeout, ApiClient};

/// One source of a screen: either its data or the message to show instead.
#[derive(Debug, Clone, PartialEq)]
pub enum Section<T> {
    Loaded(T),
    Failed(String),
}

impl<T> Section<T> {
    /// Errors that must reach the shell are returned; everything else
    /// becomes a banner.
    fn settle(result: Result<T>) -> Result<Self> {
        match result {
            Ok(value) => Ok(Self::Loaded(value)),
            Err(e @ (ClientError::Unauthorized | ClientError::Cancelled)) => Err(e),
            Err(e) => Ok(Self::Failed(e.to_string())),
        }
    }

    pub fn loaded(&self) -> Option<&T> {
        match self {
            Self::Loaded(value) => Some(value),
            Self::Failed(_) => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TrackedAllocation {
    pub allocation: Allocation,
    pub view: AllocationView,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TrackingBoard {
    pub items: Vec<TrackedAllocation>,
    /// Banner shown above an empty list when loading failed.
    pub error: Option<String>,
}

pub fn resolve_all(
    allocations: Vec<Allocation>,
    modes: &HashMap<String, ProjectMode>,
    overrides: &nitro_core::PurchaseOverrides,
    now: DateTime<Utc>,
) -> Vec<TrackedAllocation> {
    allocations
        .into_iter()
        .map(|allocation| {
            let fallback = allocation
                .project_id
                .as_ref()
                .or(allocation.project.as_ref().map(|p| &p.id))
                .and_then(|id| modes.get(id));
            let view = resolve(&allocation, fallback, overrides, now);
            TrackedAllocation { allocation, view }
        })
        .collect()
}

/// Look up modes for allocations whose record does not embed one and whose
/// project is not already in `modes`. Lookups that fail are skipped; those
/// allocations resolve without the feedback requirement.
async fn fill_missing_modes(
    api: &ApiClient,
    allocations: &[Allocation],
    modes: &mut HashMap<String, ProjectMode>,
) {
    let mut pending: Vec<String> = allocations
        .iter()
        .filter(|a| a.project_mode().is_none())
        .filter_map(|a| a.project_id.clone())
        .filter(|id| !modes.contains_key(id))
        .collect();
    pending.sort();
    pending.dedup();

    let mut set = JoinSet::new();
    for project_id in pending {
        let api = api.clone();
        set.spawn(async move { projects::get_project(&api, &project_id).await });
    }

    while let Some(joined) = set.join_next().await {
        match joined {
            Ok(Ok(project)) => {
                modes.insert(project.id, project.mode);
            }
            Ok(Err(e)) => warn!("Project lookup failed: {e}"),
            Err(e) => warn!("Project lookup task failed: {e}"),
        }
    }
}

pub async fn load_board(api: &ApiClient, participant_id: &str, now: DateTime<Utc>) -> Result<TrackingBoard> {
    let overrides = api.session().durable().purchase_overrides(participant_id).await?;

    match Section::settle(allocations::tracking(api).await)? {
        Section::Loaded(records) => {
            let mut modes = HashMap::new();
            fill_missing_modes(api, &records, &mut modes).await;
            Ok(TrackingBoard {
                items: resolve_all(records, &modes, &overrides, now),
                error: None,
            })
        }
        Section::Failed(message) => {
            warn!("Tracking data unavailable: {message}");
            Ok(TrackingBoard {
                items: Vec::new(),
                error: Some(message),
            })
        }
    }
}

/// A single allocation, resolved the same way as the board.
pub async fn load_one(
    api: &ApiClient,
    participant_id: &str,
    allocation_id: &str,
    now: DateTime<Utc>,
) -> Result<TrackedAllocation> {
    let overrides = api.session().durable().purchase_overrides(participant_id).await?;
    let record = allocations::get_allocation(api, allocation_id).await?;
    let records = vec![record];
    let mut modes = HashMap::new();
    fill_missing_modes(api, &records, &mut modes).await;
    resolve_all(records, &modes, &overrides, now)
        .pop()
        .ok_or_else(|| ClientError::Api {
            status: 404,
            message: format!("Allocation {allocation_id} not found"),
        })
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfirmOutcome {
    /// Set when the backend did not accept the status change. The local
    /// confirmation stays in place.
    pub warning: Option<String>,
}

/// Record "I purchased this" locally, then tell the backend.
pub async fn confirm_purchase(
    api: &ApiClient,
    participant_id: &str,
    allocation_id: &str,
) -> Result<ConfirmOutcome> {
    let store = api.session().durable();
    let mut overrides = store.purchase_overrides(participant_id).await?;
    overrides.confirm(allocation_id);
    store.save_purchase_overrides(participant_id, &overrides).await?;

    match allocations::update_status(api, allocation_id, AllocationStatus::Purchased).await {
        Ok(_) => {
            info!("Allocation {allocation_id} marked purchased");
            Ok(ConfirmOutcome { warning: None })
        }
        Err(e @ ClientError::Unauthorized) => Err(e),
        Err(e) => {
            warn!("Purchase status update failed for {allocation_id}: {e}");
            Ok(ConfirmOutcome {
                warning: Some(format!(
                    "Saved locally, but the server did not confirm yet: {e}"
                )),
            })
        }
    }
}

/// "Not yet": stop prompting for this allocation without confirming it.
pub async fn dismiss_prompt(api: &ApiClient, participant_id: &str, allocation_id: &str) -> Result<()> {
    let store = api.session().durable();
    let mut overrides = store.purchase_overrides(participant_id).await?;
    overrides.dismiss(allocation_id);
    store.save_purchase_overrides(participant_id, &overrides).await
}

// ─────────────────────────────────────────────────────────
// Dashboard
// ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub struct Dashboard {
    pub first_visit: bool,
    pub profile: Section<ProfileCompletion>,
    pub allocations: Section<Vec<TrackedAllocation>>,
    pub catalog: Section<Vec<Project>>,
    pub notifications: Section<Vec<Notification>>,
}

/// Fetch every dashboard source concurrently. Each source fails on its own;
/// the aggregate as a whole gives up after `timeout_secs`.
pub async fn load_dashboard(
    api: &ApiClient,
    participant_id: &str,
    timeout_secs: u64,
    now: DateTime<Utc>,
) -> Result<Dashboard> {
    let store = api.session().durable();
    let overrides = store.purchase_overrides(participant_id).await?;

    let (profile, tracking, catalog, inbox, modes) = with_timeout(
        "Dashboard",
        timeout_secs,
        async {
            let filter = projects::ProjectFilter::default();
            let (profile, tracking, catalog, inbox) = tokio::join!(
                users::profile_completion(api),
                allocations::tracking(api),
                projects::list_projects(api, &filter),
                notifications::list(api),
            );
            // Catalog modes first; projects missing from it are fetched
            // the same way the board does.
            let mut modes: HashMap<String, ProjectMode> = catalog
                .as_ref()
                .map(|list| list.iter().map(|p| (p.id.clone(), p.mode.clone())).collect())
                .unwrap_or_default();
            if let Ok(records) = &tracking {
                fill_missing_modes(api, records, &mut modes).await;
            }
            Ok((profile, tracking, catalog, inbox, modes))
        },
    )
    .await?;

    let catalog = Section::settle(catalog)?;
    let allocations = match Section::settle(tracking)? {
        Section::Loaded(records) => {
            Section::Loaded(resolve_all(records, &modes, &overrides, now))
        }
        Section::Failed(message) => Section::Failed(message),
    };

    let first_visit = !store.mark_dashboard_seen(participant_id).await?;

    Ok(Dashboard {
        first_visit,
        profile: Section::settle(profile)?,
        allocations,
        catalog,
        notifications: Section::settle(inbox)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{spawn_backend, test_api};
    use axum::extract::State;
    use axum::http::StatusCode;
    use axum::routing::{get, patch};
    use axum::{Json, Router};
    use nitro_core::NextStep;
    use serde_json::{json, Value};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn tracking_body() -> Value {
        json!({
            "success": true,
            "data": [
                { "id": "a1", "status": "RESERVED", "project_id": "p1" },
                {
                    "id": "a2", "status": "PURCHASED",
                    "project": { "id": "p2", "mode": "D2C" },
                    "purchase_proof": { "id": "pp", "status": "APPROVED" },
                    "review_submission": { "id": "rv", "status": "PENDING" }
                }
            ]
        })
    }

    #[tokio::test]
    async fn board_uses_project_mode_when_not_embedded() {
        let router = Router::new()
            .route("/allocations/me/tracking", get(|| async { Json(tracking_body()) }))
            .route(
                "/projects/p1",
                get(|| async {
                    Json(json!({ "success": true, "data": {
                        "id": "p1", "title": "Serum", "mode": "marketplace", "status": "published"
                    }}))
                }),
            );
        let url = spawn_backend(router).await;
        let api = test_api(&url).await;

        let board = load_board(&api, "u1", Utc::now()).await.unwrap();
        assert!(board.error.is_none());
        assert_eq!(board.items.len(), 2);
        assert!(board.items[0].view.progress.requires_feedback);
        assert_eq!(board.items[0].view.next_step, NextStep::ConfirmPurchase);
        assert!(!board.items[1].view.progress.requires_feedback);
        assert_eq!(board.items[1].view.next_step, NextStep::CheckPayout);
    }

    #[tokio::test]
    async fn failed_tracking_degrades_to_banner() {
        let router = Router::new().route(
            "/allocations/me/tracking",
            get(|| async { (StatusCode::BAD_GATEWAY, Json(json!({ "message": "upstream down" }))) }),
        );
        let url = spawn_backend(router).await;
        let api = test_api(&url).await;

        let board = load_board(&api, "u1", Utc::now()).await.unwrap();
        assert!(board.items.is_empty());
        assert_eq!(board.error.as_deref(), Some("upstream down"));
    }

    #[tokio::test]
    async fn unreadable_record_does_not_hide_the_board() {
        let router = Router::new().route(
            "/allocations/me/tracking",
            get(|| async {
                Json(json!({ "success": true, "data": [
                    { "id": "a1", "status": "RESERVED", "project": { "id": "p", "mode": "D2C" } },
                    { "id": "a2", "status": "REJECTED", "project": { "id": "p", "mode": "D2C" } },
                    { "id": "a3", "status": "ON_HOLD" }
                ]}))
            }),
        );
        let url = spawn_backend(router).await;
        let api = test_api(&url).await;

        let board = load_board(&api, "u1", Utc::now()).await.unwrap();
        assert!(board.error.is_none());
        let ids: Vec<_> = board.items.iter().map(|i| i.view.allocation_id.as_str()).collect();
        assert_eq!(ids, ["a1", "a2"]);
        assert_eq!(board.items[0].view.next_step, NextStep::ConfirmPurchase);
        assert_eq!(board.items[1].view.displayed_status, AllocationStatus::Rejected);
        assert_eq!(board.items[1].view.next_step, NextStep::Closed);
    }

    #[tokio::test]
    async fn confirm_keeps_optimistic_state_when_server_fails() {
        let calls = Arc::new(AtomicUsize::new(0));
        let router = Router::new()
            .route(
                "/allocations/:id/status",
                patch(|State(calls): State<Arc<AtomicUsize>>| async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    (StatusCode::INTERNAL_SERVER_ERROR, Json(json!({ "message": "boom" })))
                }),
            )
            .route(
                "/allocations/me/tracking",
                get(|| async {
                    Json(json!({ "success": true, "data": [
                        { "id": "a1", "status": "RESERVED", "project": { "id": "p", "mode": "D2C" } }
                    ]}))
                }),
            )
            .with_state(calls.clone());
        let url = spawn_backend(router).await;
        let api = test_api(&url).await;

        let outcome = confirm_purchase(&api, "u1", "a1").await.unwrap();
        assert!(outcome.warning.unwrap().contains("boom"));
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        let board = load_board(&api, "u1", Utc::now()).await.unwrap();
        let view = &board.items[0].view;
        assert_eq!(view.displayed_status, AllocationStatus::Purchased);
        assert_eq!(view.next_step, NextStep::UploadInvoice);
    }

    #[tokio::test]
    async fn dismissing_only_silences_the_prompt() {
        let router = Router::new().route(
            "/allocations/me/tracking",
            get(|| async {
                Json(json!({ "success": true, "data": [
                    { "id": "a1", "status": "RESERVED", "project": { "id": "p", "mode": "D2C" } }
                ]}))
            }),
        );
        let url = spawn_backend(router).await;
        let api = test_api(&url).await;

        let before = load_board(&api, "u1", Utc::now()).await.unwrap();
        assert!(before.items[0].view.auto_prompt_purchase);

        dismiss_prompt(&api, "u1", "a1").await.unwrap();
        let after = load_board(&api, "u1", Utc::now()).await.unwrap();
        let view = &after.items[0].view;
        assert!(!view.auto_prompt_purchase);
        assert_eq!(view.displayed_status, AllocationStatus::Reserved);
        assert_eq!(view.next_step, NextStep::ConfirmPurchase);
    }

    #[tokio::test]
    async fn dashboard_and_board_agree_on_projects_outside_catalog() {
        let router = Router::new()
            .route(
                "/allocations/me/tracking",
                get(|| async {
                    Json(json!({ "success": true, "data": [{
                        "id": "a1", "status": "PURCHASED", "project_id": "p9",
                        "purchase_proof": { "id": "pp", "status": "APPROVED" },
                        "review_submission": { "id": "rv", "status": "APPROVED" }
                    }]}))
                }),
            )
            .route("/projects", get(|| async { Json(json!({ "success": true, "data": [] })) }))
            .route(
                "/projects/p9",
                get(|| async {
                    Json(json!({ "success": true, "data": {
                        "id": "p9", "title": "Archived serum", "mode": "MARKETPLACE", "status": "archived"
                    }}))
                }),
            )
            .route("/users/me/profile-completion", get(|| async { Json(json!({ "success": true, "data": { "percentage": 100 } })) }))
            .route("/notifications", get(|| async { Json(json!({ "success": true, "data": [] })) }));
        let url = spawn_backend(router).await;
        let api = test_api(&url).await;
        let now = Utc::now();

        let board = load_board(&api, "u1", now).await.unwrap();
        assert_eq!(board.items[0].view.next_step, NextStep::SubmitFeedback);

        let dashboard = load_dashboard(&api, "u1", 15, now).await.unwrap();
        let tracked = dashboard.allocations.loaded().unwrap();
        assert_eq!(tracked[0].view.next_step, NextStep::SubmitFeedback);
        assert!(!tracked[0].view.progress.required_flow_completed);
    }

    #[tokio::test]
    async fn dashboard_isolates_failing_sources() {
        let router = Router::new()
            .route(
                "/users/me/profile-completion",
                get(|| async { (StatusCode::INTERNAL_SERVER_ERROR, Json(json!({ "error": "profile down" }))) }),
            )
            .route("/allocations/me/tracking", get(|| async { Json(tracking_body()) }))
            .route(
                "/projects",
                get(|| async {
                    Json(json!({ "success": true, "data": [
                        { "id": "p1", "title": "Serum", "mode": "MARKETPLACE", "status": "published" }
                    ]}))
                }),
            )
            .route(
                "/notifications",
                get(|| async { Json(json!({ "success": true, "data": [] })) }),
            );
        let url = spawn_backend(router).await;
        let api = test_api(&url).await;

        let first = load_dashboard(&api, "u1", 15, Utc::now()).await.unwrap();
        assert!(first.first_visit);
        assert_eq!(first.profile, Section::Failed("profile down".into()));
        let tracked = first.allocations.loaded().unwrap();
        assert!(tracked[0].view.progress.requires_feedback);
        assert_eq!(first.catalog.loaded().map(Vec::len), Some(1));
        assert_eq!(first.notifications, Section::Loaded(vec![]));

        let second = load_dashboard(&api, "u1", 15, Utc::now()).await.unwrap();
        assert!(!second.first_visit);
    }
}
