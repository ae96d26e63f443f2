//! Campaigns, access requests and product applications.

use nitro_core::{
    AccessRequest, Application, ApplicationStatus, ApprovalStatus, Project, ProjectMode,
    ProjectStatus,
};
use serde::{Deserialize, Serialize};
use serde_json::json;

use super::push_opt;
use crate::errors::Result;
use crate::http::ApiClient;

/// Catalog filter. Participants only ever see published campaigns, so that
/// is the default status.
#[derive(Debug, Clone)]
pub struct ProjectFilter {
    pub status: Option<ProjectStatus>,
    pub mode: Option<ProjectMode>,
    pub search: Option<String>,
}

impl Default for ProjectFilter {
    fn default() -> Self {
        Self {
            status: Some(ProjectStatus::Published),
            mode: None,
            search: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewProduct {
    pub name: String,
    pub url: Option<String>,
    pub price: Option<f64>,
}

/// Campaign draft, as read from a brand's JSON file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewProject {
    pub title: String,
    pub description: Option<String>,
    pub mode: ProjectMode,
    pub reward: f64,
    pub units: u32,
    pub start_date: Option<chrono::DateTime<chrono::Utc>>,
    pub end_date: Option<chrono::DateTime<chrono::Utc>>,
    pub products: Vec<NewProduct>,
}

/// `GET /projects`
pub async fn list_projects(api: &ApiClient, filter: &ProjectFilter) -> Result<Vec<Project>> {
    let mode = filter.mode.clone().map(String::from);
    let mut query = Vec::new();
    push_opt(&mut query, "status", filter.status.map(ProjectStatus::as_str));
    push_opt(&mut query, "mode", mode.as_deref());
    push_opt(&mut query, "search", filter.search.as_deref());
    api.get("/projects", &query).await
}

/// `GET /projects/:id`
pub async fn get_project(api: &ApiClient, project_id: &str) -> Result<Project> {
    api.get(&format!("/projects/{project_id}"), &[]).await
}

/// `POST /projects` (brand)
pub async fn create_project(api: &ApiClient, project: &NewProject) -> Result<Project> {
    api.post("/projects", project).await
}

/// `PATCH /projects/:id/status` (brand: publish / archive)
pub async fn set_project_status(
    api: &ApiClient,
    project_id: &str,
    status: ProjectStatus,
) -> Result<Project> {
    api.patch(
        &format!("/projects/{project_id}/status"),
        &json!({ "status": status }),
    )
    .await
}

/// `GET /brand/projects`
pub async fn brand_projects(api: &ApiClient) -> Result<Vec<Project>> {
    api.get("/brand/projects", &[]).await
}

// ── Access requests ──────────────────────────────────────

/// `POST /projects/:id/access-requests`
pub async fn request_access(api: &ApiClient, project_id: &str) -> Result<AccessRequest> {
    api.post(&format!("/projects/{project_id}/access-requests"), &json!({}))
        .await
}

/// `GET /projects/:id/access-requests/me`
pub async fn my_access_request(api: &ApiClient, project_id: &str) -> Result<Option<AccessRequest>> {
    api.get(&format!("/projects/{project_id}/access-requests/me"), &[])
        .await
}

/// `GET /admin/access-requests`
pub async fn list_access_requests(
    api: &ApiClient,
    status: Option<ApprovalStatus>,
) -> Result<Vec<AccessRequest>> {
    let mut query = Vec::new();
    push_opt(&mut query, "status", status.map(ApprovalStatus::as_str));
    api.get("/admin/access-requests", &query).await
}

/// `PATCH /admin/access-requests/:id`
pub async fn decide_access_request(
    api: &ApiClient,
    request_id: &str,
    status: ApprovalStatus,
) -> Result<AccessRequest> {
    api.patch(
        &format!("/admin/access-requests/{request_id}"),
        &json!({ "status": status }),
    )
    .await
}

// ── Applications ─────────────────────────────────────────

/// `POST /applications`
pub async fn apply_for_project(
    api: &ApiClient,
    project_id: &str,
    product_id: &str,
) -> Result<Application> {
    api.post(
        "/applications",
        &json!({ "project_id": project_id, "product_id": product_id }),
    )
    .await
}

/// `GET /applications/me`
pub async fn my_applications(api: &ApiClient) -> Result<Vec<Application>> {
    api.get("/applications/me", &[]).await
}

/// `GET /admin/applications`
pub async fn list_applications(
    api: &ApiClient,
    status: Option<ApplicationStatus>,
) -> Result<Vec<Application>> {
    let mut query = Vec::new();
    push_opt(&mut query, "status", status.map(ApplicationStatus::as_str));
    api.get("/admin/applications", &query).await
}

/// `PATCH /admin/applications/:id`
pub async fn decide_application(
    api: &ApiClient,
    application_id: &str,
    status: ApprovalStatus,
    reason: Option<&str>,
) -> Result<Application> {
    api.patch(
        &format!("/admin/applications/{application_id}"),
        &json!({ "status": status, "reason": reason }),
    )
    .await
}
