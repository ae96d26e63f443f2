//! Terminal rendering. Every screen takes already-loaded data and returns
//! the text to print; labels and next steps come from the status model.

use std::collections::HashMap;

use nitro_core::status::resolve_card;
use nitro_core::{
    AccessRequest, Application, ApplicationStatus, BatchReport, Notification, PaymentDetails,
    Payout, PayoutBatch, Project, PurchaseProof, ReviewSubmission, User,
};

use crate::tracker::{Dashboard, Section, TrackedAllocation, TrackingBoard};

fn money(amount: f64) -> String {
    format!("₹{amount:.2}")
}

fn failed(title: &str, message: &str) -> String {
    format!("{title}: unavailable ({message})")
}

pub fn whoami(user: &User) -> String {
    let mut line = format!("{} ({})", user.id, user.role);
    if let Some(email) = &user.email {
        line.push_str(&format!(" <{email}>"));
    }
    line.push_str(&format!("\nHome: {}", user.role.dashboard_path(&user.id)));
    line
}

// ── Allocations ──────────────────────────────────────────

fn allocation_lines(item: &TrackedAllocation) -> Vec<String> {
    let view = &item.view;
    let title = item
        .allocation
        .project_title()
        .unwrap_or(item.allocation.id.as_str());
    let mut lines = vec![format!(
        "[{}] {} ({})  {}  next: {}",
        view.displayed_status.label(),
        title,
        view.allocation_id,
        view.countdown,
        view.next_step.prompt(),
    )];
    for product in &view.products {
        let status = |s: Option<nitro_core::ApprovalStatus>| s.map_or("none", |s| s.as_str());
        let mut line = format!(
            "    - {}: invoice {}, review {}",
            product.name.as_deref().unwrap_or(product.product_id.as_str()),
            status(product.proof),
            status(product.review),
        );
        if product.invoice_open() && product.proof.is_some() {
            line.push_str(" (re-upload invoice)");
        }
        if product.review_open() && product.review.is_some() {
            line.push_str(" (resubmit review)");
        }
        lines.push(line);
    }
    if view.auto_prompt_purchase {
        lines.push(format!(
            "    Did you purchase this? Run `nitro confirm-purchase {}`",
            view.allocation_id
        ));
    }
    lines
}

pub fn board(board: &TrackingBoard) -> String {
    let mut lines = Vec::new();
    if let Some(error) = &board.error {
        lines.push(format!("! Could not load your allocations: {error}"));
    }
    if board.items.is_empty() {
        lines.push("No allocations yet.".to_string());
    }
    for item in &board.items {
        lines.extend(allocation_lines(item));
    }
    lines.join("\n")
}

pub fn dashboard(user: &User, dashboard: &Dashboard) -> String {
    let mut lines = Vec::new();
    let name = user.name.as_deref().unwrap_or("there");
    if dashboard.first_visit {
        lines.push(format!("Welcome to Nitro, {name}!"));
    } else {
        lines.push(format!("Welcome back, {name}."));
    }

    lines.push(match &dashboard.profile {
        Section::Loaded(p) if p.missing_fields.is_empty() => format!("Profile: {}% complete", p.percentage),
        Section::Loaded(p) => format!(
            "Profile: {}% complete (missing: {})",
            p.percentage,
            p.missing_fields.join(", ")
        ),
        Section::Failed(e) => failed("Profile", e),
    });

    match &dashboard.allocations {
        Section::Loaded(items) => {
            let active: Vec<_> = items
                .iter()
                .filter(|i| {
                    !i.view.progress.required_flow_completed && !i.view.server_status.is_closed()
                })
                .collect();
            lines.push(format!("Active tasks: {}", active.len()));
            for item in active {
                lines.extend(allocation_lines(item));
            }
        }
        Section::Failed(e) => lines.push(failed("Active tasks", e)),
    }

    lines.push(match &dashboard.catalog {
        Section::Loaded(projects) => format!("Open campaigns: {}", projects.len()),
        Section::Failed(e) => failed("Open campaigns", e),
    });

    lines.push(match &dashboard.notifications {
        Section::Loaded(list) => {
            format!("Unread notifications: {}", list.iter().filter(|n| !n.read).count())
        }
        Section::Failed(e) => failed("Notifications", e),
    });
    lines.join("\n")
}

// ── Catalog ──────────────────────────────────────────────

/// Every product card with exactly one label, derived from all application
/// records seen for that product.
pub fn catalog(projects: &[Project], applications: &[Application]) -> String {
    let mut by_product: HashMap<&str, Vec<ApplicationStatus>> = HashMap::new();
    for application in applications {
        by_product
            .entry(application.product_id.as_str())
            .or_default()
            .push(application.status);
    }

    if projects.is_empty() {
        return "No open campaigns.".to_string();
    }
    let mut lines = Vec::new();
    for project in projects {
        let reward = project.reward.map(money).unwrap_or_else(|| "-".to_string());
        lines.push(format!(
            "{} [{}] {}  reward {}",
            project.id,
            String::from(project.mode.clone()),
            project.title,
            reward
        ));
        for product in &project.products {
            let statuses = by_product.get(product.id.as_str()).cloned().unwrap_or_default();
            let price = product.price.map(money).unwrap_or_default();
            lines.push(format!(
                "    {} {} {}  [{}]",
                product.id,
                product.name,
                price,
                resolve_card(statuses).label()
            ));
        }
    }
    lines.join("\n")
}

/// A brand's own campaigns.
pub fn projects(projects: &[Project]) -> String {
    if projects.is_empty() {
        return "No campaigns yet.".to_string();
    }
    projects
        .iter()
        .map(|p| {
            format!(
                "{}  {}  {}  {} products  units {}",
                p.id,
                p.title,
                p.status.as_str(),
                p.products.len(),
                p.units.map_or_else(|| "-".to_string(), |u| u.to_string())
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn users(users: &[User]) -> String {
    if users.is_empty() {
        return "No users.".to_string();
    }
    users
        .iter()
        .map(|u| {
            format!(
                "{}  {}  {}  {}",
                u.id,
                u.role,
                u.email.as_deref().unwrap_or("-"),
                u.approval_status.map_or("-", |s| s.as_str())
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn access_request(request: Option<&AccessRequest>) -> String {
    match request {
        Some(r) => format!("Access to {}: {}", r.project_id, r.status.as_str()),
        None => "No access request yet.".to_string(),
    }
}

pub fn access_requests(requests: &[AccessRequest]) -> String {
    if requests.is_empty() {
        return "No access requests.".to_string();
    }
    requests
        .iter()
        .map(|r| {
            format!(
                "{}  project {}  participant {}  {}",
                r.id,
                r.project_id,
                r.participant_id.as_deref().unwrap_or("-"),
                r.status.as_str()
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn applications(applications: &[Application]) -> String {
    if applications.is_empty() {
        return "No applications.".to_string();
    }
    applications
        .iter()
        .map(|a| {
            format!(
                "{}  project {}  product {}  participant {}  {}",
                a.id,
                a.project_id,
                a.product_id,
                a.participant_id.as_deref().unwrap_or("-"),
                a.status.as_str()
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

// ── Verification ─────────────────────────────────────────

pub fn purchase_proofs(proofs: &[PurchaseProof]) -> String {
    if proofs.is_empty() {
        return "Nothing to verify.".to_string();
    }
    proofs
        .iter()
        .map(|p| {
            format!(
                "{}  allocation {}  {}  {}",
                p.id,
                p.allocation_id.as_deref().unwrap_or("-"),
                p.status.as_str(),
                p.file_url.as_deref().unwrap_or("(no file)")
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn reviews(reviews: &[ReviewSubmission]) -> String {
    if reviews.is_empty() {
        return "Nothing to verify.".to_string();
    }
    reviews
        .iter()
        .map(|r| {
            let target = r
                .review_url
                .as_deref()
                .or(r.review_text.as_deref())
                .unwrap_or("-");
            format!(
                "{}  allocation {}  {}  {}",
                r.id,
                r.allocation_id.as_deref().unwrap_or("-"),
                r.status.as_str(),
                target
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

// ── Payouts ──────────────────────────────────────────────

pub fn payouts(payouts: &[Payout]) -> String {
    if payouts.is_empty() {
        return "No payouts.".to_string();
    }
    payouts
        .iter()
        .map(|p| {
            format!(
                "{}  {}  {}  batch {}",
                p.id,
                money(p.amount),
                p.status.as_str(),
                p.batch_id.as_deref().unwrap_or("-")
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn batches(batches: &[PayoutBatch]) -> String {
    if batches.is_empty() {
        return "No payout batches.".to_string();
    }
    batches
        .iter()
        .map(|b| {
            let created = b
                .created_at
                .map(|t| t.format("%Y-%m-%d").to_string())
                .unwrap_or_else(|| "-".to_string());
            format!(
                "{}  {}  {} payouts  {}  created {}",
                b.id,
                b.status.as_str(),
                b.payout_count,
                money(b.total_amount),
                created
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Summary line plus one line per failure.
pub fn report<K: std::fmt::Display>(report: &BatchReport<K>) -> String {
    let mut lines = vec![report.to_string()];
    for key in &report.already_pending {
        lines.push(format!("  {key}: already requested"));
    }
    for (key, reason) in &report.failed {
        lines.push(format!("  {key}: {reason}"));
    }
    if !report.is_clean() {
        lines.push(format!(
            "{} of {} can be retried.",
            report.failed.len(),
            report.total()
        ));
    }
    lines.join("\n")
}

// ── Profile ──────────────────────────────────────────────

pub fn payment_details(details: Option<&PaymentDetails>) -> String {
    let Some(d) = details else {
        return "No payment details saved.".to_string();
    };
    let mut lines = vec![format!("Address: {}", d.address_line1)];
    if let Some(line2) = d.address_line2.as_deref().filter(|l| !l.is_empty()) {
        lines.push(format!("         {line2}"));
    }
    lines.push(format!("         {}, {} {}", d.city, d.state, d.pincode));
    lines.push(format!("Bank account: {}", d.bank_account_number));
    lines.push(format!("IFSC: {}", d.ifsc));
    lines.join("\n")
}

pub fn notifications(list: &[Notification]) -> String {
    if list.is_empty() {
        return "No notifications.".to_string();
    }
    list.iter()
        .map(|n| {
            let marker = if n.read { " " } else { "*" };
            match &n.message {
                Some(message) => format!("{marker} {}  {}: {}", n.id, n.title, message),
                None => format!("{marker} {}  {}", n.id, n.title),
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tracker::resolve_all;
    use chrono::{Duration, Utc};
    use nitro_core::{ItemOutcome, PurchaseOverrides};
    use serde_json::json;

    fn allocation(value: serde_json::Value) -> nitro_core::Allocation {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn board_shows_banner_and_empty_state() {
        let text = board(&TrackingBoard {
            items: vec![],
            error: Some("upstream down".into()),
        });
        assert!(text.contains("Could not load your allocations: upstream down"));
        assert!(text.contains("No allocations yet."));
    }

    #[test]
    fn board_shows_one_status_and_prompt() {
        let now = Utc::now();
        let reserved_until = now + Duration::hours(2);
        let records = vec![allocation(json!({
            "id": "a1",
            "status": "RESERVED",
            "reserved_until": reserved_until,
            "project": { "id": "p1", "title": "Serum", "mode": "MARKETPLACE" }
        }))];
        let items = resolve_all(records, &HashMap::new(), &PurchaseOverrides::new(), now);
        let text = board(&TrackingBoard { items, error: None });

        assert!(text.starts_with("[Reserved] Serum (a1)  02:00:00  next: Confirm your purchase"));
        assert!(text.contains("nitro confirm-purchase a1"));
        assert!(!text.contains("[Purchased]"));
    }

    #[test]
    fn catalog_card_takes_strongest_record() {
        let projects: Vec<Project> = serde_json::from_value(json!([{
            "id": "p1", "title": "Serum", "mode": "D2C", "status": "published", "reward": 250.0,
            "products": [
                { "id": "x", "name": "Serum 30ml", "price": 499.0 },
                { "id": "y", "name": "Serum 50ml" }
            ]
        }]))
        .unwrap();
        let applications: Vec<Application> = serde_json::from_value(json!([
            { "id": "1", "project_id": "p1", "product_id": "x", "status": "APPROVED" },
            { "id": "2", "project_id": "p1", "product_id": "x", "status": "COMPLETED" }
        ]))
        .unwrap();

        let text = catalog(&projects, &applications);
        assert!(text.contains("x Serum 30ml ₹499.00  [Completed]"));
        assert!(text.contains("y Serum 50ml   [Apply]"));
        assert!(!text.contains("[Approved]"));
    }

    #[test]
    fn batches_normalise_pending() {
        let list: Vec<PayoutBatch> = serde_json::from_value(json!([
            { "id": "b1", "status": "PENDING", "payout_count": 3, "total_amount": 300.0 }
        ]))
        .unwrap();
        assert_eq!(batches(&list), "b1  IN_BATCH  3 payouts  ₹300.00  created -");
    }

    #[test]
    fn report_lists_each_problem() {
        let mut tally = BatchReport::new("submitted");
        tally.record("a", ItemOutcome::Succeeded);
        tally.record("b", ItemOutcome::AlreadyPending);
        tally.record("c", ItemOutcome::Failed("Out of stock".into()));
        assert_eq!(
            report(&tally),
            "1 submitted, 1 already pending, 1 failed\n  b: already requested\n  c: Out of stock\n1 of 3 can be retried."
        );

        let mut clean = BatchReport::new("marked paid");
        clean.record("p1", ItemOutcome::Succeeded);
        assert_eq!(report(&clean), "1 marked paid");
    }

    #[test]
    fn dashboard_greets_first_visit_and_isolates_failures() {
        let user: User = serde_json::from_value(json!({ "id": "u1", "role": "PARTICIPANT", "name": "Asha" })).unwrap();
        let text = dashboard(
            &user,
            &Dashboard {
                first_visit: true,
                profile: Section::Failed("profile down".into()),
                allocations: Section::Loaded(vec![]),
                catalog: Section::Loaded(vec![]),
                notifications: Section::Loaded(vec![]),
            },
        );
        assert!(text.starts_with("Welcome to Nitro, Asha!"));
        assert!(text.contains("Profile: unavailable (profile down)"));
        assert!(text.contains("Active tasks: 0"));
    }
}
