//! Actions that fan out to one backend call per item. Calls run
//! concurrently; every item lands in the [`BatchReport`].

use std::future::Future;

use nitro_core::validation::validate_application;
use nitro_core::{BatchReport, ItemOutcome, PaymentDetails};
use tokio::task::JoinSet;
use tracing::{info, warn};

use crate::accessors::{payouts, projects};
use crate::errors::{ClientError, Result};
use crate::http::ApiClient;

fn outcome_of<T>(result: Result<T>) -> ItemOutcome {
    match result {
        Ok(_) => ItemOutcome::Succeeded,
        Err(e) if e.is_already_pending() => ItemOutcome::AlreadyPending,
        Err(e) => ItemOutcome::Failed(e.to_string()),
    }
}

async fn run_all<F, Fut, T>(verb: &'static str, keys: Vec<String>, call: F) -> Result<BatchReport<String>>
where
    F: Fn(String) -> Fut,
    Fut: Future<Output = Result<T>> + Send + 'static,
    T: Send + 'static,
{
    let mut set = JoinSet::new();
    for key in keys {
        let fut = call(key.clone());
        set.spawn(async move { (key, fut.await) });
    }

    let mut report = BatchReport::new(verb);
    let mut expired = false;
    while let Some(joined) = set.join_next().await {
        match joined {
            Ok((key, result)) => {
                expired |= matches!(result, Err(ClientError::Unauthorized));
                report.record(key, outcome_of(result));
            }
            Err(e) => warn!("Batch task failed to complete: {e}"),
        }
    }
    if expired {
        return Err(ClientError::Unauthorized);
    }
    report.succeeded.sort();
    report.already_pending.sort();
    report.failed.sort();
    Ok(report)
}

/// Apply for each product of `project_id`. Payment details and the
/// selection are checked before any request is sent.
pub async fn apply_to_products(
    api: &ApiClient,
    project_id: &str,
    product_ids: &[String],
    details: Option<&PaymentDetails>,
) -> Result<BatchReport<String>> {
    validate_application(product_ids, details)?;

    let project_id = project_id.to_string();
    let report = run_all("submitted", product_ids.to_vec(), |product_id| {
        let api = api.clone();
        let project_id = project_id.clone();
        async move { projects::apply_for_project(&api, &project_id, &product_id).await }
    })
    .await?;
    info!("Applications for {project_id}: {report}");
    Ok(report)
}

pub async fn mark_payouts_paid(api: &ApiClient, payout_ids: &[String]) -> Result<BatchReport<String>> {
    let report = run_all("marked paid", payout_ids.to_vec(), |payout_id| {
        let api = api.clone();
        async move { payouts::mark_paid(&api, &payout_id).await }
    })
    .await?;
    info!("Mark paid: {report}");
    Ok(report)
}
