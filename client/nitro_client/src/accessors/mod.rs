//! One function per backend endpoint, grouped by domain.
//!
//! Accessors only shape requests (paths, query defaults, multipart fields).
//! They never catch errors; the calling view decides how to present them.

pub mod allocations;
pub mod notifications;
pub mod payouts;
pub mod projects;
pub mod users;
pub mod verification;

/// Append `key=value` to a query list when `value` is present.
pub(crate) fn push_opt(query: &mut Vec<(&'static str, String)>, key: &'static str, value: Option<&str>) {
    if let Some(value) = value {
        query.push((key, value.to_string()));
    }
}
