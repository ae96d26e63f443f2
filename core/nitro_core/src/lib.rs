//! # Nitro core
//!
//! Domain model for the Nitro sampling marketplace client. Brands publish
//! campaigns, participants apply for products, and each approved set of
//! products becomes an allocation the participant works through:
//!
//! | Stage     | Participant action             | Module                 |
//! |-----------|--------------------------------|------------------------|
//! | Catalog   | request access, apply          | [`status::resolve_card`] |
//! | Purchase  | confirm purchase               | [`status`]             |
//! | Evidence  | upload invoice, submit review  | [`status`]             |
//! | Feedback  | MARKETPLACE campaigns only     | [`status`]             |
//! | Payout    | admin batches and marks paid   | [`batch`]              |
//!
//! Navigation decisions live in [`routing`]; pre-submit checks in
//! [`validation`].
//!
//! This crate performs no I/O. The backend is authoritative for every
//! record; the functions here only derive what to display and what to do
//! next.

pub mod batch;
pub mod routing;
pub mod status;
pub mod types;
pub mod validation;

#[cfg(test)]
mod invariants;
#[cfg(test)]
mod test_routing;
#[cfg(test)]
mod test_status;

pub use batch::{BatchReport, ItemOutcome};
pub use routing::{GuardState, Navigation, Route};
pub use status::{AllocationView, CardLabel, Countdown, NextStep, PurchaseOverrides};
pub use types::*;
pub use validation::ValidationError;
