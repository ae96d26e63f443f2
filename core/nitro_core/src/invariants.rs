#![allow(dead_code)]

use crate::status::{AllocationView, Countdown};
use crate::types::AllocationStatus;

/// A local confirmation may lift RESERVED to PURCHASED and nothing else.
pub fn assert_override_moves_forward_only(view: &AllocationView) {
    match (view.server_status, view.displayed_status) {
        (server, shown) if server == shown => {}
        (AllocationStatus::Reserved, AllocationStatus::Purchased) => {}
        (server, shown) => panic!(
            "allocation {} displayed {:?} for server status {:?}",
            view.allocation_id, shown, server
        ),
    }
}

/// A finished flow or a completed allocation never shows a ticking clock.
pub fn assert_countdown_frozen_when_done(view: &AllocationView) {
    if view.progress.required_flow_completed || view.server_status == AllocationStatus::Completed {
        assert_eq!(
            view.countdown,
            Countdown::Frozen,
            "allocation {} still counting down after completion",
            view.allocation_id
        );
    }
}

/// The countdown never increases between two later observations.
pub fn assert_countdown_monotonic(earlier: &AllocationView, later: &AllocationView) {
    match (earlier.countdown.remaining(), later.countdown.remaining()) {
        (Some(a), Some(b)) => assert!(
            b <= a,
            "allocation {} countdown went from {a} to {b}",
            earlier.allocation_id
        ),
        (None, None) => {}
        (a, b) => panic!("countdown changed boundedness: {a:?} -> {b:?}"),
    }
}

pub fn assert_all(view: &AllocationView) {
    assert_override_moves_forward_only(view);
    assert_countdown_frozen_when_done(view);
}
