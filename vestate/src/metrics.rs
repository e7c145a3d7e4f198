//! Metrics declaration and recording.

use vestate_core::PState;

#[cfg(feature = "metrics")]
use lazy_static::lazy_static;

#[cfg(feature = "metrics")]
lazy_static! {
    /// Track number of state transitions per target state.
    pub static ref STATE_TRANSITIONS: &'static str = {
        metrics::describe_counter!(
            "vestate_transitions_total",
            "Total number of value/error/state transitions."
        );
        "vestate_transitions_total"
    };
    /// Track number of settlements that were not allowed to change state.
    pub static ref IGNORED_SETTLEMENTS: &'static str = {
        metrics::describe_counter!(
            "vestate_ignored_settlements_total",
            "Total number of operation results discarded as stale."
        );
        "vestate_ignored_settlements_total"
    };
    /// Track number of subjects materialized.
    pub static ref SUBJECTS_CREATED: &'static str = {
        metrics::describe_counter!(
            "vestate_subjects_created_total",
            "Total number of subjects created for subscribable holders."
        );
        "vestate_subjects_created_total"
    };
}

/// Record a transition into `state`.
#[cfg(feature = "metrics")]
#[inline]
pub fn record_transition(state: PState) {
    metrics::counter!(*STATE_TRANSITIONS, "state" => state.as_str()).increment(1);
}

/// Record a settlement of `driver` that left the state untouched.
#[cfg(feature = "metrics")]
#[inline]
pub fn record_ignored_settlement(driver: &'static str) {
    metrics::counter!(*IGNORED_SETTLEMENTS, "driver" => driver).increment(1);
}

/// Record the lazy creation of a subject.
#[cfg(feature = "metrics")]
#[inline]
pub fn record_subject_created() {
    metrics::counter!(*SUBJECTS_CREATED).increment(1);
}

/// No-op version when metrics feature is disabled.
#[cfg(not(feature = "metrics"))]
#[inline]
pub fn record_transition(_state: PState) {}

/// No-op version when metrics feature is disabled.
#[cfg(not(feature = "metrics"))]
#[inline]
pub fn record_ignored_settlement(_driver: &'static str) {}

/// No-op version when metrics feature is disabled.
#[cfg(not(feature = "metrics"))]
#[inline]
pub fn record_subject_created() {}
