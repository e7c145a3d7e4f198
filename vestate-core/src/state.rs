//! Lifecycle states and the value/error/state tuple.
//!
//! An asynchronous operation observed by this crate is always in exactly one
//! of four [`PState`]s. [`ValueErrorState`] bundles that state with the value
//! to show and, only when rejected, the error.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Lifecycle state of an observed asynchronous operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PState {
    /// No operation has been triggered, or the holder has been reset.
    #[default]
    Ready,
    /// An operation has been triggered but has not settled.
    Loading,
    /// The operation has been fulfilled.
    Fulfilled,
    /// The operation has been rejected.
    Rejected,
}

impl PState {
    /// Returns the state as a string slice.
    #[inline]
    pub const fn as_str(&self) -> &'static str {
        match self {
            PState::Ready => "ready",
            PState::Loading => "loading",
            PState::Fulfilled => "fulfilled",
            PState::Rejected => "rejected",
        }
    }

    /// Returns `true` for [`PState::Ready`].
    #[inline]
    pub const fn is_ready(self) -> bool {
        matches!(self, PState::Ready)
    }

    /// Returns `true` for [`PState::Loading`].
    #[inline]
    pub const fn is_loading(self) -> bool {
        matches!(self, PState::Loading)
    }

    /// Returns `true` for [`PState::Ready`] or [`PState::Loading`].
    #[inline]
    pub const fn is_pending(self) -> bool {
        self.is_ready() || self.is_loading()
    }

    /// Returns `true` for [`PState::Fulfilled`].
    #[inline]
    pub const fn is_fulfilled(self) -> bool {
        matches!(self, PState::Fulfilled)
    }

    /// Returns `true` for [`PState::Rejected`].
    #[inline]
    pub const fn is_rejected(self) -> bool {
        matches!(self, PState::Rejected)
    }

    /// Returns `true` for [`PState::Fulfilled`] or [`PState::Rejected`].
    #[inline]
    pub const fn is_settled(self) -> bool {
        self.is_fulfilled() || self.is_rejected()
    }
}

impl fmt::Display for PState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Checks if `state` is [`PState::Ready`].
pub const fn is_ready(state: PState) -> bool {
    state.is_ready()
}

/// Checks if `state` is [`PState::Loading`].
pub const fn is_loading(state: PState) -> bool {
    state.is_loading()
}

/// Checks if `state` is [`PState::Ready`] or [`PState::Loading`].
pub const fn is_pending(state: PState) -> bool {
    state.is_pending()
}

/// Checks if `state` is [`PState::Fulfilled`].
pub const fn is_fulfilled(state: PState) -> bool {
    state.is_fulfilled()
}

/// Checks if `state` is [`PState::Rejected`].
pub const fn is_rejected(state: PState) -> bool {
    state.is_rejected()
}

/// Checks if `state` is [`PState::Fulfilled`] or [`PState::Rejected`].
pub const fn is_settled(state: PState) -> bool {
    state.is_settled()
}

/// A value, a potential error and the current [`PState`] of an operation,
/// treated and updated as a single value.
///
/// Only four shapes exist, one per state, and the error is present if and
/// only if the state is [`PState::Rejected`].
///
/// The value carried by each variant means:
///
/// - `Ready`: the initial value of the holder.
/// - `Loading`: the value to show while loading, usually the previous value.
/// - `Fulfilled`: the value the operation settled with.
/// - `Rejected`: usually the initial value, not something derived from the
///   failed operation.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ValueErrorState<T, E> {
    /// The operation has not been triggered.
    Ready(T),
    /// The operation has been triggered but has not settled.
    Loading(T),
    /// The operation has been fulfilled.
    Fulfilled(T),
    /// The operation has been rejected with the given error.
    Rejected(T, E),
}

impl<T, E> ValueErrorState<T, E> {
    /// Returns the lifecycle state of this tuple.
    #[inline]
    pub const fn state(&self) -> PState {
        match self {
            ValueErrorState::Ready(_) => PState::Ready,
            ValueErrorState::Loading(_) => PState::Loading,
            ValueErrorState::Fulfilled(_) => PState::Fulfilled,
            ValueErrorState::Rejected(_, _) => PState::Rejected,
        }
    }

    /// Returns the value carried in any state.
    #[inline]
    pub fn value(&self) -> &T {
        match self {
            ValueErrorState::Ready(value)
            | ValueErrorState::Loading(value)
            | ValueErrorState::Fulfilled(value)
            | ValueErrorState::Rejected(value, _) => value,
        }
    }

    /// Returns the error, which is only present in [`PState::Rejected`].
    #[inline]
    pub fn error(&self) -> Option<&E> {
        match self {
            ValueErrorState::Rejected(_, error) => Some(error),
            _ => None,
        }
    }

    /// Splits the tuple into `(value, error, state)`.
    pub fn into_parts(self) -> (T, Option<E>, PState) {
        let state = self.state();
        match self {
            ValueErrorState::Ready(value)
            | ValueErrorState::Loading(value)
            | ValueErrorState::Fulfilled(value) => (value, None, state),
            ValueErrorState::Rejected(value, error) => (value, Some(error), state),
        }
    }

    /// Returns `true` if the state is [`PState::Ready`].
    #[inline]
    pub const fn is_ready(&self) -> bool {
        self.state().is_ready()
    }

    /// Returns `true` if the state is [`PState::Loading`].
    #[inline]
    pub const fn is_loading(&self) -> bool {
        self.state().is_loading()
    }

    /// Returns `true` if the state is [`PState::Ready`] or [`PState::Loading`].
    #[inline]
    pub const fn is_pending(&self) -> bool {
        self.state().is_pending()
    }

    /// Returns `true` if the state is [`PState::Fulfilled`].
    #[inline]
    pub const fn is_fulfilled(&self) -> bool {
        self.state().is_fulfilled()
    }

    /// Returns `true` if the state is [`PState::Rejected`].
    #[inline]
    pub const fn is_rejected(&self) -> bool {
        self.state().is_rejected()
    }

    /// Returns `true` if the state is [`PState::Fulfilled`] or [`PState::Rejected`].
    #[inline]
    pub const fn is_settled(&self) -> bool {
        self.state().is_settled()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: [PState; 4] = [
        PState::Ready,
        PState::Loading,
        PState::Fulfilled,
        PState::Rejected,
    ];

    #[test]
    fn test_exactly_one_base_predicate_holds() {
        for state in ALL {
            let held = [
                is_ready(state),
                is_loading(state),
                is_fulfilled(state),
                is_rejected(state),
            ]
            .into_iter()
            .filter(|held| *held)
            .count();
            assert_eq!(held, 1, "{state} matched {held} base predicates");
        }
    }

    #[test]
    fn test_pending_and_settled_are_complementary() {
        for state in ALL {
            assert_eq!(is_pending(state), is_ready(state) || is_loading(state));
            assert_eq!(is_settled(state), is_fulfilled(state) || is_rejected(state));
            assert_ne!(is_pending(state), is_settled(state));
        }
    }

    #[test]
    fn test_ready() {
        let tuple = ValueErrorState::<_, &str>::Ready(vec![1]);
        assert_eq!(tuple.value(), &vec![1]);
        assert_eq!(tuple.error(), None);
        assert!(tuple.is_ready());
        assert!(tuple.is_pending());
        assert!(!tuple.is_settled());
    }

    #[test]
    fn test_loading() {
        let tuple = ValueErrorState::<_, &str>::Loading(7);
        assert_eq!(tuple.value(), &7);
        assert_eq!(tuple.error(), None);
        assert!(tuple.is_loading());
        assert!(tuple.is_pending());
        assert!(!tuple.is_settled());
    }

    #[test]
    fn test_fulfilled() {
        let tuple = ValueErrorState::<_, &str>::Fulfilled("done");
        assert_eq!(tuple.value(), &"done");
        assert_eq!(tuple.error(), None);
        assert!(tuple.is_fulfilled());
        assert!(tuple.is_settled());
        assert!(!tuple.is_pending());
    }

    #[test]
    fn test_rejected() {
        let tuple = ValueErrorState::Rejected((), "no way");
        assert_eq!(tuple.value(), &());
        assert_eq!(tuple.error(), Some(&"no way"));
        assert!(tuple.is_rejected());
        assert!(tuple.is_settled());
        assert!(!tuple.is_pending());
    }

    #[test]
    fn test_value_may_be_absent() {
        let tuple = ValueErrorState::<Option<u8>, Option<u8>>::Rejected(None, None);
        assert_eq!(tuple.into_parts(), (None, Some(None), PState::Rejected));
    }

    #[test]
    fn test_state_serializes_lowercase() {
        let json = serde_json::to_string(&PState::Fulfilled).unwrap();
        assert_eq!(json, "\"fulfilled\"");
        let state: PState = serde_json::from_str("\"loading\"").unwrap();
        assert_eq!(state, PState::Loading);
    }
}
