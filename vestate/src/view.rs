//! Snapshot accessors shared by the drivers.

use vestate_core::{PState, SharedState};

/// Synchronous, snapshot-based read access to a driver's current state.
///
/// Drivers are shared handles, so each accessor takes a snapshot of the
/// current tuple. Two accessor calls may observe different tuples if an
/// operation settles in between; read
/// [`value_error_state`](StateView::value_error_state) once to get a
/// consistent value, error and state.
pub trait StateView<T, E> {
    /// The current tuple.
    fn value_error_state(&self) -> SharedState<T, E>;

    /// The cached `Ready(initial)` tuple, reused by every reset.
    fn ready(&self) -> SharedState<T, E>;

    /// The current value, `initial` until another value is available.
    fn value(&self) -> T
    where
        T: Clone,
    {
        self.value_error_state().value().clone()
    }

    /// The value the driver was created with.
    fn initial(&self) -> T
    where
        T: Clone,
    {
        self.ready().value().clone()
    }

    /// The current error in [`PState::Rejected`], otherwise `None`.
    fn error(&self) -> Option<E>
    where
        E: Clone,
    {
        self.value_error_state().error().cloned()
    }

    /// The current [`PState`].
    fn state(&self) -> PState {
        self.value_error_state().state()
    }

    /// Whether the current state is [`PState::Ready`].
    fn is_ready(&self) -> bool {
        self.state().is_ready()
    }

    /// Whether the current state is [`PState::Loading`].
    fn is_loading(&self) -> bool {
        self.state().is_loading()
    }

    /// Whether the current state is [`PState::Ready`] or [`PState::Loading`].
    fn is_pending(&self) -> bool {
        self.state().is_pending()
    }

    /// Whether the current state is [`PState::Fulfilled`].
    fn is_fulfilled(&self) -> bool {
        self.state().is_fulfilled()
    }

    /// Whether the current state is [`PState::Rejected`].
    fn is_rejected(&self) -> bool {
        self.state().is_rejected()
    }

    /// Whether the current state is [`PState::Fulfilled`] or [`PState::Rejected`].
    fn is_settled(&self) -> bool {
        self.state().is_settled()
    }
}
