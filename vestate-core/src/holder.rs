//! Synchronous ownership of the current [`ValueErrorState`].

use std::fmt;
use std::sync::Arc;

use crate::state::{PState, ValueErrorState};

/// Shared, immutable value/error/state tuple.
///
/// Tuples are handed out behind an [`Arc`] so consumers can compare them by
/// reference with [`Arc::ptr_eq`]: a tuple only changes identity when the
/// holder transitions.
pub type SharedState<T, E> = Arc<ValueErrorState<T, E>>;

/// Read access and the single mutation path for a holder of
/// [`ValueErrorState`] tuples.
///
/// Implementors provide storage through the required methods. Every accessor
/// and [`reset`](ValueErrorStates::reset) is derived from them, so a holder
/// that needs extra behaviour on mutation only overrides
/// [`set_state`](ValueErrorStates::set_state).
pub trait ValueErrorStates<T, E> {
    /// The value the holder was created with.
    fn initial(&self) -> &T;

    /// The cached `Ready(initial)` tuple, reused by every reset.
    fn ready(&self) -> &SharedState<T, E>;

    /// The current tuple.
    fn value_error_state(&self) -> &SharedState<T, E>;

    /// Replaces the current tuple with `next` and returns it.
    ///
    /// No transition is validated here. Callers are responsible for only
    /// moving between states in a meaningful order.
    fn set_state(&mut self, next: impl Into<SharedState<T, E>>) -> SharedState<T, E>;

    /// Resets the current tuple to [`ready`](ValueErrorStates::ready).
    fn reset(&mut self) -> SharedState<T, E> {
        let ready = Arc::clone(self.ready());
        self.set_state(ready)
    }

    /// The current value, `initial` until another value is available.
    fn value<'a>(&'a self) -> &'a T
    where
        E: 'a,
    {
        self.value_error_state().value()
    }

    /// The current error in [`PState::Rejected`], otherwise `None`.
    fn error<'a>(&'a self) -> Option<&'a E>
    where
        T: 'a,
    {
        self.value_error_state().error()
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

/// Owns the current [`ValueErrorState`] of one logical value.
///
/// Created in [`PState::Ready`] with an initial value that never changes for
/// the lifetime of the holder.
pub struct StateHolder<T, E> {
    initial: T,
    ready: SharedState<T, E>,
    current: SharedState<T, E>,
}

impl<T, E> StateHolder<T, E>
where
    T: Clone,
{
    /// Creates a holder in `Ready(initial)`.
    pub fn new(initial: T) -> Self {
        let ready = Arc::new(ValueErrorState::Ready(initial.clone()));
        Self {
            initial,
            current: Arc::clone(&ready),
            ready,
        }
    }
}

impl<T, E> ValueErrorStates<T, E> for StateHolder<T, E> {
    fn initial(&self) -> &T {
        &self.initial
    }

    fn ready(&self) -> &SharedState<T, E> {
        &self.ready
    }

    fn value_error_state(&self) -> &SharedState<T, E> {
        &self.current
    }

    fn set_state(&mut self, next: impl Into<SharedState<T, E>>) -> SharedState<T, E> {
        self.current = next.into();
        Arc::clone(&self.current)
    }
}

impl<T, E> fmt::Debug for StateHolder<T, E>
where
    T: fmt::Debug,
    E: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StateHolder")
            .field("initial", &self.initial)
            .field("current", &self.current)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_starts_ready_with_initial_value() {
        let holder = StateHolder::<Vec<u8>, String>::new(Vec::new());

        assert!(holder.value().is_empty());
        assert_eq!(holder.error(), None);
        assert_eq!(holder.state(), PState::Ready);
        assert!(Arc::ptr_eq(holder.value_error_state(), holder.ready()));
        assert!(holder.is_ready());
        assert!(holder.is_pending());
        assert!(!holder.is_settled());
    }

    #[test]
    fn test_unit_initial_value() {
        let holder = StateHolder::<(), ()>::new(());
        assert_eq!(holder.value(), &());
    }

    #[test]
    fn test_loading_and_back() {
        let mut holder = StateHolder::<u32, &str>::new(0);

        let returned = holder.set_state(ValueErrorState::Loading(1));

        assert!(Arc::ptr_eq(holder.value_error_state(), &returned));
        assert_eq!(holder.value(), &1);
        assert!(holder.is_loading());
        assert!(holder.is_pending());
        assert!(!holder.is_settled());

        holder.reset();

        assert!(Arc::ptr_eq(holder.value_error_state(), holder.ready()));
        assert!(holder.is_pending());
        assert!(!holder.is_settled());
    }

    #[test]
    fn test_fulfilled_and_back() {
        let mut holder = StateHolder::<u32, &str>::new(0);

        let returned = holder.set_state(ValueErrorState::Fulfilled(1));

        assert!(Arc::ptr_eq(holder.value_error_state(), &returned));
        assert_eq!(holder.value(), &1);
        assert!(holder.is_fulfilled());
        assert!(holder.is_settled());
        assert!(!holder.is_pending());

        holder.reset();

        assert!(Arc::ptr_eq(holder.value_error_state(), holder.ready()));
        assert!(holder.is_ready());
    }

    #[test]
    fn test_rejected_and_back() {
        let mut holder = StateHolder::<u32, &str>::new(0);

        let returned = holder.set_state(ValueErrorState::Rejected(1, "reason"));

        assert!(Arc::ptr_eq(holder.value_error_state(), &returned));
        assert_eq!(holder.value(), &1);
        assert_eq!(holder.error(), Some(&"reason"));
        assert!(holder.is_rejected());
        assert!(holder.is_settled());
        assert!(!holder.is_pending());

        holder.reset();

        assert!(holder.is_pending());
        assert!(!holder.is_settled());
    }

    #[test]
    fn test_reset_always_returns_the_same_tuple() {
        let mut holder = StateHolder::<u32, ()>::new(5);
        let ready = Arc::clone(holder.ready());

        let first = holder.reset();
        holder.set_state(ValueErrorState::Fulfilled(6));
        let second = holder.reset();

        assert!(Arc::ptr_eq(&first, &ready));
        assert!(Arc::ptr_eq(&second, &ready));
        assert_eq!(*second, ValueErrorState::Ready(5));
    }

    #[test]
    fn test_set_state_accepts_shared_tuple() {
        let mut holder = StateHolder::<u32, ()>::new(0);
        let shared = Arc::new(ValueErrorState::Loading(3));

        let returned = holder.set_state(Arc::clone(&shared));

        assert!(Arc::ptr_eq(&returned, &shared));
    }

    fn snapshot<'h, T, E, H>(holder: &'h H) -> (&'h T, Option<&'h E>)
    where
        H: ValueErrorStates<T, E>,
    {
        (holder.value(), holder.error())
    }

    #[test]
    fn test_accessors_through_generic_holder() {
        let reason = String::from("borrowed reason");
        let mut holder = StateHolder::<u32, &str>::new(0);
        holder.set_state(ValueErrorState::Rejected(2, reason.as_str()));

        let (value, error) = snapshot(&holder);

        assert_eq!(value, &2);
        assert_eq!(error, Some(&"borrowed reason"));
    }
}
