//! Push/subscribe capability used to broadcast state changes.
//!
//! The core never implements a subject itself. A subscribable holder receives
//! a [`SubjectFactory`] and only invokes it when a consumer asks for the
//! subscribable view, seeding the new subject with the tuple current at
//! that moment.

/// Observer and subscribable in one: values are pushed with
/// [`next`](Subject::next) and observed through subscriptions.
///
/// Whether a new subscription replays the most recent value depends on the
/// implementation. Subscribers of a non-replaying subject that need the
/// current value immediately have to read it from the holder separately.
pub trait Subject<T>: Send + Sync {
    /// Handle of a single subscription. Dropping it cancels the subscription.
    type Subscription;

    /// Pushes `value` to every active subscription.
    ///
    /// Implementations may call observers synchronously. Holders shared
    /// behind a lock push only after releasing it, so an observer may read
    /// the holder it is subscribed to.
    fn next(&self, value: T);

    /// Registers a new subscription.
    fn subscribe(&self) -> Self::Subscription;
}

/// Creates a [`Subject`] seeded with the current value.
///
/// A factory for a replaying subject should make `seed` the most recent
/// value, so late subscribers observe it.
pub trait SubjectFactory<T>: Send + Sync {
    /// Subject type produced by this factory.
    type Subject: Subject<T>;

    /// Creates a new subject seeded with `seed`.
    fn create(&self, seed: T) -> Self::Subject;
}

impl<T, S, F> SubjectFactory<T> for F
where
    F: Fn(T) -> S + Send + Sync,
    S: Subject<T>,
{
    type Subject = S;

    fn create(&self, seed: T) -> S {
        (self)(seed)
    }
}
