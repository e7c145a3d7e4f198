//! A state holder that broadcasts every transition to subscribers.

use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, trace};
use vestate_core::{SharedState, StateHolder, Subject, SubjectFactory, ValueErrorStates};

use crate::config::SubjectConfig;
use crate::metrics;

/// A [`StateHolder`] whose transitions can be subscribed to.
///
/// The subject is created lazily, through the injected [`SubjectFactory`],
/// the first time [`subject`](SubscribableStateHolder::subject) is called.
/// It is seeded with the tuple current at that moment and is never
/// recreated afterwards. Until then transitions are not pushed anywhere and
/// no subject is allocated.
pub struct SubscribableStateHolder<T, E, F = SubjectConfig>
where
    F: SubjectFactory<SharedState<T, E>>,
{
    holder: StateHolder<T, E>,
    factory: F,
    subject: Option<Arc<F::Subject>>,
    outbox: VecDeque<SharedState<T, E>>,
    delivering: bool,
}

impl<T, E> SubscribableStateHolder<T, E>
where
    T: Clone + Send + Sync + 'static,
    E: Send + Sync + 'static,
{
    /// Creates a holder in `Ready(initial)` using the default [`SubjectConfig`].
    pub fn new(initial: T) -> Self {
        Self::with_factory(initial, SubjectConfig::default())
    }
}

impl<T, E, F> SubscribableStateHolder<T, E, F>
where
    T: Clone,
    F: SubjectFactory<SharedState<T, E>>,
{
    /// Creates a holder in `Ready(initial)` that builds its subject with `factory`.
    pub fn with_factory(initial: T, factory: F) -> Self {
        Self {
            holder: StateHolder::new(initial),
            factory,
            subject: None,
            outbox: VecDeque::new(),
            delivering: false,
        }
    }
}

impl<T, E, F> SubscribableStateHolder<T, E, F>
where
    F: SubjectFactory<SharedState<T, E>>,
{
    /// Returns the subject notified about every change of the current tuple.
    ///
    /// Calling this repeatedly returns the same subject. Depending on the
    /// factory, subscribing might replay the current tuple or not; when it
    /// does not, read [`value_error_state`](ValueErrorStates::value_error_state)
    /// after subscribing to get the current one.
    pub fn subject(&mut self) -> Arc<F::Subject> {
        if let Some(subject) = &self.subject {
            return Arc::clone(subject);
        }
        let seed = Arc::clone(self.holder.value_error_state());
        debug!(state = %seed.state(), "creating subject");
        metrics::record_subject_created();
        let subject = Arc::new(self.factory.create(seed));
        self.subject = Some(Arc::clone(&subject));
        subject
    }

    /// Returns `true` once the subject has been created.
    pub fn has_subject(&self) -> bool {
        self.subject.is_some()
    }

    /// Switches to `next` like [`set_state`](ValueErrorStates::set_state),
    /// but queues the push instead of notifying the subject right away.
    ///
    /// Queued tuples are pushed by [`deliver_queued`] once the caller has
    /// released its lock.
    pub(crate) fn set_state_queued(
        &mut self,
        next: impl Into<SharedState<T, E>>,
    ) -> SharedState<T, E> {
        let next = self.apply(next);
        if self.subject.is_some() {
            self.outbox.push_back(Arc::clone(&next));
        }
        next
    }

    /// Queued counterpart of [`reset`](ValueErrorStates::reset).
    pub(crate) fn reset_queued(&mut self) -> SharedState<T, E> {
        let ready = Arc::clone(self.holder.ready());
        self.set_state_queued(ready)
    }

    fn apply(&mut self, next: impl Into<SharedState<T, E>>) -> SharedState<T, E> {
        let next = self.holder.set_state(next);
        trace!(state = %next.state(), "state transition");
        metrics::record_transition(next.state());
        next
    }

    fn claim_delivery(&mut self) -> Option<Arc<F::Subject>> {
        if self.delivering || self.outbox.is_empty() {
            return None;
        }
        let subject = self.subject.as_ref().map(Arc::clone)?;
        self.delivering = true;
        Some(subject)
    }

    fn next_queued(&mut self) -> Option<SharedState<T, E>> {
        let next = self.outbox.pop_front();
        if next.is_none() {
            self.delivering = false;
        }
        next
    }
}

/// Pushes every tuple queued in the holder behind `lock`, in order, without
/// holding the lock while the subject runs.
///
/// Only one caller delivers at a time. A caller that finds delivery in
/// progress returns immediately and its tuples are pushed by the caller
/// already delivering, including when a subscriber changes the state from
/// within a push.
pub(crate) fn deliver_queued<S, T, E, F>(lock: &Mutex<S>)
where
    S: AsMut<SubscribableStateHolder<T, E, F>>,
    F: SubjectFactory<SharedState<T, E>>,
{
    let subject = {
        let mut slot = lock.lock();
        slot.as_mut().claim_delivery()
    };
    let Some(subject) = subject else {
        return;
    };
    loop {
        let next = {
            let mut slot = lock.lock();
            slot.as_mut().next_queued()
        };
        match next {
            Some(next) => subject.next(next),
            None => break,
        }
    }
}

impl<T, E, F> ValueErrorStates<T, E> for SubscribableStateHolder<T, E, F>
where
    F: SubjectFactory<SharedState<T, E>>,
{
    fn initial(&self) -> &T {
        self.holder.initial()
    }

    fn ready(&self) -> &SharedState<T, E> {
        self.holder.ready()
    }

    fn value_error_state(&self) -> &SharedState<T, E> {
        self.holder.value_error_state()
    }

    fn set_state(&mut self, next: impl Into<SharedState<T, E>>) -> SharedState<T, E> {
        let next = self.apply(next);
        if let Some(subject) = &self.subject {
            subject.next(Arc::clone(&next));
        }
        next
    }
}

impl<T, E, F> fmt::Debug for SubscribableStateHolder<T, E, F>
where
    T: fmt::Debug,
    E: fmt::Debug,
    F: SubjectFactory<SharedState<T, E>>,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SubscribableStateHolder")
            .field("holder", &self.holder)
            .field("subject", &self.subject.is_some())
            .field("queued", &self.outbox.len())
            .finish()
    }
}
