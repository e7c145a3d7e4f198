//! Latest-wins driver for independently created operations.
//!
//! [`LatestWins`] reflects a series of operations that only share their
//! output type. Every call to [`adopt`](LatestWins::adopt) makes the given
//! operation the current one; only the current operation may write its
//! result once it settles. Results of superseded operations, or of an
//! operation adopted before a [`reset`](LatestWins::reset), are discarded.

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use futures::FutureExt;
use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tracing::{Instrument, debug, info_span};
use vestate_core::{
    OperationId, OperationIds, SharedState, Subject, SubjectFactory, ValueErrorState,
    ValueErrorStates,
};

use crate::Settlement;
use crate::config::SubjectConfig;
use crate::metrics;
use crate::subscribable::{self, SubscribableStateHolder};
use crate::view::StateView;

/// Callback invoked with the error of the current operation before the
/// holder switches to `Rejected`.
pub type OnSettleError<E> = Box<dyn FnOnce(&E) + Send>;

/// Options for [`LatestWins::adopt_with`].
pub struct AdoptOptions<T, E> {
    loading_value: Option<T>,
    on_settle_error: Option<OnSettleError<E>>,
}

impl<T, E> AdoptOptions<T, E> {
    /// Creates options with the defaults: keep the current value while
    /// loading, no error callback.
    pub fn new() -> Self {
        Self {
            loading_value: None,
            on_settle_error: None,
        }
    }

    /// Value to show while the operation is loading.
    pub fn loading_value(self, value: T) -> Self {
        Self {
            loading_value: Some(value),
            ..self
        }
    }

    /// Callback invoked with the error when the operation rejects while
    /// still being current.
    ///
    /// The callback runs while the driver's state is locked and must not
    /// access the driver.
    pub fn on_settle_error(self, callback: impl FnOnce(&E) + Send + 'static) -> Self {
        Self {
            on_settle_error: Some(Box::new(callback)),
            ..self
        }
    }
}

impl<T, E> Default for AdoptOptions<T, E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T, E> fmt::Debug for AdoptOptions<T, E>
where
    T: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AdoptOptions")
            .field("loading_value", &self.loading_value)
            .field("on_settle_error", &self.on_settle_error.is_some())
            .finish()
    }
}

struct LatestSlot<T, E, F>
where
    F: SubjectFactory<SharedState<T, E>>,
{
    holder: SubscribableStateHolder<T, E, F>,
    current: Option<OperationId>,
}

impl<T, E, F> AsMut<SubscribableStateHolder<T, E, F>> for LatestSlot<T, E, F>
where
    F: SubjectFactory<SharedState<T, E>>,
{
    fn as_mut(&mut self) -> &mut SubscribableStateHolder<T, E, F> {
        &mut self.holder
    }
}

struct LatestWinsInner<T, E, F>
where
    F: SubjectFactory<SharedState<T, E>>,
{
    ids: OperationIds,
    slot: Mutex<LatestSlot<T, E, F>>,
}

/// Tracks the most recently adopted operation.
///
/// This is a cheap handle: clones share the same state.
pub struct LatestWins<T, E, F = SubjectConfig>
where
    F: SubjectFactory<SharedState<T, E>>,
{
    inner: Arc<LatestWinsInner<T, E, F>>,
}

impl<T, E, F> Clone for LatestWins<T, E, F>
where
    F: SubjectFactory<SharedState<T, E>>,
{
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T, E> LatestWins<T, E>
where
    T: Clone + Send + Sync + 'static,
    E: Clone + Send + Sync + 'static,
{
    /// Creates a driver in `Ready(initial)` using the default [`SubjectConfig`].
    pub fn new(initial: T) -> Self {
        Self::with_factory(initial, SubjectConfig::default())
    }
}

impl<T, E, F> LatestWins<T, E, F>
where
    T: Clone + Send + Sync + 'static,
    E: Clone + Send + Sync + 'static,
    F: SubjectFactory<SharedState<T, E>> + 'static,
{
    /// Creates a driver in `Ready(initial)` that builds its subject with `factory`.
    ///
    /// The factory runs while the driver's state is locked and must not
    /// access the driver. The subject itself is notified after the lock is
    /// released, so subscribers may read or drive the driver from within a
    /// push.
    pub fn with_factory(initial: T, factory: F) -> Self {
        Self {
            inner: Arc::new(LatestWinsInner {
                ids: OperationIds::new(),
                slot: Mutex::new(LatestSlot {
                    holder: SubscribableStateHolder::with_factory(initial, factory),
                    current: None,
                }),
            }),
        }
    }

    /// Adopts an already triggered operation as the current one.
    ///
    /// Before returning, the driver records the operation and switches to
    /// `Loading` with the current value. The returned [`Settlement`] waits
    /// for the operation and then:
    ///
    /// - resolves with the `Fulfilled` tuple if the operation is still
    ///   current and the driver is still loading,
    /// - switches to `Rejected(initial, error)` and resolves with the error
    ///   under the same condition,
    /// - otherwise leaves the state alone and resolves with the tuple that
    ///   is current at the time the operation settles.
    ///
    /// The operation only makes progress while the settlement is polled.
    /// Use [`spawn`](LatestWins::spawn) to drive it in the background.
    pub fn adopt<Fut>(&self, operation: Fut) -> Settlement<T, E>
    where
        Fut: Future<Output = Result<T, E>> + Send + 'static,
    {
        self.adopt_with(operation, AdoptOptions::default())
    }

    /// Same as [`adopt`](LatestWins::adopt) with explicit [`AdoptOptions`].
    pub fn adopt_with<Fut>(&self, operation: Fut, options: AdoptOptions<T, E>) -> Settlement<T, E>
    where
        Fut: Future<Output = Result<T, E>> + Send + 'static,
    {
        self.begin(operation, options).1
    }

    /// Adopts `operation` and drives its settlement on the tokio runtime.
    ///
    /// The switch to `Loading` happens before this returns, exactly as with
    /// [`adopt`](LatestWins::adopt).
    ///
    /// # Panics
    ///
    /// Panics when called outside of a tokio runtime.
    pub fn spawn<Fut>(&self, operation: Fut) -> JoinHandle<Result<SharedState<T, E>, E>>
    where
        Fut: Future<Output = Result<T, E>> + Send + 'static,
    {
        let (id, settlement) = self.begin(operation, AdoptOptions::default());
        let span = info_span!("vestate.settle", driver = "latest", operation = %id);
        tokio::spawn(settlement.instrument(span))
    }

    /// Resets to `Ready(initial)` and abandons the current operation.
    ///
    /// The abandoned operation keeps running, but its result no longer
    /// affects the state.
    pub fn reset(&self) -> SharedState<T, E> {
        let ready = {
            let mut slot = self.inner.slot.lock();
            if let Some(abandoned) = slot.current.take() {
                debug!(operation = %abandoned, "operation abandoned by reset");
            }
            slot.holder.reset_queued()
        };
        self.inner.deliver();
        ready
    }

    /// The operation currently honored, until it settles or is reset.
    pub fn current_operation(&self) -> Option<OperationId> {
        self.inner.slot.lock().current
    }

    /// Returns the subject notified about every state change.
    ///
    /// The subject is created on the first call and shared afterwards.
    pub fn subject(&self) -> Arc<F::Subject> {
        self.inner.slot.lock().holder.subject()
    }

    /// Subscribes to state changes.
    pub fn subscribe(&self) -> <F::Subject as Subject<SharedState<T, E>>>::Subscription {
        self.subject().subscribe()
    }

    fn begin<Fut>(
        &self,
        operation: Fut,
        options: AdoptOptions<T, E>,
    ) -> (OperationId, Settlement<T, E>)
    where
        Fut: Future<Output = Result<T, E>> + Send + 'static,
    {
        let id = self.inner.ids.next_id();
        {
            let mut slot = self.inner.slot.lock();
            if let Some(superseded) = slot.current.replace(id) {
                debug!(operation = %superseded, by = %id, "operation superseded");
            }
            let loading_value = match options.loading_value {
                Some(value) => value,
                None => slot.holder.value().clone(),
            };
            slot.holder.set_state_queued(ValueErrorState::Loading(loading_value));
        }
        debug!(operation = %id, "operation adopted");
        self.inner.deliver();

        let inner = Arc::clone(&self.inner);
        let on_settle_error = options.on_settle_error;
        let settlement = async move {
            let outcome = operation.await;
            inner.settle(id, outcome, on_settle_error)
        }
        .boxed();
        (id, settlement)
    }
}

impl<T, E, F> LatestWinsInner<T, E, F>
where
    T: Clone,
    E: Clone,
    F: SubjectFactory<SharedState<T, E>>,
{
    fn settle(
        &self,
        id: OperationId,
        outcome: Result<T, E>,
        on_settle_error: Option<OnSettleError<E>>,
    ) -> Result<SharedState<T, E>, E> {
        let settled = {
            let mut slot = self.slot.lock();
            let is_current = slot.current == Some(id);
            let may_write = is_current && slot.holder.is_loading();
            if is_current {
                slot.current = None;
            }

            match outcome {
                Ok(value) if may_write => {
                    Ok(slot.holder.set_state_queued(ValueErrorState::Fulfilled(value)))
                }
                Err(error) if may_write => {
                    if let Some(callback) = on_settle_error {
                        callback(&error);
                    }
                    let initial = slot.holder.initial().clone();
                    slot.holder.set_state_queued(ValueErrorState::Rejected(initial, error.clone()));
                    debug!(operation = %id, "operation rejected");
                    Err(error)
                }
                outcome => {
                    debug!(
                        operation = %id,
                        succeeded = outcome.is_ok(),
                        "settlement ignored, operation no longer current"
                    );
                    metrics::record_ignored_settlement("latest");
                    Ok(Arc::clone(slot.holder.value_error_state()))
                }
            }
        };
        self.deliver();
        settled
    }

    fn deliver(&self) {
        subscribable::deliver_queued::<_, T, E, F>(&self.slot);
    }
}

impl<T, E, F> StateView<T, E> for LatestWins<T, E, F>
where
    F: SubjectFactory<SharedState<T, E>>,
{
    fn value_error_state(&self) -> SharedState<T, E> {
        Arc::clone(self.inner.slot.lock().holder.value_error_state())
    }

    fn ready(&self) -> SharedState<T, E> {
        Arc::clone(self.inner.slot.lock().holder.ready())
    }
}

impl<T, E, F> fmt::Debug for LatestWins<T, E, F>
where
    T: fmt::Debug,
    E: fmt::Debug,
    F: SubjectFactory<SharedState<T, E>>,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let slot = self.inner.slot.lock();
        f.debug_struct("LatestWins")
            .field("holder", &slot.holder)
            .field("current", &slot.current)
            .finish()
    }
}
