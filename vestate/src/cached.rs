//! Deduplicating driver around a single operation factory.
//!
//! [`CachedOperation`] starts an operation through its factory on the first
//! [`request`](CachedOperation::request) and hands the same in-flight (or
//! fulfilled) operation to every later request. The cache is invalidated
//! when the operation rejects, on [`reset`](CachedOperation::reset) and on
//! [`refresh`](CachedOperation::refresh) outside of `Loading`.

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use futures::FutureExt;
use futures::future::{self, BoxFuture, Shared};
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

/// A boxed operation started by the factory.
pub type Operation<T, E> = BoxFuture<'static, Result<T, E>>;

/// Starts a new operation, or fails synchronously without starting one.
pub type OperationFactory<T, E> = Box<dyn Fn() -> Result<Operation<T, E>, E> + Send + Sync>;

#[derive(Clone)]
struct CachedEntry<T, E> {
    id: OperationId,
    operation: Shared<Operation<T, E>>,
}

struct CacheSlot<T, E, F>
where
    F: SubjectFactory<SharedState<T, E>>,
{
    holder: SubscribableStateHolder<T, E, F>,
    cache: Option<CachedEntry<T, E>>,
}

impl<T, E, F> CacheSlot<T, E, F>
where
    F: SubjectFactory<SharedState<T, E>>,
{
    fn is_cached(&self, id: OperationId) -> bool {
        self.cache.as_ref().is_some_and(|entry| entry.id == id)
    }
}

impl<T, E, F> AsMut<SubscribableStateHolder<T, E, F>> for CacheSlot<T, E, F>
where
    F: SubjectFactory<SharedState<T, E>>,
{
    fn as_mut(&mut self) -> &mut SubscribableStateHolder<T, E, F> {
        &mut self.holder
    }
}

struct CachedInner<T, E, F>
where
    F: SubjectFactory<SharedState<T, E>>,
{
    factory: OperationFactory<T, E>,
    ids: OperationIds,
    slot: Mutex<CacheSlot<T, E, F>>,
}

/// Collapses concurrent requests onto one cached operation.
///
/// This is a cheap handle: clones share the same cache and state.
pub struct CachedOperation<T, E, F = SubjectConfig>
where
    F: SubjectFactory<SharedState<T, E>>,
{
    inner: Arc<CachedInner<T, E, F>>,
}

impl<T, E, F> Clone for CachedOperation<T, E, F>
where
    F: SubjectFactory<SharedState<T, E>>,
{
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T, E> CachedOperation<T, E>
where
    T: Clone + Send + Sync + 'static,
    E: Clone + Send + Sync + 'static,
{
    /// Creates a driver in `Ready(initial)` around an operation that always
    /// starts successfully.
    pub fn new<Op, Fut>(operation: Op, initial: T) -> Self
    where
        Op: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
    {
        Self::with_factory(operation, initial, SubjectConfig::default())
    }

    /// Creates a driver in `Ready(initial)` around an operation that may
    /// fail before it starts.
    pub fn fallible<Op, Fut>(operation: Op, initial: T) -> Self
    where
        Op: Fn() -> Result<Fut, E> + Send + Sync + 'static,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
    {
        Self::fallible_with_factory(operation, initial, SubjectConfig::default())
    }
}

impl<T, E, F> CachedOperation<T, E, F>
where
    T: Clone + Send + Sync + 'static,
    E: Clone + Send + Sync + 'static,
    F: SubjectFactory<SharedState<T, E>> + 'static,
{
    /// Same as [`new`](CachedOperation::new), building the subject with `factory`.
    ///
    /// The subject factory runs while the driver's state is locked and must
    /// not access the driver. The subject itself is notified after the lock
    /// is released, so subscribers may read or drive the driver from within
    /// a push.
    pub fn with_factory<Op, Fut>(operation: Op, initial: T, factory: F) -> Self
    where
        Op: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
    {
        Self::from_factory(Box::new(move || Ok(operation().boxed())), initial, factory)
    }

    /// Same as [`fallible`](CachedOperation::fallible), building the subject with `factory`.
    pub fn fallible_with_factory<Op, Fut>(operation: Op, initial: T, factory: F) -> Self
    where
        Op: Fn() -> Result<Fut, E> + Send + Sync + 'static,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
    {
        Self::from_factory(
            Box::new(move || operation().map(|started| started.boxed())),
            initial,
            factory,
        )
    }

    fn from_factory(operation: OperationFactory<T, E>, initial: T, factory: F) -> Self {
        Self {
            inner: Arc::new(CachedInner {
                factory: operation,
                ids: OperationIds::new(),
                slot: Mutex::new(CacheSlot {
                    holder: SubscribableStateHolder::with_factory(initial, factory),
                    cache: None,
                }),
            }),
        }
    }

    /// Provides cached access to the operation.
    ///
    /// Reuses the cached operation if there is one, otherwise starts a new
    /// one through the factory and switches to `Loading` with the current
    /// value. Both happen before this returns.
    ///
    /// If the factory fails, the driver switches straight to
    /// `Rejected(initial, error)` and the returned settlement resolves with
    /// the error. Nothing is cached, so the next request calls the factory
    /// again.
    ///
    /// Otherwise the returned [`Settlement`] waits for the operation and
    /// then:
    ///
    /// - switches to `Fulfilled` and resolves with it if the operation is
    ///   still cached and the driver is still loading; the operation stays
    ///   cached for later requests,
    /// - switches to `Rejected(initial, error)`, clears the cache and
    ///   resolves with the error under the same condition,
    /// - otherwise resolves with the tuple current at the time the operation
    ///   settles. Every request attached to an already settled operation
    ///   ends up here, as does a request whose operation was reset.
    ///
    /// The factory runs while the driver's state is locked and must not
    /// access the driver.
    pub fn request(&self) -> Settlement<T, E> {
        match self.begin() {
            Ok((_, settlement)) => settlement,
            Err(error) => future::ready(Err(error)).boxed(),
        }
    }

    /// Requests a fresh operation unless one is loading.
    ///
    /// While loading this joins the in-flight operation like
    /// [`request`](CachedOperation::request). In any other state the cached
    /// operation is dropped first, so the factory is called again.
    pub fn refresh(&self) -> Settlement<T, E> {
        {
            let mut slot = self.inner.slot.lock();
            if !slot.holder.is_loading()
                && let Some(dropped) = slot.cache.take()
            {
                debug!(operation = %dropped.id, "cached operation dropped by refresh");
            }
        }
        self.request()
    }

    /// Requests the operation and drives its settlement on the tokio runtime.
    ///
    /// # Panics
    ///
    /// Panics when called outside of a tokio runtime.
    pub fn spawn(&self) -> JoinHandle<Result<SharedState<T, E>, E>> {
        match self.begin() {
            Ok((id, settlement)) => {
                let span = info_span!("vestate.settle", driver = "cached", operation = %id);
                tokio::spawn(settlement.instrument(span))
            }
            Err(error) => tokio::spawn(future::ready(Err(error))),
        }
    }

    /// Resets to `Ready(initial)` and drops the cached operation.
    pub fn reset(&self) -> SharedState<T, E> {
        let ready = {
            let mut slot = self.inner.slot.lock();
            if let Some(dropped) = slot.cache.take() {
                debug!(operation = %dropped.id, "cached operation dropped by reset");
            }
            slot.holder.reset_queued()
        };
        self.inner.deliver();
        ready
    }

    /// The operation currently cached, if any.
    pub fn cached_operation(&self) -> Option<OperationId> {
        self.inner.slot.lock().cache.as_ref().map(|entry| entry.id)
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

    fn begin(&self) -> Result<(OperationId, Settlement<T, E>), E> {
        let started = self.start();
        self.inner.deliver();
        let entry = started?;

        let inner = Arc::clone(&self.inner);
        let id = entry.id;
        let settlement = async move {
            let outcome = entry.operation.await;
            inner.settle(entry.id, outcome)
        }
        .boxed();
        Ok((id, settlement))
    }

    fn start(&self) -> Result<CachedEntry<T, E>, E> {
        let mut slot = self.inner.slot.lock();
        let cached = slot.cache.clone();
        let entry = match cached {
            Some(entry) => entry,
            None => match (self.inner.factory)() {
                Ok(operation) => CachedEntry {
                    id: self.inner.ids.next_id(),
                    operation: operation.shared(),
                },
                Err(error) => {
                    debug!("operation failed to start");
                    let initial = slot.holder.initial().clone();
                    slot.holder.set_state_queued(ValueErrorState::Rejected(initial, error.clone()));
                    return Err(error);
                }
            },
        };
        if !slot.is_cached(entry.id) {
            debug!(operation = %entry.id, "operation started and cached");
            slot.cache = Some(entry.clone());
            let value = slot.holder.value().clone();
            slot.holder.set_state_queued(ValueErrorState::Loading(value));
        }
        Ok(entry)
    }
}

impl<T, E, F> CachedInner<T, E, F>
where
    T: Clone,
    E: Clone,
    F: SubjectFactory<SharedState<T, E>>,
{
    fn settle(&self, id: OperationId, outcome: Result<T, E>) -> Result<SharedState<T, E>, E> {
        let settled = {
            let mut slot = self.slot.lock();
            let may_write = slot.is_cached(id) && slot.holder.is_loading();

            match outcome {
                Ok(value) if may_write => {
                    Ok(slot.holder.set_state_queued(ValueErrorState::Fulfilled(value)))
                }
                Err(error) if may_write => {
                    let initial = slot.holder.initial().clone();
                    slot.holder.set_state_queued(ValueErrorState::Rejected(initial, error.clone()));
                    slot.cache = None;
                    debug!(operation = %id, "cached operation rejected, cache cleared");
                    Err(error)
                }
                outcome => {
                    debug!(
                        operation = %id,
                        succeeded = outcome.is_ok(),
                        "settlement ignored, state already settled or reset"
                    );
                    metrics::record_ignored_settlement("cached");
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

impl<T, E, F> StateView<T, E> for CachedOperation<T, E, F>
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

impl<T, E, F> fmt::Debug for CachedOperation<T, E, F>
where
    T: fmt::Debug,
    E: fmt::Debug,
    F: SubjectFactory<SharedState<T, E>>,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let slot = self.inner.slot.lock();
        f.debug_struct("CachedOperation")
            .field("holder", &slot.holder)
            .field("cached", &slot.cache.as_ref().map(|entry| entry.id))
            .finish()
    }
}
