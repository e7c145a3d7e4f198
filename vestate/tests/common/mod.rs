//! Shared helpers for driver tests.
#![allow(dead_code)]

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use futures::FutureExt;
use futures::future::BoxFuture;
use tokio::sync::oneshot;
use tracing_subscriber::EnvFilter;
use vestate::{PState, SharedState, Subject, Subscription};

/// Install a test-writer subscriber once; honors `RUST_LOG`.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// An operation that settles with whatever is sent through the returned sender.
pub fn deferred<T, E>() -> (oneshot::Sender<Result<T, E>>, BoxFuture<'static, Result<T, E>>)
where
    T: Send + 'static,
    E: Send + 'static,
{
    let (sender, receiver) = oneshot::channel();
    let operation = async move {
        receiver
            .await
            .expect("test dropped the sender of a deferred operation")
    }
    .boxed();
    (sender, operation)
}

/// Settle a deferred operation.
pub fn settle<T, E>(sender: oneshot::Sender<Result<T, E>>, outcome: Result<T, E>) {
    assert!(
        sender.send(outcome).is_ok(),
        "deferred operation was dropped before settling"
    );
}

/// Counts invocations of an operation factory.
#[derive(Clone, Default)]
pub struct CallCounter(Arc<AtomicUsize>);

impl CallCounter {
    pub fn hit(&self) {
        self.0.fetch_add(1, Ordering::SeqCst);
    }

    pub fn count(&self) -> usize {
        self.0.load(Ordering::SeqCst)
    }
}

/// Drain every state already delivered to `subscription`.
pub fn drain_states<T, E>(subscription: &mut Subscription<SharedState<T, E>>) -> Vec<PState>
where
    T: Send + Sync + 'static,
    E: Send + Sync + 'static,
{
    let mut states = Vec::new();
    while let Ok(Some(next)) = subscription.try_recv() {
        states.push(next.state());
    }
    states
}

type Observer<T> = Arc<dyn Fn(&T) + Send + Sync>;

/// A subject that calls its observers synchronously on the pushing thread.
pub struct InlineSubject<T> {
    observers: parking_lot::Mutex<Vec<Observer<T>>>,
}

impl<T> InlineSubject<T> {
    pub fn new() -> Self {
        Self {
            observers: parking_lot::Mutex::new(Vec::new()),
        }
    }

    pub fn observe(&self, observer: impl Fn(&T) + Send + Sync + 'static) {
        self.observers.lock().push(Arc::new(observer));
    }
}

impl<T> Subject<T> for InlineSubject<T>
where
    T: Send + Sync,
{
    type Subscription = ();

    fn next(&self, value: T) {
        let observers = self.observers.lock().clone();
        for observer in observers {
            observer(&value);
        }
    }

    fn subscribe(&self) -> Self::Subscription {}
}
