//! Broadcast-channel backed [`Subject`] implementation.

use std::fmt;

use futures::stream::{self, BoxStream, StreamExt};
use parking_lot::Mutex;
use tokio::sync::broadcast::{self, error::RecvError, error::TryRecvError};
use tracing::warn;
use vestate_core::Subject;

use crate::config::{ChannelCapacity, ReplayPolicy};
use crate::error::SubscriptionError;

/// A [`Subject`] built on a [`tokio::sync::broadcast`] channel.
///
/// With [`ReplayPolicy::Latest`] it behaves like a behaviour subject: every
/// new subscription first yields the most recent value (the seed if nothing
/// was pushed yet). With [`ReplayPolicy::None`] subscribers only see values
/// pushed after they subscribed.
pub struct BroadcastSubject<T> {
    sender: broadcast::Sender<T>,
    latest: Mutex<T>,
    replay: ReplayPolicy,
}

impl<T> BroadcastSubject<T>
where
    T: Clone,
{
    /// Creates a subject seeded with `seed`.
    pub fn new(seed: T, capacity: ChannelCapacity, replay: ReplayPolicy) -> Self {
        let (sender, _) = broadcast::channel(usize::from(capacity.get()));
        Self {
            sender,
            latest: Mutex::new(seed),
            replay,
        }
    }

    /// Returns the most recently pushed value, or the seed.
    pub fn latest(&self) -> T {
        self.latest.lock().clone()
    }

    /// Number of live subscriptions.
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }

    /// Replay policy of this subject.
    pub fn replay(&self) -> ReplayPolicy {
        self.replay
    }
}

impl<T> Subject<T> for BroadcastSubject<T>
where
    T: Clone + Send + Sync + 'static,
{
    type Subscription = Subscription<T>;

    fn next(&self, value: T) {
        // Held while sending so a concurrent subscribe either replays this
        // value or receives it from the channel, never both.
        let mut latest = self.latest.lock();
        *latest = value.clone();
        // Sending only fails without receivers.
        let _ = self.sender.send(value);
    }

    fn subscribe(&self) -> Subscription<T> {
        let latest = self.latest.lock();
        let receiver = self.sender.subscribe();
        let replay = match self.replay {
            ReplayPolicy::Latest => Some(latest.clone()),
            ReplayPolicy::None => None,
        };
        Subscription { replay, receiver }
    }
}

impl<T> fmt::Debug for BroadcastSubject<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BroadcastSubject")
            .field("subscribers", &self.sender.receiver_count())
            .field("replay", &self.replay)
            .finish()
    }
}

/// A single subscription to a [`BroadcastSubject`].
///
/// Dropping the subscription unsubscribes.
pub struct Subscription<T> {
    replay: Option<T>,
    receiver: broadcast::Receiver<T>,
}

impl<T> Subscription<T>
where
    T: Clone + Send + 'static,
{
    /// Receives the next value, waiting for one to be pushed if necessary.
    pub async fn recv(&mut self) -> Result<T, SubscriptionError> {
        if let Some(value) = self.replay.take() {
            return Ok(value);
        }
        self.receiver.recv().await.map_err(|error| match error {
            RecvError::Closed => SubscriptionError::Closed,
            RecvError::Lagged(skipped) => SubscriptionError::Lagged(skipped),
        })
    }

    /// Receives the next value if one is already available.
    pub fn try_recv(&mut self) -> Result<Option<T>, SubscriptionError> {
        if let Some(value) = self.replay.take() {
            return Ok(Some(value));
        }
        match self.receiver.try_recv() {
            Ok(value) => Ok(Some(value)),
            Err(TryRecvError::Empty) => Ok(None),
            Err(TryRecvError::Closed) => Err(SubscriptionError::Closed),
            Err(TryRecvError::Lagged(skipped)) => Err(SubscriptionError::Lagged(skipped)),
        }
    }

    /// Converts the subscription into a stream of values.
    ///
    /// The stream ends when the subject is dropped. Lag is logged and
    /// skipped over.
    pub fn into_stream(self) -> BoxStream<'static, T> {
        stream::unfold(self, |mut subscription| async move {
            loop {
                match subscription.recv().await {
                    Ok(value) => return Some((value, subscription)),
                    Err(SubscriptionError::Lagged(skipped)) => {
                        warn!(skipped, "subscriber lagged behind, values skipped");
                    }
                    Err(SubscriptionError::Closed) => return None,
                }
            }
        })
        .boxed()
    }
}

impl<T> fmt::Debug for Subscription<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("pending_replay", &self.replay.is_some())
            .finish()
    }
}
