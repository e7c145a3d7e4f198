//! Error types for subscriptions.

use thiserror::Error;

/// Error returned when receiving from a [`Subscription`](crate::subject::Subscription).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SubscriptionError {
    /// The subject has been dropped together with its holder.
    ///
    /// No further values will ever be received.
    #[error("subject closed")]
    Closed,

    /// The subscriber fell behind and the given number of values were
    /// overwritten before it received them.
    ///
    /// The subscription stays usable and continues with the oldest value
    /// still buffered. Read the holder directly to catch up with the
    /// current state.
    #[error("subscription lagged behind by {0} values")]
    Lagged(u64),
}
