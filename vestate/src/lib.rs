#![doc = include_str!("../README.md")]
#![warn(missing_docs)]
#![cfg_attr(docsrs, feature(doc_cfg))]

use futures::future::BoxFuture;

/// Deduplicating driver.
///
/// [`CachedOperation`](cached::CachedOperation) wraps an operation factory
/// and collapses concurrent requests onto one cached operation, keeping a
/// fulfilled operation cached until reset and dropping a rejected one so the
/// next request retries.
pub mod cached;

/// Subject configuration types.
///
/// [`SubjectConfig`] selects the buffer capacity and replay policy of the
/// default subject and is the default [`SubjectFactory`].
pub mod config;

/// Error types for subscriptions.
pub mod error;

/// Latest-wins driver.
///
/// [`LatestWins`](latest::LatestWins) adopts externally created operations;
/// only the most recently adopted one may change the state when it settles.
pub mod latest;

/// Metrics collection for state transitions.
///
/// When the `metrics` feature is enabled, this module provides counters for:
/// - State transitions per target state
/// - Settlements that were discarded
/// - Subjects created for subscribable holders
pub mod metrics;

/// The [`BroadcastSubject`](subject::BroadcastSubject) used by default.
pub mod subject;

/// State holder that pushes every transition to a lazily created subject.
pub mod subscribable;

/// Snapshot accessors shared by both drivers.
pub mod view;

pub use cached::{CachedOperation, Operation, OperationFactory};
pub use config::{ChannelCapacity, ReplayPolicy, SubjectConfig, SubjectConfigBuilder};
pub use error::SubscriptionError;
pub use latest::{AdoptOptions, LatestWins, OnSettleError};
pub use subject::{BroadcastSubject, Subscription};
pub use subscribable::SubscribableStateHolder;
pub use view::StateView;

pub use vestate_core::{
    OperationId, PState, SharedState, StateHolder, Subject, SubjectFactory, ValueErrorState,
    ValueErrorStates, is_fulfilled, is_loading, is_pending, is_ready, is_rejected, is_settled,
};

/// Future returned by the drivers, resolving once the driven operation has
/// settled.
///
/// Resolves with the tuple the driver holds after applying the result, or
/// with the operation's error if it rejected while still current.
pub type Settlement<T, E> = BoxFuture<'static, Result<SharedState<T, E>, E>>;

/// The `vestate` prelude.
///
/// Provides convenient access to the most commonly used types and traits:
///
/// ```rust
/// use vestate::prelude::*;
/// ```
pub mod prelude {
    pub use crate::{
        CachedOperation, LatestWins, PState, StateView, Subject, ValueErrorState,
        ValueErrorStates,
    };
}
