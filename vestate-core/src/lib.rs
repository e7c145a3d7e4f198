#![warn(missing_docs)]
//! # vestate-core
//!
//! Core types for tracking the lifecycle of asynchronous operations as a
//! synchronously readable value/error/state snapshot.
//!
//! ## Architecture
//!
//! - [`PState`] and [`ValueErrorState`] model the four lifecycle states and
//!   the tuple carried in each of them.
//! - [`StateHolder`] owns the current tuple and implements
//!   [`ValueErrorStates`], the read accessors plus the single mutation path.
//! - [`Subject`] and [`SubjectFactory`] describe the push/subscribe
//!   capability a subscribable holder is built upon.
//! - [`OperationId`] identifies the in-flight operation a driver honors.
//!
//! The drivers themselves live in the `vestate` crate.

pub mod holder;
pub mod operation;
pub mod state;
pub mod subject;

pub use holder::{SharedState, StateHolder, ValueErrorStates};
pub use operation::{OperationId, OperationIds};
pub use state::{
    PState, ValueErrorState, is_fulfilled, is_loading, is_pending, is_ready, is_rejected,
    is_settled,
};
pub use subject::{Subject, SubjectFactory};
