//! Subject configuration.
//!
//! [`SubjectConfig`] is the default [`SubjectFactory`] of every holder and
//! driver in this crate. It builds a [`BroadcastSubject`] with the
//! configured buffer capacity and replay policy.

use bounded_integer::bounded_integer;
use serde::{Deserialize, Serialize};
use vestate_core::SubjectFactory;

use crate::subject::BroadcastSubject;

bounded_integer! {
    /// Number of values buffered per subscriber (1-65535).
    ///
    /// A subscriber that falls further behind than this observes
    /// [`SubscriptionError::Lagged`](crate::SubscriptionError::Lagged).
    #[repr(u16)]
    pub struct ChannelCapacity { 1..=65535 }
}

const DEFAULT_CAPACITY: ChannelCapacity = match ChannelCapacity::new(64) {
    Some(capacity) => capacity,
    None => panic!("default channel capacity out of range"),
};

fn default_capacity() -> ChannelCapacity {
    DEFAULT_CAPACITY
}

/// Whether new subscribers receive the most recent value first.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Eq, PartialEq, Default)]
pub enum ReplayPolicy {
    /// Replay the most recent value to every new subscriber.
    #[default]
    Latest,
    /// Only deliver values pushed after subscribing.
    None,
}

/// Configuration of the subject created for a subscribable holder.
#[derive(Debug, Clone, Serialize, Deserialize, Eq, PartialEq)]
pub struct SubjectConfig {
    /// Values buffered per subscriber.
    #[serde(default = "default_capacity")]
    pub capacity: ChannelCapacity,
    /// Replay behaviour for new subscribers.
    #[serde(default)]
    pub replay: ReplayPolicy,
}

impl Default for SubjectConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_CAPACITY,
            replay: ReplayPolicy::default(),
        }
    }
}

impl SubjectConfig {
    /// Create a new builder for SubjectConfig.
    pub fn builder() -> SubjectConfigBuilder {
        SubjectConfigBuilder::default()
    }
}

impl<T> SubjectFactory<T> for SubjectConfig
where
    T: Clone + Send + Sync + 'static,
{
    type Subject = BroadcastSubject<T>;

    fn create(&self, seed: T) -> BroadcastSubject<T> {
        BroadcastSubject::new(seed, self.capacity, self.replay)
    }
}

/// Builder for SubjectConfig.
#[derive(Debug, Clone)]
pub struct SubjectConfigBuilder {
    capacity: ChannelCapacity,
    replay: ReplayPolicy,
}

impl Default for SubjectConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl SubjectConfigBuilder {
    /// Create a new builder with default values.
    pub fn new() -> Self {
        Self {
            capacity: DEFAULT_CAPACITY,
            replay: ReplayPolicy::Latest,
        }
    }

    /// Set the per-subscriber buffer capacity.
    pub fn capacity(self, capacity: ChannelCapacity) -> Self {
        Self { capacity, ..self }
    }

    /// Set the replay policy.
    pub fn replay(self, replay: ReplayPolicy) -> Self {
        Self { replay, ..self }
    }

    /// Build the SubjectConfig.
    pub fn build(self) -> SubjectConfig {
        SubjectConfig {
            capacity: self.capacity,
            replay: self.replay,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = SubjectConfig::default();
        assert_eq!(config.capacity.get(), 64);
        assert_eq!(config.replay, ReplayPolicy::Latest);
    }

    #[test]
    fn test_builder() {
        let capacity = ChannelCapacity::new(8).unwrap();
        let config = SubjectConfig::builder()
            .capacity(capacity)
            .replay(ReplayPolicy::None)
            .build();

        assert_eq!(config.capacity, capacity);
        assert_eq!(config.replay, ReplayPolicy::None);
    }

    #[test]
    fn test_deserialize_partial() {
        let config: SubjectConfig = serde_json::from_str(r#"{"replay": "None"}"#).unwrap();
        assert_eq!(config.replay, ReplayPolicy::None);
        assert_eq!(config.capacity.get(), 64);
    }

    #[test]
    fn test_deserialize_rejects_zero_capacity() {
        let result = serde_json::from_str::<SubjectConfig>(r#"{"capacity": 0}"#);
        assert!(result.is_err());
    }
}
