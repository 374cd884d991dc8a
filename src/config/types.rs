use serde::{Deserialize, Serialize};

/// What a full subscriber buffer does with the next published value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverflowPolicy {
    /// Discard the oldest buffered value to make room.
    #[default]
    DropOldest,
    /// Make the publisher wait until the subscriber has room.
    Suspend,
}

/// Buffering configuration shared by the ingress queue and both hubs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReactorConfig {
    /// Number of actions that may be queued before `dispatch` reports `Full`.
    #[serde(default = "default_ingress_capacity")]
    pub ingress_capacity: usize,
    /// Per-subscriber buffer size for the state and effect hubs.
    #[serde(default = "default_subscriber_capacity")]
    pub subscriber_capacity: usize,
    /// Overflow behavior for subscriber buffers (default: drop_oldest).
    #[serde(default)]
    pub overflow: OverflowPolicy,
}

fn default_ingress_capacity() -> usize {
    64
}

fn default_subscriber_capacity() -> usize {
    64
}

impl Default for ReactorConfig {
    fn default() -> Self {
        Self {
            ingress_capacity: default_ingress_capacity(),
            subscriber_capacity: default_subscriber_capacity(),
            overflow: OverflowPolicy::default(),
        }
    }
}
