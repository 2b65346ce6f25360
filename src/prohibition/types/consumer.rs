use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

static NEXT_CONSUMER_ID: AtomicU64 = AtomicU64::new(1);

/// Opaque, stable identity of one live consumer instance
///
/// Used as the registry key. Display-only names (instance, group) are never
/// used for uniqueness.
///
/// [`next`](Self::next), [`from_ptr`](Self::from_ptr) and
/// [`from_raw`](Self::from_raw) draw from unrelated value spaces and can
/// collide with each other. An instrumentation layer must derive every
/// identity it hands to one controller with the same constructor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConsumerId(u64);

impl ConsumerId {
    /// Allocate a fresh identity, unique for the life of the process
    ///
    /// # Example
    ///
    /// ```
    /// use mq_consume_prohibition::prohibition::types::ConsumerId;
    ///
    /// let a = ConsumerId::next();
    /// let b = ConsumerId::next();
    /// assert_ne!(a, b);
    /// ```
    pub fn next() -> Self {
        Self(NEXT_CONSUMER_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Derive an identity from the address of a shared consumer object
    ///
    /// Two live `Arc`s yield the same identity only if they point at the same
    /// allocation. The identity may be reused once the allocation is freed.
    pub fn from_ptr<T: ?Sized>(consumer: &Arc<T>) -> Self {
        Self(Arc::as_ptr(consumer) as *const () as usize as u64)
    }

    /// Wrap a raw identity value supplied by the client library
    pub fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    /// Get the raw identity value
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for ConsumerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "consumer-{}", self.0)
    }
}

/// How the consumer receives messages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConsumerKind {
    /// Push-style consumer, always a subscribing group member
    Push,
    /// Pull-style consumer, subscribes or is assigned queues explicitly
    Pull,
}

/// How a consumer obtains its queues
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SubscriptionMode {
    /// Declares topics and receives queues through group rebalance
    Subscribe,
    /// Handed explicit queues, bypassing group rebalance
    Assign,
}

impl fmt::Display for SubscriptionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SubscriptionMode::Subscribe => write!(f, "SUBSCRIBE"),
            SubscriptionMode::Assign => write!(f, "ASSIGN"),
        }
    }
}

/// Group membership state of a consumer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MembershipState {
    /// Member of its group and eligible for queue assignment
    Active,
    /// Deregistered, waiting for the broker to confirm the group exit
    Suspending,
    /// Out of the group (SUBSCRIBE) or queue-level paused (ASSIGN)
    Suspended,
}

impl fmt::Display for MembershipState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MembershipState::Active => write!(f, "ACTIVE"),
            MembershipState::Suspending => write!(f, "SUSPENDING"),
            MembershipState::Suspended => write!(f, "SUSPENDED"),
        }
    }
}

/// A single queue (partition) of a topic on a given broker
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct MessageQueue {
    /// Topic the queue belongs to
    pub topic: String,

    /// Broker hosting the queue
    pub broker_name: String,

    /// Queue index within the topic on that broker
    pub queue_id: u32,
}

impl MessageQueue {
    /// Create a new message queue handle
    pub fn new(topic: impl Into<String>, broker_name: impl Into<String>, queue_id: u32) -> Self {
        Self {
            topic: topic.into(),
            broker_name: broker_name.into(),
            queue_id,
        }
    }
}

impl fmt::Display for MessageQueue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}#{}", self.topic, self.broker_name, self.queue_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_ptr_is_stable_for_same_allocation() {
        let consumer = Arc::new(42u8);
        let clone = Arc::clone(&consumer);
        assert_eq!(ConsumerId::from_ptr(&consumer), ConsumerId::from_ptr(&clone));

        let other = Arc::new(42u8);
        assert_ne!(ConsumerId::from_ptr(&consumer), ConsumerId::from_ptr(&other));
    }

    #[test]
    fn test_raw_identity_round_trips_through_as_u64() {
        let id = ConsumerId::next();
        assert_eq!(ConsumerId::from_raw(id.as_u64()), id);
        assert_ne!(ConsumerId::next(), id);
    }

    #[test]
    fn test_message_queue_display() {
        let queue = MessageQueue::new("orders", "broker-a", 3);
        assert_eq!(queue.to_string(), "orders@broker-a#3");
    }

    #[test]
    fn test_enum_serialization() {
        assert_eq!(
            serde_json::to_string(&SubscriptionMode::Assign).unwrap(),
            "\"ASSIGN\""
        );
        assert_eq!(
            serde_json::to_string(&MembershipState::Suspending).unwrap(),
            "\"SUSPENDING\""
        );
        assert_eq!(serde_json::to_string(&ConsumerId::from_raw(9)).unwrap(), "9");
    }
}
