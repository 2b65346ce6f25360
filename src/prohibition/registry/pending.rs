use dashmap::DashMap;
use std::collections::HashSet;

use crate::prohibition::{
    error::Result,
    types::{ConsumerId, MessageQueue},
    wrapper::ConsumerWrapper,
};

/// A lifecycle event that arrived before the consumer was started
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PendingOp {
    Subscribe(String),
    Unsubscribe(String),
    Assign(Vec<MessageQueue>),
}

impl PendingOp {
    /// Replay the event onto a registered wrapper
    pub fn apply(self, wrapper: &mut ConsumerWrapper) -> Result<()> {
        match self {
            PendingOp::Subscribe(topic) => wrapper.subscribe(&topic),
            PendingOp::Unsubscribe(topic) => wrapper.unsubscribe(&topic),
            PendingOp::Assign(queues) => wrapper.assign(queues),
        }
    }
}

/// Pre-registration cache for consumers that are not started yet
///
/// Events are kept in arrival order per consumer. An entry is created on the
/// first subscribe/assign before start and removed exactly once when drained.
/// Entries for consumers that never start stay until process exit.
#[derive(Default)]
pub struct PreRegistrationCache {
    entries: DashMap<ConsumerId, Vec<PendingOp>>,
}

impl PreRegistrationCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an event for a consumer that has no wrapper yet
    pub fn record(&self, id: ConsumerId, op: PendingOp) {
        self.entries.entry(id).or_default().push(op);
    }

    /// Take all cached events for `id`; a second drain returns `None`
    pub fn drain(&self, id: ConsumerId) -> Option<Vec<PendingOp>> {
        self.entries.remove(&id).map(|(_, ops)| ops)
    }

    /// Topics subscribed so far, replaying subscribe/unsubscribe in order
    pub fn subscribed_topics(&self, id: ConsumerId) -> Option<HashSet<String>> {
        self.entries.get(&id).map(|ops| {
            let mut topics = HashSet::new();
            for op in ops.iter() {
                match op {
                    PendingOp::Subscribe(topic) => {
                        topics.insert(topic.clone());
                    }
                    PendingOp::Unsubscribe(topic) => {
                        topics.remove(topic);
                    }
                    PendingOp::Assign(_) => {}
                }
            }
            topics
        })
    }

    /// The most recent queue assignment so far
    pub fn assigned_queues(&self, id: ConsumerId) -> Option<Vec<MessageQueue>> {
        self.entries.get(&id).and_then(|ops| {
            ops.iter().rev().find_map(|op| match op {
                PendingOp::Assign(queues) => Some(queues.clone()),
                _ => None,
            })
        })
    }

    pub fn contains(&self, id: ConsumerId) -> bool {
        self.entries.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
