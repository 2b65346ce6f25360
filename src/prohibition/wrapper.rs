use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::{BTreeSet, HashSet};

use crate::prohibition::{
    client::ConsumerRef,
    error::{Error, Result},
    types::{ConsumerId, ConsumerKind, MembershipState, MessageQueue, SubscriptionMode},
};

/// Normalized view of one live consumer instance
///
/// Holds everything the controller needs to decide on and drive the
/// consumer's group membership. The registry keeps each wrapper behind its
/// own async mutex; all mutation happens under that lock.
pub struct ConsumerWrapper {
    id: ConsumerId,
    instance_name: String,
    consumer_group: String,
    client_id: String,
    kind: ConsumerKind,
    mode: Option<SubscriptionMode>,
    subscribed_topics: HashSet<String>,
    assigned_queues: BTreeSet<MessageQueue>,
    paused_queues: BTreeSet<MessageQueue>,
    state: MembershipState,
    epoch: u64,
    shut_down: bool,
    last_transition: Option<DateTime<Utc>>,
    client: ConsumerRef,
}

impl ConsumerWrapper {
    /// Build a wrapper for a started consumer
    ///
    /// Fails if the client cannot provide a consumer group; no partial
    /// wrapper is ever produced. Push consumers start in SUBSCRIBE mode, pull
    /// consumers have no mode until their first subscribe or assign.
    pub fn wrap(client: ConsumerRef) -> Result<Self> {
        let id = client.consumer_id();
        let consumer_group = client
            .consumer_group()
            .filter(|group| !group.trim().is_empty())
            .ok_or_else(|| {
                Error::ValidationError(format!("{} has no consumer group", id))
            })?;
        let client_id = client.client_id();
        if client_id.is_empty() {
            return Err(Error::ValidationError(format!("{} has no client id", id)));
        }

        let kind = client.kind();
        let mode = match kind {
            ConsumerKind::Push => Some(SubscriptionMode::Subscribe),
            ConsumerKind::Pull => None,
        };

        Ok(Self {
            id,
            instance_name: client.instance_name(),
            consumer_group,
            client_id,
            kind,
            mode,
            subscribed_topics: HashSet::new(),
            assigned_queues: BTreeSet::new(),
            paused_queues: BTreeSet::new(),
            state: MembershipState::Active,
            epoch: 0,
            shut_down: false,
            last_transition: None,
            client,
        })
    }

    pub fn id(&self) -> ConsumerId {
        self.id
    }

    pub fn instance_name(&self) -> &str {
        &self.instance_name
    }

    pub fn consumer_group(&self) -> &str {
        &self.consumer_group
    }

    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    pub fn kind(&self) -> ConsumerKind {
        self.kind
    }

    pub fn mode(&self) -> Option<SubscriptionMode> {
        self.mode
    }

    pub fn client(&self) -> &ConsumerRef {
        &self.client
    }

    pub fn subscribed_topics(&self) -> &HashSet<String> {
        &self.subscribed_topics
    }

    /// Assigned queues in a stable order, empty outside ASSIGN mode
    pub fn assigned_queues(&self) -> Vec<MessageQueue> {
        self.assigned_queues.iter().cloned().collect()
    }

    pub fn state(&self) -> MembershipState {
        self.state
    }

    /// The authoritative suspend flag
    pub fn is_paused(&self) -> bool {
        self.state == MembershipState::Suspended
    }

    /// Transition counter, bumped on every state change
    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    pub fn is_shut_down(&self) -> bool {
        self.shut_down
    }

    pub fn last_transition(&self) -> Option<DateTime<Utc>> {
        self.last_transition
    }

    /// Add a topic subscription, fixing the mode to SUBSCRIBE
    pub fn subscribe(&mut self, topic: &str) -> Result<()> {
        self.claim_mode(SubscriptionMode::Subscribe)?;
        self.subscribed_topics.insert(topic.to_string());
        Ok(())
    }

    /// Drop a topic subscription
    pub fn unsubscribe(&mut self, topic: &str) -> Result<()> {
        if let Some(SubscriptionMode::Assign) = self.mode {
            return Err(Error::ModeConflict {
                consumer: self.id,
                current: SubscriptionMode::Assign,
                requested: SubscriptionMode::Subscribe,
            });
        }
        self.subscribed_topics.remove(topic);
        Ok(())
    }

    /// Replace the assigned queues, fixing the mode to ASSIGN
    ///
    /// The subscribed topics become the topics of the new queues. The
    /// membership state and the set of queues paused in the client are left
    /// alone; the next decision pauses whatever of the new set is not paused
    /// yet and resumes paused queues that are no longer assigned.
    pub fn assign<I>(&mut self, queues: I) -> Result<()>
    where
        I: IntoIterator<Item = MessageQueue>,
    {
        self.claim_mode(SubscriptionMode::Assign)?;
        self.assigned_queues = queues.into_iter().collect();
        self.subscribed_topics = self
            .assigned_queues
            .iter()
            .map(|queue| queue.topic.clone())
            .collect();
        Ok(())
    }

    /// Queues currently paused in the client
    pub fn paused_queues(&self) -> Vec<MessageQueue> {
        self.paused_queues.iter().cloned().collect()
    }

    /// Assigned queues the client still consumes from
    pub fn unpaused_assigned_queues(&self) -> Vec<MessageQueue> {
        self.assigned_queues
            .difference(&self.paused_queues)
            .cloned()
            .collect()
    }

    /// Queues paused in the client that are no longer assigned
    pub fn stale_paused_queues(&self) -> Vec<MessageQueue> {
        self.paused_queues
            .difference(&self.assigned_queues)
            .cloned()
            .collect()
    }

    /// Record queues the client has just paused
    pub fn mark_paused(&mut self, queues: &[MessageQueue]) {
        self.paused_queues.extend(queues.iter().cloned());
    }

    /// Record queues the client has just resumed
    pub fn mark_resumed(&mut self, queues: &[MessageQueue]) {
        for queue in queues {
            self.paused_queues.remove(queue);
        }
    }

    /// Move to a new membership state, returning the new epoch
    pub fn transition(&mut self, state: MembershipState) -> u64 {
        self.state = state;
        self.epoch += 1;
        self.last_transition = Some(Utc::now());
        self.epoch
    }

    /// Mark the consumer as shut down; pending confirmations discard their result
    pub fn mark_shut_down(&mut self) {
        self.shut_down = true;
        self.epoch += 1;
    }

    /// Serializable snapshot for operators
    pub fn status(&self) -> ConsumerStatus {
        let mut topics: Vec<String> = self.subscribed_topics.iter().cloned().collect();
        topics.sort();

        ConsumerStatus {
            id: self.id,
            instance_name: self.instance_name.clone(),
            consumer_group: self.consumer_group.clone(),
            kind: self.kind,
            mode: self.mode,
            subscribed_topics: topics,
            assigned_queues: self.assigned_queues(),
            paused_queues: self.paused_queues(),
            state: self.state,
            paused: self.is_paused(),
            last_transition: self.last_transition,
        }
    }

    fn claim_mode(&mut self, requested: SubscriptionMode) -> Result<()> {
        match self.mode {
            Some(current) if current != requested => Err(Error::ModeConflict {
                consumer: self.id,
                current,
                requested,
            }),
            _ => {
                self.mode = Some(requested);
                Ok(())
            }
        }
    }
}

/// Point-in-time status of one registered consumer
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConsumerStatus {
    pub id: ConsumerId,
    pub instance_name: String,
    pub consumer_group: String,
    pub kind: ConsumerKind,
    pub mode: Option<SubscriptionMode>,
    pub subscribed_topics: Vec<String>,
    pub assigned_queues: Vec<MessageQueue>,
    pub paused_queues: Vec<MessageQueue>,
    pub state: MembershipState,
    pub paused: bool,
    pub last_transition: Option<DateTime<Utc>>,
}
