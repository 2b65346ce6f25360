#![allow(dead_code)]

use async_trait::async_trait;
use mq_consume_prohibition::prohibition::{
    ConsumerClient, ConsumerId, ConsumerKind, ConsumerRef, ConsumerStatus, ControllerConfig,
    Error, LifecycleHooks, MessageQueue, ProhibitionController, Result,
};
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

/// Logical clock shared by every mock, so call order is comparable across consumers
static CLOCK: AtomicU64 = AtomicU64::new(1);

/// Confirmation poll interval used by the tests (milliseconds)
pub const CONFIRM_INTERVAL_MS: u64 = 100;

/// Confirmation attempts used by the tests
pub const CONFIRM_MAX_RETRIES: u32 = 5;

/// Controller configuration with a short confirmation window
pub fn test_config() -> ControllerConfig {
    ControllerConfig::new()
        .with_confirm_interval_ms(CONFIRM_INTERVAL_MS)
        .with_confirm_max_retries(CONFIRM_MAX_RETRIES)
}

/// One recorded outbound call
#[derive(Debug, Clone)]
pub struct Call {
    pub seq: u64,
    pub op: &'static str,
}

/// Hook the mock re-enters from inside `unregister_consumer` and `pause`
#[derive(Clone)]
struct Reentry {
    controller: Arc<ProhibitionController>,
    consumer: ConsumerRef,
    topic: String,
}

/// Recording consumer client
///
/// Tracks group registration like a broker would: after `unregister_consumer`
/// the client id disappears from `find_consumer_ids`, unless the mock is
/// sticky, in which case the broker never notices the exit.
pub struct MockConsumer {
    id: ConsumerId,
    instance_name: String,
    group: Option<String>,
    client_id: String,
    kind: ConsumerKind,
    registered: AtomicBool,
    sticky_membership: AtomicBool,
    sticky_topics: Mutex<HashSet<String>>,
    failing: Mutex<HashSet<&'static str>>,
    calls: Mutex<Vec<Call>>,
    paused_queues: Mutex<HashSet<MessageQueue>>,
    reentry: Mutex<Option<Reentry>>,
}

impl MockConsumer {
    fn build(kind: ConsumerKind, instance_name: &str, group: Option<&str>) -> Self {
        Self {
            id: ConsumerId::next(),
            instance_name: instance_name.to_string(),
            group: group.map(str::to_string),
            client_id: format!("127.0.0.1@{}", instance_name),
            kind,
            registered: AtomicBool::new(true),
            sticky_membership: AtomicBool::new(false),
            sticky_topics: Mutex::new(HashSet::new()),
            failing: Mutex::new(HashSet::new()),
            calls: Mutex::new(Vec::new()),
            paused_queues: Mutex::new(HashSet::new()),
            reentry: Mutex::new(None),
        }
    }

    /// A push consumer in `group`
    pub fn push(instance_name: &str, group: &str) -> Arc<Self> {
        Arc::new(Self::build(ConsumerKind::Push, instance_name, Some(group)))
    }

    /// A pull consumer in `group`
    pub fn pull(instance_name: &str, group: &str) -> Arc<Self> {
        Arc::new(Self::build(ConsumerKind::Pull, instance_name, Some(group)))
    }

    /// A push consumer whose client cannot report its group
    pub fn without_group(instance_name: &str) -> Arc<Self> {
        Arc::new(Self::build(ConsumerKind::Push, instance_name, None))
    }

    /// The broker keeps listing this consumer after it leaves the group
    pub fn set_sticky_membership(&self, sticky: bool) {
        self.sticky_membership.store(sticky, Ordering::SeqCst);
    }

    /// The broker keeps listing this consumer on `topic` after it leaves the group
    pub fn set_sticky_topic(&self, topic: &str) {
        self.sticky_topics.lock().unwrap().insert(topic.to_string());
    }

    /// Make the named client operation fail from now on
    pub fn fail(&self, op: &'static str) {
        self.failing.lock().unwrap().insert(op);
    }

    /// Make the named client operation succeed again
    pub fn heal(&self, op: &'static str) {
        self.failing.lock().unwrap().remove(op);
    }

    /// Re-enter `on_subscribe(topic)` from inside `unregister_consumer` and `pause`
    pub fn reenter_on_subscribe(
        &self,
        controller: Arc<ProhibitionController>,
        consumer: ConsumerRef,
        topic: &str,
    ) {
        *self.reentry.lock().unwrap() = Some(Reentry {
            controller,
            consumer,
            topic: topic.to_string(),
        });
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    /// Number of recorded calls to `op`
    pub fn count(&self, op: &str) -> usize {
        self.calls().iter().filter(|call| call.op == op).count()
    }

    /// Logical timestamps of every call to `op`
    pub fn seqs(&self, op: &str) -> Vec<u64> {
        self.calls()
            .iter()
            .filter(|call| call.op == op)
            .map(|call| call.seq)
            .collect()
    }

    pub fn is_registered(&self) -> bool {
        self.registered.load(Ordering::SeqCst)
    }

    pub fn paused_queues(&self) -> HashSet<MessageQueue> {
        self.paused_queues.lock().unwrap().clone()
    }

    fn record(&self, op: &'static str) -> Result<()> {
        let seq = CLOCK.fetch_add(1, Ordering::SeqCst);
        self.calls.lock().unwrap().push(Call { seq, op });
        if self.failing.lock().unwrap().contains(op) {
            return Err(Error::broker(op, "injected failure"));
        }
        Ok(())
    }

    async fn maybe_reenter(&self) {
        let reentry = self.reentry.lock().unwrap().clone();
        if let Some(reentry) = reentry {
            reentry
                .controller
                .on_subscribe(&reentry.consumer, &reentry.topic)
                .await;
        }
    }
}

#[async_trait]
impl ConsumerClient for MockConsumer {
    fn consumer_id(&self) -> ConsumerId {
        self.id
    }

    fn instance_name(&self) -> String {
        self.instance_name.clone()
    }

    fn consumer_group(&self) -> Option<String> {
        self.group.clone()
    }

    fn client_id(&self) -> String {
        self.client_id.clone()
    }

    fn kind(&self) -> ConsumerKind {
        self.kind
    }

    async fn persist_offsets(&self) -> Result<()> {
        self.record("persist_offsets")
    }

    async fn unregister_consumer(&self, _group: &str) -> Result<()> {
        self.record("unregister_consumer")?;
        self.maybe_reenter().await;
        self.registered.store(false, Ordering::SeqCst);
        Ok(())
    }

    async fn register_consumer(&self, _group: &str) -> Result<()> {
        self.record("register_consumer")?;
        self.registered.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn rebalance(&self) -> Result<()> {
        self.record("rebalance")
    }

    async fn find_consumer_ids(&self, topic: &str, _group: &str) -> Result<Vec<String>> {
        self.record("find_consumer_ids")?;
        let mut members = vec!["10.0.0.9@other".to_string()];
        let sticky = self.sticky_membership.load(Ordering::SeqCst)
            || self.sticky_topics.lock().unwrap().contains(topic);
        if self.is_registered() || sticky {
            members.push(self.client_id.clone());
        }
        Ok(members)
    }

    async fn pause(&self, queues: &[MessageQueue]) -> Result<()> {
        self.record("pause")?;
        self.maybe_reenter().await;
        self.paused_queues.lock().unwrap().extend(queues.iter().cloned());
        Ok(())
    }

    async fn resume(&self, queues: &[MessageQueue]) -> Result<()> {
        self.record("resume")?;
        let mut paused = self.paused_queues.lock().unwrap();
        for queue in queues {
            paused.remove(queue);
        }
        Ok(())
    }
}

/// Upcast a mock to the handle the hooks take
pub fn consumer_ref(mock: &Arc<MockConsumer>) -> ConsumerRef {
    Arc::clone(mock) as ConsumerRef
}

/// Queues `0..count` of `topic` on a single broker
pub fn queues(topic: &str, count: u32) -> Vec<MessageQueue> {
    (0..count)
        .map(|queue_id| MessageQueue::new(topic, "broker-a", queue_id))
        .collect()
}

/// Start a push consumer subscribed to `topics` on `controller`
pub async fn start_push_consumer(
    controller: &ProhibitionController,
    instance_name: &str,
    topics: &[&str],
) -> Arc<MockConsumer> {
    let mock = MockConsumer::push(instance_name, "test-group");
    let consumer = consumer_ref(&mock);
    for topic in topics {
        controller.on_subscribe(&consumer, topic).await;
    }
    controller.on_start(&consumer).await;
    mock
}

/// Status of one registered consumer
pub async fn status_of(controller: &ProhibitionController, id: ConsumerId) -> Option<ConsumerStatus> {
    controller
        .status()
        .await
        .into_iter()
        .find(|status| status.id == id)
}
