//! Lifecycle hooks called by the instrumentation layer

use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, error, info, trace, warn};

use crate::prohibition::{
    client::ConsumerRef,
    controller::ProhibitionController,
    coordinator::is_controller_call,
    handler::Trigger,
    listener::PolicyListener,
    registry::{ConsumerSlot, PendingOp},
    types::{ConsumerId, MessageQueue, ProhibitionPolicy},
    wrapper::ConsumerWrapper,
};

/// The six points at which the instrumented client calls into the controller
///
/// Each hook is called after the intercepted client method returned, in the
/// order the client delivers them for one consumer. Hooks never fail: errors
/// are logged and the intercepted call carries on. Hooks re-entered from a
/// client call the controller itself made are no-ops.
#[async_trait]
pub trait LifecycleHooks: Send + Sync {
    /// Wrap and register the consumer, replay cached events, then decide once
    async fn on_start(&self, consumer: &ConsumerRef);

    /// Add `topic` to the consumer's subscriptions and decide again
    async fn on_subscribe(&self, consumer: &ConsumerRef, topic: &str);

    /// Drop `topic` from the consumer's subscriptions and decide again
    async fn on_unsubscribe(&self, consumer: &ConsumerRef, topic: &str);

    /// Replace the consumer's assigned queues and decide again
    async fn on_assign(&self, consumer: &ConsumerRef, queues: &[MessageQueue]);

    /// Forget the consumer; no decisions are made for it afterwards
    async fn on_shutdown(&self, consumer: &ConsumerRef);

    /// Install a new policy and re-evaluate every registered consumer
    async fn on_policy_update(&self, policy: ProhibitionPolicy);
}

#[async_trait]
impl LifecycleHooks for ProhibitionController {
    async fn on_start(&self, consumer: &ConsumerRef) {
        if is_controller_call() {
            trace!("Skipping start hook triggered by the controller");
            return;
        }

        let id = consumer.consumer_id();
        let wrapper = match ConsumerWrapper::wrap(Arc::clone(consumer)) {
            Ok(wrapper) => wrapper,
            Err(err) => {
                error!(
                    consumer = %id,
                    instance = %consumer.instance_name(),
                    error = %err,
                    "Fail to cache consumer"
                );
                return;
            }
        };

        let slot: ConsumerSlot = Arc::new(Mutex::new(wrapper));
        let mut wrapper = slot.lock().await;
        if let Some(existing) = self.registry().register(id, Arc::clone(&slot)) {
            drop(wrapper);
            debug!(consumer = %id, "Consumer started twice, re-evaluating registered instance");
            let mut wrapper = existing.lock().await;
            self.evaluate(Trigger::Start, &existing, &mut wrapper).await;
            return;
        }

        self.replay_pending(&mut wrapper);
        info!(
            consumer = %id,
            instance = wrapper.instance_name(),
            group = wrapper.consumer_group(),
            topics = ?wrapper.subscribed_topics(),
            "Success to cache consumer"
        );
        self.evaluate(Trigger::Start, &slot, &mut wrapper).await;
    }

    async fn on_subscribe(&self, consumer: &ConsumerRef, topic: &str) {
        if is_controller_call() {
            trace!("Skipping subscribe hook triggered by the controller");
            return;
        }
        let Some(topic) = non_blank(topic) else {
            debug!(consumer = %consumer.consumer_id(), "Ignoring subscribe without a topic");
            return;
        };
        self.apply_event(
            consumer.consumer_id(),
            Trigger::Subscribe,
            PendingOp::Subscribe(topic),
        )
        .await;
    }

    async fn on_unsubscribe(&self, consumer: &ConsumerRef, topic: &str) {
        if is_controller_call() {
            trace!("Skipping unsubscribe hook triggered by the controller");
            return;
        }
        let Some(topic) = non_blank(topic) else {
            debug!(consumer = %consumer.consumer_id(), "Ignoring unsubscribe without a topic");
            return;
        };
        self.apply_event(
            consumer.consumer_id(),
            Trigger::Unsubscribe,
            PendingOp::Unsubscribe(topic),
        )
        .await;
    }

    async fn on_assign(&self, consumer: &ConsumerRef, queues: &[MessageQueue]) {
        if is_controller_call() {
            trace!("Skipping assign hook triggered by the controller");
            return;
        }
        if queues.iter().any(|queue| queue.topic.trim().is_empty()) {
            debug!(consumer = %consumer.consumer_id(), "Ignoring assign with a queue lacking a topic");
            return;
        }
        self.apply_event(
            consumer.consumer_id(),
            Trigger::Assign,
            PendingOp::Assign(queues.to_vec()),
        )
        .await;
    }

    async fn on_shutdown(&self, consumer: &ConsumerRef) {
        if is_controller_call() {
            trace!("Skipping shutdown hook triggered by the controller");
            return;
        }

        let id = consumer.consumer_id();
        self.pending().drain(id);
        match self.registry().remove(id) {
            Some(slot) => {
                let mut wrapper = slot.lock().await;
                wrapper.mark_shut_down();
                info!(
                    consumer = %id,
                    instance = wrapper.instance_name(),
                    group = wrapper.consumer_group(),
                    topics = ?wrapper.subscribed_topics(),
                    "Success to remove consumer"
                );
            }
            None => debug!(consumer = %id, "Shutdown of unknown consumer"),
        }
    }

    async fn on_policy_update(&self, policy: ProhibitionPolicy) {
        PolicyListener::on_policy_update(self, policy).await;
    }
}

impl ProhibitionController {
    /// Apply a subscribe/unsubscribe/assign to the wrapper, or cache it until start
    async fn apply_event(&self, id: ConsumerId, trigger: Trigger, op: PendingOp) {
        if let Some(slot) = self.registry().lookup(id) {
            let mut wrapper = slot.lock().await;
            if wrapper.is_shut_down() {
                debug!(consumer = %id, trigger = %trigger, "Ignoring event for a shut down consumer");
                return;
            }
            if let Err(err) = op.apply(&mut wrapper) {
                warn!(consumer = %id, trigger = %trigger, error = %err, "Ignoring lifecycle event");
                return;
            }
            self.evaluate(trigger, &slot, &mut wrapper).await;
            return;
        }

        self.pending().record(id, op);
        debug!(consumer = %id, trigger = %trigger, "Consumer not started yet, cached event");

        // start may have registered the consumer after the lookup above
        if let Some(slot) = self.registry().lookup(id) {
            let mut wrapper = slot.lock().await;
            if self.replay_pending(&mut wrapper) {
                self.evaluate(trigger, &slot, &mut wrapper).await;
            }
        }
    }

    /// Replay and remove cached events for the wrapper; false if there were none
    fn replay_pending(&self, wrapper: &mut ConsumerWrapper) -> bool {
        let Some(ops) = self.pending().drain(wrapper.id()) else {
            return false;
        };
        for op in ops {
            if let Err(err) = op.apply(wrapper) {
                warn!(consumer = %wrapper.id(), error = %err, "Dropping cached lifecycle event");
            }
        }
        true
    }
}

fn non_blank(topic: &str) -> Option<String> {
    let topic = topic.trim();
    (!topic.is_empty()).then(|| topic.to_string())
}
