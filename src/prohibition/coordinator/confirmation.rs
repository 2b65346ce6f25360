use std::sync::Arc;
use std::time::Duration;
use tokio::time;
use tracing::{debug, error, info, warn};

use crate::prohibition::{
    client::ConsumerRef,
    coordinator::scope::controller_call,
    registry::ConsumerSlot,
    types::MembershipState,
    wrapper::ConsumerWrapper,
};

/// Everything the background confirmation needs, captured at suspension time
pub(crate) struct GroupExitConfirmation {
    pub(crate) slot: ConsumerSlot,
    pub(crate) epoch: u64,
    pub(crate) client: ConsumerRef,
    pub(crate) consumer_group: String,
    pub(crate) client_id: String,
}

impl GroupExitConfirmation {
    /// Capture a wrapper that just entered `Suspending` at `epoch`
    ///
    /// Topics are not captured: every attempt reads the wrapper's current
    /// subscriptions, so a topic subscribed while suspending is checked too.
    pub(crate) fn capture(slot: &ConsumerSlot, wrapper: &ConsumerWrapper, epoch: u64) -> Self {
        Self {
            slot: Arc::clone(slot),
            epoch,
            client: Arc::clone(wrapper.client()),
            consumer_group: wrapper.consumer_group().to_string(),
            client_id: wrapper.client_id().to_string(),
        }
    }

    /// Poll the broker until the consumer has left its group, then settle the wrapper
    ///
    /// Finishes within `interval * max_retries` plus the time spent waiting
    /// for the wrapper lock. On success the wrapper is marked paused; on
    /// exhaustion the consumer is registered with its group again. The result
    /// is dropped if the wrapper moved on in the meantime.
    pub(crate) async fn run(self, interval: Duration, max_retries: u32) {
        let exited = self.wait_for_group_exit(interval, max_retries).await;

        let mut wrapper = self.slot.lock().await;
        if wrapper.is_shut_down() || wrapper.epoch() != self.epoch {
            debug!(
                consumer = %wrapper.id(),
                "Consumer changed while confirming group exit, discarding result"
            );
            return;
        }

        if exited {
            wrapper.transition(MembershipState::Suspended);
            info!(
                consumer = %wrapper.id(),
                instance = wrapper.instance_name(),
                group = wrapper.consumer_group(),
                topics = ?wrapper.subscribed_topics(),
                "Success to prohibit consumption"
            );
            return;
        }

        error!(
            consumer = %wrapper.id(),
            instance = wrapper.instance_name(),
            group = wrapper.consumer_group(),
            topics = ?wrapper.subscribed_topics(),
            retries = max_retries,
            "Consumer exiting the consumer group timed out, failed to prohibit consumption. \
             Please deliver the configuration again"
        );
        self.roll_back(&mut wrapper).await;
    }

    async fn wait_for_group_exit(&self, interval: Duration, max_retries: u32) -> bool {
        for attempt in 1..=max_retries {
            time::sleep(interval).await;
            let Some(topics) = self.current_topics().await else {
                // Superseded; the caller discards the result
                return false;
            };
            if self.has_left_group(&topics).await {
                return true;
            }
            debug!(
                client_id = %self.client_id,
                group = %self.consumer_group,
                attempt,
                "Consumer still listed in group"
            );
        }
        false
    }

    /// Sorted subscriptions, or `None` once the wrapper moved past this epoch
    async fn current_topics(&self) -> Option<Vec<String>> {
        let wrapper = self.slot.lock().await;
        if wrapper.is_shut_down() || wrapper.epoch() != self.epoch {
            return None;
        }
        let mut topics: Vec<String> = wrapper.subscribed_topics().iter().cloned().collect();
        topics.sort();
        Some(topics)
    }

    async fn has_left_group(&self, topics: &[String]) -> bool {
        for topic in topics {
            match self.client.find_consumer_ids(topic, &self.consumer_group).await {
                Ok(members) => {
                    if members.iter().any(|member| *member == self.client_id) {
                        return false;
                    }
                }
                Err(err) => {
                    debug!(topic = %topic, error = %err, "Failed to query group members");
                    return false;
                }
            }
        }
        true
    }

    async fn roll_back(&self, wrapper: &mut ConsumerWrapper) {
        if let Err(err) = controller_call(self.client.register_consumer(&self.consumer_group)).await {
            // Still out of the group, so report it as suspended and let a later RESUME retry
            wrapper.transition(MembershipState::Suspended);
            error!(
                consumer = %wrapper.id(),
                group = wrapper.consumer_group(),
                error = %err,
                "Failed to re-register consumer after confirmation timeout"
            );
            return;
        }
        if let Err(err) = controller_call(self.client.rebalance()).await {
            warn!(consumer = %wrapper.id(), error = %err, "Rebalance after re-registering failed");
        }
        wrapper.transition(MembershipState::Active);
        info!(
            consumer = %wrapper.id(),
            instance = wrapper.instance_name(),
            group = wrapper.consumer_group(),
            "Consumer rejoined its group after failed suspension"
        );
    }
}
