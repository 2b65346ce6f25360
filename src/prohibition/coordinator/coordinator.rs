use std::sync::Arc;
use tokio_util::task::TaskTracker;
use tracing::{debug, info, warn, Instrument};

use crate::prohibition::{
    config::ControllerConfig,
    coordinator::{confirmation::GroupExitConfirmation, scope::controller_call},
    decision::Decision,
    registry::ConsumerSlot,
    types::{MembershipState, MessageQueue, SubscriptionMode},
    wrapper::ConsumerWrapper,
};

/// Drives a consumer's group membership to the decided state
///
/// Every step is awaited before the next one; in particular offsets are
/// always persisted before the consumer leaves its group. Failures abort the
/// transition and leave the consumer in its prior state, and are only logged.
///
/// SUBSCRIBE-mode suspension:
///
/// ```text
/// ACTIVE ─► persist offsets ─► unregister ─► rebalance ─► SUSPENDING
///                                                             │
///            confirmation task (every interval, max_retries) ◄┘
///              ├─ client id gone from every topic ─► SUSPENDED
///              └─ retries exhausted ─► register again ─► ACTIVE
/// ```
///
/// ASSIGN-mode consumers are not group members; they only pause and resume
/// queues. The wrapper tracks which queues are paused in the client, so a
/// re-assignment pauses only the new queues and resumes the ones it dropped.
pub struct GroupCoordinator {
    config: ControllerConfig,
    confirmations: TaskTracker,
}

impl GroupCoordinator {
    pub fn new(config: ControllerConfig) -> Self {
        Self {
            config,
            confirmations: TaskTracker::new(),
        }
    }

    pub fn config(&self) -> &ControllerConfig {
        &self.config
    }

    /// Apply `decision` to the locked wrapper held in `slot`
    ///
    /// Idempotent: suspending a suspended consumer or resuming an active one
    /// is a logged no-op.
    pub async fn drive(&self, decision: Decision, slot: &ConsumerSlot, wrapper: &mut ConsumerWrapper) {
        match decision {
            Decision::Suspend => self.suspend(slot, wrapper).await,
            Decision::Resume => self.resume(wrapper).await,
        }
    }

    /// Withdraw the consumer from consumption
    pub async fn suspend(&self, slot: &ConsumerSlot, wrapper: &mut ConsumerWrapper) {
        match wrapper.mode() {
            Some(SubscriptionMode::Subscribe) => self.suspend_subscribed(slot, wrapper).await,
            Some(SubscriptionMode::Assign) => self.suspend_assigned(wrapper).await,
            None => debug!(
                consumer = %wrapper.id(),
                "Consumer has neither subscribed nor been assigned queues, nothing to suspend"
            ),
        }
    }

    /// Return the consumer to consumption
    pub async fn resume(&self, wrapper: &mut ConsumerWrapper) {
        match wrapper.mode() {
            Some(SubscriptionMode::Subscribe) => self.resume_subscribed(wrapper).await,
            Some(SubscriptionMode::Assign) => self.resume_assigned(wrapper).await,
            None => debug!(
                consumer = %wrapper.id(),
                "Consumer has neither subscribed nor been assigned queues, nothing to resume"
            ),
        }
    }

    /// Wait until every running confirmation task has finished
    ///
    /// Meant for orderly shutdown and tests; new confirmations may be started
    /// again once this returns.
    pub async fn wait_for_confirmations(&self) {
        self.confirmations.close();
        self.confirmations.wait().await;
        self.confirmations.reopen();
    }

    /// Number of confirmation tasks still running
    pub fn pending_confirmations(&self) -> usize {
        self.confirmations.len()
    }

    async fn suspend_subscribed(&self, slot: &ConsumerSlot, wrapper: &mut ConsumerWrapper) {
        match wrapper.state() {
            MembershipState::Suspended => {
                debug!(
                    consumer = %wrapper.id(),
                    instance = wrapper.instance_name(),
                    group = wrapper.consumer_group(),
                    topics = ?wrapper.subscribed_topics(),
                    "Consumer has prohibited consumption"
                );
                return;
            }
            MembershipState::Suspending => {
                debug!(
                    consumer = %wrapper.id(),
                    "Consumer is already leaving its group, awaiting confirmation"
                );
                return;
            }
            MembershipState::Active => {}
        }

        let client = Arc::clone(wrapper.client());
        let group = wrapper.consumer_group().to_string();

        if let Err(err) = controller_call(client.persist_offsets()).await {
            warn!(
                consumer = %wrapper.id(),
                group = %group,
                error = %err,
                "Failed to persist offsets, consumption not prohibited"
            );
            return;
        }

        if let Err(err) = controller_call(client.unregister_consumer(&group)).await {
            warn!(
                consumer = %wrapper.id(),
                group = %group,
                error = %err,
                "Failed to leave consumer group, consumption not prohibited"
            );
            return;
        }

        if let Err(err) = controller_call(client.rebalance()).await {
            warn!(
                consumer = %wrapper.id(),
                group = %group,
                error = %err,
                "Rebalance after leaving group failed, queues are released on broker timeout"
            );
        }

        let epoch = wrapper.transition(MembershipState::Suspending);
        info!(
            consumer = %wrapper.id(),
            instance = wrapper.instance_name(),
            group = %group,
            topics = ?wrapper.subscribed_topics(),
            "Consumer left its group, confirming exit"
        );

        let confirmation = GroupExitConfirmation::capture(slot, wrapper, epoch);
        self.confirmations.spawn(
            confirmation
                .run(self.config.confirm_interval(), self.config.confirm_max_retries)
                .in_current_span(),
        );
    }

    async fn suspend_assigned(&self, wrapper: &mut ConsumerWrapper) {
        let to_pause = wrapper.unpaused_assigned_queues();
        let stale = wrapper.stale_paused_queues();
        if to_pause.is_empty() && stale.is_empty() && wrapper.is_paused() {
            debug!(
                consumer = %wrapper.id(),
                queues = ?wrapper.assigned_queues(),
                "Assigned queues are already paused"
            );
            return;
        }

        if !to_pause.is_empty() {
            if let Err(err) = controller_call(wrapper.client().pause(&to_pause)).await {
                warn!(
                    consumer = %wrapper.id(),
                    queues = ?to_pause,
                    error = %err,
                    "Failed to pause assigned queues, consumption not prohibited"
                );
                return;
            }
            wrapper.mark_paused(&to_pause);
        }

        // Queues dropped from the assignment must not stay paused in the client
        self.release_stale(wrapper, &stale).await;

        if wrapper.state() != MembershipState::Suspended {
            wrapper.transition(MembershipState::Suspended);
        }
        info!(
            consumer = %wrapper.id(),
            instance = wrapper.instance_name(),
            group = wrapper.consumer_group(),
            queues = ?wrapper.assigned_queues(),
            "Success to prohibit consumption"
        );
    }

    async fn release_stale(&self, wrapper: &mut ConsumerWrapper, stale: &[MessageQueue]) {
        if stale.is_empty() {
            return;
        }
        let resumed = controller_call(wrapper.client().resume(stale)).await;
        match resumed {
            Ok(()) => wrapper.mark_resumed(stale),
            Err(err) => warn!(
                consumer = %wrapper.id(),
                queues = ?stale,
                error = %err,
                "Failed to resume queues no longer assigned"
            ),
        }
    }

    async fn resume_subscribed(&self, wrapper: &mut ConsumerWrapper) {
        if wrapper.state() == MembershipState::Active {
            debug!(
                consumer = %wrapper.id(),
                instance = wrapper.instance_name(),
                group = wrapper.consumer_group(),
                topics = ?wrapper.subscribed_topics(),
                "Consumer has opened consumption"
            );
            return;
        }

        let client = Arc::clone(wrapper.client());
        let group = wrapper.consumer_group().to_string();

        if let Err(err) = controller_call(client.register_consumer(&group)).await {
            warn!(
                consumer = %wrapper.id(),
                group = %group,
                error = %err,
                "Failed to rejoin consumer group, consumption stays prohibited"
            );
            return;
        }

        if let Err(err) = controller_call(client.rebalance()).await {
            warn!(
                consumer = %wrapper.id(),
                group = %group,
                error = %err,
                "Rebalance after rejoining group failed"
            );
        }

        wrapper.transition(MembershipState::Active);
        info!(
            consumer = %wrapper.id(),
            instance = wrapper.instance_name(),
            group = %group,
            topics = ?wrapper.subscribed_topics(),
            "Success to open consumption"
        );
    }

    async fn resume_assigned(&self, wrapper: &mut ConsumerWrapper) {
        let paused = wrapper.paused_queues();
        if paused.is_empty() && !wrapper.is_paused() {
            debug!(
                consumer = %wrapper.id(),
                queues = ?wrapper.assigned_queues(),
                "Assigned queues are not paused"
            );
            return;
        }

        if !paused.is_empty() {
            if let Err(err) = controller_call(wrapper.client().resume(&paused)).await {
                warn!(
                    consumer = %wrapper.id(),
                    queues = ?paused,
                    error = %err,
                    "Failed to resume paused queues, consumption stays prohibited"
                );
                return;
            }
            wrapper.mark_resumed(&paused);
        }

        wrapper.transition(MembershipState::Active);
        info!(
            consumer = %wrapper.id(),
            instance = wrapper.instance_name(),
            group = wrapper.consumer_group(),
            queues = ?paused,
            "Success to open consumption"
        );
    }
}

impl Default for GroupCoordinator {
    fn default() -> Self {
        Self::new(ControllerConfig::default())
    }
}
