use async_trait::async_trait;
use futures::future::join_all;
use tracing::{debug, info};

use crate::prohibition::{
    controller::ProhibitionController,
    error::Result,
    handler::Trigger,
    types::ProhibitionPolicy,
};

/// Receives policy updates from the dynamic configuration source
#[async_trait]
pub trait PolicyListener: Send + Sync {
    /// Install `policy` and re-evaluate every registered consumer
    async fn on_policy_update(&self, policy: ProhibitionPolicy);
}

#[async_trait]
impl PolicyListener for ProhibitionController {
    async fn on_policy_update(&self, policy: ProhibitionPolicy) {
        let policy = policy.normalized();
        let mut topics: Vec<&String> = policy.prohibited_topics.iter().collect();
        topics.sort();
        info!(
            enabled = policy.enabled,
            topics = ?topics,
            "Prohibition policy updated"
        );
        self.policy_store().replace(policy);

        // Consumers registering during the sweep decide for themselves at start
        let consumers = self.registry().snapshot();
        debug!(consumers = consumers.len(), "Re-evaluating registered consumers");
        join_all(consumers.into_iter().map(|(id, slot)| async move {
            let mut wrapper = slot.lock().await;
            if wrapper.is_shut_down() {
                debug!(consumer = %id, "Skipping consumer shut down during policy sweep");
                return;
            }
            self.evaluate(Trigger::PolicyUpdate, &slot, &mut wrapper).await;
        }))
        .await;
    }
}

impl ProhibitionController {
    /// Parse a policy document and apply it
    ///
    /// A document that does not parse leaves the current policy in force.
    pub async fn apply_policy_json(&self, document: &str) -> Result<()> {
        let policy = ProhibitionPolicy::from_json(document)?;
        PolicyListener::on_policy_update(self, policy).await;
        Ok(())
    }
}
