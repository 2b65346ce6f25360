use once_cell::sync::Lazy;
use std::sync::Arc;
use tracing::warn;

use crate::prohibition::{
    config::ControllerConfig,
    coordinator::GroupCoordinator,
    handler::{BuiltinPolicyHandler, HandlerContext, PolicyHandler, Trigger},
    policy::PolicyStore,
    registry::{ConsumerRegistry, ConsumerSlot, PreRegistrationCache},
    types::{ConsumerId, ProhibitionPolicy},
    wrapper::{ConsumerStatus, ConsumerWrapper},
};

static GLOBAL: Lazy<Arc<ProhibitionController>> = Lazy::new(|| {
    let config = ControllerConfig::from_env().unwrap_or_else(|err| {
        warn!(error = %err, "Invalid prohibition controller configuration, using defaults");
        ControllerConfig::default()
    });
    Arc::new(ProhibitionController::new(config))
});

/// The process-wide controller, created on first use from the environment
///
/// For instrumentation layers that have no place to keep their own instance.
pub fn global() -> Arc<ProhibitionController> {
    Arc::clone(&GLOBAL)
}

/// Consumption prohibition controller
///
/// Owns the consumer registry, the pre-registration cache, the current
/// policy, and the group membership coordinator. The lifecycle hooks
/// ([`LifecycleHooks`](crate::prohibition::LifecycleHooks)) and the policy
/// listener ([`PolicyListener`](crate::prohibition::PolicyListener)) are
/// implemented on it.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use mq_consume_prohibition::prohibition::{
///     ControllerConfig, ProhibitionController, ProhibitionPolicy,
/// };
///
/// let controller = Arc::new(
///     ProhibitionController::new(ControllerConfig::default())
///         .with_policy(ProhibitionPolicy::new(["orders"])),
/// );
/// assert!(controller.policy().is_prohibited("orders"));
/// assert!(controller.registry().is_empty());
/// ```
pub struct ProhibitionController {
    registry: ConsumerRegistry,
    pending: PreRegistrationCache,
    policy: PolicyStore,
    coordinator: GroupCoordinator,
    handler: Arc<dyn PolicyHandler>,
}

impl ProhibitionController {
    /// Create a controller with a disabled policy and the built-in handler
    pub fn new(config: ControllerConfig) -> Self {
        Self {
            registry: ConsumerRegistry::new(),
            pending: PreRegistrationCache::new(),
            policy: PolicyStore::default(),
            coordinator: GroupCoordinator::new(config),
            handler: Arc::new(BuiltinPolicyHandler),
        }
    }

    /// Set the initial policy (builder pattern)
    pub fn with_policy(self, policy: ProhibitionPolicy) -> Self {
        self.policy.replace(policy.normalized());
        self
    }

    /// Replace the built-in decision handler (builder pattern)
    pub fn with_handler(mut self, handler: Arc<dyn PolicyHandler>) -> Self {
        self.handler = handler;
        self
    }

    pub fn registry(&self) -> &ConsumerRegistry {
        &self.registry
    }

    pub fn pending(&self) -> &PreRegistrationCache {
        &self.pending
    }

    pub fn coordinator(&self) -> &GroupCoordinator {
        &self.coordinator
    }

    pub fn handler(&self) -> &Arc<dyn PolicyHandler> {
        &self.handler
    }

    /// The policy currently in force
    pub fn policy(&self) -> Arc<ProhibitionPolicy> {
        self.policy.load()
    }

    pub(crate) fn policy_store(&self) -> &PolicyStore {
        &self.policy
    }

    /// Whether the consumer is paused, `None` if it is not registered
    pub async fn is_paused(&self, id: ConsumerId) -> Option<bool> {
        let slot = self.registry.lookup(id)?;
        let wrapper = slot.lock().await;
        Some(wrapper.is_paused())
    }

    /// Status of every registered consumer, ordered by identity
    pub async fn status(&self) -> Vec<ConsumerStatus> {
        let mut statuses = Vec::new();
        for (_, slot) in self.registry.snapshot() {
            let wrapper = slot.lock().await;
            statuses.push(wrapper.status());
        }
        statuses.sort_by_key(|status| status.id);
        statuses
    }

    /// Wait for all in-flight group-exit confirmations to settle
    pub async fn wait_for_confirmations(&self) {
        self.coordinator.wait_for_confirmations().await;
    }

    /// Run the installed handler for one locked consumer against the current policy
    pub(crate) async fn evaluate(
        &self,
        trigger: Trigger,
        slot: &ConsumerSlot,
        wrapper: &mut ConsumerWrapper,
    ) {
        let policy = self.policy.load();
        self.handler
            .apply(HandlerContext {
                trigger,
                slot,
                consumer: wrapper,
                policy: &policy,
                coordinator: &self.coordinator,
            })
            .await;
    }
}

impl Default for ProhibitionController {
    fn default() -> Self {
        Self::new(ControllerConfig::default())
    }
}
