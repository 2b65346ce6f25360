//! Pluggable decision strategy

use async_trait::async_trait;
use std::fmt;
use tracing::debug;

use crate::prohibition::{
    coordinator::GroupCoordinator,
    decision::decide,
    registry::ConsumerSlot,
    types::ProhibitionPolicy,
    wrapper::ConsumerWrapper,
};

/// The event that caused a consumer to be re-evaluated
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    Start,
    Subscribe,
    Unsubscribe,
    Assign,
    PolicyUpdate,
}

impl fmt::Display for Trigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Trigger::Start => "start",
            Trigger::Subscribe => "subscribe",
            Trigger::Unsubscribe => "unsubscribe",
            Trigger::Assign => "assign",
            Trigger::PolicyUpdate => "policy-update",
        };
        f.write_str(name)
    }
}

/// What a handler gets to work with for one consumer
///
/// The wrapper is locked for the whole call.
pub struct HandlerContext<'a> {
    pub trigger: Trigger,
    pub slot: &'a ConsumerSlot,
    pub consumer: &'a mut ConsumerWrapper,
    pub policy: &'a ProhibitionPolicy,
    pub coordinator: &'a GroupCoordinator,
}

/// Decides what happens to a consumer after each lifecycle or policy event
///
/// The controller uses [`BuiltinPolicyHandler`] unless another handler is
/// installed with `ProhibitionController::with_handler`. Registry bookkeeping
/// runs before the handler regardless of which one is installed.
#[async_trait]
pub trait PolicyHandler: Send + Sync {
    /// Short name used in logs
    fn name(&self) -> &str;

    async fn apply(&self, ctx: HandlerContext<'_>);
}

/// Decision engine followed by the group membership coordinator
#[derive(Debug, Default, Clone, Copy)]
pub struct BuiltinPolicyHandler;

#[async_trait]
impl PolicyHandler for BuiltinPolicyHandler {
    fn name(&self) -> &str {
        "builtin"
    }

    async fn apply(&self, ctx: HandlerContext<'_>) {
        let decision = decide(ctx.consumer.subscribed_topics(), ctx.policy);
        debug!(
            consumer = %ctx.consumer.id(),
            trigger = %ctx.trigger,
            decision = %decision,
            state = %ctx.consumer.state(),
            "Evaluated consumer against prohibition policy"
        );
        ctx.coordinator.drive(decision, ctx.slot, ctx.consumer).await;
    }
}
