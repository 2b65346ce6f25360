//! Outbound boundary to the underlying message-queue client

use async_trait::async_trait;
use std::sync::Arc;

use crate::prohibition::{
    error::Result,
    types::{ConsumerId, ConsumerKind, MessageQueue},
};

/// Shared handle to a live consumer, as passed to the lifecycle hooks
pub type ConsumerRef = Arc<dyn ConsumerClient>;

/// The operations the controller needs from one live consumer instance
///
/// Implemented by the instrumentation layer over the real client library.
/// Every async method is a blocking call into the client; the controller
/// always awaits it before taking the next step of a transition, and catches
/// and logs any error it returns.
#[async_trait]
pub trait ConsumerClient: Send + Sync {
    /// Stable identity of this consumer, used as the registry key
    fn consumer_id(&self) -> ConsumerId;

    /// Display name of the client instance
    fn instance_name(&self) -> String;

    /// Consumer group name, `None` if the client cannot provide it
    fn consumer_group(&self) -> Option<String>;

    /// Client id as it appears in the broker's group member list
    fn client_id(&self) -> String;

    /// Push or pull style
    fn kind(&self) -> ConsumerKind;

    /// Synchronously flush consumed offsets to the broker
    async fn persist_offsets(&self) -> Result<()>;

    /// Remove this consumer from its group
    async fn unregister_consumer(&self, group: &str) -> Result<()>;

    /// Add this consumer back to its group
    async fn register_consumer(&self, group: &str) -> Result<()>;

    /// Run a local rebalance immediately
    async fn rebalance(&self) -> Result<()>;

    /// The broker's current member list for `group` on `topic`
    async fn find_consumer_ids(&self, topic: &str, group: &str) -> Result<Vec<String>>;

    /// Pause fetching from explicitly assigned queues
    async fn pause(&self, queues: &[MessageQueue]) -> Result<()>;

    /// Resume fetching from explicitly assigned queues
    async fn resume(&self, queues: &[MessageQueue]) -> Result<()>;
}
