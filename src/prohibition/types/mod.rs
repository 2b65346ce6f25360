pub mod consumer;
pub mod policy;

pub use consumer::{ConsumerId, ConsumerKind, MembershipState, MessageQueue, SubscriptionMode};
pub use policy::ProhibitionPolicy;
