//! Consumption Prohibition Controller
//!
//! Lets an operator stop, and later resume, message consumption on selected
//! topics for consumers that are already running, without restarting them,
//! without losing or duplicating messages, and without destabilizing the
//! consumer group.
//!
//! The instrumentation layer calls the [`LifecycleHooks`] when a consumer
//! starts, subscribes, unsubscribes, is assigned queues, or shuts down; the
//! configuration source calls the [`PolicyListener`] when the prohibited
//! topic set changes. Every such event re-runs the decision for the affected
//! consumers and, if needed, drives their group membership.
//!
//! ```text
//! LifecycleHooks ─► ConsumerRegistry ─► decide() ─► GroupCoordinator ─► ConsumerClient
//!                        ▲                 ▲
//!   PolicyListener ──────┴─────────────────┘  (every registered consumer)
//! ```
//!
//! # Quick Start
//!
//! ```no_run
//! use mq_consume_prohibition::prohibition::{
//!     ConsumerRef, ControllerConfig, LifecycleHooks, PolicyListener,
//!     ProhibitionController, ProhibitionPolicy,
//! };
//!
//! async fn instrumented(consumer: ConsumerRef) {
//!     let controller = ProhibitionController::new(ControllerConfig::default());
//!
//!     // After the client's start() and subscribe("orders") returned
//!     controller.on_start(&consumer).await;
//!     controller.on_subscribe(&consumer, "orders").await;
//!
//!     // The operator prohibits "orders"
//!     PolicyListener::on_policy_update(&controller, ProhibitionPolicy::new(["orders"])).await;
//! }
//! ```
//!
//! # Suspension
//!
//! SUBSCRIBE-mode consumers persist their offsets, leave their group, trigger
//! a rebalance, and are only marked paused once the broker no longer lists
//! them as group members. If that never happens within the confirmation
//! window they rejoin the group and a severe log asks the operator to deliver
//! the configuration again. ASSIGN-mode consumers simply pause their queues.

pub mod client;
pub mod config;
pub mod controller;
pub mod coordinator;
pub mod decision;
pub mod error;
pub mod handler;
pub mod lifecycle;
pub mod listener;
pub mod policy;
pub mod registry;
pub mod types;
pub mod wrapper;

// Re-export main types for convenience
pub use client::{ConsumerClient, ConsumerRef};
pub use config::ControllerConfig;
pub use controller::{global, ProhibitionController};
pub use coordinator::{is_controller_call, GroupCoordinator};
pub use decision::{decide, Decision};
pub use error::{Error, Result};
pub use handler::{BuiltinPolicyHandler, HandlerContext, PolicyHandler, Trigger};
pub use lifecycle::LifecycleHooks;
pub use listener::PolicyListener;
pub use policy::PolicyStore;
pub use registry::{ConsumerRegistry, ConsumerSlot, PendingOp, PreRegistrationCache};
pub use types::{
    ConsumerId, ConsumerKind, MembershipState, MessageQueue, ProhibitionPolicy, SubscriptionMode,
};
pub use wrapper::{ConsumerStatus, ConsumerWrapper};
