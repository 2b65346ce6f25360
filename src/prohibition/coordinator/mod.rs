/// Group membership coordination
///
/// This module provides:
/// - `GroupCoordinator`: executes SUSPEND and RESUME for one consumer
/// - the background group-exit confirmation loop
/// - `is_controller_call`: tells hooks apart from calls the coordinator makes
mod confirmation;
pub mod coordinator;
mod scope;

pub use coordinator::GroupCoordinator;
pub use scope::is_controller_call;
