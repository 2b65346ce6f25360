/// Consumer registry module
///
/// This module provides:
/// - `ConsumerRegistry`: live consumers keyed by identity, each behind its own lock
/// - `PreRegistrationCache`: lifecycle events seen before a consumer started
///
/// # Two-phase handoff
///
/// Some clients fire `subscribe`/`assign` before `start` has returned. Those
/// events land in the pre-registration cache and are replayed onto the new
/// wrapper when it is registered:
///
/// 1. **Stash**: the hook finds no wrapper and records the event
/// 2. **Register**: `start` inserts the wrapper while holding its lock
/// 3. **Drain**: the cache entry is removed and replayed, exactly once
/// 4. **Re-check**: a hook that stashed re-looks up the registry and drains
///    itself if `start` registered in between
pub mod pending;
pub mod registry;

pub use pending::{PendingOp, PreRegistrationCache};
pub use registry::{ConsumerRegistry, ConsumerSlot};
