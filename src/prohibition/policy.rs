use arc_swap::ArcSwap;
use std::sync::Arc;

use crate::prohibition::types::ProhibitionPolicy;

/// Process-wide holder of the current prohibition policy
///
/// Updates replace the whole policy atomically; readers always get a fully
/// formed policy.
pub struct PolicyStore {
    current: ArcSwap<ProhibitionPolicy>,
}

impl PolicyStore {
    pub fn new(initial: ProhibitionPolicy) -> Self {
        Self {
            current: ArcSwap::from_pointee(initial),
        }
    }

    /// The policy in force right now
    pub fn load(&self) -> Arc<ProhibitionPolicy> {
        self.current.load_full()
    }

    /// Install a new policy, returning the one it replaced
    pub fn replace(&self, policy: ProhibitionPolicy) -> Arc<ProhibitionPolicy> {
        self.current.swap(Arc::new(policy))
    }
}

impl Default for PolicyStore {
    fn default() -> Self {
        Self::new(ProhibitionPolicy::disabled())
    }
}
