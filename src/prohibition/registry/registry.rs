use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::prohibition::{types::ConsumerId, wrapper::ConsumerWrapper};

/// A registered consumer behind its per-identity lock
///
/// The lock is async so a transition can hold it across the awaited client
/// calls it makes.
pub type ConsumerSlot = Arc<Mutex<ConsumerWrapper>>;

/// Process-wide store of live consumers keyed by identity
///
/// Map shard guards are released before any slot is locked, so a policy
/// sweep never blocks concurrent register/remove.
#[derive(Default)]
pub struct ConsumerRegistry {
    consumers: DashMap<ConsumerId, ConsumerSlot>,
}

impl ConsumerRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a slot for `id`
    ///
    /// Returns the already registered slot instead if `id` is present; the
    /// new slot is then discarded.
    pub fn register(&self, id: ConsumerId, slot: ConsumerSlot) -> Option<ConsumerSlot> {
        match self.consumers.entry(id) {
            Entry::Occupied(existing) => Some(Arc::clone(existing.get())),
            Entry::Vacant(vacant) => {
                vacant.insert(slot);
                None
            }
        }
    }

    /// Find the slot registered for `id`
    pub fn lookup(&self, id: ConsumerId) -> Option<ConsumerSlot> {
        self.consumers.get(&id).map(|slot| Arc::clone(slot.value()))
    }

    /// Remove `id`; subsequent lookups return `None`
    pub fn remove(&self, id: ConsumerId) -> Option<ConsumerSlot> {
        self.consumers.remove(&id).map(|(_, slot)| slot)
    }

    pub fn contains(&self, id: ConsumerId) -> bool {
        self.consumers.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.consumers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.consumers.is_empty()
    }

    /// Weakly consistent snapshot of all registered consumers
    ///
    /// A consumer registering while the snapshot is taken may or may not be
    /// included.
    pub fn snapshot(&self) -> Vec<(ConsumerId, ConsumerSlot)> {
        self.consumers
            .iter()
            .map(|entry| (*entry.key(), Arc::clone(entry.value())))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prohibition::{types::ConsumerKind, wrapper::tests::wrapper};

    fn slot() -> (ConsumerId, ConsumerSlot) {
        let wrapper = wrapper(ConsumerKind::Push);
        (wrapper.id(), Arc::new(Mutex::new(wrapper)))
    }

    #[test]
    fn test_register_and_lookup() {
        let registry = ConsumerRegistry::new();
        let (id, slot) = slot();

        assert!(registry.register(id, Arc::clone(&slot)).is_none());
        let found = registry.lookup(id).unwrap();
        assert!(Arc::ptr_eq(&found, &slot));
        assert!(registry.contains(id));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_register_keeps_first_slot() {
        let registry = ConsumerRegistry::new();
        let (id, first) = slot();
        let (_, second) = slot();
        registry.register(id, Arc::clone(&first));

        let existing = registry.register(id, second).unwrap();

        assert!(Arc::ptr_eq(&existing, &first));
        assert!(Arc::ptr_eq(&registry.lookup(id).unwrap(), &first));
    }

    #[test]
    fn test_remove() {
        let registry = ConsumerRegistry::new();
        let (id, slot) = slot();
        registry.register(id, slot);

        assert!(registry.remove(id).is_some());
        assert!(registry.lookup(id).is_none());
        assert!(registry.remove(id).is_none());
        assert!(registry.is_empty());
    }

    #[test]
    fn test_snapshot_is_detached() {
        let registry = ConsumerRegistry::new();
        let (first_id, first) = slot();
        let (second_id, second) = slot();
        registry.register(first_id, first);
        registry.register(second_id, second);

        let snapshot = registry.snapshot();
        registry.remove(first_id);

        let mut ids: Vec<ConsumerId> = snapshot.iter().map(|(id, _)| *id).collect();
        ids.sort();
        assert_eq!(ids, vec![first_id, second_id]);
        assert_eq!(registry.len(), 1);
    }
}
