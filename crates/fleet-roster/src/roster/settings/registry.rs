use std::sync::Arc;

use super::Settings;

pub type SettingsCallback = Arc<dyn Fn(&Settings) + Send + Sync>;

/// Handle returned by `subscribe`, used to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

/// Observer list. Callbacks are invoked outside the store lock from a snapshot.
#[derive(Default)]
pub(crate) struct SubscriberRegistry {
    next_id: u64,
    entries: Vec<(SubscriptionId, SettingsCallback)>,
}

impl SubscriberRegistry {
    pub(crate) fn insert(&mut self, callback: SettingsCallback) -> SubscriptionId {
        self.next_id += 1;
        let id = SubscriptionId(self.next_id);
        self.entries.push((id, callback));
        id
    }

    pub(crate) fn remove(&mut self, id: SubscriptionId) -> bool {
        let before = self.entries.len();
        self.entries.retain(|(entry_id, _)| *entry_id != id);
        self.entries.len() != before
    }

    pub(crate) fn snapshot(&self) -> Vec<SettingsCallback> {
        self.entries
            .iter()
            .map(|(_, callback)| Arc::clone(callback))
            .collect()
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn removal_only_drops_matching_handle() {
        let calls = Arc::new(AtomicUsize::new(0));
        let mut registry = SubscriberRegistry::default();
        let counter = Arc::clone(&calls);
        let first = registry.insert(Arc::new(move |_: &Settings| {
            counter.fetch_add(1, Ordering::SeqCst);
        }));
        let second = registry.insert(Arc::new(|_: &Settings| {}));
        assert_ne!(first, second);

        assert!(registry.remove(second));
        assert!(!registry.remove(second));
        assert_eq!(registry.len(), 1);

        for callback in registry.snapshot() {
            callback(&Settings::default());
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
