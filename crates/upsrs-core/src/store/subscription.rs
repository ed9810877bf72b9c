//! The subscription store.

use std::collections::HashMap;

use parking_lot::RwLock;

use crate::model::Subscription;

/// Key: (target UID, subscriber AE title).
type Key = (String, String);

/// In-memory set of subscription records, unique per (target, subscriber).
#[derive(Default)]
pub struct SubscriptionStore {
    subscriptions: RwLock<HashMap<Key, Subscription>>,
}

impl SubscriptionStore {
    /// An empty store.
    pub fn new() -> Self {
        SubscriptionStore::default()
    }

    /// Insert a subscription.
    ///
    /// A suspended row with the same key is replaced; a live row with the
    /// same key wins over the incoming one (create is idempotent).
    pub fn create(&self, subscription: Subscription) -> Subscription {
        let key = (subscription.workitem_uid.clone(), subscription.ae_title.clone());
        let mut subscriptions = self.subscriptions.write();
        if let Some(existing) = subscriptions.get(&key) {
            if !existing.suspended {
                return existing.clone();
            }
            tracing::debug!(
                target_uid = %subscription.workitem_uid,
                ae_title = %subscription.ae_title,
                "replacing suspended subscription"
            );
        }
        subscriptions.insert(key, subscription.clone());
        subscription
    }

    /// All subscriptions held by a subscriber.
    pub fn get_by_ae_title(&self, ae_title: &str) -> Vec<Subscription> {
        self.subscriptions
            .read()
            .values()
            .filter(|s| s.ae_title == ae_title)
            .cloned()
            .collect()
    }

    /// All subscriptions targeting a UID.
    pub fn get_by_workitem(&self, workitem_uid: &str) -> Vec<Subscription> {
        self.subscriptions
            .read()
            .values()
            .filter(|s| s.workitem_uid == workitem_uid)
            .cloned()
            .collect()
    }

    /// Zero-or-one lookup by the identity pair.
    pub fn get_one(&self, workitem_uid: &str, ae_title: &str) -> Option<Subscription> {
        self.subscriptions
            .read()
            .get(&(workitem_uid.to_string(), ae_title.to_string()))
            .cloned()
    }

    /// Delete a subscription; true iff something was removed.
    pub fn delete(&self, workitem_uid: &str, ae_title: &str) -> bool {
        self.subscriptions
            .write()
            .remove(&(workitem_uid.to_string(), ae_title.to_string()))
            .is_some()
    }

    /// Number of stored subscriptions.
    pub fn len(&self) -> usize {
        self.subscriptions.read().len()
    }

    /// Whether the store is empty.
    pub fn is_empty(&self) -> bool {
        self.subscriptions.read().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::GLOBAL_SUBSCRIPTION_UID;

    #[test]
    fn test_create_is_idempotent_for_live_rows() {
        let store = SubscriptionStore::new();
        let first = store.create(Subscription::new("1.2.3.4", "AE1").with_deletion_lock(true));
        let second = store.create(Subscription::new("1.2.3.4", "AE1"));

        assert_eq!(store.len(), 1);
        // The original row survives, deletion lock intact.
        assert_eq!(second.created_at, first.created_at);
        assert!(second.deletion_lock);
    }

    #[test]
    fn test_create_replaces_suspended_row() {
        let store = SubscriptionStore::new();
        store.create(Subscription::new("1.2.3.4", "AE1").as_suspended());
        assert!(store.get_one("1.2.3.4", "AE1").unwrap().suspended);

        store.create(Subscription::new("1.2.3.4", "AE1"));
        assert_eq!(store.len(), 1);
        assert!(!store.get_one("1.2.3.4", "AE1").unwrap().suspended);
    }

    #[test]
    fn test_lookups() {
        let store = SubscriptionStore::new();
        store.create(Subscription::new("1.2.3.4", "AE1"));
        store.create(Subscription::new("1.2.3.4", "AE2"));
        store.create(Subscription::new(GLOBAL_SUBSCRIPTION_UID, "AE1"));

        assert_eq!(store.get_by_workitem("1.2.3.4").len(), 2);
        assert_eq!(store.get_by_ae_title("AE1").len(), 2);
        assert!(store.get_one("1.2.3.4", "AE2").is_some());
        assert!(store.get_one("1.2.3.4", "AE3").is_none());
    }

    #[test]
    fn test_delete() {
        let store = SubscriptionStore::new();
        store.create(Subscription::new("1.2.3.4", "AE1"));
        assert!(store.delete("1.2.3.4", "AE1"));
        assert!(!store.delete("1.2.3.4", "AE1"));
        assert!(store.is_empty());
    }
}
