//! Subscription lifecycle: create, suspend, delete, initial snapshots.

use std::sync::Arc;

use upsrs_dicom::matching;

use crate::channel::ChannelRegistry;
use crate::model::{Subscription, WorkItem, FILTERED_SUBSCRIPTION_UID, GLOBAL_SUBSCRIPTION_UID};
use crate::notifier::Notifier;
use crate::store::{SubscriptionStore, WorkItemStore};

/// Orchestrates subscription changes across the subscription store, the
/// channel registry's interest indices, and the notifier.
pub struct SubscriptionService {
    subscriptions: Arc<SubscriptionStore>,
    workitems: Arc<WorkItemStore>,
    registry: Arc<ChannelRegistry>,
    notifier: Arc<Notifier>,
}

impl SubscriptionService {
    /// Wire the service over the shared structures.
    pub fn new(
        subscriptions: Arc<SubscriptionStore>,
        workitems: Arc<WorkItemStore>,
        registry: Arc<ChannelRegistry>,
        notifier: Arc<Notifier>,
    ) -> Self {
        SubscriptionService { subscriptions, workitems, registry, notifier }
    }

    /// The backing store, for read paths.
    pub fn store(&self) -> &Arc<SubscriptionStore> {
        &self.subscriptions
    }

    /// Create (or reactivate) a subscription.
    ///
    /// Registers interest, stores the row (replacing a suspended one),
    /// then queues the initial state snapshot the subscriber is entitled
    /// to. Snapshot problems are logged and never roll back the first
    /// two steps.
    pub fn create(&self, subscription: Subscription) -> Subscription {
        self.registry
            .subscribe(&subscription.ae_title, &subscription.workitem_uid);
        let created = self.subscriptions.create(subscription);
        tracing::info!(
            target = %created.workitem_uid,
            ae_title = %created.ae_title,
            "subscription created"
        );

        self.queue_initial_snapshot(&created);
        created
    }

    /// Delete a subscription; true iff one was removed.
    pub fn delete(&self, workitem_uid: &str, ae_title: &str) -> bool {
        self.registry.unsubscribe(ae_title, workitem_uid);
        let removed = self.subscriptions.delete(workitem_uid, ae_title);
        if removed {
            tracing::info!(target = %workitem_uid, ae_title, "subscription deleted");
        }
        removed
    }

    /// Suspend a subscription; true iff a live one was found.
    ///
    /// The row is replaced by its suspended twin and interest is removed
    /// from the registry, so no further events reach the subscriber
    /// until it re-subscribes.
    pub fn suspend(&self, workitem_uid: &str, ae_title: &str) -> bool {
        let Some(existing) = self.subscriptions.get_one(workitem_uid, ae_title) else {
            return false;
        };
        if existing.suspended {
            return false;
        }

        let replacement = existing.as_suspended();
        self.registry.unsubscribe(ae_title, workitem_uid);
        self.subscriptions.delete(workitem_uid, ae_title);
        self.subscriptions.create(replacement);
        tracing::info!(target = %workitem_uid, ae_title, "subscription suspended");
        true
    }

    /// The state snapshot owed at subscribe time: the one concrete item,
    /// everything (global with a deletion lock), or everything matching
    /// the filter.
    fn queue_initial_snapshot(&self, subscription: &Subscription) {
        let items: Vec<WorkItem> = match subscription.workitem_uid.as_str() {
            GLOBAL_SUBSCRIPTION_UID => {
                if subscription.deletion_lock {
                    self.workitems.list_all()
                } else {
                    Vec::new()
                }
            }
            FILTERED_SUBSCRIPTION_UID => {
                let Some(filter) = subscription.filter.as_ref() else {
                    tracing::warn!(
                        ae_title = %subscription.ae_title,
                        "filtered subscription without a filter; empty snapshot"
                    );
                    return;
                };
                self.workitems
                    .list_all()
                    .into_iter()
                    .filter(|item| matching::matches(filter, &item.dataset))
                    .collect()
            }
            uid => self.workitems.get(uid).into_iter().collect(),
        };

        for item in &items {
            let event = self.notifier.builder().state_report(item, None);
            self.notifier.deliver(&subscription.ae_title, &event);
        }
        if !items.is_empty() {
            tracing::debug!(
                ae_title = %subscription.ae_title,
                count = items.len(),
                "queued initial snapshot"
            );
        }
    }
}
