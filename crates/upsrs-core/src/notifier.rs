//! Event fan-out and delivery.

use std::collections::{BTreeSet, HashSet};
use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use upsrs_dicom::{matching, Dataset};

use crate::channel::ChannelRegistry;
use crate::events::{EventBuilder, RestartStatus, ScpStatus};
use crate::model::{WorkItem, FILTERED_SUBSCRIPTION_UID, GLOBAL_SUBSCRIPTION_UID};
use crate::pending::PendingEventQueue;
use crate::store::SubscriptionStore;

/// The dispatcher between committed mutations and push-channel delivery.
///
/// Both the work item service and the subscription service hand events
/// here; neither needs to name the other. The notifier resolves the
/// affected subscriber set, then either sends on an open channel or
/// parks the frame in the pending queue. It also owns the reconnect
/// drain, installed as a registry connect callback.
pub struct Notifier {
    registry: Arc<ChannelRegistry>,
    pending: Arc<PendingEventQueue>,
    subscriptions: Arc<SubscriptionStore>,
    builder: EventBuilder,
    /// When set, the first connect of each subscriber after process start
    /// is told about the restart before anything else.
    startup_announcement: Option<(ScpStatus, RestartStatus)>,
    announced: Mutex<HashSet<String>>,
}

impl Notifier {
    /// Wire a notifier over the shared structures.
    pub fn new(
        registry: Arc<ChannelRegistry>,
        pending: Arc<PendingEventQueue>,
        subscriptions: Arc<SubscriptionStore>,
    ) -> Self {
        Notifier {
            registry,
            pending,
            subscriptions,
            builder: EventBuilder::new(),
            startup_announcement: None,
            announced: Mutex::new(HashSet::new()),
        }
    }

    /// Announce an SCP status change to each subscriber on first connect.
    ///
    /// A cold-start restart loses the subscription list; announcing it
    /// lets clients re-subscribe instead of waiting for events that will
    /// never come.
    pub fn with_startup_announcement(mut self, status: ScpStatus, restart: RestartStatus) -> Self {
        self.startup_announcement = Some((status, restart));
        self
    }

    /// The event builder.
    pub fn builder(&self) -> &EventBuilder {
        &self.builder
    }

    /// Install the reconnect drain as a registry connect callback.
    ///
    /// Held by the registry through a weak reference, so the notifier and
    /// the registry do not keep each other alive.
    pub fn install(self: &Arc<Self>) {
        let weak: Weak<Notifier> = Arc::downgrade(self);
        self.registry.register_connect_callback(Box::new(move |subscriber| {
            if let Some(notifier) = weak.upgrade() {
                notifier.on_connect(subscriber);
            }
            Ok(())
        }));
    }

    /// Runs under the registry's delivery lock, inside `accept`.
    fn on_connect(&self, subscriber: &str) {
        if let Some((status, restart)) = self.startup_announcement {
            let first_connect = self.announced.lock().insert(subscriber.to_string());
            if first_connect {
                let event = self.builder.scp_status_change(status, restart);
                if let Some(frame) = serialize(&event) {
                    if !self.registry.send(subscriber, frame) {
                        tracing::warn!(subscriber, "failed to deliver status-change event");
                    }
                }
            }
        }

        // Queued events go out before anything generated after this
        // accept; failures are logged and the queue stays drained.
        for frame in self.pending.drain(subscriber) {
            if !self.registry.send(subscriber, frame) {
                tracing::warn!(subscriber, "dropping queued event; channel lost during drain");
            }
        }
    }

    /// Fan an event out to every entitled subscriber.
    ///
    /// Fan-out never fails the originating mutation; errors are logged.
    pub fn dispatch(&self, event: &Dataset, workitem: &WorkItem) {
        let Some(frame) = serialize(event) else {
            return;
        };

        let recipients = self.resolve_recipients(workitem);
        if recipients.is_empty() {
            return;
        }
        tracing::debug!(
            uid = %workitem.uid,
            recipients = recipients.len(),
            "dispatching event"
        );

        let _guard = self.registry.delivery_lock();
        for subscriber in &recipients {
            self.deliver_locked(subscriber, &frame);
        }
    }

    /// Deliver one event to one subscriber (initial snapshots).
    pub fn deliver(&self, subscriber: &str, event: &Dataset) {
        let Some(frame) = serialize(event) else {
            return;
        };
        let _guard = self.registry.delivery_lock();
        self.deliver_locked(subscriber, &frame);
    }

    /// Direct watchers, plus global watchers, plus filtered watchers
    /// whose filter matches the current record; suspended rows are
    /// skipped.
    fn resolve_recipients(&self, workitem: &WorkItem) -> BTreeSet<String> {
        let mut recipients = BTreeSet::new();

        for subscriber in self.registry.subscribers_for(&workitem.uid) {
            if self.is_active(&workitem.uid, &subscriber) {
                recipients.insert(subscriber);
            }
        }
        for subscriber in self.registry.subscribers_for(GLOBAL_SUBSCRIPTION_UID) {
            if self.is_active(GLOBAL_SUBSCRIPTION_UID, &subscriber) {
                recipients.insert(subscriber);
            }
        }
        for subscriber in self.registry.subscribers_for(FILTERED_SUBSCRIPTION_UID) {
            if recipients.contains(&subscriber) {
                continue;
            }
            let Some(subscription) =
                self.subscriptions.get_one(FILTERED_SUBSCRIPTION_UID, &subscriber)
            else {
                continue;
            };
            if subscription.suspended {
                continue;
            }
            // Matching is evaluated at notify time against the current
            // record, not the record as it was at subscribe time.
            let matched = subscription
                .filter
                .as_ref()
                .map(|filter| matching::matches(filter, &workitem.dataset))
                .unwrap_or(false);
            if matched {
                recipients.insert(subscriber);
            }
        }

        recipients
    }

    fn is_active(&self, target_uid: &str, subscriber: &str) -> bool {
        self.subscriptions
            .get_one(target_uid, subscriber)
            .map(|s| !s.suspended)
            .unwrap_or(true)
    }

    fn deliver_locked(&self, subscriber: &str, frame: &str) {
        if self.registry.is_connected(subscriber) {
            // At-most-once: a failed write drops the channel and the
            // event is not re-queued.
            if !self.registry.send(subscriber, frame.to_string()) {
                tracing::warn!(subscriber, "event lost on failed channel write");
            }
        } else {
            self.pending.append(subscriber, frame.to_string());
        }
    }
}

fn serialize(event: &Dataset) -> Option<String> {
    match serde_json::to_string(event) {
        Ok(frame) => Some(frame),
        Err(err) => {
            tracing::error!(error = %err, "failed to serialize event report");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Subscription;
    use tokio::sync::mpsc;
    use upsrs_dicom::{tags, Vr};

    fn fixture() -> (Arc<ChannelRegistry>, Arc<PendingEventQueue>, Arc<SubscriptionStore>, Arc<Notifier>)
    {
        let registry = Arc::new(ChannelRegistry::new());
        let pending = Arc::new(PendingEventQueue::new());
        let subscriptions = Arc::new(SubscriptionStore::new());
        let notifier =
            Arc::new(Notifier::new(registry.clone(), pending.clone(), subscriptions.clone()));
        notifier.install();
        (registry, pending, subscriptions, notifier)
    }

    fn workitem(uid: &str) -> WorkItem {
        let mut ds = Dataset::new();
        ds.set_uid(tags::SOP_INSTANCE_UID, uid);
        ds.set_str(tags::PROCEDURE_STEP_STATE, Vr::CS, "SCHEDULED");
        WorkItem::new(ds).unwrap()
    }

    fn subscribe(
        registry: &ChannelRegistry,
        subscriptions: &SubscriptionStore,
        target: &str,
        ae: &str,
    ) {
        registry.subscribe(ae, target);
        subscriptions.create(Subscription::new(target, ae));
    }

    #[tokio::test]
    async fn test_direct_and_global_subscribers_receive() {
        let (registry, _pending, subscriptions, notifier) = fixture();
        subscribe(&registry, &subscriptions, "1.2.3.4", "AE1");
        subscribe(&registry, &subscriptions, GLOBAL_SUBSCRIPTION_UID, "AE2");

        let (tx1, mut rx1) = mpsc::unbounded_channel();
        let (tx2, mut rx2) = mpsc::unbounded_channel();
        registry.accept("AE1", tx1);
        registry.accept("AE2", tx2);

        let item = workitem("1.2.3.4");
        let event = notifier.builder().state_report(&item, None);
        notifier.dispatch(&event, &item);

        assert!(rx1.recv().await.unwrap().contains("1.2.3.4"));
        assert!(rx2.recv().await.unwrap().contains("1.2.3.4"));
    }

    #[tokio::test]
    async fn test_filtered_subscriber_matching_only() {
        let (registry, pending, subscriptions, notifier) = fixture();

        let mut filter = Dataset::new();
        filter.set_str(tags::PROCEDURE_STEP_STATE, Vr::CS, "SCHEDULED");
        registry.subscribe("AE3", FILTERED_SUBSCRIPTION_UID);
        subscriptions.create(
            Subscription::new(FILTERED_SUBSCRIPTION_UID, "AE3").with_filter(filter),
        );

        let (tx, mut rx) = mpsc::unbounded_channel();
        registry.accept("AE3", tx);

        let scheduled = workitem("1.2.3.4");
        let event = notifier.builder().state_report(&scheduled, None);
        notifier.dispatch(&event, &scheduled);
        assert!(rx.recv().await.is_some());

        let mut in_progress = workitem("1.2.3.5");
        in_progress.set_state(crate::model::ProcedureStepState::InProgress);
        let event = notifier.builder().state_report(&in_progress, None);
        notifier.dispatch(&event, &in_progress);

        assert!(rx.try_recv().is_err());
        assert!(pending.is_empty("AE3"));
    }

    #[tokio::test]
    async fn test_suspended_subscriber_skipped() {
        let (registry, pending, subscriptions, notifier) = fixture();
        registry.subscribe("AE1", GLOBAL_SUBSCRIPTION_UID);
        subscriptions.create(Subscription::new(GLOBAL_SUBSCRIPTION_UID, "AE1").as_suspended());

        let item = workitem("1.2.3.4");
        let event = notifier.builder().state_report(&item, None);
        notifier.dispatch(&event, &item);

        assert!(pending.is_empty("AE1"));
    }

    #[tokio::test]
    async fn test_offline_events_queue_and_drain_in_order() {
        let (registry, pending, subscriptions, notifier) = fixture();
        subscribe(&registry, &subscriptions, GLOBAL_SUBSCRIPTION_UID, "AE1");

        let first = workitem("1.2.3.1");
        let second = workitem("1.2.3.2");
        notifier.dispatch(&notifier.builder().state_report(&first, None), &first);
        notifier.dispatch(&notifier.builder().state_report(&second, None), &second);
        assert_eq!(pending.len("AE1"), 2);

        // Connecting drains the queue in generation order.
        let (tx, mut rx) = mpsc::unbounded_channel();
        registry.accept("AE1", tx);

        let drained_first = rx.recv().await.unwrap();
        let drained_second = rx.recv().await.unwrap();
        assert!(drained_first.contains("1.2.3.1"));
        assert!(drained_second.contains("1.2.3.2"));
        assert!(pending.is_empty("AE1"));

        // New events now go straight to the channel.
        let third = workitem("1.2.3.3");
        notifier.dispatch(&notifier.builder().state_report(&third, None), &third);
        assert!(rx.recv().await.unwrap().contains("1.2.3.3"));
    }

    #[tokio::test]
    async fn test_failed_write_is_not_requeued() {
        let (registry, pending, subscriptions, notifier) = fixture();
        subscribe(&registry, &subscriptions, "1.2.3.4", "AE1");

        let (tx, rx) = mpsc::unbounded_channel();
        registry.accept("AE1", tx);
        drop(rx);

        let item = workitem("1.2.3.4");
        notifier.dispatch(&notifier.builder().state_report(&item, None), &item);

        // The channel is gone and the event was not parked.
        assert!(!registry.is_connected("AE1"));
        assert!(pending.is_empty("AE1"));
        // The subscription row survives the drop.
        assert!(subscriptions.get_one("1.2.3.4", "AE1").is_some());
    }

    #[tokio::test]
    async fn test_startup_announcement_precedes_drain() {
        let registry = Arc::new(ChannelRegistry::new());
        let pending = Arc::new(PendingEventQueue::new());
        let subscriptions = Arc::new(SubscriptionStore::new());
        let notifier = Arc::new(
            Notifier::new(registry.clone(), pending.clone(), subscriptions.clone())
                .with_startup_announcement(ScpStatus::Restarted, RestartStatus::ColdStart),
        );
        notifier.install();

        pending.append("AE1", "queued-frame".to_string());

        let (tx, mut rx) = mpsc::unbounded_channel();
        registry.accept("AE1", tx);

        let first = rx.recv().await.unwrap();
        assert!(first.contains("RESTARTED"), "{first}");
        assert_eq!(rx.recv().await.unwrap(), "queued-frame");

        // Only the first connect is announced.
        registry.disconnect("AE1");
        let (tx, mut rx) = mpsc::unbounded_channel();
        registry.accept("AE1", tx);
        assert!(rx.try_recv().is_err());
    }
}
