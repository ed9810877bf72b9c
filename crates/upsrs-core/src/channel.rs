//! The push-channel registry.

use std::collections::{HashMap, HashSet};

use dashmap::DashMap;
use parking_lot::{Mutex, MutexGuard, RwLock};
use tokio::sync::mpsc;

/// One outbound frame: a serialized DICOM+JSON event report.
pub type Frame = String;

/// Callback invoked for every accepted connection.
///
/// Callbacks run synchronously under the delivery lock and must not
/// perform I/O or re-enter [`ChannelRegistry::delivery_lock`].
pub type ConnectCallback = Box<dyn Fn(&str) -> Result<(), String> + Send + Sync>;

/// Maps subscriber AE titles to their open push channels and maintains
/// the target/subscriber interest indices.
///
/// A channel is an unbounded sender of frames; the socket-owning task
/// drains the paired receiver, so sends never block and no lock is held
/// across I/O. At most one channel per subscriber: accepting a new one
/// replaces (and thereby closes) the old.
pub struct ChannelRegistry {
    channels: DashMap<String, mpsc::UnboundedSender<Frame>>,
    /// target UID -> subscriber AE titles.
    watchers: RwLock<HashMap<String, HashSet<String>>>,
    /// subscriber AE title -> target UIDs.
    targets: RwLock<HashMap<String, HashSet<String>>>,
    connect_callbacks: RwLock<Vec<ConnectCallback>>,
    /// Serializes channel acceptance (including connect callbacks)
    /// against delivery decisions, so a queue drain always precedes any
    /// send on a fresh channel.
    delivery: Mutex<()>,
}

impl ChannelRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        ChannelRegistry {
            channels: DashMap::new(),
            watchers: RwLock::new(HashMap::new()),
            targets: RwLock::new(HashMap::new()),
            connect_callbacks: RwLock::new(Vec::new()),
            delivery: Mutex::new(()),
        }
    }

    /// Register a callback to run on every accepted connection.
    ///
    /// Multiple callbacks may be registered; a failing callback is logged
    /// and does not prevent the others or the channel itself.
    pub fn register_connect_callback(&self, callback: ConnectCallback) {
        self.connect_callbacks.write().push(callback);
    }

    /// Take the delivery lock.
    ///
    /// Fan-out holds this while deciding between a live send and the
    /// pending queue; `accept` holds it across channel insertion and the
    /// connect callbacks.
    pub fn delivery_lock(&self) -> MutexGuard<'_, ()> {
        self.delivery.lock()
    }

    /// Accept a new push channel for a subscriber.
    ///
    /// Replaces any existing channel for the same subscriber, then runs
    /// every connect callback.
    pub fn accept(&self, subscriber_id: &str, sender: mpsc::UnboundedSender<Frame>) {
        let _guard = self.delivery.lock();
        if self.channels.insert(subscriber_id.to_string(), sender).is_some() {
            tracing::info!(subscriber = subscriber_id, "replacing existing push channel");
        } else {
            tracing::info!(subscriber = subscriber_id, "push channel accepted");
        }

        let callbacks = self.connect_callbacks.read();
        for callback in callbacks.iter() {
            if let Err(err) = callback(subscriber_id) {
                tracing::error!(subscriber = subscriber_id, error = %err, "connect callback failed");
            }
        }
    }

    /// Remove a subscriber's channel after peer close or write failure.
    ///
    /// Subscription rows and interest indices are retained.
    pub fn disconnect(&self, subscriber_id: &str) {
        if self.channels.remove(subscriber_id).is_some() {
            tracing::info!(subscriber = subscriber_id, "push channel closed");
        }
    }

    /// Remove a subscriber's entry only if it still refers to the given
    /// channel.
    ///
    /// A socket task that was replaced by a newer connection must not
    /// tear down its successor's registration on the way out.
    pub fn disconnect_channel(&self, subscriber_id: &str, sender: &mpsc::UnboundedSender<Frame>) {
        let removed = self
            .channels
            .remove_if(subscriber_id, |_, current| current.same_channel(sender));
        if removed.is_some() {
            tracing::info!(subscriber = subscriber_id, "push channel closed");
        }
    }

    /// Whether a subscriber currently has an open channel.
    pub fn is_connected(&self, subscriber_id: &str) -> bool {
        self.channels.contains_key(subscriber_id)
    }

    /// Record interest of a subscriber in a target. Additive, idempotent.
    pub fn subscribe(&self, subscriber_id: &str, target_uid: &str) {
        self.watchers
            .write()
            .entry(target_uid.to_string())
            .or_default()
            .insert(subscriber_id.to_string());
        self.targets
            .write()
            .entry(subscriber_id.to_string())
            .or_default()
            .insert(target_uid.to_string());
        tracing::debug!(subscriber = subscriber_id, target = target_uid, "subscribed");
    }

    /// Remove interest of a subscriber in a target.
    pub fn unsubscribe(&self, subscriber_id: &str, target_uid: &str) {
        if let Some(subscribers) = self.watchers.write().get_mut(target_uid) {
            subscribers.remove(subscriber_id);
        }
        if let Some(targets) = self.targets.write().get_mut(subscriber_id) {
            targets.remove(target_uid);
        }
        tracing::debug!(subscriber = subscriber_id, target = target_uid, "unsubscribed");
    }

    /// The subscribers interested in a target.
    pub fn subscribers_for(&self, target_uid: &str) -> HashSet<String> {
        self.watchers.read().get(target_uid).cloned().unwrap_or_default()
    }

    /// The targets a subscriber is interested in.
    pub fn targets_for(&self, subscriber_id: &str) -> HashSet<String> {
        self.targets.read().get(subscriber_id).cloned().unwrap_or_default()
    }

    /// Send a frame to a subscriber.
    ///
    /// Returns false when no channel is open or the write fails; a failed
    /// write drops the channel entry.
    pub fn send(&self, subscriber_id: &str, frame: Frame) -> bool {
        let Some(sender) = self.channels.get(subscriber_id).map(|entry| entry.value().clone())
        else {
            return false;
        };
        if sender.send(frame).is_err() {
            tracing::warn!(subscriber = subscriber_id, "push channel write failed; dropping channel");
            self.channels.remove(subscriber_id);
            return false;
        }
        true
    }

    /// Number of open channels.
    pub fn connection_count(&self) -> usize {
        self.channels.len()
    }
}

impl Default for ChannelRegistry {
    fn default() -> Self {
        ChannelRegistry::new()
    }
}
