//! The pending-event queue.

use std::collections::{HashMap, VecDeque};

use parking_lot::Mutex;

use crate::channel::Frame;

/// Default per-subscriber queue bound.
pub const DEFAULT_QUEUE_CAP: usize = 1024;

/// Per-subscriber ordered queues of event frames awaiting a push channel.
///
/// Bounded per subscriber: overflow drops the oldest entry and logs.
pub struct PendingEventQueue {
    queues: Mutex<HashMap<String, VecDeque<Frame>>>,
    cap: usize,
}

impl PendingEventQueue {
    /// A queue with the default per-subscriber cap.
    pub fn new() -> Self {
        PendingEventQueue::with_cap(DEFAULT_QUEUE_CAP)
    }

    /// A queue with an explicit per-subscriber cap.
    pub fn with_cap(cap: usize) -> Self {
        PendingEventQueue { queues: Mutex::new(HashMap::new()), cap: cap.max(1) }
    }

    /// Append a frame to a subscriber's queue.
    pub fn append(&self, subscriber_id: &str, frame: Frame) {
        let mut queues = self.queues.lock();
        let queue = queues.entry(subscriber_id.to_string()).or_default();
        if queue.len() >= self.cap {
            queue.pop_front();
            tracing::warn!(
                subscriber = subscriber_id,
                cap = self.cap,
                "pending queue overflow; dropped oldest event"
            );
        }
        queue.push_back(frame);
    }

    /// Drain a subscriber's queue, returning the frames in append order.
    ///
    /// The queue is emptied unconditionally.
    pub fn drain(&self, subscriber_id: &str) -> Vec<Frame> {
        self.queues
            .lock()
            .remove(subscriber_id)
            .map(|queue| queue.into_iter().collect())
            .unwrap_or_default()
    }

    /// Number of queued frames for a subscriber.
    pub fn len(&self, subscriber_id: &str) -> usize {
        self.queues.lock().get(subscriber_id).map_or(0, VecDeque::len)
    }

    /// Whether a subscriber has queued frames.
    pub fn is_empty(&self, subscriber_id: &str) -> bool {
        self.len(subscriber_id) == 0
    }
}

impl Default for PendingEventQueue {
    fn default() -> Self {
        PendingEventQueue::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_drain_preserves_order_and_empties() {
        let queue = PendingEventQueue::new();
        queue.append("AE1", "a".to_string());
        queue.append("AE1", "b".to_string());
        queue.append("AE2", "x".to_string());

        assert_eq!(queue.drain("AE1"), vec!["a".to_string(), "b".to_string()]);
        assert!(queue.is_empty("AE1"));
        assert_eq!(queue.len("AE2"), 1);
    }

    #[test]
    fn test_drain_unknown_subscriber_is_empty() {
        let queue = PendingEventQueue::new();
        assert!(queue.drain("AE9").is_empty());
    }

    #[test]
    fn test_overflow_drops_oldest() {
        let queue = PendingEventQueue::with_cap(2);
        queue.append("AE1", "a".to_string());
        queue.append("AE1", "b".to_string());
        queue.append("AE1", "c".to_string());

        assert_eq!(queue.drain("AE1"), vec!["b".to_string(), "c".to_string()]);
    }
}
