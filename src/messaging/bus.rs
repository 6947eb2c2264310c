use crossbeam_channel::{unbounded, Receiver, Sender};
use parking_lot::RwLock;
/// Event bus for pub/sub messaging
///
/// Broadcasts engine diagnostic events to any number of subscribers, for
/// example a UI thread drawing the live debug overlay.
use std::sync::Arc;

use super::events::EngineEvent;
use super::sink::DiagnosticSink;

/// Subscriber ID for tracking subscriptions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriberId(usize);

/// Event subscriber
struct Subscriber {
    id: SubscriberId,
    sender: Sender<EngineEvent>,
    include_frames: bool,
}

/// Event bus for broadcasting events to subscribers
pub struct EventBus {
    subscribers: Arc<RwLock<Vec<Subscriber>>>,
    next_id: Arc<RwLock<usize>>,
}

impl EventBus {
    /// Create a new event bus
    pub fn new() -> Self {
        Self {
            subscribers: Arc::new(RwLock::new(Vec::new())),
            next_id: Arc::new(RwLock::new(0)),
        }
    }

    /// Subscribe to lifecycle events (candidates, makes, resets)
    pub fn subscribe(&self) -> (Receiver<EngineEvent>, SubscriberId) {
        self.add_subscriber(false)
    }

    /// Subscribe to lifecycle events and every per-frame trace
    pub fn subscribe_with_frames(&self) -> (Receiver<EngineEvent>, SubscriberId) {
        self.add_subscriber(true)
    }

    fn add_subscriber(&self, include_frames: bool) -> (Receiver<EngineEvent>, SubscriberId) {
        let (tx, rx) = unbounded();

        let mut next_id = self.next_id.write();
        let id = SubscriberId(*next_id);
        *next_id += 1;
        drop(next_id);

        self.subscribers.write().push(Subscriber {
            id,
            sender: tx,
            include_frames,
        });

        (rx, id)
    }

    /// Unsubscribe from events
    pub fn unsubscribe(&self, id: SubscriberId) {
        self.subscribers.write().retain(|s| s.id != id);
    }

    /// Publish an event to all interested subscribers
    pub fn publish(&self, event: &EngineEvent) {
        let subscribers = self.subscribers.read();
        let is_frame = event.is_frame_trace();

        // Send to all subscribers (non-blocking)
        for subscriber in subscribers.iter() {
            if is_frame && !subscriber.include_frames {
                continue;
            }
            // If send fails, subscriber channel is closed - that's ok
            let _ = subscriber.sender.try_send(event.clone());
        }
    }

    /// Get number of active subscribers
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.read().len()
    }

    /// Clear all subscribers
    pub fn clear(&self) {
        self.subscribers.write().clear();
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for EventBus {
    fn clone(&self) -> Self {
        Self {
            subscribers: Arc::clone(&self.subscribers),
            next_id: Arc::clone(&self.next_id),
        }
    }
}

impl DiagnosticSink for EventBus {
    fn publish(&mut self, event: &EngineEvent) {
        EventBus::publish(self, event);
    }
}
