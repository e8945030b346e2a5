use std::collections::VecDeque;
use std::sync::{Arc, RwLock};

use tokio::sync::broadcast;
use tracing::{debug, trace};

use crate::auth::session::SessionEvent;

/// Broadcast stream of session events with a bounded replay buffer.
///
/// Publishing is synchronous so state transitions and their events cannot be
/// torn across an await point. Events published with no subscribers are
/// still buffered and can be replayed by late subscribers.
pub struct SessionEvents {
    sender: broadcast::Sender<SessionEvent>,
    buffer: Arc<RwLock<VecDeque<SessionEvent>>>,
    buffer_size: usize,
}

impl SessionEvents {
    /// Create a new event stream with the specified channel capacity and
    /// replay buffer size
    pub fn new(capacity: usize, buffer_size: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self {
            sender,
            buffer: Arc::new(RwLock::new(VecDeque::with_capacity(buffer_size))),
            buffer_size,
        }
    }

    /// Subscribe to the event stream
    pub fn subscribe(&self) -> SessionSubscriber {
        debug!("New subscriber registered to session events");
        SessionSubscriber {
            receiver: self.sender.subscribe(),
            buffer: Arc::clone(&self.buffer),
        }
    }

    /// Publish an event to all subscribers, returning the receiver count
    pub fn publish(&self, event: SessionEvent) -> usize {
        trace!(kind = event.kind(), "Publishing session event");
        let receivers = self.sender.send(event.clone()).unwrap_or(0);
        self.buffer_event(event);
        receivers
    }

    /// Get the replay buffer capacity
    pub fn capacity(&self) -> usize {
        self.buffer_size
    }

    // Keep the replay buffer bounded
    fn buffer_event(&self, event: SessionEvent) {
        let mut buffer = self
            .buffer
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        buffer.push_back(event);
        while buffer.len() > self.buffer_size {
            buffer.pop_front();
        }
    }
}

impl Clone for SessionEvents {
    fn clone(&self) -> Self {
        Self {
            sender: self.sender.clone(),
            buffer: Arc::clone(&self.buffer),
            buffer_size: self.buffer_size,
        }
    }
}

/// Subscriber for receiving session events
pub struct SessionSubscriber {
    receiver: broadcast::Receiver<SessionEvent>,
    buffer: Arc<RwLock<VecDeque<SessionEvent>>>,
}

impl SessionSubscriber {
    /// Receive the next event, waiting for one if necessary
    pub async fn recv(&mut self) -> Result<SessionEvent, broadcast::error::RecvError> {
        self.receiver.recv().await
    }

    /// Receive the next event if one is already queued
    pub fn try_recv(&mut self) -> Option<SessionEvent> {
        self.receiver.try_recv().ok()
    }

    /// Replay events retained in the buffer, oldest first
    pub fn replay(&self) -> Vec<SessionEvent> {
        let buffer = self
            .buffer
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        buffer.iter().cloned().collect()
    }
}
