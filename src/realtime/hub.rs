use crate::domain::{ObserverId, ObserverNotifier, PushMessage};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use tokio::sync::mpsc;
use tracing::error;

type Sender = mpsc::UnboundedSender<String>;

/// Outbound delivery side of the real-time channel.
///
/// Each connected observer owns an unbounded queue drained by its WebSocket
/// task. Sending to an observer whose queue is gone (connection closed, not
/// yet deregistered) is a no-op.
#[derive(Debug, Default)]
pub struct ObserverHub {
    senders: RwLock<HashMap<ObserverId, Sender>>,
}

impl ObserverHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach a new observer; the returned receiver feeds its socket.
    pub fn attach(&self, observer: ObserverId) -> mpsc::UnboundedReceiver<String> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.write().insert(observer, tx);
        rx
    }

    pub fn detach(&self, observer: &ObserverId) {
        self.write().remove(observer);
    }

    pub fn connected(&self) -> usize {
        self.read().len()
    }

    fn encode(message: &PushMessage) -> Option<String> {
        match serde_json::to_string(message) {
            Ok(text) => Some(text),
            Err(e) => {
                error!(error = %e, "failed to encode push message");
                None
            }
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, HashMap<ObserverId, Sender>> {
        self.senders.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<ObserverId, Sender>> {
        self.senders.write().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl ObserverNotifier for ObserverHub {
    async fn broadcast(&self, message: &PushMessage) {
        let Some(text) = Self::encode(message) else {
            return;
        };
        for sender in self.read().values() {
            // A closed queue means the observer is mid-disconnect.
            let _ = sender.send(text.clone());
        }
    }

    async fn notify(&self, observer: &ObserverId, message: &PushMessage) {
        let Some(text) = Self::encode(message) else {
            return;
        };
        if let Some(sender) = self.read().get(observer) {
            let _ = sender.send(text);
        }
    }
}
