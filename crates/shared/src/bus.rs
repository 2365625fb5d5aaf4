//! The shared broadcast channel every controller and display attaches to.

use tokio::sync::broadcast::{self, error::RecvError};

use crate::protocol::PidsMessage;

pub const DEFAULT_BUS_CAPACITY: usize = 256;

/// Publish/subscribe over a best-effort channel. Publishing never blocks and
/// never fails from the caller's point of view.
pub trait SyncChannel: Send + Sync {
    fn publish(&self, message: PidsMessage);
    fn subscribe(&self) -> Subscription;
}

/// In-process bus on a tokio broadcast channel. Cheap to clone; clones share
/// the same channel.
#[derive(Clone)]
pub struct BroadcastBus {
    tx: broadcast::Sender<PidsMessage>,
}

impl BroadcastBus {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for BroadcastBus {
    fn default() -> Self {
        Self::new(DEFAULT_BUS_CAPACITY)
    }
}

impl SyncChannel for BroadcastBus {
    fn publish(&self, message: PidsMessage) {
        let kind = message.kind();
        if self.tx.send(message).is_err() {
            tracing::trace!(kind, "bus message dropped; no subscribers");
        }
    }

    fn subscribe(&self) -> Subscription {
        Subscription {
            rx: self.tx.subscribe(),
        }
    }
}

pub struct Subscription {
    rx: broadcast::Receiver<PidsMessage>,
}

impl Subscription {
    /// Next message, or `None` once every publisher is gone. A subscriber
    /// that falls behind loses the oldest messages and carries on.
    pub async fn recv(&mut self) -> Option<PidsMessage> {
        loop {
            match self.rx.recv().await {
                Ok(message) => return Some(message),
                Err(RecvError::Lagged(skipped)) => {
                    tracing::debug!(skipped, "bus subscriber lagged");
                }
                Err(RecvError::Closed) => return None,
            }
        }
    }
}
