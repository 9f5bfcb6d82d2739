// The outbound message broker: the queue between the application and the
// send pipeline. Applications usually supply their own persistent
// implementation; the in-memory one here suits tests and simple setups.

use crate::datatypes::SubmitSm;
use async_trait::async_trait;
use tokio::sync::Mutex;
use tokio::sync::mpsc::{Receiver, Sender, channel};

/// Queue of messages awaiting submission. `dequeue` may suspend
/// indefinitely. Implementations must not fail: persistence problems are
/// to be retried internally.
#[async_trait]
pub trait Broker: Send + Sync {
    async fn enqueue(&self, message: SubmitSm);

    async fn dequeue(&self) -> SubmitSm;
}

/// In-memory broker over a bounded channel. Enqueueing suspends while the
/// queue is full.
pub struct MemoryBroker {
    sender: Sender<SubmitSm>,
    receiver: Mutex<Receiver<SubmitSm>>,
}

impl MemoryBroker {
    pub fn new(capacity: usize) -> Self {
        let (sender, receiver) = channel(capacity);
        MemoryBroker {
            sender,
            receiver: Mutex::new(receiver),
        }
    }
}

impl Default for MemoryBroker {
    fn default() -> Self {
        Self::new(2500)
    }
}

#[async_trait]
impl Broker for MemoryBroker {
    async fn enqueue(&self, message: SubmitSm) {
        // The send half lives as long as self, so the channel cannot close.
        let _ = self.sender.send(message).await;
    }

    async fn dequeue(&self) -> SubmitSm {
        let mut receiver = self.receiver.lock().await;
        match receiver.recv().await {
            Some(message) => message,
            None => std::future::pending().await,
        }
    }
}
