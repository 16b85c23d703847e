use super::traits::{JobQueue, JobStream, QueueError, QueueResult};
use async_trait::async_trait;
use bytes::Bytes;
use flume::{Receiver, Sender};
use futures_util::StreamExt;

/// In-process job queue backed by an unbounded flume channel
///
/// flume receivers are multi-consumer, so every stream handed out by
/// `consume` competes for the same deliveries.
#[derive(Debug, Clone)]
pub struct InMemoryJobQueue {
    tx: Sender<Bytes>,
    rx: Receiver<Bytes>,
}

impl InMemoryJobQueue {
    pub fn new() -> Self {
        let (tx, rx) = flume::unbounded();
        Self { tx, rx }
    }

    /// Number of jobs published but not yet delivered
    pub fn pending(&self) -> usize {
        self.rx.len()
    }
}

impl Default for InMemoryJobQueue {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl JobQueue for InMemoryJobQueue {
    async fn publish(&self, payload: Bytes) -> QueueResult<()> {
        self.tx
            .send_async(payload)
            .await
            .map_err(|_| QueueError::Closed)
    }

    async fn consume(&self) -> QueueResult<JobStream> {
        Ok(self.rx.clone().into_stream().boxed())
    }
}
