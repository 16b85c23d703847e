use super::traits::{JobQueue, JobStream, QueueError, QueueResult};
use async_trait::async_trait;
use bytes::Bytes;
use futures_util::StreamExt;
use tracing::info;

/// Job queue on a NATS subject
///
/// Consumers join a queue group so that each job is delivered to one worker
/// across every process subscribed to the subject.
#[derive(Debug, Clone)]
pub struct NatsJobQueue {
    client: async_nats::Client,
    subject: String,
    queue_group: String,
}

impl NatsJobQueue {
    /// Connects to a NATS server
    ///
    /// # Arguments
    ///
    /// * `url` - The `nats://` server URL
    /// * `subject` - Subject jobs are published to
    /// * `queue_group` - Queue group consumers join
    pub async fn connect(url: &str, subject: String, queue_group: String) -> QueueResult<Self> {
        let client = async_nats::connect(url)
            .await
            .map_err(|e| QueueError::Connect(e.to_string()))?;

        info!(url, subject = %subject, queue_group = %queue_group, "Connected to NATS");
        Ok(Self {
            client,
            subject,
            queue_group,
        })
    }
}

#[async_trait]
impl JobQueue for NatsJobQueue {
    async fn publish(&self, payload: Bytes) -> QueueResult<()> {
        self.client
            .publish(self.subject.clone(), payload)
            .await
            .map_err(|e| QueueError::Publish(e.to_string()))?;

        // Publishing only buffers; flushing surfaces a broken connection here
        // so the publisher's retry policy can see it.
        self.client
            .flush()
            .await
            .map_err(|e| QueueError::Publish(e.to_string()))
    }

    async fn consume(&self) -> QueueResult<JobStream> {
        let subscriber = self
            .client
            .queue_subscribe(self.subject.clone(), self.queue_group.clone())
            .await
            .map_err(|e| QueueError::Subscribe(e.to_string()))?;

        Ok(subscriber.map(|message| message.payload).boxed())
    }
}
