use async_trait::async_trait;
use bytes::Bytes;
use futures_util::stream::BoxStream;
use thiserror::Error;

/// Errors raised by job queue backends
#[derive(Debug, Error)]
pub enum QueueError {
    #[error("Failed to connect to broker: {0}")]
    Connect(String),

    #[error("Failed to publish job: {0}")]
    Publish(String),

    #[error("Failed to subscribe for jobs: {0}")]
    Subscribe(String),

    #[error("Job queue is closed")]
    Closed,

    #[error("Failed to encode job: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Result type for queue operations
pub type QueueResult<T> = Result<T, QueueError>;

/// Stream of raw job deliveries
pub type JobStream = BoxStream<'static, Bytes>;

/// Publish/consume contract of a job broker
///
/// Each stream returned by `consume` competes with every other consumer for
/// deliveries; a payload is handed to exactly one of them.
#[async_trait]
pub trait JobQueue: Send + Sync {
    /// Publishes one serialized job, without retrying
    async fn publish(&self, payload: Bytes) -> QueueResult<()>;

    /// Opens a consumer for job deliveries
    async fn consume(&self) -> QueueResult<JobStream>;
}
