//! Job queue abstraction
//!
//! Crawl jobs travel as JSON payloads through a `JobQueue`. Two backends exist:
//! - `InMemoryJobQueue`: a flume channel, for single-process crawls and tests
//! - `NatsJobQueue`: a NATS subject consumed through a queue group, so worker
//!   processes compete for jobs
//!
//! Publishing always goes through `JobPublisher`, which retries with backoff.

mod memory;
mod nats;
mod publish;
mod traits;

pub use memory::InMemoryJobQueue;
pub use nats::NatsJobQueue;
pub use publish::{JobPublisher, PUBLISH_ATTEMPTS};
pub use traits::{JobQueue, JobStream, QueueError, QueueResult};

use crate::config::{QueueBackend, QueueConfig};
use std::sync::Arc;

/// Connects the backend named in configuration
///
/// # Arguments
///
/// * `config` - The queue configuration
///
/// # Returns
///
/// * `Ok(Arc<dyn JobQueue>)` - A queue shared by the dispatcher and workers
/// * `Err(QueueError)` - The broker could not be reached
pub async fn connect_queue(config: &QueueConfig) -> QueueResult<Arc<dyn JobQueue>> {
    match config.backend {
        QueueBackend::Memory => Ok(Arc::new(InMemoryJobQueue::new())),
        QueueBackend::Nats => {
            let queue = NatsJobQueue::connect(
                &config.nats_url,
                config.subject.clone(),
                config.queue_group.clone(),
            )
            .await?;
            Ok(Arc::new(queue))
        }
    }
}
