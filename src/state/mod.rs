//! State module for tracking crawl progress
//!
//! This module provides in-process state shared by the crawl workers.
//!
//! # Components
//!
//! - `WorkerPhase`: The phase a crawl worker is in while handling a job
//! - `CrawlSessions`: Per-crawl visited sets used to schedule each user once

mod crawl_session;
mod worker_phase;

// Re-export main types
pub use crawl_session::CrawlSessions;
pub use worker_phase::WorkerPhase;
