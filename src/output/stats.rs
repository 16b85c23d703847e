//! Crawl status reporting
//!
//! This module turns a stored `CrawlingStatus` into a report and prints it.

use crate::storage::CrawlingStatus;
use chrono::{DateTime, Utc};

/// Progress report of one crawl
#[derive(Debug, Clone)]
pub struct CrawlReport {
    pub crawl_id: String,
    pub target: String,
    /// Friend hops requested for the crawl
    pub level: u32,
    pub users_crawled: i64,
    pub total_users_to_crawl: i64,
    pub progress_percent: f64,
    pub finished: bool,
    pub elapsed_seconds: i64,
}

impl CrawlReport {
    /// Builds a report as of `now`
    pub fn new(status: &CrawlingStatus, now: DateTime<Utc>) -> Self {
        Self {
            crawl_id: status.crawl_id.clone(),
            target: status.original_crawl_target.clone(),
            level: status.max_level.saturating_sub(1),
            users_crawled: status.users_crawled,
            total_users_to_crawl: status.total_users_to_crawl,
            progress_percent: status.progress_percent(),
            finished: status.is_finished(),
            elapsed_seconds: (now - status.time_started).num_seconds().max(0),
        }
    }

    /// Users still waiting to be crawled
    pub fn remaining(&self) -> i64 {
        (self.total_users_to_crawl - self.users_crawled).max(0)
    }
}

impl From<&CrawlingStatus> for CrawlReport {
    fn from(status: &CrawlingStatus) -> Self {
        Self::new(status, Utc::now())
    }
}

/// Prints a crawl report to stdout in a formatted manner
///
/// # Arguments
///
/// * `report` - The report to display
pub fn print_crawl_report(report: &CrawlReport) {
    println!("=== Crawl {} ===\n", report.crawl_id);

    println!("Overview:");
    println!("  Target: {}", report.target);
    println!("  Level: {}", report.level);
    println!(
        "  State: {}",
        if report.finished { "finished" } else { "crawling" }
    );
    println!("  Elapsed: {}s", report.elapsed_seconds);
    println!();

    println!(
        "Progress: {:.1}% ({} / {} users crawled, {} remaining)",
        report.progress_percent,
        report.users_crawled,
        report.total_users_to_crawl,
        report.remaining()
    );
}
