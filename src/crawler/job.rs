use crate::storage::CrawlingStatus;
use crate::{CrawlerError, Result};
use chrono::Utc;
use serde::{Deserialize, Serialize};

/// One unit of breadth-first crawl work
///
/// Created by the dispatcher for the root (level 1) or by a worker for each
/// newly discovered friend (level N+1). Never mutated once published.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrawlJob {
    pub crawl_id: String,
    /// Root SteamID of the crawl this job belongs to
    pub original_target: String,
    /// User this job resolves
    pub steam_id: String,
    /// User whose friend list led here; the root points at itself
    pub from_id: String,
    pub current_level: u32,
    pub max_level: u32,
}

impl CrawlJob {
    /// Creates the level-1 job of a crawl
    pub fn root(crawl_id: &str, target: &str, max_level: u32) -> Self {
        Self {
            crawl_id: crawl_id.to_string(),
            original_target: target.to_string(),
            steam_id: target.to_string(),
            from_id: target.to_string(),
            current_level: 1,
            max_level,
        }
    }

    /// Returns true if users found from this job get jobs of their own
    pub fn can_expand(&self) -> bool {
        self.current_level < self.max_level
    }

    /// Creates the job for one friend of this job's user
    ///
    /// # Returns
    ///
    /// `None` when this job already sits at the deepest level
    pub fn child(&self, friend_id: &str) -> Option<CrawlJob> {
        if !self.can_expand() {
            return None;
        }
        Some(Self {
            crawl_id: self.crawl_id.clone(),
            original_target: self.original_target.clone(),
            steam_id: friend_id.to_string(),
            from_id: self.steam_id.clone(),
            current_level: self.current_level + 1,
            max_level: self.max_level,
        })
    }

    /// Builds a progress delta for this job's crawl
    ///
    /// # Arguments
    ///
    /// * `users_crawled` - Users finished by this update
    /// * `users_scheduled` - Change in users scheduled for crawling; negative
    ///   when previously counted jobs were lost
    pub fn progress_delta(&self, users_crawled: i64, users_scheduled: i64) -> CrawlingStatus {
        CrawlingStatus {
            crawl_id: self.crawl_id.clone(),
            original_crawl_target: self.original_target.clone(),
            max_level: self.max_level,
            total_users_to_crawl: users_scheduled,
            users_crawled,
            time_started: Utc::now(),
        }
    }

    /// Decodes and checks a job delivery
    ///
    /// An empty or malformed delivery means something other than a publisher
    /// wrote to the queue, so it is reported as `CrawlerError::InvalidJob`.
    pub fn decode(payload: &[u8]) -> Result<Self> {
        if payload.is_empty() {
            return Err(CrawlerError::InvalidJob("empty delivery".to_string()));
        }

        let job: CrawlJob = serde_json::from_slice(payload)
            .map_err(|e| CrawlerError::InvalidJob(format!("undecodable delivery: {}", e)))?;

        if job.crawl_id.is_empty() || job.steam_id.is_empty() {
            return Err(CrawlerError::InvalidJob(
                "job is missing its crawl or steam ID".to_string(),
            ));
        }

        if job.current_level == 0 || job.current_level > job.max_level {
            return Err(CrawlerError::InvalidJob(format!(
                "level {} outside 1..={} for {}",
                job.current_level, job.max_level, job.steam_id
            )));
        }

        Ok(job)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ROOT: &str = "76561197960287930";
    const FRIEND: &str = "76561197960265731";

    #[test]
    fn test_root_job() {
        let job = CrawlJob::root("c", ROOT, 2);
        assert_eq!(job.current_level, 1);
        assert_eq!(job.from_id, ROOT);
        assert_eq!(job.original_target, ROOT);
        assert!(job.can_expand());
    }

    #[test]
    fn test_child_never_exceeds_max_level() {
        for max_level in 1..=4 {
            let mut job = CrawlJob::root("c", ROOT, max_level);
            let mut levels = vec![job.current_level];
            while let Some(child) = job.child(FRIEND) {
                levels.push(child.current_level);
                job = child;
            }
            assert_eq!(levels.len() as u32, max_level);
            assert!(levels.iter().all(|l| *l <= max_level));
        }
    }

    #[test]
    fn test_child_fields() {
        let root = CrawlJob::root("c", ROOT, 3);
        let child = root.child(FRIEND).unwrap();
        assert_eq!(child.steam_id, FRIEND);
        assert_eq!(child.from_id, ROOT);
        assert_eq!(child.original_target, ROOT);
        assert_eq!(child.current_level, 2);
        assert_eq!(child.max_level, 3);
    }

    #[test]
    fn test_progress_delta() {
        let job = CrawlJob::root("c", ROOT, 2);
        let delta = job.progress_delta(1, 5);
        assert_eq!(delta.crawl_id, "c");
        assert_eq!(delta.users_crawled, 1);
        assert_eq!(delta.total_users_to_crawl, 5);
        assert_eq!(delta.max_level, 2);
    }

    #[test]
    fn test_decode_valid() {
        let job = CrawlJob::root("c", ROOT, 2);
        let payload = serde_json::to_vec(&job).unwrap();
        assert_eq!(CrawlJob::decode(&payload).unwrap(), job);
    }

    #[test]
    fn test_decode_rejects_invalid_deliveries() {
        assert!(matches!(
            CrawlJob::decode(b""),
            Err(CrawlerError::InvalidJob(_))
        ));
        assert!(matches!(
            CrawlJob::decode(b"not json"),
            Err(CrawlerError::InvalidJob(_))
        ));

        let mut job = CrawlJob::root("c", ROOT, 2);
        job.current_level = 3;
        let payload = serde_json::to_vec(&job).unwrap();
        assert!(matches!(
            CrawlJob::decode(&payload),
            Err(CrawlerError::InvalidJob(_))
        ));

        let mut job = CrawlJob::root("", ROOT, 2);
        job.crawl_id.clear();
        let payload = serde_json::to_vec(&job).unwrap();
        assert!(CrawlJob::decode(&payload).is_err());
    }
}
