use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::sync::Arc;

/// Per-crawl maps of scheduled SteamIDs and the level each was claimed at
///
/// Mutual friends reach a user along several edges; claiming the ID before
/// publishing makes sure one job per user and level is created for a crawl.
/// A user first reached along a long path is claimed again when a shorter
/// path turns up, so the user is expanded from its shallowest level. The maps
/// live in this process only, so workers in other processes sharing a NATS
/// queue group keep their own.
#[derive(Debug, Default)]
pub struct CrawlSessions {
    visited: DashMap<String, Arc<DashMap<String, u32>>>,
}

impl CrawlSessions {
    pub fn new() -> Self {
        Self::default()
    }

    fn session(&self, crawl_id: &str) -> Arc<DashMap<String, u32>> {
        if let Some(map) = self.visited.get(crawl_id) {
            return Arc::clone(map.value());
        }
        Arc::clone(
            self.visited
                .entry(crawl_id.to_string())
                .or_default()
                .value(),
        )
    }

    /// Marks a user as scheduled at `level` for a crawl
    ///
    /// # Returns
    ///
    /// `true` if the user was unclaimed or only claimed at a deeper level,
    /// `false` if it was already claimed at `level` or above
    pub fn claim(&self, crawl_id: &str, steam_id: &str, level: u32) -> bool {
        let session = self.session(crawl_id);
        let claimed = match session.entry(steam_id.to_string()) {
            Entry::Occupied(mut entry) if level < *entry.get() => {
                entry.insert(level);
                true
            }
            // An equal or shallower claim already covers this path
            Entry::Occupied(_) => false,
            Entry::Vacant(entry) => {
                entry.insert(level);
                true
            }
        };
        claimed
    }

    /// Shallowest level the user was claimed at, if it was claimed at all
    pub fn claimed_level(&self, crawl_id: &str, steam_id: &str) -> Option<u32> {
        let session = self.visited.get(crawl_id)?;
        let level = session.get(steam_id).map(|level| *level);
        level
    }

    /// Returns true if the user was already claimed for the crawl
    pub fn is_claimed(&self, crawl_id: &str, steam_id: &str) -> bool {
        self.claimed_level(crawl_id, steam_id).is_some()
    }

    /// Number of users claimed so far for a crawl
    pub fn claimed_count(&self, crawl_id: &str) -> usize {
        self.visited
            .get(crawl_id)
            .map(|map| map.len())
            .unwrap_or(0)
    }

    /// Drops the claims of a finished crawl
    pub fn forget(&self, crawl_id: &str) {
        self.visited.remove(crawl_id);
    }
}
