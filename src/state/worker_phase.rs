//! Phases a crawl worker moves through while handling one job
//!
//! This module defines every phase and the transitions allowed between them.

use std::fmt;

/// Represents what a crawl worker is currently doing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WorkerPhase {
    /// Waiting for the next job delivery
    Idle,

    /// Looking up the friend list, store first and Steam API second
    ResolvingFriends,

    /// Fetching the player summary and owned games of a newly seen user
    ResolvingProfile,

    /// Saving the resolved user document
    Persisting,

    /// Recording progress and publishing child jobs
    FanOut,
}

impl WorkerPhase {
    /// Returns true if moving from `self` to `next` is allowed
    ///
    /// Every phase may fall back to `Idle`, which is how a job is abandoned.
    /// A cache hit skips straight from `ResolvingFriends` to `FanOut`.
    pub fn can_transition_to(&self, next: WorkerPhase) -> bool {
        use WorkerPhase::*;

        match (self, next) {
            (_, Idle) => !matches!(self, Idle),
            (Idle, ResolvingFriends) => true,
            (ResolvingFriends, ResolvingProfile) | (ResolvingFriends, FanOut) => true,
            (ResolvingProfile, Persisting) => true,
            (Persisting, FanOut) => true,
            _ => false,
        }
    }

    /// Returns true while a job is being handled
    pub fn is_busy(&self) -> bool {
        !matches!(self, Self::Idle)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::ResolvingFriends => "resolving_friends",
            Self::ResolvingProfile => "resolving_profile",
            Self::Persisting => "persisting",
            Self::FanOut => "fan_out",
        }
    }
}

impl fmt::Display for WorkerPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
