/// Crawl state definitions for the orchestrator
///
/// This module defines the phases a crawl moves through and which moves
/// between them are legal.
use std::fmt;

/// Represents the current phase of a crawl run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CrawlState {
    // ===== Active States =====
    /// Configuration is being validated
    Init,

    /// A document is being retrieved
    Fetching,

    /// Records are being extracted from the fetched document
    Extracting,

    /// Resolving the next-page link
    FollowingNext,

    /// Draining the detail-page queue for the current list page
    FollowingDetail,

    // ===== Terminal States =====
    /// The crawl ended normally
    Done,

    /// The crawl ended with an error or was cancelled
    Failed,
}

impl CrawlState {
    /// Returns true if this is a terminal state
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done | Self::Failed)
    }

    /// Returns true if the orchestrator may move from `self` to `next`
    ///
    /// Terminal states have no outgoing transitions, and any active state
    /// may fail.
    pub fn can_transition_to(&self, next: CrawlState) -> bool {
        use CrawlState::*;

        if self.is_terminal() {
            return false;
        }

        if next == Failed {
            return true;
        }

        matches!(
            (self, next),
            (Init, Fetching)
                | (Fetching, Extracting)
                // Extracting -> Fetching is the one-shot dynamic escalation
                | (Extracting, Fetching)
                | (Extracting, FollowingNext)
                | (Extracting, FollowingDetail)
                | (Extracting, Done)
                | (FollowingNext, Fetching)
                | (FollowingNext, Done)
                | (FollowingDetail, FollowingNext)
                | (FollowingDetail, Done)
        )
    }

    /// Short name used in log lines
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Init => "init",
            Self::Fetching => "fetching",
            Self::Extracting => "extracting",
            Self::FollowingNext => "following_next",
            Self::FollowingDetail => "following_detail",
            Self::Done => "done",
            Self::Failed => "failed",
        }
    }

    /// Returns all possible crawl states
    pub fn all_states() -> Vec<Self> {
        vec![
            Self::Init,
            Self::Fetching,
            Self::Extracting,
            Self::FollowingNext,
            Self::FollowingDetail,
            Self::Done,
            Self::Failed,
        ]
    }
}

impl fmt::Display for CrawlState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
