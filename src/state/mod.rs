//! State module for tracking crawl progress
//!
//! # Components
//!
//! - `CrawlState`: The orchestrator's state machine phases and legal transitions
//! - `VisitedSet`: Normalized URLs already fetched in the current crawl
//!
//! Both are scoped to a single crawl run; nothing is persisted between runs.

mod crawl_state;
mod visited;

pub use crawl_state::CrawlState;
pub use visited::{VisitedSet, Visit};
