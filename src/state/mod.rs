//! State module for tracking crawl progress
//!
//! # Components
//!
//! - `CrawlPhase`: Running or terminated, with the outcome
//! - `CrawlState`: Current page, circuit-breaker counter and known keys
//! - `CheckpointWindow`: Pages and records not yet checkpointed

mod crawl_state;

// Re-export main types
pub use crawl_state::{CheckpointWindow, CrawlPhase, CrawlState};
