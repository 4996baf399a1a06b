//! # Roster Watch
//!
//! A match roster tracker: watches the game client's match file and shows
//! the statistics of every player in the match.
//!
//! ## Architecture
//!
//! - **arena**: Match file parsing and fingerprinting
//! - **api**: Stats provider trait and the Wargaming API client
//! - **resolve**: Per-player resolution with partial-failure handling
//! - **aggregate**: Whole-match runs, sorting and team averages
//! - **rating**: Personal rating against expected values
//! - **presentation**: Color threshold tables
//! - **calculate**: Statistics and rounding policy
//! - **export**: Optional CSV copy of every resolved match
//! - **fetch**: Cached download of the baseline feeds
//! - **watch**: Polling loop over the match and config files
//! - **config**: Configuration loading and validation

pub mod aggregate;
pub mod api;
pub mod arena;
pub mod calculate;
pub mod config;
pub mod export;
pub mod fetch;
pub mod models;
pub mod presentation;
pub mod rating;
pub mod resolve;
pub mod watch;

pub use models::*;

use std::time::Duration;

/// Parse a human-friendly duration string (e.g., "5s", "1m", "2h").
pub fn parse_duration(s: &str) -> Option<Duration> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }

    let (num_str, multiplier) = if let Some(n) = s.strip_suffix('h') {
        (n, 3600)
    } else if let Some(n) = s.strip_suffix('m') {
        (n, 60)
    } else if let Some(n) = s.strip_suffix('s') {
        (n, 1)
    } else {
        // Default to seconds
        (s, 1)
    };

    let num: u64 = num_str.parse().ok()?;
    num.checked_mul(multiplier).map(Duration::from_secs)
}
