//! Stats API abstraction.
//!
//! Supports multiple providers behind one trait:
//! - Wargaming public API (default)
//! - In-memory mock (tests)

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use crate::models::{AccountIdentity, AccountStats, ClanInfo, Region, ShipMeta, ShipStats};

pub mod envelope;
pub mod wargaming;

#[cfg(test)]
pub mod mock;

pub use wargaming::WargamingClient;

/// Errors surfaced by a stats provider.
#[derive(Debug, Clone, Error)]
pub enum ApiError {
    #[error("Invalid application id, check your settings")]
    InvalidCredentials,

    #[error("Network error: {0}")]
    TransientNetwork(String),

    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    #[error("API rejected request ({code}): {message}")]
    Rejected { code: i64, message: String },
}

impl ApiError {
    /// Whether this error must abort the whole match run.
    pub fn is_fatal(&self) -> bool {
        matches!(self, ApiError::InvalidCredentials)
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            ApiError::MalformedResponse(err.to_string())
        } else {
            ApiError::TransientNetwork(err.to_string())
        }
    }
}

/// Remote source of player, ship and clan data.
///
/// Every method may be called concurrently. Absence is a value (`None` or an
/// empty map), not an error.
#[async_trait]
pub trait StatsProvider: Send + Sync {
    /// Provider name for logging.
    fn name(&self) -> &'static str;

    /// Region this provider talks to.
    fn region(&self) -> Region;

    /// A provider for the same backend on another region.
    fn with_region(&self, region: Region) -> Result<Arc<dyn StatsProvider>, ApiError>;

    /// Check that the credentials are accepted.
    async fn validate_credentials(&self) -> Result<(), ApiError>;

    /// Exact-match name search.
    async fn search_account(&self, name: &str) -> Result<Option<AccountIdentity>, ApiError>;

    async fn account_stats(&self, account_id: u64) -> Result<Option<AccountStats>, ApiError>;

    /// Ship stats for one ship, or every ship the account played when
    /// `ship_id` is `None`.
    async fn ship_stats(
        &self,
        account_id: u64,
        ship_id: Option<u64>,
    ) -> Result<HashMap<u64, ShipStats>, ApiError>;

    async fn ship_meta(&self, ship_id: u64) -> Result<Option<ShipMeta>, ApiError>;

    /// Clan id the account belongs to.
    async fn clan_for_account(&self, account_id: u64) -> Result<Option<u64>, ApiError>;

    async fn clan_details(&self, clan_id: u64) -> Result<Option<ClanInfo>, ApiError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_credentials_are_fatal() {
        assert!(ApiError::InvalidCredentials.is_fatal());
        assert!(!ApiError::TransientNetwork("timeout".to_string()).is_fatal());
        assert!(!ApiError::MalformedResponse("x".to_string()).is_fatal());
        assert!(!ApiError::Rejected {
            code: 404,
            message: "NOT_FOUND".to_string()
        }
        .is_fatal());
    }

    #[test]
    fn test_error_display() {
        let err = ApiError::Rejected {
            code: 402,
            message: "SEARCH_NOT_SPECIFIED".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "API rejected request (402): SEARCH_NOT_SPECIFIED"
        );
    }
}
