//! Wargaming public API provider.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use reqwest::Client;
use serde::de::DeserializeOwned;
use tracing::debug;
use url::Url;

use super::envelope::{
    take_by_id, AccountInfoEntry, AccountListEntry, ById, ClanInfoEntry, ClanMemberEntry,
    Envelope, ShipInfoEntry, ShipStatsEntry,
};
use super::{ApiError, StatsProvider};
use crate::config::ApiConfig;
use crate::models::{AccountIdentity, AccountStats, ClanInfo, Region, ShipMeta, ShipStats};

const ACCOUNT_INFO_FIELDS: &str = "hidden_profile,statistics.pvp.battles,statistics.pvp.wins,\
statistics.pvp.damage_dealt,statistics.pvp.frags";
const SHIP_STATS_FIELDS: &str = "ship_id,pvp.battles,pvp.wins,pvp.damage_dealt,pvp.frags";
const SHIP_INFO_FIELDS: &str = "name,tier,type,nation";
const CLAN_INFO_FIELDS: &str = "tag,name,members_count";

/// Client for the regional Wargaming API.
///
/// Owns a pooled HTTP client that is safe to share between concurrent
/// player resolutions. Reconfiguration builds a new client.
pub struct WargamingClient {
    client: Client,
    application_id: String,
    region: Region,
    base_url: Url,
}

impl WargamingClient {
    /// Create a client for one region.
    pub fn new(
        application_id: String,
        region: Region,
        timeout: Duration,
    ) -> Result<Self, ApiError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_static(concat!("roster-watch/", env!("CARGO_PKG_VERSION"))),
        );

        let client = Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout)
            .default_headers(headers)
            .build()?;

        Self::with_client(client, application_id, region)
    }

    /// Create a client from the `[api]` configuration section.
    pub fn from_config(config: &ApiConfig) -> Result<Self, ApiError> {
        Self::new(
            config.application_id.clone(),
            config.region,
            Duration::from_secs(config.timeout_seconds),
        )
    }

    fn with_client(client: Client, application_id: String, region: Region) -> Result<Self, ApiError> {
        let base_url = Url::parse(&region.api_base_url())
            .map_err(|e| ApiError::MalformedResponse(format!("bad base url: {}", e)))?;
        Ok(Self {
            client,
            application_id,
            region,
            base_url,
        })
    }

    /// Build the request URL for `block/method` with query parameters.
    fn endpoint(&self, block: &str, method: &str, params: &[(&str, String)]) -> Result<Url, ApiError> {
        let mut url = self
            .base_url
            .join(&format!("{}/{}/", block, method))
            .map_err(|e| ApiError::MalformedResponse(format!("bad endpoint: {}", e)))?;
        {
            let mut query = url.query_pairs_mut();
            query.append_pair("application_id", &self.application_id);
            for (key, value) in params {
                if !value.is_empty() {
                    query.append_pair(key, value);
                }
            }
        }
        Ok(url)
    }

    /// GET an endpoint and unwrap its envelope.
    async fn get<T: DeserializeOwned>(
        &self,
        block: &str,
        method: &str,
        params: &[(&str, String)],
    ) -> Result<Option<T>, ApiError> {
        let url = self.endpoint(block, method, params)?;
        debug!("GET {}/{} on {}", block, method, self.region);

        let response = self.client.get(url).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(ApiError::TransientNetwork(format!(
                "HTTP {} from {}/{}",
                status.as_u16(),
                block,
                method
            )));
        }

        let body = response.bytes().await?;
        let envelope: Envelope<T> = serde_json::from_slice(&body)
            .map_err(|e| ApiError::MalformedResponse(format!("{}/{}: {}", block, method, e)))?;
        envelope.into_data()
    }
}

#[async_trait]
impl StatsProvider for WargamingClient {
    fn name(&self) -> &'static str {
        "wargaming"
    }

    fn region(&self) -> Region {
        self.region
    }

    fn with_region(&self, region: Region) -> Result<Arc<dyn StatsProvider>, ApiError> {
        let client = Self::with_client(self.client.clone(), self.application_id.clone(), region)?;
        Ok(Arc::new(client))
    }

    async fn validate_credentials(&self) -> Result<(), ApiError> {
        let _: Option<serde_json::Value> = self
            .get(
                "encyclopedia",
                "info",
                &[("fields", "ships_updated_at".to_string())],
            )
            .await?;
        Ok(())
    }

    async fn search_account(&self, name: &str) -> Result<Option<AccountIdentity>, ApiError> {
        let entries: Option<Vec<AccountListEntry>> = self
            .get(
                "account",
                "list",
                &[
                    ("search", name.to_string()),
                    ("type", "exact".to_string()),
                    ("fields", "account_id,nickname".to_string()),
                ],
            )
            .await?;

        Ok(entries
            .unwrap_or_default()
            .into_iter()
            .find_map(|e| e.account_id)
            .map(|account_id| AccountIdentity {
                account_id,
                region: self.region,
            }))
    }

    async fn account_stats(&self, account_id: u64) -> Result<Option<AccountStats>, ApiError> {
        let data: Option<ById<AccountInfoEntry>> = self
            .get(
                "account",
                "info",
                &[
                    ("account_id", account_id.to_string()),
                    ("fields", ACCOUNT_INFO_FIELDS.to_string()),
                ],
            )
            .await?;
        Ok(take_by_id(data, account_id).map(AccountStats::from))
    }

    async fn ship_stats(
        &self,
        account_id: u64,
        ship_id: Option<u64>,
    ) -> Result<HashMap<u64, ShipStats>, ApiError> {
        let data: Option<ById<Vec<ShipStatsEntry>>> = self
            .get(
                "ships",
                "stats",
                &[
                    ("account_id", account_id.to_string()),
                    ("ship_id", ship_id.map(|id| id.to_string()).unwrap_or_default()),
                    ("fields", SHIP_STATS_FIELDS.to_string()),
                ],
            )
            .await?;

        Ok(take_by_id(data, account_id)
            .unwrap_or_default()
            .into_iter()
            .filter_map(ShipStatsEntry::into_stats)
            .map(|stats| (stats.ship_id, stats))
            .collect())
    }

    async fn ship_meta(&self, ship_id: u64) -> Result<Option<ShipMeta>, ApiError> {
        let data: Option<ById<ShipInfoEntry>> = self
            .get(
                "encyclopedia",
                "ships",
                &[
                    ("ship_id", ship_id.to_string()),
                    ("fields", SHIP_INFO_FIELDS.to_string()),
                ],
            )
            .await?;
        Ok(take_by_id(data, ship_id).map(|entry| entry.into_meta(ship_id)))
    }

    async fn clan_for_account(&self, account_id: u64) -> Result<Option<u64>, ApiError> {
        let data: Option<ById<ClanMemberEntry>> = self
            .get(
                "clans",
                "accountinfo",
                &[("account_id", account_id.to_string())],
            )
            .await?;
        Ok(take_by_id(data, account_id).and_then(|member| member.clan_id))
    }

    async fn clan_details(&self, clan_id: u64) -> Result<Option<ClanInfo>, ApiError> {
        let data: Option<ById<ClanInfoEntry>> = self
            .get(
                "clans",
                "info",
                &[
                    ("clan_id", clan_id.to_string()),
                    ("fields", CLAN_INFO_FIELDS.to_string()),
                ],
            )
            .await?;
        Ok(take_by_id(data, clan_id).map(|entry| entry.into_clan(clan_id)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(region: Region) -> WargamingClient {
        WargamingClient::new("app-id".to_string(), region, Duration::from_secs(10)).unwrap()
    }

    #[test]
    fn test_endpoint_url() {
        let url = client(Region::Na)
            .endpoint(
                "account",
                "list",
                &[("search", "Some Name".to_string()), ("type", "exact".to_string())],
            )
            .unwrap();

        assert_eq!(url.host_str(), Some("api.worldofwarships.com"));
        assert_eq!(url.path(), "/wows/account/list/");
        let query: Vec<(String, String)> = url.query_pairs().into_owned().collect();
        assert!(query.contains(&("application_id".to_string(), "app-id".to_string())));
        assert!(query.contains(&("search".to_string(), "Some Name".to_string())));
    }

    #[test]
    fn test_endpoint_skips_empty_params() {
        let url = client(Region::Eu)
            .endpoint("ships", "stats", &[("ship_id", String::new())])
            .unwrap();
        assert!(!url.query().unwrap_or_default().contains("ship_id"));
    }

    #[test]
    fn test_with_region() {
        let eu = client(Region::Eu);
        let asia = eu.with_region(Region::Asia).unwrap();
        assert_eq!(asia.region(), Region::Asia);
        assert_eq!(eu.region(), Region::Eu);
        assert_eq!(asia.name(), "wargaming");
    }

    #[test]
    fn test_from_config() {
        let config = ApiConfig {
            application_id: "abc".to_string(),
            region: Region::Ru,
            timeout_seconds: 15,
        };
        let client = WargamingClient::from_config(&config).unwrap();
        assert_eq!(client.region(), Region::Ru);
        assert_eq!(client.base_url.as_str(), "https://api.worldofwarships.ru/wows/");
    }
}
