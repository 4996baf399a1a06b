//! Baseline feed fetching with caching.
//!
//! Downloads the auxiliary public feeds and keeps a copy on disk:
//! - Expected per-ship values for personal rating
//! - Per-ship average damage color limits
//!
//! A fresh cached copy is served without touching the network. When the
//! network fails, an expired copy is better than nothing and is served too.

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::header::{HeaderMap, HeaderValue, ETAG, IF_NONE_MATCH, USER_AGENT};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};
use url::Url;

use crate::config::FeedConfig;
use crate::presentation::{PresentationMapper, ShipDamageLimits};
use crate::rating::ExpectedTable;

/// Errors that can occur during fetching.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP {status}: {message}")]
    HttpStatus { status: u16, message: String },

    #[error("Content too large: {size} bytes (max {max_size})")]
    ContentTooLarge { size: usize, max_size: usize },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result of a fetch operation.
#[derive(Debug, Clone)]
pub struct FetchResult {
    pub url: Url,

    /// Path where content is cached
    pub cache_path: PathBuf,

    pub content_length: usize,

    pub fetched_at: DateTime<Utc>,

    /// Whether this was served from cache
    pub from_cache: bool,

    /// Served from an expired cache entry after a network failure
    pub stale: bool,
}

/// Metadata stored alongside cached content.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheMetadata {
    pub url: String,
    pub fetched_at: DateTime<Utc>,
    pub content_length: usize,
    pub etag: Option<String>,
    pub expires_at: Option<DateTime<Utc>>,
}

/// Configuration for the feed fetcher.
#[derive(Debug, Clone)]
pub struct FetcherConfig {
    /// Directory to cache feed content
    pub cache_dir: PathBuf,

    /// How long cached content is considered fresh
    pub cache_ttl: Duration,

    /// Maximum content size to fetch
    pub max_content_size: usize,

    pub timeout: Duration,

    pub user_agent: String,
}

impl Default for FetcherConfig {
    fn default() -> Self {
        Self {
            cache_dir: PathBuf::from("./cache"),
            cache_ttl: Duration::from_secs(24 * 3600),
            max_content_size: 20 * 1024 * 1024,
            timeout: Duration::from_secs(30),
            user_agent: concat!("roster-watch/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

impl FetcherConfig {
    /// Fetcher settings from the `[feeds]` section.
    pub fn from_feeds(feeds: &FeedConfig) -> Self {
        Self {
            cache_dir: feeds.cache_dir.clone(),
            cache_ttl: Duration::from_secs(feeds.cache_ttl_hours.max(0) as u64 * 3600),
            ..Self::default()
        }
    }
}

/// HTTP fetcher with local caching.
pub struct Fetcher {
    client: Client,
    config: FetcherConfig,
}

impl Fetcher {
    /// Create a new fetcher with the given configuration.
    pub fn new(config: FetcherConfig) -> Result<Self, FetchError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&config.user_agent)
                .unwrap_or_else(|_| HeaderValue::from_static("roster-watch")),
        );

        let client = Client::builder()
            .timeout(config.timeout)
            .default_headers(headers)
            .build()?;

        Ok(Self { client, config })
    }

    /// Fetch a URL, using cache if available and fresh.
    ///
    /// Falls back to an expired cache entry if the network request fails.
    pub async fn fetch(&self, url: &Url) -> Result<FetchResult, FetchError> {
        let cache_path = self.cache_path_for_url(url);
        let meta_path = self.meta_path_for_url(url);

        let cached = self.read_metadata(&cache_path, &meta_path).await;
        if let Some(meta) = &cached {
            if self.is_fresh(meta) {
                info!("Serving {} from cache", url);
                return Ok(Self::cached_result(url, &cache_path, meta, false));
            }
            debug!("Cache expired for {}", url);
        }

        match self
            .fetch_and_cache(url, &cache_path, &meta_path, cached.as_ref())
            .await
        {
            Ok(result) => Ok(result),
            Err(e) => match cached {
                Some(meta) => {
                    warn!("Fetching {} failed ({}), serving expired cache", url, e);
                    Ok(Self::cached_result(url, &cache_path, &meta, true))
                }
                None => Err(e),
            },
        }
    }

    fn is_fresh(&self, meta: &CacheMetadata) -> bool {
        let expires_at = meta
            .expires_at
            .unwrap_or_else(|| self.expiry_from(meta.fetched_at));
        Utc::now() <= expires_at
    }

    fn expiry_from(&self, fetched_at: DateTime<Utc>) -> DateTime<Utc> {
        fetched_at + chrono::Duration::seconds(self.config.cache_ttl.as_secs() as i64)
    }

    async fn write_metadata(&self, meta_path: &Path, meta: &CacheMetadata) -> Result<(), FetchError> {
        let meta_json = serde_json::to_string_pretty(meta)?;
        fs::write(meta_path, meta_json).await?;
        Ok(())
    }

    fn cached_result(url: &Url, cache_path: &Path, meta: &CacheMetadata, stale: bool) -> FetchResult {
        FetchResult {
            url: url.clone(),
            cache_path: cache_path.to_path_buf(),
            content_length: meta.content_length,
            fetched_at: meta.fetched_at,
            from_cache: true,
            stale,
        }
    }

    /// Metadata of a cached entry, if both files are present and readable.
    async fn read_metadata(&self, cache_path: &Path, meta_path: &Path) -> Option<CacheMetadata> {
        if !cache_path.exists() || !meta_path.exists() {
            return None;
        }
        let meta_content = fs::read_to_string(meta_path).await.ok()?;
        serde_json::from_str(&meta_content).ok()
    }

    /// Fetch from network and cache the result.
    ///
    /// An expired entry with an etag is revalidated; a 304 renews it in place.
    async fn fetch_and_cache(
        &self,
        url: &Url,
        cache_path: &Path,
        meta_path: &Path,
        cached: Option<&CacheMetadata>,
    ) -> Result<FetchResult, FetchError> {
        info!("Fetching {}", url);

        let mut request = self.client.get(url.as_str());
        if let Some(etag) = cached.and_then(|m| m.etag.as_deref()) {
            request = request.header(IF_NONE_MATCH, etag);
        }
        let response = request.send().await?;

        let status = response.status();
        if status == StatusCode::NOT_MODIFIED {
            if let Some(previous) = cached {
                debug!("{} not modified, renewing cache entry", url);
                let fetched_at = Utc::now();
                let meta = CacheMetadata {
                    fetched_at,
                    expires_at: Some(self.expiry_from(fetched_at)),
                    ..previous.clone()
                };
                self.write_metadata(meta_path, &meta).await?;
                return Ok(Self::cached_result(url, cache_path, &meta, false));
            }
        }
        if !status.is_success() {
            return Err(FetchError::HttpStatus {
                status: status.as_u16(),
                message: status.canonical_reason().unwrap_or("Unknown").to_string(),
            });
        }

        let etag = response
            .headers()
            .get(ETAG)
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string());

        let content = response.bytes().await?;

        if content.len() > self.config.max_content_size {
            return Err(FetchError::ContentTooLarge {
                size: content.len(),
                max_size: self.config.max_content_size,
            });
        }

        // Ensure cache directory exists
        if let Some(parent) = cache_path.parent() {
            fs::create_dir_all(parent).await?;
        }

        let mut file = fs::File::create(cache_path).await?;
        file.write_all(&content).await?;
        file.flush().await?;

        let fetched_at = Utc::now();

        let meta = CacheMetadata {
            url: url.to_string(),
            fetched_at,
            content_length: content.len(),
            etag,
            expires_at: Some(self.expiry_from(fetched_at)),
        };
        self.write_metadata(meta_path, &meta).await?;

        Ok(FetchResult {
            url: url.clone(),
            cache_path: cache_path.to_path_buf(),
            content_length: content.len(),
            fetched_at,
            from_cache: false,
            stale: false,
        })
    }

    /// Generate a cache path for a URL.
    fn cache_path_for_url(&self, url: &Url) -> PathBuf {
        let hash = Self::url_hash(url);
        let host = url.host_str().unwrap_or("unknown");

        self.config
            .cache_dir
            .join(host)
            .join(format!("{}.json", hash))
    }

    /// Generate a metadata path for a URL.
    fn meta_path_for_url(&self, url: &Url) -> PathBuf {
        let hash = Self::url_hash(url);
        let host = url.host_str().unwrap_or("unknown");

        self.config
            .cache_dir
            .join(host)
            .join(format!("{}.meta.json", hash))
    }

    /// Hash a URL to a short string.
    fn url_hash(url: &Url) -> String {
        let mut hasher = Sha256::new();
        hasher.update(url.as_str().as_bytes());
        let result = hasher.finalize();
        hex::encode(&result[..8])
    }

    /// Read cached content as bytes.
    pub async fn read_cached_bytes(&self, result: &FetchResult) -> Result<Vec<u8>, FetchError> {
        Ok(fs::read(&result.cache_path).await?)
    }

    /// Fetch a URL and read the content in one step.
    pub async fn fetch_bytes(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        let url = Url::parse(url).map_err(|e| FetchError::InvalidUrl(format!("{}: {}", url, e)))?;
        let result = self.fetch(&url).await?;
        self.read_cached_bytes(&result).await
    }
}

/// Baseline data used for one aggregation run.
#[derive(Debug, Clone, Default)]
pub struct Baselines {
    /// Expected values; no rating is computed without them
    pub expected: Option<ExpectedTable>,

    pub damage_limits: ShipDamageLimits,
}

impl Baselines {
    /// Presentation mapper carrying the per-ship damage limits.
    pub fn mapper(&self) -> PresentationMapper {
        PresentationMapper::with_ship_damage(self.damage_limits.clone())
    }
}

/// Source of the baseline feeds. Loading never fails; missing feeds degrade.
#[async_trait]
pub trait BaselineSource: Send + Sync {
    async fn load(&self) -> Baselines;
}

/// Baselines downloaded from the public feeds.
pub struct FeedBaselines {
    fetcher: Fetcher,
    expected_values_url: String,
    damage_limits_url: Option<String>,
}

impl FeedBaselines {
    pub fn new(feeds: &FeedConfig) -> Result<Self, FetchError> {
        Ok(Self {
            fetcher: Fetcher::new(FetcherConfig::from_feeds(feeds))?,
            expected_values_url: feeds.expected_values_url.clone(),
            damage_limits_url: feeds.damage_limits_url.clone(),
        })
    }

    async fn expected_values(&self) -> Result<ExpectedTable, FetchError> {
        let bytes = self.fetcher.fetch_bytes(&self.expected_values_url).await?;
        Ok(ExpectedTable::from_json(&bytes)?)
    }

    async fn damage_limits(&self) -> Result<Option<ShipDamageLimits>, FetchError> {
        let Some(url) = &self.damage_limits_url else {
            return Ok(None);
        };
        let bytes = self.fetcher.fetch_bytes(url).await?;
        Ok(Some(serde_json::from_slice(&bytes)?))
    }
}

#[async_trait]
impl BaselineSource for FeedBaselines {
    async fn load(&self) -> Baselines {
        let (expected, limits) = tokio::join!(self.expected_values(), self.damage_limits());

        let expected = match expected {
            Ok(table) => {
                debug!("Loaded expected values for {} ships", table.len());
                Some(table)
            }
            Err(e) => {
                warn!("Expected values unavailable, ratings disabled: {}", e);
                None
            }
        };

        let damage_limits = match limits {
            Ok(limits) => limits.unwrap_or_default(),
            Err(e) => {
                warn!("Damage limits unavailable: {}", e);
                ShipDamageLimits::default()
            }
        };

        Baselines {
            expected,
            damage_limits,
        }
    }
}

/// Fixed baselines, used offline and in tests.
pub struct StaticBaselines(pub Baselines);

#[async_trait]
impl BaselineSource for StaticBaselines {
    async fn load(&self) -> Baselines {
        self.0.clone()
    }
}
