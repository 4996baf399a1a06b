//! Match file watching.
//!
//! Polls the game's match file and the configuration file. A changed match
//! file starts a new aggregation run and aborts the one in flight; a changed
//! configuration swaps the stats provider and re-resolves the current match.
//! No run starts before the credentials have been checked. Rejected
//! credentials stop automatic runs until the configuration changes; a check
//! that could not reach the API is retried on every poll.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::task::{JoinError, JoinHandle};
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use crate::aggregate::{
    AggregateError, MatchAggregator, RosterSink, StatusLevel, STATUS_CHECK_LOGS, STATUS_READY,
};
use crate::api::{ApiError, StatsProvider, WargamingClient};
use crate::arena::FileStamp;
use crate::config::AppConfig;
use crate::models::MatchResult;

/// Builds a stats provider from configuration.
pub type ProviderFactory =
    Arc<dyn Fn(&AppConfig) -> Result<Arc<dyn StatsProvider>, ApiError> + Send + Sync>;

/// Factory for the Wargaming API client.
pub fn wargaming_factory() -> ProviderFactory {
    Arc::new(|config: &AppConfig| -> Result<Arc<dyn StatsProvider>, ApiError> {
        let client = WargamingClient::from_config(&config.api)?;
        Ok(Arc::new(client) as Arc<dyn StatsProvider>)
    })
}

/// Status text when no application id is configured.
pub const STATUS_NO_CREDENTIALS: &str = "No application id configured";

/// Status text when the credential check could not reach the API.
pub const STATUS_CREDENTIALS_UNVERIFIED: &str = "Cannot reach the stats API to check the application id";

/// Whether automatic runs may start.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialGate {
    /// Credentials were accepted
    Open,
    /// Missing or rejected; waits for a configuration change
    Rejected,
    /// The check failed for another reason; retried on the next poll
    Unverified,
}

type RunHandle = JoinHandle<Result<Option<MatchResult>, AggregateError>>;

/// Polling run loop.
pub struct MatchWatcher {
    config_path: PathBuf,
    config: AppConfig,
    config_stamp: Option<FileStamp>,
    arena_stamp: Option<FileStamp>,
    aggregator: Arc<MatchAggregator>,
    sink: Arc<dyn RosterSink>,
    factory: ProviderFactory,
    gate: CredentialGate,
    current: Option<RunHandle>,
}

impl MatchWatcher {
    pub fn new(
        config_path: PathBuf,
        config: AppConfig,
        aggregator: Arc<MatchAggregator>,
        sink: Arc<dyn RosterSink>,
        factory: ProviderFactory,
    ) -> Self {
        let config_stamp = FileStamp::capture(&config_path);
        Self {
            config_path,
            config,
            config_stamp,
            arena_stamp: None,
            aggregator,
            sink,
            factory,
            gate: CredentialGate::Unverified,
            current: None,
        }
    }

    /// Whether automatic runs are paused.
    pub fn is_blocked(&self) -> bool {
        self.gate != CredentialGate::Open
    }

    pub fn gate(&self) -> CredentialGate {
        self.gate
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Check credentials and unblock runs if they are accepted.
    pub async fn start(&mut self) {
        self.gate = self.check_credentials().await;
    }

    /// Run the loop forever.
    pub async fn run(mut self) {
        let period = self.config.poll_interval();
        let mut ticker = interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        info!(
            "Watching {} every {:?}",
            self.config.arena_path().display(),
            period
        );
        self.start().await;

        loop {
            ticker.tick().await;
            self.tick().await;
        }
    }

    /// One poll: collect a finished run, reload config, start a run if needed.
    pub async fn tick(&mut self) {
        self.reap().await;
        self.reload_if_changed().await;

        match self.gate {
            CredentialGate::Open => {}
            CredentialGate::Rejected => return,
            CredentialGate::Unverified => {
                self.start().await;
                if self.is_blocked() {
                    return;
                }
            }
        }

        let path = self.config.arena_path();
        let stamp = FileStamp::capture(&path);
        if stamp == self.arena_stamp {
            return;
        }
        self.arena_stamp = stamp;

        match stamp {
            Some(_) => self.start_run(path),
            None => debug!("Match file removed"),
        }
    }

    /// Wait for the run in flight, if any.
    pub async fn wait_for_run(&mut self) {
        if let Some(handle) = self.current.take() {
            self.finish_run(handle.await);
        }
    }

    fn start_run(&mut self, path: PathBuf) {
        if let Some(previous) = self.current.take() {
            debug!("Aborting run for the previous match");
            previous.abort();
        }

        let aggregator = self.aggregator.clone();
        let ticket = aggregator.ticket();
        self.current = Some(tokio::spawn(async move {
            aggregator.run_with_ticket(&path, ticket).await
        }));
    }

    async fn reap(&mut self) {
        if self.current.as_ref().is_some_and(|h| h.is_finished()) {
            self.wait_for_run().await;
        }
    }

    fn finish_run(&mut self, outcome: Result<Result<Option<MatchResult>, AggregateError>, JoinError>) {
        match outcome {
            Ok(Ok(Some(result))) => debug!(
                "Run finished: {} vs {} players",
                result.team1.len(),
                result.team2.len()
            ),
            Ok(Ok(None)) => {}
            Ok(Err(AggregateError::Superseded)) => {}
            Ok(Err(e)) if e.is_credentials() => {
                warn!("Credentials rejected, pausing until the configuration changes");
                self.gate = CredentialGate::Rejected;
            }
            // Already reported by the aggregator
            Ok(Err(_)) => {}
            Err(e) if e.is_cancelled() => {}
            Err(e) => {
                error!("Run task failed: {}", e);
                self.sink
                    .on_status_change(StatusLevel::Error, STATUS_CHECK_LOGS);
            }
        }
    }

    async fn reload_if_changed(&mut self) {
        let stamp = FileStamp::capture(&self.config_path);
        if stamp == self.config_stamp {
            return;
        }
        self.config_stamp = stamp;
        if stamp.is_none() {
            return;
        }

        info!("Configuration changed, reloading {}", self.config_path.display());
        match AppConfig::from_file(&self.config_path) {
            Ok(config) => self.apply(config).await,
            Err(e) => {
                error!("Keeping previous configuration: {}", e);
                self.sink
                    .on_status_change(StatusLevel::Error, STATUS_CHECK_LOGS);
            }
        }
    }

    /// Swap in a new configuration.
    pub async fn apply(&mut self, config: AppConfig) {
        let provider = match (self.factory)(&config) {
            Ok(provider) => provider,
            Err(e) => {
                error!("Cannot create stats provider: {}", e);
                self.sink
                    .on_status_change(StatusLevel::Error, STATUS_CHECK_LOGS);
                return;
            }
        };

        if let Some(handle) = self.current.take() {
            handle.abort();
        }
        self.aggregator.set_rating_column(config.display.show_rating);
        self.aggregator.set_csv_export(config.csv_exporter()).await;
        self.aggregator.reconfigure(provider).await;
        self.config = config;

        // Re-resolve whatever match is on disk
        self.arena_stamp = None;
        self.start().await;
    }

    async fn check_credentials(&self) -> CredentialGate {
        if !self.config.has_credentials() {
            self.sink
                .on_status_change(StatusLevel::Error, STATUS_NO_CREDENTIALS);
            return CredentialGate::Rejected;
        }

        let provider = self.aggregator.provider().await;
        match provider.validate_credentials().await {
            Ok(()) => {
                self.sink.on_status_change(StatusLevel::Ready, STATUS_READY);
                CredentialGate::Open
            }
            Err(e) if e.is_fatal() => {
                error!("Credentials rejected by {}: {}", provider.name(), e);
                self.sink.on_status_change(StatusLevel::Error, &e.to_string());
                CredentialGate::Rejected
            }
            Err(e) => {
                warn!("Could not validate credentials, retrying next poll: {}", e);
                self.sink
                    .on_status_change(StatusLevel::Error, STATUS_CREDENTIALS_UNVERIFIED);
                CredentialGate::Unverified
            }
        }
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }
}
