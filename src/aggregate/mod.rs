//! Match aggregation.
//!
//! Drives player resolution over a whole match:
//! - Reads the match file and skips content it has already processed
//! - Finds the opposing server in clan battles
//! - Resolves players one after another, reporting progress
//! - Sorts both rosters and computes team averages
//! - Optionally saves each resolved match as CSV
//!
//! Results of runs superseded by a newer match are discarded.

use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use thiserror::Error;
use tokio::sync::RwLock;
use tracing::{debug, error, info, warn};

use crate::api::{ApiError, StatsProvider};
use crate::arena::{self, ArenaError};
use crate::calculate;
use crate::export::CsvExporter;
use crate::fetch::BaselineSource;
use crate::models::{
    ClanBadge, ClanInfo, Fingerprint, MatchMeta, MatchResult, ModeRules, Player, RawVehicle,
    Region, Team, TeamAverage,
};
use crate::presentation::PresentationMapper;
use crate::resolve::{PlayerResolver, ResolveError};

/// Status text shown while idle.
pub const STATUS_READY: &str = "Ready";

/// Status text for unexpected failures; details go to the log.
pub const STATUS_CHECK_LOGS: &str = "Error, check logs";

/// Errors that end a run.
#[derive(Debug, Error)]
pub enum AggregateError {
    #[error(transparent)]
    Arena(#[from] ArenaError),

    #[error(transparent)]
    Api(ApiError),

    #[error("Run superseded by a newer match")]
    Superseded,
}

impl From<ResolveError> for AggregateError {
    fn from(err: ResolveError) -> Self {
        match err {
            ResolveError::Fatal(e) => AggregateError::Api(e),
        }
    }
}

impl AggregateError {
    /// Credentials were rejected; automatic runs should stop until reconfigured.
    pub fn is_credentials(&self) -> bool {
        matches!(self, AggregateError::Api(ApiError::InvalidCredentials))
    }

    /// Message for the status line.
    pub fn status_message(&self) -> String {
        match self {
            AggregateError::Api(e) if e.is_fatal() => e.to_string(),
            _ => STATUS_CHECK_LOGS.to_string(),
        }
    }
}

/// Severity of a status message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusLevel {
    Ready,
    Loading,
    Error,
}

/// Receives status changes and finished rosters.
pub trait RosterSink: Send + Sync {
    fn on_status_change(&self, level: StatusLevel, message: &str);

    fn on_roster_ready(&self, result: &MatchResult);
}

/// Generation token for one run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunTicket(u64);

/// Sort a roster by ship class, tier and nation, highest first.
///
/// Stable, so players with equal keys keep file order.
pub fn sort_roster(players: &mut [Player]) {
    players.sort_by(|a, b| b.sort_key.cmp(&a.sort_key));
}

fn progress_message(done: usize, total: usize) -> String {
    let pct = if total == 0 { 100 } else { done * 100 / total };
    format!("Getting stats ({}%)", pct)
}

/// Aggregates matches into rosters.
pub struct MatchAggregator {
    provider: RwLock<Arc<dyn StatsProvider>>,
    baselines: Arc<dyn BaselineSource>,
    sink: Arc<dyn RosterSink>,
    last_processed: RwLock<Option<Fingerprint>>,
    generation: AtomicU64,
    show_rating: AtomicBool,
    csv_export: RwLock<Option<CsvExporter>>,
}

impl MatchAggregator {
    pub fn new(
        provider: Arc<dyn StatsProvider>,
        baselines: Arc<dyn BaselineSource>,
        sink: Arc<dyn RosterSink>,
    ) -> Self {
        Self {
            provider: RwLock::new(provider),
            baselines,
            sink,
            last_processed: RwLock::new(None),
            generation: AtomicU64::new(0),
            show_rating: AtomicBool::new(false),
            csv_export: RwLock::new(None),
        }
    }

    /// Save every resolved match through `exporter`.
    pub fn with_csv_export(mut self, exporter: Option<CsvExporter>) -> Self {
        self.csv_export = RwLock::new(exporter);
        self
    }

    /// Change where, or whether, later matches are saved.
    pub async fn set_csv_export(&self, exporter: Option<CsvExporter>) {
        *self.csv_export.write().await = exporter;
    }

    /// Append the personal rating as a trailing column.
    pub fn with_rating_column(self, show: bool) -> Self {
        self.set_rating_column(show);
        self
    }

    /// Toggle the rating column for subsequent runs.
    pub fn set_rating_column(&self, show: bool) {
        self.show_rating.store(show, Ordering::SeqCst);
    }

    /// Current provider.
    pub async fn provider(&self) -> Arc<dyn StatsProvider> {
        self.provider.read().await.clone()
    }

    /// Swap in a new provider.
    ///
    /// Cancels any run in flight and forgets the last match, so the current
    /// match is resolved again with the new settings.
    pub async fn reconfigure(&self, provider: Arc<dyn StatsProvider>) {
        info!(
            "Reconfigured stats provider: {} ({})",
            provider.name(),
            provider.region()
        );
        *self.provider.write().await = provider;
        *self.last_processed.write().await = None;
        self.generation.fetch_add(1, Ordering::SeqCst);
    }

    /// Start a new generation, superseding every earlier ticket.
    pub fn ticket(&self) -> RunTicket {
        RunTicket(self.generation.fetch_add(1, Ordering::SeqCst) + 1)
    }

    pub fn is_current(&self, ticket: RunTicket) -> bool {
        self.generation.load(Ordering::SeqCst) == ticket.0
    }

    fn ensure_current(&self, ticket: RunTicket) -> Result<(), AggregateError> {
        if self.is_current(ticket) {
            Ok(())
        } else {
            Err(AggregateError::Superseded)
        }
    }

    /// Process the match file at `path` with a fresh ticket.
    pub async fn run(&self, path: &Path) -> Result<Option<MatchResult>, AggregateError> {
        let ticket = self.ticket();
        self.run_with_ticket(path, ticket).await
    }

    /// Process the match file at `path`.
    ///
    /// Returns `Ok(None)` without any callback when there is no match or the
    /// match was already processed.
    pub async fn run_with_ticket(
        &self,
        path: &Path,
        ticket: RunTicket,
    ) -> Result<Option<MatchResult>, AggregateError> {
        let info = match arena::read(path).await {
            Ok(Some(info)) => info,
            Ok(None) => return Ok(None),
            Err(ArenaError::Parse(e)) => {
                warn!("Ignoring unreadable match file: {}", e);
                return Ok(None);
            }
            Err(e) => return Err(e.into()),
        };

        if self.last_processed.read().await.as_ref() == Some(&info.fingerprint) {
            debug!("Match {} already processed", info.fingerprint.short());
            return Ok(None);
        }

        info!(
            "Processing {} match on {} ({} players, {})",
            info.meta.match_group,
            info.meta.map_name,
            info.vehicles.len(),
            info.fingerprint.short()
        );

        match self.aggregate(&info.meta, &info.vehicles, ticket).await {
            Ok(result) => {
                // Only successful runs count as processed
                *self.last_processed.write().await = Some(info.fingerprint.clone());
                self.sink.on_roster_ready(&result);
                self.save_csv(&result).await;
                self.sink.on_status_change(StatusLevel::Ready, STATUS_READY);
                Ok(Some(result))
            }
            Err(AggregateError::Superseded) => {
                debug!("Discarding superseded run for {}", info.fingerprint.short());
                Err(AggregateError::Superseded)
            }
            Err(e) => {
                error!("Match run failed: {}", e);
                self.sink
                    .on_status_change(StatusLevel::Error, &e.status_message());
                Err(e)
            }
        }
    }

    /// A failed export is logged and does not fail the run.
    async fn save_csv(&self, result: &MatchResult) {
        let exporter = self.csv_export.read().await.clone();
        if let Some(exporter) = exporter {
            if let Err(e) = exporter.write(result).await {
                warn!("Failed to save match CSV in {}: {}", exporter.dir().display(), e);
            }
        }
    }

    async fn aggregate(
        &self,
        meta: &MatchMeta,
        vehicles: &[RawVehicle],
        ticket: RunTicket,
    ) -> Result<MatchResult, AggregateError> {
        self.ensure_current(ticket)?;
        self.sink
            .on_status_change(StatusLevel::Loading, &progress_message(0, vehicles.len()));

        let baselines = self.baselines.load().await;
        let mapper = baselines.mapper();
        let rules = ModeRules::for_group(meta.match_group);
        let provider = self.provider().await;
        let show_rating = self.show_rating.load(Ordering::SeqCst);

        let enemy_provider = if rules.cross_region {
            self.find_enemy_region(&provider, vehicles).await?
        } else {
            None
        };
        let badges_wanted = enemy_provider.is_some();
        let enemy_provider = enemy_provider.unwrap_or_else(|| provider.clone());

        let ally_resolver = PlayerResolver::new(
            provider.as_ref(),
            rules,
            baselines.expected.as_ref(),
            &mapper,
        )
        .with_rating_column(show_rating);
        let enemy_resolver = PlayerResolver::new(
            enemy_provider.as_ref(),
            rules,
            baselines.expected.as_ref(),
            &mapper,
        )
        .with_rating_column(show_rating);

        let mut team1 = Vec::new();
        let mut team2 = Vec::new();
        for (i, vehicle) in vehicles.iter().enumerate() {
            self.ensure_current(ticket)?;

            match vehicle.relation.team() {
                Team::Ally => team1.push(ally_resolver.resolve(vehicle).await?),
                Team::Enemy => team2.push(enemy_resolver.resolve(vehicle).await?),
            }

            self.sink.on_status_change(
                StatusLevel::Loading,
                &progress_message(i + 1, vehicles.len()),
            );
        }

        sort_roster(&mut team1);
        sort_roster(&mut team2);

        let averages = (
            team_average(&team1, Team::Ally, &rules, &mapper),
            team_average(&team2, Team::Enemy, &rules, &mapper),
        );

        let clan_badges = if badges_wanted {
            Some((
                team_badge(provider.as_ref(), &team1).await?,
                team_badge(enemy_provider.as_ref(), &team2).await?,
            ))
        } else {
            None
        };

        self.ensure_current(ticket)?;

        Ok(MatchResult {
            meta: meta.clone(),
            team1,
            team2,
            averages,
            clan_badges,
        })
    }

    /// Provider for the server the enemy team plays on.
    ///
    /// Tries the configured region first, then the others, and adopts the
    /// first one where every enemy name resolves.
    async fn find_enemy_region(
        &self,
        provider: &Arc<dyn StatsProvider>,
        vehicles: &[RawVehicle],
    ) -> Result<Option<Arc<dyn StatsProvider>>, AggregateError> {
        let enemies: Vec<&RawVehicle> = vehicles
            .iter()
            .filter(|v| v.relation.team() == Team::Enemy)
            .collect();
        if enemies.is_empty() {
            return Ok(None);
        }

        let home = provider.region();
        let candidates = std::iter::once(home).chain(Region::ALL.into_iter().filter(|r| *r != home));

        for region in candidates {
            let candidate = if region == home {
                provider.clone()
            } else {
                match provider.with_region(region) {
                    Ok(p) => p,
                    Err(e) => {
                        warn!("Cannot query region {}: {}", region, e);
                        continue;
                    }
                }
            };

            if all_names_resolve(candidate.as_ref(), &enemies).await? {
                info!("Enemy clan plays on {}", region);
                return Ok(Some(candidate));
            }
        }

        warn!("Could not determine the enemy server, resolving on {}", home);
        Ok(None)
    }
}

async fn all_names_resolve(
    provider: &dyn StatsProvider,
    vehicles: &[&RawVehicle],
) -> Result<bool, AggregateError> {
    for vehicle in vehicles {
        match provider.search_account(&vehicle.name).await {
            Ok(Some(_)) => {}
            Ok(None) => return Ok(false),
            Err(e) if e.is_fatal() => return Err(AggregateError::Api(e)),
            Err(e) => {
                debug!("Search on {} failed: {}", provider.region(), e);
                return Ok(false);
            }
        }
    }
    Ok(true)
}

/// Team average, neutral for teams that are never looked up.
fn team_average(
    players: &[Player],
    team: Team,
    rules: &ModeRules,
    mapper: &PresentationMapper,
) -> TeamAverage {
    if rules.excluded_team == Some(team) {
        return TeamAverage::default();
    }
    calculate::team_average(players, mapper)
}

/// Clan of the first resolved player in a team.
async fn team_badge(provider: &dyn StatsProvider, players: &[Player]) -> Result<ClanBadge, AggregateError> {
    let mut clan: Option<ClanInfo> = None;

    if let Some(account_id) = players.iter().find_map(|p| p.account_id) {
        let lookup = async {
            match provider.clan_for_account(account_id).await? {
                Some(clan_id) => provider.clan_details(clan_id).await,
                None => Ok(None),
            }
        };
        match lookup.await {
            Ok(found) => clan = found,
            Err(e) if e.is_fatal() => return Err(AggregateError::Api(e)),
            Err(e) => warn!("Clan lookup on {} failed: {}", provider.region(), e),
        }
    }

    Ok(ClanBadge {
        region: provider.region(),
        clan,
    })
}
