use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use roster_watch::aggregate::{MatchAggregator, RosterSink, StatusLevel};
use roster_watch::api::StatsProvider;
use roster_watch::config::AppConfig;
use roster_watch::fetch::FeedBaselines;
use roster_watch::models::{MatchResult, Player, TeamAverage};
use roster_watch::watch::{wargaming_factory, MatchWatcher};

#[derive(Parser)]
#[command(name = "roster-watch")]
#[command(about = "Match roster statistics for World of Warships")]
#[command(version)]
struct Cli {
    /// Path to configuration file
    #[arg(long, default_value = "./config.toml")]
    config: PathBuf,

    /// Log level (trace, debug, info, warn, error); overrides the config file
    #[arg(long)]
    log_level: Option<String>,

    /// Output logs as JSON
    #[arg(long)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Watch the match file and print rosters as matches start
    Watch {
        /// Print rosters as JSON
        #[arg(long)]
        json: bool,
    },

    /// Process one match file and exit
    Once {
        /// Match file (defaults to the configured replays folder)
        #[arg(long)]
        file: Option<PathBuf>,

        /// Print the roster as JSON
        #[arg(long)]
        json: bool,
    },

    /// Validate the configured application id
    Check,
}

/// Prints status changes and rosters to the terminal.
struct ConsoleSink {
    json: bool,
}

impl RosterSink for ConsoleSink {
    fn on_status_change(&self, level: StatusLevel, message: &str) {
        match level {
            StatusLevel::Error => eprintln!("[error] {}", message),
            StatusLevel::Loading => eprintln!("[loading] {}", message),
            StatusLevel::Ready => eprintln!("[ready] {}", message),
        }
    }

    fn on_roster_ready(&self, result: &MatchResult) {
        if self.json {
            match serde_json::to_string_pretty(result) {
                Ok(json) => println!("{}", json),
                Err(e) => tracing::error!("Failed to encode roster: {}", e),
            }
        } else {
            print_roster(result);
        }
    }
}

fn print_team(title: &str, players: &[Player], average: &TeamAverage) {
    println!(
        "{} (avg WR {}%, avg dmg {})",
        title,
        average.win_rate_text(),
        average.avg_damage_text()
    );
    for player in players {
        let mut cells = player.display_row.clone();
        if let Some(name) = cells.first_mut() {
            *name = player.tagged_name();
        }
        let rating = player
            .background
            .map(|c| format!(" {}", c.to_hex()))
            .unwrap_or_default();
        println!(
            "  {:<28} {}{}",
            cells.first().map(String::as_str).unwrap_or_default(),
            cells.get(1..).map(|c| c.join("  ")).unwrap_or_default(),
            rating
        );
    }
}

fn print_roster(result: &MatchResult) {
    println!(
        "{} on {} ({})",
        result.meta.match_group, result.meta.map_name, result.meta.scenario
    );
    if let Some((ally, enemy)) = &result.clan_badges {
        let tag = |b: &roster_watch::models::ClanBadge| {
            b.clan
                .as_ref()
                .map(|c| format!("[{}]", c.tag))
                .unwrap_or_default()
        };
        println!("{} {} vs {} {}", tag(ally), ally.region, tag(enemy), enemy.region);
    }
    print_team("Allies", &result.team1, &result.averages.0);
    print_team("Enemies", &result.team2, &result.averages.1);
}

fn init_tracing(level: &str, json_logs: bool) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    let registry = tracing_subscriber::registry().with(filter);
    if json_logs {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

fn build_aggregator(config: &AppConfig, provider: Arc<dyn StatsProvider>, json: bool) -> Result<Arc<MatchAggregator>> {
    let baselines = FeedBaselines::new(&config.feeds).context("Failed to create feed fetcher")?;
    let sink = Arc::new(ConsoleSink { json });
    Ok(Arc::new(
        MatchAggregator::new(provider, Arc::new(baselines), sink)
            .with_rating_column(config.display.show_rating)
            .with_csv_export(config.csv_exporter()),
    ))
}

async fn check(config: &AppConfig) -> Result<()> {
    if !config.has_credentials() {
        bail!("No application id configured in [api]");
    }
    let provider = wargaming_factory()(config)?;
    provider
        .validate_credentials()
        .await
        .with_context(|| format!("Credential check against {} failed", config.api.region))?;
    println!("Application id accepted on {}", config.api.region);
    Ok(())
}

async fn once(config: &AppConfig, file: &Path, json: bool) -> Result<()> {
    let provider = wargaming_factory()(config)?;
    let aggregator = build_aggregator(config, provider, json)?;

    match aggregator.run(file).await? {
        Some(_) => Ok(()),
        None => {
            println!("No match in progress at {}", file.display());
            Ok(())
        }
    }
}

async fn watch(config_path: PathBuf, config: AppConfig, json: bool) -> Result<()> {
    let factory = wargaming_factory();
    let provider = factory(&config)?;
    let aggregator = build_aggregator(&config, provider, json)?;
    let sink = Arc::new(ConsoleSink { json });

    let watcher = MatchWatcher::new(config_path, config, aggregator, sink, factory);

    tokio::select! {
        _ = watcher.run() => {}
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Shutting down");
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Loaded before tracing so the file's log_level can apply.
    let loaded = AppConfig::load_or_default(&cli.config);
    let level = match (&cli.log_level, &loaded) {
        (Some(level), _) => level.clone(),
        (None, Ok(config)) => config.log_level.clone(),
        (None, Err(_)) => "info".to_string(),
    };
    init_tracing(&level, cli.json_logs);

    tracing::info!("Starting roster-watch v{}", env!("CARGO_PKG_VERSION"));

    let config = loaded.with_context(|| format!("Failed to load {}", cli.config.display()))?;
    if !cli.config.exists() {
        tracing::warn!("Config file {} not found, using defaults", cli.config.display());
    }

    match cli.command {
        Commands::Watch { json } => watch(cli.config, config, json).await,
        Commands::Once { file, json } => {
            let file = file.unwrap_or_else(|| config.arena_path());
            once(&config, &file, json).await
        }
        Commands::Check => check(&config).await,
    }
}
