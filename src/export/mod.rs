//! Match CSV export.
//!
//! Writes every resolved roster to `match_<local timestamp>.csv` in the
//! configured folder. Cells are the display strings, `;`-separated, one row
//! per player with the team number in the first column.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use chrono::Local;
use thiserror::Error;
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;
use tracing::info;

use crate::models::{MatchResult, Player};

const HEADER: [&str; 11] = [
    "Team",
    "Player",
    "Clan",
    "Ship",
    "Matches",
    "Winrate",
    "AverageDamage",
    "MatchesShip",
    "WinrateShip",
    "AverageDamageShip",
    "WowsNumbers",
];

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d_%H-%M-%S";

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Writes rosters as CSV files into one folder.
#[derive(Debug, Clone, PartialEq)]
pub struct CsvExporter {
    dir: PathBuf,
}

impl CsvExporter {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Write one match and return the file's path.
    pub async fn write(&self, result: &MatchResult) -> Result<PathBuf, ExportError> {
        let content = render(result)?;
        fs::create_dir_all(&self.dir).await?;

        let stamp = Local::now().format(TIMESTAMP_FORMAT).to_string();
        let mut attempt = 0u32;
        loop {
            let name = match attempt {
                0 => format!("match_{}.csv", stamp),
                n => format!("match_{}_{}.csv", stamp, n),
            };
            let path = self.dir.join(name);

            match OpenOptions::new().write(true).create_new(true).open(&path).await {
                Ok(mut file) => {
                    file.write_all(&content).await?;
                    file.flush().await?;
                    info!("Saved match to {}", path.display());
                    return Ok(path);
                }
                // Two matches within one second
                Err(e) if e.kind() == ErrorKind::AlreadyExists => attempt += 1,
                Err(e) => return Err(e.into()),
            }
        }
    }
}

/// Render a roster as `;`-separated CSV.
pub fn render(result: &MatchResult) -> Result<Vec<u8>, ExportError> {
    let mut writer = csv::WriterBuilder::new()
        .delimiter(b';')
        .from_writer(Vec::new());

    writer.write_record(HEADER)?;
    for (team, players) in [("1", &result.team1), ("2", &result.team2)] {
        for player in players {
            writer.write_record(record(team, player))?;
        }
    }

    writer.into_inner().map_err(|e| ExportError::Io(e.into_error()))
}

fn record(team: &str, player: &Player) -> Vec<String> {
    let cell = |index: usize| player.display_row.get(index).cloned().unwrap_or_default();

    let mut row = vec![
        team.to_string(),
        player.name.clone(),
        player.clan_tag.clone().unwrap_or_default(),
        cell(1),
    ];
    row.extend((2..8).map(cell));
    row.push(player.profile_url().unwrap_or_default());
    row
}
