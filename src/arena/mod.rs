//! Match file reading.
//!
//! The game client writes a JSON file into its replays folder when a match
//! starts and removes it when the match ends. This module parses that file
//! and fingerprints its raw content.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use serde::Deserialize;
use thiserror::Error;
use tokio::fs;
use tracing::debug;

use crate::models::{Fingerprint, MatchMeta, RawVehicle};

/// Errors reading the match file.
#[derive(Debug, Error)]
pub enum ArenaError {
    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse match file: {0}")]
    Parse(#[from] serde_json::Error),
}

#[derive(Debug, Deserialize)]
struct ArenaFile {
    #[serde(flatten)]
    meta: MatchMeta,

    #[serde(default)]
    vehicles: Vec<RawVehicle>,
}

/// A parsed match file.
#[derive(Debug, Clone, PartialEq)]
pub struct ArenaInfo {
    pub meta: MatchMeta,
    pub vehicles: Vec<RawVehicle>,
    /// Hash of the raw bytes the above was parsed from
    pub fingerprint: Fingerprint,
}

impl ArenaInfo {
    /// Parse raw file content.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, ArenaError> {
        let file: ArenaFile = serde_json::from_slice(bytes)?;
        Ok(Self {
            meta: file.meta,
            vehicles: file.vehicles,
            fingerprint: Fingerprint::of_bytes(bytes),
        })
    }
}

/// Read the match file. `None` when there is no match in progress.
pub async fn read(path: &Path) -> Result<Option<ArenaInfo>, ArenaError> {
    let bytes = match fs::read(path).await {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            debug!("No match file at {}", path.display());
            return Ok(None);
        }
        Err(source) => {
            return Err(ArenaError::Io {
                path: path.to_path_buf(),
                source,
            })
        }
    };

    ArenaInfo::from_bytes(&bytes).map(Some)
}

/// Change stamp of a file: modification time and length.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileStamp {
    pub modified: Option<SystemTime>,
    pub len: u64,
}

impl FileStamp {
    /// Stamp of the file at `path`, `None` if it does not exist.
    pub fn capture(path: &Path) -> Option<Self> {
        let meta = std::fs::metadata(path).ok()?;
        Some(Self {
            modified: meta.modified().ok(),
            len: meta.len(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{MatchGroup, Relation};
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    const SAMPLE: &str = r#"{
        "clientVersionFromExe": "0,12,8,0,7799480",
        "matchGroup": "pvp",
        "mapId": 21,
        "mapDisplayName": "Ocean",
        "playersPerTeam": 12,
        "scenario": "Domination",
        "dateTime": "19.10.2026 20:11:05",
        "vehicles": [
            {"shipId": 4179605488, "relation": 0, "id": 1, "name": "Captain"},
            {"shipId": 4181734896, "relation": 1, "id": 2, "name": "Friend"},
            {"shipId": 3763352560, "relation": 2, "id": 3, "name": "Rival"}
        ]
    }"#;

    #[tokio::test]
    async fn test_read_missing_file() {
        let dir = TempDir::new().unwrap();
        let result = read(&dir.path().join("tempArenaInfo.json")).await.unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn test_read_sample() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("tempArenaInfo.json");
        std::fs::write(&path, SAMPLE).unwrap();

        let info = read(&path).await.unwrap().unwrap();
        assert_eq!(info.meta.match_group, MatchGroup::Pvp);
        assert_eq!(info.meta.map_name, "Ocean");
        assert_eq!(info.meta.players_per_team, 12);
        assert_eq!(info.meta.client_version.as_deref(), Some("0,12,8,0,7799480"));
        assert_eq!(info.vehicles.len(), 3);
        assert_eq!(info.vehicles[2].relation, Relation::Enemy);
        assert_eq!(info.fingerprint, Fingerprint::of_bytes(SAMPLE.as_bytes()));
    }

    #[tokio::test]
    async fn test_read_malformed() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("tempArenaInfo.json");
        std::fs::write(&path, "{\"vehicles\": [").unwrap();

        assert!(matches!(read(&path).await, Err(ArenaError::Parse(_))));
    }

    #[test]
    fn test_fingerprint_tracks_content() {
        let a = ArenaInfo::from_bytes(SAMPLE.as_bytes()).unwrap();
        let b = ArenaInfo::from_bytes(SAMPLE.as_bytes()).unwrap();
        assert_eq!(a.fingerprint, b.fingerprint);

        let changed = SAMPLE.replace("Ocean", "Islands");
        let c = ArenaInfo::from_bytes(changed.as_bytes()).unwrap();
        assert_ne!(a.fingerprint, c.fingerprint);
    }

    #[test]
    fn test_file_stamp() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("tempArenaInfo.json");
        assert!(FileStamp::capture(&path).is_none());

        std::fs::write(&path, SAMPLE).unwrap();
        let stamp = FileStamp::capture(&path).unwrap();
        assert_eq!(stamp.len, SAMPLE.len() as u64);
    }
}
