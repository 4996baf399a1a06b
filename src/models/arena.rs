//! Match file model.

use serde::{Deserialize, Serialize};

/// Which side a vehicle is on, relative to the local player.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum Relation {
    /// The local player
    Own,
    Ally,
    Enemy,
}

impl Relation {
    /// Team the relation belongs to. The local player is on the allied team.
    pub fn team(&self) -> Team {
        match self {
            Relation::Own | Relation::Ally => Team::Ally,
            Relation::Enemy => Team::Enemy,
        }
    }
}

impl TryFrom<u8> for Relation {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Relation::Own),
            1 => Ok(Relation::Ally),
            2 => Ok(Relation::Enemy),
            other => Err(format!("unknown relation {}", other)),
        }
    }
}

impl From<Relation> for u8 {
    fn from(relation: Relation) -> Self {
        match relation {
            Relation::Own => 0,
            Relation::Ally => 1,
            Relation::Enemy => 2,
        }
    }
}

/// Side of the match table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Team {
    Ally,
    Enemy,
}

/// Game mode of the detected match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum MatchGroup {
    #[default]
    Pvp,
    Cooperative,
    Ranked,
    Clan,
    Pve,
    PvePremade,
    Event,
    Brawl,
    #[serde(other)]
    Unknown,
}

impl std::fmt::Display for MatchGroup {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            MatchGroup::Pvp => "pvp",
            MatchGroup::Cooperative => "cooperative",
            MatchGroup::Ranked => "ranked",
            MatchGroup::Clan => "clan",
            MatchGroup::Pve => "pve",
            MatchGroup::PvePremade => "pve_premade",
            MatchGroup::Event => "event",
            MatchGroup::Brawl => "brawl",
            MatchGroup::Unknown => "unknown",
        };
        write!(f, "{}", name)
    }
}

/// One vehicle entry from the match file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawVehicle {
    pub name: String,
    pub ship_id: u64,
    pub relation: Relation,
}

/// Match metadata. Immutable once parsed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct MatchMeta {
    #[serde(default)]
    pub match_group: MatchGroup,

    #[serde(default)]
    pub map_id: u64,

    #[serde(default, rename = "mapDisplayName")]
    pub map_name: String,

    #[serde(default)]
    pub players_per_team: u32,

    #[serde(default)]
    pub scenario: String,

    /// Game client build that wrote the file
    #[serde(default, rename = "clientVersionFromExe")]
    pub client_version: Option<String>,

    /// Local match start time as written by the client
    #[serde(default)]
    pub date_time: Option<String>,
}
