//! Resolved, display-ready player and team models.

use serde::{Deserialize, Serialize};

use super::{nation_weight, ClanInfo, Color, MatchMeta, Region, ShipMeta, Team};
use crate::calculate;

/// Roster sort key. Field order is the tie-break order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct SortKey {
    pub class: u8,
    pub tier: u8,
    pub nation: u8,
}

impl SortKey {
    /// Key for a ship; unknown ships get the all-zero key and sort last.
    pub fn for_ship(ship: Option<&ShipMeta>) -> Self {
        match ship {
            Some(meta) => Self {
                class: meta.ship_class.map(|c| c.sort_weight()).unwrap_or(0),
                tier: meta.tier,
                nation: nation_weight(&meta.nation),
            },
            None => Self::default(),
        }
    }
}

/// A player ready for display. Immutable after construction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Player {
    /// Resolved account, if the name matched one
    pub account_id: Option<u64>,

    pub name: String,

    pub hidden_profile: bool,

    pub team: Team,

    /// Table cells, left to right
    pub display_row: Vec<String>,

    /// Foreground color per cell, parallel to `display_row`
    pub display_colors: Vec<Option<Color>>,

    pub sort_key: SortKey,

    pub clan_tag: Option<String>,

    pub clan_color: Option<Color>,

    /// Row background from the personal rating
    pub background: Option<Color>,

    pub region: Region,

    /// Personal rating when it could be estimated
    pub rating: Option<f64>,

    /// Account-level totals used for team averages
    #[serde(skip)]
    pub battles: u64,
    #[serde(skip)]
    pub win_rate: f64,
    #[serde(skip)]
    pub avg_damage: f64,
}

impl Player {
    /// Link to the player's page on the public stats site.
    pub fn profile_url(&self) -> Option<String> {
        let account_id = self.account_id?;
        Some(format!(
            "https://{}wows-numbers.com/player/{},{}/",
            self.region.profile_prefix(),
            account_id,
            self.name
        ))
    }

    /// Name with clan tag prefix, as shown in the name column.
    pub fn tagged_name(&self) -> String {
        match &self.clan_tag {
            Some(tag) if !tag.is_empty() => format!("[{}]{}", tag, self.name),
            _ => self.name.clone(),
        }
    }
}

/// Battle-weighted averages over one team.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TeamAverage {
    pub win_rate: f64,
    pub avg_damage: f64,
    pub win_rate_color: Color,
    pub avg_damage_color: Color,
    /// Total battles that contributed
    pub match_count: u64,
}

impl Default for TeamAverage {
    fn default() -> Self {
        Self {
            win_rate: 0.0,
            avg_damage: 0.0,
            win_rate_color: Color::GREY,
            avg_damage_color: Color::GREY,
            match_count: 0,
        }
    }
}

impl TeamAverage {
    pub fn win_rate_text(&self) -> String {
        calculate::format_win_rate(self.win_rate)
    }

    pub fn avg_damage_text(&self) -> String {
        calculate::format_avg_damage(self.avg_damage)
    }
}

/// Clan and server shown above one team in clan battles.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClanBadge {
    pub region: Region,
    pub clan: Option<ClanInfo>,
}

/// Everything handed to the display layer for one match.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchResult {
    pub meta: MatchMeta,
    pub team1: Vec<Player>,
    pub team2: Vec<Player>,
    pub averages: (TeamAverage, TeamAverage),
    /// Set only for clan battles where the opposing server was found
    pub clan_badges: Option<(ClanBadge, ClanBadge)>,
}
