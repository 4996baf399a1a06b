//! Per-mode pipeline rules.

use super::{MatchGroup, RawVehicle, Team};

/// Sentinel wrapped around bot names in the match file, e.g. `:Bot Name:`.
pub const BOT_NAME_SENTINEL: char = ':';

/// How one match mode changes the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModeRules {
    /// Team controlled by bots or scripts; never looked up
    pub excluded_team: Option<Team>,

    /// Whether sentinel-wrapped names are treated as bots
    pub bot_names: bool,

    /// Skip per-player clan lookups (opposing tags are withheld)
    pub suppress_clan_tags: bool,

    /// Opposing team may live on a different regional server
    pub cross_region: bool,
}

impl ModeRules {
    const STANDARD: ModeRules = ModeRules {
        excluded_team: None,
        bot_names: false,
        suppress_clan_tags: false,
        cross_region: false,
    };

    /// Rules table, one entry per mode.
    pub fn for_group(group: MatchGroup) -> Self {
        match group {
            MatchGroup::Cooperative => ModeRules {
                excluded_team: Some(Team::Enemy),
                bot_names: true,
                ..Self::STANDARD
            },
            MatchGroup::Pve | MatchGroup::PvePremade => ModeRules {
                excluded_team: Some(Team::Enemy),
                bot_names: true,
                ..Self::STANDARD
            },
            MatchGroup::Clan => ModeRules {
                suppress_clan_tags: true,
                cross_region: true,
                ..Self::STANDARD
            },
            MatchGroup::Pvp
            | MatchGroup::Ranked
            | MatchGroup::Event
            | MatchGroup::Brawl
            | MatchGroup::Unknown => Self::STANDARD,
        }
    }

    /// Whether this vehicle must not be resolved against the stats API.
    pub fn excludes(&self, vehicle: &RawVehicle) -> bool {
        if self.excluded_team == Some(vehicle.relation.team()) {
            return true;
        }
        self.bot_names && is_bot_name(&vehicle.name)
    }
}

/// Bot names are wrapped in the sentinel on both ends.
pub fn is_bot_name(name: &str) -> bool {
    name.len() >= 2 && name.starts_with(BOT_NAME_SENTINEL) && name.ends_with(BOT_NAME_SENTINEL)
}
