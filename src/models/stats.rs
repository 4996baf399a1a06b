//! Player, ship and clan statistics.

use serde::{Deserialize, Serialize};

use super::{Color, Region};
use crate::calculate;

/// An account resolved from a player name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountIdentity {
    pub account_id: u64,
    pub region: Region,
}

/// Random-battle totals for an account.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct AccountStats {
    pub hidden_profile: bool,
    pub battles: u64,
    pub wins: u64,
    pub damage_dealt: f64,
    pub frags: u64,
}

impl AccountStats {
    /// Win rate in percent, zero without battles.
    pub fn win_rate(&self) -> f64 {
        calculate::win_rate(self.wins, self.battles)
    }

    /// Average damage per battle, zero without battles.
    pub fn avg_damage(&self) -> f64 {
        calculate::avg_damage(self.damage_dealt, self.battles)
    }
}

/// Random-battle totals for one ship of an account.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ShipStats {
    pub ship_id: u64,
    pub battles: u64,
    pub wins: u64,
    pub damage_dealt: f64,
    pub frags: u64,
}

impl ShipStats {
    pub fn win_rate(&self) -> f64 {
        calculate::win_rate(self.wins, self.battles)
    }

    pub fn avg_damage(&self) -> f64 {
        calculate::avg_damage(self.damage_dealt, self.battles)
    }
}

/// Ship class, ordered so that sorting descending puts carriers first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ShipClass {
    Submarine,
    Destroyer,
    Cruiser,
    Battleship,
    AirCarrier,
}

impl ShipClass {
    /// Parse the API's type string.
    pub fn from_api(s: &str) -> Option<Self> {
        match s {
            "Destroyer" => Some(ShipClass::Destroyer),
            "Cruiser" => Some(ShipClass::Cruiser),
            "Battleship" => Some(ShipClass::Battleship),
            "AirCarrier" => Some(ShipClass::AirCarrier),
            "Submarine" => Some(ShipClass::Submarine),
            _ => None,
        }
    }

    /// Sort weight. Zero is reserved for unknown ships.
    pub fn sort_weight(&self) -> u8 {
        match self {
            ShipClass::AirCarrier => 5,
            ShipClass::Battleship => 4,
            ShipClass::Cruiser => 3,
            ShipClass::Destroyer => 2,
            ShipClass::Submarine => 1,
        }
    }
}

/// Sort weight of a nation. Unlisted nations sort last.
pub fn nation_weight(nation: &str) -> u8 {
    match nation {
        "usa" => 10,
        "uk" => 9,
        "commonwealth" => 8,
        "europe" => 7,
        "france" => 6,
        "germany" => 5,
        "italy" => 4,
        "japan" => 3,
        "pan_asia" | "pan-asia" => 2,
        "ussr" => 1,
        _ => 0,
    }
}

const SHIP_SHORT_NAMES: &[(&str, &str)] = &[
    ("Prinz Eitel Friedrich", "P. E. Friedrich"),
    ("Friedrich der Große", "F. der Große"),
    ("Admiral Graf Spee", "A. Graf Spee"),
    ("Oktyabrskaya Revolutsiya", "Okt. Revolutsiya"),
    ("HSF Admiral Graf Spee", "HSF A. Graf Spee"),
    ("Jurien de la Gravière", "J. de la Gravière"),
    ("Raimondo Montecuccoli", "Montecuccoli"),
];

/// Static ship data from the encyclopedia.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShipMeta {
    pub ship_id: u64,
    pub name: String,
    pub tier: u8,
    pub ship_class: Option<ShipClass>,
    pub nation: String,
}

impl ShipMeta {
    /// Name for the ship column, with long names abbreviated.
    pub fn display_name(&self) -> &str {
        SHIP_SHORT_NAMES
            .iter()
            .find(|(long, _)| *long == self.name)
            .map(|(_, short)| *short)
            .unwrap_or(&self.name)
    }
}

/// A clan and its display color.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClanInfo {
    pub clan_id: u64,
    pub tag: String,
    pub name: String,
    pub members_count: Option<u32>,
    pub color_rating: Option<Color>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_account_stats_zero_battles() {
        let stats = AccountStats {
            hidden_profile: false,
            battles: 0,
            wins: 0,
            damage_dealt: 0.0,
            frags: 0,
        };
        assert_eq!(stats.win_rate(), 0.0);
        assert_eq!(stats.avg_damage(), 0.0);
    }

    #[test]
    fn test_account_stats_ratios() {
        let stats = AccountStats {
            hidden_profile: false,
            battles: 10_000,
            wins: 6_000,
            damage_dealt: 3_000_000.0,
            frags: 0,
        };
        assert_eq!(stats.win_rate(), 60.0);
        assert_eq!(stats.avg_damage(), 300.0);
    }

    #[test]
    fn test_ship_class_order() {
        assert!(ShipClass::AirCarrier > ShipClass::Battleship);
        assert!(ShipClass::Battleship > ShipClass::Cruiser);
        assert!(ShipClass::Cruiser > ShipClass::Destroyer);
        assert!(ShipClass::Destroyer > ShipClass::Submarine);
        assert_eq!(ShipClass::from_api("AirCarrier"), Some(ShipClass::AirCarrier));
        assert_eq!(ShipClass::from_api("Spaceship"), None);
    }

    #[test]
    fn test_nation_weight() {
        assert_eq!(nation_weight("usa"), 10);
        assert_eq!(nation_weight("ussr"), 1);
        assert_eq!(nation_weight("spain"), 0);
    }

    #[test]
    fn test_ship_display_name() {
        let mut meta = ShipMeta {
            ship_id: 1,
            name: "Prinz Eitel Friedrich".to_string(),
            tier: 8,
            ship_class: Some(ShipClass::Battleship),
            nation: "germany".to_string(),
        };
        assert_eq!(meta.display_name(), "P. E. Friedrich");

        meta.name = "Yamato".to_string();
        assert_eq!(meta.display_name(), "Yamato");
    }
}
