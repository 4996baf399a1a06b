//! Personal rating estimation.
//!
//! Compares a player's per-ship totals against published per-ship expected
//! values and blends the damage, frag and win ratios into a single score.

use std::collections::HashMap;

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::models::ShipStats;

/// Expected per-battle values for one ship.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ExpectedValues {
    pub average_damage_dealt: f64,
    pub average_frags: f64,
    /// Win rate in percent
    pub win_rate: f64,
}

impl ExpectedValues {
    fn is_usable(&self) -> bool {
        self.average_damage_dealt > 0.0 && self.average_frags > 0.0 && self.win_rate > 0.0
    }
}

/// Ships without data are published as an empty array.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
enum ExpectedEntry {
    Values(ExpectedValues),
    Empty(Vec<serde_json::Value>),
}

#[derive(Debug, Deserialize)]
struct ExpectedFeed {
    #[serde(default)]
    time: Option<i64>,
    #[serde(default)]
    data: HashMap<String, ExpectedEntry>,
}

/// Table of expected values keyed by ship id.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExpectedTable {
    ships: HashMap<u64, ExpectedValues>,
    published_at: Option<DateTime<Utc>>,
}

impl ExpectedTable {
    /// Decode the published JSON feed.
    pub fn from_json(bytes: &[u8]) -> Result<Self, serde_json::Error> {
        let feed: ExpectedFeed = serde_json::from_slice(bytes)?;
        let ships = feed
            .data
            .into_iter()
            .filter_map(|(id, entry)| match entry {
                ExpectedEntry::Values(values) => id.parse().ok().map(|id| (id, values)),
                ExpectedEntry::Empty(_) => None,
            })
            .collect();
        let published_at = feed
            .time
            .and_then(|t| Utc.timestamp_opt(t, 0).single());

        Ok(Self {
            ships,
            published_at,
        })
    }

    pub fn insert(&mut self, ship_id: u64, values: ExpectedValues) {
        self.ships.insert(ship_id, values);
    }

    pub fn get(&self, ship_id: u64) -> Option<&ExpectedValues> {
        self.ships.get(&ship_id)
    }

    pub fn len(&self) -> usize {
        self.ships.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ships.is_empty()
    }

    /// When the feed was generated, if it said.
    pub fn published_at(&self) -> Option<DateTime<Utc>> {
        self.published_at
    }
}

/// Rating of a single ship, `None` if the ship does not qualify.
fn ship_rating(stats: &ShipStats, expected: &ExpectedValues) -> Option<f64> {
    if stats.battles == 0 || !expected.is_usable() {
        return None;
    }
    let battles = stats.battles as f64;

    let r_dmg = stats.damage_dealt / (expected.average_damage_dealt * battles);
    let r_wins = stats.wins as f64 * 100.0 / (expected.win_rate * battles);
    let r_frags = stats.frags as f64 / (expected.average_frags * battles);

    let n_dmg = f64::max(0.0, (r_dmg - 0.4) / 0.6);
    let n_frags = f64::max(0.0, (r_frags - 0.1) / 0.9);
    let n_wins = f64::max(0.0, (r_wins - 0.7) / 0.3);

    Some(700.0 * n_dmg + 300.0 * n_frags + 150.0 * n_wins)
}

/// Battle-weighted personal rating over all qualifying ships.
///
/// Returns `None` when no ship qualifies; callers show no rating color.
pub fn estimate<'a, I>(ships: I, table: &ExpectedTable) -> Option<f64>
where
    I: IntoIterator<Item = &'a ShipStats>,
{
    let mut weighted = 0.0;
    let mut battles = 0u64;

    for stats in ships {
        let Some(expected) = table.get(stats.ship_id) else {
            continue;
        };
        if let Some(rating) = ship_rating(stats, expected) {
            weighted += rating * stats.battles as f64;
            battles += stats.battles;
        }
    }

    if battles == 0 {
        None
    } else {
        Some(weighted / battles as f64)
    }
}
