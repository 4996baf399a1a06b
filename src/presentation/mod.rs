//! Threshold tables mapping statistics to display colors.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::models::Color;

/// Background alpha used for personal rating rows.
const RATING_ALPHA: u8 = 50;

/// An ordered list of `(lower bound, color)` pairs, highest bound first.
#[derive(Debug, Clone, PartialEq)]
pub struct ThresholdTable {
    steps: Vec<(f64, Color)>,
    floor: Color,
}

impl ThresholdTable {
    /// Build a table. Steps are sorted by descending bound.
    pub fn new(mut steps: Vec<(f64, Color)>, floor: Color) -> Self {
        steps.sort_by(|a, b| b.0.total_cmp(&a.0));
        Self { steps, floor }
    }

    /// First color whose bound the value meets or exceeds, else the floor.
    pub fn lookup(&self, value: f64) -> Color {
        self.steps
            .iter()
            .find(|(bound, _)| value >= *bound)
            .map(|(_, color)| *color)
            .unwrap_or(self.floor)
    }

    pub fn win_rate() -> Self {
        Self::new(
            vec![
                (65.0, Color::PURPLE),
                (60.0, Color::PINK),
                (56.0, Color::CYAN),
                (54.0, Color::DARK_GREEN),
                (52.0, Color::LIGHT_GREEN),
                (49.0, Color::YELLOW),
                (47.0, Color::ORANGE),
            ],
            Color::RED,
        )
    }

    pub fn battles() -> Self {
        Self::new(
            vec![
                (20_000.0, Color::PURPLE),
                (14_000.0, Color::CYAN),
                (9_000.0, Color::LIGHT_GREEN),
                (5_000.0, Color::YELLOW),
                (2_000.0, Color::ORANGE),
            ],
            Color::RED,
        )
    }

    pub fn avg_damage() -> Self {
        Self::new(
            vec![
                (48_500.0, Color::PINK),
                (38_000.0, Color::CYAN),
                (33_000.0, Color::LIGHT_GREEN),
                (22_000.0, Color::YELLOW),
                (16_000.0, Color::ORANGE),
            ],
            Color::RED,
        )
    }

    pub fn personal_rating() -> Self {
        Self::new(
            vec![
                (2450.0, Color::PURPLE.with_alpha(RATING_ALPHA)),
                (2100.0, Color::PINK.with_alpha(RATING_ALPHA)),
                (1750.0, Color::CYAN.with_alpha(75)),
                (1550.0, Color::DARK_GREEN.with_alpha(RATING_ALPHA)),
                (1350.0, Color::LIGHT_GREEN.with_alpha(RATING_ALPHA)),
                (1100.0, Color::YELLOW.with_alpha(RATING_ALPHA)),
                (750.0, Color::ORANGE.with_alpha(RATING_ALPHA)),
            ],
            Color::RED.with_alpha(RATING_ALPHA),
        )
    }
}

/// One limit entry from the per-ship damage feed.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DamageLimit {
    pub value: f64,
}

/// Per-ship average damage limits, five ascending values per ship.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ShipDamageLimits {
    ships: HashMap<String, Vec<DamageLimit>>,
}

/// Colors assigned between consecutive per-ship limits, worst first.
const SHIP_DAMAGE_COLORS: [Color; 6] = [
    Color::RED,
    Color::ORANGE,
    Color::YELLOW,
    Color::LIGHT_GREEN,
    Color::CYAN,
    Color::PINK,
];

impl ShipDamageLimits {
    pub fn insert(&mut self, ship_id: u64, limits: Vec<f64>) {
        self.ships.insert(
            ship_id.to_string(),
            limits.into_iter().map(|value| DamageLimit { value }).collect(),
        );
    }

    pub fn len(&self) -> usize {
        self.ships.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ships.is_empty()
    }

    /// Color for a ship's average damage, `None` when the ship has no entry.
    pub fn lookup(&self, ship_id: u64, avg_damage: f64) -> Option<Color> {
        let limits = self.ships.get(&ship_id.to_string())?;
        if limits.is_empty() {
            return None;
        }
        let idx = limits
            .iter()
            .take(SHIP_DAMAGE_COLORS.len() - 1)
            .position(|limit| avg_damage < limit.value)
            .unwrap_or(limits.len().min(SHIP_DAMAGE_COLORS.len() - 1));
        Some(SHIP_DAMAGE_COLORS[idx])
    }
}

/// Maps numeric stats to display colors.
#[derive(Debug, Clone)]
pub struct PresentationMapper {
    win_rate: ThresholdTable,
    battles: ThresholdTable,
    avg_damage: ThresholdTable,
    rating: ThresholdTable,
    ship_damage: ShipDamageLimits,
}

impl Default for PresentationMapper {
    fn default() -> Self {
        Self {
            win_rate: ThresholdTable::win_rate(),
            battles: ThresholdTable::battles(),
            avg_damage: ThresholdTable::avg_damage(),
            rating: ThresholdTable::personal_rating(),
            ship_damage: ShipDamageLimits::default(),
        }
    }
}

impl PresentationMapper {
    /// Mapper using a per-ship damage table from the external feed.
    pub fn with_ship_damage(ship_damage: ShipDamageLimits) -> Self {
        Self {
            ship_damage,
            ..Self::default()
        }
    }

    pub fn win_rate(&self, win_rate: f64) -> Color {
        self.win_rate.lookup(win_rate)
    }

    pub fn battles(&self, battles: u64) -> Color {
        self.battles.lookup(battles as f64)
    }

    pub fn avg_damage(&self, avg_damage: f64) -> Color {
        self.avg_damage.lookup(avg_damage)
    }

    /// Row background for a personal rating.
    pub fn rating(&self, rating: f64) -> Color {
        self.rating.lookup(rating)
    }

    /// Ship win rate color; neutral when the ship has never been played.
    pub fn ship_win_rate(&self, win_rate: f64, ship_battles: u64) -> Color {
        if ship_battles == 0 {
            return Color::DARK_GREY;
        }
        self.win_rate(win_rate)
    }

    /// Ship average damage color; neutral when unplayed or not in the table.
    pub fn ship_avg_damage(&self, ship_id: u64, avg_damage: f64, ship_battles: u64) -> Color {
        if ship_battles == 0 {
            return Color::DARK_GREY;
        }
        self.ship_damage
            .lookup(ship_id, avg_damage)
            .unwrap_or(Color::DARK_GREY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_win_rate_thresholds() {
        let mapper = PresentationMapper::default();
        assert_eq!(mapper.win_rate(70.0), Color::PURPLE);
        assert_eq!(mapper.win_rate(65.0), Color::PURPLE);
        assert_eq!(mapper.win_rate(60.0), Color::PINK);
        assert_eq!(mapper.win_rate(53.0), Color::LIGHT_GREEN);
        assert_eq!(mapper.win_rate(47.0), Color::ORANGE);
        assert_eq!(mapper.win_rate(10.0), Color::RED);
    }

    #[test]
    fn test_battles_thresholds() {
        let mapper = PresentationMapper::default();
        assert_eq!(mapper.battles(25_000), Color::PURPLE);
        assert_eq!(mapper.battles(10_000), Color::LIGHT_GREEN);
        assert_eq!(mapper.battles(0), Color::RED);
    }

    #[test]
    fn test_avg_damage_thresholds() {
        let mapper = PresentationMapper::default();
        assert_eq!(mapper.avg_damage(50_000.0), Color::PINK);
        assert_eq!(mapper.avg_damage(33_000.0), Color::LIGHT_GREEN);
        assert_eq!(mapper.avg_damage(300.0), Color::RED);
    }

    #[test]
    fn test_rating_background_is_translucent() {
        let mapper = PresentationMapper::default();
        let c = mapper.rating(2500.0);
        assert_eq!(c, Color::PURPLE.with_alpha(50));
        assert_eq!(mapper.rating(1800.0).a, 75);
        assert_eq!(mapper.rating(0.0), Color::RED.with_alpha(50));
    }

    #[test]
    fn test_table_sorts_unordered_steps() {
        let table = ThresholdTable::new(vec![(1.0, Color::RED), (5.0, Color::CYAN)], Color::GREY);
        assert_eq!(table.lookup(6.0), Color::CYAN);
        assert_eq!(table.lookup(2.0), Color::RED);
        assert_eq!(table.lookup(0.5), Color::GREY);
    }

    #[test]
    fn test_ship_damage_limits() {
        let mut limits = ShipDamageLimits::default();
        limits.insert(42, vec![10_000.0, 20_000.0, 30_000.0, 40_000.0, 50_000.0]);
        let mapper = PresentationMapper::with_ship_damage(limits);

        assert_eq!(mapper.ship_avg_damage(42, 5_000.0, 10), Color::RED);
        assert_eq!(mapper.ship_avg_damage(42, 25_000.0, 10), Color::YELLOW);
        assert_eq!(mapper.ship_avg_damage(42, 45_000.0, 10), Color::CYAN);
        assert_eq!(mapper.ship_avg_damage(42, 60_000.0, 10), Color::PINK);
    }

    #[test]
    fn test_ship_damage_unknown_ship_is_neutral() {
        let mapper = PresentationMapper::default();
        assert_eq!(mapper.ship_avg_damage(7, 99_000.0, 10), Color::DARK_GREY);
    }

    #[test]
    fn test_ship_stats_without_battles_are_neutral() {
        let mut limits = ShipDamageLimits::default();
        limits.insert(42, vec![1.0, 2.0, 3.0, 4.0, 5.0]);
        let mapper = PresentationMapper::with_ship_damage(limits);
        assert_eq!(mapper.ship_avg_damage(42, 0.0, 0), Color::DARK_GREY);
        assert_eq!(mapper.ship_win_rate(0.0, 0), Color::DARK_GREY);
    }

    #[test]
    fn test_ship_damage_feed_decoding() {
        let json = r#"{"42": [{"value": 100}, {"value": 200}, {"value": 300}, {"value": 400}, {"value": 500}]}"#;
        let limits: ShipDamageLimits = serde_json::from_str(json).unwrap();
        assert_eq!(limits.len(), 1);
        assert_eq!(limits.lookup(42, 250.0), Some(Color::YELLOW));
        assert_eq!(limits.lookup(43, 250.0), None);
    }
}
