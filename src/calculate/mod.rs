//! Statistics calculation.
//!
//! Computes derived metrics from raw battle totals:
//! - Win rates and per-battle averages
//! - Output rounding policy for table cells
//! - Battle-weighted team averages

use crate::models::{Player, TeamAverage};
use crate::presentation::PresentationMapper;

/// Decimal places shown for win rates.
pub const WIN_RATE_DECIMALS: usize = 1;

/// Average damage is shown rounded to this step.
pub const DAMAGE_ROUNDING_STEP: f64 = 100.0;

/// Calculate win rate in percent.
pub fn win_rate(wins: u64, battles: u64) -> f64 {
    if battles == 0 {
        0.0
    } else {
        wins as f64 * 100.0 / battles as f64
    }
}

/// Calculate average damage per battle.
pub fn avg_damage(damage: f64, battles: u64) -> f64 {
    if battles == 0 {
        0.0
    } else {
        damage / battles as f64
    }
}

/// Round average damage to the display step.
pub fn round_damage(avg_damage: f64) -> f64 {
    (avg_damage / DAMAGE_ROUNDING_STEP).round() * DAMAGE_ROUNDING_STEP
}

pub fn format_win_rate(win_rate: f64) -> String {
    format!("{:.*}", WIN_RATE_DECIMALS, win_rate)
}

pub fn format_avg_damage(avg_damage: f64) -> String {
    format!("{:.0}", round_damage(avg_damage))
}

/// Accumulates battle-weighted sums for a team.
///
/// Numerator and denominator are summed together and divided once, so a
/// player with zero battles contributes nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct TeamAccumulator {
    win_rate_sum: f64,
    damage_sum: f64,
    battles: u64,
}

impl TeamAccumulator {
    pub fn add(&mut self, win_rate: f64, avg_damage: f64, battles: u64) {
        if battles == 0 {
            return;
        }
        self.win_rate_sum += win_rate * battles as f64;
        self.damage_sum += avg_damage * battles as f64;
        self.battles += battles;
    }

    /// Add a resolved player; hidden profiles are skipped.
    pub fn add_player(&mut self, player: &Player) {
        if player.hidden_profile {
            return;
        }
        self.add(player.win_rate, player.avg_damage, player.battles);
    }

    pub fn finish(&self, mapper: &PresentationMapper) -> TeamAverage {
        if self.battles == 0 {
            return TeamAverage::default();
        }
        let total = self.battles as f64;
        let win_rate = self.win_rate_sum / total;
        let avg_damage = self.damage_sum / total;

        TeamAverage {
            win_rate,
            avg_damage,
            win_rate_color: mapper.win_rate(win_rate),
            avg_damage_color: mapper.avg_damage(avg_damage),
            match_count: self.battles,
        }
    }
}

/// Team average over a roster.
pub fn team_average(players: &[Player], mapper: &PresentationMapper) -> TeamAverage {
    let mut acc = TeamAccumulator::default();
    for player in players {
        acc.add_player(player);
    }
    acc.finish(mapper)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Color, Region, SortKey, Team};

    fn player(hidden: bool, battles: u64, win_rate: f64, avg_damage: f64) -> Player {
        Player {
            account_id: Some(1),
            name: "P".to_string(),
            hidden_profile: hidden,
            team: Team::Ally,
            display_row: vec![],
            display_colors: vec![],
            sort_key: SortKey::default(),
            clan_tag: None,
            clan_color: None,
            background: None,
            region: Region::Eu,
            rating: None,
            battles,
            win_rate,
            avg_damage,
        }
    }

    #[test]
    fn test_win_rate() {
        assert_eq!(win_rate(6_000, 10_000), 60.0);
        assert_eq!(win_rate(0, 0), 0.0);
        assert_eq!(win_rate(5, 0), 0.0);
    }

    #[test]
    fn test_avg_damage() {
        assert_eq!(avg_damage(3_000_000.0, 10_000), 300.0);
        assert_eq!(avg_damage(1_000.0, 0), 0.0);
    }

    #[test]
    fn test_rounding_policy() {
        assert_eq!(format_win_rate(60.0), "60.0");
        assert_eq!(format_win_rate(55.555), "55.6");
        assert_eq!(format_avg_damage(300.0), "300");
        assert_eq!(format_avg_damage(45_649.0), "45600");
        assert_eq!(format_avg_damage(45_650.0), "45700");
    }

    #[test]
    fn test_team_average_ignores_zero_battle_player() {
        let mapper = PresentationMapper::default();
        let players = vec![player(false, 100, 60.0, 50_000.0), player(true, 0, 0.0, 0.0)];

        let avg = team_average(&players, &mapper);
        assert_eq!(avg.win_rate, 60.0);
        assert_eq!(avg.avg_damage, 50_000.0);
        assert_eq!(avg.match_count, 100);
    }

    #[test]
    fn test_team_average_weighted() {
        let mapper = PresentationMapper::default();
        let players = vec![
            player(false, 300, 60.0, 40_000.0),
            player(false, 100, 40.0, 20_000.0),
        ];

        let avg = team_average(&players, &mapper);
        assert!((avg.win_rate - 55.0).abs() < 1e-9);
        assert!((avg.avg_damage - 35_000.0).abs() < 1e-9);
        assert_eq!(avg.match_count, 400);
    }

    #[test]
    fn test_team_average_empty_team() {
        let mapper = PresentationMapper::default();
        let avg = team_average(&[player(true, 5_000, 70.0, 90_000.0)], &mapper);
        assert_eq!(avg.win_rate, 0.0);
        assert_eq!(avg.avg_damage_color, Color::GREY);
    }

    #[test]
    fn test_accumulator_public_zero_battles() {
        let mut acc = TeamAccumulator::default();
        acc.add(0.0, 0.0, 0);
        let avg = acc.finish(&PresentationMapper::default());
        assert_eq!(avg, TeamAverage::default());
    }
}
