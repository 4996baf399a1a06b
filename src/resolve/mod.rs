//! Player resolution.
//!
//! Turns one raw vehicle from the match file into a display-ready
//! [`Player`]. Every remote lookup may fail independently; only rejected
//! credentials abort, everything else degrades to defaults for that player.

use std::collections::HashMap;

use thiserror::Error;
use tracing::{debug, warn};

use crate::api::{ApiError, StatsProvider};
use crate::calculate;
use crate::models::{
    AccountStats, ClanInfo, Color, ModeRules, Player, RawVehicle, ShipMeta, ShipStats, SortKey,
};
use crate::presentation::PresentationMapper;
use crate::rating::{self, ExpectedTable};

/// Ship column text when the ship could not be looked up.
pub const UNKNOWN_SHIP: &str = "Error";

/// Errors that abort resolution of the whole match.
#[derive(Debug, Error)]
pub enum ResolveError {
    #[error(transparent)]
    Fatal(ApiError),
}

/// Keep a branch's value, or fall back to its default unless the error is fatal.
fn settle<T: Default>(what: &str, name: &str, result: Result<T, ApiError>) -> Result<T, ResolveError> {
    match result {
        Ok(value) => Ok(value),
        Err(e) if e.is_fatal() => Err(ResolveError::Fatal(e)),
        Err(e) => {
            warn!("{} for {} unavailable: {}", what, name, e);
            Ok(T::default())
        }
    }
}

/// Resolves players of one team against one provider.
pub struct PlayerResolver<'a> {
    provider: &'a dyn StatsProvider,
    rules: ModeRules,
    expected: Option<&'a ExpectedTable>,
    mapper: &'a PresentationMapper,
    show_rating: bool,
}

/// Results of the per-player fan-out.
struct Lookups {
    account: Option<AccountStats>,
    ship: Option<ShipMeta>,
    ship_stats: Option<ShipStats>,
    all_ships: HashMap<u64, ShipStats>,
    clan: Option<ClanInfo>,
}

impl<'a> PlayerResolver<'a> {
    pub fn new(
        provider: &'a dyn StatsProvider,
        rules: ModeRules,
        expected: Option<&'a ExpectedTable>,
        mapper: &'a PresentationMapper,
    ) -> Self {
        Self {
            provider,
            rules,
            expected,
            mapper,
            show_rating: false,
        }
    }

    /// Append the personal rating as a trailing column.
    pub fn with_rating_column(mut self, show: bool) -> Self {
        self.show_rating = show;
        self
    }

    /// Resolve one vehicle into a player.
    pub async fn resolve(&self, vehicle: &RawVehicle) -> Result<Player, ResolveError> {
        if self.rules.excludes(vehicle) {
            debug!("Skipping lookups for {}", vehicle.name);
            let ship = self.ship_meta(vehicle).await?;
            return Ok(self.minimal(vehicle, None, ship.as_ref()));
        }

        let identity = settle(
            "Account",
            &vehicle.name,
            self.provider.search_account(&vehicle.name).await,
        )?;
        let Some(identity) = identity else {
            debug!("No account found for {}", vehicle.name);
            let ship = self.ship_meta(vehicle).await?;
            return Ok(self.minimal(vehicle, None, ship.as_ref()));
        };

        let lookups = self.fan_out(vehicle, identity.account_id).await?;
        Ok(self.reduce(vehicle, identity.account_id, lookups))
    }

    async fn ship_meta(&self, vehicle: &RawVehicle) -> Result<Option<ShipMeta>, ResolveError> {
        settle(
            "Ship",
            &vehicle.name,
            self.provider.ship_meta(vehicle.ship_id).await,
        )
    }

    async fn clan(&self, account_id: u64) -> Result<Option<ClanInfo>, ApiError> {
        if self.rules.suppress_clan_tags {
            return Ok(None);
        }
        match self.provider.clan_for_account(account_id).await? {
            Some(clan_id) => self.provider.clan_details(clan_id).await,
            None => Ok(None),
        }
    }

    async fn all_ship_stats(&self, account_id: u64) -> Result<HashMap<u64, ShipStats>, ApiError> {
        if self.expected.is_none() {
            return Ok(HashMap::new());
        }
        self.provider.ship_stats(account_id, None).await
    }

    async fn fan_out(&self, vehicle: &RawVehicle, account_id: u64) -> Result<Lookups, ResolveError> {
        let name = vehicle.name.as_str();
        let (account, ship, ship_stats, all_ships, clan) = tokio::join!(
            self.provider.account_stats(account_id),
            self.provider.ship_meta(vehicle.ship_id),
            self.provider.ship_stats(account_id, Some(vehicle.ship_id)),
            self.all_ship_stats(account_id),
            self.clan(account_id),
        );

        Ok(Lookups {
            account: settle("Account stats", name, account)?,
            ship: settle("Ship", name, ship)?,
            ship_stats: settle("Ship stats", name, ship_stats)?.remove(&vehicle.ship_id),
            all_ships: settle("Ship totals", name, all_ships)?,
            clan: settle("Clan", name, clan)?,
        })
    }

    /// Player with only name and ship.
    fn minimal(&self, vehicle: &RawVehicle, account_id: Option<u64>, ship: Option<&ShipMeta>) -> Player {
        Player {
            account_id,
            name: vehicle.name.clone(),
            hidden_profile: true,
            team: vehicle.relation.team(),
            display_row: vec![vehicle.name.clone(), ship_name(ship)],
            display_colors: vec![None, None],
            sort_key: SortKey::for_ship(ship),
            clan_tag: None,
            clan_color: None,
            background: None,
            region: self.provider.region(),
            rating: None,
            battles: 0,
            win_rate: 0.0,
            avg_damage: 0.0,
        }
    }

    fn reduce(&self, vehicle: &RawVehicle, account_id: u64, lookups: Lookups) -> Player {
        let mut player = self.minimal(vehicle, Some(account_id), lookups.ship.as_ref());

        if let Some(clan) = &lookups.clan {
            player.clan_tag = Some(clan.tag.clone());
            player.clan_color = clan.color_rating;
        }

        // No stats at all is shown the same way as a hidden profile
        let Some(account) = lookups.account.filter(|a| !a.hidden_profile) else {
            return player;
        };

        player.hidden_profile = false;
        player.battles = account.battles;
        player.win_rate = account.win_rate();
        player.avg_damage = account.avg_damage();

        let mapper = self.mapper;
        let mut push = |text: String, color: Option<Color>| {
            player.display_row.push(text);
            player.display_colors.push(color);
        };

        push(account.battles.to_string(), Some(mapper.battles(account.battles)));
        push(
            calculate::format_win_rate(account.win_rate()),
            Some(mapper.win_rate(account.win_rate())),
        );
        push(
            calculate::format_avg_damage(account.avg_damage()),
            Some(mapper.avg_damage(account.avg_damage())),
        );

        let ship = lookups.ship_stats.unwrap_or(ShipStats {
            ship_id: vehicle.ship_id,
            ..ShipStats::default()
        });
        push(ship.battles.to_string(), None);
        push(
            calculate::format_win_rate(ship.win_rate()),
            Some(mapper.ship_win_rate(ship.win_rate(), ship.battles)),
        );
        push(
            calculate::format_avg_damage(ship.avg_damage()),
            Some(mapper.ship_avg_damage(ship.ship_id, ship.avg_damage(), ship.battles)),
        );

        let rating = self
            .expected
            .and_then(|table| rating::estimate(lookups.all_ships.values(), table));

        if self.show_rating {
            match rating {
                Some(pr) => push(format!("{:.0}", pr), Some(mapper.rating(pr).with_alpha(255))),
                None => push("-".to_string(), None),
            }
        }

        player.rating = rating;
        player.background = rating.map(|pr| mapper.rating(pr));
        player
    }
}

fn ship_name(ship: Option<&ShipMeta>) -> String {
    ship.map(|s| s.display_name().to_string())
        .unwrap_or_else(|| UNKNOWN_SHIP.to_string())
}
