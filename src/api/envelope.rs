//! Typed response bodies of the stats API.
//!
//! Every field is optional; the API returns partial objects and `null`
//! entries for hidden or unknown ids. Conversions into model types fill
//! absent fields with defaults.

use std::collections::HashMap;

use serde::Deserialize;

use super::ApiError;
use crate::models::{AccountStats, ClanInfo, ShipClass, ShipMeta, ShipStats};

/// Error code and message signalling a rejected application id.
const INVALID_APPLICATION_ID: (i64, &str) = (407, "INVALID_APPLICATION_ID");

/// Response envelope shared by every endpoint.
#[derive(Debug, Deserialize)]
pub struct Envelope<T> {
    pub status: Option<String>,
    pub data: Option<T>,
    pub error: Option<ErrorBody>,
}

#[derive(Debug, Deserialize)]
pub struct ErrorBody {
    pub code: Option<i64>,
    pub message: Option<String>,
}

impl<T> Envelope<T> {
    /// Unwrap the payload, mapping error envelopes to `ApiError`.
    pub fn into_data(self) -> Result<Option<T>, ApiError> {
        if self.status.as_deref() != Some("error") {
            return Ok(self.data);
        }

        let error = self.error.unwrap_or(ErrorBody {
            code: None,
            message: None,
        });
        let code = error.code.unwrap_or_default();
        let message = error.message.unwrap_or_default();

        if (code, message.as_str()) == INVALID_APPLICATION_ID {
            return Err(ApiError::InvalidCredentials);
        }
        Err(ApiError::Rejected { code, message })
    }
}

/// Objects keyed by the requested id; values are `null` for unknown ids.
pub type ById<T> = HashMap<String, Option<T>>;

/// Pull one id out of a keyed payload.
pub fn take_by_id<T>(data: Option<ById<T>>, id: u64) -> Option<T> {
    data?.remove(&id.to_string()).flatten()
}

#[derive(Debug, Deserialize)]
pub struct AccountListEntry {
    pub account_id: Option<u64>,
    pub nickname: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct PvpTotals {
    pub battles: Option<u64>,
    pub wins: Option<u64>,
    pub damage_dealt: Option<f64>,
    pub frags: Option<u64>,
}

#[derive(Debug, Deserialize)]
pub struct Statistics {
    pub pvp: Option<PvpTotals>,
}

#[derive(Debug, Deserialize)]
pub struct AccountInfoEntry {
    pub hidden_profile: Option<bool>,
    pub statistics: Option<Statistics>,
}

impl From<AccountInfoEntry> for AccountStats {
    fn from(entry: AccountInfoEntry) -> Self {
        let pvp = entry
            .statistics
            .and_then(|s| s.pvp)
            .unwrap_or_default();
        AccountStats {
            hidden_profile: entry.hidden_profile.unwrap_or(false),
            battles: pvp.battles.unwrap_or(0),
            wins: pvp.wins.unwrap_or(0),
            damage_dealt: pvp.damage_dealt.unwrap_or(0.0),
            frags: pvp.frags.unwrap_or(0),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ShipStatsEntry {
    pub ship_id: Option<u64>,
    pub pvp: Option<PvpTotals>,
}

impl ShipStatsEntry {
    /// Entries without a ship id cannot be attributed and are dropped.
    pub fn into_stats(self) -> Option<ShipStats> {
        let ship_id = self.ship_id?;
        let pvp = self.pvp.unwrap_or_default();
        Some(ShipStats {
            ship_id,
            battles: pvp.battles.unwrap_or(0),
            wins: pvp.wins.unwrap_or(0),
            damage_dealt: pvp.damage_dealt.unwrap_or(0.0),
            frags: pvp.frags.unwrap_or(0),
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct ShipInfoEntry {
    pub name: Option<String>,
    pub tier: Option<u8>,
    #[serde(rename = "type")]
    pub ship_type: Option<String>,
    pub nation: Option<String>,
}

impl ShipInfoEntry {
    pub fn into_meta(self, ship_id: u64) -> ShipMeta {
        ShipMeta {
            ship_id,
            name: self.name.unwrap_or_else(|| "Error".to_string()),
            tier: self.tier.unwrap_or(0),
            ship_class: self.ship_type.as_deref().and_then(ShipClass::from_api),
            nation: self.nation.unwrap_or_default(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ClanMemberEntry {
    pub clan_id: Option<u64>,
}

#[derive(Debug, Deserialize)]
pub struct ClanInfoEntry {
    pub tag: Option<String>,
    pub name: Option<String>,
    pub members_count: Option<u32>,
}

impl ClanInfoEntry {
    pub fn into_clan(self, clan_id: u64) -> ClanInfo {
        ClanInfo {
            clan_id,
            tag: self.tag.unwrap_or_default(),
            name: self.name.unwrap_or_default(),
            members_count: self.members_count,
            // clans/info carries no rating league color
            color_rating: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ok_envelope() {
        let env: Envelope<Vec<AccountListEntry>> = serde_json::from_str(
            r#"{"status": "ok", "meta": {"count": 1}, "data": [{"account_id": 5, "nickname": "Bob"}]}"#,
        )
        .unwrap();
        let data = env.into_data().unwrap().unwrap();
        assert_eq!(data[0].account_id, Some(5));
    }

    #[test]
    fn test_invalid_application_id() {
        let env: Envelope<Vec<AccountListEntry>> = serde_json::from_str(
            r#"{"status": "error", "error": {"field": "application_id", "message": "INVALID_APPLICATION_ID", "code": 407, "value": "123"}}"#,
        )
        .unwrap();
        assert!(matches!(env.into_data(), Err(ApiError::InvalidCredentials)));
    }

    #[test]
    fn test_other_error_is_rejected() {
        let env: Envelope<Vec<AccountListEntry>> = serde_json::from_str(
            r#"{"status": "error", "error": {"message": "REQUEST_LIMIT_EXCEEDED", "code": 407}}"#,
        )
        .unwrap();
        match env.into_data() {
            Err(ApiError::Rejected { code, message }) => {
                assert_eq!(code, 407);
                assert_eq!(message, "REQUEST_LIMIT_EXCEEDED");
            }
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_error_without_body() {
        let env: Envelope<Vec<AccountListEntry>> =
            serde_json::from_str(r#"{"status": "error"}"#).unwrap();
        assert!(matches!(
            env.into_data(),
            Err(ApiError::Rejected { code: 0, .. })
        ));
    }

    #[test]
    fn test_account_info_partial() {
        let env: Envelope<ById<AccountInfoEntry>> = serde_json::from_str(
            r#"{"status": "ok", "data": {"10": {"hidden_profile": true, "statistics": null}}}"#,
        )
        .unwrap();
        let entry = take_by_id(env.into_data().unwrap(), 10).unwrap();
        let stats = AccountStats::from(entry);
        assert!(stats.hidden_profile);
        assert_eq!(stats.battles, 0);
    }

    #[test]
    fn test_null_entry_is_absent() {
        let env: Envelope<ById<ShipInfoEntry>> =
            serde_json::from_str(r#"{"status": "ok", "data": {"3": null}}"#).unwrap();
        assert!(take_by_id(env.into_data().unwrap(), 3).is_none());
    }

    #[test]
    fn test_ship_info_conversion() {
        let entry: ShipInfoEntry = serde_json::from_str(
            r#"{"name": "Yamato", "tier": 10, "type": "Battleship", "nation": "japan"}"#,
        )
        .unwrap();
        let meta = entry.into_meta(99);
        assert_eq!(meta.ship_id, 99);
        assert_eq!(meta.ship_class, Some(ShipClass::Battleship));
        assert_eq!(meta.tier, 10);
    }

    #[test]
    fn test_ship_stats_without_id_dropped() {
        let entry: ShipStatsEntry =
            serde_json::from_str(r#"{"pvp": {"battles": 3}}"#).unwrap();
        assert!(entry.into_stats().is_none());
    }

    #[test]
    fn test_clan_conversion() {
        let entry: ClanInfoEntry =
            serde_json::from_str(r##"{"tag": "ABC", "members_count": 40, "color": "#cda4ff"}"##)
                .unwrap();
        let clan = entry.into_clan(7);
        assert_eq!(clan.tag, "ABC");
        assert_eq!(clan.name, "");
        assert_eq!(clan.members_count, Some(40));
        assert_eq!(clan.color_rating, None);
    }
}
