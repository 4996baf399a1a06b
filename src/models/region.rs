//! Regional API servers.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// A regional server of the stats API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Region {
    #[default]
    Eu,
    Na,
    Asia,
    Ru,
}

impl Region {
    /// Every region, in the order tried by cross-region lookups.
    pub const ALL: [Region; 4] = [Region::Eu, Region::Na, Region::Asia, Region::Ru];

    /// Top-level domain of the regional API host. North America is served
    /// from `.com`; every other region uses its own code.
    pub fn api_tld(&self) -> &'static str {
        match self {
            Region::Eu => "eu",
            Region::Na => "com",
            Region::Asia => "asia",
            Region::Ru => "ru",
        }
    }

    /// Base URL of the regional stats API.
    pub fn api_base_url(&self) -> String {
        format!("https://api.worldofwarships.{}/wows/", self.api_tld())
    }

    /// Subdomain prefix for profile links on the public stats site.
    pub fn profile_prefix(&self) -> &'static str {
        match self {
            Region::Eu => "",
            Region::Na => "na.",
            Region::Asia => "asia.",
            Region::Ru => "ru.",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Region::Eu => "eu",
            Region::Na => "na",
            Region::Asia => "asia",
            Region::Ru => "ru",
        }
    }
}

impl std::fmt::Display for Region {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Region {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "eu" => Ok(Region::Eu),
            "na" | "com" => Ok(Region::Na),
            "asia" | "sea" => Ok(Region::Asia),
            "ru" => Ok(Region::Ru),
            other => Err(format!("unknown region: {}", other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_tld_mapping() {
        assert_eq!(Region::Na.api_tld(), "com");
        assert_eq!(Region::Eu.api_tld(), "eu");
        assert_eq!(Region::Asia.api_tld(), "asia");
    }

    #[test]
    fn test_api_base_url() {
        assert_eq!(
            Region::Na.api_base_url(),
            "https://api.worldofwarships.com/wows/"
        );
    }

    #[test]
    fn test_region_from_str() {
        assert_eq!("NA".parse::<Region>().unwrap(), Region::Na);
        assert_eq!("com".parse::<Region>().unwrap(), Region::Na);
        assert_eq!(" eu ".parse::<Region>().unwrap(), Region::Eu);
        assert!("mars".parse::<Region>().is_err());
    }

    #[test]
    fn test_region_serialization() {
        let json = serde_json::to_string(&Region::Asia).unwrap();
        assert_eq!(json, "\"asia\"");
        let parsed: Region = serde_json::from_str("\"ru\"").unwrap();
        assert_eq!(parsed, Region::Ru);
    }
}
