//! In-memory stats provider for tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use super::{ApiError, StatsProvider};
use crate::models::{AccountIdentity, AccountStats, ClanInfo, Region, ShipMeta, ShipStats};

#[derive(Default)]
struct MockData {
    accounts: HashMap<(Region, String), u64>,
    account_stats: HashMap<u64, AccountStats>,
    ship_stats: HashMap<u64, HashMap<u64, ShipStats>>,
    ships: HashMap<u64, ShipMeta>,
    clan_members: HashMap<u64, u64>,
    clans: HashMap<u64, ClanInfo>,
    failing_accounts: Vec<u64>,
    validation_failure: Option<ApiError>,
}

/// Call counters shared by every region view of one mock.
#[derive(Default)]
pub struct MockCalls {
    pub validate: AtomicUsize,
    pub search: AtomicUsize,
    pub account_stats: AtomicUsize,
    pub ship_stats: AtomicUsize,
    pub ship_meta: AtomicUsize,
    pub clans: AtomicUsize,
}

/// Mock provider backed by shared maps.
///
/// Region views created with `with_region` share data and counters.
#[derive(Clone)]
pub struct MockProvider {
    region: Region,
    data: Arc<Mutex<MockData>>,
    calls: Arc<MockCalls>,
    reject_credentials: Arc<AtomicBool>,
}

impl Default for MockProvider {
    fn default() -> Self {
        Self::new(Region::Eu)
    }
}

impl MockProvider {
    pub fn new(region: Region) -> Self {
        Self {
            region,
            data: Arc::new(Mutex::new(MockData::default())),
            calls: Arc::new(MockCalls::default()),
            reject_credentials: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn calls(&self) -> &MockCalls {
        &self.calls
    }

    /// Make every request fail with `InvalidCredentials`.
    pub fn reject_credentials(&self, reject: bool) {
        self.reject_credentials.store(reject, Ordering::SeqCst);
    }

    pub fn add_account(&self, region: Region, name: &str, account_id: u64, stats: AccountStats) {
        let mut data = self.data.lock().unwrap();
        data.accounts.insert((region, name.to_string()), account_id);
        data.account_stats.insert(account_id, stats);
    }

    pub fn add_ship_stats(&self, account_id: u64, stats: ShipStats) {
        self.data
            .lock()
            .unwrap()
            .ship_stats
            .entry(account_id)
            .or_default()
            .insert(stats.ship_id, stats);
    }

    pub fn add_ship(&self, meta: ShipMeta) {
        self.data.lock().unwrap().ships.insert(meta.ship_id, meta);
    }

    pub fn add_clan(&self, account_id: u64, clan: ClanInfo) {
        let mut data = self.data.lock().unwrap();
        data.clan_members.insert(account_id, clan.clan_id);
        data.clans.insert(clan.clan_id, clan);
    }

    /// Make the account stats call for this account time out.
    pub fn fail_account(&self, account_id: u64) {
        self.data.lock().unwrap().failing_accounts.push(account_id);
    }

    /// Make `validate_credentials` fail with `error` until cleared.
    pub fn fail_validation(&self, error: Option<ApiError>) {
        self.data.lock().unwrap().validation_failure = error;
    }

    fn check(&self) -> Result<(), ApiError> {
        if self.reject_credentials.load(Ordering::SeqCst) {
            Err(ApiError::InvalidCredentials)
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl StatsProvider for MockProvider {
    fn name(&self) -> &'static str {
        "mock"
    }

    fn region(&self) -> Region {
        self.region
    }

    fn with_region(&self, region: Region) -> Result<Arc<dyn StatsProvider>, ApiError> {
        Ok(Arc::new(Self {
            region,
            ..self.clone()
        }))
    }

    async fn validate_credentials(&self) -> Result<(), ApiError> {
        self.calls.validate.fetch_add(1, Ordering::SeqCst);
        self.check()?;
        match self.data.lock().unwrap().validation_failure.clone() {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    async fn search_account(&self, name: &str) -> Result<Option<AccountIdentity>, ApiError> {
        self.calls.search.fetch_add(1, Ordering::SeqCst);
        self.check()?;
        let data = self.data.lock().unwrap();
        Ok(data
            .accounts
            .get(&(self.region, name.to_string()))
            .map(|&account_id| AccountIdentity {
                account_id,
                region: self.region,
            }))
    }

    async fn account_stats(&self, account_id: u64) -> Result<Option<AccountStats>, ApiError> {
        self.calls.account_stats.fetch_add(1, Ordering::SeqCst);
        self.check()?;
        let data = self.data.lock().unwrap();
        if data.failing_accounts.contains(&account_id) {
            return Err(ApiError::TransientNetwork("operation timed out".to_string()));
        }
        Ok(data.account_stats.get(&account_id).copied())
    }

    async fn ship_stats(
        &self,
        account_id: u64,
        ship_id: Option<u64>,
    ) -> Result<HashMap<u64, ShipStats>, ApiError> {
        self.calls.ship_stats.fetch_add(1, Ordering::SeqCst);
        self.check()?;
        let data = self.data.lock().unwrap();
        let all = data.ship_stats.get(&account_id).cloned().unwrap_or_default();
        Ok(match ship_id {
            Some(id) => all.into_iter().filter(|(k, _)| *k == id).collect(),
            None => all,
        })
    }

    async fn ship_meta(&self, ship_id: u64) -> Result<Option<ShipMeta>, ApiError> {
        self.calls.ship_meta.fetch_add(1, Ordering::SeqCst);
        self.check()?;
        Ok(self.data.lock().unwrap().ships.get(&ship_id).cloned())
    }

    async fn clan_for_account(&self, account_id: u64) -> Result<Option<u64>, ApiError> {
        self.calls.clans.fetch_add(1, Ordering::SeqCst);
        self.check()?;
        Ok(self.data.lock().unwrap().clan_members.get(&account_id).copied())
    }

    async fn clan_details(&self, clan_id: u64) -> Result<Option<ClanInfo>, ApiError> {
        self.check()?;
        Ok(self.data.lock().unwrap().clans.get(&clan_id).cloned())
    }
}
