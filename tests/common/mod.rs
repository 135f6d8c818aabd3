//! Shared test infrastructure: in-memory providers and a verifier wired to
//! them.

#![allow(dead_code)]

use async_trait::async_trait;
use parking_lot::Mutex;
use rankgate::audit::{AuditRecord, AuditSink};
use rankgate::config::{Config, ConfigHandle};
use rankgate::db::Database;
use rankgate::providers::{
    AccountResolver, Member, MemberDirectory, MemberEdit, NicknameEdit, NoCosmetics,
    PlayerAccount, PlayerRecord, ProviderError, StatsProvider,
};
use rankgate::verify::{Collaborators, Verifier};
use rankgate_rules::{BestTimes, GameProfile, LevelTable, RoleId, RoleSet};
use std::collections::HashMap;
use std::sync::Arc;

pub const EXAMPLE_CONFIG: &str = include_str!("../../config.example.toml");

pub const MEMBER_ROLE: &str = "800000000000000001";
pub const BASELINE: [&str; 2] = ["800000000000000002", "800000000000000003"];
pub const VOTED_OUT_ROLE: &str = "800000000000000004";
pub const PLUS_REQUEST_ROLE: &str = "800000000000000005";
pub const TOP_PLUS_ROLE: &str = "820000000000000001";
pub const TOP_NORMAL_ROLE: &str = "820000000000000002";
pub const TOP_MINUS_ROLE: &str = "820000000000000003";
pub const SPEED_ROLE: &str = "820000000000000004";
pub const SECRET_ROLE: &str = "820000000000000005";
pub const STAR_SYMBOL_ROLE: &str = "830000000000000001";
pub const SWORD_SYMBOL_ROLE: &str = "830000000000000002";

/// Role id for a level bucket or exact level.
pub fn level_role(level: u32) -> RoleId {
    RoleId::new(format!("81000000000000{level:04}"))
}

pub fn roles(ids: &[&str]) -> RoleSet {
    ids.iter().map(|id| RoleId::from(*id)).collect()
}

pub fn badge_roles() -> RoleSet {
    roles(&[TOP_PLUS_ROLE, TOP_NORMAL_ROLE, TOP_MINUS_ROLE, SPEED_ROLE, SECRET_ROLE])
}

/// XP that lands exactly on `level` with the built-in table.
pub fn xp_for(level: u32) -> f64 {
    LevelTable::catacombs().xp_for_level(level as f64)
}

pub fn profile(name: &str, last_save: i64, level: u32, times: BestTimes) -> GameProfile {
    GameProfile {
        name: name.to_string(),
        last_save: Some(last_save),
        xp: xp_for(level),
        blood_mob_kills: 0,
        best_times: times,
    }
}

#[derive(Default)]
pub struct FakeAccounts {
    accounts: Mutex<Vec<PlayerAccount>>,
}

impl FakeAccounts {
    pub fn add(&self, id: &str, name: &str) -> PlayerAccount {
        let account = PlayerAccount {
            id: id.to_string(),
            name: name.to_string(),
        };
        self.accounts.lock().push(account.clone());
        account
    }
}

#[async_trait]
impl AccountResolver for FakeAccounts {
    async fn resolve_name(&self, name: &str) -> Result<Option<PlayerAccount>, ProviderError> {
        Ok(self
            .accounts
            .lock()
            .iter()
            .find(|a| a.name.eq_ignore_ascii_case(name))
            .cloned())
    }

    async fn resolve_id(&self, id: &str) -> Result<Option<PlayerAccount>, ProviderError> {
        Ok(self.accounts.lock().iter().find(|a| a.id == id).cloned())
    }
}

#[derive(Default)]
pub struct FakeStats {
    players: Mutex<HashMap<String, PlayerRecord>>,
    /// `None` = no profile collection.
    profiles: Mutex<HashMap<String, Option<Vec<GameProfile>>>>,
    pub fail: Mutex<bool>,
}

impl FakeStats {
    pub fn set_player(&self, id: &str, handle: Option<&str>, secrets: u64) {
        self.players.lock().insert(
            id.to_string(),
            PlayerRecord {
                linked_chat_handle: handle.map(str::to_string),
                secrets,
            },
        );
    }

    pub fn set_profiles(&self, id: &str, profiles: Option<Vec<GameProfile>>) {
        self.profiles.lock().insert(id.to_string(), profiles);
    }
}

#[async_trait]
impl StatsProvider for FakeStats {
    async fn player(&self, account_id: &str) -> Result<PlayerRecord, ProviderError> {
        if *self.fail.lock() {
            return Err(ProviderError::Status {
                service: "stats provider",
                status: 503,
            });
        }
        Ok(self
            .players
            .lock()
            .get(account_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn profiles(&self, account_id: &str) -> Result<Vec<GameProfile>, ProviderError> {
        match self.profiles.lock().get(account_id) {
            Some(Some(profiles)) => Ok(profiles.clone()),
            Some(None) | None => Err(ProviderError::NoProfileCollection),
        }
    }
}

#[derive(Default)]
pub struct FakeMembers {
    members: Mutex<HashMap<String, Member>>,
    edits: Mutex<Vec<(String, MemberEdit)>>,
}

impl FakeMembers {
    pub fn add(&self, id: &str, tag: &str, roles: RoleSet) {
        self.members.lock().insert(
            id.to_string(),
            Member {
                id: id.to_string(),
                tag: tag.to_string(),
                roles,
                display_name: None,
                manageable: true,
            },
        );
    }

    pub fn remove(&self, id: &str) {
        self.members.lock().remove(id);
    }

    pub fn set_display_name(&self, id: &str, name: &str) {
        if let Some(member) = self.members.lock().get_mut(id) {
            member.display_name = Some(name.to_string());
        }
    }

    pub fn set_manageable(&self, id: &str, manageable: bool) {
        if let Some(member) = self.members.lock().get_mut(id) {
            member.manageable = manageable;
        }
    }

    pub fn grant(&self, id: &str, role: &str) {
        if let Some(member) = self.members.lock().get_mut(id) {
            member.roles.insert(RoleId::from(role));
        }
    }

    pub fn revoke(&self, id: &str, role: &str) {
        if let Some(member) = self.members.lock().get_mut(id) {
            member.roles.remove(&RoleId::from(role));
        }
    }

    pub fn get(&self, id: &str) -> Member {
        self.members.lock()[id].clone()
    }

    pub fn edit_count(&self) -> usize {
        self.edits.lock().len()
    }

    pub fn last_edit(&self) -> Option<(String, MemberEdit)> {
        self.edits.lock().last().cloned()
    }
}

#[async_trait]
impl MemberDirectory for FakeMembers {
    async fn fetch_member(&self, id: &str) -> Result<Option<Member>, ProviderError> {
        Ok(self.members.lock().get(id).cloned())
    }

    async fn edit_member(&self, id: &str, edit: MemberEdit) -> Result<(), ProviderError> {
        let mut members = self.members.lock();
        let Some(member) = members.get_mut(id) else {
            return Err(ProviderError::Status {
                service: "chat platform",
                status: 404,
            });
        };
        member.roles = edit.roles.clone();
        match &edit.nickname {
            NicknameEdit::Keep => {}
            NicknameEdit::Clear => member.display_name = None,
            NicknameEdit::Set(nick) => member.display_name = Some(nick.clone()),
        }
        self.edits.lock().push((id.to_string(), edit));
        Ok(())
    }
}

#[derive(Default)]
pub struct RecordingAudit {
    pub records: Mutex<Vec<AuditRecord>>,
}

#[async_trait]
impl AuditSink for RecordingAudit {
    async fn record(&self, record: AuditRecord) {
        self.records.lock().push(record);
    }
}

/// A verifier over an in-memory store and fake providers.
pub struct TestHarness {
    pub verifier: Verifier,
    pub config: ConfigHandle,
    pub db: Database,
    pub accounts: Arc<FakeAccounts>,
    pub stats: Arc<FakeStats>,
    pub members: Arc<FakeMembers>,
    pub audit: Arc<RecordingAudit>,
}

impl TestHarness {
    pub async fn new() -> Self {
        let mut config = Config::from_toml(EXAMPLE_CONFIG).expect("example config parses");
        config.database.path = ":memory:".to_string();
        let config = ConfigHandle::new(config).expect("example config is valid");
        let db = Database::new(":memory:").await.expect("in-memory database");

        let accounts = Arc::new(FakeAccounts::default());
        let stats = Arc::new(FakeStats::default());
        let members = Arc::new(FakeMembers::default());
        let audit = Arc::new(RecordingAudit::default());
        let services = Collaborators {
            accounts: accounts.clone(),
            stats: stats.clone(),
            members: members.clone(),
            cosmetics: Arc::new(NoCosmetics),
            audit: audit.clone(),
        };

        Self {
            verifier: Verifier::new(config.clone(), db.clone(), services),
            config,
            db,
            accounts,
            stats,
            members,
            audit,
        }
    }

    /// Account "Steve" whose declared handle is "steve", plus member "100"
    /// with tag "steve" holding one foreign role.
    pub fn steve(&self) -> PlayerAccount {
        self.members.add("100", "steve", roles(&["900"]));
        self.stats.set_player("steve-uuid", Some("steve"), 0);
        self.accounts.add("steve-uuid", "Steve")
    }
}
