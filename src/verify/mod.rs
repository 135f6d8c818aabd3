//! Verification orchestrator.
//!
//! `verify` walks one member through:
//!
//! ```text
//! resolve account → [stats: linked-handle check] → link → [stats: profiles → evaluate]
//!     → reconcile roles → format nickname → apply (one write) → audit
//! ```
//!
//! Manual mode skips both bracketed stats steps and reconciles with a
//! caller-supplied level and no badges. Every failure is returned as a
//! [`VerifyError`]; nothing is retried.

mod staff;

pub use staff::{RefreshOutcome, Unverified};

use crate::audit::{AuditAction, AuditRecord, AuditSink, TracingAuditSink};
use crate::config::{ConfigHandle, ConfigSnapshot, ProvidersConfig};
use crate::db::{Database, LinkageRecord};
use crate::linkage::{LinkError, Linked, Linker};
use crate::providers::{
    AccountResolver, CosmeticSource, DiscordMembers, HypixelStats, Member, MemberDirectory,
    MemberEdit, MojangResolver, NicknameEdit, NoCosmetics, PlayerAccount, ProviderError,
    StatsProvider,
};
use crate::telemetry::{OperationTimer, spans};
use rankgate_rules::stats::{newest_profile, profile_by_name};
use rankgate_rules::{
    Eligibility, RoleSet, StatSnapshot, VotingOverride, evaluate, format_nickname,
    reconcile_for_level,
};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{Instrument, debug, info, warn};

/// Highest level a manual verification may assign.
pub const MAX_MANUAL_LEVEL: u32 = 60;

/// Why a verification (or staff operation) did not complete.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VerifyError {
    #[error("no account with that name")]
    InvalidAccountName,
    #[error("external service error: {0}")]
    ExternalApi(String),
    #[error("account has no linked chat handle")]
    NoLinkedChatHandle,
    #[error("account is linked to chat handle {actual}")]
    ChatHandleMismatch { actual: String },
    #[error("account is already linked to member {other}")]
    LinkageConflict { other: String },
    #[error("no profile with that name")]
    InvalidProfileName,
    #[error("manual verification requires a level")]
    MissingLevelOverride,
    #[error("level {0} is outside 0..={MAX_MANUAL_LEVEL}")]
    InvalidLevelOverride(u32),
    #[error("member {0} is not on the platform")]
    UnknownMember(String),
    #[error("member {0} has no linkage and no parseable display name")]
    NotLinked(String),
    #[error("linkage for {account} changed concurrently (expected revision {expected})")]
    ConcurrentModification { account: String, expected: i64 },
}

impl From<ProviderError> for VerifyError {
    fn from(err: ProviderError) -> Self {
        VerifyError::ExternalApi(err.to_string())
    }
}

impl From<crate::db::DbError> for VerifyError {
    fn from(err: crate::db::DbError) -> Self {
        LinkError::from(err).into()
    }
}

impl From<LinkError> for VerifyError {
    fn from(err: LinkError) -> Self {
        match err {
            LinkError::Conflict { other } => VerifyError::LinkageConflict { other },
            LinkError::Concurrent { account, expected } => {
                VerifyError::ConcurrentModification { account, expected }
            }
            LinkError::Store(e) => VerifyError::ExternalApi(e.to_string()),
            LinkError::Provider(e) => e.into(),
        }
    }
}

/// Caller-selected behaviour for one verification.
#[derive(Debug, Clone, Default)]
pub struct VerifyOptions {
    /// Level to assign in manual mode.
    pub level_override: Option<u32>,
    /// Evaluate this profile instead of the most recently saved one.
    pub profile_name: Option<String>,
    /// Skip the linked-chat-handle check.
    pub bypass_account_link_check: bool,
    /// Manual mode: no stats fetch, no badges.
    pub bypass_stats: bool,
    /// Reassign a linkage held by another member still on the platform.
    pub allow_linkage_override: bool,
    /// Recorded with the audit entry.
    pub audit_label: String,
}

impl VerifyOptions {
    pub fn labelled(label: impl Into<String>) -> Self {
        Self {
            audit_label: label.into(),
            ..Self::default()
        }
    }
}

/// A completed verification.
#[derive(Debug, Clone)]
pub struct Verified {
    pub account: PlayerAccount,
    pub level: u32,
    /// `None` in manual mode.
    pub stats: Option<StatSnapshot>,
    pub eligibility: Eligibility,
    pub roles: RoleSet,
    /// `None` when the member's nickname could not be changed.
    pub nickname: Option<String>,
    /// Linkage as written; `revision` identifies this write.
    pub linkage: LinkageRecord,
    /// Member displaced through the linkage override.
    pub displaced: Option<String>,
}

pub type VerificationResult = Result<Verified, VerifyError>;

/// The external services a [`Verifier`] talks to.
#[derive(Clone)]
pub struct Collaborators {
    pub accounts: Arc<dyn AccountResolver>,
    pub stats: Arc<dyn StatsProvider>,
    pub members: Arc<dyn MemberDirectory>,
    pub cosmetics: Arc<dyn CosmeticSource>,
    pub audit: Arc<dyn AuditSink>,
}

impl Collaborators {
    /// The shipped HTTP clients, audited through tracing.
    pub fn from_config(config: &ProvidersConfig) -> Result<Self, ProviderError> {
        let timeout = Duration::from_secs(config.timeout_secs);
        let token = config
            .chat_token
            .clone()
            .ok_or(ProviderError::NotConfigured("providers.chat_token"))?;
        let guild = config
            .guild_id
            .clone()
            .ok_or(ProviderError::NotConfigured("providers.guild_id"))?;
        Ok(Self {
            accounts: Arc::new(MojangResolver::new(
                &config.account_url,
                &config.session_url,
                timeout,
            )?),
            stats: Arc::new(HypixelStats::new(
                &config.stats_url,
                config.stats_api_key.clone(),
                timeout,
            )?),
            members: Arc::new(DiscordMembers::new(&config.chat_url, token, guild, timeout)?),
            cosmetics: Arc::new(NoCosmetics),
            audit: Arc::new(TracingAuditSink),
        })
    }
}

/// Runs verifications and staff operations against one store and set of
/// collaborators.
///
/// Calls for the same account are not serialized; a lost race surfaces as
/// [`VerifyError::ConcurrentModification`].
#[derive(Clone)]
pub struct Verifier {
    config: ConfigHandle,
    db: Database,
    services: Collaborators,
}

impl Verifier {
    pub fn new(config: ConfigHandle, db: Database, services: Collaborators) -> Self {
        Self {
            config,
            db,
            services,
        }
    }

    pub fn config(&self) -> &ConfigHandle {
        &self.config
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    /// Verify `member_id` as the owner of the account named `name`.
    pub async fn verify(&self, name: &str, member_id: &str, options: &VerifyOptions) -> VerificationResult {
        let span = spans::verification(name, member_id, &options.audit_label);
        async {
            let account = self
                .services
                .accounts
                .resolve_name(name)
                .await?
                .ok_or(VerifyError::InvalidAccountName)?;
            self.verify_account(&account, member_id, options).await
        }
        .instrument(span)
        .await
    }

    /// Verify against an already resolved account.
    pub async fn verify_account(
        &self,
        account: &PlayerAccount,
        member_id: &str,
        options: &VerifyOptions,
    ) -> VerificationResult {
        let _timer = OperationTimer::new("verify");
        let snapshot = self.config.snapshot();
        debug!(config_version = snapshot.version, account = %account.id, "Verifying");

        let member = self.member(member_id).await?;
        let marks = voting_marks(&snapshot, &member);

        if options.bypass_stats {
            return self
                .verify_manual(&snapshot, account, &member, marks, options)
                .await;
        }

        let player = self.services.stats.player(&account.id).await?;
        if !options.bypass_account_link_check {
            let handle = player
                .linked_chat_handle
                .ok_or(VerifyError::NoLinkedChatHandle)?;
            if handle != member.tag {
                return Err(VerifyError::ChatHandleMismatch { actual: handle });
            }
        }

        let linked = self.link(&snapshot, account, &member, marks, options).await?;
        let stats = self
            .stat_snapshot(&account.id, player.secrets, options.profile_name.as_deref())
            .await?;

        let level = snapshot.levels.whole_level(stats.xp);
        let voting = VotingOverride {
            voted_in: linked.record.voted_in,
            voted_out: linked.record.voted_out,
        };
        let eligibility = evaluate(level, &stats, &snapshot.config.requirements, voting);
        debug!(level, ?eligibility, "Eligibility evaluated");

        self.apply(
            &snapshot,
            account,
            &member,
            linked,
            level,
            Some(stats),
            eligibility,
            options,
        )
        .await
    }

    async fn verify_manual(
        &self,
        snapshot: &ConfigSnapshot,
        account: &PlayerAccount,
        member: &Member,
        marks: VotingOverride,
        options: &VerifyOptions,
    ) -> VerificationResult {
        let level = options
            .level_override
            .ok_or(VerifyError::MissingLevelOverride)?;
        if level > MAX_MANUAL_LEVEL {
            return Err(VerifyError::InvalidLevelOverride(level));
        }
        let linked = self.link(snapshot, account, member, marks, options).await?;
        self.apply(
            snapshot,
            account,
            member,
            linked,
            level,
            None,
            Eligibility::default(),
            options,
        )
        .await
    }

    pub(crate) async fn member(&self, member_id: &str) -> Result<Member, VerifyError> {
        self.services
            .members
            .fetch_member(member_id)
            .await?
            .ok_or_else(|| VerifyError::UnknownMember(member_id.to_string()))
    }

    async fn link(
        &self,
        snapshot: &ConfigSnapshot,
        account: &PlayerAccount,
        member: &Member,
        marks: VotingOverride,
        options: &VerifyOptions,
    ) -> Result<Linked, VerifyError> {
        let linker = Linker {
            db: &self.db,
            members: self.services.members.as_ref(),
            audit: self.services.audit.as_ref(),
            baseline: &snapshot.baseline,
            label: &options.audit_label,
        };
        Ok(linker
            .link_marking(&account.id, &member.id, options.allow_linkage_override, marks)
            .await?)
    }

    /// Snapshot from the requested (or newest) profile. An account without
    /// a profile collection gets the empty snapshot.
    async fn stat_snapshot(
        &self,
        account_id: &str,
        secrets: u64,
        profile_name: Option<&str>,
    ) -> Result<StatSnapshot, VerifyError> {
        let profiles = match self.services.stats.profiles(account_id).await {
            Ok(profiles) => profiles,
            Err(ProviderError::NoProfileCollection) => {
                info!(account = %account_id, "No profile collection; using empty snapshot");
                return Ok(StatSnapshot::empty(secrets));
            }
            Err(e) => return Err(e.into()),
        };

        let profile = match profile_name {
            Some(_) if profiles.is_empty() => None,
            Some(name) => Some(profile_by_name(&profiles, name).ok_or(VerifyError::InvalidProfileName)?),
            None => newest_profile(&profiles),
        };
        Ok(match profile {
            Some(profile) => StatSnapshot::from_profile(profile, secrets),
            None => StatSnapshot::empty(secrets),
        })
    }

    /// Reconcile, format and write; then audit.
    #[allow(clippy::too_many_arguments)]
    async fn apply(
        &self,
        snapshot: &ConfigSnapshot,
        account: &PlayerAccount,
        member: &Member,
        linked: Linked,
        level: u32,
        stats: Option<StatSnapshot>,
        eligibility: Eligibility,
        options: &VerifyOptions,
    ) -> VerificationResult {
        let roles = reconcile_for_level(&member.roles, &eligibility, level, &snapshot.plan);

        let nickname = if member.manageable {
            let suffix = self.services.cosmetics.suffix(member).await?;
            Some(format_nickname(
                level,
                &account.name,
                &suffix,
                &snapshot.config.symbols,
                &roles,
            ))
        } else {
            warn!(member = %member.id, "Member nickname is not manageable");
            None
        };

        self.services
            .members
            .edit_member(
                &member.id,
                MemberEdit {
                    roles: roles.clone(),
                    nickname: nickname.clone().map_or(NicknameEdit::Keep, NicknameEdit::Set),
                    reason: Some(options.audit_label.clone()),
                },
            )
            .await?;

        let action = if stats.is_some() {
            AuditAction::Verify
        } else {
            AuditAction::ManualVerify
        };
        let mut record = AuditRecord::new(action, &member.id, &options.audit_label, &member.roles, &roles);
        record.account = Some(account.id.clone());
        record.level = Some(level);
        record.stats = stats.clone();
        record.nickname = nickname.clone();
        self.services.audit.record(record).await;

        info!(account = %account.name, member = %member.id, level, "Member verified");
        Ok(Verified {
            account: account.clone(),
            level,
            stats,
            eligibility,
            roles,
            nickname,
            linkage: linked.record,
            displaced: linked.displaced,
        })
    }
}

/// Voting flags the member's current roles call for.
fn voting_marks(snapshot: &ConfigSnapshot, member: &Member) -> VotingOverride {
    let holds = |role: &Option<rankgate_rules::RoleId>| {
        role.as_ref().is_some_and(|role| member.roles.contains(role))
    };
    VotingOverride {
        voted_in: holds(&snapshot.config.roles.plus_request),
        voted_out: holds(&snapshot.config.roles.voted_out),
    }
}
