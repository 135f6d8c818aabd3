//! Audit records for role and nickname changes.

use async_trait::async_trait;
use rankgate_rules::{RoleId, RoleSet, StatSnapshot};
use tracing::info;
use uuid::Uuid;

/// What kind of change an audit record describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuditAction {
    Verify,
    ManualVerify,
    Unverify,
    Fix,
    ConflictReset,
}

impl AuditAction {
    pub fn as_str(self) -> &'static str {
        match self {
            AuditAction::Verify => "verify",
            AuditAction::ManualVerify => "manual_verify",
            AuditAction::Unverify => "unverify",
            AuditAction::Fix => "fix",
            AuditAction::ConflictReset => "conflict_reset",
        }
    }
}

/// One applied change to a member.
#[derive(Debug, Clone)]
pub struct AuditRecord {
    pub id: Uuid,
    pub action: AuditAction,
    pub member: String,
    pub account: Option<String>,
    pub level: Option<u32>,
    pub stats: Option<StatSnapshot>,
    pub added: Vec<RoleId>,
    pub removed: Vec<RoleId>,
    pub nickname: Option<String>,
    /// Caller-supplied tag identifying where the change came from.
    pub label: String,
}

impl AuditRecord {
    pub fn new(action: AuditAction, member: &str, label: &str, before: &RoleSet, after: &RoleSet) -> Self {
        Self {
            id: Uuid::new_v4(),
            action,
            member: member.to_string(),
            account: None,
            level: None,
            stats: None,
            added: after.difference(before).cloned().collect(),
            removed: before.difference(after).cloned().collect(),
            nickname: None,
            label: label.to_string(),
        }
    }
}

#[async_trait]
pub trait AuditSink: Send + Sync {
    async fn record(&self, record: AuditRecord);
}

/// Writes each record as one structured event on target `rankgate::audit`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingAuditSink;

fn join(roles: &[RoleId]) -> String {
    roles
        .iter()
        .map(RoleId::as_str)
        .collect::<Vec<_>>()
        .join(",")
}

#[async_trait]
impl AuditSink for TracingAuditSink {
    async fn record(&self, record: AuditRecord) {
        let stats = record.stats.as_ref();
        info!(
            target: "rankgate::audit",
            id = %record.id,
            action = record.action.as_str(),
            member = %record.member,
            account = record.account.as_deref().unwrap_or("-"),
            level = record.level,
            secrets = stats.map(|s| s.secrets),
            blood_mob_kills = stats.map(|s| s.blood_mob_kills),
            best_five = stats.and_then(|s| s.best_times.five),
            best_six = stats.and_then(|s| s.best_times.six),
            best_seven = stats.and_then(|s| s.best_times.seven),
            added = %join(&record.added),
            removed = %join(&record.removed),
            nickname = record.nickname.as_deref().unwrap_or("-"),
            label = %record.label,
            "Member updated"
        );
    }
}
