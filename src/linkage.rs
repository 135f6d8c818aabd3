//! Account ↔ chat identity linkage with conflict resolution.
//!
//! At most one linkage may name a chat identity. The store does not enforce
//! this; [`Linker::link`] does, by checking whether a previously linked
//! identity still resolves before handing the account to a new one, and by
//! releasing the identity from any other account that held it.

use crate::audit::{AuditAction, AuditRecord, AuditSink};
use crate::db::{Database, DbError, LinkageRecord};
use crate::providers::{MemberDirectory, MemberEdit, NicknameEdit, ProviderError};
use rankgate_rules::{RoleSet, VotingOverride};
use thiserror::Error;
use tracing::{info, warn};

#[derive(Debug, Error)]
pub enum LinkError {
    /// The account is linked to another identity that is still present.
    #[error("account is linked to member {other}")]
    Conflict { other: String },
    #[error("linkage for {account} was modified concurrently (expected revision {expected})")]
    Concurrent { account: String, expected: i64 },
    #[error(transparent)]
    Store(DbError),
    #[error(transparent)]
    Provider(#[from] ProviderError),
}

impl From<DbError> for LinkError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::StaleRevision { account, expected } => LinkError::Concurrent { account, expected },
            // Someone created the record between our read and insert.
            DbError::LinkageExists(account) => LinkError::Concurrent {
                account,
                expected: 0,
            },
            other => LinkError::Store(other),
        }
    }
}

/// Result of a successful link.
#[derive(Debug, Clone)]
pub struct Linked {
    pub record: LinkageRecord,
    /// Previous identity reset to baseline through the override path.
    pub displaced: Option<String>,
}

/// Links accounts to identities against one store and member directory.
pub struct Linker<'a> {
    pub db: &'a Database,
    pub members: &'a dyn MemberDirectory,
    pub audit: &'a dyn AuditSink,
    /// Roles a displaced identity is reset to.
    pub baseline: &'a RoleSet,
    pub label: &'a str,
}

impl Linker<'_> {
    /// Link `account_id` to `identity`.
    ///
    /// A different identity that is still present blocks the link unless
    /// `allow_override` is set, in which case it is reset to the baseline
    /// roles with its nickname cleared. An identity that has left the
    /// platform is replaced silently. Any other account holding `identity`
    /// loses it.
    pub async fn link(
        &self,
        account_id: &str,
        identity: &str,
        allow_override: bool,
    ) -> Result<Linked, LinkError> {
        self.link_marking(account_id, identity, allow_override, VotingOverride::default())
            .await
    }

    /// [`link`](Self::link), also setting any voting flag that is true in
    /// `marks`. Flags already set on the record are never cleared.
    pub async fn link_marking(
        &self,
        account_id: &str,
        identity: &str,
        allow_override: bool,
        marks: VotingOverride,
    ) -> Result<Linked, LinkError> {
        let repo = self.db.linkages();
        let existing = repo.find_by_account(account_id).await?;

        let mut displaced = None;
        if let Some(other) = existing.as_ref().and_then(|r| r.chat_identity_id.clone())
            && other != identity
        {
            match self.members.fetch_member(&other).await? {
                Some(_) if !allow_override => {
                    return Err(LinkError::Conflict { other });
                }
                Some(member) => {
                    self.reset_to_baseline(&other, member.manageable, &member.roles)
                        .await?;
                    displaced = Some(other);
                }
                None => {
                    info!(account = %account_id, previous = %other, "Previous member left; relinking");
                }
            }
        }

        self.release_identity(account_id, identity).await?;

        let Some(mut record) = existing else {
            let mut record = LinkageRecord::new(account_id, Some(identity.to_string()));
            record.voted_in = marks.voted_in;
            record.voted_out = marks.voted_out;
            let record = repo.insert(&record).await?;
            info!(account = %account_id, member = %identity, "Linkage created");
            return Ok(Linked { record, displaced });
        };

        record.chat_identity_id = Some(identity.to_string());
        record.voted_in |= marks.voted_in;
        record.voted_out |= marks.voted_out;
        let record = repo.update(&record).await?;

        Ok(Linked { record, displaced })
    }

    /// Detach `identity` from every record other than `account_id`'s.
    ///
    /// The detached records keep their voting flags.
    async fn release_identity(&self, account_id: &str, identity: &str) -> Result<(), LinkError> {
        let repo = self.db.linkages();
        for mut holder in repo.holders_of(identity).await? {
            if holder.account_id == account_id {
                continue;
            }
            holder.chat_identity_id = None;
            repo.update(&holder).await?;
            info!(account = %holder.account_id, member = %identity, "Member moved to another account; previous linkage released");
        }
        Ok(())
    }

    async fn reset_to_baseline(
        &self,
        other: &str,
        manageable: bool,
        current: &RoleSet,
    ) -> Result<(), LinkError> {
        if !manageable {
            warn!(member = %other, "Displaced member is not manageable; leaving roles in place");
            return Ok(());
        }
        self.members
            .edit_member(
                other,
                MemberEdit {
                    roles: self.baseline.clone(),
                    nickname: NicknameEdit::Clear,
                    reason: Some(format!("linkage override ({})", self.label)),
                },
            )
            .await?;
        self.audit
            .record(AuditRecord::new(
                AuditAction::ConflictReset,
                other,
                self.label,
                current,
                self.baseline,
            ))
            .await;
        info!(member = %other, "Displaced member reset to baseline");
        Ok(())
    }
}
