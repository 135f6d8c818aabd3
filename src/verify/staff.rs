//! Staff operations: unverify, fix, refresh.

use super::{VerificationResult, Verifier, VerifyError, VerifyOptions};
use crate::audit::{AuditAction, AuditRecord};
use crate::providers::{MemberEdit, NicknameEdit};
use crate::telemetry::spans;
use rankgate_rules::roles::{strip_to_baseline, with_baseline};
use rankgate_rules::{RoleSet, account_name_from_display};
use tracing::{Instrument, info, warn};

/// Result of [`Verifier::unverify`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Unverified {
    /// Linkage records deleted.
    pub removed_linkages: u64,
    pub roles: RoleSet,
}

/// One member's outcome in [`Verifier::refresh_all`].
#[derive(Debug, Clone)]
pub struct RefreshOutcome {
    pub member: String,
    pub result: VerificationResult,
}

impl Verifier {
    /// Drop the member's linkage, strip them to the baseline roles they
    /// already hold and clear their nickname.
    pub async fn unverify(&self, member_id: &str, label: &str) -> Result<Unverified, VerifyError> {
        async {
            let snapshot = self.config.snapshot();
            let member = self.member(member_id).await?;

            let removed_linkages = self.db.linkages().delete_by_identity(member_id).await?;
            let roles = strip_to_baseline(&member.roles, &snapshot.baseline);
            let nickname = if member.manageable {
                NicknameEdit::Clear
            } else {
                NicknameEdit::Keep
            };

            self.services
                .members
                .edit_member(
                    member_id,
                    MemberEdit {
                        roles: roles.clone(),
                        nickname,
                        reason: Some(format!("unverified ({label})")),
                    },
                )
                .await?;
            self.services
                .audit
                .record(AuditRecord::new(
                    AuditAction::Unverify,
                    member_id,
                    label,
                    &member.roles,
                    &roles,
                ))
                .await;

            info!(removed_linkages, "Member unverified");
            Ok(Unverified {
                removed_linkages,
                roles,
            })
        }
        .instrument(spans::staff("unverify", member_id, label))
        .await
    }

    /// Give the member every baseline role, keeping everything else.
    pub async fn fix(&self, member_id: &str, label: &str) -> Result<RoleSet, VerifyError> {
        async {
            let snapshot = self.config.snapshot();
            let member = self.member(member_id).await?;
            let roles = with_baseline(&member.roles, &snapshot.baseline);

            self.services
                .members
                .edit_member(
                    member_id,
                    MemberEdit {
                        roles: roles.clone(),
                        nickname: NicknameEdit::Keep,
                        reason: Some(format!("fix ({label})")),
                    },
                )
                .await?;
            self.services
                .audit
                .record(AuditRecord::new(
                    AuditAction::Fix,
                    member_id,
                    label,
                    &member.roles,
                    &roles,
                ))
                .await;
            Ok(roles)
        }
        .instrument(spans::staff("fix", member_id, label))
        .await
    }

    /// Re-run a full verification for a member already verified.
    ///
    /// The account comes from the member's linkage; without one, the account
    /// name is read back out of the member's display name.
    pub async fn refresh(&self, member_id: &str, label: &str) -> VerificationResult {
        async {
            let accounts = &self.services.accounts;
            let account = match self.db.linkages().find_by_identity(member_id).await? {
                Some(record) => accounts
                    .resolve_id(&record.account_id)
                    .await?
                    .ok_or(VerifyError::InvalidAccountName)?,
                None => {
                    let member = self.member(member_id).await?;
                    let name = member
                        .display_name
                        .as_deref()
                        .and_then(account_name_from_display)
                        .ok_or_else(|| VerifyError::NotLinked(member_id.to_string()))?;
                    accounts
                        .resolve_name(&name)
                        .await?
                        .ok_or(VerifyError::InvalidAccountName)?
                }
            };
            self.verify_account(&account, member_id, &VerifyOptions::labelled(label))
                .await
        }
        .instrument(spans::staff("refresh", member_id, label))
        .await
    }

    /// Refresh each member in turn. One failure does not stop the batch.
    pub async fn refresh_all<I, S>(&self, member_ids: I, label: &str) -> Vec<RefreshOutcome>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut outcomes = Vec::new();
        for member in member_ids {
            let member = member.into();
            let result = self.refresh(&member, label).await;
            if let Err(e) = &result {
                warn!(member = %member, error = %e, "Refresh failed");
            }
            outcomes.push(RefreshOutcome { member, result });
        }
        outcomes
    }
}
