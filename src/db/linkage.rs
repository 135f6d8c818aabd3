//! Linkage repository: one record per game account.
//!
//! Writes are compare-and-swap on `revision`. Two concurrent verifications of
//! the same account are not serialized; the loser sees
//! [`DbError::StaleRevision`] instead of silently overwriting.

use super::DbError;
use sqlx::SqlitePool;

/// Persisted link between a game account and (optionally) a chat identity.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct LinkageRecord {
    pub account_id: String,
    pub chat_identity_id: Option<String>,
    pub voted_in: bool,
    pub voted_out: bool,
    /// Optimistic-concurrency token, bumped on every update.
    pub revision: i64,
    pub created_at: i64,
    pub updated_at: i64,
}

impl LinkageRecord {
    /// A fresh, unsaved record with no voting overrides.
    pub fn new(account_id: impl Into<String>, chat_identity_id: Option<String>) -> Self {
        let now = chrono::Utc::now().timestamp();
        Self {
            account_id: account_id.into(),
            chat_identity_id,
            voted_in: false,
            voted_out: false,
            revision: 0,
            created_at: now,
            updated_at: now,
        }
    }
}

const COLUMNS: &str =
    "account_id, chat_identity_id, voted_in, voted_out, revision, created_at, updated_at";

/// Repository for linkage operations.
pub struct LinkageRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> LinkageRepository<'a> {
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// Find the linkage for a game account.
    pub async fn find_by_account(&self, account_id: &str) -> Result<Option<LinkageRecord>, DbError> {
        let record = sqlx::query_as::<_, LinkageRecord>(&format!(
            "SELECT {COLUMNS} FROM linkages WHERE account_id = ?"
        ))
        .bind(account_id)
        .fetch_optional(self.pool)
        .await?;
        Ok(record)
    }

    /// Find the most recently updated linkage naming a chat identity.
    pub async fn find_by_identity(&self, identity: &str) -> Result<Option<LinkageRecord>, DbError> {
        let record = sqlx::query_as::<_, LinkageRecord>(&format!(
            "SELECT {COLUMNS} FROM linkages WHERE chat_identity_id = ? \
             ORDER BY updated_at DESC LIMIT 1"
        ))
        .bind(identity)
        .fetch_optional(self.pool)
        .await?;
        Ok(record)
    }

    /// Every linkage naming a chat identity, oldest first.
    pub async fn holders_of(&self, identity: &str) -> Result<Vec<LinkageRecord>, DbError> {
        let records = sqlx::query_as::<_, LinkageRecord>(&format!(
            "SELECT {COLUMNS} FROM linkages WHERE chat_identity_id = ? \
             ORDER BY created_at, account_id"
        ))
        .bind(identity)
        .fetch_all(self.pool)
        .await?;
        Ok(records)
    }

    /// Insert a new linkage at revision 0.
    pub async fn insert(&self, record: &LinkageRecord) -> Result<LinkageRecord, DbError> {
        sqlx::query(
            r#"
            INSERT INTO linkages (account_id, chat_identity_id, voted_in, voted_out, revision, created_at, updated_at)
            VALUES (?, ?, ?, ?, 0, ?, ?)
            "#,
        )
        .bind(&record.account_id)
        .bind(&record.chat_identity_id)
        .bind(record.voted_in)
        .bind(record.voted_out)
        .bind(record.created_at)
        .bind(record.updated_at)
        .execute(self.pool)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(ref db_err) = e
                && db_err.is_unique_violation()
            {
                return DbError::LinkageExists(record.account_id.clone());
            }
            DbError::from(e)
        })?;

        Ok(LinkageRecord {
            revision: 0,
            ..record.clone()
        })
    }

    /// Write `record` if the stored revision still equals `record.revision`.
    ///
    /// Returns the stored record with its bumped revision.
    pub async fn update(&self, record: &LinkageRecord) -> Result<LinkageRecord, DbError> {
        let now = chrono::Utc::now().timestamp();
        let result = sqlx::query(
            r#"
            UPDATE linkages
            SET chat_identity_id = ?, voted_in = ?, voted_out = ?,
                revision = revision + 1, updated_at = ?
            WHERE account_id = ? AND revision = ?
            "#,
        )
        .bind(&record.chat_identity_id)
        .bind(record.voted_in)
        .bind(record.voted_out)
        .bind(now)
        .bind(&record.account_id)
        .bind(record.revision)
        .execute(self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::StaleRevision {
                account: record.account_id.clone(),
                expected: record.revision,
            });
        }

        Ok(LinkageRecord {
            revision: record.revision + 1,
            updated_at: now,
            ..record.clone()
        })
    }

    /// Delete every linkage naming a chat identity. Returns how many went.
    pub async fn delete_by_identity(&self, identity: &str) -> Result<u64, DbError> {
        let result = sqlx::query("DELETE FROM linkages WHERE chat_identity_id = ?")
            .bind(identity)
            .execute(self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    /// Every linkage that currently names a chat identity, oldest first.
    pub async fn list_linked(&self) -> Result<Vec<LinkageRecord>, DbError> {
        let records = sqlx::query_as::<_, LinkageRecord>(&format!(
            "SELECT {COLUMNS} FROM linkages WHERE chat_identity_id IS NOT NULL \
             ORDER BY created_at, account_id"
        ))
        .fetch_all(self.pool)
        .await?;
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use crate::db::{Database, DbError, LinkageRecord};

    #[tokio::test]
    async fn insert_and_find() {
        let db = Database::new(":memory:").await.unwrap();
        let repo = db.linkages();

        let record = LinkageRecord::new("uuid-a", Some("111".to_string()));
        repo.insert(&record).await.unwrap();

        let by_account = repo.find_by_account("uuid-a").await.unwrap().unwrap();
        assert_eq!(by_account.chat_identity_id.as_deref(), Some("111"));
        assert!(!by_account.voted_in && !by_account.voted_out);
        assert_eq!(by_account.revision, 0);

        let by_identity = repo.find_by_identity("111").await.unwrap().unwrap();
        assert_eq!(by_identity.account_id, "uuid-a");

        assert!(repo.find_by_account("uuid-b").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn duplicate_insert_is_rejected() {
        let db = Database::new(":memory:").await.unwrap();
        let repo = db.linkages();

        let record = LinkageRecord::new("uuid-a", None);
        repo.insert(&record).await.unwrap();

        assert!(matches!(
            repo.insert(&record).await,
            Err(DbError::LinkageExists(account)) if account == "uuid-a"
        ));
    }

    #[tokio::test]
    async fn update_bumps_revision() {
        let db = Database::new(":memory:").await.unwrap();
        let repo = db.linkages();

        let mut record = repo
            .insert(&LinkageRecord::new("uuid-a", Some("111".to_string())))
            .await
            .unwrap();
        record.chat_identity_id = Some("222".to_string());
        record.voted_out = true;

        let updated = repo.update(&record).await.unwrap();
        assert_eq!(updated.revision, 1);

        let stored = repo.find_by_account("uuid-a").await.unwrap().unwrap();
        assert_eq!(stored.revision, 1);
        assert_eq!(stored.chat_identity_id.as_deref(), Some("222"));
        assert!(stored.voted_out);
    }

    #[tokio::test]
    async fn stale_update_is_detected() {
        let db = Database::new(":memory:").await.unwrap();
        let repo = db.linkages();

        let original = repo
            .insert(&LinkageRecord::new("uuid-a", Some("111".to_string())))
            .await
            .unwrap();

        // Two writers read revision 0; only the first write lands.
        let mut first = original.clone();
        first.chat_identity_id = Some("222".to_string());
        let mut second = original;
        second.chat_identity_id = Some("333".to_string());

        repo.update(&first).await.unwrap();
        assert!(matches!(
            repo.update(&second).await,
            Err(DbError::StaleRevision { expected: 0, .. })
        ));

        let stored = repo.find_by_account("uuid-a").await.unwrap().unwrap();
        assert_eq!(stored.chat_identity_id.as_deref(), Some("222"));
    }

    #[tokio::test]
    async fn delete_and_list() {
        let db = Database::new(":memory:").await.unwrap();
        let repo = db.linkages();

        repo.insert(&LinkageRecord::new("uuid-a", Some("111".to_string())))
            .await
            .unwrap();
        repo.insert(&LinkageRecord::new("uuid-b", Some("222".to_string())))
            .await
            .unwrap();
        repo.insert(&LinkageRecord::new("uuid-c", None))
            .await
            .unwrap();

        let linked = repo.list_linked().await.unwrap();
        assert_eq!(linked.len(), 2);

        assert_eq!(repo.delete_by_identity("111").await.unwrap(), 1);
        assert_eq!(repo.delete_by_identity("111").await.unwrap(), 0);
        assert!(repo.find_by_account("uuid-a").await.unwrap().is_none());
        assert_eq!(repo.list_linked().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn holders_of_identity() {
        let db = Database::new(":memory:").await.unwrap();
        let repo = db.linkages();

        repo.insert(&LinkageRecord::new("uuid-a", Some("111".to_string())))
            .await
            .unwrap();
        repo.insert(&LinkageRecord::new("uuid-b", Some("222".to_string())))
            .await
            .unwrap();

        let holders = repo.holders_of("111").await.unwrap();
        assert_eq!(holders.len(), 1);
        assert_eq!(holders[0].account_id, "uuid-a");
        assert!(repo.holders_of("333").await.unwrap().is_empty());
    }
}
