//! SQLite implementation of the account repository.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use narthex_core::{
    AccountId, AccountSecurityRecord, Error, NewAccount,
    error::{AuthError, StorageError},
    repositories::AccountRepository,
};
use sqlx::SqlitePool;

use crate::{SqliteAccount, to_counter, to_unix_ceil};

pub struct SqliteAccountRepository {
    pool: SqlitePool,
}

impl SqliteAccountRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

fn database_error(e: sqlx::Error, message: &str) -> Error {
    tracing::error!(error = %e, "{message}");
    Error::Storage(StorageError::Database(message.to_string()))
}

fn ensure_updated(rows_affected: u64, id: &AccountId) -> Result<(), Error> {
    if rows_affected == 0 {
        tracing::error!(account_id = %id, "Account vanished while updating security state");
        return Err(Error::Storage(StorageError::NotFound));
    }
    Ok(())
}

#[async_trait]
impl AccountRepository for SqliteAccountRepository {
    async fn create(
        &self,
        account: NewAccount,
        credential_hash: &str,
    ) -> Result<AccountSecurityRecord, Error> {
        let now = Utc::now().timestamp();

        let row = sqlx::query_as::<_, SqliteAccount>(
            r#"
            INSERT INTO accounts (
                id, document_type, document_number, first_name, last_name,
                email, role, credential_hash, created_at, updated_at
            )
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?9)
            RETURNING *
            "#,
        )
        .bind(account.id.as_str())
        .bind(&account.document_type)
        .bind(&account.document_number)
        .bind(&account.first_name)
        .bind(&account.last_name)
        .bind(&account.email)
        .bind(&account.role)
        .bind(credential_hash)
        .bind(now)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            if e.as_database_error()
                .is_some_and(|db| db.is_unique_violation())
            {
                return Error::Auth(AuthError::AccountAlreadyExists);
            }
            database_error(e, "Failed to create account")
        })?;

        row.try_into()
    }

    async fn find_by_id(&self, id: &AccountId) -> Result<Option<AccountSecurityRecord>, Error> {
        sqlx::query_as::<_, SqliteAccount>("SELECT * FROM accounts WHERE id = ?1")
            .bind(id.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| database_error(e, "Failed to find account"))?
            .map(AccountSecurityRecord::try_from)
            .transpose()
    }

    async fn find_by_document(
        &self,
        document_type: &str,
        document_number: &str,
    ) -> Result<Option<AccountSecurityRecord>, Error> {
        sqlx::query_as::<_, SqliteAccount>(
            "SELECT * FROM accounts WHERE document_type = ?1 AND document_number = ?2",
        )
        .bind(document_type)
        .bind(document_number)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| database_error(e, "Failed to find account by document"))?
        .map(AccountSecurityRecord::try_from)
        .transpose()
    }

    async fn update_security_state(
        &self,
        id: &AccountId,
        failed_attempts: u32,
        locked_until: Option<DateTime<Utc>>,
    ) -> Result<(), Error> {
        let result = sqlx::query(
            r#"
            UPDATE accounts
            SET failed_attempts = ?2, locked_until = ?3, updated_at = ?4
            WHERE id = ?1
            "#,
        )
        .bind(id.as_str())
        .bind(i64::from(failed_attempts))
        .bind(locked_until.map(to_unix_ceil))
        .bind(Utc::now().timestamp())
        .execute(&self.pool)
        .await
        .map_err(|e| database_error(e, "Failed to update security state"))?;

        ensure_updated(result.rows_affected(), id)
    }

    async fn release_expired_lock(
        &self,
        id: &AccountId,
        observed: DateTime<Utc>,
        reset_lock_count: bool,
    ) -> Result<bool, Error> {
        // Keyed on the expiry the caller read: a second releaser finds it gone.
        let result = sqlx::query(
            r#"
            UPDATE accounts
            SET failed_attempts = 0,
                locked_until = NULL,
                lock_count = CASE WHEN ?3 THEN 0 ELSE lock_count END,
                updated_at = ?4
            WHERE id = ?1 AND locked_until = ?2
            "#,
        )
        .bind(id.as_str())
        .bind(to_unix_ceil(observed))
        .bind(reset_lock_count)
        .bind(Utc::now().timestamp())
        .execute(&self.pool)
        .await
        .map_err(|e| database_error(e, "Failed to release expired lock"))?;

        Ok(result.rows_affected() > 0)
    }

    async fn record_failed_attempt(&self, id: &AccountId) -> Result<u32, Error> {
        // Single statement: concurrent callers each see their own increment.
        let failed_attempts: Option<i64> = sqlx::query_scalar(
            r#"
            UPDATE accounts
            SET failed_attempts = failed_attempts + 1, updated_at = ?2
            WHERE id = ?1
            RETURNING failed_attempts
            "#,
        )
        .bind(id.as_str())
        .bind(Utc::now().timestamp())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| database_error(e, "Failed to record failed attempt"))?;

        let Some(value) = failed_attempts else {
            tracing::error!(account_id = %id, "Account vanished while recording a failed attempt");
            return Err(Error::Storage(StorageError::NotFound));
        };
        to_counter(value)
    }

    async fn lock_account(
        &self,
        id: &AccountId,
        locked_until: DateTime<Utc>,
        lock_count: u32,
    ) -> Result<(), Error> {
        let result = sqlx::query(
            r#"
            UPDATE accounts
            SET locked_until = ?2, lock_count = ?3, updated_at = ?4
            WHERE id = ?1
            "#,
        )
        .bind(id.as_str())
        .bind(to_unix_ceil(locked_until))
        .bind(i64::from(lock_count))
        .bind(Utc::now().timestamp())
        .execute(&self.pool)
        .await
        .map_err(|e| database_error(e, "Failed to lock account"))?;

        ensure_updated(result.rows_affected(), id)
    }

    async fn clear_security_state(&self, id: &AccountId) -> Result<(), Error> {
        let result = sqlx::query(
            r#"
            UPDATE accounts
            SET failed_attempts = 0, locked_until = NULL, lock_count = 0, updated_at = ?2
            WHERE id = ?1
            "#,
        )
        .bind(id.as_str())
        .bind(Utc::now().timestamp())
        .execute(&self.pool)
        .await
        .map_err(|e| database_error(e, "Failed to clear security state"))?;

        ensure_updated(result.rows_affected(), id)
    }
}
