//! SQLite storage backend for narthex.
//!
//! Timestamps are stored as unix seconds in `INTEGER` columns and converted
//! to `DateTime<Utc>` on the way out.
//!
//! ```rust,no_run
//! use narthex_storage_sqlite::SqliteStorage;
//! use narthex_core::RepositoryProvider;
//!
//! # async fn example() -> Result<(), narthex_core::Error> {
//! let provider = SqliteStorage::connect("sqlite://narthex.db")
//!     .await?
//!     .into_repository_provider();
//! provider.migrate().await?;
//! # Ok(())
//! # }
//! ```

pub mod migrations;
pub mod repositories;

use std::str::FromStr;

use chrono::{DateTime, Utc};
use narthex_core::{
    Account, AccountId, AccountSecurityRecord, Error, error::StorageError,
};
use sqlx::SqlitePool;
use sqlx::sqlite::SqliteConnectOptions;

pub use migrations::SqliteMigrationManager;
pub use repositories::{SqliteAccountRepository, SqliteRepositoryProvider};

/// A connected SQLite database.
pub struct SqliteStorage {
    pool: SqlitePool,
}

impl SqliteStorage {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Open (creating if needed) the database at `url`.
    pub async fn connect(url: &str) -> Result<Self, Error> {
        let options = SqliteConnectOptions::from_str(url)
            .map_err(|e| {
                tracing::error!(error = %e, "Invalid SQLite connection URL");
                StorageError::Connection("Invalid SQLite connection URL".to_string())
            })?
            .create_if_missing(true);

        let pool = SqlitePool::connect_with(options).await.map_err(|e| {
            tracing::error!(error = %e, "Failed to connect to SQLite");
            StorageError::Connection("Failed to connect to SQLite".to_string())
        })?;

        Ok(Self { pool })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub fn into_repository_provider(self) -> SqliteRepositoryProvider {
        SqliteRepositoryProvider::new(self.pool)
    }
}

/// Row shape of the `accounts` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct SqliteAccount {
    pub id: String,
    pub document_type: String,
    pub document_number: String,
    pub first_name: String,
    pub last_name: String,
    pub email: Option<String>,
    pub role: Option<String>,
    pub account_active: bool,
    pub profile_active: bool,
    pub credential_hash: String,
    pub failed_attempts: i64,
    pub locked_until: Option<i64>,
    pub lock_count: i64,
    pub created_at: i64,
    pub updated_at: i64,
}

impl TryFrom<SqliteAccount> for AccountSecurityRecord {
    type Error = Error;

    fn try_from(row: SqliteAccount) -> Result<Self, Self::Error> {
        Ok(AccountSecurityRecord {
            account: Account {
                id: AccountId::new(&row.id),
                document_type: row.document_type,
                document_number: row.document_number,
                first_name: row.first_name,
                last_name: row.last_name,
                email: row.email,
                role: row.role,
                account_active: row.account_active,
                profile_active: row.profile_active,
                created_at: from_unix(row.created_at)?,
                updated_at: from_unix(row.updated_at)?,
            },
            credential_hash: row.credential_hash,
            failed_attempts: to_counter(row.failed_attempts)?,
            locked_until: row.locked_until.map(from_unix).transpose()?,
            lock_count: to_counter(row.lock_count)?,
        })
    }
}

pub(crate) fn from_unix(seconds: i64) -> Result<DateTime<Utc>, Error> {
    DateTime::from_timestamp(seconds, 0).ok_or_else(|| {
        tracing::error!(timestamp = seconds, "Timestamp out of range");
        Error::Storage(StorageError::Database("Invalid timestamp".to_string()))
    })
}

/// Unix seconds, rounded up so a stored lock never ends earlier than asked.
pub(crate) fn to_unix_ceil(at: DateTime<Utc>) -> i64 {
    narthex_core::clock::ceil_to_second(at).timestamp()
}

pub(crate) fn to_counter(value: i64) -> Result<u32, Error> {
    u32::try_from(value).map_err(|_| {
        tracing::error!(value, "Counter out of range");
        Error::Storage(StorageError::Database("Invalid counter value".to_string()))
    })
}
