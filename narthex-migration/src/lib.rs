//! Schema migrations for narthex storage backends.
//!
//! Each backend defines its migrations as [`Migration`] implementations and
//! applies them through its own [`MigrationManager`]. Applied versions are
//! tracked in the `_narthex_migrations` table.

use async_trait::async_trait;
use sqlx::Database;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum MigrationError {
    #[error("Duplicate migration version {version}: {first} and {second}")]
    DuplicateVersion {
        version: i64,
        first: String,
        second: String,
    },
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl From<MigrationError> for narthex_core::Error {
    fn from(err: MigrationError) -> Self {
        narthex_core::Error::Storage(narthex_core::error::StorageError::Migration(
            err.to_string(),
        ))
    }
}

pub type Result<T> = std::result::Result<T, MigrationError>;

#[async_trait]
pub trait Migration<DB: Database>: Send + Sync {
    /// Execute the migration
    async fn up<'a>(&'a self, conn: &'a mut <DB as Database>::Connection) -> Result<()>;

    /// Rollback the migration
    async fn down<'a>(&'a self, conn: &'a mut <DB as Database>::Connection) -> Result<()>;

    /// Unique version number for ordering migrations
    fn version(&self) -> i64;

    /// Human readable name of the migration
    fn name(&self) -> &str;
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct MigrationRecord {
    pub version: i64,
    pub name: String,
    pub applied_at: i64, // unix seconds, same as every other timestamp in the schema
}

#[async_trait]
pub trait MigrationManager<DB: Database>: Send + Sync {
    fn get_migration_table_name(&self) -> &str {
        "_narthex_migrations"
    }

    /// Initialize migration tracking table
    async fn initialize(&self) -> Result<()>;

    /// Apply pending migrations
    async fn up(&self, migrations: &[Box<dyn Migration<DB>>]) -> Result<()>;

    /// Rollback migrations
    async fn down(&self, migrations: &[Box<dyn Migration<DB>>]) -> Result<()>;

    /// Get list of applied migrations
    async fn get_applied_migrations(&self) -> Result<Vec<MigrationRecord>>;

    /// Check if specific migration was applied
    async fn is_applied(&self, version: i64) -> Result<bool>;
}

/// Order migrations by version, rejecting duplicate versions.
///
/// Managers call this before applying anything so that a misnumbered
/// migration fails the whole run instead of being skipped as "applied".
pub fn ordered<DB: Database>(
    migrations: &[Box<dyn Migration<DB>>],
) -> Result<Vec<&dyn Migration<DB>>> {
    let mut sorted: Vec<&dyn Migration<DB>> = migrations.iter().map(|m| m.as_ref()).collect();
    sorted.sort_by_key(|m| m.version());

    for pair in sorted.windows(2) {
        if pair[0].version() == pair[1].version() {
            return Err(MigrationError::DuplicateVersion {
                version: pair[0].version(),
                first: pair[0].name().to_string(),
                second: pair[1].name().to_string(),
            });
        }
    }

    Ok(sorted)
}
