//! Repository implementations for SQLite storage

pub mod account;

pub use account::SqliteAccountRepository;

use async_trait::async_trait;
use narthex_core::{
    Error,
    error::StorageError,
    repositories::{AccountRepositoryProvider, RepositoryProvider},
};
use narthex_migration::MigrationManager;
use sqlx::SqlitePool;
use std::sync::Arc;

use crate::migrations::{self, SqliteMigrationManager};

/// Repository provider implementation for SQLite
pub struct SqliteRepositoryProvider {
    pool: SqlitePool,
    account: Arc<SqliteAccountRepository>,
}

impl SqliteRepositoryProvider {
    pub fn new(pool: SqlitePool) -> Self {
        let account = Arc::new(SqliteAccountRepository::new(pool.clone()));
        Self { pool, account }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

impl AccountRepositoryProvider for SqliteRepositoryProvider {
    type AccountRepo = SqliteAccountRepository;

    fn account(&self) -> &Self::AccountRepo {
        &self.account
    }
}

#[async_trait]
impl RepositoryProvider for SqliteRepositoryProvider {
    async fn migrate(&self) -> Result<(), Error> {
        let manager = SqliteMigrationManager::new(self.pool.clone());
        manager.initialize().await.map_err(|e| {
            tracing::error!(error = %e, "Failed to initialize migrations");
            Error::Storage(StorageError::Migration(
                "Failed to initialize migrations".to_string(),
            ))
        })?;

        manager.up(&migrations::all()).await.map_err(|e| {
            tracing::error!(error = %e, "Failed to run migrations");
            Error::Storage(StorageError::Migration(
                "Failed to run migrations".to_string(),
            ))
        })?;

        Ok(())
    }

    async fn health_check(&self) -> Result<(), Error> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "SQLite health check failed");
                Error::Storage(StorageError::Connection(
                    "SQLite health check failed".to_string(),
                ))
            })?;
        Ok(())
    }
}
