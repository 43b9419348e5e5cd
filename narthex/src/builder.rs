//! Builder pattern for constructing Narthex instances
//!
//! This module provides a type-safe builder for creating [`Narthex`] instances
//! with compile-time validation of storage configuration.
//!
//! # Example
//!
//! ```rust,no_run
//! use narthex::NarthexBuilder;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Build with SQLite, lockout policy from the environment and auto-migration
//!     let narthex = NarthexBuilder::new()
//!         .with_sqlite("sqlite::memory:")
//!         .await?
//!         .with_lockout_config_from_env()?
//!         .apply_migrations(true)
//!         .build()
//!         .await?;
//!
//!     // Or build without auto-migration and run manually
//!     let narthex = NarthexBuilder::new()
//!         .with_sqlite("sqlite::memory:")
//!         .await?
//!         .build()
//!         .await?;
//!     narthex.migrate().await?;
//!
//!     Ok(())
//! }
//! ```

use std::sync::Arc;

use narthex_core::{Clock, LockoutConfig, RepositoryProvider, SystemClock};

use crate::Narthex;

// ============================================================================
// Error Types
// ============================================================================

/// Errors that can occur when building a Narthex instance.
#[derive(Debug, thiserror::Error)]
pub enum NarthexBuilderError {
    /// Failed to connect to storage backend
    #[error("Storage connection failed: {0}")]
    StorageConnection(String),

    /// Failed to run database migrations
    #[error("Migration failed: {0}")]
    Migration(String),

    /// Invalid configuration provided
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),
}

// ============================================================================
// Type-State Markers
// ============================================================================

/// Marker type indicating no storage has been configured yet.
///
/// This is the initial state of [`NarthexBuilder`].
pub struct NoStorage;

/// Marker type indicating storage has been configured.
pub struct WithStorage<R: RepositoryProvider> {
    repositories: Arc<R>,
}

// ============================================================================
// Builder Implementation
// ============================================================================

/// A type-safe builder for constructing [`Narthex`] instances.
///
/// Storage must be configured before [`build`](NarthexBuilder::build) is
/// available:
///
/// - [`NoStorage`]: Initial state, storage must be configured
/// - [`WithStorage<R>`]: Storage configured, ready to build
///
/// The lockout policy defaults to [`LockoutConfig::default`] (3 attempts,
/// 60 minute first lock, x1.5 per lock, 480 minute cap) and time comes from
/// [`SystemClock`] unless [`with_clock`](NarthexBuilder::with_clock) says
/// otherwise.
pub struct NarthexBuilder<Storage, C: Clock = SystemClock> {
    storage: Storage,
    lockout_config: LockoutConfig,
    clock: Arc<C>,
    apply_migrations: bool,
}

impl Default for NarthexBuilder<NoStorage> {
    fn default() -> Self {
        Self::new()
    }
}

impl NarthexBuilder<NoStorage> {
    /// Create a new builder with default configuration.
    pub fn new() -> Self {
        Self {
            storage: NoStorage,
            lockout_config: LockoutConfig::default(),
            clock: Arc::new(SystemClock),
            apply_migrations: false,
        }
    }
}

impl<C: Clock> NarthexBuilder<NoStorage, C> {
    /// Use an already constructed repository provider.
    ///
    /// This is the entry point for storage backends that live outside this
    /// crate.
    pub fn with_repositories<R: RepositoryProvider>(
        self,
        repositories: Arc<R>,
    ) -> NarthexBuilder<WithStorage<R>, C> {
        NarthexBuilder {
            storage: WithStorage { repositories },
            lockout_config: self.lockout_config,
            clock: self.clock,
            apply_migrations: self.apply_migrations,
        }
    }
}

// ============================================================================
// Storage Configuration Methods (NoStorage -> WithStorage)
// ============================================================================

#[cfg(feature = "sqlite")]
impl<C: Clock> NarthexBuilder<NoStorage, C> {
    /// Configure SQLite storage by connecting to the given URL.
    ///
    /// The database file is created if it does not exist.
    ///
    /// # Arguments
    ///
    /// * `url` - SQLite connection URL (e.g., "sqlite::memory:" or "sqlite://path/to/db.sqlite")
    pub async fn with_sqlite(
        self,
        url: &str,
    ) -> Result<NarthexBuilder<WithStorage<crate::SqliteRepositoryProvider>, C>, NarthexBuilderError>
    {
        let storage = crate::SqliteStorage::connect(url)
            .await
            .map_err(|e| NarthexBuilderError::StorageConnection(e.to_string()))?;

        Ok(self.with_repositories(Arc::new(storage.into_repository_provider())))
    }

    /// Configure SQLite storage with an existing connection pool.
    ///
    /// # Example
    ///
    /// ```rust,no_run
    /// use narthex::NarthexBuilder;
    /// use sqlx::SqlitePool;
    ///
    /// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
    /// let pool = SqlitePool::connect("sqlite::memory:").await?;
    ///
    /// let narthex = NarthexBuilder::new()
    ///     .with_sqlite_pool(pool)
    ///     .build()
    ///     .await?;
    /// # Ok(())
    /// # }
    /// ```
    pub fn with_sqlite_pool(
        self,
        pool: sqlx::SqlitePool,
    ) -> NarthexBuilder<WithStorage<crate::SqliteRepositoryProvider>, C> {
        self.with_repositories(Arc::new(crate::SqliteRepositoryProvider::new(pool)))
    }
}

// ============================================================================
// Configuration Methods (available in any state)
// ============================================================================

impl<S, C: Clock> NarthexBuilder<S, C> {
    /// Set the lockout policy.
    ///
    /// # Example
    ///
    /// ```rust,no_run
    /// use narthex::{LockoutConfig, NarthexBuilder};
    ///
    /// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
    /// let narthex = NarthexBuilder::new()
    ///     .with_sqlite("sqlite::memory:")
    ///     .await?
    ///     .with_lockout_config(LockoutConfig::new(5, 15, 2.0, 1440)?)
    ///     .build()
    ///     .await?;
    /// # Ok(())
    /// # }
    /// ```
    pub fn with_lockout_config(mut self, config: LockoutConfig) -> Self {
        self.lockout_config = config;
        self
    }

    /// Read the lockout policy from the environment.
    ///
    /// Unset variables fall back to their defaults; a value that does not
    /// parse or an inconsistent policy fails the build instead of silently
    /// using defaults. See [`LockoutConfig::from_env`] for the variable names.
    pub fn with_lockout_config_from_env(self) -> Result<Self, NarthexBuilderError> {
        self.with_lockout_config_from_lookup(|name| std::env::var(name).ok())
    }

    /// Same as [`with_lockout_config_from_env`](Self::with_lockout_config_from_env)
    /// with a caller-provided lookup.
    pub fn with_lockout_config_from_lookup<F>(
        mut self,
        lookup: F,
    ) -> Result<Self, NarthexBuilderError>
    where
        F: Fn(&str) -> Option<String>,
    {
        self.lockout_config = LockoutConfig::from_lookup(lookup)
            .map_err(|e| NarthexBuilderError::InvalidConfiguration(e.to_string()))?;
        Ok(self)
    }

    /// Replace the time source used for lock decisions.
    pub fn with_clock<C2: Clock>(self, clock: Arc<C2>) -> NarthexBuilder<S, C2> {
        NarthexBuilder {
            storage: self.storage,
            lockout_config: self.lockout_config,
            clock,
            apply_migrations: self.apply_migrations,
        }
    }

    /// Set whether to automatically apply database migrations during build.
    ///
    /// Default: false
    ///
    /// When `false`, call [`Narthex::migrate`] before the first login.
    pub fn apply_migrations(mut self, apply: bool) -> Self {
        self.apply_migrations = apply;
        self
    }
}

// ============================================================================
// Build Method (only available when storage is configured)
// ============================================================================

impl<R: RepositoryProvider, C: Clock> NarthexBuilder<WithStorage<R>, C> {
    /// Build the Narthex instance.
    ///
    /// If `apply_migrations(true)` was called, migrations are applied before
    /// returning.
    pub async fn build(self) -> Result<Narthex<R, C>, NarthexBuilderError> {
        if self.apply_migrations {
            self.storage
                .repositories
                .migrate()
                .await
                .map_err(|e| NarthexBuilderError::Migration(e.to_string()))?;
        }

        tracing::debug!(
            max_attempts = self.lockout_config.max_attempts(),
            base_lock_minutes = self.lockout_config.base_lock_minutes(),
            lock_multiplier = self.lockout_config.lock_multiplier(),
            max_lock_minutes = self.lockout_config.max_lock_minutes(),
            "Building narthex"
        );

        Ok(Narthex::from_parts(
            self.storage.repositories,
            self.lockout_config,
            self.clock,
        ))
    }
}
