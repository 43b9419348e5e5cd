//! # Narthex
//!
//! Narthex guards password logins with a progressive account lockout. After
//! a configurable number of consecutive failures an account is locked, and
//! every further lock since the last successful login lasts longer than the
//! one before it, up to a cap:
//!
//! | Lock | Duration (defaults)  |
//! | ---- | -------------------- |
//! | 1st  | 60 minutes           |
//! | 2nd  | 90 minutes           |
//! | 3rd  | 135 minutes          |
//! | ...  | at most 480 minutes  |
//!
//! Accounts are identified by an identity document (type + number). Locks
//! expire lazily on the next attempt; there is no background task.
//!
//! ## Storage Support
//!
//! - SQLite (`sqlite` feature, enabled by default)
//!
//! Other backends implement [`narthex_core::RepositoryProvider`].
//!
//! ## Example
//!
//! ```rust,no_run
//! use narthex::{LoginOutcome, NarthexBuilder, NewAccount};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let narthex = NarthexBuilder::new()
//!         .with_sqlite("sqlite://narthex.db")
//!         .await?
//!         .with_lockout_config_from_env()?
//!         .apply_migrations(true)
//!         .build()
//!         .await?;
//!
//!     let account = NewAccount::builder()
//!         .document("CC", "1032456789")
//!         .first_name("Lucia")
//!         .last_name("Restrepo")
//!         .build()?;
//!     narthex.register_account(account, "Parroquia#2024").await?;
//!
//!     match narthex.login("CC", "1032456789", "Parroquia#2024").await? {
//!         LoginOutcome::Authenticated(account) => println!("Welcome {}", account.full_name()),
//!         rejected => println!("{} {}", rejected.status_code(), rejected.message()),
//!     }
//!
//!     Ok(())
//! }
//! ```
mod builder;

use std::sync::Arc;

use narthex_core::{
    AccountService, LoginGuard, PasswordAuthVerifier, RepositoryProvider,
    error::{AuthError, Error},
    repositories::AccountRepositoryAdapter,
};

pub use builder::{NarthexBuilder, NarthexBuilderError, NoStorage, WithStorage};

/// Re-export core types from narthex_core
pub use narthex_core::{
    Account, AccountId, Clock, LockEscalation, LockExamples, LockRemaining, LockoutConfig,
    LockoutStatus, LoginOutcome, ManualClock, NewAccount, OutcomeKind, SecuritySettings,
    SystemClock,
};

#[cfg(feature = "sqlite")]
pub use narthex_storage_sqlite::{SqliteRepositoryProvider, SqliteStorage};

/// Errors returned by [`Narthex`].
///
/// Rejected logins are not errors; they come back as a [`LoginOutcome`].
#[derive(Debug, thiserror::Error)]
pub enum NarthexError {
    #[error("Account not found")]
    AccountNotFound,
    #[error("Account already exists")]
    AccountAlreadyExists,
    #[error("Validation error: {0}")]
    ValidationError(String),
    #[error("Storage error: {0}")]
    StorageError(String),
    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl NarthexError {
    /// Suggested HTTP status for this error.
    pub fn status_code(&self) -> u16 {
        match self {
            NarthexError::ValidationError(_) => 400,
            NarthexError::AccountNotFound => 404,
            NarthexError::AccountAlreadyExists => 409,
            NarthexError::StorageError(_) | NarthexError::ConfigError(_) => 500,
        }
    }
}

impl From<Error> for NarthexError {
    fn from(err: Error) -> Self {
        match err {
            Error::Auth(AuthError::AccountNotFound) => NarthexError::AccountNotFound,
            Error::Auth(AuthError::AccountAlreadyExists) => NarthexError::AccountAlreadyExists,
            Error::Validation(e) => NarthexError::ValidationError(e.to_string()),
            Error::Storage(e) => NarthexError::StorageError(e.to_string()),
            Error::Config(e) => NarthexError::ConfigError(e.to_string()),
        }
    }
}

/// The entry point for logins and account administration.
///
/// Cheap to share: wrap it in an `Arc` and hand it to request handlers.
pub struct Narthex<R: RepositoryProvider, C: Clock = SystemClock> {
    repositories: Arc<R>,
    login_guard: Arc<LoginGuard<AccountRepositoryAdapter<R>, PasswordAuthVerifier, C>>,
    account_service: Arc<AccountService<AccountRepositoryAdapter<R>, PasswordAuthVerifier, C>>,
    lockout_config: LockoutConfig,
}

impl<R: RepositoryProvider> Narthex<R, SystemClock> {
    /// Create a Narthex instance with the default lockout policy.
    ///
    /// Prefer [`NarthexBuilder`] for anything beyond the defaults.
    pub fn new(repositories: Arc<R>) -> Self {
        Self::from_parts(repositories, LockoutConfig::default(), Arc::new(SystemClock))
    }
}

impl<R: RepositoryProvider, C: Clock> Narthex<R, C> {
    pub(crate) fn from_parts(
        repositories: Arc<R>,
        lockout_config: LockoutConfig,
        clock: Arc<C>,
    ) -> Self {
        let accounts = Arc::new(AccountRepositoryAdapter::new(repositories.clone()));
        let verifier = Arc::new(PasswordAuthVerifier::new());

        let login_guard = Arc::new(LoginGuard::with_clock(
            accounts.clone(),
            verifier.clone(),
            clock.clone(),
            lockout_config.clone(),
        ));
        let account_service = Arc::new(AccountService::with_clock(
            accounts,
            verifier,
            clock,
            lockout_config.clone(),
        ));

        Self {
            repositories,
            login_guard,
            account_service,
            lockout_config,
        }
    }

    pub fn lockout_config(&self) -> &LockoutConfig {
        &self.lockout_config
    }

    pub async fn migrate(&self) -> Result<(), NarthexError> {
        self.repositories.migrate().await?;
        Ok(())
    }

    pub async fn health_check(&self) -> Result<(), NarthexError> {
        self.repositories.health_check().await?;
        Ok(())
    }

    /// Attempt a login with an identity document and password.
    ///
    /// Wrong passwords, locks and inactive accounts are `Ok` outcomes. An
    /// `Err` means the attempt could not be evaluated (bad input or a storage
    /// failure) and must not be treated as a success.
    pub async fn login(
        &self,
        document_type: &str,
        document_number: &str,
        password: &str,
    ) -> Result<LoginOutcome, NarthexError> {
        Ok(self
            .login_guard
            .attempt_login(document_type, document_number, password)
            .await?)
    }

    pub async fn register_account(
        &self,
        account: NewAccount,
        password: &str,
    ) -> Result<Account, NarthexError> {
        Ok(self
            .account_service
            .register_account(account, password)
            .await?)
    }

    pub async fn get_account(&self, account_id: &AccountId) -> Result<Option<Account>, NarthexError> {
        Ok(self.account_service.get_account(account_id).await?)
    }

    /// Administrative unlock. Returns whether the account was locked.
    pub async fn unlock_account(&self, account_id: &AccountId) -> Result<bool, NarthexError> {
        Ok(self.account_service.unlock_account(account_id).await?)
    }

    pub async fn lockout_status(
        &self,
        document_type: &str,
        document_number: &str,
    ) -> Result<LockoutStatus, NarthexError> {
        Ok(self
            .account_service
            .lockout_status(document_type, document_number)
            .await?)
    }

    pub fn security_settings(&self) -> SecuritySettings {
        self.account_service.security_settings()
    }
}
