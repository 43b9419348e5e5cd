//! Account administration: registration, manual unlock and lockout status.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    Error,
    account::{Account, AccountId, NewAccount},
    clock::{Clock, SystemClock},
    error::AuthError,
    lockout::{LockoutConfig, SecuritySettings},
    repositories::AccountRepository,
    services::credential::CredentialHasher,
    validation::{validate_document, validate_email, validate_name, validate_password},
};

/// Read-only view of an account's lockout state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LockoutStatus {
    pub account_id: AccountId,
    pub failed_attempts: u32,
    pub locked_until: Option<DateTime<Utc>>,
    pub is_locked: bool,
    pub lock_count: u32,
    /// Whole seconds until the lock ends, rounded up. `None` when unlocked.
    pub retry_after_seconds: Option<u64>,
}

/// Service for managing accounts outside the login path.
pub struct AccountService<A: AccountRepository, H: CredentialHasher, C: Clock = SystemClock> {
    repository: Arc<A>,
    hasher: Arc<H>,
    clock: Arc<C>,
    config: LockoutConfig,
}

impl<A: AccountRepository, H: CredentialHasher> AccountService<A, H, SystemClock> {
    pub fn new(repository: Arc<A>, hasher: Arc<H>, config: LockoutConfig) -> Self {
        Self::with_clock(repository, hasher, Arc::new(SystemClock), config)
    }
}

impl<A: AccountRepository, H: CredentialHasher, C: Clock> AccountService<A, H, C> {
    pub fn with_clock(repository: Arc<A>, hasher: Arc<H>, clock: Arc<C>, config: LockoutConfig) -> Self {
        Self {
            repository,
            hasher,
            clock,
            config,
        }
    }

    /// Register a new account with a password.
    ///
    /// # Errors
    ///
    /// - [`Error::Validation`] for a malformed document, name, email or a
    ///   password that does not meet the strength rules
    /// - [`AuthError::AccountAlreadyExists`] when the document is taken
    pub async fn register_account(
        &self,
        mut account: NewAccount,
        password: &str,
    ) -> Result<Account, Error> {
        validate_document(&account.document_type, &account.document_number)?;
        validate_name("First name", &account.first_name)?;
        validate_name("Last name", &account.last_name)?;
        if let Some(email) = &account.email {
            validate_email(email)?;
        }
        validate_password(password)?;

        account.document_type = account.document_type.trim().to_string();
        account.document_number = account.document_number.trim().to_string();

        if self
            .repository
            .find_by_document(&account.document_type, &account.document_number)
            .await?
            .is_some()
        {
            return Err(Error::Auth(AuthError::AccountAlreadyExists));
        }

        let credential_hash = self.hasher.hash(password);
        let record = self.repository.create(account, &credential_hash).await?;

        tracing::info!(
            account_id = %record.id(),
            document_type = %record.account.document_type,
            "Account registered"
        );

        Ok(record.into_account())
    }

    pub async fn get_account(&self, id: &AccountId) -> Result<Option<Account>, Error> {
        Ok(self
            .repository
            .find_by_id(id)
            .await?
            .map(|record| record.into_account()))
    }

    /// Clear an account's failure counter, lock and lock tier.
    ///
    /// Returns `true` if the account was locked at the time.
    pub async fn unlock_account(&self, id: &AccountId) -> Result<bool, Error> {
        let record = self
            .repository
            .find_by_id(id)
            .await?
            .ok_or(Error::Auth(AuthError::AccountNotFound))?;

        let was_locked = record.is_locked_at(self.clock.now());
        self.repository.clear_security_state(id).await?;

        tracing::info!(account_id = %id, was_locked, "Account unlocked by administrator");
        Ok(was_locked)
    }

    /// Current lockout state for a document, without side effects.
    ///
    /// An expired lock is reported as unlocked even though the record still
    /// carries it; it is cleared by the next login attempt.
    pub async fn lockout_status(
        &self,
        document_type: &str,
        document_number: &str,
    ) -> Result<LockoutStatus, Error> {
        let record = self
            .repository
            .find_by_document(document_type.trim(), document_number.trim())
            .await?
            .ok_or(Error::Auth(AuthError::AccountNotFound))?;

        let now = self.clock.now();
        let is_locked = record.is_locked_at(now);
        let retry_after_seconds = record
            .locked_until
            .filter(|_| is_locked)
            .map(|until| {
                let millis = (until - now).num_milliseconds();
                u64::try_from((millis + 999) / 1000).unwrap_or(0)
            });

        Ok(LockoutStatus {
            account_id: record.id().clone(),
            failed_attempts: record.failed_attempts,
            locked_until: record.locked_until,
            is_locked,
            lock_count: record.lock_count,
            retry_after_seconds,
        })
    }

    pub fn security_settings(&self) -> SecuritySettings {
        self.config.security_settings()
    }
}
