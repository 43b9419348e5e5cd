//! Repository trait for accounts and their lockout state.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::{
    Error,
    account::{AccountId, AccountSecurityRecord, NewAccount},
};

/// Storage operations needed by the login guard and account service.
///
/// # Concurrency
///
/// Two failed logins racing on the same account must both be counted. For
/// that reason the failure path never writes an absolute counter:
///
/// - [`release_expired_lock`](Self::release_expired_lock) must only reset
///   the counter while `locked_until` still holds the expiry the caller
///   read, so a late attempt cannot wipe failures recorded after the unlock.
/// - [`record_failed_attempt`](Self::record_failed_attempt) must increment
///   atomically and return the value it produced.
/// - [`lock_account`](Self::lock_account) must only touch the lock columns.
///
/// Unconditional resets ([`clear_security_state`](Self::clear_security_state))
/// follow a correct password or an administrator's decision, both of which
/// are meant to forget earlier failures.
#[async_trait]
pub trait AccountRepository: Send + Sync + 'static {
    /// Create an account with a fresh security state `(0, null, 0)`.
    async fn create(
        &self,
        account: NewAccount,
        credential_hash: &str,
    ) -> Result<AccountSecurityRecord, Error>;

    async fn find_by_id(&self, id: &AccountId) -> Result<Option<AccountSecurityRecord>, Error>;

    /// Look an account up by its identity document.
    ///
    /// Returns `Ok(None)` when no account matches; an `Err` means the store
    /// itself could not be reached.
    async fn find_by_document(
        &self,
        document_type: &str,
        document_number: &str,
    ) -> Result<Option<AccountSecurityRecord>, Error>;

    /// Overwrite the failure counter and lock expiry.
    ///
    /// `lock_count` is left untouched.
    async fn update_security_state(
        &self,
        id: &AccountId,
        failed_attempts: u32,
        locked_until: Option<DateTime<Utc>>,
    ) -> Result<(), Error>;

    /// Clear an expired lock if `locked_until` still equals `observed`.
    ///
    /// Sets `failed_attempts = 0` and `locked_until = NULL`, and also zeroes
    /// `lock_count` when `reset_lock_count` is set. Returns `false` without
    /// writing anything when the stored expiry has changed, which means a
    /// concurrent attempt already released the lock.
    async fn release_expired_lock(
        &self,
        id: &AccountId,
        observed: DateTime<Utc>,
        reset_lock_count: bool,
    ) -> Result<bool, Error>;

    /// Atomically add one to `failed_attempts` and return the new value.
    async fn record_failed_attempt(&self, id: &AccountId) -> Result<u32, Error>;

    /// Set `locked_until` and `lock_count` without touching `failed_attempts`.
    async fn lock_account(
        &self,
        id: &AccountId,
        locked_until: DateTime<Utc>,
        lock_count: u32,
    ) -> Result<(), Error>;

    /// Reset `failed_attempts`, `locked_until` and `lock_count`.
    async fn clear_security_state(&self, id: &AccountId) -> Result<(), Error>;
}
