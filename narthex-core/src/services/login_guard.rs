//! Login guard with progressive account lockout.
//!
//! Every login attempt goes through [`LoginGuard::attempt_login`], which
//! decides between four outcomes:
//!
//! - [`LoginOutcome::Authenticated`] when the credential matches and the
//!   account is active
//! - [`LoginOutcome::RejectedBadCredentials`] for a wrong password or an
//!   unknown document
//! - [`LoginOutcome::RejectedLocked`] while a lock is running, or when this
//!   attempt is the one that crosses the failure threshold
//! - [`LoginOutcome::RejectedInactive`] when the credential matches but the
//!   account or its profile is disabled
//!
//! Locks expire lazily: there is no background task, the next attempt after
//! `locked_until` clears the lock before evaluating the credential.
//!
//! # Example
//!
//! ```rust,ignore
//! use narthex_core::services::{LoginGuard, LoginOutcome, PasswordAuthVerifier};
//! use narthex_core::LockoutConfig;
//!
//! let guard = LoginGuard::new(repository, Arc::new(PasswordAuthVerifier), LockoutConfig::default());
//!
//! match guard.attempt_login("CC", "1032456789", password).await? {
//!     LoginOutcome::Authenticated(account) => { /* issue a session */ }
//!     rejected => return Err(reject(rejected.status_code(), rejected.message())),
//! }
//! ```

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    Error,
    account::Account,
    clock::{Clock, SystemClock, ceil_to_second},
    lockout::{LockEscalation, LockoutConfig},
    repositories::AccountRepository,
    services::credential::CredentialVerifier,
    validation::validate_login_input,
};

/// Result of a login attempt that reached a decision.
///
/// Storage failures are not outcomes; they surface as `Err` from
/// [`LoginGuard::attempt_login`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum LoginOutcome {
    Authenticated(Account),
    RejectedBadCredentials {
        attempts_remaining: u32,
    },
    RejectedLocked {
        locked_until: DateTime<Utc>,
        remaining: LockRemaining,
    },
    RejectedInactive,
}

/// Coarse classification of a [`LoginOutcome`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeKind {
    Authenticated,
    BadCredentials,
    Locked,
    Inactive,
}

impl LoginOutcome {
    pub fn kind(&self) -> OutcomeKind {
        match self {
            LoginOutcome::Authenticated(_) => OutcomeKind::Authenticated,
            LoginOutcome::RejectedBadCredentials { .. } => OutcomeKind::BadCredentials,
            LoginOutcome::RejectedLocked { .. } => OutcomeKind::Locked,
            LoginOutcome::RejectedInactive => OutcomeKind::Inactive,
        }
    }

    pub fn is_authenticated(&self) -> bool {
        matches!(self, LoginOutcome::Authenticated(_))
    }

    /// Suggested HTTP status for this outcome.
    pub fn status_code(&self) -> u16 {
        match self.kind() {
            OutcomeKind::Authenticated => 200,
            OutcomeKind::BadCredentials => 401,
            OutcomeKind::Inactive => 403,
            OutcomeKind::Locked => 423,
        }
    }

    /// User-facing message.
    ///
    /// Unknown documents and wrong passwords produce the same text.
    pub fn message(&self) -> String {
        match self {
            LoginOutcome::Authenticated(_) => "Login successful".to_string(),
            LoginOutcome::RejectedBadCredentials { attempts_remaining } => format!(
                "Invalid document type, document number or password. {attempts_remaining} attempt(s) remaining"
            ),
            LoginOutcome::RejectedLocked { remaining, .. } => format!(
                "Account locked. Try again in {} minutes {} seconds",
                remaining.minutes, remaining.seconds
            ),
            LoginOutcome::RejectedInactive => {
                "Account inactive. Contact the system administrator".to_string()
            }
        }
    }

    pub fn into_account(self) -> Option<Account> {
        match self {
            LoginOutcome::Authenticated(account) => Some(account),
            _ => None,
        }
    }
}

/// Time left on a lock, split into whole minutes and leftover seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockRemaining {
    pub minutes: u64,
    pub seconds: u64,
}

impl LockRemaining {
    pub fn from_seconds(total: u64) -> Self {
        Self {
            minutes: total / 60,
            seconds: total % 60,
        }
    }

    pub fn from_minutes(minutes: u32) -> Self {
        Self {
            minutes: u64::from(minutes),
            seconds: 0,
        }
    }

    /// Time from `now` until `until`, rounded up to the next whole second.
    pub fn between(now: DateTime<Utc>, until: DateTime<Utc>) -> Self {
        let millis = (until - now).num_milliseconds().max(0);
        let seconds = u64::try_from((millis + 999) / 1000).unwrap_or(0);
        Self::from_seconds(seconds)
    }

    pub fn total_seconds(&self) -> u64 {
        self.minutes * 60 + self.seconds
    }
}

/// Decides login attempts and maintains each account's lockout state.
///
/// The guard holds no mutable state and can be shared behind an `Arc`.
/// Failure counting relies on the repository's atomic increment, so two
/// racing wrong passwords are both counted. Releasing an expired lock is
/// conditional on the expiry the attempt observed, so only one of several
/// racing attempts resets the counter.
pub struct LoginGuard<A: AccountRepository, V: CredentialVerifier, C: Clock = SystemClock> {
    repository: Arc<A>,
    verifier: Arc<V>,
    clock: Arc<C>,
    config: LockoutConfig,
}

impl<A: AccountRepository, V: CredentialVerifier> LoginGuard<A, V, SystemClock> {
    pub fn new(repository: Arc<A>, verifier: Arc<V>, config: LockoutConfig) -> Self {
        Self::with_clock(repository, verifier, Arc::new(SystemClock), config)
    }
}

impl<A: AccountRepository, V: CredentialVerifier, C: Clock> LoginGuard<A, V, C> {
    pub fn with_clock(
        repository: Arc<A>,
        verifier: Arc<V>,
        clock: Arc<C>,
        config: LockoutConfig,
    ) -> Self {
        Self {
            repository,
            verifier,
            clock,
            config,
        }
    }

    pub fn config(&self) -> &LockoutConfig {
        &self.config
    }

    /// Evaluate one login attempt.
    ///
    /// # Errors
    ///
    /// - [`Error::Validation`] when a field is empty; nothing is looked up.
    /// - [`Error::Storage`] when the repository fails at any step. A failure
    ///   while clearing state after a correct password is still an error, so
    ///   a caller never authenticates an attempt whose bookkeeping was lost.
    pub async fn attempt_login(
        &self,
        document_type: &str,
        document_number: &str,
        password: &str,
    ) -> Result<LoginOutcome, Error> {
        validate_login_input(document_type, document_number, password)?;
        let document_type = document_type.trim();
        let document_number = document_number.trim();

        let Some(record) = self
            .repository
            .find_by_document(document_type, document_number)
            .await?
        else {
            // Costs one verification, like a wrong password on a real account.
            let _ = self.verifier.matches(self.verifier.dummy_hash(), password);
            tracing::warn!(document_type, "Login attempt for unknown account");
            return Ok(self.first_failure_outcome(self.clock.now()));
        };

        let now = self.clock.now();
        let account_id = record.id().clone();

        if let Some(locked_until) = record.locked_until.filter(|until| *until > now) {
            let remaining = LockRemaining::between(now, locked_until);
            tracing::warn!(
                account_id = %account_id,
                locked_until = %locked_until,
                remaining_seconds = remaining.total_seconds(),
                "Login rejected, account is locked"
            );
            return Ok(LoginOutcome::RejectedLocked {
                locked_until,
                remaining,
            });
        }

        let mut prior_lock_count = record.lock_count;
        if let Some(expired) = record
            .locked_until
            .filter(|_| record.has_expired_lock_at(now))
        {
            let reset_lock_count = self.config.escalation() == LockEscalation::PerCycle;
            let released = self
                .repository
                .release_expired_lock(&account_id, expired, reset_lock_count)
                .await?;
            if reset_lock_count {
                prior_lock_count = 0;
            }

            if released {
                tracing::info!(
                    account_id = %account_id,
                    lock_count = prior_lock_count,
                    "Lock expired, account unlocked"
                );
            } else {
                tracing::debug!(
                    account_id = %account_id,
                    "Expired lock already released by a concurrent attempt"
                );
            }
        }

        if self.verifier.matches(&record.credential_hash, password) {
            self.repository.clear_security_state(&account_id).await?;

            if !record.is_active() {
                tracing::warn!(account_id = %account_id, "Login rejected, account is inactive");
                return Ok(LoginOutcome::RejectedInactive);
            }

            tracing::info!(account_id = %account_id, "Login successful");
            return Ok(LoginOutcome::Authenticated(record.into_account()));
        }

        let failed_attempts = self.repository.record_failed_attempt(&account_id).await?;

        if failed_attempts >= self.config.max_attempts() {
            let tier = self.config.lock_tier(failed_attempts, prior_lock_count);
            let lock_minutes = self.config.lock_duration_minutes(tier);
            let locked_until = ceil_to_second(now + self.config.lock_duration(tier));

            self.repository
                .lock_account(&account_id, locked_until, tier.saturating_add(1))
                .await?;

            tracing::warn!(
                account_id = %account_id,
                failed_attempts,
                lock_tier = tier,
                lock_minutes,
                "Too many failed attempts, account locked"
            );
            return Ok(LoginOutcome::RejectedLocked {
                locked_until,
                remaining: LockRemaining::from_minutes(lock_minutes),
            });
        }

        let attempts_remaining = self.config.attempts_remaining(failed_attempts);
        tracing::warn!(
            account_id = %account_id,
            failed_attempts,
            attempts_remaining,
            "Failed login attempt"
        );
        Ok(LoginOutcome::RejectedBadCredentials { attempts_remaining })
    }

    /// What a fresh account answers to its first wrong password.
    fn first_failure_outcome(&self, now: DateTime<Utc>) -> LoginOutcome {
        if self.config.max_attempts() > 1 {
            return LoginOutcome::RejectedBadCredentials {
                attempts_remaining: self.config.attempts_remaining(1),
            };
        }

        // A single-attempt policy locks on the first failure.
        LoginOutcome::RejectedLocked {
            locked_until: ceil_to_second(now + self.config.lock_duration(0)),
            remaining: LockRemaining::from_minutes(self.config.lock_duration_minutes(0)),
        }
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::collections::{HashMap, HashSet};
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use chrono::{DateTime, Utc};

    use crate::{
        Error,
        account::{Account, AccountId, AccountSecurityRecord, NewAccount},
        error::{AuthError, StorageError},
        repositories::AccountRepository,
        services::credential::{CredentialHasher, CredentialVerifier},
    };

    /// In-memory repository that can be told to fail specific operations.
    #[derive(Default)]
    pub struct MockAccountRepository {
        pub records: Mutex<HashMap<AccountId, AccountSecurityRecord>>,
        failing: Mutex<HashSet<&'static str>>,
    }

    impl MockAccountRepository {
        pub fn with_record(record: AccountSecurityRecord) -> Self {
            let repo = Self::default();
            repo.records
                .lock()
                .unwrap()
                .insert(record.id().clone(), record);
            repo
        }

        pub fn fail_on(&self, operation: &'static str) {
            self.failing.lock().unwrap().insert(operation);
        }

        pub fn state(&self, id: &AccountId) -> (u32, Option<DateTime<Utc>>, u32) {
            let records = self.records.lock().unwrap();
            let record = &records[id];
            (record.failed_attempts, record.locked_until, record.lock_count)
        }

        fn check(&self, operation: &'static str) -> Result<(), Error> {
            if self.failing.lock().unwrap().contains(operation) {
                return Err(Error::Storage(StorageError::Database(format!(
                    "{operation} failed"
                ))));
            }
            Ok(())
        }

        fn modify<T>(
            &self,
            id: &AccountId,
            f: impl FnOnce(&mut AccountSecurityRecord) -> T,
        ) -> Result<T, Error> {
            let mut records = self.records.lock().unwrap();
            let record = records
                .get_mut(id)
                .ok_or(Error::Storage(StorageError::NotFound))?;
            Ok(f(record))
        }
    }

    #[async_trait]
    impl AccountRepository for MockAccountRepository {
        async fn create(
            &self,
            account: NewAccount,
            credential_hash: &str,
        ) -> Result<AccountSecurityRecord, Error> {
            self.check("create")?;
            let mut records = self.records.lock().unwrap();
            if records.values().any(|r| {
                r.account.document_type == account.document_type
                    && r.account.document_number == account.document_number
            }) {
                return Err(Error::Auth(AuthError::AccountAlreadyExists));
            }

            let now = Utc::now();
            let record = AccountSecurityRecord {
                account: Account {
                    id: account.id.clone(),
                    document_type: account.document_type,
                    document_number: account.document_number,
                    first_name: account.first_name,
                    last_name: account.last_name,
                    email: account.email,
                    role: account.role,
                    account_active: true,
                    profile_active: true,
                    created_at: now,
                    updated_at: now,
                },
                credential_hash: credential_hash.to_string(),
                failed_attempts: 0,
                locked_until: None,
                lock_count: 0,
            };
            records.insert(account.id, record.clone());
            Ok(record)
        }

        async fn find_by_id(&self, id: &AccountId) -> Result<Option<AccountSecurityRecord>, Error> {
            self.check("find_by_id")?;
            Ok(self.records.lock().unwrap().get(id).cloned())
        }

        async fn find_by_document(
            &self,
            document_type: &str,
            document_number: &str,
        ) -> Result<Option<AccountSecurityRecord>, Error> {
            self.check("find_by_document")?;
            Ok(self
                .records
                .lock()
                .unwrap()
                .values()
                .find(|r| {
                    r.account.document_type == document_type
                        && r.account.document_number == document_number
                })
                .cloned())
        }

        async fn update_security_state(
            &self,
            id: &AccountId,
            failed_attempts: u32,
            locked_until: Option<DateTime<Utc>>,
        ) -> Result<(), Error> {
            self.check("update_security_state")?;
            self.modify(id, |r| {
                r.failed_attempts = failed_attempts;
                r.locked_until = locked_until;
            })
        }

        async fn release_expired_lock(
            &self,
            id: &AccountId,
            observed: DateTime<Utc>,
            reset_lock_count: bool,
        ) -> Result<bool, Error> {
            self.check("release_expired_lock")?;
            self.modify(id, |r| {
                if r.locked_until != Some(observed) {
                    return false;
                }
                r.failed_attempts = 0;
                r.locked_until = None;
                if reset_lock_count {
                    r.lock_count = 0;
                }
                true
            })
        }

        async fn record_failed_attempt(&self, id: &AccountId) -> Result<u32, Error> {
            self.check("record_failed_attempt")?;
            self.modify(id, |r| {
                r.failed_attempts += 1;
                r.failed_attempts
            })
        }

        async fn lock_account(
            &self,
            id: &AccountId,
            locked_until: DateTime<Utc>,
            lock_count: u32,
        ) -> Result<(), Error> {
            self.check("lock_account")?;
            self.modify(id, |r| {
                r.locked_until = Some(locked_until);
                r.lock_count = lock_count;
            })
        }

        async fn clear_security_state(&self, id: &AccountId) -> Result<(), Error> {
            self.check("clear_security_state")?;
            self.modify(id, |r| {
                r.failed_attempts = 0;
                r.locked_until = None;
                r.lock_count = 0;
            })
        }
    }

    /// Matches when the stored hash is `hash:<plaintext>`, counting calls.
    #[derive(Default)]
    pub struct CountingVerifier {
        pub calls: AtomicUsize,
    }

    impl CountingVerifier {
        pub fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl CredentialVerifier for CountingVerifier {
        fn matches(&self, stored_hash: &str, plaintext: &str) -> bool {
            self.calls.fetch_add(1, Ordering::SeqCst);
            stored_hash.strip_prefix("hash:") == Some(plaintext)
        }

        fn dummy_hash(&self) -> &str {
            "dummy"
        }
    }

    impl CredentialHasher for CountingVerifier {
        fn hash(&self, plaintext: &str) -> String {
            format!("hash:{plaintext}")
        }
    }
}
