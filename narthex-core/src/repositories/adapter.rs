use crate::{
    Error,
    account::{AccountId, AccountSecurityRecord, NewAccount},
    repositories::{AccountRepository, RepositoryProvider},
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;

/// Adapter that wraps a RepositoryProvider and implements [`AccountRepository`]
///
/// Lets services own an `Arc` to something that is an account repository
/// while the provider itself stays shared with the facade.
pub struct AccountRepositoryAdapter<R: RepositoryProvider> {
    provider: Arc<R>,
}

impl<R: RepositoryProvider> AccountRepositoryAdapter<R> {
    pub fn new(provider: Arc<R>) -> Self {
        Self { provider }
    }
}

#[async_trait]
impl<R: RepositoryProvider> AccountRepository for AccountRepositoryAdapter<R> {
    async fn create(
        &self,
        account: NewAccount,
        credential_hash: &str,
    ) -> Result<AccountSecurityRecord, Error> {
        self.provider.account().create(account, credential_hash).await
    }

    async fn find_by_id(&self, id: &AccountId) -> Result<Option<AccountSecurityRecord>, Error> {
        self.provider.account().find_by_id(id).await
    }

    async fn find_by_document(
        &self,
        document_type: &str,
        document_number: &str,
    ) -> Result<Option<AccountSecurityRecord>, Error> {
        self.provider
            .account()
            .find_by_document(document_type, document_number)
            .await
    }

    async fn update_security_state(
        &self,
        id: &AccountId,
        failed_attempts: u32,
        locked_until: Option<DateTime<Utc>>,
    ) -> Result<(), Error> {
        self.provider
            .account()
            .update_security_state(id, failed_attempts, locked_until)
            .await
    }

    async fn release_expired_lock(
        &self,
        id: &AccountId,
        observed: DateTime<Utc>,
        reset_lock_count: bool,
    ) -> Result<bool, Error> {
        self.provider
            .account()
            .release_expired_lock(id, observed, reset_lock_count)
            .await
    }

    async fn record_failed_attempt(&self, id: &AccountId) -> Result<u32, Error> {
        self.provider.account().record_failed_attempt(id).await
    }

    async fn lock_account(
        &self,
        id: &AccountId,
        locked_until: DateTime<Utc>,
        lock_count: u32,
    ) -> Result<(), Error> {
        self.provider
            .account()
            .lock_account(id, locked_until, lock_count)
            .await
    }

    async fn clear_security_state(&self, id: &AccountId) -> Result<(), Error> {
        self.provider.account().clear_security_state(id).await
    }
}
