//! Repository traits for the data access layer
//!
//! Services talk to storage only through these traits.
//!
//! - [`AccountRepository`] defines the account and lockout-state operations
//! - [`AccountRepositoryProvider`] gives access to a backend's account repository
//! - [`RepositoryProvider`] adds lifecycle methods (migrations, health checks)

pub mod account;
pub mod adapter;

pub use account::AccountRepository;
pub use adapter::AccountRepositoryAdapter;

use async_trait::async_trait;

use crate::Error;

/// Provider trait for account repository access.
pub trait AccountRepositoryProvider: Send + Sync + 'static {
    /// The account repository implementation type
    type AccountRepo: AccountRepository;

    /// Get the account repository
    fn account(&self) -> &Self::AccountRepo;
}

/// Provider trait that storage backends implement.
///
/// # Example
///
/// ```rust,ignore
/// use narthex_core::repositories::*;
///
/// struct MyStorage { accounts: MyAccountRepository }
///
/// impl AccountRepositoryProvider for MyStorage {
///     type AccountRepo = MyAccountRepository;
///     fn account(&self) -> &Self::AccountRepo { &self.accounts }
/// }
///
/// #[async_trait]
/// impl RepositoryProvider for MyStorage {
///     async fn migrate(&self) -> Result<(), Error> { /* ... */ }
///     async fn health_check(&self) -> Result<(), Error> { /* ... */ }
/// }
/// ```
#[async_trait]
pub trait RepositoryProvider: AccountRepositoryProvider {
    /// Run migrations for all repositories
    async fn migrate(&self) -> Result<(), Error>;

    /// Health check for all repositories
    async fn health_check(&self) -> Result<(), Error>;
}
