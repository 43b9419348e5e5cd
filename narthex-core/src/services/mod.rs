//! Service layer for business logic
//!
//! - [`LoginGuard`] decides login attempts and maintains lockout state
//! - [`AccountService`] registers accounts and exposes administrative
//!   unlock and status queries
//! - [`credential`] holds the hashing and verification seams

pub mod account;
pub mod credential;
pub mod login_guard;

pub use account::{AccountService, LockoutStatus};
pub use credential::{CredentialHasher, CredentialVerifier, PasswordAuthVerifier};
pub use login_guard::{LockRemaining, LoginGuard, LoginOutcome, OutcomeKind};
