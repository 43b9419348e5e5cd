//! Core functionality for the narthex project
//!
//! This crate contains the account model, the progressive lockout policy and
//! the [`LoginGuard`] that applies it, along with the repository traits that
//! storage backends implement.
//!
//! Application code normally goes through the `narthex` facade crate; use
//! this crate directly when writing a storage backend or wiring the services
//! by hand.
//!
//! See [`LockoutConfig`] for the policy, [`LoginGuard`] for the login flow
//! and [`repositories::AccountRepository`] for the storage contract.
pub mod account;
pub mod clock;
pub mod error;
pub mod id;
pub mod lockout;
pub mod repositories;
pub mod services;
pub mod validation;

pub use account::{Account, AccountId, AccountSecurityRecord, NewAccount};
pub use clock::{Clock, ManualClock, SystemClock};
pub use error::Error;
pub use lockout::{LockEscalation, LockExamples, LockoutConfig, SecuritySettings};
pub use repositories::{AccountRepository, RepositoryProvider};
pub use services::{
    AccountService, CredentialHasher, CredentialVerifier, LockRemaining, LockoutStatus,
    LoginGuard, LoginOutcome, OutcomeKind, PasswordAuthVerifier,
};
