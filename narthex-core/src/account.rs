//! Accounts and their security state
//!
//! An account is identified externally by a document (type + number) and
//! internally by an opaque [`AccountId`]. The fields relevant to the lockout
//! guard are grouped in [`AccountSecurityRecord`]:
//!
//! | Field             | Type               | Description                                              |
//! | ----------------- | ------------------ | -------------------------------------------------------- |
//! | `failed_attempts` | `u32`              | Consecutive failures in the current counting cycle.      |
//! | `locked_until`    | `Option<DateTime>` | Lock expiry. In the past means logically unlocked.       |
//! | `lock_count`      | `u32`              | Locks served since the last successful authentication.   |
//! | `credential_hash` | `String`           | Opaque hash handed to the credential verifier.           |
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    error::ValidationError,
    id::{generate_prefixed_id, validate_prefixed_id},
};

/// A unique, stable identifier for an account.
///
/// Treat this value as opaque.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Hash)]
pub struct AccountId(String);

impl AccountId {
    pub fn new(id: &str) -> Self {
        AccountId(id.to_string())
    }

    pub fn new_random() -> Self {
        AccountId(generate_prefixed_id("acc"))
    }

    pub fn into_inner(self) -> String {
        self.0
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Validate that this ID has the correct format for an account ID
    pub fn is_valid(&self) -> bool {
        validate_prefixed_id(&self.0, "acc")
    }
}

impl Default for AccountId {
    fn default() -> Self {
        Self::new_random()
    }
}

impl From<String> for AccountId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for AccountId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// An account as returned to callers. Never carries the credential hash.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Account {
    pub id: AccountId,

    // Identity document, e.g. ("CC", "1032456789").
    pub document_type: String,
    pub document_number: String,

    pub first_name: String,
    pub last_name: String,
    pub email: Option<String>,
    pub role: Option<String>,

    // The login account itself may be disabled...
    pub account_active: bool,
    // ...or the person profile it belongs to.
    pub profile_active: bool,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Account {
    /// Both the account and its profile must be active for a login to succeed.
    pub fn is_active(&self) -> bool {
        self.account_active && self.profile_active
    }

    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

/// Everything the login guard needs to know about an account.
#[derive(Clone, PartialEq)]
pub struct AccountSecurityRecord {
    pub account: Account,
    pub credential_hash: String,
    pub failed_attempts: u32,
    pub locked_until: Option<DateTime<Utc>>,
    pub lock_count: u32,
}

impl AccountSecurityRecord {
    pub fn id(&self) -> &AccountId {
        &self.account.id
    }

    pub fn is_active(&self) -> bool {
        self.account.is_active()
    }

    /// Locked means `locked_until` is strictly in the future.
    pub fn is_locked_at(&self, now: DateTime<Utc>) -> bool {
        self.locked_until.is_some_and(|until| until > now)
    }

    /// A lock that was set and has since run out.
    pub fn has_expired_lock_at(&self, now: DateTime<Utc>) -> bool {
        self.locked_until.is_some_and(|until| until <= now)
    }

    pub fn into_account(self) -> Account {
        self.account
    }
}

impl fmt::Debug for AccountSecurityRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccountSecurityRecord")
            .field("account", &self.account)
            .field("credential_hash", &"[redacted]")
            .field("failed_attempts", &self.failed_attempts)
            .field("locked_until", &self.locked_until)
            .field("lock_count", &self.lock_count)
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewAccount {
    pub id: AccountId,
    pub document_type: String,
    pub document_number: String,
    pub first_name: String,
    pub last_name: String,
    pub email: Option<String>,
    pub role: Option<String>,
}

impl NewAccount {
    pub fn builder() -> NewAccountBuilder {
        NewAccountBuilder::default()
    }
}

#[derive(Default)]
pub struct NewAccountBuilder {
    id: Option<AccountId>,
    document_type: Option<String>,
    document_number: Option<String>,
    first_name: Option<String>,
    last_name: Option<String>,
    email: Option<String>,
    role: Option<String>,
}

impl NewAccountBuilder {
    pub fn id(mut self, id: AccountId) -> Self {
        self.id = Some(id);
        self
    }

    pub fn document(mut self, document_type: &str, document_number: &str) -> Self {
        self.document_type = Some(document_type.to_string());
        self.document_number = Some(document_number.trim().to_string());
        self
    }

    pub fn first_name(mut self, first_name: &str) -> Self {
        self.first_name = Some(first_name.to_string());
        self
    }

    pub fn last_name(mut self, last_name: &str) -> Self {
        self.last_name = Some(last_name.to_string());
        self
    }

    pub fn email(mut self, email: &str) -> Self {
        self.email = Some(email.to_string());
        self
    }

    pub fn role(mut self, role: &str) -> Self {
        self.role = Some(role.to_string());
        self
    }

    pub fn build(self) -> Result<NewAccount, ValidationError> {
        let missing = |field: &str| ValidationError::MissingField(format!("{field} is required"));

        Ok(NewAccount {
            id: self.id.unwrap_or_default(),
            document_type: self.document_type.ok_or_else(|| missing("Document type"))?,
            document_number: self.document_number.ok_or_else(|| missing("Document number"))?,
            first_name: self.first_name.ok_or_else(|| missing("First name"))?,
            last_name: self.last_name.ok_or_else(|| missing("Last name"))?,
            email: self.email,
            role: self.role,
        })
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;

    pub fn account(id: &str) -> Account {
        let now = Utc::now();
        Account {
            id: AccountId::new(id),
            document_type: "CC".to_string(),
            document_number: "1032456789".to_string(),
            first_name: "Lucia".to_string(),
            last_name: "Restrepo".to_string(),
            email: Some("lucia@parroquia.example".to_string()),
            role: Some("Secretaria".to_string()),
            account_active: true,
            profile_active: true,
            created_at: now,
            updated_at: now,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn record(locked_until: Option<DateTime<Utc>>) -> AccountSecurityRecord {
        AccountSecurityRecord {
            account: test_support::account("acc_test"),
            credential_hash: "$argon2id$secret".to_string(),
            failed_attempts: 0,
            locked_until,
            lock_count: 0,
        }
    }

    #[test]
    fn test_account_id_random_is_valid() {
        let id = AccountId::new_random();
        assert!(id.is_valid());
        assert!(id.as_str().starts_with("acc_"));
        assert!(!AccountId::new("usr_abc").is_valid());
    }

    #[test]
    fn test_lock_state_at_instant() {
        let now = Utc::now();

        let unlocked = record(None);
        assert!(!unlocked.is_locked_at(now));
        assert!(!unlocked.has_expired_lock_at(now));

        let locked = record(Some(now + Duration::minutes(5)));
        assert!(locked.is_locked_at(now));
        assert!(!locked.has_expired_lock_at(now));

        // The boundary instant counts as expired.
        let boundary = record(Some(now));
        assert!(!boundary.is_locked_at(now));
        assert!(boundary.has_expired_lock_at(now));
    }

    #[test]
    fn test_is_active_requires_both_flags() {
        let mut account = test_support::account("acc_test");
        assert!(account.is_active());

        account.profile_active = false;
        assert!(!account.is_active());

        account.profile_active = true;
        account.account_active = false;
        assert!(!account.is_active());
    }

    #[test]
    fn test_debug_redacts_credential_hash() {
        let rendered = format!("{:?}", record(None));
        assert!(rendered.contains("[redacted]"));
        assert!(!rendered.contains("argon2id"));
    }

    #[test]
    fn test_new_account_builder() {
        let account = NewAccount::builder()
            .document("CC", "  1032456789 ")
            .first_name("Lucia")
            .last_name("Restrepo")
            .build()
            .unwrap();
        assert_eq!(account.document_number, "1032456789");
        assert!(account.id.is_valid());
        assert!(account.email.is_none());

        let missing = NewAccount::builder().first_name("Lucia").build();
        assert!(matches!(missing, Err(ValidationError::MissingField(_))));
    }
}
