//! Password hashing and verification.
//!
//! The login guard only ever asks "does this plaintext match the stored
//! hash?", so verification and hashing are split into two traits. Account
//! registration needs both; the guard only needs [`CredentialVerifier`].

use std::sync::LazyLock;

/// Checks a plaintext credential against a stored hash.
pub trait CredentialVerifier: Send + Sync + 'static {
    /// `true` only on an exact match. A malformed stored hash is a mismatch.
    fn matches(&self, stored_hash: &str, plaintext: &str) -> bool;

    /// A well-formed hash that no password matches.
    ///
    /// The guard verifies against it when the document is unknown, so that
    /// path costs as much as a wrong password on a real account.
    fn dummy_hash(&self) -> &str;
}

/// Produces the hash stored for a new credential.
pub trait CredentialHasher: Send + Sync + 'static {
    fn hash(&self, plaintext: &str) -> String;
}

// Hashed once per process with the same parameters as real credentials.
static DUMMY_HASH: LazyLock<String> =
    LazyLock::new(|| password_auth::generate_hash("narthex: no account has this credential"));

/// Argon2 PHC-string hashing through `password-auth`.
#[derive(Debug, Clone, Copy, Default)]
pub struct PasswordAuthVerifier;

impl PasswordAuthVerifier {
    pub fn new() -> Self {
        // Pay for the dummy hash up front rather than on the first unknown login.
        LazyLock::force(&DUMMY_HASH);
        Self
    }
}

impl CredentialVerifier for PasswordAuthVerifier {
    fn matches(&self, stored_hash: &str, plaintext: &str) -> bool {
        match password_auth::verify_password(plaintext, stored_hash) {
            Ok(()) => true,
            Err(password_auth::VerifyError::PasswordInvalid) => false,
            Err(e) => {
                tracing::warn!(error = %e, "Stored credential hash could not be parsed");
                false
            }
        }
    }

    fn dummy_hash(&self) -> &str {
        &DUMMY_HASH
    }
}

impl CredentialHasher for PasswordAuthVerifier {
    fn hash(&self, plaintext: &str) -> String {
        password_auth::generate_hash(plaintext)
    }
}
