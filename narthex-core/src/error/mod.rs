use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Authentication error: {0}")]
    Auth(#[from] AuthError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Account not found")]
    AccountNotFound,

    #[error("Account already exists")]
    AccountAlreadyExists,
}

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Migration error: {0}")]
    Migration(String),

    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Record not found")]
    NotFound,
}

#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("Invalid email format: {0}")]
    InvalidEmail(String),

    #[error("Invalid password: {0}")]
    InvalidPassword(String),

    #[error("Invalid name: {0}")]
    InvalidName(String),

    #[error("Invalid document: {0}")]
    InvalidDocument(String),

    #[error("Missing required field: {0}")]
    MissingField(String),
}

/// Errors raised while building a [`LockoutConfig`](crate::LockoutConfig).
///
/// These are startup errors: a guard is never constructed from a config
/// that failed validation.
#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("max_attempts must be greater than zero")]
    ZeroMaxAttempts,

    #[error("base_lock_minutes must be greater than zero")]
    ZeroBaseLock,

    #[error("lock_multiplier must be a finite number greater than 1, got {0}")]
    InvalidMultiplier(f64),

    #[error("max_lock_minutes ({max}) must be at least base_lock_minutes ({base})")]
    MaxBelowBase { base: u32, max: u32 },

    #[error("Invalid value for {name}: {value}")]
    InvalidEnvVar { name: String, value: String },
}

impl Error {
    pub fn is_auth_error(&self) -> bool {
        matches!(self, Error::Auth(_))
    }

    pub fn is_validation_error(&self) -> bool {
        matches!(self, Error::Validation(_))
    }

    pub fn is_storage_error(&self) -> bool {
        matches!(self, Error::Storage(_))
    }

    pub fn is_config_error(&self) -> bool {
        matches!(self, Error::Config(_))
    }

    /// Suggested HTTP status for an error that escaped the login flow.
    ///
    /// Validation problems are the caller's fault (400); a duplicate
    /// registration is a conflict (409); everything else is internal (500).
    pub fn status_code(&self) -> u16 {
        match self {
            Error::Validation(_) => 400,
            Error::Auth(AuthError::AccountNotFound) => 404,
            Error::Auth(AuthError::AccountAlreadyExists) => 409,
            Error::Storage(_) | Error::Config(_) => 500,
        }
    }
}
