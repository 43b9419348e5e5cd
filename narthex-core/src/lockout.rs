//! Progressive lockout policy.
//!
//! A [`LockoutConfig`] is validated once when it is built and never mutated
//! afterwards. The lock duration for the `n`-th lock (zero-based) is
//!
//! ```text
//! min(floor(base_lock_minutes * lock_multiplier ^ n), max_lock_minutes)
//! ```
//!
//! # Example
//!
//! ```rust
//! use narthex_core::LockoutConfig;
//!
//! let config = LockoutConfig::new(3, 60, 1.5, 480).unwrap();
//! assert_eq!(config.lock_duration_minutes(0), 60);
//! assert_eq!(config.lock_duration_minutes(1), 90);
//! assert_eq!(config.lock_duration_minutes(2), 135);
//! assert_eq!(config.lock_duration_minutes(50), 480);
//! ```

use chrono::Duration;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;
pub const DEFAULT_BASE_LOCK_MINUTES: u32 = 60;
pub const DEFAULT_LOCK_MULTIPLIER: f64 = 1.5;
pub const DEFAULT_MAX_LOCK_MINUTES: u32 = 480;

pub const ENV_MAX_ATTEMPTS: &str = "MAX_LOGIN_ATTEMPTS";
pub const ENV_BASE_LOCK_MINUTES: &str = "BASE_LOCK_DURATION_MINUTES";
pub const ENV_LOCK_MULTIPLIER: &str = "LOCK_MULTIPLIER";
pub const ENV_MAX_LOCK_MINUTES: &str = "MAX_LOCK_DURATION_MINUTES";
pub const ENV_LOCK_ESCALATION: &str = "LOCK_ESCALATION";

/// What happens to the lock tier when a lock runs out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LockEscalation {
    /// The tier survives expiry; only a successful login (or an explicit
    /// unlock) brings the account back to tier 0.
    #[default]
    AcrossCycles,
    /// An expired lock forgets its tier, so every lock is a first lock.
    PerCycle,
}

impl std::str::FromStr for LockEscalation {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "across_cycles" | "across-cycles" => Ok(LockEscalation::AcrossCycles),
            "per_cycle" | "per-cycle" => Ok(LockEscalation::PerCycle),
            _ => Err(ConfigError::InvalidEnvVar {
                name: ENV_LOCK_ESCALATION.to_string(),
                value: s.to_string(),
            }),
        }
    }
}

/// Immutable lockout configuration.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LockoutConfig {
    max_attempts: u32,
    base_lock_minutes: u32,
    lock_multiplier: f64,
    max_lock_minutes: u32,
    escalation: LockEscalation,
}

impl Default for LockoutConfig {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            base_lock_minutes: DEFAULT_BASE_LOCK_MINUTES,
            lock_multiplier: DEFAULT_LOCK_MULTIPLIER,
            max_lock_minutes: DEFAULT_MAX_LOCK_MINUTES,
            escalation: LockEscalation::default(),
        }
    }
}

impl LockoutConfig {
    /// Build a validated configuration.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] when any value is zero, the multiplier is not
    /// a finite number above 1, or the cap is below the base duration.
    pub fn new(
        max_attempts: u32,
        base_lock_minutes: u32,
        lock_multiplier: f64,
        max_lock_minutes: u32,
    ) -> Result<Self, ConfigError> {
        if max_attempts == 0 {
            return Err(ConfigError::ZeroMaxAttempts);
        }
        if base_lock_minutes == 0 {
            return Err(ConfigError::ZeroBaseLock);
        }
        if !lock_multiplier.is_finite() || lock_multiplier <= 1.0 {
            return Err(ConfigError::InvalidMultiplier(lock_multiplier));
        }
        if max_lock_minutes < base_lock_minutes {
            return Err(ConfigError::MaxBelowBase {
                base: base_lock_minutes,
                max: max_lock_minutes,
            });
        }

        Ok(Self {
            max_attempts,
            base_lock_minutes,
            lock_multiplier,
            max_lock_minutes,
            escalation: LockEscalation::default(),
        })
    }

    /// Read the configuration from the process environment.
    ///
    /// | Variable                     | Default         |
    /// | ---------------------------- | --------------- |
    /// | `MAX_LOGIN_ATTEMPTS`         | `3`             |
    /// | `BASE_LOCK_DURATION_MINUTES` | `60`            |
    /// | `LOCK_MULTIPLIER`            | `1.5`           |
    /// | `MAX_LOCK_DURATION_MINUTES`  | `480`           |
    /// | `LOCK_ESCALATION`            | `across_cycles` |
    ///
    /// Unset variables take their default. A value that is set but cannot be
    /// parsed is an error rather than being silently replaced.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Same as [`LockoutConfig::from_env`] with a caller-provided lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        fn parse<T: std::str::FromStr>(
            lookup: &impl Fn(&str) -> Option<String>,
            name: &str,
            default: T,
        ) -> Result<T, ConfigError> {
            match lookup(name) {
                None => Ok(default),
                Some(raw) => raw.trim().parse().map_err(|_| ConfigError::InvalidEnvVar {
                    name: name.to_string(),
                    value: raw,
                }),
            }
        }

        let config = Self::new(
            parse(&lookup, ENV_MAX_ATTEMPTS, DEFAULT_MAX_ATTEMPTS)?,
            parse(&lookup, ENV_BASE_LOCK_MINUTES, DEFAULT_BASE_LOCK_MINUTES)?,
            parse(&lookup, ENV_LOCK_MULTIPLIER, DEFAULT_LOCK_MULTIPLIER)?,
            parse(&lookup, ENV_MAX_LOCK_MINUTES, DEFAULT_MAX_LOCK_MINUTES)?,
        )?;

        let escalation = match lookup(ENV_LOCK_ESCALATION) {
            Some(raw) => raw.parse()?,
            None => LockEscalation::default(),
        };

        Ok(config.with_escalation(escalation))
    }

    pub fn with_escalation(mut self, escalation: LockEscalation) -> Self {
        self.escalation = escalation;
        self
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub fn base_lock_minutes(&self) -> u32 {
        self.base_lock_minutes
    }

    pub fn lock_multiplier(&self) -> f64 {
        self.lock_multiplier
    }

    pub fn max_lock_minutes(&self) -> u32 {
        self.max_lock_minutes
    }

    pub fn escalation(&self) -> LockEscalation {
        self.escalation
    }

    /// Minutes the `lock_count`-th lock lasts (zero-based).
    pub fn lock_duration_minutes(&self, lock_count: u32) -> u32 {
        lock_duration_minutes(self, lock_count)
    }

    pub fn lock_duration(&self, lock_count: u32) -> Duration {
        Duration::minutes(i64::from(self.lock_duration_minutes(lock_count)))
    }

    /// Zero-based tier for a failure that brought the counter to
    /// `failed_attempts`, given the tier already reached in earlier cycles.
    pub fn lock_tier(&self, failed_attempts: u32, prior_lock_count: u32) -> u32 {
        prior_lock_count.saturating_add(failed_attempts.saturating_sub(self.max_attempts))
    }

    /// Attempts left before the next failure locks the account.
    pub fn attempts_remaining(&self, failed_attempts: u32) -> u32 {
        self.max_attempts.saturating_sub(failed_attempts)
    }

    pub fn security_settings(&self) -> SecuritySettings {
        SecuritySettings {
            max_login_attempts: self.max_attempts,
            base_lock_duration_minutes: self.base_lock_minutes,
            lock_multiplier: self.lock_multiplier,
            max_lock_duration_minutes: self.max_lock_minutes,
            escalation: self.escalation,
            lock_examples: LockExamples {
                first_lock: self.lock_duration_minutes(0),
                second_lock: self.lock_duration_minutes(1),
                third_lock: self.lock_duration_minutes(2),
                max_lock: self.max_lock_minutes,
            },
        }
    }
}

/// Duration in minutes of the `lock_count`-th lock (zero-based).
///
/// Truncates to whole minutes and never exceeds the configured maximum.
/// Exponents large enough to overflow `f64` saturate at the maximum.
pub fn lock_duration_minutes(config: &LockoutConfig, lock_count: u32) -> u32 {
    let exponent = i32::try_from(lock_count).unwrap_or(i32::MAX);
    let exact = f64::from(config.base_lock_minutes) * config.lock_multiplier.powi(exponent);

    // `as` saturates, so an infinite product lands on u32::MAX before the clamp.
    (exact.floor() as u32).min(config.max_lock_minutes)
}

/// Read-only snapshot of the lockout policy, suitable for an admin endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SecuritySettings {
    pub max_login_attempts: u32,
    pub base_lock_duration_minutes: u32,
    pub lock_multiplier: f64,
    pub max_lock_duration_minutes: u32,
    pub escalation: LockEscalation,
    pub lock_examples: LockExamples,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LockExamples {
    pub first_lock: u32,
    pub second_lock: u32,
    pub third_lock: u32,
    pub max_lock: u32,
}
