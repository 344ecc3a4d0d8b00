//! Kiosk configuration
//!
//! Loaded from TOML; every field has a default so an empty file is valid.
//!
//! ```toml
//! [session]
//! inactivity_timeout_ms = 30000
//! completion_display_ms = 5000
//! shuffle_seed = 7
//!
//! [cache]
//! max_capacity = 1000
//! invalidate_on_settled = true
//! ```

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Top-level configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct KioskConfig {
    /// Session timing and ordering
    pub session: SessionConfig,
    /// Client cache behaviour
    pub cache: CacheConfig,
}

impl KioskConfig {
    /// Create default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse from a TOML string and validate
    ///
    /// # Errors
    /// [`ConfigError::Parse`] on malformed TOML, [`ConfigError::ZeroDuration`]
    /// on zero timings.
    pub fn from_toml_str(input: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(input)?;
        config.validate()?;
        Ok(config)
    }

    /// Read a TOML file and validate
    ///
    /// # Errors
    /// [`ConfigError::Io`] if the file cannot be read, otherwise as
    /// [`KioskConfig::from_toml_str`].
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&raw)
    }

    /// Reject unusable values
    ///
    /// # Errors
    /// [`ConfigError::ZeroDuration`] if either session timer is zero.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.session.inactivity_timeout_ms == 0 {
            return Err(ConfigError::ZeroDuration("session.inactivity_timeout_ms"));
        }
        if self.session.completion_display_ms == 0 {
            return Err(ConfigError::ZeroDuration("session.completion_display_ms"));
        }
        Ok(())
    }

    /// With inactivity timeout
    #[inline]
    #[must_use]
    pub fn with_inactivity_timeout(mut self, timeout: Duration) -> Self {
        self.session.inactivity_timeout_ms = duration_ms(timeout);
        self
    }

    /// With post-completion display period
    #[inline]
    #[must_use]
    pub fn with_completion_display(mut self, display: Duration) -> Self {
        self.session.completion_display_ms = duration_ms(display);
        self
    }

    /// With a fixed shuffle seed
    #[inline]
    #[must_use]
    pub fn with_shuffle_seed(mut self, seed: u64) -> Self {
        self.session.shuffle_seed = Some(seed);
        self
    }
}

/// Session timing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Quiet period before an abandoned session is submitted as partial
    pub inactivity_timeout_ms: u64,
    /// How long the thank-you screen stays before the next session
    pub completion_display_ms: u64,
    /// Seed for question shuffling; random per process when unset
    pub shuffle_seed: Option<u64>,
}

impl SessionConfig {
    /// Inactivity timeout as a duration
    #[inline]
    #[must_use]
    pub fn inactivity_timeout(&self) -> Duration {
        Duration::from_millis(self.inactivity_timeout_ms)
    }

    /// Completion display period as a duration
    #[inline]
    #[must_use]
    pub fn completion_display(&self) -> Duration {
        Duration::from_millis(self.completion_display_ms)
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            inactivity_timeout_ms: 30_000,
            completion_display_ms: 5_000,
            shuffle_seed: None,
        }
    }
}

/// Client cache behaviour
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Maximum cached query entries
    pub max_capacity: u64,
    /// Mark the mutated key stale once a mutation settles
    pub invalidate_on_settled: bool,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_capacity: 1_000,
            invalidate_on_settled: true,
        }
    }
}

fn duration_ms(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}
