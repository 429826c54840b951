//! Connection configuration.
//!
//! A [`DatabaseConfig`] is the full option set a backend needs to open a
//! connection. Options that some backends only accept at open time (the busy
//! timeout in particular) live here, so a facade can merge a change into the
//! config and reopen.

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::ops::{BitOr, BitOrAssign};
use std::path::Path;
use std::time::Duration;

/// Path that asks the backend for a private in-memory database.
pub const MEMORY_PATH: &str = ":memory:";

/// Flags controlling how the database is opened.
///
/// With no flags set the database is opened for reading and writing and the
/// file is created if it does not exist.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OpenFlags {
    /// Open for reading only.
    pub read_only: bool,
    /// Share one page cache between connections to the same file in this process.
    pub shared_cache: bool,
}

impl OpenFlags {
    /// Bit value of [`OpenFlags::READ_ONLY`] in [`OpenFlags::bits`].
    pub const READ_ONLY_BIT: u32 = 0b01;
    /// Bit value of [`OpenFlags::SHARED_CACHE`] in [`OpenFlags::bits`].
    pub const SHARED_CACHE_BIT: u32 = 0b10;

    pub const READ_ONLY: Self = Self {
        read_only: true,
        shared_cache: false,
    };

    pub const SHARED_CACHE: Self = Self {
        read_only: false,
        shared_cache: true,
    };

    /// No flags: read-write, create if missing.
    pub const fn empty() -> Self {
        Self {
            read_only: false,
            shared_cache: false,
        }
    }

    /// Build flags from an integer bitset. Unknown bits are ignored.
    pub const fn from_bits(bits: u32) -> Self {
        Self {
            read_only: bits & Self::READ_ONLY_BIT != 0,
            shared_cache: bits & Self::SHARED_CACHE_BIT != 0,
        }
    }

    /// The integer bitset for these flags.
    pub const fn bits(self) -> u32 {
        let mut bits = 0;
        if self.read_only {
            bits |= Self::READ_ONLY_BIT;
        }
        if self.shared_cache {
            bits |= Self::SHARED_CACHE_BIT;
        }
        bits
    }
}

impl BitOr for OpenFlags {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self {
            read_only: self.read_only || rhs.read_only,
            shared_cache: self.shared_cache || rhs.shared_cache,
        }
    }
}

impl BitOrAssign for OpenFlags {
    fn bitor_assign(&mut self, rhs: Self) {
        *self = *self | rhs;
    }
}

impl From<u32> for OpenFlags {
    fn from(bits: u32) -> Self {
        Self::from_bits(bits)
    }
}

/// Configuration for opening a database connection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Path to the database file, or ":memory:" for an in-memory database.
    pub path: String,
    /// Open flags.
    #[serde(default)]
    pub flags: OpenFlags,
    /// How long a locked write waits before failing, in milliseconds. 0 disables waiting.
    #[serde(default)]
    pub busy_timeout_ms: u32,
    /// Lower the backend's maximum text/blob length to this many bytes.
    #[serde(default)]
    pub max_length: Option<usize>,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self::memory()
    }
}

impl DatabaseConfig {
    /// Create a new config for a file-based database.
    pub fn file(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            flags: OpenFlags::empty(),
            busy_timeout_ms: 0,
            max_length: None,
        }
    }

    /// Create a new config for an in-memory database.
    pub fn memory() -> Self {
        Self::file(MEMORY_PATH)
    }

    /// Set open flags.
    #[must_use]
    pub fn flags(mut self, flags: OpenFlags) -> Self {
        self.flags = flags;
        self
    }

    /// Set the busy timeout. Saturates at `u32::MAX` milliseconds.
    #[must_use]
    pub fn busy_timeout(mut self, timeout: Duration) -> Self {
        self.busy_timeout_ms = u32::try_from(timeout.as_millis()).unwrap_or(u32::MAX);
        self
    }

    /// Cap the length of any single text or blob value.
    ///
    /// The cap holds even below the smallest limit SQLite itself accepts.
    #[must_use]
    pub fn max_length(mut self, bytes: usize) -> Self {
        self.max_length = Some(bytes);
        self
    }

    /// The busy timeout as a duration, or `None` when waiting is disabled.
    pub fn busy_timeout_duration(&self) -> Option<Duration> {
        (self.busy_timeout_ms > 0).then(|| Duration::from_millis(u64::from(self.busy_timeout_ms)))
    }

    /// Is this an in-memory database?
    pub fn is_memory(&self) -> bool {
        self.path == MEMORY_PATH
    }

    /// Check the config for values no backend can open.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.path.is_empty() {
            return Err(ConfigError {
                message: "database path is empty".to_string(),
                source: None,
            });
        }
        if self.path.contains('\0') {
            return Err(ConfigError {
                message: "database path contains a null byte".to_string(),
                source: None,
            });
        }
        Ok(())
    }

    /// Parse and validate a config from JSON.
    ///
    /// ```
    /// use embedsql_core::DatabaseConfig;
    ///
    /// let config = DatabaseConfig::from_json(
    ///     r#"{ "path": "cache.db", "flags": { "read_only": true }, "busy_timeout_ms": 250 }"#,
    /// )
    /// .unwrap();
    /// assert!(config.flags.read_only);
    /// assert_eq!(config.busy_timeout_ms, 250);
    /// ```
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json).map_err(|e| ConfigError {
            message: format!("invalid database config: {e}"),
            source: Some(Box::new(e)),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Read a JSON config file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|e| ConfigError {
            message: format!("cannot read {}: {e}", path.display()),
            source: Some(Box::new(e)),
        })?;
        tracing::debug!(path = %path.display(), "Loaded database config");
        Self::from_json(&json)
    }
}
