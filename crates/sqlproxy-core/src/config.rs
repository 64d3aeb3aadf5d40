//! Configuration
//!
//! Parsed from TOML. Every section is optional:
//!
//! ```toml
//! logging = "production"
//!
//! [dialect]
//! kind = "sqlite"
//! schema_file = "/var/lib/app/elements.db"
//!
//! [allocator]
//! kind = "compare_and_swap"
//! max_attempts = 16
//!
//! [store]
//! path = "/var/lib/app/main.db"
//! wal = true
//! ```

#![allow(clippy::result_large_err)]

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::allocator::AllocatorStrategy;
use crate::dialect::{Dialect, SQLITE_IN_MEMORY};
use crate::errors::{ProxyError, Result};
use crate::logging_facility::Profile;
use crate::root::RootOptions;

/// Connection settings for the embedded SQLite executor
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StoreConfig {
    /// Main database file; in-memory when absent
    #[serde(default)]
    pub path: Option<PathBuf>,
    /// Switch the main database to WAL journaling
    #[serde(default)]
    pub wal: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProxyConfig {
    #[serde(default)]
    pub dialect: Dialect,
    #[serde(default)]
    pub allocator: AllocatorStrategy,
    #[serde(default)]
    pub logging: Profile,
    #[serde(default)]
    pub store: StoreConfig,
}

fn invalid(reason: impl Into<String>) -> ProxyError {
    ProxyError::InvalidConfig {
        reason: reason.into(),
    }
}

impl ProxyConfig {
    /// Parse and validate a TOML document
    pub fn from_toml_str(input: &str) -> Result<Self> {
        let config: ProxyConfig = toml::from_str(input).map_err(|e| invalid(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a TOML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let input = std::fs::read_to_string(path)
            .map_err(|e| invalid(format!("cannot read {}: {}", path.display(), e)))?;
        Self::from_toml_str(&input)
    }

    pub fn validate(&self) -> Result<()> {
        if let AllocatorStrategy::CompareAndSwap { max_attempts: 0 } = self.allocator {
            return Err(invalid("allocator.max_attempts must be at least 1").into());
        }
        if let Dialect::Sqlite { schema_file } = &self.dialect {
            if schema_file.trim().is_empty() {
                return Err(invalid("dialect.schema_file must not be empty").into());
            }
            if schema_file == SQLITE_IN_MEMORY && self.store.path.is_some() {
                return Err(invalid(
                    "store.path needs a file-backed dialect.schema_file, elements would not persist",
                )
                .into());
            }
        }
        if self.store.wal && self.store.path.is_none() {
            return Err(invalid("store.wal requires store.path").into());
        }
        Ok(())
    }

    /// Install the global subscriber for the configured profile
    pub fn init_logging(&self) {
        crate::logging_facility::init(self.logging);
    }

    /// Options for [`crate::root::RootElement::with_options`]
    pub fn root_options(&self) -> RootOptions {
        RootOptions {
            dialect: self.dialect.clone(),
            allocator: self.allocator,
        }
    }
}
