//! Changeset configuration.

use std::sync::Arc;

use crate::error::{MigrateError, Result};
use crate::source::ChangesetSource;

/// Ledger table name used when none is configured.
pub const DEFAULT_TABLE_NAME: &str = "oxide_changesets";

/// Where changesets come from and how they are reconciled.
#[derive(Debug, Clone, Default)]
pub struct Config {
    /// Changeset files.
    pub source: Option<Arc<dyn ChangesetSource>>,
    /// Directory within `source` holding the changesets.
    pub base_path: String,
    /// Ledger table name; blank means [`DEFAULT_TABLE_NAME`].
    pub table_name: Option<String>,
    /// Apply changesets older than the current ledger version.
    pub out_of_order: bool,
}

impl Config {
    /// Creates a configuration reading changesets from `base_path` within `source`.
    pub fn new(source: impl ChangesetSource + 'static, base_path: impl Into<String>) -> Self {
        Self {
            source: Some(Arc::new(source)),
            base_path: base_path.into(),
            table_name: None,
            out_of_order: false,
        }
    }

    /// Overrides the ledger table name.
    #[must_use]
    pub fn table_name(mut self, name: impl Into<String>) -> Self {
        self.table_name = Some(name.into());
        self
    }

    /// Sets the out-of-order policy.
    #[must_use]
    pub fn out_of_order(mut self, enabled: bool) -> Self {
        self.out_of_order = enabled;
        self
    }

    /// Checks that a changeset source and base path are present.
    ///
    /// # Errors
    ///
    /// Returns [`MigrateError::Config`] describing the first missing setting.
    pub fn validate(&self) -> Result<()> {
        if self.source.is_none() {
            return Err(MigrateError::Config(
                "missing migration changeset source".to_string(),
            ));
        }
        if self.base_path.trim().is_empty() {
            return Err(MigrateError::Config("empty base path".to_string()));
        }
        Ok(())
    }

    /// Returns the configured table name, or the default when blank.
    #[must_use]
    pub fn table_name_or_default(&self) -> &str {
        match self.table_name.as_deref() {
            Some(name) if !name.trim().is_empty() => name,
            _ => DEFAULT_TABLE_NAME,
        }
    }
}

/// Validates an optional configuration.
///
/// # Errors
///
/// Returns [`MigrateError::Config`] if `config` is absent or invalid.
pub fn validate_config(config: Option<&Config>) -> Result<&Config> {
    let config =
        config.ok_or_else(|| MigrateError::Config("missing configuration".to_string()))?;
    config.validate()?;
    Ok(config)
}
