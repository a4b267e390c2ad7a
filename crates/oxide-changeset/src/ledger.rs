//! Ledger data model.
//!
//! A [`Migration`] is built fresh for every changeset file found on disk and
//! is also the shape of one ledger row. The [`Ledger`] is the set of rows a
//! backend has recorded so far.

use chrono::{DateTime, Utc};
use serde::Serialize;

/// A changeset, either discovered on disk or read back from the ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Migration {
    /// Row id in the ledger table (0 for changesets not yet recorded).
    pub id: i64,
    /// Display name: everything after the `__` separator.
    pub name: String,
    /// Original file name. This is the unique key shared with the ledger.
    pub file: String,
    /// Numeric version prefix of the file name.
    pub version: i64,
    /// When the changeset was applied.
    pub created_at: Option<DateTime<Utc>>,
    /// CRC32 of the file content.
    pub checksum: i64,
    /// Set once the changeset has been executed and recorded.
    pub success: bool,
}

impl Migration {
    /// Creates an unapplied migration with the given identity.
    #[must_use]
    pub fn new(version: i64, name: impl Into<String>, file: impl Into<String>) -> Self {
        Self {
            id: 0,
            name: name.into(),
            file: file.into(),
            version,
            created_at: None,
            checksum: 0,
            success: false,
        }
    }

    /// Sets the checksum.
    #[must_use]
    pub fn with_checksum(mut self, checksum: i64) -> Self {
        self.checksum = checksum;
        self
    }

    /// Returns true if `file` names the same changeset, ignoring case.
    #[must_use]
    pub fn is_file(&self, file: &str) -> bool {
        self.file
            .chars()
            .flat_map(char::to_lowercase)
            .eq(file.chars().flat_map(char::to_lowercase))
    }
}

/// Changesets previously applied to a database.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Ledger {
    /// Name of the ledger table.
    pub table_name: String,
    /// Applied rows.
    pub migrations: Vec<Migration>,
    /// Version of the most recently applied row, 0 when empty.
    pub version: i64,
}

impl Ledger {
    /// Builds a ledger from its rows, deriving the current version from the
    /// row with the highest version.
    #[must_use]
    pub fn from_rows(table_name: impl Into<String>, mut migrations: Vec<Migration>) -> Self {
        migrations.sort_by_key(|m| m.version);
        let version = migrations.last().map_or(0, |m| m.version);
        Self {
            table_name: table_name.into(),
            migrations,
            version,
        }
    }

    /// Returns true if no changeset has been applied.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.migrations.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_rows_sorts_and_takes_last_version() {
        let ledger = Ledger::from_rows(
            "ledger",
            vec![
                Migration::new(10, "c.sql", "10__c.sql"),
                Migration::new(1, "a.sql", "1__a.sql"),
                Migration::new(9, "b.sql", "9__b.sql"),
            ],
        );
        let versions: Vec<i64> = ledger.migrations.iter().map(|m| m.version).collect();
        assert_eq!(versions, vec![1, 9, 10]);
        assert_eq!(ledger.version, 10);
    }

    #[test]
    fn test_empty_ledger_is_version_zero() {
        let ledger = Ledger::from_rows("ledger", Vec::new());
        assert!(ledger.is_empty());
        assert_eq!(ledger.version, 0);
    }

    #[test]
    fn test_is_file_ignores_case() {
        let row = Migration::new(3, "x.sql", "0003__x.sql");
        assert!(row.is_file("0003__X.SQL"));
        assert!(!row.is_file("0004__x.sql"));
    }
}
