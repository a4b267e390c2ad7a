//! Error types for changeset reconciliation.

use crate::filename::FileNameError;

/// Errors that can occur while reconciling changesets against the ledger.
///
/// Every variant is fatal for the run that produced it: the active
/// transaction is rolled back and nothing from that run is committed.
#[derive(Debug, thiserror::Error)]
pub enum MigrateError {
    /// Configuration was missing or incomplete.
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// The database URL does not name a supported backend.
    #[error("Unsupported database URL: {0}")]
    UnsupportedDatabase(String),

    /// Database error while reading the ledger or managing the transaction.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// The ledger has rows but reports version zero.
    #[error(
        "Current migration version {version} does not correspond to number of migrations ({count})"
    )]
    CorruptLedger {
        /// Version reported by the ledger.
        version: i64,
        /// Number of rows in the ledger.
        count: usize,
    },

    /// The changeset directory could not be listed.
    #[error("Error reading directory entries of '{path}': {source}")]
    ReadDir {
        /// Directory within the changeset source.
        path: String,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// A changeset file name does not follow the `<digits>__<name>` grammar.
    #[error(transparent)]
    InvalidFileName(#[from] FileNameError),

    /// A changeset file could not be read while computing its checksum.
    #[error("{file}: failed to calculate file checksum: {source}")]
    Checksum {
        /// Changeset file name.
        file: String,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// An applied changeset changed on disk.
    #[error("{file}: migration file checksum conflict. expected {expected}, found {found}")]
    ChecksumMismatch {
        /// Changeset file name.
        file: String,
        /// Checksum recorded in the ledger.
        expected: i64,
        /// Checksum of the current file content.
        found: i64,
    },

    /// A new changeset claims a version that is already taken.
    #[error("{file}: migration version {version} already applied")]
    VersionConflict {
        /// Changeset file name.
        file: String,
        /// The contested version.
        version: i64,
    },

    /// A new changeset is older than the ledger and out-of-order is disabled.
    #[error(
        "{file}: version {version} is behind current version {current}. Enable out of order to migrate this script"
    )]
    OutOfOrder {
        /// Changeset file name.
        file: String,
        /// Version of the changeset.
        version: i64,
        /// Current ledger version.
        current: i64,
    },

    /// Reading, executing or recording a changeset failed.
    #[error("{file}: migration failed: {source}")]
    Apply {
        /// Changeset file name.
        file: String,
        /// What went wrong.
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

impl MigrateError {
    /// Wraps an error raised while applying the changeset `file`.
    pub fn apply(
        file: impl Into<String>,
        source: impl Into<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        Self::Apply {
            file: file.into(),
            source: source.into(),
        }
    }
}

/// Result type for changeset operations.
pub type Result<T> = std::result::Result<T, MigrateError>;
