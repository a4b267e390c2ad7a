//! Versioned SQL changesets with a checksummed ledger.
//!
//! `oxide-changeset` applies `.sql` files to a database in version order and
//! records each one in a ledger table, so that later runs can tell what has
//! already been applied and whether it has changed on disk since.
//!
//! # Changesets
//!
//! A changeset is a file named `<version>__<name>.sql`, e.g.
//! `0001__create_users.sql`. The version is the numeric prefix and orders
//! the files; the file name itself is the key stored in the ledger.
//!
//! # Reconciliation
//!
//! Every run compares the changeset directory with the ledger:
//!
//! - **Recorded, same checksum** - already applied, nothing to do
//! - **Recorded, different checksum** - the file drifted; the run fails
//! - **New, same version as the ledger** - version conflict; the run fails
//! - **New, older than the ledger** - applied only with out-of-order enabled
//! - **New, newer than the ledger** - applied
//!
//! All changesets applied by a run share one transaction: either all of
//! them are committed or none is.
//!
//! # Example
//!
//! ```rust,ignore
//! use oxide_changeset::prelude::*;
//!
//! let config = Config::new(DirSource::new("."), "db/migrations");
//! let ds = SqlDataSource::connect("sqlite:app.db", &config).await?;
//! let report = Migrator::new(false).migrate(&ds).await?;
//! println!("applied {} changesets", report.applied.len());
//! ```
//!
//! # CLI Usage
//!
//! ```bash
//! # Apply pending changesets
//! oxide-changeset --database sqlite:app.db --dir db/migrations migrate
//!
//! # Show applied and pending changesets
//! oxide-changeset --database sqlite:app.db --dir db/migrations status
//! ```

pub mod checksum;
pub mod config;
pub mod datasource;
pub mod dialect;
pub mod engine;
pub mod error;
pub mod filename;
pub mod ledger;
pub mod source;
pub mod sql;

pub use engine::migrate;

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::checksum::{checksum_bytes, checksum_file, checksum_reader};
    pub use crate::config::{validate_config, Config, DEFAULT_TABLE_NAME};
    pub use crate::datasource::{ChangesetTransaction, DataSource};
    pub use crate::dialect::{
        dialect_for_url, LedgerDialect, MySqlDialect, PostgresDialect, SqliteDialect,
    };
    pub use crate::engine::{
        classify, migrate, MigrationReport, Migrator, PlannedChangeset, Verdict,
    };
    pub use crate::error::{MigrateError, Result};
    pub use crate::filename::{extract_version, parse_migration, FileNameError, FileNameErrorKind};
    pub use crate::ledger::{Ledger, Migration};
    pub use crate::source::{
        sort_entries, ChangesetEntry, ChangesetSource, DirSource, EntryKind, MemorySource,
    };
    pub use crate::sql::{SqlDataSource, SqlTransaction};
}
