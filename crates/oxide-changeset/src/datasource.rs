//! Backend contract consumed by the reconciliation engine.
//!
//! A [`DataSource`] owns the ledger and the changeset files of one target
//! database. Each run opens exactly one [`ChangesetTransaction`]; the
//! transaction is consumed by [`commit`](ChangesetTransaction::commit) or
//! [`rollback`](ChangesetTransaction::rollback), and an implementation must
//! roll back if it is dropped without either.

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::Result;
use crate::ledger::{Ledger, Migration};
use crate::source::ChangesetSource;

/// Ledger storage, changeset access and transactions for one database.
#[async_trait]
pub trait DataSource: Send + Sync {
    /// Transaction type returned by [`begin`](Self::begin).
    type Transaction: ChangesetTransaction;

    /// Reads the ledger, creating its storage first if it does not exist.
    async fn ledger(&self) -> Result<Ledger>;

    /// Returns the changeset files.
    ///
    /// The source is shared so that blocking reads can run off the async
    /// executor.
    fn changesets(&self) -> Arc<dyn ChangesetSource>;

    /// Returns the directory within [`changesets`](Self::changesets) to scan.
    fn base_path(&self) -> &str;

    /// Starts the transaction all changesets of a run are applied in.
    async fn begin(&self) -> Result<Self::Transaction>;
}

/// A transaction changesets are applied in.
///
/// Only one run may use a transaction; it is never shared.
#[async_trait]
pub trait ChangesetTransaction: Send {
    /// Reads, executes and records a changeset.
    ///
    /// On success, `migration` has its `created_at`, `checksum` and
    /// `success` fields set and a ledger row has been written inside this
    /// transaction.
    async fn apply(&mut self, migration: &mut Migration) -> Result<()>;

    /// Commits everything applied in this transaction.
    async fn commit(self) -> Result<()>;

    /// Discards everything applied in this transaction.
    async fn rollback(self) -> Result<()>;
}
