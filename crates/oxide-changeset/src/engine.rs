//! Reconciliation engine.
//!
//! A run reads the ledger, lists the changeset directory in version order
//! and decides for every changeset whether it is already applied, new, or a
//! fatal inconsistency. New changesets are applied in one transaction that
//! is committed only if the whole directory reconciles cleanly.

use std::collections::HashSet;

use tracing::{debug, info, warn};

use crate::checksum::checksum_file;
use crate::datasource::{ChangesetTransaction, DataSource};
use crate::error::{MigrateError, Result};
use crate::filename::parse_migration;
use crate::ledger::{Ledger, Migration};
use crate::source::{blocking, join_path, sort_entries, ChangesetEntry};

/// Outcome of comparing one changeset against the ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// Recorded in the ledger with the same checksum.
    Verified,
    /// Not recorded yet; will be applied.
    Pending,
}

/// A changeset found on disk together with its verdict.
#[derive(Debug, Clone)]
pub struct PlannedChangeset {
    /// Identity and checksum of the file.
    pub migration: Migration,
    /// What a run would do with it.
    pub verdict: Verdict,
}

/// Summary of a successful run.
#[derive(Debug, Clone, Default)]
pub struct MigrationReport {
    /// Changesets applied by this run, in application order.
    pub applied: Vec<Migration>,
    /// Number of changesets found already applied.
    pub verified: usize,
    /// Highest applied version after the run.
    pub version: i64,
}

/// Classifies `candidate` against the applied rows.
///
/// Rows are matched by file name, ignoring case. A matched row must carry
/// the same checksum. An unmatched candidate is new unless it reuses the
/// current version, or is older than it while `out_of_order` is disabled.
///
/// # Errors
///
/// Returns [`MigrateError::ChecksumMismatch`], [`MigrateError::VersionConflict`]
/// or [`MigrateError::OutOfOrder`].
pub fn classify(
    candidate: &Migration,
    applied: &[Migration],
    current_version: i64,
    out_of_order: bool,
) -> Result<Verdict> {
    if let Some(row) = applied.iter().find(|row| row.is_file(&candidate.file)) {
        if row.checksum == candidate.checksum {
            return Ok(Verdict::Verified);
        }
        return Err(MigrateError::ChecksumMismatch {
            file: candidate.file.clone(),
            expected: row.checksum,
            found: candidate.checksum,
        });
    }

    if candidate.version == current_version {
        return Err(MigrateError::VersionConflict {
            file: candidate.file.clone(),
            version: candidate.version,
        });
    }

    if candidate.version < current_version && !out_of_order {
        return Err(MigrateError::OutOfOrder {
            file: candidate.file.clone(),
            version: candidate.version,
            current: current_version,
        });
    }

    Ok(Verdict::Pending)
}

/// Per-run classification state.
struct Reconciler<'a> {
    ledger: &'a Ledger,
    out_of_order: bool,
    /// Versions of the new changesets accepted so far in this run.
    claimed: HashSet<i64>,
}

impl<'a> Reconciler<'a> {
    fn new(ledger: &'a Ledger, out_of_order: bool) -> Self {
        Self {
            ledger,
            out_of_order,
            claimed: HashSet::new(),
        }
    }

    fn classify(&mut self, candidate: &Migration) -> Result<Verdict> {
        let verdict = classify(
            candidate,
            &self.ledger.migrations,
            self.ledger.version,
            self.out_of_order,
        )?;

        if verdict == Verdict::Pending && !self.claimed.insert(candidate.version) {
            return Err(MigrateError::VersionConflict {
                file: candidate.file.clone(),
                version: candidate.version,
            });
        }

        Ok(verdict)
    }
}

/// Applies changesets from a [`DataSource`].
#[derive(Debug, Clone, Copy, Default)]
pub struct Migrator {
    /// Apply changesets older than the current ledger version.
    pub out_of_order: bool,
}

impl Migrator {
    /// Creates a migrator with the given out-of-order policy.
    #[must_use]
    pub fn new(out_of_order: bool) -> Self {
        Self { out_of_order }
    }

    /// Reconciles the changeset directory against the ledger and applies
    /// every new changeset in a single transaction.
    ///
    /// Either all new changesets are committed or, on any error, none are.
    ///
    /// # Errors
    ///
    /// Returns the first fatal condition met; see [`MigrateError`].
    pub async fn migrate<D: DataSource>(&self, ds: &D) -> Result<MigrationReport> {
        let ledger = read_ledger(ds).await?;
        let entries = list_changesets(ds).await?;

        let mut tx = ds.begin().await?;

        match self.reconcile(ds, &ledger, &entries, &mut tx).await {
            Ok(report) => {
                tx.commit().await?;
                info!(
                    table = %ledger.table_name,
                    applied = report.applied.len(),
                    verified = report.verified,
                    version = report.version,
                    "Migration complete"
                );
                Ok(report)
            }
            Err(err) => {
                if let Err(rollback_err) = tx.rollback().await {
                    warn!(error = %rollback_err, "Rollback failed");
                }
                Err(err)
            }
        }
    }

    /// Classifies every changeset without applying anything.
    ///
    /// # Errors
    ///
    /// Fails on the same conditions as [`migrate`](Self::migrate), except
    /// those raised while applying.
    pub async fn plan<D: DataSource>(&self, ds: &D) -> Result<Vec<PlannedChangeset>> {
        let ledger = read_ledger(ds).await?;
        let entries = list_changesets(ds).await?;
        let mut reconciler = Reconciler::new(&ledger, self.out_of_order);

        let mut plan = Vec::new();
        for entry in entries.iter().filter(|entry| entry.is_changeset()) {
            let migration = inspect(ds, entry).await?;
            let verdict = reconciler.classify(&migration)?;
            plan.push(PlannedChangeset { migration, verdict });
        }
        Ok(plan)
    }

    async fn reconcile<D: DataSource>(
        &self,
        ds: &D,
        ledger: &Ledger,
        entries: &[ChangesetEntry],
        tx: &mut D::Transaction,
    ) -> Result<MigrationReport> {
        let mut reconciler = Reconciler::new(ledger, self.out_of_order);
        let mut report = MigrationReport {
            version: ledger.version,
            ..MigrationReport::default()
        };

        for entry in entries.iter().filter(|entry| entry.is_changeset()) {
            let mut migration = inspect(ds, entry).await?;

            match reconciler.classify(&migration)? {
                Verdict::Verified => {
                    debug!(file = %migration.file, "Verified changeset");
                    report.verified += 1;
                }
                Verdict::Pending => {
                    info!(
                        file = %migration.file,
                        version = migration.version,
                        "Applying changeset"
                    );
                    tx.apply(&mut migration).await?;
                    report.version = report.version.max(migration.version);
                    report.applied.push(migration);
                }
            }
        }

        Ok(report)
    }
}

/// Reads the ledger and checks its version invariant.
async fn read_ledger<D: DataSource>(ds: &D) -> Result<Ledger> {
    let mut ledger = ds.ledger().await?;

    if !ledger.migrations.is_empty() && ledger.version == 0 {
        return Err(MigrateError::CorruptLedger {
            version: ledger.version,
            count: ledger.migrations.len(),
        });
    }

    ledger.migrations.sort_by_key(|m| m.version);
    Ok(ledger)
}

/// Lists the changeset directory in version order.
async fn list_changesets<D: DataSource>(ds: &D) -> Result<Vec<ChangesetEntry>> {
    let source = ds.changesets();
    let base_path = ds.base_path().to_string();
    let path = base_path.clone();
    let mut entries = blocking(move || source.read_dir(&path))
        .await
        .map_err(|source| MigrateError::ReadDir { path: base_path, source })?;
    sort_entries(&mut entries)?;
    Ok(entries)
}

/// Parses a changeset's identity and checksums its current content.
async fn inspect<D: DataSource>(ds: &D, entry: &ChangesetEntry) -> Result<Migration> {
    let migration = parse_migration(&entry.name)?;
    let source = ds.changesets();
    let path = join_path(ds.base_path(), &entry.name);
    let checksum = blocking(move || checksum_file(source.as_ref(), &path))
        .await
        .map_err(|source| MigrateError::Checksum {
            file: entry.name.clone(),
            source,
        })?;
    Ok(migration.with_checksum(checksum))
}

/// Runs a [`Migrator`] with the given out-of-order policy.
///
/// # Errors
///
/// See [`Migrator::migrate`].
pub async fn migrate<D: DataSource>(ds: &D, out_of_order: bool) -> Result<MigrationReport> {
    Migrator::new(out_of_order).migrate(ds).await
}
