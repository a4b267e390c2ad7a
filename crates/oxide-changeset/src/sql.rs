//! SQL-backed data source.
//!
//! [`SqlDataSource`] keeps its ledger in a table of the target database and
//! works with every backend sqlx's `Any` driver can reach. Backend-specific
//! SQL comes from a [`LedgerDialect`].

use std::io::Read;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::any::{install_default_drivers, AnyPoolOptions};
use sqlx::{Any, AnyPool, Executor, Row, Transaction};
use tracing::debug;

use crate::checksum::checksum_bytes;
use crate::config::{validate_config, Config};
use crate::datasource::{ChangesetTransaction, DataSource};
use crate::dialect::{dialect_for_url, parse_timestamp, LedgerDialect};
use crate::error::{MigrateError, Result};
use crate::ledger::{Ledger, Migration};
use crate::source::{blocking, join_path, ChangesetSource};

/// Ledger row as read from the database.
type LedgerRow = (i64, String, String, i64, Option<String>, i64);

/// Ledger statements, rendered once per data source.
#[derive(Debug)]
struct Statements {
    exists: String,
    create: String,
    select: String,
    insert: Arc<str>,
}

impl Statements {
    fn new(dialect: &dyn LedgerDialect, table: &str) -> Self {
        Self {
            exists: dialect.table_exists_sql(),
            create: dialect.create_ledger_sql(table),
            select: dialect.select_ledger_sql(table),
            insert: Arc::from(dialect.insert_ledger_sql(table)),
        }
    }
}

/// A [`DataSource`] keeping its ledger in a SQL table.
#[derive(Debug)]
pub struct SqlDataSource {
    pool: AnyPool,
    dialect: Arc<dyn LedgerDialect>,
    source: Arc<dyn ChangesetSource>,
    base_path: String,
    table_name: String,
    statements: Statements,
}

impl SqlDataSource {
    /// Wraps an existing pool.
    ///
    /// # Errors
    ///
    /// Returns [`MigrateError::Config`] if `config` is incomplete.
    pub fn new(
        pool: AnyPool,
        dialect: impl LedgerDialect + 'static,
        config: &Config,
    ) -> Result<Self> {
        Self::with_dialect(pool, Arc::new(dialect), config)
    }

    /// Connects to `url`, picking the dialect from its scheme.
    ///
    /// The configuration is validated before any connection is attempted.
    ///
    /// # Errors
    ///
    /// Returns [`MigrateError::Config`] for an incomplete configuration,
    /// [`MigrateError::UnsupportedDatabase`] for an unknown URL scheme, or
    /// [`MigrateError::Database`] if the connection fails.
    pub async fn connect(url: &str, config: &Config) -> Result<Self> {
        validate_config(Some(config))?;
        let dialect = dialect_for_url(url)?;

        install_default_drivers();
        let pool = AnyPoolOptions::new()
            .max_connections(1)
            .connect(url)
            .await?;

        Self::with_dialect(pool, Arc::from(dialect), config)
    }

    fn with_dialect(
        pool: AnyPool,
        dialect: Arc<dyn LedgerDialect>,
        config: &Config,
    ) -> Result<Self> {
        let config = validate_config(Some(config))?;
        let source = config.source.clone().ok_or_else(|| {
            MigrateError::Config("missing migration changeset source".to_string())
        })?;
        let table_name = config.table_name_or_default().to_string();
        let statements = Statements::new(dialect.as_ref(), &table_name);

        Ok(Self {
            pool,
            dialect,
            source,
            base_path: config.base_path.clone(),
            table_name,
            statements,
        })
    }

    /// Returns the underlying connection pool.
    #[must_use]
    pub fn pool(&self) -> &AnyPool {
        &self.pool
    }

    /// Returns the dialect.
    #[must_use]
    pub fn dialect(&self) -> &dyn LedgerDialect {
        self.dialect.as_ref()
    }

    async fn ledger_exists(&self) -> Result<bool> {
        let count: i64 = sqlx::query_scalar(&self.statements.exists)
            .bind(self.table_name.as_str())
            .fetch_one(&self.pool)
            .await?;
        Ok(count > 0)
    }
}

#[async_trait]
impl DataSource for SqlDataSource {
    type Transaction = SqlTransaction;

    async fn ledger(&self) -> Result<Ledger> {
        if !self.ledger_exists().await? {
            debug!(table = %self.table_name, dialect = self.dialect.name(), "Creating ledger table");
            sqlx::query(&self.statements.create)
                .execute(&self.pool)
                .await?;
            return Ok(Ledger::from_rows(self.table_name.as_str(), Vec::new()));
        }

        let rows: Vec<LedgerRow> = sqlx::query_as(&self.statements.select)
            .fetch_all(&self.pool)
            .await?;

        let migrations = rows
            .into_iter()
            .map(|(id, name, file, version, created_at, checksum)| Migration {
                id,
                name,
                file,
                version,
                created_at: created_at.as_deref().and_then(parse_timestamp),
                checksum,
                success: true,
            })
            .collect();

        Ok(Ledger::from_rows(self.table_name.as_str(), migrations))
    }

    fn changesets(&self) -> Arc<dyn ChangesetSource> {
        Arc::clone(&self.source)
    }

    fn base_path(&self) -> &str {
        &self.base_path
    }

    async fn begin(&self) -> Result<SqlTransaction> {
        let tx = self.pool.begin().await?;
        Ok(SqlTransaction {
            tx,
            dialect: Arc::clone(&self.dialect),
            source: Arc::clone(&self.source),
            base_path: self.base_path.clone(),
            insert: Arc::clone(&self.statements.insert),
        })
    }
}

/// The transaction of one run against a [`SqlDataSource`].
///
/// Dropping it without calling [`commit`](ChangesetTransaction::commit)
/// rolls back.
pub struct SqlTransaction {
    tx: Transaction<'static, Any>,
    dialect: Arc<dyn LedgerDialect>,
    source: Arc<dyn ChangesetSource>,
    base_path: String,
    insert: Arc<str>,
}

/// Reads the changeset `file` at `path` as UTF-8 text.
async fn read_changeset(
    source: Arc<dyn ChangesetSource>,
    path: String,
    file: &str,
) -> Result<String> {
    let bytes = blocking(move || {
        let mut bytes = Vec::new();
        source.open(&path)?.read_to_end(&mut bytes)?;
        Ok(bytes)
    })
    .await
    .map_err(|e| MigrateError::apply(file, e))?;
    String::from_utf8(bytes).map_err(|e| MigrateError::apply(file, e))
}

impl SqlTransaction {
    /// Inserts the ledger row for `migration` and returns its generated id.
    async fn record(
        &mut self,
        migration: &Migration,
        created_at: &DateTime<Utc>,
    ) -> sqlx::Result<i64> {
        let insert = sqlx::query(&self.insert)
            .bind(migration.name.as_str())
            .bind(migration.file.as_str())
            .bind(migration.version)
            .bind(self.dialect.format_timestamp(created_at))
            .bind(migration.checksum);

        let row = match self.dialect.last_insert_id_sql() {
            None => Executor::fetch_one(&mut *self.tx, insert).await?,
            Some(last_insert_id) => {
                Executor::execute(&mut *self.tx, insert).await?;
                Executor::fetch_one(&mut *self.tx, sqlx::query(last_insert_id)).await?
            }
        };
        row.try_get(0)
    }
}

#[async_trait]
impl ChangesetTransaction for SqlTransaction {
    async fn apply(&mut self, migration: &mut Migration) -> Result<()> {
        let path = join_path(&self.base_path, &migration.file);
        let sql = read_changeset(Arc::clone(&self.source), path, &migration.file).await?;
        let created_at = Utc::now();

        migration.success = false;
        migration.created_at = Some(created_at);
        migration.checksum = checksum_bytes(sql.as_bytes());

        debug!(file = %migration.file, "Executing changeset");
        Executor::execute(&mut *self.tx, sqlx::raw_sql(&sql))
            .await
            .map_err(|e| MigrateError::apply(&migration.file, e))?;

        debug!(file = %migration.file, checksum = migration.checksum, "Recording changeset");
        migration.id = self
            .record(migration, &created_at)
            .await
            .map_err(|e| MigrateError::apply(&migration.file, e))?;
        migration.success = true;
        Ok(())
    }

    async fn commit(self) -> Result<()> {
        self.tx.commit().await?;
        Ok(())
    }

    async fn rollback(self) -> Result<()> {
        self.tx.rollback().await?;
        Ok(())
    }
}
