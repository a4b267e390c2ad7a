//! Database dialects for the ledger table.
//!
//! The SQL data source is written once; everything that differs between
//! backends (identifier quoting, placeholder style, how to ask whether the
//! ledger table exists, auto-increment syntax, timestamp handling) lives
//! behind [`LedgerDialect`].

mod mysql;
mod postgres;
mod sqlite;

pub use mysql::MySqlDialect;
pub use postgres::PostgresDialect;
pub use sqlite::SqliteDialect;

use std::fmt;

use chrono::{DateTime, NaiveDateTime, Utc};

use crate::error::{MigrateError, Result};

/// Format used to write ledger timestamps.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.6f";

/// Trait for database-specific ledger SQL.
pub trait LedgerDialect: Send + Sync + fmt::Debug {
    /// Returns the dialect name.
    fn name(&self) -> &'static str;

    /// Quote an identifier (table name, column name, etc.).
    fn quote_identifier(&self, name: &str) -> String {
        format!("\"{}\"", name.replace('"', "\"\""))
    }

    /// Returns the bind parameter for the 1-based `index`.
    fn placeholder(&self, _index: usize) -> String {
        "?".to_string()
    }

    /// Query counting tables named by its single bind parameter.
    fn table_exists_sql(&self) -> String;

    /// Definition of the auto-incrementing `Id` column.
    fn id_column(&self) -> &'static str;

    /// Column type of `CreatedAt`.
    fn timestamp_type(&self) -> &'static str {
        "TIMESTAMP"
    }

    /// Expression converting a text bind parameter into a timestamp.
    fn timestamp_value(&self, placeholder: &str) -> String {
        placeholder.to_string()
    }

    /// Expression reading a timestamp column back as text.
    fn timestamp_text(&self, column: &str) -> String {
        column.to_string()
    }

    /// Query reading back the `Id` generated by the last INSERT on the same
    /// connection. `None` means the ledger INSERT returns it with `RETURNING`.
    fn last_insert_id_sql(&self) -> Option<&'static str> {
        None
    }

    /// Formats a timestamp for binding as text.
    fn format_timestamp(&self, timestamp: &DateTime<Utc>) -> String {
        timestamp.format(TIMESTAMP_FORMAT).to_string()
    }

    /// Generates CREATE TABLE for the ledger.
    fn create_ledger_sql(&self, table: &str) -> String {
        format!(
            "CREATE TABLE {} (\n    {},\n    Name TEXT NOT NULL,\n    File TEXT NOT NULL,\n    Version BIGINT NOT NULL,\n    CreatedAt {},\n    Checksum BIGINT NOT NULL\n)",
            self.quote_identifier(table),
            self.id_column(),
            self.timestamp_type()
        )
    }

    /// Generates the SELECT reading every ledger row by ascending version.
    fn select_ledger_sql(&self, table: &str) -> String {
        format!(
            "SELECT Id, Name, File, Version, {} AS CreatedAt, Checksum FROM {} ORDER BY Version ASC",
            self.timestamp_text("CreatedAt"),
            self.quote_identifier(table)
        )
    }

    /// Generates the INSERT appending one ledger row.
    fn insert_ledger_sql(&self, table: &str) -> String {
        let mut sql = format!(
            "INSERT INTO {} (Name, File, Version, CreatedAt, Checksum) VALUES ({}, {}, {}, {}, {})",
            self.quote_identifier(table),
            self.placeholder(1),
            self.placeholder(2),
            self.placeholder(3),
            self.timestamp_value(&self.placeholder(4)),
            self.placeholder(5)
        );
        if self.last_insert_id_sql().is_none() {
            sql.push_str(" RETURNING Id");
        }
        sql
    }
}

/// Picks the dialect matching the scheme of a database URL.
///
/// # Errors
///
/// Returns [`MigrateError::UnsupportedDatabase`] for unknown schemes.
pub fn dialect_for_url(url: &str) -> Result<Box<dyn LedgerDialect>> {
    let scheme = url
        .split_once(':')
        .map(|(scheme, _)| scheme.to_ascii_lowercase())
        .unwrap_or_default();

    match scheme.as_str() {
        "sqlite" => Ok(Box::new(SqliteDialect::new())),
        "postgres" | "postgresql" => Ok(Box::new(PostgresDialect::new())),
        "mysql" | "mariadb" => Ok(Box::new(MySqlDialect::new())),
        _ => Err(MigrateError::UnsupportedDatabase(url.to_string())),
    }
}

/// Parses a ledger timestamp read back through [`LedgerDialect::timestamp_text`].
#[must_use]
pub fn parse_timestamp(text: &str) -> Option<DateTime<Utc>> {
    let text = text.trim();
    DateTime::parse_from_rfc3339(text)
        .map(|dt| dt.with_timezone(&Utc))
        .ok()
        .or_else(|| {
            // SQLite datetime format
            NaiveDateTime::parse_from_str(text, "%Y-%m-%d %H:%M:%S%.f")
                .map(|dt| dt.and_utc())
                .ok()
        })
}
