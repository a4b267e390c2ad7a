//! SQLite ledger dialect.

use super::LedgerDialect;

/// SQLite ledger dialect.
#[derive(Debug, Clone, Default)]
pub struct SqliteDialect;

impl SqliteDialect {
    /// Creates a new SQLite dialect.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl LedgerDialect for SqliteDialect {
    fn name(&self) -> &'static str {
        "sqlite"
    }

    fn table_exists_sql(&self) -> String {
        "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?".to_string()
    }

    fn id_column(&self) -> &'static str {
        "Id INTEGER PRIMARY KEY AUTOINCREMENT"
    }

    // A TIMESTAMP declared type cannot be read through the Any driver.
    fn timestamp_type(&self) -> &'static str {
        "TEXT"
    }
}
