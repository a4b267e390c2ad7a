//! MySQL ledger dialect.
//!
//! `CreatedAt` is a `DATETIME(6)` holding UTC so that the session time zone
//! never shifts stored values.

use super::LedgerDialect;

/// MySQL / MariaDB ledger dialect.
#[derive(Debug, Clone, Default)]
pub struct MySqlDialect;

impl MySqlDialect {
    /// Creates a new MySQL dialect.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl LedgerDialect for MySqlDialect {
    fn name(&self) -> &'static str {
        "mysql"
    }

    fn quote_identifier(&self, name: &str) -> String {
        format!("`{}`", name.replace('`', "``"))
    }

    fn table_exists_sql(&self) -> String {
        "SELECT COUNT(*) FROM information_schema.tables \
         WHERE table_schema = DATABASE() AND table_name = ?"
            .to_string()
    }

    fn id_column(&self) -> &'static str {
        "Id BIGINT NOT NULL PRIMARY KEY AUTO_INCREMENT"
    }

    fn timestamp_type(&self) -> &'static str {
        "DATETIME(6)"
    }

    fn timestamp_text(&self, column: &str) -> String {
        format!("DATE_FORMAT({column}, '%Y-%m-%d %H:%i:%s.%f')")
    }

    // LAST_INSERT_ID() is unsigned.
    fn last_insert_id_sql(&self) -> Option<&'static str> {
        Some("SELECT CAST(LAST_INSERT_ID() AS SIGNED)")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dialect() -> MySqlDialect {
        MySqlDialect::new()
    }

    #[test]
    fn test_create_ledger_uses_backticks() {
        let sql = dialect().create_ledger_sql("oxide_changesets");
        assert!(sql.starts_with("CREATE TABLE `oxide_changesets` (\n"));
        assert!(sql.contains("Id BIGINT NOT NULL PRIMARY KEY AUTO_INCREMENT"));
        assert!(sql.contains("CreatedAt DATETIME(6)"));
    }

    #[test]
    fn test_insert_ledger() {
        assert_eq!(
            dialect().insert_ledger_sql("ledger"),
            "INSERT INTO `ledger` (Name, File, Version, CreatedAt, Checksum) VALUES (?, ?, ?, ?, ?)"
        );
        assert_eq!(
            dialect().last_insert_id_sql(),
            Some("SELECT CAST(LAST_INSERT_ID() AS SIGNED)")
        );
    }

    #[test]
    fn test_table_exists_is_scoped_to_database() {
        assert!(dialect().table_exists_sql().contains("DATABASE()"));
    }

    #[test]
    fn test_quote_identifier_escapes_backticks() {
        assert_eq!(dialect().quote_identifier("a`b"), "`a``b`");
    }
}
