//! PostgreSQL ledger dialect.

use chrono::{DateTime, Utc};

use super::{LedgerDialect, TIMESTAMP_FORMAT};

/// PostgreSQL ledger dialect.
#[derive(Debug, Clone, Default)]
pub struct PostgresDialect;

impl PostgresDialect {
    /// Creates a new PostgreSQL dialect.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl LedgerDialect for PostgresDialect {
    fn name(&self) -> &'static str {
        "postgres"
    }

    fn placeholder(&self, index: usize) -> String {
        format!("${index}")
    }

    fn table_exists_sql(&self) -> String {
        "SELECT COUNT(*) FROM information_schema.tables \
         WHERE table_type = 'BASE TABLE' \
         AND table_catalog = CURRENT_CATALOG \
         AND table_schema = CURRENT_SCHEMA \
         AND table_name = $1"
            .to_string()
    }

    fn id_column(&self) -> &'static str {
        "Id BIGSERIAL PRIMARY KEY"
    }

    fn timestamp_type(&self) -> &'static str {
        "TIMESTAMPTZ"
    }

    fn timestamp_value(&self, placeholder: &str) -> String {
        format!("CAST({placeholder} AS TIMESTAMPTZ)")
    }

    fn timestamp_text(&self, column: &str) -> String {
        format!("to_char({column} AT TIME ZONE 'UTC', 'YYYY-MM-DD HH24:MI:SS.US')")
    }

    fn format_timestamp(&self, timestamp: &DateTime<Utc>) -> String {
        format!("{}+00", timestamp.format(TIMESTAMP_FORMAT))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn dialect() -> PostgresDialect {
        PostgresDialect::new()
    }

    #[test]
    fn test_create_ledger() {
        let sql = dialect().create_ledger_sql("oxide_changesets");
        assert!(sql.starts_with("CREATE TABLE \"oxide_changesets\" (\n"));
        assert!(sql.contains("Id BIGSERIAL PRIMARY KEY"));
        assert!(sql.contains("CreatedAt TIMESTAMPTZ"));
    }

    #[test]
    fn test_insert_uses_numbered_placeholders() {
        assert_eq!(
            dialect().insert_ledger_sql("ledger"),
            "INSERT INTO \"ledger\" (Name, File, Version, CreatedAt, Checksum) VALUES ($1, $2, $3, CAST($4 AS TIMESTAMPTZ), $5) RETURNING Id"
        );
    }

    #[test]
    fn test_select_reads_timestamp_as_utc_text() {
        let sql = dialect().select_ledger_sql("ledger");
        assert!(sql.contains("to_char(CreatedAt AT TIME ZONE 'UTC'"));
        assert!(sql.ends_with("FROM \"ledger\" ORDER BY Version ASC"));
    }

    #[test]
    fn test_table_exists_binds_name() {
        assert!(dialect().table_exists_sql().ends_with("table_name = $1"));
    }

    #[test]
    fn test_timestamp_is_utc() {
        let ts = Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap();
        assert_eq!(dialect().format_timestamp(&ts), "2024-01-02 03:04:05.000000+00");
    }
}
