#![allow(dead_code)]

use oxide_changeset::prelude::*;
use sqlx::any::{install_default_drivers, AnyPoolOptions};
use sqlx::AnyPool;

pub const BASE: &str = "db/migrations";

/// Single-connection in-memory SQLite pool; the database lives as long as the pool.
pub async fn memory_pool() -> AnyPool {
    install_default_drivers();
    AnyPoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .unwrap_or_else(|e| panic!("Failed to create in-memory SQLite pool: {e}"))
}

pub fn changesets(files: &[(&str, &str)]) -> MemorySource {
    files.iter().fold(MemorySource::new(), |source, (name, sql)| {
        source.with_file(format!("{BASE}/{name}"), sql)
    })
}

pub fn data_source(pool: &AnyPool, source: impl ChangesetSource + 'static) -> SqlDataSource {
    let config = Config::new(source, BASE);
    SqlDataSource::new(pool.clone(), SqliteDialect::new(), &config)
        .unwrap_or_else(|e| panic!("Invalid configuration: {e}"))
}

/// Ledger files in insertion order.
pub async fn ledger_files(pool: &AnyPool) -> Vec<String> {
    sqlx::query_scalar(&format!(
        "SELECT File FROM \"{DEFAULT_TABLE_NAME}\" ORDER BY Id"
    ))
    .fetch_all(pool)
    .await
    .unwrap_or_else(|e| panic!("Failed to read ledger: {e}"))
}

pub async fn table_exists(pool: &AnyPool, table: &str) -> bool {
    let count: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?")
            .bind(table)
            .fetch_one(pool)
            .await
            .unwrap_or_else(|e| panic!("Failed to query sqlite_master: {e}"));
    count > 0
}
