//! Changesets read from a directory on disk.

mod common;

use std::fs;
use std::path::Path;

use common::{ledger_files, memory_pool, table_exists};
use oxide_changeset::prelude::*;

fn write(dir: &Path, name: &str, sql: &str) {
    fs::write(dir.join(name), sql).unwrap();
}

#[tokio::test]
async fn applies_in_numeric_order() {
    let root = tempfile::tempdir().unwrap();
    let migrations = root.path().join("migrations");
    fs::create_dir(&migrations).unwrap();

    write(&migrations, "11__d.sql", "CREATE TABLE d (id INTEGER);");
    write(&migrations, "1__a.sql", "CREATE TABLE a (id INTEGER);");
    write(&migrations, "10__c.sql", "CREATE TABLE c (id INTEGER);");
    write(&migrations, "9__b.sql", "CREATE TABLE b (id INTEGER);");
    write(&migrations, "12__notes.txt", "not a changeset");
    fs::create_dir(migrations.join("13__archive")).unwrap();

    let pool = memory_pool().await;
    let config = Config::new(DirSource::new(root.path()), "migrations");
    let ds = SqlDataSource::new(pool.clone(), SqliteDialect::new(), &config).unwrap();

    let report = migrate(&ds, false).await.unwrap();

    assert_eq!(report.version, 11);
    assert_eq!(
        ledger_files(&pool).await,
        vec!["1__a.sql", "9__b.sql", "10__c.sql", "11__d.sql"]
    );
    for table in ["a", "b", "c", "d"] {
        assert!(table_exists(&pool, table).await);
    }
}

#[tokio::test]
async fn stray_file_aborts_before_applying() {
    let root = tempfile::tempdir().unwrap();
    write(root.path(), "1__a.sql", "CREATE TABLE a (id INTEGER);");
    write(root.path(), "README.md", "docs");

    let pool = memory_pool().await;
    let config = Config::new(DirSource::new(root.path()), ".");
    let ds = SqlDataSource::new(pool.clone(), SqliteDialect::new(), &config).unwrap();

    let err = migrate(&ds, false).await.unwrap_err();

    assert!(matches!(err, MigrateError::InvalidFileName(ref e) if e.file == "README.md"));
    assert!(!table_exists(&pool, "a").await);
}

#[tokio::test]
async fn missing_directory_is_reported() {
    let root = tempfile::tempdir().unwrap();

    let pool = memory_pool().await;
    let config = Config::new(DirSource::new(root.path()), "nowhere");
    let ds = SqlDataSource::new(pool, SqliteDialect::new(), &config).unwrap();

    let err = migrate(&ds, false).await.unwrap_err();
    assert!(matches!(err, MigrateError::ReadDir { ref path, .. } if path == "nowhere"));
}

#[tokio::test]
async fn edited_file_on_disk_is_detected() {
    let root = tempfile::tempdir().unwrap();
    write(root.path(), "1__a.sql", "CREATE TABLE a (id INTEGER);");

    let pool = memory_pool().await;
    let config = Config::new(DirSource::new(root.path()), ".");
    let ds = SqlDataSource::new(pool.clone(), SqliteDialect::new(), &config).unwrap();
    migrate(&ds, false).await.unwrap();

    write(root.path(), "1__a.sql", "CREATE TABLE a (id INTEGER, name TEXT);");
    let err = migrate(&ds, false).await.unwrap_err();

    assert!(matches!(err, MigrateError::ChecksumMismatch { ref file, .. } if file == "1__a.sql"));
}
