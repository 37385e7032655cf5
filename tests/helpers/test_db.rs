use super::fixtures::{setup_core_with, start_time, TestCore};
use salonbook::infrastructure::persistence::SqlStore;
use std::sync::Arc;
use uuid::Uuid;

/// File-backed SQLite store with migrations applied. Each call gets its own file so tests run in parallel.
pub async fn setup_sql_store() -> (SqlStore, TempDb) {
    let temp = TempDb(format!("test_{}.db", Uuid::new_v4()));
    let db_url = format!("sqlite://{}?mode=rwc", temp.0);

    let store = SqlStore::connect(&db_url)
        .await
        .expect("Failed to connect to test database");
    store
        .run_migrations()
        .await
        .expect("Failed to run migrations");

    (store, temp)
}

/// Same wiring as `setup_core`, backed by SQLite.
pub async fn setup_sql_core() -> (TestCore, TempDb) {
    let (store, temp) = setup_sql_store().await;
    (setup_core_with(Arc::new(store), start_time()), temp)
}

/// Removes the database file (and WAL side files) when dropped.
pub struct TempDb(pub String);

impl Drop for TempDb {
    fn drop(&mut self) {
        for suffix in ["", "-wal", "-shm"] {
            let _ = std::fs::remove_file(format!("{}{}", self.0, suffix));
        }
    }
}
