use std::{path::Path, time::Duration};

use sqlx::{
    Error, Pool, Sqlite, Transaction,
    sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions},
};

pub mod models;
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

#[derive(Clone)]
pub struct DBService {
    pub pool: Pool<Sqlite>,
}

impl DBService {
    /// Open (creating if needed) the SQLite store at `db_path` and bring the
    /// schema up to date.
    ///
    /// WAL gives a single writer with concurrent readers, which is the only
    /// serialization the workflow layer relies on.
    pub async fn new(db_path: &Path) -> Result<DBService, Error> {
        let options = SqliteConnectOptions::new()
            .filename(db_path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .foreign_keys(true)
            .busy_timeout(Duration::from_secs(5));

        let pool = SqlitePoolOptions::new()
            .max_connections(8)
            .connect_with(options)
            .await?;
        sqlx::migrate!("./migrations").run(&pool).await?;

        tracing::info!("Opened store at {}", db_path.display());
        Ok(DBService { pool })
    }

    pub fn from_pool(pool: Pool<Sqlite>) -> DBService {
        DBService { pool }
    }

    /// Open a transaction that takes the write lock up front.
    ///
    /// A deferred transaction that reads before writing cannot be upgraded
    /// once another writer has committed, and SQLite fails it immediately
    /// instead of waiting out the busy timeout. `BEGIN IMMEDIATE` queues
    /// writers on the lock so they apply one after another.
    pub async fn begin_write(&self) -> Result<Transaction<'static, Sqlite>, Error> {
        self.pool.begin_with("BEGIN IMMEDIATE").await
    }
}
