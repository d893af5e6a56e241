//! The embedded relational store. A thin wrapper around a single-writer
//! `SqlitePool` with one repository module per entity and a `with_tx`
//! helper for the multi-row mutations the engine needs to be atomic.

use std::str::FromStr;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use sqlx::{Sqlite, Transaction};
use volant_core::Result;

pub mod cloudinit;
pub mod deployments;
pub mod ip;
pub mod plugins;
pub mod vm_config;
pub mod vms;

#[derive(Clone)]
pub struct Store {
    pool: SqlitePool,
}

impl Store {
    /// Opens the database at `database_url`, applying any pending
    /// forward-only migrations. `max_connections` stays small —
    /// SQLite's own file lock is the single-writer guarantee, not the pool.
    pub async fn connect(database_url: &str) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(database_url)
            .map_err(|e| volant_core::Error::Internal(format!("parsing database url: {e}")))?
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await?;

        sqlx::migrate!("./migrations").run(&pool).await.map_err(|e| {
            volant_core::Error::Internal(format!("running migrations: {e}"))
        })?;

        Ok(Self { pool })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

type BoxTxFuture<'c, T> =
    std::pin::Pin<Box<dyn std::future::Future<Output = Result<T>> + Send + 'c>>;

/// Runs `f` inside a transaction, committing on `Ok` and rolling back on
/// `Err` — the store's only primitive for multi-row atomic mutations
/// (IP lease + assign, config upsert + history append, VM insert +
/// resource reservation).
pub async fn with_tx<T, F>(pool: &SqlitePool, f: F) -> Result<T>
where
    T: Send,
    F: for<'c> FnOnce(&'c mut Transaction<'_, Sqlite>) -> BoxTxFuture<'c, T>,
{
    let mut tx = pool.begin().await.map_err(volant_core::Error::from)?;
    match f(&mut tx).await {
        Ok(value) => {
            tx.commit().await.map_err(volant_core::Error::from)?;
            Ok(value)
        }
        Err(err) => {
            let _ = tx.rollback().await;
            Err(err)
        }
    }
}

/// Parses a timestamp stored by this crate, tolerating both RFC3339 (what
/// we write) and SQLite's bare `%Y-%m-%d %H:%M:%S` default.
pub(crate) fn parse_timestamp(raw: &str) -> chrono::DateTime<chrono::Utc> {
    if let Ok(dt) = chrono::DateTime::parse_from_rfc3339(raw) {
        return dt.with_timezone(&chrono::Utc);
    }
    chrono::NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S")
        .map(|naive| chrono::DateTime::from_naive_utc_and_offset(naive, chrono::Utc))
        .unwrap_or_else(|_| chrono::Utc::now())
}
