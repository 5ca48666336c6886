//! Drop-and-recreate of the database behind the `reset-db` binary.

use std::path::Path;

use anyhow::Context;
use thiserror::Error;

use crate::db::{create_pool, database_path, DbPool};
use crate::migrations::{count_tables, drop_all_tables, run_migrations};
use crate::seed::{seed_demo, SeedSummary};

/// The database file could not be opened or created.
#[derive(Error, Debug)]
#[error("cannot open database at {path}")]
pub struct CannotOpen {
    pub path: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResetSummary {
    pub tables: i64,
    pub seed: SeedSummary,
}

fn is_memory(path: &str) -> bool {
    path == ":memory:"
}

/// Remove the database file and its journal side files. `false` when the
/// file could not be removed and tables must be dropped in place.
fn remove_database_file(path: &str) -> bool {
    let mut removed = true;
    for suffix in ["", "-wal", "-shm", "-journal"] {
        let file = format!("{path}{suffix}");
        if !Path::new(&file).exists() {
            continue;
        }
        match std::fs::remove_file(&file) {
            Ok(()) => tracing::debug!("Removed {}", file),
            Err(e) => {
                tracing::warn!("Could not remove {}: {}", file, e);
                removed = false;
            }
        }
    }
    removed
}

fn open(database_url: &str) -> anyhow::Result<DbPool> {
    let path = database_path(database_url);
    if !is_memory(path) {
        // Fail fast; the pool would otherwise retry until its timeout.
        rusqlite::Connection::open(path)
            .map_err(anyhow::Error::from)
            .context(CannotOpen {
                path: path.to_string(),
            })?;
    }
    create_pool(database_url).context(CannotOpen {
        path: path.to_string(),
    })
}

/// Recreate the schema from scratch and load the demo data.
pub async fn reset_database(database_url: &str) -> anyhow::Result<ResetSummary> {
    let path = database_path(database_url);
    let file_removed = !is_memory(path) && remove_database_file(path);

    let pool = open(database_url)?;

    if !file_removed {
        let dropped = drop_all_tables(&pool)?;
        tracing::info!("Dropped {} existing tables", dropped);
    }

    run_migrations(&pool)?;
    let tables = count_tables(&pool)?;

    let seed = seed_demo(&pool).await.context("seeding demo data")?;

    Ok(ResetSummary { tables, seed })
}
