//! Embedded database migrations
//!
//! All schema files are compiled into the binary, so neither the server nor
//! `reset-db` needs the `migrations/` directory at runtime.

use crate::db::DbPool;

/// All migrations in order, each as (filename, sql_content)
pub const MIGRATIONS: &[(&str, &str)] = &[
    (
        "001_create_tenants.sql",
        include_str!("../migrations/001_create_tenants.sql"),
    ),
    (
        "002_create_users.sql",
        include_str!("../migrations/002_create_users.sql"),
    ),
    (
        "003_create_clients.sql",
        include_str!("../migrations/003_create_clients.sql"),
    ),
    (
        "004_create_daily_checkins.sql",
        include_str!("../migrations/004_create_daily_checkins.sql"),
    ),
    (
        "005_create_chat.sql",
        include_str!("../migrations/005_create_chat.sql"),
    ),
    (
        "006_create_catalogs.sql",
        include_str!("../migrations/006_create_catalogs.sql"),
    ),
];

/// Run all pending migrations on the database pool.
///
/// Applied migrations are recorded in a `_migrations` table and skipped on
/// subsequent runs.
pub fn run_migrations(pool: &DbPool) -> anyhow::Result<()> {
    tracing::info!("Running migrations...");

    let conn = pool.get()?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS _migrations (
            name TEXT PRIMARY KEY,
            applied_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
        )",
        [],
    )?;

    for (filename, sql) in MIGRATIONS {
        let already_applied: bool = conn
            .query_row(
                "SELECT COUNT(*) > 0 FROM _migrations WHERE name = ?",
                [filename],
                |row| row.get(0),
            )
            .unwrap_or(false);

        if already_applied {
            tracing::debug!("Skipping already applied migration: {}", filename);
            continue;
        }

        tracing::info!("Running migration: {}", filename);

        conn.execute_batch(sql)?;
        conn.execute("INSERT INTO _migrations (name) VALUES (?)", [filename])?;
    }

    tracing::info!("Migrations completed");
    Ok(())
}

/// Run all migrations for tests (without tracking).
///
/// In-memory test databases are created fresh each time, so there is nothing
/// to skip.
pub fn run_migrations_for_tests(pool: &DbPool) -> Result<(), Box<dyn std::error::Error>> {
    let conn = pool.get()?;

    for (_filename, sql) in MIGRATIONS {
        conn.execute_batch(sql)?;
    }

    Ok(())
}

/// Drop every user table, including the migration ledger. Returns the number
/// of tables dropped.
pub fn drop_all_tables(pool: &DbPool) -> anyhow::Result<usize> {
    let conn = pool.get()?;

    let tables: Vec<String> = {
        let mut stmt = conn.prepare(
            "SELECT name FROM sqlite_master WHERE type = 'table' AND name NOT LIKE 'sqlite_%'",
        )?;
        let names = stmt
            .query_map([], |row| row.get(0))?
            .collect::<rusqlite::Result<Vec<String>>>()?;
        names
    };

    conn.execute_batch("PRAGMA foreign_keys = OFF;")?;
    for table in &tables {
        tracing::debug!("Dropping table: {}", table);
        conn.execute_batch(&format!("DROP TABLE IF EXISTS \"{}\"", table))?;
    }
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;

    Ok(tables.len())
}

/// Count user tables, as reported after a reset.
pub fn count_tables(pool: &DbPool) -> anyhow::Result<i64> {
    let conn = pool.get()?;
    let count = conn.query_row(
        "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name NOT LIKE 'sqlite_%' AND name != '_migrations'",
        [],
        |row| row.get(0),
    )?;
    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::create_memory_pool;

    #[test]
    fn test_run_migrations_is_idempotent() {
        let pool = create_memory_pool().unwrap();
        run_migrations(&pool).unwrap();
        run_migrations(&pool).unwrap();

        let conn = pool.get().unwrap();
        let applied: i64 = conn
            .query_row("SELECT COUNT(*) FROM _migrations", [], |row| row.get(0))
            .unwrap();
        assert_eq!(applied, MIGRATIONS.len() as i64);
    }

    #[test]
    fn test_drop_all_tables_then_recreate() {
        let pool = create_memory_pool().unwrap();
        run_migrations(&pool).unwrap();
        let before = count_tables(&pool).unwrap();
        assert!(before > 0);

        drop_all_tables(&pool).unwrap();
        assert_eq!(count_tables(&pool).unwrap(), 0);

        run_migrations(&pool).unwrap();
        assert_eq!(count_tables(&pool).unwrap(), before);
    }
}
