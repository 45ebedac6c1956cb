// Database migrations
// Migrations are forward-only. Never edit or delete a migration after it ships.
// Every step is idempotent so stores created by older tools (no user_version) open cleanly.

use rusqlite::Connection;
use crate::error::{VidpeekError, Result};

enum Migration {
    Sql(&'static str),
    /// Add a column in place unless it already exists, then run the follow-up SQL.
    AddColumn {
        table: &'static str,
        column: &'static str,
        decl: &'static str,
        then: &'static str,
    },
}

/// All migrations in order.
const MIGRATIONS: &[Migration] = &[
    // Migration 1: videos table
    Migration::Sql(
        r#"
        CREATE TABLE IF NOT EXISTS videos (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            user TEXT NOT NULL,
            url TEXT UNIQUE,
            source TEXT,
            title TEXT,
            description TEXT,
            thumb_path TEXT,
            vid_preview_path TEXT,
            upload_year INTEGER,
            date_added TIMESTAMP DEFAULT CURRENT_TIMESTAMP
        );
        CREATE INDEX IF NOT EXISTS idx_user ON videos(user);
        "#,
    ),
    // Migration 2: content fingerprint for cross-url duplicate detection
    Migration::AddColumn {
        table: "videos",
        column: "content_hash",
        decl: "TEXT",
        then: "CREATE INDEX IF NOT EXISTS idx_content_hash ON videos(content_hash);",
    },
    // Migration 3: preview container. Rows that predate the column are GIF previews
    // unless their path says otherwise; new rows always write the value explicitly.
    Migration::AddColumn {
        table: "videos",
        column: "preview_type",
        decl: "TEXT DEFAULT 'gif'",
        then: "UPDATE videos SET preview_type = 'mp4'
               WHERE preview_type IS NOT 'mp4' AND lower(vid_preview_path) LIKE '%.mp4';",
    },
];

/// Latest schema version this build knows.
pub fn target_version() -> u32 {
    MIGRATIONS.len() as u32
}

/// Get current schema version from database
pub fn get_schema_version(conn: &Connection) -> Result<u32> {
    let version: u32 = conn.query_row(
        "PRAGMA user_version",
        [],
        |row| row.get(0)
    )?;
    Ok(version)
}

pub fn has_column(conn: &Connection, table: &str, column: &str) -> Result<bool> {
    let mut stmt = conn.prepare(&format!("PRAGMA table_info({})", table))?;
    let names = stmt
        .query_map([], |row| row.get::<_, String>(1))?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(names.iter().any(|n| n.eq_ignore_ascii_case(column)))
}

fn apply(conn: &Connection, migration: &Migration) -> Result<()> {
    match migration {
        Migration::Sql(sql) => conn.execute_batch(sql)?,
        Migration::AddColumn { table, column, decl, then } => {
            if has_column(conn, table, column)? {
                log::debug!("Column {}.{} already present", table, column);
            } else {
                conn.execute_batch(&format!("ALTER TABLE {} ADD COLUMN {} {}", table, column, decl))?;
                log::info!("Added column {}.{}", table, column);
            }
            if !then.is_empty() {
                conn.execute_batch(then)?;
            }
        }
    }
    Ok(())
}

/// Run all pending migrations, each in its own transaction
pub fn run_migrations(conn: &Connection) -> Result<()> {
    let current_version = get_schema_version(conn)?;
    let target_version = target_version();

    // Refuse to open a DB created by a newer build
    if current_version > target_version {
        return Err(VidpeekError::SchemaTooNew {
            found: current_version,
            supported: target_version,
        });
    }

    if current_version == target_version {
        return Ok(());
    }

    for (i, migration) in MIGRATIONS.iter().enumerate() {
        let migration_version = (i + 1) as u32;
        if migration_version <= current_version {
            continue;
        }

        let tx = conn.unchecked_transaction()?;
        apply(&tx, migration)?;
        tx.execute_batch(&format!("PRAGMA user_version = {}", migration_version))?;
        tx.commit()?;

        log::info!("Applied migration {}", migration_version);
    }

    Ok(())
}
