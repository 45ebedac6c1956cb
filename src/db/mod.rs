// Database module

pub mod migrations;
pub mod schema;

use rusqlite::{Connection, OpenFlags};
use std::path::Path;

use crate::error::Result;
use schema::{NewVideo, UpsertResult, VideoFilter, VideoRecord};

/// Open or create the writer database at the given path
pub fn open_db(db_path: &Path) -> Result<Connection> {
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let conn = Connection::open(db_path)?;

    // WAL lets read-only connections keep reading while the writer commits
    conn.execute_batch("PRAGMA journal_mode = WAL;")?;

    migrations::run_migrations(&conn)?;

    Ok(conn)
}

/// Open an existing database for reading only. No migrations run.
pub fn open_db_read_only(db_path: &Path) -> Result<Connection> {
    let conn = Connection::open_with_flags(
        db_path,
        OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
    )?;
    Ok(conn)
}

/// Single-writer handle over the videos table.
pub struct MetadataStore {
    conn: Connection,
}

impl MetadataStore {
    pub fn open(db_path: &Path) -> Result<Self> {
        Ok(Self { conn: open_db(db_path)? })
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        migrations::run_migrations(&conn)?;
        Ok(Self { conn })
    }

    pub fn from_connection(conn: Connection) -> Result<Self> {
        migrations::run_migrations(&conn)?;
        Ok(Self { conn })
    }

    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    pub fn upsert(&self, video: &NewVideo) -> Result<UpsertResult> {
        schema::upsert_video(&self.conn, video)
    }

    pub fn exists_by_url(&self, url: &str) -> Result<bool> {
        schema::exists_by_url(&self.conn, url)
    }

    pub fn exists_by_hash(&self, content_hash: &str) -> Result<Option<String>> {
        schema::find_url_by_hash(&self.conn, content_hash)
    }

    /// A stored url other than `url` whose content matches.
    pub fn find_content_match(&self, content_hash: &str, url: &str) -> Result<Option<String>> {
        schema::find_other_url_by_hash(&self.conn, content_hash, url)
    }

    pub fn get(&self, id: i64) -> Result<Option<VideoRecord>> {
        schema::get_video(&self.conn, id)
    }

    pub fn get_by_url(&self, url: &str) -> Result<Option<VideoRecord>> {
        schema::get_video_by_url(&self.conn, url)
    }

    pub fn list(&self, filter: &VideoFilter) -> Result<Vec<VideoRecord>> {
        schema::list_videos(&self.conn, filter)
    }

    pub fn count(&self) -> Result<i64> {
        schema::count_videos(&self.conn)
    }

    pub fn artifact_references(&self, rel_path: &str) -> Result<i64> {
        schema::count_artifact_references(&self.conn, rel_path)
    }
}
