// Queries for the videos table

use rusqlite::{Connection, params, OptionalExtension};
use serde::{Deserialize, Serialize};
use crate::error::Result;
use crate::source::SourceKind;

const VIDEO_COLUMNS: &str =
    "id, user, url, source, title, description, thumb_path, vid_preview_path,
     upload_year, content_hash, preview_type, date_added";

// ----- Videos -----

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VideoRecord {
    pub id: i64,
    pub user: String,
    pub url: String,
    pub source: Option<String>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub thumb_path: Option<String>,
    pub vid_preview_path: Option<String>,
    pub upload_year: Option<i32>,
    pub content_hash: Option<String>,
    pub preview_type: Option<String>,
    pub date_added: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NewVideo {
    pub user: String,
    pub url: String,
    pub source: SourceKind,
    pub title: String,
    pub description: String,
    pub thumb_path: String,
    pub vid_preview_path: String,
    pub upload_year: Option<i32>,
    pub content_hash: Option<String>,
    pub preview_type: String,
}

/// Artifact paths of a row that an upsert replaced.
#[derive(Debug, Clone, PartialEq)]
pub struct ReplacedArtifacts {
    pub thumb_path: Option<String>,
    pub vid_preview_path: Option<String>,
}

#[derive(Debug, Clone)]
pub struct UpsertResult {
    pub id: i64,
    pub replaced: Option<ReplacedArtifacts>,
}

#[derive(Debug, Clone, Default)]
pub struct VideoFilter {
    pub user: Option<String>,
    pub upload_year: Option<i32>,
    pub source: Option<SourceKind>,
    pub limit: Option<i64>,
}

/// Insert or replace keyed by url, in one transaction.
pub fn upsert_video(conn: &Connection, video: &NewVideo) -> Result<UpsertResult> {
    let tx = conn.unchecked_transaction()?;

    let replaced = tx.query_row(
        "SELECT thumb_path, vid_preview_path FROM videos WHERE url = ?1",
        params![video.url],
        |row| Ok(ReplacedArtifacts {
            thumb_path: row.get(0)?,
            vid_preview_path: row.get(1)?,
        }),
    ).optional()?;

    tx.execute(
        "INSERT OR REPLACE INTO videos
            (user, url, source, title, description, thumb_path, vid_preview_path,
             upload_year, content_hash, preview_type)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
        params![
            video.user,
            video.url,
            video.source.as_str(),
            video.title,
            video.description,
            video.thumb_path,
            video.vid_preview_path,
            video.upload_year,
            video.content_hash,
            video.preview_type,
        ],
    )?;
    let id = tx.last_insert_rowid();
    tx.commit()?;

    Ok(UpsertResult { id, replaced })
}

pub fn exists_by_url(conn: &Connection, url: &str) -> Result<bool> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM videos WHERE url = ?1",
        params![url],
        |row| row.get(0),
    )?;
    Ok(count > 0)
}

/// Url of the oldest row with this fingerprint.
pub fn find_url_by_hash(conn: &Connection, content_hash: &str) -> Result<Option<String>> {
    let url = conn.query_row(
        "SELECT url FROM videos WHERE content_hash = ?1 ORDER BY id ASC LIMIT 1",
        params![content_hash],
        |row| row.get(0),
    ).optional()?;
    Ok(url)
}

/// Like `find_url_by_hash`, but never answers with `exclude_url` itself.
pub fn find_other_url_by_hash(conn: &Connection, content_hash: &str, exclude_url: &str) -> Result<Option<String>> {
    let url = conn.query_row(
        "SELECT url FROM videos WHERE content_hash = ?1 AND url != ?2 ORDER BY id ASC LIMIT 1",
        params![content_hash, exclude_url],
        |row| row.get(0),
    ).optional()?;
    Ok(url)
}

pub fn get_video(conn: &Connection, id: i64) -> Result<Option<VideoRecord>> {
    let sql = format!("SELECT {} FROM videos WHERE id = ?1", VIDEO_COLUMNS);
    let video = conn.query_row(&sql, params![id], map_video).optional()?;
    Ok(video)
}

pub fn get_video_by_url(conn: &Connection, url: &str) -> Result<Option<VideoRecord>> {
    let sql = format!("SELECT {} FROM videos WHERE url = ?1", VIDEO_COLUMNS);
    let video = conn.query_row(&sql, params![url], map_video).optional()?;
    Ok(video)
}

/// Newest first.
pub fn list_videos(conn: &Connection, filter: &VideoFilter) -> Result<Vec<VideoRecord>> {
    let mut where_clauses: Vec<String> = Vec::new();
    let mut params_vec: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();

    if let Some(ref user) = filter.user {
        params_vec.push(Box::new(user.clone()));
        where_clauses.push(format!("user = ?{}", params_vec.len()));
    }
    if let Some(year) = filter.upload_year {
        params_vec.push(Box::new(year));
        where_clauses.push(format!("upload_year = ?{}", params_vec.len()));
    }
    if let Some(source) = filter.source {
        params_vec.push(Box::new(source.as_str()));
        where_clauses.push(format!("source = ?{}", params_vec.len()));
    }

    let mut sql = format!("SELECT {} FROM videos", VIDEO_COLUMNS);
    if !where_clauses.is_empty() {
        sql.push_str(" WHERE ");
        sql.push_str(&where_clauses.join(" AND "));
    }
    sql.push_str(" ORDER BY date_added DESC, id DESC");
    if let Some(limit) = filter.limit {
        params_vec.push(Box::new(limit));
        sql.push_str(&format!(" LIMIT ?{}", params_vec.len()));
    }

    let params_refs: Vec<&dyn rusqlite::ToSql> = params_vec.iter().map(|p| p.as_ref()).collect();
    let mut stmt = conn.prepare(&sql)?;
    let videos = stmt
        .query_map(params_refs.as_slice(), map_video)?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    Ok(videos)
}

pub fn count_videos(conn: &Connection) -> Result<i64> {
    let count: i64 = conn.query_row("SELECT COUNT(*) FROM videos", [], |row| row.get(0))?;
    Ok(count)
}

/// Rows whose thumbnail or preview is this relative path.
pub fn count_artifact_references(conn: &Connection, rel_path: &str) -> Result<i64> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM videos WHERE thumb_path = ?1 OR vid_preview_path = ?1",
        params![rel_path],
        |row| row.get(0),
    )?;
    Ok(count)
}

fn map_video(row: &rusqlite::Row) -> rusqlite::Result<VideoRecord> {
    Ok(VideoRecord {
        id: row.get(0)?,
        user: row.get(1)?,
        url: row.get(2)?,
        source: row.get(3)?,
        title: row.get(4)?,
        description: row.get(5)?,
        thumb_path: row.get(6)?,
        vid_preview_path: row.get(7)?,
        upload_year: row.get(8)?,
        content_hash: row.get(9)?,
        preview_type: row.get(10)?,
        date_added: row.get(11)?,
    })
}
