use crate::files::model::{FileContent, MediaFile, MediaType};
use rusqlite::{params, Connection, OptionalExtension};

// ── Private helpers ───────────────────────────────────────────────────────────

/// Execute a prepared statement, collect all rows with `f`, and return a Vec.
/// Factored out to avoid the repetitive `prepare → query_map → collect` boilerplate.
fn collect_rows<T, F>(
    conn: &Connection,
    sql: &str,
    params: impl rusqlite::Params,
    f: F,
) -> rusqlite::Result<Vec<T>>
where
    F: Fn(&rusqlite::Row<'_>) -> rusqlite::Result<T>,
{
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt.query_map(params, f)?;
    rows.collect()
}

fn conversion_failure(
    idx: usize,
    err: impl std::error::Error + Send + Sync + 'static,
) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(err))
}

#[derive(Debug)]
struct BadMediaType(String);

impl std::fmt::Display for BadMediaType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "unknown media type '{}'", self.0)
    }
}

impl std::error::Error for BadMediaType {}

fn media_file_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<MediaFile> {
    let media_type_str: String = row.get(3)?;
    let media_type = MediaType::parse(&media_type_str)
        .ok_or_else(|| conversion_failure(3, BadMediaType(media_type_str)))?;
    let import_date_str: String = row.get(5)?;
    let import_date = chrono::DateTime::parse_from_rfc3339(&import_date_str)
        .map(|dt| dt.with_timezone(&chrono::Utc))
        .map_err(|e| conversion_failure(5, e))?;
    let file_size: i64 = row.get(4)?;
    let last_viewed_page: i64 = row.get(8)?;
    Ok(MediaFile {
        id: row.get(0)?,
        file_name: row.get(1)?,
        display_name: row.get(2)?,
        media_type,
        file_size: file_size.max(0) as u64,
        import_date,
        thumbnail_data_url: row.get(6)?,
        page_count: row.get(7)?,
        last_viewed_page: last_viewed_page.max(1) as u32,
        last_viewed_time: row.get(9)?,
        video_duration: row.get(10)?,
    })
}

// ── Files collection ──────────────────────────────────────────────────────────

/// All file records in insertion (import) order.
pub fn get_all_files(conn: &Connection) -> rusqlite::Result<Vec<MediaFile>> {
    collect_rows(
        conn,
        "SELECT id, file_name, display_name, media_type, file_size, import_date,
                thumbnail_data_url, page_count, last_viewed_page, last_viewed_time,
                video_duration
         FROM files ORDER BY position ASC",
        [],
        media_file_from_row,
    )
}

/// Atomically clear and rewrite the whole files collection.
///
/// Whole-library rewrite is the save strategy here: record counts stay small
/// (one user's personal library), so the write amplification is accepted in
/// exchange for not tracking per-record diffs.
pub fn replace_all_files(conn: &Connection, files: &[MediaFile]) -> rusqlite::Result<()> {
    let tx = conn.unchecked_transaction()?;
    tx.execute("DELETE FROM files", [])?;
    {
        let mut stmt = tx.prepare(
            "INSERT INTO files (id, file_name, display_name, media_type, file_size,
                                import_date, thumbnail_data_url, page_count,
                                last_viewed_page, last_viewed_time, video_duration, position)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
        )?;
        for (position, file) in files.iter().enumerate() {
            stmt.execute(params![
                file.id,
                file.file_name,
                file.display_name,
                file.media_type.as_str(),
                file.file_size as i64,
                file.import_date.to_rfc3339(),
                file.thumbnail_data_url,
                file.page_count,
                file.last_viewed_page as i64,
                file.last_viewed_time,
                file.video_duration,
                position as i64,
            ])?;
        }
    }
    tx.commit()
}

pub fn clear_files(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute("DELETE FROM files", [])?;
    Ok(())
}

// ── Content collection ────────────────────────────────────────────────────────

pub fn put_content(
    conn: &Connection,
    id: &str,
    bytes: &[u8],
    mime_type: &str,
    original_name: &str,
) -> rusqlite::Result<()> {
    conn.execute(
        "INSERT OR REPLACE INTO file_content (id, bytes, mime_type, original_name)
         VALUES (?1, ?2, ?3, ?4)",
        params![id, bytes, mime_type, original_name],
    )?;
    Ok(())
}

/// Returns None when no content row exists for the id.
pub fn get_content(conn: &Connection, id: &str) -> rusqlite::Result<Option<FileContent>> {
    conn.query_row(
        "SELECT id, bytes, mime_type, original_name FROM file_content WHERE id = ?1",
        params![id],
        |row| {
            Ok(FileContent {
                id: row.get(0)?,
                bytes: row.get(1)?,
                mime_type: row.get(2)?,
                original_name: row.get(3)?,
            })
        },
    )
    .optional()
}

pub fn delete_content(conn: &Connection, id: &str) -> rusqlite::Result<()> {
    conn.execute("DELETE FROM file_content WHERE id = ?1", params![id])?;
    Ok(())
}

pub fn clear_content(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute("DELETE FROM file_content", [])?;
    Ok(())
}

// ── Settings collection ───────────────────────────────────────────────────────

pub fn get_setting(conn: &Connection, key: &str) -> rusqlite::Result<Option<bool>> {
    conn.query_row(
        "SELECT value FROM settings WHERE key = ?1",
        params![key],
        |row| {
            let value: i64 = row.get(0)?;
            Ok(value != 0)
        },
    )
    .optional()
}

pub fn put_setting(conn: &Connection, key: &str, value: bool) -> rusqlite::Result<()> {
    conn.execute(
        "INSERT OR REPLACE INTO settings (key, value) VALUES (?1, ?2)",
        params![key, value as i64],
    )?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::run_migrations;

    fn test_conn() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        run_migrations(&conn).unwrap();
        conn
    }

    fn sample_file(id: &str, name: &str, media_type: MediaType) -> MediaFile {
        MediaFile {
            id: id.to_string(),
            file_name: name.to_string(),
            display_name: name.to_string(),
            media_type,
            file_size: 1234,
            import_date: chrono::Utc::now(),
            thumbnail_data_url: "data:image/jpeg;base64,".to_string(),
            page_count: None,
            last_viewed_page: 1,
            last_viewed_time: 0.0,
            video_duration: None,
        }
    }

    #[test]
    fn test_replace_all_preserves_insertion_order() {
        let conn = test_conn();
        let files = vec![
            sample_file("c", "c.mp4", MediaType::Video),
            sample_file("a", "a.pdf", MediaType::Pdf),
            sample_file("b", "b.png", MediaType::Image),
        ];
        replace_all_files(&conn, &files).unwrap();

        let loaded = get_all_files(&conn).unwrap();
        let ids: Vec<&str> = loaded.iter().map(|f| f.id.as_str()).collect();
        assert_eq!(ids, vec!["c", "a", "b"], "order must be insertion order");
    }

    #[test]
    fn test_replace_all_overwrites_previous_rows() {
        let conn = test_conn();
        replace_all_files(&conn, &[sample_file("old", "old.pdf", MediaType::Pdf)]).unwrap();
        replace_all_files(&conn, &[sample_file("new", "new.pdf", MediaType::Pdf)]).unwrap();

        let loaded = get_all_files(&conn).unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].id, "new");
    }

    #[test]
    fn test_file_round_trip_preserves_resume_state() {
        let conn = test_conn();
        let mut file = sample_file("v1", "clip.mp4", MediaType::Video);
        file.last_viewed_time = 17.25;
        file.video_duration = Some(42.0);
        replace_all_files(&conn, &[file.clone()]).unwrap();

        let loaded = get_all_files(&conn).unwrap();
        assert_eq!(loaded[0].last_viewed_time, 17.25);
        assert_eq!(loaded[0].video_duration, Some(42.0));
        assert_eq!(loaded[0].media_type, MediaType::Video);
    }

    #[test]
    fn test_content_round_trip_is_byte_identical() {
        let conn = test_conn();
        let bytes: Vec<u8> = (0..=255).cycle().take(10_000).collect();
        put_content(&conn, "f1", &bytes, "application/pdf", "a.pdf").unwrap();

        let content = get_content(&conn, "f1").unwrap().unwrap();
        assert_eq!(content.bytes, bytes, "stored bytes must be identical");
        assert_eq!(content.mime_type, "application/pdf");
        assert_eq!(content.original_name, "a.pdf");
    }

    #[test]
    fn test_get_content_missing_returns_none() {
        let conn = test_conn();
        assert!(get_content(&conn, "ghost").unwrap().is_none());
    }

    #[test]
    fn test_delete_content_then_get_returns_none() {
        let conn = test_conn();
        put_content(&conn, "f1", b"abc", "image/png", "b.png").unwrap();
        delete_content(&conn, "f1").unwrap();
        assert!(get_content(&conn, "f1").unwrap().is_none());
        // Deleting again must not error (never-orphaned cleanup retries freely)
        delete_content(&conn, "f1").unwrap();
    }

    #[test]
    fn test_clear_both_collections_idempotent() {
        let conn = test_conn();
        put_content(&conn, "f1", b"abc", "image/png", "b.png").unwrap();
        replace_all_files(&conn, &[sample_file("f1", "b.png", MediaType::Image)]).unwrap();

        clear_files(&conn).unwrap();
        clear_content(&conn).unwrap();
        clear_files(&conn).unwrap();
        clear_content(&conn).unwrap();

        assert!(get_all_files(&conn).unwrap().is_empty());
        assert!(get_content(&conn, "f1").unwrap().is_none());
    }

    #[test]
    fn test_setting_absent_then_present() {
        let conn = test_conn();
        assert_eq!(get_setting(&conn, "two_page_mode").unwrap(), None);
        put_setting(&conn, "two_page_mode", true).unwrap();
        assert_eq!(get_setting(&conn, "two_page_mode").unwrap(), Some(true));
        put_setting(&conn, "two_page_mode", false).unwrap();
        assert_eq!(get_setting(&conn, "two_page_mode").unwrap(), Some(false));
    }
}
