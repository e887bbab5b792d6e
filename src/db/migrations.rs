pub fn run_migrations(conn: &rusqlite::Connection) -> anyhow::Result<()> {
    // Ensure schema_version table exists
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_version (version INTEGER NOT NULL);
         INSERT INTO schema_version SELECT 0 WHERE NOT EXISTS (SELECT 1 FROM schema_version);",
    )?;

    let version = schema_version(conn)?;

    if version < 1 {
        conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS files (
                id                 TEXT PRIMARY KEY,
                file_name          TEXT NOT NULL,
                display_name       TEXT NOT NULL,
                media_type         TEXT NOT NULL,
                file_size          INTEGER NOT NULL,
                import_date        TEXT NOT NULL,
                thumbnail_data_url TEXT NOT NULL DEFAULT '',
                page_count         INTEGER,
                last_viewed_page   INTEGER NOT NULL DEFAULT 1,
                last_viewed_time   REAL NOT NULL DEFAULT 0,
                video_duration     REAL,
                position           INTEGER NOT NULL
            );
            CREATE TABLE IF NOT EXISTS file_content (
                id            TEXT PRIMARY KEY,
                bytes         BLOB NOT NULL,
                mime_type     TEXT NOT NULL,
                original_name TEXT NOT NULL
            );
            CREATE TABLE IF NOT EXISTS settings (
                key   TEXT PRIMARY KEY,
                value INTEGER NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_files_file_name ON files(file_name);
            CREATE INDEX IF NOT EXISTS idx_files_media_type ON files(media_type);
            CREATE INDEX IF NOT EXISTS idx_files_import_date ON files(import_date);
            UPDATE schema_version SET version = 1;
            ",
        )?;
    }

    Ok(())
}

pub fn schema_version(conn: &rusqlite::Connection) -> anyhow::Result<u32> {
    let version: u32 = conn.query_row("SELECT version FROM schema_version LIMIT 1", [], |row| {
        row.get(0)
    })?;
    Ok(version)
}
