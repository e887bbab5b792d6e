pub fn open_connection(path: &std::path::Path) -> anyhow::Result<rusqlite::Connection> {
    let conn = rusqlite::Connection::open(path)?;
    conn.execute_batch("PRAGMA journal_mode=WAL;")?;
    conn.execute_batch("PRAGMA busy_timeout=5000;")?;
    Ok(conn)
}

pub fn open_in_memory() -> anyhow::Result<rusqlite::Connection> {
    Ok(rusqlite::Connection::open_in_memory()?)
}
