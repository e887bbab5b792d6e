//! Persistent store: durable storage for the three library collections
//! (`files` metadata, `file_content` blobs, `settings`), addressable by
//! single keys. The store does not span transactions across collections;
//! callers handle partial failure.

use crate::db::{open_connection, open_in_memory, run_migrations};
use crate::error::LibraryError;
use crate::files::model::{FileContent, MediaFile};
use crate::files::repository;
use rusqlite::Connection;
use std::path::Path;
use std::sync::Mutex;

pub struct MediaStore {
    conn: Mutex<Option<Connection>>,
}

impl MediaStore {
    /// Open (idempotently initializing) durable storage at `path`.
    ///
    /// Creates the parent directory, the collections, and their secondary
    /// indexes if absent. Fails with `StorageUnavailable` when the platform
    /// denies durable storage; callers are expected to fall back to
    /// [`detached`](Self::detached) and keep running in memory.
    pub fn open(path: &Path) -> Result<MediaStore, LibraryError> {
        if let Some(parent) = path.parent() {
            if let Err(e) = std::fs::create_dir_all(parent) {
                tracing::warn!("cannot create storage dir {:?}: {}", parent, e);
                return Err(LibraryError::StorageUnavailable);
            }
        }
        let conn = open_connection(path)
            .and_then(|conn| {
                run_migrations(&conn)?;
                Ok(conn)
            })
            .map_err(|e| {
                tracing::warn!("cannot open storage at {:?}: {}", path, e);
                LibraryError::StorageUnavailable
            })?;
        Ok(MediaStore {
            conn: Mutex::new(Some(conn)),
        })
    }

    /// Ephemeral store backed by in-memory SQLite. Durable for the lifetime
    /// of the process only; used by tests and as a scratch library.
    pub fn open_ephemeral() -> Result<MediaStore, LibraryError> {
        let conn = open_in_memory()
            .and_then(|conn| {
                run_migrations(&conn)?;
                Ok(conn)
            })
            .map_err(|e| {
                tracing::warn!("cannot open in-memory storage: {}", e);
                LibraryError::StorageUnavailable
            })?;
        Ok(MediaStore {
            conn: Mutex::new(Some(conn)),
        })
    }

    /// A store with no backing storage at all. Every operation reports
    /// `StorageUnavailable`; the library manager degrades to memory-only
    /// mode with a one-time warning.
    pub fn detached() -> MediaStore {
        MediaStore {
            conn: Mutex::new(None),
        }
    }

    pub fn is_available(&self) -> bool {
        self.conn.lock().map(|g| g.is_some()).unwrap_or(false)
    }

    fn with_conn<T>(
        &self,
        f: impl FnOnce(&Connection) -> rusqlite::Result<T>,
    ) -> Result<T, LibraryError> {
        let guard = self
            .conn
            .lock()
            .map_err(|_| LibraryError::StorageUnavailable)?;
        let conn = guard.as_ref().ok_or(LibraryError::StorageUnavailable)?;
        f(conn).map_err(LibraryError::from)
    }

    /// All file records in import order; empty when none.
    pub fn get_all_files(&self) -> Result<Vec<MediaFile>, LibraryError> {
        self.with_conn(repository::get_all_files)
    }

    /// Atomically clear and rewrite the files collection.
    pub fn replace_all_files(&self, files: &[MediaFile]) -> Result<(), LibraryError> {
        self.with_conn(|conn| repository::replace_all_files(conn, files))
    }

    pub fn clear_files(&self) -> Result<(), LibraryError> {
        self.with_conn(repository::clear_files)
    }

    pub fn put_content(
        &self,
        id: &str,
        bytes: &[u8],
        mime_type: &str,
        original_name: &str,
    ) -> Result<(), LibraryError> {
        self.with_conn(|conn| repository::put_content(conn, id, bytes, mime_type, original_name))
    }

    pub fn get_content(&self, id: &str) -> Result<FileContent, LibraryError> {
        self.with_conn(|conn| repository::get_content(conn, id))?
            .ok_or_else(|| LibraryError::NotFound(id.to_string()))
    }

    pub fn delete_content(&self, id: &str) -> Result<(), LibraryError> {
        self.with_conn(|conn| repository::delete_content(conn, id))
    }

    pub fn clear_content(&self) -> Result<(), LibraryError> {
        self.with_conn(repository::clear_content)
    }

    pub fn get_setting(&self, key: &str) -> Result<Option<bool>, LibraryError> {
        self.with_conn(|conn| repository::get_setting(conn, key))
    }

    pub fn put_setting(&self, key: &str, value: bool) -> Result<(), LibraryError> {
        self.with_conn(|conn| repository::put_setting(conn, key, value))
    }

    /// Test hook for simulating backend failures (e.g. dropping a collection
    /// out from under the facade).
    #[cfg(test)]
    pub fn execute_raw(&self, sql: &str) {
        self.with_conn(|conn| conn.execute_batch(sql))
            .expect("raw sql must succeed");
    }
}
