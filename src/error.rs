use thiserror::Error;

/// Error taxonomy surfaced at component boundaries. Storage and render
/// failures are converted to non-blocking notifications by callers; none of
/// these are allowed to halt the event loop.
#[derive(Debug, Error)]
pub enum LibraryError {
    /// The platform denied durable storage. Fatal to persistence only; the
    /// library keeps running in memory-only mode.
    #[error("persistent storage is unavailable")]
    StorageUnavailable,

    /// Content was requested for an id that was never stored or was deleted.
    /// The file entry itself is not auto-removed.
    #[error("no stored content for file {0}")]
    NotFound(String),

    /// Content persistence failed during import; the partial file must not
    /// appear in the library.
    #[error("import failed: {0}")]
    ImportFailed(String),

    /// A media engine failed to render. Transient and per-file.
    #[error("render failed: {0}")]
    RenderFailed(String),

    #[error(transparent)]
    Storage(#[from] rusqlite::Error),
}
