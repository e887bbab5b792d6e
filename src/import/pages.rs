/// Best-effort pdf page count at import time.
/// Never panics; returns None on any parse failure.
pub fn count_pages(bytes: &[u8]) -> Option<u32> {
    match std::panic::catch_unwind(|| count_pages_inner(bytes)) {
        Ok(count) => count,
        Err(_) => {
            tracing::warn!("panic while counting pdf pages");
            None
        }
    }
}

fn count_pages_inner(bytes: &[u8]) -> Option<u32> {
    match pdf::file::FileOptions::cached().load(bytes.to_vec()) {
        Ok(file) => Some(file.num_pages()),
        Err(e) => {
            tracing::debug!("page count unavailable: {}", e);
            None
        }
    }
}
