pub mod pages;
pub mod thumbnails;

use crate::files::model::MediaType;
use std::path::Path;

const PDF_EXTENSIONS: &[&str] = &["pdf"];
const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "gif", "webp", "bmp", "avif", "svg"];
const VIDEO_EXTENSIONS: &[&str] = &["mp4", "webm", "ogv", "ogg", "mov", "m4v"];

/// A raw file handed to the import entry point from any source (file picker,
/// drag-and-drop): name, bytes, and the declared MIME type.
#[derive(Debug, Clone)]
pub struct ImportSource {
    pub name: String,
    pub bytes: Vec<u8>,
    pub mime_type: String,
}

impl ImportSource {
    pub fn new(name: impl Into<String>, bytes: Vec<u8>, mime_type: impl Into<String>) -> Self {
        ImportSource {
            name: name.into(),
            bytes,
            mime_type: mime_type.into(),
        }
    }
}

/// Detect the media type from the file-name extension (case-insensitive).
///
/// Anything that is neither a known image nor a known video extension
/// imports as pdf, including unrecognized extensions. The fallback is
/// intentional, kept from the original behavior rather than tightened into
/// a rejection.
pub fn detect_media_type(file_name: &str) -> MediaType {
    let ext = Path::new(file_name)
        .extension()
        .and_then(|e| e.to_str())
        .map(|s| s.to_lowercase())
        .unwrap_or_default();

    if IMAGE_EXTENSIONS.contains(&ext.as_str()) {
        MediaType::Image
    } else if VIDEO_EXTENSIONS.contains(&ext.as_str()) {
        MediaType::Video
    } else {
        if !PDF_EXTENSIONS.contains(&ext.as_str()) {
            tracing::debug!("unrecognized extension '{}', importing as pdf", ext);
        }
        MediaType::Pdf
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_pdf() {
        assert_eq!(detect_media_type("a.pdf"), MediaType::Pdf);
        assert_eq!(detect_media_type("report.PDF"), MediaType::Pdf);
    }

    #[test]
    fn test_detect_image() {
        assert_eq!(detect_media_type("b.png"), MediaType::Image);
        assert_eq!(detect_media_type("photo.JPEG"), MediaType::Image);
        assert_eq!(detect_media_type("anim.gif"), MediaType::Image);
        assert_eq!(detect_media_type("pic.webp"), MediaType::Image);
    }

    #[test]
    fn test_detect_video() {
        assert_eq!(detect_media_type("c.mp4"), MediaType::Video);
        assert_eq!(detect_media_type("clip.WebM"), MediaType::Video);
        assert_eq!(detect_media_type("movie.mov"), MediaType::Video);
    }

    #[test]
    fn test_unknown_extension_falls_back_to_pdf() {
        assert_eq!(detect_media_type("notes.xyz"), MediaType::Pdf);
        assert_eq!(detect_media_type("archive.tar.gz"), MediaType::Pdf);
        assert_eq!(detect_media_type("no_extension"), MediaType::Pdf);
    }
}
