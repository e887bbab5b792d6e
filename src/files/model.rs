use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaType {
    Pdf,
    Image,
    Video,
}

impl MediaType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MediaType::Pdf => "pdf",
            MediaType::Image => "image",
            MediaType::Video => "video",
        }
    }

    /// Inverse of [`as_str`](Self::as_str), used when reading DB rows.
    pub fn parse(s: &str) -> Option<MediaType> {
        match s {
            "pdf" => Some(MediaType::Pdf),
            "image" => Some(MediaType::Image),
            "video" => Some(MediaType::Video),
            _ => None,
        }
    }
}

/// Metadata record for one imported item. Binary content is stored separately
/// (see [`FileContent`]) and fetched by id, so listing the library stays cheap.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaFile {
    /// Opaque unique id, generated at import. Primary key for both the
    /// metadata record and its content record.
    pub id: String,
    /// Original file name, immutable.
    pub file_name: String,
    /// Name shown in the UI; user-editable.
    pub display_name: String,
    /// Derived once at import from the file-name extension, never recomputed.
    pub media_type: MediaType,
    pub file_size: u64,
    pub import_date: chrono::DateTime<chrono::Utc>,
    /// Small rendered preview as a data URL. Best-effort at import; a
    /// generated placeholder stands in when rendering fails.
    pub thumbnail_data_url: String,
    /// Meaningful only for pdf; None until (and unless) extraction succeeds.
    pub page_count: Option<u32>,
    /// Resume page for pdf, >= 1.
    pub last_viewed_page: u32,
    /// Resume position in seconds for video, >= 0.
    pub last_viewed_time: f64,
    /// Meaningful only for video; set once the media engine reports it.
    pub video_duration: Option<f64>,
}

/// Raw bytes of an imported item. Created atomically with its MediaFile at
/// import and deleted with it; never orphaned.
#[derive(Debug, Clone, PartialEq)]
pub struct FileContent {
    pub id: String,
    pub bytes: Vec<u8>,
    pub mime_type: String,
    pub original_name: String,
}

/// Global view settings, persisted independently of any file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    pub two_page_mode: bool,
    pub sidebar_visible: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            two_page_mode: false,
            sidebar_visible: true,
        }
    }
}
