//! Library snapshot export: a self-contained, versioned document listing all
//! file metadata plus the current settings, for backup and inspection.
//! Thumbnails and binary content are deliberately excluded.

use crate::files::model::{MediaFile, MediaType, Settings};
use serde::{Deserialize, Serialize};

pub const EXPORT_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportedFile {
    pub id: String,
    pub file_name: String,
    pub display_name: String,
    pub media_type: MediaType,
    pub file_size: u64,
    pub import_date: chrono::DateTime<chrono::Utc>,
    pub page_count: Option<u32>,
    pub last_viewed_page: u32,
    pub last_viewed_time: f64,
    pub video_duration: Option<f64>,
}

impl From<&MediaFile> for ExportedFile {
    fn from(file: &MediaFile) -> Self {
        ExportedFile {
            id: file.id.clone(),
            file_name: file.file_name.clone(),
            display_name: file.display_name.clone(),
            media_type: file.media_type,
            file_size: file.file_size,
            import_date: file.import_date,
            page_count: file.page_count,
            last_viewed_page: file.last_viewed_page,
            last_viewed_time: file.last_viewed_time,
            video_duration: file.video_duration,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LibrarySnapshot {
    pub version: u32,
    pub export_date: chrono::DateTime<chrono::Utc>,
    pub files: Vec<ExportedFile>,
    pub settings: Settings,
}

impl LibrarySnapshot {
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

pub fn snapshot(files: &[MediaFile], settings: Settings) -> LibrarySnapshot {
    LibrarySnapshot {
        version: EXPORT_VERSION,
        export_date: chrono::Utc::now(),
        files: files.iter().map(ExportedFile::from).collect(),
        settings,
    }
}
