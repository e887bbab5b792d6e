//! External rendering-engine seams. The platform (or a third-party library)
//! supplies the actual pdf rasterizer, image decoder, and video decoder;
//! viewers only depend on these traits and surface any engine failure as a
//! generic render failure.

use thiserror::Error;

#[derive(Debug, Clone, Error)]
#[error("{0}")]
pub struct EngineError(pub String);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderedPage {
    pub page: u32,
    pub width: u32,
    pub height: u32,
}

/// An opened paginated document, held by the document viewer for the
/// lifetime of its activation and dropped on deactivation.
pub trait OpenDocument: Send {
    fn page_count(&self) -> u32;
    fn render_page(&mut self, page: u32) -> Result<RenderedPage, EngineError>;
}

pub trait DocumentEngine: Send {
    fn open(&self, bytes: &[u8]) -> Result<Box<dyn OpenDocument>, EngineError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecodedImage {
    pub width: u32,
    pub height: u32,
}

pub trait ImageEngine: Send {
    fn decode(&self, bytes: &[u8]) -> Result<DecodedImage, EngineError>;
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MediaInfo {
    pub duration: f64,
}

pub trait VideoEngine: Send {
    fn probe(&self, bytes: &[u8]) -> Result<MediaInfo, EngineError>;
}
