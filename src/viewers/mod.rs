pub mod document;
pub mod engine;
pub mod image;
pub mod player;

use crate::files::model::{MediaFile, MediaType};

/// Contract shared by the three viewer components. Each owns one on-screen
/// surface and activates only for its own media type; while active it holds
/// engine resources that `clear` must release (holding them past
/// deactivation is a resource leak, not a cosmetic bug).
pub trait MediaViewer {
    fn media_type(&self) -> MediaType;

    /// Fetch content through the library manager and hand it to the engine.
    fn load_active(&mut self, file: &MediaFile);

    /// Release engine resources and reset to the initial display state.
    fn clear(&mut self);

    /// `currentFileChanged` dispatch: activate on a type match, release
    /// otherwise.
    fn handle_current_file(&mut self, file: Option<&MediaFile>) {
        match file {
            Some(f) if f.media_type == self.media_type() => self.load_active(f),
            _ => self.clear(),
        }
    }
}

#[cfg(test)]
pub mod fakes {
    //! Stand-in engines for viewer and shell tests.

    use super::engine::*;
    use std::sync::{Arc, Mutex};

    pub struct FakeDocumentEngine {
        pub pages: u32,
        pub fail_open: bool,
        /// Pages rendered across all documents opened by this engine.
        pub rendered: Arc<Mutex<Vec<u32>>>,
    }

    impl FakeDocumentEngine {
        pub fn with_pages(pages: u32) -> Self {
            FakeDocumentEngine {
                pages,
                fail_open: false,
                rendered: Arc::new(Mutex::new(Vec::new())),
            }
        }
    }

    struct FakeDocument {
        pages: u32,
        rendered: Arc<Mutex<Vec<u32>>>,
    }

    impl OpenDocument for FakeDocument {
        fn page_count(&self) -> u32 {
            self.pages
        }

        fn render_page(&mut self, page: u32) -> Result<RenderedPage, EngineError> {
            if page < 1 || page > self.pages {
                return Err(EngineError(format!("page {} out of range", page)));
            }
            self.rendered.lock().unwrap().push(page);
            Ok(RenderedPage {
                page,
                width: 612,
                height: 792,
            })
        }
    }

    impl DocumentEngine for FakeDocumentEngine {
        fn open(&self, _bytes: &[u8]) -> Result<Box<dyn OpenDocument>, EngineError> {
            if self.fail_open {
                return Err(EngineError("fake open failure".to_string()));
            }
            Ok(Box::new(FakeDocument {
                pages: self.pages,
                rendered: self.rendered.clone(),
            }))
        }
    }

    pub struct FakeImageEngine {
        pub width: u32,
        pub height: u32,
        pub fail: bool,
    }

    impl FakeImageEngine {
        pub fn with_dimensions(width: u32, height: u32) -> Self {
            FakeImageEngine {
                width,
                height,
                fail: false,
            }
        }
    }

    impl ImageEngine for FakeImageEngine {
        fn decode(&self, _bytes: &[u8]) -> Result<DecodedImage, EngineError> {
            if self.fail {
                return Err(EngineError("fake decode failure".to_string()));
            }
            Ok(DecodedImage {
                width: self.width,
                height: self.height,
            })
        }
    }

    pub struct FakeVideoEngine {
        pub duration: f64,
        pub fail: bool,
    }

    impl FakeVideoEngine {
        pub fn with_duration(duration: f64) -> Self {
            FakeVideoEngine {
                duration,
                fail: false,
            }
        }
    }

    impl VideoEngine for FakeVideoEngine {
        fn probe(&self, _bytes: &[u8]) -> Result<MediaInfo, EngineError> {
            if self.fail {
                return Err(EngineError("fake probe failure".to_string()));
            }
            Ok(MediaInfo {
                duration: self.duration,
            })
        }
    }
}
