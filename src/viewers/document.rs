//! Paginated document viewer.
//!
//! State machine: `Empty → Loading → Ready{page, total}`, with a rendering
//! flag while a page is in flight. Renders are guarded by a generation
//! counter: every load or navigation bumps it, and a finished render commits
//! only when its ticket is still current. The latest request always wins;
//! superseded results are dropped silently rather than queued.

use crate::error::LibraryError;
use crate::files::model::{MediaFile, MediaType};
use crate::library::manager::LibraryManager;
use crate::viewers::engine::{DocumentEngine, EngineError, OpenDocument, RenderedPage};
use crate::viewers::MediaViewer;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentState {
    Empty,
    Loading,
    Ready {
        page: u32,
        total: u32,
        rendering: bool,
    },
}

/// Handle for one in-flight page render; pass back to
/// [`DocumentViewer::commit_render`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderTicket {
    generation: u64,
    page: u32,
}

pub struct DocumentViewer<E: DocumentEngine> {
    manager: Arc<LibraryManager>,
    engine: E,
    doc: Option<Box<dyn OpenDocument>>,
    file_id: Option<String>,
    state: DocumentState,
    generation: u64,
    last_error: Option<LibraryError>,
    // View-local transforms layered on the rendered page; never persisted.
    zoom: f64,
    pan: (f64, f64),
}

impl<E: DocumentEngine> DocumentViewer<E> {
    pub fn new(manager: Arc<LibraryManager>, engine: E) -> Self {
        DocumentViewer {
            manager,
            engine,
            doc: None,
            file_id: None,
            state: DocumentState::Empty,
            generation: 0,
            last_error: None,
            zoom: 1.0,
            pan: (0.0, 0.0),
        }
    }

    pub fn state(&self) -> DocumentState {
        self.state
    }

    /// Take the most recent load/render failure, if any. Failures here are
    /// transient and per-file: the host shows them as a dismissible
    /// notification and the viewer stays usable.
    pub fn take_error(&mut self) -> Option<LibraryError> {
        self.last_error.take()
    }

    pub fn zoom(&self) -> f64 {
        self.zoom
    }

    pub fn pan(&self) -> (f64, f64) {
        self.pan
    }

    /// Clamps into `[1, total]`; a no-op when already on the target page.
    pub fn go_to_page(&mut self, n: u32) {
        let DocumentState::Ready { page, total, .. } = self.state else {
            return;
        };
        let target = n.clamp(1, total);
        if target == page {
            return;
        }
        self.render_now(target);
    }

    pub fn next_page(&mut self) {
        if let DocumentState::Ready { page, .. } = self.state {
            self.go_to_page(page.saturating_add(1));
        }
    }

    pub fn previous_page(&mut self) {
        if let DocumentState::Ready { page, .. } = self.state {
            self.go_to_page(page.saturating_sub(1).max(1));
        }
    }

    /// Start a page render, superseding any render still in flight.
    pub fn begin_render(&mut self, target: u32) -> RenderTicket {
        self.generation += 1;
        if let DocumentState::Ready { rendering, .. } = &mut self.state {
            *rendering = true;
        }
        RenderTicket {
            generation: self.generation,
            page: target,
        }
    }

    /// Commit a finished render. A ticket from a superseded generation is
    /// discarded silently (cancellation is not an error). A successful
    /// commit moves to the rendered page and persists it as the resume page.
    pub fn commit_render(&mut self, ticket: RenderTicket, result: Result<RenderedPage, EngineError>) {
        if ticket.generation != self.generation {
            tracing::debug!("discarding superseded render of page {}", ticket.page);
            return;
        }
        let DocumentState::Ready { page, rendering, .. } = &mut self.state else {
            return;
        };
        *rendering = false;
        match result {
            Ok(_) => {
                *page = ticket.page;
                if let Some(id) = self.file_id.clone() {
                    self.manager.update_last_viewed_page(&id, ticket.page);
                }
            }
            Err(e) => {
                tracing::warn!("page render failed: {}", e);
                self.last_error = Some(LibraryError::RenderFailed(e.to_string()));
            }
        }
    }

    fn render_now(&mut self, target: u32) {
        let ticket = self.begin_render(target);
        let result = match self.doc.as_mut() {
            Some(doc) => doc.render_page(target),
            None => Err(EngineError("no document loaded".to_string())),
        };
        self.commit_render(ticket, result);
    }

    /// View-local zoom; does not touch persisted state.
    pub fn set_zoom(&mut self, zoom: f64) {
        if zoom.is_finite() && zoom > 0.0 {
            self.zoom = zoom;
        }
    }

    pub fn pan_by(&mut self, dx: f64, dy: f64) {
        self.pan.0 += dx;
        self.pan.1 += dy;
    }

    fn release(&mut self) {
        self.doc = None;
        self.file_id = None;
        self.zoom = 1.0;
        self.pan = (0.0, 0.0);
    }
}

impl<E: DocumentEngine> MediaViewer for DocumentViewer<E> {
    fn media_type(&self) -> MediaType {
        MediaType::Pdf
    }

    fn load_active(&mut self, file: &MediaFile) {
        self.generation += 1; // supersede any in-flight render
        self.release();
        self.state = DocumentState::Loading;

        let content = match self.manager.get_content(&file.id) {
            Ok(content) => content,
            Err(e) => {
                tracing::warn!("document load failed for {}: {}", file.id, e);
                self.last_error = Some(e);
                self.state = DocumentState::Empty;
                return;
            }
        };
        let doc = match self.engine.open(&content.bytes) {
            Ok(doc) => doc,
            Err(e) => {
                tracing::warn!("document open failed for {}: {}", file.id, e);
                self.last_error = Some(LibraryError::RenderFailed(e.to_string()));
                self.state = DocumentState::Empty;
                return;
            }
        };

        let total = doc.page_count().max(1);
        let start = file.last_viewed_page.clamp(1, total);
        self.doc = Some(doc);
        self.file_id = Some(file.id.clone());
        self.state = DocumentState::Ready {
            page: start,
            total,
            rendering: false,
        };
        self.render_now(start);
    }

    fn clear(&mut self) {
        self.generation += 1; // cancel anything still in flight
        self.release();
        self.last_error = None;
        self.state = DocumentState::Empty;
    }
}
