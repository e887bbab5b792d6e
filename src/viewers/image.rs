//! Continuous image viewer: zoom, pan, and touch gestures.
//!
//! The key usability contract is focal-point zoom: wheel, pinch, and
//! double-click zoom all keep the point under the cursor (or between the
//! fingers) visually fixed by recomputing the pan proportionally to the
//! scale change.

use crate::error::LibraryError;
use crate::files::model::{MediaFile, MediaType};
use crate::library::manager::LibraryManager;
use crate::viewers::engine::{DecodedImage, EngineError, ImageEngine};
use crate::viewers::MediaViewer;
use std::sync::Arc;

pub const MIN_SCALE: f64 = 0.1;
pub const MAX_SCALE: f64 = 5.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewTransform {
    pub scale: f64,
    pub pan_x: f64,
    pub pan_y: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ImageState {
    Empty,
    Loading,
    Ready {
        width: u32,
        height: u32,
        transform: ViewTransform,
    },
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum GestureMode {
    Idle,
    Pan { last: (f64, f64) },
    Pinch { distance: f64, center: (f64, f64) },
}

/// Handle for one in-flight decode; pass back to
/// [`ImageViewer::commit_load`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecodeTicket {
    generation: u64,
}

pub struct ImageViewer<E: ImageEngine> {
    manager: Arc<LibraryManager>,
    engine: E,
    state: ImageState,
    gesture: GestureMode,
    container: (f64, f64),
    generation: u64,
    last_error: Option<LibraryError>,
}

impl<E: ImageEngine> ImageViewer<E> {
    pub fn new(manager: Arc<LibraryManager>, engine: E) -> Self {
        ImageViewer {
            manager,
            engine,
            state: ImageState::Empty,
            gesture: GestureMode::Idle,
            container: (0.0, 0.0),
            generation: 0,
            last_error: None,
        }
    }

    pub fn state(&self) -> ImageState {
        self.state
    }

    /// Take the most recent load failure, if any, for the host to show as a
    /// transient notification.
    pub fn take_error(&mut self) -> Option<LibraryError> {
        self.last_error.take()
    }

    pub fn transform(&self) -> Option<ViewTransform> {
        match self.state {
            ImageState::Ready { transform, .. } => Some(transform),
            _ => None,
        }
    }

    pub fn set_container(&mut self, width: f64, height: f64) {
        self.container = (width, height);
    }

    /// Start a decode, superseding any decode still in flight.
    pub fn begin_load(&mut self) -> DecodeTicket {
        self.generation += 1;
        self.state = ImageState::Loading;
        self.gesture = GestureMode::Idle;
        DecodeTicket {
            generation: self.generation,
        }
    }

    /// Commit a finished decode. Superseded tickets are discarded silently.
    pub fn commit_load(&mut self, ticket: DecodeTicket, result: Result<DecodedImage, EngineError>) {
        if ticket.generation != self.generation {
            tracing::debug!("discarding superseded image decode");
            return;
        }
        match result {
            Ok(image) => {
                self.state = ImageState::Ready {
                    width: image.width,
                    height: image.height,
                    transform: ViewTransform {
                        scale: 1.0,
                        pan_x: 0.0,
                        pan_y: 0.0,
                    },
                };
                self.fit_to_container();
            }
            Err(e) => {
                tracing::warn!("image render failed: {}", e);
                self.last_error = Some(LibraryError::RenderFailed(e.to_string()));
                self.state = ImageState::Empty;
            }
        }
    }

    /// Scale to fit the longer relative dimension inside the container,
    /// then center.
    pub fn fit_to_container(&mut self) {
        let (cw, ch) = self.container;
        let ImageState::Ready {
            width,
            height,
            transform,
        } = &mut self.state
        else {
            return;
        };
        if cw <= 0.0 || ch <= 0.0 || *width == 0 || *height == 0 {
            return;
        }
        let scale = (cw / *width as f64)
            .min(ch / *height as f64)
            .clamp(MIN_SCALE, MAX_SCALE);
        transform.scale = scale;
        transform.pan_x = (cw - *width as f64 * scale) / 2.0;
        transform.pan_y = (ch - *height as f64 * scale) / 2.0;
    }

    /// Zoom to an absolute scale, clamped to `[MIN_SCALE, MAX_SCALE]`. With
    /// a focal point, the image point under it stays visually fixed.
    pub fn zoom_to(&mut self, scale: f64, focal: Option<(f64, f64)>) {
        if !scale.is_finite() {
            return;
        }
        let ImageState::Ready { transform, .. } = &mut self.state else {
            return;
        };
        let new_scale = scale.clamp(MIN_SCALE, MAX_SCALE);
        if let Some((fx, fy)) = focal {
            let ratio = new_scale / transform.scale;
            transform.pan_x = fx - (fx - transform.pan_x) * ratio;
            transform.pan_y = fy - (fy - transform.pan_y) * ratio;
        }
        transform.scale = new_scale;
    }

    pub fn zoom_by(&mut self, factor: f64, focal: Option<(f64, f64)>) {
        if let ImageState::Ready { transform, .. } = self.state {
            self.zoom_to(transform.scale * factor, focal);
        }
    }

    pub fn pan_by(&mut self, dx: f64, dy: f64) {
        if let ImageState::Ready { transform, .. } = &mut self.state {
            transform.pan_x += dx;
            transform.pan_y += dy;
        }
    }

    // ── Touch gestures ────────────────────────────────────────────────────────

    pub fn touch_start(&mut self, points: &[(f64, f64)]) {
        self.gesture = Self::gesture_for(points);
    }

    pub fn touch_move(&mut self, points: &[(f64, f64)]) {
        match (self.gesture, points) {
            (GestureMode::Pan { last }, [p]) => {
                self.pan_by(p.0 - last.0, p.1 - last.1);
                self.gesture = GestureMode::Pan { last: *p };
            }
            (GestureMode::Pinch { distance, center }, [a, b]) => {
                let d = Self::distance(a, b);
                let c = Self::midpoint(a, b);
                if distance > f64::EPSILON {
                    self.zoom_by(d / distance, Some(c));
                }
                self.pan_by(c.0 - center.0, c.1 - center.1);
                self.gesture = GestureMode::Pinch {
                    distance: d,
                    center: c,
                };
            }
            // Touch count changed (one finger lifted or added): re-anchor at
            // the new points so the image does not jump at the transition.
            (_, points) => self.gesture = Self::gesture_for(points),
        }
    }

    pub fn touch_end(&mut self, remaining: &[(f64, f64)]) {
        self.gesture = Self::gesture_for(remaining);
    }

    fn gesture_for(points: &[(f64, f64)]) -> GestureMode {
        match points {
            [p] => GestureMode::Pan { last: *p },
            [a, b] => GestureMode::Pinch {
                distance: Self::distance(a, b),
                center: Self::midpoint(a, b),
            },
            _ => GestureMode::Idle,
        }
    }

    fn distance(a: &(f64, f64), b: &(f64, f64)) -> f64 {
        ((a.0 - b.0).powi(2) + (a.1 - b.1).powi(2)).sqrt()
    }

    fn midpoint(a: &(f64, f64), b: &(f64, f64)) -> (f64, f64) {
        ((a.0 + b.0) / 2.0, (a.1 + b.1) / 2.0)
    }
}

impl<E: ImageEngine> MediaViewer for ImageViewer<E> {
    fn media_type(&self) -> MediaType {
        MediaType::Image
    }

    fn load_active(&mut self, file: &MediaFile) {
        let ticket = self.begin_load();
        let content = match self.manager.get_content(&file.id) {
            Ok(content) => content,
            Err(e) => {
                tracing::warn!("image load failed for {}: {}", file.id, e);
                self.last_error = Some(e);
                self.state = ImageState::Empty;
                return;
            }
        };
        let result = self.engine.decode(&content.bytes);
        self.commit_load(ticket, result);
    }

    fn clear(&mut self) {
        self.generation += 1; // cancel anything still in flight
        self.state = ImageState::Empty;
        self.gesture = GestureMode::Idle;
        self.last_error = None;
    }
}
