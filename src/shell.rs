//! Application shell: the composition root.
//!
//! Builds the store, library manager, and the three viewers, subscribes each
//! viewer to selection changes, and forwards user intents (import, delete,
//! select, navigate, setting toggles) to the manager. The shell also drives
//! the debounced-persistence scheduler via [`AppShell::tick`].

use crate::error::LibraryError;
use crate::files::model::{MediaFile, Settings};
use crate::import::ImportSource;
use crate::library::events::{HandlerId, LibraryEvent, Notification};
use crate::library::manager::LibraryManager;
use crate::store::MediaStore;
use crate::viewers::document::DocumentViewer;
use crate::viewers::engine::{DocumentEngine, ImageEngine, VideoEngine};
use crate::viewers::image::ImageViewer;
use crate::viewers::player::MediaPlayer;
use crate::viewers::MediaViewer;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

/// Install the global tracing subscriber. Safe to call more than once; only
/// the first installation wins.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .try_init();
}

/// Durable library location: `~/.mediashelf/library.db`.
pub fn default_store_path() -> PathBuf {
    dirs::home_dir()
        .expect("home dir must exist")
        .join(".mediashelf")
        .join("library.db")
}

pub struct AppShell<D: DocumentEngine, I: ImageEngine, V: VideoEngine> {
    manager: Arc<LibraryManager>,
    document: Arc<Mutex<DocumentViewer<D>>>,
    image: Arc<Mutex<ImageViewer<I>>>,
    player: Arc<Mutex<MediaPlayer<V>>>,
    subscriptions: Vec<HandlerId>,
}

/// Wire one viewer to selection changes. The viewer decides on its own
/// whether the new file is for it; the shell only routes the notification.
fn subscribe_viewer<W: MediaViewer + Send + 'static>(
    manager: &LibraryManager,
    viewer: Arc<Mutex<W>>,
) -> HandlerId {
    manager.on(LibraryEvent::CurrentFileChanged, move |notification| {
        if let Notification::CurrentFileChanged(file) = notification {
            if let Ok(mut viewer) = viewer.lock() {
                viewer.handle_current_file(file.as_ref());
            }
        }
    })
}

impl<D, I, V> AppShell<D, I, V>
where
    D: DocumentEngine + 'static,
    I: ImageEngine + 'static,
    V: VideoEngine + 'static,
{
    pub fn new(
        store: Arc<MediaStore>,
        document_engine: D,
        image_engine: I,
        video_engine: V,
    ) -> Self {
        let manager = Arc::new(LibraryManager::new(store));
        let document = Arc::new(Mutex::new(DocumentViewer::new(
            manager.clone(),
            document_engine,
        )));
        let image = Arc::new(Mutex::new(ImageViewer::new(manager.clone(), image_engine)));
        let player = Arc::new(Mutex::new(MediaPlayer::new(manager.clone(), video_engine)));

        let subscriptions = vec![
            subscribe_viewer(&manager, document.clone()),
            subscribe_viewer(&manager, image.clone()),
            subscribe_viewer(&manager, player.clone()),
        ];

        AppShell {
            manager,
            document,
            image,
            player,
            subscriptions,
        }
    }

    pub fn init(&self) {
        self.manager.init();
    }

    // ── User intents ──────────────────────────────────────────────────────────

    pub fn import(&self, source: ImportSource) -> Result<MediaFile, LibraryError> {
        self.manager.add_file(source)
    }

    pub fn delete(&self, id: &str) {
        self.manager.remove_file(id);
    }

    pub fn delete_all(&self) {
        self.manager.remove_all_files();
    }

    pub fn select(&self, id: Option<&str>) {
        self.manager.set_current_file(id);
    }

    pub fn select_next(&self) {
        self.select_offset(1);
    }

    pub fn select_previous(&self) {
        self.select_offset(-1);
    }

    fn select_offset(&self, delta: i64) {
        let files = self.manager.files();
        if files.is_empty() {
            return;
        }
        let current_index = self
            .manager
            .current_file()
            .and_then(|current| files.iter().position(|f| f.id == current.id));
        let target = match current_index {
            Some(index) => {
                let next = index as i64 + delta;
                if next < 0 || next >= files.len() as i64 {
                    return; // no wrap-around
                }
                next as usize
            }
            None => 0,
        };
        self.manager.set_current_file(Some(&files[target].id));
    }

    pub fn toggle_two_page_mode(&self) {
        self.manager.toggle_two_page_mode();
    }

    pub fn toggle_sidebar(&self) {
        self.manager.toggle_sidebar();
    }

    pub fn settings(&self) -> Settings {
        self.manager.settings()
    }

    /// Run any debounced persistence whose window has elapsed. Call from the
    /// host's timer/idle loop.
    pub fn tick(&self) -> usize {
        self.manager.flush_due()
    }

    /// Flush everything pending, e.g. before the host suspends or exits.
    pub fn flush(&self) -> usize {
        self.manager.flush_now()
    }

    pub fn export_json(&self) -> serde_json::Result<String> {
        self.manager.export_snapshot().to_json()
    }

    // ── Component access ──────────────────────────────────────────────────────

    pub fn manager(&self) -> &Arc<LibraryManager> {
        &self.manager
    }

    pub fn document_viewer(&self) -> &Arc<Mutex<DocumentViewer<D>>> {
        &self.document
    }

    pub fn image_viewer(&self) -> &Arc<Mutex<ImageViewer<I>>> {
        &self.image
    }

    pub fn media_player(&self) -> &Arc<Mutex<MediaPlayer<V>>> {
        &self.player
    }
}

impl<D: DocumentEngine, I: ImageEngine, V: VideoEngine> Drop for AppShell<D, I, V> {
    fn drop(&mut self) {
        for id in self.subscriptions.drain(..) {
            self.manager.off(id);
        }
    }
}

/// Open the durable store at the default location and compose the shell
/// around it. When the platform denies durable storage the library keeps
/// running against a process-lifetime in-memory store (memory-only mode).
pub fn bootstrap<D, I, V>(document_engine: D, image_engine: I, video_engine: V) -> AppShell<D, I, V>
where
    D: DocumentEngine + 'static,
    I: ImageEngine + 'static,
    V: VideoEngine + 'static,
{
    init_tracing();
    let store = match MediaStore::open(&default_store_path()) {
        Ok(store) => store,
        Err(e) => {
            tracing::warn!("falling back to memory-only library: {}", e);
            MediaStore::open_ephemeral().unwrap_or_else(|_| MediaStore::detached())
        }
    };
    let shell = AppShell::new(Arc::new(store), document_engine, image_engine, video_engine);
    shell.init();
    shell
}
