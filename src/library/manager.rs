//! Library manager: sole mutator of the in-memory library.
//!
//! Files live in an id-indexed table; the display order is a list of ids and
//! the current selection is an id, so there is exactly one writable copy of
//! each record no matter how many views point at it. All mutation goes
//! through this type so change notifications fire; viewers treat the library
//! as read-mostly and report positions back through the update operations.

use crate::error::LibraryError;
use crate::export::{self, LibrarySnapshot};
use crate::files::model::{FileContent, MediaFile, MediaType, Settings};
use crate::import::{self, ImportSource};
use crate::library::debounce::{Clock, PersistScheduler, SystemClock};
use crate::library::events::{EventBus, HandlerId, LibraryEvent, Notification};
use crate::store::MediaStore;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

/// Delay after the last of a burst of resume-state updates before the files
/// collection is actually rewritten.
const PERSIST_DEBOUNCE_WINDOW: Duration = Duration::from_secs(1);

const FILES_KEY: &str = "files";
const TWO_PAGE_MODE_KEY: &str = "two_page_mode";
const SIDEBAR_VISIBLE_KEY: &str = "sidebar_visible";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LibraryPhase {
    Uninitialized,
    Loading,
    Ready,
}

struct LibraryState {
    records: HashMap<String, MediaFile>,
    order: Vec<String>,
    current: Option<String>,
    settings: Settings,
    phase: LibraryPhase,
}

pub struct LibraryManager {
    store: Arc<MediaStore>,
    state: Mutex<LibraryState>,
    events: EventBus,
    scheduler: Mutex<PersistScheduler>,
    storage_warned: AtomicBool,
}

impl LibraryManager {
    pub fn new(store: Arc<MediaStore>) -> LibraryManager {
        Self::with_clock(store, Arc::new(SystemClock))
    }

    pub fn with_clock(store: Arc<MediaStore>, clock: Arc<dyn Clock>) -> LibraryManager {
        LibraryManager {
            store,
            state: Mutex::new(LibraryState {
                records: HashMap::new(),
                order: Vec::new(),
                current: None,
                settings: Settings::default(),
                phase: LibraryPhase::Uninitialized,
            }),
            events: EventBus::new(),
            scheduler: Mutex::new(PersistScheduler::new(PERSIST_DEBOUNCE_WINDOW, clock)),
            storage_warned: AtomicBool::new(false),
        }
    }

    /// Load persisted files and settings. Fail-open: a load failure still
    /// lands the library in `Ready` with an empty list so the UI is never
    /// blocked on storage.
    pub fn init(&self) {
        self.state().phase = LibraryPhase::Loading;

        let files = match self.store.get_all_files() {
            Ok(files) => {
                tracing::info!("library loaded: {} file(s)", files.len());
                files
            }
            Err(LibraryError::StorageUnavailable) => {
                self.warn_storage_unavailable();
                Vec::new()
            }
            Err(e) => {
                tracing::warn!("library load failed, starting empty: {}", e);
                Vec::new()
            }
        };
        let settings = self.load_settings();

        {
            let mut st = self.state();
            for file in files {
                st.order.push(file.id.clone());
                st.records.insert(file.id.clone(), file);
            }
            st.settings = settings;
            st.phase = LibraryPhase::Ready;
        }

        self.emit_files_changed();
        self.emit_settings_changed();
    }

    // ── Accessors ─────────────────────────────────────────────────────────────

    pub fn phase(&self) -> LibraryPhase {
        self.state().phase
    }

    /// Snapshot of all files in import order.
    pub fn files(&self) -> Vec<MediaFile> {
        let st = self.state();
        st.order
            .iter()
            .filter_map(|id| st.records.get(id))
            .cloned()
            .collect()
    }

    pub fn file(&self, id: &str) -> Option<MediaFile> {
        self.state().records.get(id).cloned()
    }

    pub fn current_file(&self) -> Option<MediaFile> {
        let st = self.state();
        st.current.as_ref().and_then(|id| st.records.get(id)).cloned()
    }

    pub fn settings(&self) -> Settings {
        self.state().settings
    }

    /// Content access for viewers. `NotFound` surfaces to the caller as a
    /// load failure; the file entry is not auto-removed.
    pub fn get_content(&self, id: &str) -> Result<FileContent, LibraryError> {
        self.store.get_content(id)
    }

    // ── Mutations ─────────────────────────────────────────────────────────────

    /// Import a raw file: derive the media type from the name, generate an
    /// id and thumbnail, persist content then metadata, append, and select
    /// it. A failed content write aborts with `ImportFailed` and the file
    /// never appears in the list.
    pub fn add_file(&self, source: ImportSource) -> Result<MediaFile, LibraryError> {
        let media_type = import::detect_media_type(&source.name);
        let id = uuid::Uuid::new_v4().to_string();
        let thumbnail_data_url = import::thumbnails::thumbnail_data_url(&source.bytes, media_type);
        let page_count = match media_type {
            MediaType::Pdf => import::pages::count_pages(&source.bytes),
            _ => None,
        };

        let file = MediaFile {
            id: id.clone(),
            file_name: source.name.clone(),
            display_name: source.name.clone(),
            media_type,
            file_size: source.bytes.len() as u64,
            import_date: chrono::Utc::now(),
            thumbnail_data_url,
            page_count,
            last_viewed_page: 1,
            last_viewed_time: 0.0,
            video_duration: None,
        };

        // Content first, then metadata. Only the content write is fatal to
        // the import; a metadata persist failure leaves the in-memory entry
        // alive (fail-open) and the next save will retry naturally.
        match self
            .store
            .put_content(&id, &source.bytes, &source.mime_type, &source.name)
        {
            Ok(()) => {}
            Err(LibraryError::StorageUnavailable) => self.warn_storage_unavailable(),
            Err(e) => return Err(LibraryError::ImportFailed(e.to_string())),
        }

        {
            let mut st = self.state();
            st.records.insert(id.clone(), file.clone());
            st.order.push(id.clone());
            st.current = Some(id.clone());
        }
        self.save_files();

        tracing::info!(
            "imported {} ({} bytes, {:?})",
            file.file_name,
            file.file_size,
            file.media_type
        );
        self.emit_files_changed();
        self.emit_current_changed();
        Ok(file)
    }

    /// Remove one file. The in-memory removal is visible immediately; the
    /// storage deletes are best-effort and never block or undo it. When the
    /// removed file was current, the first remaining file (or none) becomes
    /// current.
    pub fn remove_file(&self, id: &str) {
        let (found, selection_changed) = {
            let mut st = self.state();
            if st.records.remove(id).is_none() {
                (false, false)
            } else {
                st.order.retain(|other| other != id);
                if st.current.as_deref() == Some(id) {
                    st.current = st.order.first().cloned();
                    (true, true)
                } else {
                    (true, false)
                }
            }
        };
        if !found {
            tracing::warn!("remove_file: unknown id {}", id);
            return;
        }

        match self.store.delete_content(id) {
            Ok(()) => {}
            Err(LibraryError::StorageUnavailable) => self.warn_storage_unavailable(),
            Err(e) => tracing::warn!("content delete for {} failed: {}", id, e),
        }
        self.save_files();

        self.emit_files_changed();
        if selection_changed {
            self.emit_current_changed();
        }
    }

    /// Clear the whole library. Idempotent; an empty library clears to the
    /// same empty library without error.
    pub fn remove_all_files(&self) {
        {
            let mut st = self.state();
            st.records.clear();
            st.order.clear();
            st.current = None;
        }
        // Nothing left to write; drop any pending debounced flush
        self.scheduler().take_all();

        for (what, result) in [
            ("files", self.store.clear_files()),
            ("content", self.store.clear_content()),
        ] {
            match result {
                Ok(()) => {}
                Err(LibraryError::StorageUnavailable) => self.warn_storage_unavailable(),
                Err(e) => tracing::warn!("clearing {} collection failed: {}", what, e),
            }
        }

        self.emit_files_changed();
    }

    /// Change the selection. Always notifies, even when re-selecting the
    /// same file: callers rely on that to force a viewer refresh.
    pub fn set_current_file(&self, id: Option<&str>) {
        {
            let mut st = self.state();
            match id {
                Some(id) if !st.records.contains_key(id) => {
                    tracing::warn!("set_current_file: unknown id {}", id);
                    return;
                }
                Some(id) => st.current = Some(id.to_string()),
                None => st.current = None,
            }
        }
        self.emit_current_changed();
    }

    /// Edit the display name. Persists immediately (rename is rare and
    /// user-visible everywhere the file is listed).
    pub fn rename_file(&self, id: &str, display_name: &str) {
        let renamed = {
            let mut st = self.state();
            match st.records.get_mut(id) {
                Some(file) => {
                    file.display_name = display_name.to_string();
                    true
                }
                None => false,
            }
        };
        if !renamed {
            tracing::warn!("rename_file: unknown id {}", id);
            return;
        }
        self.save_files();
        self.emit_files_changed();
    }

    // ── Resume-state updates (debounced persistence) ──────────────────────────

    pub fn update_last_viewed_page(&self, id: &str, page: u32) {
        self.update_record(id, |file| file.last_viewed_page = page.max(1));
    }

    pub fn update_last_viewed_time(&self, id: &str, time: f64) {
        if !time.is_finite() {
            tracing::warn!("update_last_viewed_time: non-finite time for {}", id);
            return;
        }
        self.update_record(id, |file| file.last_viewed_time = time.max(0.0));
    }

    pub fn update_video_duration(&self, id: &str, duration: f64) {
        if !duration.is_finite() || duration < 0.0 {
            tracing::warn!("update_video_duration: invalid duration for {}", id);
            return;
        }
        self.update_record(id, |file| file.video_duration = Some(duration));
    }

    /// Mutate the single writable copy of a record, then arm the debounced
    /// persist. No notification: resume-state changes originate from the
    /// viewer that is already displaying the file.
    fn update_record(&self, id: &str, mutate: impl FnOnce(&mut MediaFile)) {
        let found = {
            let mut st = self.state();
            match st.records.get_mut(id) {
                Some(file) => {
                    mutate(file);
                    true
                }
                None => false,
            }
        };
        if found {
            self.scheduler().schedule(FILES_KEY);
        } else {
            tracing::warn!("update for unknown file id {}", id);
        }
    }

    // ── Settings ──────────────────────────────────────────────────────────────

    pub fn toggle_two_page_mode(&self) {
        self.toggle_setting(|s| {
            s.two_page_mode = !s.two_page_mode;
        });
    }

    pub fn toggle_sidebar(&self) {
        self.toggle_setting(|s| {
            s.sidebar_visible = !s.sidebar_visible;
        });
    }

    /// Settings changes are rare and low-volume: persist immediately rather
    /// than through the debounce window.
    fn toggle_setting(&self, flip: impl FnOnce(&mut Settings)) {
        let settings = {
            let mut st = self.state();
            flip(&mut st.settings);
            st.settings
        };
        self.persist_settings(settings);
        self.events.emit(&Notification::SettingsChanged(settings));
    }

    fn persist_settings(&self, settings: Settings) {
        for (key, value) in [
            (TWO_PAGE_MODE_KEY, settings.two_page_mode),
            (SIDEBAR_VISIBLE_KEY, settings.sidebar_visible),
        ] {
            match self.store.put_setting(key, value) {
                Ok(()) => {}
                Err(LibraryError::StorageUnavailable) => self.warn_storage_unavailable(),
                Err(e) => tracing::warn!("persisting setting {} failed: {}", key, e),
            }
        }
    }

    fn load_settings(&self) -> Settings {
        let defaults = Settings::default();
        Settings {
            two_page_mode: self.load_setting(TWO_PAGE_MODE_KEY, defaults.two_page_mode),
            sidebar_visible: self.load_setting(SIDEBAR_VISIBLE_KEY, defaults.sidebar_visible),
        }
    }

    fn load_setting(&self, key: &str, default: bool) -> bool {
        match self.store.get_setting(key) {
            Ok(Some(value)) => value,
            Ok(None) => default,
            Err(LibraryError::StorageUnavailable) => {
                self.warn_storage_unavailable();
                default
            }
            Err(e) => {
                tracing::warn!("loading setting {} failed: {}", key, e);
                default
            }
        }
    }

    // ── Persistence driving ───────────────────────────────────────────────────

    /// Run any debounced writes whose window has elapsed. Returns the number
    /// of writes performed so callers (and tests) can observe collapsing.
    pub fn flush_due(&self) -> usize {
        let due = self.scheduler().take_due();
        self.run_flushes(&due)
    }

    /// Run all pending debounced writes immediately.
    pub fn flush_now(&self) -> usize {
        let due = self.scheduler().take_all();
        self.run_flushes(&due)
    }

    fn run_flushes(&self, keys: &[&'static str]) -> usize {
        let mut flushed = 0;
        for key in keys {
            if *key == FILES_KEY {
                self.save_files();
                flushed += 1;
            }
        }
        flushed
    }

    /// Whole-collection rewrite of the files metadata. Failures are logged,
    /// not retried: the next mutation schedules the write again naturally.
    fn save_files(&self) {
        let snapshot = self.files();
        match self.store.replace_all_files(&snapshot) {
            Ok(()) => tracing::debug!("persisted {} file record(s)", snapshot.len()),
            Err(LibraryError::StorageUnavailable) => self.warn_storage_unavailable(),
            Err(e) => tracing::warn!("file metadata persist failed: {}", e),
        }
    }

    // ── Subscriptions ─────────────────────────────────────────────────────────

    pub fn on(
        &self,
        event: LibraryEvent,
        handler: impl FnMut(&Notification) + Send + 'static,
    ) -> HandlerId {
        self.events.on(event, handler)
    }

    pub fn off(&self, id: HandlerId) -> bool {
        self.events.off(id)
    }

    // ── Export ────────────────────────────────────────────────────────────────

    /// Metadata snapshot for backup/inspection; thumbnails and content are
    /// excluded.
    pub fn export_snapshot(&self) -> LibrarySnapshot {
        let (files, settings) = {
            let st = self.state();
            let files: Vec<MediaFile> = st
                .order
                .iter()
                .filter_map(|id| st.records.get(id))
                .cloned()
                .collect();
            (files, st.settings)
        };
        export::snapshot(&files, settings)
    }

    // ── Internals ─────────────────────────────────────────────────────────────

    fn state(&self) -> MutexGuard<'_, LibraryState> {
        self.state.lock().expect("library state lock poisoned")
    }

    fn scheduler(&self) -> MutexGuard<'_, PersistScheduler> {
        self.scheduler.lock().expect("persist scheduler lock poisoned")
    }

    fn warn_storage_unavailable(&self) {
        if !self.storage_warned.swap(true, Ordering::SeqCst) {
            tracing::warn!("persistent storage unavailable; continuing in memory-only mode");
        }
    }

    fn emit_files_changed(&self) {
        self.events.emit(&Notification::FilesChanged(self.files()));
    }

    fn emit_current_changed(&self) {
        self.events
            .emit(&Notification::CurrentFileChanged(self.current_file()));
    }

    fn emit_settings_changed(&self) {
        self.events
            .emit(&Notification::SettingsChanged(self.settings()));
    }
}
