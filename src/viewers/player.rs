//! Time-based media player.
//!
//! Seeks persist immediately (a seek is a strong signal of intent); ordinary
//! playback persists the position every few seconds, bounding write volume
//! while keeping the resume point fresh. On load, a saved position above a
//! small threshold is restored automatically; near-zero positions are noise,
//! not a resume point.

use crate::error::LibraryError;
use crate::files::model::{MediaFile, MediaType};
use crate::library::manager::LibraryManager;
use crate::viewers::engine::{EngineError, MediaInfo, VideoEngine};
use crate::viewers::MediaViewer;
use std::sync::Arc;

/// Saved positions at or below this many seconds are ignored on load.
pub const RESUME_THRESHOLD_SECS: f64 = 5.0;
/// Playback position persist cadence.
pub const PERSIST_INTERVAL_SECS: f64 = 5.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PlayerState {
    Empty,
    Loading,
    Ready {
        time: f64,
        duration: f64,
        playing: bool,
    },
}

/// Handle for one in-flight probe; pass back to
/// [`MediaPlayer::commit_load`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProbeTicket {
    generation: u64,
}

pub struct MediaPlayer<E: VideoEngine> {
    manager: Arc<LibraryManager>,
    engine: E,
    state: PlayerState,
    file_id: Option<String>,
    last_persisted: f64,
    generation: u64,
    last_error: Option<LibraryError>,
}

impl<E: VideoEngine> MediaPlayer<E> {
    pub fn new(manager: Arc<LibraryManager>, engine: E) -> Self {
        MediaPlayer {
            manager,
            engine,
            state: PlayerState::Empty,
            file_id: None,
            last_persisted: 0.0,
            generation: 0,
            last_error: None,
        }
    }

    pub fn state(&self) -> PlayerState {
        self.state
    }

    /// Take the most recent load failure, if any, for the host to show as a
    /// transient notification.
    pub fn take_error(&mut self) -> Option<LibraryError> {
        self.last_error.take()
    }

    /// Start a probe, superseding any probe still in flight.
    pub fn begin_load(&mut self) -> ProbeTicket {
        self.generation += 1;
        self.state = PlayerState::Loading;
        self.file_id = None;
        ProbeTicket {
            generation: self.generation,
        }
    }

    /// Commit a finished probe. Superseded tickets are discarded silently.
    /// On success the engine-reported duration is stored on the file and the
    /// saved position is restored when it is worth restoring.
    pub fn commit_load(
        &mut self,
        ticket: ProbeTicket,
        file: &MediaFile,
        result: Result<MediaInfo, EngineError>,
    ) {
        if ticket.generation != self.generation {
            tracing::debug!("discarding superseded media probe");
            return;
        }
        match result {
            Ok(info) => {
                let duration = info.duration.max(0.0);
                self.manager.update_video_duration(&file.id, duration);

                let saved = file.last_viewed_time;
                let time = if saved > RESUME_THRESHOLD_SECS {
                    saved.min(duration)
                } else {
                    0.0
                };
                self.file_id = Some(file.id.clone());
                self.last_persisted = time;
                self.state = PlayerState::Ready {
                    time,
                    duration,
                    playing: false,
                };
            }
            Err(e) => {
                tracing::warn!("media probe failed for {}: {}", file.id, e);
                self.last_error = Some(LibraryError::RenderFailed(e.to_string()));
                self.state = PlayerState::Empty;
            }
        }
    }

    pub fn play(&mut self) {
        if let PlayerState::Ready { playing, .. } = &mut self.state {
            *playing = true;
        }
    }

    pub fn pause(&mut self) {
        if let PlayerState::Ready { playing, .. } = &mut self.state {
            *playing = false;
        }
    }

    /// Clamp into `[0, duration]` and persist immediately.
    pub fn seek(&mut self, to: f64) {
        let PlayerState::Ready { duration, .. } = self.state else {
            return;
        };
        if !to.is_finite() {
            return;
        }
        let clamped = to.clamp(0.0, duration);
        if let PlayerState::Ready { time, .. } = &mut self.state {
            *time = clamped;
        }
        self.last_persisted = clamped;
        if let Some(id) = self.file_id.clone() {
            self.manager.update_last_viewed_time(&id, clamped);
            self.manager.flush_now();
        }
    }

    /// Playback progress reported by the engine. Position is persisted at a
    /// fixed interval rather than every frame.
    pub fn report_time(&mut self, t: f64) {
        let PlayerState::Ready { duration, playing, .. } = self.state else {
            return;
        };
        if !playing || !t.is_finite() {
            return;
        }
        let clamped = t.clamp(0.0, duration);
        if let PlayerState::Ready { time, .. } = &mut self.state {
            *time = clamped;
        }
        if (clamped - self.last_persisted).abs() >= PERSIST_INTERVAL_SECS {
            if let Some(id) = self.file_id.clone() {
                self.manager.update_last_viewed_time(&id, clamped);
            }
            self.last_persisted = clamped;
        }
    }
}

impl<E: VideoEngine> MediaViewer for MediaPlayer<E> {
    fn media_type(&self) -> MediaType {
        MediaType::Video
    }

    fn load_active(&mut self, file: &MediaFile) {
        let ticket = self.begin_load();
        let content = match self.manager.get_content(&file.id) {
            Ok(content) => content,
            Err(e) => {
                tracing::warn!("media load failed for {}: {}", file.id, e);
                self.last_error = Some(e);
                self.state = PlayerState::Empty;
                return;
            }
        };
        let result = self.engine.probe(&content.bytes);
        self.commit_load(ticket, file, result);
    }

    fn clear(&mut self) {
        self.generation += 1; // cancel anything still in flight
        self.state = PlayerState::Empty;
        self.file_id = None;
        self.last_persisted = 0.0;
        self.last_error = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::import::ImportSource;
    use crate::store::MediaStore;
    use crate::viewers::fakes::FakeVideoEngine;

    fn setup(duration: f64) -> (Arc<LibraryManager>, MediaPlayer<FakeVideoEngine>, MediaFile) {
        let store = Arc::new(MediaStore::open_ephemeral().unwrap());
        let manager = Arc::new(LibraryManager::new(store));
        manager.init();
        let file = manager
            .add_file(ImportSource::new("c.mp4", b"mp4".to_vec(), "video/mp4"))
            .unwrap();
        let player = MediaPlayer::new(manager.clone(), FakeVideoEngine::with_duration(duration));
        (manager, player, file)
    }

    #[test]
    fn test_load_stores_engine_reported_duration() {
        let (manager, mut player, file) = setup(42.0);
        player.load_active(&file);

        assert_eq!(
            player.state(),
            PlayerState::Ready {
                time: 0.0,
                duration: 42.0,
                playing: false
            }
        );
        assert_eq!(manager.file(&file.id).unwrap().video_duration, Some(42.0));
    }

    #[test]
    fn test_seek_clamps_to_duration_bounds() {
        let (manager, mut player, file) = setup(120.0);
        player.load_active(&file);

        player.seek(-5.0);
        assert!(matches!(player.state(), PlayerState::Ready { time, .. } if time == 0.0));

        player.seek(500.0);
        assert!(matches!(player.state(), PlayerState::Ready { time, .. } if time == 120.0));
        assert_eq!(manager.file(&file.id).unwrap().last_viewed_time, 120.0);

        player.seek(10.0);
        assert_eq!(
            manager.file(&file.id).unwrap().last_viewed_time,
            10.0,
            "an in-range seek is stored exactly"
        );
    }

    #[test]
    fn test_seek_persists_immediately() {
        let store = Arc::new(MediaStore::open_ephemeral().unwrap());
        let manager = Arc::new(LibraryManager::new(store.clone()));
        manager.init();
        let file = manager
            .add_file(ImportSource::new("c.mp4", b"mp4".to_vec(), "video/mp4"))
            .unwrap();
        let mut player = MediaPlayer::new(manager.clone(), FakeVideoEngine::with_duration(120.0));
        player.load_active(&file);

        player.seek(33.0);
        // Durable immediately, not after the debounce window
        let stored = store.get_all_files().unwrap();
        assert_eq!(stored[0].last_viewed_time, 33.0);
    }

    #[test]
    fn test_load_resumes_saved_position_above_threshold() {
        let (manager, mut player, file) = setup(120.0);
        manager.update_last_viewed_time(&file.id, 47.5);
        player.load_active(&manager.file(&file.id).unwrap());

        assert!(matches!(player.state(), PlayerState::Ready { time, .. } if time == 47.5));
    }

    #[test]
    fn test_load_ignores_near_zero_saved_position() {
        let (manager, mut player, file) = setup(120.0);
        manager.update_last_viewed_time(&file.id, 3.0);
        player.load_active(&manager.file(&file.id).unwrap());

        assert!(
            matches!(player.state(), PlayerState::Ready { time, .. } if time == 0.0),
            "positions at or below the threshold are noise, not resume points"
        );
    }

    #[test]
    fn test_load_clamps_saved_position_past_duration() {
        let (manager, mut player, file) = setup(40.0);
        manager.update_last_viewed_time(&file.id, 90.0);
        player.load_active(&manager.file(&file.id).unwrap());

        assert!(matches!(player.state(), PlayerState::Ready { time, .. } if time == 40.0));
    }

    #[test]
    fn test_playback_persists_at_interval_not_every_tick() {
        let (manager, mut player, file) = setup(120.0);
        player.load_active(&file);
        player.play();

        for tenths in 1..=48 {
            player.report_time(tenths as f64 * 0.1); // 0.1s ticks up to 4.8s
        }
        assert_eq!(
            manager.file(&file.id).unwrap().last_viewed_time,
            0.0,
            "no persist before the interval elapses"
        );

        player.report_time(5.2);
        assert_eq!(manager.file(&file.id).unwrap().last_viewed_time, 5.2);

        player.report_time(7.0);
        assert_eq!(
            manager.file(&file.id).unwrap().last_viewed_time,
            5.2,
            "interval restarts after each persist"
        );
        player.report_time(10.3);
        assert_eq!(manager.file(&file.id).unwrap().last_viewed_time, 10.3);
    }

    #[test]
    fn test_report_time_ignored_while_paused() {
        let (manager, mut player, file) = setup(120.0);
        player.load_active(&file);

        player.report_time(30.0);
        assert!(matches!(player.state(), PlayerState::Ready { time, .. } if time == 0.0));
        assert_eq!(manager.file(&file.id).unwrap().last_viewed_time, 0.0);
    }

    #[test]
    fn test_superseded_probe_is_discarded() {
        let (_m, mut player, file) = setup(42.0);
        let stale = player.begin_load();
        player.load_active(&file);
        let ready = player.state();

        player.commit_load(stale, &file, Ok(MediaInfo { duration: 999.0 }));
        assert_eq!(player.state(), ready, "stale probe must not clobber the player");
    }

    #[test]
    fn test_probe_failure_returns_to_empty() {
        let store = Arc::new(MediaStore::open_ephemeral().unwrap());
        let manager = Arc::new(LibraryManager::new(store));
        manager.init();
        let file = manager
            .add_file(ImportSource::new("c.mp4", b"bad".to_vec(), "video/mp4"))
            .unwrap();
        let mut engine = FakeVideoEngine::with_duration(1.0);
        engine.fail = true;
        let mut player = MediaPlayer::new(manager.clone(), engine);

        player.load_active(&file);
        assert_eq!(player.state(), PlayerState::Empty);
        assert!(matches!(
            player.take_error(),
            Some(LibraryError::RenderFailed(_))
        ));
        assert!(
            manager.file(&file.id).unwrap().video_duration.is_none(),
            "a failed probe must not invent a duration"
        );
    }

    #[test]
    fn test_clear_resets_player() {
        let (_m, mut player, file) = setup(42.0);
        player.load_active(&file);
        player.play();

        player.clear();
        assert_eq!(player.state(), PlayerState::Empty);
    }
}
