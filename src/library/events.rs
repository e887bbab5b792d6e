//! Observer registry connecting the library manager to its viewers.
//!
//! Handlers run synchronously, in subscription order, on the emitting thread.
//! A panicking handler is caught and logged so the remaining handlers still
//! run. Handlers must not call `on`/`off`/`emit` reentrantly; they may freely
//! call back into the manager's read and update operations.

use crate::files::model::{MediaFile, Settings};
use std::panic::AssertUnwindSafe;
use std::sync::Mutex;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LibraryEvent {
    FilesChanged,
    CurrentFileChanged,
    SettingsChanged,
}

/// Event payloads: the full updated list, the newly current file (or none),
/// or the settings.
#[derive(Debug, Clone)]
pub enum Notification {
    FilesChanged(Vec<MediaFile>),
    CurrentFileChanged(Option<MediaFile>),
    SettingsChanged(Settings),
}

impl Notification {
    pub fn event(&self) -> LibraryEvent {
        match self {
            Notification::FilesChanged(_) => LibraryEvent::FilesChanged,
            Notification::CurrentFileChanged(_) => LibraryEvent::CurrentFileChanged,
            Notification::SettingsChanged(_) => LibraryEvent::SettingsChanged,
        }
    }
}

pub type HandlerId = u64;

type Handler = Box<dyn FnMut(&Notification) + Send>;

struct Subscriber {
    id: HandlerId,
    event: LibraryEvent,
    handler: Handler,
}

struct BusInner {
    next_id: HandlerId,
    subscribers: Vec<Subscriber>,
}

pub struct EventBus {
    inner: Mutex<BusInner>,
}

impl EventBus {
    pub fn new() -> EventBus {
        EventBus {
            inner: Mutex::new(BusInner {
                next_id: 1,
                subscribers: Vec::new(),
            }),
        }
    }

    /// Register a handler for one event. Returns an id for [`off`](Self::off).
    pub fn on(
        &self,
        event: LibraryEvent,
        handler: impl FnMut(&Notification) + Send + 'static,
    ) -> HandlerId {
        let mut inner = self.inner.lock().expect("event bus lock poisoned");
        let id = inner.next_id;
        inner.next_id += 1;
        inner.subscribers.push(Subscriber {
            id,
            event,
            handler: Box::new(handler),
        });
        id
    }

    /// Remove a subscription. Returns false when the id is unknown.
    pub fn off(&self, id: HandlerId) -> bool {
        let mut inner = self.inner.lock().expect("event bus lock poisoned");
        let before = inner.subscribers.len();
        inner.subscribers.retain(|s| s.id != id);
        inner.subscribers.len() != before
    }

    /// Dispatch to all matching handlers in subscription order. A panic in
    /// one handler is isolated; the rest still run.
    pub fn emit(&self, notification: &Notification) {
        let event = notification.event();
        if let Ok(mut inner) = self.inner.lock() {
            for sub in inner.subscribers.iter_mut() {
                if sub.event != event {
                    continue;
                }
                let outcome =
                    std::panic::catch_unwind(AssertUnwindSafe(|| (sub.handler)(notification)));
                if outcome.is_err() {
                    tracing::warn!("handler {} panicked during {:?} dispatch", sub.id, event);
                }
            }
        }
    }

    #[cfg(test)]
    pub fn subscriber_count(&self) -> usize {
        self.inner.lock().unwrap().subscribers.len()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        EventBus::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn files_changed() -> Notification {
        Notification::FilesChanged(vec![])
    }

    #[test]
    fn test_handlers_run_in_subscription_order() {
        let bus = EventBus::new();
        let log = Arc::new(Mutex::new(Vec::new()));

        for label in ["first", "second", "third"] {
            let log = log.clone();
            bus.on(LibraryEvent::FilesChanged, move |_| {
                log.lock().unwrap().push(label);
            });
        }

        bus.emit(&files_changed());
        assert_eq!(*log.lock().unwrap(), vec!["first", "second", "third"]);
    }

    #[test]
    fn test_handler_only_sees_its_event() {
        let bus = EventBus::new();
        let count = Arc::new(AtomicUsize::new(0));
        let c = count.clone();
        bus.on(LibraryEvent::SettingsChanged, move |_| {
            c.fetch_add(1, Ordering::SeqCst);
        });

        bus.emit(&files_changed());
        assert_eq!(count.load(Ordering::SeqCst), 0);
        bus.emit(&Notification::SettingsChanged(Default::default()));
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_panicking_handler_does_not_stop_the_rest() {
        let bus = EventBus::new();
        let count = Arc::new(AtomicUsize::new(0));

        bus.on(LibraryEvent::FilesChanged, |_| {
            panic!("handler bug");
        });
        let c = count.clone();
        bus.on(LibraryEvent::FilesChanged, move |_| {
            c.fetch_add(1, Ordering::SeqCst);
        });

        bus.emit(&files_changed());
        assert_eq!(
            count.load(Ordering::SeqCst),
            1,
            "second handler must still run"
        );

        // The bus must stay usable after the panic
        bus.emit(&files_changed());
        assert_eq!(count.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_off_removes_subscription() {
        let bus = EventBus::new();
        let count = Arc::new(AtomicUsize::new(0));
        let c = count.clone();
        let id = bus.on(LibraryEvent::FilesChanged, move |_| {
            c.fetch_add(1, Ordering::SeqCst);
        });

        assert!(bus.off(id));
        assert!(!bus.off(id), "second off for the same id must return false");
        bus.emit(&files_changed());
        assert_eq!(count.load(Ordering::SeqCst), 0);
        assert_eq!(bus.subscriber_count(), 0);
    }
}
