//! Window-level input as the sandbox sees it
//!
//! The winit shell translates raw events into [`InputEvent`]s so the core can be
//! driven (and tested) without a window.

use std::collections::BTreeMap;
use std::time::{Duration, Instant};

/// Maximum gap between two primary presses that still counts as a double click
pub const DOUBLE_CLICK_WINDOW: Duration = Duration::from_millis(400);

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum InputEvent {
    /// A printable key went down; carries the lowercased character
    KeyDown { key: char },
    /// New logical window size and device pixel ratio
    Resized {
        width: f64,
        height: f64,
        device_pixel_ratio: f64,
    },
    /// Primary pointer button pressed at `at`
    PrimaryPress { at: Instant },
    /// Pointer moved with a button held, in physical pixels
    PointerDrag { dx: f32, dy: f32, pan: bool },
    /// Wheel movement in lines; positive scrolls away from the user
    Scroll { delta: f32 },
}

/// Event category a listener subscribes to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ListenerKind {
    Resize,
    KeyDown,
    DoubleClick,
    Orbit,
}

impl ListenerKind {
    pub const ALL: [ListenerKind; 4] = [
        ListenerKind::Resize,
        ListenerKind::KeyDown,
        ListenerKind::DoubleClick,
        ListenerKind::Orbit,
    ];

    /// Listener that handles `event`
    pub fn for_event(event: &InputEvent) -> ListenerKind {
        match event {
            InputEvent::KeyDown { .. } => ListenerKind::KeyDown,
            InputEvent::Resized { .. } => ListenerKind::Resize,
            InputEvent::PrimaryPress { .. } => ListenerKind::DoubleClick,
            InputEvent::PointerDrag { .. } | InputEvent::Scroll { .. } => ListenerKind::Orbit,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerId(u32);

/// Registered listeners; events for unregistered kinds are dropped
#[derive(Debug, Default)]
pub struct ListenerSet {
    listeners: BTreeMap<ListenerId, ListenerKind>,
    next_id: u32,
}

impl ListenerSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, kind: ListenerKind) -> ListenerId {
        let id = ListenerId(self.next_id);
        self.next_id += 1;
        self.listeners.insert(id, kind);
        log::debug!("Registered {:?} listener {:?}", kind, id);
        id
    }

    pub fn remove(&mut self, id: ListenerId) -> bool {
        self.listeners.remove(&id).is_some()
    }

    /// Removes every listener; returns how many were registered
    pub fn clear(&mut self) -> usize {
        let count = self.listeners.len();
        self.listeners.clear();
        count
    }

    pub fn is_listening(&self, kind: ListenerKind) -> bool {
        self.listeners.values().any(|registered| *registered == kind)
    }

    pub fn len(&self) -> usize {
        self.listeners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }
}

/// Pairs primary presses into double clicks
#[derive(Debug, Clone)]
pub struct DoubleClickDetector {
    window: Duration,
    last_press: Option<Instant>,
}

impl Default for DoubleClickDetector {
    fn default() -> Self {
        Self::new(DOUBLE_CLICK_WINDOW)
    }
}

impl DoubleClickDetector {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            last_press: None,
        }
    }

    /// Records a press; true when it completes a double click.
    ///
    /// A completed pair is consumed, so a third quick press starts a new pair.
    pub fn press(&mut self, at: Instant) -> bool {
        match self.last_press {
            Some(previous) if at.saturating_duration_since(previous) <= self.window => {
                self.last_press = None;
                true
            }
            _ => {
                self.last_press = Some(at);
                false
            }
        }
    }
}

/// Platform fullscreen capability
///
/// The sandbox holds this as an `Option`; a platform without fullscreen support
/// simply passes `None`.
pub trait FullscreenApi {
    fn is_fullscreen(&self) -> bool;
    fn request_fullscreen(&mut self);
    fn exit_fullscreen(&mut self);
}

/// Enters fullscreen if nothing is fullscreen, otherwise exits.
///
/// Returns the new fullscreen state, or `None` when no API is available.
pub fn toggle_fullscreen(api: Option<&mut (dyn FullscreenApi + '_)>) -> Option<bool> {
    let Some(api) = api else {
        log::debug!("Fullscreen not available on this platform");
        return None;
    };

    if api.is_fullscreen() {
        api.exit_fullscreen();
        Some(false)
    } else {
        api.request_fullscreen();
        Some(true)
    }
}

/// Borderless fullscreen on the window's current monitor
pub struct WinitFullscreen {
    window: std::sync::Arc<winit::window::Window>,
}

impl WinitFullscreen {
    pub fn new(window: std::sync::Arc<winit::window::Window>) -> Self {
        Self { window }
    }
}

impl FullscreenApi for WinitFullscreen {
    fn is_fullscreen(&self) -> bool {
        self.window.fullscreen().is_some()
    }

    fn request_fullscreen(&mut self) {
        self.window
            .set_fullscreen(Some(winit::window::Fullscreen::Borderless(None)));
    }

    fn exit_fullscreen(&mut self) {
        self.window.set_fullscreen(None);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    pub struct FakeFullscreen {
        pub active: bool,
        pub requests: usize,
        pub exits: usize,
    }

    impl FullscreenApi for FakeFullscreen {
        fn is_fullscreen(&self) -> bool {
            self.active
        }

        fn request_fullscreen(&mut self) {
            self.active = true;
            self.requests += 1;
        }

        fn exit_fullscreen(&mut self) {
            self.active = false;
            self.exits += 1;
        }
    }

    #[test]
    fn test_double_click_within_window() {
        let mut detector = DoubleClickDetector::default();
        let start = Instant::now();
        assert!(!detector.press(start));
        assert!(detector.press(start + Duration::from_millis(250)));
    }

    #[test]
    fn test_slow_presses_are_not_double_clicks() {
        let mut detector = DoubleClickDetector::default();
        let start = Instant::now();
        assert!(!detector.press(start));
        assert!(!detector.press(start + Duration::from_millis(401)));
        // The late press opens a new pair
        assert!(detector.press(start + Duration::from_millis(600)));
    }

    #[test]
    fn test_third_press_starts_new_pair() {
        let mut detector = DoubleClickDetector::default();
        let start = Instant::now();
        detector.press(start);
        assert!(detector.press(start + Duration::from_millis(100)));
        assert!(!detector.press(start + Duration::from_millis(200)));
    }

    #[test]
    fn test_toggle_fullscreen_round_trip() {
        let mut api = FakeFullscreen::default();
        assert_eq!(toggle_fullscreen(Some(&mut api)), Some(true));
        assert_eq!(toggle_fullscreen(Some(&mut api)), Some(false));
        assert_eq!((api.requests, api.exits), (1, 1));
    }

    #[test]
    fn test_toggle_fullscreen_without_api_is_noop() {
        assert_eq!(toggle_fullscreen(None), None);
    }

    #[test]
    fn test_listener_set_clear() {
        let mut listeners = ListenerSet::new();
        for kind in ListenerKind::ALL {
            listeners.register(kind);
        }
        assert!(listeners.is_listening(ListenerKind::Orbit));
        assert_eq!(listeners.clear(), 4);
        assert!(listeners.is_empty());
        assert!(!listeners.is_listening(ListenerKind::Resize));
    }

    #[test]
    fn test_events_map_to_listener_kinds() {
        let drag = InputEvent::PointerDrag {
            dx: 1.0,
            dy: 0.0,
            pan: false,
        };
        assert_eq!(ListenerKind::for_event(&drag), ListenerKind::Orbit);
        assert_eq!(
            ListenerKind::for_event(&InputEvent::KeyDown { key: 'h' }),
            ListenerKind::KeyDown
        );
    }
}
