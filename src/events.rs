//! Events, keyboard and mouse.

use crate::context::Context;
use crate::ffi::{event_kind, RawEvent, RAW_EVENT_SIZE};

/// A polled event record.
///
/// Only the type byte and the resize payload are decoded; other payloads
/// are available as raw bytes in the library's layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Event {
    raw: RawEvent,
}

impl Event {
    pub fn from_raw(raw: RawEvent) -> Self {
        Self { raw }
    }

    /// Event type, one of [`event_kind`].
    pub fn kind(&self) -> u8 {
        self.raw.kind()
    }

    /// New window size, for a `VIDEORESIZE` event.
    pub fn resize(&self) -> Option<(i32, i32)> {
        (self.kind() == event_kind::VIDEORESIZE).then(|| (self.raw.int_at(4), self.raw.int_at(8)))
    }

    pub fn is_quit(&self) -> bool {
        self.kind() == event_kind::QUIT
    }

    pub fn bytes(&self) -> &[u8; RAW_EVENT_SIZE] {
        &self.raw.bytes
    }

    pub fn as_raw(&self) -> &RawEvent {
        &self.raw
    }
}

impl Context {
    /// Take the next pending event.
    ///
    /// The library may reshape the display while polling, so the display
    /// is write-locked across the call. A resize event reloads it before
    /// either lock is released; no caller can hold its old pixels or see
    /// its old geometry.
    pub fn poll_event(&self) -> Option<Event> {
        let shared = self.shared();
        let global = shared.global.lock();
        let mut display = global.display.as_ref().map(|d| d.write_state());
        let mut raw = RawEvent::zeroed();
        if unsafe { shared.native.poll_event(&mut raw) } == 0 {
            return None;
        }
        let event = Event::from_raw(raw);
        if event.kind() == event_kind::VIDEORESIZE {
            if let Some(state) = display.as_mut() {
                let _ = state.reload();
            }
        }
        Some(event)
    }

    // ========================================================================
    // Keyboard
    // ========================================================================

    /// Enable (1), disable (0) or query (-1) unicode translation. Returns
    /// the previous state.
    pub fn enable_unicode(&self, enable: i32) -> i32 {
        self.global(|native| unsafe { native.enable_unicode(enable) })
    }

    pub fn enable_key_repeat(&self, delay: i32, interval: i32) -> i32 {
        self.global(|native| unsafe { native.enable_key_repeat(delay, interval) })
    }

    /// `(delay, interval)` in milliseconds.
    pub fn key_repeat(&self) -> (i32, i32) {
        self.global(|native| unsafe { native.get_key_repeat() })
    }

    /// Copy of the key state array, indexed by key symbol.
    pub fn key_state(&self) -> Vec<u8> {
        self.global(|native| unsafe {
            let (keys, len) = native.get_key_state();
            if keys.is_null() || len <= 0 {
                return Vec::new();
            }
            std::slice::from_raw_parts(keys, len as usize).to_vec()
        })
    }

    pub fn mod_state(&self) -> i32 {
        self.global(|native| unsafe { native.get_mod_state() })
    }

    pub fn set_mod_state(&self, modstate: i32) {
        self.global(|native| unsafe { native.set_mod_state(modstate) })
    }

    pub fn key_name(&self, key: i32) -> String {
        self.global(|native| unsafe { native.get_key_name(key) })
    }

    // ========================================================================
    // Mouse
    // ========================================================================

    /// `(buttons, x, y)`.
    pub fn mouse_state(&self) -> (u8, i32, i32) {
        self.global(|native| unsafe { native.get_mouse_state() })
    }

    /// `(buttons, dx, dy)` since the previous call.
    pub fn relative_mouse_state(&self) -> (u8, i32, i32) {
        self.global(|native| unsafe { native.get_relative_mouse_state() })
    }

    /// Show (1), hide (0) or query (-1) the cursor. Returns the previous
    /// state.
    pub fn show_cursor(&self, toggle: i32) -> i32 {
        self.global(|native| unsafe { native.show_cursor(toggle) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ContextConfig;
    use crate::ffi::init_flags;
    use crate::soft::SoftwareLibrary;
    use std::sync::Arc;

    fn context() -> (Arc<SoftwareLibrary>, Context) {
        let lib = Arc::new(SoftwareLibrary::new());
        let ctx = Context::with_config(lib.clone(), ContextConfig::default());
        (lib, ctx)
    }

    #[test]
    fn test_event_decoding() {
        let resize = Event::from_raw(RawEvent::resize(800, 600));
        assert_eq!(resize.kind(), event_kind::VIDEORESIZE);
        assert_eq!(resize.resize(), Some((800, 600)));

        let quit = Event::from_raw(RawEvent::of_kind(event_kind::QUIT));
        assert!(quit.is_quit());
        assert_eq!(quit.resize(), None);
    }

    #[test]
    fn test_poll_empty_queue() {
        let (_lib, ctx) = context();
        assert_eq!(ctx.poll_event(), None);
    }

    #[test]
    fn test_poll_in_order() {
        let (lib, ctx) = context();
        lib.push_event(RawEvent::of_kind(event_kind::KEYDOWN));
        lib.push_event(RawEvent::of_kind(event_kind::QUIT));
        assert_eq!(ctx.poll_event().map(|e| e.kind()), Some(event_kind::KEYDOWN));
        assert!(ctx.poll_event().is_some_and(|e| e.is_quit()));
        assert_eq!(ctx.poll_event(), None);
    }

    #[test]
    fn test_resize_reloads_display() {
        let (lib, ctx) = context();
        ctx.init(init_flags::VIDEO);
        let screen = ctx
            .set_video_mode(100, 80, 32, crate::ffi::surface_flags::RESIZABLE)
            .unwrap();
        lib.push_event(RawEvent::resize(300, 200));
        let event = ctx.poll_event().unwrap();
        assert_eq!(event.resize(), Some((300, 200)));
        let info = screen.info().unwrap();
        assert_eq!((info.w, info.h), (300, 200));
        let raw = unsafe { &*screen.as_ptr() };
        assert_eq!(info.pitch, raw.pitch);
        assert_eq!(screen.pixels_ptr().unwrap(), raw.pixels);
        ctx.quit();
    }

    #[test]
    fn test_keyboard() {
        let (lib, ctx) = context();
        lib.set_key(97, true);
        let keys = ctx.key_state();
        assert_eq!(keys.len(), crate::soft::NUM_KEYS);
        assert_eq!(keys[97], 1);
        lib.set_key(97, false);
        // The snapshot is a copy.
        assert_eq!(keys[97], 1);
        assert_eq!(ctx.key_state()[97], 0);

        assert_eq!(ctx.enable_key_repeat(500, 30), 0);
        assert_eq!(ctx.key_repeat(), (500, 30));
        assert_eq!(ctx.enable_key_repeat(-1, 30), -1);

        ctx.set_mod_state(0x40);
        assert_eq!(ctx.mod_state(), 0x40);
        assert_eq!(ctx.key_name(97), "a");
        assert_eq!(ctx.key_name(27), "escape");

        assert_eq!(ctx.enable_unicode(1), 0);
        assert_eq!(ctx.enable_unicode(-1), 1);
    }

    #[test]
    fn test_mouse() {
        let (lib, ctx) = context();
        lib.move_mouse(1, 10, 20);
        assert_eq!(ctx.mouse_state(), (1, 10, 20));
        assert_eq!(ctx.relative_mouse_state(), (1, 10, 20));
        assert_eq!(ctx.relative_mouse_state(), (1, 0, 0));
        assert_eq!(ctx.show_cursor(0), 1);
        assert_eq!(ctx.show_cursor(-1), 0);
    }
}
