//! Joystick handles.
//!
//! Device enumeration and open/close go through the global lock. Queries
//! on an open joystick only take the handle's own lock.

use std::fmt;
use std::ptr;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::context::{Context, Shared};
use crate::error::{Error, Result};
use crate::ffi::RawJoystick;

/// Hat direction constants (matching SDL)
#[allow(non_snake_case)]
pub mod HatDirection {
    pub const CENTERED: u8 = 0;
    pub const UP: u8 = 1;
    pub const RIGHT: u8 = 2;
    pub const DOWN: u8 = 4;
    pub const LEFT: u8 = 8;
    pub const RIGHTUP: u8 = RIGHT | UP;
    pub const RIGHTDOWN: u8 = RIGHT | DOWN;
    pub const LEFTUP: u8 = LEFT | UP;
    pub const LEFTDOWN: u8 = LEFT | DOWN;
}

struct JoystickPtr(*mut RawJoystick);

// Only dereferenced by the library, under the handle lock.
unsafe impl Send for JoystickPtr {}
unsafe impl Sync for JoystickPtr {}

impl JoystickPtr {
    fn live(&self) -> Result<*mut RawJoystick> {
        if self.0.is_null() {
            Err(Error::NullHandle)
        } else {
            Ok(self.0)
        }
    }
}

struct Inner {
    shared: Arc<Shared>,
    raw: RwLock<JoystickPtr>,
}

/// An opened joystick.
///
/// Dropping the handle does not close the device; call
/// [`Joystick::close`].
#[derive(Clone)]
pub struct Joystick {
    inner: Arc<Inner>,
}

impl fmt::Debug for Joystick {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut out = f.debug_struct("Joystick");
        if let Some(raw) = self.inner.raw.try_read() {
            out.field("raw", &raw.0);
        }
        out.finish()
    }
}

impl Joystick {
    fn wrap(shared: &Arc<Shared>, raw: *mut RawJoystick) -> Option<Self> {
        if raw.is_null() {
            return None;
        }
        Some(Self {
            inner: Arc::new(Inner {
                shared: Arc::clone(shared),
                raw: RwLock::new(JoystickPtr(raw)),
            }),
        })
    }

    fn query<T>(&self, f: impl FnOnce(&dyn crate::ffi::NativeLibrary, *mut RawJoystick) -> T) -> Result<T> {
        let raw = self.inner.raw.read();
        let joystick = raw.live()?;
        Ok(f(self.inner.shared.native.as_ref(), joystick))
    }

    pub fn is_closed(&self) -> bool {
        self.inner.raw.read().0.is_null()
    }

    /// Close the device. Calling it again does nothing.
    pub fn close(&self) {
        let shared = &self.inner.shared;
        let _global = shared.global.lock();
        let mut raw = self.inner.raw.write();
        let Ok(joystick) = raw.live() else {
            return;
        };
        unsafe { shared.native.joystick_close(joystick) };
        raw.0 = ptr::null_mut();
        log::debug!("joystick closed");
    }

    /// Device index this joystick was opened from.
    pub fn index(&self) -> Result<i32> {
        self.query(|native, j| unsafe { native.joystick_index(j) })
    }

    pub fn num_axes(&self) -> Result<i32> {
        self.query(|native, j| unsafe { native.joystick_num_axes(j) })
    }

    pub fn num_buttons(&self) -> Result<i32> {
        self.query(|native, j| unsafe { native.joystick_num_buttons(j) })
    }

    /// Trackballs only report relative motion.
    pub fn num_balls(&self) -> Result<i32> {
        self.query(|native, j| unsafe { native.joystick_num_balls(j) })
    }

    pub fn num_hats(&self) -> Result<i32> {
        self.query(|native, j| unsafe { native.joystick_num_hats(j) })
    }

    /// Axis position in -32768..=32767.
    pub fn axis(&self, axis: i32) -> Result<i16> {
        self.query(|native, j| unsafe { native.joystick_get_axis(j, axis) })
    }

    pub fn button(&self, button: i32) -> Result<u8> {
        self.query(|native, j| unsafe { native.joystick_get_button(j, button) })
    }

    /// Hat position, a combination of [`HatDirection`] bits.
    pub fn hat(&self, hat: i32) -> Result<u8> {
        self.query(|native, j| unsafe { native.joystick_get_hat(j, hat) })
    }

    /// `(status, dx, dy)`: ball motion since the last call. Status is 0,
    /// or -1 for an invalid ball.
    pub fn ball(&self, ball: i32) -> Result<(i32, i32, i32)> {
        self.query(|native, j| unsafe { native.joystick_get_ball(j, ball) })
    }
}

impl Context {
    pub fn num_joysticks(&self) -> i32 {
        self.global(|native| unsafe { native.num_joysticks() })
    }

    /// Name of a device; `None` if the library has none.
    pub fn joystick_name(&self, device_index: i32) -> Option<String> {
        self.global(|native| unsafe { native.joystick_name(device_index) })
    }

    /// Open a device; `None` if the library refused.
    pub fn joystick_open(&self, device_index: i32) -> Option<Joystick> {
        let raw = self.global(|native| unsafe { native.joystick_open(device_index) });
        let joystick = Joystick::wrap(self.shared(), raw);
        if joystick.is_some() {
            log::debug!("joystick {} opened", device_index);
        }
        joystick
    }

    /// 1 if the device is open, 0 otherwise.
    pub fn joystick_opened(&self, device_index: i32) -> i32 {
        self.global(|native| unsafe { native.joystick_opened(device_index) })
    }

    pub fn joystick_update(&self) {
        self.global(|native| unsafe { native.joystick_update() })
    }

    /// Set or query (`event_state::QUERY`) joystick event delivery.
    pub fn joystick_event_state(&self, state: i32) -> i32 {
        self.global(|native| unsafe { native.joystick_event_state(state) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ContextConfig;
    use crate::ffi::event_state;
    use crate::soft::{JoystickSpec, SoftwareLibrary};

    fn context_with_pad() -> (Arc<SoftwareLibrary>, Context) {
        let lib = Arc::new(SoftwareLibrary::new());
        lib.add_joystick(JoystickSpec {
            name: "Test Pad".into(),
            axes: vec![0, 16000],
            buttons: vec![0, 1],
            hats: vec![HatDirection::LEFTUP],
            balls: vec![(3, -4)],
        });
        let ctx = Context::with_config(lib.clone(), ContextConfig::default());
        (lib, ctx)
    }

    #[test]
    fn test_enumerate_and_open() {
        let (_lib, ctx) = context_with_pad();
        assert_eq!(ctx.num_joysticks(), 1);
        assert_eq!(ctx.joystick_name(0).as_deref(), Some("Test Pad"));
        assert_eq!(ctx.joystick_name(1), None);
        assert!(ctx.joystick_open(1).is_none());

        let pad = ctx.joystick_open(0).unwrap();
        assert_eq!(ctx.joystick_opened(0), 1);
        assert_eq!(pad.index().unwrap(), 0);
        assert_eq!(pad.num_axes().unwrap(), 2);
        assert_eq!(pad.axis(1).unwrap(), 16000);
        assert_eq!(pad.button(1).unwrap(), 1);
        assert_eq!(pad.hat(0).unwrap() & HatDirection::LEFT, HatDirection::LEFT);
        assert_eq!(pad.ball(0).unwrap(), (0, 3, -4));
        assert_eq!(pad.ball(5).unwrap().0, -1);
        pad.close();
    }

    #[test]
    fn test_close_is_idempotent() {
        let (lib, ctx) = context_with_pad();
        let pad = ctx.joystick_open(0).unwrap();
        pad.close();
        pad.close();
        assert!(pad.is_closed());
        assert_eq!(ctx.joystick_opened(0), 0);
        assert_eq!(pad.num_buttons(), Err(Error::NullHandle));
        assert_eq!(lib.probe().stats().invalid_releases, 0);
    }

    #[test]
    fn test_event_state() {
        let (_lib, ctx) = context_with_pad();
        assert_eq!(ctx.joystick_event_state(event_state::QUERY), event_state::IGNORE);
        assert_eq!(ctx.joystick_event_state(event_state::ENABLE), event_state::ENABLE);
        assert_eq!(ctx.joystick_event_state(event_state::QUERY), event_state::ENABLE);
        ctx.joystick_update();
    }

    #[test]
    fn test_hat_combinations() {
        assert_eq!(HatDirection::RIGHTDOWN, HatDirection::RIGHT | HatDirection::DOWN);
        assert_eq!(HatDirection::CENTERED, 0);
    }
}
