//! The foreign library seam.
//!
//! [`NativeLibrary`] is the C API of the wrapped library as seen from Rust.
//! Resources (surfaces, pixel formats, rect lists, joysticks, pixel memory)
//! cross the seam as raw pointers with C ownership rules. Scalar out-params
//! and strings are converted at the seam: out-params come back as tuples,
//! strings as owned `String`s or borrowed `CStr`s.
//!
//! # Safety
//!
//! The library is stateful and non-reentrant. Implementations make no
//! attempt at internal synchronisation beyond what is needed to be `Sync`
//! in Rust terms; callers (the [`Context`](crate::Context) and handle
//! types) are responsible for holding the global lock or the per-handle
//! lock required by each call. Every pointer argument must be null or a
//! live pointer previously returned by the same library instance.

use std::ffi::{c_void, CStr};

use super::types::{RawEvent, RawJoystick, RawPixelFormat, RawRect, RawSurface, RawVideoInfo};

/// Raw entry points of the wrapped graphics/input library.
#[allow(clippy::too_many_arguments)]
pub trait NativeLibrary: Send + Sync {
    // ========================================================================
    // General
    // ========================================================================

    unsafe fn init(&self, flags: u32) -> i32;
    unsafe fn init_subsystem(&self, flags: u32) -> i32;
    unsafe fn quit_subsystem(&self, flags: u32);
    unsafe fn was_init(&self, flags: u32) -> u32;
    /// Tears down every subsystem and frees the video surface.
    unsafe fn quit(&self);

    // ========================================================================
    // Error string
    // ========================================================================

    unsafe fn get_error(&self) -> String;
    unsafe fn set_error(&self, message: &CStr);
    unsafe fn clear_error(&self);

    // ========================================================================
    // Video
    // ========================================================================

    /// Returns the display surface, or null on failure. The returned
    /// pointer is owned by the library and released by `quit`.
    unsafe fn set_video_mode(&self, w: i32, h: i32, bpp: i32, flags: u32) -> *mut RawSurface;
    unsafe fn video_mode_ok(&self, w: i32, h: i32, bpp: i32, flags: u32) -> i32;
    /// Null for "no modes", `-1` cast to a pointer for "any mode", otherwise
    /// a null-terminated array of rect pointers owned by the library and
    /// valid until the next call.
    unsafe fn list_modes(&self, format: *mut RawPixelFormat, flags: u32) -> *mut *mut RawRect;
    unsafe fn get_video_info(&self) -> *const RawVideoInfo;
    unsafe fn update_rect(&self, screen: *mut RawSurface, x: i32, y: i32, w: u32, h: u32);
    unsafe fn update_rects(&self, screen: *mut RawSurface, count: i32, rects: *const RawRect);
    unsafe fn flip(&self, screen: *mut RawSurface) -> i32;

    // ========================================================================
    // Window manager / GL
    // ========================================================================

    unsafe fn wm_get_caption(&self) -> (Option<String>, Option<String>);
    unsafe fn wm_set_caption(&self, title: &CStr, icon: &CStr);
    unsafe fn wm_set_icon(&self, icon: *mut RawSurface, mask: *mut u8);
    unsafe fn wm_iconify_window(&self) -> i32;
    /// May change the flags of `surface`.
    unsafe fn wm_toggle_fullscreen(&self, surface: *mut RawSurface) -> i32;
    unsafe fn gl_swap_buffers(&self);
    unsafe fn gl_set_attribute(&self, attr: i32, value: i32) -> i32;

    // ========================================================================
    // Surfaces
    // ========================================================================

    unsafe fn create_rgb_surface(
        &self,
        flags: u32,
        width: i32,
        height: i32,
        depth: i32,
        rmask: u32,
        gmask: u32,
        bmask: u32,
        amask: u32,
    ) -> *mut RawSurface;
    /// The library reads and writes `pixels` for as long as the returned
    /// surface lives but never frees it.
    unsafe fn create_rgb_surface_from(
        &self,
        pixels: *mut c_void,
        width: i32,
        height: i32,
        depth: i32,
        pitch: i32,
        rmask: u32,
        gmask: u32,
        bmask: u32,
        amask: u32,
    ) -> *mut RawSurface;
    unsafe fn free_surface(&self, surface: *mut RawSurface);
    /// May publish a new `pixels` pointer.
    unsafe fn lock_surface(&self, surface: *mut RawSurface) -> i32;
    /// May withdraw the `pixels` pointer.
    unsafe fn unlock_surface(&self, surface: *mut RawSurface);
    /// Both rects may be null; `dst_rect` receives the final clipped area.
    unsafe fn upper_blit(
        &self,
        src: *mut RawSurface,
        src_rect: *mut RawRect,
        dst: *mut RawSurface,
        dst_rect: *mut RawRect,
    ) -> i32;
    unsafe fn fill_rect(&self, dst: *mut RawSurface, rect: *mut RawRect, color: u32) -> i32;
    unsafe fn set_alpha(&self, surface: *mut RawSurface, flags: u32, alpha: u8) -> i32;
    unsafe fn set_color_key(&self, surface: *mut RawSurface, flags: u32, key: u32) -> i32;
    unsafe fn get_clip_rect(&self, surface: *mut RawSurface, rect: *mut RawRect);
    unsafe fn set_clip_rect(&self, surface: *mut RawSurface, rect: *const RawRect) -> bool;
    unsafe fn map_rgb(&self, format: *const RawPixelFormat, r: u8, g: u8, b: u8) -> u32;
    unsafe fn map_rgba(&self, format: *const RawPixelFormat, r: u8, g: u8, b: u8, a: u8) -> u32;
    unsafe fn get_rgb(&self, pixel: u32, format: *const RawPixelFormat) -> (u8, u8, u8);
    unsafe fn get_rgba(&self, pixel: u32, format: *const RawPixelFormat) -> (u8, u8, u8, u8);
    unsafe fn display_format(&self, surface: *mut RawSurface) -> *mut RawSurface;
    unsafe fn display_format_alpha(&self, surface: *mut RawSurface) -> *mut RawSurface;
    unsafe fn load(&self, file: &CStr) -> *mut RawSurface;
    unsafe fn save_bmp(&self, surface: *mut RawSurface, file: &CStr) -> i32;
    unsafe fn zoom_surface(
        &self,
        surface: *mut RawSurface,
        zoom_x: f64,
        zoom_y: f64,
        smooth: bool,
    ) -> *mut RawSurface;

    // ========================================================================
    // Keyboard
    // ========================================================================

    unsafe fn enable_unicode(&self, enable: i32) -> i32;
    unsafe fn enable_key_repeat(&self, delay: i32, interval: i32) -> i32;
    unsafe fn get_key_repeat(&self) -> (i32, i32);
    /// Library-owned array of key states and its length.
    unsafe fn get_key_state(&self) -> (*const u8, i32);
    unsafe fn get_mod_state(&self) -> i32;
    unsafe fn set_mod_state(&self, modstate: i32);
    unsafe fn get_key_name(&self, key: i32) -> String;

    // ========================================================================
    // Events / mouse
    // ========================================================================

    /// Fills `event` and returns non-zero when an event was pending.
    unsafe fn poll_event(&self, event: *mut RawEvent) -> i32;
    unsafe fn get_mouse_state(&self) -> (u8, i32, i32);
    unsafe fn get_relative_mouse_state(&self) -> (u8, i32, i32);
    unsafe fn show_cursor(&self, toggle: i32) -> i32;

    // ========================================================================
    // Joystick
    // ========================================================================

    unsafe fn num_joysticks(&self) -> i32;
    unsafe fn joystick_name(&self, device_index: i32) -> Option<String>;
    unsafe fn joystick_open(&self, device_index: i32) -> *mut RawJoystick;
    unsafe fn joystick_opened(&self, device_index: i32) -> i32;
    unsafe fn joystick_update(&self);
    unsafe fn joystick_event_state(&self, state: i32) -> i32;
    unsafe fn joystick_close(&self, joystick: *mut RawJoystick);
    unsafe fn joystick_index(&self, joystick: *mut RawJoystick) -> i32;
    unsafe fn joystick_num_axes(&self, joystick: *mut RawJoystick) -> i32;
    unsafe fn joystick_num_buttons(&self, joystick: *mut RawJoystick) -> i32;
    unsafe fn joystick_num_balls(&self, joystick: *mut RawJoystick) -> i32;
    unsafe fn joystick_num_hats(&self, joystick: *mut RawJoystick) -> i32;
    unsafe fn joystick_get_axis(&self, joystick: *mut RawJoystick, axis: i32) -> i16;
    unsafe fn joystick_get_button(&self, joystick: *mut RawJoystick, button: i32) -> u8;
    unsafe fn joystick_get_hat(&self, joystick: *mut RawJoystick, hat: i32) -> u8;
    /// Returns `(status, dx, dy)`.
    unsafe fn joystick_get_ball(&self, joystick: *mut RawJoystick, ball: i32) -> (i32, i32, i32);

    // ========================================================================
    // Time
    // ========================================================================

    unsafe fn get_ticks(&self) -> u32;
}
