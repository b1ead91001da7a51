//! The library context.
//!
//! A [`Context`] stands for one instance of the wrapped library. It owns
//! the global lock that serialises every call touching library-global
//! state. The lock guards the display slot, so the current display surface
//! can only be read or replaced while it is held.
//!
//! Lock order: the global lock first, then handle locks (in ascending
//! handle id when two are taken).

use std::env;
use std::ffi::CString;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use parking_lot::Mutex;

use crate::config::{ContextConfig, VIDEO_DRIVER_VAR};
use crate::error::{Error, Result};
use crate::ffi::{init_flags, NativeLibrary};
use crate::video::{self, ChannelMasks, ModeList, RetainedBuffer, Surface, VideoInfo};

/// Version of the binding semantics. Changes whenever the meaning of the
/// API changes incompatibly.
pub const BINDING_VERSION: &str = "synced-sdl bindings 1.0";

/// State guarded by the global lock.
pub(crate) struct GlobalState {
    /// The display surface set by the last mode change.
    pub(crate) display: Option<Surface>,
}

impl GlobalState {
    pub(crate) fn is_display(&self, surface: &Surface) -> bool {
        self.display.as_ref() == Some(surface)
    }
}

pub(crate) struct Shared {
    pub(crate) native: Arc<dyn NativeLibrary>,
    pub(crate) global: Mutex<GlobalState>,
    next_id: AtomicU64,
    config: ContextConfig,
}

impl Shared {
    pub(crate) fn next_id(&self) -> u64 {
        self.next_id.fetch_add(1, Ordering::Relaxed)
    }
}

/// Thread-safe entry point to the wrapped library.
///
/// Clones share the same library instance, global lock and display slot.
/// The display slot keeps its surface alive; [`Context::quit`] empties it.
#[derive(Clone)]
pub struct Context {
    shared: Arc<Shared>,
}

impl std::fmt::Debug for Context {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Context")
            .field("config", &self.shared.config)
            .finish_non_exhaustive()
    }
}

pub(crate) fn to_cstring(s: &str) -> Result<CString> {
    CString::new(s).map_err(|_| Error::InvalidString(s.to_string()))
}

impl Context {
    /// Context over `native`, configured from the environment.
    pub fn new(native: Arc<dyn NativeLibrary>) -> Self {
        Self::with_config(native, ContextConfig::from_env())
    }

    pub fn with_config(native: Arc<dyn NativeLibrary>, config: ContextConfig) -> Self {
        Self {
            shared: Arc::new(Shared {
                native,
                global: Mutex::new(GlobalState { display: None }),
                next_id: AtomicU64::new(1),
                config,
            }),
        }
    }

    /// Context over the system SDL 1.2 library.
    #[cfg(feature = "sdl12")]
    pub fn sdl12() -> Self {
        Self::new(Arc::new(crate::ffi::Sdl12Library::new()))
    }

    pub fn config(&self) -> &ContextConfig {
        &self.shared.config
    }

    pub(crate) fn shared(&self) -> &Arc<Shared> {
        &self.shared
    }

    /// Run `f` with the global lock held.
    pub(crate) fn global<R>(&self, f: impl FnOnce(&dyn NativeLibrary) -> R) -> R {
        let _global = self.shared.global.lock();
        f(self.shared.native.as_ref())
    }

    fn check_owner(&self, surface: &Surface) -> Result<()> {
        if Arc::ptr_eq(&self.shared, surface.shared()) {
            Ok(())
        } else {
            Err(Error::ContextMismatch)
        }
    }

    pub fn binding_version() -> &'static str {
        BINDING_VERSION
    }

    // ========================================================================
    // General
    // ========================================================================

    /// Initialise subsystems. Returns the library status.
    pub fn init(&self, flags: u32) -> i32 {
        let _global = self.shared.global.lock();
        let status = self.with_driver_fallback(flags, || unsafe { self.shared.native.init(flags) });
        log::debug!("init {:#x} -> {}", flags, status);
        status
    }

    pub fn init_subsystem(&self, flags: u32) -> i32 {
        let _global = self.shared.global.lock();
        let status =
            self.with_driver_fallback(flags, || unsafe { self.shared.native.init_subsystem(flags) });
        log::debug!("init subsystem {:#x} -> {}", flags, status);
        status
    }

    /// Retry a failed video init once with the fallback driver, unless the
    /// user picked a driver. Runs under the global lock.
    fn with_driver_fallback(&self, flags: u32, init: impl Fn() -> i32) -> i32 {
        let status = init();
        if status == 0 || flags & init_flags::VIDEO == 0 {
            return status;
        }
        let Some(driver) = self.shared.config.fallback_video_driver.as_deref() else {
            return status;
        };
        if env::var_os(VIDEO_DRIVER_VAR).is_some_and(|v| !v.is_empty()) {
            return status;
        }
        log::debug!("video init failed; retrying with {}={}", VIDEO_DRIVER_VAR, driver);
        env::set_var(VIDEO_DRIVER_VAR, driver);
        let status = init();
        if status != 0 {
            env::set_var(VIDEO_DRIVER_VAR, "");
        }
        status
    }

    /// Shut down subsystems. Shutting down video releases the display
    /// surface, so its handle is destroyed.
    pub fn quit_subsystem(&self, flags: u32) {
        let mut global = self.shared.global.lock();
        if flags & init_flags::VIDEO != 0 {
            if let Some(display) = global.display.take() {
                display.detach();
            }
        }
        unsafe { self.shared.native.quit_subsystem(flags) };
    }

    pub fn was_init(&self, flags: u32) -> u32 {
        self.global(|native| unsafe { native.was_init(flags) })
    }

    /// Destroy the display handle, then shut the library down.
    pub fn quit(&self) {
        let mut global = self.shared.global.lock();
        if let Some(display) = global.display.take() {
            display.detach();
        }
        unsafe { self.shared.native.quit() };
        log::debug!("quit");
    }

    // ========================================================================
    // Error string
    // ========================================================================

    pub fn get_error(&self) -> String {
        self.global(|native| unsafe { native.get_error() })
    }

    pub fn set_error(&self, message: &str) -> Result<()> {
        let message = to_cstring(message)?;
        self.global(|native| unsafe { native.set_error(&message) });
        Ok(())
    }

    pub fn clear_error(&self) {
        self.global(|native| unsafe { native.clear_error() })
    }

    // ========================================================================
    // Video
    // ========================================================================

    /// Set the display mode and return the display surface.
    ///
    /// The result becomes the occupant of the display slot; `None` empties
    /// it. A previous occupant over a different pointer is not freed. When
    /// the library reuses the display pointer, the current handle is
    /// reloaded and returned. The current display stays write-locked
    /// across the library call, which may move its pixels.
    pub fn set_video_mode(&self, width: i32, height: i32, bpp: i32, flags: u32) -> Option<Surface> {
        let mut global = self.shared.global.lock();
        let current = global.display.clone();
        let mut state = current.as_ref().map(|c| c.write_state());
        let raw = unsafe { self.shared.native.set_video_mode(width, height, bpp, flags) };
        if let (Some(current), Some(state)) = (current.as_ref(), state.as_mut()) {
            if !raw.is_null() && state.live() == Ok(raw) {
                let _ = state.reload();
                log::debug!("video mode {}x{}x{} on surface {}", width, height, bpp, current.id());
                return Some(current.clone());
            }
        }
        drop(state);
        global.display = video::wrap(&self.shared, raw, None);
        if let Some(display) = global.display.as_ref() {
            log::debug!("video mode {}x{}x{} on surface {}", width, height, bpp, display.id());
        }
        global.display.clone()
    }

    /// The current display surface.
    pub fn video_surface(&self) -> Option<Surface> {
        self.shared.global.lock().display.clone()
    }

    /// 0 if the mode is unsupported, otherwise the closest depth.
    pub fn video_mode_ok(&self, width: i32, height: i32, bpp: i32, flags: u32) -> i32 {
        self.global(|native| unsafe { native.video_mode_ok(width, height, bpp, flags) })
    }

    /// Display sizes available for the format of `format_of` (the best
    /// video format for `None`).
    pub fn list_modes(&self, format_of: Option<&Surface>, flags: u32) -> Result<ModeList> {
        if let Some(surface) = format_of {
            self.check_owner(surface)?;
        }
        let _global = self.shared.global.lock();
        let state = format_of.map(|s| s.read_state());
        let format = match &state {
            Some(state) => {
                state.live()?;
                state.shadow.format
            }
            None => std::ptr::null_mut(),
        };
        // The list belongs to the library until the next call; decode it
        // before the lock is released.
        Ok(unsafe { video::decode_mode_list(self.shared.native.list_modes(format, flags)) })
    }

    pub fn video_info(&self) -> Option<VideoInfo> {
        self.global(|native| unsafe {
            native.get_video_info().as_ref().map(|info| VideoInfo::copy_from(info))
        })
    }

    // ========================================================================
    // Window manager
    // ========================================================================

    /// Window title and icon name; empty when unset.
    pub fn wm_get_caption(&self) -> (String, String) {
        let (title, icon) = self.global(|native| unsafe { native.wm_get_caption() });
        (title.unwrap_or_default(), icon.unwrap_or_default())
    }

    pub fn wm_set_caption(&self, title: &str, icon: &str) -> Result<()> {
        let (title, icon) = (to_cstring(title)?, to_cstring(icon)?);
        self.global(|native| unsafe { native.wm_set_caption(&title, &icon) });
        Ok(())
    }

    /// Set the window icon. `mask` is a 1-bit transparency mask, one row
    /// per icon line.
    pub fn wm_set_icon(&self, icon: &Surface, mask: Option<&[u8]>) -> Result<()> {
        self.check_owner(icon)?;
        let mut mask = mask.map(<[u8]>::to_vec);
        let mask_ptr = mask.as_mut().map_or(std::ptr::null_mut(), |m| m.as_mut_ptr());
        let _global = self.shared.global.lock();
        let state = icon.read_state();
        unsafe { self.shared.native.wm_set_icon(state.live()?, mask_ptr) };
        Ok(())
    }

    pub fn wm_iconify_window(&self) -> i32 {
        self.global(|native| unsafe { native.wm_iconify_window() })
    }

    /// Toggle fullscreen. The surface's flags change, so it is reloaded.
    pub fn wm_toggle_fullscreen(&self, surface: &Surface) -> Result<i32> {
        self.check_owner(surface)?;
        let _global = self.shared.global.lock();
        let mut state = surface.write_state();
        let status = unsafe { self.shared.native.wm_toggle_fullscreen(state.live()?) };
        state.reload()?;
        Ok(status)
    }

    // ========================================================================
    // GL
    // ========================================================================

    pub fn gl_swap_buffers(&self) {
        self.global(|native| unsafe { native.gl_swap_buffers() })
    }

    pub fn gl_set_attribute(&self, attr: i32, value: i32) -> i32 {
        self.global(|native| unsafe { native.gl_set_attribute(attr, value) })
    }

    // ========================================================================
    // Surfaces
    // ========================================================================

    /// New library-allocated surface; `None` if the library refused.
    pub fn create_rgb_surface(
        &self,
        flags: u32,
        width: i32,
        height: i32,
        depth: i32,
        masks: ChannelMasks,
    ) -> Option<Surface> {
        let raw = self.global(|native| unsafe {
            native.create_rgb_surface(flags, width, height, depth, masks.r, masks.g, masks.b, masks.a)
        });
        video::wrap(&self.shared, raw, None)
    }

    /// New surface over caller memory. The surface takes `pixels` over and
    /// keeps it alive until freed.
    ///
    /// `pixels` must be one of the shapes [`RetainedBuffer::new`] accepts
    /// and hold at least `pitch * height` bytes; both are checked before
    /// the library is called.
    pub fn create_rgb_surface_from<B>(
        &self,
        pixels: B,
        width: i32,
        height: i32,
        depth: i32,
        pitch: i32,
        masks: ChannelMasks,
    ) -> Result<Option<Surface>>
    where
        B: std::any::Any + Send + Sync,
    {
        let mut buffer = RetainedBuffer::new(pixels)?;
        buffer.require(pitch.max(0) as usize * height.max(0) as usize)?;
        let memory = buffer.as_mut_ptr().cast();
        let raw = self.global(|native| unsafe {
            native.create_rgb_surface_from(
                memory, width, height, depth, pitch, masks.r, masks.g, masks.b, masks.a,
            )
        });
        Ok(video::wrap(&self.shared, raw, Some(buffer)))
    }

    /// Load an image file.
    pub fn load(&self, path: impl AsRef<Path>) -> Result<Option<Surface>> {
        let path = path.as_ref().to_string_lossy();
        let file = to_cstring(&path)?;
        let raw = self.global(|native| unsafe { native.load(&file) });
        Ok(video::wrap(&self.shared, raw, None))
    }

    // ========================================================================
    // Time
    // ========================================================================

    /// Milliseconds since the library was initialised.
    pub fn ticks(&self) -> u32 {
        self.global(|native| unsafe { native.get_ticks() })
    }

    /// Sleep the calling thread. Takes no lock.
    pub fn delay(&self, ms: u32) {
        thread::sleep(Duration::from_millis(u64::from(ms)));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::soft::{ModeSupport, SoftwareLibrary};
    use crate::video::Rect;

    fn context() -> (Arc<SoftwareLibrary>, Context) {
        let lib = Arc::new(SoftwareLibrary::new());
        let ctx = Context::with_config(lib.clone(), ContextConfig::default());
        (lib, ctx)
    }

    #[test]
    fn test_set_video_mode_fills_slot() {
        let (_lib, ctx) = context();
        assert_eq!(ctx.init(init_flags::VIDEO), 0);
        assert!(ctx.video_surface().is_none());
        let screen = ctx.set_video_mode(320, 200, 32, 0).unwrap();
        assert_eq!(ctx.video_surface(), Some(screen.clone()));
        assert_eq!(screen.width().unwrap(), 320);
        ctx.quit();
        assert!(screen.is_destroyed());
        assert!(ctx.video_surface().is_none());
    }

    #[test]
    fn test_failed_mode_set_empties_slot() {
        let (_lib, ctx) = context();
        // Video not initialised: the library refuses.
        assert!(ctx.set_video_mode(320, 200, 32, 0).is_none());
        assert!(ctx.video_surface().is_none());
        assert!(!ctx.get_error().is_empty());
    }

    #[test]
    fn test_mode_change_reloads_same_handle() {
        let (_lib, ctx) = context();
        ctx.init(init_flags::VIDEO);
        let first = ctx.set_video_mode(320, 200, 32, 0).unwrap();
        let second = ctx.set_video_mode(640, 480, 16, 0).unwrap();
        assert_eq!(first, second);
        assert_eq!(first.info().unwrap().w, 640);
        assert_eq!(first.format().unwrap().bits_per_pixel, 16);
        ctx.quit();
    }

    #[test]
    fn test_mode_change_to_new_surface_replaces_occupant() {
        let (lib, ctx) = context();
        ctx.init(init_flags::VIDEO);
        let first = ctx.set_video_mode(320, 200, 32, 0).unwrap();
        lib.set_mode_reallocates(true);
        let second = ctx.set_video_mode(640, 480, 32, 0).unwrap();
        assert_ne!(first, second);
        assert_eq!(ctx.video_surface(), Some(second.clone()));

        // The previous occupant is the caller's to free.
        assert!(!first.is_destroyed());
        assert_eq!(first.width().unwrap(), 320);
        first.free();
        assert!(first.is_destroyed());
        assert_eq!(ctx.video_surface(), Some(second.clone()));
        let stats = lib.probe().stats();
        assert_eq!((stats.surfaces_freed, stats.invalid_releases), (1, 0));

        ctx.quit();
        assert!(second.is_destroyed());
    }

    #[test]
    fn test_free_display_clears_slot() {
        let (_lib, ctx) = context();
        ctx.init(init_flags::VIDEO);
        let screen = ctx.set_video_mode(64, 64, 32, 0).unwrap();
        screen.free();
        assert!(ctx.video_surface().is_none());
        screen.free();
        ctx.quit();
    }

    #[test]
    fn test_quit_video_subsystem_destroys_display() {
        let (_lib, ctx) = context();
        ctx.init(init_flags::VIDEO | init_flags::TIMER);
        let screen = ctx.set_video_mode(64, 64, 32, 0).unwrap();
        ctx.quit_subsystem(init_flags::VIDEO);
        assert!(screen.is_destroyed());
        assert_eq!(ctx.was_init(init_flags::VIDEO), 0);
        assert_eq!(ctx.was_init(init_flags::TIMER), init_flags::TIMER);
        ctx.quit();
    }

    #[test]
    fn test_list_modes_shapes() {
        let (lib, ctx) = context();
        assert_eq!(
            ctx.list_modes(None, 0).unwrap().modes(),
            Some(&[Rect::new(0, 0, 1024, 768), Rect::new(0, 0, 800, 600), Rect::new(0, 0, 640, 480)][..])
        );
        lib.set_mode_support(ModeSupport::Any);
        assert!(ctx.list_modes(None, 0).unwrap().is_any());
        lib.set_mode_support(ModeSupport::Unavailable);
        assert_eq!(ctx.list_modes(None, 0).unwrap(), ModeList::Modes(vec![]));
    }

    #[test]
    fn test_list_modes_rejects_foreign_surface() {
        let (_a, ctx_a) = context();
        let (_b, ctx_b) = context();
        let s = ctx_b.create_rgb_surface(0, 2, 2, 32, ChannelMasks::default()).unwrap();
        assert_eq!(ctx_a.list_modes(Some(&s), 0), Err(Error::ContextMismatch));
        s.free();
    }

    #[test]
    fn test_caption_and_error_strings() {
        let (_lib, ctx) = context();
        assert_eq!(ctx.wm_get_caption(), (String::new(), String::new()));
        ctx.wm_set_caption("title", "icon").unwrap();
        assert_eq!(ctx.wm_get_caption(), ("title".to_string(), "icon".to_string()));
        assert!(matches!(ctx.wm_set_caption("a\0b", ""), Err(Error::InvalidString(_))));

        ctx.set_error("boom").unwrap();
        assert_eq!(ctx.get_error(), "boom");
        ctx.clear_error();
        assert_eq!(ctx.get_error(), "");
    }

    #[test]
    fn test_toggle_fullscreen_reloads_flags() {
        let (_lib, ctx) = context();
        ctx.init(init_flags::VIDEO);
        let screen = ctx.set_video_mode(64, 64, 32, 0).unwrap();
        assert_eq!(ctx.wm_toggle_fullscreen(&screen).unwrap(), 1);
        assert_ne!(screen.flags().unwrap() & crate::ffi::surface_flags::FULLSCREEN, 0);
        ctx.quit();
    }

    #[test]
    fn test_create_from_checks_buffer_before_library() {
        let (lib, ctx) = context();
        let calls = lib.probe().stats().global_calls;
        let err = ctx
            .create_rgb_surface_from(vec![0u8; 15], 2, 2, 32, 8, ChannelMasks::default())
            .unwrap_err();
        assert_eq!(err, Error::BufferTooSmall { needed: 16, actual: 15 });
        assert_eq!(lib.probe().stats().global_calls, calls);
    }

    #[test]
    fn test_binding_version() {
        assert_eq!(Context::binding_version(), BINDING_VERSION);
    }
}
