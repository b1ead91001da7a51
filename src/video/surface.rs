//! The surface handle.
//!
//! A [`Surface`] owns a library surface pointer together with a shadow of
//! the fields the library may rewrite behind our back (flags, geometry,
//! pitch, pixel pointer, format). The shadow is refreshed by `reload`
//! after every call that can move or resize the buffer.
//!
//! Locking: every handle has its own `RwLock`. Operations that only read
//! the surface take it shared; operations that write pixels, clipping or
//! the shadow take it exclusive. Operations that also touch library-global
//! state take the context's global lock first. Blits take the global lock
//! only when one side is the display surface, so blits between private
//! surfaces run in parallel.

use std::ffi::{c_void, CString};
use std::fmt;
use std::path::Path;
use std::ptr;
use std::sync::Arc;

use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::context::Shared;
use crate::error::{Error, Result};
use crate::ffi::{RawPixelFormat, RawRect, RawSurface};

use super::retain::RetainedBuffer;
use super::{PixelFormat, Rect};

/// Shadow copy of the mutable fields of a library surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SurfaceInfo {
    pub flags: u32,
    pub w: i32,
    pub h: i32,
    pub pitch: u16,
    pub offset: i32,
}

#[derive(Clone, Copy)]
pub(crate) struct Shadow {
    pub(crate) info: SurfaceInfo,
    pub(crate) pixels: *mut c_void,
    pub(crate) format: *mut RawPixelFormat,
}

impl Default for Shadow {
    fn default() -> Self {
        Self {
            info: SurfaceInfo::default(),
            pixels: ptr::null_mut(),
            format: ptr::null_mut(),
        }
    }
}

pub(crate) struct SurfaceState {
    raw: *mut RawSurface,
    pub(crate) shadow: Shadow,
    retained: Option<RetainedBuffer>,
}

// The pointers are only dereferenced under the handle lock.
unsafe impl Send for SurfaceState {}
unsafe impl Sync for SurfaceState {}

impl SurfaceState {
    /// The library pointer, or `NullHandle` once destroyed.
    pub(crate) fn live(&self) -> Result<*mut RawSurface> {
        if self.raw.is_null() {
            Err(Error::NullHandle)
        } else {
            Ok(self.raw)
        }
    }

    /// Copy the mutable library fields into the shadow.
    pub(crate) fn reload(&mut self) -> Result<()> {
        let raw = self.live()?;
        let s = unsafe { &*raw };
        self.shadow = Shadow {
            info: SurfaceInfo {
                flags: s.flags,
                w: s.w,
                h: s.h,
                pitch: s.pitch,
                offset: s.offset,
            },
            pixels: s.pixels,
            format: s.format,
        };
        Ok(())
    }

    /// Null the pointer and shadow; hand back the retained buffer.
    fn destroy(&mut self) -> Option<RetainedBuffer> {
        self.raw = ptr::null_mut();
        self.shadow = Shadow::default();
        self.retained.take()
    }

    fn pixel_len(&self) -> usize {
        usize::from(self.shadow.info.pitch) * self.shadow.info.h.max(0) as usize
    }
}

struct Inner {
    id: u64,
    shared: Arc<Shared>,
    state: RwLock<SurfaceState>,
}

impl Drop for Inner {
    fn drop(&mut self) {
        let state = self.state.get_mut();
        if !state.raw.is_null() {
            // Never freed: the library surface leaks and may still point
            // into the retained memory, so that leaks with it.
            if let Some(buffer) = state.retained.take() {
                std::mem::forget(buffer);
            }
        }
    }
}

/// Thread-safe handle to a library surface.
///
/// Clones share the same surface. Dropping the last clone does not free
/// the library surface; call [`Surface::free`].
#[derive(Clone)]
pub struct Surface {
    inner: Arc<Inner>,
}

impl PartialEq for Surface {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Eq for Surface {}

impl fmt::Debug for Surface {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut out = f.debug_struct("Surface");
        out.field("id", &self.inner.id);
        if let Some(state) = self.inner.state.try_read() {
            out.field("raw", &state.raw).field("info", &state.shadow.info);
        }
        out.finish()
    }
}

/// Wrap a library surface pointer. Null gives no handle.
pub(crate) fn wrap(
    shared: &Arc<Shared>,
    raw: *mut RawSurface,
    retained: Option<RetainedBuffer>,
) -> Option<Surface> {
    if raw.is_null() {
        return None;
    }
    let mut state = SurfaceState {
        raw,
        shadow: Shadow::default(),
        retained,
    };
    state.reload().ok()?;
    Some(Surface {
        inner: Arc::new(Inner {
            id: shared.next_id(),
            shared: Arc::clone(shared),
            state: RwLock::new(state),
        }),
    })
}

fn rect_ptr(rect: &mut Option<RawRect>) -> *mut RawRect {
    rect.as_mut().map_or(ptr::null_mut(), |r| r as *mut RawRect)
}

fn path_cstring(path: &Path) -> Result<CString> {
    let path = path.to_string_lossy();
    CString::new(path.as_bytes()).map_err(|_| Error::InvalidString(path.into_owned()))
}

impl Surface {
    /// Identifier unique within the context; fixes the blit lock order.
    pub fn id(&self) -> u64 {
        self.inner.id
    }

    pub fn is_destroyed(&self) -> bool {
        self.inner.state.read().raw.is_null()
    }

    /// The library pointer (null once destroyed). Dereferencing it races
    /// with other threads unless the caller otherwise knows it is alone.
    pub fn as_ptr(&self) -> *mut RawSurface {
        self.inner.state.read().raw
    }

    pub(crate) fn shared(&self) -> &Arc<Shared> {
        &self.inner.shared
    }

    pub(crate) fn read_state(&self) -> RwLockReadGuard<'_, SurfaceState> {
        self.inner.state.read()
    }

    pub(crate) fn write_state(&self) -> RwLockWriteGuard<'_, SurfaceState> {
        self.inner.state.write()
    }

    fn read_live(&self) -> Result<RwLockReadGuard<'_, SurfaceState>> {
        let state = self.inner.state.read();
        state.live()?;
        Ok(state)
    }

    fn write_live(&self) -> Result<RwLockWriteGuard<'_, SurfaceState>> {
        let state = self.inner.state.write();
        state.live()?;
        Ok(state)
    }

    // ========================================================================
    // Shadow
    // ========================================================================

    pub fn info(&self) -> Result<SurfaceInfo> {
        Ok(self.read_live()?.shadow.info)
    }

    pub fn width(&self) -> Result<i32> {
        Ok(self.info()?.w)
    }

    pub fn height(&self) -> Result<i32> {
        Ok(self.info()?.h)
    }

    pub fn pitch(&self) -> Result<u16> {
        Ok(self.info()?.pitch)
    }

    pub fn flags(&self) -> Result<u32> {
        Ok(self.info()?.flags)
    }

    pub fn offset(&self) -> Result<i32> {
        Ok(self.info()?.offset)
    }

    /// Copy of the surface's pixel format.
    pub fn format(&self) -> Result<PixelFormat> {
        let state = self.read_live()?;
        unsafe { PixelFormat::copy_from(state.shadow.format) }.ok_or(Error::NullHandle)
    }

    /// Shadowed pixel pointer; null while a hardware surface is unlocked.
    pub fn pixels_ptr(&self) -> Result<*mut c_void> {
        Ok(self.read_live()?.shadow.pixels)
    }

    /// Re-read the library's fields into the shadow.
    pub fn reload(&self) -> Result<()> {
        self.inner.state.write().reload()
    }

    // ========================================================================
    // Pixel access
    // ========================================================================

    /// Read the pixel rows (`pitch * h` bytes).
    pub fn with_pixels<R>(&self, f: impl FnOnce(&[u8]) -> R) -> Result<R> {
        let state = self.read_live()?;
        if state.shadow.pixels.is_null() {
            return Err(Error::PixelsUnavailable);
        }
        let pixels =
            unsafe { std::slice::from_raw_parts(state.shadow.pixels as *const u8, state.pixel_len()) };
        Ok(f(pixels))
    }

    /// Write the pixel rows (`pitch * h` bytes).
    pub fn with_pixels_mut<R>(&self, f: impl FnOnce(&mut [u8]) -> R) -> Result<R> {
        let state = self.write_live()?;
        if state.shadow.pixels.is_null() {
            return Err(Error::PixelsUnavailable);
        }
        let pixels =
            unsafe { std::slice::from_raw_parts_mut(state.shadow.pixels as *mut u8, state.pixel_len()) };
        Ok(f(pixels))
    }

    /// Lock for direct pixel access. Reloads on success, since the lock
    /// may publish the pixel pointer.
    pub fn lock(&self) -> Result<i32> {
        let mut state = self.write_live()?;
        let raw = state.live()?;
        let status = unsafe { self.inner.shared.native.lock_surface(raw) };
        if status == 0 {
            state.reload()?;
        }
        Ok(status)
    }

    /// Undo one [`lock`](Self::lock); reloads, since the pixel pointer may
    /// be withdrawn.
    pub fn unlock(&self) -> Result<()> {
        let mut state = self.write_live()?;
        let raw = state.live()?;
        unsafe { self.inner.shared.native.unlock_surface(raw) };
        state.reload()
    }

    // ========================================================================
    // Drawing
    // ========================================================================

    /// Blit `src` onto this surface. `dst_rect` receives the clipped area.
    /// Returns the library status.
    pub fn blit(&self, dst_rect: Option<&mut Rect>, src: &Surface, src_rect: Option<&Rect>) -> Result<i32> {
        let shared = &self.inner.shared;
        if !Arc::ptr_eq(shared, &src.inner.shared) {
            return Err(Error::ContextMismatch);
        }

        let global = shared.global.lock();
        let _global = if global.is_display(self) || global.is_display(src) {
            Some(global)
        } else {
            drop(global);
            None
        };

        let mut raw_src_rect = src_rect.map(|r| r.to_raw());
        let mut raw_dst_rect = dst_rect.as_deref().map(|r| r.to_raw());

        let status = if self == src {
            let state = self.write_live()?;
            let raw = state.live()?;
            unsafe {
                shared
                    .native
                    .upper_blit(raw, rect_ptr(&mut raw_src_rect), raw, rect_ptr(&mut raw_dst_rect))
            }
        } else {
            let (dst_state, src_state) = lock_pair(self, src);
            let (dst_raw, src_raw) = (dst_state.live()?, src_state.live()?);
            unsafe {
                shared.native.upper_blit(
                    src_raw,
                    rect_ptr(&mut raw_src_rect),
                    dst_raw,
                    rect_ptr(&mut raw_dst_rect),
                )
            }
        };

        if let (Some(rect), Some(clipped)) = (dst_rect, raw_dst_rect) {
            *rect = Rect::from(clipped);
        }
        Ok(status)
    }

    /// Fill `rect` (the whole clip area for `None`) with a mapped color.
    /// `rect` receives the clipped area.
    pub fn fill_rect(&self, rect: Option<&mut Rect>, color: u32) -> Result<i32> {
        let state = self.write_live()?;
        let mut raw_rect = rect.as_deref().map(|r| r.to_raw());
        let status = unsafe {
            self.inner
                .shared
                .native
                .fill_rect(state.live()?, rect_ptr(&mut raw_rect), color)
        };
        if let (Some(rect), Some(clipped)) = (rect, raw_rect) {
            *rect = Rect::from(clipped);
        }
        Ok(status)
    }

    pub fn set_alpha(&self, flags: u32, alpha: u8) -> Result<i32> {
        let mut state = self.write_live()?;
        let status = unsafe { self.inner.shared.native.set_alpha(state.live()?, flags, alpha) };
        state.reload()?;
        Ok(status)
    }

    pub fn set_color_key(&self, flags: u32, key: u32) -> Result<i32> {
        let mut state = self.write_live()?;
        let status = unsafe { self.inner.shared.native.set_color_key(state.live()?, flags, key) };
        state.reload()?;
        Ok(status)
    }

    pub fn clip_rect(&self) -> Result<Rect> {
        let state = self.read_live()?;
        let mut rect = RawRect::default();
        unsafe { self.inner.shared.native.get_clip_rect(state.live()?, &mut rect) };
        Ok(Rect::from(rect))
    }

    /// Set the clip rectangle; `None` clips to the whole surface. Returns
    /// whether the resulting rectangle is non-empty.
    pub fn set_clip_rect(&self, rect: Option<&Rect>) -> Result<bool> {
        let state = self.write_live()?;
        let raw_rect = rect.map(|r| r.to_raw());
        let rect_ptr = raw_rect.as_ref().map_or(ptr::null(), |r| r as *const RawRect);
        Ok(unsafe { self.inner.shared.native.set_clip_rect(state.live()?, rect_ptr) })
    }

    // ========================================================================
    // Color mapping
    // ========================================================================

    pub fn map_rgb(&self, r: u8, g: u8, b: u8) -> Result<u32> {
        let state = self.read_live()?;
        Ok(unsafe { self.inner.shared.native.map_rgb(state.shadow.format, r, g, b) })
    }

    pub fn map_rgba(&self, r: u8, g: u8, b: u8, a: u8) -> Result<u32> {
        let state = self.read_live()?;
        Ok(unsafe { self.inner.shared.native.map_rgba(state.shadow.format, r, g, b, a) })
    }

    pub fn get_rgb(&self, pixel: u32) -> Result<(u8, u8, u8)> {
        let state = self.read_live()?;
        Ok(unsafe { self.inner.shared.native.get_rgb(pixel, state.shadow.format) })
    }

    pub fn get_rgba(&self, pixel: u32) -> Result<(u8, u8, u8, u8)> {
        let state = self.read_live()?;
        Ok(unsafe { self.inner.shared.native.get_rgba(pixel, state.shadow.format) })
    }

    // ========================================================================
    // Screen updates
    // ========================================================================

    /// Push an area of the display to the screen; all zeros means the
    /// whole screen.
    pub fn update_rect(&self, x: i32, y: i32, w: u32, h: u32) -> Result<()> {
        let shared = &self.inner.shared;
        let _global = shared.global.lock();
        let state = self.write_live()?;
        unsafe { shared.native.update_rect(state.live()?, x, y, w, h) };
        Ok(())
    }

    pub fn update_rects(&self, rects: &[Rect]) -> Result<()> {
        if rects.is_empty() {
            return Ok(());
        }
        let raw_rects: Vec<RawRect> = rects.iter().map(|r| r.to_raw()).collect();
        let count = i32::try_from(raw_rects.len()).unwrap_or(i32::MAX);
        let shared = &self.inner.shared;
        let _global = shared.global.lock();
        let state = self.write_live()?;
        unsafe { shared.native.update_rects(state.live()?, count, raw_rects.as_ptr()) };
        Ok(())
    }

    pub fn flip(&self) -> Result<i32> {
        let shared = &self.inner.shared;
        let _global = shared.global.lock();
        let state = self.write_live()?;
        Ok(unsafe { shared.native.flip(state.live()?) })
    }

    // ========================================================================
    // Conversion
    // ========================================================================

    /// Copy into the display's pixel format.
    pub fn display_format(&self) -> Result<Option<Surface>> {
        let shared = &self.inner.shared;
        let _global = shared.global.lock();
        let state = self.read_live()?;
        let raw = unsafe { shared.native.display_format(state.live()?) };
        Ok(wrap(shared, raw, None))
    }

    /// Copy into the display's pixel format with an alpha channel.
    pub fn display_format_alpha(&self) -> Result<Option<Surface>> {
        let shared = &self.inner.shared;
        let _global = shared.global.lock();
        let state = self.read_live()?;
        let raw = unsafe { shared.native.display_format_alpha(state.live()?) };
        Ok(wrap(shared, raw, None))
    }

    /// Scaled copy.
    pub fn zoom(&self, zoom_x: f64, zoom_y: f64, smooth: bool) -> Result<Option<Surface>> {
        let shared = &self.inner.shared;
        let state = self.read_live()?;
        let raw = unsafe { shared.native.zoom_surface(state.live()?, zoom_x, zoom_y, smooth) };
        Ok(wrap(shared, raw, None))
    }

    /// Write the surface to a Windows BMP file. Returns the library status.
    pub fn save_bmp(&self, path: impl AsRef<Path>) -> Result<i32> {
        let file = path_cstring(path.as_ref())?;
        let shared = &self.inner.shared;
        let _global = shared.global.lock();
        let state = self.read_live()?;
        Ok(unsafe { shared.native.save_bmp(state.live()?, &file) })
    }

    // ========================================================================
    // Lifetime
    // ========================================================================

    /// Free the library surface and destroy the handle. Clears the display
    /// slot when this is the display. Calling it again does nothing.
    pub fn free(&self) {
        let shared = &self.inner.shared;
        let mut global = shared.global.lock();
        let mut state = self.inner.state.write();
        let Ok(raw) = state.live() else {
            return;
        };
        unsafe { shared.native.free_surface(raw) };
        let retained = state.destroy();
        if global.is_display(self) {
            global.display = None;
        }
        log::debug!("surface {} freed", self.inner.id);
        if let Some(buffer) = retained {
            log::trace!("surface {} released {} retained bytes", self.inner.id, buffer.len());
        }
    }

    /// Destroy the handle without freeing the library surface; for
    /// surfaces the library releases itself.
    pub(crate) fn detach(&self) {
        let retained = self.inner.state.write().destroy();
        log::debug!("surface {} detached", self.inner.id);
        drop(retained);
    }
}

/// Take the destination write lock and source read lock in ascending id
/// order, so crossed blits cannot deadlock.
fn lock_pair<'a>(
    dst: &'a Surface,
    src: &'a Surface,
) -> (RwLockWriteGuard<'a, SurfaceState>, RwLockReadGuard<'a, SurfaceState>) {
    if dst.id() < src.id() {
        let dst_state = dst.inner.state.write();
        let src_state = src.inner.state.read();
        (dst_state, src_state)
    } else {
        let src_state = src.inner.state.read();
        let dst_state = dst.inner.state.write();
        (dst_state, src_state)
    }
}

/// Blit with the arguments in library order (`src` first).
pub fn blit_surface(
    src: &Surface,
    src_rect: Option<&Rect>,
    dst: &Surface,
    dst_rect: Option<&mut Rect>,
) -> Result<i32> {
    dst.blit(dst_rect, src, src_rect)
}
