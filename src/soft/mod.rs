//! Pure-Rust software implementation of the foreign library.
//!
//! `SoftwareLibrary` behaves like an SDL 1.2 build with a dummy video
//! driver: it owns its C records behind raw pointers, keeps library-global
//! state (display surface, caption, error string, event queue, keyboard,
//! mouse and joysticks), and frees what it allocated. It is the default
//! backend for the demo and for every test in this crate.
//!
//! Like the real library it does not serialise callers. Its own mutexes
//! only keep Rust's aliasing rules intact; the [`Probe`] reports callers
//! that enter global-state calls concurrently.

mod pixels;
mod probe;

pub use probe::{Probe, ProbeStats};

use std::collections::{HashMap, HashSet, VecDeque};
use std::ffi::{c_void, CStr};
use std::path::Path;
use std::ptr;
use std::sync::atomic::{AtomicPtr, Ordering};
use std::time::Instant;

use parking_lot::Mutex;

use crate::ffi::{
    event_kind, event_state, init_flags, surface_flags, video_info_bits, NativeLibrary, RawEvent,
    RawJoystick, RawPixelFormat, RawRect, RawSurface, RawVideoInfo,
};

/// Number of entries in the key state array (`SDLK_LAST`).
pub const NUM_KEYS: usize = 323;

const DEFAULT_WIDTH: i32 = 640;
const DEFAULT_HEIGHT: i32 = 480;
const DEFAULT_DEPTH: i32 = 32;

/// What `list_modes` reports.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModeSupport {
    /// Return a null list.
    Unavailable,
    /// Return the "any dimension" sentinel.
    Any,
    /// Return these sizes, in this order, null-terminated.
    Sizes(Vec<(u16, u16)>),
}

impl Default for ModeSupport {
    fn default() -> Self {
        ModeSupport::Sizes(vec![(1024, 768), (800, 600), (640, 480)])
    }
}

/// An emulated input device.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JoystickSpec {
    pub name: String,
    pub axes: Vec<i16>,
    pub buttons: Vec<u8>,
    pub hats: Vec<u8>,
    pub balls: Vec<(i32, i32)>,
}

/// What a joystick pointer handed out by the library points at.
struct OpenJoystick {
    index: i32,
    spec: JoystickSpec,
}

struct SoftState {
    initialized: u32,
    required_video_driver: Option<String>,
    error: String,
    caption: (Option<String>, Option<String>),
    icon_set: bool,
    iconified: bool,
    gl_attributes: HashMap<i32, i32>,
    gl_swaps: u64,
    screen_updates: u64,
    modes: ModeSupport,
    reallocate_modes: bool,
    mode_rects: Vec<Box<RawRect>>,
    mode_table: Vec<*mut RawRect>,
    video_info: Box<RawVideoInfo>,
    display_format: *mut RawPixelFormat,
    unicode: i32,
    key_repeat: (i32, i32),
    keys: Vec<u8>,
    mod_state: i32,
    events: VecDeque<RawEvent>,
    mouse: (u8, i32, i32),
    mouse_motion: (i32, i32),
    cursor_shown: bool,
    joysticks: Vec<JoystickSpec>,
    joystick_events: i32,
    started: Option<Instant>,
}

// The raw pointers in the state are owned by the library and only touched
// under its mutex.
unsafe impl Send for SoftState {}

impl SoftState {
    fn new() -> Self {
        Self {
            initialized: 0,
            required_video_driver: None,
            error: String::new(),
            caption: (None, None),
            icon_set: false,
            iconified: false,
            gl_attributes: HashMap::new(),
            gl_swaps: 0,
            screen_updates: 0,
            modes: ModeSupport::default(),
            reallocate_modes: false,
            mode_rects: Vec::new(),
            mode_table: Vec::new(),
            video_info: Box::new(RawVideoInfo {
                flags: 0,
                video_mem: 0,
                vfmt: ptr::null_mut(),
                current_w: 0,
                current_h: 0,
            }),
            display_format: pixels::alloc_format(DEFAULT_DEPTH, 0, 0, 0, 0),
            unicode: 0,
            key_repeat: (0, 0),
            keys: vec![0; NUM_KEYS],
            mod_state: 0,
            events: VecDeque::new(),
            mouse: (0, 0, 0),
            mouse_motion: (0, 0),
            cursor_shown: true,
            joysticks: Vec::new(),
            joystick_events: event_state::IGNORE,
            started: None,
        }
    }
}

impl Drop for SoftState {
    fn drop(&mut self) {
        unsafe { pixels::free_format(self.display_format) };
    }
}

/// In-process emulation of the wrapped library.
pub struct SoftwareLibrary {
    state: Mutex<SoftState>,
    /// The display surface; read by blits without taking `state`.
    video: AtomicPtr<RawSurface>,
    /// Surfaces handed out and not yet freed.
    surfaces: Mutex<HashSet<usize>>,
    /// Joysticks handed out and not yet closed.
    open_joysticks: Mutex<HashSet<usize>>,
    probe: Probe,
}

impl Default for SoftwareLibrary {
    fn default() -> Self {
        Self::new()
    }
}

impl SoftwareLibrary {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(SoftState::new()),
            video: AtomicPtr::new(ptr::null_mut()),
            surfaces: Mutex::new(HashSet::new()),
            open_joysticks: Mutex::new(HashSet::new()),
            probe: Probe::default(),
        }
    }

    pub fn probe(&self) -> &Probe {
        &self.probe
    }

    // ========================================================================
    // Emulation controls
    // ========================================================================

    /// Make video initialisation fail unless `SDL_VIDEODRIVER` names
    /// `driver`, like a build whose default driver is unusable.
    pub fn require_video_driver(&self, driver: Option<&str>) {
        self.state.lock().required_video_driver = driver.map(String::from);
    }

    pub fn set_mode_support(&self, modes: ModeSupport) {
        self.state.lock().modes = modes;
    }

    /// Make every mode change allocate a fresh display surface instead of
    /// reshaping the current one. The old surface is left to the caller.
    pub fn set_mode_reallocates(&self, reallocate: bool) {
        self.state.lock().reallocate_modes = reallocate;
    }

    pub fn add_joystick(&self, spec: JoystickSpec) {
        self.state.lock().joysticks.push(spec);
    }

    /// Queue an event for `poll_event`.
    pub fn push_event(&self, event: RawEvent) {
        self.state.lock().events.push_back(event);
    }

    pub fn set_key(&self, key: usize, pressed: bool) {
        if let Some(slot) = self.state.lock().keys.get_mut(key) {
            *slot = u8::from(pressed);
        }
    }

    pub fn move_mouse(&self, buttons: u8, x: i32, y: i32) {
        let mut state = self.state.lock();
        let (_, old_x, old_y) = state.mouse;
        state.mouse_motion.0 += x - old_x;
        state.mouse_motion.1 += y - old_y;
        state.mouse = (buttons, x, y);
    }

    /// Number of `update_rect(s)` and `flip` calls seen so far.
    pub fn screen_updates(&self) -> u64 {
        self.state.lock().screen_updates
    }

    pub fn gl_swaps(&self) -> u64 {
        self.state.lock().gl_swaps
    }

    pub fn is_iconified(&self) -> bool {
        self.state.lock().iconified
    }

    pub fn has_icon(&self) -> bool {
        self.state.lock().icon_set
    }

    /// Surfaces currently allocated, the display included.
    pub fn live_surfaces(&self) -> usize {
        self.surfaces.lock().len()
    }

    // ========================================================================
    // Internals
    // ========================================================================

    fn track(&self, surface: *mut RawSurface) -> *mut RawSurface {
        if !surface.is_null() {
            self.surfaces.lock().insert(surface as usize);
        }
        surface
    }

    fn fail<T>(&self, state: &mut SoftState, message: &str, value: T) -> T {
        state.error = message.to_string();
        value
    }

    unsafe fn release_video(&self) {
        let video = self.video.swap(ptr::null_mut(), Ordering::SeqCst);
        if !video.is_null() {
            self.surfaces.lock().remove(&(video as usize));
            pixels::free_surface(video);
            self.probe.surface_freed();
        }
    }

    fn is_display(&self, surface: *mut RawSurface) -> bool {
        !surface.is_null() && surface == self.video.load(Ordering::SeqCst)
    }

    fn init_flags(&self, flags: u32) -> i32 {
        let mut state = self.state.lock();
        if flags & init_flags::VIDEO != 0 {
            if let Some(required) = state.required_video_driver.clone() {
                let selected = std::env::var("SDL_VIDEODRIVER").unwrap_or_default();
                if selected != required {
                    return self.fail(&mut state, "No available video device", -1);
                }
            }
        }
        state.initialized |= flags & init_flags::EVERYTHING;
        state.started.get_or_insert_with(Instant::now);
        0
    }

    unsafe fn joystick<'a>(joystick: *mut RawJoystick) -> &'a OpenJoystick {
        &*(joystick as *const OpenJoystick)
    }
}

impl Drop for SoftwareLibrary {
    fn drop(&mut self) {
        unsafe { self.release_video() };
    }
}

#[allow(clippy::too_many_arguments)]
impl NativeLibrary for SoftwareLibrary {
    unsafe fn init(&self, flags: u32) -> i32 {
        let _g = self.probe.enter_global();
        self.init_flags(flags)
    }

    unsafe fn init_subsystem(&self, flags: u32) -> i32 {
        let _g = self.probe.enter_global();
        self.init_flags(flags)
    }

    unsafe fn quit_subsystem(&self, flags: u32) {
        let _g = self.probe.enter_global();
        let mut state = self.state.lock();
        state.initialized &= !flags;
        if flags & init_flags::VIDEO != 0 {
            self.release_video();
        }
    }

    unsafe fn was_init(&self, flags: u32) -> u32 {
        let _g = self.probe.enter_global();
        let initialized = self.state.lock().initialized;
        if flags == 0 {
            initialized
        } else {
            initialized & flags
        }
    }

    unsafe fn quit(&self) {
        let _g = self.probe.enter_global();
        let mut state = self.state.lock();
        state.initialized = 0;
        state.events.clear();
        state.started = None;
        self.release_video();
    }

    unsafe fn get_error(&self) -> String {
        let _g = self.probe.enter_global();
        self.state.lock().error.clone()
    }

    unsafe fn set_error(&self, message: &CStr) {
        let _g = self.probe.enter_global();
        self.state.lock().error = message.to_string_lossy().into_owned();
    }

    unsafe fn clear_error(&self) {
        let _g = self.probe.enter_global();
        self.state.lock().error.clear();
    }

    unsafe fn set_video_mode(&self, w: i32, h: i32, bpp: i32, flags: u32) -> *mut RawSurface {
        let _g = self.probe.enter_global();
        let mut state = self.state.lock();
        if state.initialized & init_flags::VIDEO == 0 {
            return self.fail(&mut state, "Video subsystem has not been initialized", ptr::null_mut());
        }
        if w < 0 || h < 0 {
            return self.fail(&mut state, "Invalid video mode", ptr::null_mut());
        }
        let (w, h) = if w == 0 || h == 0 {
            (DEFAULT_WIDTH, DEFAULT_HEIGHT)
        } else {
            (w, h)
        };
        let bpp = if bpp == 0 { DEFAULT_DEPTH } else { bpp };

        let video = self.video.load(Ordering::SeqCst);
        if !video.is_null() && !state.reallocate_modes {
            // The display surface keeps its address across mode changes.
            pixels::reshape(video, w, h, bpp, flags);
            return video;
        }
        let format = pixels::alloc_format(bpp, 0, 0, 0, 0);
        let surface = pixels::alloc_surface(flags & !surface_flags::HWSURFACE, w, h, format, None);
        if surface.is_null() {
            return self.fail(&mut state, "Couldn't allocate video surface", surface);
        }
        self.video.store(surface, Ordering::SeqCst);
        self.track(surface)
    }

    unsafe fn video_mode_ok(&self, w: i32, h: i32, bpp: i32, _flags: u32) -> i32 {
        let _g = self.probe.enter_global();
        let state = self.state.lock();
        if state.initialized & init_flags::VIDEO == 0 {
            return 0;
        }
        let fits = match &state.modes {
            ModeSupport::Unavailable => false,
            ModeSupport::Any => true,
            ModeSupport::Sizes(sizes) => sizes
                .iter()
                .any(|&(mw, mh)| i32::from(mw) >= w && i32::from(mh) >= h),
        };
        match (fits, bpp) {
            (false, _) => 0,
            (true, 0) => DEFAULT_DEPTH,
            (true, bpp) => bpp,
        }
    }

    unsafe fn list_modes(&self, _format: *mut RawPixelFormat, _flags: u32) -> *mut *mut RawRect {
        let _g = self.probe.enter_global();
        let mut state = self.state.lock();
        let sizes = match &state.modes {
            ModeSupport::Unavailable => return ptr::null_mut(),
            ModeSupport::Any => return usize::MAX as *mut *mut RawRect,
            ModeSupport::Sizes(sizes) => sizes.clone(),
        };
        // The previous list stays valid until this call, as in C.
        state.mode_rects = sizes
            .into_iter()
            .map(|(w, h)| Box::new(RawRect { x: 0, y: 0, w, h }))
            .collect();
        let mut table: Vec<*mut RawRect> = state
            .mode_rects
            .iter_mut()
            .map(|rect| &mut **rect as *mut RawRect)
            .collect();
        table.push(ptr::null_mut());
        state.mode_table = table;
        state.mode_table.as_mut_ptr()
    }

    unsafe fn get_video_info(&self) -> *const RawVideoInfo {
        let _g = self.probe.enter_global();
        let mut state = self.state.lock();
        let video = self.video.load(Ordering::SeqCst);
        let (vfmt, w, h) = if video.is_null() {
            (state.display_format, 0, 0)
        } else {
            ((*video).format, (*video).w, (*video).h)
        };
        *state.video_info = RawVideoInfo {
            flags: video_info_bits::WM_AVAILABLE | video_info_bits::BLIT_SW | video_info_bits::BLIT_FILL,
            video_mem: 0,
            vfmt,
            current_w: w,
            current_h: h,
        };
        &*state.video_info
    }

    unsafe fn update_rect(&self, _screen: *mut RawSurface, _x: i32, _y: i32, _w: u32, _h: u32) {
        let _g = self.probe.enter_global();
        self.state.lock().screen_updates += 1;
    }

    unsafe fn update_rects(&self, _screen: *mut RawSurface, count: i32, _rects: *const RawRect) {
        let _g = self.probe.enter_global();
        if count > 0 {
            self.state.lock().screen_updates += 1;
        }
    }

    unsafe fn flip(&self, screen: *mut RawSurface) -> i32 {
        let _g = self.probe.enter_global();
        if screen.is_null() {
            return -1;
        }
        self.state.lock().screen_updates += 1;
        0
    }

    unsafe fn wm_get_caption(&self) -> (Option<String>, Option<String>) {
        let _g = self.probe.enter_global();
        self.state.lock().caption.clone()
    }

    unsafe fn wm_set_caption(&self, title: &CStr, icon: &CStr) {
        let _g = self.probe.enter_global();
        self.state.lock().caption = (
            Some(title.to_string_lossy().into_owned()),
            Some(icon.to_string_lossy().into_owned()),
        );
    }

    unsafe fn wm_set_icon(&self, icon: *mut RawSurface, _mask: *mut u8) {
        let _g = self.probe.enter_global();
        self.state.lock().icon_set = !icon.is_null();
    }

    unsafe fn wm_iconify_window(&self) -> i32 {
        let _g = self.probe.enter_global();
        let mut state = self.state.lock();
        if state.initialized & init_flags::VIDEO == 0 {
            return 0;
        }
        state.iconified = true;
        1
    }

    unsafe fn wm_toggle_fullscreen(&self, surface: *mut RawSurface) -> i32 {
        let _g = self.probe.enter_global();
        if !self.is_display(surface) {
            return 0;
        }
        (*surface).flags ^= surface_flags::FULLSCREEN;
        1
    }

    unsafe fn gl_swap_buffers(&self) {
        let _g = self.probe.enter_global();
        self.state.lock().gl_swaps += 1;
    }

    unsafe fn gl_set_attribute(&self, attr: i32, value: i32) -> i32 {
        let _g = self.probe.enter_global();
        self.state.lock().gl_attributes.insert(attr, value);
        0
    }

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
    ) -> *mut RawSurface {
        let _g = self.probe.enter_global();
        let format = pixels::alloc_format(depth, rmask, gmask, bmask, amask);
        let surface = pixels::alloc_surface(flags, width, height, format, None);
        if surface.is_null() {
            let mut state = self.state.lock();
            return self.fail(&mut state, "Out of memory", surface);
        }
        self.track(surface)
    }

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
    ) -> *mut RawSurface {
        let _g = self.probe.enter_global();
        let format = pixels::alloc_format(depth, rmask, gmask, bmask, amask);
        let surface = pixels::alloc_surface(
            surface_flags::SWSURFACE,
            width,
            height,
            format,
            Some((pixels, pitch)),
        );
        self.track(surface)
    }

    unsafe fn free_surface(&self, surface: *mut RawSurface) {
        let _g = self.probe.enter_global();
        // Freeing the display surface is a no-op; `quit` releases it.
        if surface.is_null() || self.is_display(surface) {
            return;
        }
        if !self.surfaces.lock().remove(&(surface as usize)) {
            self.probe.invalid_release();
            return;
        }
        pixels::free_surface(surface);
        self.probe.surface_freed();
    }

    unsafe fn lock_surface(&self, surface: *mut RawSurface) -> i32 {
        let s = &mut *surface;
        s.locked += 1;
        if s.flags & surface_flags::HWSURFACE != 0 && s.pixels.is_null() {
            s.pixels = s.hwdata;
        }
        0
    }

    unsafe fn unlock_surface(&self, surface: *mut RawSurface) {
        let s = &mut *surface;
        if s.locked == 0 {
            return;
        }
        s.locked -= 1;
        if s.locked == 0 && s.flags & surface_flags::HWSURFACE != 0 {
            s.pixels = ptr::null_mut();
        }
    }

    unsafe fn upper_blit(
        &self,
        src: *mut RawSurface,
        src_rect: *mut RawRect,
        dst: *mut RawSurface,
        dst_rect: *mut RawRect,
    ) -> i32 {
        if src.is_null() || dst.is_null() {
            return -1;
        }
        let _b = self
            .probe
            .enter_blit(self.is_display(src) || self.is_display(dst));
        pixels::blit(src, src_rect, dst, dst_rect)
    }

    unsafe fn fill_rect(&self, dst: *mut RawSurface, rect: *mut RawRect, color: u32) -> i32 {
        if dst.is_null() {
            return -1;
        }
        pixels::fill(dst, rect, color)
    }

    unsafe fn set_alpha(&self, surface: *mut RawSurface, flags: u32, alpha: u8) -> i32 {
        let s = &mut *surface;
        s.flags = (s.flags & !surface_flags::SRCALPHA) | (flags & surface_flags::SRCALPHA);
        (*s.format).alpha = alpha;
        0
    }

    unsafe fn set_color_key(&self, surface: *mut RawSurface, flags: u32, key: u32) -> i32 {
        let s = &mut *surface;
        s.flags = (s.flags & !surface_flags::SRCCOLORKEY) | (flags & surface_flags::SRCCOLORKEY);
        (*s.format).colorkey = key;
        0
    }

    unsafe fn get_clip_rect(&self, surface: *mut RawSurface, rect: *mut RawRect) {
        if !rect.is_null() {
            *rect = (*surface).clip_rect;
        }
    }

    unsafe fn set_clip_rect(&self, surface: *mut RawSurface, rect: *const RawRect) -> bool {
        let s = &mut *surface;
        let full = pixels::full_rect(s.w, s.h);
        if rect.is_null() {
            s.clip_rect = full;
            return true;
        }
        let r = *rect;
        let x = i32::from(r.x).max(0);
        let y = i32::from(r.y).max(0);
        let right = (i32::from(r.x) + i32::from(r.w)).min(s.w);
        let bottom = (i32::from(r.y) + i32::from(r.h)).min(s.h);
        if right <= x || bottom <= y {
            s.clip_rect = RawRect::default();
            return false;
        }
        s.clip_rect = RawRect {
            x: x as i16,
            y: y as i16,
            w: (right - x) as u16,
            h: (bottom - y) as u16,
        };
        true
    }

    unsafe fn map_rgb(&self, format: *const RawPixelFormat, r: u8, g: u8, b: u8) -> u32 {
        pixels::map_rgba(&*format, r, g, b, 255)
    }

    unsafe fn map_rgba(&self, format: *const RawPixelFormat, r: u8, g: u8, b: u8, a: u8) -> u32 {
        pixels::map_rgba(&*format, r, g, b, a)
    }

    unsafe fn get_rgb(&self, pixel: u32, format: *const RawPixelFormat) -> (u8, u8, u8) {
        let (r, g, b, _) = pixels::get_rgba(pixel, &*format);
        (r, g, b)
    }

    unsafe fn get_rgba(&self, pixel: u32, format: *const RawPixelFormat) -> (u8, u8, u8, u8) {
        pixels::get_rgba(pixel, &*format)
    }

    unsafe fn display_format(&self, surface: *mut RawSurface) -> *mut RawSurface {
        let _g = self.probe.enter_global();
        let video = self.video.load(Ordering::SeqCst);
        if video.is_null() {
            let mut state = self.state.lock();
            return self.fail(&mut state, "No video mode has been set", ptr::null_mut());
        }
        let vf = &*(*video).format;
        let format = pixels::alloc_format(
            i32::from(vf.bits_per_pixel),
            vf.rmask,
            vf.gmask,
            vf.bmask,
            0,
        );
        self.track(pixels::convert(surface, format, (*surface).flags))
    }

    unsafe fn display_format_alpha(&self, surface: *mut RawSurface) -> *mut RawSurface {
        let _g = self.probe.enter_global();
        if self.video.load(Ordering::SeqCst).is_null() {
            let mut state = self.state.lock();
            return self.fail(&mut state, "No video mode has been set", ptr::null_mut());
        }
        let format = pixels::alloc_format(32, 0x00FF_0000, 0x0000_FF00, 0x0000_00FF, 0xFF00_0000);
        let flags = (*surface).flags | surface_flags::SRCALPHA;
        self.track(pixels::convert(surface, format, flags))
    }

    unsafe fn load(&self, file: &CStr) -> *mut RawSurface {
        let _g = self.probe.enter_global();
        let path = file.to_string_lossy().into_owned();
        let image = match image::open(Path::new(&path)) {
            Ok(image) => image.to_rgba8(),
            Err(err) => {
                let mut state = self.state.lock();
                return self.fail(&mut state, &format!("Couldn't load {}: {}", path, err), ptr::null_mut());
            }
        };
        let (width, height) = (image.width() as i32, image.height() as i32);
        // Byte order R, G, B, A in memory, whatever the host endianness.
        let mask = |i: usize| {
            let mut bytes = [0u8; 4];
            bytes[i] = 0xFF;
            u32::from_ne_bytes(bytes)
        };
        let format = pixels::alloc_format(32, mask(0), mask(1), mask(2), mask(3));
        let surface = pixels::alloc_surface(surface_flags::SWSURFACE, width, height, format, None);
        if surface.is_null() {
            return surface;
        }
        let s = &*surface;
        let row_len = width as usize * 4;
        for (y, row) in image.as_raw().chunks_exact(row_len.max(1)).enumerate() {
            let dst = (s.pixels as *mut u8).add(y * usize::from(s.pitch));
            ptr::copy_nonoverlapping(row.as_ptr(), dst, row_len);
        }
        self.track(surface)
    }

    unsafe fn save_bmp(&self, surface: *mut RawSurface, file: &CStr) -> i32 {
        let _g = self.probe.enter_global();
        let s = &*surface;
        if pixels::backing(s).is_null() {
            return -1;
        }
        let (width, height) = (s.w.max(0) as u32, s.h.max(0) as u32);
        let image = image::RgbImage::from_fn(width, height, |x, y| {
            let (r, g, b, _) = pixels::pixel_rgba(s, x as i32, y as i32);
            image::Rgb([r, g, b])
        });
        let path = file.to_string_lossy().into_owned();
        match image.save_with_format(&path, image::ImageFormat::Bmp) {
            Ok(()) => 0,
            Err(err) => {
                let mut state = self.state.lock();
                self.fail(&mut state, &format!("Couldn't save {}: {}", path, err), -1)
            }
        }
    }

    unsafe fn zoom_surface(
        &self,
        surface: *mut RawSurface,
        zoom_x: f64,
        zoom_y: f64,
        _smooth: bool,
    ) -> *mut RawSurface {
        self.track(pixels::zoom(surface, zoom_x, zoom_y))
    }

    unsafe fn enable_unicode(&self, enable: i32) -> i32 {
        let _g = self.probe.enter_global();
        let mut state = self.state.lock();
        let previous = state.unicode;
        if enable >= 0 {
            state.unicode = enable;
        }
        previous
    }

    unsafe fn enable_key_repeat(&self, delay: i32, interval: i32) -> i32 {
        let _g = self.probe.enter_global();
        let mut state = self.state.lock();
        if delay < 0 || interval < 0 {
            return self.fail(&mut state, "keyboard repeat value less than zero", -1);
        }
        state.key_repeat = (delay, interval);
        0
    }

    unsafe fn get_key_repeat(&self) -> (i32, i32) {
        let _g = self.probe.enter_global();
        self.state.lock().key_repeat
    }

    unsafe fn get_key_state(&self) -> (*const u8, i32) {
        let _g = self.probe.enter_global();
        let state = self.state.lock();
        (state.keys.as_ptr(), state.keys.len() as i32)
    }

    unsafe fn get_mod_state(&self) -> i32 {
        let _g = self.probe.enter_global();
        self.state.lock().mod_state
    }

    unsafe fn set_mod_state(&self, modstate: i32) {
        let _g = self.probe.enter_global();
        self.state.lock().mod_state = modstate;
    }

    unsafe fn get_key_name(&self, key: i32) -> String {
        let _g = self.probe.enter_global();
        let name = match key {
            8 => "backspace",
            9 => "tab",
            13 => "return",
            27 => "escape",
            32 => "space",
            273 => "up",
            274 => "down",
            275 => "right",
            276 => "left",
            48..=57 | 97..=122 => return char::from(key as u8).to_string(),
            _ => "unknown key",
        };
        name.to_string()
    }

    unsafe fn poll_event(&self, event: *mut RawEvent) -> i32 {
        let _g = self.probe.enter_global();
        let mut state = self.state.lock();
        let Some(next) = state.events.pop_front() else {
            return 0;
        };
        if next.kind() == event_kind::VIDEORESIZE {
            // Emulated window manager: a resizable display follows the window.
            let video = self.video.load(Ordering::SeqCst);
            if !video.is_null() && (*video).flags & surface_flags::RESIZABLE != 0 {
                let depth = i32::from((*(*video).format).bits_per_pixel);
                pixels::reshape(video, next.int_at(4), next.int_at(8), depth, (*video).flags);
            }
        }
        if !event.is_null() {
            *event = next;
        }
        1
    }

    unsafe fn get_mouse_state(&self) -> (u8, i32, i32) {
        let _g = self.probe.enter_global();
        self.state.lock().mouse
    }

    unsafe fn get_relative_mouse_state(&self) -> (u8, i32, i32) {
        let _g = self.probe.enter_global();
        let mut state = self.state.lock();
        let (dx, dy) = std::mem::take(&mut state.mouse_motion);
        (state.mouse.0, dx, dy)
    }

    unsafe fn show_cursor(&self, toggle: i32) -> i32 {
        let _g = self.probe.enter_global();
        let mut state = self.state.lock();
        let previous = i32::from(state.cursor_shown);
        if toggle >= 0 {
            state.cursor_shown = toggle != 0;
        }
        previous
    }

    unsafe fn num_joysticks(&self) -> i32 {
        let _g = self.probe.enter_global();
        self.state.lock().joysticks.len() as i32
    }

    unsafe fn joystick_name(&self, device_index: i32) -> Option<String> {
        let _g = self.probe.enter_global();
        let state = self.state.lock();
        usize::try_from(device_index)
            .ok()
            .and_then(|i| state.joysticks.get(i))
            .map(|spec| spec.name.clone())
    }

    unsafe fn joystick_open(&self, device_index: i32) -> *mut RawJoystick {
        let _g = self.probe.enter_global();
        let mut state = self.state.lock();
        let spec = usize::try_from(device_index)
            .ok()
            .and_then(|i| state.joysticks.get(i))
            .cloned();
        let Some(spec) = spec else {
            let message = format!("Joystick index {} out of range", device_index);
            return self.fail(&mut state, &message, ptr::null_mut());
        };
        let joystick = Box::into_raw(Box::new(OpenJoystick {
            index: device_index,
            spec,
        })) as *mut RawJoystick;
        self.open_joysticks.lock().insert(joystick as usize);
        joystick
    }

    unsafe fn joystick_opened(&self, device_index: i32) -> i32 {
        let _g = self.probe.enter_global();
        let open = self.open_joysticks.lock();
        let opened = open
            .iter()
            .any(|&addr| Self::joystick(addr as *mut RawJoystick).index == device_index);
        i32::from(opened)
    }

    unsafe fn joystick_update(&self) {
        let _g = self.probe.enter_global();
    }

    unsafe fn joystick_event_state(&self, state: i32) -> i32 {
        let _g = self.probe.enter_global();
        let mut soft = self.state.lock();
        if state != event_state::QUERY {
            soft.joystick_events = state;
        }
        soft.joystick_events
    }

    unsafe fn joystick_close(&self, joystick: *mut RawJoystick) {
        let _g = self.probe.enter_global();
        if !self.open_joysticks.lock().remove(&(joystick as usize)) {
            self.probe.invalid_release();
            return;
        }
        drop(Box::from_raw(joystick as *mut OpenJoystick));
    }

    unsafe fn joystick_index(&self, joystick: *mut RawJoystick) -> i32 {
        Self::joystick(joystick).index
    }

    unsafe fn joystick_num_axes(&self, joystick: *mut RawJoystick) -> i32 {
        Self::joystick(joystick).spec.axes.len() as i32
    }

    unsafe fn joystick_num_buttons(&self, joystick: *mut RawJoystick) -> i32 {
        Self::joystick(joystick).spec.buttons.len() as i32
    }

    unsafe fn joystick_num_balls(&self, joystick: *mut RawJoystick) -> i32 {
        Self::joystick(joystick).spec.balls.len() as i32
    }

    unsafe fn joystick_num_hats(&self, joystick: *mut RawJoystick) -> i32 {
        Self::joystick(joystick).spec.hats.len() as i32
    }

    unsafe fn joystick_get_axis(&self, joystick: *mut RawJoystick, axis: i32) -> i16 {
        let spec = &Self::joystick(joystick).spec;
        usize::try_from(axis)
            .ok()
            .and_then(|i| spec.axes.get(i))
            .copied()
            .unwrap_or(0)
    }

    unsafe fn joystick_get_button(&self, joystick: *mut RawJoystick, button: i32) -> u8 {
        let spec = &Self::joystick(joystick).spec;
        usize::try_from(button)
            .ok()
            .and_then(|i| spec.buttons.get(i))
            .copied()
            .unwrap_or(0)
    }

    unsafe fn joystick_get_hat(&self, joystick: *mut RawJoystick, hat: i32) -> u8 {
        let spec = &Self::joystick(joystick).spec;
        usize::try_from(hat)
            .ok()
            .and_then(|i| spec.hats.get(i))
            .copied()
            .unwrap_or(0)
    }

    unsafe fn joystick_get_ball(&self, joystick: *mut RawJoystick, ball: i32) -> (i32, i32, i32) {
        let spec = &Self::joystick(joystick).spec;
        match usize::try_from(ball).ok().and_then(|i| spec.balls.get(i)) {
            Some(&(dx, dy)) => (0, dx, dy),
            None => (-1, 0, 0),
        }
    }

    unsafe fn get_ticks(&self) -> u32 {
        let _g = self.probe.enter_global();
        self.state
            .lock()
            .started
            .map_or(0, |started| started.elapsed().as_millis() as u32)
    }
}
