//! C layout records shared with the foreign library.
//!
//! Field order and widths follow the SDL 1.2 headers (`SDL_video.h`,
//! `SDL_events.h`, `SDL_joystick.h`). These records are only ever touched
//! through raw pointers handed out by a [`NativeLibrary`](super::NativeLibrary).

use std::ffi::{c_int, c_uint, c_void};

// ============================================================================
// Flag Constants
// ============================================================================

/// Subsystem flags accepted by `init`, `init_subsystem` and `was_init`.
pub mod init_flags {
    pub const TIMER: u32 = 0x0000_0001;
    pub const AUDIO: u32 = 0x0000_0010;
    pub const VIDEO: u32 = 0x0000_0020;
    pub const CDROM: u32 = 0x0000_0100;
    pub const JOYSTICK: u32 = 0x0000_0200;
    pub const NOPARACHUTE: u32 = 0x0010_0000;
    pub const EVENTTHREAD: u32 = 0x0100_0000;
    pub const EVERYTHING: u32 = 0x0000_FFFF;
}

/// Surface and video-mode flags.
pub mod surface_flags {
    pub const SWSURFACE: u32 = 0x0000_0000;
    pub const HWSURFACE: u32 = 0x0000_0001;
    pub const ASYNCBLIT: u32 = 0x0000_0004;
    pub const ANYFORMAT: u32 = 0x1000_0000;
    pub const HWPALETTE: u32 = 0x2000_0000;
    pub const DOUBLEBUF: u32 = 0x4000_0000;
    pub const FULLSCREEN: u32 = 0x8000_0000;
    pub const OPENGL: u32 = 0x0000_0002;
    pub const OPENGLBLIT: u32 = 0x0000_000A;
    pub const RESIZABLE: u32 = 0x0000_0010;
    pub const NOFRAME: u32 = 0x0000_0020;
    pub const HWACCEL: u32 = 0x0000_0100;
    pub const SRCCOLORKEY: u32 = 0x0000_1000;
    pub const RLEACCELOK: u32 = 0x0000_2000;
    pub const RLEACCEL: u32 = 0x0000_4000;
    pub const SRCALPHA: u32 = 0x0001_0000;
    pub const PREALLOC: u32 = 0x0100_0000;
}

/// Event type codes stored in the first byte of an event record.
pub mod event_kind {
    pub const NOEVENT: u8 = 0;
    pub const ACTIVEEVENT: u8 = 1;
    pub const KEYDOWN: u8 = 2;
    pub const KEYUP: u8 = 3;
    pub const MOUSEMOTION: u8 = 4;
    pub const MOUSEBUTTONDOWN: u8 = 5;
    pub const MOUSEBUTTONUP: u8 = 6;
    pub const JOYAXISMOTION: u8 = 7;
    pub const JOYBALLMOTION: u8 = 8;
    pub const JOYHATMOTION: u8 = 9;
    pub const JOYBUTTONDOWN: u8 = 10;
    pub const JOYBUTTONUP: u8 = 11;
    pub const QUIT: u8 = 12;
    pub const SYSWMEVENT: u8 = 13;
    pub const VIDEORESIZE: u8 = 16;
    pub const VIDEOEXPOSE: u8 = 17;
    pub const USEREVENT: u8 = 24;
}

/// Arguments for `joystick_event_state`.
pub mod event_state {
    pub const QUERY: i32 = -1;
    pub const IGNORE: i32 = 0;
    pub const ENABLE: i32 = 1;
}

// ============================================================================
// Records
// ============================================================================

/// `SDL_Rect`.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
pub struct RawRect {
    pub x: i16,
    pub y: i16,
    pub w: u16,
    pub h: u16,
}

/// `SDL_Color`.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RawColor {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub unused: u8,
}

/// `SDL_Palette`.
#[repr(C)]
#[derive(Debug)]
pub struct RawPalette {
    pub ncolors: c_int,
    pub colors: *mut RawColor,
}

/// `SDL_PixelFormat`. Read-only for the lifetime of the owning surface.
#[repr(C)]
#[derive(Debug)]
pub struct RawPixelFormat {
    pub palette: *mut RawPalette,
    pub bits_per_pixel: u8,
    pub bytes_per_pixel: u8,
    pub rloss: u8,
    pub gloss: u8,
    pub bloss: u8,
    pub aloss: u8,
    pub rshift: u8,
    pub gshift: u8,
    pub bshift: u8,
    pub ashift: u8,
    pub rmask: u32,
    pub gmask: u32,
    pub bmask: u32,
    pub amask: u32,
    pub colorkey: u32,
    pub alpha: u8,
}

/// `SDL_Surface`. Every field up to `offset` is mirrored by the shadow state.
#[repr(C)]
#[derive(Debug)]
pub struct RawSurface {
    pub flags: u32,
    pub format: *mut RawPixelFormat,
    pub w: c_int,
    pub h: c_int,
    pub pitch: u16,
    pub pixels: *mut c_void,
    pub offset: c_int,
    pub hwdata: *mut c_void,
    pub clip_rect: RawRect,
    pub unused1: u32,
    pub locked: u32,
    pub map: *mut c_void,
    pub format_version: c_uint,
    pub refcount: c_int,
}

/// `SDL_VideoInfo` with the capability bitfield flattened into `flags`.
#[repr(C)]
#[derive(Debug)]
pub struct RawVideoInfo {
    pub flags: u32,
    pub video_mem: u32,
    pub vfmt: *mut RawPixelFormat,
    pub current_w: c_int,
    pub current_h: c_int,
}

/// `SDL_Event`: a fixed-size union; only the type byte is common to all
/// members.
#[repr(C, align(8))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawEvent {
    pub bytes: [u8; RAW_EVENT_SIZE],
}

/// Size of the largest `SDL_Event` member (`SDL_UserEvent`) on 64-bit targets.
pub const RAW_EVENT_SIZE: usize = 24;

impl RawEvent {
    pub const fn zeroed() -> Self {
        Self {
            bytes: [0; RAW_EVENT_SIZE],
        }
    }

    /// Build a `SDL_ResizeEvent` (`type`, then `int w`, `int h`).
    pub fn resize(w: i32, h: i32) -> Self {
        let mut ev = Self::zeroed();
        ev.bytes[0] = event_kind::VIDEORESIZE;
        ev.bytes[4..8].copy_from_slice(&w.to_ne_bytes());
        ev.bytes[8..12].copy_from_slice(&h.to_ne_bytes());
        ev
    }

    /// Build a record carrying only a type byte.
    pub fn of_kind(kind: u8) -> Self {
        let mut ev = Self::zeroed();
        ev.bytes[0] = kind;
        ev
    }

    pub fn kind(&self) -> u8 {
        self.bytes[0]
    }

    pub(crate) fn int_at(&self, offset: usize) -> i32 {
        let mut word = [0u8; 4];
        word.copy_from_slice(&self.bytes[offset..offset + 4]);
        i32::from_ne_bytes(word)
    }
}

impl Default for RawEvent {
    fn default() -> Self {
        Self::zeroed()
    }
}

/// `SDL_Joystick`: opaque to callers.
#[repr(C)]
pub struct RawJoystick {
    _private: [u8; 0],
}

/// Capability bits of [`RawVideoInfo::flags`].
pub mod video_info_bits {
    pub const HW_AVAILABLE: u32 = 1 << 0;
    pub const WM_AVAILABLE: u32 = 1 << 1;
    pub const BLIT_HW: u32 = 1 << 9;
    pub const BLIT_HW_CC: u32 = 1 << 10;
    pub const BLIT_HW_A: u32 = 1 << 11;
    pub const BLIT_SW: u32 = 1 << 12;
    pub const BLIT_SW_CC: u32 = 1 << 13;
    pub const BLIT_SW_A: u32 = 1 << 14;
    pub const BLIT_FILL: u32 = 1 << 15;
}
