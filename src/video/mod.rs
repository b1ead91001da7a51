//! Video: surfaces, pixel formats, and mode lists.

mod modes;
mod retain;
mod surface;

pub use modes::ModeList;
pub use retain::{RawBuffer, RetainedBuffer};
pub use surface::{blit_surface, Surface, SurfaceInfo};

pub(crate) use modes::decode_mode_list;
pub(crate) use surface::wrap;

use crate::ffi::{video_info_bits, RawPixelFormat, RawRect, RawVideoInfo};

/// A rectangle in surface coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
pub struct Rect {
    pub x: i16,
    pub y: i16,
    pub w: u16,
    pub h: u16,
}

impl Rect {
    pub const fn new(x: i16, y: i16, w: u16, h: u16) -> Self {
        Self { x, y, w, h }
    }

    pub(crate) fn to_raw(self) -> RawRect {
        RawRect {
            x: self.x,
            y: self.y,
            w: self.w,
            h: self.h,
        }
    }
}

impl From<RawRect> for Rect {
    fn from(r: RawRect) -> Self {
        Self::new(r.x, r.y, r.w, r.h)
    }
}

/// A palette entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

/// Channel masks for surface creation. All zero picks the library default
/// for the depth.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ChannelMasks {
    pub r: u32,
    pub g: u32,
    pub b: u32,
    pub a: u32,
}

impl ChannelMasks {
    pub const fn new(r: u32, g: u32, b: u32, a: u32) -> Self {
        Self { r, g, b, a }
    }
}

/// Copy of a library pixel format.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PixelFormat {
    pub palette: Option<Vec<Color>>,
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

impl PixelFormat {
    /// # Safety
    /// `format` must be null or point to a live pixel format.
    pub(crate) unsafe fn copy_from(format: *const RawPixelFormat) -> Option<Self> {
        let f = format.as_ref()?;
        let palette = f.palette.as_ref().map(|p| {
            let len = usize::try_from(p.ncolors).unwrap_or(0);
            if p.colors.is_null() || len == 0 {
                return Vec::new();
            }
            std::slice::from_raw_parts(p.colors, len)
                .iter()
                .map(|c| Color { r: c.r, g: c.g, b: c.b })
                .collect()
        });
        Some(Self {
            palette,
            bits_per_pixel: f.bits_per_pixel,
            bytes_per_pixel: f.bytes_per_pixel,
            rloss: f.rloss,
            gloss: f.gloss,
            bloss: f.bloss,
            aloss: f.aloss,
            rshift: f.rshift,
            gshift: f.gshift,
            bshift: f.bshift,
            ashift: f.ashift,
            rmask: f.rmask,
            gmask: f.gmask,
            bmask: f.bmask,
            amask: f.amask,
            colorkey: f.colorkey,
            alpha: f.alpha,
        })
    }
}

/// Capabilities of the video device.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct VideoInfo {
    pub hw_available: bool,
    pub wm_available: bool,
    pub blit_hw: bool,
    pub blit_hw_cc: bool,
    pub blit_hw_a: bool,
    pub blit_sw: bool,
    pub blit_sw_cc: bool,
    pub blit_sw_a: bool,
    pub blit_fill: bool,
    /// Total video memory in kilobytes.
    pub video_mem: u32,
    /// Format of the video surface, or the best format when no mode is set.
    pub vfmt: Option<PixelFormat>,
    pub current_w: i32,
    pub current_h: i32,
}

impl VideoInfo {
    /// # Safety
    /// `info` must point to a live video info record.
    pub(crate) unsafe fn copy_from(info: &RawVideoInfo) -> Self {
        let bit = |b: u32| info.flags & b != 0;
        Self {
            hw_available: bit(video_info_bits::HW_AVAILABLE),
            wm_available: bit(video_info_bits::WM_AVAILABLE),
            blit_hw: bit(video_info_bits::BLIT_HW),
            blit_hw_cc: bit(video_info_bits::BLIT_HW_CC),
            blit_hw_a: bit(video_info_bits::BLIT_HW_A),
            blit_sw: bit(video_info_bits::BLIT_SW),
            blit_sw_cc: bit(video_info_bits::BLIT_SW_CC),
            blit_sw_a: bit(video_info_bits::BLIT_SW_A),
            blit_fill: bit(video_info_bits::BLIT_FILL),
            video_mem: info.video_mem,
            vfmt: PixelFormat::copy_from(info.vfmt),
            current_w: info.current_w,
            current_h: info.current_h,
        }
    }
}
