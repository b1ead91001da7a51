//! Raw surface memory for the software library.
//!
//! Everything here works on the C records directly, the way the C library
//! would: surfaces, formats and palettes are heap blocks reached through
//! raw pointers, and pixel rows are addressed with `pitch`.

use std::ffi::{c_int, c_void};
use std::ptr;

use crate::ffi::{surface_flags, RawColor, RawPalette, RawPixelFormat, RawRect, RawSurface};

// ============================================================================
// Pixel formats
// ============================================================================

fn default_masks(bits: u8) -> (u32, u32, u32, u32) {
    match bits {
        15 => (0x7C00, 0x03E0, 0x001F, 0),
        16 => (0xF800, 0x07E0, 0x001F, 0),
        24 | 32 => (0x00FF_0000, 0x0000_FF00, 0x0000_00FF, 0),
        _ => (0, 0, 0, 0),
    }
}

/// Shift and loss of one channel mask. An empty mask loses all 8 bits.
fn channel(mask: u32) -> (u8, u8) {
    if mask == 0 {
        return (0, 8);
    }
    let shift = mask.trailing_zeros();
    let bits = (mask >> shift).count_ones();
    (shift as u8, 8u32.saturating_sub(bits) as u8)
}

fn alloc_palette(ncolors: usize) -> *mut RawPalette {
    let top = ncolors.saturating_sub(1).max(1);
    let colors: Box<[RawColor]> = (0..ncolors)
        .map(|i| {
            let v = (i * 255 / top) as u8;
            RawColor {
                r: v,
                g: v,
                b: v,
                unused: 0,
            }
        })
        .collect();
    let colors = Box::into_raw(colors) as *mut RawColor;
    Box::into_raw(Box::new(RawPalette {
        ncolors: ncolors as c_int,
        colors,
    }))
}

/// Allocate a pixel format. Depths of 8 bits or fewer get a grey palette.
pub(crate) fn alloc_format(depth: i32, rmask: u32, gmask: u32, bmask: u32, amask: u32) -> *mut RawPixelFormat {
    let bits = depth.clamp(1, 32) as u8;
    let (rmask, gmask, bmask, amask) = if bits > 8 && (rmask | gmask | bmask | amask) == 0 {
        default_masks(bits)
    } else if bits <= 8 {
        (0, 0, 0, 0)
    } else {
        (rmask, gmask, bmask, amask)
    };
    let palette = if bits <= 8 {
        alloc_palette(1usize << bits)
    } else {
        ptr::null_mut()
    };
    let (rshift, rloss) = channel(rmask);
    let (gshift, gloss) = channel(gmask);
    let (bshift, bloss) = channel(bmask);
    let (ashift, aloss) = channel(amask);

    Box::into_raw(Box::new(RawPixelFormat {
        palette,
        bits_per_pixel: bits,
        bytes_per_pixel: bits.div_ceil(8),
        rloss,
        gloss,
        bloss,
        aloss,
        rshift,
        gshift,
        bshift,
        ashift,
        rmask,
        gmask,
        bmask,
        amask,
        colorkey: 0,
        alpha: 255,
    }))
}

/// # Safety
/// `format` must be null or come from [`alloc_format`] and not be freed yet.
pub(crate) unsafe fn free_format(format: *mut RawPixelFormat) {
    if format.is_null() {
        return;
    }
    let format = Box::from_raw(format);
    if !format.palette.is_null() {
        let palette = Box::from_raw(format.palette);
        let colors = ptr::slice_from_raw_parts_mut(palette.colors, palette.ncolors as usize);
        drop(Box::from_raw(colors));
    }
}

/// # Safety
/// `format` must point at a live pixel format.
pub(crate) unsafe fn map_rgba(format: &RawPixelFormat, r: u8, g: u8, b: u8, a: u8) -> u32 {
    if !format.palette.is_null() {
        let palette = &*format.palette;
        let colors = std::slice::from_raw_parts(palette.colors, palette.ncolors as usize);
        let distance = |c: &RawColor| {
            let dr = i32::from(c.r) - i32::from(r);
            let dg = i32::from(c.g) - i32::from(g);
            let db = i32::from(c.b) - i32::from(b);
            dr * dr + dg * dg + db * db
        };
        return colors
            .iter()
            .enumerate()
            .min_by_key(|(_, c)| distance(*c))
            .map_or(0, |(i, _)| i as u32);
    }
    let pack = |v: u8, loss: u8, shift: u8, mask: u32| ((u32::from(v) >> loss) << shift) & mask;
    pack(r, format.rloss, format.rshift, format.rmask)
        | pack(g, format.gloss, format.gshift, format.gmask)
        | pack(b, format.bloss, format.bshift, format.bmask)
        | pack(a, format.aloss, format.ashift, format.amask)
}

/// # Safety
/// `format` must point at a live pixel format.
pub(crate) unsafe fn get_rgba(pixel: u32, format: &RawPixelFormat) -> (u8, u8, u8, u8) {
    if !format.palette.is_null() {
        let palette = &*format.palette;
        let index = pixel as usize;
        if index >= palette.ncolors as usize {
            return (0, 0, 0, 255);
        }
        let c = *palette.colors.add(index);
        return (c.r, c.g, c.b, 255);
    }
    let expand = |mask: u32, shift: u8, loss: u8, empty: u8| {
        if mask == 0 {
            return empty;
        }
        let bits = 8 - u32::from(loss);
        let v = (pixel & mask) >> shift;
        (v * 255 / ((1u32 << bits) - 1)) as u8
    };
    (
        expand(format.rmask, format.rshift, format.rloss, 0),
        expand(format.gmask, format.gshift, format.gloss, 0),
        expand(format.bmask, format.bshift, format.bloss, 0),
        expand(format.amask, format.ashift, format.aloss, 255),
    )
}

unsafe fn same_layout(a: &RawPixelFormat, b: &RawPixelFormat) -> bool {
    a.bits_per_pixel == b.bits_per_pixel
        && a.rmask == b.rmask
        && a.gmask == b.gmask
        && a.bmask == b.bmask
        && a.amask == b.amask
        && a.palette.is_null()
        && b.palette.is_null()
}

// ============================================================================
// Pixel access
// ============================================================================

unsafe fn read_pixel(p: *const u8, bpp: usize) -> u32 {
    match bpp {
        1 => u32::from(*p),
        2 => u32::from(ptr::read_unaligned(p as *const u16)),
        3 => u32::from_le_bytes([*p, *p.add(1), *p.add(2), 0]),
        _ => ptr::read_unaligned(p as *const u32),
    }
}

unsafe fn write_pixel(p: *mut u8, bpp: usize, value: u32) {
    match bpp {
        1 => *p = value as u8,
        2 => ptr::write_unaligned(p as *mut u16, value as u16),
        3 => {
            let bytes = value.to_le_bytes();
            ptr::copy_nonoverlapping(bytes.as_ptr(), p, 3);
        }
        _ => ptr::write_unaligned(p as *mut u32, value),
    }
}

/// Pixel memory backing a surface, whether or not it is currently published
/// through `pixels`. Hardware surfaces keep their memory in `hwdata`.
pub(crate) unsafe fn backing(surface: &RawSurface) -> *mut u8 {
    if surface.pixels.is_null() {
        surface.hwdata as *mut u8
    } else {
        surface.pixels as *mut u8
    }
}

// ============================================================================
// Surfaces
// ============================================================================

pub(crate) fn full_rect(w: i32, h: i32) -> RawRect {
    RawRect {
        x: 0,
        y: 0,
        w: w.clamp(0, i32::from(u16::MAX)) as u16,
        h: h.clamp(0, i32::from(u16::MAX)) as u16,
    }
}

pub(crate) fn aligned_pitch(width: i32, bytes_per_pixel: u8) -> usize {
    (width.max(0) as usize * usize::from(bytes_per_pixel) + 3) & !3
}

fn alloc_pixels(len: usize) -> *mut c_void {
    Box::into_raw(vec![0u8; len].into_boxed_slice()) as *mut u8 as *mut c_void
}

unsafe fn free_pixels(pixels: *mut c_void, len: usize) {
    if !pixels.is_null() {
        drop(Box::from_raw(ptr::slice_from_raw_parts_mut(pixels as *mut u8, len)));
    }
}

/// Allocate a surface over `format`. With `preallocated` the pixel memory
/// belongs to the caller and `pitch` is taken as given.
///
/// Returns null (and frees `format`) when the geometry cannot be expressed.
pub(crate) unsafe fn alloc_surface(
    flags: u32,
    width: i32,
    height: i32,
    format: *mut RawPixelFormat,
    preallocated: Option<(*mut c_void, i32)>,
) -> *mut RawSurface {
    if width < 0 || height < 0 {
        free_format(format);
        return ptr::null_mut();
    }
    let bpp = (*format).bytes_per_pixel;
    let pitch = match preallocated {
        Some((_, pitch)) => pitch.max(0) as usize,
        None => aligned_pitch(width, bpp),
    };
    if pitch > usize::from(u16::MAX) {
        free_format(format);
        return ptr::null_mut();
    }

    let (flags, pixels, hwdata) = match preallocated {
        Some((pixels, _)) => (flags | surface_flags::PREALLOC, pixels, ptr::null_mut()),
        None => {
            let memory = alloc_pixels(pitch * height as usize);
            if flags & surface_flags::HWSURFACE != 0 {
                // Hardware memory is only published while the surface is locked.
                (flags, ptr::null_mut(), memory)
            } else {
                (flags, memory, ptr::null_mut())
            }
        }
    };

    Box::into_raw(Box::new(RawSurface {
        flags,
        format,
        w: width,
        h: height,
        pitch: pitch as u16,
        pixels,
        offset: 0,
        hwdata,
        clip_rect: full_rect(width, height),
        unused1: 0,
        locked: 0,
        map: ptr::null_mut(),
        format_version: 0,
        refcount: 1,
    }))
}

/// # Safety
/// `surface` must come from [`alloc_surface`] and not be freed yet.
pub(crate) unsafe fn free_surface(surface: *mut RawSurface) {
    let surface = Box::from_raw(surface);
    if surface.flags & surface_flags::PREALLOC == 0 {
        let len = usize::from(surface.pitch) * surface.h.max(0) as usize;
        free_pixels(backing(&surface) as *mut c_void, len);
    }
    free_format(surface.format);
}

/// Resize and reformat a library-owned surface in place, keeping its
/// address. This is what a mode change does to the display surface.
pub(crate) unsafe fn reshape(surface: *mut RawSurface, width: i32, height: i32, depth: i32, flags: u32) {
    let s = &mut *surface;
    let old_len = usize::from(s.pitch) * s.h.max(0) as usize;
    free_pixels(backing(s) as *mut c_void, old_len);

    if i32::from((*s.format).bits_per_pixel) != depth {
        free_format(s.format);
        s.format = alloc_format(depth, 0, 0, 0, 0);
    }
    let pitch = aligned_pitch(width, (*s.format).bytes_per_pixel).min(usize::from(u16::MAX));
    s.flags = flags & !surface_flags::HWSURFACE;
    s.w = width;
    s.h = height;
    s.pitch = pitch as u16;
    s.pixels = alloc_pixels(pitch * height.max(0) as usize);
    s.hwdata = ptr::null_mut();
    s.clip_rect = full_rect(width, height);
}

// ============================================================================
// Drawing
// ============================================================================

#[derive(Clone, Copy)]
struct Area {
    x: i32,
    y: i32,
    w: i32,
    h: i32,
}

impl Area {
    fn of(r: &RawRect) -> Self {
        Self {
            x: i32::from(r.x),
            y: i32::from(r.y),
            w: i32::from(r.w),
            h: i32::from(r.h),
        }
    }

    fn intersect(self, other: Area) -> Area {
        let x = self.x.max(other.x);
        let y = self.y.max(other.y);
        let right = (self.x + self.w).min(other.x + other.w);
        let bottom = (self.y + self.h).min(other.y + other.h);
        Area {
            x,
            y,
            w: (right - x).max(0),
            h: (bottom - y).max(0),
        }
    }

    fn is_empty(self) -> bool {
        self.w <= 0 || self.h <= 0
    }

    fn store(self, r: &mut RawRect) {
        if self.is_empty() {
            r.w = 0;
            r.h = 0;
            return;
        }
        r.x = self.x as i16;
        r.y = self.y as i16;
        r.w = self.w as u16;
        r.h = self.h as u16;
    }
}

/// `SDL_FillRect`: a null rect fills the whole clip area.
pub(crate) unsafe fn fill(dst: *mut RawSurface, rect: *mut RawRect, color: u32) -> i32 {
    let s = &*dst;
    let memory = backing(s);
    if memory.is_null() {
        return -1;
    }
    let clip = Area::of(&s.clip_rect);
    let area = if rect.is_null() {
        clip
    } else {
        let area = Area::of(&*rect).intersect(clip);
        area.store(&mut *rect);
        area
    };
    if area.is_empty() {
        return 0;
    }

    let bpp = usize::from((*s.format).bytes_per_pixel);
    for y in area.y..area.y + area.h {
        let row = memory.add(y as usize * usize::from(s.pitch));
        for x in area.x..area.x + area.w {
            write_pixel(row.add(x as usize * bpp), bpp, color);
        }
    }
    0
}

/// `SDL_UpperBlit`: clips the source to its bounds, the destination to its
/// clip rect, and writes the final area back into `dst_rect`.
pub(crate) unsafe fn blit(
    src: *mut RawSurface,
    src_rect: *mut RawRect,
    dst: *mut RawSurface,
    dst_rect: *mut RawRect,
) -> i32 {
    let (s, d) = (&*src, &*dst);
    if s.locked > 0 || d.locked > 0 {
        return -1;
    }
    let (src_mem, dst_mem) = (backing(s), backing(d));
    if src_mem.is_null() || dst_mem.is_null() {
        return -1;
    }

    let bounds = Area::of(&full_rect(s.w, s.h));
    let requested = if src_rect.is_null() {
        bounds
    } else {
        Area::of(&*src_rect)
    };
    let clipped_src = requested.intersect(bounds);
    let (origin_x, origin_y) = if dst_rect.is_null() {
        (0, 0)
    } else {
        (i32::from((*dst_rect).x), i32::from((*dst_rect).y))
    };
    let target = Area {
        x: origin_x + (clipped_src.x - requested.x),
        y: origin_y + (clipped_src.y - requested.y),
        w: clipped_src.w,
        h: clipped_src.h,
    };
    let area = target.intersect(Area::of(&d.clip_rect));
    if !dst_rect.is_null() {
        area.store(&mut *dst_rect);
    }
    if area.is_empty() {
        return 0;
    }
    let sx = clipped_src.x + (area.x - target.x);
    let sy = clipped_src.y + (area.y - target.y);

    let (sf, df) = (&*s.format, &*d.format);
    let (sbpp, dbpp) = (usize::from(sf.bytes_per_pixel), usize::from(df.bytes_per_pixel));
    let colorkey = (s.flags & surface_flags::SRCCOLORKEY != 0).then_some(sf.colorkey);

    for row in 0..area.h {
        let src_row = src_mem
            .add((sy + row) as usize * usize::from(s.pitch))
            .add(sx as usize * sbpp);
        let dst_row = dst_mem
            .add((area.y + row) as usize * usize::from(d.pitch))
            .add(area.x as usize * dbpp);

        if colorkey.is_none() && same_layout(sf, df) {
            // Self-blits may overlap.
            ptr::copy(src_row, dst_row, area.w as usize * sbpp);
            continue;
        }
        for col in 0..area.w as usize {
            let pixel = read_pixel(src_row.add(col * sbpp), sbpp);
            if colorkey == Some(pixel) {
                continue;
            }
            let (r, g, b, a) = get_rgba(pixel, sf);
            write_pixel(dst_row.add(col * dbpp), dbpp, map_rgba(df, r, g, b, a));
        }
    }
    0
}

/// Copy `src` into a new surface with `format`, taking ownership of it.
pub(crate) unsafe fn convert(src: *mut RawSurface, format: *mut RawPixelFormat, flags: u32) -> *mut RawSurface {
    let s = &*src;
    let out = alloc_surface(flags & !surface_flags::HWSURFACE, s.w, s.h, format, None);
    if out.is_null() {
        return out;
    }
    // Conversion ignores the source colorkey and lock state.
    let (saved_flags, saved_locked) = (s.flags, s.locked);
    (*src).flags &= !surface_flags::SRCCOLORKEY;
    (*src).locked = 0;
    blit(src, ptr::null_mut(), out, ptr::null_mut());
    (*src).flags = saved_flags;
    (*src).locked = saved_locked;
    out
}

/// Nearest-neighbour scale into a new surface of the same layout.
pub(crate) unsafe fn zoom(src: *mut RawSurface, zoom_x: f64, zoom_y: f64) -> *mut RawSurface {
    let s = &*src;
    let src_mem = backing(s);
    if src_mem.is_null() || s.w == 0 || s.h == 0 {
        return ptr::null_mut();
    }
    let width = ((f64::from(s.w) * zoom_x.abs()).round() as i32).max(1);
    let height = ((f64::from(s.h) * zoom_y.abs()).round() as i32).max(1);
    let sf = &*s.format;
    let format = alloc_format(
        i32::from(sf.bits_per_pixel),
        sf.rmask,
        sf.gmask,
        sf.bmask,
        sf.amask,
    );
    let out = alloc_surface(surface_flags::SWSURFACE, width, height, format, None);
    if out.is_null() {
        return out;
    }
    let d = &*out;
    let bpp = usize::from(sf.bytes_per_pixel);
    for y in 0..height {
        let sy = (i64::from(y) * i64::from(s.h) / i64::from(height)) as usize;
        for x in 0..width {
            let sx = (i64::from(x) * i64::from(s.w) / i64::from(width)) as usize;
            let value = read_pixel(src_mem.add(sy * usize::from(s.pitch) + sx * bpp), bpp);
            write_pixel(
                (d.pixels as *mut u8).add(y as usize * usize::from(d.pitch) + x as usize * bpp),
                bpp,
                value,
            );
        }
    }
    out
}

/// Read one pixel as RGBA, for encoders.
pub(crate) unsafe fn pixel_rgba(surface: &RawSurface, x: i32, y: i32) -> (u8, u8, u8, u8) {
    let format = &*surface.format;
    let bpp = usize::from(format.bytes_per_pixel);
    let p = backing(surface).add(y as usize * usize::from(surface.pitch) + x as usize * bpp);
    get_rgba(read_pixel(p, bpp), format)
}

#[cfg(test)]
mod tests {
    use super::*;

    unsafe fn surface32(w: i32, h: i32) -> *mut RawSurface {
        let format = alloc_format(32, 0, 0, 0, 0);
        alloc_surface(surface_flags::SWSURFACE, w, h, format, None)
    }

    #[test]
    fn test_format_shifts_and_losses() {
        unsafe {
            let f = alloc_format(16, 0, 0, 0, 0);
            assert_eq!((*f).bytes_per_pixel, 2);
            assert_eq!((*f).rshift, 11);
            assert_eq!((*f).rloss, 3);
            assert_eq!((*f).gloss, 2);
            assert_eq!((*f).aloss, 8);
            free_format(f);
        }
    }

    #[test]
    fn test_eight_bit_format_has_palette() {
        unsafe {
            let f = alloc_format(8, 0, 0, 0, 0);
            assert!(!(*f).palette.is_null());
            assert_eq!((*(*f).palette).ncolors, 256);
            assert_eq!(map_rgba(&*f, 255, 255, 255, 255), 255);
            free_format(f);
        }
    }

    #[test]
    fn test_map_and_get_rgba_32() {
        unsafe {
            let f = alloc_format(32, 0x00FF_0000, 0x0000_FF00, 0x0000_00FF, 0xFF00_0000);
            let pixel = map_rgba(&*f, 1, 2, 3, 4);
            assert_eq!(pixel, 0x0401_0203);
            assert_eq!(get_rgba(pixel, &*f), (1, 2, 3, 4));
            free_format(f);
        }
    }

    #[test]
    fn test_fill_clips_and_writes_back_rect() {
        unsafe {
            let s = surface32(4, 4);
            let mut rect = RawRect { x: 2, y: 2, w: 10, h: 10 };
            assert_eq!(fill(s, &mut rect, 0xAABBCCDD), 0);
            assert_eq!(rect, RawRect { x: 2, y: 2, w: 2, h: 2 });
            assert_eq!(pixel_rgba(&*s, 3, 3), (0xBB, 0xCC, 0xDD, 255));
            assert_eq!(pixel_rgba(&*s, 0, 0), (0, 0, 0, 255));
            free_surface(s);
        }
    }

    #[test]
    fn test_blit_refuses_locked_surfaces() {
        unsafe {
            let a = surface32(2, 2);
            let b = surface32(2, 2);
            (*a).locked = 1;
            assert_eq!(blit(a, ptr::null_mut(), b, ptr::null_mut()), -1);
            (*a).locked = 0;
            assert_eq!(blit(a, ptr::null_mut(), b, ptr::null_mut()), 0);
            free_surface(a);
            free_surface(b);
        }
    }

    #[test]
    fn test_blit_offsets_destination() {
        unsafe {
            let src = surface32(2, 2);
            let dst = surface32(4, 4);
            fill(src, ptr::null_mut(), 0x00FF_0000);
            let mut at = RawRect { x: 3, y: 3, w: 0, h: 0 };
            assert_eq!(blit(src, ptr::null_mut(), dst, &mut at), 0);
            assert_eq!(at, RawRect { x: 3, y: 3, w: 1, h: 1 });
            assert_eq!(pixel_rgba(&*dst, 3, 3).0, 255);
            assert_eq!(pixel_rgba(&*dst, 2, 2).0, 0);
            free_surface(src);
            free_surface(dst);
        }
    }

    #[test]
    fn test_hardware_surface_hides_pixels() {
        unsafe {
            let f = alloc_format(32, 0, 0, 0, 0);
            let s = alloc_surface(surface_flags::HWSURFACE, 2, 2, f, None);
            assert!((*s).pixels.is_null());
            assert!(!(*s).hwdata.is_null());
            free_surface(s);
        }
    }

    #[test]
    fn test_reshape_keeps_address() {
        unsafe {
            let s = surface32(2, 2);
            reshape(s, 8, 6, 16, surface_flags::RESIZABLE);
            assert_eq!(((*s).w, (*s).h), (8, 6));
            assert_eq!((*s).pitch, 16);
            assert_eq!((*(*s).format).bits_per_pixel, 16);
            free_surface(s);
        }
    }

    #[test]
    fn test_zoom_doubles_geometry() {
        unsafe {
            let s = surface32(3, 2);
            let z = zoom(s, 2.0, 2.0);
            assert_eq!(((*z).w, (*z).h), (6, 4));
            free_surface(z);
            free_surface(s);
        }
    }
}
