//! Handle lifetimes: the display slot, destroy, shadow reloads and
//! caller-owned pixel memory.

use std::sync::Arc;

use synced_sdl::video::RawBuffer;
use synced_sdl::{
    init_flags, surface_flags, ChannelMasks, Context, ContextConfig, Error, Rect, SoftwareLibrary,
    Surface,
};

fn context() -> (Arc<SoftwareLibrary>, Context) {
    let lib = Arc::new(SoftwareLibrary::new());
    let ctx = Context::with_config(lib.clone(), ContextConfig::default());
    (lib, ctx)
}

/// Compare the shadow with the library record it mirrors.
fn assert_shadow_current(surface: &Surface) {
    let info = surface.info().unwrap();
    let raw = unsafe { &*surface.as_ptr() };
    assert_eq!(info.flags, raw.flags);
    assert_eq!(info.w, raw.w);
    assert_eq!(info.h, raw.h);
    assert_eq!(info.pitch, raw.pitch);
    assert_eq!(info.offset, raw.offset);
    assert_eq!(surface.pixels_ptr().unwrap(), raw.pixels);
}

#[test]
fn test_video_surface_is_the_last_mode_set() {
    let (_lib, ctx) = context();
    assert_eq!(ctx.init(init_flags::VIDEO), 0);
    let screen = ctx.set_video_mode(320, 240, 32, 0).unwrap();
    assert_eq!(ctx.video_surface().as_ref(), Some(&screen));
    assert_shadow_current(&screen);
    ctx.quit();
}

#[test]
fn test_freeing_display_empties_slot_and_is_idempotent() {
    let (lib, ctx) = context();
    ctx.init(init_flags::VIDEO);
    let screen = ctx.set_video_mode(320, 240, 32, 0).unwrap();
    screen.free();
    screen.free();
    assert!(ctx.video_surface().is_none());
    assert!(screen.is_destroyed());
    assert_eq!(screen.flip(), Err(Error::NullHandle));
    assert_eq!(lib.probe().stats().invalid_releases, 0);
    ctx.quit();
}

#[test]
fn test_quit_destroys_display_handle() {
    let (lib, ctx) = context();
    ctx.init(init_flags::VIDEO);
    let screen = ctx.set_video_mode(32, 32, 32, 0).unwrap();
    ctx.quit();
    assert!(screen.is_destroyed());
    assert!(ctx.video_surface().is_none());
    // The library released it; freeing the dead handle must not reach it.
    screen.free();
    assert_eq!(lib.probe().stats().invalid_releases, 0);
    assert_eq!(lib.live_surfaces(), 0);
}

#[test]
fn test_lock_reload_exposes_hardware_pixels() {
    let (_lib, ctx) = context();
    let s = ctx
        .create_rgb_surface(surface_flags::HWSURFACE, 8, 8, 32, ChannelMasks::default())
        .unwrap();
    assert_shadow_current(&s);
    assert!(s.pixels_ptr().unwrap().is_null());
    assert_eq!(s.lock().unwrap(), 0);
    assert_shadow_current(&s);
    assert!(!s.pixels_ptr().unwrap().is_null());
    s.unlock().unwrap();
    assert_shadow_current(&s);
    s.free();
}

#[test]
fn test_retained_vec_outlives_its_scope() {
    let (_lib, ctx) = context();
    let surface = {
        let pixels = vec![0u32; 8 * 8];
        ctx.create_rgb_surface_from(pixels, 8, 8, 32, 32, ChannelMasks::default())
            .unwrap()
            .unwrap()
    };
    let blue = surface.map_rgb(0, 0, 255).unwrap();
    assert_eq!(surface.fill_rect(None, blue).unwrap(), 0);
    let all_blue = surface
        .with_pixels(|p| {
            p.chunks_exact(4)
                .all(|px| u32::from_ne_bytes([px[0], px[1], px[2], px[3]]) == blue)
        })
        .unwrap();
    assert!(all_blue);

    let other = ctx.create_rgb_surface(0, 8, 8, 32, ChannelMasks::default()).unwrap();
    assert_eq!(other.blit(None, &surface, None).unwrap(), 0);
    other.free();
    surface.free();
    assert_eq!(surface.with_pixels(|_| ()), Err(Error::NullHandle));
}

#[test]
fn test_retained_boxed_slice_and_raw_buffer() {
    let (_lib, ctx) = context();
    let boxed = vec![0u8; 4 * 4 * 2].into_boxed_slice();
    let s = ctx
        .create_rgb_surface_from(boxed, 4, 4, 16, 8, ChannelMasks::default())
        .unwrap()
        .unwrap();
    assert_eq!(s.pitch().unwrap(), 8);
    s.free();

    let mut backing = vec![0u8; 4 * 4 * 4];
    let raw = unsafe { RawBuffer::new(backing.as_mut_ptr(), backing.len()) };
    let s = ctx
        .create_rgb_surface_from(raw, 4, 4, 32, 16, ChannelMasks::default())
        .unwrap()
        .unwrap();
    s.fill_rect(Some(&mut Rect::new(0, 0, 1, 1)), 0xDEAD_BEEF).unwrap();
    s.free();
    assert_eq!(&backing[..4], &0xDEAD_BEEFu32.to_ne_bytes());
}

#[test]
fn test_unsupported_buffer_shape_is_reported() {
    let (lib, ctx) = context();
    let calls = lib.probe().stats().global_calls;
    let err = ctx
        .create_rgb_surface_from(vec![0.5f64; 64], 4, 4, 32, 16, ChannelMasks::default())
        .unwrap_err();
    match err {
        Error::UnsupportedBufferShape { shape } => assert!(shape.contains("f64"), "{}", shape),
        other => panic!("unexpected error {:?}", other),
    }
    assert_eq!(lib.probe().stats().global_calls, calls);
}

#[test]
fn test_display_format_copies_into_screen_format() {
    let (_lib, ctx) = context();
    ctx.init(init_flags::VIDEO);
    let _screen = ctx.set_video_mode(32, 32, 16, 0).unwrap();
    let s = ctx.create_rgb_surface(0, 4, 4, 32, ChannelMasks::default()).unwrap();
    let converted = s.display_format().unwrap().unwrap();
    assert_eq!(converted.format().unwrap().bits_per_pixel, 16);
    let with_alpha = s.display_format_alpha().unwrap().unwrap();
    assert_ne!(with_alpha.format().unwrap().amask, 0);
    converted.free();
    with_alpha.free();
    s.free();
    ctx.quit();
}

#[test]
fn test_update_rects_and_flip_reach_library() {
    let (lib, ctx) = context();
    ctx.init(init_flags::VIDEO);
    let screen = ctx.set_video_mode(32, 32, 32, 0).unwrap();
    screen.update_rect(0, 0, 0, 0).unwrap();
    screen.update_rects(&[]).unwrap();
    screen.update_rects(&[Rect::new(0, 0, 4, 4)]).unwrap();
    assert_eq!(screen.flip().unwrap(), 0);
    assert_eq!(lib.screen_updates(), 3);
    ctx.quit();
}

#[test]
fn test_window_manager_calls() {
    let (lib, ctx) = context();
    ctx.init(init_flags::VIDEO);
    let icon = ctx.create_rgb_surface(0, 8, 8, 32, ChannelMasks::default()).unwrap();
    ctx.wm_set_icon(&icon, Some(&[0xFF; 8])).unwrap();
    assert!(lib.has_icon());
    assert_eq!(ctx.wm_iconify_window(), 1);
    assert!(lib.is_iconified());
    ctx.gl_swap_buffers();
    assert_eq!(lib.gl_swaps(), 1);
    assert_eq!(ctx.gl_set_attribute(5, 1), 0);
    icon.free();
    assert_eq!(ctx.wm_set_icon(&icon, None), Err(Error::NullHandle));
    ctx.quit();
}

#[test]
fn test_video_queries() {
    let (_lib, ctx) = context();
    ctx.init(init_flags::VIDEO);
    assert_eq!(ctx.video_mode_ok(640, 480, 0, 0), 32);
    assert_eq!(ctx.video_mode_ok(4096, 4096, 16, 0), 0);
    let _screen = ctx.set_video_mode(200, 100, 32, 0).unwrap();
    let info = ctx.video_info().unwrap();
    assert!(info.wm_available);
    assert_eq!((info.current_w, info.current_h), (200, 100));
    assert_eq!(info.vfmt.map(|f| f.bits_per_pixel), Some(32));
    ctx.quit();
}
