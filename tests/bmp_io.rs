//! Saving and loading image files through surfaces.

use std::sync::Arc;

use synced_sdl::{ChannelMasks, Context, ContextConfig, Rect, SoftwareLibrary};

fn context() -> Context {
    Context::with_config(Arc::new(SoftwareLibrary::new()), ContextConfig::default())
}

#[test]
fn test_save_then_load_keeps_colors() {
    let ctx = context();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("tile.bmp");

    let s = ctx.create_rgb_surface(0, 4, 2, 32, ChannelMasks::default()).unwrap();
    s.fill_rect(None, s.map_rgb(0, 0, 255).unwrap()).unwrap();
    s.fill_rect(Some(&mut Rect::new(0, 0, 1, 1)), s.map_rgb(255, 0, 0).unwrap())
        .unwrap();
    assert_eq!(s.save_bmp(&path).unwrap(), 0);
    assert!(path.exists());

    let loaded = ctx.load(&path).unwrap().expect("bmp should load");
    assert_eq!((loaded.width().unwrap(), loaded.height().unwrap()), (4, 2));
    let bpp = usize::from(loaded.format().unwrap().bytes_per_pixel);
    let (first, last) = loaded
        .with_pixels(|p| {
            let pixel = |i: usize| {
                let mut word = [0u8; 4];
                word[..bpp].copy_from_slice(&p[i * bpp..(i + 1) * bpp]);
                u32::from_ne_bytes(word)
            };
            (pixel(0), pixel(3))
        })
        .unwrap();
    assert_eq!(loaded.get_rgb(first).unwrap(), (255, 0, 0));
    assert_eq!(loaded.get_rgb(last).unwrap(), (0, 0, 255));

    loaded.free();
    s.free();
}

#[test]
fn test_load_missing_file_gives_no_handle() {
    let ctx = context();
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("missing.png");
    assert!(ctx.load(&missing).unwrap().is_none());
    assert!(ctx.get_error().contains("missing.png"));
}

#[test]
fn test_save_into_missing_directory_reports_status() {
    let ctx = context();
    let dir = tempfile::tempdir().unwrap();
    let s = ctx.create_rgb_surface(0, 2, 2, 32, ChannelMasks::default()).unwrap();
    let status = s.save_bmp(dir.path().join("no/such/dir/out.bmp")).unwrap();
    assert_eq!(status, -1);
    s.free();
}
