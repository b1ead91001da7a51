//! Locking behaviour under real threads.
//!
//! The software library's probe records how calls overlap inside the
//! library, with artificial delays to widen the race windows.

use std::sync::mpsc;
use std::sync::{Arc, Barrier};
use std::thread;
use std::time::Duration;

use synced_sdl::ffi::{RawEvent, RawSurface};
use synced_sdl::{
    init_flags, surface_flags, ChannelMasks, Context, ContextConfig, Rect, SoftwareLibrary, Surface,
};

fn context() -> (Arc<SoftwareLibrary>, Context) {
    let lib = Arc::new(SoftwareLibrary::new());
    let ctx = Context::with_config(lib.clone(), ContextConfig::default());
    (lib, ctx)
}

/// The library's current pixel pointer and byte length for a surface
/// address, read straight from its record.
fn library_pixels(raw: usize) -> (usize, usize) {
    let s = unsafe { &*(raw as *const RawSurface) };
    (s.pixels as usize, usize::from(s.pitch) * s.h as usize)
}

fn surface(ctx: &Context) -> Surface {
    ctx.create_rgb_surface(0, 16, 16, 32, ChannelMasks::default())
        .expect("surface")
}

#[test]
fn test_private_blits_run_in_parallel() {
    let (lib, ctx) = context();
    ctx.init(init_flags::VIDEO);
    // A display exists but neither blit touches it.
    let _screen = ctx.set_video_mode(64, 64, 32, 0).unwrap();
    let pairs: Vec<(Surface, Surface)> = (0..2).map(|_| (surface(&ctx), surface(&ctx))).collect();

    lib.probe().reset();
    lib.probe().set_blit_delay(Duration::from_millis(100));
    let barrier = Arc::new(Barrier::new(pairs.len()));
    let handles: Vec<_> = pairs
        .iter()
        .cloned()
        .map(|(dst, src)| {
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                dst.blit(None, &src, None).unwrap()
            })
        })
        .collect();
    for handle in handles {
        assert_eq!(handle.join().unwrap(), 0);
    }

    let stats = lib.probe().stats();
    assert_eq!(stats.blits, 2);
    assert_eq!(stats.display_blits, 0);
    assert!(stats.max_concurrent_blits >= 2, "{:?}", stats);
    ctx.quit();
}

#[test]
fn test_display_blits_serialise_with_global_calls() {
    let (lib, ctx) = context();
    ctx.init(init_flags::VIDEO);
    let screen = ctx.set_video_mode(64, 64, 32, 0).unwrap();
    let sprite = surface(&ctx);

    lib.probe().reset();
    lib.probe().set_blit_delay(Duration::from_millis(2));
    lib.probe().set_global_delay(Duration::from_millis(1));

    let barrier = Arc::new(Barrier::new(3));
    let blitter = {
        let (barrier, screen, sprite) = (Arc::clone(&barrier), screen.clone(), sprite.clone());
        thread::spawn(move || {
            barrier.wait();
            for i in 0..20 {
                let mut at = Rect::new(i, i, 0, 0);
                screen.blit(Some(&mut at), &sprite, None).unwrap();
            }
        })
    };
    let reverse_blitter = {
        let (barrier, screen, sprite) = (Arc::clone(&barrier), screen.clone(), sprite.clone());
        thread::spawn(move || {
            barrier.wait();
            for _ in 0..20 {
                sprite.blit(None, &screen, None).unwrap();
            }
        })
    };
    let global_caller = {
        let (barrier, ctx) = (Arc::clone(&barrier), ctx.clone());
        thread::spawn(move || {
            barrier.wait();
            for _ in 0..20 {
                ctx.ticks();
                ctx.poll_event();
                ctx.wm_set_caption("busy", "busy").unwrap();
            }
        })
    };
    for handle in [blitter, reverse_blitter, global_caller] {
        handle.join().unwrap();
    }

    let stats = lib.probe().stats();
    assert_eq!(stats.display_blits, 40);
    assert_eq!(stats.global_overlaps, 0, "{:?}", stats);
    ctx.quit();
}

#[test]
fn test_crossed_blits_do_not_deadlock() {
    let (_lib, ctx) = context();
    let a = surface(&ctx);
    let b = surface(&ctx);

    let (done_tx, done_rx) = mpsc::channel();
    for (dst, src) in [(a.clone(), b.clone()), (b.clone(), a.clone())] {
        let done_tx = done_tx.clone();
        thread::spawn(move || {
            for _ in 0..2_000 {
                dst.blit(None, &src, None).unwrap();
            }
            done_tx.send(()).unwrap();
        });
    }
    for _ in 0..2 {
        done_rx
            .recv_timeout(Duration::from_secs(30))
            .expect("crossed blits deadlocked");
    }
    a.free();
    b.free();
}

#[test]
fn test_concurrent_free_releases_once() {
    let (lib, ctx) = context();
    let s = surface(&ctx);
    lib.probe().reset();

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let s = s.clone();
            thread::spawn(move || s.free())
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    let stats = lib.probe().stats();
    assert_eq!(stats.surfaces_freed, 1);
    assert_eq!(stats.invalid_releases, 0);
    assert!(s.is_destroyed());
}

#[test]
fn test_operations_racing_free_never_touch_freed_memory() {
    let (lib, ctx) = context();
    let target = surface(&ctx);
    let sprite = surface(&ctx);

    let painter = {
        let (target, sprite) = (target.clone(), sprite.clone());
        thread::spawn(move || {
            let mut destroyed = 0;
            for _ in 0..500 {
                match target.blit(None, &sprite, None) {
                    Ok(status) => assert_eq!(status, 0),
                    Err(err) => {
                        assert!(err.is_null_handle());
                        destroyed += 1;
                    }
                }
            }
            destroyed
        })
    };
    thread::sleep(Duration::from_millis(1));
    target.free();
    painter.join().unwrap();

    assert_eq!(lib.probe().stats().invalid_releases, 0);
    sprite.free();
}

#[test]
fn test_mode_change_waits_for_display_pixel_writer() {
    let (_lib, ctx) = context();
    ctx.init(init_flags::VIDEO);
    let screen = ctx.set_video_mode(64, 64, 32, 0).unwrap();
    let raw = screen.as_ptr() as usize;

    let (held_tx, held_rx) = mpsc::channel();
    let writer = {
        let screen = screen.clone();
        thread::spawn(move || {
            screen
                .with_pixels_mut(|p| {
                    held_tx.send(()).unwrap();
                    thread::sleep(Duration::from_millis(200));
                    p.fill(0x5A);
                    (p.as_mut_ptr() as usize, library_pixels(raw).0)
                })
                .unwrap()
        })
    };
    held_rx.recv().unwrap();
    let again = ctx.set_video_mode(128, 96, 32, 0).unwrap();
    let (held, live) = writer.join().unwrap();

    assert_eq!(held, live, "pixels were replaced while still borrowed");
    assert_eq!(again, screen);
    assert_eq!((screen.width().unwrap(), screen.height().unwrap()), (128, 96));
    assert_eq!(screen.pixels_ptr().unwrap() as usize, library_pixels(raw).0);
    ctx.quit();
}

#[test]
fn test_resize_poll_is_atomic_for_display_readers() {
    let (lib, ctx) = context();
    ctx.init(init_flags::VIDEO);
    let screen = ctx
        .set_video_mode(64, 64, 32, surface_flags::RESIZABLE)
        .unwrap();
    let raw = screen.as_ptr() as usize;

    let (held_tx, held_rx) = mpsc::channel();
    let reader = {
        let screen = screen.clone();
        thread::spawn(move || {
            screen
                .with_pixels(|p| {
                    held_tx.send(()).unwrap();
                    thread::sleep(Duration::from_millis(200));
                    // The borrow still matches what the library holds.
                    let (live, live_len) = library_pixels(raw);
                    (p.as_ptr() as usize, p.len(), live, live_len)
                })
                .unwrap()
        })
    };
    held_rx.recv().unwrap();
    lib.push_event(RawEvent::resize(128, 128));
    let event = ctx.poll_event().expect("resize event");
    let (held, held_len, live, live_len) = reader.join().unwrap();

    assert_eq!((held, held_len), (live, live_len));
    assert_eq!(event.resize(), Some((128, 128)));
    let info = screen.info().unwrap();
    assert_eq!((info.w, info.h), (128, 128));
    assert_eq!(screen.pixels_ptr().unwrap() as usize, library_pixels(raw).0);
    ctx.quit();
}
