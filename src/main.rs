use anyhow::{Context as _, Result};
use clap::Parser;
use std::sync::Arc;
use std::thread;

use synced_sdl::config::DemoOptions;
use synced_sdl::{
    init_flags, logging, surface_flags, ChannelMasks, Cli, Context, Rect, SoftwareLibrary,
};

const TILE: u16 = 32;

fn main() -> Result<()> {
    let cli = Cli::parse();
    let options = cli.merge_into_options(DemoOptions::default())?;
    logging::builder(options.log_level).init();
    log::info!("{} starting", Context::binding_version());

    let library = Arc::new(SoftwareLibrary::new());
    let ctx = Context::new(library.clone());
    if ctx.init(init_flags::VIDEO | init_flags::TIMER) != 0 {
        anyhow::bail!("init failed: {}", ctx.get_error());
    }

    let result = run(&ctx, &options);
    let stats = library.probe().stats();
    let ticks = ctx.ticks();
    ctx.quit();
    result?;

    println!("blits:                {}", stats.blits);
    println!("display blits:        {}", stats.display_blits);
    println!("max concurrent blits: {}", stats.max_concurrent_blits);
    println!("global calls:         {}", stats.global_calls);
    println!("global overlaps:      {}", stats.global_overlaps);
    println!("ticks:                {}", ticks);
    Ok(())
}

fn run(ctx: &Context, options: &DemoOptions) -> Result<()> {
    let mut flags = surface_flags::SWSURFACE | surface_flags::RESIZABLE;
    if options.fullscreen {
        flags |= surface_flags::FULLSCREEN;
    }
    let (width, height) = (options.resolution.width as i32, options.resolution.height as i32);
    let screen = ctx
        .set_video_mode(width, height, options.bpp, flags)
        .with_context(|| format!("set_video_mode failed: {}", ctx.get_error()))?;
    ctx.wm_set_caption("synced-sdl demo", "synced-sdl")?;

    let workers: Vec<_> = (0..options.threads)
        .map(|worker| {
            let ctx = ctx.clone();
            let screen = screen.clone();
            let frames = options.frames;
            thread::spawn(move || draw(&ctx, &screen, worker, frames))
        })
        .collect();

    for worker in workers {
        worker
            .join()
            .map_err(|_| anyhow::anyhow!("drawing thread panicked"))??;
    }

    while let Some(event) = ctx.poll_event() {
        log::debug!("event {}", event.kind());
        if event.is_quit() {
            break;
        }
    }
    screen.flip()?;
    Ok(())
}

/// Paint a private tile every frame, scratch-copy it, then composite it
/// onto the display.
fn draw(ctx: &Context, screen: &synced_sdl::Surface, worker: usize, frames: usize) -> Result<()> {
    let size = i32::from(TILE);
    let tile = ctx
        .create_rgb_surface(0, size, size, 32, ChannelMasks::default())
        .context("tile allocation failed")?;
    let scratch = ctx
        .create_rgb_surface(0, size, size, 32, ChannelMasks::default())
        .context("scratch allocation failed")?;

    let info = screen.info()?;
    let columns = (info.w / size).max(1) as usize;
    let x = ((worker % columns) as i32 * size) as i16;
    let y = ((worker / columns) as i32 * size) as i16;

    for frame in 0..frames {
        let shade = ((frame * 255) / frames.max(1)) as u8;
        let color = tile.map_rgb(shade, (worker * 40) as u8, 255 - shade)?;
        tile.fill_rect(None, color)?;
        scratch.blit(None, &tile, None)?;

        let mut target = Rect::new(x, y, TILE, TILE);
        screen.blit(Some(&mut target), &scratch, None)?;
        screen.update_rects(&[target])?;
    }

    tile.free();
    scratch.free();
    Ok(())
}
