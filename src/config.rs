use anyhow::{Context, Result};
use std::env;

/// Environment variable the library reads to pick its video driver.
pub const VIDEO_DRIVER_VAR: &str = "SDL_VIDEODRIVER";

/// Environment variable overriding [`ContextConfig::fallback_video_driver`].
/// An empty value disables the fallback.
pub const FALLBACK_DRIVER_VAR: &str = "SYNCED_SDL_FALLBACK_DRIVER";

/// Settings of a [`Context`](crate::Context).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContextConfig {
    /// Video driver to retry with when video initialisation fails and
    /// `SDL_VIDEODRIVER` is unset.
    pub fallback_video_driver: Option<String>,
}

impl Default for ContextConfig {
    fn default() -> Self {
        let fallback = if cfg!(target_os = "macos") {
            Some("x11".to_string())
        } else {
            None
        };
        Self {
            fallback_video_driver: fallback,
        }
    }
}

impl ContextConfig {
    /// Defaults, then environment overrides.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Some(driver) = env::var_os(FALLBACK_DRIVER_VAR) {
            let driver = driver.to_string_lossy().into_owned();
            config.fallback_video_driver = (!driver.is_empty()).then_some(driver);
        }
        config
    }
}

/// Options of the demo binary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DemoOptions {
    pub resolution: Resolution,
    pub bpp: i32,
    pub fullscreen: bool,
    pub threads: usize,
    pub frames: usize,
    pub log_level: crate::logging::LogLevel,
}

impl Default for DemoOptions {
    fn default() -> Self {
        Self {
            resolution: Resolution {
                width: 640,
                height: 480,
            },
            bpp: 32,
            fullscreen: false,
            threads: 4,
            frames: 60,
            log_level: crate::logging::LogLevel::Info,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Resolution {
    pub width: u32,
    pub height: u32,
}

/// Parse a resolution string in the format "WIDTHxHEIGHT"
pub fn parse_resolution(s: &str) -> Result<Resolution> {
    let parts: Vec<&str> = s.split('x').collect();
    if parts.len() != 2 {
        anyhow::bail!("Resolution must be in WIDTHxHEIGHT format");
    }

    let width: u32 = parts[0].parse().context("Invalid width value")?;
    let height: u32 = parts[1].parse().context("Invalid height value")?;

    if width == 0 || height == 0 {
        anyhow::bail!("Resolution values must be positive");
    }
    if width > i16::MAX as u32 || height > i16::MAX as u32 {
        anyhow::bail!("Resolution values must not exceed {}", i16::MAX);
    }

    Ok(Resolution { width, height })
}

/// Parse a color depth; 0 means "current display depth".
pub fn parse_bpp(s: &str) -> Result<i32> {
    let bpp: i32 = s.parse().context("Invalid color depth")?;
    match bpp {
        0 | 8 | 15 | 16 | 24 | 32 => Ok(bpp),
        _ => anyhow::bail!("Color depth must be one of 0, 8, 15, 16, 24, 32"),
    }
}

/// Parse a positive count (threads, frames)
pub fn parse_count(s: &str, what: &str) -> Result<usize> {
    let n: usize = s
        .parse()
        .with_context(|| format!("Invalid {} value", what))?;
    if n == 0 {
        anyhow::bail!("{} must be at least 1", what);
    }
    Ok(n)
}
