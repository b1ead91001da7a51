use crate::config::{parse_bpp, parse_count, parse_resolution, DemoOptions};
use crate::logging::LogLevel;
use anyhow::{Context, Result};
use clap::Parser;

/// Drives the thread-safe SDL handles from several threads at once
#[derive(Parser, Debug)]
#[command(name = "synced-sdl-demo")]
#[command(version)]
#[command(about = "Concurrent blit demo on the software SDL library", long_about = None)]
pub struct Cli {
    /// Screen resolution (e.g., 640x480)
    #[arg(short, long, value_name = "WIDTHxHEIGHT")]
    pub res: Option<String>,

    /// Color depth in bits per pixel (0 for the display default)
    #[arg(short, long, value_name = "BPP")]
    pub bpp: Option<String>,

    /// Request a fullscreen display
    #[arg(short, long)]
    pub fullscreen: bool,

    /// Number of drawing threads
    #[arg(short, long, value_name = "N")]
    pub threads: Option<String>,

    /// Frames drawn by each thread
    #[arg(long, value_name = "N")]
    pub frames: Option<String>,

    /// Log level (nothing, user, error, warning, info, debug, all or 0-6)
    #[arg(short, long, value_name = "LEVEL")]
    pub log_level: Option<String>,
}

impl Cli {
    /// Merge CLI arguments into the options struct
    pub fn merge_into_options(&self, mut opts: DemoOptions) -> Result<DemoOptions> {
        if let Some(ref res) = self.res {
            opts.resolution = parse_resolution(res).context("Invalid resolution format")?;
        }

        if let Some(ref bpp) = self.bpp {
            opts.bpp = parse_bpp(bpp)?;
        }

        if self.fullscreen {
            opts.fullscreen = true;
        }

        if let Some(ref threads) = self.threads {
            opts.threads = parse_count(threads, "threads")?;
        }

        if let Some(ref frames) = self.frames {
            opts.frames = parse_count(frames, "frames")?;
        }

        if let Some(ref level) = self.log_level {
            opts.log_level = LogLevel::parse(level)
                .with_context(|| format!("Unknown log level: {}", level))?;
        }

        Ok(opts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Resolution;

    #[test]
    fn test_cli_defaults() {
        let cli = Cli::parse_from(["synced-sdl-demo"]);
        let opts = cli.merge_into_options(DemoOptions::default()).unwrap();
        assert_eq!(opts, DemoOptions::default());
    }

    #[test]
    fn test_cli_overrides() {
        let cli = Cli::parse_from([
            "synced-sdl-demo",
            "--res",
            "800x600",
            "--bpp",
            "16",
            "--fullscreen",
            "--threads",
            "8",
            "--frames",
            "3",
            "--log-level",
            "debug",
        ]);
        let opts = cli.merge_into_options(DemoOptions::default()).unwrap();
        assert_eq!(
            opts.resolution,
            Resolution {
                width: 800,
                height: 600
            }
        );
        assert_eq!(opts.bpp, 16);
        assert!(opts.fullscreen);
        assert_eq!(opts.threads, 8);
        assert_eq!(opts.frames, 3);
        assert_eq!(opts.log_level, LogLevel::Debug);
    }

    #[test]
    fn test_cli_rejects_bad_values() {
        let bad_res = Cli::parse_from(["synced-sdl-demo", "--res", "big"]);
        assert!(bad_res.merge_into_options(DemoOptions::default()).is_err());

        let bad_level = Cli::parse_from(["synced-sdl-demo", "--log-level", "loud"]);
        assert!(bad_level.merge_into_options(DemoOptions::default()).is_err());

        let no_threads = Cli::parse_from(["synced-sdl-demo", "--threads", "0"]);
        assert!(no_threads.merge_into_options(DemoOptions::default()).is_err());
    }
}
