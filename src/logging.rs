//! Log levels and the `env_logger` setup for binaries.
//!
//! The library itself only emits `log` records. Binaries install a
//! logger from [`builder`] to see them.

use log::LevelFilter;

/// Log levels, from quietest to loudest.
#[repr(i32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Nothing = 0,
    User = 1,
    Error = 2,
    Warning = 3,
    Info = 4,
    Debug = 5,
    All = 6,
}

impl LogLevel {
    /// Create a LogLevel from an integer
    pub fn from_i32(level: i32) -> Self {
        match level {
            0 => LogLevel::Nothing,
            1 => LogLevel::User,
            2 => LogLevel::Error,
            3 => LogLevel::Warning,
            4 => LogLevel::Info,
            5 => LogLevel::Debug,
            6 => LogLevel::All,
            _ => LogLevel::Info,
        }
    }

    pub fn as_i32(&self) -> i32 {
        *self as i32
    }

    /// Parse a level name ("warning") or number ("3").
    pub fn parse(s: &str) -> Option<Self> {
        if let Ok(n) = s.parse::<i32>() {
            return (0..=6).contains(&n).then(|| Self::from_i32(n));
        }
        let level = match s.to_ascii_lowercase().as_str() {
            "nothing" | "off" => LogLevel::Nothing,
            "user" => LogLevel::User,
            "error" => LogLevel::Error,
            "warning" | "warn" => LogLevel::Warning,
            "info" => LogLevel::Info,
            "debug" => LogLevel::Debug,
            "all" | "trace" => LogLevel::All,
            _ => return None,
        };
        Some(level)
    }

    pub fn to_level_filter(self) -> LevelFilter {
        match self {
            LogLevel::Nothing => LevelFilter::Off,
            LogLevel::User | LogLevel::Error => LevelFilter::Error,
            LogLevel::Warning => LevelFilter::Warn,
            LogLevel::Info => LevelFilter::Info,
            LogLevel::Debug => LevelFilter::Debug,
            LogLevel::All => LevelFilter::Trace,
        }
    }
}

/// Logger builder for binaries: stderr output at `level`.
pub fn builder(level: LogLevel) -> env_logger::Builder {
    let mut builder = env_logger::Builder::new();
    builder.filter_level(level.to_level_filter());
    builder
}
