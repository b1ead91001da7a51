//! Thread-safe handles over a stateful, non-reentrant SDL 1.2 style
//! graphics and input library.
//!
//! Every entry point can be called from any thread without caller-side
//! locking. Calls that touch library-global state are serialised by the
//! [`Context`]'s global lock; surface operations take only their own
//! handle's lock, so work on unrelated surfaces runs in parallel.

pub mod cli;
pub mod config;
pub mod context;
pub mod error;
pub mod events;
pub mod ffi;
pub mod joystick;
pub mod logging;
pub mod soft;
pub mod video;

pub use cli::Cli;
pub use config::{ContextConfig, DemoOptions};
pub use context::{Context, BINDING_VERSION};
pub use error::{Error, Result};
pub use events::Event;
pub use ffi::{event_kind, event_state, init_flags, surface_flags};
pub use joystick::{HatDirection, Joystick};
pub use logging::LogLevel;
pub use soft::SoftwareLibrary;
pub use video::{blit_surface, ChannelMasks, Color, ModeList, PixelFormat, Rect, Surface, SurfaceInfo, VideoInfo};
