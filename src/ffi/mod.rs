//! FFI layer: C layout records and the foreign library trait.
//!
//! Users should prefer the safe handles in [`crate::video`],
//! [`crate::joystick`] and [`crate::Context`].

pub mod native;
#[cfg(feature = "sdl12")]
pub mod sdl12;
pub mod types;

pub use native::NativeLibrary;
#[cfg(feature = "sdl12")]
pub use sdl12::Sdl12Library;
pub use types::*;
