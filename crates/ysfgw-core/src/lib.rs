//! Core types and components for the DG-ID gateway
//!
//! This crate provides the FICH codec, frame layout constants and the small
//! timing utilities shared by the network drivers and the routing engine.

/// Git version string, set at compile time
pub const GIT_VERSION: &str = git_version::git_version!(fallback = "unknown");
/// Gateway version followed by git version string, e.g., "0.2.0-aabbccdd"
pub const GATEWAY_VERSION: &str = const_format::formatcp!("{}-{}", env!("CARGO_PKG_VERSION"), GIT_VERSION);

pub mod debug;
pub mod fec;
pub mod fich;
pub mod frame;
pub mod locator;
pub mod modes;
pub mod timer;

// Re-export commonly used items
pub use fich::{DataType, Fich, FrameIndicator};
pub use modes::ModeMask;
pub use timer::{StopWatch, Timer};
