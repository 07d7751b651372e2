//! Core data structures for Slipway.
//!
//! This module contains the foundational types used throughout Slipway:
//! - Platform and architecture enumerations
//! - Build configurations
//! - The project manifest (`Slipway.toml`)

pub mod arch;
pub mod buildconfig;
pub mod manifest;
pub mod platform;

pub use arch::Arch;
pub use buildconfig::BuildConfig;
pub use manifest::{AppTarget, BinTarget, LibTarget, Manifest, MANIFEST_NAME};
pub use platform::Platform;
