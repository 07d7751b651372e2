//! Slipway - A Ninja build-description generator for cross-platform C projects
//!
//! This crate provides the core library functionality for Slipway,
//! including platform/toolchain resolution, build-graph emission, and
//! coverage aggregation.

pub mod apple;
pub mod core;
pub mod coverage;
pub mod generator;
pub mod ops;
pub mod toolchain;
pub mod util;

pub use crate::core::{arch::Arch, buildconfig::BuildConfig, manifest::Manifest, platform::Platform};

pub use generator::Generator;
pub use toolchain::{Toolchain, ToolchainKind};
pub use util::prefs::Prefs;
