//! High-level operations.
//!
//! This module contains the implementation of Slipway commands.

pub mod coverage;
pub mod generate;
pub mod plist;
pub mod version;

pub use coverage::{run_coverage, CoverageOptions, Service};
pub use generate::{generate, GenerateOptions};
pub use plist::{process_plist, PlistJob};
pub use version::generate_version;
