//! Apple bundle post-processing.

pub mod plist;

pub use plist::{transform, PlistOptions, PlistOutput};
