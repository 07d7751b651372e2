//! The `Slipway.toml` project manifest.
//!
//! A manifest declares the project name plus the library, tool, and
//! application targets to emit build edges for. It is the declarative
//! equivalent of a per-project configure script: each `[[lib]]`, `[[bin]]`
//! and `[[app]]` entry maps to one generator operation.

use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::core::buildconfig::BuildConfig;

/// Canonical manifest file name.
pub const MANIFEST_NAME: &str = "Slipway.toml";

/// A parsed project manifest.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Manifest {
    /// Project-wide settings
    pub project: Project,

    /// Static library targets
    #[serde(default, rename = "lib")]
    pub libs: Vec<LibTarget>,

    /// Tool/test executable targets
    #[serde(default, rename = "bin")]
    pub bins: Vec<BinTarget>,

    /// Application (bundle/package) targets
    #[serde(default, rename = "app")]
    pub apps: Vec<AppTarget>,
}

/// Project-wide settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Project {
    /// Project name; also the `<NAME>_COMPILE=1` define prefix
    pub name: String,

    /// Sibling foundation-style libraries to include and link against
    #[serde(default)]
    pub dependlibs: Vec<String>,

    /// Extra include paths applied to every target
    #[serde(default)]
    pub includepaths: Vec<String>,
}

/// A static library target.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LibTarget {
    /// Module name; determines source directory and archive name
    pub module: String,

    /// Source file names relative to `basepath/module`
    pub sources: Vec<String>,

    /// Directory prefix in front of the module directory
    #[serde(default)]
    pub basepath: Option<String>,

    /// Target-local include paths
    #[serde(default)]
    pub includepaths: Vec<String>,

    /// Restrict this target to a subset of the build configurations
    #[serde(default)]
    pub configs: Option<Vec<BuildConfig>>,
}

/// A tool or test executable target.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BinTarget {
    /// Module name; determines source directory
    pub module: String,

    /// Source file names relative to `basepath/module`
    pub sources: Vec<String>,

    /// Output binary name (defaults to the module name)
    #[serde(default)]
    pub binname: Option<String>,

    /// Directory prefix in front of the module directory
    #[serde(default)]
    pub basepath: Option<String>,

    /// Libraries to link against
    #[serde(default)]
    pub libs: Vec<String>,

    /// Names of previously declared lib targets this binary depends on
    #[serde(default, rename = "implicit-deps")]
    pub implicit_deps: Vec<String>,

    /// Target-local include paths
    #[serde(default)]
    pub includepaths: Vec<String>,

    /// Restrict this target to a subset of the build configurations
    #[serde(default)]
    pub configs: Option<Vec<BuildConfig>>,

    /// Resource files (plist/xcassets/xib, android res, tizen manifest)
    #[serde(default)]
    pub resources: Vec<String>,
}

/// An application target: a `bin` plus platform packaging (app bundle,
/// apk, tpk, nexe+nmf).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppTarget {
    /// Module name; determines source directory
    pub module: String,

    /// Source file names relative to `basepath/module`
    pub sources: Vec<String>,

    /// Output binary name (defaults to the module name)
    #[serde(default)]
    pub binname: Option<String>,

    /// Directory prefix in front of the module directory
    #[serde(default)]
    pub basepath: Option<String>,

    /// Libraries to link against
    #[serde(default)]
    pub libs: Vec<String>,

    /// Names of previously declared lib targets this app depends on
    #[serde(default, rename = "implicit-deps")]
    pub implicit_deps: Vec<String>,

    /// Target-local include paths
    #[serde(default)]
    pub includepaths: Vec<String>,

    /// Restrict this target to a subset of the build configurations
    #[serde(default)]
    pub configs: Option<Vec<BuildConfig>>,

    /// Resource files (plist/xcassets/xib, android res, tizen manifest)
    #[serde(default)]
    pub resources: Vec<String>,
}

impl Manifest {
    /// Load and parse a manifest file.
    pub fn load(path: &Path) -> Result<Manifest> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read manifest: {}", path.display()))?;

        let manifest: Manifest = toml::from_str(&contents)
            .with_context(|| format!("failed to parse manifest: {}", path.display()))?;

        manifest.validate()?;
        Ok(manifest)
    }

    /// Validate cross-target invariants the TOML schema cannot express.
    fn validate(&self) -> Result<()> {
        for lib in &self.libs {
            if lib.sources.is_empty() {
                anyhow::bail!("lib target `{}` has no sources", lib.module);
            }
        }
        for bin in &self.bins {
            if bin.sources.is_empty() {
                anyhow::bail!("bin target `{}` has no sources", bin.module);
            }
        }
        for app in &self.apps {
            if app.sources.is_empty() {
                anyhow::bail!("app target `{}` has no sources", app.module);
            }
        }
        Ok(())
    }
}
