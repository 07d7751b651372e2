//! Implementation of `slipway generate`.

use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::core::arch::Arch;
use crate::core::buildconfig::BuildConfig;
use crate::core::manifest::{Manifest, MANIFEST_NAME};
use crate::core::platform::Platform;
use crate::generator::Generator;
use crate::toolchain::{Overrides, Toolchain, ToolchainKind, ToolchainRequest};
use crate::util::prefs::{Prefs, PREFS_NAME};

/// Options for a generation run.
#[derive(Debug, Clone, Default)]
pub struct GenerateOptions {
    /// Target platform; None selects the running host
    pub target: Option<Platform>,
    /// Host platform; None follows the target
    pub host: Option<Platform>,
    /// Explicit toolchain; None selects the host/target default
    pub toolchain: Option<ToolchainKind>,
    /// Build configurations; empty defaults to release
    pub configs: Vec<BuildConfig>,
    /// Target architectures; empty selects the target default set
    pub archs: Vec<Arch>,
    /// Manifest path; None looks for `Slipway.toml` in the current dir
    pub manifest: Option<PathBuf>,
    /// Output build file
    pub output: PathBuf,
    /// Tool/flag overrides (CLI over environment, via clap env handling)
    pub overrides: Overrides,
    /// The raw arguments, recorded in the generated file
    pub configure_args: Vec<String>,
}

/// Resolve the toolchain and emit the build file for a manifest.
pub fn generate(opts: &GenerateOptions) -> Result<()> {
    let manifest_path = opts
        .manifest
        .clone()
        .unwrap_or_else(|| PathBuf::from(MANIFEST_NAME));
    let manifest = Manifest::load(&manifest_path)?;

    let target = opts.target.unwrap_or_else(Platform::host);
    let host = opts.host.unwrap_or(target);

    let mut prefs = Prefs::load_or_default(Path::new(PREFS_NAME));
    prefs.apply_env();

    tracing::debug!(
        "resolving toolchain: host={} target={} toolchain={:?}",
        host,
        target,
        opts.toolchain
    );

    let toolchain = Toolchain::resolve(
        host,
        target,
        ToolchainRequest {
            project: manifest.project.name.clone(),
            kind: opts.toolchain,
            archs: opts.archs.clone(),
            configs: opts.configs.clone(),
            dependlibs: manifest.project.dependlibs.clone(),
            includepaths: manifest.project.includepaths.clone(),
            prefs,
            overrides: opts.overrides.clone(),
            xcode: None,
        },
    )?;

    tracing::info!(
        "generating {} for {} ({}, {} configs, {} archs)",
        opts.output.display(),
        target,
        toolchain.kind(),
        toolchain.configs().len(),
        toolchain.archs().len()
    );

    let file = File::create(&opts.output)
        .with_context(|| format!("failed to create {}", opts.output.display()))?;
    let mut generator = Generator::new(toolchain, BufWriter::new(file));
    generator.write_header(&opts.configure_args)?;
    generator.emit_manifest(&manifest)?;

    use std::io::Write;
    generator
        .into_inner()
        .flush()
        .with_context(|| format!("failed to write {}", opts.output.display()))?;

    Ok(())
}
