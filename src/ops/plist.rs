//! Implementation of `slipway plist`.
//!
//! Invoked by the generated build file for Apple app bundles: expands the
//! plist template(s) into the bundle `Info.plist` and `PkgInfo`, then
//! converts the result to binary form with `plutil`.

use std::path::PathBuf;

use anyhow::{bail, Context, Result};

use crate::apple::plist::{merge_partials, transform, PlistOptions};
use crate::core::platform::Platform;
use crate::toolchain::xcode::{IPHONEOS_DEPLOYMENT_TARGET, MACOSX_DEPLOYMENT_TARGET};
use crate::util::process::ProcessBuilder;

/// One plist-processing job.
#[derive(Debug, Clone)]
pub struct PlistJob {
    /// Input plists: the template first, then partials from asset and
    /// interface compilation
    pub sources: Vec<PathBuf>,
    pub exename: String,
    pub prodname: String,
    pub bundleidentifier: Option<String>,
    pub target: Platform,
    pub deploymenttarget: Option<String>,
    /// Path of the final `Info.plist`; `PkgInfo` is written next to it
    pub output: PathBuf,
}

/// Expand, write and binary-convert a bundle plist.
pub fn process_plist(job: &PlistJob) -> Result<()> {
    let Some((template, partials)) = job.sources.split_first() else {
        bail!("no input plist given");
    };

    let source = std::fs::read_to_string(template)
        .with_context(|| format!("failed to read plist: {}", template.display()))?;

    let mut partial_sources = Vec::new();
    for partial in partials {
        partial_sources.push(
            std::fs::read_to_string(partial)
                .with_context(|| format!("failed to read plist: {}", partial.display()))?,
        );
    }
    let merged = merge_partials(&source, &partial_sources);

    let deploymenttarget = job.deploymenttarget.clone().unwrap_or_else(|| {
        if job.target.is_ios() {
            IPHONEOS_DEPLOYMENT_TARGET.to_string()
        } else {
            MACOSX_DEPLOYMENT_TARGET.to_string()
        }
    });

    let build_version = ProcessBuilder::new("sw_vers")
        .arg("-buildVersion")
        .exec_stdout()
        .context("failed to probe build version via sw_vers")?;

    let output = transform(
        &merged,
        &PlistOptions {
            exename: job.exename.clone(),
            prodname: job.prodname.clone(),
            bundleidentifier: job.bundleidentifier.clone(),
            target: job.target,
            deploymenttarget,
        },
        &build_version,
    );

    if let Some(parent) = job.output.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    std::fs::write(&job.output, &output.plist)
        .with_context(|| format!("failed to write {}", job.output.display()))?;

    let pkginfo = job.output.with_file_name("PkgInfo");
    std::fs::write(&pkginfo, &output.pkginfo)
        .with_context(|| format!("failed to write {}", pkginfo.display()))?;

    ProcessBuilder::new("plutil")
        .args(["-convert", "binary1"])
        .arg(&job.output)
        .exec_and_check()
        .context("plutil conversion failed")?;

    Ok(())
}
