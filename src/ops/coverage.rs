//! Implementation of `slipway coverage`.

use std::path::{Path, PathBuf};
use std::str::FromStr;

use anyhow::{Context, Result};
use thiserror::Error;

use crate::core::platform::Platform;
use crate::coverage::{codecov, collect, coveralls, merge_saved_report};

/// Error returned for a service string outside the supported set.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown coverage service `{0}` (expected codecov or coveralls)")]
pub struct UnknownService(pub String);

/// Supported coverage services.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Service {
    Codecov,
    Coveralls,
}

impl FromStr for Service {
    type Err = UnknownService;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "codecov" => Ok(Service::Codecov),
            "coveralls" => Ok(Service::Coveralls),
            other => Err(UnknownService(other.to_string())),
        }
    }
}

/// Options for a coverage run.
#[derive(Debug, Clone)]
pub struct CoverageOptions {
    /// Directory holding instrumented objects and counters
    pub objectdir: PathBuf,
    /// Directory holding the matching sources
    pub sourcedir: PathBuf,
    /// Previously saved JSON reports to merge in
    pub merge: Vec<PathBuf>,
    /// Service to format the payload for
    pub service: Service,
    /// Upload instead of writing the report file
    pub post: bool,
    /// Report output path (defaults per service)
    pub report: Option<PathBuf>,
}

/// Aggregate coverage and either upload it or save the report.
pub fn run_coverage(opts: &CoverageOptions) -> Result<()> {
    let mut sourcefiles = collect(&opts.objectdir, &opts.sourcedir, Platform::host())?;

    for report in &opts.merge {
        merge_saved_report(&mut sourcefiles, report)?;
    }

    match opts.service {
        Service::Codecov => {
            let report = codecov::build_report(&opts.sourcedir, &sourcefiles);
            if opts.post {
                let prefs = codecov::CodecovPrefs::load(Path::new("codecov.json"))?;
                // upload errors come back as a data object, printed as-is
                let result = codecov::post_report(&prefs, &report);
                println!("{}", result);
            } else {
                let path = opts
                    .report
                    .clone()
                    .unwrap_or_else(|| PathBuf::from("codecovreport.json"));
                write_report(&path, &serde_json::to_string_pretty(&report)?)?;
            }
        }
        Service::Coveralls => {
            let prefs = coveralls::CoverallsPrefs::load(Path::new("coveralls.json"))?;
            let report = coveralls::build_report(&prefs, &opts.sourcedir, &sourcefiles)?;
            if opts.post {
                let result = coveralls::post_report(&report);
                println!("{}", result);
            } else {
                let path = opts
                    .report
                    .clone()
                    .unwrap_or_else(|| PathBuf::from("coverallsreport.json"));
                write_report(&path, &serde_json::to_string_pretty(&report)?)?;
            }
        }
    }

    Ok(())
}

fn write_report(path: &Path, contents: &str) -> Result<()> {
    std::fs::write(path, contents)
        .with_context(|| format!("failed to write report: {}", path.display()))?;
    tracing::info!("wrote {}", path.display());
    Ok(())
}
