//! Coverage aggregation and reporting.
//!
//! Scans an object directory for `.gcda`/`.gcno` pairs, drives the
//! external gcov tool, parses and merges the per-line reports, and
//! optionally uploads the aggregate to a coverage service.

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{Context, Result};
use walkdir::WalkDir;

use crate::core::platform::Platform;
use crate::util::process::ProcessBuilder;

pub mod codecov;
pub mod coveralls;
pub mod gcov;
pub mod report;

pub use gcov::parse_gcov;
pub use report::{merge_reports, LineReport};

/// Per-source-file line reports, keyed by file name.
///
/// A BTreeMap keeps report output and payloads deterministic.
pub type SourceCoverage = BTreeMap<String, LineReport>;

/// Collect coverage for every instrumented object in `objectdir`.
///
/// Only objects with both a `.gcda` and a `.gcno` are processed. The
/// external tool drops `.gcov` reports into the working directory; each
/// is parsed, merged into its source file's report, and removed.
pub fn collect(objectdir: &Path, sourcedir: &Path, host: Platform) -> Result<SourceCoverage> {
    let mut sourcefiles = list_sources(sourcedir)?;

    for stem in instrumented_objects(objectdir)? {
        run_gcov(objectdir, sourcedir, &stem, host)?;

        for entry in std::fs::read_dir(".").context("failed to list working directory")? {
            let entry = entry?;
            let name = entry.file_name().to_string_lossy().into_owned();
            if !name.ends_with(".gcov") {
                continue;
            }
            let sourcefile = name.trim_end_matches(".gcov").to_string();
            if let Some(base) = sourcefiles.get_mut(&sourcefile) {
                let content = std::fs::read_to_string(entry.path())
                    .with_context(|| format!("failed to read {}", name))?;
                let results = parse_gcov(&content);
                merge_reports(base, &results);
            }
            std::fs::remove_file(entry.path())
                .with_context(|| format!("failed to remove {}", name))?;
        }
    }

    Ok(sourcefiles)
}

/// Merge a previously saved JSON report (`source_files[].coverage`).
pub fn merge_saved_report(sourcefiles: &mut SourceCoverage, path: &Path) -> Result<()> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read report: {}", path.display()))?;
    let saved: SavedReport = serde_json::from_str(&content)
        .with_context(|| format!("failed to parse report: {}", path.display()))?;

    for source in saved.source_files {
        let filename = Path::new(&source.name)
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or(source.name);
        let base = sourcefiles.entry(filename).or_default();
        merge_reports(base, &source.coverage);
    }
    Ok(())
}

#[derive(Debug, serde::Deserialize)]
struct SavedReport {
    source_files: Vec<SavedSource>,
}

#[derive(Debug, serde::Deserialize)]
struct SavedSource {
    name: String,
    #[serde(default)]
    coverage: LineReport,
}

/// Instrumentable source files (`.c`/`.m`) in a directory, with empty
/// starting reports.
fn list_sources(sourcedir: &Path) -> Result<SourceCoverage> {
    let mut sourcefiles = SourceCoverage::new();
    let entries = std::fs::read_dir(sourcedir)
        .with_context(|| format!("failed to list sources: {}", sourcedir.display()))?;
    for entry in entries {
        let entry = entry?;
        let name = entry.file_name().to_string_lossy().into_owned();
        if name.ends_with(".c") || name.ends_with(".m") {
            sourcefiles.insert(name, LineReport::new());
        }
    }
    Ok(sourcefiles)
}

/// Object stems that have both counter (`.gcda`) and graph (`.gcno`)
/// files.
fn instrumented_objects(objectdir: &Path) -> Result<Vec<String>> {
    let mut pairs: BTreeMap<String, (bool, bool)> = BTreeMap::new();
    for entry in WalkDir::new(objectdir).max_depth(1) {
        let entry = entry.with_context(|| {
            format!("failed to list object directory: {}", objectdir.display())
        })?;
        let name = entry.file_name().to_string_lossy().into_owned();
        if let Some(stem) = name.strip_suffix(".gcda") {
            pairs.entry(stem.to_string()).or_default().0 = true;
        } else if let Some(stem) = name.strip_suffix(".gcno") {
            pairs.entry(stem.to_string()).or_default().1 = true;
        }
    }
    Ok(pairs
        .into_iter()
        .filter(|(_, (gcda, gcno))| *gcda && *gcno)
        .map(|(stem, _)| stem)
        .collect())
}

/// Run the coverage tool for one object stem.
fn run_gcov(objectdir: &Path, sourcedir: &Path, stem: &str, host: Platform) -> Result<()> {
    if host.is_macosx() {
        ProcessBuilder::new("gcov")
            .arg(format!(
                "-gcda={}",
                objectdir.join(format!("{}.gcda", stem)).display()
            ))
            .arg(format!(
                "-gcno={}",
                objectdir.join(format!("{}.gcno", stem)).display()
            ))
            .arg("source")
            .exec_and_check()?;
    } else {
        // Strip the compiler's `-<hash>` suffix to recover the source name
        let sourcefile = match stem.rsplit_once('-') {
            Some((base, _)) => base,
            None => stem,
        };
        ProcessBuilder::new("llvm-cov")
            .arg("gcov")
            .arg("-o")
            .arg(objectdir.join(format!("{}.o", stem)))
            .arg(sourcedir.join(format!("{}.c", sourcefile)))
            .exec_and_check()?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_instrumented_objects_require_both_files() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::write(tmp.path().join("array.gcda"), b"").unwrap();
        std::fs::write(tmp.path().join("array.gcno"), b"").unwrap();
        std::fs::write(tmp.path().join("fs.gcda"), b"").unwrap();
        std::fs::write(tmp.path().join("md5.gcno"), b"").unwrap();

        let stems = instrumented_objects(tmp.path()).unwrap();
        assert_eq!(stems, vec!["array".to_string()]);
    }

    #[test]
    fn test_list_sources_filters_extensions() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::write(tmp.path().join("array.c"), b"").unwrap();
        std::fs::write(tmp.path().join("fs.m"), b"").unwrap();
        std::fs::write(tmp.path().join("array.h"), b"").unwrap();

        let sources = list_sources(tmp.path()).unwrap();
        assert!(sources.contains_key("array.c"));
        assert!(sources.contains_key("fs.m"));
        assert!(!sources.contains_key("array.h"));
    }

    #[test]
    fn test_merge_saved_report() {
        let tmp = tempfile::tempdir().unwrap();
        let report = tmp.path().join("saved.json");
        std::fs::write(
            &report,
            r#"{"source_files":[{"name":"src/array.c","coverage":[null,3,0]}]}"#,
        )
        .unwrap();

        let mut sourcefiles = SourceCoverage::new();
        merge_saved_report(&mut sourcefiles, &report).unwrap();
        assert_eq!(
            sourcefiles.get("array.c").unwrap(),
            &vec![None, Some(3), Some(0)]
        );
    }
}
