//! codecov.io report payloads and upload.

use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::coverage::SourceCoverage;
use crate::util::process::ProcessBuilder;

/// Upload credentials read from `codecov.json`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CodecovPrefs {
    pub token: String,
    pub job: String,
}

impl CodecovPrefs {
    /// Load credentials, defaulting when the file is absent.
    pub fn load(path: &Path) -> Result<CodecovPrefs> {
        if !path.exists() {
            return Ok(CodecovPrefs::default());
        }
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        serde_json::from_str(&contents)
            .with_context(|| format!("failed to parse {}", path.display()))
    }
}

/// Build the codecov payload.
///
/// Codecov line arrays are 1-indexed, so every file's report gets a
/// leading `null`. Empty reports are dropped.
pub fn build_report(sourcedir: &Path, sourcefiles: &SourceCoverage) -> serde_json::Value {
    let mut coverage = serde_json::Map::new();
    for (sourcefile, report) in sourcefiles {
        if report.is_empty() {
            continue;
        }
        let mut lines = vec![serde_json::Value::Null];
        lines.extend(report.iter().map(|count| json!(count)));
        coverage.insert(
            sourcedir.join(sourcefile).display().to_string(),
            serde_json::Value::Array(lines),
        );
    }
    json!({ "coverage": coverage })
}

/// Upload a report to codecov.io.
///
/// A failed or undecodable response is returned as an error-shaped JSON
/// object, never as an `Err`; the caller prints it and moves on.
pub fn post_report(prefs: &CodecovPrefs, report: &serde_json::Value) -> serde_json::Value {
    let commit = git_output(&["rev-parse", "HEAD"]);
    let branch = git_output(&["rev-parse", "--abbrev-ref", "HEAD"]);
    let url = format!(
        "https://codecov.io/upload/v2?token={}&commit={}&branch={}&job={}",
        prefs.token, commit, branch, prefs.job
    );

    let client = reqwest::blocking::Client::new();
    let response = match client.post(url).json(report).send() {
        Ok(response) => response,
        Err(e) => return json!({ "error": format!("Failure to submit data. {}", e) }),
    };

    let status = response.status();
    match response.json::<serde_json::Value>() {
        Ok(value) => value,
        Err(_) => json!({
            "error": format!("Failure to submit data. Response [{}]", status.as_u16())
        }),
    }
}

fn git_output(args: &[&str]) -> String {
    ProcessBuilder::new("git")
        .args(args)
        .exec_stdout()
        .unwrap_or_default()
}
