//! coveralls.io report payloads and upload.

use std::path::Path;

use anyhow::{Context, Result};
use md5::{Digest, Md5};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::coverage::{LineReport, SourceCoverage};
use crate::util::process::ProcessBuilder;

/// Upload credentials read from `coveralls.json`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CoverallsPrefs {
    pub repo_token: String,
}

impl CoverallsPrefs {
    /// Load credentials, defaulting when the file is absent.
    pub fn load(path: &Path) -> Result<CoverallsPrefs> {
        if !path.exists() {
            return Ok(CoverallsPrefs::default());
        }
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        serde_json::from_str(&contents)
            .with_context(|| format!("failed to parse {}", path.display()))
    }
}

/// One `source_files` entry in the coveralls payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceFile {
    pub name: String,
    pub source_digest: String,
    pub coverage: LineReport,
}

/// Git metadata block required by the coveralls API.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GitInfo {
    pub branch: String,
    pub remotes: Vec<GitRemote>,
    pub head: GitHead,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GitRemote {
    pub name: String,
    pub url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GitHead {
    pub id: String,
    pub message: String,
    pub author_name: String,
    pub author_email: String,
    pub committer_name: String,
    pub committer_email: String,
}

/// The full coveralls payload.
#[derive(Debug, Clone, Serialize)]
pub struct CoverallsReport {
    pub repo_token: String,
    pub source_files: Vec<SourceFile>,
    pub git: GitInfo,
}

/// Build the coveralls payload: each source file with its md5 digest and
/// line report, plus repository metadata.
pub fn build_report(
    prefs: &CoverallsPrefs,
    sourcedir: &Path,
    sourcefiles: &SourceCoverage,
) -> Result<CoverallsReport> {
    let mut files = Vec::new();
    for (sourcefile, report) in sourcefiles {
        let path = sourcedir.join(sourcefile);
        let contents = std::fs::read(&path)
            .with_context(|| format!("failed to read source: {}", path.display()))?;
        files.push(SourceFile {
            name: path.display().to_string(),
            source_digest: hex::encode(Md5::digest(&contents)),
            coverage: report.clone(),
        });
    }

    Ok(CoverallsReport {
        repo_token: prefs.repo_token.clone(),
        source_files: files,
        git: git_info()?,
    })
}

/// Upload a report to coveralls.io.
///
/// A failed or undecodable response is returned as an error-shaped JSON
/// object, never as an `Err`; the caller prints it and moves on.
pub fn post_report(report: &CoverallsReport) -> serde_json::Value {
    let payload = match serde_json::to_string(report) {
        Ok(payload) => payload,
        Err(e) => return json!({ "error": format!("Failure to encode data. {}", e) }),
    };

    let form = reqwest::blocking::multipart::Form::new().text("json_file", payload);
    let client = reqwest::blocking::Client::new();
    let response = match client
        .post("https://coveralls.io/api/v1/jobs")
        .multipart(form)
        .send()
    {
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

/// Collect the repository metadata coveralls expects.
fn git_info() -> Result<GitInfo> {
    let remotes = git(&["remote", "-v"])?
        .lines()
        .filter(|line| line.contains("(fetch)"))
        .filter_map(|line| {
            let mut parts = line.split_whitespace();
            Some(GitRemote {
                name: parts.next()?.to_string(),
                url: parts.next()?.to_string(),
            })
        })
        .collect();

    Ok(GitInfo {
        branch: git(&["rev-parse", "--abbrev-ref", "HEAD"])?,
        remotes,
        head: GitHead {
            id: git_log("%H")?,
            message: git_log("%s")?,
            author_name: git_log("%aN")?,
            author_email: git_log("%ae")?,
            committer_name: git_log("%cN")?,
            committer_email: git_log("%ce")?,
        },
    })
}

fn git(args: &[&str]) -> Result<String> {
    ProcessBuilder::new("git").args(args).exec_stdout()
}

fn git_log(format: &str) -> Result<String> {
    git(&[
        "--no-pager",
        "log",
        "-1",
        &format!("--pretty=format:{}", format),
    ])
}
