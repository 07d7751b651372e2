//! Version-source stamping from source control.
//!
//! `git describe` output (`1.2.3-45-gdeadbee`) becomes a generated
//! `version.c`; the file is only rewritten when its content changes so
//! the downstream build never rebuilds spuriously.

use std::path::Path;

use anyhow::{Context, Result};
use semver::Version;

use crate::util::process::ProcessBuilder;

/// Generate (or refresh) `<output>/version.c` for a project.
pub fn generate_version(project: &str, output: &Path) -> Result<()> {
    let describe = ProcessBuilder::new("git")
        .arg("describe")
        .arg("--tags")
        .exec_stdout()
        .context("git describe failed; version stamping needs an annotated tag")?;

    let generated = render_version_source(project, &describe)?;
    let path = output.join("version.c");
    let previous = std::fs::read_to_string(&path).unwrap_or_default();

    if generated != previous {
        std::fs::write(&path, generated)
            .with_context(|| format!("failed to write {}", path.display()))?;
        tracing::info!("stamped {}", path.display());
    } else {
        tracing::debug!("{} is up to date", path.display());
    }
    Ok(())
}

/// Render the version source for a `git describe` string.
pub fn render_version_source(project: &str, describe: &str) -> Result<String> {
    let mut tokens = describe.trim().split('-');
    let tag = tokens.next().unwrap_or_default();
    let version = Version::parse(tag.trim_start_matches('v'))
        .with_context(|| format!("unparseable version tag `{}`", tag))?;

    // Directly on a tag, describe omits the revision and hash
    let revision = tokens.next().unwrap_or("0");
    let hash = tokens
        .next()
        .map(|token| token.trim_start_matches('g'))
        .unwrap_or("0");

    Ok(format!(
        "/* version.c  -  {project} library  -  generated by slipway, do not edit */\n\
         \n\
         #include <{project}/platform.h>\n\
         #include <{project}/types.h>\n\
         \n\
         version_t\n\
         {project}_version(void) {{\n\
         \treturn version_make({major}, {minor}, {patch}, {revision}, 0x{hash});\n\
         }}\n",
        project = project,
        major = version.major,
        minor = version.minor,
        patch = version.patch,
        revision = revision,
        hash = hash
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_with_revision_and_hash() {
        let source = render_version_source("foundation", "1.4.1-102-gdeadbee").unwrap();
        assert!(source.contains("version_make(1, 4, 1, 102, 0xdeadbee)"));
        assert!(source.contains("foundation_version(void)"));
        assert!(source.contains("#include <foundation/platform.h>"));
    }

    #[test]
    fn test_render_exactly_on_tag() {
        let source = render_version_source("foundation", "v2.0.0").unwrap();
        assert!(source.contains("version_make(2, 0, 0, 0, 0x0)"));
    }

    #[test]
    fn test_bad_tag_is_fatal() {
        assert!(render_version_source("foundation", "nightly").is_err());
    }

    #[test]
    fn test_stamp_is_idempotent() {
        let tmp = tempfile::tempdir().unwrap();
        let source = render_version_source("foundation", "1.0.0-1-gabc1234").unwrap();
        let path = tmp.path().join("version.c");
        std::fs::write(&path, &source).unwrap();

        // unchanged content leaves the mtime alone (write is skipped)
        let before = std::fs::metadata(&path).unwrap().modified().unwrap();
        let rendered = render_version_source("foundation", "1.0.0-1-gabc1234").unwrap();
        assert_eq!(rendered, std::fs::read_to_string(&path).unwrap());
        let after = std::fs::metadata(&path).unwrap().modified().unwrap();
        assert_eq!(before, after);
    }
}
