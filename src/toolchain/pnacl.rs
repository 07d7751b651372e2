//! PNaCl SDK environment resolution.
//!
//! PNaCl output is architecture-neutral bitcode: compile and link use the
//! `pnacl-*` driver scripts, linked output is finalized with
//! `pnacl-finalize`, and a `.nmf` manifest is generated for the loader.

use std::path::PathBuf;

use anyhow::{bail, Result};

use crate::core::platform::Platform;
use crate::util::prefs::PnaclPrefs;

/// Resolved PNaCl build environment.
#[derive(Debug, Clone)]
pub struct PnaclEnv {
    pub sdkpath: PathBuf,
    /// `<sdk>/toolchain/<host>_pnacl/bin/` prefix for the pnacl-* drivers
    pub binprefix: String,
}

impl PnaclEnv {
    /// Resolve the PNaCl environment from preferences.
    pub fn resolve(prefs: &PnaclPrefs, host: Platform) -> Result<PnaclEnv> {
        let sdkpath = match &prefs.sdkpath {
            Some(path) => PathBuf::from(path),
            None => bail!("PNaCl SDK path not set (PNACL_SDKPATH or build.json pnacl.sdkpath)"),
        };

        let hostname = match host {
            Platform::Windows => "win",
            Platform::MacOsx => "mac",
            _ => "linux",
        };
        let binprefix = format!(
            "{}/toolchain/{}_pnacl/bin/",
            sdkpath.display(),
            hostname
        );

        Ok(PnaclEnv { sdkpath, binprefix })
    }

    pub fn cc(&self) -> String {
        format!("{}pnacl-clang", self.binprefix)
    }

    pub fn ar(&self) -> String {
        format!("{}pnacl-ar", self.binprefix)
    }

    pub fn finalize(&self) -> String {
        format!("{}pnacl-finalize", self.binprefix)
    }

    /// Manifest generator shipped in the SDK tools directory.
    pub fn nmf_tool(&self) -> String {
        format!("{}/tools/create_nmf.py", self.sdkpath.display())
    }
}
