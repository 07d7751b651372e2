//! Tizen SDK environment resolution.
//!
//! The Tizen toolchain is a set of GCC cross-compilers shipped inside the
//! SDK, one per architecture, each paired with a rootstrap sysroot. The
//! final `.tpk` package is assembled by the SDK's `tizen` CLI tool.

use std::path::PathBuf;

use anyhow::{bail, Result};

use crate::core::arch::Arch;
use crate::util::prefs::TizenPrefs;

const TOOLCHAIN_VERSION: &str = "4.9";
const ROOTSTRAP_VERSION: &str = "2.4";

/// Resolved Tizen build environment.
#[derive(Debug, Clone)]
pub struct TizenEnv {
    pub sdkpath: PathBuf,
    /// Signing profile name passed to `tizen package`
    pub profile: String,
}

impl TizenEnv {
    /// Resolve the Tizen environment from preferences.
    pub fn resolve(prefs: &TizenPrefs) -> Result<TizenEnv> {
        let sdkpath = match &prefs.sdkpath {
            Some(path) => PathBuf::from(path),
            None => bail!("Tizen SDK path not set (TIZEN_SDKPATH or build.json tizen.sdkpath)"),
        };
        Ok(TizenEnv {
            sdkpath,
            profile: prefs.profile.clone().unwrap_or_default(),
        })
    }

    /// Cross-compiler triplet prefix for an architecture.
    fn toolchainprefix(arch: Arch) -> &'static str {
        match arch {
            Arch::X86 => "i386-linux-gnueabi",
            _ => "arm-linux-gnueabi",
        }
    }

    /// Rootstrap (sysroot) device name for an architecture.
    fn rootstrapname(arch: Arch) -> &'static str {
        match arch {
            Arch::X86 => "mobile-2.4-emulator.core",
            _ => "mobile-2.4-device.core",
        }
    }

    /// The `$toolchain` prefix prepended to compiler invocations.
    pub fn toolchain_path(&self, arch: Arch) -> String {
        let prefix = Self::toolchainprefix(arch);
        format!(
            "{}/tools/{}-gcc-{}/bin/{}-",
            self.sdkpath.display(),
            prefix,
            TOOLCHAIN_VERSION,
            prefix
        )
    }

    /// Per-architecture rootstrap sysroot.
    pub fn sysroot_path(&self, arch: Arch) -> String {
        format!(
            "{}/platforms/tizen-{}/mobile/rootstraps/{}",
            self.sdkpath.display(),
            ROOTSTRAP_VERSION,
            Self::rootstrapname(arch)
        )
    }

    /// Path to the `tizen` CLI used for package assembly.
    pub fn tizen_tool(&self) -> String {
        format!("{}/tools/ide/bin/tizen", self.sdkpath.display())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env() -> TizenEnv {
        TizenEnv::resolve(&TizenPrefs {
            sdkpath: Some("/opt/tizen".to_string()),
            profile: Some("release".to_string()),
        })
        .unwrap()
    }

    #[test]
    fn test_missing_sdk_is_fatal() {
        assert!(TizenEnv::resolve(&TizenPrefs::default()).is_err());
    }

    #[test]
    fn test_per_arch_cross_prefixes() {
        let env = env();
        assert!(env
            .toolchain_path(Arch::X86)
            .ends_with("i386-linux-gnueabi-gcc-4.9/bin/i386-linux-gnueabi-"));
        assert!(env
            .toolchain_path(Arch::Arm7)
            .ends_with("arm-linux-gnueabi-gcc-4.9/bin/arm-linux-gnueabi-"));
    }

    #[test]
    fn test_rootstraps() {
        let env = env();
        assert!(env.sysroot_path(Arch::X86).contains("emulator"));
        assert!(env.sysroot_path(Arch::Arm7).contains("device"));
    }
}
