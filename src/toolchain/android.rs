//! Android NDK/SDK environment resolution.
//!
//! Locates the NDK cross-toolchains, per-architecture sysroots, and the
//! newest installed build-tools revision. Paths come from the preferences
//! file or environment (`ANDROID_NDKPATH`/`ANDROID_NDK`,
//! `ANDROID_SDKPATH`/`ANDROID_HOME`); a missing path aborts resolution.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};

use crate::core::arch::Arch;
use crate::core::platform::Platform;
use crate::toolchain::ToolchainKind;
use crate::util::prefs::AndroidPrefs;

/// Android platform API level targeted by compile and packaging edges.
pub const DEFAULT_PLATFORM_VERSION: &str = "21";

const TOOLCHAIN_VERSION_GCC: &str = "4.9";
const TOOLCHAIN_VERSION_CLANG: &str = "3.5";

/// Resolved Android build environment.
#[derive(Debug, Clone)]
pub struct AndroidEnv {
    pub ndkpath: PathBuf,
    pub sdkpath: PathBuf,
    pub platformversion: String,
    pub buildtools_path: PathBuf,
    pub android_jar: PathBuf,
    pub hostarchname: &'static str,
    pub keystore: Option<String>,
    pub keyalias: Option<String>,
    pub keystorepass: Option<String>,
    pub keypass: Option<String>,
}

impl AndroidEnv {
    /// Resolve the Android environment from preferences.
    pub fn resolve(prefs: &AndroidPrefs, host: Platform) -> Result<AndroidEnv> {
        let ndkpath = match &prefs.ndkpath {
            Some(path) => PathBuf::from(path),
            None => bail!("Android NDK path not set (ANDROID_NDKPATH or build.json android.ndkpath)"),
        };
        let sdkpath = match &prefs.sdkpath {
            Some(path) => PathBuf::from(path),
            None => bail!("Android SDK path not set (ANDROID_SDKPATH or build.json android.sdkpath)"),
        };

        let platformversion = prefs
            .platformversion
            .clone()
            .unwrap_or_else(|| DEFAULT_PLATFORM_VERSION.to_string());

        let buildtools_path = newest_buildtools(&sdkpath)?;
        let android_jar = sdkpath
            .join("platforms")
            .join(format!("android-{}", platformversion))
            .join("android.jar");

        let hostarchname = match host {
            Platform::MacOsx => "darwin-x86_64",
            Platform::Windows => "windows-x86_64",
            _ => "linux-x86_64",
        };

        Ok(AndroidEnv {
            ndkpath,
            sdkpath,
            platformversion,
            buildtools_path,
            android_jar,
            hostarchname,
            keystore: prefs.keystore.clone(),
            keyalias: prefs.keyalias.clone(),
            keystorepass: prefs.keystorepass.clone(),
            keypass: prefs.keypass.clone(),
        })
    }

    /// NDK architecture name (`arch-<name>` sysroot directories).
    pub fn archname(arch: Arch) -> &'static str {
        match arch {
            Arch::X86 => "x86",
            Arch::X86_64 => "x86_64",
            Arch::Arm6 | Arch::Arm7 => "arm",
            Arch::Arm64 => "arm64",
            Arch::Mips => "mips",
            Arch::Mips64 => "mips64",
            _ => "arm",
        }
    }

    /// APK `lib/<abi>` directory name for an architecture.
    pub fn archpath(arch: Arch) -> &'static str {
        match arch {
            Arch::X86 => "x86",
            Arch::X86_64 => "x86-64",
            Arch::Arm6 => "armeabi",
            Arch::Arm7 => "armeabi-v7a",
            Arch::Arm64 => "arm64-v8a",
            Arch::Mips => "mips",
            Arch::Mips64 => "mips64",
            _ => "armeabi",
        }
    }

    /// GCC toolchain directory name for an architecture.
    fn gcc_toolchainname(arch: Arch) -> String {
        let base = match arch {
            Arch::X86 => "x86",
            Arch::X86_64 => "x86_64",
            Arch::Arm6 | Arch::Arm7 => "arm-linux-androideabi",
            Arch::Arm64 => "aarch64-linux-android",
            Arch::Mips => "mipsel-linux-android",
            Arch::Mips64 => "mips64el-linux-android",
            _ => "arm-linux-androideabi",
        };
        format!("{}-{}", base, TOOLCHAIN_VERSION_GCC)
    }

    /// Binutils triplet prefix for an architecture.
    fn toolchainprefix(arch: Arch) -> &'static str {
        match arch {
            Arch::X86 => "i686-linux-android-",
            Arch::X86_64 => "x86_64-linux-android-",
            Arch::Arm6 | Arch::Arm7 => "arm-linux-androideabi-",
            Arch::Arm64 => "aarch64-linux-android-",
            Arch::Mips => "mipsel-linux-android-",
            Arch::Mips64 => "mips64el-linux-android-",
            _ => "arm-linux-androideabi-",
        }
    }

    /// Prebuilt GCC toolchain root for an architecture.
    pub fn gcc_toolchain_path(&self, arch: Arch) -> String {
        self.ndkpath
            .join("toolchains")
            .join(Self::gcc_toolchainname(arch))
            .join("prebuilt")
            .join(self.hostarchname)
            .display()
            .to_string()
    }

    /// Prebuilt clang toolchain root.
    pub fn clang_toolchain_path(&self) -> String {
        self.ndkpath
            .join("toolchains")
            .join(format!("llvm-{}", TOOLCHAIN_VERSION_CLANG))
            .join("prebuilt")
            .join(self.hostarchname)
            .display()
            .to_string()
    }

    /// The `$toolchain` prefix prepended to compiler invocations.
    pub fn toolchain_path(&self, kind: ToolchainKind, arch: Arch) -> String {
        if kind == ToolchainKind::Clang {
            format!("{}/bin/", self.clang_toolchain_path())
        } else {
            format!(
                "{}/bin/{}",
                self.gcc_toolchain_path(arch),
                Self::toolchainprefix(arch)
            )
        }
    }

    /// Per-architecture sysroot.
    pub fn sysroot_path(&self, arch: Arch) -> String {
        self.ndkpath
            .join("platforms")
            .join(format!("android-{}", self.platformversion))
            .join(format!("arch-{}", Self::archname(arch)))
            .display()
            .to_string()
    }

    /// Sysroot library directories, 64-bit split first.
    pub fn sysroot_libpaths(&self, arch: Arch) -> Vec<String> {
        let sysroot = self.sysroot_path(arch);
        let mut paths = Vec::new();
        if arch.is_64bit() {
            paths.push(format!("{}/usr/lib64", sysroot));
        }
        paths.push(format!("{}/usr/lib", sysroot));
        paths
    }
}

/// Pick the newest installed build-tools revision by numeric version sort.
fn newest_buildtools(sdkpath: &Path) -> Result<PathBuf> {
    let buildtools_dir = sdkpath.join("build-tools");
    let mut revisions: Vec<(Vec<u64>, PathBuf)> = Vec::new();

    let entries = std::fs::read_dir(&buildtools_dir).with_context(|| {
        format!(
            "failed to list Android build-tools: {}",
            buildtools_dir.display()
        )
    })?;
    for entry in entries {
        let entry = entry?;
        let name = entry.file_name().to_string_lossy().into_owned();
        let version: Vec<u64> = name.split('.').filter_map(|p| p.parse().ok()).collect();
        revisions.push((version, entry.path()));
    }

    revisions.sort();
    match revisions.pop() {
        Some((_, path)) => Ok(path),
        None => bail!(
            "no Android build-tools installed in {}",
            buildtools_dir.display()
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fake_env(tmp: &Path) -> AndroidEnv {
        std::fs::create_dir_all(tmp.join("sdk/build-tools/23.0.1")).unwrap();
        std::fs::create_dir_all(tmp.join("sdk/build-tools/9.0.0")).unwrap();
        let prefs = AndroidPrefs {
            ndkpath: Some(tmp.join("ndk").display().to_string()),
            sdkpath: Some(tmp.join("sdk").display().to_string()),
            ..AndroidPrefs::default()
        };
        AndroidEnv::resolve(&prefs, Platform::Linux).unwrap()
    }

    #[test]
    fn test_newest_buildtools_numeric_sort() {
        let tmp = tempfile::tempdir().unwrap();
        let env = fake_env(tmp.path());
        // 23.0.1 > 9.0.0 numerically even though "9" > "2" lexically
        assert!(env.buildtools_path.ends_with("23.0.1"));
    }

    #[test]
    fn test_missing_ndk_is_fatal() {
        let prefs = AndroidPrefs::default();
        assert!(AndroidEnv::resolve(&prefs, Platform::Linux).is_err());
    }

    #[test]
    fn test_arch_tables() {
        assert_eq!(AndroidEnv::archpath(Arch::Arm7), "armeabi-v7a");
        assert_eq!(AndroidEnv::archname(Arch::Arm7), "arm");
        assert_eq!(AndroidEnv::archname(Arch::X86_64), "x86_64");
    }

    #[test]
    fn test_sysroot_lib64_split() {
        let tmp = tempfile::tempdir().unwrap();
        let env = fake_env(tmp.path());
        let paths = env.sysroot_libpaths(Arch::Arm64);
        assert_eq!(paths.len(), 2);
        assert!(paths[0].ends_with("usr/lib64"));
        assert!(paths[1].ends_with("usr/lib"));
        assert_eq!(env.sysroot_libpaths(Arch::Arm7).len(), 1);
    }

    #[test]
    fn test_toolchain_prefixes() {
        let tmp = tempfile::tempdir().unwrap();
        let env = fake_env(tmp.path());
        let gcc = env.toolchain_path(ToolchainKind::Gcc, Arch::Arm7);
        assert!(gcc.ends_with("bin/arm-linux-androideabi-"));
        let clang = env.toolchain_path(ToolchainKind::Clang, Arch::Arm7);
        assert!(clang.ends_with("bin/"));
        assert!(clang.contains("llvm-"));
    }
}
