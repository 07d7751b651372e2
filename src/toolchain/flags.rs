//! Per-architecture and per-configuration flag tables.
//!
//! The original decision logic is a matrix keyed by (toolchain kind,
//! target platform, architecture, configuration). Each function here is
//! one row family of that matrix; the generator joins the returned lists
//! into Ninja variables per (config, arch) pair.

use crate::core::arch::Arch;
use crate::core::buildconfig::BuildConfig;
use crate::core::platform::Platform;
use crate::toolchain::android::AndroidEnv;
use crate::toolchain::ToolchainKind;

/// Context threaded through the flag tables.
#[derive(Debug, Clone, Copy)]
pub struct FlagContext<'a> {
    pub kind: ToolchainKind,
    pub target: Platform,
    pub android: Option<&'a AndroidEnv>,
}

fn strings(flags: &[&str]) -> Vec<String> {
    flags.iter().map(|f| f.to_string()).collect()
}

/// Compiler flags selected by build configuration.
pub fn cconfigflags(kind: ToolchainKind, config: BuildConfig) -> Vec<String> {
    match kind {
        ToolchainKind::Gcc | ToolchainKind::Clang => {
            // gcc accepts -O4 as its maximum; clang caps at -O3
            let omax = if kind == ToolchainKind::Clang {
                "-O3"
            } else {
                "-O4"
            };
            match config {
                BuildConfig::Debug => strings(&["-O0", "-DBUILD_DEBUG=1", "-g"]),
                BuildConfig::Release => {
                    strings(&["-O3", "-DBUILD_RELEASE=1", "-g", "-funroll-loops"])
                }
                BuildConfig::Profile => {
                    strings(&[omax, "-DBUILD_PROFILE=1", "-g", "-funroll-loops"])
                }
                BuildConfig::Deploy => strings(&[omax, "-DBUILD_DEPLOY=1", "-funroll-loops"]),
            }
        }
        ToolchainKind::Msvc => match config {
            BuildConfig::Debug => strings(&["/Od", "/D", "\"BUILD_DEBUG=1\"", "/GF-", "/Gm-"]),
            BuildConfig::Release => strings(&[
                "/O2", "/D", "\"BUILD_RELEASE=1\"", "/Ob2", "/Ot", "/GT", "/GL", "/GF", "/Gm-",
            ]),
            BuildConfig::Profile => strings(&[
                "/Ox", "/D", "\"BUILD_PROFILE=1\"", "/Ob2", "/Ot", "/GT", "/GL", "/GF", "/Gm-",
            ]),
            BuildConfig::Deploy => strings(&[
                "/Ox", "/D", "\"BUILD_DEPLOY=1\"", "/Ob2", "/Ot", "/GT", "/GL", "/GF", "/Gm-",
            ]),
        },
        ToolchainKind::Intel => Vec::new(),
    }
}

/// Compiler flags selected by target architecture.
pub fn carchflags(ctx: FlagContext<'_>, arch: Arch) -> Vec<String> {
    let mut flags = Vec::new();

    if ctx.target.is_apple() {
        match arch {
            Arch::X86 => flags.extend(strings(&["-arch", "x86"])),
            Arch::X86_64 => flags.extend(strings(&["-arch", "x86_64"])),
            Arch::Arm7 => flags.extend(strings(&["-arch", "armv7"])),
            Arch::Arm64 => flags.extend(strings(&["-arch", "arm64"])),
            _ => {}
        }
    } else if ctx.target.is_raspberrypi() {
        flags.extend(strings(&[
            "-mfloat-abi=hard",
            "-mfpu=vfp",
            "-mcpu=arm1176jzf-s",
            "-mtune=arm1176jzf-s",
            "-D__raspberrypi__=1",
        ]));
    } else if ctx.target.is_android() {
        if ctx.kind == ToolchainKind::Clang {
            if let Some(triple) = android_target_triple(arch) {
                flags.push("-target".to_string());
                flags.push(triple.to_string());
            }
            if let Some(android) = ctx.android {
                flags.push("-gcc-toolchain".to_string());
                flags.push(android.gcc_toolchain_path(arch));
            }
        } else if ctx.kind == ToolchainKind::Gcc
            && matches!(arch, Arch::Mips | Arch::Mips64)
        {
            flags.extend(strings(&[
                "-fno-inline-functions-called-once",
                "-fgcse-after-reload",
                "-frerun-cse-after-loop",
                "-frename-registers",
            ]));
        }
        match arch {
            Arch::X86 => flags.extend(strings(&[
                "-march=i686",
                "-mtune=intel",
                "-mssse3",
                "-mfpmath=sse",
                "-m32",
            ])),
            Arch::X86_64 => flags.extend(strings(&[
                "-march=x86-64",
                "-msse4.2",
                "-mpopcnt",
                "-m64",
                "-mtune=intel",
            ])),
            Arch::Arm6 => flags.extend(strings(&[
                "-march=armv5te",
                "-mtune=xscale",
                "-msoft-float",
            ])),
            Arch::Arm7 => flags.extend(strings(&[
                "-march=armv7-a",
                "-mhard-float",
                "-mfpu=vfpv3-d16",
                "-mfpu=neon",
                "-D_NDK_MATH_NO_SOFTFP=1",
            ])),
            _ => {}
        }
    } else if matches!(ctx.kind, ToolchainKind::Gcc | ToolchainKind::Clang)
        && !ctx.target.is_pnacl()
    {
        match arch {
            Arch::X86 => flags.push("-m32".to_string()),
            Arch::X86_64 => flags.push("-m64".to_string()),
            _ => {}
        }
    }

    flags
}

/// Archiver flags selected by target architecture.
pub fn ararchflags(ctx: FlagContext<'_>, arch: Arch) -> Vec<String> {
    let mut flags = Vec::new();

    if ctx.target.is_apple() {
        match arch {
            Arch::X86 => flags.extend(strings(&["-arch_only", "x86"])),
            Arch::X86_64 => flags.extend(strings(&["-arch_only", "x86_64"])),
            Arch::Arm7 => flags.extend(strings(&["-arch_only", "armv7"])),
            Arch::Arm64 => flags.extend(strings(&["-arch_only", "arm64"])),
            _ => {}
        }
    } else if ctx.kind == ToolchainKind::Msvc {
        match arch {
            Arch::X86 => flags.push("/MACHINE:X86".to_string()),
            Arch::X86_64 => flags.push("/MACHINE:X64".to_string()),
            _ => {}
        }
    }

    flags
}

/// Archiver flags selected by build configuration.
pub fn arconfigflags(kind: ToolchainKind, config: BuildConfig) -> Vec<String> {
    if kind == ToolchainKind::Msvc && config != BuildConfig::Debug {
        return vec!["/LTCG".to_string()];
    }
    Vec::new()
}

/// Linker flags selected by target architecture.
pub fn linkarchflags(ctx: FlagContext<'_>, arch: Arch) -> Vec<String> {
    let mut flags = Vec::new();

    if ctx.target.is_apple() {
        match arch {
            Arch::X86 => flags.extend(strings(&["-arch", "x86"])),
            Arch::X86_64 => flags.extend(strings(&["-arch", "x86_64"])),
            Arch::Arm7 => flags.extend(strings(&["-arch", "armv7"])),
            Arch::Arm64 => flags.extend(strings(&["-arch", "arm64"])),
            _ => {}
        }
    } else if ctx.target.is_android() {
        if arch == Arch::Arm7 {
            flags.extend(strings(&["-Wl,--no-warn-mismatch", "-Wl,--fix-cortex-a8"]));
        }
        if ctx.kind == ToolchainKind::Clang {
            if let Some(triple) = android_target_triple(arch) {
                flags.push("-target".to_string());
                flags.push(triple.to_string());
            }
            if let Some(android) = ctx.android {
                flags.push("-gcc-toolchain".to_string());
                flags.push(android.gcc_toolchain_path(arch));
            }
        }
    } else if ctx.kind == ToolchainKind::Msvc {
        match arch {
            Arch::X86 => flags.push("/MACHINE:X86".to_string()),
            Arch::X86_64 => flags.push("/MACHINE:X64".to_string()),
            _ => {}
        }
    } else if matches!(ctx.kind, ToolchainKind::Gcc | ToolchainKind::Clang)
        && !ctx.target.is_raspberrypi()
        && !ctx.target.is_pnacl()
    {
        match arch {
            Arch::X86 => flags.push("-m32".to_string()),
            Arch::X86_64 => flags.push("-m64".to_string()),
            _ => {}
        }
    }

    flags
}

/// Linker flags selected by build configuration.
pub fn linkconfigflags(kind: ToolchainKind, config: BuildConfig) -> Vec<String> {
    if kind == ToolchainKind::Msvc {
        if config == BuildConfig::Debug {
            return strings(&["/DEBUG", "/INCREMENTAL"]);
        }
        return strings(&[
            "/DEBUG",
            "/LTCG",
            "/INCREMENTAL:NO",
            "/OPT:REF",
            "/OPT:ICF",
        ]);
    }
    Vec::new()
}

/// Per-architecture system libraries appended at link time.
pub fn linkarchlibs(target: Platform, arch: Arch) -> Vec<String> {
    let mut libs = Vec::new();
    if target.is_android() {
        if arch == Arch::Arm7 {
            libs.push("m_hard".to_string());
        } else {
            libs.push("m".to_string());
        }
        libs.push("gcc".to_string());
        libs.push("android".to_string());
    }
    libs
}

/// The `-target` triple for Android clang cross-compilation.
fn android_target_triple(arch: Arch) -> Option<&'static str> {
    match arch {
        Arch::X86 => Some("i686-none-linux-android"),
        Arch::X86_64 => Some("x86_64-none-linux-android"),
        Arch::Arm6 => Some("armv5te-none-linux-androideabi"),
        Arch::Arm7 => Some("armv7-none-linux-androideabi"),
        Arch::Arm64 => Some("aarch64-none-linux-android"),
        Arch::Mips => Some("mipsel-none-linux-android"),
        Arch::Mips64 => Some("mips64el-none-linux-android"),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx(kind: ToolchainKind, target: Platform) -> FlagContext<'static> {
        FlagContext {
            kind,
            target,
            android: None,
        }
    }

    #[test]
    fn test_config_optimization_levels() {
        let debug = cconfigflags(ToolchainKind::Clang, BuildConfig::Debug);
        assert!(debug.contains(&"-O0".to_string()));
        assert!(debug.contains(&"-DBUILD_DEBUG=1".to_string()));

        // clang caps at -O3 where gcc goes to -O4
        let clang_profile = cconfigflags(ToolchainKind::Clang, BuildConfig::Profile);
        assert!(clang_profile.contains(&"-O3".to_string()));
        let gcc_profile = cconfigflags(ToolchainKind::Gcc, BuildConfig::Profile);
        assert!(gcc_profile.contains(&"-O4".to_string()));

        // deploy strips debug info
        let deploy = cconfigflags(ToolchainKind::Gcc, BuildConfig::Deploy);
        assert!(!deploy.contains(&"-g".to_string()));
    }

    #[test]
    fn test_msvc_config_flags() {
        let release = cconfigflags(ToolchainKind::Msvc, BuildConfig::Release);
        assert!(release.contains(&"/O2".to_string()));
        assert!(release.contains(&"/GL".to_string()));
        assert_eq!(
            arconfigflags(ToolchainKind::Msvc, BuildConfig::Release),
            vec!["/LTCG".to_string()]
        );
        assert!(arconfigflags(ToolchainKind::Msvc, BuildConfig::Debug).is_empty());
    }

    #[test]
    fn test_apple_arch_flags() {
        let flags = carchflags(ctx(ToolchainKind::Clang, Platform::Ios), Arch::Arm7);
        assert_eq!(flags, vec!["-arch".to_string(), "armv7".to_string()]);
        let flags = ararchflags(ctx(ToolchainKind::Clang, Platform::MacOsx), Arch::X86_64);
        assert_eq!(flags, vec!["-arch_only".to_string(), "x86_64".to_string()]);
    }

    #[test]
    fn test_linux_word_size_flags() {
        let flags = carchflags(ctx(ToolchainKind::Clang, Platform::Linux), Arch::X86);
        assert_eq!(flags, vec!["-m32".to_string()]);
        let flags = linkarchflags(ctx(ToolchainKind::Gcc, Platform::Linux), Arch::X86_64);
        assert_eq!(flags, vec!["-m64".to_string()]);
    }

    #[test]
    fn test_raspberrypi_vfp_flags() {
        let flags = carchflags(ctx(ToolchainKind::Gcc, Platform::RaspberryPi), Arch::Arm6);
        assert!(flags.contains(&"-mcpu=arm1176jzf-s".to_string()));
        assert!(flags.contains(&"-D__raspberrypi__=1".to_string()));
    }

    #[test]
    fn test_android_arch_libs() {
        assert_eq!(
            linkarchlibs(Platform::Android, Arch::Arm7),
            vec!["m_hard".to_string(), "gcc".to_string(), "android".to_string()]
        );
        assert_eq!(
            linkarchlibs(Platform::Android, Arch::Arm64),
            vec!["m".to_string(), "gcc".to_string(), "android".to_string()]
        );
        assert!(linkarchlibs(Platform::Linux, Arch::X86_64).is_empty());
    }

    #[test]
    fn test_android_cortex_a8_workaround() {
        let flags = linkarchflags(ctx(ToolchainKind::Gcc, Platform::Android), Arch::Arm7);
        assert!(flags.contains(&"-Wl,--fix-cortex-a8".to_string()));
    }

    #[test]
    fn test_pnacl_has_no_arch_flags() {
        assert!(carchflags(ctx(ToolchainKind::Clang, Platform::Pnacl), Arch::Generic).is_empty());
        assert!(linkarchflags(ctx(ToolchainKind::Clang, Platform::Pnacl), Arch::Generic).is_empty());
    }
}
