//! Toolchain resolution.
//!
//! A [`Toolchain`] is the fully resolved answer to "how do we compile,
//! archive and link on this (host, target, toolchain, arch, config)
//! tuple": concrete tool executables, Ninja command templates, flag lists
//! and path conventions. It is built once per generator invocation by
//! [`Toolchain::resolve`] and is immutable afterwards.
//!
//! Layering during resolution, lowest to highest priority:
//! per-kind built-in defaults, per-target overrides, per-arch and
//! per-config tables (applied later, per edge), preferences file,
//! environment variables, explicit CLI overrides.

use std::fmt;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::str::FromStr;

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::core::arch::Arch;
use crate::core::buildconfig::BuildConfig;
use crate::core::platform::Platform;
use crate::generator::ninja::{Deps, NinjaWriter, Rule};
use crate::util::prefs::Prefs;

pub mod android;
pub mod flags;
pub mod pnacl;
pub mod tizen;
pub mod xcode;

pub use android::AndroidEnv;
pub use flags::FlagContext;
pub use pnacl::PnaclEnv;
pub use tizen::TizenEnv;
pub use xcode::{AppleTools, XcodeEnv};

/// Error returned for a toolchain string outside the supported set.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown toolchain `{0}`")]
pub struct UnknownToolchain(pub String);

/// The compiler/archiver/linker tool family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ToolchainKind {
    Msvc,
    Gcc,
    Clang,
    Intel,
}

impl ToolchainKind {
    /// All supported toolchains, in declaration order.
    pub const ALL: [ToolchainKind; 4] = [
        ToolchainKind::Msvc,
        ToolchainKind::Gcc,
        ToolchainKind::Clang,
        ToolchainKind::Intel,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ToolchainKind::Msvc => "msvc",
            ToolchainKind::Gcc => "gcc",
            ToolchainKind::Clang => "clang",
            ToolchainKind::Intel => "intel",
        }
    }

    /// The default toolchain when none is requested: MSVC on a Windows
    /// host, GCC for the targets whose SDKs ship GCC cross-compilers
    /// (Android, Raspberry Pi, Tizen), Clang elsewhere.
    pub fn default_for(host: Platform, target: Platform) -> ToolchainKind {
        if host.is_windows() {
            ToolchainKind::Msvc
        } else if target.is_android() || target.is_raspberrypi() || target.is_tizen() {
            ToolchainKind::Gcc
        } else {
            ToolchainKind::Clang
        }
    }
}

impl FromStr for ToolchainKind {
    type Err = UnknownToolchain;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.to_ascii_lowercase();
        let kind = if lower.starts_with("ms") {
            ToolchainKind::Msvc
        } else if lower.starts_with("gcc") || lower.starts_with("gnu") {
            ToolchainKind::Gcc
        } else if lower.starts_with("clang") || lower.starts_with("llvm") {
            ToolchainKind::Clang
        } else if lower.starts_with("intel") {
            ToolchainKind::Intel
        } else {
            return Err(UnknownToolchain(s.to_string()));
        };
        Ok(kind)
    }
}

impl fmt::Display for ToolchainKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Explicit tool and flag overrides, merged from the environment and CLI.
///
/// These are the highest-priority layer: a set `cc` replaces the resolved
/// compiler, and the flag lists are appended after every built-in flag.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub cc: Option<String>,
    pub ar: Option<String>,
    pub link: Option<String>,
    pub cflags: Vec<String>,
    pub arflags: Vec<String>,
    pub linkflags: Vec<String>,
}

impl Overrides {
    /// Read overrides from `CC`, `AR`, `LINK`, `CFLAGS`, `ARFLAGS` and
    /// `LINKFLAGS`.
    pub fn from_env() -> Overrides {
        fn var(key: &str) -> Option<String> {
            std::env::var(key).ok().filter(|v| !v.is_empty())
        }
        fn flags(key: &str) -> Vec<String> {
            var(key)
                .map(|v| v.split_whitespace().map(|f| f.to_string()).collect())
                .unwrap_or_default()
        }
        Overrides {
            cc: var("CC"),
            ar: var("AR"),
            link: var("LINK"),
            cflags: flags("CFLAGS"),
            arflags: flags("ARFLAGS"),
            linkflags: flags("LINKFLAGS"),
        }
    }
}

/// Everything needed to resolve a toolchain.
#[derive(Debug, Clone, Default)]
pub struct ToolchainRequest {
    /// Project name, used for the `<NAME>_COMPILE=1` define
    pub project: String,
    /// Explicit toolchain; None selects the host/target default
    pub kind: Option<ToolchainKind>,
    /// Explicit architectures; empty selects the target default set
    pub archs: Vec<Arch>,
    /// Build configurations; empty defaults to release
    pub configs: Vec<BuildConfig>,
    /// Sibling libraries to include and link against
    pub dependlibs: Vec<String>,
    /// Project-wide include paths
    pub includepaths: Vec<String>,
    /// Preferences (already overlaid with the environment)
    pub prefs: Prefs,
    /// Tool/flag overrides (environment merged with CLI)
    pub overrides: Overrides,
    /// Pre-resolved Apple environment; when None and the target is Apple,
    /// the developer tools are probed via xcrun
    pub xcode: Option<XcodeEnv>,
}

/// A fully resolved toolchain.
#[derive(Debug, Clone)]
pub struct Toolchain {
    kind: ToolchainKind,
    host: Platform,
    target: Platform,
    archs: Vec<Arch>,
    configs: Vec<BuildConfig>,
    dependlibs: Vec<String>,

    cc: String,
    ar: String,
    link: String,
    copy: String,

    cflags: Vec<String>,
    mflags: Vec<String>,
    arflags: Vec<String>,
    linkflags: Vec<String>,
    includepaths: Vec<String>,
    libpaths: Vec<String>,
    extralibs: Vec<String>,

    cccmd: String,
    cmcmd: Option<String>,
    arcmd: String,
    linkcmd: String,
    copycmd: String,
    ccdeps: Deps,
    ccdepfile: Option<String>,

    objext: &'static str,
    libprefix: &'static str,
    staticlibext: &'static str,
    binprefix: &'static str,
    binext: &'static str,

    buildpath: PathBuf,
    libpath: PathBuf,
    binpath: PathBuf,

    android: Option<AndroidEnv>,
    xcode: Option<XcodeEnv>,
    tizen: Option<TizenEnv>,
    pnacl: Option<PnaclEnv>,
}

impl Toolchain {
    /// Resolve a toolchain for a (host, target) pair.
    pub fn resolve(host: Platform, target: Platform, req: ToolchainRequest) -> Result<Toolchain> {
        let kind = req
            .kind
            .unwrap_or_else(|| ToolchainKind::default_for(host, target));

        let archs = if req.archs.is_empty() {
            Arch::defaults_for(target)?
        } else {
            req.archs.clone()
        };
        if archs.is_empty() {
            bail!("architecture list is empty for target {}", target);
        }

        let configs = if req.configs.is_empty() {
            vec![BuildConfig::default()]
        } else {
            req.configs.clone()
        };

        let android = if target.is_android() {
            Some(AndroidEnv::resolve(&req.prefs.android, host)?)
        } else {
            None
        };
        let tizen = if target.is_tizen() {
            Some(TizenEnv::resolve(&req.prefs.tizen)?)
        } else {
            None
        };
        let pnacl = if target.is_pnacl() {
            Some(PnaclEnv::resolve(&req.prefs.pnacl, host)?)
        } else {
            None
        };
        let xcode = if target.is_apple() {
            match req.xcode {
                Some(xcode) => Some(xcode),
                None if host.is_macosx() => {
                    let prefs = if target.is_ios() {
                        &req.prefs.ios
                    } else {
                        &req.prefs.macosx
                    };
                    Some(XcodeEnv::probe(target, prefs)?)
                }
                None => bail!("building for {} requires a macosx host with Xcode", target),
            }
        } else {
            None
        };

        let define = format!("{}_COMPILE=1", req.project.to_uppercase());

        let mut toolchain = Toolchain {
            kind,
            host,
            target,
            archs,
            configs,
            dependlibs: req.dependlibs.clone(),
            cc: String::new(),
            ar: String::new(),
            link: String::new(),
            copy: if host.is_windows() {
                "copy".to_string()
            } else {
                "cp -f".to_string()
            },
            cflags: Vec::new(),
            mflags: Vec::new(),
            arflags: Vec::new(),
            linkflags: Vec::new(),
            includepaths: Vec::new(),
            libpaths: Vec::new(),
            extralibs: Vec::new(),
            cccmd: String::new(),
            cmcmd: None,
            arcmd: String::new(),
            linkcmd: String::new(),
            copycmd: "$copy $in $out".to_string(),
            ccdeps: Deps::Gcc,
            ccdepfile: Some("$out.d".to_string()),
            objext: ".o",
            libprefix: "lib",
            staticlibext: ".a",
            binprefix: "",
            binext: "",
            buildpath: Path::new("build").join("ninja").join(target.as_str()),
            libpath: Path::new("lib").join(target.as_str()),
            binpath: Path::new("bin").join(target.as_str()),
            android,
            xcode,
            tizen,
            pnacl,
        };

        match kind {
            ToolchainKind::Msvc => toolchain.resolve_msvc(&define),
            ToolchainKind::Gcc => toolchain.resolve_gnu(&define),
            ToolchainKind::Clang => toolchain.resolve_clang(&define),
            ToolchainKind::Intel => toolchain.resolve_intel(&define),
        }

        toolchain.resolve_extensions();
        toolchain.resolve_includepaths(&req.includepaths);
        toolchain.apply_overrides(&req.overrides);

        Ok(toolchain)
    }

    fn resolve_msvc(&mut self, define: &str) {
        self.cc = "cl".to_string();
        self.ar = "lib".to_string();
        self.link = "link".to_string();
        self.cflags = vec![
            "/D".to_string(),
            format!("\"{}\"", define),
            "/Zi".to_string(),
            "/W3".to_string(),
            "/WX".to_string(),
            "/Oi".to_string(),
            "/Oy-".to_string(),
            "/MT".to_string(),
            "/GS-".to_string(),
            "/Gy-".to_string(),
            "/Qpar-".to_string(),
            "/fp:fast".to_string(),
            "/fp:except-".to_string(),
            "/Zc:forScope".to_string(),
            "/Zc:wchar_t".to_string(),
            "/GR-".to_string(),
            "/openmp-".to_string(),
            "/arch:SSE2".to_string(),
        ];
        self.extralibs
            .extend(strings(&["kernel32", "user32", "shell32", "advapi32"]));
        self.objext = ".obj";
        self.ccdeps = Deps::Msvc;
        self.ccdepfile = None;
        self.cccmd = "$cc /showIncludes $includepaths $moreincludepaths $cflags $carchflags \
                      $cconfigflags /c $in /Fo$out /Fd$pdbpath /FS /nologo"
            .to_string();
        self.arcmd = "$ar $arflags $ararchflags $arconfigflags /NOLOGO /OUT:$out $in".to_string();
        self.linkcmd = "$link $libpaths $linkflags $linkarchflags $linkconfigflags /DEBUG /NOLOGO \
                        /SUBSYSTEM:CONSOLE /DYNAMICBASE /NXCOMPAT /MANIFEST \
                        /MANIFESTUAC:\"level='asInvoker' uiAccess='false'\" /TLBID:1 \
                        /PDB:$pdbpath /OUT:$out $in $libs $archlibs"
            .to_string();
    }

    fn resolve_gnu(&mut self, define: &str) {
        self.cc = "gcc".to_string();
        self.ar = "ar".to_string();
        self.link = "gcc".to_string();
        self.cflags = vec![format!("-D{}", define)];
        self.cflags.extend(strings(&[
            "-W",
            "-Wall",
            "-Werror",
            "-Wno-unused-parameter",
            "-Wno-missing-braces",
            "-Wno-missing-field-initializers",
            "-Wno-unused-value",
            "-funit-at-a-time",
            "-fstrict-aliasing",
            "-fno-math-errno",
            "-ffinite-math-only",
            "-funsafe-math-optimizations",
            "-fno-trapping-math",
            "-ffast-math",
        ]));
        self.cccmd = "$cc -MMD -MT $out -MF $out.d $includepaths $moreincludepaths $cflags \
                      $carchflags $cconfigflags -c $in -o $out"
            .to_string();
        self.arcmd = "rm -f $out && $ar crs $ararchflags $arflags $out $in".to_string();
        self.linkcmd =
            "$link $libpaths $linkflags $linkarchflags $linkconfigflags -o $out $in $libs $archlibs"
                .to_string();

        if self.target.is_raspberrypi() {
            self.cflags
                .extend(strings(&["-std=c99", "-fno-omit-frame-pointer"]));
            self.extralibs.push("rt".to_string());
        } else {
            self.cflags.push("-std=c11".to_string());
        }

        self.apply_posix_target_defaults();

        if self.target.is_android() {
            self.apply_android_commands();
        }
        if self.target.is_tizen() {
            self.apply_tizen_commands();
        }
    }

    fn resolve_clang(&mut self, define: &str) {
        self.cc = "clang".to_string();
        self.ar = "llvm-ar".to_string();
        self.link = "clang".to_string();
        self.cflags = vec!["-std=c11".to_string(), format!("-D{}", define)];
        self.cflags.extend(strings(&[
            "-W",
            "-Wall",
            "-Werror",
            "-Wno-unused-parameter",
            "-Wno-missing-braces",
            "-Wno-missing-field-initializers",
            "-funit-at-a-time",
            "-fstrict-aliasing",
            "-fno-math-errno",
            "-ffinite-math-only",
            "-funsafe-math-optimizations",
            "-fno-trapping-math",
            "-ffast-math",
        ]));
        self.cccmd = "$cc -MMD -MT $out -MF $out.d $includepaths $moreincludepaths $cflags \
                      $carchflags $cconfigflags -c $in -o $out"
            .to_string();
        self.arcmd = "rm -f $out && $ar crs $ararchflags $arflags $out $in".to_string();
        self.linkcmd =
            "$link $libpaths $linkflags $linkarchflags $linkconfigflags -o $out $in $libs $archlibs"
                .to_string();

        if self.target.is_apple() {
            self.apply_apple_commands();
        } else if self.target.is_android() {
            self.apply_android_commands();
        } else if self.target.is_pnacl() {
            self.apply_pnacl_commands();
        }

        self.apply_posix_target_defaults();
    }

    fn resolve_intel(&mut self, define: &str) {
        // Minimal command set; the original never fleshed this family out
        self.cc = "icl".to_string();
        self.ar = "ar".to_string();
        self.link = "link".to_string();
        self.cflags = vec![format!("-D{}", define)];
        self.objext = ".obj";
        self.ccdeps = Deps::Msvc;
        self.ccdepfile = None;
        self.cccmd = "$cc /showIncludes $includepaths $moreincludepaths $cflags $carchflags \
                      $cconfigflags /c $in /Fo$out /nologo"
            .to_string();
        self.arcmd = "$ar $arflags $ararchflags $arconfigflags /NOLOGO /OUT:$out $in".to_string();
        self.linkcmd = "$link $libpaths $linkflags $linkarchflags $linkconfigflags /OUT:$out $in \
                        $libs $archlibs"
            .to_string();
    }

    /// Framework links, pthread and extra system libraries common to the
    /// POSIX-flavored targets.
    fn apply_posix_target_defaults(&mut self) {
        if self.target.is_macosx() {
            self.linkflags
                .extend(strings(&["-framework", "Cocoa", "-framework", "CoreFoundation"]));
        }
        if self.target.is_ios() {
            self.linkflags.extend(strings(&[
                "-framework",
                "CoreGraphics",
                "-framework",
                "UIKit",
                "-framework",
                "Foundation",
            ]));
        }
        if self.host.is_raspberrypi() {
            self.includepaths.extend(strings(&[
                "/opt/vc/include",
                "/opt/vc/include/interface/vcos/pthreads",
            ]));
            self.libpaths.push("/opt/vc/lib".to_string());
        }
        if self.target.is_linux() || self.target.is_bsd() || self.target.is_raspberrypi() {
            self.linkflags.push("-pthread".to_string());
            self.extralibs.extend(strings(&["dl", "m"]));
        }
    }

    fn apply_apple_commands(&mut self) {
        let Some(xcode) = self.xcode.clone() else {
            return;
        };

        self.cc = xcode.cc.clone();
        self.ar = xcode.ar.clone();
        self.link = format!("{} {}", xcode.deploytargetenv, xcode.cc);

        let versionflag = if self.target.is_ios() {
            format!("-miphoneos-version-min={}", xcode.deploymenttarget)
        } else {
            format!("-mmacosx-version-min={}", xcode.deploymenttarget)
        };
        self.cflags.extend(vec![
            "-fasm-blocks".to_string(),
            versionflag,
            "-isysroot".to_string(),
            "$sdkdir".to_string(),
        ]);
        self.arflags
            .extend(strings(&["-static", "-no_warning_for_no_symbols"]));
        self.linkflags
            .extend(strings(&["-isysroot", "$sdkdir"]));

        self.mflags = self.cflags.clone();
        self.mflags.extend(strings(&[
            "-fobjc-arc",
            "-fno-objc-exceptions",
            "-x",
            "objective-c",
        ]));
        self.cflags.extend(strings(&["-x", "c"]));

        self.cmcmd = Some(
            "$cc -MMD -MT $out -MF $out.d $includepaths $moreincludepaths $mflags $carchflags \
             $cconfigflags -c $in -o $out"
                .to_string(),
        );
        self.arcmd = "rm -f $out && $ar $ararchflags $arflags $in -o $out".to_string();
        self.linkcmd =
            "$link $libpaths $linkflags $linkarchflags $linkconfigflags $in $libs -o $out"
                .to_string();
    }

    fn apply_android_commands(&mut self) {
        self.cccmd = "$toolchain$cc -MMD -MT $out -MF $out.d $includepaths $moreincludepaths \
                      $cflags $carchflags $cconfigflags -c $in -o $out"
            .to_string();
        if self.kind == ToolchainKind::Gcc {
            self.arcmd = "rm -f $out && $toolchain$ar crsD $ararchflags $arflags $out $in".to_string();
        } else {
            self.arcmd = "rm -f $out && $toolchain$ar crs $ararchflags $arflags $out $in".to_string();
        }
        self.linkcmd = "$toolchain$link -shared -Wl,-soname,$liblinkname --sysroot=$sysroot \
                        $libpaths $linkflags $linkarchflags $linkconfigflags -o $out $in $libs \
                        $archlibs"
            .to_string();

        self.cflags.extend(strings(&[
            "-fpic",
            "-ffunction-sections",
            "-funwind-tables",
            "-fstack-protector",
            "-fomit-frame-pointer",
            "-no-canonical-prefixes",
            "-Wa,--noexecstack",
            "-Wno-unused-function",
        ]));
        if self.kind == ToolchainKind::Gcc {
            self.cflags
                .extend(strings(&["-funswitch-loops", "-finline-limit=300"]));
        }
        self.linkflags.extend(strings(&[
            "-no-canonical-prefixes",
            "-Wl,--no-undefined",
            "-Wl,-z,noexecstack",
            "-Wl,-z,relro",
            "-Wl,-z,now",
        ]));
        self.includepaths.extend(strings(&[
            "$ndk/sources/android/native_app_glue",
            "$ndk/sources/android/cpufeatures",
        ]));
        self.extralibs.push("log".to_string());
    }

    fn apply_tizen_commands(&mut self) {
        self.cccmd = "$toolchain$cc --sysroot=$sysroot -MMD -MT $out -MF $out.d $includepaths \
                      $moreincludepaths $cflags $carchflags $cconfigflags -c $in -o $out"
            .to_string();
        self.arcmd = "rm -f $out && $toolchain$ar crs $ararchflags $arflags $out $in".to_string();
        self.linkcmd = "$toolchain$link --sysroot=$sysroot $libpaths $linkflags $linkarchflags \
                        $linkconfigflags -o $out $in $libs $archlibs"
            .to_string();

        self.cflags
            .extend(strings(&["-fpic", "-ffunction-sections", "-funwind-tables"]));
        self.linkflags.push("-pthread".to_string());
        self.extralibs.extend(strings(&["dl", "m"]));
    }

    fn apply_pnacl_commands(&mut self) {
        let Some(pnacl) = self.pnacl.clone() else {
            return;
        };
        self.cc = pnacl.cc();
        self.ar = pnacl.ar();
        self.link = pnacl.cc();
    }

    fn resolve_extensions(&mut self) {
        if self.target.is_windows() {
            self.libprefix = "";
            self.staticlibext = ".lib";
            self.binprefix = "";
            self.binext = ".exe";
        } else if self.target.is_android() {
            self.libprefix = "lib";
            self.staticlibext = ".a";
            self.binprefix = "lib";
            self.binext = ".so";
        } else if self.target.is_pnacl() {
            self.libprefix = "lib";
            self.staticlibext = ".a";
            self.binprefix = "";
            self.binext = ".pexe";
        } else {
            self.libprefix = "lib";
            self.staticlibext = ".a";
            self.binprefix = "";
            self.binext = "";
        }
    }

    fn resolve_includepaths(&mut self, projectpaths: &[String]) {
        let mut paths = vec![".".to_string()];
        paths.extend(projectpaths.iter().cloned());
        for deplib in &self.dependlibs {
            paths.push(format!("../{}_lib", deplib));
        }
        paths.extend(self.includepaths.drain(..));
        self.includepaths = paths;
    }

    fn apply_overrides(&mut self, overrides: &Overrides) {
        if let Some(cc) = &overrides.cc {
            self.cc = cc.clone();
        }
        if let Some(ar) = &overrides.ar {
            self.ar = ar.clone();
        }
        if let Some(link) = &overrides.link {
            self.link = link.clone();
        }
        self.cflags.extend(overrides.cflags.iter().cloned());
        self.arflags.extend(overrides.arflags.iter().cloned());
        self.linkflags.extend(overrides.linkflags.iter().cloned());
    }

    pub fn kind(&self) -> ToolchainKind {
        self.kind
    }

    pub fn host(&self) -> Platform {
        self.host
    }

    pub fn target(&self) -> Platform {
        self.target
    }

    pub fn archs(&self) -> &[Arch] {
        &self.archs
    }

    pub fn configs(&self) -> &[BuildConfig] {
        &self.configs
    }

    pub fn dependlibs(&self) -> &[String] {
        &self.dependlibs
    }

    pub fn buildpath(&self) -> &Path {
        &self.buildpath
    }

    pub fn libpath(&self) -> &Path {
        &self.libpath
    }

    pub fn binpath(&self) -> &Path {
        &self.binpath
    }

    pub fn objext(&self) -> &'static str {
        self.objext
    }

    pub fn android(&self) -> Option<&AndroidEnv> {
        self.android.as_ref()
    }

    pub fn xcode(&self) -> Option<&XcodeEnv> {
        self.xcode.as_ref()
    }

    pub fn tizen(&self) -> Option<&TizenEnv> {
        self.tizen.as_ref()
    }

    pub fn pnacl(&self) -> Option<&PnaclEnv> {
        self.pnacl.as_ref()
    }

    /// Static library file name for a module.
    pub fn libname(&self, module: &str) -> String {
        format!("{}{}{}", self.libprefix, module, self.staticlibext)
    }

    /// Executable/shared-object file name for a binary.
    pub fn binname(&self, name: &str) -> String {
        format!("{}{}{}", self.binprefix, name, self.binext)
    }

    fn flag_context(&self) -> FlagContext<'_> {
        FlagContext {
            kind: self.kind,
            target: self.target,
            android: self.android.as_ref(),
        }
    }

    /// Per-(arch) compile flags, joined for a Ninja variable.
    pub fn carchflags(&self, arch: Arch) -> String {
        self.join_flags(&flags::carchflags(self.flag_context(), arch))
    }

    /// Per-(config) compile flags, joined for a Ninja variable.
    pub fn cconfigflags(&self, config: BuildConfig) -> String {
        self.join_flags(&flags::cconfigflags(self.kind, config))
    }

    pub fn ararchflags(&self, arch: Arch) -> String {
        self.join_flags(&flags::ararchflags(self.flag_context(), arch))
    }

    pub fn arconfigflags(&self, config: BuildConfig) -> String {
        self.join_flags(&flags::arconfigflags(self.kind, config))
    }

    pub fn linkarchflags(&self, arch: Arch) -> String {
        self.join_flags(&flags::linkarchflags(self.flag_context(), arch))
    }

    pub fn linkconfigflags(&self, config: BuildConfig) -> String {
        self.join_flags(&flags::linkconfigflags(self.kind, config))
    }

    /// Per-architecture system libraries appended to link edges.
    pub fn linkarchlibs(&self, arch: Arch) -> Vec<String> {
        flags::linkarchlibs(self.target, arch)
    }

    /// Format library references for the linker (`-lfoo` or `foo.lib`).
    pub fn make_libs(&self, libs: &[String]) -> Vec<String> {
        if self.kind == ToolchainKind::Msvc {
            libs.iter().map(|lib| format!("{}.lib", lib)).collect()
        } else {
            libs.iter().map(|lib| format!("-l{}", lib)).collect()
        }
    }

    /// Format framework references; empty off Apple targets.
    pub fn make_frameworks(&self, frameworks: &[String]) -> Vec<String> {
        if self.target.is_apple() {
            frameworks
                .iter()
                .map(|f| format!("-framework {}", f))
                .collect()
        } else {
            Vec::new()
        }
    }

    /// Format include-path arguments.
    pub fn make_includepaths(&self, paths: &[String]) -> Vec<String> {
        if self.kind == ToolchainKind::Msvc {
            paths
                .iter()
                .map(|path| format!("/I{}", path_escape(path)))
                .collect()
        } else {
            paths.iter().map(|path| format!("-I{}", path)).collect()
        }
    }

    /// Format library-path arguments.
    pub fn make_libpaths(&self, paths: &[String]) -> Vec<String> {
        if self.kind == ToolchainKind::Msvc {
            paths
                .iter()
                .map(|path| format!("/LIBPATH:{}", path_escape(path)))
                .collect()
        } else {
            paths.iter().map(|path| format!("-L{}", path)).collect()
        }
    }

    /// Library search paths for one (arch, config) link edge: caller's
    /// paths, dependent-library output paths, then Android sysroot libs.
    pub fn build_libpaths(&self, paths: &[String], arch: Arch, config: BuildConfig) -> Vec<String> {
        let mut finalpaths = self.libpaths.clone();
        finalpaths.extend(paths.iter().cloned());
        for deplib in &self.dependlibs {
            if self.target.is_apple() {
                finalpaths.push(format!(
                    "../{}_lib/lib/{}/{}",
                    deplib, self.target, config
                ));
            } else {
                finalpaths.push(format!(
                    "../{}_lib/lib/{}/{}/{}",
                    deplib, self.target, config, arch
                ));
            }
        }
        if let Some(android) = &self.android {
            finalpaths.extend(android.sysroot_libpaths(arch));
        }
        finalpaths
    }

    /// Extra libraries linked into every binary on this target.
    pub fn extralibs(&self) -> &[String] {
        &self.extralibs
    }

    /// Join flags into one Ninja variable value, escaping as the host
    /// shell requires.
    pub fn join_flags(&self, flags: &[String]) -> String {
        flags
            .iter()
            .map(|flag| self.shell_escape(flag))
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Escape a string so the shell treats it as a single argument.
    pub fn shell_escape(&self, s: &str) -> String {
        if self.host.is_windows() {
            return s.to_string();
        }
        if s.contains('"') {
            return format!("'{}'", s.replace('\'', "\\'"));
        }
        s.to_string()
    }

    /// Write the rule statements for this toolchain.
    pub fn write_rules<W: Write>(&self, writer: &mut NinjaWriter<W>) -> io::Result<()> {
        writer.rule(
            "cc",
            &Rule {
                command: &self.cccmd,
                description: Some("CC $out"),
                depfile: self.ccdepfile.as_deref(),
                deps: Some(self.ccdeps),
            },
        )?;
        writer.newline()?;

        if let Some(cmcmd) = &self.cmcmd {
            writer.rule(
                "cm",
                &Rule {
                    command: cmcmd,
                    description: Some("CC $out"),
                    depfile: self.ccdepfile.as_deref(),
                    deps: Some(self.ccdeps),
                },
            )?;
            writer.newline()?;
        }

        if let Some(xcode) = &self.xcode {
            writer.rule(
                "lipo",
                &Rule {
                    command: "$lipo -create $in -output $out",
                    description: Some("LIPO $out"),
                    ..Rule::default()
                },
            )?;
            writer.newline()?;

            let plistcmd = "$slipway plist --exename $exename --prodname $prodname \
                            --bundleidentifier $bundleidentifier --target $configure_target \
                            --deploymenttarget $deploymenttarget --output $outpath $in";
            writer.rule(
                "plist",
                &Rule {
                    command: plistcmd,
                    description: Some("PLIST $outpath"),
                    ..Rule::default()
                },
            )?;
            writer.newline()?;

            let xcassetscmd = format!(
                "mkdir -p $outpath && $xcassets --output-format human-readable-text \
                 --output-partial-info-plist $outplist --app-icon AppIcon --launch-image \
                 LaunchImage --platform {} --minimum-deployment-target {} {} --compress-pngs \
                 --compile $outpath $in >/dev/null",
                xcode.sdk,
                xcode.deploymenttarget,
                xcode.target_device_args()
            );
            writer.rule(
                "xcassets",
                &Rule {
                    command: &xcassetscmd,
                    description: Some("XCASSETS $outpath"),
                    ..Rule::default()
                },
            )?;
            writer.newline()?;

            let xibcmd = format!(
                "$xib {} --module $module --minimum-deployment-target {} \
                 --output-partial-info-plist $outplist --auto-activate-custom-fonts \
                 --output-format human-readable-text --compile $outpath $in",
                xcode.target_device_args(),
                xcode.deploymenttarget
            );
            writer.rule(
                "xib",
                &Rule {
                    command: &xibcmd,
                    description: Some("XIB $outpath"),
                    ..Rule::default()
                },
            )?;
            writer.newline()?;

            writer.rule(
                "dsymutil",
                &Rule {
                    command: "$dsymutil $in -o $outpath",
                    description: Some("DSYMUTIL $outpath"),
                    ..Rule::default()
                },
            )?;
            writer.newline()?;

            writer.rule(
                "codesign",
                &Rule {
                    command: "$codesign --force --sign $signidentity $outpath",
                    description: Some("CODESIGN $outpath"),
                    ..Rule::default()
                },
            )?;
            writer.newline()?;
        }

        if self.android.is_some() {
            writer.rule(
                "aapt",
                &Rule {
                    command: "cd $apkbuildpath && $aapt p -f -M AndroidManifest.xml -F $apk \
                              -I $androidjar -S res --debug-mode --no-crunch && $aapt a $apk \
                              $apklibs",
                    description: Some("AAPT $out"),
                    ..Rule::default()
                },
            )?;
            writer.newline()?;

            writer.rule(
                "aaptdeploy",
                &Rule {
                    command: "cd $apkbuildpath && $aapt c -S res -C bin/res && $aapt p -f -M \
                              AndroidManifest.xml -F $apk -I $androidjar -S bin/res -S res && \
                              $aapt a -u $apk $apklibs",
                    description: Some("AAPT $out"),
                    ..Rule::default()
                },
            )?;
            writer.newline()?;

            writer.rule(
                "jarsigner",
                &Rule {
                    command: "$jarsigner -sigalg SHA1withRSA -digestalg SHA1 -keystore $keystore \
                              -storepass $keystorepass -keypass $keypass -signedjar $out $in \
                              $keyalias",
                    description: Some("JARSIGNER $out"),
                    ..Rule::default()
                },
            )?;
            writer.newline()?;

            writer.rule(
                "zipalign",
                &Rule {
                    command: "$zipalign -f 4 $in $out",
                    description: Some("ZIPALIGN $out"),
                    ..Rule::default()
                },
            )?;
            writer.newline()?;
        }

        if self.tizen.is_some() {
            writer.rule(
                "tpk",
                &Rule {
                    command: "$tizen package -t tpk -s $tizenprofile -- $tpkbuildpath",
                    description: Some("TPK $out"),
                    ..Rule::default()
                },
            )?;
            writer.newline()?;
        }

        if self.pnacl.is_some() {
            writer.rule(
                "finalize",
                &Rule {
                    command: "$finalize -o $out $in",
                    description: Some("FINALIZE $out"),
                    ..Rule::default()
                },
            )?;
            writer.newline()?;

            writer.rule(
                "nmf",
                &Rule {
                    command: "$nmf $in -o $out",
                    description: Some("NMF $out"),
                    ..Rule::default()
                },
            )?;
            writer.newline()?;
        }

        writer.rule(
            "ar",
            &Rule {
                command: &self.arcmd,
                description: Some("LIB $out"),
                ..Rule::default()
            },
        )?;
        writer.newline()?;

        writer.rule(
            "link",
            &Rule {
                command: &self.linkcmd,
                description: Some("LINK $out"),
                ..Rule::default()
            },
        )?;
        writer.newline()?;

        writer.rule(
            "copy",
            &Rule {
                command: &self.copycmd,
                description: Some("COPY $in -> $out"),
                ..Rule::default()
            },
        )?;
        writer.newline()
    }

    /// Write the global variable statements for this toolchain.
    pub fn write_variables<W: Write>(&self, writer: &mut NinjaWriter<W>) -> io::Result<()> {
        writer.variable("builddir", &self.buildpath.display().to_string())?;

        if let Some(xcode) = &self.xcode {
            writer.variable("sdkdir", &xcode.sdkdir)?;
            writer.variable("slipway", &current_exe())?;
            writer.variable("lipo", &xcode.lipo)?;
            writer.variable("xcassets", &xcode.xcassets)?;
            writer.variable("xib", &xcode.xib)?;
            writer.variable("dsymutil", &xcode.dsymutil)?;
            writer.variable("codesign", &xcode.codesign)?;
            writer.variable("signidentity", &xcode.organisation)?;
            writer.variable("deploymenttarget", &xcode.deploymenttarget)?;
        }
        if let Some(android) = &self.android {
            writer.variable("ndk", &android.ndkpath.display().to_string())?;
            writer.variable("sdk", &android.sdkpath.display().to_string())?;
            writer.variable("androidjar", &android.android_jar.display().to_string())?;
            writer.variable(
                "aapt",
                &android.buildtools_path.join("aapt").display().to_string(),
            )?;
            writer.variable(
                "zipalign",
                &android
                    .buildtools_path
                    .join("zipalign")
                    .display()
                    .to_string(),
            )?;
            writer.variable("jarsigner", "jarsigner")?;
            writer.variable("keystore", android.keystore.as_deref().unwrap_or(""))?;
            writer.variable("keyalias", android.keyalias.as_deref().unwrap_or(""))?;
            writer.variable(
                "keystorepass",
                android.keystorepass.as_deref().unwrap_or(""),
            )?;
            writer.variable("keypass", android.keypass.as_deref().unwrap_or(""))?;
        }
        if let Some(tizen) = &self.tizen {
            writer.variable("tizen", &tizen.tizen_tool())?;
            writer.variable("tizenprofile", &tizen.profile)?;
        }
        if let Some(pnacl) = &self.pnacl {
            writer.variable("finalize", &pnacl.finalize())?;
            writer.variable("nmf", &pnacl.nmf_tool())?;
        }

        writer.variable("cc", &self.cc)?;
        writer.variable("ar", &self.ar)?;
        writer.variable("link", &self.link)?;
        writer.variable("copy", &self.copy)?;
        if self.xcode.is_some() {
            writer.variable("mflags", &self.join_flags(&self.mflags))?;
        }
        writer.variable("cflags", &self.join_flags(&self.cflags))?;
        writer.variable("arflags", &self.join_flags(&self.arflags))?;
        writer.variable("linkflags", &self.join_flags(&self.linkflags))?;
        writer.variable(
            "includepaths",
            &self
                .make_includepaths(&self.includepaths)
                .join(" "),
        )?;
        writer.variable("libpaths", &self.make_libpaths(&self.libpaths).join(" "))?;
        writer.newline()
    }
}

fn strings(flags: &[&str]) -> Vec<String> {
    flags.iter().map(|f| f.to_string()).collect()
}

/// Quote a path for MSVC-style arguments.
fn path_escape(path: &str) -> String {
    format!("\"{}\"", path.replace('"', "'"))
}

/// Absolute path of the running slipway binary, for self-invoking rules.
fn current_exe() -> String {
    std::env::current_exe()
        .map(|p| p.display().to_string())
        .unwrap_or_else(|_| "slipway".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_prefix_parsing() {
        assert_eq!("msvc".parse::<ToolchainKind>().unwrap(), ToolchainKind::Msvc);
        assert_eq!("ms".parse::<ToolchainKind>().unwrap(), ToolchainKind::Msvc);
        assert_eq!("gnu".parse::<ToolchainKind>().unwrap(), ToolchainKind::Gcc);
        assert_eq!("llvm".parse::<ToolchainKind>().unwrap(), ToolchainKind::Clang);
        assert_eq!(
            "clang-3.8".parse::<ToolchainKind>().unwrap(),
            ToolchainKind::Clang
        );
        assert!("tcc".parse::<ToolchainKind>().is_err());
    }

    #[test]
    fn test_default_kind_rules() {
        assert_eq!(
            ToolchainKind::default_for(Platform::Windows, Platform::Windows),
            ToolchainKind::Msvc
        );
        assert_eq!(
            ToolchainKind::default_for(Platform::Linux, Platform::Android),
            ToolchainKind::Gcc
        );
        assert_eq!(
            ToolchainKind::default_for(Platform::Linux, Platform::RaspberryPi),
            ToolchainKind::Gcc
        );
        assert_eq!(
            ToolchainKind::default_for(Platform::Linux, Platform::Linux),
            ToolchainKind::Clang
        );
        assert_eq!(
            ToolchainKind::default_for(Platform::MacOsx, Platform::Ios),
            ToolchainKind::Clang
        );
    }

    #[test]
    fn test_resolve_linux_clang_defaults() {
        let toolchain = Toolchain::resolve(
            Platform::Linux,
            Platform::Linux,
            ToolchainRequest {
                project: "foundation".to_string(),
                ..ToolchainRequest::default()
            },
        )
        .unwrap();

        assert_eq!(toolchain.kind(), ToolchainKind::Clang);
        assert_eq!(toolchain.configs(), &[BuildConfig::Release]);
        assert_eq!(toolchain.archs().len(), 1);
        assert_eq!(toolchain.cc, "clang");
        assert!(toolchain
            .cflags
            .contains(&"-DFOUNDATION_COMPILE=1".to_string()));
        assert!(toolchain.linkflags.contains(&"-pthread".to_string()));
        assert!(toolchain.extralibs().contains(&"dl".to_string()));
        assert_eq!(toolchain.libname("foundation"), "libfoundation.a");
        assert_eq!(toolchain.binname("uuidgen"), "uuidgen");
    }

    #[test]
    fn test_resolve_windows_msvc() {
        let toolchain = Toolchain::resolve(
            Platform::Windows,
            Platform::Windows,
            ToolchainRequest {
                project: "foundation".to_string(),
                ..ToolchainRequest::default()
            },
        )
        .unwrap();

        assert_eq!(toolchain.kind(), ToolchainKind::Msvc);
        assert_eq!(toolchain.archs(), &[Arch::X86, Arch::X86_64]);
        assert_eq!(toolchain.objext(), ".obj");
        assert_eq!(toolchain.libname("foundation"), "foundation.lib");
        assert_eq!(toolchain.binname("bin2hex"), "bin2hex.exe");
        assert_eq!(
            toolchain.make_libs(&["foundation".to_string()]),
            vec!["foundation.lib".to_string()]
        );
        assert!(toolchain.extralibs().contains(&"kernel32".to_string()));
    }

    #[test]
    fn test_explicit_overrides_take_precedence() {
        let toolchain = Toolchain::resolve(
            Platform::Linux,
            Platform::Linux,
            ToolchainRequest {
                project: "foundation".to_string(),
                overrides: Overrides {
                    cc: Some("clang-11".to_string()),
                    cflags: vec!["-fsanitize=address".to_string()],
                    ..Overrides::default()
                },
                ..ToolchainRequest::default()
            },
        )
        .unwrap();

        assert_eq!(toolchain.cc, "clang-11");
        // override flags land last, after every built-in flag
        assert_eq!(
            toolchain.cflags.last().unwrap(),
            "-fsanitize=address"
        );
    }

    #[test]
    fn test_apple_target_requires_xcode_env() {
        let err = Toolchain::resolve(
            Platform::Linux,
            Platform::Ios,
            ToolchainRequest {
                project: "foundation".to_string(),
                ..ToolchainRequest::default()
            },
        )
        .unwrap_err();
        assert!(err.to_string().contains("macosx host"));
    }

    #[test]
    fn test_shell_escape_quotes() {
        let toolchain = Toolchain::resolve(
            Platform::Linux,
            Platform::Linux,
            ToolchainRequest {
                project: "p".to_string(),
                ..ToolchainRequest::default()
            },
        )
        .unwrap();
        assert_eq!(toolchain.shell_escape("-DX=\"1\""), "'-DX=\"1\"'");
        assert_eq!(toolchain.shell_escape("-O2"), "-O2");
    }

    #[test]
    fn test_dependlib_paths() {
        let toolchain = Toolchain::resolve(
            Platform::Linux,
            Platform::Linux,
            ToolchainRequest {
                project: "network".to_string(),
                dependlibs: vec!["foundation".to_string()],
                ..ToolchainRequest::default()
            },
        )
        .unwrap();

        assert!(toolchain
            .includepaths
            .contains(&"../foundation_lib".to_string()));
        let libpaths = toolchain.build_libpaths(&[], toolchain.archs()[0], BuildConfig::Release);
        assert!(libpaths
            .iter()
            .any(|p| p.contains("foundation_lib/lib/linux/release")));
    }
}
