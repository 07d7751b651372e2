//! CLI definitions using clap.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use clap_complete::Shell;

use slipway::core::arch::Arch;
use slipway::core::buildconfig::BuildConfig;
use slipway::core::platform::Platform;
use slipway::toolchain::ToolchainKind;

/// Slipway - A Ninja build-description generator for cross-platform C projects
#[derive(Parser)]
#[command(name = "slipway")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Resolve the toolchain and emit build.ninja
    Generate(GenerateArgs),

    /// Expand a plist template into a bundle Info.plist and PkgInfo
    Plist(PlistArgs),

    /// Aggregate gcov coverage and report or upload it
    Coverage(CoverageArgs),

    /// Stamp version.c from `git describe`
    Version(VersionArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

#[derive(Args)]
pub struct GenerateArgs {
    /// Target platform (windows/linux/macosx/ios/android/raspberrypi/pnacl/tizen/bsd)
    #[arg(long)]
    pub target: Option<Platform>,

    /// Host platform (defaults to the target)
    #[arg(long)]
    pub host: Option<Platform>,

    /// Toolchain (msvc/gcc/clang/intel)
    #[arg(long)]
    pub toolchain: Option<ToolchainKind>,

    /// Build configuration (debug/release/profile/deploy); repeatable
    #[arg(long = "config")]
    pub configs: Vec<BuildConfig>,

    /// Target architecture; repeatable
    #[arg(long = "arch")]
    pub archs: Vec<Arch>,

    /// Manifest path (defaults to Slipway.toml)
    #[arg(long)]
    pub manifest: Option<PathBuf>,

    /// Output build file
    #[arg(long, default_value = "build.ninja")]
    pub output: PathBuf,

    /// C compiler override
    #[arg(long, env = "CC")]
    pub cc: Option<String>,

    /// Archiver override
    #[arg(long, env = "AR")]
    pub ar: Option<String>,

    /// Linker override
    #[arg(long, env = "LINK")]
    pub link: Option<String>,

    /// Extra compiler flags
    #[arg(long, env = "CFLAGS", allow_hyphen_values = true)]
    pub cflags: Option<String>,

    /// Extra archiver flags
    #[arg(long, env = "ARFLAGS", allow_hyphen_values = true)]
    pub arflags: Option<String>,

    /// Extra linker flags
    #[arg(long, env = "LINKFLAGS", allow_hyphen_values = true)]
    pub linkflags: Option<String>,
}

#[derive(Args)]
pub struct PlistArgs {
    /// Input plists: the template first, then partial plists
    #[arg(required = true)]
    pub sources: Vec<PathBuf>,

    /// Executable name substituted for $(EXECUTABLE_NAME)
    #[arg(long)]
    pub exename: String,

    /// Product name substituted for $(PRODUCT_NAME)
    #[arg(long)]
    pub prodname: String,

    /// Bundle identifier override
    #[arg(long)]
    pub bundleidentifier: Option<String>,

    /// Target platform (ios/macosx)
    #[arg(long)]
    pub target: Platform,

    /// Minimum OS version
    #[arg(long)]
    pub deploymenttarget: Option<String>,

    /// Output path of the final Info.plist
    #[arg(long)]
    pub output: PathBuf,
}

#[derive(Args)]
pub struct CoverageArgs {
    /// Directory holding instrumented objects and counters
    #[arg(short, long)]
    pub objectdir: PathBuf,

    /// Directory holding the matching sources
    #[arg(short, long)]
    pub sourcedir: PathBuf,

    /// Merge in a previously saved report; repeatable
    #[arg(short, long = "merge")]
    pub merge: Vec<PathBuf>,

    /// Coverage service (codecov/coveralls)
    #[arg(long, default_value = "codecov")]
    pub service: String,

    /// Post results to the service instead of writing a report file
    #[arg(short, long)]
    pub post: bool,

    /// Report output path
    #[arg(long)]
    pub report: Option<PathBuf>,
}

#[derive(Args)]
pub struct VersionArgs {
    /// Directory to write version.c into
    #[arg(long, default_value = ".")]
    pub output: PathBuf,

    /// Project name (defaults to the manifest's project name)
    #[arg(long)]
    pub project: Option<String>,
}

#[derive(Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    pub shell: Shell,
}
