//! Target instruction-set architectures.

use std::fmt;
use std::str::FromStr;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::core::platform::Platform;
use crate::util::process::ProcessBuilder;

/// Error returned for an architecture string outside the supported set.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown architecture `{0}`")]
pub struct UnknownArch(pub String);

/// A target instruction-set architecture.
///
/// `Generic` is used for architecture-neutral outputs (PNaCl bitcode).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Arch {
    #[serde(rename = "x86")]
    X86,
    #[serde(rename = "x86-64")]
    X86_64,
    #[serde(rename = "ppc")]
    Ppc,
    #[serde(rename = "ppc64")]
    Ppc64,
    #[serde(rename = "arm6")]
    Arm6,
    #[serde(rename = "arm7")]
    Arm7,
    #[serde(rename = "arm64")]
    Arm64,
    #[serde(rename = "mips")]
    Mips,
    #[serde(rename = "mips64")]
    Mips64,
    #[serde(rename = "generic")]
    Generic,
}

impl Arch {
    /// All supported architectures, in declaration order.
    pub const ALL: [Arch; 10] = [
        Arch::X86,
        Arch::X86_64,
        Arch::Ppc,
        Arch::Ppc64,
        Arch::Arm6,
        Arch::Arm7,
        Arch::Arm64,
        Arch::Mips,
        Arch::Mips64,
        Arch::Generic,
    ];

    /// The canonical tag for this architecture, as used in output paths.
    pub fn as_str(&self) -> &'static str {
        match self {
            Arch::X86 => "x86",
            Arch::X86_64 => "x86-64",
            Arch::Ppc => "ppc",
            Arch::Ppc64 => "ppc64",
            Arch::Arm6 => "arm6",
            Arch::Arm7 => "arm7",
            Arch::Arm64 => "arm64",
            Arch::Mips => "mips",
            Arch::Mips64 => "mips64",
            Arch::Generic => "generic",
        }
    }

    /// True for the 64-bit architectures that use split `lib64` sysroot
    /// directories on Android.
    pub fn is_64bit(&self) -> bool {
        matches!(
            self,
            Arch::X86_64 | Arch::Ppc64 | Arch::Arm64 | Arch::Mips64
        )
    }

    /// Default architecture list for a target platform.
    ///
    /// Linux and BSD probe the running machine via `uname -m`; everything
    /// else has a fixed deploy-relevant set. The returned list is never
    /// empty.
    pub fn defaults_for(target: Platform) -> Result<Vec<Arch>> {
        let archs = match target {
            Platform::Windows => vec![Arch::X86, Arch::X86_64],
            Platform::Linux | Platform::Bsd => vec![Self::native()?],
            Platform::MacOsx => vec![Arch::X86_64],
            Platform::Ios => vec![Arch::Arm7, Arch::Arm64],
            Platform::Android => vec![
                Arch::Arm6,
                Arch::Arm7,
                Arch::Arm64,
                Arch::Mips,
                Arch::Mips64,
                Arch::X86,
                Arch::X86_64,
            ],
            Platform::RaspberryPi => vec![Arch::Arm6],
            Platform::Tizen => vec![Arch::X86, Arch::Arm7],
            Platform::Pnacl => vec![Arch::Generic],
        };
        Ok(archs)
    }

    /// Probe the native architecture via `uname -m`.
    fn native() -> Result<Arch> {
        let output = ProcessBuilder::new("uname")
            .arg("-m")
            .exec_and_check()
            .context("failed to probe native architecture")?;
        let machine = String::from_utf8_lossy(&output.stdout).trim().to_string();
        Ok(Self::from_uname(&machine))
    }

    /// Map a `uname -m` machine string to an architecture tag.
    pub fn from_uname(machine: &str) -> Arch {
        match machine {
            "x86_64" | "amd64" => Arch::X86_64,
            "i386" | "i486" | "i586" | "i686" => Arch::X86,
            "aarch64" | "arm64" => Arch::Arm64,
            "armv6l" => Arch::Arm6,
            "armv7l" => Arch::Arm7,
            "ppc" => Arch::Ppc,
            "ppc64" | "ppc64le" => Arch::Ppc64,
            "mips" => Arch::Mips,
            "mips64" => Arch::Mips64,
            _ => Arch::Generic,
        }
    }
}

impl FromStr for Arch {
    type Err = UnknownArch;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Arch::ALL
            .iter()
            .find(|arch| arch.as_str() == s)
            .copied()
            .ok_or_else(|| UnknownArch(s.to_string()))
    }
}

impl fmt::Display for Arch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
