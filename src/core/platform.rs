//! Target/host platform classification.
//!
//! Free-form platform strings (`linux-gnu`, `darwin14`, `win32`, ...) are
//! normalized to a closed set of canonical tags by prefix match, the same
//! way `uname`-style identifiers are usually handled. Normalization is
//! idempotent: feeding a canonical tag back in returns the same tag.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error returned for a platform string outside the supported set.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown platform `{0}`")]
pub struct UnknownPlatform(pub String);

/// A canonical target or host platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Windows,
    Linux,
    MacOsx,
    Ios,
    Android,
    RaspberryPi,
    Pnacl,
    Tizen,
    Bsd,
}

impl Platform {
    /// All supported platforms, in declaration order.
    pub const ALL: [Platform; 9] = [
        Platform::Windows,
        Platform::Linux,
        Platform::MacOsx,
        Platform::Ios,
        Platform::Android,
        Platform::RaspberryPi,
        Platform::Pnacl,
        Platform::Tizen,
        Platform::Bsd,
    ];

    /// The canonical tag for this platform.
    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::Windows => "windows",
            Platform::Linux => "linux",
            Platform::MacOsx => "macosx",
            Platform::Ios => "ios",
            Platform::Android => "android",
            Platform::RaspberryPi => "raspberrypi",
            Platform::Pnacl => "pnacl",
            Platform::Tizen => "tizen",
            Platform::Bsd => "bsd",
        }
    }

    /// Detect the platform slipway itself is running on.
    pub fn host() -> Platform {
        match std::env::consts::OS {
            "windows" => Platform::Windows,
            "macos" => Platform::MacOsx,
            "ios" => Platform::Ios,
            "android" => Platform::Android,
            "freebsd" | "netbsd" | "openbsd" | "dragonfly" => Platform::Bsd,
            _ => Platform::Linux,
        }
    }

    pub fn is_windows(&self) -> bool {
        *self == Platform::Windows
    }

    pub fn is_linux(&self) -> bool {
        *self == Platform::Linux
    }

    pub fn is_macosx(&self) -> bool {
        *self == Platform::MacOsx
    }

    pub fn is_ios(&self) -> bool {
        *self == Platform::Ios
    }

    pub fn is_android(&self) -> bool {
        *self == Platform::Android
    }

    pub fn is_raspberrypi(&self) -> bool {
        *self == Platform::RaspberryPi
    }

    pub fn is_pnacl(&self) -> bool {
        *self == Platform::Pnacl
    }

    pub fn is_tizen(&self) -> bool {
        *self == Platform::Tizen
    }

    pub fn is_bsd(&self) -> bool {
        *self == Platform::Bsd
    }

    /// True for macosx and ios, which share the Apple toolchain quirks
    /// (universal binaries, bundles, xcrun-resolved tools).
    pub fn is_apple(&self) -> bool {
        self.is_macosx() || self.is_ios()
    }
}

impl FromStr for Platform {
    type Err = UnknownPlatform;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.to_ascii_lowercase();
        let platform = if lower.starts_with("linux") {
            Platform::Linux
        } else if lower.starts_with("darwin") || lower.starts_with("macos") {
            Platform::MacOsx
        } else if lower.starts_with("win") {
            Platform::Windows
        } else if lower.starts_with("ios") {
            Platform::Ios
        } else if lower.starts_with("android") {
            Platform::Android
        } else if lower.starts_with("raspberry") {
            Platform::RaspberryPi
        } else if lower.starts_with("pnacl") {
            Platform::Pnacl
        } else if lower.starts_with("tizen") {
            Platform::Tizen
        } else if lower.starts_with("bsd")
            || lower.starts_with("freebsd")
            || lower.starts_with("netbsd")
            || lower.starts_with("openbsd")
            || lower.starts_with("dragonfly")
        {
            Platform::Bsd
        } else {
            return Err(UnknownPlatform(s.to_string()));
        };
        Ok(platform)
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prefix_normalization() {
        assert_eq!("linux-gnu".parse::<Platform>().unwrap(), Platform::Linux);
        assert_eq!("linux2".parse::<Platform>().unwrap(), Platform::Linux);
        assert_eq!("darwin14".parse::<Platform>().unwrap(), Platform::MacOsx);
        assert_eq!("macosx".parse::<Platform>().unwrap(), Platform::MacOsx);
        assert_eq!("win32".parse::<Platform>().unwrap(), Platform::Windows);
        assert_eq!("windows".parse::<Platform>().unwrap(), Platform::Windows);
        assert_eq!("ios8".parse::<Platform>().unwrap(), Platform::Ios);
        assert_eq!("android-21".parse::<Platform>().unwrap(), Platform::Android);
        assert_eq!(
            "raspberrypi".parse::<Platform>().unwrap(),
            Platform::RaspberryPi
        );
        assert_eq!("pnacl".parse::<Platform>().unwrap(), Platform::Pnacl);
        assert_eq!("tizen-2.4".parse::<Platform>().unwrap(), Platform::Tizen);
        assert_eq!("freebsd10".parse::<Platform>().unwrap(), Platform::Bsd);
    }

    #[test]
    fn test_normalization_is_idempotent() {
        for platform in Platform::ALL {
            let reparsed = platform.as_str().parse::<Platform>().unwrap();
            assert_eq!(reparsed, platform);
        }
    }

    #[test]
    fn test_unknown_platform_rejected() {
        let err = "solaris".parse::<Platform>().unwrap_err();
        assert_eq!(err, UnknownPlatform("solaris".to_string()));
    }

    #[test]
    fn test_version_suffix_ignored() {
        // Trailing version noise never changes the canonical tag
        assert_eq!(
            "linux".parse::<Platform>().unwrap(),
            "linux-4.4.0-armv7".parse::<Platform>().unwrap()
        );
        assert_eq!(
            "darwin".parse::<Platform>().unwrap(),
            "darwin15.2.0".parse::<Platform>().unwrap()
        );
    }
}
