//! Build configurations.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error returned for a configuration string outside the supported set.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown build config `{0}`")]
pub struct UnknownConfig(pub String);

/// A build configuration.
///
/// Configurations select optimization level, debug information, and the
/// `BUILD_*` define baked into every compile edge. `Deploy` additionally
/// switches the Android packaging pipeline to release-mode asset crunching
/// and enables code signing on Apple targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BuildConfig {
    Debug,
    Release,
    Profile,
    Deploy,
}

impl BuildConfig {
    /// All supported configurations, in declaration order.
    pub const ALL: [BuildConfig; 4] = [
        BuildConfig::Debug,
        BuildConfig::Release,
        BuildConfig::Profile,
        BuildConfig::Deploy,
    ];

    /// The canonical tag for this configuration, as used in output paths.
    pub fn as_str(&self) -> &'static str {
        match self {
            BuildConfig::Debug => "debug",
            BuildConfig::Release => "release",
            BuildConfig::Profile => "profile",
            BuildConfig::Deploy => "deploy",
        }
    }

    /// The `BUILD_*` define for this configuration.
    pub fn define(&self) -> &'static str {
        match self {
            BuildConfig::Debug => "BUILD_DEBUG=1",
            BuildConfig::Release => "BUILD_RELEASE=1",
            BuildConfig::Profile => "BUILD_PROFILE=1",
            BuildConfig::Deploy => "BUILD_DEPLOY=1",
        }
    }
}

impl Default for BuildConfig {
    fn default() -> Self {
        BuildConfig::Release
    }
}

impl FromStr for BuildConfig {
    type Err = UnknownConfig;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        BuildConfig::ALL
            .iter()
            .find(|config| config.as_str() == s)
            .copied()
            .ok_or_else(|| UnknownConfig(s.to_string()))
    }
}

impl fmt::Display for BuildConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_release() {
        assert_eq!(BuildConfig::default(), BuildConfig::Release);
    }

    #[test]
    fn test_roundtrip() {
        for config in BuildConfig::ALL {
            assert_eq!(config.as_str().parse::<BuildConfig>().unwrap(), config);
        }
    }

    #[test]
    fn test_unknown_config_rejected() {
        assert!("relwithdebinfo".parse::<BuildConfig>().is_err());
    }
}
