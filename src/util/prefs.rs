//! Preferences file support (`build.json`).
//!
//! Slipway consults a JSON preferences file for per-platform SDK paths and
//! signing credentials. Layering is uniform, lowest to highest priority:
//! built-in defaults, preferences file, environment variables, CLI flags.

use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Canonical preferences file name.
pub const PREFS_NAME: &str = "build.json";

/// Per-platform preferences.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Prefs {
    /// Android NDK/SDK locations and signing credentials
    pub android: AndroidPrefs,

    /// iOS bundle and signing settings
    pub ios: ApplePrefs,

    /// macOS bundle and signing settings
    pub macosx: ApplePrefs,

    /// Tizen SDK location and signing profile
    pub tizen: TizenPrefs,

    /// PNaCl SDK location
    pub pnacl: PnaclPrefs,
}

/// Android NDK/SDK locations and signing credentials.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AndroidPrefs {
    pub ndkpath: Option<String>,
    pub sdkpath: Option<String>,
    pub platformversion: Option<String>,
    pub keystore: Option<String>,
    pub keyalias: Option<String>,
    pub keystorepass: Option<String>,
    pub keypass: Option<String>,
}

/// Apple (iOS/macOS) bundle and signing settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ApplePrefs {
    pub organisation: Option<String>,
    pub bundleidentifier: Option<String>,
    pub provisioning: Option<String>,
    pub deploymenttarget: Option<String>,
}

/// Tizen SDK location and signing profile.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TizenPrefs {
    pub sdkpath: Option<String>,
    pub profile: Option<String>,
}

/// PNaCl SDK location.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PnaclPrefs {
    pub sdkpath: Option<String>,
}

impl Prefs {
    /// Load preferences from a file.
    pub fn load(path: &Path) -> Result<Prefs> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read preferences: {}", path.display()))?;

        serde_json::from_str(&contents)
            .with_context(|| format!("failed to parse preferences: {}", path.display()))
    }

    /// Load preferences with fallback to defaults if the file doesn't exist.
    pub fn load_or_default(path: &Path) -> Prefs {
        if path.exists() {
            Self::load(path).unwrap_or_else(|e| {
                tracing::warn!("Failed to load preferences from {}: {}", path.display(), e);
                Prefs::default()
            })
        } else {
            Prefs::default()
        }
    }

    /// Overlay environment variables on top of the file contents.
    ///
    /// Environment always wins over the file; CLI flags are applied later
    /// by the caller and win over both.
    pub fn apply_env(&mut self) {
        overlay(&mut self.android.ndkpath, &["ANDROID_NDKPATH", "ANDROID_NDK"]);
        overlay(&mut self.android.sdkpath, &["ANDROID_SDKPATH", "ANDROID_HOME"]);
        overlay(&mut self.android.keystore, &["KEYSTORE"]);
        overlay(&mut self.android.keyalias, &["KEYALIAS"]);
        overlay(&mut self.android.keystorepass, &["KEYSTOREPASS"]);
        overlay(&mut self.android.keypass, &["KEYPASS"]);

        overlay(&mut self.ios.organisation, &["ORGANISATION"]);
        overlay(&mut self.ios.bundleidentifier, &["BUNDLEIDENTIFIER"]);
        overlay(&mut self.ios.provisioning, &["PROVISIONING"]);
        overlay(
            &mut self.ios.deploymenttarget,
            &["IPHONEOS_DEPLOYMENT_TARGET"],
        );

        overlay(&mut self.macosx.organisation, &["ORGANISATION"]);
        overlay(&mut self.macosx.bundleidentifier, &["BUNDLEIDENTIFIER"]);
        overlay(&mut self.macosx.provisioning, &["PROVISIONING"]);
        overlay(
            &mut self.macosx.deploymenttarget,
            &["MACOSX_DEPLOYMENT_TARGET"],
        );

        overlay(&mut self.tizen.sdkpath, &["TIZEN_SDKPATH", "TIZEN_SDK"]);
        overlay(&mut self.tizen.profile, &["TIZEN_PROFILE"]);

        overlay(&mut self.pnacl.sdkpath, &["PNACL_SDKPATH", "NACL_SDK_ROOT"]);
    }
}

/// Replace `slot` with the first set environment variable from `keys`.
fn overlay(slot: &mut Option<String>, keys: &[&str]) {
    for key in keys {
        if let Ok(value) = std::env::var(key) {
            if !value.is_empty() {
                *slot = Some(value);
                return;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_prefs() {
        let prefs: Prefs = serde_json::from_str(
            r#"{
                "android": { "ndkpath": "/opt/ndk", "keystore": "release.keystore" },
                "ios": { "organisation": "Example Org", "bundleidentifier": "com.example.$(binname)" },
                "tizen": { "sdkpath": "/opt/tizen" }
            }"#,
        )
        .unwrap();

        assert_eq!(prefs.android.ndkpath.as_deref(), Some("/opt/ndk"));
        assert_eq!(prefs.ios.organisation.as_deref(), Some("Example Org"));
        assert_eq!(prefs.tizen.sdkpath.as_deref(), Some("/opt/tizen"));
        assert!(prefs.macosx.provisioning.is_none());
    }

    #[test]
    fn test_missing_file_defaults() {
        let prefs = Prefs::load_or_default(Path::new("/nonexistent/build.json"));
        assert!(prefs.android.ndkpath.is_none());
    }
}
