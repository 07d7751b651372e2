//! Xcode developer-tool resolution for Apple targets.
//!
//! Tools are located through `xcrun` against the target SDK (`macosx` or
//! `iphoneos`). Each resolved tool is stored as a full command prefix that
//! carries the platform `PATH`, matching how the emitted build file will
//! invoke it. A failing probe aborts the run with xcrun's own error.

use anyhow::{Context, Result};

use crate::core::platform::Platform;
use crate::util::prefs::ApplePrefs;
use crate::util::process::ProcessBuilder;

/// Default deployment targets baked into compile and packaging edges.
pub const MACOSX_DEPLOYMENT_TARGET: &str = "10.7";
pub const IPHONEOS_DEPLOYMENT_TARGET: &str = "6.0";

/// Resolved Apple build environment.
#[derive(Debug, Clone)]
pub struct XcodeEnv {
    /// SDK name passed to xcrun (`macosx` or `iphoneos`)
    pub sdk: String,
    /// SDK root directory, written as the `$sdkdir` variable
    pub sdkdir: String,
    /// Minimum OS version for compile and asset edges
    pub deploymenttarget: String,
    /// `NAME_DEPLOYMENT_TARGET=V` prefix applied to link commands
    pub deploytargetenv: String,
    pub cc: String,
    pub ar: String,
    pub lipo: String,
    pub plist: String,
    pub xcassets: String,
    pub xib: String,
    pub dsymutil: String,
    pub codesign: String,
    /// Bundle/signing settings from preferences
    pub organisation: String,
    pub bundleidentifier: String,
    pub provisioning: String,
}

impl XcodeEnv {
    /// Probe the developer tools for a target platform via xcrun.
    pub fn probe(target: Platform, prefs: &ApplePrefs) -> Result<XcodeEnv> {
        let (sdk, default_deploytarget, deployvar) = sdk_for(target);
        let deploymenttarget = prefs
            .deploymenttarget
            .clone()
            .unwrap_or_else(|| default_deploytarget.to_string());

        let platformpath = xcrun(&sdk, &["--show-sdk-platform-path"])?;
        let sdkdir = xcrun(&sdk, &["--show-sdk-path"])?;
        let localpath = format!(
            "{}/Developer/usr/bin:/Applications/Xcode.app/Contents/Developer/usr/bin:/usr/bin:/bin:/usr/sbin:/sbin",
            platformpath
        );

        let tool = |name: &str| -> Result<String> {
            let path = xcrun(&sdk, &["-f", name])?;
            Ok(format!("PATH={} {}", localpath, path))
        };

        Ok(XcodeEnv {
            sdk: sdk.clone(),
            sdkdir,
            deploytargetenv: format!("{}={}", deployvar, deploymenttarget),
            deploymenttarget,
            cc: tool("clang")?,
            ar: tool("libtool")?,
            lipo: tool("lipo")?,
            plist: tool("plutil")?,
            xcassets: tool("actool")?,
            xib: tool("ibtool")?,
            dsymutil: tool("dsymutil")?,
            codesign: tool("codesign")?,
            organisation: prefs.organisation.clone().unwrap_or_default(),
            bundleidentifier: prefs.bundleidentifier.clone().unwrap_or_default(),
            provisioning: prefs.provisioning.clone().unwrap_or_default(),
        })
    }

    /// Construct an environment from explicit tool paths, bypassing xcrun.
    /// Used when the preferences/environment supply every path up front.
    pub fn with_tools(
        target: Platform,
        sdkdir: impl Into<String>,
        tools: AppleTools,
        prefs: &ApplePrefs,
    ) -> XcodeEnv {
        let (sdk, default_deploytarget, deployvar) = sdk_for(target);
        let deploymenttarget = prefs
            .deploymenttarget
            .clone()
            .unwrap_or_else(|| default_deploytarget.to_string());

        XcodeEnv {
            sdk,
            sdkdir: sdkdir.into(),
            deploytargetenv: format!("{}={}", deployvar, deploymenttarget),
            deploymenttarget,
            cc: tools.cc,
            ar: tools.ar,
            lipo: tools.lipo,
            plist: tools.plist,
            xcassets: tools.xcassets,
            xib: tools.xib,
            dsymutil: tools.dsymutil,
            codesign: tools.codesign,
            organisation: prefs.organisation.clone().unwrap_or_default(),
            bundleidentifier: prefs.bundleidentifier.clone().unwrap_or_default(),
            provisioning: prefs.provisioning.clone().unwrap_or_default(),
        }
    }

    /// Expand the bundle identifier template for a binary name.
    ///
    /// The preferences value may contain `$(binname)`, mirroring Xcode's
    /// `$(PRODUCT_NAME)` substitution.
    pub fn make_bundleidentifier(&self, binname: &str) -> String {
        self.bundleidentifier.replace("$(binname)", binname)
    }

    /// Device targeting arguments for asset/interface compilation.
    pub fn target_device_args(&self) -> &'static str {
        if self.sdk == "iphoneos" {
            "--target-device iphone --target-device ipad"
        } else {
            "--target-device mac"
        }
    }
}

/// Explicit tool locations for [`XcodeEnv::with_tools`].
#[derive(Debug, Clone, Default)]
pub struct AppleTools {
    pub cc: String,
    pub ar: String,
    pub lipo: String,
    pub plist: String,
    pub xcassets: String,
    pub xib: String,
    pub dsymutil: String,
    pub codesign: String,
}

fn sdk_for(target: Platform) -> (String, &'static str, &'static str) {
    if target.is_ios() {
        (
            "iphoneos".to_string(),
            IPHONEOS_DEPLOYMENT_TARGET,
            "IPHONEOS_DEPLOYMENT_TARGET",
        )
    } else {
        (
            "macosx".to_string(),
            MACOSX_DEPLOYMENT_TARGET,
            "MACOSX_DEPLOYMENT_TARGET",
        )
    }
}

fn xcrun(sdk: &str, args: &[&str]) -> Result<String> {
    ProcessBuilder::new("xcrun")
        .args(["--sdk", sdk])
        .args(args)
        .exec_stdout()
        .with_context(|| format!("xcrun --sdk {} {} failed", sdk, args.join(" ")))
}
