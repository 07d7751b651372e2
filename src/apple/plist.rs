//! Info.plist template processing.
//!
//! Expands an Xcode-style property-list template into the final bundle
//! `Info.plist` plus the `PkgInfo` sentinel file: variable substitution,
//! build-machine stamping, platform/device-family declarations and icon
//! and launch-image tables, all by line insertion into the XML template.
//! The binary-plist conversion (`plutil`) and the build-version probe
//! (`sw_vers`) are external steps driven by the CLI command.
//!
//! A template missing `CFBundlePackageType` or `CFBundleSignature` is not
//! an error; the `APPL`/`????` sentinels are used instead.

use regex::Regex;

use crate::core::platform::Platform;

/// Settings for one plist expansion.
#[derive(Debug, Clone)]
pub struct PlistOptions {
    /// Value substituted for `$(EXECUTABLE_NAME)`
    pub exename: String,
    /// Value substituted for `$(PRODUCT_NAME)`
    pub prodname: String,
    /// Bundle identifier override; None keeps the template value
    pub bundleidentifier: Option<String>,
    /// Target platform (selects iphoneos/macosx declarations)
    pub target: Platform,
    /// Minimum OS version written into the plist
    pub deploymenttarget: String,
}

/// Result of a plist expansion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlistOutput {
    /// Final Info.plist XML
    pub plist: String,
    /// Eight-byte `PkgInfo` content (package type + signature)
    pub pkginfo: String,
}

fn key_value(source: &str, key: &str) -> Option<String> {
    let regex = Regex::new(&format!(
        r"<key>{}</key>\s*<string>([^<]*)</string>",
        regex::escape(key)
    ))
    .unwrap();
    regex
        .captures(source)
        .map(|captures| captures[1].to_string())
}

/// Convert a product name to an RFC 1034 identifier the way Xcode's
/// `$(PRODUCT_NAME:rfc1034identifier)` does: every character outside
/// `[A-Za-z0-9-]` becomes a hyphen.
fn rfc1034identifier(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' { c } else { '-' })
        .collect()
}

/// Expand a plist template.
///
/// `build_version` is the host OS build stamp (`sw_vers -buildVersion`),
/// threaded in by the caller so the transformation itself stays pure.
pub fn transform(source: &str, opts: &PlistOptions, build_version: &str) -> PlistOutput {
    // PkgInfo falls back to the classic sentinels when keys are absent
    let package_type = key_value(source, "CFBundlePackageType").unwrap_or_else(|| "APPL".to_string());
    let signature = key_value(source, "CFBundleSignature").unwrap_or_else(|| "????".to_string());
    let pkginfo = format!("{}{}", package_type, signature);

    let substituted = source
        .replace("$(EXECUTABLE_NAME)", &opts.exename)
        .replace(
            "$(PRODUCT_NAME:rfc1034identifier)",
            &rfc1034identifier(&opts.prodname),
        )
        .replace("$(PRODUCT_NAME)", &opts.prodname);

    let mut lines: Vec<String> = substituted.lines().map(|line| line.to_string()).collect();

    if let Some(identifier) = &opts.bundleidentifier {
        replace_key_value(&mut lines, "CFBundleIdentifier", identifier);
    }

    // Build-machine stamp goes right after the opening dict
    if let Some(at) = lines.iter().position(|line| line.trim() == "<dict>") {
        lines.insert(at + 1, "\t<key>BuildMachineOSBuild</key>".to_string());
        lines.insert(at + 2, format!("\t<string>{}</string>", build_version));
    }

    // Platform, minimum version and device families go before the
    // closing dict
    if let Some(at) = lines.iter().rposition(|line| line.trim() == "</dict>") {
        let mut inserted = Vec::new();
        inserted.push("\t<key>CFBundleSupportedPlatforms</key>".to_string());
        inserted.push("\t<array>".to_string());
        if opts.target.is_ios() {
            inserted.push("\t\t<string>iPhoneOS</string>".to_string());
        } else {
            inserted.push("\t\t<string>MacOSX</string>".to_string());
        }
        inserted.push("\t</array>".to_string());

        if opts.target.is_ios() {
            inserted.push("\t<key>MinimumOSVersion</key>".to_string());
            inserted.push(format!("\t<string>{}</string>", opts.deploymenttarget));
            inserted.push("\t<key>UIDeviceFamily</key>".to_string());
            inserted.push("\t<array>".to_string());
            inserted.push("\t\t<integer>1</integer>".to_string());
            inserted.push("\t\t<integer>2</integer>".to_string());
            inserted.push("\t</array>".to_string());
            inserted.extend(icon_declarations());
            inserted.extend(launch_image_declarations());
        } else {
            inserted.push("\t<key>LSMinimumSystemVersion</key>".to_string());
            inserted.push(format!("\t<string>{}</string>", opts.deploymenttarget));
        }

        for (offset, line) in inserted.into_iter().enumerate() {
            lines.insert(at + offset, line);
        }
    }

    let mut plist = lines.join("\n");
    plist.push('\n');
    PlistOutput { plist, pkginfo }
}

/// Merge the body of partial plists (produced by asset and interface
/// compilation) into the main template before expansion.
pub fn merge_partials(source: &str, partials: &[String]) -> String {
    let mut lines: Vec<String> = source.lines().map(|line| line.to_string()).collect();
    let Some(at) = lines.iter().rposition(|line| line.trim() == "</dict>") else {
        return source.to_string();
    };

    let mut inserted = Vec::new();
    for partial in partials {
        let partial_lines: Vec<&str> = partial.lines().collect();
        let start = partial_lines.iter().position(|line| line.trim() == "<dict>");
        let end = partial_lines.iter().rposition(|line| line.trim() == "</dict>");
        if let (Some(start), Some(end)) = (start, end) {
            if start + 1 < end {
                inserted.extend(
                    partial_lines[start + 1..end]
                        .iter()
                        .map(|line| line.to_string()),
                );
            }
        }
    }

    for (offset, line) in inserted.into_iter().enumerate() {
        lines.insert(at + offset, line);
    }
    let mut merged = lines.join("\n");
    merged.push('\n');
    merged
}

fn replace_key_value(lines: &mut [String], key: &str, value: &str) {
    let needle = format!("<key>{}</key>", key);
    for index in 0..lines.len() {
        if lines[index].contains(&needle) {
            if let Some(next) = lines.get_mut(index + 1) {
                if next.contains("<string>") {
                    let indent: String =
                        next.chars().take_while(|c| c.is_whitespace()).collect();
                    *next = format!("{}<string>{}</string>", indent, value);
                }
            }
            return;
        }
    }
}

fn icon_declarations() -> Vec<String> {
    let block = r#"	<key>CFBundleIcons</key>
	<dict>
		<key>CFBundlePrimaryIcon</key>
		<dict>
			<key>CFBundleIconFiles</key>
			<array>
				<string>AppIcon29x29</string>
				<string>AppIcon40x40</string>
				<string>AppIcon57x57</string>
				<string>AppIcon60x60</string>
			</array>
		</dict>
	</dict>
	<key>CFBundleIcons~ipad</key>
	<dict>
		<key>CFBundlePrimaryIcon</key>
		<dict>
			<key>CFBundleIconFiles</key>
			<array>
				<string>AppIcon29x29</string>
				<string>AppIcon40x40</string>
				<string>AppIcon57x57</string>
				<string>AppIcon60x60</string>
				<string>AppIcon50x50</string>
				<string>AppIcon72x72</string>
				<string>AppIcon76x76</string>
			</array>
		</dict>
	</dict>"#;
    block.lines().map(|line| line.to_string()).collect()
}

fn launch_image_declarations() -> Vec<String> {
    let mut lines = vec![
        "\t<key>UILaunchImageFile</key>".to_string(),
        "\t<string>LaunchImage</string>".to_string(),
        "\t<key>UILaunchImages</key>".to_string(),
        "\t<array>".to_string(),
    ];
    let images = [
        ("LaunchImage-700", "Portrait", "{320, 480}"),
        ("LaunchImage-700-568h", "Portrait", "{320, 568}"),
        ("LaunchImage-700-Portrait", "Portrait", "{768, 1024}"),
        ("LaunchImage-700-Landscape", "Landscape", "{768, 1024}"),
    ];
    for (name, orientation, size) in images {
        lines.push("\t\t<dict>".to_string());
        lines.push("\t\t\t<key>UILaunchImageMinimumOSVersion</key>".to_string());
        lines.push("\t\t\t<string>7.0</string>".to_string());
        lines.push("\t\t\t<key>UILaunchImageName</key>".to_string());
        lines.push(format!("\t\t\t<string>{}</string>", name));
        lines.push("\t\t\t<key>UILaunchImageOrientation</key>".to_string());
        lines.push(format!("\t\t\t<string>{}</string>", orientation));
        lines.push("\t\t\t<key>UILaunchImageSize</key>".to_string());
        lines.push(format!("\t\t\t<string>{}</string>", size));
        lines.push("\t\t</dict>".to_string());
    }
    lines.push("\t</array>".to_string());
    lines
}

#[cfg(test)]
mod tests {
    use super::*;

    const TEMPLATE: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<!DOCTYPE plist PUBLIC "-//Apple//DTD PLIST 1.0//EN" "http://www.apple.com/DTDs/PropertyList-1.0.dtd">
<plist version="1.0">
<dict>
	<key>CFBundleExecutable</key>
	<string>$(EXECUTABLE_NAME)</string>
	<key>CFBundleIdentifier</key>
	<string>com.example.template</string>
	<key>CFBundleName</key>
	<string>$(PRODUCT_NAME)</string>
	<key>CFBundlePackageType</key>
	<string>APPL</string>
	<key>CFBundleSignature</key>
	<string>FNDT</string>
</dict>
</plist>
"#;

    fn opts() -> PlistOptions {
        PlistOptions {
            exename: "test-all".to_string(),
            prodname: "test all".to_string(),
            bundleidentifier: Some("com.example.test-all".to_string()),
            target: Platform::Ios,
            deploymenttarget: "6.0".to_string(),
        }
    }

    #[test]
    fn test_substitution_and_pkginfo() {
        let output = transform(TEMPLATE, &opts(), "14B25");
        assert!(output.plist.contains("<string>test-all</string>"));
        assert!(output.plist.contains("<string>test all</string>"));
        assert!(!output.plist.contains("$(EXECUTABLE_NAME)"));
        assert_eq!(output.pkginfo, "APPLFNDT");
    }

    #[test]
    fn test_missing_keys_fall_back_to_sentinels() {
        // No package type or signature: silently defaulted, never an error
        let source = "<dict>\n\t<key>CFBundleName</key>\n\t<string>x</string>\n</dict>\n";
        let output = transform(source, &opts(), "14B25");
        assert_eq!(output.pkginfo, "APPL????");
    }

    #[test]
    fn test_build_machine_stamp_inserted() {
        let output = transform(TEMPLATE, &opts(), "14B25");
        let stamp = output
            .plist
            .find("<key>BuildMachineOSBuild</key>")
            .unwrap();
        let dict = output.plist.find("<dict>").unwrap();
        assert!(stamp > dict);
        assert!(output.plist.contains("<string>14B25</string>"));
    }

    #[test]
    fn test_ios_declarations() {
        let output = transform(TEMPLATE, &opts(), "14B25");
        assert!(output.plist.contains("<string>iPhoneOS</string>"));
        assert!(output.plist.contains("<key>MinimumOSVersion</key>"));
        assert!(output.plist.contains("<key>UIDeviceFamily</key>"));
        assert!(output.plist.contains("AppIcon76x76"));
        assert!(output.plist.contains("LaunchImage-700-568h"));
    }

    #[test]
    fn test_macosx_declarations() {
        let macopts = PlistOptions {
            target: Platform::MacOsx,
            deploymenttarget: "10.7".to_string(),
            ..opts()
        };
        let output = transform(TEMPLATE, &macopts, "14B25");
        assert!(output.plist.contains("<string>MacOSX</string>"));
        assert!(output.plist.contains("<key>LSMinimumSystemVersion</key>"));
        assert!(!output.plist.contains("UIDeviceFamily"));
    }

    #[test]
    fn test_bundleidentifier_override() {
        let output = transform(TEMPLATE, &opts(), "14B25");
        assert!(output.plist.contains("<string>com.example.test-all</string>"));
        assert!(!output.plist.contains("com.example.template"));
    }

    #[test]
    fn test_rfc1034_identifier() {
        assert_eq!(rfc1034identifier("test all"), "test-all");
        assert_eq!(rfc1034identifier("Test_App.2"), "Test-App-2");
    }

    #[test]
    fn test_merge_partials() {
        let partial = "<plist version=\"1.0\">\n<dict>\n\t<key>DTPlatformName</key>\n\t<string>iphoneos</string>\n</dict>\n</plist>\n"
            .to_string();
        let merged = merge_partials(TEMPLATE, &[partial]);
        assert!(merged.contains("<key>DTPlatformName</key>"));
        // merged content lands inside the main dict
        let key = merged.find("DTPlatformName").unwrap();
        let closing = merged.rfind("</dict>").unwrap();
        assert!(key < closing);
    }
}
