//! Build-graph emission.
//!
//! The [`Generator`] walks the manifest targets and writes compile,
//! archive, link and packaging edges to a Ninja file through the
//! [`ninja::NinjaWriter`]. Edges are emitted in dependency order and
//! implicit dependencies are threaded so the downstream Ninja run can
//! parallelize safely; no in-memory graph is kept beyond emission.
//!
//! Output-path layout follows the `<root>/<target>/<config>/<arch>`
//! convention throughout, with Apple universal artifacts collapsing the
//! arch level after the merge step.

use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};

use crate::core::arch::Arch;
use crate::core::buildconfig::BuildConfig;
use crate::core::manifest::{AppTarget, BinTarget, LibTarget, Manifest};
use crate::toolchain::{AndroidEnv, Toolchain};

pub mod ninja;

use ninja::{Build, NinjaWriter};

/// Outputs of a built target, keyed by configuration.
pub type BuiltOutputs = BTreeMap<BuildConfig, Vec<String>>;

/// Ninja build-file emitter for one resolved toolchain.
pub struct Generator<W: Write> {
    toolchain: Toolchain,
    writer: NinjaWriter<W>,
    built_libs: BTreeMap<String, BuiltOutputs>,
}

impl<W: Write> Generator<W> {
    /// Create a generator writing to `out`.
    pub fn new(toolchain: Toolchain, out: W) -> Generator<W> {
        Generator {
            toolchain,
            writer: NinjaWriter::new(out),
            built_libs: BTreeMap::new(),
        }
    }

    pub fn toolchain(&self) -> &Toolchain {
        &self.toolchain
    }

    /// Consume the generator, returning the underlying stream.
    pub fn into_inner(self) -> W {
        self.writer.into_inner()
    }

    /// Write the file preamble: required version, the arguments this file
    /// was configured with, and the toolchain variables and rules.
    pub fn write_header(&mut self, configure_args: &[String]) -> Result<()> {
        self.writer.variable("ninja_required_version", "1.3")?;
        self.writer.newline()?;

        self.writer.comment("configure arguments")?;
        self.writer
            .variable("configure_args", &configure_args.join(" "))?;
        self.writer.newline()?;

        self.writer.comment("configure options")?;
        self.writer
            .variable("configure_target", self.toolchain.target().as_str())?;
        self.writer
            .variable("configure_host", self.toolchain.host().as_str())?;
        self.writer
            .variable("configure_toolchain", self.toolchain.kind().as_str())?;
        self.writer.newline()?;

        let toolchain = self.toolchain.clone();
        toolchain.write_variables(&mut self.writer)?;
        toolchain.write_rules(&mut self.writer)?;
        Ok(())
    }

    /// Emit every target declared in a manifest, in declaration order.
    pub fn emit_manifest(&mut self, manifest: &Manifest) -> Result<()> {
        for lib in &manifest.libs {
            self.writer
                .comment(&format!("{} library", lib.module))?;
            self.lib(lib)?;
        }
        for bin in &manifest.bins {
            self.writer.comment(&format!("{} tool", bin.module))?;
            self.bin(bin)?;
        }
        for app in &manifest.apps {
            let name = app.binname.as_deref().unwrap_or(&app.module);
            self.writer.comment(&format!("{} application", name))?;
            self.app(app)?;
        }
        Ok(())
    }

    /// Emit compile and archive edges for a static library target.
    ///
    /// One compile edge per (config, arch, source), one archive edge per
    /// (config, arch); on Apple targets the per-arch archives are merged
    /// into one universal library per config.
    pub fn lib(&mut self, lib: &LibTarget) -> Result<BuiltOutputs> {
        let toolchain = self.toolchain.clone();
        let basepath = lib.basepath.clone().unwrap_or_default();
        let configs = self.target_configs(&lib.configs);
        let mut built = BuiltOutputs::new();

        for config in configs {
            let cconfigflags = toolchain.cconfigflags(config);
            let mut archlibs = Vec::new();

            for &arch in toolchain.archs() {
                let buildpath = arch_path(toolchain.buildpath(), config, arch);
                let libpath = arch_path(toolchain.libpath(), config, arch);

                let mut variables = vec![
                    ("carchflags".to_string(), toolchain.carchflags(arch)),
                    ("cconfigflags".to_string(), cconfigflags.clone()),
                ];
                let mut arvariables = vec![
                    ("ararchflags".to_string(), toolchain.ararchflags(arch)),
                    ("arconfigflags".to_string(), toolchain.arconfigflags(config)),
                ];
                self.per_arch_variables(
                    arch,
                    &buildpath,
                    &basepath,
                    &lib.module,
                    &mut variables,
                    Some(&mut arvariables),
                );
                self.more_includepaths(arch, &lib.includepaths, &mut variables);

                let objs = self.compile_sources(
                    &basepath,
                    &lib.module,
                    &lib.sources,
                    &buildpath,
                    &variables,
                )?;

                let archive = path_string(&libpath.join(toolchain.libname(&lib.module)));
                let mut edge = Build::new(archive, "ar").inputs(objs);
                edge.variables = arvariables;
                archlibs.extend(self.writer.build(&edge)?);
            }

            if toolchain.target().is_apple() {
                self.writer.newline()?;
                self.writer.comment("Make universal library")?;
                let output = path_string(
                    &toolchain
                        .libpath()
                        .join(config.as_str())
                        .join(toolchain.libname(&lib.module)),
                );
                let edge = Build::new(output, "ar")
                    .inputs(archlibs)
                    .variable("arflags", "-static -no_warning_for_no_symbols");
                built.insert(config, self.writer.build(&edge)?);
            } else {
                built.insert(config, archlibs);
            }
        }

        self.writer.newline()?;
        self.built_libs.insert(lib.module.clone(), built.clone());
        Ok(built)
    }

    /// Emit compile and link edges for an executable target.
    pub fn bin(&mut self, bin: &BinTarget) -> Result<BuiltOutputs> {
        let binname = bin.binname.clone().unwrap_or_else(|| bin.module.clone());
        let configs = self.target_configs(&bin.configs);
        self.bin_with(bin, &binname, &configs)
    }

    fn bin_with(
        &mut self,
        bin: &BinTarget,
        binname: &str,
        configs: &[BuildConfig],
    ) -> Result<BuiltOutputs> {
        let toolchain = self.toolchain.clone();
        let basepath = bin.basepath.clone().unwrap_or_default();
        let mut built = BuiltOutputs::new();

        for &config in configs {
            let cconfigflags = toolchain.cconfigflags(config);
            let implicit = self.implicit_deps(&bin.implicit_deps, config)?;
            let mut outputs = Vec::new();

            for &arch in toolchain.archs() {
                let buildpath = arch_path(toolchain.buildpath(), config, arch);
                let binpath = arch_path(toolchain.binpath(), config, arch);
                // Apple links against the universal libraries
                let libpath = if toolchain.target().is_apple() {
                    toolchain.libpath().join(config.as_str())
                } else {
                    arch_path(toolchain.libpath(), config, arch)
                };

                let mut variables = vec![
                    ("carchflags".to_string(), toolchain.carchflags(arch)),
                    ("cconfigflags".to_string(), cconfigflags.clone()),
                ];

                let mut libs = bin.libs.clone();
                libs.extend(toolchain.dependlibs().iter().cloned());
                libs.extend(toolchain.extralibs().iter().cloned());
                let libpaths = toolchain
                    .make_libpaths(&toolchain.build_libpaths(
                        &[path_string(&libpath)],
                        arch,
                        config,
                    ))
                    .join(" ");

                let mut linkvariables = vec![
                    (
                        "libs".to_string(),
                        toolchain.make_libs(&libs).join(" "),
                    ),
                    (
                        "archlibs".to_string(),
                        toolchain.make_libs(&toolchain.linkarchlibs(arch)).join(" "),
                    ),
                    (
                        "linkconfigflags".to_string(),
                        toolchain.linkconfigflags(config),
                    ),
                    ("linkarchflags".to_string(), toolchain.linkarchflags(arch)),
                    ("libpaths".to_string(), libpaths),
                ];

                self.per_arch_variables(
                    arch,
                    &buildpath,
                    &basepath,
                    &bin.module,
                    &mut variables,
                    None,
                );
                self.per_arch_link_variables(arch, &binpath, binname, &mut linkvariables);
                self.more_includepaths(arch, &bin.includepaths, &mut variables);

                let objs = self.compile_sources(
                    &basepath,
                    &bin.module,
                    &bin.sources,
                    &buildpath,
                    &variables,
                )?;

                let linked = if toolchain.target().is_pnacl() {
                    // Linked bitcode is finalized into the portable executable
                    let bitcode = path_string(&binpath.join(format!("{}.bc", binname)));
                    let mut edge = Build::new(bitcode.clone(), "link").inputs(objs);
                    edge.implicit = implicit.clone();
                    edge.variables = linkvariables;
                    self.writer.build(&edge)?;

                    let pexe = path_string(&binpath.join(toolchain.binname(binname)));
                    self.writer.build(&Build::new(pexe, "finalize").input(bitcode))?
                } else {
                    let output = path_string(&binpath.join(toolchain.binname(binname)));
                    let mut edge = Build::new(output, "link").inputs(objs);
                    edge.implicit = implicit.clone();
                    edge.variables = linkvariables;
                    self.writer.build(&edge)?
                };
                outputs.extend(linked);
            }

            built.insert(config, outputs);
        }

        self.writer.newline()?;
        Ok(built)
    }

    /// Emit an application target: per-config executables plus platform
    /// packaging (Apple bundle, Android apk, Tizen tpk, PNaCl manifest).
    pub fn app(&mut self, app: &AppTarget) -> Result<BuiltOutputs> {
        let toolchain = self.toolchain.clone();
        let binname = app.binname.clone().unwrap_or_else(|| app.module.clone());
        let basepath = app.basepath.clone().unwrap_or_default();
        let configs = self.target_configs(&app.configs);

        let as_bin = BinTarget {
            module: app.module.clone(),
            sources: app.sources.clone(),
            binname: Some(binname.clone()),
            basepath: app.basepath.clone(),
            libs: app.libs.clone(),
            implicit_deps: app.implicit_deps.clone(),
            includepaths: app.includepaths.clone(),
            configs: app.configs.clone(),
            resources: Vec::new(),
        };

        let mut built = BuiltOutputs::new();
        for &config in &configs {
            let archbins = self.bin_with(&as_bin, &binname, &[config])?;
            let archbins = archbins.get(&config).cloned().unwrap_or_default();

            let outputs = if toolchain.target().is_apple() {
                self.build_app_bundle(config, &basepath, app, &binname, &archbins)?
            } else if toolchain.target().is_android() {
                self.build_apk(config, &basepath, app, &binname, &archbins)?
            } else if toolchain.target().is_tizen() {
                self.build_tpk(config, &basepath, app, &binname, &archbins)?
            } else if toolchain.target().is_pnacl() {
                self.build_nmf(config, &binname, &archbins)?
            } else {
                archbins
            };
            built.insert(config, outputs);
        }

        Ok(built)
    }

    /// Lipo-merge per-arch binaries into an `.app` bundle, then emit
    /// resource, debug-symbol and code-signing edges.
    fn build_app_bundle(
        &mut self,
        config: BuildConfig,
        basepath: &str,
        app: &AppTarget,
        binname: &str,
        archbins: &[String],
    ) -> Result<Vec<String>> {
        let toolchain = self.toolchain.clone();
        let is_macosx = toolchain.target().is_macosx();

        let apppath = toolchain
            .binpath()
            .join(config.as_str())
            .join(format!("{}.app", binname));
        // macosx bundles nest the binary under Contents/MacOS
        let binarypath = if is_macosx {
            apppath.join("Contents").join("MacOS").join(binname)
        } else {
            apppath.join(binname)
        };
        let builddir = toolchain
            .buildpath()
            .join(config.as_str())
            .join("app")
            .join(binname);

        self.writer.comment("Make universal binary")?;
        let unibinary = path_string(&binarypath);
        let builtbin = self
            .writer
            .build(&Build::new(unibinary.clone(), "lipo").inputs(archbins.to_vec()))?;

        // Debug symbols are extracted from the merged binary
        let dsympath = path_string(&apppath) + ".dSYM";
        let dsymcontent = format!("{}/Contents", dsympath);
        let mut dsym = Build::new(
            format!("{}/Resources/DWARF/{}", dsymcontent, binname),
            "dsymutil",
        )
        .input(unibinary.clone())
        .variable("outpath", dsympath.clone());
        dsym.outputs.push(format!("{}/Info.plist", dsymcontent));
        let builtsym = self.writer.build(&dsym)?;

        let mut builtres = Vec::new();
        let mut plists = Vec::new();
        let mut partialplists = Vec::new();

        for resource in &app.resources {
            let respath = resource_path(basepath, &app.module, resource);
            if resource.ends_with(".plist") {
                plists.push(respath);
            } else if resource.ends_with(".xcassets") {
                let outpath = if is_macosx {
                    path_string(&apppath.join("Contents").join("Resources"))
                } else {
                    path_string(&apppath)
                };
                let outplist = path_string(
                    &builddir.join(format!("{}-xcassets.plist", file_stem(resource))),
                );
                let edge = Build::new(outplist.clone(), "xcassets")
                    .input(respath)
                    .variable("outpath", outpath)
                    .variable("outplist", outplist.clone());
                partialplists.extend(self.writer.build(&edge)?);
            } else if resource.ends_with(".xib") {
                let nibname = format!("{}.nib", file_stem(resource));
                let nibpath = if is_macosx {
                    apppath.join("Contents").join("Resources").join(&nibname)
                } else {
                    apppath.join(&nibname)
                };
                let outplist =
                    path_string(&builddir.join(format!("{}-xib.plist", file_stem(resource))));
                let module = binname.replace(['-', '.'], "_");
                let edge = Build::new(path_string(&nibpath), "xib")
                    .output(outplist.clone())
                    .input(respath)
                    .variable("outpath", path_string(&nibpath))
                    .variable("outplist", outplist.clone())
                    .variable("module", module);
                builtres.extend(self.writer.build(&edge)?);
                partialplists.push(outplist);
            }
        }

        // Info.plist merges source plists with the partials produced above
        let (plistpath, pkginfopath) = if is_macosx {
            (
                apppath.join("Contents").join("Info.plist"),
                apppath.join("Contents").join("PkgInfo"),
            )
        } else {
            (apppath.join("Info.plist"), apppath.join("PkgInfo"))
        };
        let mut plistedge = Build::new(path_string(&plistpath), "plist")
            .output(path_string(&pkginfopath))
            .inputs(plists)
            .variable("exename", binname)
            .variable("prodname", binname)
            .variable("outpath", path_string(&plistpath));
        plistedge.inputs.extend(partialplists);
        if let Some(xcode) = toolchain.xcode() {
            let bundleidentifier = xcode.make_bundleidentifier(binname);
            if !bundleidentifier.is_empty() {
                plistedge = plistedge.variable("bundleidentifier", bundleidentifier);
            }
        }
        builtres.extend(self.writer.build(&plistedge)?);

        // Signing covers the bundle; everything else must already be built
        let sigdir = if is_macosx {
            apppath.join("Contents").join("_CodeSignature")
        } else {
            apppath.join("_CodeSignature")
        };
        let mut signedge = Build::new(
            path_string(&sigdir.join("CodeResources")),
            "codesign",
        )
        .inputs(builtbin.clone())
        .variable("outpath", path_string(&apppath));
        signedge.implicit = builtres.clone();
        if let Some(xcode) = toolchain.xcode() {
            if !xcode.provisioning.is_empty() {
                signedge = signedge.variable("provisioning", xcode.provisioning.clone());
            }
        }
        self.writer.build(&signedge)?;
        self.writer.newline()?;

        let mut outputs = builtbin;
        outputs.extend(builtsym);
        outputs.extend(builtres);
        Ok(outputs)
    }

    /// Package per-arch shared objects into a signed, aligned apk.
    fn build_apk(
        &mut self,
        config: BuildConfig,
        basepath: &str,
        app: &AppTarget,
        binname: &str,
        archbins: &[String],
    ) -> Result<Vec<String>> {
        let toolchain = self.toolchain.clone();
        let buildpath = toolchain
            .buildpath()
            .join(config.as_str())
            .join("apk")
            .join(binname);

        self.writer.comment("Make APK")?;
        let mut libfiles = Vec::new();
        let mut locallibs = Vec::new();
        let libname = toolchain.binname(binname);
        for (&arch, archbin) in toolchain.archs().iter().zip(archbins) {
            let locallibpath = format!("lib/{}/{}", AndroidEnv::archpath(arch), libname);
            let archpath = path_string(&buildpath.join(&locallibpath));
            locallibs.push(locallibpath);
            libfiles.extend(
                self.writer
                    .build(&Build::new(archpath, "copy").input(archbin.clone()))?,
            );
        }

        let mut manifestfile = Vec::new();
        let mut resfiles = Vec::new();
        for resource in &app.resources {
            let respath = resource_path(basepath, &app.module, resource);
            let filename = file_name(resource);
            if filename == "AndroidManifest.xml" {
                manifestfile = self.writer.build(
                    &Build::new(
                        path_string(&buildpath.join("AndroidManifest.xml")),
                        "copy",
                    )
                    .input(respath),
                )?;
            } else {
                let restype = parent_dir_name(resource);
                let output = path_string(&buildpath.join("res").join(restype).join(filename));
                resfiles.extend(
                    self.writer
                        .build(&Build::new(output, "copy").input(respath))?,
                );
            }
        }
        if manifestfile.is_empty() {
            bail!(
                "android app `{}` declares no AndroidManifest.xml resource",
                binname
            );
        }

        let unsignedapk = format!("{}.unsigned.apk", binname);
        let unalignedapk = format!("{}.unaligned.apk", binname);
        // deploy builds crunch resources through the release aapt pipeline
        let aaptrule = if config == BuildConfig::Deploy {
            "aaptdeploy"
        } else {
            "aapt"
        };
        let mut aaptedge = Build::new(
            path_string(&buildpath.join(&unsignedapk)),
            aaptrule,
        )
        .inputs(manifestfile)
        .variable("apkbuildpath", path_string(&buildpath))
        .variable("apk", unsignedapk)
        .variable("apklibs", locallibs.join(" "));
        aaptedge.implicit = libfiles;
        aaptedge.implicit.extend(resfiles);
        let unsignedfile = self.writer.build(&aaptedge)?;

        let unalignedfile = self.writer.build(
            &Build::new(path_string(&buildpath.join(&unalignedapk)), "jarsigner")
                .inputs(unsignedfile),
        )?;

        let output = path_string(
            &toolchain
                .binpath()
                .join(config.as_str())
                .join(format!("{}.apk", binname)),
        );
        let outfile = self
            .writer
            .build(&Build::new(output, "zipalign").inputs(unalignedfile))?;
        self.writer.newline()?;
        Ok(outfile)
    }

    /// Assemble a `.tpk` package per architecture: binary, manifest and
    /// resources staged into a package directory, then zipped by the SDK.
    fn build_tpk(
        &mut self,
        config: BuildConfig,
        basepath: &str,
        app: &AppTarget,
        binname: &str,
        archbins: &[String],
    ) -> Result<Vec<String>> {
        let toolchain = self.toolchain.clone();
        let mut outputs = Vec::new();

        self.writer.comment("Make TPK")?;
        for (&arch, archbin) in toolchain.archs().iter().zip(archbins) {
            let buildpath = toolchain
                .buildpath()
                .join(config.as_str())
                .join("tpk")
                .join(format!("{}-{}", binname, arch));

            let staged = self.writer.build(
                &Build::new(
                    path_string(&buildpath.join("bin").join(binname)),
                    "copy",
                )
                .input(archbin.clone()),
            )?;

            let mut resfiles = Vec::new();
            for resource in &app.resources {
                let respath = resource_path(basepath, &app.module, resource);
                let filename = file_name(resource);
                let output = if filename == "tizen-manifest.xml" {
                    path_string(&buildpath.join(filename))
                } else {
                    path_string(&buildpath.join("res").join(filename))
                };
                resfiles.extend(
                    self.writer
                        .build(&Build::new(output, "copy").input(respath))?,
                );
            }

            let output = path_string(
                &arch_path(toolchain.binpath(), config, arch).join(format!("{}.tpk", binname)),
            );
            let mut edge = Build::new(output, "tpk")
                .inputs(staged)
                .variable("tpkbuildpath", path_string(&buildpath));
            edge.implicit = resfiles;
            outputs.extend(self.writer.build(&edge)?);
        }
        self.writer.newline()?;
        Ok(outputs)
    }

    /// Emit the loader-manifest edge for finalized PNaCl executables.
    fn build_nmf(
        &mut self,
        config: BuildConfig,
        binname: &str,
        archbins: &[String],
    ) -> Result<Vec<String>> {
        let toolchain = self.toolchain.clone();
        let mut outputs = archbins.to_vec();
        for (&arch, archbin) in toolchain.archs().iter().zip(archbins) {
            let output = path_string(
                &arch_path(toolchain.binpath(), config, arch).join(format!("{}.nmf", binname)),
            );
            outputs.extend(
                self.writer
                    .build(&Build::new(output, "nmf").input(archbin.clone()))?,
            );
        }
        self.writer.newline()?;
        Ok(outputs)
    }

    /// Compile edges for a source list; returns the object files.
    fn compile_sources(
        &mut self,
        basepath: &str,
        module: &str,
        sources: &[String],
        buildpath: &Path,
        variables: &[(String, String)],
    ) -> Result<Vec<String>> {
        let toolchain = &self.toolchain;
        let mut objs = Vec::new();

        for name in sources {
            let infile = resource_path(basepath, module, name);
            // Keep directory components so sibling `foo/main.c` sources
            // never collide in the object directory
            let stem = Path::new(name).with_extension("");
            let outfile = module_path(buildpath, basepath, module)
                .join(format!("{}{}", stem.display(), toolchain.objext()));

            if name.ends_with(".c") {
                let mut edge = Build::new(path_string(&outfile), "cc").input(infile);
                edge.variables = variables.to_vec();
                objs.extend(self.writer.build(&edge)?);
            } else if name.ends_with(".m") && toolchain.target().is_apple() {
                // Objective-C objects get a distinct extension so a foo.c
                // sibling never collides
                let outfile = format!("{}m", path_string(&outfile));
                let mut edge = Build::new(outfile, "cm").input(infile);
                edge.variables = variables.to_vec();
                objs.extend(self.writer.build(&edge)?);
            }
        }
        Ok(objs)
    }

    /// Per-arch compile/archive variables: PDB paths on Windows, cross
    /// toolchain prefix and sysroot on Android and Tizen.
    fn per_arch_variables(
        &self,
        arch: Arch,
        buildpath: &Path,
        basepath: &str,
        module: &str,
        variables: &mut Vec<(String, String)>,
        arvariables: Option<&mut Vec<(String, String)>>,
    ) {
        let toolchain = &self.toolchain;
        if toolchain.target().is_windows() {
            let pdbpath = module_path(buildpath, basepath, module).join("ninja.pdb");
            variables.push(("pdbpath".to_string(), path_string(&pdbpath)));
        }
        let mut cross = Vec::new();
        if let Some(android) = toolchain.android() {
            cross.push((
                "toolchain".to_string(),
                android.toolchain_path(toolchain.kind(), arch),
            ));
            cross.push(("sysroot".to_string(), android.sysroot_path(arch)));
        }
        if let Some(tizen) = toolchain.tizen() {
            cross.push(("toolchain".to_string(), tizen.toolchain_path(arch)));
            cross.push(("sysroot".to_string(), tizen.sysroot_path(arch)));
        }
        if let Some(arvariables) = arvariables {
            arvariables.extend(cross.iter().cloned());
        }
        variables.extend(cross);
    }

    /// Per-arch link variables: PDB path on Windows, soname and cross
    /// toolchain on Android, cross toolchain on Tizen.
    fn per_arch_link_variables(
        &self,
        arch: Arch,
        binpath: &Path,
        binname: &str,
        variables: &mut Vec<(String, String)>,
    ) {
        let toolchain = &self.toolchain;
        if toolchain.target().is_windows() {
            let pdbpath = binpath.join(format!("{}.pdb", binname));
            variables.push(("pdbpath".to_string(), path_string(&pdbpath)));
        }
        if let Some(android) = toolchain.android() {
            variables.push((
                "toolchain".to_string(),
                android.toolchain_path(toolchain.kind(), arch),
            ));
            variables.push(("sysroot".to_string(), android.sysroot_path(arch)));
            variables.push(("liblinkname".to_string(), toolchain.binname(binname)));
        }
        if let Some(tizen) = toolchain.tizen() {
            variables.push(("toolchain".to_string(), tizen.toolchain_path(arch)));
            variables.push(("sysroot".to_string(), tizen.sysroot_path(arch)));
        }
    }

    /// Target-local include paths, plus the Android per-arch sysroot
    /// includes.
    fn more_includepaths(
        &self,
        arch: Arch,
        includepaths: &[String],
        variables: &mut Vec<(String, String)>,
    ) {
        let toolchain = &self.toolchain;
        let mut paths = includepaths.to_vec();
        if let Some(android) = toolchain.android() {
            paths.push(format!("{}/usr/include", android.sysroot_path(arch)));
        }
        if !paths.is_empty() {
            variables.push((
                "moreincludepaths".to_string(),
                toolchain.make_includepaths(&paths).join(" "),
            ));
        }
    }

    /// Configs for a target: its own restriction intersected with the
    /// toolchain's, or the toolchain's full list.
    fn target_configs(&self, restriction: &Option<Vec<BuildConfig>>) -> Vec<BuildConfig> {
        match restriction {
            Some(configs) => configs
                .iter()
                .copied()
                .filter(|config| self.toolchain.configs().contains(config))
                .collect(),
            None => self.toolchain.configs().to_vec(),
        }
    }

    /// Resolve implicit dependencies by lib-target name for one config.
    fn implicit_deps(&self, names: &[String], config: BuildConfig) -> Result<Vec<String>> {
        let mut deps = Vec::new();
        for name in names {
            let built = self
                .built_libs
                .get(name)
                .with_context(|| format!("implicit dependency `{}` is not a declared lib", name))?;
            if let Some(outputs) = built.get(&config) {
                deps.extend(outputs.iter().cloned());
            }
        }
        Ok(deps)
    }
}

fn arch_path(root: &Path, config: BuildConfig, arch: Arch) -> PathBuf {
    root.join(config.as_str()).join(arch.as_str())
}

fn module_path(buildpath: &Path, basepath: &str, module: &str) -> PathBuf {
    let mut path = buildpath.to_path_buf();
    if !basepath.is_empty() {
        path = path.join(basepath);
    }
    if !module.is_empty() {
        path = path.join(module);
    }
    path
}

fn resource_path(basepath: &str, module: &str, name: &str) -> String {
    let mut path = PathBuf::new();
    if !basepath.is_empty() {
        path = path.join(basepath);
    }
    if !module.is_empty() {
        path = path.join(module);
    }
    path_string(&path.join(name))
}

fn path_string(path: &Path) -> String {
    path.display().to_string()
}

fn file_stem(name: &str) -> String {
    Path::new(name)
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| name.to_string())
}

fn file_name(name: &str) -> String {
    Path::new(name)
        .file_name()
        .map(|file| file.to_string_lossy().into_owned())
        .unwrap_or_else(|| name.to_string())
}

fn parent_dir_name(name: &str) -> String {
    Path::new(name)
        .parent()
        .and_then(|parent| parent.file_name())
        .map(|dir| dir.to_string_lossy().into_owned())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::platform::Platform;
    use crate::toolchain::xcode::{AppleTools, XcodeEnv};
    use crate::toolchain::{Overrides, ToolchainRequest};
    use crate::util::prefs::{ApplePrefs, Prefs};

    fn linux_toolchain(configs: Vec<BuildConfig>) -> Toolchain {
        Toolchain::resolve(
            Platform::Linux,
            Platform::Linux,
            ToolchainRequest {
                project: "foundation".to_string(),
                archs: vec![Arch::X86_64],
                configs,
                ..ToolchainRequest::default()
            },
        )
        .unwrap()
    }

    fn ios_toolchain() -> Toolchain {
        let tools = AppleTools {
            cc: "/usr/bin/clang".to_string(),
            ar: "/usr/bin/libtool".to_string(),
            lipo: "/usr/bin/lipo".to_string(),
            plist: "/usr/bin/plutil".to_string(),
            xcassets: "/usr/bin/actool".to_string(),
            xib: "/usr/bin/ibtool".to_string(),
            dsymutil: "/usr/bin/dsymutil".to_string(),
            codesign: "/usr/bin/codesign".to_string(),
        };
        let prefs = ApplePrefs {
            bundleidentifier: Some("com.example.$(binname)".to_string()),
            ..ApplePrefs::default()
        };
        let xcode = XcodeEnv::with_tools(Platform::Ios, "/sdk/iPhoneOS.sdk", tools, &prefs);
        Toolchain::resolve(
            Platform::MacOsx,
            Platform::Ios,
            ToolchainRequest {
                project: "foundation".to_string(),
                prefs: Prefs::default(),
                overrides: Overrides::default(),
                xcode: Some(xcode),
                ..ToolchainRequest::default()
            },
        )
        .unwrap()
    }

    fn lib_target(module: &str, sources: &[&str]) -> LibTarget {
        LibTarget {
            module: module.to_string(),
            sources: sources.iter().map(|s| s.to_string()).collect(),
            basepath: None,
            includepaths: Vec::new(),
            configs: None,
        }
    }

    /// Emit and join wrapped continuation lines back together so tests can
    /// assert on whole statements.
    fn emit(toolchain: Toolchain, f: impl FnOnce(&mut Generator<Vec<u8>>)) -> String {
        let mut generator = Generator::new(toolchain, Vec::new());
        f(&mut generator);
        let raw = String::from_utf8(generator.into_inner()).unwrap();
        raw.replace(" $\n      ", " ").replace(" $\n    ", " ")
    }

    #[test]
    fn test_lib_emits_compile_and_archive_edges() {
        let out = emit(linux_toolchain(vec![BuildConfig::Release]), |generator| {
            generator
                .lib(&lib_target("foundation", &["array.c", "fs.c"]))
                .unwrap();
        });

        assert!(out.contains("build build/ninja/linux/release/x86-64/foundation/array.o: cc foundation/array.c"));
        assert!(out.contains("build build/ninja/linux/release/x86-64/foundation/fs.o: cc foundation/fs.c"));
        assert!(out.contains(
            "build lib/linux/release/x86-64/libfoundation.a: ar build/ninja/linux/release/x86-64/foundation/array.o build/ninja/linux/release/x86-64/foundation/fs.o"
        ));
    }

    #[test]
    fn test_objc_sources_skipped_off_apple() {
        let out = emit(linux_toolchain(vec![BuildConfig::Release]), |generator| {
            generator
                .lib(&lib_target("foundation", &["fs.c", "fs.m"]))
                .unwrap();
        });
        assert!(!out.contains("fs.m"));
    }

    #[test]
    fn test_bin_links_against_implicit_lib() {
        let out = emit(linux_toolchain(vec![BuildConfig::Release]), |generator| {
            generator
                .lib(&lib_target("foundation", &["array.c"]))
                .unwrap();
            generator
                .bin(&BinTarget {
                    module: "bin2hex".to_string(),
                    sources: vec!["main.c".to_string()],
                    binname: None,
                    basepath: Some("tools".to_string()),
                    libs: vec!["foundation".to_string()],
                    implicit_deps: vec!["foundation".to_string()],
                    includepaths: Vec::new(),
                    configs: None,
                    resources: Vec::new(),
                })
                .unwrap();
        });

        assert!(out.contains("build bin/linux/release/x86-64/bin2hex: link"));
        // archive is an implicit dependency of the link edge
        assert!(out.contains("| lib/linux/release/x86-64/libfoundation.a"));
        assert!(out.contains("libs = -lfoundation"));
    }

    #[test]
    fn test_unknown_implicit_dep_is_fatal() {
        let toolchain = linux_toolchain(vec![BuildConfig::Release]);
        let mut generator = Generator::new(toolchain, Vec::new());
        let err = generator
            .bin(&BinTarget {
                module: "tool".to_string(),
                sources: vec!["main.c".to_string()],
                binname: None,
                basepath: None,
                libs: Vec::new(),
                implicit_deps: vec!["nosuchlib".to_string()],
                includepaths: Vec::new(),
                configs: None,
                resources: Vec::new(),
            })
            .unwrap_err();
        assert!(err.to_string().contains("nosuchlib"));
    }

    #[test]
    fn test_emission_is_deterministic() {
        let run = || {
            emit(linux_toolchain(vec![BuildConfig::Debug, BuildConfig::Release]), |generator| {
                generator
                    .lib(&lib_target("foundation", &["array.c", "fs.c", "md5.c"]))
                    .unwrap();
                generator
                    .bin(&BinTarget {
                        module: "hashify".to_string(),
                        sources: vec!["main.c".to_string()],
                        binname: None,
                        basepath: Some("tools".to_string()),
                        libs: vec!["foundation".to_string()],
                        implicit_deps: vec!["foundation".to_string()],
                        includepaths: Vec::new(),
                        configs: None,
                        resources: Vec::new(),
                    })
                    .unwrap();
            })
        };
        assert_eq!(run(), run());
    }

    #[test]
    fn test_app_sources_keep_directory_components() {
        let out = emit(linux_toolchain(vec![BuildConfig::Release]), |generator| {
            generator
                .bin(&BinTarget {
                    module: String::new(),
                    sources: vec!["array/main.c".to_string(), "fs/main.c".to_string()],
                    binname: Some("test-all".to_string()),
                    basepath: Some("test".to_string()),
                    libs: Vec::new(),
                    implicit_deps: Vec::new(),
                    includepaths: Vec::new(),
                    configs: None,
                    resources: Vec::new(),
                })
                .unwrap();
        });
        assert!(out.contains("test/array/main.o"));
        assert!(out.contains("test/fs/main.o"));
    }

    #[test]
    fn test_apple_lib_merges_universal_archive() {
        let out = emit(ios_toolchain(), |generator| {
            generator
                .lib(&lib_target("foundation", &["array.c"]))
                .unwrap();
        });

        // one archive per arch, then one universal merge without the arch level
        assert!(out.contains("build lib/ios/release/arm7/libfoundation.a: ar"));
        assert!(out.contains("build lib/ios/release/arm64/libfoundation.a: ar"));
        assert!(out.contains(
            "build lib/ios/release/libfoundation.a: ar lib/ios/release/arm7/libfoundation.a lib/ios/release/arm64/libfoundation.a"
        ));
    }

    #[test]
    fn test_ios_app_emits_bundle_edges() {
        // target=ios, host=macosx: clang toolchain, default archs arm7+arm64,
        // per-arch links plus lipo/plist/xcassets/codesign edges
        let toolchain = ios_toolchain();
        assert_eq!(toolchain.kind(), crate::toolchain::ToolchainKind::Clang);
        assert_eq!(toolchain.archs(), &[Arch::Arm7, Arch::Arm64]);

        let out = emit(toolchain, |generator| {
            generator.lib(&lib_target("test", &["test.c"])).unwrap();
            generator
                .app(&AppTarget {
                    module: String::new(),
                    sources: vec!["all/main.c".to_string()],
                    binname: Some("test-all".to_string()),
                    basepath: Some("test".to_string()),
                    libs: vec!["test".to_string()],
                    implicit_deps: vec!["test".to_string()],
                    includepaths: Vec::new(),
                    configs: None,
                    resources: vec![
                        "all/ios/test-all.plist".to_string(),
                        "all/ios/Images.xcassets".to_string(),
                        "all/ios/test-all.xib".to_string(),
                    ],
                })
                .unwrap();
        });

        // per-arch link edges
        assert!(out.contains("build bin/ios/release/arm7/test-all: link"));
        assert!(out.contains("build bin/ios/release/arm64/test-all: link"));
        // one universal merge into the bundle
        assert!(out.contains(
            "build bin/ios/release/test-all.app/test-all: lipo bin/ios/release/arm7/test-all bin/ios/release/arm64/test-all"
        ));
        // bundle packaging edges
        assert!(out.contains(": plist test/all/ios/test-all.plist"));
        assert!(out.contains("build bin/ios/release/test-all.app/Info.plist"));
        assert!(out.contains(": xcassets test/all/ios/Images.xcassets"));
        assert!(out.contains(": xib test/all/ios/test-all.xib"));
        assert!(out.contains("_CodeSignature/CodeResources: codesign"));
        assert!(out.contains("bundleidentifier = com.example.test-all"));
        // debug symbols extracted from the universal binary
        assert!(out.contains(": dsymutil bin/ios/release/test-all.app/test-all"));
    }

    #[test]
    fn test_config_restriction_intersects() {
        let out = emit(
            linux_toolchain(vec![BuildConfig::Debug, BuildConfig::Release]),
            |generator| {
                generator
                    .lib(&LibTarget {
                        module: "foundation".to_string(),
                        sources: vec!["array.c".to_string()],
                        basepath: None,
                        includepaths: Vec::new(),
                        configs: Some(vec![BuildConfig::Release, BuildConfig::Profile]),
                    })
                    .unwrap();
            },
        );
        // profile is not an active toolchain config; debug is excluded by the target
        assert!(out.contains("release"));
        assert!(!out.contains("debug"));
        assert!(!out.contains("profile"));
    }
}
