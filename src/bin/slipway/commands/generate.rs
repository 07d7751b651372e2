//! `slipway generate` command

use anyhow::Result;

use crate::cli::GenerateArgs;
use slipway::ops::generate::{generate, GenerateOptions};
use slipway::toolchain::Overrides;

pub fn execute(args: GenerateArgs) -> Result<()> {
    fn split(flags: &Option<String>) -> Vec<String> {
        flags
            .as_deref()
            .map(|value| value.split_whitespace().map(|f| f.to_string()).collect())
            .unwrap_or_default()
    }

    // clap already layered these: CLI flag over environment variable
    let overrides = Overrides {
        cc: args.cc.clone(),
        ar: args.ar.clone(),
        link: args.link.clone(),
        cflags: split(&args.cflags),
        arflags: split(&args.arflags),
        linkflags: split(&args.linkflags),
    };

    let opts = GenerateOptions {
        target: args.target,
        host: args.host,
        toolchain: args.toolchain,
        configs: args.configs,
        archs: args.archs,
        manifest: args.manifest,
        output: args.output,
        overrides,
        configure_args: std::env::args().skip(1).collect(),
    };

    generate(&opts)
}
