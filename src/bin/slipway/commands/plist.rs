//! `slipway plist` command

use anyhow::Result;

use crate::cli::PlistArgs;
use slipway::ops::plist::{process_plist, PlistJob};

pub fn execute(args: PlistArgs) -> Result<()> {
    process_plist(&PlistJob {
        sources: args.sources,
        exename: args.exename,
        prodname: args.prodname,
        bundleidentifier: args.bundleidentifier,
        target: args.target,
        deploymenttarget: args.deploymenttarget,
        output: args.output,
    })
}
