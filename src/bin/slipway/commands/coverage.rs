//! `slipway coverage` command

use anyhow::Result;

use crate::cli::CoverageArgs;
use slipway::ops::coverage::{run_coverage, CoverageOptions, Service};

pub fn execute(args: CoverageArgs) -> Result<()> {
    let service = args
        .service
        .parse::<Service>()
        .map_err(|e| anyhow::anyhow!("{}", e))?;

    run_coverage(&CoverageOptions {
        objectdir: args.objectdir,
        sourcedir: args.sourcedir,
        merge: args.merge,
        service,
        post: args.post,
        report: args.report,
    })
}
