//! `slipway version` command

use std::path::Path;

use anyhow::Result;

use crate::cli::VersionArgs;
use slipway::core::manifest::{Manifest, MANIFEST_NAME};
use slipway::ops::version::generate_version;

pub fn execute(args: VersionArgs) -> Result<()> {
    let project = match args.project {
        Some(project) => project,
        None => Manifest::load(Path::new(MANIFEST_NAME))?.project.name,
    };

    generate_version(&project, &args.output)
}
