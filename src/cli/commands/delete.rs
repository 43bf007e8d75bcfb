//! delete command - Discard an unpublished entry

use anyhow::Result;

use super::{load_config, open_workflow, runtime};
use crate::cli::Context;

/// Delete an entry's branch, pull request and metadata.
pub fn delete(ctx: &Context, collection: &str, slug: &str) -> Result<()> {
    let config = load_config(ctx)?;
    let workflow = open_workflow(&config)?;
    runtime()?.block_on(workflow.delete_entry(collection, slug))?;

    if !ctx.quiet {
        println!("Deleted {}/{}", collection, slug);
    }
    Ok(())
}
