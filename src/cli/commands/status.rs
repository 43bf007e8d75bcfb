//! status command - Move an entry through the workflow

use anyhow::Result;

use super::{load_config, open_workflow, runtime};
use crate::cli::Context;
use crate::core::metadata::EntryStatus;

/// Set an entry's workflow status.
pub fn status(ctx: &Context, collection: &str, slug: &str, status: EntryStatus) -> Result<()> {
    let config = load_config(ctx)?;
    let workflow = open_workflow(&config)?;
    let meta = runtime()?.block_on(workflow.update_status(collection, slug, status))?;

    if !ctx.quiet {
        match &meta.pr {
            Some(pr) => println!("{}/{} is now {} (PR #{})", collection, slug, meta.status, pr.number),
            None => println!("{}/{} is now {}", collection, slug, meta.status),
        }
    }
    Ok(())
}
