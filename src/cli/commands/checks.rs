//! checks command - Show commit statuses for an entry

use anyhow::Result;

use super::{load_config, open_workflow, runtime};
use crate::cli::Context;

/// Print CI and deploy preview statuses.
pub fn checks(ctx: &Context, collection: &str, slug: &str) -> Result<()> {
    let config = load_config(ctx)?;
    let workflow = open_workflow(&config)?;
    let statuses = runtime()?.block_on(workflow.entry_statuses(collection, slug))?;

    if statuses.is_empty() {
        if !ctx.quiet {
            println!("No checks reported.");
        }
        return Ok(());
    }

    for status in &statuses {
        match (&status.target_url, ctx.quiet) {
            (Some(url), false) => println!("{:<8} {}  {}", status.state, status.context, url),
            _ => println!("{:<8} {}", status.state, status.context),
        }
    }
    Ok(())
}
