//! publish command - Merge an entry into the default branch

use anyhow::Result;

use super::{load_config, open_workflow, runtime};
use crate::cli::Context;
use crate::engine::PublishOutcome;

/// Publish an entry.
pub fn publish(ctx: &Context, collection: &str, slug: &str) -> Result<()> {
    let config = load_config(ctx)?;
    let workflow = open_workflow(&config)?;
    let outcome = runtime()?.block_on(workflow.publish(collection, slug))?;

    if !ctx.quiet {
        match outcome {
            PublishOutcome::Merged { number } => {
                println!("Published {}/{} (merged PR #{})", collection, slug, number)
            }
            PublishOutcome::ForceMerged { number, commit } => println!(
                "Published {}/{} as {} (PR #{} could not be merged)",
                collection,
                slug,
                commit.short(7),
                number
            ),
        }
    }
    Ok(())
}
