//! list command - Show entries under editorial workflow

use anyhow::Result;

use super::{load_config, open_workflow, runtime};
use crate::cli::Context;
use crate::engine::BranchSummary;

/// List unpublished entries.
pub fn list(ctx: &Context) -> Result<()> {
    let config = load_config(ctx)?;
    let workflow = open_workflow(&config)?;
    let entries = runtime()?.block_on(workflow.list_unpublished())?;

    if ctx.quiet {
        for entry in &entries {
            println!("{}", entry.content_key);
        }
        return Ok(());
    }

    if entries.is_empty() {
        println!("No unpublished entries.");
        return Ok(());
    }

    for entry in &entries {
        println!("{}", format_row(entry));
    }
    Ok(())
}

fn format_row(entry: &BranchSummary) -> String {
    let pr = entry
        .metadata
        .pr
        .as_ref()
        .map(|pr| format!("#{}", pr.number))
        .unwrap_or_else(|| "-".to_string());
    format!(
        "{:<16} {:<6} {}  ({})",
        entry.metadata.status.as_str(),
        pr,
        entry.content_key,
        entry.branch
    )
}
