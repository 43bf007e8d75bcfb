//! show command - Print one unpublished entry

use anyhow::Result;

use super::{load_config, open_workflow, runtime};
use crate::cli::Context;

/// Show an entry's workflow state and saved content.
pub fn show(ctx: &Context, collection: &str, slug: &str) -> Result<()> {
    let config = load_config(ctx)?;
    let workflow = open_workflow(&config)?;
    let entry = runtime()?.block_on(workflow.unpublished_entry(collection, slug))?;
    let meta = &entry.metadata;

    if !ctx.quiet {
        println!("Entry:   {}", entry.key);
        println!("Branch:  {}", meta.branch);
        println!("Status:  {}", meta.status);
        if let Some(pr) = &meta.pr {
            println!("PR:      #{} ({})", pr.number, pr.head.short(7));
        }
        if let Some(title) = &meta.title {
            println!("Title:   {}", title);
        }
        println!("Author:  {}", meta.user);
        println!("Updated: {}", meta.timestamp);
        println!("File:    {}", meta.objects.entry.path);
        for path in &entry.media {
            println!("Media:   {}", path);
        }
        println!();
    }

    print!("{}", String::from_utf8_lossy(&entry.content));
    Ok(())
}
