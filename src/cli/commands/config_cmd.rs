//! config command - Show or set configuration values

use anyhow::{bail, Context as _, Result};

use super::load_config;
use crate::cli::Context;
use crate::core::config::{Config, ProjectConfig, WorkflowConfig};

/// Print the effective configuration, or with `path` the files it came from.
pub fn config(ctx: &Context, path: bool) -> Result<()> {
    let config = load_config(ctx)?;

    if path {
        let dir = ctx.project_dir()?;
        match config.global_config_loaded_from() {
            Some(p) => println!("global:  {}", p.display()),
            None => println!("global:  (none)"),
        }
        println!("project: {}", Config::project_config_path(&dir).display());
        return Ok(());
    }

    println!("# Effective Configuration");
    println!("repo = {}", config.repo().unwrap_or("(not set)"));
    println!("branch = {}", config.branch()?);
    println!("fork = {}", config.fork().unwrap_or("(not set)"));
    println!("merge_method = {}", config.merge_method());
    println!("initial_status = {}", config.initial_status());
    println!("default_forge = {}", config.default_forge());
    if let Some(base) = config.api_base() {
        println!("api_base = {}", base);
    }
    println!("token_env = {}", config.token_env());
    Ok(())
}

/// Set a project configuration value and write `draftwork.toml`.
pub fn set(ctx: &Context, key: &str, value: &str) -> Result<()> {
    let dir = ctx.project_dir()?;
    let mut project = load_config(ctx)?.project.unwrap_or_default();

    apply(&mut project, key, value)?;

    let path = Config::write_project(&dir, &project).context("Failed to write config")?;
    tracing::debug!(path = %path.display(), "wrote project config");

    if !ctx.quiet {
        println!("Set {} = {}", key, value);
    }
    Ok(())
}

fn apply(project: &mut ProjectConfig, key: &str, value: &str) -> Result<()> {
    let value = value.to_string();
    match key {
        "repo" => project.repo = Some(value),
        "branch" => project.branch = Some(value),
        "fork" => project.fork = Some(value),
        "merge_method" | "workflow.merge_method" => {
            project
                .workflow
                .get_or_insert_with(WorkflowConfig::default)
                .merge_method = Some(value)
        }
        "initial_status" | "workflow.initial_status" => {
            project
                .workflow
                .get_or_insert_with(WorkflowConfig::default)
                .initial_status = Some(value)
        }
        _ => bail!("Unknown configuration key: {}", key),
    }
    Ok(())
}
