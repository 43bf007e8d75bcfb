//! cli::commands
//!
//! Command dispatch and handlers.
//!
//! # Architecture
//!
//! Each command handler:
//! 1. Loads configuration for the project directory
//! 2. Calls the workflow to execute the command
//! 3. Formats and displays output
//!
//! # Async Commands
//!
//! Anything that talks to the hosting service is async. Each such handler
//! builds its own tokio runtime and blocks on the async body, so the
//! dispatch function stays synchronous.

mod checks;
mod completion;
mod config_cmd;
mod delete;
mod list;
mod publish;
mod show;
mod status;

pub use checks::checks;
pub use completion::completion;
pub use config_cmd::{config, set as config_set};
pub use delete::delete;
pub use list::list;
pub use publish::publish;
pub use show::show;
pub use status::status;

use std::sync::Arc;

use anyhow::{Context as _, Result};

use crate::cli::args::{Command, ConfigAction};
use crate::cli::Context;
use crate::core::config::Config;
use crate::engine::{Workflow, WorkflowOptions};
use crate::forge::{create_forge, Forge};

/// Dispatch a command to its handler.
pub fn dispatch(command: Command, ctx: &Context) -> Result<()> {
    match command {
        Command::List => list::list(ctx),
        Command::Show { collection, slug } => show::show(ctx, &collection, &slug),
        Command::Status {
            collection,
            slug,
            status,
        } => status::status(ctx, &collection, &slug, status.into()),
        Command::Publish { collection, slug } => publish::publish(ctx, &collection, &slug),
        Command::Delete { collection, slug } => delete::delete(ctx, &collection, &slug),
        Command::Checks { collection, slug } => checks::checks(ctx, &collection, &slug),
        Command::Config { path, action } => match action {
            Some(ConfigAction::Set { key, value }) => config_cmd::set(ctx, &key, &value),
            None => config_cmd::config(ctx, path),
        },
        Command::Completion { shell } => completion::completion(shell),
    }
}

/// Load configuration for the context's project directory.
pub(crate) fn load_config(ctx: &Context) -> Result<Config> {
    let dir = ctx.project_dir()?;
    Config::load(Some(&dir)).context("Failed to load config")
}

/// Build the workflow described by the configuration.
///
/// A configured `fork` switches to open authoring: entry branches and
/// metadata go to the fork, pull requests to `repo`.
pub(crate) fn open_workflow(config: &Config) -> Result<Workflow> {
    let repo = config.require_repo()?;
    let token = config.token()?;
    let provider = Some(config.default_forge());

    let upstream = create_forge(repo, &token, provider, config.api_base())
        .with_context(|| format!("Failed to connect to '{}'", repo))?;

    let options = WorkflowOptions {
        default_branch: config.branch()?,
        merge_method: config.merge_method(),
        initial_status: config.initial_status(),
    };

    match config.fork() {
        Some(fork) => {
            let fork: Arc<dyn Forge> = create_forge(fork, &token, provider, config.api_base())
                .with_context(|| format!("Failed to connect to fork '{}'", fork))?;
            tracing::debug!(fork = %fork.full_name(), upstream = %upstream.full_name(), "open authoring");
            Ok(Workflow::open_authoring(fork, upstream, options))
        }
        None => Ok(Workflow::new(upstream, options)),
    }
}

/// Runtime for one async command.
pub(crate) fn runtime() -> Result<tokio::runtime::Runtime> {
    tokio::runtime::Runtime::new().context("Failed to start async runtime")
}
