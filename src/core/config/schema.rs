//! core::config::schema
//!
//! Configuration schema types.
//!
//! # Global Config
//!
//! Located at (in order of precedence):
//! 1. `$DRAFTWORK_CONFIG` if set
//! 2. `$XDG_CONFIG_HOME/draftwork/config.toml`
//! 3. `~/.draftwork/config.toml` (canonical write location)
//!
//! # Project Config
//!
//! Located at `draftwork.toml` in the project directory.
//!
//! # Validation
//!
//! Config values are validated after parsing to ensure they conform to
//! expected formats (e.g., branch must be a valid branch name).

use serde::{Deserialize, Serialize};

use super::ConfigError;
use crate::core::metadata::EntryStatus;
use crate::core::types::BranchName;
use crate::forge::MergeMethod;

/// Global configuration (user scope).
///
/// # Example
///
/// ```toml
/// default_forge = "github"
/// api_base = "https://github.example.com/api/v3"
/// token_env = "GITHUB_TOKEN"
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct GlobalConfig {
    /// Default forge (e.g., "github")
    pub default_forge: Option<String>,

    /// API base URL for self-hosted instances
    pub api_base: Option<String>,

    /// Environment variable holding the access token
    pub token_env: Option<String>,
}

impl GlobalConfig {
    /// Validate the configuration values.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` if any value is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(forge) = &self.default_forge {
            let valid_forges = crate::forge::valid_forge_names();
            if !valid_forges.contains(&forge.as_str()) {
                return Err(ConfigError::InvalidValue(format!(
                    "invalid forge '{}', must be one of: {}",
                    forge,
                    valid_forges.join(", ")
                )));
            }
        }

        if let Some(api_base) = &self.api_base {
            if !(api_base.starts_with("https://") || api_base.starts_with("http://")) {
                return Err(ConfigError::InvalidValue(format!(
                    "api_base must be an http(s) URL, got '{}'",
                    api_base
                )));
            }
        }

        if let Some(var) = &self.token_env {
            if var.is_empty() || var.contains('=') {
                return Err(ConfigError::InvalidValue(format!(
                    "invalid token_env '{}'",
                    var
                )));
            }
        }

        Ok(())
    }
}

/// Project configuration.
///
/// # Example
///
/// ```toml
/// repo = "octo/blog"
/// branch = "main"
/// fork = "alice/blog"
///
/// [workflow]
/// merge_method = "squash"
/// initial_status = "draft"
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct ProjectConfig {
    /// Content repository: `owner/repo` or a remote URL
    pub repo: Option<String>,

    /// Default branch entries are published to
    pub branch: Option<String>,

    /// Fork (`owner/repo`) holding entry branches; enables open authoring
    pub fork: Option<String>,

    /// Workflow defaults
    pub workflow: Option<WorkflowConfig>,
}

impl ProjectConfig {
    /// Validate the configuration values.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` if any value is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(repo) = &self.repo {
            if repo.trim().is_empty() {
                return Err(ConfigError::InvalidValue("repo cannot be empty".to_string()));
            }
        }

        if let Some(branch) = &self.branch {
            BranchName::new(branch).map_err(|e| {
                ConfigError::InvalidValue(format!("invalid branch name: {}", e))
            })?;
        }

        if let Some(fork) = &self.fork {
            let valid = fork
                .split_once('/')
                .is_some_and(|(owner, name)| !owner.is_empty() && !name.is_empty() && !name.contains('/'));
            if !valid {
                return Err(ConfigError::InvalidValue(format!(
                    "fork must be 'owner/repo', got '{}'",
                    fork
                )));
            }
        }

        if let Some(workflow) = &self.workflow {
            workflow.validate()?;
        }

        Ok(())
    }
}

/// Editorial workflow defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct WorkflowConfig {
    /// How pull requests are merged ("merge", "squash" or "rebase")
    pub merge_method: Option<String>,

    /// Status of new entries
    pub initial_status: Option<String>,
}

impl WorkflowConfig {
    /// Valid merge methods.
    pub const VALID_MERGE_METHODS: &'static [&'static str] = &["merge", "squash", "rebase"];

    /// Validate the workflow configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(method) = &self.merge_method {
            if MergeMethod::parse(method).is_none() {
                return Err(ConfigError::InvalidValue(format!(
                    "invalid merge_method '{}', must be one of: {}",
                    method,
                    Self::VALID_MERGE_METHODS.join(", ")
                )));
            }
        }
        if let Some(status) = &self.initial_status {
            if EntryStatus::parse(status).is_none() {
                return Err(ConfigError::InvalidValue(format!(
                    "invalid initial_status '{}', must be one of: draft, pending_review, pending_publish",
                    status
                )));
            }
        }
        Ok(())
    }
}
