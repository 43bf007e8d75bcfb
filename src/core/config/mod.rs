//! core::config
//!
//! Configuration schema and loading.
//!
//! # Overview
//!
//! Draftwork has two configuration scopes:
//! - **Global**: User-level settings (forge, API base, token variable)
//! - **Project**: The content repository and workflow defaults
//!
//! # Precedence
//!
//! Configuration values are resolved in this order (later overrides earlier):
//! 1. Default values
//! 2. Global config file
//! 3. Project config file
//! 4. CLI flags (not handled here)
//!
//! # Global Config Locations
//!
//! Searched in order:
//! 1. `$DRAFTWORK_CONFIG` if set
//! 2. `$XDG_CONFIG_HOME/draftwork/config.toml`
//! 3. `~/.draftwork/config.toml` (canonical write location)
//!
//! # Project Config Location
//!
//! `draftwork.toml` in the project directory.
//!
//! # Example
//!
//! ```no_run
//! use draftwork::core::config::Config;
//! use std::path::Path;
//!
//! let config = Config::load(Some(Path::new("/path/to/site"))).unwrap();
//! println!("Repository: {:?}", config.repo());
//! println!("Branch: {}", config.branch().unwrap());
//! println!("Token variable: {}", config.token_env());
//! ```

pub mod schema;

pub use schema::{GlobalConfig, ProjectConfig, WorkflowConfig};

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::core::metadata::EntryStatus;
use crate::core::types::BranchName;
use crate::forge::MergeMethod;

/// File name of the project config.
pub const PROJECT_CONFIG_FILE: &str = "draftwork.toml";

/// Token variable used when `token_env` is not configured.
pub const DEFAULT_TOKEN_ENV: &str = "DRAFTWORK_TOKEN";

/// Errors from configuration operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file '{path}': {source}")]
    ReadError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config file '{path}': {message}")]
    ParseError { path: PathBuf, message: String },

    #[error("failed to write config file '{path}': {source}")]
    WriteError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid config value: {0}")]
    InvalidValue(String),

    #[error("no repository configured; set `repo` in {PROJECT_CONFIG_FILE}")]
    MissingRepo,

    #[error("no access token; set the {0} environment variable")]
    MissingToken(String),

    #[error("home directory not found")]
    NoHomeDir,
}

/// Merged configuration from all sources.
///
/// This struct provides accessor methods that apply precedence rules
/// automatically.
#[derive(Debug, Clone, Default)]
pub struct Config {
    /// Global configuration
    pub global: GlobalConfig,
    /// Project configuration (if a project file was found)
    pub project: Option<ProjectConfig>,
    /// Path to the global config file (if loaded)
    global_path: Option<PathBuf>,
    /// Path to the project config file (if loaded)
    project_path: Option<PathBuf>,
}

impl Config {
    /// Load configuration from default locations.
    ///
    /// If `project_dir` is provided, also loads `draftwork.toml` from it.
    ///
    /// # Errors
    ///
    /// Returns an error if config files exist but cannot be parsed.
    /// Missing config files are not an error (defaults are used).
    pub fn load(project_dir: Option<&Path>) -> Result<Config, ConfigError> {
        let global_path = Self::find_global();
        Self::load_from(global_path.as_deref(), project_dir)
    }

    /// Load configuration from an explicit global file.
    pub fn load_from(
        global_path: Option<&Path>,
        project_dir: Option<&Path>,
    ) -> Result<Config, ConfigError> {
        let global = match global_path {
            Some(path) => Self::read_config::<GlobalConfig>(path)?,
            None => GlobalConfig::default(),
        };

        let (project, project_path) = match project_dir {
            Some(dir) => {
                let path = Self::project_config_path(dir);
                if path.exists() {
                    (Some(Self::read_config::<ProjectConfig>(&path)?), Some(path))
                } else {
                    (None, None)
                }
            }
            None => (None, None),
        };

        global.validate()?;
        if let Some(ref p) = project {
            p.validate()?;
        }

        Ok(Config {
            global,
            project,
            global_path: global_path.map(Path::to_path_buf),
            project_path,
        })
    }

    /// Locate the global config file.
    fn find_global() -> Option<PathBuf> {
        // 1. Check $DRAFTWORK_CONFIG
        if let Ok(path) = std::env::var("DRAFTWORK_CONFIG") {
            let path = PathBuf::from(path);
            if path.exists() {
                return Some(path);
            }
        }

        // 2. Check $XDG_CONFIG_HOME/draftwork/config.toml
        if let Ok(xdg_home) = std::env::var("XDG_CONFIG_HOME") {
            let path = PathBuf::from(xdg_home).join("draftwork/config.toml");
            if path.exists() {
                return Some(path);
            }
        }

        // 3. Check ~/.draftwork/config.toml
        dirs::home_dir()
            .map(|home| home.join(".draftwork/config.toml"))
            .filter(|path| path.exists())
    }

    fn read_config<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, ConfigError> {
        let contents = fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            source: e,
        })?;

        toml::from_str(&contents).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }

    /// Get the canonical path for global config.
    ///
    /// Returns `~/.draftwork/config.toml`.
    pub fn global_config_path() -> Result<PathBuf, ConfigError> {
        let home = dirs::home_dir().ok_or(ConfigError::NoHomeDir)?;
        Ok(home.join(".draftwork/config.toml"))
    }

    /// Get the path for project config in `dir`.
    pub fn project_config_path(dir: &Path) -> PathBuf {
        dir.join(PROJECT_CONFIG_FILE)
    }

    /// Write global config atomically.
    pub fn write_global(config: &GlobalConfig) -> Result<PathBuf, ConfigError> {
        let path = Self::global_config_path()?;
        Self::write_config_atomic(&path, config)?;
        Ok(path)
    }

    /// Write project config atomically.
    ///
    /// Uses atomic write (write to temp file, then rename) so a reader never
    /// sees a partial file.
    pub fn write_project(dir: &Path, config: &ProjectConfig) -> Result<PathBuf, ConfigError> {
        config.validate()?;
        let path = Self::project_config_path(dir);
        Self::write_config_atomic(&path, config)?;
        Ok(path)
    }

    fn write_config_atomic<T: serde::Serialize>(
        path: &Path,
        config: &T,
    ) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| ConfigError::WriteError {
                path: path.to_path_buf(),
                source: e,
            })?;
        }

        let contents =
            toml::to_string_pretty(config).map_err(|e| ConfigError::InvalidValue(e.to_string()))?;

        // Temp file in the same directory so the rename stays on one filesystem.
        let temp_path = path.with_extension("toml.tmp");
        let mut file = fs::File::create(&temp_path).map_err(|e| ConfigError::WriteError {
            path: temp_path.clone(),
            source: e,
        })?;

        file.write_all(contents.as_bytes())
            .map_err(|e| ConfigError::WriteError {
                path: temp_path.clone(),
                source: e,
            })?;

        file.sync_all().map_err(|e| ConfigError::WriteError {
            path: temp_path.clone(),
            source: e,
        })?;

        fs::rename(&temp_path, path).map_err(|e| ConfigError::WriteError {
            path: path.to_path_buf(),
            source: e,
        })?;

        Ok(())
    }

    // =========================================================================
    // Accessor methods with precedence
    // =========================================================================

    /// Get the default forge.
    ///
    /// Defaults to "github" if not configured.
    pub fn default_forge(&self) -> &str {
        self.global.default_forge.as_deref().unwrap_or("github")
    }

    /// API base URL override for self-hosted instances.
    pub fn api_base(&self) -> Option<&str> {
        self.global.api_base.as_deref()
    }

    /// Environment variable holding the access token.
    ///
    /// Defaults to `DRAFTWORK_TOKEN`.
    pub fn token_env(&self) -> &str {
        self.global.token_env.as_deref().unwrap_or(DEFAULT_TOKEN_ENV)
    }

    /// Read the access token from the configured environment variable.
    pub fn token(&self) -> Result<String, ConfigError> {
        let var = self.token_env();
        match std::env::var(var) {
            Ok(token) if !token.is_empty() => Ok(token),
            _ => Err(ConfigError::MissingToken(var.to_string())),
        }
    }

    /// Content repository (`owner/repo` or remote URL).
    pub fn repo(&self) -> Option<&str> {
        self.project.as_ref().and_then(|p| p.repo.as_deref())
    }

    /// Like [`repo`](Self::repo) but required.
    pub fn require_repo(&self) -> Result<&str, ConfigError> {
        self.repo().ok_or(ConfigError::MissingRepo)
    }

    /// Fork for open authoring, if configured.
    pub fn fork(&self) -> Option<&str> {
        self.project.as_ref().and_then(|p| p.fork.as_deref())
    }

    /// Default branch.
    ///
    /// Defaults to `main` if not configured.
    pub fn branch(&self) -> Result<BranchName, ConfigError> {
        match self.project.as_ref().and_then(|p| p.branch.as_deref()) {
            Some(branch) => BranchName::new(branch)
                .map_err(|e| ConfigError::InvalidValue(format!("invalid branch name: {}", e))),
            None => Ok(BranchName::main()),
        }
    }

    /// Merge method used on publish.
    ///
    /// Defaults to `merge` if not configured.
    pub fn merge_method(&self) -> MergeMethod {
        self.workflow()
            .and_then(|w| w.merge_method.as_deref())
            .and_then(MergeMethod::parse)
            .unwrap_or_default()
    }

    /// Status of new entries.
    ///
    /// Defaults to `draft` if not configured.
    pub fn initial_status(&self) -> EntryStatus {
        self.workflow()
            .and_then(|w| w.initial_status.as_deref())
            .and_then(EntryStatus::parse)
            .unwrap_or_default()
    }

    fn workflow(&self) -> Option<&WorkflowConfig> {
        self.project.as_ref().and_then(|p| p.workflow.as_ref())
    }

    /// Get the path to the loaded global config file.
    pub fn global_config_loaded_from(&self) -> Option<&Path> {
        self.global_path.as_deref()
    }

    /// Get the path to the loaded project config file.
    pub fn project_config_loaded_from(&self) -> Option<&Path> {
        self.project_path.as_deref()
    }
}
