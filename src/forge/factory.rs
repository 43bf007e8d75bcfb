//! forge::factory
//!
//! Forge selection and creation.
//!
//! # Design
//!
//! Commands use `create_forge()` instead of importing a specific forge
//! implementation. The provider is picked once, at configuration time; the
//! rest of the crate only sees `Arc<dyn Forge>`.
//!
//! # Provider Detection
//!
//! - GitHub URLs (`github.com`) and `owner/repo` shorthand → `GitHubForge`
//! - `gitlab` is a known provider name that has no implementation
//!
//! # Example
//!
//! ```ignore
//! use draftwork::forge::create_forge;
//!
//! let forge = create_forge("git@github.com:owner/repo.git", "ghp_token", None, None)?;
//! ```

use std::sync::Arc;

use super::github::{parse_github_url, GitHubForge, DEFAULT_API_BASE};
use super::traits::{Forge, ForgeError};

/// Supported forge providers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ForgeProvider {
    GitHub,
}

impl ForgeProvider {
    /// Get all available providers.
    ///
    /// # Example
    ///
    /// ```
    /// use draftwork::forge::ForgeProvider;
    ///
    /// assert!(ForgeProvider::all().contains(&ForgeProvider::GitHub));
    /// ```
    pub fn all() -> &'static [ForgeProvider] {
        &[ForgeProvider::GitHub]
    }

    /// Get the provider name as used in configuration files.
    pub fn name(&self) -> &'static str {
        match self {
            ForgeProvider::GitHub => "github",
        }
    }

    /// Parse a provider from a string.
    ///
    /// # Example
    ///
    /// ```
    /// use draftwork::forge::ForgeProvider;
    ///
    /// assert_eq!(ForgeProvider::parse("GitHub"), Some(ForgeProvider::GitHub));
    /// assert_eq!(ForgeProvider::parse("gitlab"), None);
    /// ```
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "github" => Some(ForgeProvider::GitHub),
            _ => None,
        }
    }
}

impl std::fmt::Display for ForgeProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Detect the forge provider from a remote URL.
///
/// # Example
///
/// ```
/// use draftwork::forge::{detect_provider, ForgeProvider};
///
/// assert_eq!(
///     detect_provider("git@github.com:owner/repo.git"),
///     Some(ForgeProvider::GitHub)
/// );
/// ```
pub fn detect_provider(remote_url: &str) -> Option<ForgeProvider> {
    parse_github_url(remote_url).map(|_| ForgeProvider::GitHub)
}

/// Create a forge for a repository.
///
/// # Arguments
///
/// * `repo` - Remote URL or `owner/repo`
/// * `token` - Authentication token for the forge
/// * `provider_override` - Provider name instead of auto-detection
/// * `api_base` - API base URL for self-hosted instances
///
/// # Errors
///
/// - `ForgeError::NotImplemented` if the provider is known but has no implementation
/// - `ForgeError::NotFound` if the provider is unknown or the URL cannot be parsed
pub fn create_forge(
    repo: &str,
    token: &str,
    provider_override: Option<&str>,
    api_base: Option<&str>,
) -> Result<Arc<dyn Forge>, ForgeError> {
    let provider = match provider_override {
        Some(name) => resolve_provider_override(name)?,
        None => detect_provider(repo).ok_or_else(|| {
            ForgeError::NotFound(format!(
                "Could not detect forge provider from '{}'. Supported forges: {}",
                repo,
                available_providers_string()
            ))
        })?,
    };

    match provider {
        ForgeProvider::GitHub => {
            let (owner, name) = parse_github_url(repo).ok_or_else(|| {
                ForgeError::NotFound(format!(
                    "Could not parse '{}' as a GitHub repository. \
                     Expected owner/repo, git@github.com:owner/repo.git or https://github.com/owner/repo",
                    repo
                ))
            })?;
            let base = api_base.unwrap_or(DEFAULT_API_BASE);
            Ok(Arc::new(GitHubForge::with_api_base(token, owner, name, base)))
        }
    }
}

/// Resolve a provider override string to a ForgeProvider.
fn resolve_provider_override(name: &str) -> Result<ForgeProvider, ForgeError> {
    if let Some(provider) = ForgeProvider::parse(name) {
        return Ok(provider);
    }

    if is_known_but_unimplemented(name) {
        return Err(ForgeError::NotImplemented(format!(
            "Forge '{}' is not supported yet",
            name
        )));
    }

    Err(ForgeError::NotFound(format!(
        "Unknown forge provider '{}'. Available providers: {}",
        name,
        available_providers_string()
    )))
}

fn is_known_but_unimplemented(name: &str) -> bool {
    name.eq_ignore_ascii_case("gitlab")
}

/// Get a comma-separated string of available providers.
fn available_providers_string() -> String {
    ForgeProvider::all()
        .iter()
        .map(|p| p.name())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Known forge names, for configuration validation.
///
/// Includes names without an implementation so a config can name them and
/// fail with a clear error at connection time.
pub fn valid_forge_names() -> &'static [&'static str] {
    &["github", "gitlab"]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn github_url_auto_detect() {
        let forge = create_forge("git@github.com:octo/blog.git", "t", None, None).unwrap();
        assert_eq!(forge.name(), "github");
        assert_eq!(forge.full_name(), "octo/blog");
    }

    #[test]
    fn shorthand_with_explicit_provider() {
        let forge = create_forge("octo/blog", "t", Some("github"), None).unwrap();
        assert_eq!(forge.full_name(), "octo/blog");
    }

    #[test]
    fn unknown_url_returns_error() {
        let result = create_forge("https://example.com/x/y", "t", None, None);
        assert!(matches!(result, Err(ForgeError::NotFound(_))));
    }

    #[test]
    fn gitlab_is_not_implemented() {
        let result = create_forge("octo/blog", "t", Some("gitlab"), None);
        assert!(matches!(result, Err(ForgeError::NotImplemented(_))));
    }

    #[test]
    fn unknown_provider_override_returns_error() {
        let result = create_forge("octo/blog", "t", Some("bitbucket"), None);
        match result {
            Err(ForgeError::NotFound(msg)) => assert!(msg.contains("bitbucket")),
            other => panic!("expected NotFound, got {:?}", other.map(|f| f.name())),
        }
    }

    #[test]
    fn valid_names_include_gitlab() {
        assert!(valid_forge_names().contains(&"github"));
        assert!(valid_forge_names().contains(&"gitlab"));
    }
}
