//! Application configuration loaded from CLI, environment, and files.
//!
//! This module provides a unified configuration struct that merges values
//! from command-line arguments, environment variables, and configuration
//! files using ortho-config's layered approach.
//!
//! # Precedence
//!
//! Configuration values are loaded with the following precedence (lowest to
//! highest):
//!
//! 1. **Defaults** – Built-in application defaults
//! 2. **Configuration file** – `.prospector.toml` in current directory, home
//!    directory, or XDG config directory
//! 3. **Environment variables** – `PROSPECTOR_PROVIDER`, `PROSPECTOR_TOKEN`,
//!    and so on; the token also falls back to the provider's conventional
//!    variable such as `GITHUB_TOKEN`
//! 4. **Command-line arguments** – `--provider`/`-p`, `--token`/`-t`, ...
//!
//! # Configuration File
//!
//! ```toml
//! provider = "gitlab"
//! api_url = "https://gitlab.example.com"
//! project = "platform/api"
//! labels = "preview,deploy"
//! branch_match = "^feature/"
//! ```

mod provider;

use std::env;

use camino::Utf8PathBuf;
use ortho_config::OrthoConfig;
use serde::{Deserialize, Serialize};

use crate::pull_request::{DiscoveryError, FilterSpec, TlsConfig};

pub use provider::ProviderKind;

/// Application configuration supporting CLI, environment, and file sources.
///
/// Which identifier fields a provider needs:
///
/// | Provider | `owner` | `project` | `repo` |
/// |---|---|---|---|
/// | GitHub, Gitea, Bitbucket Cloud | owner | | repository |
/// | GitLab | | project path or id (or `owner/repo`) | |
/// | Bitbucket Server | project key | | repository slug |
/// | Azure DevOps | organisation | project | repository |
/// | SCM-Manager | namespace | | repository name |
/// | SourceCraft | organisation | | repository |
#[derive(Debug, Clone, Default, Deserialize, Serialize, OrthoConfig)]
#[serde(default)]
#[ortho_config(
    prefix = "PROSPECTOR",
    discovery(
        dotfile_name = ".prospector.toml",
        config_file_name = "prospector.toml",
        app_name = "prospector"
    )
)]
pub struct ProspectorConfig {
    /// Hosting provider, e.g. `github` or `azure-devops`.
    ///
    /// Can be provided via:
    /// - CLI: `--provider <NAME>` or `-p <NAME>`
    /// - Environment: `PROSPECTOR_PROVIDER`
    /// - Config file: `provider = "..."`
    #[ortho_config(cli_short = 'p')]
    pub provider: Option<String>,

    /// API or server base URL; the provider's public default when unset.
    #[ortho_config()]
    pub api_url: Option<String>,

    /// Access token. Falls back to the provider's conventional environment
    /// variable; anonymous access when neither is set.
    ///
    /// Can be provided via:
    /// - CLI: `--token <TOKEN>` or `-t <TOKEN>`
    /// - Environment: `PROSPECTOR_TOKEN`, then e.g. `GITHUB_TOKEN`
    /// - Config file: `token = "..."`
    #[ortho_config(cli_short = 't')]
    pub token: Option<String>,

    /// User name for Bitbucket basic authentication. When set, `token` is
    /// used as the password.
    #[ortho_config()]
    pub username: Option<String>,

    /// Repository owner, organisation, namespace, or project key.
    #[ortho_config(cli_short = 'o')]
    pub owner: Option<String>,

    /// Repository name or slug.
    #[ortho_config(cli_short = 'r')]
    pub repo: Option<String>,

    /// GitLab project path or Azure DevOps project name.
    #[ortho_config()]
    pub project: Option<String>,

    /// Comma-separated labels every pull request must carry.
    #[ortho_config(cli_short = 'l')]
    pub labels: Option<String>,

    /// Pull request state filter, where the provider supports one.
    #[ortho_config()]
    pub state: Option<String>,

    /// Regular expression the source branch must match.
    #[ortho_config()]
    pub branch_match: Option<String>,

    /// Regular expression the target branch must match.
    #[ortho_config()]
    pub target_branch_match: Option<String>,

    /// Regular expression the title must match.
    #[ortho_config()]
    pub title_match: Option<String>,

    /// Skips TLS certificate verification.
    #[ortho_config()]
    pub insecure: bool,

    /// PEM bundle of additional trusted CA certificates.
    #[ortho_config()]
    pub ca_path: Option<String>,

    /// Fetches the files changed by each pull request (GitHub only).
    #[ortho_config()]
    pub changed_files: bool,

    /// Prints an empty list instead of failing when the repository does not
    /// exist.
    #[ortho_config()]
    pub ignore_missing_repository: bool,
}

impl ProspectorConfig {
    /// Returns the configured provider.
    ///
    /// # Errors
    ///
    /// Returns [`DiscoveryError::Configuration`] when no provider is set or
    /// the name is unknown.
    pub fn require_provider(&self) -> Result<ProviderKind, DiscoveryError> {
        self.provider
            .as_deref()
            .ok_or_else(|| DiscoveryError::Configuration {
                message: "provider is required (use --provider or -p)".to_owned(),
            })?
            .parse()
    }

    /// Resolves the token from configuration or the provider's conventional
    /// environment variable.
    ///
    /// Returns `None` when no source provides a non-blank value, which
    /// selects anonymous access.
    #[must_use]
    pub fn resolve_token(&self, provider: ProviderKind) -> Option<String> {
        self.token
            .clone()
            .or_else(|| env::var(provider.token_variable()).ok())
            .filter(|token| !token.trim().is_empty())
    }

    /// Returns the owner or an error naming the flag.
    ///
    /// # Errors
    ///
    /// Returns [`DiscoveryError::Configuration`] when the owner is missing.
    pub fn require_owner(&self) -> Result<&str, DiscoveryError> {
        require(self.owner.as_deref(), "repository owner", "--owner or -o")
    }

    /// Returns the repository or an error naming the flag.
    ///
    /// # Errors
    ///
    /// Returns [`DiscoveryError::Configuration`] when the repository is
    /// missing.
    pub fn require_repo(&self) -> Result<&str, DiscoveryError> {
        require(self.repo.as_deref(), "repository name", "--repo or -r")
    }

    /// Returns the project or an error naming the flag.
    ///
    /// # Errors
    ///
    /// Returns [`DiscoveryError::Configuration`] when the project is missing.
    pub fn require_project(&self) -> Result<&str, DiscoveryError> {
        require(self.project.as_deref(), "project", "--project")
    }

    /// Splits the comma-separated label list, dropping blank entries.
    #[must_use]
    pub fn label_list(&self) -> Vec<String> {
        self.labels
            .as_deref()
            .map(|raw| {
                raw.split(',')
                    .map(str::trim)
                    .filter(|label| !label.is_empty())
                    .map(ToOwned::to_owned)
                    .collect()
            })
            .unwrap_or_default()
    }

    /// The filter set described by the three match settings.
    ///
    /// Empty when no pattern is configured, so every pull request is kept.
    #[must_use]
    pub fn filter_specs(&self) -> Vec<FilterSpec> {
        let spec = FilterSpec {
            branch_match: self.branch_match.clone(),
            target_branch_match: self.target_branch_match.clone(),
            title_match: self.title_match.clone(),
        };
        if spec.is_empty() { Vec::new() } else { vec![spec] }
    }

    /// TLS trust policy for the reqwest-backed providers.
    #[must_use]
    pub fn tls(&self) -> TlsConfig {
        TlsConfig {
            insecure: self.insecure,
            ca_certs: Vec::new(),
            root_ca_path: self.ca_path.as_deref().map(Utf8PathBuf::from),
        }
    }
}

fn require<'a>(
    value: Option<&'a str>,
    field: &str,
    flag: &str,
) -> Result<&'a str, DiscoveryError> {
    value
        .map(str::trim)
        .filter(|inner| !inner.is_empty())
        .ok_or_else(|| DiscoveryError::Configuration {
            message: format!("{field} is required (use {flag})"),
        })
}

#[cfg(test)]
mod tests;
