//! Provider selection for the command-line front end.

use std::fmt;
use std::str::FromStr;

use crate::pull_request::DiscoveryError;

/// Hosting provider named by the `provider` setting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderKind {
    /// GitHub or GitHub Enterprise.
    Github,
    /// GitLab.
    Gitlab,
    /// Gitea or Forgejo.
    Gitea,
    /// Bitbucket Server / Data Center.
    BitbucketServer,
    /// Bitbucket Cloud.
    BitbucketCloud,
    /// Azure DevOps Services or Server.
    AzureDevOps,
    /// SCM-Manager.
    ScmManager,
    /// SourceCraft.
    SourceCraft,
}

impl ProviderKind {
    /// Every supported provider, in display order.
    pub const ALL: [Self; 8] = [
        Self::Github,
        Self::Gitlab,
        Self::Gitea,
        Self::BitbucketServer,
        Self::BitbucketCloud,
        Self::AzureDevOps,
        Self::ScmManager,
        Self::SourceCraft,
    ];

    /// Name accepted on the command line and in configuration files.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Github => "github",
            Self::Gitlab => "gitlab",
            Self::Gitea => "gitea",
            Self::BitbucketServer => "bitbucket-server",
            Self::BitbucketCloud => "bitbucket-cloud",
            Self::AzureDevOps => "azure-devops",
            Self::ScmManager => "scm-manager",
            Self::SourceCraft => "sourcecraft",
        }
    }

    /// Conventional environment variable holding a token for this provider.
    #[must_use]
    pub const fn token_variable(self) -> &'static str {
        match self {
            Self::Github => "GITHUB_TOKEN",
            Self::Gitlab => "GITLAB_TOKEN",
            Self::Gitea => "GITEA_TOKEN",
            Self::BitbucketServer | Self::BitbucketCloud => "BITBUCKET_TOKEN",
            Self::AzureDevOps => "AZURE_DEVOPS_TOKEN",
            Self::ScmManager => "SCM_MANAGER_TOKEN",
            Self::SourceCraft => "SOURCECRAFT_TOKEN",
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.name())
    }
}

impl FromStr for ProviderKind {
    type Err = DiscoveryError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalised = value.trim().to_ascii_lowercase().replace('_', "-");
        Self::ALL
            .into_iter()
            .find(|kind| kind.name() == normalised)
            .ok_or_else(|| {
                let known: Vec<&str> = Self::ALL.iter().map(|kind| kind.name()).collect();
                DiscoveryError::Configuration {
                    message: format!(
                        "unknown provider '{value}' (expected one of: {})",
                        known.join(", ")
                    ),
                }
            })
    }
}
