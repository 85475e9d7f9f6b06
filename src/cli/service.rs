//! Adapter selection.

use prospector::config::{ProspectorConfig, ProviderKind};
use prospector::pull_request::providers::{
    AzureDevOpsOptions, AzureDevOpsService, BitbucketCloudOptions, BitbucketCloudService,
    BitbucketServerOptions, BitbucketServerService, GiteaOptions, GiteaService, GithubOptions,
    GithubService, GitlabOptions, GitlabService, ScmManagerOptions, ScmManagerService,
    SourceCraftOptions, SourceCraftService,
};
use prospector::pull_request::{AuthProvider, DiscoveryError, PullRequestService};

/// Builds the adapter named by `config.provider`.
///
/// # Errors
///
/// Returns [`DiscoveryError::Configuration`] when the provider or one of its
/// identifiers is missing, and [`DiscoveryError::Provider`] when the adapter
/// rejects its settings.
pub fn build_service(
    config: &ProspectorConfig,
) -> Result<Box<dyn PullRequestService>, DiscoveryError> {
    let provider = config.require_provider()?;
    let token = config.resolve_token(provider).unwrap_or_default();
    tracing::debug!(%provider, anonymous = token.is_empty(), "building provider adapter");

    match provider {
        ProviderKind::Github => github(config, token),
        ProviderKind::Gitlab => gitlab(config, token),
        ProviderKind::Gitea => gitea(config, token),
        ProviderKind::BitbucketServer => bitbucket_server(config, &token),
        ProviderKind::BitbucketCloud => bitbucket_cloud(config, &token),
        ProviderKind::AzureDevOps => azure_devops(config, &token),
        ProviderKind::ScmManager => scm_manager(config, token),
        ProviderKind::SourceCraft => sourcecraft(config, token),
    }
}

fn github(
    config: &ProspectorConfig,
    token: String,
) -> Result<Box<dyn PullRequestService>, DiscoveryError> {
    let service = GithubService::new(GithubOptions {
        base_url: config.api_url.clone(),
        token,
        owner: config.require_owner()?.to_owned(),
        repository: config.require_repo()?.to_owned(),
        labels: config.label_list(),
        include_changed_files: config.changed_files,
    })?;
    Ok(Box::new(service))
}

fn gitlab(
    config: &ProspectorConfig,
    token: String,
) -> Result<Box<dyn PullRequestService>, DiscoveryError> {
    let service = GitlabService::new(GitlabOptions {
        base_url: config.api_url.clone(),
        token,
        project: gitlab_project(config)?,
        labels: config.label_list(),
        state: config.state.clone(),
        tls: config.tls(),
    })?;
    Ok(Box::new(service))
}

/// The GitLab project, or `owner/repo` when no project is configured.
fn gitlab_project(config: &ProspectorConfig) -> Result<String, DiscoveryError> {
    if let Ok(project) = config.require_project() {
        return Ok(project.to_owned());
    }
    Ok(format!(
        "{}/{}",
        config.require_owner()?,
        config.require_repo()?
    ))
}

fn gitea(
    config: &ProspectorConfig,
    token: String,
) -> Result<Box<dyn PullRequestService>, DiscoveryError> {
    let service = GiteaService::new(GiteaOptions {
        base_url: config.api_url.clone(),
        token,
        owner: config.require_owner()?.to_owned(),
        repository: config.require_repo()?.to_owned(),
        labels: config.label_list(),
        tls: config.tls(),
    })?;
    Ok(Box::new(service))
}

/// Basic auth when a user name is configured, otherwise a bearer token or
/// anonymous access.
fn bitbucket_auth(config: &ProspectorConfig, token: &str) -> AuthProvider {
    match config.username.as_deref().map(str::trim) {
        Some(username) if !username.is_empty() => AuthProvider::Basic {
            username: username.to_owned(),
            password: token.to_owned(),
        },
        _ => AuthProvider::from_token(token),
    }
}

fn bitbucket_server(
    config: &ProspectorConfig,
    token: &str,
) -> Result<Box<dyn PullRequestService>, DiscoveryError> {
    let options = BitbucketServerOptions {
        base_url: config.api_url.clone(),
        project_key: config.require_owner()?.to_owned(),
        repository_slug: config.require_repo()?.to_owned(),
        tls: config.tls(),
    };
    let service = BitbucketServerService::new(&options, &bitbucket_auth(config, token))?;
    Ok(Box::new(service))
}

fn bitbucket_cloud(
    config: &ProspectorConfig,
    token: &str,
) -> Result<Box<dyn PullRequestService>, DiscoveryError> {
    let options = BitbucketCloudOptions {
        base_url: config.api_url.clone(),
        owner: config.require_owner()?.to_owned(),
        repository_slug: config.require_repo()?.to_owned(),
        tls: config.tls(),
    };
    let service = BitbucketCloudService::new(&options, &bitbucket_auth(config, token))?;
    Ok(Box::new(service))
}

fn azure_devops(
    config: &ProspectorConfig,
    token: &str,
) -> Result<Box<dyn PullRequestService>, DiscoveryError> {
    let options = AzureDevOpsOptions {
        base_url: config.api_url.clone(),
        organization: config.require_owner()?.to_owned(),
        project: config.require_project()?.to_owned(),
        repository: config.require_repo()?.to_owned(),
        labels: config.label_list(),
        tls: config.tls(),
    };
    let service = AzureDevOpsService::with_token(&options, token)?;
    Ok(Box::new(service))
}

fn scm_manager(
    config: &ProspectorConfig,
    token: String,
) -> Result<Box<dyn PullRequestService>, DiscoveryError> {
    let options = ScmManagerOptions {
        base_url: config.api_url.clone(),
        token,
        namespace: config.require_owner()?.to_owned(),
        name: config.require_repo()?.to_owned(),
        tls: config.tls(),
    };
    Ok(Box::new(ScmManagerService::new(&options)?))
}

fn sourcecraft(
    config: &ProspectorConfig,
    token: String,
) -> Result<Box<dyn PullRequestService>, DiscoveryError> {
    let service = SourceCraftService::new(SourceCraftOptions {
        base_url: config.api_url.clone(),
        token,
        organization: config.require_owner()?.to_owned(),
        repository: config.require_repo()?.to_owned(),
        labels: config.label_list(),
        tls: config.tls(),
    })?;
    Ok(Box::new(service))
}
