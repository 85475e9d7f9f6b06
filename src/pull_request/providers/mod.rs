//! Provider adapters.
//!
//! Each adapter implements [`PullRequestService`](super::PullRequestService)
//! for one hosting provider and is built from its own options type.

pub mod azure_devops;
pub mod bitbucket_cloud;
pub mod bitbucket_server;
pub mod gitea;
pub mod github;
pub mod gitlab;
pub mod scm_manager;
pub mod sourcecraft;

pub use azure_devops::{AzureDevOpsOptions, AzureDevOpsService};
pub use bitbucket_cloud::{BitbucketCloudOptions, BitbucketCloudService};
pub use bitbucket_server::{BitbucketServerOptions, BitbucketServerService};
pub use gitea::{GiteaOptions, GiteaService};
pub use github::{GithubOptions, GithubService};
pub use gitlab::{GitlabOptions, GitlabService};
pub use scm_manager::{ScmManagerOptions, ScmManagerService};
pub use sourcecraft::{SourceCraftOptions, SourceCraftService};
