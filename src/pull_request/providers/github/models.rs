//! GitHub pull request payloads.

use serde::Deserialize;

use crate::pull_request::models::{PullRequest, pull_request_number, required};
use crate::pull_request::normalise::strip_branch_ref;

#[derive(Debug, Clone, Deserialize)]
pub(super) struct ApiPullRequest {
    number: Option<u64>,
    title: Option<String>,
    head: Option<ApiBranchRef>,
    base: Option<ApiBranchRef>,
    #[serde(default)]
    labels: Vec<ApiLabel>,
    user: Option<ApiUser>,
}

#[derive(Debug, Clone, Deserialize)]
struct ApiBranchRef {
    #[serde(rename = "ref")]
    name: Option<String>,
    sha: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct ApiLabel {
    name: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct ApiUser {
    login: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub(super) struct ApiChangedFile {
    pub(super) filename: Option<String>,
}

impl ApiPullRequest {
    /// Names of the labels that carry one.
    pub(super) fn label_names(&self) -> Vec<String> {
        self.labels
            .iter()
            .filter_map(|label| label.name.clone())
            .collect()
    }

    /// Converts the payload, or returns `None` when the number, head branch,
    /// or head SHA is missing.
    pub(super) fn into_pull_request(self) -> Option<PullRequest> {
        let labels = self.label_names();
        let number = pull_request_number(self.number?)?;
        let head = self.head?;
        let branch = required(head.name)?;
        let head_sha = required(head.sha)?;
        let target_branch = self.base.and_then(|base| base.name).unwrap_or_default();

        Some(PullRequest {
            number,
            title: self.title.unwrap_or_default(),
            branch: strip_branch_ref(&branch).to_owned(),
            target_branch: strip_branch_ref(&target_branch).to_owned(),
            head_sha,
            labels,
            author: self.user.and_then(|user| user.login).unwrap_or_default(),
            changed_files: Vec::new(),
        })
    }
}
