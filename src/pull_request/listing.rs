//! Filter-then-list orchestration.

use super::PullRequestService;
use super::error::DiscoveryError;
use super::filter::{FilterSpec, compile_filters, matches_any};
use super::models::PullRequest;

/// Lists pull requests from `service` and keeps those matching `filters`.
///
/// Filters are compiled before any network call. An empty filter list
/// returns the adapter's result unchanged; otherwise a pull request is kept
/// when at least one filter matches it. Adapter order is preserved.
///
/// # Errors
///
/// Returns [`DiscoveryError::Filter`] for an invalid pattern (the adapter is
/// never called) and [`DiscoveryError::Provider`] when the adapter fails,
/// including the repository-not-found sentinel.
pub async fn list_pull_requests<S>(
    service: &S,
    filters: &[FilterSpec],
) -> Result<Vec<PullRequest>, DiscoveryError>
where
    S: PullRequestService + ?Sized,
{
    let compiled = compile_filters(filters)?;
    let pull_requests = service.list().await?;
    if compiled.is_empty() {
        return Ok(pull_requests);
    }

    let discovered = pull_requests.len();
    let kept: Vec<PullRequest> = pull_requests
        .into_iter()
        .filter(|pull_request| matches_any(&compiled, pull_request))
        .collect();
    tracing::debug!(
        discovered,
        kept = kept.len(),
        filters = compiled.len(),
        "filtered pull requests"
    );
    Ok(kept)
}

#[cfg(test)]
mod tests {
    use rstest::{fixture, rstest};

    use super::list_pull_requests;
    use crate::pull_request::error::{
        DiscoveryError, ProviderError, RecoverNotFound, RepositoryNotFoundError,
    };
    use crate::pull_request::filter::FilterSpec;
    use crate::pull_request::models::PullRequest;
    use crate::pull_request::{MockPullRequestService, PullRequestService};

    fn pull_request(number: u64, branch: &str, title: &str) -> PullRequest {
        PullRequest {
            number,
            title: title.to_owned(),
            branch: branch.to_owned(),
            target_branch: "master".to_owned(),
            head_sha: "089d92cbf9ff857a39e6feccd32798ca700fb958".to_owned(),
            author: "name1".to_owned(),
            ..PullRequest::default()
        }
    }

    fn branch_filter(pattern: &str) -> FilterSpec {
        FilterSpec {
            branch_match: Some(pattern.to_owned()),
            ..FilterSpec::default()
        }
    }

    fn title_filter(pattern: &str) -> FilterSpec {
        FilterSpec {
            title_match: Some(pattern.to_owned()),
            ..FilterSpec::default()
        }
    }

    fn service_returning(pull_requests: Vec<PullRequest>) -> MockPullRequestService {
        let mut service = MockPullRequestService::new();
        service
            .expect_list()
            .times(1)
            .returning(move || Ok(pull_requests.clone()));
        service
    }

    #[fixture]
    fn branches() -> Vec<PullRequest> {
        vec![
            pull_request(1, "one", "PR one"),
            pull_request(2, "two", "PR two"),
            pull_request(3, "three", "PR three"),
            pull_request(4, "four", "PR four"),
        ]
    }

    fn branch_names(pull_requests: &[PullRequest]) -> Vec<&str> {
        pull_requests
            .iter()
            .map(|pull_request| pull_request.branch.as_str())
            .collect()
    }

    #[rstest]
    #[tokio::test]
    async fn single_branch_filter_keeps_matches(branches: Vec<PullRequest>) {
        let service = service_returning(branches);

        let result = list_pull_requests(&service, &[branch_filter("w")])
            .await
            .expect("listing should succeed");

        assert_eq!(branch_names(&result), vec!["two"]);
    }

    #[rstest]
    #[tokio::test]
    async fn multiple_filters_are_combined_with_or(branches: Vec<PullRequest>) {
        let service = service_returning(branches);

        let result = list_pull_requests(&service, &[branch_filter("w"), branch_filter("r")])
            .await
            .expect("listing should succeed");

        assert_eq!(branch_names(&result), vec!["two", "three", "four"]);
    }

    #[tokio::test]
    async fn title_filters_keep_adapter_order() {
        let service = service_returning(vec![
            pull_request(1, "one", "PR one - filter"),
            pull_request(2, "two", "PR two - ignore"),
            pull_request(3, "three", "[filter] PR three"),
            pull_request(4, "four", "[ignore] PR four"),
        ]);

        let result = list_pull_requests(&service, &[title_filter(r"\[filter]"), title_filter("- filter")])
            .await
            .expect("listing should succeed");

        assert_eq!(branch_names(&result), vec!["one", "three"]);
    }

    #[tokio::test]
    async fn fields_within_one_filter_are_combined_with_and() {
        let mut release = pull_request(2, "feature/b", "Fix build");
        release.target_branch = "release".to_owned();
        let service = service_returning(vec![pull_request(1, "feature/a", "Fix docs"), release]);
        let filter = FilterSpec {
            branch_match: Some("^feature/".to_owned()),
            target_branch_match: Some("^release$".to_owned()),
            title_match: None,
        };

        let result = list_pull_requests(&service, &[filter])
            .await
            .expect("listing should succeed");

        assert_eq!(branch_names(&result), vec!["feature/b"]);
    }

    #[rstest]
    #[tokio::test]
    async fn empty_filter_list_returns_adapter_result_unchanged(branches: Vec<PullRequest>) {
        let service = service_returning(branches.clone());

        let result = list_pull_requests(&service, &[])
            .await
            .expect("listing should succeed");

        assert_eq!(result, branches);
    }

    #[rstest]
    #[tokio::test]
    async fn result_never_exceeds_adapter_result(branches: Vec<PullRequest>) {
        let filter_sets = [
            vec![branch_filter("o")],
            vec![branch_filter("^$")],
            vec![FilterSpec::default()],
            vec![branch_filter("e"), title_filter("PR")],
        ];
        for filters in filter_sets {
            let service = service_returning(branches.clone());
            let result = list_pull_requests(&service, &filters)
                .await
                .expect("listing should succeed");
            assert!(result.len() <= branches.len());
        }
    }

    #[tokio::test]
    async fn invalid_pattern_fails_before_listing() {
        let mut service = MockPullRequestService::new();
        service.expect_list().times(0);

        let error = list_pull_requests(&service, &[branch_filter("ok"), title_filter("(")])
            .await
            .expect_err("invalid pattern should fail");

        assert!(matches!(error, DiscoveryError::Filter(_)), "got {error:?}");
    }

    #[tokio::test]
    async fn adapter_failures_are_propagated() {
        let mut service = MockPullRequestService::new();
        service.expect_list().times(1).returning(|| {
            Err(ProviderError::Network {
                message: "list pull requests failed: connection reset".to_owned(),
            })
        });

        let error = list_pull_requests(&service, &[branch_filter("w")])
            .await
            .expect_err("adapter failure should propagate");

        assert!(matches!(error, DiscoveryError::Provider(ProviderError::Network { .. })));
    }

    #[tokio::test]
    async fn missing_repository_can_be_recovered_by_the_caller() {
        let mut service = MockPullRequestService::new();
        service.expect_list().times(1).returning(|| {
            Err(RepositoryNotFoundError::new(ProviderError::Api {
                status: None,
                message: "list pull requests failed: 404 Not Found".to_owned(),
            })
            .into())
        });

        let result = list_pull_requests(&service, &[]).await;
        assert!(
            result.as_ref().is_err_and(DiscoveryError::is_repository_not_found),
            "expected not-found sentinel, got {result:?}"
        );
        assert_eq!(result.or_empty_when_not_found(), Ok(Vec::new()));
    }

    #[tokio::test]
    async fn works_through_trait_objects() {
        let service: Box<dyn PullRequestService> =
            Box::new(service_returning(vec![pull_request(7, "dev", "Dev")]));

        let result = list_pull_requests(service.as_ref(), &[])
            .await
            .expect("listing should succeed");

        assert_eq!(result.len(), 1);
    }
}
