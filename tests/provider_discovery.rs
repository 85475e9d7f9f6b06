//! End-to-end discovery against mock provider APIs through the public API.

use std::error::Error as StdError;

use prospector::pull_request::providers::{
    BitbucketServerOptions, BitbucketServerService, GitlabOptions, GitlabService,
};
use prospector::{FilterSpec, RecoverNotFound, is_repository_not_found_error, list_pull_requests};
use serde_json::{Value, json};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn merge_request(iid: i64, branch: &str, title: &str) -> Value {
    json!({
        "iid": iid,
        "title": title,
        "source_branch": branch,
        "target_branch": "main",
        "sha": format!("{iid:040x}"),
        "labels": ["deploy"],
        "author": { "username": "maintainer" }
    })
}

#[tokio::test]
async fn gitlab_merge_requests_are_paged_and_filtered() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v4/projects/platform%2Fapi/merge_requests"))
        .and(query_param("labels", "deploy"))
        .and(query_param("page", "1"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!([
                    merge_request(11, "feature/login", "Add login"),
                    merge_request(12, "fix/typo", "Fix typo"),
                ]))
                .insert_header("X-Next-Page", "2"),
        )
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v4/projects/platform%2Fapi/merge_requests"))
        .and(query_param("page", "2"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!([merge_request(13, "feature/logout", "Add logout")])),
        )
        .expect(1)
        .mount(&server)
        .await;

    let service = GitlabService::new(GitlabOptions {
        base_url: Some(server.uri()),
        token: "glpat-test".to_owned(),
        project: "platform/api".to_owned(),
        labels: vec!["deploy".to_owned()],
        ..GitlabOptions::default()
    })
    .expect("service should build");
    let filters = [FilterSpec {
        branch_match: Some("^feature/".to_owned()),
        ..FilterSpec::default()
    }];

    let pulls = list_pull_requests(&service, &filters)
        .await
        .expect("discovery should succeed");

    let numbers: Vec<u64> = pulls.iter().map(|pull| pull.number).collect();
    assert_eq!(numbers, vec![11, 13]);
    assert!(pulls.iter().all(|pull| pull.author == "maintainer"));
}

#[tokio::test]
async fn missing_bitbucket_server_repository_is_a_recoverable_sentinel() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/rest/api/1.0/projects/PROJ/repos/gone/pull-requests"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({
            "errors": [{ "message": "Repository PROJ/gone does not exist." }]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let service = BitbucketServerService::no_auth(&BitbucketServerOptions {
        base_url: Some(server.uri()),
        project_key: "PROJ".to_owned(),
        repository_slug: "gone".to_owned(),
        ..BitbucketServerOptions::default()
    })
    .expect("service should build");

    let result = list_pull_requests(&service, &[]).await;
    let error = result.clone().expect_err("discovery should fail");
    let erased: &(dyn StdError + 'static) = &error;

    assert!(is_repository_not_found_error(erased), "got {error:?}");
    assert_eq!(result.or_empty_when_not_found(), Ok(Vec::new()));
}

#[tokio::test]
async fn other_provider_failures_are_not_recovered() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500).set_body_string("upstream exploded"))
        .mount(&server)
        .await;

    let service = BitbucketServerService::no_auth(&BitbucketServerOptions {
        base_url: Some(server.uri()),
        project_key: "PROJ".to_owned(),
        repository_slug: "app".to_owned(),
        ..BitbucketServerOptions::default()
    })
    .expect("service should build");

    let result = list_pull_requests(&service, &[]).await.or_empty_when_not_found();
    let error = result.expect_err("server errors should propagate");

    assert!(!error.is_repository_not_found(), "got {error:?}");
}
