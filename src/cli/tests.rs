//! Tests for the command-line front end.

use prospector::ProspectorConfig;
use prospector::pull_request::{DiscoveryError, PullRequest};
use rstest::rstest;
use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use super::discover;
use super::output::write_json;
use super::service::build_service;

const MERGE_REQUESTS_PATH: &str = "/api/v4/projects/team%2Fapp/merge_requests";

fn gitlab_config(server: &MockServer) -> ProspectorConfig {
    ProspectorConfig {
        provider: Some("gitlab".to_owned()),
        api_url: Some(server.uri()),
        token: Some("glpat".to_owned()),
        owner: Some("team".to_owned()),
        repo: Some("app".to_owned()),
        ..ProspectorConfig::default()
    }
}

#[rstest]
#[case::github("github")]
#[case::gitlab("gitlab")]
#[case::gitea("gitea")]
#[case::bitbucket_server("bitbucket-server")]
#[case::bitbucket_cloud("bitbucket-cloud")]
#[case::azure_devops("azure-devops")]
#[case::scm_manager("scm-manager")]
#[case::sourcecraft("sourcecraft")]
#[tokio::test]
async fn every_provider_builds_from_its_identifiers(#[case] provider: &str) {
    let config = ProspectorConfig {
        provider: Some(provider.to_owned()),
        api_url: Some("https://scm.example.com".to_owned()),
        token: Some("secret".to_owned()),
        owner: Some("team".to_owned()),
        repo: Some("app".to_owned()),
        project: Some("platform".to_owned()),
        ..ProspectorConfig::default()
    };

    assert!(build_service(&config).is_ok(), "{provider} should build");
}

#[rstest]
#[case::no_provider(ProspectorConfig::default(), "provider is required")]
#[case::no_owner(
    ProspectorConfig {
        provider: Some("gitea".to_owned()),
        repo: Some("app".to_owned()),
        ..ProspectorConfig::default()
    },
    "repository owner is required"
)]
#[case::no_azure_project(
    ProspectorConfig {
        provider: Some("azure-devops".to_owned()),
        owner: Some("org".to_owned()),
        repo: Some("app".to_owned()),
        ..ProspectorConfig::default()
    },
    "project is required"
)]
#[case::no_scm_manager_url(
    ProspectorConfig {
        provider: Some("scm-manager".to_owned()),
        owner: Some("team".to_owned()),
        repo: Some("app".to_owned()),
        ..ProspectorConfig::default()
    },
    "SCM-Manager requires a base URL"
)]
fn incomplete_settings_are_configuration_errors(
    #[case] config: ProspectorConfig,
    #[case] expected: &str,
) {
    let message = build_service(&config)
        .err()
        .map(|error| error.to_string())
        .expect("build should fail");

    assert!(message.contains(expected), "got {message}");
}

#[tokio::test]
async fn discovers_and_filters_gitlab_merge_requests() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(MERGE_REQUESTS_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "iid": 1, "source_branch": "feature/a", "target_branch": "main", "sha": "a1" },
            { "iid": 2, "source_branch": "fix/b", "target_branch": "main", "sha": "b2" }
        ])))
        .mount(&server)
        .await;

    let config = ProspectorConfig {
        branch_match: Some("^feature/".to_owned()),
        ..gitlab_config(&server)
    };
    let pulls = discover(&config).await.expect("discovery should succeed");

    let numbers: Vec<u64> = pulls.iter().map(|pr| pr.number).collect();
    assert_eq!(numbers, vec![1]);
}

#[rstest]
#[case::ignored(true)]
#[case::reported(false)]
#[tokio::test]
async fn missing_repositories_follow_the_ignore_setting(#[case] ignore: bool) {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(404).set_body_json(json!({ "message": "404 Project Not Found" })),
        )
        .mount(&server)
        .await;

    let config = ProspectorConfig {
        ignore_missing_repository: ignore,
        ..gitlab_config(&server)
    };
    let result = discover(&config).await;

    if ignore {
        assert_eq!(result, Ok(Vec::new()));
    } else {
        let error = result.expect_err("discovery should fail");
        assert!(error.is_repository_not_found(), "got {error:?}");
    }
}

#[tokio::test]
async fn invalid_filters_fail_before_any_request() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(0)
        .mount(&server)
        .await;

    let config = ProspectorConfig {
        title_match: Some("(".to_owned()),
        ..gitlab_config(&server)
    };
    let result = discover(&config).await;

    assert!(matches!(result, Err(DiscoveryError::Filter(_))), "got {result:?}");
}

#[test]
fn writes_pull_requests_as_a_json_array() {
    let pulls = vec![PullRequest {
        number: 7,
        title: "Add docs".to_owned(),
        branch: "docs".to_owned(),
        target_branch: "main".to_owned(),
        head_sha: "abc".to_owned(),
        labels: vec!["preview".to_owned()],
        author: "alice".to_owned(),
        changed_files: Vec::new(),
    }];
    let mut buffer = Vec::new();

    write_json(&mut buffer, &pulls).expect("write should succeed");

    let written: serde_json::Value =
        serde_json::from_slice(&buffer).expect("output should be JSON");
    assert_eq!(
        written,
        json!([{
            "number": 7,
            "title": "Add docs",
            "branch": "docs",
            "target_branch": "main",
            "head_sha": "abc",
            "labels": ["preview"],
            "author": "alice"
        }])
    );
}
