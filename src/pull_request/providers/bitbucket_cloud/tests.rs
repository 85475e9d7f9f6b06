//! Tests for the Bitbucket Cloud adapter.

use http::StatusCode;
use rstest::rstest;
use serde_json::{Value, json};
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use super::{BitbucketCloudOptions, BitbucketCloudService, classify};
use crate::pull_request::PullRequestService;
use crate::pull_request::error::{ErrorClass, ProviderError};

const PULLS_PATH: &str = "/repositories/workspace/app/pullrequests";

fn options(server: &MockServer) -> BitbucketCloudOptions {
    BitbucketCloudOptions {
        base_url: Some(server.uri()),
        owner: "workspace".to_owned(),
        repository_slug: "app".to_owned(),
        ..BitbucketCloudOptions::default()
    }
}

fn pull(id: i64, branch: &str) -> Value {
    json!({
        "id": id,
        "title": format!("PR {id}"),
        "source": { "branch": { "name": branch }, "commit": { "hash": format!("hash{id}") } },
        "destination": { "branch": { "name": "main" }, "commit": { "hash": "base" } },
        "author": { "nickname": "bb-user", "display_name": "BB User" }
    })
}

#[tokio::test]
async fn follows_next_urls_in_the_body() {
    let server = MockServer::start().await;
    let next = format!("{}/page-two?cursor=abc", server.uri());
    Mock::given(method("GET"))
        .and(path(PULLS_PATH))
        .and(query_param("state", "OPEN"))
        .and(query_param("pagelen", "50"))
        .and(header("authorization", "Bearer bb-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "values": [pull(1, "one")],
            "next": next
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/page-two"))
        .and(query_param("cursor", "abc"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "values": [pull(2, "two"), { "id": 3, "source": { "branch": { "name": "no-commit" } } }]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let service = BitbucketCloudService::bearer_token(&options(&server), "bb-token")
        .expect("service should build");
    let pulls = service.list().await.expect("listing should succeed");

    let numbers: Vec<u64> = pulls.iter().map(|pr| pr.number).collect();
    assert_eq!(numbers, vec![1, 2]);
    let first = pulls.first().expect("first pull request");
    assert_eq!(first.author, "bb-user");
    assert_eq!(first.head_sha, "hash1");
    assert!(first.labels.is_empty());
}

#[tokio::test]
async fn missing_repository_is_recognised_from_the_error_text() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({
            "type": "error",
            "error": { "message": "Repository workspace/app not found" }
        })))
        .mount(&server)
        .await;

    let service = BitbucketCloudService::no_auth(&options(&server)).expect("service should build");
    let error = service.list().await.expect_err("listing should fail");

    assert!(error.is_repository_not_found(), "got {error:?}");
    assert!(error.to_string().contains("Repository workspace/app not found"));
}

#[rstest]
#[case::status_text(
    ProviderError::Api {
        status: Some(StatusCode::NOT_FOUND),
        message: "list pull requests failed with status 404 Not Found: gone".to_owned(),
    },
    ErrorClass::NotFound
)]
#[case::other_status(
    ProviderError::Api {
        status: Some(StatusCode::BAD_GATEWAY),
        message: "list pull requests failed with status 502 Bad Gateway: upstream".to_owned(),
    },
    ErrorClass::Other
)]
#[case::network(
    ProviderError::Network { message: "connection refused".to_owned() },
    ErrorClass::Other
)]
fn classifies_by_error_text(#[case] error: ProviderError, #[case] expected: ErrorClass) {
    assert_eq!(classify(&error), expected);
}

#[tokio::test]
async fn app_passwords_use_basic_auth() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(header("authorization", "Basic dXNlcjpwYXNz"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "values": [] })))
        .expect(1)
        .mount(&server)
        .await;

    let service = BitbucketCloudService::basic_auth(&options(&server), "user", "pass")
        .expect("service should build");

    assert_eq!(service.list().await, Ok(Vec::new()));
}
