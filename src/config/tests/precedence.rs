//! Tests for configuration layer precedence.

use rstest::rstest;
use serde_json::{Value, json};

use super::helpers::build_config_from_layers;

#[rstest]
#[case::file_overrides_defaults(
    vec![("defaults", json!({"provider": "github"})), ("file", json!({"provider": "gitlab"}))],
    "provider",
    "gitlab",
    "file should override default"
)]
#[case::environment_overrides_file(
    vec![("file", json!({"token": "file-token"})), ("environment", json!({"token": "env-token"}))],
    "token",
    "env-token",
    "environment should override file"
)]
#[case::cli_overrides_environment(
    vec![("environment", json!({"repo": "env-repo"})), ("cli", json!({"repo": "cli-repo"}))],
    "repo",
    "cli-repo",
    "CLI should override environment"
)]
#[case::branch_match_defaults_file_env_cli(
    vec![
        ("defaults", json!({"branch_match": "default"})),
        ("file", json!({"branch_match": "file"})),
        ("environment", json!({"branch_match": "env"})),
        ("cli", json!({"branch_match": "^cli/"}))
    ],
    "branch_match",
    "^cli/",
    "CLI should win for branch_match"
)]
fn test_layer_precedence(
    #[case] layers: Vec<(&str, Value)>,
    #[case] field: &str,
    #[case] expected: &str,
    #[case] message: &str,
) {
    let config = build_config_from_layers(&layers);

    let actual = match field {
        "provider" => config.provider.as_deref(),
        "token" => config.token.as_deref(),
        "repo" => config.repo.as_deref(),
        "branch_match" => config.branch_match.as_deref(),
        _ => panic!("unknown field: {field}"),
    };

    assert_eq!(actual, Some(expected), "{message}");
}

#[rstest]
fn defaults_are_empty_when_no_sources_provided() {
    let config = build_config_from_layers(&[("defaults", json!({"provider": null}))]);

    assert!(config.provider.is_none(), "provider should be None");
    assert!(config.token.is_none(), "token should be None");
    assert!(!config.insecure, "insecure should default to false");
    assert!(
        !config.ignore_missing_repository,
        "ignore_missing_repository should default to false"
    );
    assert!(config.filter_specs().is_empty(), "no filter should be configured");
}

#[rstest]
fn file_booleans_are_loaded() {
    let config = build_config_from_layers(&[(
        "file",
        json!({"insecure": true, "changed_files": true, "ignore_missing_repository": true}),
    )]);

    assert!(config.insecure);
    assert!(config.changed_files);
    assert!(config.ignore_missing_repository);
}
