//! Prospector CLI entrypoint for pull request discovery.

mod cli;

use std::io::{self, Write};
use std::process::ExitCode;

use ortho_config::OrthoConfig;
use prospector::ProspectorConfig;
use prospector::pull_request::DiscoveryError;

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            if writeln!(io::stderr().lock(), "{error}").is_err() {
                return ExitCode::FAILURE;
            }
            ExitCode::FAILURE
        }
    }
}

async fn run() -> Result<(), DiscoveryError> {
    let config = load_config()?;
    let pulls = cli::discover(&config).await?;
    cli::output::write_json(&mut io::stdout().lock(), &pulls)
}

/// Loads configuration from CLI, environment, and files.
///
/// # Errors
///
/// Returns [`DiscoveryError::Configuration`] when ortho-config fails to parse
/// arguments or load configuration files.
fn load_config() -> Result<ProspectorConfig, DiscoveryError> {
    ProspectorConfig::load().map_err(|error| DiscoveryError::Configuration {
        message: error.to_string(),
    })
}
