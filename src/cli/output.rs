//! Output formatting utilities for CLI operations.

use std::io::Write;

use prospector::pull_request::{DiscoveryError, PullRequest};

/// Writes the pull requests to `writer` as a pretty-printed JSON array.
///
/// # Errors
///
/// Returns [`DiscoveryError::Io`] when serialisation or the write fails.
pub fn write_json<W: Write>(writer: &mut W, pulls: &[PullRequest]) -> Result<(), DiscoveryError> {
    serde_json::to_writer_pretty(&mut *writer, pulls).map_err(|error| io_error(&error))?;
    writeln!(writer).map_err(|error| io_error(&error))
}

fn io_error(error: &dyn std::error::Error) -> DiscoveryError {
    DiscoveryError::Io {
        message: error.to_string(),
    }
}
