//! Filter compilation and evaluation.
//!
//! A caller supplies raw [`FilterSpec`] values holding optional regular
//! expressions. [`compile_filters`] turns them into [`Filter`] values in the
//! same order, failing on the first invalid pattern. A pull request matches
//! one filter when every pattern present in that filter matches; a list of
//! filters is satisfied when any one of them matches.

use std::fmt;

use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::models::PullRequest;

/// Raw filter patterns as supplied by configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterSpec {
    /// Pattern applied to the source branch.
    pub branch_match: Option<String>,
    /// Pattern applied to the target branch.
    pub target_branch_match: Option<String>,
    /// Pattern applied to the title.
    pub title_match: Option<String>,
}

impl FilterSpec {
    /// Returns true when the specification carries no pattern at all.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.branch_match.is_none()
            && self.target_branch_match.is_none()
            && self.title_match.is_none()
    }
}

/// Pull request field a pattern applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterField {
    /// Source branch.
    Branch,
    /// Target branch.
    TargetBranch,
    /// Title.
    Title,
}

impl fmt::Display for FilterField {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Branch => "branch_match",
            Self::TargetBranch => "target_branch_match",
            Self::Title => "title_match",
        };
        formatter.write_str(name)
    }
}

/// Failure to compile a filter specification.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FilterError {
    /// A pattern is not a valid regular expression.
    #[error("filter {index}: invalid {field} pattern `{pattern}`: {message}")]
    InvalidPattern {
        /// Zero-based position of the specification in the input.
        index: usize,
        /// Which pattern failed.
        field: FilterField,
        /// The offending pattern.
        pattern: String,
        /// Regex compiler diagnostic.
        message: String,
    },
}

/// Compiled form of a [`FilterSpec`].
#[derive(Debug, Clone, Default)]
pub struct Filter {
    /// Compiled source-branch pattern.
    pub branch_match: Option<Regex>,
    /// Compiled target-branch pattern.
    pub target_branch_match: Option<Regex>,
    /// Compiled title pattern.
    pub title_match: Option<Regex>,
}

impl Filter {
    /// Returns true when every pattern in this filter matches the
    /// corresponding field. Absent patterns impose no constraint.
    #[must_use]
    pub fn matches(&self, pull_request: &PullRequest) -> bool {
        [
            (&self.branch_match, pull_request.branch.as_str()),
            (&self.target_branch_match, pull_request.target_branch.as_str()),
            (&self.title_match, pull_request.title.as_str()),
        ]
        .into_iter()
        .all(|(pattern, value)| pattern.as_ref().is_none_or(|regex| regex.is_match(value)))
    }
}

/// Returns true when at least one filter matches. Callers handle the empty
/// filter list separately.
#[must_use]
pub fn matches_any(filters: &[Filter], pull_request: &PullRequest) -> bool {
    filters.iter().any(|filter| filter.matches(pull_request))
}

/// Compiles every specification, preserving order.
///
/// # Errors
///
/// Returns [`FilterError::InvalidPattern`] naming the first specification and
/// field whose pattern fails to compile. No partial result is produced.
pub fn compile_filters(specs: &[FilterSpec]) -> Result<Vec<Filter>, FilterError> {
    specs
        .iter()
        .enumerate()
        .map(|(index, spec)| compile_filter(index, spec))
        .collect()
}

fn compile_filter(index: usize, spec: &FilterSpec) -> Result<Filter, FilterError> {
    Ok(Filter {
        branch_match: compile_pattern(index, FilterField::Branch, spec.branch_match.as_deref())?,
        target_branch_match: compile_pattern(
            index,
            FilterField::TargetBranch,
            spec.target_branch_match.as_deref(),
        )?,
        title_match: compile_pattern(index, FilterField::Title, spec.title_match.as_deref())?,
    })
}

fn compile_pattern(
    index: usize,
    field: FilterField,
    pattern: Option<&str>,
) -> Result<Option<Regex>, FilterError> {
    pattern
        .map(|raw| {
            Regex::new(raw).map_err(|error| FilterError::InvalidPattern {
                index,
                field,
                pattern: raw.to_owned(),
                message: error.to_string(),
            })
        })
        .transpose()
}
