//! Normalisation helpers shared by the provider adapters.

const BRANCH_REF_PREFIX: &str = "refs/heads/";

/// Removes a leading `refs/heads/` from a branch reference.
#[must_use]
pub fn strip_branch_ref(reference: &str) -> &str {
    reference
        .strip_prefix(BRANCH_REF_PREFIX)
        .unwrap_or(reference)
}

/// Returns true when every required label appears among `labels`.
///
/// Extra labels on the pull request are fine; an empty requirement always
/// matches.
#[must_use]
pub fn contains_labels<S: AsRef<str>>(required: &[String], labels: &[S]) -> bool {
    required
        .iter()
        .all(|expected| labels.iter().any(|label| label.as_ref() == expected))
}

/// Derives an author identifier from an email-shaped unique name by keeping
/// everything before the first `@`.
#[must_use]
pub fn author_from_unique_name(unique_name: &str) -> &str {
    unique_name
        .split_once('@')
        .map_or(unique_name, |(local, _)| local)
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::{author_from_unique_name, contains_labels, strip_branch_ref};

    #[rstest]
    #[case::prefixed("refs/heads/feature/login", "feature/login")]
    #[case::bare("main", "main")]
    #[case::only_leading("refs/heads/refs/heads/x", "refs/heads/x")]
    #[case::other_namespace("refs/tags/v1", "refs/tags/v1")]
    fn strips_branch_prefix(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(strip_branch_ref(input), expected);
    }

    #[rstest]
    #[case::missing_one(&["a", "b"], &["a"], false)]
    #[case::exact(&["a"], &["a"], true)]
    #[case::no_requirement(&[], &["a"], true)]
    #[case::extra_labels_allowed(&["a"], &["b", "a", "c"], true)]
    #[case::nothing_on_pr(&["a"], &[], false)]
    fn checks_label_containment(
        #[case] required: &[&str],
        #[case] labels: &[&str],
        #[case] expected: bool,
    ) {
        let owned: Vec<String> = required.iter().map(|label| (*label).to_owned()).collect();
        assert_eq!(contains_labels(&owned, labels), expected);
    }

    #[rstest]
    #[case::email("jane.doe@example.com", "jane.doe")]
    #[case::plain("jane", "jane")]
    #[case::several_at_signs("a@b@c", "a")]
    fn takes_local_part_of_unique_name(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(author_from_unique_name(input), expected);
    }
}
