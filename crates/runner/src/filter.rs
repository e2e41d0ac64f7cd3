//! Operator allow-list for workspace members.

use std::collections::HashSet;

/// Set of package names parsed from a comma separated configuration value.
///
/// An empty filter lets every candidate through.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MemberFilter {
    names: HashSet<String>,
}

impl MemberFilter {
    /// Build a filter from a raw configuration value such as `"a, b"`.
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        let names = raw
            .split(',')
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map(String::from)
            .collect();
        Self { names }
    }

    /// Whether no names are configured.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Whether `candidate` passes the filter. Matching is exact after trimming.
    #[must_use]
    pub fn matches(&self, candidate: &str) -> bool {
        self.is_empty() || self.names.contains(candidate.trim())
    }

    /// Keep the candidates that pass, preserving their order.
    pub fn apply<I, S>(&self, candidates: I) -> Vec<S>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        candidates
            .into_iter()
            .filter(|candidate| self.matches(candidate.as_ref()))
            .collect()
    }
}
