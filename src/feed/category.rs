//! Category filter normalization
//!
//! Labels are compared trimmed and lower-cased. Blank labels are dropped,
//! and a filter left with no labels behaves exactly like no filter.

use std::collections::BTreeSet;

use serde::Serialize;

/// Normalized category filter for a single feed computation
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CategoryFilter {
    #[default]
    Unfiltered,
    /// Non-empty set of normalized labels
    Only(BTreeSet<String>),
}

impl CategoryFilter {
    /// Build a filter from raw labels, normalizing each one.
    pub fn new<I, S>(labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let set: BTreeSet<String> = labels
            .into_iter()
            .filter_map(|label| normalize(label.as_ref()))
            .collect();

        if set.is_empty() {
            CategoryFilter::Unfiltered
        } else {
            CategoryFilter::Only(set)
        }
    }

    /// Parse a comma-separated list such as `"Web, ML"`.
    pub fn parse_list(raw: Option<&str>) -> Self {
        match raw {
            Some(raw) => Self::new(raw.split(',')),
            None => CategoryFilter::Unfiltered,
        }
    }

    pub fn is_active(&self) -> bool {
        matches!(self, CategoryFilter::Only(_))
    }

    /// Whether a post with this category passes the filter.
    ///
    /// A post without a category never passes an active filter.
    pub fn matches(&self, category: Option<&str>) -> bool {
        match self {
            CategoryFilter::Unfiltered => true,
            CategoryFilter::Only(set) => category
                .and_then(normalize)
                .is_some_and(|c| set.contains(&c)),
        }
    }
}

fn normalize(label: &str) -> Option<String> {
    let trimmed = label.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_lowercase())
    }
}
