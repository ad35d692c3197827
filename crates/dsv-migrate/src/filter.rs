//! Key filters: a conjunction of include-only and exclude clauses.

use std::collections::BTreeSet;

/// One clause of a [`KeyFilter`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Clause {
    /// Matches keys that are not in the set.
    Exclude(BTreeSet<String>),
    /// Matches only keys in the set.
    Only(BTreeSet<String>),
}

impl Clause {
    /// Whether `key` satisfies this clause.
    pub fn matches(&self, key: &str) -> bool {
        match self {
            Self::Exclude(keys) => !keys.contains(key),
            Self::Only(keys) => keys.contains(key),
        }
    }
}

/// Selects the keys a migration step touches.
///
/// Every call to [`KeyFilter::exclude`] or [`KeyFilter::only`] appends one
/// clause, and a key passes only if it satisfies all of them. There is no OR
/// and no clause overrides another. The empty filter matches every key.
///
/// ```
/// use dsv_migrate::KeyFilter;
///
/// let filter = KeyFilter::new().only(["x", "y"]).exclude(["y"]);
/// assert!(filter.matches("x"));
/// assert!(!filter.matches("y"));
/// assert!(!filter.matches("z"));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeyFilter {
    clauses: Vec<Clause>,
}

impl KeyFilter {
    /// A filter matching every key.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a clause excluding `keys`. An empty list appends nothing.
    pub fn exclude<I, K>(self, keys: I) -> Self
    where
        I: IntoIterator<Item = K>,
        K: Into<String>,
    {
        self.push(keys, Clause::Exclude)
    }

    /// Append a clause admitting only `keys`. An empty list appends nothing.
    pub fn only<I, K>(self, keys: I) -> Self
    where
        I: IntoIterator<Item = K>,
        K: Into<String>,
    {
        self.push(keys, Clause::Only)
    }

    fn push<I, K>(mut self, keys: I, clause: fn(BTreeSet<String>) -> Clause) -> Self
    where
        I: IntoIterator<Item = K>,
        K: Into<String>,
    {
        let keys: BTreeSet<String> = keys.into_iter().map(Into::into).collect();
        if !keys.is_empty() {
            self.clauses.push(clause(keys));
        }
        self
    }

    /// Whether `key` satisfies every clause.
    pub fn matches(&self, key: &str) -> bool {
        self.clauses.iter().all(|c| c.matches(key))
    }

    /// The clauses in the order they were added.
    pub fn clauses(&self) -> &[Clause] {
        &self.clauses
    }

    /// True when the filter has no clauses.
    pub fn is_empty(&self) -> bool {
        self.clauses.is_empty()
    }
}
