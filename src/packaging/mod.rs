//! Packaging filter
//!
//! Decides which candidate resource paths are dropped before artifact
//! assembly. Filtering is stable: retained paths keep their input order.

mod exclude;
mod tree;

use std::borrow::Cow;
use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

pub use exclude::{ExcludeRules, PatternError};
pub use tree::{walk_resources, TreeError};

/// A set of exclusion patterns; duplicates collapse and order is irrelevant
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExclusionPatterns(BTreeSet<String>);

impl ExclusionPatterns {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, pattern: impl Into<String>) -> bool {
        self.0.insert(pattern.into())
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(|p| p.as_str())
    }

    pub fn contains(&self, pattern: &str) -> bool {
        self.0.contains(pattern)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Compile into exclusion rules
    pub fn compile(&self) -> Result<ExcludeRules, PatternError> {
        ExcludeRules::new(self.iter())
    }
}

impl<S: Into<String>> FromIterator<S> for ExclusionPatterns {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self(iter.into_iter().map(Into::into).collect())
    }
}

impl<S: Into<String>> Extend<S> for ExclusionPatterns {
    fn extend<I: IntoIterator<Item = S>>(&mut self, iter: I) {
        self.0.extend(iter.into_iter().map(Into::into));
    }
}

/// Lazily filtered view over candidate paths
///
/// Cloning yields an independent iterator positioned at the same point, so
/// a fresh clone taken before iteration restarts the sequence.
pub struct Retained<'a, P> {
    rules: Cow<'a, ExcludeRules>,
    paths: &'a [P],
    pos: usize,
}

impl<'a, P> Clone for Retained<'a, P> {
    fn clone(&self) -> Self {
        Self {
            rules: self.rules.clone(),
            paths: self.paths,
            pos: self.pos,
        }
    }
}

impl<'a, P> fmt::Debug for Retained<'a, P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Retained")
            .field("candidates", &self.paths.len())
            .field("pos", &self.pos)
            .finish()
    }
}

impl<'a, P: AsRef<str>> Iterator for Retained<'a, P> {
    type Item = &'a P;

    fn next(&mut self) -> Option<Self::Item> {
        while let Some(path) = self.paths.get(self.pos) {
            self.pos += 1;
            if !self.rules.is_excluded(path.as_ref()) {
                return Some(path);
            }
        }
        None
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (0, Some(self.paths.len() - self.pos))
    }
}

impl ExcludeRules {
    /// Paths from `paths` that no rule excludes, in input order
    pub fn retain<'a, P: AsRef<str>>(&'a self, paths: &'a [P]) -> Retained<'a, P> {
        Retained {
            rules: Cow::Borrowed(self),
            paths,
            pos: 0,
        }
    }

    /// Split `paths` into (retained, excluded), both in input order
    pub fn partition<'a, P: AsRef<str>>(&self, paths: &'a [P]) -> (Vec<&'a P>, Vec<&'a P>) {
        paths.iter().partition(|p| !self.is_excluded(p.as_ref()))
    }
}

/// Filter `paths` against `patterns`.
///
/// An empty pattern set retains every path; a pattern that matches nothing is
/// not an error.
pub fn filter<'a, P: AsRef<str>>(
    paths: &'a [P],
    patterns: &ExclusionPatterns,
) -> Result<Retained<'a, P>, PatternError> {
    let rules = patterns.compile()?;
    tracing::debug!(
        candidates = paths.len(),
        patterns = patterns.len(),
        "filtering packaging candidates"
    );
    Ok(Retained {
        rules: Cow::Owned(rules),
        paths,
        pos: 0,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn patterns(list: &[&str]) -> ExclusionPatterns {
        list.iter().copied().collect()
    }

    #[test]
    fn test_filter_scenario() {
        let paths = ["META-INF/LICENSE", "a/b.kt", "c.properties"];
        let retained: Vec<_> = filter(&paths, &patterns(&["META-INF/LICENSE", "**/*.properties"]))
            .unwrap()
            .collect();

        assert_eq!(retained, vec![&"a/b.kt"]);
    }

    #[test]
    fn test_empty_patterns_keep_everything() {
        let paths = vec!["b".to_string(), "a".to_string(), "c".to_string()];
        let retained: Vec<_> = filter(&paths, &ExclusionPatterns::new()).unwrap().collect();

        assert_eq!(retained, paths.iter().collect::<Vec<_>>());
    }

    #[test]
    fn test_unmatched_pattern_is_fine() {
        let paths = ["a.kt"];
        let retained: Vec<_> = filter(&paths, &patterns(&["nothing/**"])).unwrap().collect();
        assert_eq!(retained, vec![&"a.kt"]);
    }

    #[test]
    fn test_stable_order() {
        let paths = ["z.kt", "x.properties", "m.kt", "a.kt"];
        let retained: Vec<_> = filter(&paths, &patterns(&["*.properties"])).unwrap().collect();
        assert_eq!(retained, vec![&"z.kt", &"m.kt", &"a.kt"]);
    }

    #[test]
    fn test_restartable() {
        let paths = ["a.kt", "b.properties", "c.kt"];
        let retained = filter(&paths, &patterns(&["*.properties"])).unwrap();

        let first: Vec<_> = retained.clone().collect();
        let second: Vec<_> = retained.collect();
        assert_eq!(first, second);
        assert_eq!(first.len(), 2);
    }

    #[test]
    fn test_duplicates_collapse() {
        let set = patterns(&["a/**", "a/**", "*.txt"]);
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn test_partition() {
        let rules = patterns(&["*.properties"]).compile().unwrap();
        let paths = ["a.kt", "b.properties", "c.kt"];
        let (kept, dropped) = rules.partition(&paths);

        assert_eq!(kept, vec![&"a.kt", &"c.kt"]);
        assert_eq!(dropped, vec![&"b.properties"]);
    }

    #[test]
    fn test_invalid_pattern_surfaces() {
        let paths = ["a"];
        assert!(filter(&paths, &patterns(&["[unterminated"])).is_err());
    }
}
