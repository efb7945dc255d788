//! Exclusion rules for packaging
//!
//! Compiles a set of exclusion patterns into a matcher. Patterns are anchored
//! globs: `**` spans zero or more path segments and `*` stays within one
//! segment. A bare suffix glob such as `*.properties` matches any path that
//! ends with the suffix, at any depth.

use globset::{GlobBuilder, GlobSet, GlobSetBuilder};

/// Errors for exclusion patterns
#[derive(Debug, thiserror::Error)]
pub enum PatternError {
    #[error("Invalid exclusion pattern '{pattern}': {source}")]
    Invalid {
        pattern: String,
        #[source]
        source: globset::Error,
    },

    #[error("Glob set error: {0}")]
    GlobSet(#[from] globset::Error),

    #[error("Exclusion pattern must not be empty")]
    Empty,
}

/// Compiled exclusion rules
#[derive(Debug, Clone)]
pub struct ExcludeRules {
    glob_set: GlobSet,
    suffixes: Vec<String>,
}

impl ExcludeRules {
    /// Compile exclusion rules from patterns
    pub fn new<I, S>(patterns: I) -> Result<Self, PatternError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut builder = GlobSetBuilder::new();
        let mut suffixes = Vec::new();

        for pattern in patterns {
            let pattern = pattern.as_ref();
            if pattern.is_empty() {
                return Err(PatternError::Empty);
            }

            if let Some(suffix) = bare_suffix(pattern) {
                suffixes.push(suffix.to_string());
                continue;
            }

            let glob = GlobBuilder::new(pattern)
                .literal_separator(true)
                .build()
                .map_err(|source| PatternError::Invalid {
                    pattern: pattern.to_string(),
                    source,
                })?;
            builder.add(glob);
        }

        Ok(Self {
            glob_set: builder.build()?,
            suffixes,
        })
    }

    /// Check if a path should be excluded
    pub fn is_excluded(&self, path: &str) -> bool {
        self.suffixes.iter().any(|s| path.ends_with(s.as_str())) || self.glob_set.is_match(path)
    }

    /// True when no pattern was compiled
    pub fn is_empty(&self) -> bool {
        self.suffixes.is_empty() && self.glob_set.is_empty()
    }
}

/// `*<literal>` with no separator and no further glob syntax
fn bare_suffix(pattern: &str) -> Option<&str> {
    let suffix = pattern.strip_prefix('*')?;
    if suffix.is_empty() || suffix.contains(['/', '*', '?', '[', ']', '{', '}', '\\']) {
        return None;
    }
    Some(suffix)
}
