//! Override sources
//!
//! Overrides are externally supplied key/value pairs (environment variables,
//! build-time defines) that either bind directly to an attribute or are
//! substituted into `${key}` placeholders during resolution.
//!
//! A resolution reads every key it needs exactly once into an
//! [`OverrideSnapshot`] before any substitution or validation happens.

use std::collections::{BTreeMap, BTreeSet};
use std::env;

use serde::{Deserialize, Serialize};

/// Override errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum OverrideError {
    #[error("Missing required override '{key}'")]
    MissingOverride { key: String },

    #[error("Override '{key}' unavailable: {reason}")]
    Unavailable { key: String, reason: String },

    #[error("Malformed define '{0}': expected KEY=VALUE")]
    MalformedDefine(String),
}

/// Declaration of an externally supplied value
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OverrideEntry {
    /// Lookup key in the override source (e.g. `dart.env.GOOGLE_MAPS_ANDROID_API_KEY`).
    /// Descriptor files give it as the table key instead.
    #[serde(default)]
    pub key: String,

    /// Fallback when the source has no value
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<String>,

    /// Resolution fails when neither a value nor a default exists
    #[serde(default)]
    pub required: bool,

    /// Security-sensitive value: an empty value counts as missing and the
    /// value is redacted in rendered output
    #[serde(default)]
    pub secret: bool,

    /// Attribute this override supplies directly, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attribute: Option<String>,
}

impl OverrideEntry {
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            default: None,
            required: false,
            secret: false,
            attribute: None,
        }
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn secret(mut self) -> Self {
        self.secret = true;
        self
    }

    pub fn with_default(mut self, default: impl Into<String>) -> Self {
        self.default = Some(default.into());
        self
    }

    pub fn bind_to(mut self, attribute: impl Into<String>) -> Self {
        self.attribute = Some(attribute.into());
        self
    }
}

/// The set of declared overrides, keyed by override key
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OverrideDeclarations {
    entries: BTreeMap<String, OverrideEntry>,
}

impl OverrideDeclarations {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare an override, replacing any earlier declaration of the same key
    pub fn declare(&mut self, entry: OverrideEntry) {
        self.entries.insert(entry.key.clone(), entry);
    }

    pub fn get(&self, key: &str) -> Option<&OverrideEntry> {
        self.entries.get(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = &OverrideEntry> {
        self.entries.values()
    }

    /// Declarations bound to an attribute
    pub fn bindings(&self) -> impl Iterator<Item = (&str, &OverrideEntry)> {
        self.entries
            .values()
            .filter_map(|e| e.attribute.as_deref().map(|attr| (attr, e)))
    }

    pub fn is_secret(&self, key: &str) -> bool {
        self.entries.get(key).map(|e| e.secret).unwrap_or(false)
    }
}

/// Supplier of raw override values
pub trait OverrideSource {
    /// Read the raw value for `key`, `Ok(None)` when absent.
    ///
    /// Implementations backed by I/O must fail fast with
    /// `OverrideError::Unavailable` instead of blocking.
    fn fetch(&self, key: &str) -> Result<Option<String>, OverrideError>;

    /// Value for `key`, falling back to `default`.
    ///
    /// Fails with `MissingOverride` only when there is no value, no default
    /// and the override is required.
    fn resolve(
        &self,
        key: &str,
        default: Option<&str>,
        required: bool,
    ) -> Result<Option<String>, OverrideError> {
        match self.fetch(key)? {
            Some(value) => Ok(Some(value)),
            None => fallback(key, default, required),
        }
    }
}

fn fallback(key: &str, default: Option<&str>, required: bool) -> Result<Option<String>, OverrideError> {
    match default {
        Some(d) => Ok(Some(d.to_string())),
        None if required => Err(OverrideError::MissingOverride {
            key: key.to_string(),
        }),
        None => Ok(None),
    }
}

impl<T: OverrideSource + ?Sized> OverrideSource for &T {
    fn fetch(&self, key: &str) -> Result<Option<String>, OverrideError> {
        (**self).fetch(key)
    }
}

impl<T: OverrideSource + ?Sized> OverrideSource for Box<T> {
    fn fetch(&self, key: &str) -> Result<Option<String>, OverrideError> {
        (**self).fetch(key)
    }
}

/// In-memory overrides, e.g. from `-D KEY=VALUE` flags
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MapOverrides {
    values: BTreeMap<String, String>,
}

impl MapOverrides {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.values.insert(key.into(), value.into());
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.values.insert(key.into(), value.into());
    }

    /// Parse `KEY=VALUE` defines; later defines of the same key win
    pub fn from_defines<I, S>(defines: I) -> Result<Self, OverrideError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut overrides = Self::new();
        for define in defines {
            let define = define.as_ref();
            match define.split_once('=') {
                Some((key, value)) if !key.trim().is_empty() => {
                    overrides.insert(key.trim(), value);
                }
                _ => return Err(OverrideError::MalformedDefine(define.to_string())),
            }
        }
        Ok(overrides)
    }
}

impl OverrideSource for MapOverrides {
    fn fetch(&self, key: &str) -> Result<Option<String>, OverrideError> {
        Ok(self.values.get(key).cloned())
    }
}

/// Overrides read from the process environment
///
/// Keys are normalized to environment variable names: upper-cased, with every
/// character outside `[A-Z0-9_]` replaced by `_`, and prefixed when a prefix
/// is configured (`dart.env.MAPS_KEY` with prefix `APP_` reads
/// `APP_DART_ENV_MAPS_KEY`).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnvOverrides {
    prefix: Option<String>,
}

impl EnvOverrides {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_prefix(prefix: impl Into<String>) -> Self {
        Self {
            prefix: Some(prefix.into()),
        }
    }

    /// Environment variable name read for `key`
    pub fn variable_name(&self, key: &str) -> String {
        let normalized: String = key
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() {
                    c.to_ascii_uppercase()
                } else {
                    '_'
                }
            })
            .collect();
        match &self.prefix {
            Some(prefix) => format!("{}{}", prefix, normalized),
            None => normalized,
        }
    }
}

impl OverrideSource for EnvOverrides {
    fn fetch(&self, key: &str) -> Result<Option<String>, OverrideError> {
        let name = self.variable_name(key);
        match env::var(&name) {
            Ok(value) => Ok(Some(value)),
            Err(env::VarError::NotPresent) => Ok(None),
            Err(env::VarError::NotUnicode(_)) => Err(OverrideError::Unavailable {
                key: key.to_string(),
                reason: format!("environment variable {} is not valid UTF-8", name),
            }),
        }
    }
}

/// Chain of sources; the first source holding a value wins
#[derive(Default)]
pub struct LayeredOverrides {
    sources: Vec<Box<dyn OverrideSource>>,
}

impl LayeredOverrides {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a lower-precedence source
    pub fn then(mut self, source: impl OverrideSource + 'static) -> Self {
        self.sources.push(Box::new(source));
        self
    }
}

impl OverrideSource for LayeredOverrides {
    fn fetch(&self, key: &str) -> Result<Option<String>, OverrideError> {
        for source in &self.sources {
            if let Some(value) = source.fetch(key)? {
                return Ok(Some(value));
            }
        }
        Ok(None)
    }
}

/// One captured override value
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapshotValue {
    /// `None` for an optional override with neither value nor default
    pub value: Option<String>,
    /// The value came from the declared default, not the source
    pub from_default: bool,
    pub secret: bool,
}

/// Immutable view of every override a single resolution needs
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OverrideSnapshot {
    values: BTreeMap<String, SnapshotValue>,
}

impl OverrideSnapshot {
    /// Read each key in `keys` once from `source`.
    ///
    /// Keys without a declaration are treated as required with no default.
    /// For secret overrides an empty value is treated as missing.
    pub fn capture<S: OverrideSource + ?Sized>(
        source: &S,
        declarations: &OverrideDeclarations,
        keys: &BTreeSet<String>,
    ) -> Result<Self, OverrideError> {
        let mut values = BTreeMap::new();

        for key in keys {
            let (default, required, secret) = match declarations.get(key) {
                Some(entry) => (entry.default.as_deref(), entry.required, entry.secret),
                None => (None, true, false),
            };

            let mut raw = source.fetch(key)?;
            if secret && raw.as_deref().is_some_and(|v| v.trim().is_empty()) {
                raw = None;
            }

            let captured = match raw {
                Some(value) => SnapshotValue {
                    value: Some(value),
                    from_default: false,
                    secret,
                },
                None => {
                    let value = fallback(key, default, required)?;
                    SnapshotValue {
                        from_default: value.is_some(),
                        value,
                        secret,
                    }
                }
            };

            tracing::debug!(
                key = %key,
                present = captured.value.is_some(),
                from_default = captured.from_default,
                "captured override"
            );
            values.insert(key.clone(), captured);
        }

        Ok(Self { values })
    }

    pub fn get(&self, key: &str) -> Option<&SnapshotValue> {
        self.values.get(key)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keys(list: &[&str]) -> BTreeSet<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_resolve_prefers_value_over_default() {
        let source = MapOverrides::new().with("API_KEY", "abc");
        assert_eq!(
            source.resolve("API_KEY", Some("fallback"), true).unwrap(),
            Some("abc".to_string())
        );
    }

    #[test]
    fn test_resolve_falls_back_to_default() {
        let source = MapOverrides::new();
        assert_eq!(
            source.resolve("API_KEY", Some("fallback"), true).unwrap(),
            Some("fallback".to_string())
        );
    }

    #[test]
    fn test_resolve_missing_required() {
        let source = MapOverrides::new();
        assert_eq!(
            source.resolve("API_KEY", None, true).unwrap_err(),
            OverrideError::MissingOverride {
                key: "API_KEY".to_string()
            }
        );
    }

    #[test]
    fn test_resolve_missing_optional() {
        let source = MapOverrides::new();
        assert_eq!(source.resolve("API_KEY", None, false).unwrap(), None);
    }

    #[test]
    fn test_from_defines() {
        let source = MapOverrides::from_defines(["A=1", "B=x=y", "A=2", "EMPTY="]).unwrap();
        assert_eq!(source.fetch("A").unwrap(), Some("2".to_string()));
        assert_eq!(source.fetch("B").unwrap(), Some("x=y".to_string()));
        assert_eq!(source.fetch("EMPTY").unwrap(), Some(String::new()));
    }

    #[test]
    fn test_from_defines_malformed() {
        assert_eq!(
            MapOverrides::from_defines(["NOVALUE"]).unwrap_err(),
            OverrideError::MalformedDefine("NOVALUE".to_string())
        );
        assert!(MapOverrides::from_defines(["=value"]).is_err());
    }

    #[test]
    fn test_env_variable_name() {
        let env = EnvOverrides::new();
        assert_eq!(
            env.variable_name("dart.env.GOOGLE_MAPS_ANDROID_API_KEY"),
            "DART_ENV_GOOGLE_MAPS_ANDROID_API_KEY"
        );
        let env = EnvOverrides::with_prefix("APP_");
        assert_eq!(env.variable_name("version-name"), "APP_VERSION_NAME");
    }

    #[test]
    fn test_env_fetch() {
        let env = EnvOverrides::with_prefix("VARIANT_CONFIG_TEST_FETCH_");
        env::set_var("VARIANT_CONFIG_TEST_FETCH_TOKEN", "xyz");
        assert_eq!(env.fetch("token").unwrap(), Some("xyz".to_string()));
        assert_eq!(env.fetch("absent").unwrap(), None);
        env::remove_var("VARIANT_CONFIG_TEST_FETCH_TOKEN");
    }

    #[test]
    fn test_layered_first_wins() {
        let layered = LayeredOverrides::new()
            .then(MapOverrides::new().with("A", "cli"))
            .then(MapOverrides::new().with("A", "env").with("B", "env"));

        assert_eq!(layered.fetch("A").unwrap(), Some("cli".to_string()));
        assert_eq!(layered.fetch("B").unwrap(), Some("env".to_string()));
        assert_eq!(layered.fetch("C").unwrap(), None);
    }

    #[test]
    fn test_snapshot_undeclared_key_is_required() {
        let source = MapOverrides::new();
        let err = OverrideSnapshot::capture(&source, &OverrideDeclarations::new(), &keys(&["X"]))
            .unwrap_err();
        assert_eq!(err, OverrideError::MissingOverride { key: "X".to_string() });
    }

    #[test]
    fn test_snapshot_secret_empty_counts_as_missing() {
        let mut declarations = OverrideDeclarations::new();
        declarations.declare(OverrideEntry::new("MAPS_KEY").required().secret());
        let source = MapOverrides::new().with("MAPS_KEY", "  ");

        let err = OverrideSnapshot::capture(&source, &declarations, &keys(&["MAPS_KEY"]))
            .unwrap_err();
        assert_eq!(
            err,
            OverrideError::MissingOverride {
                key: "MAPS_KEY".to_string()
            }
        );
    }

    #[test]
    fn test_snapshot_default_and_optional() {
        let mut declarations = OverrideDeclarations::new();
        declarations.declare(OverrideEntry::new("VERSION").with_default("1.0.0"));
        declarations.declare(OverrideEntry::new("FLAVOR"));
        let source = MapOverrides::new();

        let snapshot =
            OverrideSnapshot::capture(&source, &declarations, &keys(&["VERSION", "FLAVOR"]))
                .unwrap();

        let version = snapshot.get("VERSION").unwrap();
        assert_eq!(version.value.as_deref(), Some("1.0.0"));
        assert!(version.from_default);

        let flavor = snapshot.get("FLAVOR").unwrap();
        assert_eq!(flavor.value, None);
        assert!(!flavor.from_default);
    }

    struct FailingSource;

    impl OverrideSource for FailingSource {
        fn fetch(&self, key: &str) -> Result<Option<String>, OverrideError> {
            Err(OverrideError::Unavailable {
                key: key.to_string(),
                reason: "store offline".to_string(),
            })
        }
    }

    #[test]
    fn test_snapshot_propagates_unavailable() {
        let err = OverrideSnapshot::capture(
            &FailingSource,
            &OverrideDeclarations::new(),
            &keys(&["A"]),
        )
        .unwrap_err();
        assert!(matches!(err, OverrideError::Unavailable { .. }));
    }
}
