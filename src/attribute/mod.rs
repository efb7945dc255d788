//! Configuration attributes
//!
//! Attributes are named scalars (bool, integer or string). Each attribute
//! name belongs to one of two tiers which decide who wins when a variant
//! fragment and an override both set it.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

pub const MINIFY_ENABLED: &str = "minifyEnabled";
pub const SHRINK_RESOURCES: &str = "shrinkResources";
pub const DEBUGGABLE: &str = "debuggable";
pub const JNI_DEBUGGABLE: &str = "jniDebuggable";
pub const RENDERSCRIPT_DEBUGGABLE: &str = "renderscriptDebuggable";
pub const PSEUDO_LOCALES_ENABLED: &str = "pseudoLocalesEnabled";
pub const SIGNING_CONFIG: &str = "signingConfig";
pub const SDK_MIN_VERSION: &str = "sdkMinVersion";
pub const SDK_TARGET_VERSION: &str = "sdkTargetVersion";
pub const APPLICATION_ID: &str = "applicationId";
pub const VERSION_NAME: &str = "versionName";
pub const VERSION_CODE: &str = "versionCode";
pub const NAMESPACE: &str = "namespace";
pub const SOURCE_COMPATIBILITY: &str = "sourceCompatibility";
pub const TARGET_COMPATIBILITY: &str = "targetCompatibility";
pub const JVM_TARGET: &str = "jvmTarget";
pub const CORE_LIBRARY_DESUGARING_ENABLED: &str = "coreLibraryDesugaringEnabled";
pub const CORE_LIBRARY_DESUGARING: &str = "coreLibraryDesugaring";
pub const DEX_JAVA_MAX_HEAP_SIZE: &str = "dexJavaMaxHeapSize";
pub const PRE_DEX_LIBRARIES: &str = "preDexLibraries";

/// Attributes that must be present in every resolved configuration.
pub const REQUIRED_ATTRIBUTES: &[&str] = &[
    MINIFY_ENABLED,
    DEBUGGABLE,
    SDK_MIN_VERSION,
    SDK_TARGET_VERSION,
];

/// Well-known attributes whose value must be a boolean.
pub const BOOLEAN_ATTRIBUTES: &[&str] = &[
    MINIFY_ENABLED,
    SHRINK_RESOURCES,
    DEBUGGABLE,
    JNI_DEBUGGABLE,
    RENDERSCRIPT_DEBUGGABLE,
    PSEUDO_LOCALES_ENABLED,
    CORE_LIBRARY_DESUGARING_ENABLED,
    PRE_DEX_LIBRARIES,
];

/// Well-known attributes whose value must be an integer.
pub const INTEGER_ATTRIBUTES: &[&str] = &[SDK_MIN_VERSION, SDK_TARGET_VERSION, VERSION_CODE];

const STRUCTURAL_ATTRIBUTES: &[&str] = &[
    MINIFY_ENABLED,
    SHRINK_RESOURCES,
    DEBUGGABLE,
    JNI_DEBUGGABLE,
    RENDERSCRIPT_DEBUGGABLE,
    PSEUDO_LOCALES_ENABLED,
    SIGNING_CONFIG,
    SDK_MIN_VERSION,
    SDK_TARGET_VERSION,
    APPLICATION_ID,
    NAMESPACE,
    SOURCE_COMPATIBILITY,
    TARGET_COMPATIBILITY,
    JVM_TARGET,
    CORE_LIBRARY_DESUGARING_ENABLED,
    CORE_LIBRARY_DESUGARING,
];

const ENVIRONMENT_ATTRIBUTES: &[&str] = &[VERSION_NAME, VERSION_CODE];

/// A scalar attribute value
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttributeValue {
    Bool(bool),
    Integer(i64),
    String(String),
}

impl AttributeValue {
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            AttributeValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            AttributeValue::Integer(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            AttributeValue::String(s) => Some(s),
            _ => None,
        }
    }

    /// Short type name used in diagnostics
    pub fn kind(&self) -> &'static str {
        match self {
            AttributeValue::Bool(_) => "boolean",
            AttributeValue::Integer(_) => "integer",
            AttributeValue::String(_) => "string",
        }
    }

    /// Parse a raw override string into the same kind as `self`.
    ///
    /// Strings accept any input. Returns `None` when the raw text cannot be
    /// read as a boolean or integer respectively.
    pub fn coerce_like(&self, raw: &str) -> Option<AttributeValue> {
        match self {
            AttributeValue::Bool(_) => match raw.trim() {
                "true" => Some(AttributeValue::Bool(true)),
                "false" => Some(AttributeValue::Bool(false)),
                _ => None,
            },
            AttributeValue::Integer(_) => raw.trim().parse().ok().map(AttributeValue::Integer),
            AttributeValue::String(_) => Some(AttributeValue::String(raw.to_string())),
        }
    }
}

/// Parse a raw override for an attribute no layer has set.
///
/// Well-known boolean and integer attributes must parse as their kind, other
/// names keep the raw string. On failure the expected kind is returned.
pub fn parse_for(name: &str, raw: &str) -> Result<AttributeValue, &'static str> {
    let template = if BOOLEAN_ATTRIBUTES.contains(&name) {
        AttributeValue::Bool(false)
    } else if INTEGER_ATTRIBUTES.contains(&name) {
        AttributeValue::Integer(0)
    } else {
        return Ok(AttributeValue::from(raw));
    };
    template.coerce_like(raw).ok_or(template.kind())
}

impl fmt::Display for AttributeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttributeValue::Bool(b) => write!(f, "{}", b),
            AttributeValue::Integer(i) => write!(f, "{}", i),
            AttributeValue::String(s) => write!(f, "{}", s),
        }
    }
}

impl From<bool> for AttributeValue {
    fn from(value: bool) -> Self {
        AttributeValue::Bool(value)
    }
}

impl From<i64> for AttributeValue {
    fn from(value: i64) -> Self {
        AttributeValue::Integer(value)
    }
}

impl From<i32> for AttributeValue {
    fn from(value: i32) -> Self {
        AttributeValue::Integer(i64::from(value))
    }
}

impl From<&str> for AttributeValue {
    fn from(value: &str) -> Self {
        AttributeValue::String(value.to_string())
    }
}

impl From<String> for AttributeValue {
    fn from(value: String) -> Self {
        AttributeValue::String(value)
    }
}

/// Precedence tier of an attribute
///
/// Structural attributes (shrinking, debuggability, signing) keep the
/// variant fragment's value over an override. Environment attributes
/// (keys, version strings) take the override.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttributeTier {
    Structural,
    Environment,
}

/// Attribute name to tier classification
///
/// Unclassified attributes are treated as structural.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TierTable {
    tiers: BTreeMap<String, AttributeTier>,
}

impl Default for TierTable {
    fn default() -> Self {
        let mut tiers = BTreeMap::new();
        for name in STRUCTURAL_ATTRIBUTES {
            tiers.insert(name.to_string(), AttributeTier::Structural);
        }
        for name in ENVIRONMENT_ATTRIBUTES {
            tiers.insert(name.to_string(), AttributeTier::Environment);
        }
        Self { tiers }
    }
}

impl TierTable {
    /// An empty table (every attribute structural)
    pub fn empty() -> Self {
        Self {
            tiers: BTreeMap::new(),
        }
    }

    pub fn classify(&mut self, attribute: impl Into<String>, tier: AttributeTier) {
        self.tiers.insert(attribute.into(), tier);
    }

    pub fn tier_of(&self, attribute: &str) -> AttributeTier {
        self.tiers
            .get(attribute)
            .copied()
            .unwrap_or(AttributeTier::Structural)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, AttributeTier)> {
        self.tiers.iter().map(|(k, v)| (k.as_str(), *v))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_coerce_bool() {
        let template = AttributeValue::Bool(false);
        assert_eq!(template.coerce_like("true"), Some(AttributeValue::Bool(true)));
        assert_eq!(template.coerce_like(" false "), Some(AttributeValue::Bool(false)));
        assert_eq!(template.coerce_like("yes"), None);
    }

    #[test]
    fn test_parse_for_well_known_kinds() {
        assert_eq!(parse_for(SDK_TARGET_VERSION, "35"), Ok(AttributeValue::Integer(35)));
        assert_eq!(parse_for(VERSION_CODE, " 241 "), Ok(AttributeValue::Integer(241)));
        assert_eq!(parse_for(DEBUGGABLE, "true"), Ok(AttributeValue::Bool(true)));
        assert_eq!(parse_for(SDK_MIN_VERSION, "twenty"), Err("integer"));
        assert_eq!(parse_for(MINIFY_ENABLED, "1"), Err("boolean"));
        assert_eq!(parse_for("apiHost", "35"), Ok(AttributeValue::from("35")));
    }

    #[test]
    fn test_coerce_integer() {
        let template = AttributeValue::Integer(0);
        assert_eq!(template.coerce_like("35"), Some(AttributeValue::Integer(35)));
        assert_eq!(template.coerce_like("3.5"), None);
    }

    #[test]
    fn test_coerce_string_accepts_anything() {
        let template = AttributeValue::from("x");
        assert_eq!(
            template.coerce_like("1.2.3"),
            Some(AttributeValue::String("1.2.3".to_string()))
        );
    }

    #[test]
    fn test_default_tiers() {
        let table = TierTable::default();
        assert_eq!(table.tier_of(MINIFY_ENABLED), AttributeTier::Structural);
        assert_eq!(table.tier_of(SIGNING_CONFIG), AttributeTier::Structural);
        assert_eq!(table.tier_of(VERSION_NAME), AttributeTier::Environment);
        assert_eq!(table.tier_of("somethingElse"), AttributeTier::Structural);
    }

    #[test]
    fn test_classify_overrides_default() {
        let mut table = TierTable::default();
        table.classify("mapsApiKey", AttributeTier::Environment);
        table.classify(VERSION_NAME, AttributeTier::Structural);
        assert_eq!(table.tier_of("mapsApiKey"), AttributeTier::Environment);
        assert_eq!(table.tier_of(VERSION_NAME), AttributeTier::Structural);
    }

    #[test]
    fn test_untagged_serde() {
        let value: AttributeValue = serde_json::from_str("true").unwrap();
        assert_eq!(value, AttributeValue::Bool(true));
        let value: AttributeValue = serde_json::from_str("24").unwrap();
        assert_eq!(value, AttributeValue::Integer(24));
        let value: AttributeValue = serde_json::from_str("\"debug\"").unwrap();
        assert_eq!(value, AttributeValue::String("debug".to_string()));
    }
}
