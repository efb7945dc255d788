//! Resolved configuration
//!
//! The immutable result of resolving one variant: attribute values with
//! their provenance, the manifest placeholders, the exclusion patterns and
//! the code shrinker rules files.
//! Nothing time- or host-dependent is recorded, so resolving the same
//! variant with the same overrides yields identical output.

use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::fs;
use std::io;
use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use sha2::{Digest, Sha256};

use crate::attribute::AttributeValue;
use crate::packaging::{ExcludeRules, ExclusionPatterns, PatternError};

/// Schema version for the rendered report
pub const SCHEMA_VERSION: u32 = 1;

/// Schema identifier
pub const SCHEMA_ID: &str = "variant-config/resolved@1";

const REDACTED: &str = "[REDACTED]";

/// Name fragments that mark an attribute as secret regardless of its source
const SECRET_KEYS: &[&str] = &[
    "password",
    "token",
    "secret",
    "private_key",
    "api_key",
    "apikey",
    "credential",
];

/// Layer an attribute's final value came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttributeOrigin {
    Base,
    Variant,
    Override,
}

/// A resolved value with provenance
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedAttribute {
    pub value: AttributeValue,

    pub origin: AttributeOrigin,

    /// Override keys bound to or substituted into this value
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub overrides: Vec<String>,

    /// Carries a secret override value
    #[serde(default)]
    pub secret: bool,
}

impl ResolvedAttribute {
    pub fn new(value: AttributeValue, origin: AttributeOrigin) -> Self {
        Self {
            value,
            origin,
            overrides: Vec::new(),
            secret: false,
        }
    }
}

/// Provenance entry in the rendered report
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Provenance {
    pub origin: AttributeOrigin,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub overrides: Vec<String>,
}

/// Serializable rendering of a resolved configuration with secrets redacted
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedReport {
    pub schema_version: u32,
    pub schema_id: String,
    pub variant: String,
    pub fingerprint: String,
    pub attributes: BTreeMap<String, AttributeValue>,
    pub manifest_placeholders: BTreeMap<String, AttributeValue>,
    pub exclusion_patterns: ExclusionPatterns,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub proguard_files: Vec<String>,
    pub provenance: BTreeMap<String, Provenance>,
    pub redactions: Vec<String>,
}

/// Fully merged, substituted and validated configuration for one variant
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedConfiguration {
    variant: String,
    attributes: BTreeMap<String, ResolvedAttribute>,
    manifest_placeholders: BTreeMap<String, ResolvedAttribute>,
    exclusion_patterns: ExclusionPatterns,
    proguard_files: Vec<String>,
    fingerprint: String,
}

impl ResolvedConfiguration {
    /// Assemble a resolved configuration and compute its fingerprint.
    ///
    /// Only the resolver builds these, after validation has passed.
    pub(crate) fn new(
        variant: String,
        attributes: BTreeMap<String, ResolvedAttribute>,
        manifest_placeholders: BTreeMap<String, ResolvedAttribute>,
        exclusion_patterns: ExclusionPatterns,
        proguard_files: Vec<String>,
    ) -> Result<Self, String> {
        let mut config = Self {
            variant,
            attributes,
            manifest_placeholders,
            exclusion_patterns,
            proguard_files,
            fingerprint: String::new(),
        };
        config.fingerprint = config.compute_fingerprint()?;
        Ok(config)
    }

    /// SHA-256 hex digest of the JCS form of [`Self::values`]
    fn compute_fingerprint(&self) -> Result<String, String> {
        let jcs_bytes =
            serde_json_canonicalizer::to_vec(&self.values()).map_err(|e| e.to_string())?;

        let mut hasher = Sha256::new();
        hasher.update(&jcs_bytes);
        Ok(hex::encode(hasher.finalize()))
    }

    pub fn variant(&self) -> &str {
        &self.variant
    }

    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }

    pub fn get(&self, name: &str) -> Option<&AttributeValue> {
        self.attributes.get(name).map(|a| &a.value)
    }

    pub fn get_bool(&self, name: &str) -> Option<bool> {
        self.get(name).and_then(AttributeValue::as_bool)
    }

    pub fn get_i64(&self, name: &str) -> Option<i64> {
        self.get(name).and_then(AttributeValue::as_i64)
    }

    pub fn get_str(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(AttributeValue::as_str)
    }

    /// Value together with its provenance
    pub fn attribute(&self, name: &str) -> Option<&ResolvedAttribute> {
        self.attributes.get(name)
    }

    /// Attributes in name order
    pub fn attributes(&self) -> impl Iterator<Item = (&str, &AttributeValue)> {
        self.attributes.iter().map(|(k, v)| (k.as_str(), &v.value))
    }

    pub fn manifest_placeholder(&self, name: &str) -> Option<&str> {
        self.manifest_placeholders
            .get(name)
            .and_then(|p| p.value.as_str())
    }

    /// Manifest placeholders in name order
    pub fn manifest_placeholders(&self) -> impl Iterator<Item = (&str, &AttributeValue)> {
        self.manifest_placeholders
            .iter()
            .map(|(k, v)| (k.as_str(), &v.value))
    }

    pub fn exclusion_patterns(&self) -> &ExclusionPatterns {
        &self.exclusion_patterns
    }

    /// Code shrinker rules files, base entries first
    pub fn proguard_files(&self) -> &[String] {
        &self.proguard_files
    }

    /// Compiled packaging rules for this configuration
    pub fn packaging_rules(&self) -> Result<ExcludeRules, PatternError> {
        self.exclusion_patterns.compile()
    }

    /// Unredacted attribute mapping for downstream build tooling
    pub fn values(&self) -> Value {
        let attributes: BTreeMap<&str, &AttributeValue> = self.attributes().collect();
        let placeholders: BTreeMap<&str, &AttributeValue> = self.manifest_placeholders().collect();
        json!({
            "variant": self.variant,
            "attributes": attributes,
            "manifest_placeholders": placeholders,
            "exclusion_patterns": self.exclusion_patterns,
            "proguard_files": self.proguard_files,
        })
    }

    /// Render a report with secret values redacted
    pub fn to_report(&self) -> ResolvedReport {
        let mut redactions = Vec::new();
        let attributes = redact_map(&self.attributes, "attributes", &mut redactions);
        let manifest_placeholders = redact_map(
            &self.manifest_placeholders,
            "manifest_placeholders",
            &mut redactions,
        );

        let provenance = self
            .attributes
            .iter()
            .map(|(name, attr)| {
                (
                    name.clone(),
                    Provenance {
                        origin: attr.origin,
                        overrides: attr.overrides.clone(),
                    },
                )
            })
            .collect();

        ResolvedReport {
            schema_version: SCHEMA_VERSION,
            schema_id: SCHEMA_ID.to_string(),
            variant: self.variant.clone(),
            fingerprint: self.fingerprint.clone(),
            attributes,
            manifest_placeholders,
            exclusion_patterns: self.exclusion_patterns.clone(),
            proguard_files: self.proguard_files.clone(),
            provenance,
            redactions,
        }
    }

    /// Serialize the redacted report to JSON
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(&self.to_report())
    }

    /// Write the redacted report to a file
    pub fn write_to_file(&self, path: &Path) -> io::Result<()> {
        let json = self.to_json().map_err(|e| {
            io::Error::new(
                io::ErrorKind::InvalidData,
                format!("JSON serialization failed: {}", e),
            )
        })?;
        fs::write(path, json)
    }

    /// Human-readable summary with secrets redacted
    pub fn to_human(&self) -> String {
        let report = self.to_report();
        let mut out = String::new();

        let _ = writeln!(out, "Variant: {}", report.variant);
        let _ = writeln!(out, "Fingerprint: {}", report.fingerprint);
        let _ = writeln!(out, "\nAttributes:");
        for (name, value) in &report.attributes {
            let origin = report
                .provenance
                .get(name)
                .map(|p| format!("{:?}", p.origin).to_lowercase())
                .unwrap_or_default();
            let _ = writeln!(out, "  {} = {} ({})", name, value, origin);
        }
        if !report.manifest_placeholders.is_empty() {
            let _ = writeln!(out, "\nManifest placeholders:");
            for (name, value) in &report.manifest_placeholders {
                let _ = writeln!(out, "  {} = {}", name, value);
            }
        }
        if !report.proguard_files.is_empty() {
            let _ = writeln!(out, "\nProguard files: {}", report.proguard_files.join(", "));
        }
        let _ = writeln!(out, "\nExcluded from packaging:");
        for pattern in report.exclusion_patterns.iter() {
            let _ = writeln!(out, "  {}", pattern);
        }
        out
    }
}

fn is_secret_name(name: &str) -> bool {
    let lower = name.to_lowercase();
    SECRET_KEYS.iter().any(|s| lower.contains(s))
}

fn redact_map(
    values: &BTreeMap<String, ResolvedAttribute>,
    section: &str,
    redactions: &mut Vec<String>,
) -> BTreeMap<String, AttributeValue> {
    values
        .iter()
        .map(|(name, attr)| {
            if attr.secret || is_secret_name(name) {
                redactions.push(format!("{}.{}", section, name));
                (name.clone(), AttributeValue::from(REDACTED))
            } else {
                (name.clone(), attr.value.clone())
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> ResolvedConfiguration {
        let mut attributes = BTreeMap::new();
        attributes.insert(
            "minifyEnabled".to_string(),
            ResolvedAttribute::new(AttributeValue::Bool(true), AttributeOrigin::Variant),
        );
        attributes.insert(
            "sdkMinVersion".to_string(),
            ResolvedAttribute::new(AttributeValue::Integer(24), AttributeOrigin::Base),
        );
        attributes.insert(
            "backendToken".to_string(),
            ResolvedAttribute::new(AttributeValue::from("t0k3n"), AttributeOrigin::Base),
        );

        let mut placeholders = BTreeMap::new();
        let mut maps = ResolvedAttribute::new(AttributeValue::from("AIza-real"), AttributeOrigin::Base);
        maps.overrides.push("dart.env.GOOGLE_MAPS_ANDROID_API_KEY".to_string());
        maps.secret = true;
        placeholders.insert("MAPS".to_string(), maps);

        let patterns: ExclusionPatterns = ["META-INF/LICENSE", "**/*.properties"].into_iter().collect();

        let proguard = vec![
            "proguard-android-optimize.txt".to_string(),
            "proguard-rules.pro".to_string(),
        ];

        ResolvedConfiguration::new(
            "release".to_string(),
            attributes,
            placeholders,
            patterns,
            proguard,
        )
        .unwrap()
    }

    #[test]
    fn test_accessors() {
        let config = sample();

        assert_eq!(config.variant(), "release");
        assert_eq!(config.get_bool("minifyEnabled"), Some(true));
        assert_eq!(config.get_i64("sdkMinVersion"), Some(24));
        assert_eq!(config.get_str("sdkMinVersion"), None);
        assert_eq!(config.manifest_placeholder("MAPS"), Some("AIza-real"));
        assert_eq!(
            config.attribute("sdkMinVersion").unwrap().origin,
            AttributeOrigin::Base
        );
    }

    #[test]
    fn test_fingerprint_is_stable() {
        let a = sample();
        let b = sample();

        assert_eq!(a.fingerprint().len(), 64);
        assert_eq!(a.fingerprint(), b.fingerprint());
        assert_eq!(a.to_json().unwrap(), b.to_json().unwrap());
    }

    #[test]
    fn test_values_are_unredacted() {
        let values = sample().values();
        assert_eq!(values["manifest_placeholders"]["MAPS"], "AIza-real");
        assert_eq!(values["attributes"]["backendToken"], "t0k3n");
    }

    #[test]
    fn test_report_redacts_secrets() {
        let report = sample().to_report();

        assert_eq!(report.manifest_placeholders["MAPS"], AttributeValue::from(REDACTED));
        assert_eq!(report.attributes["backendToken"], AttributeValue::from(REDACTED));
        assert_eq!(report.attributes["minifyEnabled"], AttributeValue::Bool(true));
        assert!(report.redactions.contains(&"manifest_placeholders.MAPS".to_string()));
        assert!(report.redactions.contains(&"attributes.backendToken".to_string()));
        assert_eq!(report.schema_id, SCHEMA_ID);
    }

    #[test]
    fn test_json_never_contains_secret() {
        let json = sample().to_json().unwrap();
        assert!(!json.contains("AIza-real"));
        assert!(!json.contains("t0k3n"));
    }

    #[test]
    fn test_write_to_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("resolved.json");
        sample().write_to_file(&path).unwrap();

        let parsed: ResolvedReport =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(parsed.variant, "release");
        assert_eq!(parsed.exclusion_patterns.len(), 2);
        assert_eq!(parsed.proguard_files.len(), 2);
    }

    #[test]
    fn test_human_output() {
        let human = sample().to_human();
        assert!(human.contains("Variant: release"));
        assert!(human.contains("minifyEnabled = true (variant)"));
        assert!(human.contains("MAPS = [REDACTED]"));
        assert!(human.contains("Proguard files: proguard-android-optimize.txt, proguard-rules.pro"));
    }
}
