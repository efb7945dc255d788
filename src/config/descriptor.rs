//! Build descriptor files
//!
//! A descriptor declares the base configuration, the variants, the override
//! declarations and the attribute tiers:
//!
//! ```toml
//! [registry]
//! policy = "replace_existing"
//!
//! [base.attributes]
//! minifyEnabled = false
//! debuggable = false
//! sdkMinVersion = 24
//! sdkTargetVersion = 35
//!
//! [base.manifest_placeholders]
//! GOOGLE_MAPS_API_KEY = "${dart.env.GOOGLE_MAPS_ANDROID_API_KEY}"
//!
//! [base]
//! excludes = ["META-INF/LICENSE", "**/*.properties"]
//!
//! [variants.release]
//! proguard_files = ["proguard-android-optimize.txt", "proguard-rules.pro"]
//!
//! [variants.release.attributes]
//! minifyEnabled = true
//!
//! [overrides."dart.env.GOOGLE_MAPS_ANDROID_API_KEY"]
//! required = true
//! secret = true
//!
//! [tiers]
//! versionName = "environment"
//! ```
//!
//! Several files can be layered; see [`super::merge`].

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};

use super::base::BaseConfiguration;
use super::defaults::BuiltinDefaults;
use super::merge::merge_layers;
use crate::attribute::AttributeTier;
use crate::overrides::{OverrideDeclarations, OverrideEntry};
use crate::packaging::PatternError;
use crate::variant::{RegistrationPolicy, RegistryError, VariantFragment, VariantRegistry};

/// Descriptor errors
#[derive(Debug, thiserror::Error)]
pub enum DescriptorError {
    #[error("Failed to read descriptor: {0}")]
    Io(#[from] io::Error),

    #[error("Failed to parse TOML in {path}: {message}")]
    Parse { path: String, message: String },

    #[error("Invalid descriptor: {0}")]
    Schema(#[from] serde_json::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error(transparent)]
    Pattern(#[from] PatternError),
}

/// Where a descriptor layer came from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DescriptorSource {
    /// File path, `None` for the built-in descriptor
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,

    /// SHA-256 of the raw file bytes
    #[serde(skip_serializing_if = "Option::is_none")]
    pub digest: Option<String>,
}

/// Registry settings
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistrySection {
    #[serde(default)]
    pub policy: RegistrationPolicy,
}

/// A parsed build descriptor
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildDescriptor {
    #[serde(default)]
    pub registry: RegistrySection,

    #[serde(default)]
    pub base: BaseConfiguration,

    #[serde(default)]
    pub variants: BTreeMap<String, VariantFragment>,

    /// Override declarations keyed by override key
    #[serde(default)]
    pub overrides: BTreeMap<String, OverrideEntry>,

    #[serde(default)]
    pub tiers: BTreeMap<String, AttributeTier>,

    /// Contributing layers in precedence order
    #[serde(skip)]
    pub sources: Vec<DescriptorSource>,
}

impl BuildDescriptor {
    /// The built-in descriptor
    pub fn builtin() -> Result<Self, DescriptorError> {
        let mut descriptor = Self::from_value(BuiltinDefaults::default().to_value())?;
        descriptor.sources.push(DescriptorSource {
            path: None,
            digest: None,
        });
        Ok(descriptor)
    }

    /// Parse a single descriptor from a TOML string
    pub fn from_toml_str(contents: &str) -> Result<Self, DescriptorError> {
        let value = parse_toml(contents, "<inline>")?;
        Self::from_value(value)
    }

    /// Load a single descriptor file
    pub fn from_file(path: &Path) -> Result<Self, DescriptorError> {
        Self::load_layers(&[path])
    }

    /// Load and merge descriptor files, later files taking precedence
    pub fn load_layers<P: AsRef<Path>>(paths: &[P]) -> Result<Self, DescriptorError> {
        let mut layers = Vec::new();
        let mut sources = Vec::new();

        for path in paths {
            let path = path.as_ref();
            let bytes = fs::read(path)?;

            let mut hasher = Sha256::new();
            hasher.update(&bytes);
            let digest = hex::encode(hasher.finalize());

            let display = path.to_string_lossy().to_string();
            let contents = String::from_utf8(bytes).map_err(|e| DescriptorError::Parse {
                path: display.clone(),
                message: format!("Invalid UTF-8: {}", e),
            })?;

            layers.push(parse_toml(&contents, &display)?);
            tracing::debug!(path = %path.display(), digest = %digest, "loaded descriptor layer");
            sources.push(DescriptorSource {
                path: Some(display),
                digest: Some(digest),
            });
        }

        let mut descriptor = Self::from_value(merge_layers(layers))?;
        descriptor.sources = sources;
        Ok(descriptor)
    }

    /// Deserialize and validate a merged descriptor document
    pub fn from_value(value: Value) -> Result<Self, DescriptorError> {
        let value = match value {
            Value::Null => Value::Object(Default::default()),
            other => other,
        };
        let mut descriptor: BuildDescriptor = serde_json::from_value(value)?;

        // The table key is the override key
        for (key, entry) in descriptor.overrides.iter_mut() {
            entry.key = key.clone();
        }

        descriptor.validate()?;
        Ok(descriptor)
    }

    fn validate(&self) -> Result<(), DescriptorError> {
        let mut bound: BTreeMap<&str, &str> = BTreeMap::new();
        for (key, entry) in &self.overrides {
            if key.trim().is_empty() {
                return Err(DescriptorError::Validation(
                    "override keys must not be empty".to_string(),
                ));
            }
            if let Some(attribute) = &entry.attribute {
                if attribute.trim().is_empty() {
                    return Err(DescriptorError::Validation(format!(
                        "override '{}' is bound to an empty attribute name",
                        key
                    )));
                }
                if let Some(previous) = bound.insert(attribute, key) {
                    return Err(DescriptorError::Validation(format!(
                        "overrides '{}' and '{}' are both bound to '{}'",
                        previous, key, attribute
                    )));
                }
            }
            if entry.secret && entry.default.is_some() {
                return Err(DescriptorError::Validation(format!(
                    "secret override '{}' must not declare a default",
                    key
                )));
            }
        }

        for name in self.variants.keys() {
            if name.trim().is_empty() {
                return Err(RegistryError::EmptyName.into());
            }
        }

        self.base.excludes.compile()?;
        for fragment in self.variants.values() {
            fragment.excludes.compile()?;
        }

        Ok(())
    }

    /// Split into the pieces a resolver is built from
    pub fn into_parts(
        self,
    ) -> Result<(BaseConfiguration, VariantRegistry, OverrideDeclarations), DescriptorError> {
        let mut registry = VariantRegistry::new(self.registry.policy);
        for (attribute, tier) in self.tiers {
            registry.classify(attribute, tier);
        }
        for (name, fragment) in self.variants {
            registry.register(name, fragment)?;
        }

        let mut declarations = OverrideDeclarations::new();
        for entry in self.overrides.into_values() {
            declarations.declare(entry);
        }

        Ok((self.base, registry, declarations))
    }
}

/// Parse one TOML layer straight into a JSON document for merging
fn parse_toml(contents: &str, path: &str) -> Result<Value, DescriptorError> {
    toml::from_str(contents).map_err(|e| DescriptorError::Parse {
        path: path.to_string(),
        message: e.to_string(),
    })
}
