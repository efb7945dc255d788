//! Variant registry
//!
//! Holds the named configuration fragments (e.g. `debug`, `release`) layered
//! on top of the base configuration, together with the tier classification of
//! attribute names. The registry is populated once at startup and only read
//! afterwards.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::attribute::{AttributeTier, AttributeValue, TierTable};
use crate::packaging::ExclusionPatterns;

/// Errors from registering or looking up variants
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    #[error("Unknown variant: '{0}'")]
    UnknownVariant(String),

    #[error("Duplicate variant: '{0}' is already registered")]
    DuplicateVariant(String),

    #[error("Variant name must not be empty")]
    EmptyName,
}

/// What happens when a variant name is registered twice
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RegistrationPolicy {
    /// Last write wins; the earlier fragment is dropped
    #[default]
    ReplaceExisting,
    /// Re-registering a name fails with `DuplicateVariant`
    RejectDuplicates,
}

/// A named partial set of attribute overrides
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariantFragment {
    /// Attributes overwriting the base values by key
    #[serde(default)]
    pub attributes: BTreeMap<String, AttributeValue>,

    /// Extra packaging exclusion patterns (unioned with the base set)
    #[serde(default)]
    pub excludes: ExclusionPatterns,

    /// Rules files appended after the base ones
    #[serde(default)]
    pub proguard_files: Vec<String>,

    /// Manifest placeholders overwriting the base placeholders by key
    #[serde(default)]
    pub manifest_placeholders: BTreeMap<String, String>,
}

impl VariantFragment {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set an attribute
    pub fn with(mut self, name: impl Into<String>, value: impl Into<AttributeValue>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }

    /// Add a packaging exclusion pattern
    pub fn with_exclude(mut self, pattern: impl Into<String>) -> Self {
        self.excludes.insert(pattern);
        self
    }

    /// Add a code shrinker rules file
    pub fn with_proguard_file(mut self, file: impl Into<String>) -> Self {
        self.proguard_files.push(file.into());
        self
    }

    /// Set a manifest placeholder
    pub fn with_placeholder(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.manifest_placeholders.insert(name.into(), value.into());
        self
    }
}

/// Registry of named variant fragments
#[derive(Debug, Clone, Default)]
pub struct VariantRegistry {
    fragments: BTreeMap<String, VariantFragment>,
    policy: RegistrationPolicy,
    tiers: TierTable,
}

impl VariantRegistry {
    /// Create an empty registry with the default tier table
    pub fn new(policy: RegistrationPolicy) -> Self {
        Self {
            fragments: BTreeMap::new(),
            policy,
            tiers: TierTable::default(),
        }
    }

    pub fn policy(&self) -> RegistrationPolicy {
        self.policy
    }

    /// Register a fragment under `name`.
    ///
    /// Returns the replaced fragment under `ReplaceExisting`.
    pub fn register(
        &mut self,
        name: impl Into<String>,
        fragment: VariantFragment,
    ) -> Result<Option<VariantFragment>, RegistryError> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(RegistryError::EmptyName);
        }

        if self.fragments.contains_key(&name) {
            match self.policy {
                RegistrationPolicy::RejectDuplicates => {
                    return Err(RegistryError::DuplicateVariant(name));
                }
                RegistrationPolicy::ReplaceExisting => {
                    tracing::warn!(variant = %name, "replacing previously registered variant");
                }
            }
        }

        tracing::debug!(
            variant = %name,
            attributes = fragment.attributes.len(),
            "registered variant"
        );
        Ok(self.fragments.insert(name, fragment))
    }

    /// Look up a fragment by name
    pub fn lookup(&self, name: &str) -> Result<&VariantFragment, RegistryError> {
        self.fragments
            .get(name)
            .ok_or_else(|| RegistryError::UnknownVariant(name.to_string()))
    }

    /// Registered variant names in sorted order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.fragments.keys().map(|k| k.as_str())
    }

    pub fn len(&self) -> usize {
        self.fragments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fragments.is_empty()
    }

    /// Classify an attribute name into a precedence tier
    pub fn classify(&mut self, attribute: impl Into<String>, tier: AttributeTier) {
        self.tiers.classify(attribute, tier);
    }

    pub fn tiers(&self) -> &TierTable {
        &self.tiers
    }
}
