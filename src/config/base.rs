//! Base configuration
//!
//! The default attribute set every variant is layered on.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::attribute::AttributeValue;
use crate::packaging::ExclusionPatterns;

/// Default attributes, manifest placeholders, exclusion patterns and rules files
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BaseConfiguration {
    #[serde(default)]
    pub attributes: BTreeMap<String, AttributeValue>,

    /// Placeholder name to template, e.g.
    /// `GOOGLE_MAPS_API_KEY = "${dart.env.GOOGLE_MAPS_ANDROID_API_KEY}"`
    #[serde(default)]
    pub manifest_placeholders: BTreeMap<String, String>,

    #[serde(default)]
    pub excludes: ExclusionPatterns,

    /// Code shrinker rules files, in the order they are passed on
    #[serde(default)]
    pub proguard_files: Vec<String>,
}

impl BaseConfiguration {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: impl Into<String>, value: impl Into<AttributeValue>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }

    pub fn with_placeholder(mut self, name: impl Into<String>, template: impl Into<String>) -> Self {
        self.manifest_placeholders.insert(name.into(), template.into());
        self
    }

    pub fn with_exclude(mut self, pattern: impl Into<String>) -> Self {
        self.excludes.insert(pattern);
        self
    }

    pub fn with_proguard_file(mut self, file: impl Into<String>) -> Self {
        self.proguard_files.push(file.into());
        self
    }

    pub fn get(&self, name: &str) -> Option<&AttributeValue> {
        self.attributes.get(name)
    }
}
