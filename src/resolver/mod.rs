//! Variant resolution
//!
//! Resolving a variant runs in fixed phases:
//! 1. merge: base attributes, then the variant fragment by key
//! 2. snapshot: every override key the merge result needs is read once
//! 3. substitute: `${key}` placeholders in string values are rendered
//! 4. bind: overrides bound to attributes are applied, honoring tiers
//! 5. validate: all checks run; any violation fails the whole resolution

mod placeholder;
mod validate;

use std::collections::{BTreeMap, BTreeSet};

use crate::attribute::{parse_for, AttributeTier, AttributeValue};
use crate::config::{
    AttributeOrigin, BaseConfiguration, BuildDescriptor, DescriptorError, ResolvedAttribute,
    ResolvedConfiguration,
};
use crate::overrides::{OverrideDeclarations, OverrideError, OverrideSnapshot, OverrideSource};
use crate::packaging::PatternError;
use crate::variant::{RegistryError, VariantRegistry};

pub use placeholder::PlaceholderError;
pub use validate::Violation;

/// Resolution errors
#[derive(Debug, thiserror::Error)]
pub enum ResolveError {
    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error(transparent)]
    Override(#[from] OverrideError),

    #[error("Invalid configuration [{}]: {reason}", .attributes.join(", "))]
    InvalidConfiguration {
        attributes: Vec<String>,
        reason: String,
    },

    #[error(transparent)]
    Pattern(#[from] PatternError),

    #[error("Failed to fingerprint resolved configuration: {0}")]
    Fingerprint(String),
}

impl ResolveError {
    fn invalid(attribute: &str, reason: impl Into<String>) -> Self {
        ResolveError::InvalidConfiguration {
            attributes: vec![attribute.to_string()],
            reason: reason.into(),
        }
    }

    fn from_violations(violations: Vec<Violation>) -> Self {
        let mut attributes: Vec<String> = Vec::new();
        for name in violations.iter().flat_map(|v| v.attributes.iter()) {
            if !attributes.contains(name) {
                attributes.push(name.clone());
            }
        }
        let reason = violations
            .iter()
            .map(|v| v.reason.as_str())
            .collect::<Vec<_>>()
            .join("; ");
        ResolveError::InvalidConfiguration { attributes, reason }
    }

    /// Attribute names a validation failure is about
    pub fn offending_attributes(&self) -> &[String] {
        match self {
            ResolveError::InvalidConfiguration { attributes, .. } => attributes,
            _ => &[],
        }
    }
}

/// Resolves variant names into validated configurations
#[derive(Debug)]
pub struct Resolver<S> {
    base: BaseConfiguration,
    registry: VariantRegistry,
    declarations: OverrideDeclarations,
    source: S,
}

impl<S: OverrideSource> Resolver<S> {
    pub fn new(base: BaseConfiguration, registry: VariantRegistry, source: S) -> Self {
        Self {
            base,
            registry,
            declarations: OverrideDeclarations::new(),
            source,
        }
    }

    pub fn with_declarations(mut self, declarations: OverrideDeclarations) -> Self {
        self.declarations = declarations;
        self
    }

    /// Build a resolver from a parsed descriptor
    pub fn from_descriptor(descriptor: BuildDescriptor, source: S) -> Result<Self, DescriptorError> {
        let (base, registry, declarations) = descriptor.into_parts()?;
        Ok(Self::new(base, registry, source).with_declarations(declarations))
    }

    pub fn base(&self) -> &BaseConfiguration {
        &self.base
    }

    pub fn registry(&self) -> &VariantRegistry {
        &self.registry
    }

    pub fn declarations(&self) -> &OverrideDeclarations {
        &self.declarations
    }

    /// Resolve `variant` into a validated configuration
    pub fn resolve(&self, variant: &str) -> Result<ResolvedConfiguration, ResolveError> {
        let fragment = self.registry.lookup(variant)?;

        let mut attributes = BTreeMap::new();
        for (name, value) in &self.base.attributes {
            attributes.insert(
                name.clone(),
                ResolvedAttribute::new(value.clone(), AttributeOrigin::Base),
            );
        }
        for (name, value) in &fragment.attributes {
            attributes.insert(
                name.clone(),
                ResolvedAttribute::new(value.clone(), AttributeOrigin::Variant),
            );
        }

        let mut placeholders = BTreeMap::new();
        for (name, template) in &self.base.manifest_placeholders {
            placeholders.insert(
                name.clone(),
                ResolvedAttribute::new(AttributeValue::from(template.as_str()), AttributeOrigin::Base),
            );
        }
        for (name, template) in &fragment.manifest_placeholders {
            placeholders.insert(
                name.clone(),
                ResolvedAttribute::new(
                    AttributeValue::from(template.as_str()),
                    AttributeOrigin::Variant,
                ),
            );
        }

        let mut patterns = self.base.excludes.clone();
        patterns.extend(fragment.excludes.iter());

        let mut proguard_files = self.base.proguard_files.clone();
        for file in &fragment.proguard_files {
            if !proguard_files.contains(file) {
                proguard_files.push(file.clone());
            }
        }

        tracing::debug!(
            variant,
            attributes = attributes.len(),
            placeholders = placeholders.len(),
            patterns = patterns.len(),
            "merged variant onto base"
        );

        let keys = self.needed_keys(&attributes, &placeholders)?;
        let snapshot = OverrideSnapshot::capture(&self.source, &self.declarations, &keys)?;

        substitute(&mut attributes, &snapshot)?;
        substitute(&mut placeholders, &snapshot)?;
        self.apply_bindings(&mut attributes, &snapshot)?;

        let violations = validate::check(&attributes);
        if !violations.is_empty() {
            let err = ResolveError::from_violations(violations);
            tracing::debug!(variant, error = %err, "variant failed validation");
            return Err(err);
        }

        patterns.compile()?;

        let resolved = ResolvedConfiguration::new(
            variant.to_string(),
            attributes,
            placeholders,
            patterns,
            proguard_files,
        )
        .map_err(ResolveError::Fingerprint)?;

        tracing::info!(
            variant,
            fingerprint = resolved.fingerprint(),
            overrides = snapshot.len(),
            "resolved variant"
        );
        Ok(resolved)
    }

    /// Every override key referenced by a placeholder or bound to an
    /// attribute the override can still change
    fn needed_keys(
        &self,
        attributes: &BTreeMap<String, ResolvedAttribute>,
        placeholders: &BTreeMap<String, ResolvedAttribute>,
    ) -> Result<BTreeSet<String>, ResolveError> {
        let mut keys: BTreeSet<String> = self
            .declarations
            .bindings()
            .filter(|(attribute, _)| !self.keeps_variant_value(attributes, attribute))
            .map(|(_, entry)| entry.key.clone())
            .collect();

        for (name, attr) in attributes.iter().chain(placeholders.iter()) {
            if let AttributeValue::String(template) = &attr.value {
                let references = placeholder::references(template)
                    .map_err(|e| ResolveError::invalid(name, e.to_string()))?;
                keys.extend(references.into_iter().map(str::to_string));
            }
        }

        Ok(keys)
    }

    /// Structural attribute set by the variant fragment; overrides never apply
    fn keeps_variant_value(
        &self,
        attributes: &BTreeMap<String, ResolvedAttribute>,
        attribute: &str,
    ) -> bool {
        self.registry.tiers().tier_of(attribute) == AttributeTier::Structural
            && attributes
                .get(attribute)
                .is_some_and(|existing| existing.origin == AttributeOrigin::Variant)
    }

    fn apply_bindings(
        &self,
        attributes: &mut BTreeMap<String, ResolvedAttribute>,
        snapshot: &OverrideSnapshot,
    ) -> Result<(), ResolveError> {
        for (attribute, entry) in self.declarations.bindings() {
            if self.keeps_variant_value(attributes, attribute) {
                tracing::debug!(
                    attribute,
                    key = %entry.key,
                    "variant keeps structural attribute over override"
                );
                continue;
            }
            let Some(captured) = snapshot.get(&entry.key) else {
                continue;
            };
            let Some(raw) = captured.value.as_deref() else {
                continue;
            };

            let value = match attributes.get(attribute) {
                // A declared default only fills attributes nobody set
                Some(_) if captured.from_default => continue,
                Some(existing) => existing.value.coerce_like(raw).ok_or_else(|| {
                    ResolveError::invalid(
                        attribute,
                        format!(
                            "override '{}' is not a valid {} for {}",
                            entry.key,
                            existing.value.kind(),
                            attribute
                        ),
                    )
                })?,
                None => parse_for(attribute, raw).map_err(|kind| {
                    ResolveError::invalid(
                        attribute,
                        format!(
                            "override '{}' is not a valid {} for {}",
                            entry.key, kind, attribute
                        ),
                    )
                })?,
            };

            tracing::debug!(attribute, key = %entry.key, "applied override binding");
            attributes.insert(
                attribute.to_string(),
                ResolvedAttribute {
                    value,
                    origin: AttributeOrigin::Override,
                    overrides: vec![entry.key.clone()],
                    secret: captured.secret,
                },
            );
        }
        Ok(())
    }
}

/// Render `${key}` placeholders in every string value from the snapshot
fn substitute(
    values: &mut BTreeMap<String, ResolvedAttribute>,
    snapshot: &OverrideSnapshot,
) -> Result<(), ResolveError> {
    for (name, attr) in values.iter_mut() {
        let AttributeValue::String(template) = &attr.value else {
            continue;
        };
        if !placeholder::has_placeholders(template) {
            continue;
        }

        let keys: Vec<String> = placeholder::references(template)
            .map_err(|e| ResolveError::invalid(name, e.to_string()))?
            .into_iter()
            .map(str::to_string)
            .collect();

        let rendered = placeholder::render(template, |key| {
            snapshot.get(key).and_then(|v| v.value.as_deref())
        })
        .map_err(|e| match e {
            PlaceholderError::Unresolved(key) => {
                ResolveError::Override(OverrideError::MissingOverride { key })
            }
            other => ResolveError::invalid(name, other.to_string()),
        })?;

        attr.secret |= keys
            .iter()
            .any(|k| snapshot.get(k).is_some_and(|v| v.secret));
        for key in keys {
            if !attr.overrides.contains(&key) {
                attr.overrides.push(key);
            }
        }
        attr.value = AttributeValue::String(rendered);
    }
    Ok(())
}
