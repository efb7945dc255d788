//! Build configuration
//!
//! Descriptor loading and layering, the built-in descriptor, the base
//! configuration and the resolved output.

mod base;
mod defaults;
mod descriptor;
mod merge;
mod resolved;

pub use base::BaseConfiguration;
pub use defaults::{BuiltinDefaults, DEFAULT_EXCLUDES, RELEASE_PROGUARD_FILES};
pub use descriptor::{BuildDescriptor, DescriptorError, DescriptorSource, RegistrySection};
pub use merge::{deep_merge, merge_layers};
pub use resolved::{
    AttributeOrigin, Provenance, ResolvedAttribute, ResolvedConfiguration, ResolvedReport,
    SCHEMA_ID, SCHEMA_VERSION,
};
