//! Variant Config - build variant configuration resolver
//!
//! Resolves a named build variant (e.g. `debug`, `release`) of a mobile
//! application's packaging configuration into one validated attribute set,
//! and filters resource paths against the variant's packaging exclusions.

pub mod attribute;
pub mod config;
pub mod overrides;
pub mod packaging;
pub mod resolver;
pub mod variant;

pub use attribute::{AttributeTier, AttributeValue};
pub use config::{BaseConfiguration, BuildDescriptor, ResolvedConfiguration};
pub use overrides::{EnvOverrides, MapOverrides, OverrideEntry, OverrideError, OverrideSource};
pub use packaging::{filter, ExclusionPatterns, PatternError};
pub use resolver::{ResolveError, Resolver};
pub use variant::{RegistrationPolicy, RegistryError, VariantFragment, VariantRegistry};
