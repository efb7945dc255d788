//! Shared fixtures for integration tests

#![allow(dead_code)]

use std::path::{Path, PathBuf};

use variant_config::{BuildDescriptor, MapOverrides, Resolver};

pub const MAPS_KEY: &str = "dart.env.GOOGLE_MAPS_ANDROID_API_KEY";

/// Path to the application descriptor fixture
pub fn app_descriptor_path() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/app.toml")
}

/// Path to the local overlay fixture
pub fn local_overlay_path() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/local.toml")
}

/// Resolver over the application descriptor with the given overrides
pub fn app_resolver(overrides: MapOverrides) -> Resolver<MapOverrides> {
    let descriptor = BuildDescriptor::from_file(&app_descriptor_path()).unwrap();
    Resolver::from_descriptor(descriptor, overrides).unwrap()
}

/// Overrides with the Maps key set
pub fn with_maps_key() -> MapOverrides {
    MapOverrides::new().with(MAPS_KEY, "AIzaSyTestKey")
}
