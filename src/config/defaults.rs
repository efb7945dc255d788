//! Built-in descriptor
//!
//! Used when no descriptor file is given: an Android application with a
//! debug/release split, code and resource shrinking on release, Java 11 with
//! core library desugaring, the usual META-INF and Kotlin metadata
//! exclusions and a Maps API key placeholder.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// Default packaging exclusions
pub const DEFAULT_EXCLUDES: &[&str] = &[
    "META-INF/DEPENDENCIES",
    "META-INF/LICENSE",
    "META-INF/LICENSE.txt",
    "META-INF/license.txt",
    "META-INF/NOTICE",
    "META-INF/NOTICE.txt",
    "META-INF/notice.txt",
    "META-INF/ASL2.0",
    "**/kotlin/**",
    "kotlin/**",
    "**/*.kotlin_metadata",
    "**/*.version",
    "**/*.properties",
];

/// Rules files passed to the code shrinker on release
pub const RELEASE_PROGUARD_FILES: &[&str] = &["proguard-android-optimize.txt", "proguard-rules.pro"];

/// Built-in default values
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuiltinDefaults {
    /// Application identifier (default: "com.ittem.app")
    pub application_id: String,

    /// Code namespace, independent of the application id
    pub namespace: String,

    /// Minimum SDK level (default: 24)
    pub sdk_min_version: i64,

    /// Target SDK level (default: 35)
    pub sdk_target_version: i64,

    /// Version name used when no override is set (default: "1.0.0")
    pub version_name: String,

    /// Version code used when no override is set (default: 1)
    pub version_code: i64,

    /// Signing config used by release builds (default: "debug")
    pub release_signing_config: String,

    /// Java source/target compatibility and JVM target (default: "11")
    pub java_version: String,

    /// Desugar library coordinate
    pub desugar_library: String,

    /// Heap size for the dex step (default: "4g")
    pub dex_java_max_heap_size: String,

    /// Override key supplying the Maps API key
    pub maps_api_key_override: String,
}

impl Default for BuiltinDefaults {
    fn default() -> Self {
        Self {
            application_id: "com.ittem.app".to_string(),
            namespace: "com.example.ittem_app".to_string(),
            sdk_min_version: 24,
            sdk_target_version: 35,
            version_name: "1.0.0".to_string(),
            version_code: 1,
            release_signing_config: "debug".to_string(),
            java_version: "11".to_string(),
            desugar_library: "com.android.tools:desugar_jdk_libs:2.1.4".to_string(),
            dex_java_max_heap_size: "4g".to_string(),
            maps_api_key_override: "dart.env.GOOGLE_MAPS_ANDROID_API_KEY".to_string(),
        }
    }
}

impl BuiltinDefaults {
    /// Descriptor document for these defaults
    pub fn to_value(&self) -> Value {
        json!({
            "base": {
                "attributes": {
                    "applicationId": self.application_id,
                    "namespace": self.namespace,
                    "sdkMinVersion": self.sdk_min_version,
                    "sdkTargetVersion": self.sdk_target_version,
                    "versionName": self.version_name,
                    "versionCode": self.version_code,
                    "minifyEnabled": false,
                    "shrinkResources": false,
                    "debuggable": false,
                    "sourceCompatibility": self.java_version,
                    "targetCompatibility": self.java_version,
                    "jvmTarget": self.java_version,
                    "coreLibraryDesugaringEnabled": true,
                    "coreLibraryDesugaring": self.desugar_library,
                    "dexJavaMaxHeapSize": self.dex_java_max_heap_size,
                    "preDexLibraries": true
                },
                "manifest_placeholders": {
                    "GOOGLE_MAPS_API_KEY": format!("${{{}}}", self.maps_api_key_override)
                },
                "excludes": DEFAULT_EXCLUDES
            },
            "variants": {
                "debug": {
                    "attributes": {
                        "minifyEnabled": false,
                        "debuggable": true
                    }
                },
                "release": {
                    "proguard_files": RELEASE_PROGUARD_FILES,
                    "attributes": {
                        "minifyEnabled": true,
                        "shrinkResources": true,
                        "signingConfig": self.release_signing_config,
                        "debuggable": false,
                        "jniDebuggable": false,
                        "renderscriptDebuggable": false,
                        "pseudoLocalesEnabled": false
                    }
                }
            },
            "overrides": {
                self.maps_api_key_override.clone(): {
                    "required": true,
                    "secret": true
                },
                "flutter.versionName": {
                    "attribute": "versionName"
                },
                "flutter.versionCode": {
                    "attribute": "versionCode"
                }
            }
        })
    }
}
