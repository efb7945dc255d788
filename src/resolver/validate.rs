//! Post-merge consistency checks

use std::collections::BTreeMap;

use crate::attribute::{
    AttributeValue, BOOLEAN_ATTRIBUTES, CORE_LIBRARY_DESUGARING, CORE_LIBRARY_DESUGARING_ENABLED,
    DEBUGGABLE, INTEGER_ATTRIBUTES, MINIFY_ENABLED, REQUIRED_ATTRIBUTES, SDK_MIN_VERSION,
    SDK_TARGET_VERSION, SHRINK_RESOURCES,
};
use crate::config::ResolvedAttribute;

/// One failed check
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
    pub attributes: Vec<String>,
    pub reason: String,
}

impl Violation {
    fn new(attributes: &[&str], reason: impl Into<String>) -> Self {
        Self {
            attributes: attributes.iter().map(|a| a.to_string()).collect(),
            reason: reason.into(),
        }
    }
}

/// Run every check and return all violations found
pub fn check(attributes: &BTreeMap<String, ResolvedAttribute>) -> Vec<Violation> {
    let get = |name: &str| attributes.get(name).map(|a| &a.value);
    let mut violations = Vec::new();

    for &name in REQUIRED_ATTRIBUTES {
        if get(name).is_none() {
            violations.push(Violation::new(&[name], format!("{} is required", name)));
        }
    }

    for &name in BOOLEAN_ATTRIBUTES {
        if let Some(value) = get(name) {
            if value.as_bool().is_none() {
                violations.push(Violation::new(
                    &[name],
                    format!("{} must be a boolean, got {}", name, value.kind()),
                ));
            }
        }
    }

    for &name in INTEGER_ATTRIBUTES {
        if let Some(value) = get(name) {
            match value {
                AttributeValue::Integer(v) if *v > 0 => {}
                other => violations.push(Violation::new(
                    &[name],
                    format!("{} must be a positive integer, got {}", name, other),
                )),
            }
        }
    }

    let flag = |name: &str| get(name).and_then(AttributeValue::as_bool);

    if flag(DEBUGGABLE) == Some(true) && flag(MINIFY_ENABLED) == Some(true) {
        violations.push(Violation::new(
            &[DEBUGGABLE, MINIFY_ENABLED],
            "a debuggable build must not be minified",
        ));
    }

    if flag(SHRINK_RESOURCES) == Some(true) && flag(MINIFY_ENABLED) != Some(true) {
        violations.push(Violation::new(
            &[SHRINK_RESOURCES, MINIFY_ENABLED],
            "resource shrinking requires minifyEnabled",
        ));
    }

    if flag(CORE_LIBRARY_DESUGARING_ENABLED) == Some(true) {
        let declared = get(CORE_LIBRARY_DESUGARING)
            .and_then(AttributeValue::as_str)
            .is_some_and(|coordinate| !coordinate.trim().is_empty());
        if !declared {
            violations.push(Violation::new(
                &[CORE_LIBRARY_DESUGARING_ENABLED, CORE_LIBRARY_DESUGARING],
                "core library desugaring requires a desugar library coordinate",
            ));
        }
    }

    if let (Some(min), Some(target)) = (
        get(SDK_MIN_VERSION).and_then(AttributeValue::as_i64),
        get(SDK_TARGET_VERSION).and_then(AttributeValue::as_i64),
    ) {
        if min > target {
            violations.push(Violation::new(
                &[SDK_MIN_VERSION, SDK_TARGET_VERSION],
                format!("sdkMinVersion {} exceeds sdkTargetVersion {}", min, target),
            ));
        }
    }

    violations
}
