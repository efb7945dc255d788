//! Descriptor layer merge
//!
//! Descriptor files are stacked (project descriptor first, local overlays
//! after) and folded into one document before deserialization. Tables such
//! as `variants.release.attributes` merge key by key; lists such as
//! `excludes` and every scalar are taken from the later layer as a whole.

use serde_json::{Map, Value};

/// Fold `layer` into `document` in place.
pub fn deep_merge(document: &mut Value, layer: Value) {
    match (document, layer) {
        (Value::Object(tables), Value::Object(incoming)) => merge_tables(tables, incoming),
        (slot, layer) => *slot = layer,
    }
}

fn merge_tables(tables: &mut Map<String, Value>, incoming: Map<String, Value>) {
    for (key, value) in incoming {
        match tables.get_mut(&key) {
            Some(existing) => deep_merge(existing, value),
            None => {
                tables.insert(key, value);
            }
        }
    }
}

/// Stack layers in order; later layers take precedence
pub fn merge_layers(layers: impl IntoIterator<Item = Value>) -> Value {
    let mut document = Value::Object(Map::new());
    for layer in layers {
        deep_merge(&mut document, layer);
    }
    document
}
