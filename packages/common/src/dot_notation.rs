//! # Dot-Notation Codec
//!
//! Converts nested partial updates to flat `a.b.c → value` maps and back.
//!
//! ## Rules
//!
//! - Arrays are opaque leaves; they are never descended into.
//! - `Undefined` leaves are dropped (absence, not deletion).
//! - Empty objects are kept as leaves ("assign an empty object").
//! - Top-level fields named in [`FlattenOptions::no_expand`] stay atomic even
//!   when they are object-shaped.
//! - On expansion, `null` deletes: the leaf is not written and every path
//!   below it is dropped, but its parent containers still exist.
//!
//! ```text
//! {a:{b:1,c:{}}, d:[1,2]}  ⇄  {"a.b":1, "a.c":{}, "d":[1,2]}
//! ```

use crate::error::CommonError;
use crate::result::CommonResult;
use crate::value::{Map, Value};
use std::collections::{BTreeMap, BTreeSet};

/// Path-keyed partial update. Ancestors always sort before their descendants.
pub type FlatMap = BTreeMap<String, Value>;

/// Controls which fields the codec treats as atomic
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FlattenOptions {
    /// Top-level field names that are never expanded
    pub no_expand: BTreeSet<String>,
}

impl FlattenOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_no_expand<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            no_expand: fields.into_iter().map(Into::into).collect(),
        }
    }

    fn is_atomic(&self, prefix: &str, key: &str) -> bool {
        prefix.is_empty() && self.no_expand.contains(key)
    }
}

/// Flatten a nested object into dot-notation paths
pub fn flatten(value: &Value) -> FlatMap {
    flatten_with(value, &FlattenOptions::default())
}

/// Flatten with explicit options. Non-object roots have no paths.
pub fn flatten_with(value: &Value, options: &FlattenOptions) -> FlatMap {
    let mut flat = FlatMap::new();
    if let Value::Object(map) = value {
        flatten_into(map, "", options, &mut flat);
    }
    flat
}

fn flatten_into(map: &Map, prefix: &str, options: &FlattenOptions, out: &mut FlatMap) {
    for (key, value) in map {
        let path = join_path(prefix, key);
        match value {
            Value::Undefined => {}
            Value::Object(child) if !child.is_empty() && !options.is_atomic(prefix, key) => {
                flatten_into(child, &path, options, out);
            }
            _ => {
                out.insert(path, value.clone());
            }
        }
    }
}

fn join_path(prefix: &str, key: &str) -> String {
    if prefix.is_empty() {
        key.to_string()
    } else {
        format!("{}.{}", prefix, key)
    }
}

/// True when `path` lies strictly below `ancestor`
pub fn is_descendant_path(path: &str, ancestor: &str) -> bool {
    path.len() > ancestor.len()
        && path.starts_with(ancestor)
        && path.as_bytes()[ancestor.len()] == b'.'
}

/// Strict ancestors of a path, shortest first (`a.b.c` → `a`, `a.b`)
pub fn ancestor_paths(path: &str) -> impl Iterator<Item = &str> {
    path.match_indices('.').map(move |(index, _)| &path[..index])
}

/// Expand a flat map back into a nested object.
///
/// With `filter_nulls`, `null` paths are excluded along with everything
/// below them; their parent containers are still materialized.
pub fn expand(flat: &FlatMap, filter_nulls: bool) -> Value {
    let nulled: Vec<&str> = if filter_nulls {
        flat.iter()
            .filter(|(_, value)| value.is_null())
            .map(|(path, _)| path.as_str())
            .collect()
    } else {
        Vec::new()
    };

    let mut root = Map::new();

    for (path, value) in flat {
        if value.is_undefined() {
            continue;
        }
        if nulled.iter().any(|n| is_descendant_path(path, n)) {
            continue;
        }

        let segments: Vec<&str> = path.split('.').collect();
        let Some((leaf, parents)) = segments.split_last() else {
            continue;
        };

        let Some(container) = materialize(&mut root, parents) else {
            // An existing non-object value sits on the way; never overwrite it
            continue;
        };

        if filter_nulls && value.is_null() {
            continue;
        }

        assign(container, leaf, value.clone());
    }

    Value::Object(root)
}

fn materialize<'a>(root: &'a mut Map, parents: &[&str]) -> Option<&'a mut Map> {
    let mut current = root;
    for segment in parents {
        let entry = current
            .entry(segment.to_string())
            .or_insert_with(Value::empty_object);
        match entry {
            Value::Object(map) => current = map,
            _ => return None,
        }
    }
    Some(current)
}

fn assign(container: &mut Map, key: &str, value: Value) {
    // An empty object never clears a container that is already there
    if value.is_empty_object() && matches!(container.get(key), Some(Value::Object(_))) {
        return;
    }
    container.insert(key.to_string(), value);
}

/// Deep merge with null-means-delete semantics
pub fn merge(base: &Value, update: &Value) -> CommonResult<Value> {
    merge_with(base, update, &FlattenOptions::default())
}

/// `expand(flatten(base) ⊔ flatten(update))`, where `update` wins key by key
/// and also replaces any non-object leaf of `base` it writes beneath.
///
/// Fails when `Undefined` would be written.
pub fn merge_with(base: &Value, update: &Value, options: &FlattenOptions) -> CommonResult<Value> {
    if let Some(path) = update.find_undefined() {
        return Err(CommonError::UndefinedValue { path });
    }

    let mut flat = flatten_with(base, options);
    let updates = flatten_with(update, options);

    for path in updates.keys() {
        for ancestor in ancestor_paths(path) {
            if flat.get(ancestor).is_some_and(|existing| !existing.is_object()) {
                flat.remove(ancestor);
            }
        }
    }
    flat.extend(updates);

    let merged = expand(&flat, true);
    if let Some(path) = merged.find_undefined() {
        return Err(CommonError::UndefinedValue { path });
    }
    Ok(merged)
}

/// Look up the value stored at a dot-notation path
pub fn lookup_path<'a>(value: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.')
        .try_fold(value, |current, segment| current.get(segment))
}
