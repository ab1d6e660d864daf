//! Recursive configuration merge.
//!
//! `merge(defaults, overrides)` walks every key of `overrides`:
//!
//! 1. a null override keeps the defaults value,
//! 2. a missing (or null) defaults value takes the override verbatim,
//! 3. if either side is an array the result is `defaults ++ overrides`, with
//!    scalars promoted to one-element arrays,
//! 4. two plain objects merge recursively,
//! 5. anything else is overwritten by the override.
//!
//! List-shaped entries (plugin arrays, loader rules) are therefore additive
//! across layers. The merge is not commutative: later layers win for scalars
//! and append for arrays.

use serde_json::{Map, Value};
use thiserror::Error;

use crate::value::{ValueKind, is_callable};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MergeError {
    /// A callable was supplied where configuration data was expected.
    #[error("cannot merge config in form of callback at {}", display_path(.path))]
    Callable { path: String },

    /// Only objects can be merged at the top level.
    #[error("cannot merge {found} into config at {}", display_path(.path))]
    NotAnObject { path: String, found: &'static str },
}

fn display_path(path: &str) -> &str {
    if path.is_empty() { "<root>" } else { path }
}

/// Merge `overrides` on top of `defaults`, returning a new value.
///
/// # Example
///
/// ```
/// use serde_json::json;
/// use windpack_config::merge;
///
/// let merged = merge(
///     &json!({ "server": { "port": 3000 }, "plugins": ["a"] }),
///     &json!({ "server": { "port": 3001 }, "plugins": ["b"] }),
/// )
/// .unwrap();
///
/// assert_eq!(merged, json!({ "server": { "port": 3001 }, "plugins": ["a", "b"] }));
/// ```
pub fn merge(defaults: &Value, overrides: &Value) -> Result<Value, MergeError> {
    if is_callable(defaults) || is_callable(overrides) {
        return Err(MergeError::Callable {
            path: String::new(),
        });
    }

    let defaults = as_root_object(defaults)?;
    let overrides = as_root_object(overrides)?;

    Ok(Value::Object(merge_objects(defaults, &overrides, "")?))
}

/// Left-fold `layers` onto `base`.
pub fn merge_all<'a, I>(base: &Value, layers: I) -> Result<Value, MergeError>
where
    I: IntoIterator<Item = &'a Value>,
{
    layers
        .into_iter()
        .try_fold(base.clone(), |acc, layer| merge(&acc, layer))
}

fn as_root_object(value: &Value) -> Result<Map<String, Value>, MergeError> {
    match value {
        Value::Null => Ok(Map::new()),
        Value::Object(map) if ValueKind::of(value) == ValueKind::Object => Ok(map.clone()),
        other => Err(MergeError::NotAnObject {
            path: String::new(),
            found: ValueKind::of(other).describe(),
        }),
    }
}

fn merge_objects(
    defaults: Map<String, Value>,
    overrides: &Map<String, Value>,
    root_path: &str,
) -> Result<Map<String, Value>, MergeError> {
    let mut merged = defaults;

    for (key, value) in overrides {
        if value.is_null() {
            continue;
        }

        let path = if root_path.is_empty() {
            key.clone()
        } else {
            format!("{root_path}.{key}")
        };

        let existing = match merged.get(key) {
            Some(existing) if !existing.is_null() => existing,
            _ => {
                merged.insert(key.clone(), value.clone());
                continue;
            }
        };

        let combined = match (ValueKind::of(existing), ValueKind::of(value)) {
            (ValueKind::Array, _) | (_, ValueKind::Array) => {
                let mut items = arraify(existing);
                items.extend(arraify(value));
                Value::Array(items)
            }
            (ValueKind::Object, ValueKind::Object) => {
                let (Value::Object(existing), Value::Object(value)) = (existing, value) else {
                    unreachable!("ValueKind::Object is always a JSON object");
                };
                Value::Object(merge_objects(existing.clone(), value, &path)?)
            }
            (ValueKind::Object, ValueKind::Function) => {
                return Err(MergeError::Callable { path });
            }
            _ => value.clone(),
        };

        merged.insert(key.clone(), combined);
    }

    Ok(merged)
}

fn arraify(value: &Value) -> Vec<Value> {
    match value {
        Value::Array(items) => items.clone(),
        other => vec![other.clone()],
    }
}
