//! JavaScript values that have no JSON representation.
//!
//! Config objects cross the runtime boundary as JSON. Values JSON cannot carry
//! travel as small tagged objects:
//!
//! - `{"$fn": 3, "name": "config"}` for a callable kept alive by the runtime,
//! - `{"$regexp": {"source": "node_modules", "flags": ""}}` for a RegExp,
//! - `{"$ref": 7, "class": "ReactRefreshPlugin"}` for any other non-plain
//!   object (class instances, promises, maps).
//!
//! The pipeline never looks inside handles; it only needs to tell them apart
//! from plain objects.

use serde_json::{Map, Value, json};

pub const FN_TAG: &str = "$fn";
pub const REF_TAG: &str = "$ref";
pub const REGEXP_TAG: &str = "$regexp";

/// Handle to a callable living in the runtime that produced the config.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FunctionHandle(pub u64);

impl FunctionHandle {
    /// Encode as a tagged value the runtime can decode back to the function.
    pub fn to_value(self) -> Value {
        let mut map = Map::new();
        map.insert(FN_TAG.to_string(), Value::from(self.0));
        Value::Object(map)
    }
}

/// What kind of JavaScript value a JSON value stands for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    Null,
    Bool,
    Number,
    String,
    Array,
    /// A plain object: the only kind the merge recurses into.
    Object,
    Function,
    RegExp,
    /// Opaque non-plain object.
    Reference,
}

impl ValueKind {
    pub fn of(value: &Value) -> Self {
        match value {
            Value::Null => ValueKind::Null,
            Value::Bool(_) => ValueKind::Bool,
            Value::Number(_) => ValueKind::Number,
            Value::String(_) => ValueKind::String,
            Value::Array(_) => ValueKind::Array,
            Value::Object(map) => classify_object(map),
        }
    }

    /// Name used in user-facing messages, mirroring JavaScript's vocabulary.
    pub fn describe(self) -> &'static str {
        match self {
            ValueKind::Null => "null",
            ValueKind::Bool => "boolean",
            ValueKind::Number => "number",
            ValueKind::String => "string",
            ValueKind::Array => "array",
            ValueKind::Object => "object",
            ValueKind::Function => "function",
            ValueKind::RegExp => "RegExp",
            ValueKind::Reference => "class instance",
        }
    }
}

fn classify_object(map: &Map<String, Value>) -> ValueKind {
    if map.get(FN_TAG).is_some_and(Value::is_u64) {
        ValueKind::Function
    } else if map.get(REF_TAG).is_some_and(Value::is_u64) {
        ValueKind::Reference
    } else if map.get(REGEXP_TAG).is_some_and(Value::is_object) && map.len() == 1 {
        ValueKind::RegExp
    } else {
        ValueKind::Object
    }
}

pub fn is_callable(value: &Value) -> bool {
    ValueKind::of(value) == ValueKind::Function
}

pub fn is_plain_object(value: &Value) -> bool {
    ValueKind::of(value) == ValueKind::Object
}

/// Function handle carried by a tagged value.
pub fn function_handle(value: &Value) -> Option<FunctionHandle> {
    if !is_callable(value) {
        return None;
    }
    value.get(FN_TAG).and_then(Value::as_u64).map(FunctionHandle)
}

/// Class name of an opaque reference, when the runtime reported one.
pub fn reference_class(value: &Value) -> Option<&str> {
    if ValueKind::of(value) != ValueKind::Reference {
        return None;
    }
    value.get("class").and_then(Value::as_str)
}

pub fn is_promise(value: &Value) -> bool {
    reference_class(value) == Some("Promise")
}

/// Build a tagged RegExp value.
pub fn regexp(source: &str, flags: &str) -> Value {
    let mut map = Map::new();
    map.insert(
        REGEXP_TAG.to_string(),
        json!({ "source": source, "flags": flags }),
    );
    Value::Object(map)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_tagged_values() {
        assert_eq!(ValueKind::of(&json!({"$fn": 1})), ValueKind::Function);
        assert_eq!(
            ValueKind::of(&json!({"$fn": 1, "name": "config"})),
            ValueKind::Function
        );
        assert_eq!(
            ValueKind::of(&json!({"$ref": 2, "class": "Plugin"})),
            ValueKind::Reference
        );
        assert_eq!(ValueKind::of(&regexp("a", "g")), ValueKind::RegExp);
    }

    #[test]
    fn plain_objects_with_tag_like_keys_stay_plain() {
        // A user object that happens to use "$fn" as a string key
        assert_eq!(ValueKind::of(&json!({"$fn": "yes"})), ValueKind::Object);
        assert_eq!(
            ValueKind::of(&json!({"$regexp": {"source": "a"}, "other": 1})),
            ValueKind::Object
        );
    }

    #[test]
    fn function_handle_round_trips() {
        let handle = FunctionHandle(42);
        assert_eq!(function_handle(&handle.to_value()), Some(handle));
        assert_eq!(function_handle(&json!({"name": "x"})), None);
    }

    #[test]
    fn promise_detection_uses_class_name() {
        assert!(is_promise(&json!({"$ref": 1, "class": "Promise"})));
        assert!(!is_promise(&json!({"$ref": 1, "class": "Map"})));
    }
}
