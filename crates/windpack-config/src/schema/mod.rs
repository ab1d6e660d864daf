//! Structural validation and default filling.
//!
//! A [`Schema`] is a declarative table of fields, each with a [`Shape`] and an
//! optional default. [`Schema::validate`] walks a candidate config against the
//! table and either returns a normalized [`ValidatedConfig`] (every field
//! present, unknown keys dropped) or every field error it found.

mod config;
mod fields;

use std::fmt;
use std::path::Path;

use serde_json::{Map, Value};
use thiserror::Error;

use crate::value::ValueKind;

pub use config::{
    AppType, Mode, Pattern, RegExpSource, ResolveSection, ServerSection, SwcSection, WindpackConfig,
};

/// Expected structure of a value.
#[derive(Debug, Clone, PartialEq)]
pub enum Shape {
    /// Anything, kept as-is.
    Any,
    Bool,
    String,
    /// Whole number within an inclusive range.
    Integer { min: i64, max: i64 },
    /// One of a fixed set of strings.
    Enum(&'static [&'static str]),
    Array(Box<Shape>),
    /// String-keyed map whose values all match the inner shape.
    Record(Box<Shape>),
    /// Known fields; unknown keys are dropped.
    Object(Vec<Field>),
    /// Any object, plain or not, kept as-is.
    Opaque,
    RegExp,
    Function,
    /// A plugin object: string `name`, optional callable `config`.
    Plugin,
    /// First matching alternative wins.
    Union(Vec<Shape>),
}

impl Shape {
    fn expected(&self) -> String {
        match self {
            Shape::Any => "any value".into(),
            Shape::Bool => "boolean".into(),
            Shape::String => "string".into(),
            Shape::Integer { .. } => "integer".into(),
            Shape::Enum(variants) => variants
                .iter()
                .map(|v| format!("'{v}'"))
                .collect::<Vec<_>>()
                .join(" | "),
            Shape::Array(_) => "array".into(),
            Shape::Record(_) | Shape::Object(_) | Shape::Opaque => "object".into(),
            Shape::RegExp => "RegExp".into(),
            Shape::Function => "function".into(),
            Shape::Plugin => "plugin".into(),
            Shape::Union(shapes) => shapes
                .iter()
                .map(Shape::expected)
                .collect::<Vec<_>>()
                .join(" | "),
        }
    }
}

/// A named entry of an object shape.
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    pub name: &'static str,
    pub shape: Shape,
    /// Used when the field is absent or null. Object shapes without a default
    /// are filled from their own fields' defaults.
    pub default: Option<Value>,
}

impl Field {
    pub fn new(name: &'static str, shape: Shape) -> Self {
        Self {
            name,
            shape,
            default: None,
        }
    }

    pub fn default(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(value.into());
        self
    }
}

/// One invalid field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    /// Dotted path, e.g. `server.port` or `plugins.0.name`.
    pub path: String,
    pub message: String,
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.path.is_empty() {
            write!(f, "<root>: {}", self.message)
        } else {
            write!(f, "{}: {}", self.path, self.message)
        }
    }
}

/// Every field error found in one validation pass.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid windpack config:{}", render_errors(.errors))]
pub struct ValidationErrors {
    pub errors: Vec<FieldError>,
}

fn render_errors(errors: &[FieldError]) -> String {
    errors.iter().map(|e| format!("\n  - {e}")).collect()
}

impl ValidationErrors {
    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &FieldError> {
        self.errors.iter()
    }
}

/// A config that passed validation.
#[derive(Debug, Clone)]
pub struct ValidatedConfig {
    value: Value,
    config: WindpackConfig,
}

impl ValidatedConfig {
    /// The normalized value, every schema field present.
    pub fn value(&self) -> &Value {
        &self.value
    }

    /// Typed view of the normalized value.
    pub fn config(&self) -> &WindpackConfig {
        &self.config
    }

    pub fn into_value(self) -> Value {
        self.value
    }
}

/// Declarative description of the accepted configuration.
#[derive(Debug, Clone)]
pub struct Schema {
    fields: Vec<Field>,
}

impl Schema {
    pub fn new(fields: Vec<Field>) -> Self {
        Self { fields }
    }

    /// The windpack configuration schema, with `root` defaulting to `project_root`.
    pub fn windpack(project_root: &Path) -> Self {
        Self::new(fields::windpack_fields(project_root))
    }

    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    /// Check `candidate` and fill in defaults, returning the normalized value.
    ///
    /// All errors are collected before returning; nothing short-circuits.
    pub fn normalize(&self, candidate: &Value) -> Result<Value, ValidationErrors> {
        let mut errors = Vec::new();
        let normalized = check_object(&self.fields, candidate, "", &mut errors);

        match normalized {
            Some(value) if errors.is_empty() => Ok(value),
            _ => Err(ValidationErrors { errors }),
        }
    }

    /// Normalize and build the typed [`WindpackConfig`] view.
    pub fn validate(&self, candidate: &Value) -> Result<ValidatedConfig, ValidationErrors> {
        let value = self.normalize(candidate)?;
        let config = serde_json::from_value(value.clone()).map_err(|err| ValidationErrors {
            errors: vec![FieldError {
                path: String::new(),
                message: err.to_string(),
            }],
        })?;

        Ok(ValidatedConfig { value, config })
    }
}

/// Validate against the windpack schema rooted at `project_root`.
pub fn validate(candidate: &Value, project_root: &Path) -> Result<ValidatedConfig, ValidationErrors> {
    Schema::windpack(project_root).validate(candidate)
}

fn join_path(parent: &str, key: &str) -> String {
    if parent.is_empty() {
        key.to_string()
    } else {
        format!("{parent}.{key}")
    }
}

fn received(value: &Value) -> &'static str {
    match value {
        Value::Number(n) if !n.is_i64() && !n.is_u64() => "float",
        other => ValueKind::of(other).describe(),
    }
}

fn mismatch(shape: &Shape, value: &Value, path: &str, errors: &mut Vec<FieldError>) -> Option<Value> {
    errors.push(FieldError {
        path: path.to_string(),
        message: format!("Expected {}, received {}", shape.expected(), received(value)),
    });
    None
}

fn check_object(
    fields: &[Field],
    value: &Value,
    path: &str,
    errors: &mut Vec<FieldError>,
) -> Option<Value> {
    let Value::Object(input) = value else {
        return mismatch(&Shape::Object(Vec::new()), value, path, errors);
    };
    if ValueKind::of(value) != ValueKind::Object {
        return mismatch(&Shape::Object(Vec::new()), value, path, errors);
    }

    for key in input.keys() {
        if !fields.iter().any(|field| field.name == key) {
            tracing::debug!("dropping unknown config key {}", join_path(path, key));
        }
    }

    let mut output = Map::new();
    let mut failed = false;

    for field in fields {
        let field_path = join_path(path, field.name);
        let provided = input.get(field.name).filter(|v| !v.is_null());

        let checked = match (provided, &field.default, &field.shape) {
            (Some(v), _, shape) => check(shape, v, &field_path, errors),
            (None, Some(default), _) => Some(default.clone()),
            (None, None, Shape::Object(nested)) => {
                check_object(nested, &Value::Object(Map::new()), &field_path, errors)
            }
            (None, None, _) => {
                errors.push(FieldError {
                    path: field_path,
                    message: "Required".into(),
                });
                None
            }
        };

        match checked {
            Some(v) => {
                output.insert(field.name.to_string(), v);
            }
            None => failed = true,
        }
    }

    (!failed).then_some(Value::Object(output))
}

fn check(shape: &Shape, value: &Value, path: &str, errors: &mut Vec<FieldError>) -> Option<Value> {
    let kind = ValueKind::of(value);

    match shape {
        Shape::Any => Some(value.clone()),
        Shape::Bool if kind == ValueKind::Bool => Some(value.clone()),
        Shape::String if kind == ValueKind::String => Some(value.clone()),
        Shape::Integer { min, max } => check_integer(*min, *max, value, path, errors),
        Shape::Enum(variants) => match value.as_str() {
            Some(s) if variants.contains(&s) => Some(value.clone()),
            Some(s) => {
                errors.push(FieldError {
                    path: path.to_string(),
                    message: format!(
                        "Invalid enum value. Expected {}, received '{s}'",
                        shape.expected()
                    ),
                });
                None
            }
            None => mismatch(shape, value, path, errors),
        },
        Shape::Array(item) => {
            let Value::Array(items) = value else {
                return mismatch(shape, value, path, errors);
            };
            let mut out = Vec::with_capacity(items.len());
            let mut failed = false;
            for (index, entry) in items.iter().enumerate() {
                match check(item, entry, &join_path(path, &index.to_string()), errors) {
                    Some(v) => out.push(v),
                    None => failed = true,
                }
            }
            (!failed).then_some(Value::Array(out))
        }
        Shape::Record(inner) => {
            let Value::Object(map) = value else {
                return mismatch(shape, value, path, errors);
            };
            if kind != ValueKind::Object {
                return mismatch(shape, value, path, errors);
            }
            let mut out = Map::new();
            let mut failed = false;
            for (key, entry) in map {
                match check(inner, entry, &join_path(path, key), errors) {
                    Some(v) => {
                        out.insert(key.clone(), v);
                    }
                    None => failed = true,
                }
            }
            (!failed).then_some(Value::Object(out))
        }
        Shape::Object(fields) => check_object(fields, value, path, errors),
        Shape::Opaque if matches!(kind, ValueKind::Object | ValueKind::Reference) => {
            Some(value.clone())
        }
        Shape::RegExp if kind == ValueKind::RegExp => Some(value.clone()),
        Shape::Function if kind == ValueKind::Function => Some(value.clone()),
        Shape::Plugin => check_plugin(value, path, errors),
        Shape::Union(alternatives) => {
            // Alternatives are tried silently; only a total miss is reported
            for alternative in alternatives {
                let mut scratch = Vec::new();
                if let Some(v) = check(alternative, value, path, &mut scratch) {
                    return Some(v);
                }
            }
            mismatch(shape, value, path, errors)
        }
        _ => mismatch(shape, value, path, errors),
    }
}

fn check_integer(
    min: i64,
    max: i64,
    value: &Value,
    path: &str,
    errors: &mut Vec<FieldError>,
) -> Option<Value> {
    let Some(n) = value.as_i64() else {
        return mismatch(&Shape::Integer { min, max }, value, path, errors);
    };

    let message = if n < min {
        format!("Number must be greater than or equal to {min}")
    } else if n > max {
        format!("Number must be less than or equal to {max}")
    } else {
        return Some(value.clone());
    };

    errors.push(FieldError {
        path: path.to_string(),
        message,
    });
    None
}

fn check_plugin(value: &Value, path: &str, errors: &mut Vec<FieldError>) -> Option<Value> {
    if ValueKind::of(value) != ValueKind::Object {
        return mismatch(&Shape::Plugin, value, path, errors);
    }

    let before = errors.len();
    match value.get("name") {
        Some(name) if name.is_string() => {}
        Some(name) => {
            mismatch(&Shape::String, name, &join_path(path, "name"), errors);
        }
        None => errors.push(FieldError {
            path: join_path(path, "name"),
            message: "Required".into(),
        }),
    }
    if let Some(hook) = value.get("config").filter(|v| !v.is_null()) {
        if ValueKind::of(hook) != ValueKind::Function {
            mismatch(&Shape::Function, hook, &join_path(path, "config"), errors);
        }
    }

    // Plugin objects are kept whole; the composition engine reads them
    (errors.len() == before).then(|| value.clone())
}
