use std::path::Path;

use serde_json::json;

use super::{Field, Shape};
use crate::value::regexp;

pub(super) const APP_TYPES: &[&str] = &["spa", "custom"];
pub(super) const MODES: &[&str] = &["development", "production"];

pub(super) const DEFAULT_CACHE_DIR: &str = "node_modules/.cache/windpack";
pub(super) const DEFAULT_EXTENSIONS: &[&str] = &[".mjs", ".js", ".mts", ".ts", ".jsx", ".tsx"];
pub(super) const DEFAULT_PORT: u16 = 3000;

fn pattern() -> Shape {
    Shape::Union(vec![Shape::String, Shape::RegExp])
}

pub(super) fn windpack_fields(project_root: &Path) -> Vec<Field> {
    vec![
        Field::new("plugins", Shape::Array(Box::new(Shape::Plugin))).default(json!([])),
        Field::new("appType", Shape::Enum(APP_TYPES)).default("spa"),
        Field::new("root", Shape::String).default(project_root.to_string_lossy().into_owned()),
        Field::new("base", Shape::String).default("/"),
        Field::new("mode", Shape::Enum(MODES)).default("development"),
        Field::new("cacheDir", Shape::String).default(DEFAULT_CACHE_DIR),
        Field::new("define", Shape::Record(Box::new(Shape::Any))).default(json!({})),
        Field::new("publicDir", Shape::String).default("public"),
        Field::new("clearScreen", Shape::Bool).default(true),
        Field::new(
            "resolve",
            Shape::Object(vec![
                Field::new("extensions", Shape::Array(Box::new(Shape::String)))
                    .default(json!(DEFAULT_EXTENSIONS)),
                Field::new("preserveSymlinks", Shape::Bool).default(true),
            ]),
        ),
        Field::new(
            "server",
            Shape::Object(vec![
                Field::new(
                    "port",
                    Shape::Integer {
                        min: 0,
                        max: i64::from(u16::MAX),
                    },
                )
                .default(DEFAULT_PORT),
                Field::new("base", Shape::String).default("/"),
            ]),
        ),
        Field::new("webpackConfig", Shape::Opaque).default(json!({})),
        Field::new(
            "swc",
            Shape::Object(vec![
                Field::new("include", pattern()).default(regexp(r"\.(ts|jsx|tsx)$", "")),
                Field::new("exclude", pattern()).default(regexp("node_modules", "")),
            ]),
        ),
    ]
}
