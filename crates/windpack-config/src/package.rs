//! Nearest `package.json` lookup.
//!
//! The resolver walks from a file toward the filesystem root and stops at the
//! first manifest it finds. A manifest that cannot be read or parsed is treated
//! as absent, so callers fall back to their defaults instead of failing.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use serde::Deserialize;

/// Name of the manifest file looked up in every ancestor directory.
pub const MANIFEST_FILE: &str = "package.json";

/// Module system declared by a manifest's `type` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PackageType {
    Module,
    #[default]
    CommonJs,
}

#[derive(Debug, Default, Deserialize)]
struct RawManifest {
    name: Option<String>,
    version: Option<String>,
    #[serde(rename = "type")]
    module_type: Option<serde_json::Value>,
    #[serde(default)]
    dependencies: HashMap<String, String>,
    #[serde(default, rename = "devDependencies")]
    dev_dependencies: HashMap<String, String>,
    #[serde(default, rename = "peerDependencies")]
    peer_dependencies: HashMap<String, String>,
}

/// Parsed manifest plus the directory it was found in.
#[derive(Debug, Clone)]
pub struct PackageMetadata {
    pub dir: PathBuf,
    pub name: Option<String>,
    pub version: Option<String>,
    pub module_type: PackageType,
    pub dependencies: HashMap<String, String>,
    pub dev_dependencies: HashMap<String, String>,
    pub peer_dependencies: HashMap<String, String>,
}

impl PackageMetadata {
    /// Parse manifest text. Returns `None` for anything that is not a JSON object.
    pub fn parse(dir: impl Into<PathBuf>, content: &str) -> Option<Self> {
        let raw: RawManifest = serde_json::from_str(content).ok()?;
        // `"type"` only means ESM when it is exactly "module"
        let module_type = match raw.module_type.as_ref().and_then(|v| v.as_str()) {
            Some("module") => PackageType::Module,
            _ => PackageType::CommonJs,
        };

        Some(Self {
            dir: dir.into(),
            name: raw.name,
            version: raw.version,
            module_type,
            dependencies: raw.dependencies,
            dev_dependencies: raw.dev_dependencies,
            peer_dependencies: raw.peer_dependencies,
        })
    }

    /// Path of the manifest file this metadata was read from.
    pub fn manifest_path(&self) -> PathBuf {
        self.dir.join(MANIFEST_FILE)
    }

    pub fn is_module(&self) -> bool {
        self.module_type == PackageType::Module
    }

    /// Whether `package` is declared in any dependency map.
    pub fn declares(&self, package: &str) -> bool {
        self.dependencies.contains_key(package)
            || self.dev_dependencies.contains_key(package)
            || self.peer_dependencies.contains_key(package)
    }
}

/// Finds the nearest manifest for a path, caching results per directory.
///
/// One resolver is meant to live for one pipeline run; a fresh run creates a
/// fresh resolver so edits to `package.json` are always observed.
#[derive(Debug, Default)]
pub struct PackageResolver {
    cache: Mutex<FxHashMap<PathBuf, Option<Arc<PackageMetadata>>>>,
}

impl PackageResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Nearest manifest for `path` (a file or a directory).
    pub fn nearest(&self, path: &Path) -> Option<Arc<PackageMetadata>> {
        let start = if path.is_dir() {
            path.to_path_buf()
        } else {
            path.parent()?.to_path_buf()
        };

        if let Some(hit) = self.cache.lock().get(&start) {
            return hit.clone();
        }

        let found = find_nearest(&start);
        self.cache.lock().insert(start, found.clone());
        found
    }

    /// Number of directories resolved so far.
    pub fn cached_lookups(&self) -> usize {
        self.cache.lock().len()
    }
}

fn find_nearest(start: &Path) -> Option<Arc<PackageMetadata>> {
    let mut current = Some(start);

    while let Some(dir) = current {
        let manifest = dir.join(MANIFEST_FILE);
        if manifest.is_file() {
            return read_manifest(dir, &manifest).map(Arc::new);
        }
        current = dir.parent();
    }

    tracing::trace!("no {} above {}", MANIFEST_FILE, start.display());
    None
}

fn read_manifest(dir: &Path, manifest: &Path) -> Option<PackageMetadata> {
    let content = match fs::read_to_string(manifest) {
        Ok(content) => content,
        Err(err) => {
            tracing::warn!("ignoring unreadable {}: {}", manifest.display(), err);
            return None;
        }
    };

    let metadata = PackageMetadata::parse(dir, &content);
    if metadata.is_none() {
        tracing::warn!("ignoring malformed {}", manifest.display());
    }
    metadata
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn parse_reads_module_type() {
        let meta = PackageMetadata::parse("/app", r#"{"name":"app","type":"module"}"#).unwrap();
        assert!(meta.is_module());
        assert_eq!(meta.name.as_deref(), Some("app"));
    }

    #[test]
    fn parse_treats_other_types_as_commonjs() {
        let meta = PackageMetadata::parse("/app", r#"{"type":"commonjs"}"#).unwrap();
        assert_eq!(meta.module_type, PackageType::CommonJs);

        let meta = PackageMetadata::parse("/app", r#"{"type":42}"#).unwrap();
        assert_eq!(meta.module_type, PackageType::CommonJs);
    }

    #[test]
    fn parse_rejects_malformed_json() {
        assert!(PackageMetadata::parse("/app", "{ not json").is_none());
        assert!(PackageMetadata::parse("/app", "[1, 2]").is_none());
    }

    #[test]
    fn declares_checks_every_dependency_map() {
        let meta = PackageMetadata::parse(
            "/app",
            r#"{
                "dependencies": {"react": "^18"},
                "devDependencies": {"typescript": "^5"},
                "peerDependencies": {"webpack": "^5"}
            }"#,
        )
        .unwrap();

        assert!(meta.declares("react"));
        assert!(meta.declares("typescript"));
        assert!(meta.declares("webpack"));
        assert!(!meta.declares("lodash"));
    }

    #[test]
    fn nearest_walks_up_from_nested_file() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join(MANIFEST_FILE), r#"{"name":"root"}"#).unwrap();
        let nested = dir.path().join("a/b");
        fs::create_dir_all(&nested).unwrap();
        let file = nested.join("file.ts");
        fs::write(&file, "").unwrap();

        let resolver = PackageResolver::new();
        let meta = resolver.nearest(&file).unwrap();
        assert_eq!(meta.name.as_deref(), Some("root"));
        assert_eq!(meta.dir, dir.path());
    }

    #[test]
    fn nearest_stops_at_first_manifest_even_if_malformed() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join(MANIFEST_FILE), r#"{"type":"module"}"#).unwrap();
        let nested = dir.path().join("pkg");
        fs::create_dir_all(&nested).unwrap();
        fs::write(nested.join(MANIFEST_FILE), "{ broken").unwrap();

        let resolver = PackageResolver::new();
        assert!(resolver.nearest(&nested.join("windpack.config.js")).is_none());
    }

    #[test]
    fn nearest_caches_per_directory() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join(MANIFEST_FILE), r#"{"name":"cached"}"#).unwrap();
        let file = dir.path().join("windpack.config.js");

        let resolver = PackageResolver::new();
        let first = resolver.nearest(&file).unwrap();
        // A later edit is not observed by the same resolver
        fs::write(dir.path().join(MANIFEST_FILE), r#"{"name":"edited"}"#).unwrap();
        let second = resolver.nearest(&file).unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(resolver.cached_lookups(), 1);
        assert_eq!(
            PackageResolver::new().nearest(&file).unwrap().name.as_deref(),
            Some("edited")
        );
    }
}
