//! Module format detection for config files.

use std::fmt;
use std::path::Path;

use crate::package::PackageResolver;

/// Module system a config file is evaluated under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModuleFormat {
    Esm,
    Cjs,
}

impl ModuleFormat {
    pub fn as_str(self) -> &'static str {
        match self {
            ModuleFormat::Esm => "esm",
            ModuleFormat::Cjs => "cjs",
        }
    }
}

impl fmt::Display for ModuleFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Format implied by the extension alone, if it is unambiguous.
pub fn format_from_extension(path: &Path) -> Option<ModuleFormat> {
    match path.extension().and_then(|ext| ext.to_str()) {
        Some("mjs") | Some("mts") => Some(ModuleFormat::Esm),
        Some("cjs") | Some("cts") => Some(ModuleFormat::Cjs),
        _ => None,
    }
}

/// Decide how `path` should be evaluated.
///
/// The extension wins when it is unambiguous; otherwise the nearest
/// manifest's `type` field decides, defaulting to CommonJS.
pub fn detect_format(path: &Path, packages: &PackageResolver) -> ModuleFormat {
    if let Some(format) = format_from_extension(path) {
        return format;
    }

    match packages.nearest(path) {
        Some(meta) if meta.is_module() => {
            tracing::debug!(
                "{} declares \"type\": \"module\"",
                meta.manifest_path().display()
            );
            ModuleFormat::Esm
        }
        _ => ModuleFormat::Cjs,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn extension_decides_when_unambiguous() {
        assert_eq!(
            format_from_extension(Path::new("windpack.config.mjs")),
            Some(ModuleFormat::Esm)
        );
        assert_eq!(
            format_from_extension(Path::new("windpack.config.mts")),
            Some(ModuleFormat::Esm)
        );
        assert_eq!(
            format_from_extension(Path::new("windpack.config.cjs")),
            Some(ModuleFormat::Cjs)
        );
        assert_eq!(
            format_from_extension(Path::new("windpack.config.cts")),
            Some(ModuleFormat::Cjs)
        );
        assert_eq!(format_from_extension(Path::new("windpack.config.ts")), None);
        assert_eq!(format_from_extension(Path::new("windpack.config.js")), None);
    }

    #[test]
    fn ambiguous_extension_defaults_to_cjs_without_type_field() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("windpack.config.ts");
        fs::write(&file, "").unwrap();
        fs::write(dir.path().join("package.json"), r#"{"name":"x"}"#).unwrap();
        assert_eq!(detect_format(&file, &PackageResolver::new()), ModuleFormat::Cjs);
    }
}
