//! Config file discovery.
//!
//! Looks for `windpack.config.<ext>` in the project root, trying a fixed list
//! of extensions in priority order. The first existing file wins, even when
//! several candidates are present.

use std::path::{Path, PathBuf};

use crate::error::{ConfigError, Result};
use crate::format::{ModuleFormat, detect_format};
use crate::package::PackageResolver;

/// Base name every config file shares.
pub const CONFIG_BASENAME: &str = "windpack.config";

/// Extensions tried in order.
pub const CONFIG_EXTENSIONS: &[&str] = &[".ts", ".js", ".mts", ".mjs", ".cts", ".cjs"];

/// The config file selected for one pipeline run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigCandidate {
    pub path: PathBuf,
    pub format: ModuleFormat,
}

impl ConfigCandidate {
    pub fn new(path: impl Into<PathBuf>, format: ModuleFormat) -> Self {
        Self {
            path: path.into(),
            format,
        }
    }

    /// Directory containing the config file.
    pub fn dir(&self) -> &Path {
        self.path.parent().unwrap_or_else(|| Path::new("."))
    }
}

/// Searches a project root for the user's config entry point.
///
/// # Example
///
/// ```no_run
/// use windpack_config::{ConfigLocator, PackageResolver};
///
/// let locator = ConfigLocator::new(".");
/// match locator.locate(&PackageResolver::new()) {
///     Some(candidate) => println!("{} ({})", candidate.path.display(), candidate.format),
///     None => println!("no windpack config"),
/// }
/// ```
#[derive(Debug, Clone)]
pub struct ConfigLocator {
    root: PathBuf,
    explicit: Option<PathBuf>,
}

impl ConfigLocator {
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
            explicit: None,
        }
    }

    /// Use an explicitly named config file instead of searching.
    ///
    /// Relative paths are taken relative to the root. Only
    /// [`ConfigLocator::try_locate`] honors it, and reports a missing file as
    /// [`ConfigError::NotFound`]; [`ConfigLocator::find`] and
    /// [`ConfigLocator::locate`] always search.
    pub fn explicit(mut self, path: impl AsRef<Path>) -> Self {
        self.explicit = Some(self.root.join(path));
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// First existing `windpack.config<ext>` in the root.
    pub fn find(&self) -> Option<PathBuf> {
        CONFIG_EXTENSIONS
            .iter()
            .map(|ext| self.root.join(format!("{CONFIG_BASENAME}{ext}")))
            .find(|path| path.is_file())
    }

    /// Search the root for the config file and detect its module format.
    pub fn locate(&self, packages: &PackageResolver) -> Option<ConfigCandidate> {
        let path = self.find()?;
        let format = detect_format(&path, packages);
        Some(ConfigCandidate::new(path, format))
    }

    /// The explicit file if one was given, otherwise the search result.
    pub fn try_locate(&self, packages: &PackageResolver) -> Result<Option<ConfigCandidate>> {
        let path = match &self.explicit {
            Some(path) if path.is_file() => path.clone(),
            Some(path) => return Err(ConfigError::NotFound(path.clone())),
            None => match self.find() {
                Some(path) => path,
                None => {
                    tracing::debug!("no {}.* in {}", CONFIG_BASENAME, self.root.display());
                    return Ok(None);
                }
            },
        };

        let format = detect_format(&path, packages);
        tracing::debug!("config file {} ({})", path.display(), format);
        Ok(Some(ConfigCandidate::new(path, format)))
    }
}
