//! Rolldown plugin that keeps third-party imports out of the compiled config.
//!
//! Local files are inlined by Rolldown. Every bare specifier is resolved from
//! the importing file with Node's resolution rules and emitted as an external
//! import of the resolved absolute location, so the config runs against the
//! same copies of its dependencies the project has installed.

use std::borrow::Cow;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use oxc_resolver::{ResolveError, ResolveOptions, Resolver};
use parking_lot::Mutex;
use rolldown_common::{ImportKind, ResolvedExternal};
use rolldown_plugin::{
    HookResolveIdArgs, HookResolveIdOutput, HookResolveIdReturn, HookUsage, Plugin, PluginContext,
};
use url::Url;

use crate::format::ModuleFormat;
use crate::package::PackageMetadata;

const URL_SCHEMES: &[&str] = &["node:", "data:", "file:", "http:", "https:"];
const RESOLVE_EXTENSIONS: &[&str] = &[".js", ".mjs", ".cjs", ".json", ".node"];

/// A bare import rewritten to an absolute external reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExternalImport {
    pub specifier: String,
    /// `file://` URL for ES modules, plain path for CommonJS, or the
    /// specifier itself for builtins and URLs.
    pub resolved: String,
    pub importer: PathBuf,
}

/// A bare import that could not be resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnresolvedImport {
    pub specifier: String,
    pub importer: PathBuf,
    pub reason: String,
}

#[derive(Debug, Default)]
pub(crate) struct ExternalizeState {
    pub(crate) externals: Vec<ExternalImport>,
    pub(crate) failure: Option<UnresolvedImport>,
}

pub(crate) struct ExternalizeDepsPlugin {
    format: ModuleFormat,
    import_resolver: Arc<Resolver>,
    require_resolver: Arc<Resolver>,
    manifest: Option<Arc<PackageMetadata>>,
    state: Arc<Mutex<ExternalizeState>>,
}

impl fmt::Debug for ExternalizeDepsPlugin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExternalizeDepsPlugin")
            .field("format", &self.format)
            .field("manifest", &self.manifest.as_ref().map(|m| m.manifest_path()))
            .finish_non_exhaustive()
    }
}

fn node_resolver(conditions: &[&str]) -> Resolver {
    Resolver::new(ResolveOptions {
        condition_names: conditions.iter().map(|c| c.to_string()).collect(),
        extensions: RESOLVE_EXTENSIONS.iter().map(|e| e.to_string()).collect(),
        builtin_modules: true,
        ..Default::default()
    })
}

impl ExternalizeDepsPlugin {
    pub(crate) fn new(
        format: ModuleFormat,
        manifest: Option<Arc<PackageMetadata>>,
        state: Arc<Mutex<ExternalizeState>>,
    ) -> Self {
        Self {
            format,
            import_resolver: Arc::new(node_resolver(&["node", "import", "default"])),
            require_resolver: Arc::new(node_resolver(&["node", "require", "default"])),
            manifest,
            state,
        }
    }
}

impl Plugin for ExternalizeDepsPlugin {
    fn name(&self) -> Cow<'static, str> {
        "windpack:externalize-deps".into()
    }

    fn register_hook_usage(&self) -> HookUsage {
        HookUsage::ResolveId
    }

    fn resolve_id(
        &self,
        _ctx: &PluginContext,
        args: &HookResolveIdArgs<'_>,
    ) -> impl std::future::Future<Output = HookResolveIdReturn> + Send {
        let specifier = args.specifier.to_string();
        let importer = args.importer.map(PathBuf::from);
        let is_entry = args.is_entry;
        let is_require = matches!(args.kind, ImportKind::Require);
        let format = self.format;
        let resolver = if is_require || format == ModuleFormat::Cjs {
            Arc::clone(&self.require_resolver)
        } else {
            Arc::clone(&self.import_resolver)
        };
        let manifest = self.manifest.clone();
        let state = Arc::clone(&self.state);

        async move {
            let Some(importer) = importer else {
                return Ok(None);
            };
            if is_entry || is_local(&specifier) {
                return Ok(None);
            }

            if is_url_like(&specifier) {
                return Ok(Some(external(&state, &specifier, specifier.clone(), &importer)));
            }

            let dir = importer.parent().unwrap_or_else(|| Path::new("."));
            let resolved = match resolver.resolve(dir, &specifier) {
                Ok(resolution) => {
                    let path = resolution.path();
                    if format == ModuleFormat::Esm && !is_require {
                        file_url(path)
                    } else {
                        path.to_string_lossy().into_owned()
                    }
                }
                Err(ResolveError::Builtin { resolved, .. }) => {
                    return Ok(Some(external(&state, &specifier, resolved, &importer)));
                }
                Err(err) => {
                    let reason = err.to_string();
                    tracing::debug!(
                        "failed to resolve {} from {}: {}",
                        specifier,
                        importer.display(),
                        reason
                    );
                    {
                        let mut state = state.lock();
                        if state.failure.is_none() {
                            state.failure = Some(UnresolvedImport {
                                specifier: specifier.clone(),
                                importer: importer.clone(),
                                reason: reason.clone(),
                            });
                        }
                    }
                    anyhow::bail!(
                        "could not resolve \"{}\" from {}: {}",
                        specifier,
                        importer.display(),
                        reason
                    );
                }
            };

            if let (Some(manifest), Some(package)) = (&manifest, package_name(&specifier)) {
                if !manifest.declares(package) {
                    tracing::warn!(
                        "\"{}\" is imported by {} but not declared in {}",
                        package,
                        importer.display(),
                        manifest.manifest_path().display()
                    );
                }
            }

            Ok(Some(external(&state, &specifier, resolved, &importer)))
        }
    }
}

fn external(
    state: &Mutex<ExternalizeState>,
    specifier: &str,
    resolved: String,
    importer: &Path,
) -> HookResolveIdOutput {
    tracing::trace!("externalizing {} as {}", specifier, resolved);
    state.lock().externals.push(ExternalImport {
        specifier: specifier.to_string(),
        resolved: resolved.clone(),
        importer: importer.to_path_buf(),
    });

    HookResolveIdOutput {
        id: resolved.into(),
        external: Some(ResolvedExternal::Bool(true)),
        ..Default::default()
    }
}

/// Relative or absolute file specifiers, which are inlined.
fn is_local(specifier: &str) -> bool {
    specifier.starts_with('.') || Path::new(specifier).is_absolute()
}

fn is_url_like(specifier: &str) -> bool {
    URL_SCHEMES.iter().any(|scheme| specifier.starts_with(scheme))
}

/// Package name of a bare specifier: `@scope/name/sub` gives `@scope/name`.
pub fn package_name(specifier: &str) -> Option<&str> {
    if specifier.is_empty() || is_local(specifier) || is_url_like(specifier) {
        return None;
    }

    let mut slashes = specifier.match_indices('/').map(|(i, _)| i);
    let end = if specifier.starts_with('@') {
        slashes.nth(1)
    } else {
        slashes.next()
    };

    Some(end.map_or(specifier, |i| &specifier[..i]))
}

/// `file://` URL for an absolute path.
///
/// Relative paths cannot be expressed as file URLs and are returned with the
/// scheme prepended as is.
pub fn file_url(path: &Path) -> String {
    match Url::from_file_path(path) {
        Ok(url) => url.into(),
        Err(()) => format!("file://{}", path.display()),
    }
}
