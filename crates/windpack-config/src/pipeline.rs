//! The resolution pipeline: locate, detect, compile, load, compose, validate.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde_json::Value;

use crate::compile::{ConfigCompiler, ExternalImport};
use crate::discovery::{ConfigCandidate, ConfigLocator};
use crate::error::Result;
use crate::loader::{EphemeralLoader, ModuleHost};
use crate::merge::merge;
use crate::package::PackageResolver;
use crate::plugin::{ConfigEnv, compose, resolve_mode, script_plugins};
use crate::schema::{Mode, Schema, ValidatedConfig};

/// Inputs for one resolution.
#[derive(Debug, Clone, Default)]
pub struct ResolveOptions {
    /// Project root searched for the config file.
    pub root: PathBuf,
    /// Explicit config file, relative to `root`.
    pub config_file: Option<PathBuf>,
    /// Mode forced by the caller. Also overrides `mode` in the result.
    pub mode: Option<Mode>,
    /// Layer merged underneath the user's config before plugins run.
    pub base: Option<Value>,
}

impl ResolveOptions {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            ..Default::default()
        }
    }

    pub fn config_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.config_file = Some(path.into());
        self
    }

    pub fn mode(mut self, mode: Mode) -> Self {
        self.mode = Some(mode);
        self
    }

    pub fn base(mut self, base: Value) -> Self {
        self.base = Some(base);
        self
    }
}

/// Outcome of a successful resolution.
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub candidate: ConfigCandidate,
    pub mode: Mode,
    pub externals: Vec<ExternalImport>,
    /// Local files the config was compiled from.
    pub inputs: Vec<PathBuf>,
    pub config: ValidatedConfig,
}

fn absolute(root: &Path) -> Result<PathBuf> {
    let root = if root.is_absolute() {
        root.to_path_buf()
    } else {
        std::env::current_dir()?.join(root)
    };
    Ok(path_clean::clean(root))
}

/// Resolve the project's configuration.
///
/// Returns `Ok(None)` when the root has no config file. Every other failure
/// aborts the run; no partial configuration is returned.
pub async fn resolve_config<C>(
    options: &ResolveOptions,
    compiler: &C,
    host: Arc<dyn ModuleHost>,
) -> Result<Option<ResolvedConfig>>
where
    C: ConfigCompiler + ?Sized,
{
    let root = absolute(&options.root)?;
    let packages = PackageResolver::new();

    let mut locator = ConfigLocator::new(&root);
    if let Some(file) = &options.config_file {
        locator = locator.explicit(file);
    }
    let Some(candidate) = locator.try_locate(&packages)? else {
        return Ok(None);
    };
    tracing::debug!("config file found at {}", candidate.path.display());

    EphemeralLoader::<Arc<dyn ModuleHost>>::ensure_supported(&candidate)?;

    let compiled = compiler.compile(&candidate).await?;
    let externals = compiled.externals.clone();
    let inputs = compiled.inputs.clone();

    let loader = EphemeralLoader::new(Arc::clone(&host), &root);
    let loaded = loader.load(compiled).await?;

    let composed = compose_loaded(options, loaded.value, &host).await;
    loader.release(&loaded.identity).await;
    let (mode, composed) = composed?;

    let config = Schema::windpack(&root).validate(&composed)?;
    tracing::debug!("configuration resolved ({})", mode);

    Ok(Some(ResolvedConfig {
        candidate,
        mode,
        externals,
        inputs,
        config,
    }))
}

/// Merge the base layer under the raw export and run every plugin hook.
async fn compose_loaded(
    options: &ResolveOptions,
    raw: Value,
    host: &Arc<dyn ModuleHost>,
) -> Result<(Mode, Value)> {
    let mode = resolve_mode(options.mode, &raw);
    let initial = match &options.base {
        Some(base) => merge(base, &raw)?,
        None => raw,
    };

    let plugins = script_plugins(&initial, host);
    tracing::debug!(
        "found {} {}",
        plugins.len(),
        if plugins.len() == 1 { "plugin" } else { "plugins" }
    );

    let mut composed = compose(initial, &plugins, &ConfigEnv::new(mode)).await?;
    if let (Some(forced), Value::Object(map)) = (options.mode, &mut composed) {
        map.insert("mode".into(), Value::from(forced.as_str()));
    }
    Ok((mode, composed))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    use crate::compile::CompiledConfigModule;
    use crate::error::ConfigError;
    use crate::loader::ModuleIdentity;
    use crate::value::FunctionHandle;
    use async_trait::async_trait;

    struct PanicCompiler;

    #[async_trait]
    impl ConfigCompiler for PanicCompiler {
        async fn compile(&self, _candidate: &ConfigCandidate) -> Result<CompiledConfigModule> {
            panic!("compiler must not run");
        }
    }

    struct PanicHost;

    #[async_trait]
    impl ModuleHost for PanicHost {
        async fn evaluate(&self, _identity: &ModuleIdentity, _source: &Path) -> Result<Value> {
            panic!("host must not run");
        }

        async fn call(&self, _function: &FunctionHandle, _args: Vec<Value>) -> Result<Value> {
            panic!("host must not run");
        }
    }

    #[tokio::test]
    async fn no_config_is_a_soft_miss() {
        let dir = TempDir::new().unwrap();
        let result = resolve_config(&ResolveOptions::new(dir.path()), &PanicCompiler, Arc::new(PanicHost))
            .await
            .unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn cjs_config_is_rejected_before_compiling() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("windpack.config.js"), "module.exports = {}").unwrap();

        let err = resolve_config(&ResolveOptions::new(dir.path()), &PanicCompiler, Arc::new(PanicHost))
            .await
            .unwrap_err();
        assert!(matches!(err, ConfigError::UnsupportedFormat { .. }));
    }
}
