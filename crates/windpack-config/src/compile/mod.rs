//! Compiling a config file into one executable module.
//!
//! The pipeline only depends on [`ConfigCompiler`]; [`RolldownCompiler`] is the
//! implementation used by default. It bundles the config entry together with
//! every local file it imports, transpiles TypeScript, and leaves third-party
//! packages as external imports of their resolved absolute locations.

mod externalize;

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use rolldown::{
    BundlerBuilder as RolldownBundlerBuilder, BundlerOptions, InputItem, OutputFormat, Platform,
    SourceMapType,
};
use rolldown_plugin::__inner::SharedPluginable;

use crate::discovery::ConfigCandidate;
use crate::error::{ConfigError, Result};
use crate::format::ModuleFormat;
use crate::package::PackageResolver;

pub use externalize::{ExternalImport, UnresolvedImport, file_url, package_name};
use externalize::{ExternalizeDepsPlugin, ExternalizeState};

/// A config file compiled into a single module, ready to be loaded once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledConfigModule {
    /// The user's original config file.
    pub source: PathBuf,
    /// Compiled code, with an inline source map pointing back at `source`.
    pub code: String,
    pub format: ModuleFormat,
    /// Bare imports that were left external, in the order they were seen.
    pub externals: Vec<ExternalImport>,
    /// Local files inlined into `code`, the config file included.
    pub inputs: Vec<PathBuf>,
}

impl CompiledConfigModule {
    pub fn new(source: impl Into<PathBuf>, code: impl Into<String>, format: ModuleFormat) -> Self {
        Self {
            source: source.into(),
            code: code.into(),
            format,
            externals: Vec::new(),
            inputs: Vec::new(),
        }
    }
}

/// Turns a located config file into an executable module.
#[async_trait]
pub trait ConfigCompiler: Send + Sync {
    async fn compile(&self, candidate: &ConfigCandidate) -> Result<CompiledConfigModule>;
}

#[async_trait]
impl<T: ConfigCompiler + ?Sized> ConfigCompiler for Arc<T> {
    async fn compile(&self, candidate: &ConfigCandidate) -> Result<CompiledConfigModule> {
        (**self).compile(candidate).await
    }
}

/// [`ConfigCompiler`] backed by the Rolldown bundler.
#[derive(Debug, Clone, Copy, Default)]
pub struct RolldownCompiler;

impl RolldownCompiler {
    pub fn new() -> Self {
        Self
    }

    fn options(candidate: &ConfigCandidate) -> BundlerOptions {
        let format = match candidate.format {
            ModuleFormat::Esm => OutputFormat::Esm,
            ModuleFormat::Cjs => OutputFormat::Cjs,
        };

        BundlerOptions {
            input: Some(vec![InputItem {
                name: Some("windpack.config".to_string()),
                import: candidate.path.to_string_lossy().into_owned(),
            }]),
            cwd: Some(candidate.dir().to_path_buf()),
            format: Some(format),
            platform: Some(Platform::Node),
            sourcemap: Some(SourceMapType::Inline),
            inline_dynamic_imports: Some(true),
            ..Default::default()
        }
    }
}

#[async_trait]
impl ConfigCompiler for RolldownCompiler {
    async fn compile(&self, candidate: &ConfigCandidate) -> Result<CompiledConfigModule> {
        tracing::debug!("compiling {}", candidate.path.display());

        let manifest = PackageResolver::new().nearest(&candidate.path);
        let state = Arc::new(Mutex::new(ExternalizeState::default()));
        let plugin = ExternalizeDepsPlugin::new(candidate.format, manifest, Arc::clone(&state));

        let mut bundler = RolldownBundlerBuilder::default()
            .with_options(Self::options(candidate))
            .with_plugins(vec![Arc::new(plugin) as SharedPluginable])
            .build()
            .map_err(|e| ConfigError::Compile(format!("{:?}", e)))?;

        let generated = bundler.generate().await;

        // A recorded resolution failure takes precedence over the build error
        let mut state = std::mem::take(&mut *state.lock());
        if let Some(unresolved) = state.failure.take() {
            return Err(ConfigError::Resolution {
                specifier: unresolved.specifier,
                importer: unresolved.importer,
            });
        }

        let bundle = generated.map_err(|e| ConfigError::Compile(format!("{:?}", e)))?;

        let (code, inputs) = bundle
            .assets
            .iter()
            .find_map(|asset| match asset {
                rolldown_common::Output::Chunk(chunk) if chunk.is_entry => {
                    let inputs = chunk
                        .modules
                        .keys
                        .iter()
                        .map(|id| PathBuf::from(id.to_string()))
                        .filter(|path| path.is_absolute())
                        .collect::<Vec<_>>();
                    Some((chunk.code.clone(), inputs))
                }
                _ => None,
            })
            .ok_or_else(|| {
                ConfigError::Compile(format!(
                    "no output chunk generated for {}",
                    candidate.path.display()
                ))
            })?;

        tracing::debug!(
            "compiled {} ({} bytes, {} local files, {} external imports)",
            candidate.path.display(),
            code.len(),
            inputs.len(),
            state.externals.len()
        );

        Ok(CompiledConfigModule {
            source: candidate.path.clone(),
            code,
            format: candidate.format,
            externals: state.externals,
            inputs,
        })
    }
}
