//! Configuration resolution for windpack.
//!
//! A project describes its build in an executable config module
//! (`windpack.config.ts` and friends). This crate finds that module, compiles
//! it with its third-party imports left external, evaluates it once, folds in
//! every plugin's contribution, and validates the result against the schema.
//!
//! ```no_run
//! use std::sync::Arc;
//! use windpack_config::{NodeHost, ResolveOptions, RolldownCompiler, resolve_config};
//!
//! # async fn run() -> windpack_config::Result<()> {
//! let options = ResolveOptions::new(".");
//! if let Some(resolved) = resolve_config(&options, &RolldownCompiler, Arc::new(NodeHost::new())).await? {
//!     println!("{}", resolved.config.config().dev_server_url());
//! }
//! # Ok(())
//! # }
//! ```

pub mod compile;
pub mod discovery;
pub mod error;
pub mod format;
pub mod loader;
pub mod merge;
pub mod package;
pub mod pipeline;
pub mod plugin;
pub mod schema;
pub mod value;

pub use compile::{CompiledConfigModule, ConfigCompiler, ExternalImport, RolldownCompiler};
pub use discovery::{CONFIG_BASENAME, CONFIG_EXTENSIONS, ConfigCandidate, ConfigLocator};
pub use error::{ConfigError, Result};
pub use format::{ModuleFormat, detect_format, format_from_extension};
pub use loader::{EphemeralLoader, LoadedConfig, ModuleHost, ModuleIdentity, NodeHost};
pub use merge::{MergeError, merge, merge_all};
pub use package::{PackageMetadata, PackageResolver, PackageType};
pub use pipeline::{ResolveOptions, ResolvedConfig, resolve_config};
pub use plugin::{ConfigEnv, Plugin, ScriptPlugin, compose, resolve_mode, script_plugins};
pub use schema::{
    AppType, FieldError, Mode, Pattern, Schema, ValidatedConfig, ValidationErrors, WindpackConfig,
    validate,
};
pub use value::{FunctionHandle, ValueKind};
