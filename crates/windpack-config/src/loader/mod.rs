//! Loading compiled config modules.
//!
//! Every load gets a fresh [`ModuleIdentity`], so a runtime that caches modules
//! by URL still evaluates an edited (or even unchanged) config again instead of
//! returning the previous instance.

mod node;
mod protocol;

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use serde_json::Value;

use crate::compile::{CompiledConfigModule, file_url};
use crate::discovery::ConfigCandidate;
use crate::error::{ConfigError, Result};
use crate::format::ModuleFormat;
use crate::value::{FunctionHandle, ValueKind, is_promise};

pub use node::{NODE_ENV_VAR, NodeHost};

/// Directory, relative to the project root, compiled configs are written to.
pub const OUTPUT_DIR: &str = "node_modules/.windpack";

static LOAD_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Unique address of one evaluation of a compiled config.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleIdentity {
    token: String,
    file: PathBuf,
    url: String,
}

impl ModuleIdentity {
    /// New identity for a module written into `dir`.
    ///
    /// The token combines a millisecond timestamp, a process-wide counter and
    /// a random suffix, so two identities never collide within or across
    /// processes.
    pub fn new(dir: &Path) -> Self {
        let millis = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis())
            .unwrap_or_default();
        let count = LOAD_COUNTER.fetch_add(1, Ordering::Relaxed);
        let suffix = uuid::Uuid::new_v4().simple().to_string();
        let token = format!("{millis}-{count}-{}", &suffix[..8]);

        let file = dir.join(format!("config.{token}.mjs"));
        let url = format!("{}?t={token}", file_url(&file));

        Self { token, file, url }
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    /// Where the compiled code is written.
    pub fn file(&self) -> &Path {
        &self.file
    }

    /// URL the runtime imports.
    pub fn url(&self) -> &str {
        &self.url
    }
}

/// The only component that executes user code.
#[async_trait]
pub trait ModuleHost: Send + Sync {
    /// Import the module at `identity` and return its default export.
    ///
    /// `source` is the user's original file, used for error reporting. A
    /// missing default export is returned as `Value::Null`.
    async fn evaluate(&self, identity: &ModuleIdentity, source: &Path) -> Result<Value>;

    /// Call a function previously returned by [`ModuleHost::evaluate`].
    async fn call(&self, function: &FunctionHandle, args: Vec<Value>) -> Result<Value>;

    /// Forget every handle produced by the evaluation at `identity` and by
    /// calls into it. Handles of other evaluations stay valid.
    async fn release(&self, _identity: &ModuleIdentity) -> Result<()> {
        Ok(())
    }
}

#[async_trait]
impl<T: ModuleHost + ?Sized> ModuleHost for Arc<T> {
    async fn evaluate(&self, identity: &ModuleIdentity, source: &Path) -> Result<Value> {
        (**self).evaluate(identity, source).await
    }

    async fn call(&self, function: &FunctionHandle, args: Vec<Value>) -> Result<Value> {
        (**self).call(function, args).await
    }

    async fn release(&self, identity: &ModuleIdentity) -> Result<()> {
        (**self).release(identity).await
    }
}

/// Default export of one evaluation, with the identity it was loaded under.
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    pub identity: ModuleIdentity,
    pub value: Value,
}

/// Writes compiled configs to disk and evaluates each exactly once.
#[derive(Debug)]
pub struct EphemeralLoader<H> {
    host: H,
    out_dir: PathBuf,
}

impl<H: ModuleHost> EphemeralLoader<H> {
    pub fn new(host: H, project_root: &Path) -> Self {
        Self {
            host,
            out_dir: project_root.join(OUTPUT_DIR),
        }
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn out_dir(&self) -> &Path {
        &self.out_dir
    }

    /// Reject config files this loader cannot evaluate, before compiling them.
    pub fn ensure_supported(candidate: &ConfigCandidate) -> Result<()> {
        match candidate.format {
            ModuleFormat::Esm => Ok(()),
            ModuleFormat::Cjs => Err(ConfigError::UnsupportedFormat {
                path: candidate.path.clone(),
            }),
        }
    }

    /// Evaluate `module` and return its default export.
    ///
    /// The written file is removed again whether or not evaluation succeeds.
    /// Handles in the result stay callable until [`EphemeralLoader::release`].
    pub async fn load(&self, module: CompiledConfigModule) -> Result<LoadedConfig> {
        if module.format == ModuleFormat::Cjs {
            return Err(ConfigError::UnsupportedFormat {
                path: module.source,
            });
        }

        tokio::fs::create_dir_all(&self.out_dir).await?;
        let identity = ModuleIdentity::new(&self.out_dir);
        tokio::fs::write(identity.file(), module.code.as_bytes()).await?;
        tracing::debug!("loading {} as {}", module.source.display(), identity.url());

        let result = self.host.evaluate(&identity, &module.source).await;

        if let Err(err) = tokio::fs::remove_file(identity.file()).await {
            tracing::debug!("could not remove {}: {}", identity.file().display(), err);
        }

        let value = result?;
        if let Err(err) = check_default_export(&value, &module.source) {
            self.release(&identity).await;
            return Err(err);
        }
        Ok(LoadedConfig { identity, value })
    }

    /// Drop the handles of a finished evaluation.
    pub async fn release(&self, identity: &ModuleIdentity) {
        if let Err(err) = self.host.release(identity).await {
            tracing::debug!("could not release {}: {}", identity.token(), err);
        }
    }
}

/// The default export must be a single configuration value.
fn check_default_export(value: &Value, source: &Path) -> Result<()> {
    let found = match ValueKind::of(value) {
        ValueKind::Null => "undefined",
        ValueKind::Function => "function",
        ValueKind::Reference if is_promise(value) => "Promise",
        _ => return Ok(()),
    };

    Err(ConfigError::NotAValue {
        path: source.to_path_buf(),
        found: found.to_string(),
    })
}
