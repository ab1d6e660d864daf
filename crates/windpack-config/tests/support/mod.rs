//! In-process stand-ins for the compiler and the JavaScript runtime.

#![allow(dead_code)]

use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;
use windpack_config::{
    CompiledConfigModule, ConfigCandidate, ConfigCompiler, ConfigError, FunctionHandle,
    ModuleHost, ModuleIdentity, Result,
};

/// Copies the config file through unchanged.
pub struct PassthroughCompiler;

#[async_trait]
impl ConfigCompiler for PassthroughCompiler {
    async fn compile(&self, candidate: &ConfigCandidate) -> Result<CompiledConfigModule> {
        let code = fs::read_to_string(&candidate.path)?;
        Ok(CompiledConfigModule::new(&candidate.path, code, candidate.format))
    }
}

type Hook = Box<dyn Fn(&[Value]) -> Result<Value> + Send + Sync>;

/// Evaluates every module to a fixed export and dispatches function handles
/// to Rust closures.
#[derive(Default)]
pub struct ScriptedHost {
    exports: Mutex<Vec<Value>>,
    hooks: Mutex<HashMap<u64, Hook>>,
    pub evaluations: Mutex<Vec<(String, String)>>,
    pub calls: Mutex<Vec<(u64, Vec<Value>)>>,
    /// Tokens of evaluated modules, in evaluation order.
    pub tokens: Mutex<Vec<String>>,
    /// Tokens passed to `release`, in release order.
    pub releases: Mutex<Vec<String>>,
}

impl ScriptedHost {
    pub fn new() -> Self {
        Self::default()
    }

    /// Export returned by the next evaluation. The last one is reused.
    pub fn export(self, value: Value) -> Self {
        self.exports.lock().push(value);
        self
    }

    pub fn hook(
        self,
        id: u64,
        hook: impl Fn(&[Value]) -> Result<Value> + Send + Sync + 'static,
    ) -> Self {
        self.hooks.lock().insert(id, Box::new(hook));
        self
    }

    pub fn shared(self) -> Arc<Self> {
        Arc::new(self)
    }
}

#[async_trait]
impl ModuleHost for ScriptedHost {
    async fn evaluate(&self, identity: &ModuleIdentity, _source: &Path) -> Result<Value> {
        let code = fs::read_to_string(identity.file())?;
        self.evaluations
            .lock()
            .push((identity.url().to_string(), code));
        self.tokens.lock().push(identity.token().to_string());

        let mut exports = self.exports.lock();
        let value = if exports.len() > 1 {
            exports.remove(0)
        } else {
            exports.first().cloned().unwrap_or(Value::Null)
        };
        Ok(value)
    }

    async fn call(&self, function: &FunctionHandle, args: Vec<Value>) -> Result<Value> {
        self.calls.lock().push((function.0, args.clone()));
        let hooks = self.hooks.lock();
        match hooks.get(&function.0) {
            Some(hook) => hook(&args),
            None => Err(ConfigError::Call {
                message: format!("unknown function handle {}", function.0),
            }),
        }
    }

    async fn release(&self, identity: &ModuleIdentity) -> Result<()> {
        self.releases.lock().push(identity.token().to_string());
        Ok(())
    }
}

/// Write `windpack.config.mjs` (or another name) into `dir`.
pub fn write_config(dir: &Path, name: &str, code: &str) {
    fs::write(dir.join(name), code).expect("write config");
}

/// Whether a working `node` binary is available.
pub fn node_available() -> bool {
    let program = std::env::var_os("WINDPACK_NODE").unwrap_or_else(|| "node".into());
    std::process::Command::new(program)
        .arg("--version")
        .output()
        .map(|out| out.status.success())
        .unwrap_or(false)
}
