//! Plugin composition.
//!
//! Each plugin's `config` hook receives the configuration accumulated so far
//! and may return a partial configuration. Partials are merged in plugin order
//! with [`merge`], starting from the user's own config.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;

use crate::error::{ConfigError, Result};
use crate::loader::ModuleHost;
use crate::merge::merge;
use crate::schema::Mode;
use crate::value::{FunctionHandle, ValueKind, function_handle};

/// Context handed to every `config` hook.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ConfigEnv {
    pub mode: Mode,
}

impl ConfigEnv {
    pub fn new(mode: Mode) -> Self {
        Self { mode }
    }
}

/// A contributor of partial configuration.
#[async_trait]
pub trait Plugin: Send + Sync {
    fn name(&self) -> &str;

    /// Partial config to merge over `current`, or `None` to leave it as is.
    async fn config(&self, current: &Value, env: &ConfigEnv) -> Result<Option<Value>>;
}

#[async_trait]
impl<T: Plugin + ?Sized> Plugin for Box<T> {
    fn name(&self) -> &str {
        (**self).name()
    }

    async fn config(&self, current: &Value, env: &ConfigEnv) -> Result<Option<Value>> {
        (**self).config(current, env).await
    }
}

/// A plugin object exported by the user's config, run through its host.
pub struct ScriptPlugin {
    name: String,
    hook: Option<FunctionHandle>,
    host: Arc<dyn ModuleHost>,
}

impl std::fmt::Debug for ScriptPlugin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScriptPlugin")
            .field("name", &self.name)
            .field("hook", &self.hook)
            .finish_non_exhaustive()
    }
}

impl ScriptPlugin {
    pub fn new(name: impl Into<String>, hook: Option<FunctionHandle>, host: Arc<dyn ModuleHost>) -> Self {
        Self {
            name: name.into(),
            hook,
            host,
        }
    }

    /// Build from a plugin object. Returns `None` unless it is a plain object.
    pub fn from_value(value: &Value, host: Arc<dyn ModuleHost>) -> Option<Self> {
        if ValueKind::of(value) != ValueKind::Object {
            return None;
        }

        let name = value
            .get("name")
            .and_then(Value::as_str)
            .unwrap_or("<anonymous>");
        let hook = value.get("config").and_then(function_handle);
        Some(Self::new(name, hook, host))
    }

    pub fn has_hook(&self) -> bool {
        self.hook.is_some()
    }
}

#[async_trait]
impl Plugin for ScriptPlugin {
    fn name(&self) -> &str {
        &self.name
    }

    async fn config(&self, current: &Value, env: &ConfigEnv) -> Result<Option<Value>> {
        let Some(hook) = &self.hook else {
            return Ok(None);
        };

        let env = serde_json::to_value(env)?;
        let partial = self.host.call(hook, vec![current.clone(), env]).await?;
        Ok((!partial.is_null()).then_some(partial))
    }
}

/// Plugins listed in a raw config, in order.
///
/// Entries that are not plugin objects are skipped here and reported by
/// validation.
pub fn script_plugins(raw: &Value, host: &Arc<dyn ModuleHost>) -> Vec<ScriptPlugin> {
    raw.get("plugins")
        .and_then(Value::as_array)
        .map(|entries| {
            entries
                .iter()
                .filter_map(|entry| ScriptPlugin::from_value(entry, Arc::clone(host)))
                .collect()
        })
        .unwrap_or_default()
}

/// Fold every plugin's contribution into `initial`, in order.
///
/// The plugin list is fixed up front: plugins that hooks add to the
/// accumulator are carried along but not invoked.
pub async fn compose<P>(initial: Value, plugins: &[P], env: &ConfigEnv) -> Result<Value>
where
    P: Plugin,
{
    let mut acc = initial;

    for plugin in plugins {
        let partial = plugin
            .config(&acc, env)
            .await
            .map_err(|err| ConfigError::Plugin {
                plugin: plugin.name().to_string(),
                source: Box::new(err),
            })?;

        match partial {
            Some(partial) => {
                tracing::debug!("merging config from plugin {}", plugin.name());
                acc = merge(&acc, &partial).map_err(|err| ConfigError::Plugin {
                    plugin: plugin.name().to_string(),
                    source: Box::new(err.into()),
                })?;
            }
            None => tracing::trace!("plugin {} returned nothing", plugin.name()),
        }
    }

    Ok(acc)
}

/// Mode for one resolution.
///
/// An explicit mode from the caller wins; otherwise a valid `mode` in the raw
/// config; otherwise development.
pub fn resolve_mode(explicit: Option<Mode>, raw: &Value) -> Mode {
    explicit
        .or_else(|| {
            raw.get("mode")
                .and_then(Value::as_str)
                .and_then(|mode| match mode {
                    "development" => Some(Mode::Development),
                    "production" => Some(Mode::Production),
                    _ => None,
                })
        })
        .unwrap_or_default()
}
