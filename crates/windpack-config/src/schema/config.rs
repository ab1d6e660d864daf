//! Typed view of a validated configuration.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Build mode handed to plugin hooks and the downstream bundler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    #[default]
    Development,
    Production,
}

impl Mode {
    pub fn as_str(self) -> &'static str {
        match self {
            Mode::Development => "development",
            Mode::Production => "production",
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Mode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "development" | "dev" => Ok(Mode::Development),
            "production" | "prod" | "build" => Ok(Mode::Production),
            other => Err(format!(
                "invalid mode '{other}', expected 'development' or 'production'"
            )),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AppType {
    #[default]
    Spa,
    Custom,
}

/// A file-matching pattern: a plain string or a regular expression.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Pattern {
    Text(String),
    RegExp {
        #[serde(rename = "$regexp")]
        regexp: RegExpSource,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegExpSource {
    pub source: String,
    #[serde(default)]
    pub flags: String,
}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Pattern::Text(text) => f.write_str(text),
            Pattern::RegExp { regexp } => write!(f, "/{}/{}", regexp.source, regexp.flags),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolveSection {
    pub extensions: Vec<String>,
    pub preserve_symlinks: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerSection {
    pub port: u16,
    pub base: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwcSection {
    pub include: Pattern,
    pub exclude: Pattern,
}

/// Fully normalized configuration consumed by the bundling engine.
///
/// Plugins and `webpackConfig` stay as raw values: they may hold handles to
/// runtime objects the bundler passes through untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WindpackConfig {
    pub plugins: Vec<Value>,
    pub app_type: AppType,
    pub root: PathBuf,
    pub base: String,
    pub mode: Mode,
    pub cache_dir: String,
    pub define: Map<String, Value>,
    pub public_dir: String,
    pub clear_screen: bool,
    pub resolve: ResolveSection,
    pub server: ServerSection,
    pub webpack_config: Value,
    pub swc: SwcSection,
}

impl WindpackConfig {
    /// Compile-time constants injected into application code.
    ///
    /// String values are JSON-encoded so they can be substituted as source
    /// text. User `define` entries override the built-in ones.
    pub fn env_defines(&self) -> Map<String, Value> {
        let mode = Value::String(Value::from(self.mode.as_str()).to_string());
        let base = Value::String(Value::from(self.base.as_str()).to_string());

        let mut defines = Map::new();
        defines.insert("process.env.NODE_ENV".into(), mode.clone());
        defines.insert("import.meta.env.MODE".into(), mode);
        defines.insert("import.meta.env.BASE_URL".into(), base);
        defines.insert(
            "import.meta.env.PROD".into(),
            Value::Bool(self.mode == Mode::Production),
        );
        defines.insert(
            "import.meta.env.DEV".into(),
            Value::Bool(self.mode == Mode::Development),
        );

        for (key, value) in &self.define {
            defines.insert(key.clone(), value.clone());
        }
        defines
    }

    /// Address the development server listens on.
    pub fn dev_server_url(&self) -> String {
        let base = if self.server.base == "/" {
            ""
        } else {
            self.server.base.as_str()
        };
        format!("http://localhost:{}{}", self.server.port, base)
    }

    /// `cacheDir` resolved against `root`.
    pub fn cache_path(&self) -> PathBuf {
        path_clean::clean(self.root.join(&self.cache_dir))
    }

    /// Names of the configured plugins, in application order.
    pub fn plugin_names(&self) -> Vec<&str> {
        self.plugins
            .iter()
            .filter_map(|plugin| plugin.get("name").and_then(Value::as_str))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::Schema;
    use serde_json::json;
    use std::path::Path;

    fn config(value: Value) -> WindpackConfig {
        Schema::windpack(Path::new("/project"))
            .validate(&value)
            .unwrap()
            .config()
            .clone()
    }

    #[test]
    fn env_defines_follow_mode() {
        let defines = config(json!({"mode": "production", "base": "/app/"})).env_defines();
        assert_eq!(defines["process.env.NODE_ENV"], "\"production\"");
        assert_eq!(defines["import.meta.env.MODE"], "\"production\"");
        assert_eq!(defines["import.meta.env.BASE_URL"], "\"/app/\"");
        assert_eq!(defines["import.meta.env.PROD"], true);
        assert_eq!(defines["import.meta.env.DEV"], false);
    }

    #[test]
    fn user_defines_win() {
        let defines = config(json!({"define": {"import.meta.env.DEV": "custom", "__APP__": 1}}))
            .env_defines();
        assert_eq!(defines["import.meta.env.DEV"], "custom");
        assert_eq!(defines["__APP__"], 1);
    }

    #[test]
    fn dev_server_url_appends_non_root_base() {
        assert_eq!(config(json!({})).dev_server_url(), "http://localhost:3000");
        assert_eq!(
            config(json!({"server": {"port": 3001, "base": "/ui"}})).dev_server_url(),
            "http://localhost:3001/ui"
        );
    }

    #[test]
    fn patterns_decode_both_forms() {
        let swc = config(json!({"swc": {"include": "src"}})).swc;
        assert_eq!(swc.include, Pattern::Text("src".into()));
        assert_eq!(swc.exclude.to_string(), "/node_modules/");
    }

    #[test]
    fn cache_path_is_rooted() {
        assert_eq!(
            config(json!({})).cache_path(),
            PathBuf::from("/project/node_modules/.cache/windpack")
        );
    }

    #[test]
    fn mode_parses_build_alias() {
        assert_eq!("build".parse::<Mode>().unwrap(), Mode::Production);
        assert_eq!("dev".parse::<Mode>().unwrap(), Mode::Development);
        assert!("staging".parse::<Mode>().is_err());
    }
}
