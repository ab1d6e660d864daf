//! End-to-end resolution with an in-process host.

mod support;

use std::sync::Arc;

use serde_json::{Value, json};
use support::{PassthroughCompiler, ScriptedHost, write_config};
use tempfile::TempDir;
use windpack_config::{ConfigError, Mode, ModuleHost, ResolveOptions, resolve_config};

async fn resolve(
    dir: &TempDir,
    options: ResolveOptions,
    host: Arc<ScriptedHost>,
) -> windpack_config::Result<Option<windpack_config::ResolvedConfig>> {
    let options = ResolveOptions {
        root: dir.path().to_path_buf(),
        ..options
    };
    resolve_config(&options, &PassthroughCompiler, host as Arc<dyn ModuleHost>).await
}

#[tokio::test]
async fn plain_config_gets_schema_defaults() {
    let dir = TempDir::new().expect("tempdir");
    write_config(dir.path(), "windpack.config.mjs", "export default {}");
    let host = ScriptedHost::new()
        .export(json!({ "plugins": [], "mode": "development" }))
        .shared();

    let resolved = resolve(&dir, ResolveOptions::default(), host)
        .await
        .expect("resolve")
        .expect("config found");

    let config = resolved.config.config();
    assert_eq!(config.mode, Mode::Development);
    assert_eq!(config.server.port, 3000);
    assert_eq!(config.server.base, "/");
    assert_eq!(config.base, "/");
    assert_eq!(config.public_dir, "public");
    assert!(config.clear_screen);
    assert_eq!(config.root, dir.path());
    assert_eq!(config.webpack_config, json!({}));
    assert!(config.plugins.is_empty());
}

#[tokio::test]
async fn plugin_contributions_concatenate_over_base() {
    let dir = TempDir::new().expect("tempdir");
    write_config(dir.path(), "windpack.config.ts", "export default {}");
    std::fs::write(dir.path().join("package.json"), r#"{"type":"module"}"#).expect("manifest");

    let host = ScriptedHost::new()
        .export(json!({
            "plugins": [{ "name": "plugin-a", "config": { "$fn": 1, "name": "config" } }],
            "server": { "port": 3001 }
        }))
        .hook(1, |args| {
            assert_eq!(args[1], json!({ "mode": "development" }));
            Ok(json!({ "webpackConfig": { "plugins": [{ "$ref": 2, "class": "X" }] } }))
        })
        .shared();

    let options = ResolveOptions::default().base(json!({
        "webpackConfig": { "plugins": [{ "$ref": 3, "class": "Y" }] }
    }));
    let resolved = resolve(&dir, options, Arc::clone(&host))
        .await
        .expect("resolve")
        .expect("config found");

    let config = resolved.config.config();
    assert_eq!(config.server.port, 3001);
    let classes: Vec<_> = config.webpack_config["plugins"]
        .as_array()
        .expect("plugins array")
        .iter()
        .map(|p| p["class"].as_str().expect("class"))
        .collect();
    assert_eq!(classes, vec!["Y", "X"]);
    assert_eq!(config.plugin_names(), vec!["plugin-a"]);
}

#[tokio::test]
async fn plugin_order_decides_scalar_conflicts() {
    async fn run(order: [u64; 2]) -> Value {
        let dir = TempDir::new().expect("tempdir");
        write_config(dir.path(), "windpack.config.mjs", "");
        let plugins: Vec<_> = order
            .iter()
            .map(|id| json!({ "name": format!("p{id}"), "config": { "$fn": id } }))
            .collect();
        let host = ScriptedHost::new()
            .export(json!({ "plugins": plugins }))
            .hook(1, |_| Ok(json!({ "define": { "x": 1 } })))
            .hook(2, |_| Ok(json!({ "define": { "x": 2 } })))
            .shared();

        let resolved = resolve(&dir, ResolveOptions::default(), host)
            .await
            .expect("resolve")
            .expect("config found");
        resolved.config.config().define["x"].clone()
    }

    assert_eq!(run([1, 2]).await, json!(2));
    assert_eq!(run([2, 1]).await, json!(1));
}

#[tokio::test]
async fn hooks_see_the_accumulated_config() {
    let dir = TempDir::new().expect("tempdir");
    write_config(dir.path(), "windpack.config.mjs", "");
    let host = ScriptedHost::new()
        .export(json!({
            "plugins": [
                { "name": "first", "config": { "$fn": 1 } },
                { "name": "second", "config": { "$fn": 2 } }
            ]
        }))
        .hook(1, |_| Ok(json!({ "base": "/app/" })))
        .hook(2, |args| Ok(json!({ "define": { "seen": args[0]["base"].clone() } })))
        .shared();

    let resolved = resolve(&dir, ResolveOptions::default(), host)
        .await
        .expect("resolve")
        .expect("config found");

    assert_eq!(resolved.config.config().define["seen"], "/app/");
}

#[tokio::test]
async fn plugins_added_by_hooks_are_not_invoked() {
    let dir = TempDir::new().expect("tempdir");
    write_config(dir.path(), "windpack.config.mjs", "");
    let host = ScriptedHost::new()
        .export(json!({ "plugins": [{ "name": "adder", "config": { "$fn": 1 } }] }))
        .hook(1, |_| Ok(json!({ "plugins": [{ "name": "late", "config": { "$fn": 2 } }] })))
        .hook(2, |_| panic!("late plugin must not run"))
        .shared();

    let resolved = resolve(&dir, ResolveOptions::default(), Arc::clone(&host))
        .await
        .expect("resolve")
        .expect("config found");

    assert_eq!(resolved.config.config().plugin_names(), vec!["adder", "late"]);
    assert_eq!(host.calls.lock().len(), 1);
}

#[tokio::test]
async fn explicit_mode_reaches_hooks_and_result() {
    let dir = TempDir::new().expect("tempdir");
    write_config(dir.path(), "windpack.config.mjs", "");
    let host = ScriptedHost::new()
        .export(json!({ "mode": "development", "plugins": [{ "name": "p", "config": { "$fn": 1 } }] }))
        .hook(1, |args| {
            assert_eq!(args[1]["mode"], "production");
            Ok(Value::Null)
        })
        .shared();

    let resolved = resolve(&dir, ResolveOptions::default().mode(Mode::Production), host)
        .await
        .expect("resolve")
        .expect("config found");

    assert_eq!(resolved.mode, Mode::Production);
    assert_eq!(resolved.config.config().mode, Mode::Production);
}

#[tokio::test]
async fn validation_reports_every_invalid_field() {
    let dir = TempDir::new().expect("tempdir");
    write_config(dir.path(), "windpack.config.mjs", "");
    let host = ScriptedHost::new()
        .export(json!({ "appType": "mpa", "server": { "port": -1 } }))
        .shared();

    let err = resolve(&dir, ResolveOptions::default(), host)
        .await
        .expect_err("invalid config");

    let errors = match err {
        ConfigError::Validation(errors) => errors,
        other => panic!("expected validation error, got {other:?}"),
    };
    let paths: Vec<_> = errors.iter().map(|e| e.path.as_str()).collect();
    assert_eq!(paths, vec!["appType", "server.port"]);
}

#[tokio::test]
async fn hook_failures_abort_resolution() {
    let dir = TempDir::new().expect("tempdir");
    write_config(dir.path(), "windpack.config.mjs", "");
    let host = ScriptedHost::new()
        .export(json!({ "plugins": [{ "name": "broken", "config": { "$fn": 1 } }] }))
        .hook(1, |_| {
            Err(ConfigError::Call {
                message: "cannot read properties of undefined".into(),
            })
        })
        .shared();

    let err = resolve(&dir, ResolveOptions::default(), Arc::clone(&host))
        .await
        .expect_err("hook failure");

    assert!(matches!(err, ConfigError::Plugin { ref plugin, .. } if plugin == "broken"));
    assert_eq!(*host.releases.lock(), *host.tokens.lock());
}

#[tokio::test]
async fn handles_are_released_after_hooks_run() {
    let dir = TempDir::new().expect("tempdir");
    write_config(dir.path(), "windpack.config.mjs", "");
    let host = ScriptedHost::new()
        .export(json!({ "plugins": [{ "name": "a", "config": { "$fn": 1 } }] }))
        .hook(1, |_| Ok(json!({ "define": { "a": true } })))
        .shared();

    for _ in 0..2 {
        resolve(&dir, ResolveOptions::default(), Arc::clone(&host))
            .await
            .expect("resolve")
            .expect("config found");
    }

    // One release per load, for that load's own module
    let tokens = host.tokens.lock();
    assert_eq!(tokens.len(), 2);
    assert_ne!(tokens[0], tokens[1]);
    assert_eq!(*host.releases.lock(), *tokens);
    assert_eq!(host.calls.lock().len(), 2);
}

#[tokio::test]
async fn reloading_evaluates_again() {
    let dir = TempDir::new().expect("tempdir");
    let code = "export default { define: { build: 1 } }";
    write_config(dir.path(), "windpack.config.mjs", code);
    let host = ScriptedHost::new()
        .export(json!({ "define": { "build": 1 } }))
        .export(json!({ "define": { "build": 2 } }))
        .shared();

    let first = resolve(&dir, ResolveOptions::default(), Arc::clone(&host))
        .await
        .expect("first resolve")
        .expect("config found");
    // Same bytes on disk, as after saving a file without changes
    write_config(dir.path(), "windpack.config.mjs", code);
    let second = resolve(&dir, ResolveOptions::default(), Arc::clone(&host))
        .await
        .expect("second resolve")
        .expect("config found");

    assert_eq!(first.config.config().define["build"], 1);
    assert_eq!(second.config.config().define["build"], 2);

    let evaluations = host.evaluations.lock();
    assert_eq!(evaluations.len(), 2);
    assert_ne!(evaluations[0].0, evaluations[1].0);
    assert_eq!(evaluations[0].1, evaluations[1].1);
}

#[tokio::test]
async fn explicit_config_file_must_exist() {
    let dir = TempDir::new().expect("tempdir");
    let host = ScriptedHost::new().shared();

    let err = resolve(
        &dir,
        ResolveOptions::default().config_file("configs/windpack.mjs"),
        host,
    )
    .await
    .expect_err("missing explicit config");

    assert!(matches!(err, ConfigError::NotFound(_)));
}
