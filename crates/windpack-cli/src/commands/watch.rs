//! `windpack watch`: re-resolve on every change to the config or its local
//! imports.
//!
//! Each change starts a new resolution on a shared host. Runs may overlap;
//! a result is only reported if no newer run was started in the meantime.
//! A failing resolution is reported and watching continues.

use std::collections::BTreeSet;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use windpack_config::{ModuleHost, ResolvedConfig};

use crate::cli::{ResolveArgs, WatchArgs};
use crate::error::{CliError, Result, cli_error_to_miette};
use crate::ui;

use super::{default_host, log_externals, resolve, summary};

type Outcome = (u64, Result<Option<ResolvedConfig>>);

/// Numbers resolution runs and remembers the newest one.
#[derive(Debug, Default)]
struct RunTracker {
    latest: u64,
}

impl RunTracker {
    fn start(&mut self) -> u64 {
        self.latest += 1;
        self.latest
    }

    fn is_current(&self, run: u64) -> bool {
        run == self.latest
    }
}

pub async fn execute(args: WatchArgs) -> Result<()> {
    if !args.resolve.root.is_dir() {
        return Err(CliError::RootNotFound(args.resolve.root.clone()));
    }

    let host = default_host();
    let (watcher, mut changes) = watcher()?;
    let mut watches = Watches::new(watcher);

    let dir = config_dir(&args.resolve);
    watches.add(&dir)?;

    match resolve(&args.resolve, Arc::clone(&host)).await {
        Ok(Some(resolved)) => {
            watches.extend(&resolved.inputs);
            report(&resolved);
        }
        Ok(None) => return Ok(()),
        Err(err) => eprintln!("{:?}", cli_error_to_miette(err)),
    }
    ui::info(&format!("Watching {} for changes", dir.display()));

    let (results_tx, mut results) = mpsc::unbounded_channel::<Outcome>();
    let debounce = Duration::from_millis(args.debounce);
    let mut runs = RunTracker::default();

    loop {
        tokio::select! {
            change = changes.recv() => {
                let Some(path) = change else { break };
                tokio::time::sleep(debounce).await;
                while changes.try_recv().is_ok() {}

                let run = runs.start();
                tracing::debug!("{} changed, starting run {}", path.display(), run);
                spawn_run(run, args.resolve.clone(), Arc::clone(&host), results_tx.clone());
            }
            Some((run, outcome)) = results.recv() => {
                if !runs.is_current(run) {
                    tracing::debug!("discarding superseded run {}", run);
                    continue;
                }
                match outcome {
                    Ok(Some(resolved)) => {
                        watches.extend(&resolved.inputs);
                        report(&resolved);
                    }
                    Ok(None) => {}
                    Err(err) => eprintln!("{:?}", cli_error_to_miette(err)),
                }
            }
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    Ok(())
}

fn spawn_run(
    run: u64,
    args: ResolveArgs,
    host: Arc<dyn ModuleHost>,
    results: mpsc::UnboundedSender<Outcome>,
) {
    tokio::spawn(async move {
        let outcome = resolve(&args, host).await;
        // The receiver only goes away on shutdown
        let _ = results.send((run, outcome));
    });
}

fn report(resolved: &ResolvedConfig) {
    log_externals(resolved);
    match serde_json::to_string_pretty(resolved.config.value()) {
        Ok(json) => println!("{json}"),
        Err(err) => ui::error(&format!("Failed to serialize configuration: {err}")),
    }
    ui::success(&summary(resolved));
}

/// Directory the config file lives in, known before the first resolution.
fn config_dir(args: &ResolveArgs) -> PathBuf {
    match &args.config {
        Some(config) => args
            .root
            .join(config)
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| args.root.clone()),
        None => args.root.clone(),
    }
}

/// Parent directories of the files a config was compiled from.
fn input_dirs(inputs: &[PathBuf]) -> BTreeSet<PathBuf> {
    inputs
        .iter()
        .filter(|path| is_relevant(path))
        .filter_map(|path| path.parent())
        .map(Path::to_path_buf)
        .collect()
}

/// Changes under `node_modules` include the loader's own output.
fn is_relevant(path: &Path) -> bool {
    !path
        .components()
        .any(|c| c == Component::Normal("node_modules".as_ref()))
}

/// Directories watched so far. Each one is watched non-recursively.
struct Watches {
    watcher: RecommendedWatcher,
    dirs: BTreeSet<PathBuf>,
}

impl Watches {
    fn new(watcher: RecommendedWatcher) -> Self {
        Self {
            watcher,
            dirs: BTreeSet::new(),
        }
    }

    fn add(&mut self, dir: &Path) -> Result<()> {
        if self.dirs.contains(dir) {
            return Ok(());
        }
        self.watcher
            .watch(dir, RecursiveMode::NonRecursive)
            .map_err(CliError::Watch)?;
        tracing::debug!("watching {}", dir.display());
        self.dirs.insert(dir.to_path_buf());
        Ok(())
    }

    /// Start watching the directories of newly imported files.
    fn extend(&mut self, inputs: &[PathBuf]) {
        for dir in input_dirs(inputs) {
            if let Err(err) = self.add(&dir) {
                tracing::warn!("cannot watch {}: {}", dir.display(), err);
            }
        }
    }
}

fn watcher() -> Result<(RecommendedWatcher, mpsc::UnboundedReceiver<PathBuf>)> {
    let (tx, rx) = mpsc::unbounded_channel();

    let watcher = notify::recommended_watcher(move |res: notify::Result<Event>| match res {
        Ok(event) => {
            if !matches!(
                event.kind,
                EventKind::Create(_) | EventKind::Modify(_) | EventKind::Remove(_)
            ) {
                return;
            }
            for path in event.paths.into_iter().filter(|p| is_relevant(p)) {
                let _ = tx.send(path);
            }
        }
        Err(err) => tracing::warn!("watch error: {}", err),
    })
    .map_err(CliError::Watch)?;

    Ok((watcher, rx))
}
