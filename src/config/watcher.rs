//! Seed reload on config file changes
//!
//! The watcher follows the directory holding the config file rather than the
//! file itself, so editors that save by renaming a temporary file are still
//! seen. Bursts of file events are coalesced into a single reload, and each
//! reload is compared with the previous seed: only configs whose seed
//! actually differs are handed on, together with the per-key difference.

use anyhow::{Context, Result};
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::collections::BTreeMap;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use super::PrefsConfig;
use crate::store::Primitive;

/// Quiet period that ends a burst of file events
const SETTLE: Duration = Duration::from_millis(150);

/// Difference between two seeds
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SeedDiff {
    /// Keys that are new or carry a different value
    pub changed: BTreeMap<String, Primitive>,
    /// Keys no longer present in the seed
    pub removed: Vec<String>,
}

impl SeedDiff {
    pub fn between(old: &BTreeMap<String, Primitive>, new: &BTreeMap<String, Primitive>) -> Self {
        let changed = new
            .iter()
            .filter(|(key, value)| old.get(*key) != Some(*value))
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect();
        let removed = old
            .keys()
            .filter(|key| !new.contains_key(*key))
            .cloned()
            .collect();

        Self { changed, removed }
    }

    pub fn is_empty(&self) -> bool {
        self.changed.is_empty() && self.removed.is_empty()
    }
}

/// A reloaded config and how its seed moved
#[derive(Debug, Clone)]
pub struct ConfigUpdate {
    pub config: PrefsConfig,
    pub diff: SeedDiff,
}

/// Hands out a [`ConfigUpdate`] each time the seed in the file changes
pub struct ConfigWatcher {
    _watcher: RecommendedWatcher,
    updates: mpsc::Receiver<ConfigUpdate>,
}

impl ConfigWatcher {
    /// Load `config_path` and start following it
    ///
    /// Must be called inside a tokio runtime.
    pub async fn new(config_path: String) -> Result<(Self, PrefsConfig)> {
        let initial = PrefsConfig::load(&config_path)
            .await
            .context("Failed to load initial config")?;

        let path = PathBuf::from(&config_path);
        let file_name = path
            .file_name()
            .map(OsString::from)
            .with_context(|| format!("Config path has no file name: {}", config_path))?;
        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };

        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| match res {
            Ok(event) if touches(&event, &file_name) => {
                let _ = events_tx.send(());
            }
            Ok(_) => {}
            Err(e) => warn!("Config watch error: {}", e),
        })?;

        watcher
            .watch(&dir, RecursiveMode::NonRecursive)
            .with_context(|| format!("Failed to watch config directory: {}", dir.display()))?;

        let (updates_tx, updates) = mpsc::channel(8);
        tokio::spawn(reload_loop(config_path.clone(), initial.clone(), events_rx, updates_tx));

        info!("Watching {} for seed changes", config_path);

        Ok((
            Self {
                _watcher: watcher,
                updates,
            },
            initial,
        ))
    }

    /// Next config whose seed differs from the last one handed out
    ///
    /// Returns `None` once the watcher has shut down.
    pub async fn next_config(&mut self) -> Option<ConfigUpdate> {
        self.updates.recv().await
    }
}

fn touches(event: &Event, file_name: &OsString) -> bool {
    matches!(event.kind, EventKind::Create(_) | EventKind::Modify(_))
        && event
            .paths
            .iter()
            .any(|p| p.file_name() == Some(file_name.as_os_str()))
}

async fn reload_loop(
    path: String,
    mut current: PrefsConfig,
    mut events: mpsc::UnboundedReceiver<()>,
    updates: mpsc::Sender<ConfigUpdate>,
) {
    while events.recv().await.is_some() {
        settle(&mut events).await;

        let config = match PrefsConfig::load(&path).await {
            Ok(config) => config,
            Err(e) => {
                warn!("Ignoring unreadable config (keeping previous seed): {:#}", e);
                continue;
            }
        };

        let diff = SeedDiff::between(&current.seed, &config.seed);
        if diff.is_empty() {
            debug!("Config touched but seed unchanged");
            current = config;
            continue;
        }

        debug!(
            "Seed changed: {} key(s) updated, {} removed",
            diff.changed.len(),
            diff.removed.len()
        );
        current = config.clone();
        if updates.send(ConfigUpdate { config, diff }).await.is_err() {
            break;
        }
    }
    debug!("Config reload loop stopped for {}", Path::new(&path).display());
}

/// Swallow events until none arrive for [`SETTLE`]
async fn settle(events: &mut mpsc::UnboundedReceiver<()>) {
    while let Ok(Some(())) = tokio::time::timeout(SETTLE, events.recv()).await {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn seed(entries: &[(&str, Primitive)]) -> BTreeMap<String, Primitive> {
        entries
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn test_seed_diff_reports_changed_and_removed_keys() {
        let old = seed(&[
            ("volume", Primitive::Int(10)),
            ("muted", Primitive::Bool(false)),
            ("theme", Primitive::String("dark".into())),
        ]);
        let new = seed(&[
            ("volume", Primitive::Int(90)),
            ("muted", Primitive::Bool(false)),
            ("gain", Primitive::Float(0.5)),
        ]);

        let diff = SeedDiff::between(&old, &new);
        assert_eq!(
            diff.changed,
            seed(&[("gain", Primitive::Float(0.5)), ("volume", Primitive::Int(90))])
        );
        assert_eq!(diff.removed, vec!["theme".to_string()]);
    }

    #[test]
    fn test_seed_diff_of_identical_seeds_is_empty() {
        let s = seed(&[("volume", Primitive::Int(10))]);
        assert!(SeedDiff::between(&s, &s).is_empty());
        assert!(SeedDiff::between(&BTreeMap::new(), &BTreeMap::new()).is_empty());
    }

    #[tokio::test]
    async fn test_watcher_yields_only_changed_keys() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let config_path = temp_dir.path().join("prefs.yaml");
        fs::write(&config_path, "seed:\n  volume: 10\n  muted: false\n")?;

        let (mut watcher, config) =
            ConfigWatcher::new(config_path.to_string_lossy().to_string()).await?;
        assert_eq!(config.seed["volume"], Primitive::Int(10));

        tokio::time::sleep(Duration::from_millis(100)).await;
        fs::write(&config_path, "seed:\n  volume: 90\n  muted: false\n")?;

        let update = tokio::time::timeout(Duration::from_secs(3), watcher.next_config())
            .await?
            .context("watcher closed")?;
        assert_eq!(update.diff.changed, seed(&[("volume", Primitive::Int(90))]));
        assert!(update.diff.removed.is_empty());
        assert_eq!(update.config.seed["muted"], Primitive::Bool(false));

        Ok(())
    }

    #[tokio::test]
    async fn test_touch_without_seed_change_yields_nothing() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let config_path = temp_dir.path().join("prefs.yaml");
        fs::write(&config_path, "seed:\n  volume: 10\n")?;

        let (mut watcher, _) =
            ConfigWatcher::new(config_path.to_string_lossy().to_string()).await?;

        tokio::time::sleep(Duration::from_millis(100)).await;
        fs::write(&config_path, "log_level: debug\nseed:\n  volume: 10\n")?;

        let update = tokio::time::timeout(Duration::from_secs(1), watcher.next_config()).await;
        assert!(update.is_err());

        Ok(())
    }

    #[tokio::test]
    async fn test_missing_file_fails() {
        let result = ConfigWatcher::new("/definitely/not/here.yaml".to_string()).await;
        assert!(result.is_err());
    }
}
