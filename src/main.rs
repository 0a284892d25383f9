//! live-prefs - interactive shell over a reactive preference store
//!
//! Seeds an in-memory store from a YAML config, then reads commands from
//! the terminal. Watched keys print every change, including changes made by
//! a config hot-reload.

use anyhow::Result;
use clap::Parser;
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod cli;

use crate::cli::Shell;
use live_prefs::config::{ConfigWatcher, PrefsConfig};
use live_prefs::{MemoryStore, PreferenceFactory};

/// Live Prefs - watch and edit reactive preferences from the terminal
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "prefs.yaml")]
    config: String,

    /// Log level (error, warn, info, debug, trace); overrides the config file
    #[arg(short, long, env = "LOG_LEVEL")]
    log_level: Option<String>,

    /// Do not reload the seed when the config file changes
    #[arg(long)]
    no_watch: bool,

    /// Emit logs as JSON lines instead of plain text
    #[arg(long, env = "LOG_JSON")]
    log_json: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    let args = Args::parse();

    let config_exists = Path::new(&args.config).exists();
    let (watcher, config) = if !config_exists {
        (None, PrefsConfig::default())
    } else if args.no_watch {
        (None, PrefsConfig::load(&args.config).await?)
    } else {
        let (watcher, config) = ConfigWatcher::new(args.config.clone()).await?;
        (Some(watcher), config)
    };

    let level = args
        .log_level
        .clone()
        .unwrap_or_else(|| config.log_level.clone());
    init_logging(&level, args.log_json)?;

    info!("Starting live-prefs...");
    if config_exists {
        info!("Configuration file: {}", args.config);
    } else {
        warn!("Configuration file {} not found, starting empty", args.config);
    }

    let store = Arc::new(MemoryStore::new());
    store.hydrate(config.seed.clone());
    let factory = PreferenceFactory::with_store(store.clone());
    info!("Store ready with {} key(s)", store.len());

    if let Some(watcher) = watcher {
        tokio::spawn(apply_config_updates(watcher, factory.clone()));
    }

    let shell = Shell::new(factory, store, Arc::new(|line: String| println!("{}", line)));
    tokio::task::spawn_blocking(move || cli::run_repl(shell)).await??;

    info!("live-prefs shutdown complete");
    Ok(())
}

/// Write changed seed keys on every config reload so their live handles re-emit
///
/// Keys dropped from the seed keep whatever value the store holds.
async fn apply_config_updates(mut watcher: ConfigWatcher, factory: PreferenceFactory) {
    while let Some(update) = watcher.next_config().await {
        let committed = factory.apply_seed(&update.diff.changed);
        info!(
            "Config reload applied {} of {} changed seed value(s)",
            committed,
            update.diff.changed.len()
        );
        if !update.diff.removed.is_empty() {
            info!(
                "Left in store after removal from seed: {}",
                update.diff.removed.join(", ")
            );
        }
    }
}

fn init_logging(level: &str, json: bool) -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    let text_layer = (!json).then(|| {
        tracing_subscriber::fmt::layer()
            .with_target(false)
            .with_thread_ids(false)
            .with_thread_names(false)
    });
    let json_layer = json.then(|| {
        tracing_subscriber::fmt::layer()
            .json()
            .with_target(false)
            .with_current_span(false)
    });

    tracing_subscriber::registry()
        .with(filter)
        .with(text_layer)
        .with(json_layer)
        .init();

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_json_flag() {
        let args = Args::try_parse_from(["live-prefs", "--log-json", "--no-watch"]).unwrap();
        assert!(args.log_json);
        assert!(args.no_watch);
        assert_eq!(args.config, "prefs.yaml");

        let args = Args::try_parse_from(["live-prefs"]).unwrap();
        assert!(!args.log_json);
    }
}
