use std::{path::PathBuf, time::Duration};

use anyhow::{Context, Result};
use clap::Parser;
use config::{load_config, DEFAULT_CONFIG_NAME};
use engine::{FileWatchEngine, WatchState};
use logger::{log, verbose_log, LogLevel};
use notifier::EmailNotifier;
use watcher::DirectorySubscription;

mod config;
mod engine;
mod error;
mod logger;
mod notifier;
mod target;
mod watcher;

/// isthere -- file notifications made simple
#[derive(Parser, Debug)]
#[command(name = "isthere", version, about, allow_missing_positional = true)]
struct Cli {
    /// Configuration name looked up in the home directory, or a config file path
    #[arg(value_name = "CONFIG")]
    config: Option<String>,

    /// The file to watch for
    #[arg(value_name = "PATH", required = true)]
    path: String,

    /// Directory holding the configuration files
    #[arg(long, env = "ISTHERE_HOME", value_name = "DIR")]
    home: Option<PathBuf>,

    /// Re-check the target every SECS seconds while no events arrive
    #[arg(long, value_name = "SECS")]
    poll_interval: Option<u64>,

    /// Print debug output
    #[arg(short, long)]
    verbose: bool,
}

impl Cli {
    fn config_name(&self) -> &str {
        self.config.as_deref().unwrap_or(DEFAULT_CONFIG_NAME)
    }

    fn home(&self) -> PathBuf {
        match &self.home {
            Some(home) if !home.as_os_str().is_empty() => home.clone(),
            _ => {
                log(
                    LogLevel::Warn,
                    "ISTHERE_HOME is not defined, looking for configuration in the current directory",
                );
                PathBuf::from(".")
            }
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let config_path = config::locate(cli.config_name(), &cli.home())?;
    let config = load_config(&config_path)?;
    let verbose = Some(cli.verbose || config.verbose.unwrap_or(false));
    verbose_log(
        LogLevel::Debug,
        &format!("Configuration loaded from {}", config_path.display()),
        verbose,
    );

    let target = target::resolve(&cli.path).context("Failed to resolve path to watch")?;
    log(
        LogLevel::Info,
        &format!("Watching {} [{}]", target, target.file_name()),
    );

    let poll_interval = cli
        .poll_interval
        .filter(|secs| *secs > 0)
        .map(Duration::from_secs)
        .or_else(|| config.poll_interval());
    let subscription = DirectorySubscription::open(target.directory(), poll_interval)?;
    let notifier = EmailNotifier::new(config.email);

    let mut engine = FileWatchEngine::new(target, subscription, notifier).verbose(verbose);
    let state = engine.run()?;

    let file_name = engine.target().file_name().to_string();
    let (subscription, _) = engine.into_parts();
    drop(subscription);

    match state {
        WatchState::Present => log(LogLevel::Info, &format!("{} is present.", file_name)),
        _ => log(
            LogLevel::Warn,
            &format!("Stopped watching before {} arrived.", file_name),
        ),
    }
    Ok(())
}
