use std::fs::{self, File, OpenOptions};
use std::path::PathBuf;
use std::sync::Mutex;
use partchat_core::Config;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

const DEFAULT_FILTER: &str = "info,partchat_core=debug";

/// Where log output goes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogTarget {
    /// A file under the data directory; used while the TUI owns the terminal
    File,
    Stderr,
}

fn env_filter(config: &Config) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_filter.as_deref().unwrap_or(DEFAULT_FILTER)))
        .unwrap_or_else(|_| EnvFilter::new("warn"))
}

pub fn init(config: &Config, target: LogTarget) {
    let env_filter = env_filter(config);

    match target {
        LogTarget::Stderr => {
            tracing_subscriber::registry()
                .with(fmt::layer().with_writer(std::io::stderr).compact())
                .with(env_filter)
                .init();
        }
        LogTarget::File => match open_log_file() {
            Some((path, file)) => {
                tracing_subscriber::registry()
                    .with(fmt::layer().with_ansi(false).with_writer(Mutex::new(file)))
                    .with(env_filter)
                    .init();
                tracing::info!(path = %path.display(), "Logging initialized");
            }
            // No logs rather than writing over the TUI
            None => tracing_subscriber::registry().with(env_filter).init(),
        },
    }
}

fn open_log_file() -> Option<(PathBuf, File)> {
    let path = Config::data_dir().ok()?.join("partchat.log");
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).ok()?;
    }

    let file = OpenOptions::new().create(true).append(true).open(&path).ok()?;
    Some((path, file))
}
