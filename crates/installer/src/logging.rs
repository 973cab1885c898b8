//! Tracing setup for binaries and tools embedding the engine

use std::fs::OpenOptions;
use std::sync::Mutex;
use tracing::Level;

use crate::config::InstallerConfig;
use crate::error::{FileOperation, InstallError, Result};

/// Install a global `fmt` subscriber
///
/// Logs go to the configured diagnostic log (appended, no colors) when there is
/// one, otherwise to stderr. Returns `false` when a subscriber was already set.
pub fn init_tracing(config: &InstallerConfig, verbose: bool) -> Result<bool> {
    let level = if verbose { Level::DEBUG } else { Level::INFO };

    let installed = match &config.diagnostic_log {
        Some(path) => {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent)
                    .map_err(InstallError::fs_with(parent, FileOperation::CreateDir))?;
            }
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .map_err(InstallError::fs_with(path, FileOperation::Create))?;
            tracing_subscriber::fmt()
                .with_max_level(level)
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .try_init()
                .is_ok()
        }
        None => tracing_subscriber::fmt()
            .with_max_level(level)
            .with_writer(std::io::stderr)
            .try_init()
            .is_ok(),
    };

    Ok(installed)
}
