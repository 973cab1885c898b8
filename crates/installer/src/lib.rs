//! Modpack Installer Library
//!
//! This library installs curated game modpacks into a local game client
//! directory. It loads the pack catalog, installs each pack's mod loader into
//! the shared `versions/` and `libraries/` directories, lays the pack content
//! into its own profile directory and registers the profile with the launcher.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use modpack_installer::{
//!     CatalogLoader, ClientLayout, ConsoleUi, InstallWorker, InstallerConfig, PackInstaller,
//! };
//! use std::sync::Arc;
//!
//! # async fn example() -> modpack_installer::Result<()> {
//! let config = InstallerConfig::from_env()?;
//!
//! // Fetch the catalog (a local modpacks.json wins when configured)
//! let catalog = CatalogLoader::new(config.clone())?.load().await?;
//! let Some(pack) = catalog.find("Tech", "Alpha").cloned() else {
//!     return Ok(());
//! };
//!
//! // Install it on a worker task
//! let client = ClientLayout::from_config(&config)?;
//! let installer = PackInstaller::new(config, Arc::new(ConsoleUi::new()))?;
//! let report = InstallWorker::spawn(installer, client.root().to_path_buf(), pack).await?;
//! println!("{}", report.summary());
//! # Ok(())
//! # }
//! ```
//!
//! # Features
//!
//! - **Catalog**: ordered categories, per-entry validation, cache-busted fetches
//! - **Downloads**: streamed to `.part` files with throttled progress and ETA
//! - **Loaders**: installed once per version, skipped when already present
//! - **Packs**: simple (`mods/` only) or complex (whole profile) merges, update in place
//! - **Launcher registry**: backed up before every write, creation time preserved

pub mod catalog;
pub mod config;
pub mod downloader;
pub mod error;
pub mod install;
pub mod integrations;
pub mod logging;

// Re-export commonly used types for convenience
pub use catalog::{Catalog, CatalogLoader, CatalogSession, PackDefinition};
pub use config::InstallerConfig;
pub use downloader::{DownloadProgress, HttpClient, ProgressCallback};
pub use error::{ErrorKind, InstallError, Result};
pub use install::{ClientLayout, InstallOutcome, LoaderInstaller, LoaderStatus, PackInstaller};
pub use integrations::{
    ChannelUi, ConsoleUi, InstallReport, InstallWorker, InstallerUi, NullUi, UiEvent,
};
