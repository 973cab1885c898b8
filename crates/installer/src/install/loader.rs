//! Mod-loader installation into the client's shared `versions/` and `libraries/`

use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info, info_span, warn, Instrument};

use super::archive::{extract_and_merge_named, remove_dir_if_exists};
use super::layout::ClientLayout;
use crate::catalog::loader_version_dir;
use crate::downloader::HttpClient;
use crate::error::{InstallError, Result};
use crate::integrations::ui::{InstallerUi, IntoProgressCallback};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoaderStatus {
    /// `versions/<version>` was already present; nothing was downloaded
    AlreadyInstalled { version: String },
    Installed {
        version: String,
        versions_merged: bool,
        libraries_merged: bool,
        files_written: usize,
    },
}

impl LoaderStatus {
    pub fn version(&self) -> &str {
        match self {
            LoaderStatus::AlreadyInstalled { version }
            | LoaderStatus::Installed { version, .. } => version,
        }
    }
}

pub struct LoaderInstaller {
    http: HttpClient,
    ui: Arc<dyn InstallerUi>,
}

impl LoaderInstaller {
    pub fn new(http: HttpClient, ui: Arc<dyn InstallerUi>) -> Self {
        Self { http, ui }
    }

    /// Make sure the loader version exists under `client_root/versions`
    ///
    /// Idempotent: when the version directory is already there no network
    /// access happens.
    pub async fn ensure_loader(
        &self,
        client_root: &Path,
        loader_url: &str,
        version_id: Option<&str>,
    ) -> Result<LoaderStatus> {
        let version = loader_version_dir(loader_url, version_id).ok_or_else(|| {
            InstallError::Configuration {
                message: format!("cannot tell which version '{}' installs", loader_url),
                field: Some("version_id".to_string()),
            }
        })?;

        self.ensure_version(ClientLayout::new(client_root), loader_url, version.clone())
            .instrument(info_span!("ensure_loader", version = %version))
            .await
    }

    async fn ensure_version(
        &self,
        layout: ClientLayout,
        loader_url: &str,
        version: String,
    ) -> Result<LoaderStatus> {
        self.ui.report_status(&format!("Checking loader for {}...", version));

        let scratch = layout.loader_scratch_dir();
        if layout.version_dir(&version).is_dir() {
            // Leftovers of an interrupted run
            remove_dir_if_exists(&scratch)?;
            info!("Loader {} already installed", version);
            self.ui.report_status(&format!("Loader {} already installed", version));
            return Ok(LoaderStatus::AlreadyInstalled { version });
        }

        self.ui.report_status("Downloading Loader...");
        let archive = layout.loader_archive_path();
        self.http
            .download_to_file(loader_url, &archive, Some(self.ui.clone().into_callback()))
            .await?;

        self.ui.report_status("Installing Loader...");
        let targets = vec![
            ("versions", layout.versions_dir()),
            ("libraries", layout.libraries_dir()),
        ];
        let (found, report) = tokio::task::spawn_blocking(move || {
            extract_and_merge_named(&archive, &scratch, &targets)
        })
        .await??;

        let (versions_merged, libraries_merged) = (found[0], found[1]);
        if !versions_merged && !libraries_merged {
            warn!(
                "Loader archive {} has neither a versions nor a libraries directory",
                loader_url
            );
        }
        debug!(
            "Loader {} merged {} files (versions: {}, libraries: {})",
            version, report.files_written, versions_merged, libraries_merged
        );

        Ok(LoaderStatus::Installed {
            version,
            versions_merged,
            libraries_merged,
            files_written: report.files_written,
        })
    }
}
