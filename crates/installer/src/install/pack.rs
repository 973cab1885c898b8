//! Installing and updating one pack as a launcher profile

use chrono::Utc;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs;
use tracing::{debug, info, info_span, Instrument};

use super::archive::{spawn_extract_and_merge, MergeMode, MergeReport};
use super::icon::IconResolver;
use super::layout::{ClientLayout, ProfileLayout};
use super::loader::{LoaderInstaller, LoaderStatus};
use super::registry::{read_profile, registry_timestamp, upsert_profile, ProfileRecord};
use crate::catalog::PackDefinition;
use crate::config::InstallerConfig;
use crate::downloader::HttpClient;
use crate::error::{FileOperation, InstallError, Result};
use crate::integrations::ui::{InstallerUi, IntoProgressCallback};

/// Operating system used to pick a pack's download URL
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostOs {
    Windows,
    MacOs,
    Other,
}

impl HostOs {
    pub fn current() -> Self {
        if cfg!(target_os = "windows") {
            HostOs::Windows
        } else if cfg!(target_os = "macos") {
            HostOs::MacOs
        } else {
            HostOs::Other
        }
    }
}

/// The content archive for `os`, falling back to the generic `url`
pub fn resolve_download_url(pack: &PackDefinition, os: HostOs) -> &str {
    let overridden = match os {
        HostOs::Windows => pack.windows_url.as_deref(),
        HostOs::MacOs => pack.mac_url.as_deref(),
        HostOs::Other => None,
    };
    overridden.unwrap_or(&pack.url)
}

/// JVM arguments written to the profile
///
/// The pack's own arguments (or `default_args`) followed by the target
/// directory property pointing at the profile. The path is quoted when it
/// contains whitespace.
pub fn resolve_jvm_args(pack_args: Option<&str>, default_args: &str, profile_dir: &Path) -> String {
    let base = pack_args.unwrap_or(default_args).trim();
    let dir = profile_dir.display().to_string();
    let dir = if dir.chars().any(char::is_whitespace) {
        format!("\"{}\"", dir)
    } else {
        dir
    };
    format!("{} -Dminecraft.applet.TargetDirectory={}", base, dir)
}

/// What an install or update ended with
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InstallOutcome {
    Installed {
        profile_id: String,
        profile_dir: PathBuf,
        loader: LoaderStatus,
        merge: MergeReport,
    },
    Updated {
        profile_id: String,
        profile_dir: PathBuf,
        loader: LoaderStatus,
        merge: MergeReport,
    },
    /// The user declined to update an existing profile; nothing was changed
    Cancelled { profile_dir: PathBuf },
}

pub struct PackInstaller {
    config: InstallerConfig,
    http: HttpClient,
    ui: Arc<dyn InstallerUi>,
    host_os: HostOs,
}

impl PackInstaller {
    pub fn new(config: InstallerConfig, ui: Arc<dyn InstallerUi>) -> Result<Self> {
        let http = HttpClient::from_config(&config)?;
        Ok(Self {
            config,
            http,
            ui,
            host_os: HostOs::current(),
        })
    }

    pub fn with_host_os(mut self, host_os: HostOs) -> Self {
        self.host_os = host_os;
        self
    }

    pub fn config(&self) -> &InstallerConfig {
        &self.config
    }

    pub fn ui(&self) -> &Arc<dyn InstallerUi> {
        &self.ui
    }

    /// Install `pack` under `client_root`, or update it in place after the
    /// user confirms
    ///
    /// The client directory and the launcher's profile registry must already
    /// exist; both are checked before anything is downloaded. Failures leave
    /// whatever was already written in place.
    pub async fn install_or_update(
        &self,
        client_root: &Path,
        pack: &PackDefinition,
    ) -> Result<InstallOutcome> {
        self.run(ClientLayout::new(client_root), pack)
            .instrument(info_span!("install_pack", folder = %pack.folder_name))
            .await
    }

    async fn run(&self, layout: ClientLayout, pack: &PackDefinition) -> Result<InstallOutcome> {
        layout.ensure_exists()?;
        layout.ensure_registry()?;

        let download_url = resolve_download_url(pack, self.host_os);
        debug!("Using {} for {:?}", download_url, self.host_os);

        let loader = LoaderInstaller::new(self.http.clone(), self.ui.clone())
            .ensure_loader(layout.root(), &pack.loader_url, Some(&pack.version_id))
            .await?;

        let profile = layout.profile(&pack.folder_name);
        let updating = profile.dir().is_dir();
        if updating {
            let prompt = format!(
                "'{}' is already installed. Update it? Your worlds and settings are kept.",
                pack.profile_name
            );
            if !self.ui.confirm(&prompt).await {
                info!("Update of {} declined", pack.folder_name);
                self.ui.report_status("Update cancelled");
                return Ok(InstallOutcome::Cancelled {
                    profile_dir: profile.dir().to_path_buf(),
                });
            }
        } else {
            fs::create_dir_all(profile.dir())
                .await
                .map_err(InstallError::fs_with(profile.dir(), FileOperation::CreateDir))?;
        }

        self.seed_options(&profile).await?;

        self.ui.report_status(&format!("Downloading {}...", pack.profile_name));
        self.http
            .download_to_file(
                download_url,
                &profile.archive_path(),
                Some(self.ui.clone().into_callback()),
            )
            .await?;

        self.ui.report_status("Extracting mods...");
        let merge = spawn_extract_and_merge(
            profile.archive_path(),
            profile.scratch_dir(),
            profile.dir().to_path_buf(),
            MergeMode::for_pack(pack.is_complex),
        )
        .await?;
        debug!("Merged {} files into {}", merge.files_written, profile.dir().display());

        let icon = IconResolver::new(self.http.clone(), &self.config)
            .resolve(pack, &profile.icon_path(), self.ui.as_ref())
            .await;

        let profile_id = pack.profile_id();
        self.register(&layout, &profile, pack, &profile_id, icon).await?;

        info!(
            "{} {} ({} files)",
            if updating { "Updated" } else { "Installed" },
            pack.folder_name,
            merge.files_written
        );

        let profile_dir = profile.dir().to_path_buf();
        Ok(if updating {
            InstallOutcome::Updated {
                profile_id,
                profile_dir,
                loader,
                merge,
            }
        } else {
            InstallOutcome::Installed {
                profile_id,
                profile_dir,
                loader,
                merge,
            }
        })
    }

    /// Copy the options template to `options.txt`, replacing any existing one
    async fn seed_options(&self, profile: &ProfileLayout) -> Result<()> {
        let Some(template) = self.config.options_template.as_deref() else {
            return Ok(());
        };
        if !template.is_file() {
            debug!("No options template at {}", template.display());
            return Ok(());
        }

        let target = profile.options_path();
        fs::copy(template, &target)
            .await
            .map_err(InstallError::fs_with(&target, FileOperation::Copy))?;
        Ok(())
    }

    async fn register(
        &self,
        layout: &ClientLayout,
        profile: &ProfileLayout,
        pack: &PackDefinition,
        profile_id: &str,
        icon: String,
    ) -> Result<()> {
        let registry = layout.registry_path();
        let java_args = resolve_jvm_args(
            pack.jvm_args.as_deref(),
            &self.config.default_jvm_args,
            profile.dir(),
        );

        let now = Utc::now();
        let mut record = ProfileRecord::custom(
            pack.profile_name.clone(),
            profile.dir(),
            icon,
            java_args,
            pack.version_id.clone(),
            now,
        );
        if let Some(previous) = read_profile(&registry, profile_id).await? {
            if !previous.created.is_empty() {
                record.created = previous.created;
            }
        }
        record.last_used = registry_timestamp(now);

        upsert_profile(&registry, profile_id, &record).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pack() -> PackDefinition {
        PackDefinition {
            profile_name: "Alpha Pack".to_string(),
            folder_name: "Alpha".to_string(),
            version_id: "forge-47".to_string(),
            icon: "Furnace".to_string(),
            icon_url: None,
            url: "https://example.com/alpha.zip".to_string(),
            mac_url: Some("https://example.com/alpha-mac.zip".to_string()),
            windows_url: None,
            loader_url: "https://example.com/forge-47.zip".to_string(),
            is_complex: false,
            description: None,
            rating: None,
            jvm_args: None,
        }
    }

    #[test]
    fn test_platform_url_selection() {
        let pack = pack();
        assert_eq!(resolve_download_url(&pack, HostOs::MacOs), "https://example.com/alpha-mac.zip");
        // No Windows override, generic URL
        assert_eq!(resolve_download_url(&pack, HostOs::Windows), "https://example.com/alpha.zip");
        assert_eq!(resolve_download_url(&pack, HostOs::Other), "https://example.com/alpha.zip");
    }

    #[test]
    fn test_jvm_args_append_target_directory() {
        let args = resolve_jvm_args(None, "-Xmx4G", Path::new("/mc/profiles/Alpha"));
        assert_eq!(args, "-Xmx4G -Dminecraft.applet.TargetDirectory=/mc/profiles/Alpha");

        let spaced = Path::new("/Users/me/My Games/Alpha");
        let args = resolve_jvm_args(Some(" -Xmx8G "), "-Xmx4G", spaced);
        assert_eq!(
            args,
            "-Xmx8G -Dminecraft.applet.TargetDirectory=\"/Users/me/My Games/Alpha\""
        );
    }
}
