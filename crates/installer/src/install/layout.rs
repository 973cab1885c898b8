//! On-disk layout of the game client directory

use std::path::{Path, PathBuf};

use super::registry::REGISTRY_FILE_NAME;
use crate::config::InstallerConfig;
use crate::error::{InstallError, Result};

/// Paths under the client root (`.minecraft`)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientLayout {
    root: PathBuf,
}

impl ClientLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Use the configured root, or the platform default
    pub fn from_config(config: &InstallerConfig) -> Result<Self> {
        config
            .client_root
            .clone()
            .or_else(default_client_root)
            .map(Self::new)
            .ok_or_else(|| InstallError::ClientNotFound {
                path: PathBuf::from(".minecraft"),
            })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn versions_dir(&self) -> PathBuf {
        self.root.join("versions")
    }

    pub fn version_dir(&self, version_id: &str) -> PathBuf {
        self.versions_dir().join(version_id)
    }

    pub fn libraries_dir(&self) -> PathBuf {
        self.root.join("libraries")
    }

    pub fn profiles_dir(&self) -> PathBuf {
        self.root.join("profiles")
    }

    pub fn profile(&self, folder_name: &str) -> ProfileLayout {
        ProfileLayout::new(self.profiles_dir().join(folder_name))
    }

    pub fn registry_path(&self) -> PathBuf {
        self.root.join(REGISTRY_FILE_NAME)
    }

    pub fn loader_archive_path(&self) -> PathBuf {
        self.root.join("temp_loader.zip")
    }

    pub fn loader_scratch_dir(&self) -> PathBuf {
        self.root.join("temp_loader_extract")
    }

    pub fn ensure_exists(&self) -> Result<()> {
        if self.root.is_dir() {
            Ok(())
        } else {
            Err(InstallError::ClientNotFound {
                path: self.root.clone(),
            })
        }
    }

    pub fn ensure_registry(&self) -> Result<()> {
        let registry = self.registry_path();
        if registry.is_file() {
            Ok(())
        } else {
            Err(InstallError::RegistryMissing { path: registry })
        }
    }
}

/// Paths inside one installed pack's game directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProfileLayout {
    dir: PathBuf,
}

impl ProfileLayout {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn mods_dir(&self) -> PathBuf {
        self.dir.join("mods")
    }

    pub fn options_path(&self) -> PathBuf {
        self.dir.join("options.txt")
    }

    pub fn icon_path(&self) -> PathBuf {
        self.dir.join("icon.png")
    }

    pub fn archive_path(&self) -> PathBuf {
        self.dir.join("temp.zip")
    }

    pub fn scratch_dir(&self) -> PathBuf {
        self.dir.join("temp_extract_mods")
    }
}

/// Platform data directory of the game client
///
/// `%APPDATA%\.minecraft` on Windows, `~/Library/Application Support/minecraft`
/// on macOS, `~/.minecraft` elsewhere.
pub fn default_client_root() -> Option<PathBuf> {
    if cfg!(target_os = "windows") {
        dirs::data_dir().map(|d| d.join(".minecraft"))
    } else if cfg!(target_os = "macos") {
        dirs::data_dir().map(|d| d.join("minecraft"))
    } else {
        dirs::home_dir().map(|d| d.join(".minecraft"))
    }
}
