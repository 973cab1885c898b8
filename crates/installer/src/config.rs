//! Configuration types for the installer engine

use std::path::PathBuf;
use std::time::Duration;

use crate::error::{InstallError, Result};

/// Catalog published by the pack maintainers
pub const DEFAULT_CATALOG_URL: &str =
    "https://raw.githubusercontent.com/KevinAwesomeCoding/mods-folder/main/modpacks.json";

/// JVM arguments used when a pack does not carry its own
pub const DEFAULT_JVM_ARGS: &str = "-Xmx4G -XX:+UnlockExperimentalVMOptions -XX:+UseG1GC \
-XX:G1NewSizePercent=20 -XX:G1ReservePercent=20 -XX:MaxGCPauseMillis=50 -XX:G1HeapRegionSize=32M";

/// Name of the options template looked up next to the executable
pub const OPTIONS_TEMPLATE_NAME: &str = "base_options.txt";

/// Configuration for catalog loading and installs
#[derive(Debug, Clone)]
pub struct InstallerConfig {
    pub catalog_url: String,
    /// Local catalog file; takes precedence over `catalog_url` when set
    pub catalog_file: Option<PathBuf>,
    /// Overrides the per-OS client directory
    pub client_root: Option<PathBuf>,
    /// Template copied into every profile as `options.txt`
    pub options_template: Option<PathBuf>,
    pub user_agent: String,
    pub connect_timeout: Duration,
    /// Timeout for the catalog request
    pub catalog_timeout: Duration,
    /// Timeout for icon downloads
    pub icon_timeout: Duration,
    /// Longest wait for the response or the next chunk of a content or loader archive
    pub archive_timeout: Duration,
    /// Extra PEM bundle trusted alongside the platform store
    pub ca_bundle: Option<PathBuf>,
    /// Minimum time between two progress callbacks
    pub progress_interval: Duration,
    pub default_jvm_args: String,
    /// Edge length of normalized profile icons
    pub icon_size: u32,
    /// Where users should look for details when an install fails
    pub diagnostic_log: Option<PathBuf>,
}

impl Default for InstallerConfig {
    fn default() -> Self {
        Self {
            catalog_url: DEFAULT_CATALOG_URL.to_string(),
            catalog_file: None,
            client_root: None,
            options_template: default_options_template(),
            user_agent: format!("modpack-installer/{}", env!("CARGO_PKG_VERSION")),
            connect_timeout: Duration::from_secs(15),
            catalog_timeout: Duration::from_secs(10),
            icon_timeout: Duration::from_secs(10),
            archive_timeout: Duration::from_secs(120), // idle, not a total deadline
            ca_bundle: None,
            progress_interval: Duration::from_millis(100),
            default_jvm_args: DEFAULT_JVM_ARGS.to_string(),
            icon_size: 128,
            diagnostic_log: None,
        }
    }
}

impl InstallerConfig {
    /// Load configuration from the process environment and an optional `.env` file
    ///
    /// Recognised variables: `MODPACK_CATALOG_URL`, `MODPACK_CATALOG_FILE`,
    /// `MODPACK_CLIENT_ROOT`, `MODPACK_OPTIONS_TEMPLATE`, `MODPACK_USER_AGENT`,
    /// `MODPACK_CA_BUNDLE` (falls back to `SSL_CERT_FILE`), `MODPACK_ARCHIVE_TIMEOUT_SECS`
    /// and `MODPACK_DIAGNOSTIC_LOG`.
    pub fn from_env() -> Result<Self> {
        dotenv::dotenv().ok(); // Ignore error if .env not present
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let mut config = Self::default();

        if let Some(url) = get("MODPACK_CATALOG_URL") {
            config.catalog_url = url;
        }
        config.catalog_file = get("MODPACK_CATALOG_FILE").map(PathBuf::from);
        config.client_root = get("MODPACK_CLIENT_ROOT").map(PathBuf::from);
        if let Some(template) = get("MODPACK_OPTIONS_TEMPLATE") {
            config.options_template = Some(PathBuf::from(template));
        }
        if let Some(agent) = get("MODPACK_USER_AGENT") {
            config.user_agent = agent;
        }
        config.ca_bundle = get("MODPACK_CA_BUNDLE")
            .or_else(|| get("SSL_CERT_FILE"))
            .map(PathBuf::from);
        if let Some(secs) = get("MODPACK_ARCHIVE_TIMEOUT_SECS") {
            let secs = secs.trim().parse::<u64>().map_err(|e| InstallError::Configuration {
                message: format!(
                    "MODPACK_ARCHIVE_TIMEOUT_SECS must be a whole number of seconds: {}",
                    e
                ),
                field: Some("archive_timeout".to_string()),
            })?;
            config.archive_timeout = Duration::from_secs(secs);
        }
        config.diagnostic_log = get("MODPACK_DIAGNOSTIC_LOG").map(PathBuf::from);

        config.validate()?;
        Ok(config)
    }

    pub fn with_catalog_url<S: Into<String>>(mut self, url: S) -> Self {
        self.catalog_url = url.into();
        self
    }

    pub fn with_catalog_file<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.catalog_file = Some(path.into());
        self
    }

    pub fn with_client_root<P: Into<PathBuf>>(mut self, root: P) -> Self {
        self.client_root = Some(root.into());
        self
    }

    pub fn with_options_template(mut self, template: Option<PathBuf>) -> Self {
        self.options_template = template;
        self
    }

    pub fn with_user_agent<S: Into<String>>(mut self, user_agent: S) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    pub fn with_ca_bundle<P: Into<PathBuf>>(mut self, bundle: P) -> Self {
        self.ca_bundle = Some(bundle.into());
        self
    }

    pub fn with_archive_timeout(mut self, timeout: Duration) -> Self {
        self.archive_timeout = timeout;
        self
    }

    pub fn with_progress_interval(mut self, interval: Duration) -> Self {
        self.progress_interval = interval;
        self
    }

    pub fn with_diagnostic_log<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.diagnostic_log = Some(path.into());
        self
    }

    /// Reject values the engine cannot work with
    pub fn validate(&self) -> Result<()> {
        if self.catalog_file.is_none() && self.catalog_url.trim().is_empty() {
            return Err(InstallError::Configuration {
                message: "either a catalog URL or a catalog file is required".to_string(),
                field: Some("catalog_url".to_string()),
            });
        }
        if self.icon_size == 0 {
            return Err(InstallError::Configuration {
                message: "icon size must be positive".to_string(),
                field: Some("icon_size".to_string()),
            });
        }
        if self.user_agent.trim().is_empty() {
            return Err(InstallError::Configuration {
                message: "user agent must not be empty".to_string(),
                field: Some("user_agent".to_string()),
            });
        }
        Ok(())
    }
}

fn default_options_template() -> Option<PathBuf> {
    std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(|dir| dir.join(OPTIONS_TEMPLATE_NAME)))
}
