//! Error types for the installer engine with context and recovery information

use std::error::Error;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Every failure the engine can surface to its caller
#[derive(Error, Debug)]
pub enum InstallError {
    /// The catalog could not be fetched or parsed
    #[error("Catalog unavailable from '{source_name}': {reason}")]
    CatalogUnavailable {
        source_name: String,
        reason: String,
    },

    /// The catalog document has the wrong shape
    #[error("Catalog is invalid: {reason}")]
    CatalogInvalid { reason: String },

    /// The game client's data directory does not exist
    #[error("Game client not found at '{path}'")]
    ClientNotFound { path: PathBuf },

    /// The launcher's profile registry does not exist yet
    #[error("Launcher profile registry not found at '{path}'")]
    RegistryMissing { path: PathBuf },

    /// The profile registry exists but cannot be understood
    #[error("Launcher profile registry '{path}' is invalid: {reason}")]
    RegistryInvalid { path: PathBuf, reason: String },

    /// HTTP-related errors with context
    #[error("HTTP request to '{url}' failed")]
    HttpRequest {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// Server answered with a non-success status
    #[error("Request to '{url}' returned HTTP {status}")]
    HttpStatus { url: String, status: u16 },

    /// Network timeout
    #[error("Request to '{url}' timed out after {duration_secs}s")]
    NetworkTimeout { url: String, duration_secs: u64 },

    /// URL parsing errors with helpful suggestions
    #[error("Invalid URL '{url}': {suggestion}")]
    InvalidUrl {
        url: String,
        suggestion: String,
        #[source]
        source: url::ParseError,
    },

    /// Corrupt or unreadable zip archive
    #[error("Archive '{path}' could not be extracted")]
    Archive {
        path: PathBuf,
        #[source]
        source: zip::result::ZipError,
    },

    /// File system I/O errors with file context
    #[error("File operation failed while {operation} '{path}'")]
    FileSystem {
        path: PathBuf,
        operation: FileOperation,
        #[source]
        source: std::io::Error,
    },

    /// Configuration errors
    #[error("Invalid configuration: {message}")]
    Configuration {
        message: String,
        field: Option<String>,
    },

    /// A background task died before it could report
    #[error("Background task failed: {reason}")]
    TaskFailed { reason: String },
}

/// Closed classification of [`InstallError`] used by callers to decide what to show
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    CatalogUnavailable,
    CatalogInvalid,
    ClientNotFound,
    RegistryMissing,
    RegistryInvalid,
    Download,
    Archive,
    FileSystem,
    Configuration,
    Internal,
}

/// Types of file operations for error context
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileOperation {
    Read,
    Write,
    Create,
    Copy,
    Delete,
    Rename,
    Metadata,
    CreateDir,
    ReadDir,
}

impl std::fmt::Display for FileOperation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FileOperation::Read => write!(f, "reading"),
            FileOperation::Write => write!(f, "writing"),
            FileOperation::Create => write!(f, "creating"),
            FileOperation::Copy => write!(f, "copying"),
            FileOperation::Delete => write!(f, "deleting"),
            FileOperation::Rename => write!(f, "renaming"),
            FileOperation::Metadata => write!(f, "reading metadata of"),
            FileOperation::CreateDir => write!(f, "creating directory"),
            FileOperation::ReadDir => write!(f, "listing directory"),
        }
    }
}

pub type Result<T> = std::result::Result<T, InstallError>;

impl InstallError {
    /// Build a file system error for `path`
    pub fn fs(path: impl AsRef<Path>, operation: FileOperation, source: std::io::Error) -> Self {
        InstallError::FileSystem {
            path: path.as_ref().to_path_buf(),
            operation,
            source,
        }
    }

    /// Closure form of [`InstallError::fs`] for `map_err`
    pub fn fs_with(
        path: impl AsRef<Path>,
        operation: FileOperation,
    ) -> impl FnOnce(std::io::Error) -> Self {
        let path = path.as_ref().to_path_buf();
        move |source| InstallError::FileSystem { path, operation, source }
    }

    /// Map a reqwest failure, recognising timeouts
    pub fn from_reqwest(url: &str, error: reqwest::Error, timeout_secs: u64) -> Self {
        if error.is_timeout() {
            InstallError::NetworkTimeout {
                url: url.to_string(),
                duration_secs: timeout_secs,
            }
        } else {
            InstallError::HttpRequest {
                url: url.to_string(),
                source: error,
            }
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            InstallError::CatalogUnavailable { .. } => ErrorKind::CatalogUnavailable,
            InstallError::CatalogInvalid { .. } => ErrorKind::CatalogInvalid,
            InstallError::ClientNotFound { .. } => ErrorKind::ClientNotFound,
            InstallError::RegistryMissing { .. } => ErrorKind::RegistryMissing,
            InstallError::RegistryInvalid { .. } => ErrorKind::RegistryInvalid,
            InstallError::HttpRequest { .. }
            | InstallError::HttpStatus { .. }
            | InstallError::NetworkTimeout { .. }
            | InstallError::InvalidUrl { .. } => ErrorKind::Download,
            InstallError::Archive { .. } => ErrorKind::Archive,
            InstallError::FileSystem { .. } => ErrorKind::FileSystem,
            InstallError::Configuration { .. } => ErrorKind::Configuration,
            InstallError::TaskFailed { .. } => ErrorKind::Internal,
        }
    }

    /// Get error category for logging
    pub fn category(&self) -> &'static str {
        match self {
            InstallError::CatalogUnavailable { .. } => "catalog_unavailable",
            InstallError::CatalogInvalid { .. } => "catalog_invalid",
            InstallError::ClientNotFound { .. } => "client_not_found",
            InstallError::RegistryMissing { .. } => "registry_missing",
            InstallError::RegistryInvalid { .. } => "registry_invalid",
            InstallError::HttpRequest { .. } => "http_request",
            InstallError::HttpStatus { .. } => "http_status",
            InstallError::NetworkTimeout { .. } => "network_timeout",
            InstallError::InvalidUrl { .. } => "invalid_url",
            InstallError::Archive { .. } => "archive",
            InstallError::FileSystem { .. } => "file_system",
            InstallError::Configuration { .. } => "configuration",
            InstallError::TaskFailed { .. } => "task_failed",
        }
    }

    /// Get user-friendly suggestion for resolving the error
    pub fn suggestion(&self) -> Option<&str> {
        match self {
            InstallError::CatalogUnavailable { .. } => {
                Some("Check your internet connection and refresh the pack list")
            }
            InstallError::ClientNotFound { .. } => {
                Some("Install the game client, or point the installer at its data directory")
            }
            InstallError::RegistryMissing { .. } => {
                Some("Run the game launcher once so it creates its profile list, then try again")
            }
            InstallError::RegistryInvalid { .. } => {
                Some("Restore launcher_profiles.json from its .bak copy or rerun the launcher")
            }
            InstallError::NetworkTimeout { .. } => {
                Some("Check your internet connection or try again later")
            }
            InstallError::InvalidUrl { suggestion, .. } => Some(suggestion),
            InstallError::Archive { .. } => {
                Some("The downloaded archive is damaged; try the install again")
            }
            InstallError::FileSystem { source, .. }
                if source.kind() == std::io::ErrorKind::PermissionDenied =>
            {
                Some("Close the game and check that the game folder is writable")
            }
            _ => None,
        }
    }

    /// Single human-readable message for the presentation layer
    pub fn user_message(&self) -> String {
        match self.suggestion() {
            Some(suggestion) => format!("{}. {}", self, suggestion),
            None => self.to_string(),
        }
    }

    /// Create a detailed error report for debugging
    pub fn detailed_report(&self) -> String {
        let mut report = format!("Error: {}\n", self);
        report.push_str(&format!("Category: {}\n", self.category()));
        report.push_str(&format!("Kind: {:?}\n", self.kind()));

        if let Some(suggestion) = self.suggestion() {
            report.push_str(&format!("Suggestion: {}\n", suggestion));
        }

        if let Some(source) = self.source() {
            report.push_str(&format!("Root cause: {}\n", source));
        }

        report
    }
}

impl From<url::ParseError> for InstallError {
    fn from(error: url::ParseError) -> Self {
        let suggestion = match error {
            url::ParseError::EmptyHost => "URL must have a valid hostname",
            url::ParseError::InvalidPort => "Port number must be between 1 and 65535",
            url::ParseError::RelativeUrlWithoutBase => {
                "URL must be absolute (include http:// or https://)"
            }
            _ => "Check URL format and try again",
        }
        .to_string();

        InstallError::InvalidUrl {
            url: "<unparseable>".to_string(),
            suggestion,
            source: error,
        }
    }
}

impl From<tokio::task::JoinError> for InstallError {
    fn from(error: tokio::task::JoinError) -> Self {
        InstallError::TaskFailed {
            reason: error.to_string(),
        }
    }
}
