//! Launcher profile registry (`launcher_profiles.json`)
//!
//! The registry is owned by the game launcher. We only ever replace our own
//! entries under `profiles`, keep everything else as found, and leave a `.bak`
//! copy of the previous file next to it before every write.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, warn};

use crate::error::{FileOperation, InstallError, Result};

pub const REGISTRY_FILE_NAME: &str = "launcher_profiles.json";

/// Launcher profile type for user-created installations
pub const CUSTOM_PROFILE_TYPE: &str = "custom";

/// One entry of the registry's `profiles` object
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileRecord {
    #[serde(default)]
    pub created: String,
    #[serde(default)]
    pub game_dir: String,
    #[serde(default)]
    pub icon: String,
    #[serde(default)]
    pub java_args: String,
    #[serde(default)]
    pub last_used: String,
    #[serde(default)]
    pub last_version_id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default, rename = "type")]
    pub profile_type: String,
}

impl ProfileRecord {
    /// A `custom` profile created and last used at `now`
    pub fn custom(
        name: impl Into<String>,
        game_dir: &Path,
        icon: impl Into<String>,
        java_args: impl Into<String>,
        version_id: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Self {
        let stamp = registry_timestamp(now);
        Self {
            created: stamp.clone(),
            game_dir: game_dir.display().to_string(),
            icon: icon.into(),
            java_args: java_args.into(),
            last_used: stamp,
            last_version_id: version_id.into(),
            name: name.into(),
            profile_type: CUSTOM_PROFILE_TYPE.to_string(),
        }
    }
}

/// Registry key for a profile name
pub fn profile_id_for(profile_name: &str) -> String {
    profile_name.replace(' ', "_")
}

/// RFC 3339, UTC, millisecond precision (`2024-05-01T12:00:00.000Z`)
pub fn registry_timestamp(now: DateTime<Utc>) -> String {
    now.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Where the previous registry is kept before an overwrite
pub fn backup_path(registry_path: &Path) -> PathBuf {
    with_suffix(registry_path, ".bak")
}

fn with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(suffix);
    PathBuf::from(name)
}

async fn read_registry(registry_path: &Path) -> Result<Map<String, Value>> {
    let text = match fs::read_to_string(registry_path).await {
        Ok(text) => text,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(InstallError::RegistryMissing {
                path: registry_path.to_path_buf(),
            });
        }
        Err(e) => return Err(InstallError::fs(registry_path, FileOperation::Read, e)),
    };

    let document: Value = serde_json::from_str(&text).map_err(|e| InstallError::RegistryInvalid {
        path: registry_path.to_path_buf(),
        reason: e.to_string(),
    })?;

    match document {
        Value::Object(root) => Ok(root),
        _ => Err(InstallError::RegistryInvalid {
            path: registry_path.to_path_buf(),
            reason: "top level is not an object".to_string(),
        }),
    }
}

/// Look up an existing entry
///
/// An entry that does not look like a profile record is treated as absent.
pub async fn read_profile(registry_path: &Path, profile_id: &str) -> Result<Option<ProfileRecord>> {
    let root = read_registry(registry_path).await?;
    let Some(entry) = root.get("profiles").and_then(|p| p.get(profile_id)) else {
        return Ok(None);
    };

    match serde_json::from_value::<ProfileRecord>(entry.clone()) {
        Ok(record) => Ok(Some(record)),
        Err(e) => {
            warn!("Ignoring unreadable profile entry '{}': {}", profile_id, e);
            Ok(None)
        }
    }
}

/// Insert or replace the entry for `profile_id`
pub async fn upsert_profile(
    registry_path: &Path,
    profile_id: &str,
    record: &ProfileRecord,
) -> Result<()> {
    let mut root = read_registry(registry_path).await?;

    let profiles = root
        .entry("profiles")
        .or_insert_with(|| Value::Object(Map::new()))
        .as_object_mut()
        .ok_or_else(|| InstallError::RegistryInvalid {
            path: registry_path.to_path_buf(),
            reason: "'profiles' is not an object".to_string(),
        })?;

    let value = serde_json::to_value(record).map_err(|e| InstallError::RegistryInvalid {
        path: registry_path.to_path_buf(),
        reason: format!("profile entry could not be encoded: {}", e),
    })?;
    profiles.insert(profile_id.to_string(), value);

    let backup = backup_path(registry_path);
    fs::copy(registry_path, &backup)
        .await
        .map_err(InstallError::fs_with(&backup, FileOperation::Copy))?;

    let mut text = serde_json::to_string_pretty(&Value::Object(root)).map_err(|e| {
        InstallError::RegistryInvalid {
            path: registry_path.to_path_buf(),
            reason: e.to_string(),
        }
    })?;
    text.push('\n');

    let temp_path = with_suffix(registry_path, ".tmp");
    fs::write(&temp_path, text)
        .await
        .map_err(InstallError::fs_with(&temp_path, FileOperation::Write))?;
    fs::rename(&temp_path, registry_path)
        .await
        .map_err(InstallError::fs_with(registry_path, FileOperation::Rename))?;

    debug!("Registered profile '{}' in {}", profile_id, registry_path.display());
    Ok(())
}
