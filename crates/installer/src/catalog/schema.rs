//! Pack definition schema
//!
//! Catalog entries are deserialized into [`RawPackEntry`] exactly as they appear
//! in the JSON, then validated into an immutable [`PackDefinition`].

use serde::{Deserialize, Deserializer};
use std::path::{Component, Path};

use crate::install::registry::profile_id_for;

/// Raw catalog entry as it appears in `modpacks.json`
#[derive(Debug, Clone, Deserialize)]
pub struct RawPackEntry {
    pub profile_name: String,
    pub folder_name: String,
    #[serde(default)]
    pub version_id: Option<String>,
    pub icon: String,
    #[serde(default)]
    pub icon_url: Option<String>,
    pub url: String,
    #[serde(default)]
    pub mac_url: Option<String>,
    #[serde(default)]
    pub windows_url: Option<String>,
    pub loader_url: String,
    #[serde(default)]
    pub is_complex: bool,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default, deserialize_with = "display_string")]
    pub rating: Option<String>,
    #[serde(default)]
    pub jvm_args: Option<String>,
}

/// A validated, installable pack
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackDefinition {
    pub profile_name: String,
    /// Directory under `profiles/`; the pack's identity on disk
    pub folder_name: String,
    pub version_id: String,
    pub icon: String,
    pub icon_url: Option<String>,
    pub url: String,
    pub mac_url: Option<String>,
    pub windows_url: Option<String>,
    pub loader_url: String,
    pub is_complex: bool,
    pub description: Option<String>,
    pub rating: Option<String>,
    pub jvm_args: Option<String>,
}

impl PackDefinition {
    /// Validate a raw entry
    pub fn from_raw(raw: RawPackEntry) -> Result<Self, String> {
        let profile_name = required("profile_name", raw.profile_name)?;
        let folder_name = required("folder_name", raw.folder_name)?;
        if !is_single_component(&folder_name) {
            return Err(format!(
                "folder_name '{}' must be a plain directory name",
                folder_name
            ));
        }

        let url = required("url", raw.url)?;
        check_url("url", &url)?;
        let loader_url = required("loader_url", raw.loader_url)?;
        check_url("loader_url", &loader_url)?;

        let mac_url = optional(raw.mac_url);
        let windows_url = optional(raw.windows_url);
        let icon_url = optional(raw.icon_url);
        for (field, value) in [
            ("mac_url", &mac_url),
            ("windows_url", &windows_url),
            ("icon_url", &icon_url),
        ] {
            if let Some(value) = value {
                check_url(field, value)?;
            }
        }

        let version_id = match optional(raw.version_id) {
            Some(version) => version,
            None => version_from_loader_url(&loader_url).ok_or_else(|| {
                format!(
                    "version_id is missing and cannot be derived from loader_url '{}'",
                    loader_url
                )
            })?,
        };
        if !is_single_component(&version_id) {
            return Err(format!(
                "version_id '{}' must be a plain directory name",
                version_id
            ));
        }

        Ok(Self {
            profile_name,
            folder_name,
            version_id,
            icon: required("icon", raw.icon)?,
            icon_url,
            url,
            mac_url,
            windows_url,
            loader_url,
            is_complex: raw.is_complex,
            description: optional(raw.description),
            rating: optional(raw.rating),
            jvm_args: optional(raw.jvm_args),
        })
    }

    /// Key of this pack's entry in the launcher profile registry
    pub fn profile_id(&self) -> String {
        profile_id_for(&self.profile_name)
    }
}

/// Name of the version directory a loader archive installs
///
/// Uses the explicit `version_id` when given, otherwise the last path segment of
/// `loader_url` without its archive extension. `None` unless the result is a
/// single path component.
pub fn loader_version_dir(loader_url: &str, version_id: Option<&str>) -> Option<String> {
    let version = match version_id.map(str::trim).filter(|v| !v.is_empty()) {
        Some(version) => version.to_string(),
        None => version_from_loader_url(loader_url)?,
    };
    is_single_component(&version).then_some(version)
}

fn version_from_loader_url(loader_url: &str) -> Option<String> {
    let parsed = url::Url::parse(loader_url).ok()?;
    let segment = parsed.path_segments()?.filter(|s| !s.is_empty()).last()?;
    let lower = segment.to_ascii_lowercase();

    let stem = [".zip", ".jar"]
        .iter()
        .find(|ext| lower.ends_with(*ext))
        .map(|ext| &segment[..segment.len() - ext.len()])
        .unwrap_or(segment);

    if stem.is_empty() {
        None
    } else {
        Some(stem.to_string())
    }
}

fn required(field: &str, value: String) -> Result<String, String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(format!("{} must not be empty", field));
    }
    Ok(trimmed.to_string())
}

fn optional(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn check_url(field: &str, value: &str) -> Result<(), String> {
    url::Url::parse(value)
        .map(|_| ())
        .map_err(|e| format!("{} '{}' is not a valid URL: {}", field, value, e))
}

fn is_single_component(name: &str) -> bool {
    if name.contains('/') || name.contains('\\') {
        return false;
    }
    let mut components = Path::new(name).components();
    matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    )
}

/// Accept strings, numbers and booleans for display-only fields
fn display_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        None | Some(serde_json::Value::Null) => None,
        Some(serde_json::Value::String(s)) => Some(s),
        Some(other @ (serde_json::Value::Number(_) | serde_json::Value::Bool(_))) => {
            Some(other.to_string())
        }
        Some(_) => {
            return Err(serde::de::Error::custom("expected a string or a number"));
        }
    })
}
