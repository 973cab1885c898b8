//! Profile icons
//!
//! The launcher shows either a built-in icon keyword or an embedded
//! `data:image/png;base64,...` string. Remote icons are normalized to a square
//! RGBA PNG, written next to the profile and embedded. Icon trouble never fails
//! an install.

use anyhow::Context;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use image::{imageops::FilterType, DynamicImage, ImageFormat};
use std::io::Cursor;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, warn};

use crate::catalog::PackDefinition;
use crate::config::InstallerConfig;
use crate::downloader::HttpClient;
use crate::integrations::ui::InstallerUi;

pub struct IconResolver {
    http: HttpClient,
    timeout: Duration,
    size: u32,
}

impl IconResolver {
    pub fn new(http: HttpClient, config: &InstallerConfig) -> Self {
        Self {
            http,
            timeout: config.icon_timeout,
            size: config.icon_size,
        }
    }

    /// Registry icon value for `pack`
    ///
    /// Tries `icon_url` first (saving `icon_path` on success), then the UI's
    /// fallback, then the catalog's `icon` value.
    pub async fn resolve(
        &self,
        pack: &PackDefinition,
        icon_path: &Path,
        ui: &dyn InstallerUi,
    ) -> String {
        let Some(icon_url) = pack.icon_url.as_deref() else {
            return pack.icon.clone();
        };

        match self.fetch(icon_url, icon_path).await {
            Ok(data_uri) => data_uri,
            Err(e) => {
                warn!("Icon for '{}' unavailable: {:#}", pack.profile_name, e);
                match ui.select_icon_fallback(pack).await {
                    Some(chosen) => chosen,
                    None => pack.icon.clone(),
                }
            }
        }
    }

    async fn fetch(&self, icon_url: &str, icon_path: &Path) -> anyhow::Result<String> {
        let bytes = self.http.get_bytes(icon_url, self.timeout).await?;
        let size = self.size;
        let png = tokio::task::spawn_blocking(move || normalize_icon(&bytes, size)).await??;

        tokio::fs::write(icon_path, &png)
            .await
            .with_context(|| format!("writing {}", icon_path.display()))?;
        debug!("Saved {} byte icon to {}", png.len(), icon_path.display());

        Ok(png_data_uri(&png))
    }
}

/// Decode any supported image and re-encode it as a `size`×`size` RGBA PNG
pub fn normalize_icon(bytes: &[u8], size: u32) -> anyhow::Result<Vec<u8>> {
    let decoded = image::load_from_memory(bytes).context("decoding icon")?;
    let resized = decoded.resize_exact(size, size, FilterType::Lanczos3).to_rgba8();

    let mut png = Cursor::new(Vec::new());
    DynamicImage::ImageRgba8(resized)
        .write_to(&mut png, ImageFormat::Png)
        .context("encoding icon")?;
    Ok(png.into_inner())
}

pub fn png_data_uri(png: &[u8]) -> String {
    format!("data:image/png;base64,{}", STANDARD.encode(png))
}
