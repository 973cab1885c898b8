//! Catalog loading and validation
//!
//! The catalog is a JSON object of categories, each an object of pack display
//! names to pack definitions. Order is preserved as published. A [`Catalog`] is
//! a plain value: callers hold it (see [`CatalogSession`]) and replace it
//! wholesale on refresh.

pub mod schema;

pub use schema::{loader_version_dir, PackDefinition, RawPackEntry};

use std::collections::HashMap;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tracing::{debug, info, info_span, warn, Instrument};
use url::Url;

use crate::config::InstallerConfig;
use crate::downloader::{parse_url, HttpClient};
use crate::error::{InstallError, Result};

/// One category of packs, in catalog order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogCategory {
    pub name: String,
    pub packs: Vec<CatalogEntry>,
}

/// A pack as listed under its display name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogEntry {
    pub display_name: String,
    pub pack: PackDefinition,
}

/// A catalog entry that was left out, and why
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogIssue {
    pub category: String,
    pub pack: Option<String>,
    pub reason: String,
}

impl std::fmt::Display for CatalogIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.pack {
            Some(pack) => write!(f, "{} / {}: {}", self.category, pack, self.reason),
            None => write!(f, "{}: {}", self.category, self.reason),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Catalog {
    categories: Vec<CatalogCategory>,
    issues: Vec<CatalogIssue>,
}

impl Catalog {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Parse and validate a catalog document
    ///
    /// Only a malformed document fails as a whole. Individual bad entries,
    /// duplicate folder names and colliding profile ids are recorded as
    /// [`CatalogIssue`]s and left out; the first entry for a key wins.
    pub fn from_json_slice(bytes: &[u8]) -> Result<Self> {
        let document: serde_json::Value =
            serde_json::from_slice(bytes).map_err(|e| InstallError::CatalogInvalid {
                reason: format!("not valid JSON: {}", e),
            })?;

        let root = document.as_object().ok_or_else(|| InstallError::CatalogInvalid {
            reason: "top level must be an object of categories".to_string(),
        })?;

        let mut catalog = Catalog::empty();
        let mut folders: HashMap<String, String> = HashMap::new();
        let mut profile_ids: HashMap<String, String> = HashMap::new();

        for (category_name, packs_value) in root {
            let Some(packs) = packs_value.as_object() else {
                catalog.issues.push(CatalogIssue {
                    category: category_name.clone(),
                    pack: None,
                    reason: "category must be an object of packs".to_string(),
                });
                continue;
            };

            let mut category = CatalogCategory {
                name: category_name.clone(),
                packs: Vec::with_capacity(packs.len()),
            };

            for (display_name, entry_value) in packs {
                let issue = |reason: String| CatalogIssue {
                    category: category_name.clone(),
                    pack: Some(display_name.clone()),
                    reason,
                };

                let pack = match serde_json::from_value::<RawPackEntry>(entry_value.clone())
                    .map_err(|e| e.to_string())
                    .and_then(PackDefinition::from_raw)
                {
                    Ok(pack) => pack,
                    Err(reason) => {
                        catalog.issues.push(issue(reason));
                        continue;
                    }
                };

                if let Some(owner) = folders.get(&pack.folder_name) {
                    catalog.issues.push(issue(format!(
                        "folder_name '{}' is already used by '{}'",
                        pack.folder_name, owner
                    )));
                    continue;
                }
                let profile_id = pack.profile_id();
                if let Some(owner) = profile_ids.get(&profile_id) {
                    catalog.issues.push(issue(format!(
                        "profile id '{}' is already used by '{}'",
                        profile_id, owner
                    )));
                    continue;
                }

                folders.insert(pack.folder_name.clone(), display_name.clone());
                profile_ids.insert(profile_id, display_name.clone());
                category.packs.push(CatalogEntry {
                    display_name: display_name.clone(),
                    pack,
                });
            }

            catalog.categories.push(category);
        }

        Ok(catalog)
    }

    pub fn is_empty(&self) -> bool {
        self.categories.is_empty()
    }

    pub fn categories(&self) -> &[CatalogCategory] {
        &self.categories
    }

    pub fn category_names(&self) -> impl Iterator<Item = &str> {
        self.categories.iter().map(|c| c.name.as_str())
    }

    pub fn category(&self, name: &str) -> Option<&CatalogCategory> {
        self.categories.iter().find(|c| c.name == name)
    }

    /// Look a pack up by category and display name
    pub fn find(&self, category: &str, display_name: &str) -> Option<&PackDefinition> {
        self.category(category)?
            .packs
            .iter()
            .find(|e| e.display_name == display_name)
            .map(|e| &e.pack)
    }

    pub fn find_by_folder(&self, folder_name: &str) -> Option<&PackDefinition> {
        self.packs().find(|p| p.folder_name == folder_name)
    }

    /// All packs in catalog order
    pub fn packs(&self) -> impl Iterator<Item = &PackDefinition> {
        self.categories
            .iter()
            .flat_map(|c| c.packs.iter().map(|e| &e.pack))
    }

    pub fn pack_count(&self) -> usize {
        self.categories.iter().map(|c| c.packs.len()).sum()
    }

    pub fn issues(&self) -> &[CatalogIssue] {
        &self.issues
    }
}

/// Fetches the catalog from the configured URL or local file
#[derive(Debug, Clone)]
pub struct CatalogLoader {
    http: HttpClient,
    config: InstallerConfig,
}

impl CatalogLoader {
    pub fn new(config: InstallerConfig) -> Result<Self> {
        let http = HttpClient::from_config(&config)?;
        Ok(Self { http, config })
    }

    pub fn with_client(http: HttpClient, config: InstallerConfig) -> Self {
        Self { http, config }
    }

    /// Load a fresh catalog; every failure becomes an explicit error
    pub async fn load(&self) -> Result<Catalog> {
        self.fetch_and_parse()
            .instrument(info_span!("load_catalog"))
            .await
    }

    async fn fetch_and_parse(&self) -> Result<Catalog> {
        let (source_name, bytes) = match &self.config.catalog_file {
            Some(path) => {
                let bytes =
                    tokio::fs::read(path)
                        .await
                        .map_err(|e| InstallError::CatalogUnavailable {
                            source_name: path.display().to_string(),
                            reason: e.to_string(),
                        })?;
                (path.display().to_string(), bytes)
            }
            None => {
                let unavailable = |e: InstallError| InstallError::CatalogUnavailable {
                    source_name: self.config.catalog_url.clone(),
                    reason: e.to_string(),
                };
                let url = cache_busted_url(
                    &self.config.catalog_url,
                    unix_millis(),
                    rand::random::<u32>(),
                )
                .map_err(unavailable)?;
                debug!("Fetching catalog from {}", url);
                let bytes = self
                    .http
                    .get_bytes(url.as_str(), self.config.catalog_timeout)
                    .await
                    .map_err(unavailable)?;
                (self.config.catalog_url.clone(), bytes)
            }
        };

        let catalog = Catalog::from_json_slice(&bytes).map_err(|e| match e {
            InstallError::CatalogInvalid { reason } => InstallError::CatalogUnavailable {
                source_name: source_name.clone(),
                reason,
            },
            other => other,
        })?;

        for issue in catalog.issues() {
            warn!("Skipping catalog entry {}", issue);
        }
        info!(
            "Loaded {} packs in {} categories from {}",
            catalog.pack_count(),
            catalog.categories().len(),
            source_name
        );
        Ok(catalog)
    }

    /// Like [`CatalogLoader::load`], but yields an empty catalog on failure
    pub async fn load_or_empty(&self) -> Catalog {
        match self.load().await {
            Ok(catalog) => catalog,
            Err(e) => {
                warn!("Catalog unavailable: {}", e);
                Catalog::empty()
            }
        }
    }
}

/// Holds the catalog for a presentation session
#[derive(Debug, Clone, Default)]
pub struct CatalogSession {
    catalog: Catalog,
}

impl CatalogSession {
    pub fn new(catalog: Catalog) -> Self {
        Self { catalog }
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// Replace the held catalog with a fresh one; on failure the old one is kept
    pub async fn refresh(&mut self, loader: &CatalogLoader) -> Result<&Catalog> {
        let fresh = loader.load().await?;
        self.catalog = fresh;
        Ok(&self.catalog)
    }
}

/// Append cache-defeating `t` and `r` query parameters
pub fn cache_busted_url(base: &str, timestamp_millis: u128, nonce: u32) -> Result<Url> {
    let mut url = parse_url(base)?;
    url.query_pairs_mut()
        .append_pair("t", &timestamp_millis.to_string())
        .append_pair("r", &nonce.to_string());
    Ok(url)
}

fn unix_millis() -> u128 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or(Duration::ZERO)
        .as_millis()
}
