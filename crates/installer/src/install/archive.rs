//! Zip extraction and directory merging
//!
//! Everything here is blocking file system work. Async callers go through
//! [`spawn_extract_and_merge`] or wrap calls in `spawn_blocking` themselves.

use std::collections::VecDeque;
use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use walkdir::WalkDir;
use zip::ZipArchive;

use super::layout::ProfileLayout;
use crate::error::{FileOperation, InstallError, Result};

/// How a content archive is laid into a profile directory
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeMode {
    /// Only the archive's `mods` directory (or the whole archive) lands in `mods/`
    Simple,
    /// The archive mirrors the profile directory
    Complex,
}

impl MergeMode {
    pub fn for_pack(is_complex: bool) -> Self {
        if is_complex {
            MergeMode::Complex
        } else {
            MergeMode::Simple
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MergeReport {
    pub files_written: usize,
    pub directories_created: usize,
}

impl MergeReport {
    fn absorb(&mut self, other: MergeReport) {
        self.files_written += other.files_written;
        self.directories_created += other.directories_created;
    }
}

/// Extract every safely named entry of `zip_path` below `dest`
///
/// Entries whose names would escape `dest` are skipped. Returns the number of
/// files written.
pub fn extract_zip(zip_path: &Path, dest: &Path) -> Result<usize> {
    let file = File::open(zip_path).map_err(InstallError::fs_with(zip_path, FileOperation::Read))?;
    let mut archive = ZipArchive::new(file).map_err(|source| InstallError::Archive {
        path: zip_path.to_path_buf(),
        source,
    })?;

    fs::create_dir_all(dest).map_err(InstallError::fs_with(dest, FileOperation::CreateDir))?;

    let mut written = 0;
    for index in 0..archive.len() {
        let mut entry = archive.by_index(index).map_err(|source| InstallError::Archive {
            path: zip_path.to_path_buf(),
            source,
        })?;

        let Some(relative) = entry.enclosed_name() else {
            warn!("Skipping unsafe archive entry '{}'", entry.name());
            continue;
        };
        let target = dest.join(relative);

        if entry.is_dir() {
            fs::create_dir_all(&target)
                .map_err(InstallError::fs_with(&target, FileOperation::CreateDir))?;
            continue;
        }

        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)
                .map_err(InstallError::fs_with(parent, FileOperation::CreateDir))?;
        }
        let mut out =
            File::create(&target).map_err(InstallError::fs_with(&target, FileOperation::Create))?;
        io::copy(&mut entry, &mut out).map_err(|e| {
            // Decompression failures surface as io errors from the entry reader
            if e.kind() == io::ErrorKind::InvalidData || e.kind() == io::ErrorKind::UnexpectedEof {
                InstallError::Archive {
                    path: zip_path.to_path_buf(),
                    source: zip::result::ZipError::Io(e),
                }
            } else {
                InstallError::fs(&target, FileOperation::Write, e)
            }
        })?;
        written += 1;
    }

    debug!("Extracted {} files from {}", written, zip_path.display());
    Ok(written)
}

/// Copy everything below `src` into `dest`, overwriting files at the same
/// relative path. Nothing in `dest` is deleted.
pub fn merge_tree(src: &Path, dest: &Path) -> Result<MergeReport> {
    let mut report = MergeReport::default();
    if !dest.is_dir() {
        fs::create_dir_all(dest).map_err(InstallError::fs_with(dest, FileOperation::CreateDir))?;
        report.directories_created += 1;
    }

    for entry in WalkDir::new(src).min_depth(1) {
        let entry = entry.map_err(|e| {
            let path = e.path().map(Path::to_path_buf).unwrap_or_else(|| src.to_path_buf());
            InstallError::fs(path, FileOperation::ReadDir, io::Error::from(e))
        })?;
        let Ok(relative) = entry.path().strip_prefix(src) else {
            continue;
        };
        let target = dest.join(relative);

        if entry.file_type().is_dir() {
            if !target.is_dir() {
                fs::create_dir_all(&target)
                    .map_err(InstallError::fs_with(&target, FileOperation::CreateDir))?;
                report.directories_created += 1;
            }
        } else {
            fs::copy(entry.path(), &target)
                .map_err(InstallError::fs_with(&target, FileOperation::Copy))?;
            report.files_written += 1;
        }
    }

    Ok(report)
}

/// Shallowest directory named `name` below `root`
pub fn find_directory(root: &Path, name: &str) -> Result<Option<PathBuf>> {
    Ok(find_directories(root, &[name])?.pop().flatten())
}

/// Breadth-first search for several directory names in one walk
///
/// Siblings are visited in name order and the walk stops as soon as every name
/// has a match. The result lines up with `names`.
pub fn find_directories(root: &Path, names: &[&str]) -> Result<Vec<Option<PathBuf>>> {
    let mut found: Vec<Option<PathBuf>> = vec![None; names.len()];
    let mut queue = VecDeque::from([root.to_path_buf()]);

    while let Some(dir) = queue.pop_front() {
        for child in sorted_subdirectories(&dir)? {
            let matched = child
                .file_name()
                .and_then(|n| n.to_str())
                .and_then(|n| names.iter().position(|wanted| *wanted == n));
            if let Some(index) = matched {
                if found[index].is_none() {
                    found[index] = Some(child.clone());
                    if found.iter().all(Option::is_some) {
                        return Ok(found);
                    }
                }
            }
            queue.push_back(child);
        }
    }

    Ok(found)
}

fn sorted_subdirectories(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut children = Vec::new();
    for entry in fs::read_dir(dir).map_err(InstallError::fs_with(dir, FileOperation::ReadDir))? {
        let entry = entry.map_err(InstallError::fs_with(dir, FileOperation::ReadDir))?;
        let file_type = entry
            .file_type()
            .map_err(InstallError::fs_with(entry.path(), FileOperation::Metadata))?;
        if file_type.is_dir() {
            children.push(entry.path());
        }
    }
    children.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    Ok(children)
}

pub fn remove_dir_if_exists(path: &Path) -> Result<()> {
    match fs::remove_dir_all(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(InstallError::fs(path, FileOperation::Delete, e)),
    }
}

fn remove_file_if_exists(path: &Path) -> Result<()> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(InstallError::fs(path, FileOperation::Delete, e)),
    }
}

/// Extract `zip_path` into a fresh `scratch_dir`, merge it into `destination_dir`
/// according to `mode`, then delete the scratch directory and the zip
///
/// On failure the scratch directory is cleaned up and the zip is kept.
pub fn extract_and_merge(
    zip_path: &Path,
    scratch_dir: &Path,
    destination_dir: &Path,
    mode: MergeMode,
) -> Result<MergeReport> {
    remove_dir_if_exists(scratch_dir)?;

    let merged = extract_zip(zip_path, scratch_dir).and_then(|_| match mode {
        MergeMode::Complex => merge_tree(scratch_dir, destination_dir),
        MergeMode::Simple => {
            let mods_dir = ProfileLayout::new(destination_dir).mods_dir();
            match find_directory(scratch_dir, "mods")? {
                Some(found) => {
                    debug!("Merging {} into {}", found.display(), mods_dir.display());
                    merge_tree(&found, &mods_dir)
                }
                None => {
                    debug!(
                        "No mods directory in archive, merging it whole into {}",
                        mods_dir.display()
                    );
                    merge_tree(scratch_dir, &mods_dir)
                }
            }
        }
    });

    let report = match merged {
        Ok(report) => report,
        Err(e) => {
            if let Err(cleanup) = remove_dir_if_exists(scratch_dir) {
                warn!("Could not clean up {}: {}", scratch_dir.display(), cleanup);
            }
            return Err(e);
        }
    };

    remove_dir_if_exists(scratch_dir)?;
    remove_file_if_exists(zip_path)?;
    Ok(report)
}

/// Extract `zip_path` and merge the named top-level trees into `targets`
///
/// Used for loader archives, where `versions` and `libraries` may sit at any
/// depth. Returns which names were found alongside the combined report.
pub fn extract_and_merge_named(
    zip_path: &Path,
    scratch_dir: &Path,
    targets: &[(&str, PathBuf)],
) -> Result<(Vec<bool>, MergeReport)> {
    remove_dir_if_exists(scratch_dir)?;

    let merged = extract_zip(zip_path, scratch_dir).and_then(|_| {
        let names: Vec<&str> = targets.iter().map(|(name, _)| *name).collect();
        let located = find_directories(scratch_dir, &names)?;

        let mut report = MergeReport::default();
        let mut found = Vec::with_capacity(targets.len());
        for ((name, target), source) in targets.iter().zip(located) {
            match source {
                Some(source) => {
                    debug!("Merging loader {} from {}", name, source.display());
                    report.absorb(merge_tree(&source, target)?);
                    found.push(true);
                }
                None => found.push(false),
            }
        }
        Ok((found, report))
    });

    // Scratch and archive go either way
    let cleanup = remove_dir_if_exists(scratch_dir).and(remove_file_if_exists(zip_path));
    let outcome = merged?;
    cleanup?;
    Ok(outcome)
}

/// [`extract_and_merge`] on the blocking pool
pub async fn spawn_extract_and_merge(
    zip_path: PathBuf,
    scratch_dir: PathBuf,
    destination_dir: PathBuf,
    mode: MergeMode,
) -> Result<MergeReport> {
    tokio::task::spawn_blocking(move || {
        extract_and_merge(&zip_path, &scratch_dir, &destination_dir, mode)
    })
    .await?
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::tempdir;
    use zip::write::SimpleFileOptions;

    fn write_zip(path: &Path, entries: &[(&str, &[u8])]) {
        let mut zip = zip::ZipWriter::new(File::create(path).unwrap());
        for (name, body) in entries {
            if name.ends_with('/') {
                zip.add_directory(*name, SimpleFileOptions::default()).unwrap();
            } else {
                zip.start_file(*name, SimpleFileOptions::default()).unwrap();
                zip.write_all(body).unwrap();
            }
        }
        zip.finish().unwrap();
    }

    #[test]
    fn test_simple_merge_prefers_shallowest_mods_dir() {
        let dir = tempdir().unwrap();
        let zip_path = dir.path().join("temp.zip");
        write_zip(
            &zip_path,
            &[
                ("pack/mods/a.jar", b"a"),
                ("pack/extra/deeper/mods/z.jar", b"z"),
                ("pack/readme.txt", b"hi"),
            ],
        );
        let profile = dir.path().join("Alpha");

        let scratch = dir.path().join("scratch");
        let report = extract_and_merge(&zip_path, &scratch, &profile, MergeMode::Simple).unwrap();

        assert_eq!(report.files_written, 1);
        assert_eq!(fs::read(profile.join("mods/a.jar")).unwrap(), b"a");
        assert!(!profile.join("mods/z.jar").exists());
        assert!(!profile.join("readme.txt").exists());
        assert!(!dir.path().join("scratch").exists());
        assert!(!zip_path.exists());
    }

    #[test]
    fn test_simple_merge_without_mods_dir_takes_everything() {
        let dir = tempdir().unwrap();
        let zip_path = dir.path().join("temp.zip");
        write_zip(&zip_path, &[("a.jar", b"a"), ("lib/b.jar", b"b")]);
        let profile = dir.path().join("Alpha");

        let scratch = dir.path().join("scratch");
        extract_and_merge(&zip_path, &scratch, &profile, MergeMode::Simple).unwrap();

        assert!(profile.join("mods/a.jar").is_file());
        assert!(profile.join("mods/lib/b.jar").is_file());
    }

    #[test]
    fn test_complex_merge_overwrites_and_keeps_existing() {
        let dir = tempdir().unwrap();
        let profile = dir.path().join("Alpha");
        fs::create_dir_all(profile.join("config")).unwrap();
        fs::write(profile.join("config/keep.toml"), "mine").unwrap();
        fs::write(profile.join("config/shared.toml"), "old").unwrap();

        let zip_path = dir.path().join("temp.zip");
        write_zip(
            &zip_path,
            &[("config/shared.toml", b"new"), ("shaderpacks/", b""), ("mods/c.jar", b"c")],
        );

        let scratch = dir.path().join("scratch");
        extract_and_merge(&zip_path, &scratch, &profile, MergeMode::Complex).unwrap();

        assert_eq!(fs::read_to_string(profile.join("config/shared.toml")).unwrap(), "new");
        assert_eq!(fs::read_to_string(profile.join("config/keep.toml")).unwrap(), "mine");
        assert!(profile.join("shaderpacks").is_dir());
        assert!(profile.join("mods/c.jar").is_file());
    }

    #[test]
    fn test_stale_scratch_is_replaced() {
        let dir = tempdir().unwrap();
        let scratch = dir.path().join("scratch");
        fs::create_dir_all(scratch.join("mods")).unwrap();
        fs::write(scratch.join("mods/stale.jar"), "old run").unwrap();

        let zip_path = dir.path().join("temp.zip");
        write_zip(&zip_path, &[("mods/fresh.jar", b"new")]);
        let profile = dir.path().join("Alpha");

        extract_and_merge(&zip_path, &scratch, &profile, MergeMode::Simple).unwrap();

        assert!(profile.join("mods/fresh.jar").is_file());
        assert!(!profile.join("mods/stale.jar").exists());
    }

    #[test]
    fn test_corrupt_zip_keeps_archive_and_cleans_scratch() {
        let dir = tempdir().unwrap();
        let zip_path = dir.path().join("temp.zip");
        fs::write(&zip_path, b"this is not a zip file").unwrap();
        let scratch = dir.path().join("scratch");

        let profile = dir.path().join("Alpha");
        let err = extract_and_merge(&zip_path, &scratch, &profile, MergeMode::Simple).unwrap_err();

        assert!(matches!(err, InstallError::Archive { .. }));
        assert!(zip_path.exists());
        assert!(!scratch.exists());
    }

    #[test]
    fn test_find_directories_is_breadth_first_and_sorted() {
        let dir = tempdir().unwrap();
        let root = dir.path();
        fs::create_dir_all(root.join("b/versions")).unwrap();
        fs::create_dir_all(root.join("a/versions")).unwrap();
        fs::create_dir_all(root.join("a/x/y/libraries")).unwrap();
        fs::create_dir_all(root.join("c/libraries")).unwrap();

        let found = find_directories(root, &["versions", "libraries"]).unwrap();
        assert_eq!(found[0].as_deref(), Some(root.join("a/versions").as_path()));
        assert_eq!(found[1].as_deref(), Some(root.join("c/libraries").as_path()));

        assert_eq!(find_directory(root, "mods").unwrap(), None);
    }

    #[test]
    fn test_named_merge_for_loader_layout() {
        let dir = tempdir().unwrap();
        let zip_path = dir.path().join("temp_loader.zip");
        write_zip(
            &zip_path,
            &[
                ("bundle/versions/forge-47/forge-47.json", b"{}"),
                ("bundle/libraries/net/forge/core.jar", b"jar"),
            ],
        );
        let client = dir.path().join("mc");

        let (found, report) = extract_and_merge_named(
            &zip_path,
            &dir.path().join("temp_loader_extract"),
            &[("versions", client.join("versions")), ("libraries", client.join("libraries"))],
        )
        .unwrap();

        assert_eq!(found, vec![true, true]);
        assert_eq!(report.files_written, 2);
        assert!(client.join("versions/forge-47/forge-47.json").is_file());
        assert!(client.join("libraries/net/forge/core.jar").is_file());
        assert!(!zip_path.exists());
        assert!(!dir.path().join("temp_loader_extract").exists());
    }

    #[tokio::test]
    async fn test_spawned_merge() {
        let dir = tempdir().unwrap();
        let zip_path = dir.path().join("temp.zip");
        write_zip(&zip_path, &[("mods/a.jar", b"a")]);

        let report = spawn_extract_and_merge(
            zip_path,
            dir.path().join("scratch"),
            dir.path().join("Alpha"),
            MergeMode::Simple,
        )
        .await
        .unwrap();
        assert_eq!(report.files_written, 1);
    }
}
