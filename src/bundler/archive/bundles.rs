//! Generic bundles: the app folder as a `.tar.gz` or `.zip`.
//!
//! Entries are rooted at the app folder name and written in name order with
//! zeroed ownership and pinned timestamps. Unix modes are preserved.

use crate::bundler::error::{Error, ErrorExt, Result};
use flate2::{Compression, write::GzEncoder};
use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;
use zip::{CompressionMethod, DateTime, ZipWriter, write::SimpleFileOptions};

/// One entry of the app folder, relative to its parent.
struct FolderEntry {
    path: PathBuf,
    name: String,
    kind: EntryKind,
    mode: u32,
}

enum EntryKind {
    Dir,
    File,
    Symlink(PathBuf),
}

#[cfg(unix)]
fn mode_of(meta: &std::fs::Metadata) -> u32 {
    use std::os::unix::fs::PermissionsExt;
    meta.permissions().mode() & 0o7777
}

#[cfg(not(unix))]
fn mode_of(meta: &std::fs::Metadata) -> u32 {
    if meta.is_dir() { 0o755 } else { 0o644 }
}

fn folder_entries(app_folder: &Path) -> Result<Vec<FolderEntry>> {
    let root = app_folder
        .parent()
        .ok_or_else(|| Error::Structure(format!("{} has no parent", app_folder.display())))?;
    let mut entries = Vec::new();
    for entry in WalkDir::new(app_folder).sort_by_file_name() {
        let entry = entry?;
        let name = entry
            .path()
            .strip_prefix(root)?
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");
        let meta = std::fs::symlink_metadata(entry.path()).fs_context("reading metadata", entry.path())?;
        let kind = if meta.file_type().is_symlink() {
            EntryKind::Symlink(std::fs::read_link(entry.path()).fs_context("reading symlink", entry.path())?)
        } else if meta.is_dir() {
            EntryKind::Dir
        } else {
            EntryKind::File
        };
        entries.push(FolderEntry {
            path: entry.path().to_path_buf(),
            name,
            kind,
            mode: mode_of(&meta),
        });
    }
    Ok(entries)
}

/// Writes `app_folder` as a gzipped tarball at `dest`.
pub fn create_tarball(app_folder: &Path, dest: &Path) -> Result<PathBuf> {
    let entries = folder_entries(app_folder)?;
    let file = File::create(dest).fs_context("creating tarball", dest)?;
    let mut tar = tar::Builder::new(GzEncoder::new(file, Compression::default()));

    for entry in entries {
        let mut header = tar::Header::new_gnu();
        header.set_mode(entry.mode);
        header.set_mtime(0);
        header.set_uid(0);
        header.set_gid(0);
        match &entry.kind {
            EntryKind::Dir => {
                header.set_entry_type(tar::EntryType::Directory);
                header.set_size(0);
                tar.append_data(&mut header, format!("{}/", entry.name), io::empty())?;
            }
            EntryKind::File => {
                let src = File::open(&entry.path).fs_context("opening file", &entry.path)?;
                header.set_entry_type(tar::EntryType::Regular);
                header.set_size(src.metadata()?.len());
                tar.append_data(&mut header, &entry.name, src)?;
            }
            EntryKind::Symlink(target) => {
                header.set_entry_type(tar::EntryType::Symlink);
                header.set_size(0);
                tar.append_link(&mut header, &entry.name, target)?;
            }
        }
    }

    tar.into_inner()?.finish()?;
    Ok(dest.to_path_buf())
}

/// Writes `app_folder` as a zip archive at `dest`.
///
/// Symlinks are stored as the files they point to.
pub fn create_zipball(app_folder: &Path, dest: &Path) -> Result<PathBuf> {
    let entries = folder_entries(app_folder)?;
    let file = File::create(dest).fs_context("creating zipball", dest)?;
    let mut zip = ZipWriter::new(file);

    for entry in entries {
        let options = SimpleFileOptions::default()
            .compression_method(CompressionMethod::Deflated)
            .last_modified_time(DateTime::default())
            .unix_permissions(entry.mode);
        match entry.kind {
            EntryKind::Dir => {
                zip.add_directory(format!("{}/", entry.name), options)?;
            }
            EntryKind::File | EntryKind::Symlink(_) => {
                if entry.path.is_dir() {
                    continue;
                }
                zip.start_file(entry.name, options)?;
                let mut src = File::open(&entry.path).fs_context("opening file", &entry.path)?;
                io::copy(&mut src, &mut zip)?;
            }
        }
    }

    zip.finish()?;
    Ok(dest.to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn app(dir: &Path) -> PathBuf {
        let app = dir.join("demo");
        std::fs::create_dir_all(app.join("libs")).unwrap();
        std::fs::write(app.join("demo"), "#!/bin/bash\n").unwrap();
        std::fs::write(app.join("libs/a.jar"), "jar").unwrap();
        app
    }

    #[test]
    fn tarball_is_rooted_and_reproducible() {
        let dir = tempfile::tempdir().unwrap();
        let app = app(dir.path());
        let dest = dir.path().join("demo_1.0.tar.gz");
        create_tarball(&app, &dest).unwrap();
        let first = std::fs::read(&dest).unwrap();
        create_tarball(&app, &dest).unwrap();
        assert_eq!(first, std::fs::read(&dest).unwrap());

        let gz = flate2::read::GzDecoder::new(File::open(&dest).unwrap());
        let mut archive = tar::Archive::new(gz);
        let names: Vec<String> = archive
            .entries()
            .unwrap()
            .map(|e| e.unwrap().path().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["demo/", "demo/demo", "demo/libs/", "demo/libs/a.jar"]);
    }

    #[test]
    fn zipball_holds_app_folder() {
        let dir = tempfile::tempdir().unwrap();
        let app = app(dir.path());
        let dest = dir.path().join("demo_1.0.zip");
        create_zipball(&app, &dest).unwrap();
        let archive = zip::ZipArchive::new(File::open(&dest).unwrap()).unwrap();
        let names: Vec<&str> = archive.file_names().collect();
        assert!(names.contains(&"demo/libs/a.jar"));
        assert!(names.contains(&"demo/demo"));
    }
}
