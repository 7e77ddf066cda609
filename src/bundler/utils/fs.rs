//! File system utilities for packaging.
//!
//! Provides file operations with automatic directory creation,
//! symlink preservation and path-aware error handling.

use crate::bundler::error::{Error, ErrorExt, Result};
use std::{io, path::Path};
use tokio::fs;
use tokio::io::AsyncWriteExt;

/// Creates all of the directories of the specified path, erasing it first if specified.
pub async fn create_dir_all(path: &Path, erase: bool) -> Result<()> {
    if erase {
        remove_dir_all(path).await?;
    }
    fs::create_dir_all(path)
        .await
        .fs_context("creating directory", path)
}

/// Removes the directory and its contents if it exists.
pub async fn remove_dir_all(path: &Path) -> Result<()> {
    if path.exists() {
        fs::remove_dir_all(path)
            .await
            .fs_context("removing directory", path)
    } else {
        Ok(())
    }
}

/// Makes a symbolic link to a directory.
#[cfg(unix)]
fn symlink_dir(src: &Path, dst: &Path) -> io::Result<()> {
    std::os::unix::fs::symlink(src, dst)
}

/// Makes a symbolic link to a directory.
#[cfg(windows)]
fn symlink_dir(src: &Path, dst: &Path) -> io::Result<()> {
    std::os::windows::fs::symlink_dir(src, dst)
}

/// Makes a symbolic link to a file.
#[cfg(unix)]
fn symlink_file(src: &Path, dst: &Path) -> io::Result<()> {
    std::os::unix::fs::symlink(src, dst)
}

/// Makes a symbolic link to a file.
#[cfg(windows)]
fn symlink_file(src: &Path, dst: &Path) -> io::Result<()> {
    std::os::windows::fs::symlink_file(src, dst)
}

/// Copies a regular file from one path to another, creating any parent
/// directories of the destination path as necessary.
///
/// Fails with [`Error::Structure`] if the source path is a directory or doesn't exist.
pub async fn copy_file(from: &Path, to: &Path) -> Result<()> {
    if !from.is_file() {
        return Err(Error::Structure(format!(
            "{} does not exist or is not a file",
            from.display()
        )));
    }
    if let Some(dest_dir) = to.parent() {
        fs::create_dir_all(dest_dir)
            .await
            .fs_context("creating directory", dest_dir)?;
    }
    fs::copy(from, to).await.fs_context("copying file", from)?;
    Ok(())
}

/// Copies a file into a folder, keeping its file name. Returns the new path.
pub async fn copy_file_to_folder(from: &Path, folder: &Path) -> Result<std::path::PathBuf> {
    let name = from
        .file_name()
        .ok_or_else(|| Error::Structure(format!("{} has no file name", from.display())))?;
    let dest = folder.join(name);
    copy_file(from, &dest).await?;
    Ok(dest)
}

/// Recursively copies a directory from one path to another, creating any
/// parent directories of the destination path as necessary.
///
/// Preserves symlinks on platforms that support them. Copying into an
/// existing destination merges the trees.
pub async fn copy_dir(from: &Path, to: &Path) -> Result<()> {
    if !from.is_dir() {
        return Err(Error::Structure(format!(
            "{} does not exist or is not a directory",
            from.display()
        )));
    }
    if let Some(parent) = to.parent() {
        fs::create_dir_all(parent)
            .await
            .fs_context("creating directory", parent)?;
    }

    for entry in walkdir::WalkDir::new(from) {
        let entry = entry?;
        let rel_path = entry.path().strip_prefix(from)?;
        let dest_path = to.join(rel_path);

        if entry.file_type().is_symlink() {
            let target = fs::read_link(entry.path())
                .await
                .fs_context("reading symlink", entry.path())?;
            if entry.path().is_dir() {
                symlink_dir(&target, &dest_path).fs_context("creating symlink", &dest_path)?;
            } else {
                symlink_file(&target, &dest_path).fs_context("creating symlink", &dest_path)?;
            }
        } else if entry.file_type().is_dir() {
            fs::create_dir_all(&dest_path)
                .await
                .fs_context("creating directory", &dest_path)?;
        } else {
            fs::copy(entry.path(), &dest_path)
                .await
                .fs_context("copying file", entry.path())?;
        }
    }

    Ok(())
}

/// Writes `dest` as the byte concatenation of `sources`, in order.
pub async fn concat(dest: &Path, sources: &[&Path]) -> Result<()> {
    if let Some(parent) = dest.parent() {
        fs::create_dir_all(parent)
            .await
            .fs_context("creating directory", parent)?;
    }
    let mut out = fs::File::create(dest)
        .await
        .fs_context("creating file", dest)?;
    for source in sources {
        let mut input = fs::File::open(source)
            .await
            .fs_context("opening file", *source)?;
        tokio::io::copy(&mut input, &mut out)
            .await
            .fs_context("appending file", *source)?;
    }
    out.flush().await.fs_context("flushing file", dest)?;
    Ok(())
}

/// Adds the owner execute bit to `path`. No-op on non-unix hosts.
pub async fn set_owner_executable(path: &Path) -> Result<()> {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let mode = fs::metadata(path)
            .await
            .fs_context("reading permissions", path)?
            .permissions()
            .mode();
        fs::set_permissions(path, std::fs::Permissions::from_mode(mode | 0o100))
            .await
            .fs_context("setting executable permission", path)?;
    }
    #[cfg(not(unix))]
    let _ = path;
    Ok(())
}

/// Sets the full unix mode of `path`. No-op on non-unix hosts.
pub async fn set_mode(path: &Path, mode: u32) -> Result<()> {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(path, std::fs::Permissions::from_mode(mode))
            .await
            .fs_context("setting permissions", path)?;
    }
    #[cfg(not(unix))]
    let _ = (path, mode);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn concat_keeps_second_part_byte_for_byte() {
        let dir = tempfile::tempdir().unwrap();
        let script = dir.path().join("startup.sh");
        let jar = dir.path().join("app.jar");
        let out = dir.path().join("app");
        std::fs::write(&script, b"#!/bin/bash\nexit 0\n").unwrap();
        std::fs::write(&jar, [0x50u8, 0x4b, 0x03, 0x04, 0xff, 0x00]).unwrap();

        concat(&out, &[&script, &jar]).await.unwrap();

        let bytes = std::fs::read(&out).unwrap();
        let script_len = std::fs::metadata(&script).unwrap().len() as usize;
        assert_eq!(&bytes[script_len..], std::fs::read(&jar).unwrap().as_slice());
    }

    #[tokio::test]
    async fn copy_dir_preserves_structure() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("res");
        std::fs::create_dir_all(src.join("sub")).unwrap();
        std::fs::write(src.join("sub/a.txt"), "a").unwrap();

        let dest = dir.path().join("out/res");
        copy_dir(&src, &dest).await.unwrap();
        assert_eq!(std::fs::read_to_string(dest.join("sub/a.txt")).unwrap(), "a");
    }

    #[tokio::test]
    async fn copy_file_missing_source_is_structure_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = copy_file(&dir.path().join("nope"), &dir.path().join("x"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Structure(_)));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn owner_exec_bit_is_added() {
        use std::os::unix::fs::PermissionsExt;
        let dir = tempfile::tempdir().unwrap();
        let f = dir.path().join("run");
        std::fs::write(&f, "x").unwrap();
        std::fs::set_permissions(&f, std::fs::Permissions::from_mode(0o644)).unwrap();
        set_owner_executable(&f).await.unwrap();
        let mode = std::fs::metadata(&f).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o744);
    }
}
