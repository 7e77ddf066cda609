//! In-process Debian package writer.
//!
//! Interprets a jdeb-style configuration tree:
//!
//! ```text
//! configuration
//! ├── controlDir   directory holding `control` and maintainer scripts
//! ├── deb          output path
//! └── dataSet
//!     └── data     type = directory | file | link
//!         ├── src / linkName + linkTarget
//!         ├── excludes   comma separated paths relative to a directory src
//!         └── mapper     type = perm, prefix, filemode, dirmode
//! ```
//!
//! A .deb file is an ar archive containing:
//! - debian-binary: Format version (2.0)
//! - control.tar.gz: Package metadata (control, md5sums, scripts)
//! - data.tar.gz: Files to install
//!
//! Output is byte-for-byte reproducible: entries are sorted, every
//! timestamp is zero and ownership is `root:root`.

use crate::bundler::error::{Context, Error, ErrorExt, Result};
use crate::bundler::tool::ConfigNode;
use flate2::{Compression, write::GzEncoder};
use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

const DEFAULT_FILE_MODE: u32 = 0o644;
const DEFAULT_DIR_MODE: u32 = 0o755;
const SCRIPT_MODE: u32 = 0o755;
const MAINTAINER_SCRIPTS: [&str; 4] = ["preinst", "postinst", "prerm", "postrm"];

/// One entry of the data archive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DataEntry {
    /// Directory with its mode.
    Dir {
        /// Permission bits.
        mode: u32,
    },
    /// Regular file copied from `source`.
    File {
        /// File on disk.
        source: PathBuf,
        /// Permission bits.
        mode: u32,
    },
    /// Symbolic link to `target`.
    Symlink {
        /// Link target, stored verbatim.
        target: String,
        /// Permission bits.
        mode: u32,
    },
}

/// Installed paths (absolute, without leading `/`) mapped to their entries.
pub type DataTree = BTreeMap<String, DataEntry>;

/// Builds the package described by `configuration`.
pub async fn build_package(configuration: &ConfigNode) -> Result<PathBuf> {
    let configuration = configuration.clone();
    tokio::task::spawn_blocking(move || write_package(&configuration))
        .await
        .map_err(|e| Error::GenericError(format!("Join error: {}", e)))?
}

/// Blocking body of [`build_package`].
pub fn write_package(configuration: &ConfigNode) -> Result<PathBuf> {
    let control_dir = PathBuf::from(configuration.require_text("controlDir")?);
    let deb = PathBuf::from(configuration.require_text("deb")?);
    let data_set = configuration
        .child("dataSet")
        .context("missing <dataSet> in jdeb configuration")?;

    let tree = collect_data(data_set)?;
    let installed_size = installed_size_kb(&tree)?;

    let data_tar_gz = data_archive(&tree).context("failed to build data.tar.gz")?;
    let control_tar_gz = control_archive(&control_dir, &tree, installed_size)
        .context("failed to build control.tar.gz")?;

    if let Some(parent) = deb.parent() {
        fs::create_dir_all(parent).fs_context("creating output directory", parent)?;
    }
    let file = File::create(&deb).fs_context("creating .deb archive", &deb)?;
    let mut builder = ar::Builder::new(file);
    for (name, data) in [
        ("debian-binary", b"2.0\n".to_vec()),
        ("control.tar.gz", control_tar_gz),
        ("data.tar.gz", data_tar_gz),
    ] {
        let mut header = ar::Header::new(name.as_bytes().to_vec(), data.len() as u64);
        header.set_mode(0o100644);
        builder.append(&header, data.as_slice())?;
    }
    let finished = builder.into_inner()?;
    finished.sync_all()?;

    log::debug!("wrote {}", deb.display());
    Ok(deb)
}

/// Resolves the data set into the full installed tree, parents included.
pub fn collect_data(data_set: &ConfigNode) -> Result<DataTree> {
    let mut tree = DataTree::new();

    for data in data_set.children_named("data") {
        let mapper = data.child("mapper");
        let prefix = mapper.and_then(|m| m.child_text("prefix")).unwrap_or("");
        let filemode = parse_mode(mapper.and_then(|m| m.child_text("filemode")))?;
        let dirmode = parse_mode(mapper.and_then(|m| m.child_text("dirmode")))?;

        match data.require_text("type")? {
            "directory" => {
                let src = PathBuf::from(data.require_text("src")?);
                let excludes: Vec<&str> = data
                    .child_text("excludes")
                    .map(|e| e.split(',').map(str::trim).filter(|s| !s.is_empty()).collect())
                    .unwrap_or_default();

                for entry in WalkDir::new(&src).sort_by_file_name().min_depth(1) {
                    let entry = entry?;
                    let rel = relative_path(entry.path().strip_prefix(&src)?);
                    if is_excluded(&rel, &excludes) {
                        continue;
                    }
                    let dest = join_installed(prefix, &rel);
                    if entry.file_type().is_dir() {
                        tree.insert(dest, DataEntry::Dir {
                            mode: dirmode.unwrap_or(DEFAULT_DIR_MODE),
                        });
                    } else if entry.file_type().is_symlink() {
                        let target = fs::read_link(entry.path())
                            .fs_context("reading symlink", entry.path())?;
                        tree.insert(dest, DataEntry::Symlink {
                            target: target.to_string_lossy().into_owned(),
                            mode: 0o777,
                        });
                    } else {
                        tree.insert(dest, DataEntry::File {
                            source: entry.path().to_path_buf(),
                            mode: filemode.unwrap_or(DEFAULT_FILE_MODE),
                        });
                    }
                }
            }
            "file" => {
                let src = PathBuf::from(data.require_text("src")?);
                if !src.is_file() {
                    return Err(Error::GenericError(format!(
                        "data file {} does not exist",
                        src.display()
                    )));
                }
                let name = src
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .context("data file has no name")?;
                tree.insert(join_installed(prefix, &name), DataEntry::File {
                    source: src,
                    mode: filemode.unwrap_or(DEFAULT_FILE_MODE),
                });
            }
            "link" => {
                let name = data.require_text("linkName")?;
                let target = data.require_text("linkTarget")?;
                if !data.child_flag("symlink", true) {
                    return Err(Error::GenericError(format!(
                        "hard link {name} is not supported"
                    )));
                }
                tree.insert(join_installed(prefix, name), DataEntry::Symlink {
                    target: target.to_string(),
                    mode: filemode.unwrap_or(0o777),
                });
            }
            other => {
                return Err(Error::GenericError(format!("unknown data type {other}")));
            }
        }
    }

    let parents: Vec<String> = tree.keys().flat_map(|k| ancestors(k)).collect();
    for parent in parents {
        tree.entry(parent).or_insert(DataEntry::Dir {
            mode: DEFAULT_DIR_MODE,
        });
    }

    Ok(tree)
}

fn parse_mode(text: Option<&str>) -> Result<Option<u32>> {
    text.map(|t| {
        u32::from_str_radix(t.trim(), 8)
            .map_err(|_| Error::GenericError(format!("invalid file mode {t}")))
    })
    .transpose()
}

fn relative_path(path: &Path) -> String {
    path.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

fn is_excluded(rel: &str, excludes: &[&str]) -> bool {
    excludes.iter().any(|e| *e == rel)
}

fn join_installed(prefix: &str, rel: &str) -> String {
    let prefix = prefix.trim_matches('/');
    let rel = rel.trim_start_matches('/');
    if prefix.is_empty() {
        rel.to_string()
    } else {
        format!("{prefix}/{rel}")
    }
}

fn ancestors(path: &str) -> Vec<String> {
    let mut out = Vec::new();
    let mut current = path;
    while let Some((parent, _)) = current.rsplit_once('/') {
        out.push(parent.to_string());
        current = parent;
    }
    out
}

fn installed_size_kb(tree: &DataTree) -> Result<u64> {
    let mut total = 0u64;
    for entry in tree.values() {
        if let DataEntry::File { source, .. } = entry {
            total += fs::metadata(source)
                .fs_context("reading file size", source)?
                .len();
        }
    }
    Ok(total.div_ceil(1024))
}

fn header_for(mode: u32, size: u64, kind: tar::EntryType) -> Result<tar::Header> {
    let mut header = tar::Header::new_gnu();
    header.set_entry_type(kind);
    header.set_mode(mode);
    header.set_size(size);
    header.set_mtime(0);
    header.set_uid(0);
    header.set_gid(0);
    header.set_username("root")?;
    header.set_groupname("root")?;
    Ok(header)
}

fn gzip_tar<F>(fill: F) -> Result<Vec<u8>>
where
    F: FnOnce(&mut tar::Builder<GzEncoder<Vec<u8>>>) -> Result<()>,
{
    let enc = GzEncoder::new(Vec::new(), Compression::default());
    let mut tar = tar::Builder::new(enc);
    tar.mode(tar::HeaderMode::Deterministic);
    fill(&mut tar)?;
    let enc = tar.into_inner()?;
    Ok(enc.finish()?)
}

fn data_archive(tree: &DataTree) -> Result<Vec<u8>> {
    gzip_tar(|tar| {
        for (path, entry) in tree {
            let name = format!("./{path}");
            match entry {
                DataEntry::Dir { mode } => {
                    let mut header = header_for(*mode, 0, tar::EntryType::Directory)?;
                    tar.append_data(&mut header, format!("{name}/"), io::empty())?;
                }
                DataEntry::File { source, mode } => {
                    let file = File::open(source).fs_context("opening data file", source)?;
                    let size = file.metadata()?.len();
                    let mut header = header_for(*mode, size, tar::EntryType::Regular)?;
                    tar.append_data(&mut header, &name, file)?;
                }
                DataEntry::Symlink { target, mode } => {
                    let mut header = header_for(*mode, 0, tar::EntryType::Symlink)?;
                    tar.append_link(&mut header, &name, target)?;
                }
            }
        }
        Ok(())
    })
}

fn md5sums(tree: &DataTree) -> Result<String> {
    let mut out = String::new();
    for (path, entry) in tree {
        if let DataEntry::File { source, .. } = entry {
            let mut src = File::open(source).fs_context("opening file for MD5", source)?;
            let mut context = md5::Context::new();
            io::copy(&mut src, &mut context)?;
            let digest = context.finalize();
            out.push_str(&format!("{:x}  {}\n", digest, path));
        }
    }
    Ok(out)
}

/// Adds `Installed-Size` to a control file that does not declare it.
fn with_installed_size(control: &str, size_kb: u64) -> String {
    if control.lines().any(|l| l.starts_with("Installed-Size:")) {
        return control.to_string();
    }
    let line = format!("Installed-Size: {size_kb}\n");
    let mut out = String::with_capacity(control.len() + line.len());
    let mut inserted = false;
    for l in control.split_inclusive('\n') {
        if !inserted && l.starts_with("Description:") {
            out.push_str(&line);
            inserted = true;
        }
        out.push_str(l);
    }
    if !inserted {
        if !out.is_empty() && !out.ends_with('\n') {
            out.push('\n');
        }
        out.push_str(&line);
    }
    out
}

fn control_archive(control_dir: &Path, tree: &DataTree, installed_size: u64) -> Result<Vec<u8>> {
    let control_path = control_dir.join("control");
    let control = fs::read_to_string(&control_path)
        .fs_context("reading control file", &control_path)?;
    let control = with_installed_size(&control, installed_size);
    let sums = md5sums(tree)?;

    let mut files: BTreeMap<String, (Vec<u8>, u32)> = BTreeMap::new();
    files.insert("control".into(), (control.into_bytes(), DEFAULT_FILE_MODE));
    files.insert("md5sums".into(), (sums.into_bytes(), DEFAULT_FILE_MODE));

    for entry in fs::read_dir(control_dir).fs_context("reading control directory", control_dir)? {
        let entry = entry?;
        let name = entry.file_name().to_string_lossy().into_owned();
        if files.contains_key(&name) || !entry.file_type()?.is_file() {
            continue;
        }
        let mut bytes = Vec::new();
        File::open(entry.path())
            .fs_context("opening control file", entry.path())?
            .read_to_end(&mut bytes)?;
        let mode = if MAINTAINER_SCRIPTS.contains(&name.as_str()) {
            SCRIPT_MODE
        } else {
            DEFAULT_FILE_MODE
        };
        files.insert(name, (bytes, mode));
    }

    gzip_tar(|tar| {
        let mut dir = header_for(DEFAULT_DIR_MODE, 0, tar::EntryType::Directory)?;
        tar.append_data(&mut dir, "./", io::empty())?;
        for (name, (bytes, mode)) in &files {
            let mut header = header_for(*mode, bytes.len() as u64, tar::EntryType::Regular)?;
            tar.append_data(&mut header, format!("./{name}"), bytes.as_slice())?;
        }
        Ok(())
    })
}
