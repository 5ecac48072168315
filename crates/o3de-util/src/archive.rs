//! Archive creation (zip, tar.gz, tar.bz2, tar.xz) and safe tar.gz extraction.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Component, Path, PathBuf};
use std::str::FromStr;

use crate::error::UtilError;

/// Output formats accepted for packaged layouts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveFormat {
    None,
    Zip,
    Gzip,
    Bz2,
    Xz,
}

impl ArchiveFormat {
    /// File suffix appended to the archive base name.
    pub fn extension(self) -> &'static str {
        match self {
            Self::None => "",
            Self::Zip => "zip",
            Self::Gzip => "tar.gz",
            Self::Bz2 => "tar.bz2",
            Self::Xz => "tar.xz",
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Zip => "zip",
            Self::Gzip => "gzip",
            Self::Bz2 => "bz2",
            Self::Xz => "xz",
        }
    }
}

impl FromStr for ArchiveFormat {
    type Err = UtilError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" | "none" => Ok(Self::None),
            "zip" => Ok(Self::Zip),
            "gzip" | "gztar" => Ok(Self::Gzip),
            "bz2" | "bztar" => Ok(Self::Bz2),
            "xz" | "xztar" => Ok(Self::Xz),
            other => Err(UtilError::UnknownArchiveFormat {
                name: other.to_owned(),
            }),
        }
    }
}

fn io_err(path: &Path, source: std::io::Error) -> UtilError {
    UtilError::Io {
        path: path.display().to_string(),
        source,
    }
}

fn archive_err(path: &Path, e: impl std::fmt::Display) -> UtilError {
    UtilError::Archive {
        path: path.display().to_string(),
        message: e.to_string(),
    }
}

/// Compress the contents of `src_dir` into `<base>.<ext>`.
///
/// Entries are stored relative to the parent of `src_dir`, so the archive
/// unpacks into a single top-level directory named after `src_dir`.
/// Returns `None` for [`ArchiveFormat::None`].
///
/// # Errors
/// Returns an error if any file cannot be read or the archive cannot be written.
pub fn create_archive(
    src_dir: &Path,
    base: &Path,
    format: ArchiveFormat,
) -> Result<Option<PathBuf>, UtilError> {
    if format == ArchiveFormat::None {
        return Ok(None);
    }
    let mut file_name = base.file_name().unwrap_or_default().to_os_string();
    file_name.push(".");
    file_name.push(format.extension());
    let dest = base.with_file_name(file_name);
    if let Some(parent) = dest.parent() {
        crate::fs::ensure_dir(parent)?;
    }

    let root_name = src_dir
        .file_name()
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("package"));
    let files = collect_entries(src_dir)?;
    let out = File::create(&dest).map_err(|source| io_err(&dest, source))?;

    match format {
        ArchiveFormat::Zip => write_zip(out, src_dir, &root_name, &files, &dest)?,
        ArchiveFormat::Gzip => {
            let enc = flate2::write::GzEncoder::new(out, flate2::Compression::default());
            write_tar(enc, src_dir, &root_name, &dest)?.finish().map_err(|e| archive_err(&dest, e))?;
        }
        ArchiveFormat::Bz2 => {
            let enc = bzip2::write::BzEncoder::new(out, bzip2::Compression::default());
            write_tar(enc, src_dir, &root_name, &dest)?.finish().map_err(|e| archive_err(&dest, e))?;
        }
        ArchiveFormat::Xz => {
            let enc = xz2::write::XzEncoder::new(out, 6);
            write_tar(enc, src_dir, &root_name, &dest)?.finish().map_err(|e| archive_err(&dest, e))?;
        }
        ArchiveFormat::None => {}
    }

    tracing::info!(archive = %dest.display(), "created archive");
    Ok(Some(dest))
}

fn write_tar<W: Write>(
    writer: W,
    src_dir: &Path,
    root_name: &Path,
    dest: &Path,
) -> Result<W, UtilError> {
    let mut builder = tar::Builder::new(writer);
    builder.follow_symlinks(false);
    builder
        .append_dir_all(root_name, src_dir)
        .map_err(|e| archive_err(dest, e))?;
    builder.into_inner().map_err(|e| archive_err(dest, e))
}

fn write_zip(
    out: File,
    src_dir: &Path,
    root_name: &Path,
    files: &[PathBuf],
    dest: &Path,
) -> Result<(), UtilError> {
    let mut zip = zip::ZipWriter::new(BufWriter::new(out));
    let options = zip::write::SimpleFileOptions::default()
        .compression_method(zip::CompressionMethod::Deflated);

    for path in files {
        let relative = path.strip_prefix(src_dir).unwrap_or(path);
        let name = zip_name(&root_name.join(relative));
        if path.is_dir() {
            zip.add_directory(name, options).map_err(|e| archive_err(dest, e))?;
        } else {
            zip.start_file(name, options).map_err(|e| archive_err(dest, e))?;
            let mut input = File::open(path).map_err(|source| io_err(path, source))?;
            std::io::copy(&mut input, &mut zip).map_err(|source| io_err(path, source))?;
        }
    }
    zip.finish().map_err(|e| archive_err(dest, e))?;
    Ok(())
}

fn zip_name(path: &Path) -> String {
    path.components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect::<Vec<_>>()
        .join("/")
}

fn collect_entries(dir: &Path) -> Result<Vec<PathBuf>, UtilError> {
    let mut out = Vec::new();
    collect_entries_recursive(dir, &mut out)?;
    out.sort();
    Ok(out)
}

fn collect_entries_recursive(dir: &Path, out: &mut Vec<PathBuf>) -> Result<(), UtilError> {
    let entries = std::fs::read_dir(dir).map_err(|source| io_err(dir, source))?;
    for entry in entries {
        let path = entry.map_err(|source| io_err(dir, source))?.path();
        if path.is_dir() {
            out.push(path.clone());
            collect_entries_recursive(&path, out)?;
        } else {
            out.push(path);
        }
    }
    Ok(())
}

/// Pack `src_dir` into an in-memory `.tar.gz`, entries relative to `src_dir`.
///
/// # Errors
/// Returns an error if any file cannot be read.
pub fn tar_gz_bytes(src_dir: &Path) -> Result<Vec<u8>, UtilError> {
    let enc = flate2::write::GzEncoder::new(Vec::new(), flate2::Compression::default());
    let enc = write_tar(enc, src_dir, Path::new("."), src_dir)?;
    enc.finish().map_err(|e| archive_err(src_dir, e))
}

/// Extract a `.tar.gz` stream into `dest`.
///
/// Each entry's path is validated to stay within `dest`.
///
/// # Errors
/// Returns an error on a malformed archive, an I/O failure, or an entry that
/// would escape `dest`.
pub fn extract_tar_gz<R: std::io::Read>(reader: R, dest: &Path) -> Result<(), UtilError> {
    crate::fs::ensure_dir(dest)?;
    let canonical_dest = std::fs::canonicalize(dest).map_err(|source| io_err(dest, source))?;

    let decoder = flate2::read::GzDecoder::new(reader);
    let mut archive = tar::Archive::new(decoder);
    let entries = archive.entries().map_err(|e| archive_err(dest, e))?;

    for entry in entries {
        let mut entry = entry.map_err(|e| archive_err(dest, e))?;
        let entry_path = entry.path().map_err(|e| archive_err(dest, e))?.into_owned();

        if entry_path
            .components()
            .any(|c| matches!(c, Component::ParentDir | Component::RootDir | Component::Prefix(_)))
        {
            return Err(UtilError::PathTraversal {
                entry_path: entry_path.display().to_string(),
                dest: canonical_dest.display().to_string(),
            });
        }

        let target = canonical_dest.join(&entry_path);
        if let Some(parent) = target.parent() {
            crate::fs::ensure_dir(parent)?;
        }
        entry.unpack(&target).map_err(|e| archive_err(&target, e))?;
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::fs;
    use std::io::Read;

    use super::*;

    fn sample_layout(root: &Path) -> PathBuf {
        let layout = root.join("GamePackage");
        fs::create_dir_all(layout.join("Cache").join("linux")).unwrap();
        fs::write(layout.join("project.json"), b"{}").unwrap();
        fs::write(layout.join("Cache").join("linux").join("game_linux.pak"), b"pak").unwrap();
        layout
    }

    #[test]
    fn parse_formats() {
        assert_eq!("none".parse::<ArchiveFormat>().unwrap(), ArchiveFormat::None);
        assert_eq!("ZIP".parse::<ArchiveFormat>().unwrap(), ArchiveFormat::Zip);
        assert_eq!("gzip".parse::<ArchiveFormat>().unwrap(), ArchiveFormat::Gzip);
        assert_eq!("bz2".parse::<ArchiveFormat>().unwrap(), ArchiveFormat::Bz2);
        assert_eq!("xz".parse::<ArchiveFormat>().unwrap(), ArchiveFormat::Xz);
        assert!("rar".parse::<ArchiveFormat>().is_err());
    }

    #[test]
    fn none_format_writes_nothing() {
        let tmp = tempfile::tempdir().unwrap();
        let layout = sample_layout(tmp.path());
        let out = create_archive(&layout, &tmp.path().join("out"), ArchiveFormat::None).unwrap();
        assert!(out.is_none());
    }

    #[test]
    fn zip_contains_layout_files() {
        let tmp = tempfile::tempdir().unwrap();
        let layout = sample_layout(tmp.path());
        let out = create_archive(&layout, &tmp.path().join("GamePackage"), ArchiveFormat::Zip)
            .unwrap()
            .unwrap();
        assert!(out.ends_with("GamePackage.zip"));

        let mut zip = zip::ZipArchive::new(File::open(&out).unwrap()).unwrap();
        let mut entry = zip.by_name("GamePackage/Cache/linux/game_linux.pak").unwrap();
        let mut contents = String::new();
        entry.read_to_string(&mut contents).unwrap();
        assert_eq!(contents, "pak");
    }

    #[test]
    fn gzip_round_trips_through_extract() {
        let tmp = tempfile::tempdir().unwrap();
        let layout = sample_layout(tmp.path());
        let out = create_archive(&layout, &tmp.path().join("pkg"), ArchiveFormat::Gzip)
            .unwrap()
            .unwrap();
        assert!(out.to_string_lossy().ends_with("pkg.tar.gz"));

        let dest = tmp.path().join("unpacked");
        extract_tar_gz(File::open(&out).unwrap(), &dest).unwrap();
        assert!(dest.join("GamePackage").join("project.json").exists());
    }

    #[test]
    fn bz2_and_xz_produce_files() {
        let tmp = tempfile::tempdir().unwrap();
        let layout = sample_layout(tmp.path());
        for format in [ArchiveFormat::Bz2, ArchiveFormat::Xz] {
            let out = create_archive(&layout, &tmp.path().join("pkg"), format)
                .unwrap()
                .unwrap();
            assert!(fs::metadata(&out).unwrap().len() > 0);
        }
    }

    #[test]
    fn tar_gz_bytes_is_relative_to_dir() {
        let tmp = tempfile::tempdir().unwrap();
        let layout = sample_layout(tmp.path());
        let bytes = tar_gz_bytes(&layout).unwrap();
        let dest = tmp.path().join("restored");
        extract_tar_gz(bytes.as_slice(), &dest).unwrap();
        assert!(dest.join("project.json").exists());
    }
}
