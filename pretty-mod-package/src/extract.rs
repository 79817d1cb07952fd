//! Archive extraction and import root discovery

use crate::{PackageError, Result};
use flate2::read::GzDecoder;
use std::fs;
use std::io::Cursor;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Supported artifact formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveFormat {
    Wheel,
    Zip,
    TarGz,
}

impl ArchiveFormat {
    pub fn from_filename(filename: &str) -> Option<Self> {
        let lower = filename.to_ascii_lowercase();
        if lower.ends_with(".whl") {
            Some(ArchiveFormat::Wheel)
        } else if lower.ends_with(".zip") {
            Some(ArchiveFormat::Zip)
        } else if lower.ends_with(".tar.gz") || lower.ends_with(".tgz") {
            Some(ArchiveFormat::TarGz)
        } else {
            None
        }
    }
}

/// Unpack `bytes` (named `filename`) into `dest`
pub fn extract_archive(filename: &str, bytes: &[u8], dest: &Path) -> Result<()> {
    let format = ArchiveFormat::from_filename(filename)
        .ok_or_else(|| PackageError::extraction(filename, "unsupported archive format"))?;
    debug!("extracting {} ({:?}) into {}", filename, format, dest.display());

    match format {
        ArchiveFormat::Wheel | ArchiveFormat::Zip => extract_zip(filename, bytes, dest),
        ArchiveFormat::TarGz => extract_tar_gz(filename, bytes, dest),
    }
}

fn extract_zip(filename: &str, bytes: &[u8], dest: &Path) -> Result<()> {
    let mut archive = zip::ZipArchive::new(Cursor::new(bytes))
        .map_err(|e| PackageError::extraction(filename, e))?;

    for index in 0..archive.len() {
        let mut file = archive
            .by_index(index)
            .map_err(|e| PackageError::extraction(filename, e))?;
        // entries escaping the destination are skipped
        let Some(relative) = file.enclosed_name().map(Path::to_path_buf) else {
            debug!("skipping unsafe entry {}", file.name());
            continue;
        };
        let out = dest.join(relative);

        if file.is_dir() {
            fs::create_dir_all(&out).map_err(|e| PackageError::io(&out, e))?;
            continue;
        }
        if let Some(parent) = out.parent() {
            fs::create_dir_all(parent).map_err(|e| PackageError::io(parent, e))?;
        }
        let mut writer = fs::File::create(&out).map_err(|e| PackageError::io(&out, e))?;
        std::io::copy(&mut file, &mut writer).map_err(|e| PackageError::io(&out, e))?;
    }
    Ok(())
}

fn extract_tar_gz(filename: &str, bytes: &[u8], dest: &Path) -> Result<()> {
    let mut archive = tar::Archive::new(GzDecoder::new(Cursor::new(bytes)));
    // `unpack` refuses entries with `..` or absolute paths
    archive
        .unpack(dest)
        .map_err(|e| PackageError::extraction(filename, e))
}

/// Where `module` can be imported from inside an extracted tree
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportLayout {
    /// Directory to put on the search path
    pub import_root: PathBuf,
    /// Package directory or single-file module
    pub package_path: PathBuf,
}

/// Find the import root for `module` in `dir`
///
/// Wheels put packages at the top level; sdists nest them under
/// `{name}-{version}/` and sometimes under `src/`.
pub fn locate_import_root(dir: &Path, module: &str) -> Result<ImportLayout> {
    let top = single_subdir(dir);
    let mut candidates = vec![dir.to_path_buf()];
    if let Some(top) = &top {
        candidates.push(top.join("src"));
        candidates.push(top.clone());
    }
    candidates.push(dir.join("src"));

    for root in &candidates {
        if let Some(package_path) = module_in(root, module) {
            return Ok(ImportLayout {
                import_root: root.clone(),
                package_path,
            });
        }
    }

    // The distribution name and import name differ (`PyYAML` ships `yaml`);
    // fall back to the tree itself so the caller can look around.
    if has_dist_info(dir) {
        return Ok(ImportLayout {
            import_root: dir.to_path_buf(),
            package_path: dir.to_path_buf(),
        });
    }
    if let Some(top) = top {
        let root = if top.join("src").is_dir() {
            top.join("src")
        } else {
            top
        };
        return Ok(ImportLayout {
            import_root: root.clone(),
            package_path: root,
        });
    }

    Err(PackageError::extraction(
        dir.display().to_string(),
        format!("archive does not contain module '{}'", module),
    ))
}

fn module_in(root: &Path, module: &str) -> Option<PathBuf> {
    let package = root.join(module);
    // namespace packages have no __init__.py
    if package.is_dir() {
        return Some(package);
    }
    let file = root.join(format!("{}.py", module));
    file.is_file().then_some(file)
}

fn single_subdir(dir: &Path) -> Option<PathBuf> {
    let entries: Vec<PathBuf> = fs::read_dir(dir)
        .ok()?
        .flatten()
        .map(|e| e.path())
        .filter(|p| {
            !p.file_name()
                .and_then(|n| n.to_str())
                .map_or(false, |n| n.starts_with('.'))
        })
        .collect();
    match entries.as_slice() {
        [only] if only.is_dir() => Some(only.clone()),
        _ => None,
    }
}

fn has_dist_info(dir: &Path) -> bool {
    fs::read_dir(dir)
        .map(|entries| {
            entries.flatten().any(|e| {
                e.file_name()
                    .to_str()
                    .map_or(false, |n| n.ends_with(".dist-info"))
            })
        })
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn wheel_bytes(files: &[(&str, &str)]) -> Vec<u8> {
        let mut buffer = Cursor::new(Vec::new());
        {
            let mut writer = zip::ZipWriter::new(&mut buffer);
            let options = zip::write::FileOptions::default();
            for (name, content) in files {
                writer.start_file(*name, options).unwrap();
                writer.write_all(content.as_bytes()).unwrap();
            }
            writer.finish().unwrap();
        }
        buffer.into_inner()
    }

    fn tar_gz_bytes(files: &[(&str, &str)]) -> Vec<u8> {
        let encoder = flate2::write::GzEncoder::new(Vec::new(), flate2::Compression::default());
        let mut builder = tar::Builder::new(encoder);
        for (name, content) in files {
            let mut header = tar::Header::new_gnu();
            header.set_size(content.len() as u64);
            header.set_mode(0o644);
            header.set_cksum();
            builder.append_data(&mut header, name, content.as_bytes()).unwrap();
        }
        builder.into_inner().unwrap().finish().unwrap()
    }

    #[test]
    fn test_format_detection() {
        assert_eq!(ArchiveFormat::from_filename("a-1.0-py3-none-any.whl"), Some(ArchiveFormat::Wheel));
        assert_eq!(ArchiveFormat::from_filename("a-1.0.tar.gz"), Some(ArchiveFormat::TarGz));
        assert_eq!(ArchiveFormat::from_filename("a-1.0.zip"), Some(ArchiveFormat::Zip));
        assert_eq!(ArchiveFormat::from_filename("a-1.0.tar.bz2"), None);
    }

    #[test]
    fn test_wheel_layout() {
        let dir = tempfile::tempdir().unwrap();
        let bytes = wheel_bytes(&[
            ("demo/__init__.py", "def hello(): pass\n"),
            ("demo/sub.py", ""),
            ("demo-1.0.dist-info/METADATA", "Name: demo\n"),
        ]);
        extract_archive("demo-1.0-py3-none-any.whl", &bytes, dir.path()).unwrap();

        let layout = locate_import_root(dir.path(), "demo").unwrap();
        assert_eq!(layout.import_root, dir.path());
        assert_eq!(layout.package_path, dir.path().join("demo"));
    }

    #[test]
    fn test_sdist_src_layout() {
        let dir = tempfile::tempdir().unwrap();
        let bytes = tar_gz_bytes(&[
            ("demo-1.0/setup.py", ""),
            ("demo-1.0/src/demo/__init__.py", ""),
        ]);
        extract_archive("demo-1.0.tar.gz", &bytes, dir.path()).unwrap();

        let layout = locate_import_root(dir.path(), "demo").unwrap();
        assert_eq!(layout.import_root, dir.path().join("demo-1.0").join("src"));
    }

    #[test]
    fn test_single_module_distribution() {
        let dir = tempfile::tempdir().unwrap();
        let bytes = wheel_bytes(&[("six.py", "X = 1\n"), ("six-1.16.0.dist-info/RECORD", "")]);
        extract_archive("six-1.16.0-py2.py3-none-any.whl", &bytes, dir.path()).unwrap();

        let layout = locate_import_root(dir.path(), "six").unwrap();
        assert_eq!(layout.package_path, dir.path().join("six.py"));
    }

    #[test]
    fn test_zip_slip_entries_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let inner = dir.path().join("inner");
        fs::create_dir_all(&inner).unwrap();
        let bytes = wheel_bytes(&[("../escape.py", ""), ("ok/__init__.py", "")]);
        extract_archive("x.zip", &bytes, &inner).unwrap();
        assert!(!dir.path().join("escape.py").exists());
        assert!(inner.join("ok").join("__init__.py").is_file());
    }

    #[test]
    fn test_missing_module_is_extraction_error() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("README"), "").unwrap();
        let err = locate_import_root(dir.path(), "demo").unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::Extraction);
        assert!(err.to_string().contains("does not contain module 'demo'"));
    }

    #[test]
    fn test_corrupt_archive() {
        let dir = tempfile::tempdir().unwrap();
        let err = extract_archive("demo.whl", b"not a zip", dir.path()).unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::Extraction);
    }
}
