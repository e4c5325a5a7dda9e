//! Zip creation for backup artifacts.

use std::{
    fs, io,
    path::Path,
};

use zip::{write::FileOptions, CompressionMethod, ZipWriter};

use crate::{errors::Error, Result};

/// Compress the contents of `src_dir` into the archive at `dest` (deflate).
/// Entry names are relative to `src_dir`.
pub fn create_zip(src_dir: &Path, dest: &Path) -> Result<()> {
    let file = fs::File::create(dest)?;
    let mut zip = ZipWriter::new(file);
    let opts = FileOptions::default().compression_method(CompressionMethod::Deflated);

    add_dir(&mut zip, src_dir, src_dir, opts)?;
    zip.finish().map_err(zip_err)?;
    Ok(())
}

fn add_dir(
    zip: &mut ZipWriter<fs::File>,
    root: &Path,
    dir: &Path,
    opts: FileOptions,
) -> Result<()> {
    let mut entries = fs::read_dir(dir)?.collect::<io::Result<Vec<_>>>()?;
    // Deterministic entry order.
    entries.sort_by_key(|e| e.file_name());

    for entry in entries {
        let path = entry.path();
        let rel = path
            .strip_prefix(root)
            .map_err(|_| Error::Backup(format!("entry escapes staging root: {}", path.display())))?;
        let name = rel.to_string_lossy().replace('\\', "/");

        if path.is_dir() {
            zip.add_directory(format!("{name}/"), opts).map_err(zip_err)?;
            add_dir(zip, root, &path, opts)?;
        } else {
            zip.start_file(name, opts).map_err(zip_err)?;
            let mut f = fs::File::open(&path)?;
            io::copy(&mut f, zip)?;
        }
    }

    Ok(())
}

fn zip_err(e: zip::result::ZipError) -> Error {
    Error::Backup(format!("zip error: {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;
    use std::path::PathBuf;

    fn tmp(prefix: &str) -> PathBuf {
        let ts = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default()
            .as_nanos();
        let pid = std::process::id();
        PathBuf::from(format!("/tmp/{prefix}-{pid}-{ts}"))
    }

    #[test]
    fn zips_nested_tree_with_relative_names() {
        let root = tmp("panelbot-zip");
        fs::create_dir_all(root.join("sub")).unwrap();
        fs::write(root.join("a.txt"), b"alpha").unwrap();
        fs::write(root.join("sub/b.txt"), b"beta").unwrap();

        let dest = tmp("panelbot-zip-out").with_extension("zip");
        create_zip(&root, &dest).unwrap();

        let mut archive = zip::ZipArchive::new(fs::File::open(&dest).unwrap()).unwrap();
        let mut buf = String::new();
        archive
            .by_name("a.txt")
            .unwrap()
            .read_to_string(&mut buf)
            .unwrap();
        assert_eq!(buf, "alpha");

        buf.clear();
        archive
            .by_name("sub/b.txt")
            .unwrap()
            .read_to_string(&mut buf)
            .unwrap();
        assert_eq!(buf, "beta");

        let _ = fs::remove_dir_all(&root);
        let _ = fs::remove_file(&dest);
    }

    #[test]
    fn empty_dir_yields_valid_empty_archive() {
        let root = tmp("panelbot-zip-empty");
        fs::create_dir_all(&root).unwrap();

        let dest = tmp("panelbot-zip-empty-out").with_extension("zip");
        create_zip(&root, &dest).unwrap();

        let archive = zip::ZipArchive::new(fs::File::open(&dest).unwrap()).unwrap();
        assert_eq!(archive.len(), 0);

        let _ = fs::remove_dir_all(&root);
        let _ = fs::remove_file(&dest);
    }
}
