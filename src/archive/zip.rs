use std::fs::{self, File};
use std::io::{self, Read, Seek, Write};
use std::path::Path;

use ::zip::write::SimpleFileOptions;
use ::zip::{CompressionMethod, ZipArchive, ZipWriter};
use walkdir::WalkDir;

use super::ArchiveError;

/// Entries at or above this size need ZIP64 headers
const ZIP64_THRESHOLD: u64 = u32::MAX as u64;

/// Write every regular file under `src` into a zip archive.
///
/// Entry names are the file paths relative to `src`, joined with `/` whatever
/// the host separator is. Directories only appear implicitly through the
/// names of the files they contain, so empty directories are not recorded.
/// Files are visited in name order, which keeps archives of the same tree
/// byte-for-byte comparable apart from timestamps.
///
/// `skip` names a file to leave out, typically the archive itself when it is
/// being written somewhere under `src`. It is compared against the walked
/// paths as-is, so pass both `src` and `skip` in the same (canonical) form.
///
/// Returns the number of files written.
pub fn write_dir_zip<W: Write + Seek>(
    src: &Path,
    out: W,
    skip: Option<&Path>,
) -> Result<usize, ArchiveError> {
    if !src.is_dir() {
        return Err(ArchiveError::NotADirectory(src.to_path_buf()));
    }

    let mut writer = ZipWriter::new(out);
    let mut count = 0;

    for entry in WalkDir::new(src).sort_by_file_name() {
        let entry = entry?;
        if !entry.file_type().is_file() || skip == Some(entry.path()) {
            continue;
        }

        let name = entry_name(src, entry.path())?;
        let metadata = entry.metadata()?;

        let options = SimpleFileOptions::default()
            .compression_method(CompressionMethod::Deflated)
            .large_file(metadata.len() >= ZIP64_THRESHOLD);

        #[cfg(unix)]
        let options = {
            use std::os::unix::fs::PermissionsExt;
            options.unix_permissions(metadata.permissions().mode() & 0o777)
        };

        writer.start_file(name, options)?;
        let mut file = File::open(entry.path())?;
        io::copy(&mut file, &mut writer)?;
        count += 1;
    }

    writer.finish()?;
    Ok(count)
}

/// Extract every entry of a zip archive into `dest`, creating `dest` and any
/// directories implied by entry names.
///
/// Existing files are overwritten. Stored permission bits are not applied, so
/// a read-only file in the archive never blocks a later extraction over the
/// same destination.
///
/// Entries with absolute names or names that climb above `dest` are refused
/// before anything is written for them.
///
/// Returns the number of files written.
pub fn extract_zip<R: Read + Seek>(reader: R, dest: &Path) -> Result<usize, ArchiveError> {
    let mut archive = ZipArchive::new(reader)?;
    fs::create_dir_all(dest)?;

    let mut written = 0;
    for i in 0..archive.len() {
        let mut entry = archive.by_index(i)?;
        let relative = entry
            .enclosed_name()
            .ok_or_else(|| ArchiveError::UnsafeEntry(entry.name().to_string()))?;
        let out_path = dest.join(relative);

        if entry.is_dir() {
            fs::create_dir_all(&out_path)?;
            continue;
        }

        if let Some(parent) = out_path.parent() {
            fs::create_dir_all(parent)?;
        }

        let mut out = File::create(&out_path)?;
        io::copy(&mut entry, &mut out)?;
        written += 1;
    }

    Ok(written)
}

fn entry_name(root: &Path, path: &Path) -> Result<String, ArchiveError> {
    let relative = path.strip_prefix(root).map_err(io::Error::other)?;
    let parts: Vec<_> = relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect();
    Ok(parts.join("/"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn sample_tree() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("a/b")).unwrap();
        fs::create_dir_all(dir.path().join("empty")).unwrap();
        fs::write(dir.path().join("a/b/c.txt"), b"deep file").unwrap();
        fs::write(dir.path().join("top.txt"), b"top level").unwrap();
        dir
    }

    fn entry_names(data: Vec<u8>) -> Vec<String> {
        let mut archive = ZipArchive::new(Cursor::new(data)).unwrap();
        (0..archive.len())
            .map(|i| archive.by_index(i).unwrap().name().to_string())
            .collect()
    }

    #[test]
    fn test_write_uses_relative_slash_names() {
        let tree = sample_tree();

        let mut buf = Cursor::new(Vec::new());
        let count = write_dir_zip(tree.path(), &mut buf, None).unwrap();

        assert_eq!(count, 2);
        assert_eq!(entry_names(buf.into_inner()), vec!["a/b/c.txt", "top.txt"]);
    }

    #[test]
    fn test_write_uses_deflate() {
        let tree = sample_tree();
        fs::write(tree.path().join("big.txt"), "compress me ".repeat(1000)).unwrap();

        let mut buf = Cursor::new(Vec::new());
        write_dir_zip(tree.path(), &mut buf, None).unwrap();

        let mut archive = ZipArchive::new(Cursor::new(buf.into_inner())).unwrap();
        let entry = archive.by_name("big.txt").unwrap();
        assert_eq!(entry.compression(), CompressionMethod::Deflated);
        assert!(entry.compressed_size() < entry.size());
    }

    #[test]
    fn test_write_rejects_file_source() {
        let tree = sample_tree();
        let file = tree.path().join("top.txt");

        let result = write_dir_zip(&file, Cursor::new(Vec::new()), None);
        assert!(matches!(result, Err(ArchiveError::NotADirectory(p)) if p == file));
    }

    #[test]
    fn test_extract_recreates_tree() {
        let tree = sample_tree();
        let mut buf = Cursor::new(Vec::new());
        write_dir_zip(tree.path(), &mut buf, None).unwrap();

        let out = tempfile::tempdir().unwrap();
        let dest = out.path().join("restored/nested");
        buf.set_position(0);
        let count = extract_zip(buf, &dest).unwrap();

        assert_eq!(count, 2);
        assert_eq!(fs::read(dest.join("a/b/c.txt")).unwrap(), b"deep file");
        assert_eq!(fs::read(dest.join("top.txt")).unwrap(), b"top level");
        assert!(!dest.join("empty").exists());
    }

    #[test]
    fn test_extract_rejects_parent_traversal() {
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        writer
            .start_file("../escaped.txt", SimpleFileOptions::default())
            .unwrap();
        writer.write_all(b"should not land").unwrap();
        let data = writer.finish().unwrap().into_inner();

        let out = tempfile::tempdir().unwrap();
        let dest = out.path().join("dest");
        let result = extract_zip(Cursor::new(data), &dest);

        assert!(matches!(result, Err(ArchiveError::UnsafeEntry(name)) if name == "../escaped.txt"));
        assert!(!out.path().join("escaped.txt").exists());
    }

    #[test]
    fn test_extract_rejects_non_zip() {
        let out = tempfile::tempdir().unwrap();
        let result = extract_zip(Cursor::new(b"definitely not a zip".to_vec()), out.path());
        assert!(matches!(result, Err(ArchiveError::Zip(_))));
    }

    #[test]
    fn test_entry_name_joins_with_slash() {
        let root = Path::new("/data/notes");
        let path = root.join("2024").join("jan").join("todo.md");
        assert_eq!(entry_name(root, &path).unwrap(), "2024/jan/todo.md");
    }

    #[test]
    fn test_write_skips_excluded_file() {
        let tree = sample_tree();
        let skipped = tree.path().join("a/b/c.txt");

        let mut buf = Cursor::new(Vec::new());
        let count = write_dir_zip(tree.path(), &mut buf, Some(&skipped)).unwrap();

        assert_eq!(count, 1);
        assert_eq!(entry_names(buf.into_inner()), vec!["top.txt"]);
    }

    #[test]
    fn test_extract_twice_over_read_only_file() {
        let tree = sample_tree();
        let locked = tree.path().join("top.txt");
        let mut perms = fs::metadata(&locked).unwrap().permissions();
        perms.set_readonly(true);
        fs::set_permissions(&locked, perms).unwrap();

        let mut buf = Cursor::new(Vec::new());
        write_dir_zip(tree.path(), &mut buf, None).unwrap();
        let data = buf.into_inner();

        let out = tempfile::tempdir().unwrap();
        assert_eq!(extract_zip(Cursor::new(data.clone()), out.path()).unwrap(), 2);
        assert!(!fs::metadata(out.path().join("top.txt")).unwrap().permissions().readonly());

        fs::write(out.path().join("a/b/c.txt"), b"edited locally").unwrap();
        assert_eq!(extract_zip(Cursor::new(data), out.path()).unwrap(), 2);

        assert_eq!(fs::read(out.path().join("top.txt")).unwrap(), b"top level");
        assert_eq!(fs::read(out.path().join("a/b/c.txt")).unwrap(), b"deep file");
    }
}
