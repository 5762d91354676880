use std::{
    fs,
    io::{ErrorKind, Write},
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use walkdir::WalkDir;

/// List regular files directly inside `dir_path` (or below it when
/// `recursive`) whose file name satisfies `keep`. Missing directories yield an
/// empty list.
pub fn list_files<P, F>(dir_path: P, recursive: bool, mut keep: F) -> Result<Vec<PathBuf>>
where
    P: AsRef<Path>,
    F: FnMut(&str) -> bool,
{
    let mut files = vec![];
    let dir_path = dir_path.as_ref();
    if !dir_path.exists() {
        return Ok(files);
    }

    for entry in WalkDir::new(dir_path)
        .min_depth(1)
        .max_depth(if recursive { usize::MAX } else { 1 })
    {
        let entry = entry.with_context(|| format!("Failed to walk {}", dir_path.display()))?;
        if !entry.file_type().is_file() {
            continue;
        }

        let Some(name) = entry.file_name().to_str() else {
            continue;
        };
        if keep(name) {
            files.push(entry.into_path());
        }
    }
    files.sort();
    Ok(files)
}

/// Write atomically, creating all leading directories.
pub fn create_dirs_then_write<P: AsRef<Path>>(
    file_path: P,
    contents: impl AsRef<[u8]>,
) -> std::io::Result<()> {
    write_via_temp_file(file_path.as_ref(), contents.as_ref(), false)
}

/// Like [`create_dirs_then_write`], but on unix the file is readable by its
/// owner only, from before it appears under `file_path`.
pub fn create_dirs_then_write_private<P: AsRef<Path>>(
    file_path: P,
    contents: impl AsRef<[u8]>,
) -> std::io::Result<()> {
    write_via_temp_file(file_path.as_ref(), contents.as_ref(), true)
}

fn write_via_temp_file(file_path: &Path, contents: &[u8], private: bool) -> std::io::Result<()> {
    let parent_dir = file_path.parent().ok_or_else(|| {
        std::io::Error::new(
            std::io::ErrorKind::InvalidInput,
            "File path has no parent directory",
        )
    })?;
    fs::create_dir_all(parent_dir)?;

    let temp_path = create_temp_file_path(parent_dir);

    let result = write_synced(&temp_path, contents, private)
        .and_then(|()| fs::rename(&temp_path, file_path));
    if result.is_err() {
        let _ = fs::remove_file(&temp_path);
    }
    result
}

/// Read a whole file as UTF-8, mapping a missing file to `None`.
pub fn read_to_string_if_exists<P: AsRef<Path>>(path: P) -> Result<Option<String>> {
    let path = path.as_ref();
    match fs::read_to_string(path) {
        Ok(contents) => Ok(Some(contents)),
        Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
        Err(err) => Err(err).with_context(|| format!("Failed to read {}", path.display())),
    }
}

/// Remove a file, reporting whether it existed.
pub fn remove_file_if_exists<P: AsRef<Path>>(path: P) -> std::io::Result<bool> {
    match fs::remove_file(path) {
        Ok(()) => Ok(true),
        Err(err) if err.kind() == ErrorKind::NotFound => Ok(false),
        Err(err) => Err(err),
    }
}

fn write_synced(path: &Path, contents: &[u8], private: bool) -> std::io::Result<()> {
    let mut options = fs::OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        if private {
            options.mode(0o600);
        }
    }

    let mut file = options.open(path)?;
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        // The mode above only applies to newly created files.
        if private {
            file.set_permissions(fs::Permissions::from_mode(0o600))?;
        }
    }
    #[cfg(not(unix))]
    let _ = private;
    file.write_all(contents)?;
    file.sync_all()
}

fn create_temp_file_path(dir: &Path) -> PathBuf {
    use std::time::{SystemTime, UNIX_EPOCH};

    let timestamp = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos();

    let process_id = std::process::id();
    let temp_name = format!(".tmp_{}__{}", process_id, timestamp);

    dir.join(temp_name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_dirs_then_write_replaces_and_leaves_no_temp_files() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("license.key");

        create_dirs_then_write(&path, "first").unwrap();
        create_dirs_then_write(&path, "second").unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), "second");
        let leftovers = list_files(dir.path(), false, |name| name.starts_with(".tmp_")).unwrap();
        assert!(leftovers.is_empty());
    }

    #[cfg(unix)]
    #[test]
    fn private_write_is_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("license.key");
        fs::write(&path, "old").unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o644)).unwrap();

        create_dirs_then_write_private(&path, "secret").unwrap();

        let mode = fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
        assert_eq!(fs::read_to_string(&path).unwrap(), "secret");
    }

    #[test]
    fn create_dirs_then_write_creates_parents() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a").join("b").join("settings.json");

        create_dirs_then_write(&path, "{}\n").unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "{}\n");
    }

    #[test]
    fn list_files_filters_by_name_and_skips_directories() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("RavenClient-1.0.jar"), b"old").unwrap();
        fs::write(dir.path().join("other.jar.delete"), b"").unwrap();
        fs::create_dir(dir.path().join("nested.jar")).unwrap();

        let jars = list_files(dir.path(), false, |name| name.ends_with(".jar")).unwrap();
        assert_eq!(jars, vec![dir.path().join("RavenClient-1.0.jar")]);
    }

    #[test]
    fn list_files_on_missing_dir_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let files = list_files(dir.path().join("missing"), true, |_| true).unwrap();
        assert!(files.is_empty());
    }

    #[test]
    fn missing_files_are_not_errors() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent");

        assert!(read_to_string_if_exists(&path).unwrap().is_none());
        assert!(!remove_file_if_exists(&path).unwrap());

        fs::write(&path, "x").unwrap();
        assert_eq!(read_to_string_if_exists(&path).unwrap().as_deref(), Some("x"));
        assert!(remove_file_if_exists(&path).unwrap());
        assert!(!path.exists());
    }
}
