// Copyright (c) 2024-present, fjall-rs
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

use std::{
    fs::{File, OpenOptions},
    io::Write,
    path::Path,
};

pub const WAL_FILE: &str = "wal";
pub const SNAPSHOT_FILE: &str = "snapshot";

/// Returns the folder containing `path`, which is the working directory for bare file names.
fn parent_folder(path: &Path) -> &Path {
    path.parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."))
}

/// Atomically rewrites a file
pub fn rewrite_atomic(path: &Path, content: &[u8]) -> std::io::Result<()> {
    let folder = parent_folder(path);

    let mut temp_file = tempfile::NamedTempFile::new_in(folder)?;
    temp_file.write_all(content)?;
    temp_file.as_file().sync_all()?;
    temp_file.persist(path)?;

    fsync_directory(folder)?;

    Ok(())
}

/// Opens a file for appending, creating it if needed
pub fn open_append(path: &Path) -> std::io::Result<File> {
    OpenOptions::new().create(true).append(true).open(path)
}

#[cfg(not(target_os = "windows"))]
pub fn fsync_directory(path: &Path) -> std::io::Result<()> {
    let file = File::open(path)?;
    debug_assert!(file.metadata()?.is_dir());
    file.sync_all()
}

#[cfg(target_os = "windows")]
pub fn fsync_directory(path: &Path) -> std::io::Result<()> {
    // Cannot fsync directory on Windows
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use test_log::test;

    #[test]
    fn atomic_rewrite() -> crate::Result<()> {
        let dir = tempfile::tempdir()?;

        let path = dir.path().join("test.txt");
        {
            let mut file = File::create(&path)?;
            write!(file, "asdasdasdasdasd")?;
        }

        rewrite_atomic(&path, b"newcontent")?;

        let content = std::fs::read_to_string(&path)?;
        assert_eq!("newcontent", content);

        Ok(())
    }

    #[test]
    fn append_creates_file() -> crate::Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join(WAL_FILE);

        open_append(&path)?.write_all(b"ab")?;
        open_append(&path)?.write_all(b"cd")?;

        assert_eq!(b"abcd", std::fs::read(&path)?.as_slice());

        Ok(())
    }

    #[test]
    fn parent_of_bare_file_name() {
        assert_eq!(Path::new("."), parent_folder(Path::new(SNAPSHOT_FILE)));
        assert_eq!(Path::new("/tmp"), parent_folder(Path::new("/tmp/snapshot")));
    }
}
