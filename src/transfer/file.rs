//! File operations for transfer.
//!
//! - Atomic writes: write to temp file, sync to disk, then rename
//! - Member reads that turn header problems into `Malformed`
//! - Exact-name listing of archive members

use std::collections::HashSet;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use crate::codec::{read_table, CodecError, RawTable};
use crate::transfer::types::{TransferError, TransferResult};

/// Write content to a file atomically.
///
/// This function:
/// 1. Writes content to a temporary file next to the target
/// 2. Calls `fsync` to ensure data is on disk
/// 3. Atomically renames the temp file to the target path
///
/// If any step fails, the original file (if any) remains untouched.
///
/// # Errors
///
/// Returns an error if any file operation fails.
pub fn atomic_write(path: &Path, content: &[u8]) -> TransferResult<()> {
    let mut temp_name = path.file_name().unwrap_or_default().to_os_string();
    temp_name.push(".tmp");
    let temp_path = path.with_file_name(temp_name);

    // Ensure parent directory exists
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    {
        let file = File::create(&temp_path)?;
        let mut writer = BufWriter::new(file);
        writer.write_all(content)?;
        writer.flush()?;
        // Sync to disk before rename
        writer.get_ref().sync_all()?;
    }

    fs::rename(&temp_path, path)?;

    Ok(())
}

/// Read a CSV member into a table.
///
/// # Errors
///
/// Returns `TransferError::FileNotFound` when the path does not exist and
/// `TransferError::Malformed` when the header is missing or the stream
/// cannot be parsed.
pub fn read_member(path: &Path) -> TransferResult<RawTable> {
    if !path.exists() {
        return Err(TransferError::FileNotFound(path.display().to_string()));
    }
    let reader = BufReader::new(File::open(path)?);
    read_table(reader).map_err(|e| malformed(path, &e))
}

pub(crate) fn malformed(path: &Path, err: &CodecError) -> TransferError {
    TransferError::Malformed {
        member: member_label(path),
        message: err.to_string(),
    }
}

pub(crate) fn member_label(path: &Path) -> String {
    path.file_name()
        .map_or_else(|| path.display().to_string(), |n| n.to_string_lossy().into_owned())
}

/// Names of the regular files directly inside `dir`.
///
/// Names come from the directory listing itself, so member lookups match
/// case-sensitively even on case-folding filesystems.
///
/// # Errors
///
/// Returns an error if the directory cannot be read.
pub fn list_members(dir: &Path) -> TransferResult<HashSet<String>> {
    let mut names = HashSet::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        if entry.file_type()?.is_file() {
            names.insert(entry.file_name().to_string_lossy().into_owned());
        }
    }
    Ok(names)
}

/// Get the size of a file in bytes.
///
/// Returns 0 if the file doesn't exist.
pub fn file_size(path: &Path) -> u64 {
    fs::metadata(path).map(|m| m.len()).unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_atomic_write_replaces_content() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("out").join("Channel.CSV");

        atomic_write(&path, b"old\n").unwrap();
        atomic_write(&path, b"new\n").unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), "new\n");
        assert!(!temp_dir.path().join("out").join("Channel.CSV.tmp").exists());
    }

    #[test]
    fn test_read_member_missing() {
        let result = read_member(Path::new("/nonexistent/channels.csv"));
        assert!(matches!(result, Err(TransferError::FileNotFound(_))));
    }

    #[test]
    fn test_read_member_empty_is_malformed() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("zones.csv");
        fs::write(&path, "").unwrap();

        match read_member(&path) {
            Err(TransferError::Malformed { member, .. }) => assert_eq!(member, "zones.csv"),
            other => panic!("expected malformed, got {other:?}"),
        }
    }

    #[test]
    fn test_list_members_keeps_exact_names() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join("Channel.CSV"), "a\n").unwrap();
        fs::create_dir(temp_dir.path().join("nested")).unwrap();

        let names = list_members(temp_dir.path()).unwrap();
        assert!(names.contains("Channel.CSV"));
        assert!(!names.contains("channel.csv"));
        assert!(!names.contains("nested"));
    }

    #[test]
    fn test_file_size() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("a.csv");
        assert_eq!(file_size(&path), 0);
        fs::write(&path, "abc").unwrap();
        assert_eq!(file_size(&path), 3);
    }
}
