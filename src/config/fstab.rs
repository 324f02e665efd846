//! Mount table file loading.
//!
//! The file is a JSON object with a single `Fstab` map from source descriptor
//! to mount point:
//!
//! ```json
//! { "Fstab": { "http://origin.example/": "/mnt/a", "worker": "/mnt/b" } }
//! ```

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::time::SystemTime;

use serde::Deserialize;

use crate::error::FstabError;

/// One line of the mount table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MountEntry {
    /// Origin URI (`scheme://host[/path]`) or the identity of a registered handler.
    pub source: String,
    /// Path prefix the source is exposed under.
    pub mount_point: String,
}

impl MountEntry {
    pub fn new(source: impl Into<String>, mount_point: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            mount_point: mount_point.into(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct FstabFile {
    #[serde(rename = "Fstab", alias = "fstab")]
    fstab: BTreeMap<String, String>,
}

/// Parse mount table content.
///
/// Entries come back sorted by source descriptor. A descriptor that appears
/// twice keeps the last mount point seen.
pub fn parse_fstab(content: &str) -> Result<Vec<MountEntry>, serde_json::Error> {
    let file: FstabFile = serde_json::from_str(content)?;
    Ok(file
        .fstab
        .into_iter()
        .map(|(source, mount_point)| MountEntry { source, mount_point })
        .collect())
}

/// Read and parse the mount table at `path`.
pub fn load_fstab(path: &Path) -> Result<Vec<MountEntry>, FstabError> {
    let content = fs::read_to_string(path).map_err(|source| FstabError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    let entries = parse_fstab(&content).map_err(|source| FstabError::Parse {
        path: path.to_path_buf(),
        source,
    })?;

    if let Some(bad) = entries.iter().find(|e| !e.mount_point.starts_with('/')) {
        return Err(FstabError::InvalidMountPoint {
            descriptor: bad.source.clone(),
            mount_point: bad.mount_point.clone(),
        });
    }

    Ok(entries)
}

/// Modification time of the mount table file.
pub fn source_modified(path: &Path) -> std::io::Result<SystemTime> {
    fs::metadata(path)?.modified()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn write_temp(content: &str) -> PathBuf {
        let path = std::env::temp_dir().join(format!("fstab-{}.json", uuid::Uuid::new_v4()));
        fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_parse_sorted_entries() {
        let entries = parse_fstab(
            r#"{ "Fstab": { "worker": "/mnt/b", "http://a.example/": "/mnt/a" } }"#,
        )
        .unwrap();

        assert_eq!(
            entries,
            vec![
                MountEntry::new("http://a.example/", "/mnt/a"),
                MountEntry::new("worker", "/mnt/b"),
            ]
        );
    }

    #[test]
    fn test_parse_requires_fstab_field() {
        assert!(parse_fstab(r#"{ "Mounts": {} }"#).is_err());
        assert!(parse_fstab(r#"{ "Fstab": { "worker": 3 } }"#).is_err());
        assert!(parse_fstab("not json").is_err());
    }

    #[test]
    fn test_parse_empty_table() {
        assert!(parse_fstab(r#"{ "Fstab": {} }"#).unwrap().is_empty());
    }

    #[test]
    fn test_load_missing_file_is_io_error() {
        let path = std::env::temp_dir().join(format!("missing-{}.json", uuid::Uuid::new_v4()));
        let err = load_fstab(&path).unwrap_err();
        assert!(matches!(err, FstabError::Io { .. }));
    }

    #[test]
    fn test_load_malformed_file_is_parse_error() {
        let path = write_temp("{ \"Fstab\": ");
        let err = load_fstab(&path).unwrap_err();
        assert!(matches!(err, FstabError::Parse { .. }));
        fs::remove_file(path).unwrap();
    }

    #[test]
    fn test_load_rejects_relative_mount_point() {
        let path = write_temp(r#"{ "Fstab": { "worker": "mnt/b" } }"#);
        let err = load_fstab(&path).unwrap_err();
        assert!(matches!(err, FstabError::InvalidMountPoint { .. }));
        fs::remove_file(path).unwrap();
    }

    #[test]
    fn test_load_and_stat() {
        let path = write_temp(r#"{ "Fstab": { "worker": "/mnt/b" } }"#);
        assert_eq!(load_fstab(&path).unwrap().len(), 1);
        assert!(source_modified(&path).is_ok());
        fs::remove_file(path).unwrap();
    }
}
