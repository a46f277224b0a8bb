//! Single-file tar transport.
//!
//! The Docker archive endpoints are the only way file content crosses the
//! container boundary: uploads are a tar stream extracted into a directory,
//! downloads return a tar stream of the requested path. Each stream carries
//! exactly one regular file.

use std::io::Read;
use std::time::{SystemTime, UNIX_EPOCH};

use workbox_core::{Error, Result};

/// Wrap `content` as a tar stream holding one regular file named `name`.
pub fn pack(name: &str, content: &[u8]) -> Result<Vec<u8>> {
    if name.is_empty() || name.contains('/') {
        return Err(Error::archive(format!("invalid archive entry name '{}'", name)));
    }

    let mut header = tar::Header::new_gnu();
    header.set_entry_type(tar::EntryType::Regular);
    header.set_size(content.len() as u64);
    header.set_mode(0o644);
    header.set_mtime(
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0),
    );

    let mut builder = tar::Builder::new(Vec::with_capacity(content.len() + 1024));
    builder
        .append_data(&mut header, name, content)
        .map_err(|e| Error::archive(format!("failed to append '{}': {}", name, e)))?;
    builder
        .into_inner()
        .map_err(|e| Error::archive(format!("failed to finish archive: {}", e)))
}

/// Extract the first regular file from a tar stream.
pub fn unpack(archive: &[u8]) -> Result<Vec<u8>> {
    let mut archive = tar::Archive::new(archive);
    let entries = archive
        .entries()
        .map_err(|e| Error::archive(format!("unreadable archive: {}", e)))?;

    for entry in entries {
        let mut entry = entry.map_err(|e| Error::archive(format!("corrupt entry: {}", e)))?;
        let kind = entry.header().entry_type();
        match kind {
            tar::EntryType::XHeader
            | tar::EntryType::XGlobalHeader
            | tar::EntryType::GNULongName
            | tar::EntryType::GNULongLink => continue,
            kind if kind.is_file() => {
                let mut content = Vec::with_capacity(entry.size() as usize);
                entry
                    .read_to_end(&mut content)
                    .map_err(|e| Error::archive(format!("failed to extract file content: {}", e)))?;
                return Ok(content);
            }
            kind if kind.is_dir() => {
                return Err(Error::archive("archive holds a directory, not a file"));
            }
            other => {
                return Err(Error::archive(format!(
                    "unsupported archive entry type {:?}",
                    other
                )));
            }
        }
    }

    Err(Error::archive("Empty tar archive"))
}

/// [`pack`] on the blocking pool.
pub async fn pack_blocking(name: String, content: Vec<u8>) -> Result<Vec<u8>> {
    tokio::task::spawn_blocking(move || pack(&name, &content))
        .await
        .map_err(|e| Error::internal(format!("archive task failed: {}", e)))?
}

/// [`unpack`] on the blocking pool.
pub async fn unpack_blocking(archive: Vec<u8>) -> Result<Vec<u8>> {
    tokio::task::spawn_blocking(move || unpack(&archive))
        .await
        .map_err(|e| Error::internal(format!("archive task failed: {}", e)))?
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pack_then_unpack() {
        let archive = pack("test.txt", b"Hello from sandbox!").unwrap();
        // header block + one data block + two zero blocks at minimum
        assert!(archive.len() >= 512 * 4);
        assert_eq!(archive.len() % 512, 0);
        assert_eq!(unpack(&archive).unwrap(), b"Hello from sandbox!");
    }

    #[test]
    fn test_pack_sets_entry_name_and_mode() {
        let archive = pack("main.py", b"print(1)").unwrap();
        let mut reader = tar::Archive::new(&archive[..]);
        let mut entries = reader.entries().unwrap();
        let entry = entries.next().unwrap().unwrap();
        assert_eq!(entry.path().unwrap().to_str(), Some("main.py"));
        assert_eq!(entry.header().mode().unwrap(), 0o644);
        assert!(entries.next().is_none());
    }

    #[test]
    fn test_pack_rejects_nested_names() {
        assert!(pack("dir/file.txt", b"x").is_err());
        assert!(pack("", b"x").is_err());
    }

    #[test]
    fn test_unpack_empty_archive() {
        let empty = tar::Builder::new(Vec::new()).into_inner().unwrap();
        let err = unpack(&empty).unwrap_err();
        assert!(matches!(err, Error::Archive(ref m) if m.contains("Empty")));
    }

    #[test]
    fn test_unpack_rejects_directory() {
        let mut builder = tar::Builder::new(Vec::new());
        let mut header = tar::Header::new_gnu();
        header.set_entry_type(tar::EntryType::Directory);
        header.set_size(0);
        header.set_mode(0o755);
        builder
            .append_data(&mut header, "nested/", std::io::empty())
            .unwrap();
        let archive = builder.into_inner().unwrap();
        assert!(matches!(unpack(&archive), Err(Error::Archive(_))));
    }

    #[test]
    fn test_unpack_garbage() {
        assert!(unpack(&[0xffu8; 700]).is_err());
    }

    #[tokio::test]
    async fn test_blocking_wrappers() {
        let archive = pack_blocking("a.bin".into(), vec![0, 1, 2, 255]).await.unwrap();
        assert_eq!(unpack_blocking(archive).await.unwrap(), vec![0, 1, 2, 255]);
    }
}
