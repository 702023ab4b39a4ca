//! Content fingerprints for change detection.
//!
//! Only the manifest (`SKILL.md`) is hashed locally. Folder-level hashes come
//! from the remote host's tree API and are stored and compared verbatim.

use std::path::Path;

use sha2::{Digest, Sha256};

/// SHA-256 of the exact bytes, lowercase hex.
pub fn content_hash(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}

/// Hash a manifest file on disk.
pub async fn hash_file(path: &Path) -> std::io::Result<String> {
    let bytes = tokio::fs::read(path).await?;
    Ok(content_hash(&bytes))
}

/// Normalize an optional externally supplied hash: empty strings count as absent.
pub(crate) fn present(hash: Option<&str>) -> Option<&str> {
    hash.map(str::trim).filter(|h| !h.is_empty())
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_digest() {
        assert_eq!(
            content_hash(b"hello"),
            "2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824"
        );
    }

    #[test]
    fn whitespace_changes_digest() {
        let a = content_hash(b"---\nname: foo\n---\nbody\n");
        let b = content_hash(b"---\nname: foo\n---\nbody \n");
        assert_ne!(a, b);
        assert_eq!(a, content_hash(b"---\nname: foo\n---\nbody\n"));
    }

    #[tokio::test]
    async fn hash_file_matches_in_memory_digest() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("SKILL.md");
        std::fs::write(&path, "content").unwrap();
        assert_eq!(hash_file(&path).await.unwrap(), content_hash(b"content"));
    }

    #[test]
    fn present_filters_blank() {
        assert_eq!(present(Some("abc")), Some("abc"));
        assert_eq!(present(Some("  ")), None);
        assert_eq!(present(None), None);
    }
}
