//! Boot-media staging: download a URL to a per-VM path and, when a
//! `sha256:<hex>` checksum is declared, verify it byte-for-byte. A mismatch
//! is fatal — the caller never starts a hypervisor against unverified
//! media.

use std::path::{Path, PathBuf};
use std::time::Duration;

use sha2::{Digest, Sha256};
use volant_core::{Error, Result};

/// Downloads `url` into `dest`, verifying `checksum` (if present) against the
/// downloaded bytes. `checksum` is the manifest's `sha256:<hex>` form.
/// `timeout` bounds the whole network fetch (connect through body read) so a
/// stalled or slow-loris origin can't hang VM creation indefinitely; it has
/// no effect on `file://` sources, which never leave the local disk.
pub async fn stage(url: &str, checksum: Option<&str>, dest: &Path, timeout: Duration) -> Result<()> {
    if let Some(parent) = dest.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| Error::HostOs(format!("creating staging dir {}: {e}", parent.display())))?;
    }

    let bytes = if let Some(path) = url.strip_prefix("file://") {
        tokio::fs::read(path)
            .await
            .map_err(|e| Error::HostOs(format!("reading local boot media {path}: {e}")))?
    } else {
        tokio::time::timeout(timeout, fetch(url))
            .await
            .map_err(|_| Error::Hypervisor(format!("downloading {url}: timed out after {timeout:?}")))??
    };

    if let Some(expected_hex) = checksum.and_then(|c| c.strip_prefix("sha256:")) {
        let mut hasher = Sha256::new();
        hasher.update(&bytes);
        let actual_hex = hex::encode(hasher.finalize());
        if !actual_hex.eq_ignore_ascii_case(expected_hex) {
            return Err(Error::Integrity(format!(
                "checksum mismatch for {url}: expected {expected_hex}, got {actual_hex}"
            )));
        }
    }

    tokio::fs::write(dest, &bytes)
        .await
        .map_err(|e| Error::HostOs(format!("writing staged media to {}: {e}", dest.display())))?;

    Ok(())
}

async fn fetch(url: &str) -> Result<Vec<u8>> {
    let response = reqwest::get(url)
        .await
        .map_err(|e| Error::Hypervisor(format!("downloading {url}: {e}")))?;
    if !response.status().is_success() {
        return Err(Error::Hypervisor(format!(
            "downloading {url}: HTTP {}",
            response.status()
        )));
    }
    Ok(response
        .bytes()
        .await
        .map_err(|e| Error::Hypervisor(format!("reading response body for {url}: {e}")))?
        .to_vec())
}

/// Per-VM staging path for a named artifact (`boot`, `disk-0`, ...).
pub fn staged_path(vm_dir: &Path, name: &str) -> PathBuf {
    vm_dir.join(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn rejects_checksum_mismatch() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("source.bin");
        tokio::fs::write(&src, b"hello world").await.unwrap();
        let dest = dir.path().join("staged.bin");

        let err = stage(
            &format!("file://{}", src.display()),
            Some("sha256:0000000000000000000000000000000000000000000000000000000000000000"),
            &dest,
            Duration::from_secs(5),
        )
        .await
        .unwrap_err();

        assert_eq!(err.kind(), "integrity");
        assert!(!dest.exists());
    }

    #[tokio::test]
    async fn accepts_matching_checksum() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("source.bin");
        tokio::fs::write(&src, b"hello world").await.unwrap();
        let dest = dir.path().join("staged.bin");

        let mut hasher = Sha256::new();
        hasher.update(b"hello world");
        let checksum = format!("sha256:{}", hex::encode(hasher.finalize()));

        stage(&format!("file://{}", src.display()), Some(&checksum), &dest, Duration::from_secs(5))
            .await
            .expect("stage");

        assert_eq!(tokio::fs::read(&dest).await.unwrap(), b"hello world");
    }
}
