use std::path::{Path, PathBuf};

use tokio::process::Command;
use tracing::{info, warn};
use volant_core::{Error, Result};

use crate::image;
use crate::CloudInitDocuments;

/// Builds per-VM cloud-init seed images. Probes for `mkfs.vfat`/`mcopy` on
/// `$PATH` at construction time — the same "check for a binary, warn and
/// fall back if absent" idiom `LiteFSManager::new` uses for the `litefs`
/// binary — and assembles the image directly with `fatfs` when they're
/// unavailable.
pub struct CloudInitBuilder {
    use_host_tools: bool,
}

impl CloudInitBuilder {
    pub async fn new() -> Self {
        let use_host_tools = probe("mkfs.vfat").await && probe("mcopy").await;
        if use_host_tools {
            info!("using host mkfs.vfat/mcopy for cloud-init seed images");
        } else {
            warn!("mkfs.vfat/mcopy not found on PATH, assembling cloud-init seeds with fatfs");
        }
        Self { use_host_tools }
    }

    /// Writes `documents` to a VFAT image at `path`, synthesising meta-data
    /// defaults (`instance-id=<vm_slug>-<vm_id>`, `local-hostname=<vm_name>`)
    /// when absent.
    pub async fn build(
        &self,
        vm_name: &str,
        vm_id: i64,
        vm_slug: &str,
        documents: &CloudInitDocuments,
        path: &Path,
    ) -> Result<()> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| Error::HostOs(format!("creating seed image directory: {e}")))?;
        }

        let user_data = documents.user_data.clone().unwrap_or_default();
        let meta_data = documents.meta_data.clone().unwrap_or_else(|| {
            format!("instance-id={vm_slug}-{vm_id}\nlocal-hostname={vm_name}\n")
        });
        let network_config = documents.network_config.clone();

        if self.use_host_tools {
            self.build_with_host_tools(path, &user_data, &meta_data, network_config.as_deref())
                .await
        } else {
            self.build_with_fatfs(path, &user_data, &meta_data, network_config.as_deref())
                .await
        }
    }

    pub async fn remove(&self, path: &Path) -> Result<()> {
        match tokio::fs::remove_file(path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "removing cloud-init seed image failed");
                Ok(())
            }
        }
    }

    async fn build_with_host_tools(
        &self,
        path: &Path,
        user_data: &str,
        meta_data: &str,
        network_config: Option<&str>,
    ) -> Result<()> {
        let file = tokio::fs::OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(path)
            .await
            .map_err(|e| Error::HostOs(format!("creating seed image: {e}")))?;
        file.set_len(1024 * 1024)
            .await
            .map_err(|e| Error::HostOs(format!("sizing seed image: {e}")))?;
        drop(file);

        run("mkfs.vfat", &["-n", "CIDATA", &path.to_string_lossy()]).await?;

        let staging = tempfile_dir(path)?;
        write_staged(&staging, "user-data", user_data).await?;
        write_staged(&staging, "meta-data", meta_data).await?;
        if let Some(network_config) = network_config {
            write_staged(&staging, "network-config", network_config).await?;
        }

        for name in ["user-data", "meta-data", "network-config"] {
            let staged = staging.join(name);
            if !staged.exists() {
                continue;
            }
            run(
                "mcopy",
                &["-i", &path.to_string_lossy(), &staged.to_string_lossy(), &format!("::{name}")],
            )
            .await?;
        }

        let _ = tokio::fs::remove_dir_all(&staging).await;
        Ok(())
    }

    async fn build_with_fatfs(
        &self,
        path: &Path,
        user_data: &str,
        meta_data: &str,
        network_config: Option<&str>,
    ) -> Result<()> {
        let path = path.to_path_buf();
        let user_data = user_data.to_string();
        let meta_data = meta_data.to_string();
        let network_config = network_config.map(|s| s.to_string());

        tokio::task::spawn_blocking(move || {
            let mut documents = vec![("user-data", user_data.as_str()), ("meta-data", meta_data.as_str())];
            if let Some(network_config) = network_config.as_deref() {
                documents.push(("network-config", network_config));
            }
            image::build(&path, &documents)
        })
        .await
        .map_err(|e| Error::Internal(format!("cloud-init build task panicked: {e}")))?
    }
}

impl Default for CloudInitBuilder {
    fn default() -> Self {
        // Synchronous fallback for contexts that can't await construction;
        // always assumes host tools are absent.
        Self { use_host_tools: false }
    }
}

async fn probe(binary: &str) -> bool {
    Command::new(binary)
        .arg("--help")
        .output()
        .await
        .map(|o| o.status.success() || o.status.code() == Some(1))
        .unwrap_or(false)
}

async fn run(binary: &str, args: &[&str]) -> Result<()> {
    let output = Command::new(binary)
        .args(args)
        .output()
        .await
        .map_err(|e| Error::HostOs(format!("spawning {binary}: {e}")))?;
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(Error::HostOs(format!("{binary} failed: {stderr}")));
    }
    Ok(())
}

fn tempfile_dir(seed_path: &Path) -> Result<PathBuf> {
    let dir = seed_path.with_extension("staging");
    std::fs::create_dir_all(&dir)
        .map_err(|e| Error::HostOs(format!("creating staging dir: {e}")))?;
    Ok(dir)
}

async fn write_staged(dir: &Path, name: &str, content: &str) -> Result<()> {
    tokio::fs::write(dir.join(name), content)
        .await
        .map_err(|e| Error::HostOs(format!("staging {name}: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn synthesises_meta_data_defaults() {
        let builder = CloudInitBuilder { use_host_tools: false };
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("seed.img");

        builder
            .build("web-1", 42, "web-1", &CloudInitDocuments::default(), &path)
            .await
            .expect("build");

        assert!(path.exists());
    }

    #[tokio::test]
    async fn remove_is_idempotent() {
        let builder = CloudInitBuilder { use_host_tools: false };
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing.img");

        builder.remove(&path).await.expect("first remove");
        builder.remove(&path).await.expect("second remove");
    }
}
