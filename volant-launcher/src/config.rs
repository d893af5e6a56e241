use std::path::PathBuf;
use std::time::Duration;

/// Host-local paths and settings the launcher needs out of band — kernels
/// are never fetched, only boot media is.
#[derive(Debug, Clone)]
pub struct LauncherConfig {
    pub hypervisor_binary: PathBuf,
    pub compressed_kernel_path: PathBuf,
    pub uncompressed_kernel_path: PathBuf,
    pub runtime_dir: PathBuf,
    pub stop_grace: Duration,
    /// Per-URL deadline for boot-media staging.
    pub download_timeout: Duration,
}

impl LauncherConfig {
    pub fn vm_runtime_dir(&self, vm_id: i64) -> PathBuf {
        self.runtime_dir.join(vm_id.to_string())
    }
}

impl Default for LauncherConfig {
    fn default() -> Self {
        Self {
            hypervisor_binary: PathBuf::from("cloud-hypervisor"),
            compressed_kernel_path: PathBuf::from("/var/lib/volant/kernel.gz"),
            uncompressed_kernel_path: PathBuf::from("/var/lib/volant/vmlinux"),
            runtime_dir: PathBuf::from("/var/lib/volant/vms"),
            stop_grace: Duration::from_secs(10),
            download_timeout: Duration::from_secs(300),
        }
    }
}
