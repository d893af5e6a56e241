//! The device manager. Validates PCI passthrough requests against an
//! allowlist, binds/unbinds devices to the `vfio-pci` driver, and resolves
//! kernel-visible group paths for the launcher to attach. Host filesystem
//! interaction lives behind one trait with a sysfs-backed Linux
//! implementation and a no-op implementation, the same pluggable-host-backend
//! shape the network manager uses.

mod linux;
mod noop;
mod pci;

pub use linux::LinuxDeviceManager;
pub use noop::NoopDeviceManager;
pub use pci::PciAddress;

use std::path::PathBuf;

use async_trait::async_trait;
use volant_core::Result;

/// A PCI device ready for (or already attached to) passthrough.
#[derive(Debug, Clone)]
pub struct BoundDevice {
    pub address: PciAddress,
    pub iommu_group: String,
    pub vfio_device_path: PathBuf,
    pub original_driver: Option<String>,
}

#[async_trait]
pub trait DeviceManager: Send + Sync {
    /// Validates `addresses` against `allowlist` (patterns `vendor:device` or
    /// `vendor:*`), binds each to `vfio-pci` recording the original driver
    /// for rollback, and resolves the `/dev/vfio/<group>` path.
    async fn bind_all(
        &self,
        addresses: &[PciAddress],
        allowlist: &[String],
    ) -> Result<Vec<BoundDevice>>;

    /// Unbinds and restores original drivers. Idempotent; best-effort — the
    /// destroy path must not fail if this does.
    async fn unbind_all(&self, devices: &[BoundDevice]) -> Result<()>;
}

pub fn default_device_manager() -> Box<dyn DeviceManager> {
    if cfg!(target_os = "linux") {
        Box::new(LinuxDeviceManager::new())
    } else {
        tracing::warn!("non-Linux host: VFIO passthrough disabled, using no-op device manager");
        Box::new(NoopDeviceManager::new())
    }
}
