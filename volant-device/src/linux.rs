use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs;
use tracing::warn;
use volant_core::{Error, Result};

use crate::pci::matches_allowlist;
use crate::{BoundDevice, DeviceManager, PciAddress};

const SYSFS_PCI: &str = "/sys/bus/pci/devices";
const VFIO_DRIVER: &str = "vfio-pci";

pub struct LinuxDeviceManager {
    sysfs_root: PathBuf,
}

impl LinuxDeviceManager {
    pub fn new() -> Self {
        Self {
            sysfs_root: PathBuf::from(SYSFS_PCI),
        }
    }

    #[cfg(test)]
    fn with_sysfs_root(root: PathBuf) -> Self {
        Self { sysfs_root: root }
    }

    fn device_dir(&self, address: &PciAddress) -> PathBuf {
        self.sysfs_root.join(address.to_string())
    }

    async fn read_id(&self, address: &PciAddress, file: &str) -> Result<String> {
        let path = self.device_dir(address).join(file);
        let raw = fs::read_to_string(&path)
            .await
            .map_err(|e| Error::HostOs(format!("reading {}: {e}", path.display())))?;
        Ok(raw.trim().to_string())
    }

    async fn iommu_group(&self, address: &PciAddress) -> Result<String> {
        let link = self.device_dir(address).join("iommu_group");
        let target = fs::read_link(&link)
            .await
            .map_err(|e| Error::HostOs(format!("resolving iommu_group for {address}: {e}")))?;
        target
            .file_name()
            .and_then(|n| n.to_str())
            .map(|s| s.to_string())
            .ok_or_else(|| Error::HostOs(format!("malformed iommu_group symlink for {address}")))
    }

    async fn current_driver(&self, address: &PciAddress) -> Option<String> {
        let link = self.device_dir(address).join("driver");
        fs::read_link(&link)
            .await
            .ok()
            .and_then(|target| target.file_name().map(|n| n.to_string_lossy().into_owned()))
    }

    async fn write_sysfs(&self, path: &Path, value: &str) -> Result<()> {
        fs::write(path, value)
            .await
            .map_err(|e| Error::HostOs(format!("writing {}: {e}", path.display())))
    }
}

impl Default for LinuxDeviceManager {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DeviceManager for LinuxDeviceManager {
    async fn bind_all(
        &self,
        addresses: &[PciAddress],
        allowlist: &[String],
    ) -> Result<Vec<BoundDevice>> {
        let mut bound = Vec::with_capacity(addresses.len());

        for address in addresses {
            let vendor = self.read_id(address, "vendor").await?;
            let device = self.read_id(address, "device").await?;

            if !matches_allowlist(&vendor, &device, allowlist) {
                return Err(Error::validation(format!(
                    "PCI device {address} ({vendor}:{device}) does not match any allowlist pattern"
                )));
            }

            let iommu_group = self.iommu_group(address).await?;
            let original_driver = self.current_driver(address).await;

            if original_driver.as_deref() != Some(VFIO_DRIVER) {
                let override_path = self.device_dir(address).join("driver_override");
                self.write_sysfs(&override_path, VFIO_DRIVER).await?;

                let unbind_path = self.device_dir(address).join("driver/unbind");
                if original_driver.is_some() {
                    let _ = self.write_sysfs(&unbind_path, &address.to_string()).await;
                }

                let probe_path = self.sysfs_root.parent().unwrap_or(&self.sysfs_root).join("drivers_probe");
                self.write_sysfs(&probe_path, &address.to_string()).await?;
            }

            let vfio_device_path = PathBuf::from(format!("/dev/vfio/{iommu_group}"));

            bound.push(BoundDevice {
                address: address.clone(),
                iommu_group,
                vfio_device_path,
                original_driver,
            });
        }

        Ok(bound)
    }

    async fn unbind_all(&self, devices: &[BoundDevice]) -> Result<()> {
        for device in devices {
            let unbind_path = self.device_dir(&device.address).join("driver/unbind");
            if let Err(e) = self.write_sysfs(&unbind_path, &device.address.to_string()).await {
                warn!(address = %device.address, error = %e, "unbinding vfio-pci device failed");
                continue;
            }

            if let Some(original) = &device.original_driver {
                let override_path = self.device_dir(&device.address).join("driver_override");
                let _ = self.write_sysfs(&override_path, original).await;
                let probe_path = self.sysfs_root.parent().unwrap_or(&self.sysfs_root).join("drivers_probe");
                if let Err(e) = self.write_sysfs(&probe_path, &device.address.to_string()).await {
                    warn!(address = %device.address, error = %e, "restoring original driver failed");
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs as stdfs;
    use std::os::unix::fs::symlink;

    fn fake_device(root: &Path, address: &str, vendor: &str, device: &str) {
        let dir = root.join(address);
        stdfs::create_dir_all(&dir).unwrap();
        stdfs::write(dir.join("vendor"), format!("{vendor}\n")).unwrap();
        stdfs::write(dir.join("device"), format!("{device}\n")).unwrap();

        let iommu_groups_root = root.parent().unwrap().join("iommu_groups");
        stdfs::create_dir_all(iommu_groups_root.join("7")).unwrap();
        symlink(iommu_groups_root.join("7"), dir.join("iommu_group")).unwrap();
    }

    #[tokio::test]
    async fn rejects_device_outside_allowlist() {
        let tmp = tempfile::tempdir().unwrap();
        let sysfs_root = tmp.path().join("devices");
        fake_device(&sysfs_root, "0000:01:00.0", "10de", "1eb8");

        let manager = LinuxDeviceManager::with_sysfs_root(sysfs_root);
        let address: PciAddress = "0000:01:00.0".parse().unwrap();
        let allowlist = vec!["8086:*".to_string()];

        let result = manager.bind_all(&[address], &allowlist).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn resolves_iommu_group() {
        let tmp = tempfile::tempdir().unwrap();
        let sysfs_root = tmp.path().join("devices");
        fake_device(&sysfs_root, "0000:01:00.0", "10de", "1eb8");

        let manager = LinuxDeviceManager::with_sysfs_root(sysfs_root);
        let address: PciAddress = "0000:01:00.0".parse().unwrap();

        let group = manager.iommu_group(&address).await.unwrap();
        assert_eq!(group, "7");
    }
}
