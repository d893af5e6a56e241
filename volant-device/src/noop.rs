use std::path::PathBuf;

use async_trait::async_trait;
use volant_core::Result;

use crate::{BoundDevice, DeviceManager, PciAddress};

/// Performs no sysfs interaction; used on non-Linux hosts and in tests that
/// don't set up passthrough devices.
pub struct NoopDeviceManager;

impl NoopDeviceManager {
    pub fn new() -> Self {
        Self
    }
}

impl Default for NoopDeviceManager {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DeviceManager for NoopDeviceManager {
    async fn bind_all(&self, addresses: &[PciAddress], _allowlist: &[String]) -> Result<Vec<BoundDevice>> {
        Ok(addresses
            .iter()
            .map(|address| BoundDevice {
                address: address.clone(),
                iommu_group: "0".to_string(),
                vfio_device_path: PathBuf::from("/dev/null"),
                original_driver: None,
            })
            .collect())
    }

    async fn unbind_all(&self, _devices: &[BoundDevice]) -> Result<()> {
        Ok(())
    }
}
