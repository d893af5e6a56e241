use async_trait::async_trait;
use volant_core::mac::tap_name_for;
use volant_core::Result;

use crate::{NetworkManager, TapDevice};

/// Returns a synthetic tap name and performs no host changes — selected on
/// non-Linux hosts, or in tests that don't want to touch the network stack.
pub struct NoopNetworkManager;

impl NoopNetworkManager {
    pub fn new() -> Self {
        Self
    }
}

impl Default for NoopNetworkManager {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl NetworkManager for NoopNetworkManager {
    async fn create_tap(&self, vm_name: &str, bridge: &str) -> Result<TapDevice> {
        Ok(TapDevice {
            name: tap_name_for(vm_name),
            bridge: bridge.to_string(),
        })
    }

    async fn destroy_tap(&self, _tap: &TapDevice) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn create_and_destroy_round_trip() {
        let manager = NoopNetworkManager::new();
        let tap = manager.create_tap("web-1", "vbr0").await.expect("create");
        assert!(tap.name.starts_with("vttap-"));
        manager.destroy_tap(&tap).await.expect("destroy");
    }
}
