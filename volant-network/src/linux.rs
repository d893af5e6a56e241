use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, warn};
use volant_core::mac::tap_name_for;
use volant_core::{Error, Result};

use crate::{NetworkManager, TapDevice};

/// Shells out to `ip tuntap`/`ip link` and checks the exit status, rather
/// than issuing raw `ioctl`s.
pub struct LinuxNetworkManager;

impl LinuxNetworkManager {
    pub fn new() -> Self {
        Self
    }

    async fn run(&self, args: &[&str]) -> Result<()> {
        debug!(?args, "running ip");
        let output = Command::new("ip")
            .args(args)
            .output()
            .await
            .map_err(|e| Error::HostOs(format!("spawning ip {args:?}: {e}")))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(Error::HostOs(format!(
                "ip {args:?} failed: {stderr}"
            )));
        }
        Ok(())
    }
}

impl Default for LinuxNetworkManager {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl NetworkManager for LinuxNetworkManager {
    async fn create_tap(&self, vm_name: &str, bridge: &str) -> Result<TapDevice> {
        let name = tap_name_for(vm_name);

        self.run(&["tuntap", "add", "dev", &name, "mode", "tap", "vnet_hdr"])
            .await?;
        self.run(&["link", "set", &name, "up"]).await?;
        self.run(&["link", "set", &name, "master", bridge]).await?;

        Ok(TapDevice {
            name,
            bridge: bridge.to_string(),
        })
    }

    async fn destroy_tap(&self, tap: &TapDevice) -> Result<()> {
        if let Err(e) = self.run(&["link", "set", &tap.name, "nomaster"]).await {
            warn!(tap = %tap.name, error = %e, "detaching tap from bridge failed");
        }
        self.run(&["tuntap", "del", "dev", &tap.name, "mode", "tap"])
            .await
    }
}
