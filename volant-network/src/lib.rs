//! The network manager. Creates and destroys per-VM TAP devices attached
//! to a host bridge; a no-op variant runs on non-Linux hosts.
//!
//! Host-specific code lives behind one trait with a Linux and a no-op
//! implementation, selected at startup, rather than scattering
//! `cfg!(target_os = ...)` branches through call sites.

mod linux;
mod noop;

pub use linux::LinuxNetworkManager;
pub use noop::NoopNetworkManager;

use async_trait::async_trait;
use volant_core::Result;

/// A handle to a provisioned TAP device: its kernel-visible name and the
/// bridge it was attached to.
#[derive(Debug, Clone)]
pub struct TapDevice {
    pub name: String,
    pub bridge: String,
}

#[async_trait]
pub trait NetworkManager: Send + Sync {
    /// Creates a TAP device for `vm_name`, brings it up, and attaches it to
    /// `bridge`. Attachment failures are fatal to VM creation.
    async fn create_tap(&self, vm_name: &str, bridge: &str) -> Result<TapDevice>;

    /// Destroys a previously created TAP device. Best-effort: failures are
    /// logged by the caller but never block a destroy.
    async fn destroy_tap(&self, tap: &TapDevice) -> Result<()>;
}

/// Selects the Linux or no-op implementation at startup.
pub fn default_network_manager() -> Box<dyn NetworkManager> {
    if cfg!(target_os = "linux") {
        Box::new(LinuxNetworkManager::new())
    } else {
        tracing::warn!("non-Linux host: TAP provisioning disabled, using no-op network manager");
        Box::new(NoopNetworkManager::new())
    }
}
