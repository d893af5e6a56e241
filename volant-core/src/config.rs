//! Per-VM config overrides and the merge/patch semantics the engine applies
//! on top of a plugin manifest's defaults.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::manifest::{DevicesSpec, NetworkConfig};

/// The document stored in `vm_config` (current) and `vm_config_history`
/// (append-only). Every field is an override — absence means "inherit from
/// the plugin manifest".
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VmConfigOverride {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cpu: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub memory_mib: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kernel_cmdline_extra: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub network: Option<NetworkConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cloud_init: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub devices: Option<DevicesSpec>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub boot_media: Option<Value>,
}

impl VmConfigOverride {
    /// Applies `patch` on top of `self`, field by field — a `Some` in the
    /// patch replaces, a `None` leaves the current value untouched. This is
    /// the semantics `UpdateVMConfig` needs: a patch is sparse, not a full
    /// replacement document.
    pub fn merged_with(&self, patch: &VmConfigOverride) -> VmConfigOverride {
        VmConfigOverride {
            cpu: patch.cpu.or(self.cpu),
            memory_mib: patch.memory_mib.or(self.memory_mib),
            kernel_cmdline_extra: patch
                .kernel_cmdline_extra
                .clone()
                .or_else(|| self.kernel_cmdline_extra.clone()),
            network: patch.network.clone().or_else(|| self.network.clone()),
            cloud_init: patch.cloud_init.clone().or_else(|| self.cloud_init.clone()),
            devices: patch.devices.clone().or_else(|| self.devices.clone()),
            boot_media: patch.boot_media.clone().or_else(|| self.boot_media.clone()),
        }
    }

    /// True if applying `patch` over `self` touches any field that feeds the
    /// launch spec, meaning a running hypervisor would need a restart to
    /// observe the new values.
    pub fn affects_launch_spec(&self, patch: &VmConfigOverride) -> bool {
        (patch.cpu.is_some() && patch.cpu != self.cpu)
            || (patch.memory_mib.is_some() && patch.memory_mib != self.memory_mib)
            || (patch.kernel_cmdline_extra.is_some()
                && patch.kernel_cmdline_extra != self.kernel_cmdline_extra)
            || patch.network.is_some()
            || patch.cloud_init.is_some()
            || patch.devices.is_some()
            || patch.boot_media.is_some()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VmConfig {
    pub vm_name: String,
    pub version: u32,
    pub override_doc: VmConfigOverride,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VmConfigHistoryEntry {
    pub vm_name: String,
    pub version: u32,
    pub override_doc: VmConfigOverride,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ConfigHistoryParams {
    pub limit: Option<i64>,
}
