//! The shape the orchestrator engine hands to the runtime launcher.
//! Pure data: the launcher trait and its `Instance` handle live in
//! `volant-launcher`, which accepts these types without depending on the
//! engine that builds them.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Exactly one of `Initramfs` or `Rootfs` — mirrors the manifest's
/// `BootMediaKind` but carries the resolved, staged-locally shape the
/// launcher actually spawns against.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum BootMedia {
    Initramfs {
        url: String,
        checksum: Option<String>,
    },
    Rootfs {
        url: String,
        checksum: Option<String>,
        format: String,
        device: Option<String>,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdditionalDiskSpec {
    pub url: String,
    pub checksum: Option<String>,
    pub read_only: bool,
    pub device: Option<String>,
}

/// Network attachment for a launch. Bridged and DHCP both need a tap device;
/// only bridged carries a static IP/netmask.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum NetworkDescriptor {
    Bridged {
        tap_name: String,
        mac_address: String,
        ip_address: String,
        netmask_prefix: u8,
    },
    Dhcp {
        tap_name: String,
        mac_address: String,
    },
    Vsock {
        cid: u32,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LaunchSpec {
    pub vm_id: i64,
    pub vm_name: String,
    pub cpu: u32,
    pub memory_mib: u32,
    pub boot_media: BootMedia,
    #[serde(default)]
    pub additional_disks: Vec<AdditionalDiskSpec>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cloud_init_seed_path: Option<PathBuf>,
    pub network: NetworkDescriptor,
    pub kernel_cmdline: String,
    #[serde(default)]
    pub vfio_device_paths: Vec<PathBuf>,
    pub serial_socket_path: PathBuf,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kernel_override: Option<PathBuf>,
}

/// Why a supervised hypervisor process stopped running.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitCause {
    Clean,
    Crashed { signal_or_code: i32 },
}
