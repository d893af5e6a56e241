//! The plugin manifest: a declarative description of a bootable workload.
//!
//! These types are pure data — normalisation and validation live in
//! `volant-orchestrator::registry`, which is the only component allowed to
//! mutate a manifest before it is persisted.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PluginManifest {
    pub name: String,
    pub version: String,
    #[serde(default)]
    pub runtime: Option<String>,
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub labels: Option<HashMap<String, String>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub initramfs: Option<BootImage>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rootfs: Option<RootfsImage>,

    pub resources: Resources,
    pub workload: Workload,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub health_check: Option<HealthCheck>,

    #[serde(default)]
    pub network: NetworkConfig,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cloud_init: Option<CloudInitSpec>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub devices: Option<DevicesSpec>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub disks: Vec<AdditionalDisk>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actions: Option<HashMap<String, ActionSpec>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub openapi_url: Option<String>,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BootImage {
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub checksum: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RootfsImage {
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub checksum: Option<String>,
    pub format: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device: Option<String>,
}

/// Exactly one of `initramfs` or `rootfs` is set on a validated manifest.
/// A closed sum type so downstream code matches on it exhaustively rather
/// than re-deriving "which field is set".
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum BootMediaKind {
    Initramfs,
    Rootfs,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Resources {
    pub cpu: u32,
    pub memory_mib: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Workload {
    pub entrypoint: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub working_dir: Option<String>,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub env: HashMap<String, String>,
    #[serde(rename = "type", default = "default_workload_type")]
    pub workload_type: WorkloadType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
}

fn default_workload_type() -> WorkloadType {
    WorkloadType::Http
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum WorkloadType {
    Http,
    Tcp,
    Daemon,
    Batch,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthCheck {
    pub path: String,
    #[serde(default = "default_health_timeout_ms")]
    pub timeout_ms: u64,
    #[serde(default = "default_health_interval_ms")]
    pub interval_ms: u64,
    #[serde(default = "default_health_retries")]
    pub retries: u32,
}

fn default_health_timeout_ms() -> u64 {
    2_000
}
fn default_health_interval_ms() -> u64 {
    10_000
}
fn default_health_retries() -> u32 {
    3
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum NetworkMode {
    #[default]
    Bridged,
    Vsock,
    Dhcp,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct NetworkConfig {
    #[serde(default)]
    pub mode: NetworkMode,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subnet: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gateway: Option<String>,
    #[serde(default)]
    pub auto_assign: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct CloudInitSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_data: Option<DocumentRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta_data: Option<DocumentRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub network_config: Option<DocumentRef>,
}

/// A cloud-init document is either inlined or a path the control plane reads
/// from the host filesystem at install time.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentRef {
    Inline { content: String },
    Path { path: String },
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct DevicesSpec {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub pci_passthrough: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub allowlist: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdditionalDisk {
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub checksum: Option<String>,
    #[serde(default)]
    pub read_only: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionSpec {
    pub method: String,
    pub path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_ms: Option<u64>,
}

/// Stored row wrapping an installed manifest: the registry's persisted
/// projection of a manifest install.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Plugin {
    pub name: String,
    pub version: String,
    pub enabled: bool,
    pub manifest: PluginManifest,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SetEnabledRequest {
    pub enabled: bool,
}
