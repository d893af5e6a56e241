//! VM records and the requests the HTTP surface accepts to mutate them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum VmStatus {
    Pending,
    Running,
    Stopped,
    Crashed,
    Deleting,
}

impl VmStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            VmStatus::Pending => "pending",
            VmStatus::Running => "running",
            VmStatus::Stopped => "stopped",
            VmStatus::Crashed => "crashed",
            VmStatus::Deleting => "deleting",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Vm {
    pub id: i64,
    pub name: String,
    pub status: VmStatus,
    pub runtime: String,
    pub plugin: String,
    pub pid: Option<i32>,
    pub ip_address: Option<String>,
    pub mac_address: Option<String>,
    pub cpu: u32,
    pub memory_mib: u32,
    pub kernel_cmdline: Option<String>,
    pub serial_socket_path: Option<String>,
    pub deployment_id: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateVmRequest {
    pub name: String,
    pub plugin: String,
    #[serde(default)]
    pub cpu: Option<u32>,
    #[serde(default)]
    pub memory_mib: Option<u32>,
    #[serde(default)]
    pub kernel_cmdline_extra: Option<String>,
    #[serde(default)]
    pub config_override: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct StopVmRequest {
    #[serde(default)]
    pub force: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct UpdateConfigResponse {
    pub version: u32,
    pub restart_required: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct ListVmsResponse {
    pub vms: Vec<Vm>,
    pub total: i64,
}
