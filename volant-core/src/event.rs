//! Lifecycle events published on the `vm-events` topic.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum VmEventType {
    #[serde(rename = "vm.created")]
    Created,
    #[serde(rename = "vm.running")]
    Running,
    #[serde(rename = "vm.stopped")]
    Stopped,
    #[serde(rename = "vm.crashed")]
    Crashed,
    #[serde(rename = "vm.logs")]
    Logs,
}

impl VmEventType {
    /// The SSE `event:` field — matches the serde tag exactly.
    pub fn as_str(&self) -> &'static str {
        match self {
            VmEventType::Created => "vm.created",
            VmEventType::Running => "vm.running",
            VmEventType::Stopped => "vm.stopped",
            VmEventType::Crashed => "vm.crashed",
            VmEventType::Logs => "vm.logs",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VmEvent {
    #[serde(rename = "type")]
    pub event_type: VmEventType,
    pub vm_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ip_address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mac_address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pid: Option<i32>,
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl VmEvent {
    pub fn new(event_type: VmEventType, vm_name: impl Into<String>) -> Self {
        Self {
            event_type,
            vm_name: vm_name.into(),
            status: None,
            ip_address: None,
            mac_address: None,
            pid: None,
            timestamp: Utc::now(),
            message: None,
        }
    }

    pub fn with_status(mut self, status: impl Into<String>) -> Self {
        self.status = Some(status.into());
        self
    }

    pub fn with_ip(mut self, ip: impl Into<String>) -> Self {
        self.ip_address = Some(ip.into());
        self
    }

    pub fn with_mac(mut self, mac: impl Into<String>) -> Self {
        self.mac_address = Some(mac.into());
        self
    }

    pub fn with_pid(mut self, pid: i32) -> Self {
        self.pid = Some(pid);
        self
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }
}
