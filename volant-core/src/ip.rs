//! The IP allocation pool. One row per usable address in the managed subnet.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum IpStatus {
    Available,
    Leased,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IpAllocation {
    pub address: String,
    pub status: IpStatus,
    pub vm_id: Option<i64>,
    pub leased_at: Option<DateTime<Utc>>,
}
