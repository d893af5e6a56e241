//! Deployments: named desired-state records asking for N identical VMs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::VmConfigOverride;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Deployment {
    pub id: i64,
    pub name: String,
    pub plugin: String,
    pub base_config: VmConfigOverride,
    pub desired_replicas: u32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateDeploymentRequest {
    pub name: String,
    pub plugin: String,
    #[serde(default)]
    pub replicas: u32,
    #[serde(default)]
    pub base_config: VmConfigOverride,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ScaleDeploymentRequest {
    pub replicas: u32,
}

#[derive(Debug, Clone, Serialize)]
pub struct ListDeploymentsResponse {
    pub deployments: Vec<Deployment>,
    pub total: i64,
}
