use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuccessResponse {
    pub ok: bool,
}

/// `GET /api/v1/system/info` response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SystemInfo {
    pub version: String,
    pub uptime_seconds: u64,
    pub vm_count: usize,
    pub deployment_count: usize,
    pub plugin_count: usize,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListParams {
    pub plugin: Option<String>,
    pub status: Option<String>,
    pub runtime: Option<String>,
    pub q: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
    pub sort: Option<String>,
    pub order: Option<String>,
}
