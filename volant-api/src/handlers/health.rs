//! Liveness and build/version/stats endpoints.

use axum::extract::State;
use axum::Json;
use volant_core::types::SystemInfo;

use crate::error::Result;
use crate::state::AppState;

pub async fn healthz() -> &'static str {
    "ok"
}

pub async fn system_info(State(state): State<AppState>) -> Result<Json<SystemInfo>> {
    let vms = state.engine.list_vms(&Default::default()).await?;
    let deployments = state.engine.list_deployments().await?;
    let plugins = state.engine.registry().list().await;

    Ok(Json(SystemInfo {
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds: state.start_time.elapsed().as_secs(),
        vm_count: vms.vms.len(),
        deployment_count: deployments.deployments.len(),
        plugin_count: plugins.len(),
    }))
}
