//! VM CRUD and lifecycle handlers. Thin translation: parse, call the
//! engine, shape the response — no business logic lives here.

use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, HeaderValue, StatusCode};
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;
use serde_json::Value;

use volant_core::config::{ConfigHistoryParams, VmConfigOverride};
use volant_core::types::ListParams;
use volant_core::vm::{CreateVmRequest, StopVmRequest, Vm};

use crate::error::{ApiError, Result};
use crate::state::AppState;

pub async fn list(State(state): State<AppState>, Query(params): Query<ListParams>) -> Result<impl IntoResponse> {
    let result = state.engine.list_vms(&params).await?;
    let mut headers = HeaderMap::new();
    headers.insert(
        "x-total-count",
        HeaderValue::from_str(&result.total.to_string()).unwrap_or_else(|_| HeaderValue::from_static("0")),
    );
    Ok((headers, Json(result.vms)))
}

pub async fn create(State(state): State<AppState>, Json(req): Json<CreateVmRequest>) -> Result<impl IntoResponse> {
    let vm = state.engine.create_vm(req).await?;
    Ok((StatusCode::CREATED, Json(vm)))
}

pub async fn get(State(state): State<AppState>, Path(name): Path<String>) -> Result<Json<Vm>> {
    Ok(Json(state.engine.get_vm(&name).await?))
}

pub async fn start(State(state): State<AppState>, Path(name): Path<String>) -> Result<Json<Vm>> {
    Ok(Json(state.engine.start_vm(&name).await?))
}

#[derive(Debug, Deserialize, Default)]
pub struct StopQuery {
    #[serde(default)]
    pub force: bool,
}

pub async fn stop(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Query(query): Query<StopQuery>,
    body: Option<Json<StopVmRequest>>,
) -> Result<Json<Vm>> {
    let force = query.force || body.map(|Json(req)| req.force).unwrap_or(false);
    Ok(Json(state.engine.stop_vm(&name, force).await?))
}

pub async fn restart(State(state): State<AppState>, Path(name): Path<String>) -> Result<Json<Vm>> {
    Ok(Json(state.engine.restart_vm(&name).await?))
}

pub async fn destroy(State(state): State<AppState>, Path(name): Path<String>) -> Result<StatusCode> {
    state.engine.destroy_vm(&name).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn get_config(State(state): State<AppState>, Path(name): Path<String>) -> Result<impl IntoResponse> {
    Ok(Json(state.engine.get_vm_config(&name).await?))
}

pub async fn update_config(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Json(patch): Json<VmConfigOverride>,
) -> Result<impl IntoResponse> {
    Ok(Json(state.engine.update_vm_config(&name, patch).await?))
}

pub async fn config_history(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Query(params): Query<ConfigHistoryParams>,
) -> Result<impl IntoResponse> {
    Ok(Json(state.engine.vm_config_history(&name, params.limit).await?))
}

/// Passthrough of the plugin's OpenAPI document, if its manifest
/// declares one. Fetched fresh on every call rather than cached — plugin
/// manifests rarely change and operators expect this to reflect the
/// currently-installed version.
pub async fn openapi(State(state): State<AppState>, Path(name): Path<String>) -> Result<impl IntoResponse> {
    let vm = state.engine.get_vm(&name).await?;
    let plugin = state
        .engine
        .registry()
        .get(&vm.plugin)
        .await
        .ok_or_else(|| ApiError::from(volant_core::Error::not_found(format!("plugin {}", vm.plugin))))?;

    let url = plugin
        .manifest
        .openapi_url
        .ok_or_else(|| ApiError::from(volant_core::Error::not_found(format!("openapi document for plugin {}", vm.plugin))))?;

    let body: Value = state
        .agent_http
        .get(&url)
        .send()
        .await
        .map_err(|e| ApiError::from(volant_core::Error::HostOs(format!("fetching openapi document: {e}"))))?
        .json()
        .await
        .map_err(|e| ApiError::from(volant_core::Error::Integrity(format!("openapi document is not valid json: {e}"))))?;

    Ok(Json(body))
}
