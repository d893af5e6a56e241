//! Plugin registry handlers.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;

use volant_core::manifest::{Plugin, PluginManifest, SetEnabledRequest};
use volant_core::types::SuccessResponse;

use crate::error::Result;
use crate::state::AppState;

pub async fn list(State(state): State<AppState>) -> Result<Json<Vec<Plugin>>> {
    Ok(Json(state.engine.registry().list().await))
}

pub async fn install(State(state): State<AppState>, Json(manifest): Json<PluginManifest>) -> Result<impl IntoResponse> {
    let plugin = state.engine.registry().install(manifest).await?;
    Ok((StatusCode::CREATED, Json(plugin)))
}

pub async fn get(State(state): State<AppState>, Path(name): Path<String>) -> Result<Json<Plugin>> {
    state
        .engine
        .registry()
        .get(&name)
        .await
        .map(Json)
        .ok_or_else(|| volant_core::Error::not_found(format!("plugin {name}")).into())
}

pub async fn remove(State(state): State<AppState>, Path(name): Path<String>) -> Result<StatusCode> {
    state.engine.registry().remove(&name).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn set_enabled(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Json(req): Json<SetEnabledRequest>,
) -> Result<Json<SuccessResponse>> {
    state.engine.registry().set_enabled(&name, req.enabled).await?;
    Ok(Json(SuccessResponse { ok: true }))
}
