//! Deployment CRUD and scale handlers.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;

use volant_core::deployment::{CreateDeploymentRequest, Deployment, ScaleDeploymentRequest};

use crate::error::Result;
use crate::state::AppState;

pub async fn list(State(state): State<AppState>) -> Result<impl IntoResponse> {
    Ok(Json(state.engine.list_deployments().await?))
}

pub async fn create(State(state): State<AppState>, Json(req): Json<CreateDeploymentRequest>) -> Result<impl IntoResponse> {
    let deployment = state.engine.create_deployment(req).await?;
    Ok((StatusCode::CREATED, Json(deployment)))
}

pub async fn get(State(state): State<AppState>, Path(name): Path<String>) -> Result<Json<Deployment>> {
    Ok(Json(state.engine.get_deployment(&name).await?))
}

pub async fn scale(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Json(req): Json<ScaleDeploymentRequest>,
) -> Result<Json<Deployment>> {
    Ok(Json(state.engine.scale_deployment(&name, req).await?))
}

pub async fn delete(State(state): State<AppState>, Path(name): Path<String>) -> Result<StatusCode> {
    state.engine.delete_deployment(&name).await?;
    Ok(StatusCode::NO_CONTENT)
}
