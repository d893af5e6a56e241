//! Route table: one module per resource.

pub mod agent;
pub mod console;
pub mod deployments;
pub mod events;
pub mod health;
pub mod plugins;
pub mod vms;

use axum::routing::{get, post};
use axum::Router;

use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/healthz", get(health::healthz))
        .route("/api/v1/system/info", get(health::system_info))
        .route("/api/v1/vms", get(vms::list).post(vms::create))
        .route("/api/v1/vms/:name", get(vms::get).delete(vms::destroy))
        .route("/api/v1/vms/:name/start", post(vms::start))
        .route("/api/v1/vms/:name/stop", post(vms::stop))
        .route("/api/v1/vms/:name/restart", post(vms::restart))
        .route("/api/v1/vms/:name/config", get(vms::get_config).patch(vms::update_config))
        .route("/api/v1/vms/:name/config/history", get(vms::config_history))
        .route("/api/v1/vms/:name/openapi", get(vms::openapi))
        .route("/api/v1/vms/:name/agent/*path", get(agent::proxy).post(agent::proxy).put(agent::proxy).patch(agent::proxy).delete(agent::proxy))
        .route("/api/v1/deployments", get(deployments::list).post(deployments::create))
        .route(
            "/api/v1/deployments/:name",
            get(deployments::get).patch(deployments::scale).delete(deployments::delete),
        )
        .route("/api/v1/plugins", get(plugins::list).post(plugins::install))
        .route("/api/v1/plugins/:name", get(plugins::get).delete(plugins::remove))
        .route("/api/v1/plugins/:name/enabled", post(plugins::set_enabled))
        .route("/api/v1/events/vms", get(events::stream))
        .route("/ws/v1/vms/:name/console", get(console::bridge))
}
