pub mod config;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod state;

use axum::Router;
use tower_http::trace::TraceLayer;

pub use config::Config;
pub use state::AppState;

/// Builds the full router: every handler in `handlers::routes`, wrapped in
/// request logging and (when configured) the auth guard, with connection
/// info made available for the CIDR allowlist check.
pub fn create_app(state: AppState) -> Router {
    let mut app = Router::new().merge(handlers::routes());

    if state.config.api_key.is_some() || !state.config.allowed_cidrs.is_empty() {
        app = app.layer(axum::middleware::from_fn_with_state(state.clone(), middleware::auth::guard));
    }

    app.layer(axum::middleware::from_fn(middleware::logging::correlate_and_log))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}