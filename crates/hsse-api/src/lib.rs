//! # hsse-api — Axum API Service
//!
//! HTTP surface for the compliance workflow engine, built on Axum/Tower/Tokio.
//!
//! | Path | Module | Purpose |
//! |------|--------|---------|
//! | `/v1/workflows/*` | [`routes::workflows`] | Lifecycle, findings, corrective actions |
//! | `/health/*` | this module | Liveness and readiness probes |
//!
//! ## Crate Policy
//!
//! - No business logic in route handlers. Handlers parse the request, hand
//!   a command batch to `hsse-state`, and map the outcome.
//! - All errors map to structured HTTP responses via [`AppError`].

pub mod error;
pub mod extractors;
pub mod routes;
pub mod state;

use axum::extract::{DefaultBodyLimit, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Router;
use tower_http::trace::TraceLayer;

pub use error::AppError;
pub use state::{AppConfig, AppState};

/// Assemble the application router with all routes and middleware.
pub fn app(state: AppState) -> Router {
    let api = Router::new()
        .merge(routes::workflows::router())
        .layer(DefaultBodyLimit::max(2 * 1024 * 1024))
        .layer(TraceLayer::new_for_http())
        .with_state(state.clone());

    let health = Router::new()
        .route("/health/liveness", axum::routing::get(liveness))
        .route("/health/readiness", axum::routing::get(readiness))
        .with_state(state);

    Router::new().merge(health).merge(api)
}

/// Liveness probe.
async fn liveness() -> &'static str {
    "ok"
}

/// Readiness probe: the store answers a listing.
async fn readiness(State(state): State<AppState>) -> impl IntoResponse {
    match state.store.list() {
        Ok(_) => (StatusCode::OK, "ready").into_response(),
        Err(e) => {
            tracing::warn!(error = %e, "store not ready");
            (StatusCode::SERVICE_UNAVAILABLE, "store unavailable").into_response()
        }
    }
}
