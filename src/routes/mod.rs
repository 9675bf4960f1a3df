pub mod health;
pub mod imports;
pub mod settings;
pub mod stats;
pub mod study;
pub mod wordbooks;
pub mod words;

use axum::extract::DefaultBodyLimit;
use axum::routing::post;
use axum::Router;

use crate::middleware::request_id;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    let max_upload_bytes = state.config().limits.max_upload_bytes;

    let api_routes = Router::new()
        .nest("/wordbooks", wordbooks::router())
        .nest("/words", words::router())
        .nest("/imports", imports::router())
        .nest("/study", study::router())
        .nest("/stats", stats::router())
        .nest("/settings", settings::router())
        .route("/review", post(study::review))
        .layer(DefaultBodyLimit::max(max_upload_bytes));

    Router::new()
        .nest("/api/v1", api_routes)
        .nest("/health", health::router())
        .layer(axum::middleware::from_fn(request_id::request_id_middleware))
        .with_state(state)
}
