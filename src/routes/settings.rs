use axum::extract::State;
use axum::routing::get;
use axum::Router;

use crate::extractors::JsonBody;
use crate::response::{ok, AppError};
use crate::state::AppState;
use crate::store::operations::settings::Settings;

pub fn router() -> Router<AppState> {
    Router::new().route("/", get(get_settings).put(put_settings))
}

async fn get_settings(State(state): State<AppState>) -> Result<impl axum::response::IntoResponse, AppError> {
    Ok(ok(state.store().get_settings()?))
}

async fn put_settings(
    State(state): State<AppState>,
    JsonBody(settings): JsonBody<Settings>,
) -> Result<impl axum::response::IntoResponse, AppError> {
    state.store().put_settings(&settings)?;
    Ok(ok(settings))
}
