use axum::extract::{Path, Query, State};
use axum::routing::get;
use axum::Router;
use serde::Deserialize;

use crate::response::{ok, AppError};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_imports))
        .route("/:id", get(get_import))
}

#[derive(Debug, Deserialize)]
struct ListImportsParams {
    #[serde(rename = "wordbookId")]
    wordbook_id: Option<String>,
}

async fn list_imports(
    State(state): State<AppState>,
    Query(params): Query<ListImportsParams>,
) -> Result<impl axum::response::IntoResponse, AppError> {
    let mut jobs = state.store().list_import_jobs(200)?;
    if let Some(wordbook_id) = params.wordbook_id {
        jobs.retain(|job| job.wordbook_id == wordbook_id);
    }
    Ok(ok(jobs))
}

async fn get_import(
    Path(id): Path<String>,
    State(state): State<AppState>,
) -> Result<impl axum::response::IntoResponse, AppError> {
    let job = state
        .store()
        .get_import_job(&id)?
        .ok_or_else(|| AppError::not_found("import job not found"))?;
    Ok(ok(job))
}
