use std::collections::HashMap;

use axum::extract::{Path, State};
use axum::routing::{delete, get, post};
use axum::Router;
use serde::Deserialize;

use crate::extractors::JsonBody;
use crate::response::{created, ok, AppError};
use crate::state::AppState;
use crate::store::operations::wordbooks::NewWordbook;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(create_wordbook).get(list_wordbooks))
        .route("/active", get(get_active_wordbook))
        .route("/:id", get(get_wordbook).delete(delete_wordbook))
        .route("/:id/activate", post(activate_wordbook))
        .route("/:id/stats", get(wordbook_stats))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateWordbookRequest {
    name: String,
    language: String,
    description: Option<String>,
    author: Option<String>,
    version: Option<String>,
}

async fn create_wordbook(
    State(state): State<AppState>,
    JsonBody(req): JsonBody<CreateWordbookRequest>,
) -> Result<impl axum::response::IntoResponse, AppError> {
    if req.name.trim().is_empty() {
        return Err(AppError::bad_request("BAD_INPUT", "name must not be empty"));
    }

    let book = state.store().create_wordbook(NewWordbook {
        name: req.name.trim().to_string(),
        language: req.language,
        description: req.description,
        author: req.author,
        version: req.version,
    })?;
    Ok(created(book))
}

async fn list_wordbooks(
    State(state): State<AppState>,
) -> Result<impl axum::response::IntoResponse, AppError> {
    Ok(ok(state.store().list_wordbooks()?))
}

async fn get_active_wordbook(
    State(state): State<AppState>,
) -> Result<impl axum::response::IntoResponse, AppError> {
    match state.store().get_active_wordbook()? {
        Some(book) => Ok(ok(book)),
        None => Err(AppError::not_found("no active wordbook")),
    }
}

async fn get_wordbook(
    Path(id): Path<String>,
    State(state): State<AppState>,
) -> Result<impl axum::response::IntoResponse, AppError> {
    let book = state
        .store()
        .get_wordbook(&id)?
        .ok_or_else(|| AppError::not_found("wordbook not found"))?;
    Ok(ok(book))
}

async fn activate_wordbook(
    Path(id): Path<String>,
    State(state): State<AppState>,
) -> Result<impl axum::response::IntoResponse, AppError> {
    let book = state.store().activate_wordbook(&id)?;
    Ok(ok(serde_json::json!({
        "message": "wordbook activated",
        "wordbook": book,
    })))
}

async fn delete_wordbook(
    Path(id): Path<String>,
    State(state): State<AppState>,
) -> Result<impl axum::response::IntoResponse, AppError> {
    state.store().delete_wordbook(&id)?;
    Ok(ok(serde_json::json!({ "message": "wordbook deleted" })))
}

async fn wordbook_stats(
    Path(id): Path<String>,
    State(state): State<AppState>,
) -> Result<impl axum::response::IntoResponse, AppError> {
    let book = state
        .store()
        .get_wordbook(&id)?
        .ok_or_else(|| AppError::not_found("wordbook not found"))?;

    let words = state.store().list_words_by_wordbook(&id)?;
    let total_words = words.len() as u64;

    let mut by_cefr: HashMap<String, u64> = HashMap::new();
    let mut by_pos: HashMap<String, u64> = HashMap::new();
    let mut by_lesson: HashMap<String, u64> = HashMap::new();

    for word in &words {
        if let Some(cefr) = word.cefr {
            *by_cefr.entry(format!("{cefr:?}")).or_insert(0) += 1;
        }
        if let Some(pos) = &word.pos {
            *by_pos.entry(pos.clone()).or_insert(0) += 1;
        }
        if let Some(lesson) = &word.lesson {
            *by_lesson.entry(lesson.clone()).or_insert(0) += 1;
        }
    }

    Ok(ok(serde_json::json!({
        "wordbook": book,
        "totalWords": total_words,
        "byCefr": by_cefr,
        "byPos": by_pos,
        "byLesson": by_lesson,
    })))
}
