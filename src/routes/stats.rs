use std::collections::HashMap;

use axum::extract::State;
use axum::routing::get;
use axum::Router;

use crate::response::{ok, AppError};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/", get(global_stats))
}

async fn global_stats(State(state): State<AppState>) -> Result<impl axum::response::IntoResponse, AppError> {
    let store = state.store();
    let wordbooks = store.list_wordbooks()?;

    let mut total_words = 0u64;
    let mut by_lesson: HashMap<String, u64> = HashMap::new();
    let mut by_cefr: HashMap<String, u64> = HashMap::new();
    let mut by_pos: HashMap<String, u64> = HashMap::new();

    for book in &wordbooks {
        for word in store.list_words_by_wordbook(&book.id)? {
            total_words += 1;
            if let Some(lesson) = &word.lesson {
                *by_lesson.entry(lesson.clone()).or_insert(0) += 1;
            }
            if let Some(cefr) = word.cefr {
                *by_cefr.entry(format!("{cefr:?}")).or_insert(0) += 1;
            }
            if let Some(pos) = &word.pos {
                *by_pos.entry(pos.clone()).or_insert(0) += 1;
            }
        }
    }

    Ok(ok(serde_json::json!({
        "totalWords": total_words,
        "totalWordbooks": wordbooks.len(),
        "byLesson": by_lesson,
        "byCefr": by_cefr,
        "byPos": by_pos,
    })))
}
