use axum::extract::{Query, State};
use axum::routing::get;
use axum::Router;
use chrono::Utc;
use serde::Deserialize;

use crate::response::{ok, AppError};
use crate::scheduler::{self, QueueOptions};
use crate::srs;
use crate::state::AppState;
use crate::stats;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/next", get(next_queue))
        .route("/stats", get(today_stats))
        .route("/progress", get(progress))
        .route("/due-forecast", get(due_forecast))
}

#[derive(Debug, Deserialize)]
struct NextParams {
    limit: Option<u32>,
    #[serde(rename = "newLimit")]
    new_limit: Option<u32>,
    #[serde(rename = "includeRolling")]
    include_rolling: Option<bool>,
    #[serde(rename = "wordbookId")]
    wordbook_id: Option<String>,
}

async fn next_queue(
    State(state): State<AppState>,
    Query(params): Query<NextParams>,
) -> Result<impl axum::response::IntoResponse, AppError> {
    let defaults = &state.config().scheduler;
    let options = QueueOptions {
        limit: params.limit.unwrap_or(defaults.default_limit as u32).min(defaults.max_limit as u32),
        new_limit: params.new_limit.unwrap_or(defaults.default_new_limit as u32),
        include_rolling: params.include_rolling.unwrap_or(true),
        now: Utc::now(),
        wordbook_id: params.wordbook_id,
    };

    let (queue, queue_stats) = scheduler::next_queue(state.store(), &options)?;
    Ok(ok(serde_json::json!({
        "cards": queue,
        "stats": {
            "dueCount": queue_stats.due_count,
            "rollingCount": queue_stats.rolling_count,
            "newCount": queue_stats.new_count,
            "newLimitEffective": queue_stats.new_limit_effective,
            "reviewedToday": queue_stats.reviewed_today,
            "studyQueueSize": queue_stats.study_queue_size,
        },
    })))
}

async fn today_stats(State(state): State<AppState>) -> Result<impl axum::response::IntoResponse, AppError> {
    let today = stats::today(state.store(), Utc::now())?;
    Ok(ok(today))
}

#[derive(Debug, Deserialize)]
struct DaysParams {
    days: Option<u32>,
}

async fn progress(
    State(state): State<AppState>,
    Query(params): Query<DaysParams>,
) -> Result<impl axum::response::IntoResponse, AppError> {
    let days = params.days.unwrap_or(30).clamp(1, 365);
    let result = stats::progress(state.store(), Utc::now(), days)?;
    Ok(ok(result))
}

async fn due_forecast(
    State(state): State<AppState>,
    Query(params): Query<DaysParams>,
) -> Result<impl axum::response::IntoResponse, AppError> {
    let days = params.days.unwrap_or(14).clamp(1, 90);
    let result = stats::due_forecast(state.store(), Utc::now(), days)?;
    Ok(ok(result))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ReviewRequest {
    card_id: String,
    grade: u8,
    elapsed_ms: Option<u64>,
}

/// Mounted at the API root (`/review`), not under `/study`.
pub async fn review(
    State(state): State<AppState>,
    crate::extractors::JsonBody(req): crate::extractors::JsonBody<ReviewRequest>,
) -> Result<impl axum::response::IntoResponse, AppError> {
    if req.grade > 3 {
        return Err(AppError::bad_request("BAD_INPUT", "grade must be 0..=3"));
    }

    let store = state.store();
    let card = store
        .get_card(&req.card_id)?
        .ok_or_else(|| AppError::not_found("card not found"))?;

    let now = Utc::now();
    let mut srs_state = store
        .get_srs_state(&req.card_id)?
        .unwrap_or_else(|| crate::store::operations::srs::SrsState::new_for_card(&req.card_id, now));

    let review = srs::apply(&mut srs_state, req.grade, req.elapsed_ms, now);
    store.put_srs_state_and_append_review(&srs_state, review.clone())?;

    // §3 invariant: lapses ≥ threshold ⇒ the word is tagged leech, regardless
    // of whether this card is ever pulled through the study queue again.
    if srs::is_leech(&srs_state) {
        if let Some(word) = store.get_word(&card.word_id)? {
            if !word.is_leech() {
                store.tag_leech(&word.id)?;
            }
        }
    }

    Ok(ok(serde_json::json!({
        "review": review,
        "srsState": srs_state,
    })))
}
