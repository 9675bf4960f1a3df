use axum::extract::{Multipart, Path, Query, State};
use axum::routing::get;
use axum::Router;
use serde::Deserialize;

use crate::parser::Format;
use crate::response::{accepted, ok, paginated, AppError};
use crate::state::AppState;
use crate::store::operations::words::WordFilter;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/bulk", axum::routing::post(bulk_import))
        .route("/search", get(search_words))
        .route("/suggest", get(suggest_words))
        .route("/:id", get(get_word))
}

#[derive(Debug, Deserialize)]
struct SearchParams {
    q: Option<String>,
    lesson: Option<String>,
    cefr: Option<String>,
    pos: Option<String>,
    page: Option<u64>,
    #[serde(rename = "perPage")]
    per_page: Option<u64>,
}

async fn search_words(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> Result<impl axum::response::IntoResponse, AppError> {
    let cefr = match params.cefr {
        Some(raw) => Some(
            serde_json::from_value::<crate::store::operations::words::Cefr>(serde_json::Value::String(
                raw.to_uppercase(),
            ))
            .map_err(|_| AppError::bad_request("BAD_INPUT", "invalid cefr level"))?,
        ),
        None => None,
    };

    let page = params.page.unwrap_or(1).max(1);
    let per_page = params
        .per_page
        .unwrap_or(state.config().pagination.default_page_size)
        .min(state.config().pagination.max_page_size)
        .max(1);

    let filter = WordFilter {
        q: params.q,
        lesson: params.lesson,
        cefr,
        pos: params.pos,
        page: page as u32,
        per_page: per_page as u32,
    };

    let (words, total) = state.store().query_words(&filter)?;
    Ok(paginated(words, total, page, per_page))
}

#[derive(Debug, Deserialize)]
struct SuggestParams {
    q: String,
    limit: Option<usize>,
}

async fn suggest_words(
    State(state): State<AppState>,
    Query(params): Query<SuggestParams>,
) -> Result<impl axum::response::IntoResponse, AppError> {
    let limit = params.limit.unwrap_or(10).min(50);
    let hits = state.store().suggest(&params.q, limit)?;
    Ok(ok(hits))
}

async fn get_word(
    Path(id): Path<String>,
    State(state): State<AppState>,
) -> Result<impl axum::response::IntoResponse, AppError> {
    let word = state
        .store()
        .get_word(&id)?
        .ok_or_else(|| AppError::not_found("word not found"))?;
    Ok(ok(word))
}

async fn bulk_import(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<impl axum::response::IntoResponse, AppError> {
    let mut wordbook_id: Option<String> = None;
    let mut filename = "upload".to_string();
    let mut bytes: Option<Vec<u8>> = None;
    let mut format = Format::Auto;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|err| AppError::bad_request("INVALID_MULTIPART", &err.to_string()))?
    {
        match field.name().unwrap_or_default() {
            "wordbookId" => {
                let value = field
                    .text()
                    .await
                    .map_err(|err| AppError::bad_request("INVALID_MULTIPART", &err.to_string()))?;
                wordbook_id = Some(value);
            }
            "format" => {
                let value = field
                    .text()
                    .await
                    .map_err(|err| AppError::bad_request("INVALID_MULTIPART", &err.to_string()))?;
                format = match value.to_lowercase().as_str() {
                    "csv" => Format::Csv,
                    "tsv" => Format::Tsv,
                    "json" => Format::Json,
                    _ => Format::Auto,
                };
            }
            "file" => {
                filename = field.file_name().unwrap_or("upload").to_string();
                let data = field
                    .bytes()
                    .await
                    .map_err(|err| AppError::bad_request("INVALID_MULTIPART", &err.to_string()))?;
                bytes = Some(data.to_vec());
            }
            _ => {}
        }
    }

    let bytes = bytes.ok_or_else(|| AppError::bad_request("MISSING_FILE", "no file field in upload"))?;

    let wordbook_id = match wordbook_id {
        Some(id) => id,
        None => state
            .store()
            .get_active_wordbook()?
            .ok_or_else(|| AppError::bad_request("NO_WORDBOOK", "no wordbookId given and no active wordbook"))?
            .id,
    };

    let import_id = state
        .importer()
        .start(state.store().clone(), wordbook_id, filename, bytes, format)
        .await?;

    Ok(accepted(serde_json::json!({
        "importId": import_id,
        "status": "pending",
        "message": "import accepted",
    })))
}
