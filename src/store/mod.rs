pub mod keys;
pub mod migrate;
pub mod operations;
pub mod trees;

use serde::de::DeserializeOwned;
use serde::Serialize;
use sled::Db;
use thiserror::Error;

pub use operations::cards::{Card, CardTemplate};
pub use operations::imports::{ImportJob, ImportStatus, RowErrorRecord};
pub use operations::index::WordHit;
pub use operations::settings::Settings;
pub use operations::srs::{Review, SrsAlgo, SrsState};
pub use operations::wordbooks::{NewWordbook, Wordbook};
pub use operations::words::{Cefr, NormalizedWord, Word, WordFilter, UpsertOutcome};

#[derive(Debug)]
pub struct Store {
    db: Db,
    pub wordbooks: sled::Tree,
    pub wordbooks_name_idx: sled::Tree,
    pub words: sled::Tree,
    pub words_unique_idx: sled::Tree,
    pub wordbook_words_idx: sled::Tree,
    pub cards: sled::Tree,
    pub cards_by_word_idx: sled::Tree,
    pub srs_states: sled::Tree,
    pub reviews: sled::Tree,
    pub reviews_by_time_idx: sled::Tree,
    pub reviews_by_card_idx: sled::Tree,
    pub import_jobs: sled::Tree,
    pub import_jobs_by_time_idx: sled::Tree,
    pub settings: sled::Tree,
    pub word_lemma_idx: sled::Tree,
    pub word_token_idx: sled::Tree,
    pub word_doc_len_idx: sled::Tree,
    pub index_field_stats: sled::Tree,
    pub config_versions: sled::Tree,
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("sled error: {0}")]
    Sled(#[from] sled::Error),
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("not found: entity={entity}, key={key}")]
    NotFound { entity: String, key: String },
    #[error("conflict: entity={entity}, key={key}")]
    Conflict { entity: String, key: String },
    #[error("precondition failed: {0}")]
    PreconditionFailed(String),
    #[error("CAS retry exhausted after {attempts} attempts: entity={entity}, key={key}")]
    CasRetryExhausted {
        entity: String,
        key: String,
        attempts: u32,
    },
    #[error("validation error: {0}")]
    Validation(String),
    #[error("migration error at version {version}: {message}")]
    Migration { version: u32, message: String },
}

impl Store {
    pub fn open(sled_path: &str) -> Result<Self, StoreError> {
        let db = sled::open(sled_path)?;

        let store = Self {
            wordbooks: db.open_tree(trees::WORDBOOKS)?,
            wordbooks_name_idx: db.open_tree(trees::WORDBOOKS_NAME_IDX)?,
            words: db.open_tree(trees::WORDS)?,
            words_unique_idx: db.open_tree(trees::WORDS_UNIQUE_IDX)?,
            wordbook_words_idx: db.open_tree(trees::WORDBOOK_WORDS_IDX)?,
            cards: db.open_tree(trees::CARDS)?,
            cards_by_word_idx: db.open_tree(trees::CARDS_BY_WORD_IDX)?,
            srs_states: db.open_tree(trees::SRS_STATES)?,
            reviews: db.open_tree(trees::REVIEWS)?,
            reviews_by_time_idx: db.open_tree(trees::REVIEWS_BY_TIME_IDX)?,
            reviews_by_card_idx: db.open_tree(trees::REVIEWS_BY_CARD_IDX)?,
            import_jobs: db.open_tree(trees::IMPORT_JOBS)?,
            import_jobs_by_time_idx: db.open_tree(trees::IMPORT_JOBS_BY_TIME_IDX)?,
            settings: db.open_tree(trees::SETTINGS)?,
            word_lemma_idx: db.open_tree(trees::WORD_LEMMA_IDX)?,
            word_token_idx: db.open_tree(trees::WORD_TOKEN_IDX)?,
            word_doc_len_idx: db.open_tree(trees::WORD_DOC_LEN_IDX)?,
            index_field_stats: db.open_tree(trees::INDEX_FIELD_STATS)?,
            config_versions: db.open_tree(trees::CONFIG_VERSIONS)?,
            db,
        };

        Ok(store)
    }

    pub fn run_migrations(&self) -> Result<(), StoreError> {
        migrate::run(self)
    }

    pub fn flush(&self) -> Result<(), StoreError> {
        self.db.flush()?;
        Ok(())
    }

    pub fn raw_db(&self) -> &Db {
        &self.db
    }

    pub(crate) fn serialize<T: Serialize>(value: &T) -> Result<Vec<u8>, StoreError> {
        Ok(serde_json::to_vec(value)?)
    }

    pub(crate) fn deserialize<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, StoreError> {
        Ok(serde_json::from_slice(bytes)?)
    }
}
