//! Sled tree name constants. Changing a tree name strands existing data
//! behind a different tree; migrations never rename a tree in place.

pub const WORDBOOKS: &str = "wordbooks";
pub const WORDBOOKS_NAME_IDX: &str = "idx_wordbooks_name";

pub const WORDS: &str = "words";
pub const WORDS_UNIQUE_IDX: &str = "idx_words_unique";
pub const WORDBOOK_WORDS_IDX: &str = "idx_wordbook_words";

pub const CARDS: &str = "cards";
pub const CARDS_BY_WORD_IDX: &str = "idx_cards_by_word";

pub const SRS_STATES: &str = "srs_states";

pub const REVIEWS: &str = "reviews";
pub const REVIEWS_BY_TIME_IDX: &str = "idx_reviews_by_time";
pub const REVIEWS_BY_CARD_IDX: &str = "idx_reviews_by_card";

pub const IMPORT_JOBS: &str = "import_jobs";
pub const IMPORT_JOBS_BY_TIME_IDX: &str = "idx_import_jobs_by_time";

pub const SETTINGS: &str = "settings";

pub const WORD_LEMMA_IDX: &str = "idx_word_lemma";
pub const WORD_TOKEN_IDX: &str = "idx_word_token";
pub const WORD_DOC_LEN_IDX: &str = "idx_word_doc_len";
pub const INDEX_FIELD_STATS: &str = "idx_field_stats";

pub const CONFIG_VERSIONS: &str = "config_versions";
