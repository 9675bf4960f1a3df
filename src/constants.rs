/// List-endpoint default page size.
pub const DEFAULT_PAGE_SIZE: u64 = 20;

/// List-endpoint maximum page size.
pub const MAX_PAGE_SIZE: u64 = 100;

/// Rows committed per bulk-upsert transaction (spec: N ≈ 500).
pub const IMPORT_BATCH_SIZE: usize = 500;

/// Row errors retained on an `ImportJob` before further ones are dropped.
pub const IMPORT_ROW_ERROR_CAP: usize = 50;

/// Process-wide concurrent import cap (spec: W, default 2).
pub const DEFAULT_IMPORT_CONCURRENCY: usize = 2;

/// Minimum allowed ease factor for an SRS card.
pub const MIN_EASE: f64 = 1.3;

/// Maximum allowed ease factor for an SRS card.
pub const MAX_EASE: f64 = 3.5;

/// Default ease factor for a freshly created SRS state.
pub const DEFAULT_EASE: f64 = 2.5;

/// Lapses at or above this count tag a word's card as a leech.
pub const LEECH_LAPSES_THRESHOLD: u32 = 8;

/// Day offsets since first exposure at which a card re-surfaces via the
/// rolling window, regardless of SRS due date.
pub const ROLLING_OFFSETS_DAYS: &[i64] = &[1, 2, 4, 7];

/// Default composed study-queue size.
pub const DEFAULT_QUEUE_LIMIT: u64 = 30;

/// Hard cap on a requested study-queue size.
pub const MAX_QUEUE_LIMIT: u64 = 100;

/// Default cap on how many "new" cards may enter a single queue.
pub const DEFAULT_NEW_LIMIT: u64 = 10;

/// bm25 term-frequency saturation parameter.
pub const BM25_K1: f64 = 1.2;

/// bm25 length-normalization parameter.
pub const BM25_B: f64 = 0.75;

/// Per-field bm25 weight for the lemma field.
pub const BM25_WEIGHT_LEMMA: f64 = 3.0;

/// Per-field bm25 weight for the meanings/translations field.
pub const BM25_WEIGHT_MEANINGS: f64 = 1.0;
