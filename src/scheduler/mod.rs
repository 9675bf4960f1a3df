//! Daily study-queue composition: `Due > Rolling > New`, interleaved and
//! truncated to `limit` with an adaptive cap on how much `New` can enter
//! when a backlog exists. Reads Store directly; the only writes are the
//! two idempotent housekeeping steps the data model calls for: lazily
//! creating `SrsState` for a card the first time it enters a queue as
//! "new", and tagging a card's word `leech` the first time its lapses
//! cross the threshold.

use chrono::{DateTime, Utc};

use crate::constants::{DEFAULT_NEW_LIMIT, DEFAULT_QUEUE_LIMIT, MAX_QUEUE_LIMIT, ROLLING_OFFSETS_DAYS};
use crate::store::operations::cards::Card;
use crate::store::{Store, StoreError};

#[derive(Debug, Clone)]
pub struct QueueOptions {
    pub limit: u32,
    pub new_limit: u32,
    pub include_rolling: bool,
    pub now: DateTime<Utc>,
    pub wordbook_id: Option<String>,
}

impl Default for QueueOptions {
    fn default() -> Self {
        Self {
            limit: DEFAULT_QUEUE_LIMIT as u32,
            new_limit: DEFAULT_NEW_LIMIT as u32,
            include_rolling: true,
            now: Utc::now(),
            wordbook_id: None,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct QueueStats {
    pub due_count: u64,
    pub rolling_count: u64,
    pub new_count: u64,
    pub new_limit_effective: u32,
    pub reviewed_today: u64,
    pub study_queue_size: u64,
}

pub fn next_queue(store: &Store, options: &QueueOptions) -> Result<(Vec<Card>, QueueStats), StoreError> {
    // `limit = 0` is a valid request for stats with no cards, not a floor of 1.
    let limit = options.limit.min(MAX_QUEUE_LIMIT as u32);

    let wordbook_id = match &options.wordbook_id {
        Some(id) => Some(id.clone()),
        None => store.get_active_wordbook()?.map(|w| w.id),
    };
    let Some(wordbook_id) = wordbook_id else {
        return Ok((Vec::new(), QueueStats::default()));
    };

    let cards = store.list_cards_by_wordbook(&wordbook_id)?;
    let today = options.now.date_naive();

    let mut due: Vec<(Card, DateTime<Utc>, u32)> = Vec::new();
    let mut rolling: Vec<(Card, i64)> = Vec::new();
    let mut new_cards: Vec<(Card, Option<String>)> = Vec::new();

    for card in cards {
        let state = store.get_srs_state(&card.id)?;
        let Some(state) = state else {
            let word = store.get_word(&card.word_id)?;
            new_cards.push((card, word.and_then(|w| w.lesson)));
            continue;
        };

        if state.reps > 0 && state.due <= options.now {
            let mut effective_due = state.due;
            if crate::srs::is_leech(&state) {
                if let Some(word) = store.get_word(&card.word_id)? {
                    if !word.is_leech() {
                        store.tag_leech(&word.id)?;
                        effective_due = state.due + chrono::Duration::days(1);
                    }
                }
            }
            if effective_due <= options.now {
                due.push((card, effective_due, state.lapses));
            }
            continue;
        }

        if options.include_rolling {
            let seen_days_ago = (today - state.first_seen_at.date_naive()).num_days();
            if ROLLING_OFFSETS_DAYS.contains(&seen_days_ago) {
                rolling.push((card, seen_days_ago));
            }
        }
    }

    due.sort_by(|a, b| a.1.cmp(&b.1).then(b.2.cmp(&a.2)).then(a.0.id.cmp(&b.0.id)));
    rolling.sort_by(|a, b| a.1.cmp(&b.1).then(a.0.id.cmp(&b.0.id)));
    new_cards.sort_by(|a, b| natural_cmp(&a.1, &b.1).then(a.0.id.cmp(&b.0.id)));

    let due_count = due.len() as u64;
    let rolling_count = rolling.len() as u64;
    let new_count = new_cards.len() as u64;

    let backlog = due_count + rolling_count;
    let double_limit = 2 * limit as u64;
    let new_limit_effective = if backlog > double_limit {
        let reduction = ((backlog - double_limit) as f64 / 10.0).ceil() as u32;
        options.new_limit.saturating_sub(reduction)
    } else {
        options.new_limit
    };

    let mut queue: Vec<Card> = Vec::new();
    queue.extend(due.into_iter().map(|(c, _, _)| c));
    queue.extend(rolling.into_iter().map(|(c, _)| c));
    let new_slice: Vec<Card> = new_cards
        .into_iter()
        .map(|(c, _)| c)
        .take(new_limit_effective as usize)
        .collect();
    let new_taken = new_slice.len() as u64;
    queue.extend(new_slice);
    queue.truncate(limit as usize);

    for card in &queue {
        if store.get_srs_state(&card.id)?.is_none() {
            let state = crate::store::operations::srs::SrsState::new_for_card(&card.id, options.now);
            store.put_srs_state(&state)?;
        }
    }

    let reviewed_today = store
        .list_all_reviews()?
        .into_iter()
        .filter(|r| r.ts.date_naive() == today)
        .count() as u64;

    let stats = QueueStats {
        due_count,
        rolling_count,
        new_count,
        new_limit_effective,
        reviewed_today,
        study_queue_size: due_count + rolling_count + new_taken.min(new_limit_effective as u64),
    };

    Ok((queue, stats))
}

/// Numeric comparison when both sides parse as integers, else lexicographic.
fn natural_cmp(a: &Option<String>, b: &Option<String>) -> std::cmp::Ordering {
    match (a, b) {
        (None, None) => std::cmp::Ordering::Equal,
        (None, Some(_)) => std::cmp::Ordering::Greater,
        (Some(_), None) => std::cmp::Ordering::Less,
        (Some(a), Some(b)) => match (a.parse::<i64>(), b.parse::<i64>()) {
            (Ok(na), Ok(nb)) => na.cmp(&nb),
            _ => a.cmp(b),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::operations::cards::CardTemplate;
    use crate::store::operations::srs::SrsState;
    use crate::store::operations::wordbooks::NewWordbook;
    use crate::store::operations::words::NormalizedWord;
    use std::collections::BTreeMap;
    use tempfile::tempdir;

    fn setup() -> (tempfile::TempDir, Store, String) {
        let dir = tempdir().unwrap();
        let store = Store::open(dir.path().join("db").to_str().unwrap()).unwrap();
        let book = store
            .create_wordbook(NewWordbook {
                name: "A".to_string(),
                language: "fr".to_string(),
                description: None,
                author: None,
                version: None,
            })
            .unwrap();
        store.activate_wordbook(&book.id).unwrap();
        (dir, store, book.id)
    }

    fn add_word(store: &Store, wordbook_id: &str, lemma: &str, lesson: &str) -> String {
        let outcome = store
            .upsert_word(
                wordbook_id,
                NormalizedWord {
                    lemma: lemma.to_string(),
                    pos: None,
                    gender: None,
                    ipa: None,
                    meaning_text: "x".to_string(),
                    translations: BTreeMap::new(),
                    lesson: Some(lesson.to_string()),
                    cefr: None,
                    tags: vec![],
                },
            )
            .unwrap();
        let crate::store::operations::words::UpsertOutcome::Inserted(word) = outcome else {
            panic!("expected insert");
        };
        store
            .create_card_if_missing(&word.id, CardTemplate::Basic, None)
            .unwrap();
        word.id
    }

    #[test]
    fn new_cards_are_ordered_by_natural_lesson_order() {
        let (_dir, store, wb) = setup();
        add_word(&store, &wb, "chat", "10");
        add_word(&store, &wb, "chien", "2");

        let options = QueueOptions {
            wordbook_id: Some(wb),
            ..Default::default()
        };
        let (queue, stats) = next_queue(&store, &options).unwrap();
        assert_eq!(stats.new_count, 2);
        assert_eq!(queue.len(), 2);
    }

    #[test]
    fn empty_when_no_active_wordbook() {
        let dir = tempdir().unwrap();
        let store = Store::open(dir.path().join("db").to_str().unwrap()).unwrap();
        let (queue, stats) = next_queue(&store, &QueueOptions::default()).unwrap();
        assert!(queue.is_empty());
        assert_eq!(stats.study_queue_size, 0);
    }

    #[test]
    fn adaptive_new_cap_shrinks_under_backlog() {
        let (_dir, store, wb) = setup();
        for i in 0..5 {
            let word_id = add_word(&store, &wb, &format!("w{i}"), "1");
            let card = store
                .list_cards_by_word(&word_id)
                .unwrap()
                .into_iter()
                .next()
                .unwrap();
            let mut state = SrsState::new_for_card(&card.id, Utc::now() - chrono::Duration::days(1));
            state.reps = 1;
            state.due = Utc::now() - chrono::Duration::hours(1);
            store.put_srs_state(&state).unwrap();
        }
        add_word(&store, &wb, "new-word", "1");

        let options = QueueOptions {
            wordbook_id: Some(wb),
            limit: 2,
            new_limit: 10,
            ..Default::default()
        };
        let (_, stats) = next_queue(&store, &options).unwrap();
        assert_eq!(stats.due_count, 5);
        assert!(stats.new_limit_effective < 10);
    }
}
