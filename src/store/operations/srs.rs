use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::store::keys;
use crate::store::{Store, StoreError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SrsAlgo {
    Sm2,
    Fsrs,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SrsState {
    pub card_id: String,
    pub algo: SrsAlgo,
    pub due: DateTime<Utc>,
    pub interval: u32,
    pub ease: f64,
    pub reps: u32,
    pub lapses: u32,
    pub last_grade: Option<u8>,
    pub first_seen_at: DateTime<Utc>,
    pub last_reviewed_at: Option<DateTime<Utc>>,
}

impl SrsState {
    /// `(reps=0, interval=0, ease=2.5, due=now)` — the card is "new".
    pub fn new_for_card(card_id: &str, now: DateTime<Utc>) -> Self {
        Self {
            card_id: card_id.to_string(),
            algo: SrsAlgo::Sm2,
            due: now,
            interval: 0,
            ease: crate::constants::DEFAULT_EASE,
            reps: 0,
            lapses: 0,
            last_grade: None,
            first_seen_at: now,
            last_reviewed_at: None,
        }
    }

    pub fn is_new(&self) -> bool {
        self.reps == 0
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Review {
    pub id: String,
    pub card_id: String,
    pub ts: DateTime<Utc>,
    pub grade: u8,
    pub elapsed_ms: Option<u64>,
    pub prev_interval: u32,
    pub new_interval: u32,
}

impl Store {
    pub fn get_srs_state(&self, card_id: &str) -> Result<Option<SrsState>, StoreError> {
        let key = keys::srs_state_key(card_id);
        match self.srs_states.get(key.as_bytes())? {
            Some(raw) => Ok(Some(Self::deserialize(&raw)?)),
            None => Ok(None),
        }
    }

    pub fn put_srs_state(&self, state: &SrsState) -> Result<(), StoreError> {
        let key = keys::srs_state_key(&state.card_id);
        self.srs_states
            .insert(key.as_bytes(), Self::serialize(state)?)?;
        Ok(())
    }

    /// `PutSRSState` and `AppendReview` commit together: sled has no
    /// cross-tree transactions here, so state is written first and the
    /// review append is the step that can safely retry on its own without
    /// corrupting scheduling state.
    pub fn put_srs_state_and_append_review(
        &self,
        state: &SrsState,
        review: Review,
    ) -> Result<(), StoreError> {
        self.put_srs_state(state)?;
        self.append_review(review)
    }

    pub fn append_review(&self, review: Review) -> Result<(), StoreError> {
        let ts_ms = review.ts.timestamp_millis();

        self.reviews
            .insert(review.id.as_bytes(), Self::serialize(&review)?)?;

        let time_key = keys::review_key(ts_ms, &review.id);
        self.reviews_by_time_idx
            .insert(time_key.as_bytes(), review.id.as_bytes())?;

        let card_key = keys::reviews_by_card_key(&review.card_id, ts_ms, &review.id);
        self.reviews_by_card_idx
            .insert(card_key.as_bytes(), review.id.as_bytes())?;

        Ok(())
    }

    pub fn get_review(&self, review_id: &str) -> Result<Option<Review>, StoreError> {
        match self.reviews.get(review_id.as_bytes())? {
            Some(raw) => Ok(Some(Self::deserialize(&raw)?)),
            None => Ok(None),
        }
    }

    pub fn list_reviews_by_card(&self, card_id: &str) -> Result<Vec<Review>, StoreError> {
        let prefix = keys::reviews_by_card_prefix(card_id);
        let mut reviews = Vec::new();
        for item in self.reviews_by_card_idx.scan_prefix(prefix.as_bytes()) {
            let (_, v) = item?;
            let review_id = String::from_utf8_lossy(&v).to_string();
            if let Some(review) = self.get_review(&review_id)? {
                reviews.push(review);
            }
        }
        Ok(reviews)
    }

    /// Newest-first, because the index key embeds a reverse timestamp.
    pub fn list_all_reviews(&self) -> Result<Vec<Review>, StoreError> {
        let mut reviews = Vec::new();
        for item in self.reviews_by_time_idx.iter() {
            let (_, v) = item?;
            let review_id = String::from_utf8_lossy(&v).to_string();
            if let Some(review) = self.get_review(&review_id)? {
                reviews.push(review);
            }
        }
        Ok(reviews)
    }
}

#[cfg(test)]
mod tests {
    use tempfile::tempdir;

    use super::*;

    #[test]
    fn append_review_is_queryable_by_card_and_globally() {
        let dir = tempdir().unwrap();
        let store = Store::open(dir.path().join("db").to_str().unwrap()).unwrap();

        let state = SrsState::new_for_card("c1", Utc::now());
        store.put_srs_state(&state).unwrap();

        let review = Review {
            id: "r1".to_string(),
            card_id: "c1".to_string(),
            ts: Utc::now(),
            grade: 2,
            elapsed_ms: Some(1200),
            prev_interval: 0,
            new_interval: 1,
        };
        store
            .put_srs_state_and_append_review(&state, review)
            .unwrap();

        assert_eq!(store.list_reviews_by_card("c1").unwrap().len(), 1);
        assert_eq!(store.list_all_reviews().unwrap().len(), 1);
    }

    #[test]
    fn new_card_state_has_zero_reps() {
        let state = SrsState::new_for_card("c1", Utc::now());
        assert!(state.is_new());
        assert_eq!(state.ease, 2.5);
    }
}
