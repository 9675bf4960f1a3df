use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::store::keys;
use crate::store::{Store, StoreError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Cefr {
    A1,
    A2,
    B1,
    B2,
    C1,
    C2,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Word {
    pub id: String,
    pub wordbook_id: String,
    pub lemma: String,
    pub folded_lemma: String,
    pub pos: Option<String>,
    pub gender: Option<String>,
    pub ipa: Option<String>,
    pub meaning_text: String,
    pub translations: BTreeMap<String, String>,
    pub lesson: Option<String>,
    pub cefr: Option<Cefr>,
    pub tags: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Word {
    /// `meaning_zh` is an alias view, never stored separately.
    pub fn meaning_zh(&self) -> &str {
        self.translations
            .get("zh-cn")
            .or_else(|| self.translations.get("zh"))
            .unwrap_or(&self.meaning_text)
    }

    pub fn is_leech(&self) -> bool {
        self.tags.iter().any(|t| t == "leech")
    }
}

/// A record ready to be persisted, carrying the fields the parser produces.
#[derive(Debug, Clone)]
pub struct NormalizedWord {
    pub lemma: String,
    pub pos: Option<String>,
    pub gender: Option<String>,
    pub ipa: Option<String>,
    pub meaning_text: String,
    pub translations: BTreeMap<String, String>,
    pub lesson: Option<String>,
    pub cefr: Option<Cefr>,
    pub tags: Vec<String>,
}

#[derive(Debug, Clone, Default)]
pub struct WordFilter {
    pub q: Option<String>,
    pub lesson: Option<String>,
    pub cefr: Option<Cefr>,
    pub pos: Option<String>,
    pub page: u32,
    pub per_page: u32,
}

pub enum UpsertOutcome {
    Inserted(Word),
    Skipped,
}

impl Store {
    /// Skips when `(wordbook_id, lemma, pos)` already exists. On insert,
    /// synchronously updates the search index.
    pub fn upsert_word(
        &self,
        wordbook_id: &str,
        normalized: NormalizedWord,
    ) -> Result<UpsertOutcome, StoreError> {
        if normalized.lemma.trim().is_empty() {
            return Err(StoreError::Validation("lemma must not be empty".to_string()));
        }

        let folded_lemma = crate::search::fold(&normalized.lemma);
        let unique_key =
            keys::word_unique_key(wordbook_id, &folded_lemma, normalized.pos.as_deref());
        if self.words_unique_idx.get(unique_key.as_bytes())?.is_some() {
            return Ok(UpsertOutcome::Skipped);
        }

        let now = Utc::now();
        let word = Word {
            id: uuid::Uuid::new_v4().to_string(),
            wordbook_id: wordbook_id.to_string(),
            lemma: normalized.lemma,
            folded_lemma,
            pos: normalized.pos,
            gender: normalized.gender,
            ipa: normalized.ipa,
            meaning_text: normalized.meaning_text,
            translations: normalized.translations,
            lesson: normalized.lesson,
            cefr: normalized.cefr,
            tags: normalized.tags,
            created_at: now,
            updated_at: now,
        };

        let key = keys::word_key(&word.id);
        self.words.insert(key.as_bytes(), Self::serialize(&word)?)?;
        self.words_unique_idx
            .insert(unique_key.as_bytes(), word.id.as_bytes())?;
        let wb_words_key = keys::wordbook_words_key(wordbook_id, &word.id);
        self.wordbook_words_idx
            .insert(wb_words_key.as_bytes(), word.id.as_bytes())?;
        self.index_insert_word(&word)?;

        Ok(UpsertOutcome::Inserted(word))
    }

    /// Single per-call pass; callers are expected to keep batches around
    /// `IMPORT_BATCH_SIZE` so a flush groups naturally. Failures on
    /// individual rows do not abort the rest of the batch.
    pub fn bulk_upsert_words(
        &self,
        wordbook_id: &str,
        batch: Vec<NormalizedWord>,
    ) -> Result<(u64, u64, Vec<(usize, String)>), StoreError> {
        let mut inserted = 0u64;
        let mut skipped = 0u64;
        let mut failed = Vec::new();

        for (row, normalized) in batch.into_iter().enumerate() {
            match self.upsert_word(wordbook_id, normalized) {
                Ok(UpsertOutcome::Inserted(_)) => inserted += 1,
                Ok(UpsertOutcome::Skipped) => skipped += 1,
                Err(StoreError::Validation(reason)) => failed.push((row, reason)),
                Err(other) => return Err(other),
            }
        }

        Ok((inserted, skipped, failed))
    }

    pub fn get_word(&self, word_id: &str) -> Result<Option<Word>, StoreError> {
        let key = keys::word_key(word_id);
        match self.words.get(key.as_bytes())? {
            Some(raw) => Ok(Some(Self::deserialize(&raw)?)),
            None => Ok(None),
        }
    }

    pub fn list_words_by_wordbook(&self, wordbook_id: &str) -> Result<Vec<Word>, StoreError> {
        let prefix = keys::wordbook_words_prefix(wordbook_id);
        let mut words = Vec::new();
        for item in self.wordbook_words_idx.scan_prefix(prefix.as_bytes()) {
            let (_, v) = item?;
            let word_id = String::from_utf8_lossy(&v).to_string();
            if let Some(word) = self.get_word(&word_id)? {
                words.push(word);
            }
        }
        Ok(words)
    }

    /// Filters on lesson/cefr/pos plus an optional bm25-ranked free-text term.
    pub fn query_words(&self, filter: &WordFilter) -> Result<(Vec<Word>, u64), StoreError> {
        let mut candidates: Vec<Word> = if let Some(q) = filter.q.as_deref().filter(|q| !q.is_empty()) {
            self.search_index(q, usize::MAX)?
                .into_iter()
                .filter_map(|hit| self.get_word(&hit.word_id).transpose())
                .collect::<Result<Vec<_>, _>>()?
        } else {
            let mut all = Vec::new();
            for item in self.words.iter() {
                let (_, v) = item?;
                all.push(Self::deserialize::<Word>(&v)?);
            }
            all
        };

        candidates.retain(|w| {
            filter.lesson.as_deref().map_or(true, |l| w.lesson.as_deref() == Some(l))
                && filter.cefr.map_or(true, |c| w.cefr == Some(c))
                && filter.pos.as_deref().map_or(true, |p| w.pos.as_deref() == Some(p))
        });

        if filter.q.as_deref().map_or(true, str::is_empty) {
            candidates.sort_by(|a, b| {
                a.lesson
                    .cmp(&b.lesson)
                    .then_with(|| a.folded_lemma.cmp(&b.folded_lemma))
            });
        }

        let total = candidates.len() as u64;
        let per_page = filter.per_page.clamp(1, 100) as usize;
        let page = filter.page.max(1) as usize;
        let offset = (page - 1) * per_page;
        let items = candidates.into_iter().skip(offset).take(per_page).collect();
        Ok((items, total))
    }

    /// Idempotent: re-tagging an already-leeched word is a no-op.
    pub fn tag_leech(&self, word_id: &str) -> Result<(), StoreError> {
        let key = keys::word_key(word_id);
        let raw = self
            .words
            .get(key.as_bytes())?
            .ok_or_else(|| StoreError::NotFound {
                entity: "Word".to_string(),
                key: word_id.to_string(),
            })?;
        let mut word: Word = Self::deserialize(&raw)?;
        if !word.is_leech() {
            word.tags.push("leech".to_string());
            word.updated_at = Utc::now();
            self.words.insert(key.as_bytes(), Self::serialize(&word)?)?;
        }
        Ok(())
    }

    /// Cascades to unique/wordbook indexes, the search index, and every
    /// card (plus that card's SRS state and reviews) attached to the word.
    pub fn delete_word(&self, word_id: &str) -> Result<(), StoreError> {
        let key = keys::word_key(word_id);
        let raw = match self.words.get(key.as_bytes())? {
            Some(raw) => raw,
            None => return Ok(()),
        };
        let word: Word = Self::deserialize(&raw)?;

        self.index_remove_word(&word)?;

        let unique_key =
            keys::word_unique_key(&word.wordbook_id, &word.folded_lemma, word.pos.as_deref());
        self.words_unique_idx.remove(unique_key.as_bytes())?;

        let wb_words_key = keys::wordbook_words_key(&word.wordbook_id, word_id);
        self.wordbook_words_idx.remove(wb_words_key.as_bytes())?;

        let card_prefix = keys::cards_by_word_prefix(word_id);
        let mut card_ids = Vec::new();
        for item in self.cards_by_word_idx.scan_prefix(card_prefix.as_bytes()) {
            let (k, v) = item?;
            self.cards_by_word_idx.remove(k)?;
            card_ids.push(String::from_utf8_lossy(&v).to_string());
        }
        for card_id in card_ids {
            self.delete_card_cascade(&card_id)?;
        }

        self.words.remove(key.as_bytes())?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use tempfile::tempdir;

    use super::*;

    fn sample(lemma: &str) -> NormalizedWord {
        let mut translations = BTreeMap::new();
        translations.insert("zh-cn".to_string(), "意思".to_string());
        NormalizedWord {
            lemma: lemma.to_string(),
            pos: Some("noun".to_string()),
            gender: None,
            ipa: None,
            meaning_text: "meaning".to_string(),
            translations,
            lesson: Some("1".to_string()),
            cefr: Some(Cefr::A1),
            tags: vec![],
        }
    }

    #[test]
    fn duplicate_lemma_pos_is_skipped() {
        let dir = tempdir().unwrap();
        let store = Store::open(dir.path().join("db").to_str().unwrap()).unwrap();
        let wb = store
            .create_wordbook(super::super::wordbooks::NewWordbook {
                name: "A".to_string(),
                language: "fr".to_string(),
                description: None,
                author: None,
                version: None,
            })
            .unwrap();

        let first = store.upsert_word(&wb.id, sample("chat")).unwrap();
        assert!(matches!(first, UpsertOutcome::Inserted(_)));

        let second = store.upsert_word(&wb.id, sample("chat")).unwrap();
        assert!(matches!(second, UpsertOutcome::Skipped));
    }

    #[test]
    fn meaning_zh_falls_back_to_meaning_text() {
        let mut word = sample("chien");
        word.translations.clear();
        let dir = tempdir().unwrap();
        let store = Store::open(dir.path().join("db").to_str().unwrap()).unwrap();
        let wb = store
            .create_wordbook(super::super::wordbooks::NewWordbook {
                name: "B".to_string(),
                language: "fr".to_string(),
                description: None,
                author: None,
                version: None,
            })
            .unwrap();
        let outcome = store.upsert_word(&wb.id, word).unwrap();
        let UpsertOutcome::Inserted(stored) = outcome else {
            panic!("expected insert");
        };
        assert_eq!(stored.meaning_zh(), "meaning");
    }

    #[test]
    fn empty_lemma_is_rejected() {
        let dir = tempdir().unwrap();
        let store = Store::open(dir.path().join("db").to_str().unwrap()).unwrap();
        let err = store.upsert_word("wb1", sample("   ")).unwrap_err();
        assert!(matches!(err, StoreError::Validation(_)));
    }
}
