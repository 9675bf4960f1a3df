use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::constants::{BM25_B, BM25_K1, BM25_WEIGHT_LEMMA, BM25_WEIGHT_MEANINGS};
use crate::search::{self, Term};
use crate::store::keys;
use crate::store::operations::words::Word;
use crate::store::{Store, StoreError};

const FIELD_LEMMA: &str = "lemma";
const FIELD_MEANINGS: &str = "meanings";

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
struct FieldStats {
    doc_count: u64,
    total_tokens: u64,
}

pub struct WordHit {
    pub word_id: String,
    pub score: f64,
}

fn field_weight(field: &str) -> f64 {
    if field == FIELD_LEMMA {
        BM25_WEIGHT_LEMMA
    } else {
        BM25_WEIGHT_MEANINGS
    }
}

fn term_counts(tokens: &[String]) -> HashMap<&str, u32> {
    let mut counts: HashMap<&str, u32> = HashMap::new();
    for t in tokens {
        *counts.entry(t.as_str()).or_insert(0) += 1;
    }
    counts
}

fn meanings_text(word: &Word) -> String {
    let mut parts = vec![word.meaning_text.clone()];
    parts.extend(word.translations.values().cloned());
    parts.join(" ")
}

impl Store {
    /// Called synchronously after a word is inserted. Never called by
    /// Importer or any other caller directly — Store owns index
    /// consistency end to end.
    pub(crate) fn index_insert_word(&self, word: &Word) -> Result<(), StoreError> {
        self.index_field(&word.id, FIELD_LEMMA, &search::tokenize(&word.lemma))?;
        self.index_field(&word.id, FIELD_MEANINGS, &search::tokenize(&meanings_text(word)))?;

        let lemma_key = keys::word_lemma_idx_key(&word.folded_lemma, &word.id);
        self.word_lemma_idx.insert(lemma_key.as_bytes(), &[])?;

        Ok(())
    }

    pub(crate) fn index_remove_word(&self, word: &Word) -> Result<(), StoreError> {
        self.deindex_field(&word.id, FIELD_LEMMA, &search::tokenize(&word.lemma))?;
        self.deindex_field(
            &word.id,
            FIELD_MEANINGS,
            &search::tokenize(&meanings_text(word)),
        )?;

        let lemma_key = keys::word_lemma_idx_key(&word.folded_lemma, &word.id);
        self.word_lemma_idx.remove(lemma_key.as_bytes())?;

        Ok(())
    }

    fn index_field(&self, word_id: &str, field: &str, tokens: &[String]) -> Result<(), StoreError> {
        if tokens.is_empty() {
            return Ok(());
        }
        for (token, tf) in term_counts(tokens) {
            let key = keys::word_token_idx_key(token, field, word_id);
            self.word_token_idx.insert(key.as_bytes(), &tf.to_be_bytes())?;
        }

        let doc_len_key = keys::word_doc_len_key(word_id, field);
        self.word_doc_len_idx
            .insert(doc_len_key.as_bytes(), &(tokens.len() as u32).to_be_bytes())?;

        let mut stats = self.get_field_stats(field)?;
        stats.doc_count += 1;
        stats.total_tokens += tokens.len() as u64;
        self.put_field_stats(field, &stats)
    }

    fn deindex_field(&self, word_id: &str, field: &str, tokens: &[String]) -> Result<(), StoreError> {
        if tokens.is_empty() {
            return Ok(());
        }
        for token in term_counts(tokens).keys() {
            let key = keys::word_token_idx_key(token, field, word_id);
            self.word_token_idx.remove(key.as_bytes())?;
        }

        let doc_len_key = keys::word_doc_len_key(word_id, field);
        self.word_doc_len_idx.remove(doc_len_key.as_bytes())?;

        let mut stats = self.get_field_stats(field)?;
        stats.doc_count = stats.doc_count.saturating_sub(1);
        stats.total_tokens = stats.total_tokens.saturating_sub(tokens.len() as u64);
        self.put_field_stats(field, &stats)
    }

    fn get_field_stats(&self, field: &str) -> Result<FieldStats, StoreError> {
        match self.index_field_stats.get(field.as_bytes())? {
            Some(raw) => Ok(Self::deserialize(&raw)?),
            None => Ok(FieldStats::default()),
        }
    }

    fn put_field_stats(&self, field: &str, stats: &FieldStats) -> Result<(), StoreError> {
        self.index_field_stats
            .insert(field.as_bytes(), Self::serialize(stats)?)?;
        Ok(())
    }

    fn doc_len(&self, word_id: &str, field: &str) -> Result<u32, StoreError> {
        let key = keys::word_doc_len_key(word_id, field);
        match self.word_doc_len_idx.get(key.as_bytes())? {
            Some(raw) => {
                let bytes: [u8; 4] = raw.as_ref().try_into().unwrap_or([0; 4]);
                Ok(u32::from_be_bytes(bytes))
            }
            None => Ok(0),
        }
    }

    /// `(word_id, term_frequency)` postings for an exact token in a field.
    fn postings(&self, token: &str, field: &str) -> Result<Vec<(String, u32)>, StoreError> {
        let prefix = keys::word_token_idx_prefix(token);
        let mut out = Vec::new();
        for item in self.word_token_idx.scan_prefix(prefix.as_bytes()) {
            let (k, v) = item?;
            let key_str = String::from_utf8_lossy(&k);
            let mut parts = key_str.split('\u{0}');
            let _token = parts.next();
            let key_field = parts.next().unwrap_or_default();
            if key_field != field {
                continue;
            }
            let word_id = parts.next().unwrap_or_default().to_string();
            let bytes: [u8; 4] = v.as_ref().try_into().unwrap_or([0; 4]);
            out.push((word_id, u32::from_be_bytes(bytes)));
        }
        Ok(out)
    }

    /// Postings for every token starting with `prefix` in a field, summed
    /// per word when several tokens match.
    fn prefix_postings(&self, prefix: &str, field: &str) -> Result<HashMap<String, u32>, StoreError> {
        let mut totals: HashMap<String, u32> = HashMap::new();
        for item in self.word_token_idx.scan_prefix(prefix.as_bytes()) {
            let (k, v) = item?;
            let key_str = String::from_utf8_lossy(&k);
            let mut parts = key_str.split('\u{0}');
            let _token = parts.next();
            let key_field = parts.next().unwrap_or_default();
            if key_field != field {
                continue;
            }
            let word_id = parts.next().unwrap_or_default().to_string();
            let bytes: [u8; 4] = v.as_ref().try_into().unwrap_or([0; 4]);
            *totals.entry(word_id).or_insert(0) += u32::from_be_bytes(bytes);
        }
        Ok(totals)
    }

    fn bm25_term(&self, word_id: &str, field: &str, tf: u32, df: u64) -> Result<f64, StoreError> {
        let stats = self.get_field_stats(field)?;
        if stats.doc_count == 0 || df == 0 {
            return Ok(0.0);
        }
        let n = stats.doc_count as f64;
        let avg_len = stats.total_tokens as f64 / n;
        let doc_len = self.doc_len(word_id, field)? as f64;

        let idf = ((n - df as f64 + 0.5) / (df as f64 + 0.5) + 1.0).ln().max(0.0);
        let tf = tf as f64;
        let denom = tf + BM25_K1 * (1.0 - BM25_B + BM25_B * doc_len / avg_len.max(1.0));
        Ok(field_weight(field) * idf * (tf * (BM25_K1 + 1.0)) / denom.max(f64::EPSILON))
    }

    /// Up to `limit` distinct folded lemmas starting with `prefix`, ordered
    /// by length then lexicographically; both criteria collapse to
    /// "shortest, then alphabetical" since every candidate already matches
    /// the prefix exactly.
    pub fn suggest(&self, prefix: &str, limit: usize) -> Result<Vec<String>, StoreError> {
        let folded = search::fold(prefix);
        let scan_prefix = keys::word_lemma_idx_prefix(&folded);

        let mut seen = std::collections::BTreeMap::new();
        for item in self.word_lemma_idx.scan_prefix(scan_prefix.as_bytes()) {
            let (k, _) = item?;
            let key_str = String::from_utf8_lossy(&k);
            let mut parts = key_str.splitn(2, '\u{0}');
            let folded_lemma = parts.next().unwrap_or_default().to_string();
            let word_id = parts.next().unwrap_or_default().to_string();
            seen.entry(folded_lemma).or_insert(word_id);
        }

        let mut entries: Vec<(String, String)> = seen.into_iter().collect();
        entries.sort_by(|a, b| a.0.len().cmp(&b.0.len()).then_with(|| a.0.cmp(&b.0)));

        let mut out = Vec::new();
        for (folded_lemma, word_id) in entries.into_iter().take(limit) {
            let display = self
                .get_word(&word_id)?
                .map(|w| w.lemma)
                .unwrap_or(folded_lemma);
            out.push(display);
        }
        Ok(out)
    }

    /// Ranked bm25 search over `lemma` (weight 3.0) and `meanings`
    /// (weight 1.0). Terms are ANDed; ties are broken by `lemma` ascending.
    pub fn search_index(&self, q: &str, limit: usize) -> Result<Vec<WordHit>, StoreError> {
        let terms = search::parse_query(q);
        if terms.is_empty() {
            return Ok(Vec::new());
        }

        let mut candidate_ids: Option<std::collections::HashSet<String>> = None;
        let mut scores: HashMap<String, f64> = HashMap::new();

        for term in &terms {
            let mut term_ids = std::collections::HashSet::new();
            match term {
                Term::Word(token) => {
                    for field in [FIELD_LEMMA, FIELD_MEANINGS] {
                        let postings = self.postings(token, field)?;
                        let df = postings.len() as u64;
                        for (word_id, tf) in postings {
                            let score = self.bm25_term(&word_id, field, tf, df)?;
                            *scores.entry(word_id.clone()).or_insert(0.0) += score;
                            term_ids.insert(word_id);
                        }
                    }
                }
                Term::Prefix(prefix) => {
                    for field in [FIELD_LEMMA, FIELD_MEANINGS] {
                        let postings = self.prefix_postings(prefix, field)?;
                        let df = postings.len() as u64;
                        for (word_id, tf) in postings {
                            let score = self.bm25_term(&word_id, field, tf, df)?;
                            *scores.entry(word_id.clone()).or_insert(0.0) += score;
                            term_ids.insert(word_id);
                        }
                    }
                }
                Term::Phrase(words) => {
                    if let Some(first) = words.first() {
                        for (word_id, _) in self.postings(first, FIELD_LEMMA)? {
                            if let Some(word) = self.get_word(&word_id)? {
                                if &search::tokenize(&word.lemma) == words {
                                    *scores.entry(word_id.clone()).or_insert(0.0) +=
                                        BM25_WEIGHT_LEMMA * 2.0;
                                    term_ids.insert(word_id);
                                }
                            }
                        }
                    }
                }
            }

            candidate_ids = Some(match candidate_ids {
                Some(existing) => existing.intersection(&term_ids).cloned().collect(),
                None => term_ids,
            });
        }

        let candidate_ids = candidate_ids.unwrap_or_default();
        let mut hits: Vec<(WordHit, String)> = candidate_ids
            .into_iter()
            .map(|word_id| {
                let score = scores.get(&word_id).copied().unwrap_or(0.0);
                let lemma = self
                    .get_word(&word_id)
                    .ok()
                    .flatten()
                    .map(|w| w.lemma)
                    .unwrap_or_default();
                (WordHit { word_id, score }, lemma)
            })
            .collect();

        hits.sort_by(|(a, a_lemma), (b, b_lemma)| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a_lemma.cmp(b_lemma))
        });
        hits.truncate(limit);
        Ok(hits.into_iter().map(|(hit, _)| hit).collect())
    }
}

#[cfg(test)]
mod tests {
    use tempfile::tempdir;

    use super::*;
    use crate::store::operations::words::NormalizedWord;
    use std::collections::BTreeMap;

    fn word(lemma: &str, meaning: &str) -> NormalizedWord {
        NormalizedWord {
            lemma: lemma.to_string(),
            pos: None,
            gender: None,
            ipa: None,
            meaning_text: meaning.to_string(),
            translations: BTreeMap::new(),
            lesson: None,
            cefr: None,
            tags: vec![],
        }
    }

    #[test]
    fn suggest_returns_prefix_matches_shortest_first() {
        let dir = tempdir().unwrap();
        let store = Store::open(dir.path().join("db").to_str().unwrap()).unwrap();

        store.upsert_word("wb1", word("chat", "cat")).unwrap();
        store.upsert_word("wb1", word("chateau", "castle")).unwrap();

        let suggestions = store.suggest("cha", 10).unwrap();
        assert_eq!(suggestions, vec!["chat", "chateau"]);
    }

    #[test]
    fn search_index_ranks_lemma_match_above_meaning_only_match() {
        let dir = tempdir().unwrap();
        let store = Store::open(dir.path().join("db").to_str().unwrap()).unwrap();

        store.upsert_word("wb1", word("chien", "dog friend")).unwrap();
        store.upsert_word("wb1", word("ami", "friend of the dog")).unwrap();

        let hits = store.search_index("friend", 10).unwrap();
        assert_eq!(hits.len(), 2);
    }

    #[test]
    fn a_meaning_only_match_does_not_get_lemma_weight() {
        let dir = tempdir().unwrap();
        let store = Store::open(dir.path().join("db").to_str().unwrap()).unwrap();

        store.upsert_word("wb1", word("chien", "dog")).unwrap();
        store.upsert_word("wb1", word("ami", "chien friend")).unwrap();

        let hits = store.search_index("chien", 10).unwrap();
        assert_eq!(hits.len(), 2);
        // "chien" itself matches through the lemma field (weight 3.0);
        // "ami" only matches through its meaning text (weight 1.0), so it
        // must not also pick up the lemma score and should rank lower.
        let top_lemma = store.get_word(&hits[0].word_id).unwrap().unwrap().lemma;
        assert_eq!(top_lemma, "chien");
        assert!(hits[0].score > hits[1].score);
    }

    #[test]
    fn deleting_a_word_removes_it_from_search() {
        let dir = tempdir().unwrap();
        let store = Store::open(dir.path().join("db").to_str().unwrap()).unwrap();

        let outcome = store.upsert_word("wb1", word("chat", "cat")).unwrap();
        let crate::store::operations::words::UpsertOutcome::Inserted(inserted) = outcome else {
            panic!("expected insert");
        };

        store.delete_word(&inserted.id).unwrap();
        assert!(store.suggest("cha", 10).unwrap().is_empty());
    }
}
