fn reverse_ts(timestamp_ms: i64) -> u64 {
    u64::MAX - (timestamp_ms.max(0) as u64)
}

pub fn wordbook_key(id: &str) -> String {
    id.to_string()
}

pub fn wordbook_name_idx_key(name: &str) -> String {
    format!("name:{}", name.to_lowercase())
}

pub fn word_key(id: &str) -> String {
    id.to_string()
}

/// `(wordbook_id, lemma, pos)` is the uniqueness tuple from the data model.
pub fn word_unique_key(wordbook_id: &str, folded_lemma: &str, pos: Option<&str>) -> String {
    format!("{}:{}:{}", wordbook_id, folded_lemma, pos.unwrap_or(""))
}

pub fn wordbook_words_key(wordbook_id: &str, word_id: &str) -> String {
    format!("{}:{}", wordbook_id, word_id)
}

pub fn wordbook_words_prefix(wordbook_id: &str) -> String {
    format!("{}:", wordbook_id)
}

pub fn card_key(id: &str) -> String {
    id.to_string()
}

pub fn cards_by_word_key(word_id: &str, template: &str) -> String {
    format!("{}:{}", word_id, template)
}

pub fn cards_by_word_prefix(word_id: &str) -> String {
    format!("{}:", word_id)
}

pub fn srs_state_key(card_id: &str) -> String {
    card_id.to_string()
}

pub fn review_key(timestamp_ms: i64, review_id: &str) -> String {
    format!("{:020}:{}", reverse_ts(timestamp_ms), review_id)
}

pub fn reviews_by_card_key(card_id: &str, timestamp_ms: i64, review_id: &str) -> String {
    format!("{}:{:020}:{}", card_id, reverse_ts(timestamp_ms), review_id)
}

pub fn reviews_by_card_prefix(card_id: &str) -> String {
    format!("{}:", card_id)
}

pub fn import_job_key(id: &str) -> String {
    id.to_string()
}

pub fn import_jobs_by_time_key(timestamp_ms: i64, job_id: &str) -> String {
    format!("{:020}:{}", reverse_ts(timestamp_ms), job_id)
}

pub const SETTINGS_SINGLETON_KEY: &str = "singleton";

pub fn word_lemma_idx_key(folded_lemma: &str, word_id: &str) -> String {
    format!("{}\u{0}{}", folded_lemma, word_id)
}

pub fn word_lemma_idx_prefix(folded_prefix: &str) -> String {
    folded_prefix.to_string()
}

pub fn word_token_idx_key(token: &str, field: &str, word_id: &str) -> String {
    format!("{}\u{0}{}\u{0}{}", token, field, word_id)
}

pub fn word_token_idx_prefix(token: &str) -> String {
    format!("{}\u{0}", token)
}

pub fn word_doc_len_key(word_id: &str, field: &str) -> String {
    format!("{}\u{0}{}", word_id, field)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn review_key_orders_newest_first() {
        let newer = review_key(2_000, "r2");
        let older = review_key(1_000, "r1");
        assert!(newer < older);
    }

    #[test]
    fn wordbook_name_idx_is_case_folded() {
        assert_eq!(wordbook_name_idx_key("NF1"), "name:nf1");
    }

    #[test]
    fn word_unique_key_distinguishes_pos() {
        let noun = word_unique_key("wb1", "chat", Some("noun"));
        let verb = word_unique_key("wb1", "chat", Some("verb"));
        assert_ne!(noun, verb);
    }
}
