use serde::{Deserialize, Serialize};

use crate::store::keys;
use crate::store::{Store, StoreError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CardTemplate {
    Basic,
    Reverse,
    Cloze,
    Choice,
}

impl CardTemplate {
    fn as_str(&self) -> &'static str {
        match self {
            CardTemplate::Basic => "basic",
            CardTemplate::Reverse => "reverse",
            CardTemplate::Cloze => "cloze",
            CardTemplate::Choice => "choice",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Card {
    pub id: String,
    pub word_id: String,
    pub template: CardTemplate,
    pub hint: Option<String>,
    pub tags: Vec<String>,
}

impl Store {
    /// Idempotent on `(word_id, template)`.
    pub fn create_card_if_missing(
        &self,
        word_id: &str,
        template: CardTemplate,
        hint: Option<String>,
    ) -> Result<Card, StoreError> {
        let by_word_key = keys::cards_by_word_key(word_id, template.as_str());
        if let Some(raw) = self.cards_by_word_idx.get(by_word_key.as_bytes())? {
            let card_id = String::from_utf8_lossy(&raw).to_string();
            let card_key = keys::card_key(&card_id);
            if let Some(raw_card) = self.cards.get(card_key.as_bytes())? {
                return Ok(Self::deserialize(&raw_card)?);
            }
        }

        let card = Card {
            id: uuid::Uuid::new_v4().to_string(),
            word_id: word_id.to_string(),
            template,
            hint,
            tags: Vec::new(),
        };

        let key = keys::card_key(&card.id);
        self.cards.insert(key.as_bytes(), Self::serialize(&card)?)?;
        self.cards_by_word_idx
            .insert(by_word_key.as_bytes(), card.id.as_bytes())?;

        Ok(card)
    }

    pub fn get_card(&self, card_id: &str) -> Result<Option<Card>, StoreError> {
        let key = keys::card_key(card_id);
        match self.cards.get(key.as_bytes())? {
            Some(raw) => Ok(Some(Self::deserialize(&raw)?)),
            None => Ok(None),
        }
    }

    pub fn list_cards_by_word(&self, word_id: &str) -> Result<Vec<Card>, StoreError> {
        let prefix = keys::cards_by_word_prefix(word_id);
        let mut cards = Vec::new();
        for item in self.cards_by_word_idx.scan_prefix(prefix.as_bytes()) {
            let (_, v) = item?;
            let card_id = String::from_utf8_lossy(&v).to_string();
            if let Some(card) = self.get_card(&card_id)? {
                cards.push(card);
            }
        }
        Ok(cards)
    }

    pub fn list_cards_by_wordbook(&self, wordbook_id: &str) -> Result<Vec<Card>, StoreError> {
        let mut cards = Vec::new();
        for word in self.list_words_by_wordbook(wordbook_id)? {
            cards.extend(self.list_cards_by_word(&word.id)?);
        }
        Ok(cards)
    }

    /// A card's lifetime is coupled to its word: removes the card plus its
    /// SRS state and review history.
    pub(crate) fn delete_card_cascade(&self, card_id: &str) -> Result<(), StoreError> {
        let card_key = keys::card_key(card_id);
        if let Some(raw) = self.cards.get(card_key.as_bytes())? {
            let card: Card = Self::deserialize(&raw)?;
            let by_word_key = keys::cards_by_word_key(&card.word_id, card.template.as_str());
            self.cards_by_word_idx.remove(by_word_key.as_bytes())?;
        }
        self.cards.remove(card_key.as_bytes())?;

        let srs_key = keys::srs_state_key(card_id);
        self.srs_states.remove(srs_key.as_bytes())?;

        let review_prefix = keys::reviews_by_card_prefix(card_id);
        let mut review_ids = Vec::new();
        for item in self.reviews_by_card_idx.scan_prefix(review_prefix.as_bytes()) {
            let (k, v) = item?;
            self.reviews_by_card_idx.remove(k)?;
            review_ids.push(String::from_utf8_lossy(&v).to_string());
        }
        for review_id in review_ids {
            for item in self.reviews_by_time_idx.iter() {
                let (k, v) = item?;
                if v.as_ref() == review_id.as_bytes() {
                    self.reviews_by_time_idx.remove(k)?;
                    break;
                }
            }
            self.reviews.remove(review_id.as_bytes())?;
        }

        Ok(())
    }
}
