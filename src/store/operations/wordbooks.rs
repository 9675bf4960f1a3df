use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::store::keys;
use crate::store::{Store, StoreError};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Wordbook {
    pub id: String,
    pub name: String,
    pub language: String,
    pub description: Option<String>,
    pub author: Option<String>,
    pub version: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewWordbook {
    pub name: String,
    pub language: String,
    pub description: Option<String>,
    pub author: Option<String>,
    pub version: Option<String>,
}

impl Store {
    pub fn create_wordbook(&self, spec: NewWordbook) -> Result<Wordbook, StoreError> {
        let name_idx_key = keys::wordbook_name_idx_key(&spec.name);
        if self
            .wordbooks_name_idx
            .get(name_idx_key.as_bytes())?
            .is_some()
        {
            return Err(StoreError::Conflict {
                entity: "Wordbook".to_string(),
                key: spec.name,
            });
        }

        let now = Utc::now();
        let book = Wordbook {
            id: uuid::Uuid::new_v4().to_string(),
            name: spec.name,
            language: spec.language,
            description: spec.description,
            author: spec.author,
            version: spec.version,
            is_active: false,
            created_at: now,
            updated_at: now,
        };

        let key = keys::wordbook_key(&book.id);
        self.wordbooks
            .insert(key.as_bytes(), Self::serialize(&book)?)?;
        self.wordbooks_name_idx
            .insert(name_idx_key.as_bytes(), book.id.as_bytes())?;

        Ok(book)
    }

    pub fn get_wordbook(&self, id: &str) -> Result<Option<Wordbook>, StoreError> {
        let key = keys::wordbook_key(id);
        match self.wordbooks.get(key.as_bytes())? {
            Some(raw) => Ok(Some(Self::deserialize(&raw)?)),
            None => Ok(None),
        }
    }

    pub fn list_wordbooks(&self) -> Result<Vec<Wordbook>, StoreError> {
        let mut books = Vec::new();
        for item in self.wordbooks.iter() {
            let (_, v) = item?;
            books.push(Self::deserialize::<Wordbook>(&v)?);
        }
        books.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(books)
    }

    /// Exactly one wordbook has `is_active = true` at any time.
    pub fn get_active_wordbook(&self) -> Result<Option<Wordbook>, StoreError> {
        for item in self.wordbooks.iter() {
            let (_, v) = item?;
            let book: Wordbook = Self::deserialize(&v)?;
            if book.is_active {
                return Ok(Some(book));
            }
        }
        Ok(None)
    }

    pub fn activate_wordbook(&self, id: &str) -> Result<Wordbook, StoreError> {
        let key = keys::wordbook_key(id);
        let raw = self
            .wordbooks
            .get(key.as_bytes())?
            .ok_or_else(|| StoreError::NotFound {
                entity: "Wordbook".to_string(),
                key: id.to_string(),
            })?;
        let mut target: Wordbook = Self::deserialize(&raw)?;

        // Deactivate whichever book is currently active, then activate the target.
        for item in self.wordbooks.iter() {
            let (k, v) = item?;
            let mut book: Wordbook = Self::deserialize(&v)?;
            if book.is_active && book.id != target.id {
                book.is_active = false;
                book.updated_at = Utc::now();
                self.wordbooks.insert(k, Self::serialize(&book)?)?;
            }
        }

        target.is_active = true;
        target.updated_at = Utc::now();
        self.wordbooks
            .insert(key.as_bytes(), Self::serialize(&target)?)?;

        Ok(target)
    }

    /// Deletes a wordbook and cascades to its words, cards, SRS state and
    /// review history. Refuses to delete the active wordbook.
    pub fn delete_wordbook(&self, id: &str) -> Result<(), StoreError> {
        let book = self
            .get_wordbook(id)?
            .ok_or_else(|| StoreError::NotFound {
                entity: "Wordbook".to_string(),
                key: id.to_string(),
            })?;

        if book.is_active {
            return Err(StoreError::PreconditionFailed(
                "cannot delete the active wordbook".to_string(),
            ));
        }

        let prefix = keys::wordbook_words_prefix(id);
        let mut word_ids = Vec::new();
        for item in self.wordbook_words_idx.scan_prefix(prefix.as_bytes()) {
            let (k, v) = item?;
            self.wordbook_words_idx.remove(k)?;
            word_ids.push(String::from_utf8_lossy(&v).to_string());
        }

        for word_id in word_ids {
            self.delete_word(&word_id)?;
        }

        let key = keys::wordbook_key(id);
        self.wordbooks.remove(key.as_bytes())?;
        let name_idx_key = keys::wordbook_name_idx_key(&book.name);
        self.wordbooks_name_idx.remove(name_idx_key.as_bytes())?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use tempfile::tempdir;

    use super::*;

    fn spec(name: &str) -> NewWordbook {
        NewWordbook {
            name: name.to_string(),
            language: "fr".to_string(),
            description: None,
            author: None,
            version: None,
        }
    }

    #[test]
    fn at_most_one_active_wordbook() {
        let dir = tempdir().unwrap();
        let store = Store::open(dir.path().join("db").to_str().unwrap()).unwrap();

        let a = store.create_wordbook(spec("A")).unwrap();
        let b = store.create_wordbook(spec("B")).unwrap();

        store.activate_wordbook(&a.id).unwrap();
        store.activate_wordbook(&b.id).unwrap();

        let active_count = store
            .list_wordbooks()
            .unwrap()
            .into_iter()
            .filter(|w| w.is_active)
            .count();
        assert_eq!(active_count, 1);
        assert_eq!(store.get_active_wordbook().unwrap().unwrap().id, b.id);
    }

    #[test]
    fn duplicate_name_conflicts() {
        let dir = tempdir().unwrap();
        let store = Store::open(dir.path().join("db").to_str().unwrap()).unwrap();

        store.create_wordbook(spec("NF1")).unwrap();
        let err = store.create_wordbook(spec("NF1")).unwrap_err();
        assert!(matches!(err, StoreError::Conflict { .. }));
    }

    #[test]
    fn cannot_delete_active_wordbook() {
        let dir = tempdir().unwrap();
        let store = Store::open(dir.path().join("db").to_str().unwrap()).unwrap();

        let a = store.create_wordbook(spec("A")).unwrap();
        store.activate_wordbook(&a.id).unwrap();

        let err = store.delete_wordbook(&a.id).unwrap_err();
        assert!(matches!(err, StoreError::PreconditionFailed(_)));
    }
}
