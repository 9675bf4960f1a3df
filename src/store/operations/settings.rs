use serde::{Deserialize, Serialize};

use crate::store::keys;
use crate::store::{Store, StoreError};

/// Opaque to the core: a bag of user preferences the routes layer reads
/// and writes verbatim.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    pub daily_new_limit: Option<u32>,
    pub daily_review_limit: Option<u32>,
    pub preferred_script: Option<String>,
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            daily_new_limit: None,
            daily_review_limit: None,
            preferred_script: None,
            extra: serde_json::Map::new(),
        }
    }
}

impl Store {
    pub fn get_settings(&self) -> Result<Settings, StoreError> {
        match self.settings.get(keys::SETTINGS_SINGLETON_KEY.as_bytes())? {
            Some(raw) => Ok(Self::deserialize(&raw)?),
            None => Ok(Settings::default()),
        }
    }

    pub fn put_settings(&self, settings: &Settings) -> Result<(), StoreError> {
        self.settings.insert(
            keys::SETTINGS_SINGLETON_KEY.as_bytes(),
            Self::serialize(settings)?,
        )?;
        Ok(())
    }
}
