//! Record Store: CRUD over the two persisted collections (sets, words).
//!
//! Each mutation is a full read-modify-write of one collection document. Writes
//! are serialised within the process; there is no cross-collection transaction,
//! so a crash between deleting a set and deleting its words leaves orphans.

pub mod backend;
pub mod schema;

use std::sync::Arc;

use chrono::Utc;
use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::debug;

use crate::events::{AppEvent, EventBus};
use crate::models::flashcard::{FlashcardSet, Word};
use self::backend::KvBackend;

pub const SETS_KEY: &str = "memora_flashcard_sets";
pub const WORDS_KEY: &str = "memora_words";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Stored {collection} do not match the record schema: {source}")]
    Schema {
        collection: &'static str,
        source: serde_json::Error,
    },

    #[error("Stored {collection} use unsupported schema version {found}")]
    UnsupportedVersion {
        collection: &'static str,
        found: u32,
    },

    #[error("Stored {collection} is a JSON {found}, expected an array or envelope")]
    Shape {
        collection: &'static str,
        found: &'static str,
    },

    #[error("Failed to encode records: {0}")]
    Encode(serde_json::Error),
}

#[derive(Clone)]
pub struct RecordStore {
    kv: Arc<dyn KvBackend>,
    events: EventBus,
    write_lock: Arc<Mutex<()>>,
}

impl RecordStore {
    pub fn new(kv: Arc<dyn KvBackend>, events: EventBus) -> Self {
        Self {
            kv,
            events,
            write_lock: Arc::new(Mutex::new(())),
        }
    }

    async fn load<T: DeserializeOwned>(
        &self,
        key: &str,
        collection: &'static str,
    ) -> Result<Vec<T>, StoreError> {
        let raw = self.kv.get(key).await?;
        schema::decode(collection, raw.as_deref())
    }

    async fn persist<T: Serialize>(&self, key: &str, records: &[T]) -> Result<(), StoreError> {
        self.kv.put(key, schema::encode(records)?).await?;
        debug!("Persisted {} records under {key}", records.len());
        Ok(())
    }

    async fn load_sets(&self) -> Result<Vec<FlashcardSet>, StoreError> {
        self.load(SETS_KEY, "sets").await
    }

    async fn load_words(&self) -> Result<Vec<Word>, StoreError> {
        self.load(WORDS_KEY, "words").await
    }

    // ── Sets ────────────────────────────────────────────────────────────────

    /// Inserts the set, or overwrites the record with the same id and stamps
    /// `updated_at`. Returns the record as stored.
    pub async fn save_set(&self, set: FlashcardSet) -> Result<FlashcardSet, StoreError> {
        let _guard = self.write_lock.lock().await;
        let mut sets = self.load_sets().await?;
        let stored = match sets.iter_mut().find(|s| s.id == set.id) {
            Some(existing) => {
                *existing = FlashcardSet {
                    updated_at: Utc::now(),
                    ..set
                };
                existing.clone()
            }
            None => {
                sets.push(set.clone());
                set
            }
        };
        self.persist(SETS_KEY, &sets).await?;
        self.events.publish(AppEvent::SetsChanged {
            set_id: stored.id.clone(),
        });
        Ok(stored)
    }

    /// All sets in persisted order, optionally restricted to one owner.
    pub async fn list_sets(&self, owner_id: Option<&str>) -> Result<Vec<FlashcardSet>, StoreError> {
        let sets = self.load_sets().await?;
        Ok(match owner_id {
            Some(owner) => sets.into_iter().filter(|s| s.user_id == owner).collect(),
            None => sets,
        })
    }

    pub async fn get_set(&self, id: &str) -> Result<Option<FlashcardSet>, StoreError> {
        Ok(self.load_sets().await?.into_iter().find(|s| s.id == id))
    }

    /// Removes the set and every word referencing it. Returns whether the set existed.
    pub async fn delete_set(&self, id: &str) -> Result<bool, StoreError> {
        let _guard = self.write_lock.lock().await;
        let mut sets = self.load_sets().await?;
        let before = sets.len();
        sets.retain(|s| s.id != id);
        let existed = sets.len() != before;
        self.persist(SETS_KEY, &sets).await?;

        let mut words = self.load_words().await?;
        let words_before = words.len();
        words.retain(|w| w.set_id != id);
        self.persist(WORDS_KEY, &words).await?;
        debug!(
            "Deleted set {id} and {} of its words",
            words_before - words.len()
        );

        self.events.publish(AppEvent::SetsChanged {
            set_id: id.to_string(),
        });
        self.events.publish(AppEvent::WordsChanged {
            set_id: id.to_string(),
        });
        Ok(existed)
    }

    /// Recounts the set's words and re-saves it. `None` if the set is unknown.
    pub async fn refresh_word_count(&self, set_id: &str) -> Result<Option<FlashcardSet>, StoreError> {
        let Some(set) = self.get_set(set_id).await? else {
            return Ok(None);
        };
        let word_count = self.list_words(Some(set_id)).await?.len() as u32;
        let saved = self.save_set(FlashcardSet { word_count, ..set }).await?;
        Ok(Some(saved))
    }

    // ── Words ───────────────────────────────────────────────────────────────

    /// Upserts each word by id.
    pub async fn save_words(&self, words: &[Word]) -> Result<(), StoreError> {
        if words.is_empty() {
            return Ok(());
        }
        let _guard = self.write_lock.lock().await;
        let mut existing = self.load_words().await?;
        for word in words {
            match existing.iter_mut().find(|w| w.id == word.id) {
                Some(slot) => *slot = word.clone(),
                None => existing.push(word.clone()),
            }
        }
        self.persist(WORDS_KEY, &existing).await?;

        let mut touched: Vec<&str> = words.iter().map(|w| w.set_id.as_str()).collect();
        touched.sort_unstable();
        touched.dedup();
        for set_id in touched {
            self.events.publish(AppEvent::WordsChanged {
                set_id: set_id.to_string(),
            });
        }
        Ok(())
    }

    pub async fn list_words(&self, set_id: Option<&str>) -> Result<Vec<Word>, StoreError> {
        let words = self.load_words().await?;
        Ok(match set_id {
            Some(set_id) => words.into_iter().filter(|w| w.set_id == set_id).collect(),
            None => words,
        })
    }

    pub async fn get_word(&self, id: &str) -> Result<Option<Word>, StoreError> {
        Ok(self.load_words().await?.into_iter().find(|w| w.id == id))
    }

    /// Full overwrite of an existing word. Returns `false` (and writes nothing)
    /// when no word has that id.
    pub async fn update_word(&self, word: &Word) -> Result<bool, StoreError> {
        let _guard = self.write_lock.lock().await;
        let mut words = self.load_words().await?;
        let Some(slot) = words.iter_mut().find(|w| w.id == word.id) else {
            return Ok(false);
        };
        *slot = word.clone();
        self.persist(WORDS_KEY, &words).await?;
        self.events.publish(AppEvent::WordsChanged {
            set_id: word.set_id.clone(),
        });
        Ok(true)
    }

    /// Returns whether a word was removed.
    pub async fn delete_word(&self, id: &str) -> Result<bool, StoreError> {
        let _guard = self.write_lock.lock().await;
        let mut words = self.load_words().await?;
        let Some(pos) = words.iter().position(|w| w.id == id) else {
            return Ok(false);
        };
        let removed = words.remove(pos);
        self.persist(WORDS_KEY, &words).await?;
        self.events.publish(AppEvent::WordsChanged {
            set_id: removed.set_id,
        });
        Ok(true)
    }
}
