//! Free dictionary lookup (dictionaryapi.dev shape): the first tier of
//! definition resolution.

use reqwest::{Client, StatusCode, Url};
use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

use crate::enrichment::{fallback_definition, DefinitionRecord};

pub const DEFAULT_DICTIONARY_URL: &str = "https://api.dictionaryapi.dev/api/v2/entries";

#[derive(Debug, Error)]
pub enum DictionaryError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Dictionary returned status {0}")]
    Status(StatusCode),

    #[error("Dictionary base URL cannot take path segments: {0}")]
    InvalidBaseUrl(String),

    #[error("Dictionary returned no entries")]
    NoEntries,
}

#[derive(Debug, Deserialize)]
pub struct DictionaryEntry {
    #[serde(default)]
    pub phonetic: Option<String>,
    #[serde(default)]
    pub phonetics: Vec<Phonetic>,
    #[serde(default)]
    pub meanings: Vec<Meaning>,
}

#[derive(Debug, Deserialize)]
pub struct Phonetic {
    #[serde(default)]
    pub text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Meaning {
    #[serde(default)]
    pub part_of_speech: Option<String>,
    #[serde(default)]
    pub definitions: Vec<Sense>,
}

#[derive(Debug, Deserialize)]
pub struct Sense {
    #[serde(default)]
    pub definition: Option<String>,
    #[serde(default)]
    pub example: Option<String>,
}

#[derive(Clone)]
pub struct DictionaryClient {
    client: Client,
    base_url: String,
}

impl DictionaryClient {
    pub fn new(base_url: impl Into<String>) -> Result<Self, DictionaryError> {
        Ok(Self {
            client: Client::builder()
                .timeout(std::time::Duration::from_secs(15))
                .build()?,
            base_url: base_url.into(),
        })
    }

    fn entry_url(&self, language: &str, word: &str) -> Result<Url, DictionaryError> {
        let mut url = Url::parse(&self.base_url)
            .map_err(|e| DictionaryError::InvalidBaseUrl(format!("{}: {e}", self.base_url)))?;
        url.path_segments_mut()
            .map_err(|_| DictionaryError::InvalidBaseUrl(self.base_url.clone()))?
            .pop_if_empty()
            .push(language)
            .push(word);
        Ok(url)
    }

    pub async fn lookup(&self, word: &str, language: &str) -> Result<DefinitionRecord, DictionaryError> {
        let url = self.entry_url(language, word)?;
        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            debug!("Dictionary lookup for {word:?} returned {status}");
            return Err(DictionaryError::Status(status));
        }
        let entries: Vec<DictionaryEntry> = response.json().await?;
        record_from_entries(word, &entries)
    }
}

/// First entry, first meaning, first sense. Pronunciation prefers the entry's
/// `phonetic`, then the first non-empty `phonetics[].text`.
pub fn record_from_entries(
    word: &str,
    entries: &[DictionaryEntry],
) -> Result<DefinitionRecord, DictionaryError> {
    let entry = entries.first().ok_or(DictionaryError::NoEntries)?;
    let meaning = entry.meanings.first();
    let sense = meaning.and_then(|m| m.definitions.first());

    let pronunciation = entry
        .phonetic
        .clone()
        .filter(|p| !p.is_empty())
        .or_else(|| {
            entry
                .phonetics
                .iter()
                .filter_map(|p| p.text.clone())
                .find(|t| !t.is_empty())
        });

    Ok(DefinitionRecord {
        definition: sense
            .and_then(|s| s.definition.clone())
            .filter(|d| !d.trim().is_empty())
            .unwrap_or_else(|| fallback_definition(word)),
        pronunciation,
        part_of_speech: meaning.and_then(|m| m.part_of_speech.clone()),
        example: sense.and_then(|s| s.example.clone()),
    })
}
