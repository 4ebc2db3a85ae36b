//! Word Enrichment: definition, pronunciation audio and an illustration per word.
//!
//! `WordEnricher` is the seam between the pipeline and the outside world.
//! `AiWordEnricher` is the production implementation; tests use in-memory fakes.

pub mod dictionary;
pub mod pipeline;
pub mod prompts;

use async_trait::async_trait;
use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

use crate::languages::language_name;
use crate::llm_client::prompts::JSON_ONLY_SYSTEM;
use crate::llm_client::{parse_json_reply, LlmClient, LlmError};
use crate::media_client::{MediaClient, MediaError};
use self::dictionary::DictionaryClient;
use self::prompts::{DEFINITION_MAX_TOKENS, DEFINITION_PROMPT_TEMPLATE, IMAGE_PROMPT_TEMPLATE};

#[derive(Debug, Error)]
pub enum EnrichmentError {
    #[error("Definition generation failed: {0}")]
    Llm(#[from] LlmError),

    #[error("Media synthesis failed: {0}")]
    Media(#[from] MediaError),
}

/// Resolved definition of one word.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DefinitionRecord {
    pub definition: String,
    pub pronunciation: Option<String>,
    pub part_of_speech: Option<String>,
    pub example: Option<String>,
}

impl DefinitionRecord {
    fn bare(definition: String) -> Self {
        Self {
            definition,
            ..Default::default()
        }
    }
}

/// Definition used whenever nothing better is available.
pub fn fallback_definition(word: &str) -> String {
    format!("Definition for \"{word}\"")
}

/// The three external enrichment calls, made once per word.
/// Carried in `AppState` as `Arc<dyn WordEnricher>`.
#[async_trait]
pub trait WordEnricher: Send + Sync {
    async fn lookup_definition(
        &self,
        word: &str,
        target_language: &str,
        definition_language: &str,
    ) -> Result<DefinitionRecord, EnrichmentError>;

    /// Audio resource reference for the spoken word, if one was produced.
    async fn synthesize_audio(
        &self,
        word: &str,
        target_language: &str,
    ) -> Result<Option<String>, EnrichmentError>;

    /// Image resource reference illustrating the word, if one was produced.
    async fn synthesize_image(
        &self,
        word: &str,
        definition: &str,
    ) -> Result<Option<String>, EnrichmentError>;
}

pub struct AiWordEnricher {
    dictionary: DictionaryClient,
    llm: LlmClient,
    media: MediaClient,
    /// Definition language served by the free dictionary tier.
    dictionary_language: String,
}

impl AiWordEnricher {
    pub fn new(
        dictionary: DictionaryClient,
        llm: LlmClient,
        media: MediaClient,
        dictionary_language: String,
    ) -> Self {
        Self {
            dictionary,
            llm,
            media,
            dictionary_language,
        }
    }
}

#[async_trait]
impl WordEnricher for AiWordEnricher {
    async fn lookup_definition(
        &self,
        word: &str,
        target_language: &str,
        definition_language: &str,
    ) -> Result<DefinitionRecord, EnrichmentError> {
        if definition_language.eq_ignore_ascii_case(&self.dictionary_language) {
            match self.dictionary.lookup(word, definition_language).await {
                Ok(record) => return Ok(record),
                Err(e) => debug!("Dictionary tier missed {word:?}: {e}; falling back to LLM"),
            }
        }

        let prompt = build_definition_prompt(word, target_language, definition_language);
        let text = self
            .llm
            .generate_text(&prompt, JSON_ONLY_SYSTEM, DEFINITION_MAX_TOKENS)
            .await?;
        Ok(definition_from_ai_text(word, &text))
    }

    async fn synthesize_audio(
        &self,
        word: &str,
        target_language: &str,
    ) -> Result<Option<String>, EnrichmentError> {
        Ok(Some(self.media.synthesize_speech(word, target_language).await?))
    }

    async fn synthesize_image(
        &self,
        word: &str,
        definition: &str,
    ) -> Result<Option<String>, EnrichmentError> {
        let prompt = IMAGE_PROMPT_TEMPLATE
            .replace("{word}", word)
            .replace("{definition}", definition);
        Ok(self.media.generate_image(&prompt).await?)
    }
}

pub fn build_definition_prompt(word: &str, target_language: &str, definition_language: &str) -> String {
    DEFINITION_PROMPT_TEMPLATE
        .replace("{target_language}", language_name(target_language))
        .replace("{definition_language}", language_name(definition_language))
        .replace("{word}", word)
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AiDefinition {
    #[serde(default)]
    definition: Option<String>,
    #[serde(default)]
    pronunciation: Option<String>,
    #[serde(default)]
    part_of_speech: Option<String>,
    #[serde(default)]
    example: Option<String>,
}

/// Structured reply when it parses; otherwise the raw text is the definition.
pub fn definition_from_ai_text(word: &str, text: &str) -> DefinitionRecord {
    match parse_json_reply::<AiDefinition>(text) {
        Ok(parsed) => DefinitionRecord {
            definition: parsed
                .definition
                .filter(|d| !d.trim().is_empty())
                .unwrap_or_else(|| fallback_definition(word)),
            pronunciation: parsed.pronunciation.filter(|p| !p.is_empty()),
            part_of_speech: parsed.part_of_speech.filter(|p| !p.is_empty()),
            example: parsed.example.filter(|e| !e.is_empty()),
        },
        Err(_) => {
            let raw = text.trim();
            if raw.is_empty() {
                DefinitionRecord::bare(fallback_definition(word))
            } else {
                DefinitionRecord::bare(raw.to_string())
            }
        }
    }
}
