//! Word intake: file or typed words → enrichment → persisted words on a set.
//!
//! Everything before the first store write can fail without leaving records
//! behind. Once writing starts there is no rollback: words saved before a
//! later failure stay saved.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::info;

use crate::enrichment::pipeline::enhance_words;
use crate::enrichment::WordEnricher;
use crate::errors::AppError;
use crate::flashcards::sets::{default_set_name, new_set, owned_set};
use crate::ids::generate_id;
use crate::ingest::image::VisionExtractor;
use crate::ingest::{ingest_file, UploadedFile};
use crate::models::flashcard::{Difficulty, EnhancedWord, FlashcardSet, UploadedWord, Word};
use crate::models::user::AuthUser;
use crate::store::RecordStore;

pub const STAGE_PARSING: &str = "parsing";
pub const STAGE_ENRICHING: &str = "enriching";
pub const STAGE_SAVING: &str = "saving";
pub const STAGE_COMPLETE: &str = "complete";

/// Share of the overall progress bar given to enrichment: 30% → 90%.
const ENRICH_START: f64 = 30.0;
const ENRICH_SPAN: f64 = 60.0;

#[derive(Debug, Default)]
pub struct UploadRequest {
    pub file: Option<UploadedFile>,
    pub target_language: Option<String>,
    pub definition_language: Option<String>,
    /// Append to this set instead of creating one.
    pub set_id: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IntakeOutcome {
    pub set: FlashcardSet,
    pub words_added: usize,
    pub words: Vec<Word>,
}

enum Destination {
    Existing(String),
    New { user_id: String },
}

fn present(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// File upload flow. `on_progress(percent, stage)` receives the overall upload
/// progress in `[0, 100]`.
pub async fn process_upload<F>(
    store: &RecordStore,
    enricher: &dyn WordEnricher,
    vision: &dyn VisionExtractor,
    user: &AuthUser,
    request: UploadRequest,
    mut on_progress: F,
) -> Result<IntakeOutcome, AppError>
where
    F: FnMut(f64, &'static str) + Send,
{
    let (Some(file), Some(target), Some(definition)) = (
        request.file,
        present(request.target_language),
        present(request.definition_language),
    ) else {
        return Err(AppError::Validation(
            "Please select a file and choose both languages.".to_string(),
        ));
    };

    let destination = match present(request.set_id) {
        Some(set_id) => {
            owned_set(store, user, &set_id).await?;
            Destination::Existing(set_id)
        }
        None => Destination::New {
            user_id: user.id.clone(),
        },
    };

    on_progress(10.0, STAGE_PARSING);
    let raw = ingest_file(&file, vision).await?;
    if raw.is_empty() {
        return Err(AppError::EmptyResult("No words found in the file.".to_string()));
    }
    info!("Upload {} yielded {} raw words", file.file_name, raw.len());

    enrich_and_persist(
        store,
        enricher,
        user,
        destination,
        &raw,
        &target,
        &definition,
        &mut on_progress,
    )
    .await
}

/// Typed-words flow against an existing set. Languages default to the set's.
pub async fn add_words<F>(
    store: &RecordStore,
    enricher: &dyn WordEnricher,
    user: &AuthUser,
    set_id: &str,
    words: Vec<UploadedWord>,
    language_override: (Option<String>, Option<String>),
    mut on_progress: F,
) -> Result<IntakeOutcome, AppError>
where
    F: FnMut(f64, &'static str) + Send,
{
    let set = owned_set(store, user, set_id).await?;
    let raw: Vec<UploadedWord> = words
        .into_iter()
        .map(|w| UploadedWord {
            word: w.word.trim().to_string(),
            ..w
        })
        .filter(|w| !w.word.is_empty())
        .collect();
    if raw.is_empty() {
        return Err(AppError::EmptyResult("No words to add.".to_string()));
    }

    let (target_override, definition_override) = language_override;
    let target = present(target_override).unwrap_or_else(|| set.target_language.clone());
    let definition =
        present(definition_override).unwrap_or_else(|| set.definition_language.clone());

    enrich_and_persist(
        store,
        enricher,
        user,
        Destination::Existing(set.id),
        &raw,
        &target,
        &definition,
        &mut on_progress,
    )
    .await
}

#[allow(clippy::too_many_arguments)]
async fn enrich_and_persist<F>(
    store: &RecordStore,
    enricher: &dyn WordEnricher,
    user: &AuthUser,
    destination: Destination,
    raw: &[UploadedWord],
    target_language: &str,
    definition_language: &str,
    on_progress: &mut F,
) -> Result<IntakeOutcome, AppError>
where
    F: FnMut(f64, &'static str) + Send,
{
    on_progress(ENRICH_START, STAGE_ENRICHING);
    let enhanced = enhance_words(enricher, raw, target_language, definition_language, |p| {
        on_progress(ENRICH_START + p / 100.0 * ENRICH_SPAN, STAGE_ENRICHING)
    })
    .await;

    on_progress(ENRICH_START + ENRICH_SPAN, STAGE_SAVING);
    let now = Utc::now();
    let set = match destination {
        // Re-read: the count may have moved while enrichment was running.
        Destination::Existing(set_id) => owned_set(store, user, &set_id).await?,
        Destination::New { user_id } => {
            let set = new_set(
                &user_id,
                default_set_name(target_language, now),
                target_language,
                definition_language,
                now,
            );
            store.save_set(set).await?
        }
    };

    let words: Vec<Word> = enhanced
        .into_iter()
        .map(|w| word_from_enhanced(w, &set.id, now))
        .collect();
    store.save_words(&words).await?;

    let set = store
        .save_set(FlashcardSet {
            word_count: set.word_count + words.len() as u32,
            updated_at: Utc::now(),
            ..set
        })
        .await?;

    on_progress(100.0, STAGE_COMPLETE);
    info!(
        "Added {} words to set {} ({})",
        words.len(),
        set.id,
        set.name
    );
    Ok(IntakeOutcome {
        set,
        words_added: words.len(),
        words,
    })
}

/// A new study record: medium difficulty, zero counters.
pub fn word_from_enhanced(word: EnhancedWord, set_id: &str, now: DateTime<Utc>) -> Word {
    Word {
        id: generate_id(),
        set_id: set_id.to_string(),
        word: word.word,
        definition: word.definition,
        pronunciation: Some(word.pronunciation).filter(|p| !p.is_empty()),
        audio_url: word.audio_url,
        image_url: word.image_url,
        example: word.example,
        part_of_speech: word.part_of_speech,
        difficulty: Difficulty::Medium,
        last_studied: None,
        correct_count: 0,
        incorrect_count: 0,
        created_at: now,
    }
}
