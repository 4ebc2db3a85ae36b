//! Enrichment pipeline: raw entries in, enhanced entries out, same length and order.
//!
//! Entries are processed strictly one after another, and so are the three
//! calls per entry. Outbound concurrency stays at one request and progress is
//! monotonic. Do not fan this out: callers rely on the exact progress sequence.

use tracing::{info, warn};

use crate::enrichment::{fallback_definition, EnrichmentError, WordEnricher};
use crate::models::flashcard::{EnhancedWord, UploadedWord};

/// Enriches every entry in order. An entry whose definition lookup fails
/// degrades to [`fallback_word`]; failed audio or image generation only leaves
/// that reference empty. Neither stops the batch.
///
/// `on_progress` is called once per entry with `(index + 1) / total * 100`;
/// pass a no-op closure when progress is not needed.
pub async fn enhance_words<F>(
    enricher: &dyn WordEnricher,
    words: &[UploadedWord],
    target_language: &str,
    definition_language: &str,
    mut on_progress: F,
) -> Vec<EnhancedWord>
where
    F: FnMut(f64) + Send,
{
    let total = words.len();
    let mut enhanced = Vec::with_capacity(total);
    let mut degraded = 0usize;

    for (index, word) in words.iter().enumerate() {
        let entry = match enhance_one(enricher, word, target_language, definition_language).await
        {
            Ok(entry) => entry,
            Err(e) => {
                warn!("Error enhancing word {:?}: {e}", word.word);
                degraded += 1;
                fallback_word(word)
            }
        };
        enhanced.push(entry);
        on_progress((index + 1) as f64 / total as f64 * 100.0);
    }

    info!("Enhanced {total} words ({degraded} degraded)");
    enhanced
}

async fn enhance_one(
    enricher: &dyn WordEnricher,
    word: &UploadedWord,
    target_language: &str,
    definition_language: &str,
) -> Result<EnhancedWord, EnrichmentError> {
    let definition = enricher
        .lookup_definition(&word.word, target_language, definition_language)
        .await?;
    let audio_url = enricher
        .synthesize_audio(&word.word, target_language)
        .await
        .unwrap_or_else(|e| {
            warn!("Audio generation failed for {:?}: {e}", word.word);
            None
        });
    let image_url = enricher
        .synthesize_image(&word.word, &definition.definition)
        .await
        .unwrap_or_else(|e| {
            warn!("Image generation failed for {:?}: {e}", word.word);
            None
        });

    Ok(EnhancedWord {
        word: word.word.clone(),
        context: word.context.clone(),
        definition: definition.definition,
        pronunciation: definition.pronunciation.unwrap_or_default(),
        audio_url,
        image_url,
        example: definition.example,
        part_of_speech: definition.part_of_speech,
    })
}

/// Minimal record for an entry whose enrichment failed.
pub fn fallback_word(word: &UploadedWord) -> EnhancedWord {
    EnhancedWord {
        word: word.word.clone(),
        context: word.context.clone(),
        definition: fallback_definition(&word.word),
        pronunciation: String::new(),
        audio_url: None,
        image_url: None,
        example: None,
        part_of_speech: None,
    }
}
