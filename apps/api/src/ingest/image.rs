//! Vocabulary extraction from photos of word lists, via the vision model.

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use tracing::{debug, error};

use crate::ingest::prompts::IMAGE_WORDS_INSTRUCTION;
use crate::ingest::IngestError;
use crate::llm_client::prompts::PLAIN_TEXT_SYSTEM;
use crate::llm_client::{ContentPart, LlmClient, LlmError, DEFAULT_MAX_TOKENS};
use crate::models::flashcard::UploadedWord;

/// Image-to-text collaborator. Carried in `AppState` as `Arc<dyn VisionExtractor>`.
#[async_trait]
pub trait VisionExtractor: Send + Sync {
    async fn extract_text(
        &self,
        image: &[u8],
        media_type: &str,
        instruction: &str,
    ) -> Result<String, LlmError>;
}

#[async_trait]
impl VisionExtractor for LlmClient {
    async fn extract_text(
        &self,
        image: &[u8],
        media_type: &str,
        instruction: &str,
    ) -> Result<String, LlmError> {
        let encoded = STANDARD.encode(image);
        let parts = [
            ContentPart::text(instruction),
            ContentPart::base64_image(media_type, &encoded),
        ];
        let response = self
            .call_parts(&parts, PLAIN_TEXT_SYSTEM, DEFAULT_MAX_TOKENS)
            .await?;
        response
            .text()
            .map(String::from)
            .ok_or(LlmError::EmptyContent)
    }
}

/// Sends the image to the vision model and keeps single-token lines.
///
/// A failed remote call is `IngestError::Extraction`; an empty list is returned
/// as-is so the caller can report "no words found" separately.
pub async fn extract_words_from_image(
    vision: &dyn VisionExtractor,
    image: &[u8],
    media_type: &str,
) -> Result<Vec<UploadedWord>, IngestError> {
    let text = vision
        .extract_text(image, media_type, IMAGE_WORDS_INSTRUCTION)
        .await
        .map_err(|e| {
            error!("Error extracting text from image: {e}");
            IngestError::Extraction(e.to_string())
        })?;
    let words = parse_vision_text(&text);
    debug!("Vision extraction yielded {} words", words.len());
    Ok(words)
}

/// One word per line; lines containing a space are phrases and are dropped.
pub fn parse_vision_text(text: &str) -> Vec<UploadedWord> {
    text.split('\n')
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.contains(' '))
        .map(UploadedWord::new)
        .collect()
}
