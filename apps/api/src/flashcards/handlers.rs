use axum::{
    extract::{Multipart, Path, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::errors::AppError;
use crate::events::{AppEvent, EventBus};
use crate::flashcards::intake::{self, IntakeOutcome, UploadRequest};
use crate::flashcards::sets::{self, CreateSetRequest};
use crate::flashcards::words::{self, ReviewRequest};
use crate::ids::generate_id;
use crate::ingest::UploadedFile;
use crate::languages::{Language, LANGUAGES};
use crate::models::flashcard::{FlashcardSet, UploadedWord, Word};
use crate::models::user::AuthUser;
use crate::state::AppState;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IntakeResponse {
    pub upload_id: String,
    #[serde(flatten)]
    pub outcome: IntakeOutcome,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddWordsRequest {
    pub words: Vec<UploadedWord>,
    #[serde(default)]
    pub target_language: Option<String>,
    #[serde(default)]
    pub definition_language: Option<String>,
    #[serde(default)]
    pub upload_id: Option<String>,
}

/// Publishes intake progress under `upload_id`.
fn progress_publisher(events: &EventBus, upload_id: String) -> impl FnMut(f64, &'static str) + Send + '_ {
    move |percent, stage| {
        events.publish(AppEvent::UploadProgress {
            upload_id: upload_id.clone(),
            percent,
            stage: stage.to_string(),
        })
    }
}

/// GET /api/v1/languages
pub async fn handle_list_languages() -> Json<&'static [Language]> {
    Json(LANGUAGES)
}

/// GET /api/v1/sets
pub async fn handle_list_sets(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Json<Vec<FlashcardSet>>, AppError> {
    Ok(Json(state.store.list_sets(Some(&user.id)).await?))
}

/// POST /api/v1/sets
pub async fn handle_create_set(
    State(state): State<AppState>,
    user: AuthUser,
    Json(req): Json<CreateSetRequest>,
) -> Result<(StatusCode, Json<FlashcardSet>), AppError> {
    let set = sets::create_set(&state.store, &user, req).await?;
    Ok((StatusCode::CREATED, Json(set)))
}

/// GET /api/v1/sets/:id
pub async fn handle_get_set(
    State(state): State<AppState>,
    user: AuthUser,
    Path(set_id): Path<String>,
) -> Result<Json<FlashcardSet>, AppError> {
    Ok(Json(sets::owned_set(&state.store, &user, &set_id).await?))
}

/// DELETE /api/v1/sets/:id
pub async fn handle_delete_set(
    State(state): State<AppState>,
    user: AuthUser,
    Path(set_id): Path<String>,
) -> Result<StatusCode, AppError> {
    sets::delete_set(&state.store, &user, &set_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/v1/sets/:id/refresh-count
pub async fn handle_refresh_count(
    State(state): State<AppState>,
    user: AuthUser,
    Path(set_id): Path<String>,
) -> Result<Json<FlashcardSet>, AppError> {
    sets::owned_set(&state.store, &user, &set_id).await?;
    state
        .store
        .refresh_word_count(&set_id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound("Selected flashcard set not found.".to_string()))
}

/// GET /api/v1/sets/:id/words
pub async fn handle_list_words(
    State(state): State<AppState>,
    user: AuthUser,
    Path(set_id): Path<String>,
) -> Result<Json<Vec<Word>>, AppError> {
    sets::owned_set(&state.store, &user, &set_id).await?;
    Ok(Json(state.store.list_words(Some(&set_id)).await?))
}

/// POST /api/v1/sets/:id/words
pub async fn handle_add_words(
    State(state): State<AppState>,
    user: AuthUser,
    Path(set_id): Path<String>,
    Json(req): Json<AddWordsRequest>,
) -> Result<(StatusCode, Json<IntakeResponse>), AppError> {
    let upload_id = req.upload_id.filter(|id| !id.is_empty()).unwrap_or_else(generate_id);
    let outcome = intake::add_words(
        &state.store,
        state.enricher.as_ref(),
        &user,
        &set_id,
        req.words,
        (req.target_language, req.definition_language),
        progress_publisher(&state.events, upload_id.clone()),
    )
    .await?;
    Ok((StatusCode::CREATED, Json(IntakeResponse { upload_id, outcome })))
}

/// POST /api/v1/uploads
///
/// Multipart fields: `file`, `targetLanguage`, `definitionLanguage`, and the
/// optional `setId` and `uploadId`. Progress is published as `uploadProgress`
/// events under the upload id.
pub async fn handle_upload(
    State(state): State<AppState>,
    user: AuthUser,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<IntakeResponse>), AppError> {
    let mut request = UploadRequest::default();
    let mut upload_id = None;

    while let Some(field) = multipart.next_field().await.map_err(|e| {
        warn!("Malformed upload: {e}");
        AppError::Validation("The upload could not be read.".to_string())
    })? {
        let Some(name) = field.name().map(str::to_string) else {
            continue;
        };
        if name == "file" {
            let file_name = field.file_name().unwrap_or_default().to_string();
            let content_type = field.content_type().map(str::to_string);
            let bytes = field.bytes().await.map_err(|e| {
                warn!("Failed to read upload body: {e}");
                AppError::Validation("The upload could not be read.".to_string())
            })?;
            request.file = Some(UploadedFile {
                file_name,
                content_type,
                bytes,
            });
            continue;
        }

        let value = field
            .text()
            .await
            .map_err(|_| AppError::Validation(format!("Field {name} is not valid text.")))?;
        let value = Some(value.trim().to_string()).filter(|v| !v.is_empty());
        match name.as_str() {
            "targetLanguage" => request.target_language = value,
            "definitionLanguage" => request.definition_language = value,
            "setId" => request.set_id = value,
            "uploadId" => upload_id = value,
            other => warn!("Ignoring unknown upload field {other}"),
        }
    }

    let upload_id = upload_id.unwrap_or_else(generate_id);
    if let Some(file) = &request.file {
        info!(
            "Upload {upload_id}: {} ({} bytes) from user {}",
            file.file_name,
            file.bytes.len(),
            user.id
        );
    }

    let outcome = intake::process_upload(
        &state.store,
        state.enricher.as_ref(),
        state.vision.as_ref(),
        &user,
        request,
        progress_publisher(&state.events, upload_id.clone()),
    )
    .await?;
    Ok((StatusCode::CREATED, Json(IntakeResponse { upload_id, outcome })))
}

/// GET /api/v1/words/:id
pub async fn handle_get_word(
    State(state): State<AppState>,
    user: AuthUser,
    Path(word_id): Path<String>,
) -> Result<Json<Word>, AppError> {
    Ok(Json(words::owned_word(&state.store, &user, &word_id).await?))
}

/// PUT /api/v1/words/:id
pub async fn handle_replace_word(
    State(state): State<AppState>,
    user: AuthUser,
    Path(word_id): Path<String>,
    Json(word): Json<Word>,
) -> Result<Json<Word>, AppError> {
    Ok(Json(
        words::replace_word(&state.store, &user, &word_id, word).await?,
    ))
}

/// DELETE /api/v1/words/:id
pub async fn handle_delete_word(
    State(state): State<AppState>,
    user: AuthUser,
    Path(word_id): Path<String>,
) -> Result<StatusCode, AppError> {
    words::delete_word(&state.store, &user, &word_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/v1/words/:id/review
pub async fn handle_review_word(
    State(state): State<AppState>,
    user: AuthUser,
    Path(word_id): Path<String>,
    Json(req): Json<ReviewRequest>,
) -> Result<Json<Word>, AppError> {
    Ok(Json(
        words::record_review(&state.store, &user, &word_id, req.correct).await?,
    ))
}
