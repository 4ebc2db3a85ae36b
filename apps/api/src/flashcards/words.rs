use chrono::Utc;
use serde::Deserialize;
use tracing::info;

use crate::errors::AppError;
use crate::flashcards::sets::owned_set;
use crate::models::flashcard::Word;
use crate::models::user::AuthUser;
use crate::store::RecordStore;

#[derive(Debug, Deserialize)]
pub struct ReviewRequest {
    pub correct: bool,
}

fn word_not_found() -> AppError {
    AppError::NotFound("Word not found.".to_string())
}

/// The word, if its set belongs to `user`.
pub async fn owned_word(
    store: &RecordStore,
    user: &AuthUser,
    word_id: &str,
) -> Result<Word, AppError> {
    let word = store.get_word(word_id).await?.ok_or_else(word_not_found)?;
    owned_set(store, user, &word.set_id)
        .await
        .map_err(|_| word_not_found())?;
    Ok(word)
}

/// Full overwrite by id. The id and owning set come from the stored record.
pub async fn replace_word(
    store: &RecordStore,
    user: &AuthUser,
    word_id: &str,
    replacement: Word,
) -> Result<Word, AppError> {
    let existing = owned_word(store, user, word_id).await?;
    if replacement.word.trim().is_empty() || replacement.definition.trim().is_empty() {
        return Err(AppError::Validation(
            "A word needs both a term and a definition.".to_string(),
        ));
    }
    let word = Word {
        id: existing.id,
        set_id: existing.set_id,
        created_at: existing.created_at,
        ..replacement
    };
    if !store.update_word(&word).await? {
        return Err(word_not_found());
    }
    Ok(word)
}

/// Removes the word and recomputes its set's count.
pub async fn delete_word(store: &RecordStore, user: &AuthUser, word_id: &str) -> Result<(), AppError> {
    let word = owned_word(store, user, word_id).await?;
    store.delete_word(&word.id).await?;
    store.refresh_word_count(&word.set_id).await?;
    info!("Deleted word {} from set {}", word.id, word.set_id);
    Ok(())
}

/// Applies one study outcome.
pub async fn record_review(
    store: &RecordStore,
    user: &AuthUser,
    word_id: &str,
    correct: bool,
) -> Result<Word, AppError> {
    let mut word = owned_word(store, user, word_id).await?;
    if correct {
        word.correct_count += 1;
    } else {
        word.incorrect_count += 1;
    }
    word.last_studied = Some(Utc::now());
    if !store.update_word(&word).await? {
        return Err(word_not_found());
    }
    Ok(word)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flashcards::sets::tests::user;
    use crate::models::flashcard::Difficulty;
    use crate::store::tests::{memory_store, sample_set, sample_word};

    async fn seeded() -> RecordStore {
        let store = memory_store();
        store.save_set(sample_set("s1", "u1")).await.unwrap();
        store
            .save_words(&[sample_word("w1", "s1"), sample_word("w2", "s1")])
            .await
            .unwrap();
        store.refresh_word_count("s1").await.unwrap();
        store
    }

    #[tokio::test]
    async fn test_other_users_words_are_hidden() {
        let store = seeded().await;
        assert!(owned_word(&store, &user("u1"), "w1").await.is_ok());
        let err = owned_word(&store, &user("u2"), "w1").await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
        let err = record_review(&store, &user("u2"), "w1", true).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_review_updates_counters_and_timestamp() {
        let store = seeded().await;
        record_review(&store, &user("u1"), "w1", true).await.unwrap();
        record_review(&store, &user("u1"), "w1", true).await.unwrap();
        let word = record_review(&store, &user("u1"), "w1", false).await.unwrap();
        assert_eq!(word.correct_count, 2);
        assert_eq!(word.incorrect_count, 1);
        assert!(word.last_studied.is_some());

        let stored = store.get_word("w1").await.unwrap().unwrap();
        assert_eq!(stored.correct_count, 2);
    }

    #[tokio::test]
    async fn test_replace_keeps_identity_fields() {
        let store = seeded().await;
        let original = store.get_word("w1").await.unwrap().unwrap();
        let replacement = Word {
            id: "ignored".to_string(),
            set_id: "elsewhere".to_string(),
            definition: "a rewritten definition".to_string(),
            difficulty: Difficulty::Hard,
            ..original.clone()
        };
        let word = replace_word(&store, &user("u1"), "w1", replacement).await.unwrap();
        assert_eq!(word.id, "w1");
        assert_eq!(word.set_id, "s1");
        assert_eq!(word.difficulty, Difficulty::Hard);
        assert_eq!(store.list_words(None).await.unwrap().len(), 2);
        assert_eq!(
            store.get_word("w1").await.unwrap().unwrap().definition,
            "a rewritten definition"
        );
    }

    #[tokio::test]
    async fn test_replace_rejects_blank_definition() {
        let store = seeded().await;
        let original = store.get_word("w1").await.unwrap().unwrap();
        let blank = Word {
            definition: " ".to_string(),
            ..original
        };
        let err = replace_word(&store, &user("u1"), "w1", blank).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[tokio::test]
    async fn test_delete_word_refreshes_set_count() {
        let store = seeded().await;
        delete_word(&store, &user("u1"), "w2").await.unwrap();
        assert!(store.get_word("w2").await.unwrap().is_none());
        assert_eq!(store.get_set("s1").await.unwrap().unwrap().word_count, 1);

        let err = delete_word(&store, &user("u1"), "w2").await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }
}
