use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::info;

use crate::errors::AppError;
use crate::ids::generate_id;
use crate::languages::language_name;
use crate::models::flashcard::FlashcardSet;
use crate::models::user::AuthUser;
use crate::store::RecordStore;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSetRequest {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub target_language: String,
    #[serde(default)]
    pub definition_language: String,
}

/// `"<Language> Words - M/D/YYYY"`.
pub fn default_set_name(target_language: &str, now: DateTime<Utc>) -> String {
    format!(
        "{} Words - {}",
        language_name(target_language),
        now.format("%-m/%-d/%Y")
    )
}

/// A fresh, empty set with a generated id.
pub fn new_set(
    user_id: &str,
    name: String,
    target_language: &str,
    definition_language: &str,
    now: DateTime<Utc>,
) -> FlashcardSet {
    FlashcardSet {
        id: generate_id(),
        user_id: user_id.to_string(),
        name,
        target_language: target_language.to_string(),
        definition_language: definition_language.to_string(),
        created_at: now,
        updated_at: now,
        word_count: 0,
    }
}

pub async fn create_set(
    store: &RecordStore,
    user: &AuthUser,
    request: CreateSetRequest,
) -> Result<FlashcardSet, AppError> {
    let name = request.name.trim();
    let target = request.target_language.trim();
    let definition = request.definition_language.trim();
    if name.is_empty() || target.is_empty() || definition.is_empty() {
        return Err(AppError::Validation(
            "Please fill in all required fields.".to_string(),
        ));
    }

    let set = new_set(&user.id, name.to_string(), target, definition, Utc::now());
    let saved = store.save_set(set).await?;
    info!(
        "Created set {} ({} -> {}) for user {}",
        saved.id, saved.target_language, saved.definition_language, user.id
    );
    Ok(saved)
}

/// The set, if it exists and belongs to `user`. Other users' sets are reported
/// as not found.
pub async fn owned_set(
    store: &RecordStore,
    user: &AuthUser,
    set_id: &str,
) -> Result<FlashcardSet, AppError> {
    store
        .get_set(set_id)
        .await?
        .filter(|s| s.user_id == user.id)
        .ok_or_else(|| AppError::NotFound("Selected flashcard set not found.".to_string()))
}

pub async fn delete_set(store: &RecordStore, user: &AuthUser, set_id: &str) -> Result<(), AppError> {
    owned_set(store, user, set_id).await?;
    store.delete_set(set_id).await?;
    info!("Deleted set {set_id} for user {}", user.id);
    Ok(())
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::store::tests::{memory_store, sample_set};
    use chrono::TimeZone;

    pub(crate) fn user(id: &str) -> AuthUser {
        AuthUser {
            id: id.to_string(),
            email: format!("{id}@example.com"),
            display_name: None,
        }
    }

    #[test]
    fn test_default_set_name() {
        let now = Utc.with_ymd_and_hms(2024, 3, 7, 9, 0, 0).unwrap();
        assert_eq!(default_set_name("fr", now), "French Words - 3/7/2024");
        assert_eq!(default_set_name("tlh", now), "tlh Words - 3/7/2024");
    }

    #[tokio::test]
    async fn test_create_set_requires_all_fields() {
        let store = memory_store();
        let err = create_set(
            &store,
            &user("u1"),
            CreateSetRequest {
                name: "   ".to_string(),
                target_language: "fr".to_string(),
                definition_language: "en".to_string(),
            },
        )
        .await
        .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
        assert!(store.list_sets(None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_create_set_trims_and_starts_empty() {
        let store = memory_store();
        let set = create_set(
            &store,
            &user("u1"),
            CreateSetRequest {
                name: "  French Basics ".to_string(),
                target_language: "fr".to_string(),
                definition_language: "en".to_string(),
            },
        )
        .await
        .unwrap();
        assert_eq!(set.name, "French Basics");
        assert_eq!(set.word_count, 0);
        assert_eq!(set.user_id, "u1");
        assert_eq!(store.get_set(&set.id).await.unwrap(), Some(set));
    }

    #[tokio::test]
    async fn test_other_users_set_is_not_found() {
        let store = memory_store();
        store.save_set(sample_set("s1", "owner")).await.unwrap();
        assert!(owned_set(&store, &user("owner"), "s1").await.is_ok());
        assert!(matches!(
            owned_set(&store, &user("intruder"), "s1").await,
            Err(AppError::NotFound(_))
        ));
        assert!(matches!(
            delete_set(&store, &user("intruder"), "s1").await,
            Err(AppError::NotFound(_))
        ));
        assert!(store.get_set("s1").await.unwrap().is_some());
    }
}
