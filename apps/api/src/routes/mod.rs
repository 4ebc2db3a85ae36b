pub mod events;
pub mod health;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};

use crate::flashcards::handlers;
use crate::state::AppState;

/// Uploads carry photos; everything else is small JSON.
const UPLOAD_BODY_LIMIT: usize = 20 * 1024 * 1024;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        .route("/api/v1/events", get(events::handle_event_stream))
        .route("/api/v1/languages", get(handlers::handle_list_languages))
        // Sets
        .route(
            "/api/v1/sets",
            get(handlers::handle_list_sets).post(handlers::handle_create_set),
        )
        .route(
            "/api/v1/sets/:id",
            get(handlers::handle_get_set).delete(handlers::handle_delete_set),
        )
        .route(
            "/api/v1/sets/:id/words",
            get(handlers::handle_list_words).post(handlers::handle_add_words),
        )
        .route(
            "/api/v1/sets/:id/refresh-count",
            post(handlers::handle_refresh_count),
        )
        // Intake
        .route(
            "/api/v1/uploads",
            post(handlers::handle_upload).layer(DefaultBodyLimit::max(UPLOAD_BODY_LIMIT)),
        )
        // Words
        .route(
            "/api/v1/words/:id",
            get(handlers::handle_get_word)
                .put(handlers::handle_replace_word)
                .delete(handlers::handle_delete_word),
        )
        .route(
            "/api/v1/words/:id/review",
            post(handlers::handle_review_word),
        )
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::tests::StaticIdentity;
    use crate::enrichment::pipeline::tests::FakeEnricher;
    use crate::events::{AppEvent, EventBus};
    use crate::ingest::image::tests::FakeVision;
    use crate::store::backend::MemoryKv;
    use crate::store::RecordStore;
    use axum::body::{to_bytes, Body};
    use futures::StreamExt;
    use axum::http::{header, Method, Request, StatusCode};
    use serde_json::{json, Value};
    use std::sync::Arc;
    use tower::ServiceExt;

    const BOUNDARY: &str = "memora-test-boundary";

    fn test_state() -> AppState {
        let events = EventBus::new();
        AppState {
            store: RecordStore::new(Arc::new(MemoryKv::default()), events.clone()),
            enricher: Arc::new(FakeEnricher::default()),
            vision: Arc::new(FakeVision {
                reply: Some("maison\nvoiture\nun deux".to_string()),
            }),
            identity: Arc::new(StaticIdentity),
            events,
        }
    }

    fn json_request(method: Method, uri: &str, user: Option<&str>, body: Option<Value>) -> Request<Body> {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(user) = user {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer token-{user}"));
        }
        match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        }
    }

    fn upload_request(user: &str, file_name: &str, content_type: &str, file: &[u8], fields: &[(&str, &str)]) -> Request<Body> {
        let mut body = Vec::new();
        for (name, value) in fields {
            body.extend_from_slice(
                format!(
                    "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
                )
                .as_bytes(),
            );
        }
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{file_name}\"\r\nContent-Type: {content_type}\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(file);
        body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());

        Request::builder()
            .method(Method::POST)
            .uri("/api/v1/uploads")
            .header(header::AUTHORIZATION, format!("Bearer token-{user}"))
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(body))
            .unwrap()
    }

    async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, body)
    }

    #[tokio::test]
    async fn test_health_reports_service() {
        let app = build_router(test_state());
        let (status, body) = send(&app, json_request(Method::GET, "/health", None, None)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["service"], "memora-api");
    }

    #[tokio::test]
    async fn test_languages_are_public() {
        let app = build_router(test_state());
        let (status, body) =
            send(&app, json_request(Method::GET, "/api/v1/languages", None, None)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body[0]["code"], "en");
    }

    #[tokio::test]
    async fn test_set_routes_require_session() {
        let app = build_router(test_state());
        let (status, body) = send(&app, json_request(Method::GET, "/api/v1/sets", None, None)).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert!(body["error"]["message"].is_string());

        let request = Request::builder()
            .uri("/api/v1/sets")
            .header(header::AUTHORIZATION, "Bearer forged")
            .body(Body::empty())
            .unwrap();
        let (status, _) = send(&app, request).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_create_list_and_delete_set() {
        let app = build_router(test_state());
        let (status, created) = send(
            &app,
            json_request(
                Method::POST,
                "/api/v1/sets",
                Some("u1"),
                Some(json!({"name": "Kitchen", "targetLanguage": "es", "definitionLanguage": "en"})),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(created["wordCount"], 0);
        let id = created["id"].as_str().unwrap().to_string();

        let (_, mine) = send(&app, json_request(Method::GET, "/api/v1/sets", Some("u1"), None)).await;
        assert_eq!(mine.as_array().unwrap().len(), 1);
        let (_, theirs) = send(&app, json_request(Method::GET, "/api/v1/sets", Some("u2"), None)).await;
        assert!(theirs.as_array().unwrap().is_empty());

        let uri = format!("/api/v1/sets/{id}");
        let (status, _) = send(&app, json_request(Method::DELETE, &uri, Some("u2"), None)).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        let (status, _) = send(&app, json_request(Method::DELETE, &uri, Some("u1"), None)).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        let (status, _) = send(&app, json_request(Method::GET, &uri, Some("u1"), None)).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_create_set_missing_fields_is_bad_request() {
        let app = build_router(test_state());
        let (status, body) = send(
            &app,
            json_request(Method::POST, "/api/v1/sets", Some("u1"), Some(json!({"name": "x"}))),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["title"], "Missing Information");
    }

    #[tokio::test]
    async fn test_csv_upload_creates_set_and_publishes_progress() {
        let state = test_state();
        let mut rx = state.events.subscribe();
        let app = build_router(state);

        let (status, body) = send(
            &app,
            upload_request(
                "u1",
                "words.csv",
                "text/csv",
                b"hola,hello\nadios\n",
                &[("targetLanguage", "es"), ("definitionLanguage", "en"), ("uploadId", "up-1")],
            ),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["uploadId"], "up-1");
        assert_eq!(body["wordsAdded"], 2);
        assert_eq!(body["set"]["wordCount"], 2);
        assert!(body["set"]["name"].as_str().unwrap().starts_with("Spanish Words - "));

        let mut last_progress = None;
        while let Ok(event) = rx.try_recv() {
            if let AppEvent::UploadProgress { upload_id, percent, .. } = event {
                assert_eq!(upload_id, "up-1");
                last_progress = Some(percent);
            }
        }
        assert_eq!(last_progress, Some(100.0));

        let set_id = body["set"]["id"].as_str().unwrap();
        let (_, words) = send(
            &app,
            json_request(Method::GET, &format!("/api/v1/sets/{set_id}/words"), Some("u1"), None),
        )
        .await;
        assert_eq!(words.as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_photo_upload_keeps_single_words() {
        let app = build_router(test_state());
        let (status, body) = send(
            &app,
            upload_request(
                "u1",
                "page.png",
                "image/png",
                b"\x89PNG",
                &[("targetLanguage", "fr"), ("definitionLanguage", "en")],
            ),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        let words: Vec<&str> = body["words"]
            .as_array()
            .unwrap()
            .iter()
            .map(|w| w["word"].as_str().unwrap())
            .collect();
        assert_eq!(words, vec!["maison", "voiture"]);
    }

    #[tokio::test]
    async fn test_upload_errors_map_to_statuses() {
        let app = build_router(test_state());
        let (status, body) = send(
            &app,
            upload_request(
                "u1",
                "words.xlsx",
                "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
                b"PK",
                &[("targetLanguage", "fr"), ("definitionLanguage", "en")],
            ),
        )
        .await;
        assert_eq!(status, StatusCode::UNSUPPORTED_MEDIA_TYPE);
        assert!(body["error"]["message"].as_str().unwrap().contains("CSV"));

        let (status, _) = send(
            &app,
            upload_request("u1", "words.csv", "text/csv", b"hola\n", &[("targetLanguage", "fr")]),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = send(
            &app,
            upload_request(
                "u1",
                "words.csv",
                "text/csv",
                b"\n\n",
                &[("targetLanguage", "fr"), ("definitionLanguage", "en")],
            ),
        )
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn test_add_words_then_review_and_delete() {
        let app = build_router(test_state());
        let (_, set) = send(
            &app,
            json_request(
                Method::POST,
                "/api/v1/sets",
                Some("u1"),
                Some(json!({"name": "Verbs", "targetLanguage": "de", "definitionLanguage": "en"})),
            ),
        )
        .await;
        let set_id = set["id"].as_str().unwrap();

        let (status, added) = send(
            &app,
            json_request(
                Method::POST,
                &format!("/api/v1/sets/{set_id}/words"),
                Some("u1"),
                Some(json!({"words": [{"word": "laufen"}]})),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(added["words"][0]["definition"], "laufen (de->en)");
        let word_id = added["words"][0]["id"].as_str().unwrap().to_string();

        let (status, reviewed) = send(
            &app,
            json_request(
                Method::POST,
                &format!("/api/v1/words/{word_id}/review"),
                Some("u1"),
                Some(json!({"correct": false})),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(reviewed["incorrectCount"], 1);
        assert!(reviewed["lastStudied"].is_string());

        let uri = format!("/api/v1/words/{word_id}");
        let (status, _) = send(&app, json_request(Method::DELETE, &uri, Some("u1"), None)).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        let (_, set) = send(
            &app,
            json_request(Method::GET, &format!("/api/v1/sets/{set_id}"), Some("u1"), None),
        )
        .await;
        assert_eq!(set["wordCount"], 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_event_stream_sends_single_heartbeat_then_events() {
        let state = test_state();
        let events = state.events.clone();
        let app = build_router(state);

        let response = app
            .oneshot(json_request(Method::GET, "/api/v1/events", None, None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers()[header::CONTENT_TYPE]
            .to_str()
            .unwrap()
            .starts_with("text/event-stream"));
        let mut body = response.into_body().into_data_stream();

        let idle = body.next().await.unwrap().unwrap();
        let idle = String::from_utf8(idle.to_vec()).unwrap();
        assert!(idle.contains("heartbeat"));
        assert_eq!(idle.matches("heartbeat").count(), 1);

        events.publish(AppEvent::SetsChanged {
            set_id: "s1".to_string(),
        });
        let frame = body.next().await.unwrap().unwrap();
        let frame = String::from_utf8(frame.to_vec()).unwrap();
        assert!(frame.contains("event: setsChanged"), "{frame}");
        assert!(frame.contains(r#""setId":"s1""#), "{frame}");
    }
}
