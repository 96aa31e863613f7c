//! Conversation handler integration tests

use axum::{
    body::Body,
    http::{Method, Request, StatusCode},
};
use serde_json::json;
use tower::ServiceExt;

use crate::common::{authed_request, parse_body, MessagingTestApp};

mod test_start_conversation {
    use super::*;

    #[tokio::test]
    async fn test_start_conversation_returns_both_participants() {
        let app = MessagingTestApp::new();

        let (status, body) = app
            .call(
                &app.amy,
                Method::POST,
                "/v1/conversations",
                Some(json!({"recipient_id": app.bob.id, "context_id": "job-123"})),
            )
            .await;

        assert_eq!(status, StatusCode::OK);
        let participants = body["participants"].as_array().unwrap();
        assert_eq!(participants.len(), 2);
        assert_eq!(participants[0]["user_id"], app.amy.id);
        assert_eq!(participants[1]["display_name"], "Bob Baker");
        assert_eq!(body["related_context_id"], "job-123");
        assert!(body["last_message_at"].is_null());
    }

    #[tokio::test]
    async fn test_start_conversation_is_idempotent_across_sides() {
        let app = MessagingTestApp::new();

        let (_, first) = app
            .call(
                &app.amy,
                Method::POST,
                "/v1/conversations",
                Some(json!({"recipient_id": app.bob.id})),
            )
            .await;
        let (status, second) = app
            .call(
                &app.bob,
                Method::POST,
                "/v1/conversations",
                Some(json!({"recipient_id": app.amy.id, "context_id": "job-999"})),
            )
            .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(first["id"], second["id"]);
        assert!(second["related_context_id"].is_null());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_starts_resolve_to_one_conversation() {
        let app = MessagingTestApp::new();
        let amy_jwt = app.jwt(&app.amy);
        let bob_jwt = app.jwt(&app.bob);

        let mut handles = Vec::new();
        for i in 0..20 {
            let router = app.test_router();
            let (jwt, recipient) = if i % 2 == 0 {
                (amy_jwt.clone(), app.bob.id.clone())
            } else {
                (bob_jwt.clone(), app.amy.id.clone())
            };
            handles.push(tokio::spawn(async move {
                let req = authed_request(
                    Method::POST,
                    "/v1/conversations",
                    &jwt,
                    Some(json!({"recipient_id": recipient})),
                );
                let resp = router.oneshot(req).await.unwrap();
                assert_eq!(resp.status(), StatusCode::OK);
                parse_body(resp).await["id"].as_str().unwrap().to_string()
            }));
        }

        let mut ids = Vec::new();
        for handle in handles {
            ids.push(handle.await.unwrap());
        }
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), 1);

        let (_, list) = app
            .call(&app.amy, Method::GET, "/v1/conversations", None)
            .await;
        assert_eq!(list.as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_start_conversation_with_self_returns_400() {
        let app = MessagingTestApp::new();

        let (status, body) = app
            .call(
                &app.amy,
                Method::POST,
                "/v1/conversations",
                Some(json!({"recipient_id": app.amy.id})),
            )
            .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn test_start_conversation_unknown_recipient_returns_404() {
        let app = MessagingTestApp::new();

        let (status, body) = app
            .call(
                &app.amy,
                Method::POST,
                "/v1/conversations",
                Some(json!({"recipient_id": "user-nobody"})),
            )
            .await;

        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"]["code"], "NOT_FOUND");
    }

    #[tokio::test]
    async fn test_start_conversation_empty_recipient_returns_400() {
        let app = MessagingTestApp::new();

        let (status, _) = app
            .call(
                &app.amy,
                Method::POST,
                "/v1/conversations",
                Some(json!({"recipient_id": ""})),
            )
            .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_start_conversation_without_token_returns_401() {
        let app = MessagingTestApp::new();

        let req = Request::builder()
            .method(Method::POST)
            .uri("/v1/conversations")
            .header("content-type", "application/json")
            .body(Body::from(json!({"recipient_id": app.bob.id}).to_string()))
            .unwrap();
        let resp = app.test_router().oneshot(req).await.unwrap();

        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_token_signed_with_other_secret_returns_401() {
        let app = MessagingTestApp::new();
        let forged =
            crate::common::create_test_jwt(&app.amy.id, None, "not-the-server-secret").unwrap();

        let req = authed_request(Method::GET, "/v1/conversations", &forged, None);
        let resp = app.test_router().oneshot(req).await.unwrap();

        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    }
}

mod test_list_conversations {
    use super::*;

    #[tokio::test]
    async fn test_list_is_empty_for_new_user() {
        let app = MessagingTestApp::new();

        let (status, body) = app
            .call(&app.cat, Method::GET, "/v1/conversations", None)
            .await;

        assert_eq!(status, StatusCode::OK);
        assert!(body.as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_list_shows_other_participant_and_unread_count() {
        let app = MessagingTestApp::new();

        for content in ["first", "second"] {
            let (status, _) = app
                .call(
                    &app.amy,
                    Method::POST,
                    "/v1/messages",
                    Some(json!({"recipient_id": app.bob.id, "content": content})),
                )
                .await;
            assert_eq!(status, StatusCode::CREATED);
        }

        let (_, bob_list) = app
            .call(&app.bob, Method::GET, "/v1/conversations", None)
            .await;
        let entry = &bob_list[0];
        assert_eq!(entry["other_participant"]["user_id"], app.amy.id);
        assert_eq!(entry["other_participant"]["display_name"], "Amy Archer");
        assert_eq!(entry["last_message_text"], "second");
        assert_eq!(entry["unread_count"], 2);

        let (_, amy_list) = app
            .call(&app.amy, Method::GET, "/v1/conversations", None)
            .await;
        assert_eq!(amy_list[0]["other_participant"]["user_id"], app.bob.id);
        assert_eq!(amy_list[0]["unread_count"], 0);
    }

    #[tokio::test]
    async fn test_list_orders_by_latest_activity() {
        let app = MessagingTestApp::new();

        let (_, with_bob) = app
            .call(
                &app.amy,
                Method::POST,
                "/v1/messages",
                Some(json!({"recipient_id": app.bob.id, "content": "hi bob"})),
            )
            .await;
        app.call(
            &app.amy,
            Method::POST,
            "/v1/messages",
            Some(json!({"recipient_id": app.cat.id, "content": "hi cat"})),
        )
        .await;
        app.call(
            &app.bob,
            Method::POST,
            "/v1/messages",
            Some(json!({"conversation_id": with_bob["conversation_id"], "content": "hey amy"})),
        )
        .await;

        let (_, list) = app
            .call(&app.amy, Method::GET, "/v1/conversations", None)
            .await;
        let others: Vec<&str> = list
            .as_array()
            .unwrap()
            .iter()
            .map(|e| e["other_participant"]["user_id"].as_str().unwrap())
            .collect();
        assert_eq!(others, vec![app.bob.id.as_str(), app.cat.id.as_str()]);
        assert_eq!(list[0]["last_message_text"], "hey amy");
    }
}

mod test_open_conversation {
    use super::*;

    #[tokio::test]
    async fn test_open_returns_thread_and_marks_read() {
        let app = MessagingTestApp::new();

        let (_, sent) = app
            .call(
                &app.amy,
                Method::POST,
                "/v1/messages",
                Some(json!({"recipient_id": app.bob.id, "content": "Hello"})),
            )
            .await;
        let conversation_id = sent["conversation_id"].as_str().unwrap().to_string();
        let uri = format!("/v1/conversations/{}", conversation_id);

        let (status, opened) = app.call(&app.bob, Method::GET, &uri, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(opened["conversation"]["id"], conversation_id.as_str());
        let messages = opened["messages"].as_array().unwrap();
        assert_eq!(messages.len(), 1);
        assert!(!messages[0]["read_at"].is_null());

        let (status, marked) = app
            .call(&app.bob, Method::POST, &format!("{}/read", uri), None)
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(marked["marked"], 0);
    }

    #[tokio::test]
    async fn test_open_by_sender_leaves_own_messages_unread() {
        let app = MessagingTestApp::new();

        let (_, sent) = app
            .call(
                &app.amy,
                Method::POST,
                "/v1/messages",
                Some(json!({"recipient_id": app.bob.id, "content": "Hello"})),
            )
            .await;
        let uri = format!("/v1/conversations/{}", sent["conversation_id"].as_str().unwrap());

        let (_, opened) = app.call(&app.amy, Method::GET, &uri, None).await;
        assert!(opened["messages"][0]["read_at"].is_null());

        let (_, bob_list) = app
            .call(&app.bob, Method::GET, "/v1/conversations", None)
            .await;
        assert_eq!(bob_list[0]["unread_count"], 1);
    }

    #[tokio::test]
    async fn test_mark_read_endpoint_counts_transitions() {
        let app = MessagingTestApp::new();

        let (_, sent) = app
            .call(
                &app.amy,
                Method::POST,
                "/v1/messages",
                Some(json!({"recipient_id": app.bob.id, "content": "one"})),
            )
            .await;
        let conversation_id = sent["conversation_id"].clone();
        app.call(
            &app.amy,
            Method::POST,
            "/v1/messages",
            Some(json!({"conversation_id": conversation_id, "content": "two"})),
        )
        .await;

        let uri = format!("/v1/conversations/{}/read", conversation_id.as_str().unwrap());
        let (_, first) = app.call(&app.bob, Method::POST, &uri, None).await;
        let (_, second) = app.call(&app.bob, Method::POST, &uri, None).await;

        assert_eq!(first["marked"], 2);
        assert_eq!(second["marked"], 0);
    }

    #[tokio::test]
    async fn test_open_by_outsider_returns_403() {
        let app = MessagingTestApp::new();

        let (_, sent) = app
            .call(
                &app.amy,
                Method::POST,
                "/v1/messages",
                Some(json!({"recipient_id": app.bob.id, "content": "private"})),
            )
            .await;
        let uri = format!("/v1/conversations/{}", sent["conversation_id"].as_str().unwrap());

        let (status, body) = app.call(&app.cat, Method::GET, &uri, None).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["error"]["code"], "AUTHORIZATION_ERROR");

        let (status, _) = app
            .call(&app.cat, Method::POST, &format!("{}/read", uri), None)
            .await;
        assert_eq!(status, StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_open_unknown_conversation_returns_404() {
        let app = MessagingTestApp::new();
        let uri = format!("/v1/conversations/{}", uuid::Uuid::new_v4());

        let (status, _) = app.call(&app.amy, Method::GET, &uri, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
