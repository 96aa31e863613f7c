//! Message handler integration tests

use axum::http::{Method, StatusCode};
use plaza_messaging::NotificationStore;
use serde_json::json;

use crate::common::{MessagingTestApp, TestUser};

mod test_send_message {
    use super::*;

    #[tokio::test]
    async fn test_first_message_creates_conversation() {
        let app = MessagingTestApp::new();

        let (status, body) = app
            .call(
                &app.amy,
                Method::POST,
                "/v1/messages",
                Some(json!({
                    "recipient_id": app.bob.id,
                    "context_id": "job-42",
                    "content": "  Hello  "
                })),
            )
            .await;

        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["content"], "Hello");
        assert_eq!(body["sender_id"], app.amy.id);
        assert_eq!(body["sender_name"], "Amy Archer");
        assert_eq!(body["sequence"], 1);
        assert!(body["read_at"].is_null());

        let (_, list) = app
            .call(&app.bob, Method::GET, "/v1/conversations", None)
            .await;
        assert_eq!(list[0]["id"], body["conversation_id"]);
        assert_eq!(list[0]["related_context_id"], "job-42");
    }

    #[tokio::test]
    async fn test_hello_then_reply_scenario() {
        let app = MessagingTestApp::new();

        let (_, hello) = app
            .call(
                &app.amy,
                Method::POST,
                "/v1/messages",
                Some(json!({"recipient_id": app.bob.id, "content": "Hello"})),
            )
            .await;
        let conversation_id = hello["conversation_id"].clone();

        let (status, reply) = app
            .call(
                &app.bob,
                Method::POST,
                "/v1/messages",
                Some(json!({"conversation_id": conversation_id, "content": "Hi there"})),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(reply["conversation_id"], conversation_id);
        assert_eq!(reply["sequence"], 2);

        let uri = format!("/v1/conversations/{}", conversation_id.as_str().unwrap());
        let (_, opened) = app.call(&app.amy, Method::GET, &uri, None).await;
        let contents: Vec<&str> = opened["messages"]
            .as_array()
            .unwrap()
            .iter()
            .map(|m| m["content"].as_str().unwrap())
            .collect();
        assert_eq!(contents, vec!["Hello", "Hi there"]);

        let (_, list) = app
            .call(&app.amy, Method::GET, "/v1/conversations", None)
            .await;
        assert_eq!(list.as_array().unwrap().len(), 1);
        assert_eq!(list[0]["last_message_text"], "Hi there");
    }

    #[tokio::test]
    async fn test_sender_outside_directory_uses_token_identity() {
        let app = MessagingTestApp::new();
        let dee = TestUser::new("user-dee", "Dee Dalton");

        let (status, body) = app
            .call(
                &dee,
                Method::POST,
                "/v1/messages",
                Some(json!({"recipient_id": app.bob.id, "content": "hello"})),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["sender_name"], "Dee Dalton");

        let notifications = app
            .repos
            .notifications
            .list_for_recipient(&app.bob.id)
            .await
            .unwrap();
        assert_eq!(notifications[0].title, "New message from Dee Dalton");

        let (_, list) = app
            .call(&app.bob, Method::GET, "/v1/conversations", None)
            .await;
        assert_eq!(list[0]["other_participant"]["display_name"], "Dee Dalton");
    }

    #[tokio::test]
    async fn test_long_message_notification_body_is_truncated() {
        let app = MessagingTestApp::new();
        let content = "x".repeat(250);

        let (status, _) = app
            .call(
                &app.amy,
                Method::POST,
                "/v1/messages",
                Some(json!({"recipient_id": app.bob.id, "content": content})),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);

        let notifications = app
            .repos
            .notifications
            .list_for_recipient(&app.bob.id)
            .await
            .unwrap();
        assert_eq!(notifications.len(), 1);
        assert_eq!(notifications[0].title, "New message from Amy Archer");
        assert_eq!(notifications[0].body.chars().count(), 101);
        assert!(notifications[0].body.ends_with('…'));
        assert!(app
            .repos
            .notifications
            .list_for_recipient(&app.amy.id)
            .await
            .unwrap()
            .is_empty());
    }
}

mod test_send_message_errors {
    use super::*;

    #[tokio::test]
    async fn test_empty_content_returns_400_and_creates_nothing() {
        let app = MessagingTestApp::new();

        let (status, body) = app
            .call(
                &app.amy,
                Method::POST,
                "/v1/messages",
                Some(json!({"recipient_id": app.bob.id, "content": "   "})),
            )
            .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], "VALIDATION_ERROR");

        let (_, list) = app
            .call(&app.amy, Method::GET, "/v1/conversations", None)
            .await;
        assert!(list.as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_too_long_content_returns_400() {
        let app = MessagingTestApp::new();

        let (status, _) = app
            .call(
                &app.amy,
                Method::POST,
                "/v1/messages",
                Some(json!({"recipient_id": app.bob.id, "content": "x".repeat(5001)})),
            )
            .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_both_or_neither_target_returns_400() {
        let app = MessagingTestApp::new();

        let (status, _) = app
            .call(
                &app.amy,
                Method::POST,
                "/v1/messages",
                Some(json!({"content": "hello"})),
            )
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = app
            .call(
                &app.amy,
                Method::POST,
                "/v1/messages",
                Some(json!({
                    "conversation_id": uuid::Uuid::new_v4(),
                    "recipient_id": app.bob.id,
                    "content": "hello"
                })),
            )
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_missing_content_returns_client_error() {
        let app = MessagingTestApp::new();

        let (status, _) = app
            .call(
                &app.amy,
                Method::POST,
                "/v1/messages",
                Some(json!({"recipient_id": app.bob.id})),
            )
            .await;

        assert!(status.is_client_error());
    }

    #[tokio::test]
    async fn test_non_participant_returns_403() {
        let app = MessagingTestApp::new();

        let (_, sent) = app
            .call(
                &app.amy,
                Method::POST,
                "/v1/messages",
                Some(json!({"recipient_id": app.bob.id, "content": "private"})),
            )
            .await;

        let (status, _) = app
            .call(
                &app.cat,
                Method::POST,
                "/v1/messages",
                Some(json!({"conversation_id": sent["conversation_id"], "content": "hi"})),
            )
            .await;
        assert_eq!(status, StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_unknown_conversation_returns_404() {
        let app = MessagingTestApp::new();

        let (status, _) = app
            .call(
                &app.amy,
                Method::POST,
                "/v1/messages",
                Some(json!({"conversation_id": uuid::Uuid::new_v4(), "content": "hi"})),
            )
            .await;

        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_unknown_recipient_returns_404() {
        let app = MessagingTestApp::new();

        let (status, _) = app
            .call(
                &app.amy,
                Method::POST,
                "/v1/messages",
                Some(json!({"recipient_id": "user-ghost", "content": "hi"})),
            )
            .await;

        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
