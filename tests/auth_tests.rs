use reqwest::Client;
use serde_json::json;
use shici_client::auth::{Auth, AuthChangeEvent, AuthProvider};
use shici_client::error::Error;
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn session_body(id: &str) -> serde_json::Value {
    json!({
        "access_token": "test_access_token",
        "token_type": "bearer",
        "expires_in": 3600,
        "refresh_token": "test_refresh_token",
        "user": {
            "id": id,
            "email": "test@example.com",
            "role": "authenticated"
        }
    })
}

fn auth(server: &MockServer) -> Auth {
    Auth::new(&server.uri(), "test_anon_key", Client::new(), None)
}

#[tokio::test]
async fn test_sign_in_with_password() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/auth/v1/token"))
        .and(query_param("grant_type", "password"))
        .and(header("apikey", "test_anon_key"))
        .and(body_json(json!({
            "email": "test@example.com",
            "password": "password123"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(session_body("test_user_id")))
        .mount(&mock_server)
        .await;

    let auth = auth(&mock_server);
    let mut changes = auth.subscribe();

    let session = auth.sign_in("test@example.com", "password123").await.unwrap();
    assert_eq!(session.access_token, "test_access_token");
    assert_eq!(session.user.id, "test_user_id");
    assert_eq!(session.user.email.as_deref(), Some("test@example.com"));
    assert!(session.expires_at.is_some());

    let change = changes.next().await.unwrap();
    assert_eq!(change.event, AuthChangeEvent::SignedIn);
    assert_eq!(auth.access_token().as_deref(), Some("test_access_token"));
}

#[tokio::test]
async fn test_sign_in_error_is_provider_message() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/auth/v1/token"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "error": "invalid_grant",
            "error_description": "Invalid login credentials"
        })))
        .mount(&mock_server)
        .await;

    let auth = auth(&mock_server);
    let err = auth.sign_in("test@example.com", "wrong").await.unwrap_err();

    assert!(matches!(err, Error::Auth(_)));
    assert_eq!(err.to_string(), "Invalid login credentials");
    assert!(auth.get_session().is_none());
}

#[tokio::test]
async fn test_sign_up_pending_confirmation() {
    let mock_server = MockServer::start().await;

    // Confirmation enabled: the provider answers with the user only
    Mock::given(method("POST"))
        .and(path("/auth/v1/signup"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "new_user_id",
            "email": "new@example.com",
            "confirmation_sent_at": "2024-01-15T10:30:00Z"
        })))
        .mount(&mock_server)
        .await;

    let auth = auth(&mock_server);
    let result = auth.sign_up("new@example.com", "password123").await.unwrap();

    assert!(result.is_none());
    assert!(auth.get_session().is_none());
}

#[tokio::test]
async fn test_sign_up_with_session() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/auth/v1/signup"))
        .respond_with(ResponseTemplate::new(200).set_body_json(session_body("new_user_id")))
        .mount(&mock_server)
        .await;

    let auth = auth(&mock_server);
    let session = auth
        .sign_up("test@example.com", "password123")
        .await
        .unwrap()
        .unwrap();

    assert_eq!(session.user.id, "new_user_id");
    assert_eq!(auth.get_session().unwrap().user.id, "new_user_id");
}

#[tokio::test]
async fn test_sign_up_rejected() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/auth/v1/signup"))
        .respond_with(ResponseTemplate::new(422).set_body_json(json!({
            "code": 422,
            "msg": "User already registered"
        })))
        .mount(&mock_server)
        .await;

    let auth = auth(&mock_server);
    let err = auth.sign_up("test@example.com", "password123").await.unwrap_err();
    assert_eq!(err.to_string(), "User already registered");
}

#[tokio::test]
async fn test_sign_out() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/auth/v1/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(session_body("test_user_id")))
        .mount(&mock_server)
        .await;

    Mock::given(method("POST"))
        .and(path("/auth/v1/logout"))
        .and(header("Authorization", "Bearer test_access_token"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&mock_server)
        .await;

    let auth = auth(&mock_server);
    auth.sign_in("test@example.com", "password123").await.unwrap();

    let mut changes = auth.subscribe();
    auth.sign_out().await.unwrap();

    assert!(auth.get_session().is_none());
    assert!(auth.current_session().await.unwrap().is_none());
    let change = changes.next().await.unwrap();
    assert_eq!(change.event, AuthChangeEvent::SignedOut);
    assert!(change.session.is_none());
}

#[tokio::test]
async fn test_sign_out_without_session_sends_nothing() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/auth/v1/logout"))
        .respond_with(ResponseTemplate::new(204))
        .expect(0)
        .mount(&mock_server)
        .await;

    let auth = auth(&mock_server);
    assert!(auth.sign_out().await.is_ok());
}
