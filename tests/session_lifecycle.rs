//! End-to-end session lifecycle tests over a mock HTTP server.
//!
//! These go through the real reqwest transport: login/registration persist a
//! session, initialize restores or expires it, guards gate navigation.

use std::sync::Arc;

use noteling::{
    check_route, AuthApi, GuardOutcome, Route, SessionEvent, SessionStorage, SessionStore, User,
};
use tempfile::TempDir;

const LOGIN_BODY: &str = r#"{
    "message": "Login successful",
    "user": { "id": 1, "username": "ann", "email": "ann@x.com" },
    "token": "tok-1"
}"#;

const PROFILE_BODY: &str = r#"{ "user": { "id": 1, "username": "ann", "email": "ann@x.com" } }"#;

fn ann() -> User {
    User {
        id: 1,
        username: "ann".to_string(),
        email: "ann@x.com".to_string(),
    }
}

fn build(server_url: &str, dir: &TempDir) -> (Arc<SessionStore>, Arc<SessionStorage>) {
    let api = Arc::new(AuthApi::new(server_url));
    let storage = Arc::new(SessionStorage::new(dir.path()));
    let store = Arc::new(SessionStore::new(api, Arc::clone(&storage)));
    (store, storage)
}

#[tokio::test]
async fn login_persists_session_and_logout_clears_it() {
    let mut server = mockito::Server::new_async().await;
    let login = server
        .mock("POST", "/api/auth/login")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(LOGIN_BODY)
        .expect(1)
        .create_async()
        .await;

    let dir = TempDir::new().unwrap();
    let (store, storage) = build(&server.url(), &dir);
    let mut events = store.subscribe();

    let user = store.login("ann@x.com", "secret1").await.unwrap();
    assert_eq!(user, ann());
    assert!(store.snapshot().is_authenticated);
    assert!(storage.has_token().await);
    assert_eq!(events.try_recv(), Some(SessionEvent::LoggedIn { user: ann() }));

    store.logout().await.unwrap();
    let snapshot = store.snapshot();
    assert!(!snapshot.is_authenticated);
    assert_eq!(snapshot.user, None);
    assert!(!storage.has_token().await);
    assert_eq!(events.try_recv(), Some(SessionEvent::LoggedOut));

    login.assert_async().await;
}

#[tokio::test]
async fn initialize_without_token_issues_no_request() {
    let mut server = mockito::Server::new_async().await;
    let profile = server
        .mock("GET", "/api/user/profile")
        .expect(0)
        .create_async()
        .await;

    let dir = TempDir::new().unwrap();
    let (store, _storage) = build(&server.url(), &dir);

    let snapshot = store.initialize().await;
    assert!(!snapshot.is_authenticated);
    assert!(snapshot.is_initialized);
    assert!(!snapshot.is_loading);

    profile.assert_async().await;
}

#[tokio::test]
async fn initialize_restores_session_with_bearer_token() {
    let mut server = mockito::Server::new_async().await;
    let profile = server
        .mock("GET", "/api/user/profile")
        .match_header("authorization", "Bearer tok-1")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(PROFILE_BODY)
        .expect(1)
        .create_async()
        .await;

    let dir = TempDir::new().unwrap();
    let (store, storage) = build(&server.url(), &dir);
    storage.save("tok-1", &ann()).await.unwrap();

    let snapshot = store.initialize().await;
    assert!(snapshot.is_authenticated);
    assert!(!snapshot.is_loading);
    assert_eq!(snapshot.user, Some(ann()));

    profile.assert_async().await;
}

#[tokio::test]
async fn initialize_with_rejected_token_expires_the_session() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("GET", "/api/user/profile")
        .with_status(401)
        .with_header("content-type", "application/json")
        .with_body(r#"{ "error": "invalid token" }"#)
        .create_async()
        .await;

    let dir = TempDir::new().unwrap();
    let (store, storage) = build(&server.url(), &dir);
    storage.save("tok-stale", &ann()).await.unwrap();
    let mut events = store.subscribe();

    let snapshot = store.initialize().await;
    assert!(!snapshot.is_authenticated);
    assert!(snapshot.is_initialized);
    assert!(!storage.has_token().await);
    assert!(matches!(events.try_recv(), Some(SessionEvent::Expired { .. })));
}

#[tokio::test]
async fn concurrent_initialize_fetches_the_profile_once() {
    let mut server = mockito::Server::new_async().await;
    let profile = server
        .mock("GET", "/api/user/profile")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(PROFILE_BODY)
        .expect(1)
        .create_async()
        .await;

    let dir = TempDir::new().unwrap();
    let (store, storage) = build(&server.url(), &dir);
    storage.save("tok-1", &ann()).await.unwrap();

    let (a, b, c) = tokio::join!(store.initialize(), store.initialize(), store.initialize());
    assert_eq!(a, b);
    assert_eq!(b, c);
    assert!(a.is_authenticated);
    assert!(a.is_initialized);

    profile.assert_async().await;
}

#[tokio::test]
async fn server_error_message_reaches_the_form() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("POST", "/api/auth/login")
        .with_status(401)
        .with_header("content-type", "application/json")
        .with_body(r#"{ "error": "Invalid credentials" }"#)
        .create_async()
        .await;

    let dir = TempDir::new().unwrap();
    let (store, storage) = build(&server.url(), &dir);

    let err = store.login("ann@x.com", "wrong-pass").await.unwrap_err();
    assert_eq!(err.to_string(), "Invalid credentials");

    // Nothing was persisted and the session is untouched
    assert!(!storage.has_token().await);
    assert!(!store.snapshot().is_authenticated);
}

#[tokio::test]
async fn guards_route_around_the_session() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("POST", "/api/auth/login")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(LOGIN_BODY)
        .create_async()
        .await;

    let dir = TempDir::new().unwrap();
    let (store, _storage) = build(&server.url(), &dir);

    // Signed out: protected views bounce to login, login view is open
    let snapshot = store.initialize().await;
    assert_eq!(
        check_route(Route::Profile, &snapshot),
        GuardOutcome::Redirect(Route::Login)
    );
    assert_eq!(check_route(Route::Login, &snapshot), GuardOutcome::Allow);

    // Signed in: the reverse
    store.login("ann@x.com", "secret1").await.unwrap();
    let snapshot = store.snapshot();
    assert_eq!(check_route(Route::Profile, &snapshot), GuardOutcome::Allow);
    assert_eq!(
        check_route(Route::Login, &snapshot),
        GuardOutcome::Redirect(Route::Home)
    );
}
