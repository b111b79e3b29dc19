mod common;

use axum::{
    extract::FromRequestParts,
    http::{Method, Request, StatusCode, Uri, header, request::Parts},
};
use common::{ADMIN_ID, MockRepository, PATRON_ID, mint_token, test_state, valid_token};
use library_catalog::{auth::AuthUser, config::Env, models::Role};
use uuid::Uuid;

// --- Helper Functions ---

fn get_request_parts(method: Method, uri: Uri) -> Parts {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .body(axum::body::Body::empty())
        .unwrap();
    let (parts, _) = request.into_parts();
    parts
}

fn with_bearer(token: &str) -> Parts {
    let mut parts = get_request_parts(Method::GET, "/me".parse().unwrap());
    parts.headers.insert(
        header::AUTHORIZATION,
        header::HeaderValue::from_str(&format!("Bearer {}", token)).unwrap(),
    );
    parts
}

fn with_bypass(user_id: Uuid) -> Parts {
    let mut parts = get_request_parts(Method::GET, "/me".parse().unwrap());
    parts.headers.insert(
        header::HeaderName::from_static("x-user-id"),
        header::HeaderValue::from_str(&user_id.to_string()).unwrap(),
    );
    parts
}

// --- Tests ---

#[tokio::test]
async fn test_auth_success_with_valid_jwt() {
    let repo = MockRepository::default().with_role(ADMIN_ID, Role::Admin);
    let app_state = test_state(repo, Env::Production);

    let mut parts = with_bearer(&valid_token(ADMIN_ID));
    let user = AuthUser::from_request_parts(&mut parts, &app_state)
        .await
        .unwrap();

    assert_eq!(user.id, ADMIN_ID);
    assert_eq!(user.email.as_deref(), Some("reader@example.com"));
    assert_eq!(user.role, Role::Admin);
    assert!(user.is_admin());
}

#[tokio::test]
async fn test_missing_role_row_defaults_to_user() {
    let app_state = test_state(MockRepository::default(), Env::Production);

    let mut parts = with_bearer(&valid_token(PATRON_ID));
    let user = AuthUser::from_request_parts(&mut parts, &app_state)
        .await
        .unwrap();

    assert_eq!(user.role, Role::User);
    assert!(!user.is_admin());
}

#[tokio::test]
async fn test_auth_failure_with_missing_header() {
    let app_state = test_state(MockRepository::default(), Env::Production);

    let mut parts = get_request_parts(Method::GET, "/me".parse().unwrap());
    let auth_user = AuthUser::from_request_parts(&mut parts, &app_state).await;

    assert_eq!(auth_user.unwrap_err(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_auth_failure_with_expired_jwt() {
    let app_state = test_state(MockRepository::default(), Env::Production);

    // Well past the validator's default leeway.
    let mut parts = with_bearer(&mint_token(PATRON_ID, "authenticated", -3600));
    let auth_user = AuthUser::from_request_parts(&mut parts, &app_state).await;

    assert_eq!(auth_user.unwrap_err(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_auth_failure_with_wrong_audience() {
    let app_state = test_state(MockRepository::default(), Env::Production);

    let mut parts = with_bearer(&mint_token(PATRON_ID, "anon", 3600));
    let auth_user = AuthUser::from_request_parts(&mut parts, &app_state).await;

    assert_eq!(auth_user.unwrap_err(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_auth_failure_with_foreign_signature() {
    let mut app_state = test_state(MockRepository::default(), Env::Production);
    app_state.config.jwt_secret = "a-different-project-secret".to_string();

    let mut parts = with_bearer(&valid_token(PATRON_ID));
    let auth_user = AuthUser::from_request_parts(&mut parts, &app_state).await;

    assert_eq!(auth_user.unwrap_err(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_role_lookup_failure_is_server_error() {
    let repo = MockRepository {
        fail_role_lookup: true,
        ..MockRepository::default()
    };
    let app_state = test_state(repo, Env::Production);

    let mut parts = with_bearer(&valid_token(PATRON_ID));
    let auth_user = AuthUser::from_request_parts(&mut parts, &app_state).await;

    assert_eq!(auth_user.unwrap_err(), StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test]
async fn test_local_bypass_success() {
    let repo = MockRepository::default().with_role(ADMIN_ID, Role::Admin);
    let app_state = test_state(repo, Env::Local);

    let mut parts = with_bypass(ADMIN_ID);
    let user = AuthUser::from_request_parts(&mut parts, &app_state)
        .await
        .unwrap();

    assert_eq!(user.id, ADMIN_ID);
    assert_eq!(user.role, Role::Admin);
}

#[tokio::test]
async fn test_local_bypass_disabled_in_prod() {
    let repo = MockRepository::default().with_role(ADMIN_ID, Role::Admin);
    let app_state = test_state(repo, Env::Production);

    let mut parts = with_bypass(ADMIN_ID);
    let auth_user = AuthUser::from_request_parts(&mut parts, &app_state).await;

    assert_eq!(auth_user.unwrap_err(), StatusCode::UNAUTHORIZED);
}
