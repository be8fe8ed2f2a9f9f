//! Authentication integration tests.
//!
//! Tests verify:
//! - Login with valid and invalid credentials
//! - Malformed login bodies
//! - Missing, malformed, tampered and expired bearer tokens
//! - Public endpoints stay reachable without a token

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tower::ServiceExt;

use image_filter_server::TokenAuth;

use super::test_utils::{
    body_json, create_png, filtered_image_request, login_request, MockImageSource, TestApp,
    TEST_PASSWORD, TEST_SECRET, TEST_USERNAME,
};

const IMAGE_URL: &str = "https://images.example.com/cat.png";

fn now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_secs()
}

async fn app_with_image() -> TestApp {
    TestApp::new(MockImageSource::new().with_image(IMAGE_URL, create_png(40, 30))).await
}

// =============================================================================
// Login
// =============================================================================

#[tokio::test]
async fn test_login_success() {
    let app = TestApp::new(MockImageSource::new()).await;

    let response = app
        .router
        .clone()
        .oneshot(login_request(TEST_USERNAME, TEST_PASSWORD))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response.into_body()).await;
    let token = json["token"].as_str().unwrap();
    assert!(!token.is_empty());
    assert_eq!(json["expires_in"], 86400);

    let claims = TokenAuth::new(TEST_SECRET, Duration::from_secs(1))
        .decode(token)
        .unwrap();
    assert_eq!(claims.sub, TEST_USERNAME);
}

#[tokio::test]
async fn test_login_wrong_password() {
    let app = TestApp::new(MockImageSource::new()).await;

    let response = app
        .router
        .clone()
        .oneshot(login_request(TEST_USERNAME, "wrong"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let json = body_json(response.into_body()).await;
    assert_eq!(json["error"], "invalid_credentials");
    assert!(json.get("token").is_none());
}

#[tokio::test]
async fn test_login_wrong_username() {
    let app = TestApp::new(MockImageSource::new()).await;

    let response = app
        .router
        .clone()
        .oneshot(login_request("root", TEST_PASSWORD))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_login_malformed_bodies() {
    let app = TestApp::new(MockImageSource::new()).await;

    for body in [
        "",
        "not json",
        r#"{"username": "admin"}"#,
        r#"{"password": "correct horse"}"#,
    ] {
        let request = Request::builder()
            .method("POST")
            .uri("/auth")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body))
            .unwrap();

        let response = app.router.clone().oneshot(request).await.unwrap();
        assert_eq!(
            response.status(),
            StatusCode::UNPROCESSABLE_ENTITY,
            "body {:?} should be rejected",
            body
        );
    }
}

#[tokio::test]
async fn test_login_without_content_type() {
    let app = TestApp::new(MockImageSource::new()).await;

    let request = Request::builder()
        .method("POST")
        .uri("/auth")
        .body(Body::from(r#"{"username":"admin","password":"correct horse"}"#))
        .unwrap();

    let response = app.router.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

// =============================================================================
// Bearer Tokens
// =============================================================================

#[tokio::test]
async fn test_missing_authorization_header() {
    let app = app_with_image().await;

    let response = app
        .router
        .clone()
        .oneshot(filtered_image_request(IMAGE_URL, None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let json = body_json(response.into_body()).await;
    assert_eq!(json["error"], "missing_token");
    assert_eq!(app.fetch_count(), 0);
}

#[tokio::test]
async fn test_missing_header_checked_before_url() {
    let app = TestApp::new(MockImageSource::new()).await;

    let response = app
        .router
        .clone()
        .oneshot(filtered_image_request("https://x.example/a.gif", None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let json = body_json(response.into_body()).await;
    assert_eq!(json["error"], "missing_token");
}

#[tokio::test]
async fn test_malformed_authorization_headers() {
    let app = app_with_image().await;
    let token = app.login().await;

    for value in [
        "Bearer".to_string(),
        "Bearer ".to_string(),
        format!("Basic {}", token),
        token.clone(),
        "Bearer not-a-token".to_string(),
    ] {
        let request = Request::builder()
            .uri(format!("/filteredimage?image_url={}", IMAGE_URL))
            .header(header::AUTHORIZATION, value.as_str())
            .body(Body::empty())
            .unwrap();

        let response = app.router.clone().oneshot(request).await.unwrap();
        assert_eq!(
            response.status(),
            StatusCode::FORBIDDEN,
            "header {:?} should be rejected",
            value
        );
    }

    assert_eq!(app.fetch_count(), 0);
}

#[tokio::test]
async fn test_token_signed_with_other_secret() {
    let app = app_with_image().await;
    let forged = TokenAuth::new("some-other-secret", Duration::from_secs(3600))
        .issue(TEST_USERNAME)
        .unwrap();

    let response = app
        .router
        .clone()
        .oneshot(filtered_image_request(IMAGE_URL, Some(&forged)))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    let json = body_json(response.into_body()).await;
    assert_eq!(json["error"], "invalid_token");
    assert_eq!(app.fetch_count(), 0);
}

#[tokio::test]
async fn test_tampered_token() {
    let app = app_with_image().await;
    let token = app.login().await;

    // Claims from another issuer, signature from the genuine token
    let foreign = TokenAuth::new("some-other-secret", Duration::from_secs(3600))
        .issue(TEST_USERNAME)
        .unwrap();
    let (foreign_body, _) = foreign.rsplit_once('.').unwrap();
    let (_, signature) = token.rsplit_once('.').unwrap();
    let tampered = format!("{}.{}", foreign_body, signature);

    let response = app
        .router
        .clone()
        .oneshot(filtered_image_request(IMAGE_URL, Some(&tampered)))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert_eq!(app.fetch_count(), 0);
}

#[tokio::test]
async fn test_expired_token() {
    let app = app_with_image().await;
    let expired = TokenAuth::new(TEST_SECRET, Duration::from_secs(60))
        .issue_at(TEST_USERNAME, now() - 3600)
        .unwrap();

    let response = app
        .router
        .clone()
        .oneshot(filtered_image_request(IMAGE_URL, Some(&expired)))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert_eq!(app.fetch_count(), 0);
}

#[tokio::test]
async fn test_valid_token_reaches_pipeline() {
    let app = app_with_image().await;
    let token = app.login().await;

    let response = app
        .router
        .clone()
        .oneshot(filtered_image_request(IMAGE_URL, Some(&token)))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(app.fetch_count(), 1);
}

#[tokio::test]
async fn test_token_reusable_across_requests() {
    let app = app_with_image().await;
    let token = app.login().await;

    for _ in 0..3 {
        let response = app
            .router
            .clone()
            .oneshot(filtered_image_request(IMAGE_URL, Some(&token)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    assert_eq!(app.fetch_count(), 3);
}

// =============================================================================
// Public Endpoints
// =============================================================================

#[tokio::test]
async fn test_public_endpoints_need_no_token() {
    let app = TestApp::new(MockImageSource::new()).await;

    for uri in ["/", "/health"] {
        let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
        let response = app.router.clone().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK, "{} should be public", uri);
    }
}
