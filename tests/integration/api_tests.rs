//! API integration tests for image filtering and error handling.
//!
//! Tests verify:
//! - The usage hint and health endpoints
//! - Successful filtering of PNG and JPEG sources
//! - URL validation (no fetch is made for a rejected URL)
//! - Generic 500 responses for fetch and decode failures
//! - HTTP response codes and headers

use axum::body::Body;
use axum::http::{Request, StatusCode};
use tower::ServiceExt;

use super::test_utils::{
    body_bytes, body_json, create_jpeg, create_png, create_rgba_png, filtered_image_request,
    files_in, is_valid_jpeg, MockImageSource, TestApp,
};

const PNG_URL: &str = "https://images.example.com/photo.png";
const JPG_URL: &str = "https://images.example.com/photo.jpg";

// =============================================================================
// Public Endpoints
// =============================================================================

#[tokio::test]
async fn test_root_returns_usage_hint() {
    let app = TestApp::new(MockImageSource::new()).await;

    let request = Request::builder().uri("/").body(Body::empty()).unwrap();
    let response = app.router.clone().oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_bytes(response.into_body()).await;
    assert_eq!(&body[..], b"try GET /filteredimage?image_url={{}}");
}

#[tokio::test]
async fn test_health_check() {
    let app = TestApp::new(MockImageSource::new()).await;

    let request = Request::builder()
        .uri("/health")
        .body(Body::empty())
        .unwrap();
    let response = app.router.clone().oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response.into_body()).await;
    assert_eq!(json["status"], "healthy");
}

#[tokio::test]
async fn test_unknown_route_is_not_found() {
    let app = TestApp::new(MockImageSource::new()).await;

    let request = Request::builder()
        .uri("/does-not-exist")
        .body(Body::empty())
        .unwrap();
    let response = app.router.clone().oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

// =============================================================================
// Successful Filtering
// =============================================================================

#[tokio::test]
async fn test_filter_png_success() {
    let source = MockImageSource::new().with_image(PNG_URL, create_png(640, 480));
    let app = TestApp::new(source).await;
    let token = app.login().await;

    let response = app
        .router
        .clone()
        .oneshot(filtered_image_request(PNG_URL, Some(&token)))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get("content-type").unwrap(),
        "image/jpeg"
    );
    assert_eq!(response.headers().get("cache-control").unwrap(), "no-store");
    assert!(response.headers().contains_key("x-artifact-id"));

    let body = body_bytes(response.into_body()).await;
    assert!(is_valid_jpeg(&body), "Response should be a valid JPEG");

    let decoded = image::load_from_memory(&body).unwrap();
    assert_eq!((decoded.width(), decoded.height()), (256, 256));
    assert_eq!(decoded.color(), image::ColorType::L8);

    assert_eq!(app.fetch_count(), 1);
}

#[tokio::test]
async fn test_filter_jpeg_success() {
    let source = MockImageSource::new().with_image(JPG_URL, create_jpeg(100, 900));
    let app = TestApp::new(source).await;
    let token = app.login().await;

    let response = app
        .router
        .clone()
        .oneshot(filtered_image_request(JPG_URL, Some(&token)))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_bytes(response.into_body()).await;
    let decoded = image::load_from_memory(&body).unwrap();
    assert_eq!((decoded.width(), decoded.height()), (256, 256));
}

#[tokio::test]
async fn test_filter_png_with_alpha() {
    let source = MockImageSource::new().with_image(PNG_URL, create_rgba_png(32, 32));
    let app = TestApp::new(source).await;
    let token = app.login().await;

    let response = app
        .router
        .clone()
        .oneshot(filtered_image_request(PNG_URL, Some(&token)))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_bytes(response.into_body()).await;
    let decoded = image::load_from_memory(&body).unwrap();
    assert_eq!(decoded.color(), image::ColorType::L8);
}

#[tokio::test]
async fn test_artifact_persisted_until_deleted() {
    let source = MockImageSource::new().with_image(PNG_URL, create_png(50, 50));
    let app = TestApp::new(source).await;
    let token = app.login().await;

    let response = app
        .router
        .clone()
        .oneshot(filtered_image_request(PNG_URL, Some(&token)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let artifact_id = response
        .headers()
        .get("x-artifact-id")
        .unwrap()
        .to_str()
        .unwrap()
        .to_string();

    let served = body_bytes(response.into_body()).await;
    let stored = std::fs::read(app.scratch.path().join(format!("filtered.{}.jpg", artifact_id)))
        .expect("artifact should exist after the response");
    assert_eq!(&served[..], &stored[..]);
    assert_eq!(app.pipeline.store().pending_deletions(), 1);
}

// =============================================================================
// URL Validation
// =============================================================================

#[tokio::test]
async fn test_invalid_urls_rejected_without_fetch() {
    let app = TestApp::new(MockImageSource::new()).await;
    let token = app.login().await;

    for url in [
        "https://images.example.com/anim.gif",
        "https://images.example.com/photo",
        "https://images.example.com/photo.jpeg",
        "https://images.example.com/PHOTO.PNG",
        "ftp://images.example.com/photo.png",
        "",
    ] {
        let response = app
            .router
            .clone()
            .oneshot(filtered_image_request(url, Some(&token)))
            .await
            .unwrap();

        assert_eq!(
            response.status(),
            StatusCode::UNPROCESSABLE_ENTITY,
            "url {:?} should be rejected",
            url
        );

        let json = body_json(response.into_body()).await;
        assert_eq!(json["error"], "invalid_image_url");
        assert!(json["message"]
            .as_str()
            .unwrap()
            .starts_with("Image url is required and must be a jpg or png"));
    }

    assert_eq!(app.fetch_count(), 0);
    assert_eq!(files_in(app.scratch.path()), 0);
}

#[tokio::test]
async fn test_missing_image_url_param() {
    let app = TestApp::new(MockImageSource::new()).await;
    let token = app.login().await;

    let request = Request::builder()
        .uri("/filteredimage")
        .header("authorization", format!("Bearer {}", token))
        .body(Body::empty())
        .unwrap();
    let response = app.router.clone().oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(app.fetch_count(), 0);
}

#[tokio::test]
async fn test_duplicate_image_url_param() {
    let app = TestApp::new(MockImageSource::new()).await;
    let token = app.login().await;

    let request = Request::builder()
        .uri("/filteredimage?image_url=https://x.example/a.gif&image_url=https://x.example/b.gif")
        .header("authorization", format!("Bearer {}", token))
        .body(Body::empty())
        .unwrap();
    let response = app.router.clone().oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let json = body_json(response.into_body()).await;
    assert_eq!(json["error"], "invalid_image_url");
    assert_eq!(app.fetch_count(), 0);
}

// =============================================================================
// Processing Failures
// =============================================================================

#[tokio::test]
async fn test_unreachable_image_is_generic_500() {
    // No image registered: the mock fails like an unreachable host
    let app = TestApp::new(MockImageSource::new()).await;
    let token = app.login().await;

    let response = app
        .router
        .clone()
        .oneshot(filtered_image_request(PNG_URL, Some(&token)))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

    let json = body_json(response.into_body()).await;
    assert_eq!(json["error"], "processing_error");
    assert_eq!(json["message"], "Error while filtering image");
    assert!(!json.to_string().contains("connection refused"));

    assert_eq!(app.fetch_count(), 1);
    assert_eq!(files_in(app.scratch.path()), 0);
}

#[tokio::test]
async fn test_non_image_body_is_generic_500() {
    let body = bytes::Bytes::from_static(b"<html><body>Not Found</body></html>");
    let source = MockImageSource::new().with_image(JPG_URL, body);
    let app = TestApp::new(source).await;
    let token = app.login().await;

    let response = app
        .router
        .clone()
        .oneshot(filtered_image_request(JPG_URL, Some(&token)))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let json = body_json(response.into_body()).await;
    assert_eq!(json["message"], "Error while filtering image");
    assert_eq!(files_in(app.scratch.path()), 0);
}
