//! API integration tests for thumbnail retrieval and error handling.
//!
//! Tests verify:
//! - Status codes for valid and invalid requests
//! - Content type, length and caching headers
//! - Conditional request handling
//! - Upload, health and counter endpoints

use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};

use blob_thumbs::blob::ContentRef;
use blob_thumbs::thumb::{cache_key, etag_for_key};

use super::test_utils::{
    body_bytes, cr2_fixture, gif_fixture, jpeg_fixture, png_fixture, thumb_uri, TestServerBuilder,
};

// =============================================================================
// Basic Retrieval
// =============================================================================

#[tokio::test]
async fn test_miss_returns_image() {
    let server = TestServerBuilder::new().build();
    let source = server.seed(jpeg_fixture(300, 200)).await;

    let response = server.get(&thumb_uri(&source, 100, 100)).await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::CONTENT_TYPE], "image/jpeg");
    assert_eq!(response.headers()["x-thumb-cache-hit"], "false");

    let length: usize = response.headers()[header::CONTENT_LENGTH]
        .to_str()
        .unwrap()
        .parse()
        .unwrap();
    let body = body_bytes(response).await;
    assert!(!body.is_empty());
    assert_eq!(body.len(), length);

    let thumb = image::load_from_memory(&body).unwrap();
    assert_eq!(thumb.width(), 100);
    assert!((66..=67).contains(&thumb.height()));
}

#[tokio::test]
async fn test_unmodified_jpeg_served_verbatim() {
    let server = TestServerBuilder::new().build();
    let original = jpeg_fixture(40, 30);
    let source = server.seed(original.clone()).await;

    let response = server.get(&thumb_uri(&source, 100, 100)).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::CONTENT_TYPE], "image/jpeg");
    assert_eq!(body_bytes(response).await.as_ref(), original.as_slice());

    // Served from cache without decoding again.
    let response = server.get(&thumb_uri(&source, 100, 100)).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()["x-thumb-cache-hit"], "true");
    assert_eq!(body_bytes(response).await.as_ref(), original.as_slice());
    assert_eq!(server.decoder.calls(), 1);
}

#[tokio::test]
async fn test_downscaled_png_stays_png() {
    let server = TestServerBuilder::new().build();
    let source = server.seed(png_fixture(400, 400)).await;

    let response = server.get(&thumb_uri(&source, 50, 50)).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::CONTENT_TYPE], "image/png");

    let body = body_bytes(response).await;
    assert_eq!(
        image::guess_format(&body).unwrap(),
        image::ImageFormat::Png
    );
}

#[tokio::test]
async fn test_cr2_served_from_embedded_preview() {
    let server = TestServerBuilder::new().build();
    let source = server.seed(cr2_fixture(160, 120)).await;

    let response = server.get(&thumb_uri(&source, 80, 80)).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::CONTENT_TYPE], "image/jpeg");

    let body = body_bytes(response).await;
    assert_eq!(
        image::guess_format(&body).unwrap(),
        image::ImageFormat::Jpeg
    );
    let thumb = image::load_from_memory(&body).unwrap();
    assert_eq!((thumb.width(), thumb.height()), (80, 60));
}

#[tokio::test]
async fn test_unmodified_gif_passes_through_as_png_type() {
    let server = TestServerBuilder::new().build();
    let original = gif_fixture(20, 10);
    let source = server.seed(original.clone()).await;

    let response = server.get(&thumb_uri(&source, 100, 100)).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::CONTENT_TYPE], "image/png");
    assert_eq!(body_bytes(response).await.as_ref(), original.as_slice());
}

#[tokio::test]
async fn test_square_crop() {
    let server = TestServerBuilder::new().build();
    let source = server.seed(jpeg_fixture(40, 30)).await;

    let uri = format!("/thumbnail/{}?mw=100&mh=100&square=1", source);
    let response = server.get(&uri).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::CONTENT_TYPE], "image/jpeg");

    let thumb = image::load_from_memory(&body_bytes(response).await).unwrap();
    assert_eq!((thumb.width(), thumb.height()), (30, 30));
}

#[tokio::test]
async fn test_filename_segment_is_ignored() {
    let server = TestServerBuilder::new().build();
    let source = server.seed(jpeg_fixture(40, 30)).await;

    let uri = format!("/thumbnail/{}/holiday.jpg?mw=100&mh=100", source);
    let response = server.get(&uri).await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_default_dimensions() {
    let server = TestServerBuilder::new().build();
    let source = server.seed(jpeg_fixture(300, 300)).await;

    let response = server.get(&format!("/thumbnail/{}", source)).await;
    assert_eq!(response.status(), StatusCode::OK);

    let thumb = image::load_from_memory(&body_bytes(response).await).unwrap();
    assert_eq!((thumb.width(), thumb.height()), (100, 100));
}

#[tokio::test]
async fn test_head_returns_headers_only() {
    let server = TestServerBuilder::new().build();
    let source = server.seed(jpeg_fixture(40, 30)).await;

    let request = Request::builder()
        .method(Method::HEAD)
        .uri(thumb_uri(&source, 100, 100))
        .body(Body::empty())
        .unwrap();
    let response = server.send(request).await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::CONTENT_TYPE], "image/jpeg");
    assert!(response.headers().contains_key(header::ETAG));
    assert!(body_bytes(response).await.is_empty());
}

#[tokio::test]
async fn test_caching_headers() {
    let server = TestServerBuilder::new().build();
    let source = server.seed(jpeg_fixture(40, 30)).await;

    let response = server.get(&thumb_uri(&source, 64, 48)).await;
    let headers = response.headers();

    let etag = format!("\"{}\"", etag_for_key(&cache_key(&source, 64, 48)));
    assert_eq!(headers[header::ETAG], etag.as_str());

    let last_modified = headers[header::LAST_MODIFIED].to_str().unwrap();
    assert!(last_modified.ends_with(" GMT"));
    let expires = headers[header::EXPIRES].to_str().unwrap();
    assert!(expires.ends_with(" GMT"));
    assert_ne!(expires, last_modified);
}

// =============================================================================
// Conditional Requests
// =============================================================================

#[tokio::test]
async fn test_if_none_match_returns_not_modified() {
    let server = TestServerBuilder::new().build();
    let source = server.seed(jpeg_fixture(40, 30)).await;
    let etag = etag_for_key(&cache_key(&source, 100, 100));

    let request = Request::builder()
        .uri(thumb_uri(&source, 100, 100))
        .header(header::IF_NONE_MATCH, format!("\"{}\"", etag))
        .body(Body::empty())
        .unwrap();
    let response = server.send(request).await;

    assert_eq!(response.status(), StatusCode::NOT_MODIFIED);
    assert!(!response.headers().contains_key(header::CONTENT_TYPE));
    assert!(body_bytes(response).await.is_empty());
    assert_eq!(server.decoder.calls(), 0);
}

#[tokio::test]
async fn test_if_none_match_unquoted() {
    let server = TestServerBuilder::new().build();
    let source = server.seed(jpeg_fixture(40, 30)).await;
    let etag = etag_for_key(&cache_key(&source, 100, 100));

    let request = Request::builder()
        .uri(thumb_uri(&source, 100, 100))
        .header(header::IF_NONE_MATCH, etag)
        .body(Body::empty())
        .unwrap();
    assert_eq!(server.send(request).await.status(), StatusCode::NOT_MODIFIED);
}

#[tokio::test]
async fn test_if_none_match_for_other_size_is_served() {
    let server = TestServerBuilder::new().build();
    let source = server.seed(jpeg_fixture(40, 30)).await;
    let other = etag_for_key(&cache_key(&source, 50, 50));

    let request = Request::builder()
        .uri(thumb_uri(&source, 100, 100))
        .header(header::IF_NONE_MATCH, format!("\"{}\"", other))
        .body(Body::empty())
        .unwrap();
    assert_eq!(server.send(request).await.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_if_modified_since_with_cache_enabled() {
    let server = TestServerBuilder::new().build();
    let source = server.seed(jpeg_fixture(40, 30)).await;

    let request = Request::builder()
        .uri(thumb_uri(&source, 100, 100))
        .header(header::IF_MODIFIED_SINCE, "Thu, 01 Jan 1970 00:00:00 GMT")
        .body(Body::empty())
        .unwrap();
    assert_eq!(server.send(request).await.status(), StatusCode::NOT_MODIFIED);
}

#[tokio::test]
async fn test_if_modified_since_with_cache_disabled() {
    let server = TestServerBuilder::new().cache_enabled(false).build();
    let source = server.seed(jpeg_fixture(40, 30)).await;

    let request = Request::builder()
        .uri(thumb_uri(&source, 100, 100))
        .header(header::IF_MODIFIED_SINCE, "Thu, 01 Jan 1970 00:00:00 GMT")
        .body(Body::empty())
        .unwrap();
    let response = server.send(request).await;

    assert_eq!(response.status(), StatusCode::OK);
    assert!(!response.headers().contains_key(header::ETAG));
    assert!(!response.headers().contains_key(header::EXPIRES));
    assert!(!response.headers().contains_key(header::LAST_MODIFIED));
}

// =============================================================================
// Error Handling
// =============================================================================

#[tokio::test]
async fn test_width_over_maximum() {
    let server = TestServerBuilder::new().build();
    let source = server.seed(jpeg_fixture(40, 30)).await;

    let response = server.get(&thumb_uri(&source, 2001, 100)).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_bytes(response).await;
    assert_eq!(body.as_ref(), b"bogus dimensions");
    assert_eq!(server.decoder.calls(), 0);
}

#[tokio::test]
async fn test_configured_maximum() {
    let server = TestServerBuilder::new().max_image_size(64).build();
    let source = server.seed(jpeg_fixture(40, 30)).await;

    assert_eq!(
        server.get(&thumb_uri(&source, 64, 64)).await.status(),
        StatusCode::OK
    );
    assert_eq!(
        server.get(&thumb_uri(&source, 64, 65)).await.status(),
        StatusCode::BAD_REQUEST
    );
}

#[tokio::test]
async fn test_zero_dimensions() {
    let server = TestServerBuilder::new().build();
    let source = server.seed(jpeg_fixture(40, 30)).await;

    assert_eq!(
        server.get(&thumb_uri(&source, 0, 100)).await.status(),
        StatusCode::BAD_REQUEST
    );
    assert_eq!(
        server.get(&thumb_uri(&source, 100, 0)).await.status(),
        StatusCode::BAD_REQUEST
    );
}

#[tokio::test]
async fn test_post_is_rejected() {
    let server = TestServerBuilder::new().build();
    let source = server.seed(jpeg_fixture(40, 30)).await;

    let request = Request::builder()
        .method(Method::POST)
        .uri(thumb_uri(&source, 100, 100))
        .body(Body::empty())
        .unwrap();
    let response = server.send(request).await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_bytes(response).await.as_ref(), b"Invalid method");
}

#[tokio::test]
async fn test_invalid_blobref() {
    let server = TestServerBuilder::new().build();

    let response = server.get("/thumbnail/not-a-ref?mw=10&mh=10").await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_missing_source_is_server_error() {
    let server = TestServerBuilder::new().build();
    let missing = ContentRef::of(b"never stored");

    let response = server.get(&thumb_uri(&missing, 100, 100)).await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

    let body = body_bytes(response).await;
    let text = std::str::from_utf8(&body).unwrap();
    assert!(text.contains("error reading image"));
    assert!(text.contains(missing.as_str()));
}

#[tokio::test]
async fn test_undecodable_source_is_server_error() {
    let server = TestServerBuilder::new().build();
    let source = server.seed(b"definitely not an image".to_vec()).await;

    let response = server.get(&thumb_uri(&source, 100, 100)).await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

    let body = body_bytes(response).await;
    assert!(std::str::from_utf8(&body)
        .unwrap()
        .contains("error decoding image"));
}

// =============================================================================
// Other Endpoints
// =============================================================================

#[tokio::test]
async fn test_upload_then_thumbnail() {
    let server = TestServerBuilder::new().build();
    let original = jpeg_fixture(40, 30);

    let request = Request::builder()
        .method(Method::PUT)
        .uri("/blobs")
        .body(Body::from(original.clone()))
        .unwrap();
    let response = server.send(request).await;
    assert_eq!(response.status(), StatusCode::CREATED);

    let json: serde_json::Value = serde_json::from_slice(&body_bytes(response).await).unwrap();
    assert_eq!(json["size"], original.len());
    let content_ref = json["ref"].as_str().unwrap();
    assert_eq!(content_ref, ContentRef::of(&original).as_str());

    let uri = format!("/thumbnail/{}?mw=100&mh=100", content_ref);
    let response = server.get(&uri).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_bytes(response).await.as_ref(), original.as_slice());
}

#[tokio::test]
async fn test_health() {
    let server = TestServerBuilder::new().build();

    let response = server.get("/health").await;
    assert_eq!(response.status(), StatusCode::OK);

    let json: serde_json::Value = serde_json::from_slice(&body_bytes(response).await).unwrap();
    assert_eq!(json["status"], "healthy");
}

#[tokio::test]
async fn test_debug_vars_count_bytes() {
    let server = TestServerBuilder::new().build();
    let original = jpeg_fixture(40, 30);
    let source = server.seed(original.clone()).await;

    let body = body_bytes(server.get(&thumb_uri(&source, 100, 100)).await).await;

    let response = server.get("/debug/vars").await;
    assert_eq!(response.status(), StatusCode::OK);
    let json: serde_json::Value = serde_json::from_slice(&body_bytes(response).await).unwrap();
    assert_eq!(json["image-bytes-fetched"], original.len());
    assert_eq!(json["image-bytes-served"], body.len());

    let snapshot = server.counters.snapshot();
    assert_eq!(snapshot.bytes_served, body.len() as u64);
}

#[tokio::test]
async fn test_head_counts_no_bytes_served() {
    let server = TestServerBuilder::new().build();
    let source = server.seed(jpeg_fixture(40, 30)).await;

    let request = Request::builder()
        .method(Method::HEAD)
        .uri(thumb_uri(&source, 100, 100))
        .body(Body::empty())
        .unwrap();
    body_bytes(server.send(request).await).await;

    assert_eq!(server.counters.snapshot().bytes_served, 0);
}
