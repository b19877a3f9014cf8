//! Thumbnail cache integration tests.
//!
//! Tests verify:
//! - Repeat requests are served from the cache without decoding
//! - Cache write failures still produce a response
//! - Untrusted index entries fall back to scaling
//! - Disk-backed cache survives a restart

use std::sync::Arc;

use axum::http::{header, StatusCode};
use bytes::Bytes;

use blob_thumbs::blob::{BlobStore, DiskStore};
use blob_thumbs::thumb::{cache_key, LogThumbIndex, LruThumbIndex, ThumbIndex};

use super::test_utils::{
    body_bytes, jpeg_fixture, png_fixture, thumb_uri, FailingStore, TestServerBuilder,
};

#[tokio::test]
async fn test_scaled_result_cached_once() {
    let server = TestServerBuilder::new().build();
    let source = server.seed(jpeg_fixture(300, 200)).await;

    let first = body_bytes(server.get(&thumb_uri(&source, 100, 100)).await).await;
    let response = server.get(&thumb_uri(&source, 100, 100)).await;
    assert_eq!(response.headers()["x-thumb-cache-hit"], "true");
    let second = body_bytes(response).await;

    assert_eq!(first, second);
    assert_eq!(server.decoder.calls(), 1);

    let key = cache_key(&source, 100, 100);
    let cached = server.index.get(&key).await.unwrap().unwrap();
    assert_eq!(server.store.fetch(&cached).await.unwrap(), first);
}

#[tokio::test]
async fn test_different_sizes_cached_separately() {
    let server = TestServerBuilder::new().build();
    let source = server.seed(jpeg_fixture(300, 200)).await;

    server.get(&thumb_uri(&source, 100, 100)).await;
    server.get(&thumb_uri(&source, 50, 50)).await;
    assert_eq!(server.decoder.calls(), 2);

    server.get(&thumb_uri(&source, 50, 50)).await;
    assert_eq!(server.decoder.calls(), 2);
}

#[tokio::test]
async fn test_square_flag_shares_cache_entry() {
    let server = TestServerBuilder::new().build();
    let source = server.seed(jpeg_fixture(300, 200)).await;

    let response = server.get(&thumb_uri(&source, 100, 100)).await;
    let plain = body_bytes(response).await;

    let uri = format!("/thumbnail/{}?mw=100&mh=100&square=1", source);
    let response = server.get(&uri).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()["x-thumb-cache-hit"], "true");
    assert_eq!(body_bytes(response).await, plain);
    assert_eq!(server.decoder.calls(), 1);
}

#[tokio::test]
async fn test_cache_write_failure_still_serves() {
    let server = TestServerBuilder::with_store(FailingStore::new()).build();
    let source = server.seed(jpeg_fixture(300, 200)).await;
    server.store.fail_puts(true);

    let response = server.get(&thumb_uri(&source, 100, 100)).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(!body_bytes(response).await.is_empty());
    assert_eq!(server.store.failed_puts(), 1);

    // Nothing was cached, so the next request scales again.
    let response = server.get(&thumb_uri(&source, 100, 100)).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()["x-thumb-cache-hit"], "false");
    assert_eq!(server.decoder.calls(), 2);
}

#[tokio::test]
async fn test_stores_even_when_lookups_disabled() {
    let server = TestServerBuilder::new().cache_enabled(false).build();
    let source = server.seed(jpeg_fixture(300, 200)).await;

    server.get(&thumb_uri(&source, 100, 100)).await;
    server.get(&thumb_uri(&source, 100, 100)).await;
    assert_eq!(server.decoder.calls(), 2);

    let key = cache_key(&source, 100, 100);
    assert!(server.index.get(&key).await.unwrap().is_some());
}

#[tokio::test]
async fn test_non_image_index_entry_is_a_miss() {
    let index = Arc::new(LruThumbIndex::new());
    let server = TestServerBuilder::new().index(index.clone()).build();
    let source = server.seed(jpeg_fixture(300, 200)).await;

    let junk = server.seed(b"not an image at all".to_vec()).await;
    index
        .put(&cache_key(&source, 100, 100), junk)
        .await
        .unwrap();

    let response = server.get(&thumb_uri(&source, 100, 100)).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()["x-thumb-cache-hit"], "false");
    assert_eq!(server.decoder.calls(), 1);
}

#[tokio::test]
async fn test_cached_format_is_resniffed() {
    let index = Arc::new(LruThumbIndex::new());
    let server = TestServerBuilder::new().index(index.clone()).build();
    let source = server.seed(jpeg_fixture(300, 200)).await;

    // An entry pointing at a PNG is served as PNG regardless of the source.
    let png = server.seed(png_fixture(10, 10)).await;
    index.put(&cache_key(&source, 100, 100), png).await.unwrap();

    let response = server.get(&thumb_uri(&source, 100, 100)).await;
    assert_eq!(response.headers()["x-thumb-cache-hit"], "true");
    assert_eq!(response.headers()[header::CONTENT_TYPE], "image/png");
    assert_eq!(server.decoder.calls(), 0);
}

#[tokio::test]
async fn test_disk_cache_survives_restart() {
    let dir = tempfile::tempdir().unwrap();
    let index_path = dir.path().join("thumbmeta.log");
    let original = jpeg_fixture(300, 200);

    let (source, first) = {
        let store = DiskStore::open(dir.path()).unwrap();
        let index = Arc::new(LogThumbIndex::open(&index_path).await.unwrap());
        let server = TestServerBuilder::with_store(store).index(index).build();
        let source = server.seed(original.clone()).await;

        let body = body_bytes(server.get(&thumb_uri(&source, 100, 100)).await).await;
        assert_eq!(server.decoder.calls(), 1);
        (source, body)
    };

    let store = DiskStore::open(dir.path()).unwrap();
    let index = Arc::new(LogThumbIndex::open(&index_path).await.unwrap());
    let server = TestServerBuilder::with_store(store).index(index).build();

    let response = server.get(&thumb_uri(&source, 100, 100)).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()["x-thumb-cache-hit"], "true");
    assert_eq!(body_bytes(response).await, first);
    assert_eq!(server.decoder.calls(), 0);

    // The original is still there too.
    assert_eq!(
        server.store.fetch(&source).await.unwrap(),
        Bytes::from(original)
    );
}
