//! HttpCache against a local fake key/value store

use permcache_cache::{HttpCache, KeyValueCache};
use permcache_core::Error;
use std::time::Duration;
use wiremock::matchers::{body_string, method, path, path_regex, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn cache_for(server: &MockServer) -> HttpCache {
    HttpCache::new(&format!("{}/kv", server.uri()), Duration::from_secs(2)).unwrap()
}

#[tokio::test]
async fn get_returns_stored_value() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/kv/authToken"))
        .respond_with(ResponseTemplate::new(200).set_body_string("app-token"))
        .expect(1)
        .mount(&server)
        .await;

    let cache = cache_for(&server).await;

    assert_eq!(
        cache.get("authToken").await.unwrap().as_deref(),
        Some("app-token")
    );
}

#[tokio::test]
async fn not_found_is_a_clean_miss() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let cache = cache_for(&server).await;

    assert_eq!(cache.get("PERMISSIONS|abc").await.unwrap(), None);
}

#[tokio::test]
async fn server_error_is_a_cache_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let cache = cache_for(&server).await;
    let err = cache.get("authToken").await.unwrap_err();

    assert!(matches!(err, Error::Cache { operation: "get", .. }));
}

#[tokio::test]
async fn unreachable_store_is_a_cache_error() {
    let server = MockServer::start().await;
    let uri = server.uri();
    drop(server);

    let cache = HttpCache::new(&uri, Duration::from_millis(500)).unwrap();
    let err = cache.get("authToken").await.unwrap_err();

    assert!(matches!(err, Error::Cache { .. }));
}

#[tokio::test]
async fn errors_never_carry_the_subject_token() {
    let server = MockServer::start().await;
    let uri = server.uri();
    drop(server);

    let cache = HttpCache::new(&format!("{uri}/kv"), Duration::from_millis(500)).unwrap();
    let err = cache.get("PERMISSIONS|very-secret-bearer").await.unwrap_err();

    let rendered = format!("{err} {err:?}");
    assert!(!rendered.contains("very-secret-bearer"), "{rendered}");
    assert!(rendered.contains("PERMISSIONS|sha256:"));
}

#[tokio::test]
async fn set_puts_value_with_ttl() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path_regex(r"^/kv/PERMISSIONS.abc$"))
        .and(query_param("ttl", "300"))
        .and(body_string("product-view|product-edit"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let cache = cache_for(&server).await;
    cache
        .set(
            "PERMISSIONS|abc",
            "product-view|product-edit",
            Some(Duration::from_secs(300)),
        )
        .await;
}

#[tokio::test]
async fn failed_set_is_swallowed() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&server)
        .await;

    let cache = cache_for(&server).await;
    cache.set("authToken", "app-token", None).await;
}

#[tokio::test]
async fn remove_deletes_key() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path("/kv/authToken"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;

    let cache = cache_for(&server).await;
    cache.remove("authToken").await;
}
