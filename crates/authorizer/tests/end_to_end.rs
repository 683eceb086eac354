//! PermissionAuthorizer wired from configuration against fake HTTP services

use permcache_authorizer::PermissionAuthorizer;
use permcache_config::{AuthorizerConfigBuilder, CacheBackend};
use permcache_core::ErrorKind;
use serde_json::json;
use std::time::Duration;
use wiremock::matchers::{body_json, body_string, header, method, path, path_regex, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const PERMISSION_TTL: Duration = Duration::from_secs(120);

fn authorizer(authority: &MockServer, backend: CacheBackend) -> PermissionAuthorizer {
    let config = AuthorizerConfigBuilder::new(authority.uri(), "catalog-service", "s3cret")
        .with_backend(backend)
        .with_permission_ttl(PERMISSION_TTL)
        .with_request_timeout(Duration::from_secs(5))
        .build()
        .unwrap();
    PermissionAuthorizer::from_config(&config).unwrap()
}

async fn mount_login(server: &MockServer, expected: u64) {
    Mock::given(method("POST"))
        .and(path("/public/logins"))
        .and(body_json(json!({"userId": "catalog-service", "password": "s3cret"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "userId": "catalog-service",
            "authToken": "app-token"
        })))
        .expect(expected)
        .mount(server)
        .await;
}

#[tokio::test]
async fn one_login_serves_many_subjects() {
    let authority = MockServer::start().await;
    mount_login(&authority, 1).await;
    Mock::given(method("POST"))
        .and(path("/secure/authz-checks"))
        .and(header("authorization", "Bearer app-token"))
        .respond_with(ResponseTemplate::new(200).set_body_string("true"))
        .expect(2)
        .mount(&authority)
        .await;

    let authorizer = authorizer(&authority, CacheBackend::Memory);

    assert!(authorizer.is_authorized("abc", "product-view").await.unwrap());
    assert!(authorizer.is_authorized("xyz", "product-view").await.unwrap());
    assert!(authorizer.is_authorized("abc", "product-view").await.unwrap());

    let stats = authorizer.stats();
    assert_eq!(stats.cache_hits, 1);
    assert_eq!(stats.authority_checks, 2);
}

#[tokio::test]
async fn persistent_rejection_relogs_in_exactly_once() {
    let authority = MockServer::start().await;
    mount_login(&authority, 2).await;
    Mock::given(method("POST"))
        .and(path("/secure/authz-checks"))
        .respond_with(ResponseTemplate::new(401))
        .expect(2)
        .mount(&authority)
        .await;

    let authorizer = authorizer(&authority, CacheBackend::Memory);
    let err = authorizer
        .is_authorized("abc", "product-view")
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Authentication);
    assert_eq!(authorizer.stats().credential_renewals, 1);
}

#[tokio::test]
async fn authority_redirect_keeps_credential() {
    let authority = MockServer::start().await;
    mount_login(&authority, 1).await;
    Mock::given(method("POST"))
        .and(path("/secure/authz-checks"))
        .respond_with(
            ResponseTemplate::new(308).insert_header("location", "/v2/secure/authz-checks"),
        )
        .mount(&authority)
        .await;
    Mock::given(method("POST"))
        .and(path("/v2/secure/authz-checks"))
        .and(header("authorization", "Bearer app-token"))
        .respond_with(ResponseTemplate::new(200).set_body_string("true"))
        .expect(1)
        .mount(&authority)
        .await;

    let authorizer = authorizer(&authority, CacheBackend::Memory);

    assert!(authorizer.is_authorized("abc", "product-view").await.unwrap());
}

#[tokio::test]
async fn disabled_cache_asks_authority_every_time() {
    let authority = MockServer::start().await;
    mount_login(&authority, 2).await;
    Mock::given(method("POST"))
        .and(path("/secure/authz-checks"))
        .respond_with(ResponseTemplate::new(200).set_body_string("true"))
        .expect(2)
        .mount(&authority)
        .await;

    let authorizer = authorizer(&authority, CacheBackend::Disabled);

    assert!(authorizer.is_authorized("abc", "product-view").await.unwrap());
    assert!(authorizer.is_authorized("abc", "product-view").await.unwrap());
    assert_eq!(authorizer.stats().cache_hits, 0);
}

#[tokio::test]
async fn remote_cache_receives_grants_with_ttl() {
    let authority = MockServer::start().await;
    let store = MockServer::start().await;
    mount_login(&authority, 1).await;
    Mock::given(method("POST"))
        .and(path("/secure/authz-checks"))
        .respond_with(ResponseTemplate::new(200).set_body_string("true"))
        .expect(1)
        .mount(&authority)
        .await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&store)
        .await;
    Mock::given(method("PUT"))
        .and(path("/kv/authToken"))
        .and(body_string("app-token"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&store)
        .await;
    Mock::given(method("PUT"))
        .and(path_regex(r"^/kv/PERMISSIONS.abc$"))
        .and(body_string("product-view"))
        .and(query_param("ttl", "120"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&store)
        .await;

    let backend = CacheBackend::Http {
        endpoint: format!("{}/kv", store.uri()),
    };
    let authorizer = authorizer(&authority, backend);

    assert!(authorizer.is_authorized("abc", "product-view").await.unwrap());
}

#[tokio::test]
async fn remote_cache_outage_fails_the_check() {
    let authority = MockServer::start().await;
    let store = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&store)
        .await;

    let backend = CacheBackend::Http {
        endpoint: format!("{}/kv", store.uri()),
    };
    let authorizer = authorizer(&authority, backend);
    let err = authorizer
        .is_authorized("abc", "product-view")
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Transport);
}

#[tokio::test]
async fn abandoned_check_caches_nothing() {
    let authority = MockServer::start().await;
    let store = MockServer::start().await;
    mount_login(&authority, 1).await;
    Mock::given(method("POST"))
        .and(path("/secure/authz-checks"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string("true")
                .set_delay(Duration::from_secs(1)),
        )
        .mount(&authority)
        .await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&store)
        .await;
    Mock::given(method("PUT"))
        .and(path("/kv/authToken"))
        .respond_with(ResponseTemplate::new(204))
        .mount(&store)
        .await;
    Mock::given(method("PUT"))
        .and(path_regex(r"^/kv/PERMISSIONS"))
        .respond_with(ResponseTemplate::new(204))
        .expect(0)
        .mount(&store)
        .await;

    let backend = CacheBackend::Http {
        endpoint: format!("{}/kv", store.uri()),
    };
    let authorizer = authorizer(&authority, backend);

    let outcome = tokio::time::timeout(
        Duration::from_millis(200),
        authorizer.is_authorized("abc", "product-view"),
    )
    .await;
    assert!(outcome.is_err(), "check should have been cut short");

    tokio::time::sleep(Duration::from_millis(1200)).await;

    let writes = store.received_requests().await.unwrap_or_default();
    assert!(writes
        .iter()
        .all(|request| !request.url.path().contains("PERMISSIONS")));
}

#[tokio::test]
async fn unreachable_redis_fails_the_check() {
    let authority = MockServer::start().await;
    let backend = CacheBackend::Redis {
        address: "127.0.0.1:9".to_string(),
    };

    let authorizer = authorizer(&authority, backend);
    let err = authorizer
        .is_authorized("abc", "product-view")
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Transport);
}
