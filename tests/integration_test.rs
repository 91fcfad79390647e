//! End-to-end scenarios through the service and the HTTP boundary.

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use shortener::error::ShortenerError;
use shortener::lifecycle::{ShortenerConfig, ShortenerSystem};
use shortener::store::{JsonFileStore, MemoryStore};
use std::sync::Arc;
use tower::ServiceExt;

#[tokio::test]
async fn shorten_then_resolve_round_trips() {
    let system = ShortenerSystem::new(Arc::new(MemoryStore::new()), ShortenerConfig::default());

    let code = system
        .service()
        .shorten("https://example.com/a")
        .await
        .unwrap();
    assert_eq!(
        system.service().resolve(&code).await.unwrap(),
        "https://example.com/a"
    );

    let err = system.service().shorten("not a url").await;
    assert!(matches!(err, Err(ShortenerError::InvalidUrl(_))));

    system.shutdown().await;
}

#[tokio::test]
async fn records_survive_a_full_restart_with_the_file_store() {
    let dir = tempfile::tempdir().unwrap();

    let code = {
        let store = Arc::new(JsonFileStore::open(dir.path()).unwrap());
        let system = ShortenerSystem::new(store, ShortenerConfig::default());
        let code = system
            .service()
            .shorten("https://example.com/durable")
            .await
            .unwrap();
        system.shutdown().await;
        code
    };

    let store = Arc::new(JsonFileStore::open(dir.path()).unwrap());
    let system = ShortenerSystem::new(store, ShortenerConfig::default());
    assert_eq!(
        system.service().resolve(&code).await.unwrap(),
        "https://example.com/durable"
    );
    system.shutdown().await;
}

fn get(uri: &str) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .header(header::HOST, "sho.rt")
        .body(Body::empty())
        .unwrap()
}

#[tokio::test]
async fn http_boundary_maps_outcomes_to_statuses() {
    let system = ShortenerSystem::new(Arc::new(MemoryStore::new()), ShortenerConfig::default());
    let app = shortener::http::router(system.service().clone());

    let res = app.clone().oneshot(get("/")).await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let res = app
        .clone()
        .oneshot(get("/shorten?url=https://example.com/a"))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let res = app
        .clone()
        .oneshot(get("/shorten?url=not%20a%20url"))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let res = app.clone().oneshot(get("/shorten")).await.unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let res = app.clone().oneshot(get("/go/unknown1")).await.unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);

    system.shutdown().await;
}

#[tokio::test]
async fn short_url_mirrors_the_request_scheme() {
    let system = ShortenerSystem::new(Arc::new(MemoryStore::new()), ShortenerConfig::default());
    let app = shortener::http::router(system.service().clone());

    // Plain request: http.
    let res = app
        .clone()
        .oneshot(get("/shorten?url=https://example.com/a"))
        .await
        .unwrap();
    let body = axum::body::to_bytes(res.into_body(), 1024).await.unwrap();
    assert!(std::str::from_utf8(&body).unwrap().starts_with("http://sho.rt/go/"));

    // Behind a TLS-terminating proxy: https.
    let req = Request::builder()
        .uri("/shorten?url=https://example.com/b")
        .header(header::HOST, "sho.rt")
        .header("x-forwarded-proto", "https")
        .body(Body::empty())
        .unwrap();
    let res = app.oneshot(req).await.unwrap();
    let body = axum::body::to_bytes(res.into_body(), 1024).await.unwrap();
    assert!(std::str::from_utf8(&body).unwrap().starts_with("https://sho.rt/go/"));

    system.shutdown().await;
}

#[tokio::test]
async fn redirect_carries_the_stored_url() {
    let system = ShortenerSystem::new(Arc::new(MemoryStore::new()), ShortenerConfig::default());
    let code = system
        .service()
        .shorten("https://example.com/target")
        .await
        .unwrap();
    let app = shortener::http::router(system.service().clone());

    let res = app.oneshot(get(&format!("/go/{code}"))).await.unwrap();
    assert_eq!(res.status(), StatusCode::FOUND);
    assert_eq!(
        res.headers().get(header::LOCATION).unwrap(),
        "https://example.com/target"
    );

    system.shutdown().await;
}
