//! Code allocation: uniqueness under heavy concurrency, bounded retries, and
//! the no-allocation-on-invalid-input guarantee.

use shortener::error::ShortenerError;
use shortener::lifecycle::{ShortenerConfig, ShortenerSystem};
use shortener::model::ShortCode;
use shortener::store::MemoryStore;
use std::collections::HashSet;
use std::sync::Arc;

#[tokio::test]
async fn concurrent_allocations_yield_distinct_codes() {
    let system = ShortenerSystem::new(Arc::new(MemoryStore::new()), ShortenerConfig::default());

    let mut tasks = tokio::task::JoinSet::new();
    for i in 0..10_000u32 {
        let service = system.service().clone();
        tasks.spawn(async move { service.shorten(&format!("https://example.com/{i}")).await });
    }

    let mut codes = HashSet::new();
    while let Some(result) = tasks.join_next().await {
        let code = result.unwrap().unwrap();
        assert!(codes.insert(code), "allocator handed out a duplicate code");
    }
    assert_eq!(codes.len(), 10_000);

    system.shutdown().await;
}

#[tokio::test]
async fn allocation_fails_bounded_when_the_space_is_full() {
    // One-character codes give a 62-candidate space; fill it completely so
    // every attempt must collide.
    let system = ShortenerSystem::new(
        Arc::new(MemoryStore::new()),
        ShortenerConfig {
            code_length: 1,
            allocation_attempts: 5,
            ..ShortenerConfig::default()
        },
    );

    let alphabet = ('a'..='z').chain('A'..='Z').chain('0'..='9');
    for c in alphabet {
        let key = ShortCode::new(c.to_string());
        system
            .registry()
            .set_url(&key, "https://example.com/taken".to_string())
            .await
            .unwrap();
    }

    let err = system.service().shorten("https://example.com/fresh").await;
    assert!(matches!(
        err,
        Err(ShortenerError::AllocationExhausted { attempts: 5 })
    ));

    system.shutdown().await;
}

#[tokio::test]
async fn invalid_url_allocates_nothing() {
    let store = Arc::new(MemoryStore::new());
    let system = ShortenerSystem::new(store.clone(), ShortenerConfig::default());

    let err = system.service().shorten("not a url").await;
    assert!(matches!(err, Err(ShortenerError::InvalidUrl(_))));

    // Validation happens before allocation: no record, no instance.
    assert!(store.is_empty());
    assert_eq!(system.registry().active_instances(), 0);

    system.shutdown().await;
}
