//! Entitlement checks over real HTTP transports.
//!
//! Run with: cargo test -p account-sdk-integration-tests

use std::sync::{Arc, Mutex};

use account_sdk::{Monetization, MonetizationEvent, MonetizationPayload, Platform, SdkError};
use account_sdk_integration_tests::FakeProvider;
use serde_json::json;

fn monetization(provider: &FakeProvider) -> Monetization {
    let config = provider.config();
    let transports = config.transports().expect("Failed to build transports");
    Monetization::new(&config, &transports, &Platform::headless("news.example.com"))
}

#[tokio::test]
async fn test_access_is_cached_regardless_of_product_order() {
    let provider = FakeProvider::start().await;
    provider.set_access(
        "digital,print",
        json!({ "entitled": true, "ttl": 60, "productIds": ["digital", "print"] }),
    );
    let monetization = monetization(&provider);

    let granted = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&granted);
    monetization.on(MonetizationEvent::HasAccess, move |payload| {
        if let MonetizationPayload::Access { ids, .. } = payload {
            sink.lock().expect("granted lock").push(ids.clone());
        }
    });

    let first = monetization
        .has_access(&["print", "digital"], "42")
        .await
        .expect("first check")
        .expect("entitled");
    let second = monetization
        .has_access(&["digital", "print"], "42")
        .await
        .expect("second check");

    assert_eq!(Some(first), second);
    assert_eq!(provider.hits("/hasAccess/digital,print"), 1);
    assert_eq!(
        *granted.lock().expect("granted lock"),
        vec![
            vec!["digital".to_string(), "print".to_string()],
            vec!["digital".to_string(), "print".to_string()],
        ]
    );
}

#[tokio::test]
async fn test_not_entitled_returns_none() {
    let provider = FakeProvider::start().await;
    provider.set_access("digital", json!({ "entitled": false, "ttl": 60 }));
    let monetization = monetization(&provider);

    let record = monetization
        .has_access(&["digital"], "42")
        .await
        .expect("check");
    assert!(record.is_none());
}

#[tokio::test]
async fn test_clearing_forces_a_new_check() {
    let provider = FakeProvider::start().await;
    provider.set_access("digital", json!({ "entitled": true, "ttl": 600 }));
    let monetization = monetization(&provider);

    monetization.has_access(&["digital"], "42").await.expect("first");
    monetization.clear_cached_access_result(&["digital"], "42");
    monetization.has_access(&["digital"], "42").await.expect("second");

    assert_eq!(provider.hits("/hasAccess/digital"), 2);
}

#[tokio::test]
async fn test_cache_is_per_user() {
    let provider = FakeProvider::start().await;
    provider.set_access("digital", json!({ "entitled": true, "ttl": 600 }));
    let monetization = monetization(&provider);

    monetization.has_access(&["digital"], "42").await.expect("user 42");
    monetization.has_access(&["digital"], "43").await.expect("user 43");

    assert_eq!(provider.hits("/hasAccess/digital"), 2);
}

#[tokio::test]
async fn test_service_failure_is_reported() {
    let provider = FakeProvider::start().await;
    let monetization = monetization(&provider);

    let errors = Arc::new(Mutex::new(0_usize));
    let sink = Arc::clone(&errors);
    monetization.on(MonetizationEvent::Error, move |_| {
        *sink.lock().expect("errors lock") += 1;
    });

    let err = monetization
        .has_access(&["unknown"], "42")
        .await
        .expect_err("should fail");
    assert!(matches!(err, SdkError::AccessFetchFailed(_)));
    assert_eq!(*errors.lock().expect("errors lock"), 1);
}

#[tokio::test]
async fn test_missing_user_is_rejected_without_a_request() {
    let provider = FakeProvider::start().await;
    let monetization = monetization(&provider);

    let err = monetization
        .has_access(&["digital"], "")
        .await
        .expect_err("should fail");
    assert!(matches!(err, SdkError::InvalidArgument(_)));
    assert_eq!(provider.hits("/hasAccess/digital"), 0);
}
