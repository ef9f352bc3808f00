mod common;

use std::collections::HashSet;
use std::sync::Arc;

use autoshop_service::{models::Bill, services::ShopStore};
use axum::http::StatusCode;
use chrono::{Datelike, Utc};
use common::{TestApp, VIN};
use tokio::task::JoinSet;
use uuid::Uuid;

const CONCURRENT_BILLS: usize = 20;

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_creates_get_distinct_sequential_numbers() {
    let app = Arc::new(TestApp::new());
    let owner = app.register_owner("Acme", "owner@acme.test").await;
    let shop = app.seed_shop(&owner, VIN).await;
    let year = Utc::now().year();

    let mut tasks = JoinSet::new();
    for _ in 0..CONCURRENT_BILLS {
        let app = app.clone();
        let owner = owner.clone();
        tasks.spawn(async move { app.create_bill(&owner, shop.bill("10", None)).await });
    }

    let mut numbers = HashSet::new();
    while let Some(result) = tasks.join_next().await {
        let (status, bill) = result.unwrap();
        assert_eq!(status, StatusCode::CREATED, "{bill}");
        assert!(numbers.insert(bill["billNumber"].as_str().unwrap().to_string()));
    }

    let expected: HashSet<String> = (1..=CONCURRENT_BILLS)
        .map(|n| format!("{year}-{n:04}"))
        .collect();
    assert_eq!(numbers, expected);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_organisations_do_not_share_sequences() {
    let app = Arc::new(TestApp::new());
    let acme = app.register_owner("Acme", "owner@acme.test").await;
    let globex = app.register_owner("Globex", "owner@globex.test").await;
    let acme_shop = app.seed_shop(&acme, VIN).await;
    let globex_shop = app.seed_shop(&globex, "2T1BURHE0JC123456").await;

    let mut tasks = JoinSet::new();
    for i in 0..10 {
        let app = app.clone();
        let (session, shop) = if i % 2 == 0 {
            (acme.clone(), acme_shop)
        } else {
            (globex.clone(), globex_shop)
        };
        tasks.spawn(async move {
            let (status, bill) = app.create_bill(&session, shop.bill("10", None)).await;
            assert_eq!(status, StatusCode::CREATED);
            (session.organisation_id, bill["billNumber"].as_str().unwrap().to_string())
        });
    }

    let mut seen = HashSet::new();
    while let Some(result) = tasks.join_next().await {
        assert!(seen.insert(result.unwrap()), "duplicate number within an organisation");
    }
    assert_eq!(seen.len(), 10);
}

#[tokio::test]
async fn test_collision_with_imported_number_is_retried() {
    let app = TestApp::new();
    let owner = app.register_owner("Acme", "owner@acme.test").await;
    let shop = app.seed_shop(&owner, VIN).await;
    let year = Utc::now().year();

    let (_, first) = app.create_bill(&owner, shop.bill("10", None)).await;
    assert_eq!(first["billNumber"], format!("{year}-0001"));

    // Two numbers written outside the counter, as an import would.
    let stored = app
        .store
        .find_bill(owner.organisation_id, common::id(&first))
        .await
        .unwrap()
        .unwrap();
    for n in [2, 3] {
        let mut imported = stored.clone();
        imported.bill = Bill {
            bill_id: Uuid::new_v4(),
            bill_number: format!("{year}-{n:04}"),
            ..stored.bill.clone()
        };
        imported.line_items.clear();
        app.store.seed_bill(imported).unwrap();
    }

    let (status, next) = app.create_bill(&owner, shop.bill("10", None)).await;
    assert_eq!(status, StatusCode::CREATED, "{next}");
    assert_eq!(next["billNumber"], format!("{year}-0004"));
}
