//! Needs a real Postgres, so every test is ignored by default. Run with
//! `COINX_TEST_DATABASE_URL=postgres://... cargo test --test postgres -- --ignored`.
//! Each test works in its own throwaway schema.

use std::sync::atomic::{AtomicUsize, Ordering};

use chrono::NaiveDate;
use coinx_rs::persist::postgres::{upsert, PostgresCoinStore};
use coinx_rs::persist::{CoinStore, NewCoin, Page};
use sqlx::postgres::{PgConnectOptions, PgPoolOptions};
use sqlx::Executor;

static SCHEMA_SEQ: AtomicUsize = AtomicUsize::new(0);

const NEEDS_DB: &str = "set COINX_TEST_DATABASE_URL to run the Postgres tests";

async fn isolated_store() -> PostgresCoinStore {
    let url = std::env::var("COINX_TEST_DATABASE_URL").expect(NEEDS_DB);
    let schema = format!(
        "coinx_test_{}_{}",
        std::process::id(),
        SCHEMA_SEQ.fetch_add(1, Ordering::SeqCst)
    );

    let admin = PgPoolOptions::new().max_connections(1).connect(&url).await.unwrap();
    admin
        .execute(format!("DROP SCHEMA IF EXISTS {schema} CASCADE; CREATE SCHEMA {schema}").as_str())
        .await
        .unwrap();

    let opts: PgConnectOptions = url.parse().unwrap();
    let pool = PgPoolOptions::new()
        .max_connections(2)
        .connect_with(opts.options([("search_path", schema.as_str())]))
        .await
        .unwrap();

    let store = PostgresCoinStore::from_pool(pool);
    store.migrate().await.unwrap();
    store
}

fn coin(symbol: &str, price: f64, cap: f64) -> NewCoin {
    NewCoin {
        name: symbol.to_uppercase(),
        symbol: symbol.to_string(),
        current_price: price,
        market_cap: cap,
        change_24h: 0.0,
        last_updated: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap().and_hms_opt(0, 0, 0).unwrap(),
    }
}

#[tokio::test]
#[ignore = "needs COINX_TEST_DATABASE_URL"]
async fn test_migrate_is_idempotent() {
    let store = isolated_store().await;
    store.migrate().await.unwrap();
    store.migrate().await.unwrap();
    assert!(store.list_coins(Page::default()).await.unwrap().is_empty());
}

#[tokio::test]
#[ignore = "needs COINX_TEST_DATABASE_URL"]
async fn test_upsert_by_symbol() {
    let store = isolated_store().await;

    store.apply_batch(&[coin("btc", 100.0, 5.0)]).await.unwrap();
    let first = store.list_coins(Page::default()).await.unwrap();
    store.apply_batch(&[coin("btc", 200.0, 6.0)]).await.unwrap();
    let second = store.list_coins(Page::default()).await.unwrap();

    assert_eq!(second.len(), 1);
    assert_eq!(second[0].id, first[0].id);
    assert_eq!(second[0].current_price, 200.0);
    assert_eq!(second[0].market_cap, 6.0);
}

#[tokio::test]
#[ignore = "needs COINX_TEST_DATABASE_URL"]
async fn test_upsert_does_not_commit() {
    let store = isolated_store().await;

    let mut tx = store.pool().begin().await.unwrap();
    let stored = upsert(&mut tx, &coin("eth", 1.0, 1.0)).await.unwrap();
    assert_eq!(stored.symbol, "eth");
    drop(tx);

    assert!(store.list_coins(Page::default()).await.unwrap().is_empty());
}

#[tokio::test]
#[ignore = "needs COINX_TEST_DATABASE_URL"]
async fn test_market_cap_order_and_pages() {
    let store = isolated_store().await;
    store
        .apply_batch(&[coin("a", 1.0, 10.0), coin("b", 1.0, 30.0), coin("c", 1.0, 0.0), coin("d", 1.0, 30.0)])
        .await
        .unwrap();

    let rows = store.list_coins_by_market_cap(Page::default()).await.unwrap();
    let symbols: Vec<_> = rows.iter().map(|c| c.symbol.as_str()).collect();
    assert_eq!(symbols, ["b", "d", "a", "c"]);

    let page = store.list_coins_by_market_cap(Page::new(1, 2)).await.unwrap();
    let symbols: Vec<_> = page.iter().map(|c| c.symbol.as_str()).collect();
    assert_eq!(symbols, ["d", "a"]);
}
