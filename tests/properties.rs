mod common;

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use coinx_rs::engine::refresh::RefreshLoop;
use coinx_rs::persist::memory::MemoryCoinStore;
use coinx_rs::persist::{CoinStore, Page};
use common::{raw, ScriptedFeed};
use proptest::prelude::*;

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap()
}

fn tick_strategy() -> impl Strategy<Value = Vec<(String, f64)>> {
    prop::collection::vec(("[a-e]{1,2}", -1.0e3..1.0e6f64), 0..12)
}

fn cap_strategy() -> impl Strategy<Value = f64> {
    prop_oneof![Just(0.0), Just(42.0), 0.0..1.0e12f64]
}

proptest! {
    #[test]
    fn distinct_symbols_match_everything_seen(ticks in prop::collection::vec(tick_strategy(), 1..6)) {
        let rt = runtime();
        let feed = Arc::new(ScriptedFeed::new());
        let store = Arc::new(MemoryCoinStore::new());
        let refresh = RefreshLoop::new(feed.clone(), store.clone());

        let mut seen = HashSet::new();
        let mut last_price = HashMap::new();
        for tick in ticks {
            let rows = tick.iter().map(|(s, p)| raw(s, *p, 1.0)).collect();
            feed.push_ok(rows);
            rt.block_on(refresh.run_tick());

            for (symbol, price) in tick {
                seen.insert(symbol.clone());
                last_price.insert(symbol, price);
            }

            let all = rt.block_on(store.list_coins(Page::new(0, 1000))).unwrap();
            let stored: HashSet<_> = all.iter().map(|c| c.symbol.clone()).collect();
            prop_assert_eq!(all.len(), stored.len());
            prop_assert_eq!(&stored, &seen);
        }

        for (symbol, price) in last_price {
            prop_assert_eq!(store.get(&symbol).unwrap().current_price, price);
        }
    }

    #[test]
    fn market_cap_pages_are_non_increasing(caps in prop::collection::vec(cap_strategy(), 0..40), limit in 1u32..7) {
        let rt = runtime();
        let store = MemoryCoinStore::new();
        let rows: Vec<_> = caps
            .iter()
            .enumerate()
            .map(|(i, cap)| {
                let mut row = raw(&format!("c{i}"), 1.0, *cap);
                row.last_updated = None;
                row
            })
            .collect();
        let batch = coinx_rs::market_data::normaliser::normalise_batch(rows);
        rt.block_on(store.apply_batch(&batch.coins)).unwrap();

        let mut collected = Vec::new();
        let mut skip = 0u64;
        loop {
            let page = rt.block_on(store.list_coins_by_market_cap(Page::new(skip, limit))).unwrap();
            prop_assert!(page.len() <= limit as usize);
            if page.is_empty() {
                break;
            }
            skip += page.len() as u64;
            collected.extend(page);
        }

        prop_assert_eq!(collected.len(), caps.len());
        for pair in collected.windows(2) {
            prop_assert!(pair[0].market_cap >= pair[1].market_cap);
        }
    }
}
