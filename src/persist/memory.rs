//! In-process `CoinStore` with the same upsert and ordering rules as the
//! Postgres store. Used by `coinx serve --store memory` and by the tests.
//!
//! A batch is staged on a private copy of the table and swapped in at commit,
//! so readers only ever see whole batches. Ids come from a store-wide sequence
//! that a failed batch does not roll back, like a Postgres `SERIAL`.

use std::sync::atomic::{AtomicBool, AtomicI32, Ordering};

use ahash::AHashMap;
use async_trait::async_trait;
use ordered_float::OrderedFloat;
use parking_lot::{RwLock, RwLockUpgradableReadGuard};
use tracing::{debug, instrument};

use crate::persist::{Coin, CoinStore, NewCoin, Page, PersistError, PersistResult};

#[derive(Debug, Clone)]
struct Table {
    rows: Vec<Coin>,
    by_symbol: AHashMap<String, usize>,
}

impl Table {
    fn new() -> Self {
        Self { rows: Vec::new(), by_symbol: AHashMap::new() }
    }

    fn upsert(&mut self, coin: &NewCoin, ids: &AtomicI32) -> Coin {
        if let Some(&idx) = self.by_symbol.get(&coin.symbol) {
            let row = &mut self.rows[idx];
            coin.merge_into(row);
            return row.clone();
        }

        let id = ids.fetch_add(1, Ordering::SeqCst);
        let row = coin.clone().into_coin(id);
        self.by_symbol.insert(row.symbol.clone(), self.rows.len());
        self.rows.push(row.clone());
        row
    }

    fn window<'a>(rows: impl Iterator<Item = &'a Coin>, page: Page) -> Vec<Coin> {
        let skip = usize::try_from(page.skip).unwrap_or(usize::MAX);
        rows.skip(skip).take(page.limit as usize).cloned().collect()
    }
}

#[derive(Debug)]
pub struct MemoryCoinStore {
    table: RwLock<Table>,
    next_id: AtomicI32,
    fail_next_commit: AtomicBool,
}

impl MemoryCoinStore {
    pub fn new() -> Self {
        Self {
            table: RwLock::new(Table::new()),
            next_id: AtomicI32::new(1),
            fail_next_commit: AtomicBool::new(false),
        }
    }

    /// Make the next `apply_batch` discard its staged rows and report a commit
    /// failure, the way a dropped Postgres connection would.
    pub fn fail_next_commit(&self) {
        self.fail_next_commit.store(true, Ordering::SeqCst);
    }

    pub fn len(&self) -> usize {
        self.table.read().rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn get(&self, symbol: &str) -> Option<Coin> {
        let table = self.table.read();
        table.by_symbol.get(symbol).map(|&idx| table.rows[idx].clone())
    }
}

impl Default for MemoryCoinStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CoinStore for MemoryCoinStore {
    async fn migrate(&self) -> PersistResult<()> {
        Ok(())
    }

    #[instrument(level = "debug", skip_all, fields(batch = coins.len()))]
    async fn apply_batch(&self, coins: &[NewCoin]) -> PersistResult<usize> {
        // Upgradable guard: readers keep going while we stage, other writers wait.
        let guard = self.table.upgradable_read();
        let mut staged = (*guard).clone();
        for coin in coins {
            let row = staged.upsert(coin, &self.next_id);
            debug!(symbol = %row.symbol, id = row.id, "staged upsert");
        }

        if self.fail_next_commit.swap(false, Ordering::SeqCst) {
            return Err(PersistError::Commit("injected commit failure".to_string()));
        }

        let mut table = RwLockUpgradableReadGuard::upgrade(guard);
        *table = staged;
        Ok(coins.len())
    }

    async fn list_coins(&self, page: Page) -> PersistResult<Vec<Coin>> {
        let table = self.table.read();
        Ok(Table::window(table.rows.iter(), page))
    }

    async fn list_coins_by_market_cap(&self, page: Page) -> PersistResult<Vec<Coin>> {
        let table = self.table.read();
        let mut ordered: Vec<&Coin> = table.rows.iter().collect();
        ordered.sort_by_key(|c| (std::cmp::Reverse(OrderedFloat(c.market_cap)), c.id));
        Ok(Table::window(ordered.into_iter(), page))
    }
}
