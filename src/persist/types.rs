use chrono::NaiveDateTime;
use serde::Serialize;

#[derive(Debug, thiserror::Error)]
pub enum PersistError {
    #[error("could not connect to store: {0}")]
    Connect(#[source] sqlx::Error),
    #[error("schema migration failed: {0}")]
    Migrate(#[source] sqlx::Error),
    #[error("query failed: {0}")]
    Query(#[source] sqlx::Error),
    #[error("batch commit failed: {0}")]
    Commit(String),
}

pub type PersistResult<T> = Result<T, PersistError>;

/// A stored coin row. `id` is the surrogate key handed out on first insert,
/// `symbol` is the natural key every upsert merges on.
#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
pub struct Coin {
    pub id: i32,
    pub name: String,
    pub symbol: String,
    pub current_price: f64,
    pub market_cap: f64,
    pub change_24h: f64,
    pub last_updated: NaiveDateTime,
}

/// Canonical record produced by the normaliser, ready to be upserted.
#[derive(Debug, Clone, PartialEq)]
pub struct NewCoin {
    pub name: String,
    pub symbol: String,
    pub current_price: f64,
    pub market_cap: f64,
    pub change_24h: f64,
    /// Naive wall time in UTC.
    pub last_updated: NaiveDateTime,
}

impl NewCoin {
    /// Overwrite every mutable column of `row`; `id` and `symbol` are left alone.
    pub fn merge_into(&self, row: &mut Coin) {
        row.name = self.name.clone();
        row.current_price = self.current_price;
        row.market_cap = self.market_cap;
        row.change_24h = self.change_24h;
        row.last_updated = self.last_updated;
    }

    pub fn into_coin(self, id: i32) -> Coin {
        Coin {
            id,
            name: self.name,
            symbol: self.symbol,
            current_price: self.current_price,
            market_cap: self.market_cap,
            change_24h: self.change_24h,
            last_updated: self.last_updated,
        }
    }
}

pub const DEFAULT_PAGE_LIMIT: u32 = 100;
pub const MAX_PAGE_LIMIT: u32 = 1000;

/// Offset pagination window for the read queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub skip: u64,
    pub limit: u32,
}

impl Page {
    pub fn new(skip: u64, limit: u32) -> Self {
        Self { skip, limit }
    }

    pub(crate) fn offset_i64(&self) -> i64 {
        i64::try_from(self.skip).unwrap_or(i64::MAX)
    }

    pub(crate) fn limit_i64(&self) -> i64 {
        i64::from(self.limit)
    }
}

impl Default for Page {
    fn default() -> Self {
        Self { skip: 0, limit: DEFAULT_PAGE_LIMIT }
    }
}
