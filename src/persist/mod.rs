pub mod types;
pub use types::*;
pub mod memory;
pub mod postgres;
use async_trait::async_trait;

/// Storage shared between the refresh loop (sole writer) and the read API.
#[async_trait]
pub trait CoinStore: Send + Sync {
    /// Idempotent "create if missing" schema step, run once at startup.
    async fn migrate(&self) -> PersistResult<()>;

    /// Upsert every coin, in order, inside one atomic unit and commit once.
    /// Either all of them become visible or none do.
    async fn apply_batch(&self, coins: &[NewCoin]) -> PersistResult<usize>;

    /// Rows in insertion order.
    async fn list_coins(&self, page: Page) -> PersistResult<Vec<Coin>>;

    /// Rows by `market_cap` descending, ties by `id`.
    async fn list_coins_by_market_cap(&self, page: Page) -> PersistResult<Vec<Coin>>;
}
