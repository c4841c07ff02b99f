use async_trait::async_trait;
use sqlx::postgres::{PgConnection, PgPool, PgPoolOptions};
use tracing::{debug, info, instrument};

use crate::persist::{Coin, CoinStore, NewCoin, Page, PersistError, PersistResult};

const CREATE_COINS_TABLE: &str = r#"
    CREATE TABLE IF NOT EXISTS coins (
        id            SERIAL PRIMARY KEY,
        name          TEXT NOT NULL,
        symbol        TEXT NOT NULL UNIQUE,
        current_price DOUBLE PRECISION NOT NULL,
        market_cap    DOUBLE PRECISION NOT NULL,
        change_24h    DOUBLE PRECISION NOT NULL,
        last_updated  TIMESTAMP NOT NULL
    )
"#;

const CREATE_NAME_INDEX: &str = "CREATE INDEX IF NOT EXISTS ix_coins_name ON coins (name)";

pub struct PostgresCoinStore {
    connection_pool: PgPool,
}

impl PostgresCoinStore {
    pub async fn connect(database_url: &str, max_connections: u32) -> PersistResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await
            .map_err(PersistError::Connect)?;
        Ok(Self::from_pool(pool))
    }

    pub fn from_pool(pool: PgPool) -> Self {
        Self { connection_pool: pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.connection_pool
    }
}

/// Insert-or-update one coin keyed on `symbol`, on a connection that is
/// usually inside an open transaction. Never commits; the caller owns the
/// transaction boundary.
///
/// Two concurrent callers upserting the same new symbol will race on the
/// unique constraint. The refresh loop is the only writer, which is what
/// keeps this safe.
pub async fn upsert(conn: &mut PgConnection, coin: &NewCoin) -> PersistResult<Coin> {
    let existing = sqlx::query_as::<_, Coin>(
        r#"
        SELECT id, name, symbol, current_price, market_cap, change_24h, last_updated
        FROM coins
        WHERE symbol = $1
        "#,
    )
    .bind(&coin.symbol)
    .fetch_optional(&mut *conn)
    .await
    .map_err(PersistError::Query)?;

    let stored = match existing {
        Some(row) => {
            sqlx::query_as::<_, Coin>(
                r#"
                UPDATE coins
                SET name = $1, current_price = $2, market_cap = $3, change_24h = $4, last_updated = $5
                WHERE id = $6
                RETURNING id, name, symbol, current_price, market_cap, change_24h, last_updated
                "#,
            )
            .bind(&coin.name)
            .bind(coin.current_price)
            .bind(coin.market_cap)
            .bind(coin.change_24h)
            .bind(coin.last_updated)
            .bind(row.id)
            .fetch_one(&mut *conn)
            .await
            .map_err(PersistError::Query)?
        }
        None => {
            sqlx::query_as::<_, Coin>(
                r#"
                INSERT INTO coins (name, symbol, current_price, market_cap, change_24h, last_updated)
                VALUES ($1, $2, $3, $4, $5, $6)
                RETURNING id, name, symbol, current_price, market_cap, change_24h, last_updated
                "#,
            )
            .bind(&coin.name)
            .bind(&coin.symbol)
            .bind(coin.current_price)
            .bind(coin.market_cap)
            .bind(coin.change_24h)
            .bind(coin.last_updated)
            .fetch_one(&mut *conn)
            .await
            .map_err(PersistError::Query)?
        }
    };

    debug!(symbol = %stored.symbol, id = stored.id, "upserted coin");
    Ok(stored)
}

#[async_trait]
impl CoinStore for PostgresCoinStore {
    async fn migrate(&self) -> PersistResult<()> {
        sqlx::query(CREATE_COINS_TABLE)
            .execute(&self.connection_pool)
            .await
            .map_err(PersistError::Migrate)?;
        sqlx::query(CREATE_NAME_INDEX)
            .execute(&self.connection_pool)
            .await
            .map_err(PersistError::Migrate)?;
        info!("coins table ready");
        Ok(())
    }

    #[instrument(level = "debug", skip_all, fields(batch = coins.len()))]
    async fn apply_batch(&self, coins: &[NewCoin]) -> PersistResult<usize> {
        let mut tx = self.connection_pool.begin().await.map_err(PersistError::Query)?;

        // An error here drops `tx`, which rolls the whole batch back.
        for coin in coins {
            upsert(&mut *tx, coin).await?;
        }

        tx.commit().await.map_err(|e| PersistError::Commit(e.to_string()))?;
        Ok(coins.len())
    }

    async fn list_coins(&self, page: Page) -> PersistResult<Vec<Coin>> {
        sqlx::query_as::<_, Coin>(
            r#"
            SELECT id, name, symbol, current_price, market_cap, change_24h, last_updated
            FROM coins
            ORDER BY id
            OFFSET $1
            LIMIT $2
            "#,
        )
        .bind(page.offset_i64())
        .bind(page.limit_i64())
        .fetch_all(&self.connection_pool)
        .await
        .map_err(PersistError::Query)
    }

    async fn list_coins_by_market_cap(&self, page: Page) -> PersistResult<Vec<Coin>> {
        sqlx::query_as::<_, Coin>(
            r#"
            SELECT id, name, symbol, current_price, market_cap, change_24h, last_updated
            FROM coins
            ORDER BY market_cap DESC, id ASC
            OFFSET $1
            LIMIT $2
            "#,
        )
        .bind(page.offset_i64())
        .bind(page.limit_i64())
        .fetch_all(&self.connection_pool)
        .await
        .map_err(PersistError::Query)
    }
}
