use axum::extract::rejection::QueryRejection;
use axum::extract::{Query, State};
use axum::routing::get;
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::api::error::ApiError;
use crate::api::AppState;
use crate::persist::{Coin, Page, DEFAULT_PAGE_LIMIT, MAX_PAGE_LIMIT};

#[derive(Debug, Default, Deserialize)]
pub struct PageQuery {
    skip: Option<i64>,
    limit: Option<i64>,
}

impl PageQuery {
    /// `skip >= 0` (default 0), `1 <= limit <= 1000` (default 100).
    pub fn into_page(self) -> Result<Page, ApiError> {
        let skip = self.skip.unwrap_or(0);
        let limit = self.limit.unwrap_or(i64::from(DEFAULT_PAGE_LIMIT));

        let skip = u64::try_from(skip)
            .map_err(|_| ApiError::Validation("skip must be greater than or equal to 0".to_string()))?;
        let limit = u32::try_from(limit)
            .ok()
            .filter(|l| (1..=MAX_PAGE_LIMIT).contains(l))
            .ok_or_else(|| {
                ApiError::Validation(format!("limit must be between 1 and {MAX_PAGE_LIMIT}"))
            })?;

        Ok(Page::new(skip, limit))
    }
}

fn page_from(query: Result<Query<PageQuery>, QueryRejection>) -> Result<Page, ApiError> {
    let Query(q) = query.map_err(|e| ApiError::Validation(e.body_text()))?;
    q.into_page()
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(read_root))
        .route("/health", get(health))
        .route("/coins", get(list_coins))
        .route("/coins_by_marketcap", get(list_coins_by_market_cap))
}

async fn read_root() -> Json<Value> {
    Json(json!({ "message": "API is running..." }))
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

async fn list_coins(
    State(state): State<AppState>,
    query: Result<Query<PageQuery>, QueryRejection>,
) -> Result<Json<Vec<Coin>>, ApiError> {
    let page = page_from(query)?;
    Ok(Json(state.store.list_coins(page).await?))
}

async fn list_coins_by_market_cap(
    State(state): State<AppState>,
    query: Result<Query<PageQuery>, QueryRejection>,
) -> Result<Json<Vec<Coin>>, ApiError> {
    let page = page_from(query)?;
    Ok(Json(state.store.list_coins_by_market_cap(page).await?))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn q(skip: Option<i64>, limit: Option<i64>) -> PageQuery {
        PageQuery { skip, limit }
    }

    #[test]
    fn test_defaults() {
        assert_eq!(q(None, None).into_page().unwrap(), Page::new(0, 100));
    }

    #[test]
    fn test_bounds() {
        assert_eq!(q(Some(5), Some(1)).into_page().unwrap(), Page::new(5, 1));
        assert_eq!(q(None, Some(1000)).into_page().unwrap(), Page::new(0, 1000));
        assert!(q(Some(-1), None).into_page().is_err());
        assert!(q(None, Some(0)).into_page().is_err());
        assert!(q(None, Some(1001)).into_page().is_err());
        assert!(q(None, Some(-3)).into_page().is_err());
    }
}
