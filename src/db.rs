// src/db.rs
use crate::config::Config;
use crate::models::Stock;
use log::{debug, info};
use sqlx::postgres::{PgPool, PgPoolOptions};
use std::future::Future;

const CREATE_STOCKS_TABLE: &str = "CREATE TABLE IF NOT EXISTS stocks (\
    stockid BIGSERIAL PRIMARY KEY, \
    name TEXT NOT NULL, \
    price DOUBLE PRECISION NOT NULL, \
    company TEXT NOT NULL)";

const SELECT_COLUMNS: &str =
    "SELECT stockid::BIGINT AS stockid, name, price::FLOAT8 AS price, company FROM stocks";

pub async fn init(config: &Config) -> Result<PgPool, sqlx::Error> {
    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .acquire_timeout(config.acquire_timeout)
        .connect(&config.database_url)
        .await?;

    sqlx::query(CREATE_STOCKS_TABLE).execute(&pool).await?;

    info!("Successfully connected to PostgreSQL.");
    Ok(pool)
}

/// Storage operations behind the HTTP handlers. Each call is one statement.
pub trait StockStore: Send + Sync + 'static {
    fn insert_stock(&self, stock: Stock) -> impl Future<Output = Result<i64, sqlx::Error>> + Send;

    /// `Ok(None)` when no row has this id.
    fn get_stock(&self, id: i64) -> impl Future<Output = Result<Option<Stock>, sqlx::Error>> + Send;

    fn get_stocks(&self) -> impl Future<Output = Result<Vec<Stock>, sqlx::Error>> + Send;

    /// Returns the number of rows changed.
    fn update_stock(
        &self,
        id: i64,
        stock: Stock,
    ) -> impl Future<Output = Result<u64, sqlx::Error>> + Send;

    /// Returns the number of rows removed.
    fn delete_stock(&self, id: i64) -> impl Future<Output = Result<u64, sqlx::Error>> + Send;
}

#[derive(Clone)]
pub struct PgStockStore {
    pool: PgPool,
}

impl PgStockStore {
    pub fn new(pool: PgPool) -> Self {
        PgStockStore { pool }
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}

impl StockStore for PgStockStore {
    async fn insert_stock(&self, stock: Stock) -> Result<i64, sqlx::Error> {
        let id: i64 = sqlx::query_scalar(
            "INSERT INTO stocks (name, price, company) VALUES ($1, $2, $3) RETURNING stockid::BIGINT",
        )
        .bind(&stock.name)
        .bind(stock.price)
        .bind(&stock.company)
        .fetch_one(&self.pool)
        .await?;

        debug!("Inserted single record {}", id);
        Ok(id)
    }

    async fn get_stock(&self, id: i64) -> Result<Option<Stock>, sqlx::Error> {
        let sql = format!("{} WHERE stockid = $1", SELECT_COLUMNS);
        let stock = sqlx::query_as::<_, Stock>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        if stock.is_none() {
            debug!("No rows were returned for stock {}", id);
        }
        Ok(stock)
    }

    async fn get_stocks(&self) -> Result<Vec<Stock>, sqlx::Error> {
        let sql = format!("{} ORDER BY stockid", SELECT_COLUMNS);
        let stocks = sqlx::query_as::<_, Stock>(&sql)
            .fetch_all(&self.pool)
            .await?;

        debug!("Fetched {} stocks", stocks.len());
        Ok(stocks)
    }

    async fn update_stock(&self, id: i64, stock: Stock) -> Result<u64, sqlx::Error> {
        let result =
            sqlx::query("UPDATE stocks SET name = $2, price = $3, company = $4 WHERE stockid = $1")
                .bind(id)
                .bind(&stock.name)
                .bind(stock.price)
                .bind(&stock.company)
                .execute(&self.pool)
                .await?;

        debug!("Total rows/records affected {}", result.rows_affected());
        Ok(result.rows_affected())
    }

    async fn delete_stock(&self, id: i64) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM stocks WHERE stockid = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        debug!("Total rows/records affected {}", result.rows_affected());
        Ok(result.rows_affected())
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::StockStore;
    use crate::models::Stock;
    use std::collections::BTreeMap;
    use std::sync::Mutex;

    /// Keeps rows in a map with a counter standing in for BIGSERIAL.
    #[derive(Default)]
    pub struct MemoryStore {
        rows: Mutex<(i64, BTreeMap<i64, Stock>)>,
    }

    impl StockStore for MemoryStore {
        async fn insert_stock(&self, mut stock: Stock) -> Result<i64, sqlx::Error> {
            let mut guard = self.rows.lock().unwrap();
            guard.0 += 1;
            let id = guard.0;
            stock.stockid = id;
            guard.1.insert(id, stock);
            Ok(id)
        }

        async fn get_stock(&self, id: i64) -> Result<Option<Stock>, sqlx::Error> {
            Ok(self.rows.lock().unwrap().1.get(&id).cloned())
        }

        async fn get_stocks(&self) -> Result<Vec<Stock>, sqlx::Error> {
            Ok(self.rows.lock().unwrap().1.values().cloned().collect())
        }

        async fn update_stock(&self, id: i64, mut stock: Stock) -> Result<u64, sqlx::Error> {
            let mut guard = self.rows.lock().unwrap();
            match guard.1.get_mut(&id) {
                Some(row) => {
                    stock.stockid = id;
                    *row = stock;
                    Ok(1)
                }
                None => Ok(0),
            }
        }

        async fn delete_stock(&self, id: i64) -> Result<u64, sqlx::Error> {
            Ok(self.rows.lock().unwrap().1.remove(&id).map_or(0, |_| 1))
        }
    }

    /// Fails every call as if the pool could not hand out a connection.
    pub struct FailingStore;

    impl StockStore for FailingStore {
        async fn insert_stock(&self, _stock: Stock) -> Result<i64, sqlx::Error> {
            Err(sqlx::Error::PoolTimedOut)
        }

        async fn get_stock(&self, _id: i64) -> Result<Option<Stock>, sqlx::Error> {
            Err(sqlx::Error::PoolTimedOut)
        }

        async fn get_stocks(&self) -> Result<Vec<Stock>, sqlx::Error> {
            Err(sqlx::Error::PoolTimedOut)
        }

        async fn update_stock(&self, _id: i64, _stock: Stock) -> Result<u64, sqlx::Error> {
            Err(sqlx::Error::PoolTimedOut)
        }

        async fn delete_stock(&self, _id: i64) -> Result<u64, sqlx::Error> {
            Err(sqlx::Error::PoolTimedOut)
        }
    }
}
