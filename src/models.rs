// src/models.rs
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A row of the `stocks` table. `stockid` is assigned by the database and
/// may be omitted from request bodies.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Stock {
    #[serde(default)]
    pub stockid: i64,
    pub name: String,
    pub price: f64,
    pub company: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct StockResponse {
    pub id: i64,
    pub message: String,
}

impl StockResponse {
    pub fn created(id: i64) -> Self {
        StockResponse {
            id,
            message: "Stock created successfully".to_string(),
        }
    }

    pub fn updated(id: i64, rows_affected: u64) -> Self {
        StockResponse {
            id,
            message: format!(
                "Stock updated successfully. Total rows/records affected {}",
                rows_affected
            ),
        }
    }

    pub fn deleted(id: i64, rows_affected: u64) -> Self {
        StockResponse {
            id,
            message: format!(
                "Stock deleted successfully. Total rows/records affected {}",
                rows_affected
            ),
        }
    }
}
