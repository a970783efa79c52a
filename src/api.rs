// src/api.rs
use crate::db::StockStore;
use crate::error::{handle_rejection, ApiError};
use crate::models::{Stock, StockResponse};
use log::{error, info};
use std::convert::Infallible;
use std::sync::Arc;
use warp::http::{Method, StatusCode};
use warp::{Filter, Rejection, Reply};

const MAX_BODY_BYTES: u64 = 16 * 1024;

/// The full HTTP surface: stock routes, CORS, JSON error recovery and access
/// logging.
pub fn routes<S: StockStore>(
    store: Arc<S>,
) -> impl Filter<Extract = impl Reply, Error = Infallible> + Clone {
    let cors = warp::cors()
        .allow_any_origin()
        .allow_methods(vec!["GET", "POST", "PUT", "DELETE", "OPTIONS"])
        .allow_header("content-type");

    stock_routes(store)
        .or(preflight())
        .with(cors)
        .recover(handle_rejection)
        .with(warp::log("stock_api"))
}

fn stock_routes<S: StockStore>(
    store: Arc<S>,
) -> impl Filter<Extract = impl Reply, Error = Rejection> + Clone {
    let get = warp::path!("api" / "stocks" / String)
        .and(warp::get())
        .and(with_store(store.clone()))
        .and_then(get_stock_handler::<S>);

    let list = warp::path!("api" / "stocks")
        .and(warp::get())
        .and(with_store(store.clone()))
        .and_then(get_stocks_handler::<S>);

    let create = warp::path!("api" / "newstock")
        .and(warp::post())
        .and(with_store(store.clone()))
        .and(json_body())
        .and_then(create_stock_handler::<S>);

    let update = warp::path!("api" / "stocks" / String)
        .and(warp::put())
        .and(with_store(store.clone()))
        .and(json_body())
        .and_then(update_stock_handler::<S>);

    let delete = warp::path!("api" / "deletestock" / String)
        .and(warp::delete())
        .and(with_store(store))
        .and_then(delete_stock_handler::<S>);

    get.or(list).or(create).or(update).or(delete)
}

/// Bare OPTIONS requests on the stock paths that are not real CORS preflights
/// still get a 200. Other methods fall through as not found.
fn preflight() -> impl Filter<Extract = impl Reply, Error = Rejection> + Clone {
    let stock = warp::path!("api" / "stocks" / String)
        .map(|_: String| ())
        .untuple_one();
    let stocks = warp::path!("api" / "stocks");
    let new_stock = warp::path!("api" / "newstock");
    let delete_stock = warp::path!("api" / "deletestock" / String)
        .map(|_: String| ())
        .untuple_one();

    stock
        .or(stocks)
        .unify()
        .or(new_stock)
        .unify()
        .or(delete_stock)
        .unify()
        .and(warp::method())
        .and_then(|method: Method| async move {
            if method == Method::OPTIONS {
                Ok(StatusCode::OK)
            } else {
                Err(warp::reject::not_found())
            }
        })
}

fn with_store<S: StockStore>(
    store: Arc<S>,
) -> impl Filter<Extract = (Arc<S>,), Error = Infallible> + Clone {
    warp::any().map(move || store.clone())
}

fn json_body() -> impl Filter<Extract = (Stock,), Error = Rejection> + Clone {
    warp::body::content_length_limit(MAX_BODY_BYTES).and(warp::body::json())
}

fn parse_id(raw: &str) -> Result<i64, Rejection> {
    raw.parse::<i64>().map_err(|_| {
        warp::reject::custom(ApiError::BadRequest(format!(
            "Unable to convert id {:?}",
            raw
        )))
    })
}

fn storage_rejection(context: &str, e: sqlx::Error) -> Rejection {
    error!("{}: {}", context, e);
    warp::reject::custom(ApiError::Storage(e))
}

async fn create_stock_handler<S: StockStore>(
    store: Arc<S>,
    stock: Stock,
) -> Result<impl Reply, Rejection> {
    match store.insert_stock(stock).await {
        Ok(id) => {
            info!("Stock {} created.", id);
            Ok(warp::reply::with_status(
                warp::reply::json(&StockResponse::created(id)),
                StatusCode::CREATED,
            ))
        }
        Err(e) => Err(storage_rejection("Failed to create stock", e)),
    }
}

async fn get_stock_handler<S: StockStore>(
    id: String,
    store: Arc<S>,
) -> Result<impl Reply, Rejection> {
    let id = parse_id(&id)?;
    match store.get_stock(id).await {
        Ok(Some(stock)) => Ok(warp::reply::json(&stock)),
        Ok(None) => {
            info!("Stock {} not found.", id);
            Err(warp::reject::custom(ApiError::NotFound))
        }
        Err(e) => Err(storage_rejection("Failed to retrieve stock", e)),
    }
}

async fn get_stocks_handler<S: StockStore>(store: Arc<S>) -> Result<impl Reply, Rejection> {
    match store.get_stocks().await {
        Ok(stocks) => Ok(warp::reply::json(&stocks)),
        Err(e) => Err(storage_rejection("Failed to list stocks", e)),
    }
}

async fn update_stock_handler<S: StockStore>(
    id: String,
    store: Arc<S>,
    stock: Stock,
) -> Result<impl Reply, Rejection> {
    let id = parse_id(&id)?;
    match store.update_stock(id, stock).await {
        Ok(rows) => {
            info!("Stock {} updated, {} row(s) affected.", id, rows);
            Ok(warp::reply::json(&StockResponse::updated(id, rows)))
        }
        Err(e) => Err(storage_rejection("Failed to update stock", e)),
    }
}

async fn delete_stock_handler<S: StockStore>(
    id: String,
    store: Arc<S>,
) -> Result<impl Reply, Rejection> {
    let id = parse_id(&id)?;
    match store.delete_stock(id).await {
        Ok(rows) => {
            info!("Stock {} deleted, {} row(s) affected.", id, rows);
            Ok(warp::reply::json(&StockResponse::deleted(id, rows)))
        }
        Err(e) => Err(storage_rejection("Failed to delete stock", e)),
    }
}
