// src/error.rs
use log::error;
use serde::Serialize;
use std::convert::Infallible;
use thiserror::Error;
use warp::http::StatusCode;
use warp::reject::Reject;
use warp::{Rejection, Reply};

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),
    #[error("stock not found")]
    NotFound,
    #[error("storage error: {0}")]
    Storage(#[from] sqlx::Error),
}

impl Reject for ApiError {}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound => StatusCode::NOT_FOUND,
            ApiError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

#[derive(Serialize)]
struct ErrorMessage {
    code: u16,
    message: String,
}

fn error_reply(status: StatusCode, message: impl Into<String>) -> warp::reply::Response {
    let body = ErrorMessage {
        code: status.as_u16(),
        message: message.into(),
    };
    warp::reply::with_status(warp::reply::json(&body), status).into_response()
}

/// Turns every rejection into a JSON reply. Storage details are logged where
/// the failure happens and never reach the client.
pub async fn handle_rejection(err: Rejection) -> Result<impl Reply, Infallible> {
    if let Some(api_error) = err.find::<ApiError>() {
        let status = api_error.status();
        let reply = match api_error {
            ApiError::BadRequest(message) => error_reply(status, message.as_str()),
            ApiError::NotFound => {
                warp::reply::with_status(warp::reply::json(&serde_json::Value::Null), status)
                    .into_response()
            }
            ApiError::Storage(_) => error_reply(status, "Internal Server Error"),
        };
        return Ok(reply);
    }

    let reply = if let Some(e) = err.find::<warp::filters::body::BodyDeserializeError>() {
        error_reply(
            StatusCode::BAD_REQUEST,
            format!("Unable to decode request body: {}", e),
        )
    } else if err.find::<warp::reject::LengthRequired>().is_some() {
        error_reply(StatusCode::LENGTH_REQUIRED, "Content-Length required")
    } else if err.find::<warp::reject::PayloadTooLarge>().is_some() {
        error_reply(StatusCode::PAYLOAD_TOO_LARGE, "Payload too large")
    } else if err.find::<warp::reject::UnsupportedMediaType>().is_some() {
        error_reply(
            StatusCode::UNSUPPORTED_MEDIA_TYPE,
            "Expected application/json",
        )
    } else if let Some(e) = err.find::<warp::cors::CorsForbidden>() {
        error_reply(StatusCode::FORBIDDEN, e.to_string())
    } else if err.find::<warp::reject::MethodNotAllowed>().is_some() {
        error_reply(StatusCode::METHOD_NOT_ALLOWED, "Method Not Allowed")
    } else if err.is_not_found() {
        error_reply(StatusCode::NOT_FOUND, "Not Found")
    } else {
        error!("Unhandled rejection: {:?}", err);
        error_reply(StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error")
    };
    Ok(reply)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_mapping() {
        assert_eq!(
            ApiError::BadRequest("bad".into()).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(ApiError::NotFound.status(), StatusCode::NOT_FOUND);
        assert_eq!(
            ApiError::from(sqlx::Error::PoolTimedOut).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[tokio::test]
    async fn storage_detail_is_not_leaked() {
        let rejection = warp::reject::custom(ApiError::Storage(sqlx::Error::PoolTimedOut));
        let response = handle_rejection(rejection).await.unwrap().into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let body = warp::hyper::body::to_bytes(response.into_body())
            .await
            .unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["message"], "Internal Server Error");
        assert_eq!(json["code"], 500);
    }

    #[tokio::test]
    async fn unmatched_route_is_not_found() {
        let response = handle_rejection(warp::reject::not_found())
            .await
            .unwrap()
            .into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
