use crate::api::v1::handler::ApiResponse;
use crate::application_port::*;
use serde::Serialize;
use std::convert::Infallible;
use thiserror::Error;
use tracing::{error, warn};
use warp::http::StatusCode;
use warp::{Rejection, reject};

pub async fn recover_error(err: Rejection) -> Result<impl warp::Reply, Infallible> {
    let (code, status) = if let Some(code) = err.find::<ApiErrorCode>() {
        (code.clone(), code.status())
    } else if err.is_not_found() {
        (ApiErrorCode::NotFound, StatusCode::NOT_FOUND)
    } else if err.find::<warp::filters::body::BodyDeserializeError>().is_some()
        || err.find::<warp::reject::MissingHeader>().is_some()
    {
        (ApiErrorCode::BadRequest, StatusCode::BAD_REQUEST)
    } else if err.find::<warp::reject::PayloadTooLarge>().is_some() {
        (ApiErrorCode::BadRequest, StatusCode::PAYLOAD_TOO_LARGE)
    } else if err.find::<warp::reject::MethodNotAllowed>().is_some() {
        (ApiErrorCode::NotFound, StatusCode::METHOD_NOT_ALLOWED)
    } else {
        error!("unhandled rejection: {:?}", err);
        (ApiErrorCode::InternalError, StatusCode::INTERNAL_SERVER_ERROR)
    };

    let json = warp::reply::json(&ApiResponse::<()>::err(code.clone(), code.to_string()));
    Ok(warp::reply::with_status(json, status))
}

#[derive(Debug, Serialize)]
pub struct ApiError {
    pub code: ApiErrorCode,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
pub enum ApiErrorCode {
    #[error("Token is not valid")]
    InvalidToken,
    #[error("Email already registered")]
    EmailTaken,
    #[error("Malformed request")]
    BadRequest,
    #[error("Not found")]
    NotFound,
    #[error("Service temporarily unavailable")]
    ServiceUnavailable,
    #[error("Internal error")]
    InternalError,
}

impl ApiErrorCode {
    pub fn internal<E: std::fmt::Display>(error: E) -> ApiErrorCode {
        warn!("Internal error: {}", error);
        ApiErrorCode::InternalError
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiErrorCode::InvalidToken => StatusCode::UNAUTHORIZED,
            ApiErrorCode::EmailTaken => StatusCode::CONFLICT,
            ApiErrorCode::BadRequest => StatusCode::BAD_REQUEST,
            ApiErrorCode::NotFound => StatusCode::NOT_FOUND,
            ApiErrorCode::ServiceUnavailable => StatusCode::SERVICE_UNAVAILABLE,
            ApiErrorCode::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl reject::Reject for ApiErrorCode {}

impl From<SessionError> for ApiErrorCode {
    fn from(error: SessionError) -> Self {
        match error {
            SessionError::Unauthorized => ApiErrorCode::InvalidToken,
            SessionError::StoreUnavailable(e) => {
                warn!("session store unavailable: {}", e);
                ApiErrorCode::ServiceUnavailable
            }
            SessionError::InternalError(e) => ApiErrorCode::internal(e),
        }
    }
}

impl From<UserError> for ApiErrorCode {
    fn from(error: UserError) -> Self {
        match error {
            UserError::EmailTaken => ApiErrorCode::EmailTaken,
            UserError::InvalidInput(_) => ApiErrorCode::BadRequest,
            UserError::Store(e) => {
                warn!("user store unavailable: {}", e);
                ApiErrorCode::ServiceUnavailable
            }
            UserError::InternalError(e) => ApiErrorCode::internal(e),
        }
    }
}
