use super::error::*;
use crate::application_port::*;
use crate::domain_model::{Fingerprint, UserId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use warp::http::StatusCode;
use warp::{self, reject};

#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<ApiError>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        ApiResponse {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn err(code: ApiErrorCode, message: impl Into<String>) -> Self {
        ApiResponse {
            success: false,
            data: None,
            error: Some(ApiError {
                code,
                message: message.into(),
            }),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: &'static str,
}

#[derive(Debug, Deserialize)]
pub struct CreateUserRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct CreateUserResponse {
    pub user_id: UserId,
    pub email: String,
}

pub async fn create_user(
    body: CreateUserRequest,
    user_service: Arc<dyn UserService>,
) -> Result<impl warp::Reply, warp::Rejection> {
    let email = body.email.clone();
    let user_id = user_service
        .create_user(SignupInput {
            email: body.email,
            password: body.password,
        })
        .await
        .map_err(ApiErrorCode::from)
        .map_err(reject::custom)?;

    let response = ApiResponse::ok(CreateUserResponse { user_id, email });
    Ok(warp::reply::with_status(
        warp::reply::json(&response),
        StatusCode::CREATED,
    ))
}

#[derive(Debug, Deserialize)]
pub struct CreateSessionRequest {
    pub user_id: UserId,
    pub fingerprint: Fingerprint,
}

#[derive(Debug, Serialize)]
pub struct TokenPairResponse {
    pub access_token: AccessToken,
    pub refresh_token: EncodedRefreshToken,
    pub access_token_expires_at: DateTime<Utc>,
    pub refresh_token_expires_at: DateTime<Utc>,
}

impl From<AuthTokens> for TokenPairResponse {
    fn from(tokens: AuthTokens) -> Self {
        TokenPairResponse {
            access_token: tokens.access_token,
            refresh_token: tokens.refresh_token,
            access_token_expires_at: tokens.access_token_expires_at,
            refresh_token_expires_at: tokens.refresh_token_expires_at,
        }
    }
}

pub async fn create_session(
    body: CreateSessionRequest,
    session_service: Arc<dyn SessionService>,
) -> Result<impl warp::Reply, warp::Rejection> {
    if !body.fingerprint.is_well_formed() {
        return Err(reject::custom(ApiErrorCode::BadRequest));
    }

    let tokens = session_service
        .create_session(&body.user_id, &body.fingerprint)
        .await
        .map_err(ApiErrorCode::from)
        .map_err(reject::custom)?;

    Ok(warp::reply::json(&ApiResponse::ok(TokenPairResponse::from(
        tokens,
    ))))
}

#[derive(Debug, Deserialize)]
pub struct RefreshTokenRequest {
    pub refresh_token: String,
}

pub async fn refresh_session(
    body: RefreshTokenRequest,
    session_service: Arc<dyn SessionService>,
) -> Result<impl warp::Reply, warp::Rejection> {
    let tokens = session_service
        .rotate_session(&body.refresh_token)
        .await
        .map_err(ApiErrorCode::from)
        .map_err(reject::custom)?;

    Ok(warp::reply::json(&ApiResponse::ok(TokenPairResponse::from(
        tokens,
    ))))
}

pub async fn revoke_session(
    body: RefreshTokenRequest,
    session_service: Arc<dyn SessionService>,
) -> Result<impl warp::Reply, warp::Rejection> {
    session_service
        .revoke_session(&body.refresh_token)
        .await
        .map_err(ApiErrorCode::from)
        .map_err(reject::custom)?;

    Ok(warp::reply::json(&ApiResponse::ok(MessageResponse {
        message: "refresh session was deleted",
    })))
}

pub async fn revoke_all_sessions(
    body: RefreshTokenRequest,
    session_service: Arc<dyn SessionService>,
) -> Result<impl warp::Reply, warp::Rejection> {
    session_service
        .revoke_all_sessions(&body.refresh_token)
        .await
        .map_err(ApiErrorCode::from)
        .map_err(reject::custom)?;

    Ok(warp::reply::json(&ApiResponse::ok(MessageResponse {
        message: "all sessions were deleted",
    })))
}

#[derive(Debug, Serialize)]
pub struct WhoAmIResponse {
    pub user_id: UserId,
    pub fingerprint: Fingerprint,
    pub expires_at: i64,
}

pub async fn whoami(claims: TokenClaims) -> Result<impl warp::Reply, warp::Rejection> {
    Ok(warp::reply::json(&ApiResponse::ok(WhoAmIResponse {
        user_id: claims.user_id,
        fingerprint: claims.fingerprint,
        expires_at: claims.expires_at,
    })))
}
