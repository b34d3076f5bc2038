use super::error::*;
use super::handler;
use crate::application_port::{SessionService, TokenClaims};
use crate::server::*;
use serde::de::DeserializeOwned;
use std::convert::Infallible;
use std::sync::Arc;
use warp::{Filter, http, reject};

const MAX_BODY_BYTES: u64 = 16 * 1024;

pub fn routes(
    server: Arc<Server>,
) -> impl Filter<Extract = (impl warp::Reply,), Error = warp::Rejection> + Clone {
    let create_user = warp::post()
        .and(warp::path("users"))
        .and(warp::path::end())
        .and(json_body())
        .and(with(server.user_service.clone()))
        .and_then(handler::create_user);

    let create_session = warp::post()
        .and(warp::path("sessions"))
        .and(warp::path::end())
        .and(json_body())
        .and(with(server.session_service.clone()))
        .and_then(handler::create_session);

    let refresh_session = warp::post()
        .and(warp::path!("sessions" / "refresh"))
        .and(json_body())
        .and(with(server.session_service.clone()))
        .and_then(handler::refresh_session);

    let revoke_session = warp::post()
        .and(warp::path!("sessions" / "revoke"))
        .and(json_body())
        .and(with(server.session_service.clone()))
        .and_then(handler::revoke_session);

    let revoke_all_sessions = warp::post()
        .and(warp::path!("sessions" / "revoke-all"))
        .and(json_body())
        .and(with(server.session_service.clone()))
        .and_then(handler::revoke_all_sessions);

    let whoami = warp::get()
        .and(warp::path("whoami"))
        .and(warp::path::end())
        .and(with_verification(server.session_service.clone()))
        .and_then(handler::whoami);

    create_user
        .or(create_session)
        .or(refresh_session)
        .or(revoke_session)
        .or(revoke_all_sessions)
        .or(whoami)
}

fn json_body<T: DeserializeOwned + Send>()
-> impl Filter<Extract = (T,), Error = warp::Rejection> + Clone {
    warp::body::content_length_limit(MAX_BODY_BYTES).and(warp::body::json())
}

fn with<ServiceType>(
    service: Arc<ServiceType>,
) -> impl Filter<Extract = (Arc<ServiceType>,), Error = Infallible> + Clone
where
    ServiceType: Send + Sync + ?Sized,
{
    warp::any().map(move || service.clone())
}

fn with_verification(
    session_service: Arc<dyn SessionService>,
) -> impl Filter<Extract = (TokenClaims,), Error = warp::Rejection> + Clone {
    warp::header::<String>(http::header::AUTHORIZATION.as_ref()).and_then(move |token: String| {
        let session_service = session_service.clone();
        async move {
            if let Some(token) = token.strip_prefix("Bearer ") {
                let claims = session_service
                    .verify_access(token)
                    .await
                    .map_err(ApiErrorCode::from)
                    .map_err(reject::custom)?;
                Ok(claims)
            } else {
                Err(reject::custom(ApiErrorCode::InvalidToken))
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::v1::recover_error;
    use crate::application_impl::HasherConfig;
    use crate::settings::*;
    use serde_json::{Value, json};
    use warp::http::StatusCode;

    fn cheap() -> HasherConfig {
        HasherConfig {
            memory_kib: 1024,
            iterations: 1,
            parallelism: 1,
        }
    }

    async fn server() -> Arc<Server> {
        let settings = Settings {
            http: Http {
                address: "127.0.0.1:0".to_string(),
                cert_path: None,
                key_path: None,
            },
            log: Log {
                filter: "info".to_string(),
            },
            store: Store {
                backend: "memory".to_string(),
                database_url: String::new(),
                database_name: String::new(),
                op_timeout_secs: 5,
                max_connections: 1,
                auto_migrate: false,
            },
            token: Token {
                signing_key: "router-test-signing-key-0123456789abcdef".to_string(),
            },
            hasher: Hasher {
                refresh: cheap(),
                password: cheap(),
            },
            sweeper: Sweeper {
                enabled: false,
                interval_secs: 60,
            },
        };
        Arc::new(Server::try_new(&settings).await.unwrap())
    }

    async fn post(server: &Arc<Server>, path: &str, body: Value) -> (StatusCode, Value) {
        let api = routes(server.clone()).recover(recover_error);
        let res = warp::test::request()
            .method("POST")
            .path(path)
            .json(&body)
            .reply(&api)
            .await;
        let json: Value = serde_json::from_slice(res.body()).unwrap();
        (res.status(), json)
    }

    async fn signup(server: &Arc<Server>, email: &str) -> String {
        let (status, body) = post(
            server,
            "/users",
            json!({"email": email, "password": "hunter22"}),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        body["data"]["user_id"].as_str().unwrap().to_string()
    }

    #[tokio::test]
    async fn session_round_trip_over_http() {
        let server = server().await;
        let user_id = signup(&server, "carol@example.com").await;

        let (status, body) = post(
            &server,
            "/sessions",
            json!({"user_id": user_id, "fingerprint": "dev-A"}),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let refresh = body["data"]["refresh_token"].as_str().unwrap().to_string();
        let access = body["data"]["access_token"].as_str().unwrap().to_string();
        assert!(body["data"]["access_token_expires_at"].is_string());
        assert!(body["data"]["refresh_token_expires_at"].is_string());

        let api = routes(server.clone()).recover(recover_error);
        let res = warp::test::request()
            .method("GET")
            .path("/whoami")
            .header("authorization", format!("Bearer {access}"))
            .reply(&api)
            .await;
        assert_eq!(res.status(), StatusCode::OK);
        let me: Value = serde_json::from_slice(res.body()).unwrap();
        assert_eq!(me["data"]["user_id"], json!(user_id));
        assert_eq!(me["data"]["fingerprint"], json!("dev-A"));

        let (status, body) = post(
            &server,
            "/sessions/refresh",
            json!({"refresh_token": refresh}),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let rotated = body["data"]["refresh_token"].as_str().unwrap().to_string();
        assert_ne!(rotated, refresh);

        let (status, body) = post(
            &server,
            "/sessions/refresh",
            json!({"refresh_token": refresh}),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"]["code"], json!("InvalidToken"));

        let (status, _) = post(
            &server,
            "/sessions/revoke",
            json!({"refresh_token": rotated}),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn failures_look_identical_to_callers() {
        let server = server().await;
        let user_id = signup(&server, "dave@example.com").await;

        let (_, unknown_user) = post(
            &server,
            "/sessions",
            json!({"user_id": "nobody", "fingerprint": "dev-A"}),
        )
        .await;
        let (_, garbage) = post(
            &server,
            "/sessions/refresh",
            json!({"refresh_token": "garbage"}),
        )
        .await;
        let (_, revoke_all_empty) = post(
            &server,
            "/sessions/revoke-all",
            json!({"refresh_token": "Zm9v"}),
        )
        .await;
        assert_eq!(unknown_user, garbage);
        assert_eq!(garbage, revoke_all_empty);

        let (status, body) = post(
            &server,
            "/sessions",
            json!({"user_id": user_id, "fingerprint": "dev-B"}),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let refresh = body["data"]["refresh_token"].as_str().unwrap();
        let (status, body) = post(
            &server,
            "/sessions/revoke-all",
            json!({"refresh_token": refresh}),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["message"], json!("all sessions were deleted"));
    }

    #[tokio::test]
    async fn bad_requests_are_rejected_before_the_service() {
        let server = server().await;

        let (status, _) = post(&server, "/sessions", json!({"fingerprint": "dev-A"})).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, body) = post(
            &server,
            "/users",
            json!({"email": "erin@example.com", "password": "x"}),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["success"], json!(false));

        let api = routes(server.clone()).recover(recover_error);
        let res = warp::test::request()
            .method("GET")
            .path("/whoami")
            .header("authorization", "Token abc")
            .reply(&api)
            .await;
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn fingerprint_outside_store_bounds_is_a_bad_request() {
        let server = server().await;
        let user_id = signup(&server, "gina@example.com").await;

        for fingerprint in [String::new(), "f".repeat(256)] {
            let (status, body) = post(
                &server,
                "/sessions",
                json!({"user_id": user_id, "fingerprint": fingerprint}),
            )
            .await;
            assert_eq!(status, StatusCode::BAD_REQUEST, "len {}", fingerprint.len());
            assert_eq!(body["error"]["code"], json!("BadRequest"));
        }

        let (status, _) = post(
            &server,
            "/sessions",
            json!({"user_id": user_id, "fingerprint": "f".repeat(255)}),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn duplicate_signup_conflicts() {
        let server = server().await;
        signup(&server, "frank@example.com").await;
        let (status, body) = post(
            &server,
            "/users",
            json!({"email": "frank@example.com", "password": "hunter22"}),
        )
        .await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["error"]["code"], json!("EmailTaken"));
    }
}
