//! A small user API for exercising the request pipeline end to end.
//!
//! - `GET /v1/users/{id}` is step-up protected: without an `X-2FA` header it
//!   answers status 600 with `X-2FA-Required: true`.
//! - `GET /v1/me` needs `Authorization: Bearer s3cret`.
//! - `GET /v1/users/{id}/avatar` answers `application/octet-stream`.
//! - `POST /v1/users` creates a user.
//! - `GET /v1/status` answers `text/plain`.

use std::{collections::HashMap, sync::Arc};

use axum::{
    extract::{Path, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tokio::{net::TcpListener, sync::RwLock};

pub const TWO_FACTOR_HEADER: &str = "x-2fa";
pub const TWO_FACTOR_REQUIRED_HEADER: &str = "x-2fa-required";
pub const TWO_FACTOR_CODE: &str = "1234";
pub const BEARER_TOKEN: &str = "s3cret";

/// Non-standard status used to ask for a second factor.
pub const STEP_UP_STATUS: u16 = 600;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: u64,
    pub name: String,
}

#[derive(Deserialize)]
pub struct CreateUser {
    pub name: String,
}

/// Body of every non-2xx answer.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ApiMessage {
    pub message: String,
}

pub type Db = Arc<RwLock<HashMap<u64, User>>>;

fn seed() -> HashMap<u64, User> {
    [
        User {
            id: 1,
            name: "Grace Hopper".to_string(),
        },
        User {
            id: 42,
            name: "Ada Lovelace".to_string(),
        },
    ]
    .into_iter()
    .map(|user| (user.id, user))
    .collect()
}

pub fn app() -> Router {
    let db: Db = Arc::new(RwLock::new(seed()));
    Router::new()
        .route("/v1/status", get(status))
        .route("/v1/me", get(me))
        .route("/v1/users", axum::routing::post(create_user))
        .route("/v1/users/{id}", get(get_user))
        .route("/v1/users/{id}/avatar", get(avatar))
        .with_state(db)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    axum::serve(listener, app()).await
}

fn message(status: StatusCode, message: &str) -> Response {
    let body = ApiMessage {
        message: message.to_string(),
    };
    (status, Json(body)).into_response()
}

fn step_up_status() -> StatusCode {
    StatusCode::from_u16(STEP_UP_STATUS).unwrap_or(StatusCode::UNAUTHORIZED)
}

async fn status() -> &'static str {
    "ok"
}

async fn me(State(db): State<Db>, headers: HeaderMap) -> Response {
    let expected = format!("Bearer {BEARER_TOKEN}");
    let authorized = headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value == expected);
    if !authorized {
        tracing::debug!("rejecting request without a valid bearer token");
        return message(StatusCode::UNAUTHORIZED, "missing or invalid bearer token");
    }
    match db.read().await.get(&1) {
        Some(user) => Json(user.clone()).into_response(),
        None => message(StatusCode::NOT_FOUND, "no such user"),
    }
}

async fn get_user(State(db): State<Db>, Path(id): Path<u64>, headers: HeaderMap) -> Response {
    match headers.get(TWO_FACTOR_HEADER).map(|value| value.to_str()) {
        None => {
            tracing::debug!(id, "asking for a second factor");
            let mut response = message(step_up_status(), "two-factor code required");
            response
                .headers_mut()
                .insert(TWO_FACTOR_REQUIRED_HEADER, header::HeaderValue::from_static("true"));
            return response;
        }
        Some(Ok(TWO_FACTOR_CODE)) => {}
        Some(_) => return message(StatusCode::UNAUTHORIZED, "invalid two-factor code"),
    }
    match db.read().await.get(&id) {
        Some(user) => Json(user.clone()).into_response(),
        None => message(StatusCode::NOT_FOUND, "no such user"),
    }
}

async fn avatar(State(db): State<Db>, Path(id): Path<u64>) -> Response {
    if !db.read().await.contains_key(&id) {
        return message(StatusCode::NOT_FOUND, "no such user");
    }
    let pixels: Vec<u8> = vec![0x89, b'P', b'N', b'G', (id % 256) as u8];
    ([(header::CONTENT_TYPE, "application/octet-stream")], pixels).into_response()
}

async fn create_user(State(db): State<Db>, Json(input): Json<CreateUser>) -> Response {
    if input.name.trim().is_empty() {
        return message(StatusCode::UNPROCESSABLE_ENTITY, "name must not be empty");
    }
    let mut users = db.write().await;
    let id = users.keys().max().map_or(1, |max| max + 1);
    let user = User { id, name: input.name };
    users.insert(id, user.clone());
    (StatusCode::CREATED, Json(user)).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn step_up_status_is_representable() {
        assert_eq!(step_up_status().as_u16(), STEP_UP_STATUS);
    }

    #[test]
    fn user_serializes_to_json() {
        let user = User {
            id: 42,
            name: "Ada Lovelace".to_string(),
        };
        let json = serde_json::to_value(&user).unwrap();
        assert_eq!(json["id"], 42);
        assert_eq!(json["name"], "Ada Lovelace");
    }

    #[test]
    fn create_user_rejects_missing_name() {
        let result: Result<CreateUser, _> = serde_json::from_str(r#"{"id":3}"#);
        assert!(result.is_err());
    }

    #[test]
    fn seed_contains_known_users() {
        let users = seed();
        assert_eq!(users.len(), 2);
        assert_eq!(users[&42].name, "Ada Lovelace");
    }
}
