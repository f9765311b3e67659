use std::{collections::HashMap, sync::Arc, time::Duration};

use axum::{
    extract::{Path, State},
    http::{header, HeaderMap, StatusCode},
    routing::{get, post},
    Json, Router,
};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::{Deserialize, Serialize};
use tokio::{net::TcpListener, sync::RwLock};
use uuid::Uuid;

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: String,
}

#[derive(Deserialize)]
pub struct CreateUser {
    pub name: String,
    pub email: String,
    pub password: String,
}

/// Login response. The token travels in a field literally named `string`.
#[derive(Debug, Serialize, Deserialize)]
pub struct Token {
    pub string: String,
}

#[derive(Debug)]
struct Account {
    user: User,
    password: String,
}

#[derive(Debug, Default)]
pub struct Store {
    /// Keyed by email.
    accounts: HashMap<String, Account>,
    /// Bearer token -> email.
    sessions: HashMap<String, String>,
}

pub type Db = Arc<RwLock<Store>>;

pub fn app() -> Router {
    let db: Db = Arc::new(RwLock::new(Store::default()));
    Router::new()
        .route("/users", post(create_user))
        .route("/login", post(login))
        .route("/me", get(me))
        .route("/delay/{ms}", get(delay))
        .with_state(db)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    axum::serve(listener, app()).await
}

async fn create_user(
    State(db): State<Db>,
    Json(input): Json<CreateUser>,
) -> Result<Json<User>, StatusCode> {
    let mut store = db.write().await;
    if store.accounts.contains_key(&input.email) {
        return Err(StatusCode::CONFLICT);
    }
    let user = User {
        id: Uuid::new_v4(),
        name: input.name,
        email: input.email,
    };
    tracing::info!(id = %user.id, "user created");
    store.accounts.insert(
        user.email.clone(),
        Account {
            user: user.clone(),
            password: input.password,
        },
    );
    Ok(Json(user))
}

async fn login(State(db): State<Db>, headers: HeaderMap) -> Result<Json<Token>, StatusCode> {
    let (email, password) = basic_credentials(&headers).ok_or(StatusCode::UNAUTHORIZED)?;
    let mut store = db.write().await;
    let valid = store
        .accounts
        .get(&email)
        .is_some_and(|account| account.password == password);
    if !valid {
        return Err(StatusCode::UNAUTHORIZED);
    }
    let token = Uuid::new_v4().simple().to_string();
    store.sessions.insert(token.clone(), email);
    Ok(Json(Token { string: token }))
}

async fn me(State(db): State<Db>, headers: HeaderMap) -> Result<Json<User>, StatusCode> {
    let token = bearer_token(&headers).ok_or(StatusCode::UNAUTHORIZED)?;
    let store = db.read().await;
    store
        .sessions
        .get(token)
        .and_then(|email| store.accounts.get(email))
        .map(|account| Json(account.user.clone()))
        .ok_or(StatusCode::UNAUTHORIZED)
}

async fn delay(Path(ms): Path<u64>) -> Json<serde_json::Value> {
    tokio::time::sleep(Duration::from_millis(ms)).await;
    Json(serde_json::json!({ "slept_ms": ms }))
}

/// Decode `Authorization: Basic base64(user:pass)`.
fn basic_credentials(headers: &HeaderMap) -> Option<(String, String)> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let encoded = value.strip_prefix("Basic ")?;
    let decoded = String::from_utf8(STANDARD.decode(encoded).ok()?).ok()?;
    let (user, pass) = decoded.split_once(':')?;
    Some((user.to_string(), pass.to_string()))
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn with_auth(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_str(value).unwrap());
        headers
    }

    #[test]
    fn token_serializes_under_string_field() {
        let json = serde_json::to_value(Token { string: "abc".into() }).unwrap();
        assert_eq!(json, serde_json::json!({ "string": "abc" }));
    }

    #[test]
    fn basic_credentials_decode() {
        // base64("ada@example.com:pw")
        let headers = with_auth("Basic YWRhQGV4YW1wbGUuY29tOnB3");
        assert_eq!(
            basic_credentials(&headers),
            Some(("ada@example.com".to_string(), "pw".to_string()))
        );
    }

    #[test]
    fn password_may_contain_colons() {
        let encoded = STANDARD.encode("ada:p:w");
        let headers = with_auth(&format!("Basic {encoded}"));
        assert_eq!(basic_credentials(&headers), Some(("ada".to_string(), "p:w".to_string())));
    }

    #[test]
    fn malformed_basic_credentials_are_rejected() {
        assert!(basic_credentials(&HeaderMap::new()).is_none());
        assert!(basic_credentials(&with_auth("Bearer abc")).is_none());
        assert!(basic_credentials(&with_auth("Basic !!!")).is_none());
        assert!(basic_credentials(&with_auth(&format!("Basic {}", STANDARD.encode("nocolon")))).is_none());
    }

    #[test]
    fn bearer_token_is_extracted() {
        assert_eq!(bearer_token(&with_auth("Bearer abc")), Some("abc"));
        assert_eq!(bearer_token(&with_auth("Basic abc")), None);
    }

    #[test]
    fn create_user_requires_all_fields() {
        let result: Result<CreateUser, _> = serde_json::from_str(r#"{"name":"Ada","email":"a@b.c"}"#);
        assert!(result.is_err());
    }
}
