//! User creation and bearer-token login against the feed service.
//!
//! # Design
//! The session's only auth state is the `Authorization` entry in the
//! client's default header set: login stores `Bearer <token>` there, logout
//! removes it, and `is_logged_in` checks for it. There is no separate
//! session object and no expiry tracking.
//!
//! Responses are classified by status code before the body is looked at, so
//! a 401 with an empty or non-JSON body is still `InvalidCredentials`.
//!
//! Logout is local only: the token is dropped from the header set but not
//! revoked on the server.

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use serde::Serialize;
use serde_json::Value;

use crate::blocking;
use crate::client::HttpClient;
use crate::codec::{self, KeyedData};
use crate::engine::{self, RequestHandle};
use crate::error::{ApiError, Result};
use crate::http::{HeaderSet, HttpMethod, HttpRequest, HttpResponse};
use crate::request::{build_request, RequestBody};

/// Header holding the session credential.
pub const AUTHORIZATION: &str = "Authorization";

const USERS_ENDPOINT: &str = "/users";
const LOGIN_ENDPOINT: &str = "/login";
/// Field of the login response carrying the bearer token.
const TOKEN_FIELD: &str = "string";

#[derive(Serialize)]
struct NewUser<'a> {
    name: &'a str,
    email: &'a str,
    password: &'a str,
}

fn basic_credentials(username: &str, password: &str) -> String {
    format!("Basic {}", STANDARD.encode(format!("{username}:{password}")))
}

fn classify_created_user(response: HttpResponse) -> Result<KeyedData> {
    match response.status {
        200 => response.keyed(),
        409 => Err(ApiError::UserAlreadyExists),
        _ => Err(ApiError::CannotCreateUser),
    }
}

/// Extract the bearer token from a login response.
fn bearer_from_login(response: HttpResponse) -> Result<String> {
    match response.status {
        200 => {}
        401 => return Err(ApiError::InvalidCredentials),
        _ => return Err(ApiError::UnknownLoginFailure),
    }
    let data = response.keyed()?;
    match data.get(TOKEN_FIELD).and_then(Value::as_str) {
        Some(token) if !token.is_empty() => Ok(token.to_string()),
        _ => Err(ApiError::NoBearerToken),
    }
}

impl HttpClient {
    fn create_user_request(
        &self,
        username: &str,
        password: &str,
        display_name: &str,
    ) -> Result<HttpRequest> {
        let body = codec::to_keyed(&NewUser {
            name: display_name,
            email: username,
            password,
        })?;
        self.prepare(
            HttpMethod::Post,
            USERS_ENDPOINT,
            &HeaderSet::new(),
            Some(RequestBody::Keyed(body)),
        )
    }

    /// The Basic credential stands in for any bearer token already held, so
    /// the existing `Authorization` default is left out of this request.
    fn login_request(&self, username: &str, password: &str) -> Result<HttpRequest> {
        let mut defaults = self.default_headers();
        defaults.remove(AUTHORIZATION);
        let credentials = HeaderSet::new().with(AUTHORIZATION, basic_credentials(username, password));
        build_request(
            HttpMethod::Post,
            &self.url(LOGIN_ENDPOINT),
            &[&defaults, &credentials],
            Some(RequestBody::Keyed(KeyedData::new())),
        )
    }

    fn store_bearer(&self, token: &str) {
        self.set_default_header(AUTHORIZATION, &format!("Bearer {token}"));
        tracing::debug!("logged in; bearer token stored");
    }

    /// Register a user and return the server's description of it.
    pub fn create_user(&self, username: &str, password: &str, display_name: &str) -> Result<KeyedData> {
        let request = self.create_user_request(username, password, display_name)?;
        let response = blocking::execute_blocking(self.transport(), request, self.default_timeout())?;
        classify_created_user(response)
    }

    pub fn create_user_async<F>(
        &self,
        username: &str,
        password: &str,
        display_name: &str,
        completion: F,
    ) -> RequestHandle
    where
        F: FnOnce(Result<KeyedData>) + Send + 'static,
    {
        match self.create_user_request(username, password, display_name) {
            Ok(request) => engine::execute(self.transport(), request, move |outcome| {
                completion(outcome.and_then(classify_created_user))
            }),
            Err(err) => {
                completion(Err(err));
                RequestHandle::finished()
            }
        }
    }

    /// Log in and keep the returned bearer token for subsequent calls.
    ///
    /// On failure the default header set is left untouched.
    pub fn login(&self, username: &str, password: &str) -> Result<()> {
        let request = self.login_request(username, password)?;
        let response = blocking::execute_blocking(self.transport(), request, self.default_timeout())?;
        let token = bearer_from_login(response)?;
        self.store_bearer(&token);
        Ok(())
    }

    pub fn login_async<F>(&self, username: &str, password: &str, completion: F) -> RequestHandle
    where
        F: FnOnce(Result<()>) + Send + 'static,
    {
        let request = match self.login_request(username, password) {
            Ok(request) => request,
            Err(err) => {
                completion(Err(err));
                return RequestHandle::finished();
            }
        };
        let session = self.clone();
        engine::execute(self.transport(), request, move |outcome| {
            let stored = outcome
                .and_then(bearer_from_login)
                .map(|token| session.store_bearer(&token));
            completion(stored)
        })
    }

    /// Forget the bearer token. Does not contact the server.
    pub fn logout(&self) {
        if self.remove_default_header(AUTHORIZATION) {
            tracing::debug!("logged out; bearer token dropped");
        }
    }

    /// Callback form of [`logout`](Self::logout). The header is removed
    /// before `completion` runs, on the calling thread.
    pub fn logout_async<F>(&self, completion: F)
    where
        F: FnOnce(),
    {
        self.logout();
        completion();
    }

    pub fn is_logged_in(&self) -> bool {
        self.default_headers().contains(AUTHORIZATION)
    }

    /// The bearer token currently held, if any.
    pub fn bearer_token(&self) -> Option<String> {
        self.default_headers()
            .get(AUTHORIZATION)
            .and_then(|value| value.strip_prefix("Bearer "))
            .map(str::to_string)
    }
}
