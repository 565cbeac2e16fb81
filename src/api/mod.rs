//! HTTP handlers for the catalog

pub mod accounts;
pub mod authors;
pub mod book_instances;
pub mod books;
pub mod catalog;
pub mod guards;
pub mod health;
pub mod loans;
pub mod openapi;

use std::convert::Infallible;

use axum::{
    async_trait,
    body::Bytes,
    extract::{FromRequestParts, OriginalUri},
    http::request::Parts,
};
use axum_extra::{
    extract::cookie::{Cookie, CookieJar},
    headers::{authorization::Bearer, Authorization},
    TypedHeader,
};
use serde::de::DeserializeOwned;
use uuid::Uuid;

use crate::{
    config::SessionConfig,
    error::{AppError, AppResult},
    models::user::UserClaims,
    AppState,
};

/// Whoever sent the request: signed in when a valid bearer token came
/// along, anonymous otherwise. Never rejects a request by itself.
#[derive(Debug, Clone)]
pub struct Caller {
    pub claims: Option<UserClaims>,
    /// Requested path and query, used as the post-login target
    pub path: String,
    pub login_url: String,
}

#[async_trait]
impl FromRequestParts<AppState> for Caller {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let claims = TypedHeader::<Authorization<Bearer>>::from_request_parts(parts, state)
            .await
            .ok()
            .and_then(|TypedHeader(authorization)| {
                UserClaims::from_token(authorization.token(), &state.config.auth.jwt_secret)
                    .map_err(|e| tracing::debug!("ignoring bearer token: {}", e))
                    .ok()
            });

        let uri = parts
            .extensions
            .get::<OriginalUri>()
            .map(|original| original.0.clone())
            .unwrap_or_else(|| parts.uri.clone());
        let path = uri
            .path_and_query()
            .map(|pq| pq.as_str().to_string())
            .unwrap_or_else(|| uri.path().to_string());

        Ok(Caller {
            claims,
            path,
            login_url: state.config.auth.login_url.clone(),
        })
    }
}

/// Session id from the cookie jar, starting a new session when absent
pub fn session(jar: CookieJar, config: &SessionConfig) -> (CookieJar, String) {
    if let Some(id) = jar.get(&config.cookie_name).map(|c| c.value().to_string()) {
        return (jar, id);
    }

    let id = Uuid::new_v4().simple().to_string();
    let cookie = Cookie::build((config.cookie_name.clone(), id.clone()))
        .path("/")
        .http_only(true);
    (jar.add(cookie), id)
}

/// Copy identifier from a path segment; malformed ids match no copy
pub(crate) fn instance_id(raw: &str) -> AppResult<Uuid> {
    Uuid::parse_str(raw).map_err(|_| AppError::NotFound(format!("Book instance {} not found", raw)))
}

/// Decode a JSON request body. Call it after the caller's access check:
/// the outcome of that check never depends on the body.
pub(crate) fn json_body<T: DeserializeOwned>(body: &Bytes) -> AppResult<T> {
    serde_json::from_slice(body)
        .map_err(|e| AppError::Validation(format!("Invalid request body: {}", e)))
}
