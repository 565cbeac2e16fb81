//! Login and logout

use axum::{extract::State, http::StatusCode, Json};
use axum_extra::extract::cookie::{Cookie, CookieJar};

use crate::{
    error::AppResult,
    models::user::{LoginRequest, LoginResponse},
};

/// Exchange credentials for a bearer token
#[utoipa::path(
    post,
    path = "/accounts/login/",
    tag = "accounts",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Signed in", body = LoginResponse),
        (status = 401, description = "Invalid credentials")
    )
)]
pub async fn login(
    State(state): State<crate::AppState>,
    Json(request): Json<LoginRequest>,
) -> AppResult<Json<LoginResponse>> {
    let response = state
        .services
        .users
        .authenticate(&request.username, &request.password)
        .await?;
    Ok(Json(response))
}

/// Forget the session and its counters
#[utoipa::path(
    post,
    path = "/accounts/logout/",
    tag = "accounts",
    responses(
        (status = 204, description = "Session cleared")
    )
)]
pub async fn logout(
    State(state): State<crate::AppState>,
    jar: CookieJar,
) -> AppResult<(CookieJar, StatusCode)> {
    let cookie_name = state.config.sessions.cookie_name.clone();
    let Some(session_id) = jar.get(&cookie_name).map(|c| c.value().to_string()) else {
        return Ok((jar, StatusCode::NO_CONTENT));
    };

    state.services.sessions.flush(&session_id).await?;
    let jar = jar.remove(Cookie::build(cookie_name).path("/"));
    Ok((jar, StatusCode::NO_CONTENT))
}
