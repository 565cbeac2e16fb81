//! My-loans listing and loan renewal

use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
    Json,
};

use super::{instance_id, json_body, Caller};
use crate::{
    error::AppResult,
    models::{
        book_instance::{RenewBookForm, RenewalPage},
        form::Submission,
        pagination::{PageQuery, PageRequest},
        user::Permission,
    },
    services::loans::MyLoans,
};

/// Where a successful renewal lands
pub const MY_LOANS_PATH: &str = "/catalog/mybooks/";

/// Copies on loan: every member's for librarians, the caller's own otherwise
#[utoipa::path(
    get,
    path = "/catalog/mybooks/",
    tag = "loans",
    security(("bearer_auth" = [])),
    params(PageQuery),
    responses(
        (status = 200, description = "Copies on loan, soonest due first", body = MyLoans),
        (status = 302, description = "Redirect to login"),
        (status = 404, description = "Page out of range")
    )
)]
pub async fn my_loans(
    State(state): State<crate::AppState>,
    caller: Caller,
    Query(query): Query<PageQuery>,
) -> AppResult<Json<MyLoans>> {
    let claims = caller.require_login()?;

    let page = PageRequest::from_query(&query)?;
    Ok(Json(state.services.loans.my_loans(claims, page).await?))
}

/// Renewal form proposing a due date three weeks out
#[utoipa::path(
    get,
    path = "/catalog/book/{id}/renew/",
    tag = "loans",
    security(("bearer_auth" = [])),
    params(("id" = String, Path, description = "Book instance UUID")),
    responses(
        (status = 200, description = "Copy and renewal form", body = RenewalPage),
        (status = 302, description = "Redirect to login"),
        (status = 403, description = "Missing can_mark_returned"),
        (status = 404, description = "Book instance not found")
    )
)]
pub async fn renewal_form(
    State(state): State<crate::AppState>,
    caller: Caller,
    Path(id): Path<String>,
) -> AppResult<Json<RenewalPage>> {
    caller.require_permission(Permission::CanMarkReturned)?;

    let id = instance_id(&id)?;
    Ok(Json(state.services.loans.renewal_page(id).await?))
}

/// Submit a new due date
#[utoipa::path(
    post,
    path = "/catalog/book/{id}/renew/",
    tag = "loans",
    security(("bearer_auth" = [])),
    params(("id" = String, Path, description = "Book instance UUID")),
    request_body = RenewBookForm,
    responses(
        (status = 303, description = "Renewed, redirect to my loans"),
        (status = 400, description = "Form redisplayed with errors", body = RenewalPage),
        (status = 403, description = "Missing can_mark_returned"),
        (status = 404, description = "Book instance not found"),
        (status = 422, description = "Copy is not on loan")
    )
)]
pub async fn renew(
    State(state): State<crate::AppState>,
    caller: Caller,
    Path(id): Path<String>,
    body: Bytes,
) -> AppResult<Response> {
    caller.require_permission(Permission::CanMarkReturned)?;

    let id = instance_id(&id)?;
    let form: RenewBookForm = json_body(&body)?;
    Ok(match state.services.loans.renew(id, form).await? {
        Submission::Saved(_) => Redirect::to(MY_LOANS_PATH).into_response(),
        Submission::Invalid(page) => (StatusCode::BAD_REQUEST, Json(page)).into_response(),
    })
}
