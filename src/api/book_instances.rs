//! Copy administration

use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};

use super::{instance_id, json_body, Caller};
use crate::{
    error::AppResult,
    models::{
        book_instance::{BookInstance, BookInstanceDetails, BookInstanceForm, BookInstanceQuery},
        pagination::PaginatedResponse,
        user::Permission,
    },
};

/// List copies, filterable by status and due date
#[utoipa::path(
    get,
    path = "/catalog/bookinstances/",
    tag = "book_instances",
    security(("bearer_auth" = [])),
    params(BookInstanceQuery),
    responses(
        (status = 200, description = "Copies by due date", body = PaginatedResponse<BookInstanceDetails>),
        (status = 302, description = "Redirect to login"),
        (status = 403, description = "Missing change_bookinstance")
    )
)]
pub async fn list(
    State(state): State<crate::AppState>,
    caller: Caller,
    Query(query): Query<BookInstanceQuery>,
) -> AppResult<Json<PaginatedResponse<BookInstanceDetails>>> {
    caller.require_permission(Permission::ChangeBookInstance)?;
    Ok(Json(state.services.loans.list_instances(&query).await?))
}

#[utoipa::path(
    post,
    path = "/catalog/bookinstances/",
    tag = "book_instances",
    security(("bearer_auth" = [])),
    request_body = BookInstanceForm,
    responses(
        (status = 201, description = "Copy created", body = BookInstance),
        (status = 400, description = "Invalid fields or loan state"),
        (status = 403, description = "Missing add_bookinstance")
    )
)]
pub async fn create(
    State(state): State<crate::AppState>,
    caller: Caller,
    body: Bytes,
) -> AppResult<(StatusCode, Json<BookInstance>)> {
    caller.require_permission(Permission::AddBookInstance)?;
    let form: BookInstanceForm = json_body(&body)?;
    let created = state.services.loans.create_instance(form).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

#[utoipa::path(
    get,
    path = "/catalog/bookinstances/{id}",
    tag = "book_instances",
    security(("bearer_auth" = [])),
    params(("id" = String, Path, description = "Book instance UUID")),
    responses(
        (status = 200, description = "Copy", body = BookInstanceDetails),
        (status = 404, description = "Book instance not found")
    )
)]
pub async fn get(
    State(state): State<crate::AppState>,
    caller: Caller,
    Path(id): Path<String>,
) -> AppResult<Json<BookInstanceDetails>> {
    caller.require_permission(Permission::ChangeBookInstance)?;
    let id = instance_id(&id)?;
    Ok(Json(state.services.loans.get_instance(id).await?))
}

#[utoipa::path(
    put,
    path = "/catalog/bookinstances/{id}",
    tag = "book_instances",
    security(("bearer_auth" = [])),
    params(("id" = String, Path, description = "Book instance UUID")),
    request_body = BookInstanceForm,
    responses(
        (status = 200, description = "Copy updated", body = BookInstance),
        (status = 400, description = "Invalid fields or loan state"),
        (status = 404, description = "Book instance not found")
    )
)]
pub async fn update(
    State(state): State<crate::AppState>,
    caller: Caller,
    Path(id): Path<String>,
    body: Bytes,
) -> AppResult<Json<BookInstance>> {
    caller.require_permission(Permission::ChangeBookInstance)?;
    let id = instance_id(&id)?;
    let form: BookInstanceForm = json_body(&body)?;
    Ok(Json(state.services.loans.update_instance(id, form).await?))
}

#[utoipa::path(
    delete,
    path = "/catalog/bookinstances/{id}",
    tag = "book_instances",
    security(("bearer_auth" = [])),
    params(("id" = String, Path, description = "Book instance UUID")),
    responses(
        (status = 204, description = "Copy deleted"),
        (status = 404, description = "Book instance not found")
    )
)]
pub async fn delete(
    State(state): State<crate::AppState>,
    caller: Caller,
    Path(id): Path<String>,
) -> AppResult<StatusCode> {
    caller.require_permission(Permission::DeleteBookInstance)?;
    let id = instance_id(&id)?;
    state.services.loans.delete_instance(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
