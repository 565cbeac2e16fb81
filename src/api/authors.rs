//! Author create, update and delete forms

use axum::{
    body::Bytes,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
    Json,
};

use super::{json_body, Caller};
use crate::{
    error::AppResult,
    models::{
        author::{Author, AuthorForm, CreateAuthor},
        form::{FormResponse, Submission},
        user::Permission,
    },
    services::authors::AuthorSubmission,
};

fn respond(outcome: AuthorSubmission) -> Response {
    match outcome {
        Submission::Saved(author) => {
            Redirect::to(&format!("/catalog/author/{}", author.id)).into_response()
        }
        Submission::Invalid(form) => (StatusCode::BAD_REQUEST, Json(form)).into_response(),
    }
}

/// Unbound creation form
#[utoipa::path(
    get,
    path = "/catalog/author/create/",
    tag = "authors",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Initial values", body = FormResponse<CreateAuthor>),
        (status = 302, description = "Redirect to login"),
        (status = 403, description = "Missing add_author")
    )
)]
pub async fn create_form(caller: Caller) -> AppResult<Json<FormResponse<CreateAuthor>>> {
    caller.require_permission(Permission::AddAuthor)?;
    Ok(Json(FormResponse::initial(CreateAuthor::initial())))
}

#[utoipa::path(
    post,
    path = "/catalog/author/create/",
    tag = "authors",
    security(("bearer_auth" = [])),
    request_body = CreateAuthor,
    responses(
        (status = 303, description = "Created, redirect to the author"),
        (status = 400, description = "Form redisplayed with errors", body = FormResponse<AuthorForm>),
        (status = 302, description = "Redirect to login"),
        (status = 403, description = "Missing add_author")
    )
)]
pub async fn create(
    State(state): State<crate::AppState>,
    caller: Caller,
    body: Bytes,
) -> AppResult<Response> {
    caller.require_permission(Permission::AddAuthor)?;
    let author: CreateAuthor = json_body(&body)?;
    Ok(respond(state.services.authors.create(author).await?))
}

/// Form prefilled with current values
#[utoipa::path(
    get,
    path = "/catalog/author/{id}/update/",
    tag = "authors",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Author ID")),
    responses(
        (status = 200, description = "Current values", body = FormResponse<AuthorForm>),
        (status = 403, description = "Missing change_author"),
        (status = 404, description = "Author not found")
    )
)]
pub async fn update_form(
    State(state): State<crate::AppState>,
    caller: Caller,
    Path(id): Path<i32>,
) -> AppResult<Json<FormResponse<AuthorForm>>> {
    caller.require_permission(Permission::ChangeAuthor)?;
    Ok(Json(state.services.authors.edit_form(id).await?))
}

#[utoipa::path(
    post,
    path = "/catalog/author/{id}/update/",
    tag = "authors",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Author ID")),
    request_body = AuthorForm,
    responses(
        (status = 303, description = "Updated, redirect to the author"),
        (status = 400, description = "Form redisplayed with errors", body = FormResponse<AuthorForm>),
        (status = 403, description = "Missing change_author"),
        (status = 404, description = "Author not found")
    )
)]
pub async fn update(
    State(state): State<crate::AppState>,
    caller: Caller,
    Path(id): Path<i32>,
    body: Bytes,
) -> AppResult<Response> {
    caller.require_permission(Permission::ChangeAuthor)?;
    let form: AuthorForm = json_body(&body)?;
    Ok(respond(state.services.authors.update(id, form).await?))
}

/// Deletion confirmation
#[utoipa::path(
    get,
    path = "/catalog/author/{id}/delete/",
    tag = "authors",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Author ID")),
    responses(
        (status = 200, description = "Author to delete", body = Author),
        (status = 403, description = "Missing delete_author"),
        (status = 404, description = "Author not found")
    )
)]
pub async fn delete_confirm(
    State(state): State<crate::AppState>,
    caller: Caller,
    Path(id): Path<i32>,
) -> AppResult<Json<Author>> {
    caller.require_permission(Permission::DeleteAuthor)?;
    Ok(Json(state.services.authors.get(id).await?))
}

#[utoipa::path(
    post,
    path = "/catalog/author/{id}/delete/",
    tag = "authors",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Author ID")),
    responses(
        (status = 303, description = "Deleted, redirect to the author list"),
        (status = 403, description = "Missing delete_author"),
        (status = 404, description = "Author not found"),
        (status = 409, description = "Author still has books")
    )
)]
pub async fn delete(
    State(state): State<crate::AppState>,
    caller: Caller,
    Path(id): Path<i32>,
) -> AppResult<Redirect> {
    caller.require_permission(Permission::DeleteAuthor)?;
    state.services.authors.delete(id).await?;
    Ok(Redirect::to("/catalog/authors/"))
}
