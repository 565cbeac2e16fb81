//! Book create, update and delete forms

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
        book::{Book, BookForm},
        form::{FormResponse, Submission},
        user::Permission,
    },
    services::books::BookSubmission,
};

fn respond(outcome: BookSubmission) -> Response {
    match outcome {
        Submission::Saved(book) => Redirect::to(&format!("/catalog/book/{}", book.id)).into_response(),
        Submission::Invalid(form) => (StatusCode::BAD_REQUEST, Json(form)).into_response(),
    }
}

#[utoipa::path(
    get,
    path = "/catalog/book/create/",
    tag = "books",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Initial values", body = FormResponse<BookForm>),
        (status = 302, description = "Redirect to login"),
        (status = 403, description = "Missing add_book")
    )
)]
pub async fn create_form(caller: Caller) -> AppResult<Json<FormResponse<BookForm>>> {
    caller.require_permission(Permission::AddBook)?;
    Ok(Json(FormResponse::initial(BookForm::initial())))
}

#[utoipa::path(
    post,
    path = "/catalog/book/create/",
    tag = "books",
    security(("bearer_auth" = [])),
    request_body = BookForm,
    responses(
        (status = 303, description = "Created, redirect to the book"),
        (status = 400, description = "Form redisplayed with errors", body = FormResponse<BookForm>),
        (status = 302, description = "Redirect to login"),
        (status = 403, description = "Missing add_book")
    )
)]
pub async fn create(
    State(state): State<crate::AppState>,
    caller: Caller,
    body: Bytes,
) -> AppResult<Response> {
    caller.require_permission(Permission::AddBook)?;
    let form: BookForm = json_body(&body)?;
    Ok(respond(state.services.books.create(form).await?))
}

#[utoipa::path(
    get,
    path = "/catalog/book/{id}/update/",
    tag = "books",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Book ID")),
    responses(
        (status = 200, description = "Current values", body = FormResponse<BookForm>),
        (status = 403, description = "Missing change_book"),
        (status = 404, description = "Book not found")
    )
)]
pub async fn update_form(
    State(state): State<crate::AppState>,
    caller: Caller,
    Path(id): Path<i32>,
) -> AppResult<Json<FormResponse<BookForm>>> {
    caller.require_permission(Permission::ChangeBook)?;
    Ok(Json(state.services.books.edit_form(id).await?))
}

#[utoipa::path(
    post,
    path = "/catalog/book/{id}/update/",
    tag = "books",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Book ID")),
    request_body = BookForm,
    responses(
        (status = 303, description = "Updated, redirect to the book"),
        (status = 400, description = "Form redisplayed with errors", body = FormResponse<BookForm>),
        (status = 403, description = "Missing change_book"),
        (status = 404, description = "Book not found")
    )
)]
pub async fn update(
    State(state): State<crate::AppState>,
    caller: Caller,
    Path(id): Path<i32>,
    body: Bytes,
) -> AppResult<Response> {
    caller.require_permission(Permission::ChangeBook)?;
    let form: BookForm = json_body(&body)?;
    Ok(respond(state.services.books.update(id, form).await?))
}

#[utoipa::path(
    get,
    path = "/catalog/book/{id}/delete/",
    tag = "books",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Book ID")),
    responses(
        (status = 200, description = "Book to delete", body = Book),
        (status = 403, description = "Missing delete_book"),
        (status = 404, description = "Book not found")
    )
)]
pub async fn delete_confirm(
    State(state): State<crate::AppState>,
    caller: Caller,
    Path(id): Path<i32>,
) -> AppResult<Json<Book>> {
    caller.require_permission(Permission::DeleteBook)?;
    Ok(Json(state.services.books.get(id).await?))
}

#[utoipa::path(
    post,
    path = "/catalog/book/{id}/delete/",
    tag = "books",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Book ID")),
    responses(
        (status = 303, description = "Deleted, redirect to the book list"),
        (status = 403, description = "Missing delete_book"),
        (status = 404, description = "Book not found"),
        (status = 409, description = "Book still has copies")
    )
)]
pub async fn delete(
    State(state): State<crate::AppState>,
    caller: Caller,
    Path(id): Path<i32>,
) -> AppResult<Redirect> {
    caller.require_permission(Permission::DeleteBook)?;
    state.services.books.delete(id).await?;
    Ok(Redirect::to("/catalog/books/"))
}
