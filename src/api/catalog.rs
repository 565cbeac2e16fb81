//! Catalog pages: home, listings, details, genres and languages

use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use axum_extra::extract::cookie::CookieJar;

use super::{json_body, session, Caller};
use crate::{
    error::AppResult,
    models::{
        author::{Author, AuthorDetail},
        book::{BookDetail, BookShort},
        genre::{CreateGenre, Genre},
        language::{CreateLanguage, Language},
        pagination::{PageQuery, PageRequest, PaginatedResponse},
        user::Permission,
    },
    services::catalog::{IndexStats, MaintenanceStats},
};

/// Home page: catalog counts and this session's visit count
#[utoipa::path(
    get,
    path = "/catalog/",
    tag = "catalog",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Catalog counts", body = IndexStats),
        (status = 302, description = "Redirect to login")
    )
)]
pub async fn index(
    State(state): State<crate::AppState>,
    caller: Caller,
    jar: CookieJar,
) -> AppResult<(CookieJar, Json<IndexStats>)> {
    caller.require_login()?;

    let (jar, session_id) = session(jar, &state.config.sessions);
    let stats = state.services.catalog.index(&session_id).await?;
    Ok((jar, Json(stats)))
}

/// Maintenance page with its own visit counter
#[utoipa::path(
    get,
    path = "/catalog/dbmaint/",
    tag = "catalog",
    responses(
        (status = 200, description = "Maintenance page visits", body = MaintenanceStats)
    )
)]
pub async fn dbmaint(
    State(state): State<crate::AppState>,
    jar: CookieJar,
) -> AppResult<(CookieJar, Json<MaintenanceStats>)> {
    let (jar, session_id) = session(jar, &state.config.sessions);
    let stats = state.services.catalog.maintenance(&session_id).await?;
    Ok((jar, Json(stats)))
}

/// List books (first 20 by id, 10 per page)
#[utoipa::path(
    get,
    path = "/catalog/books/",
    tag = "catalog",
    params(PageQuery),
    responses(
        (status = 200, description = "Books", body = PaginatedResponse<BookShort>),
        (status = 404, description = "Page out of range")
    )
)]
pub async fn list_books(
    State(state): State<crate::AppState>,
    Query(query): Query<PageQuery>,
) -> AppResult<Json<PaginatedResponse<BookShort>>> {
    let page = PageRequest::from_query(&query)?;
    Ok(Json(state.services.catalog.list_books(page).await?))
}

#[utoipa::path(
    get,
    path = "/catalog/book/{id}",
    tag = "catalog",
    params(("id" = i32, Path, description = "Book ID")),
    responses(
        (status = 200, description = "Book with author, language and copies", body = BookDetail),
        (status = 404, description = "Book not found")
    )
)]
pub async fn get_book(
    State(state): State<crate::AppState>,
    Path(id): Path<i32>,
) -> AppResult<Json<BookDetail>> {
    Ok(Json(state.services.catalog.get_book(id).await?))
}

/// List authors by last then first name
#[utoipa::path(
    get,
    path = "/catalog/authors/",
    tag = "catalog",
    params(PageQuery),
    responses(
        (status = 200, description = "Authors", body = PaginatedResponse<Author>),
        (status = 404, description = "Page out of range")
    )
)]
pub async fn list_authors(
    State(state): State<crate::AppState>,
    Query(query): Query<PageQuery>,
) -> AppResult<Json<PaginatedResponse<Author>>> {
    let page = PageRequest::from_query(&query)?;
    Ok(Json(state.services.catalog.list_authors(page).await?))
}

#[utoipa::path(
    get,
    path = "/catalog/author/{id}",
    tag = "catalog",
    params(("id" = i32, Path, description = "Author ID")),
    responses(
        (status = 200, description = "Author with their books", body = AuthorDetail),
        (status = 404, description = "Author not found")
    )
)]
pub async fn get_author(
    State(state): State<crate::AppState>,
    Path(id): Path<i32>,
) -> AppResult<Json<AuthorDetail>> {
    Ok(Json(state.services.catalog.get_author(id).await?))
}

#[utoipa::path(
    get,
    path = "/catalog/genres/",
    tag = "catalog",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "All genres", body = Vec<Genre>),
        (status = 302, description = "Redirect to login")
    )
)]
pub async fn list_genres(
    State(state): State<crate::AppState>,
    caller: Caller,
) -> AppResult<Json<Vec<Genre>>> {
    caller.require_login()?;
    Ok(Json(state.services.catalog.list_genres().await?))
}

#[utoipa::path(
    post,
    path = "/catalog/genres/",
    tag = "catalog",
    security(("bearer_auth" = [])),
    request_body = CreateGenre,
    responses(
        (status = 201, description = "Genre created", body = Genre),
        (status = 403, description = "Missing permission"),
        (status = 409, description = "Genre already exists")
    )
)]
pub async fn create_genre(
    State(state): State<crate::AppState>,
    caller: Caller,
    body: Bytes,
) -> AppResult<(StatusCode, Json<Genre>)> {
    caller.require_permission(Permission::AddGenre)?;
    let genre: CreateGenre = json_body(&body)?;
    let created = state.services.catalog.create_genre(genre).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

#[utoipa::path(
    delete,
    path = "/catalog/genres/{id}",
    tag = "catalog",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Genre ID")),
    responses(
        (status = 204, description = "Genre deleted and detached from its books"),
        (status = 404, description = "Genre not found")
    )
)]
pub async fn delete_genre(
    State(state): State<crate::AppState>,
    caller: Caller,
    Path(id): Path<i32>,
) -> AppResult<StatusCode> {
    caller.require_permission(Permission::DeleteGenre)?;
    state.services.catalog.delete_genre(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    get,
    path = "/catalog/languages/",
    tag = "catalog",
    responses(
        (status = 200, description = "All languages", body = Vec<Language>)
    )
)]
pub async fn list_languages(State(state): State<crate::AppState>) -> AppResult<Json<Vec<Language>>> {
    Ok(Json(state.services.catalog.list_languages().await?))
}

#[utoipa::path(
    post,
    path = "/catalog/languages/",
    tag = "catalog",
    security(("bearer_auth" = [])),
    request_body = CreateLanguage,
    responses(
        (status = 201, description = "Language created", body = Language),
        (status = 403, description = "Missing permission"),
        (status = 409, description = "Language already exists")
    )
)]
pub async fn create_language(
    State(state): State<crate::AppState>,
    caller: Caller,
    body: Bytes,
) -> AppResult<(StatusCode, Json<Language>)> {
    caller.require_permission(Permission::AddLanguage)?;
    let language: CreateLanguage = json_body(&body)?;
    let created = state.services.catalog.create_language(language).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

#[utoipa::path(
    delete,
    path = "/catalog/languages/{id}",
    tag = "catalog",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Language ID")),
    responses(
        (status = 204, description = "Language deleted"),
        (status = 404, description = "Language not found"),
        (status = 409, description = "Language still used by books or copies")
    )
)]
pub async fn delete_language(
    State(state): State<crate::AppState>,
    caller: Caller,
    Path(id): Path<i32>,
) -> AppResult<StatusCode> {
    caller.require_permission(Permission::DeleteLanguage)?;
    state.services.catalog.delete_language(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
