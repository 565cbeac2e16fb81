//! OpenAPI documentation

use axum::Router;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::api::{accounts, authors, book_instances, books, catalog, health, loans};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Catalog API",
        version = "1.0.0",
        description = "Local library catalog: books, authors, copies and loan renewals"
    ),
    paths(
        // Health
        health::health_check,
        health::readiness_check,
        // Accounts
        accounts::login,
        accounts::logout,
        // Catalog
        catalog::index,
        catalog::dbmaint,
        catalog::list_books,
        catalog::get_book,
        catalog::list_authors,
        catalog::get_author,
        catalog::list_genres,
        catalog::create_genre,
        catalog::delete_genre,
        catalog::list_languages,
        catalog::create_language,
        catalog::delete_language,
        // Loans
        loans::my_loans,
        loans::renewal_form,
        loans::renew,
        // Authors
        authors::create_form,
        authors::create,
        authors::update_form,
        authors::update,
        authors::delete_confirm,
        authors::delete,
        // Books
        books::create_form,
        books::create,
        books::update_form,
        books::update,
        books::delete_confirm,
        books::delete,
        // Copies
        book_instances::list,
        book_instances::create,
        book_instances::get,
        book_instances::update,
        book_instances::delete,
    ),
    components(
        schemas(
            // Accounts
            crate::models::user::LoginRequest,
            crate::models::user::LoginResponse,
            crate::models::user::User,
            crate::models::user::Permission,
            // Catalog
            crate::services::catalog::IndexStats,
            crate::services::catalog::MaintenanceStats,
            crate::models::author::Author,
            crate::models::author::AuthorDetail,
            crate::models::author::AuthorForm,
            crate::models::author::CreateAuthor,
            crate::models::book::Book,
            crate::models::book::BookShort,
            crate::models::book::BookDetail,
            crate::models::book::BookForm,
            crate::models::genre::Genre,
            crate::models::genre::CreateGenre,
            crate::models::language::Language,
            crate::models::language::CreateLanguage,
            // Loans
            crate::services::loans::MyLoans,
            crate::models::book_instance::BookInstance,
            crate::models::book_instance::BookInstanceDetails,
            crate::models::book_instance::BookInstanceForm,
            crate::models::book_instance::LoanStatus,
            crate::models::book_instance::RenewBookForm,
            crate::models::book_instance::RenewalPage,
            // Health
            health::HealthResponse,
            // Errors
            crate::error::ErrorResponse,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "accounts", description = "Login and logout"),
        (name = "catalog", description = "Catalog browsing, genres and languages"),
        (name = "loans", description = "My loans and renewals"),
        (name = "authors", description = "Author management"),
        (name = "books", description = "Book management"),
        (name = "book_instances", description = "Copy administration")
    )
)]
pub struct ApiDoc;

/// Create the OpenAPI documentation router
pub fn create_openapi_router() -> Router {
    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
}
