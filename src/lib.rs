//! Local library catalog server
//!
//! JSON API over a library catalog: books, authors, genres, languages and
//! loanable copies, with loan renewals and permission-gated management.

use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

pub mod api;
pub mod config;
pub mod error;
pub mod models;
pub mod repository;
pub mod services;

pub use config::AppConfig;
pub use error::{AppError, AppResult};

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub services: Arc<services::Services>,
}

/// Create the application router with all routes
pub fn create_router(state: AppState) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = Router::new()
        // Health check
        .route("/health", get(api::health::health_check))
        .route("/ready", get(api::health::readiness_check))
        // Accounts
        .route("/accounts/login/", post(api::accounts::login))
        .route("/accounts/logout/", post(api::accounts::logout))
        // Catalog
        .route("/catalog/", get(api::catalog::index))
        .route("/catalog/dbmaint/", get(api::catalog::dbmaint))
        .route("/catalog/books/", get(api::catalog::list_books))
        .route("/catalog/book/:id", get(api::catalog::get_book))
        .route("/catalog/authors/", get(api::catalog::list_authors))
        .route("/catalog/author/:id", get(api::catalog::get_author))
        .route(
            "/catalog/genres/",
            get(api::catalog::list_genres).post(api::catalog::create_genre),
        )
        .route("/catalog/genres/:id", axum::routing::delete(api::catalog::delete_genre))
        .route(
            "/catalog/languages/",
            get(api::catalog::list_languages).post(api::catalog::create_language),
        )
        .route(
            "/catalog/languages/:id",
            axum::routing::delete(api::catalog::delete_language),
        )
        // Loans
        .route("/catalog/mybooks/", get(api::loans::my_loans))
        .route(
            "/catalog/book/:id/renew/",
            get(api::loans::renewal_form).post(api::loans::renew),
        )
        // Authors
        .route(
            "/catalog/author/create/",
            get(api::authors::create_form).post(api::authors::create),
        )
        .route(
            "/catalog/author/:id/update/",
            get(api::authors::update_form).post(api::authors::update),
        )
        .route(
            "/catalog/author/:id/delete/",
            get(api::authors::delete_confirm).post(api::authors::delete),
        )
        // Books
        .route(
            "/catalog/book/create/",
            get(api::books::create_form).post(api::books::create),
        )
        .route(
            "/catalog/book/:id/update/",
            get(api::books::update_form).post(api::books::update),
        )
        .route(
            "/catalog/book/:id/delete/",
            get(api::books::delete_confirm).post(api::books::delete),
        )
        // Copy administration
        .route(
            "/catalog/bookinstances/",
            get(api::book_instances::list).post(api::book_instances::create),
        )
        .route(
            "/catalog/bookinstances/:id",
            get(api::book_instances::get)
                .put(api::book_instances::update)
                .delete(api::book_instances::delete),
        )
        .with_state(state);

    app.merge(api::openapi::create_openapi_router())
        .layer(TraceLayer::new_for_http())
        .layer(CompressionLayer::new())
        .layer(cors)
}
