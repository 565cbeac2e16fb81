//! Business logic services

pub mod authors;
pub mod books;
pub mod catalog;
pub mod loans;
pub mod redis;
pub mod sessions;
pub mod users;

use std::sync::Arc;

use crate::{config::AuthConfig, error::AppResult, repository::Repository};

/// Container for all services
#[derive(Clone)]
pub struct Services {
    pub catalog: catalog::CatalogService,
    pub authors: authors::AuthorsService,
    pub books: books::BooksService,
    pub loans: loans::LoansService,
    pub users: users::UsersService,
    pub sessions: Arc<dyn sessions::SessionStore>,
    repository: Repository,
}

impl Services {
    /// Create all services over the given repository and session store
    pub fn new(
        repository: Repository,
        auth_config: AuthConfig,
        sessions: Arc<dyn sessions::SessionStore>,
    ) -> Self {
        Self {
            catalog: catalog::CatalogService::new(repository.clone(), sessions.clone()),
            authors: authors::AuthorsService::new(repository.clone()),
            books: books::BooksService::new(repository.clone()),
            loans: loans::LoansService::new(repository.clone()),
            users: users::UsersService::new(repository.clone(), auth_config),
            sessions,
            repository,
        }
    }

    /// Check the storage backend is reachable
    pub async fn ready(&self) -> AppResult<()> {
        self.repository.ping().await
    }
}
