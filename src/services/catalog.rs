//! Catalog browsing: home page counts, listings and detail pages,
//! plus genre and language management

use std::collections::HashMap;
use std::sync::Arc;

use serde::Serialize;
use utoipa::ToSchema;
use validator::Validate;

use super::sessions::{SessionStore, VisitCounter};
use crate::{
    error::{AppError, AppResult},
    models::{
        author::{Author, AuthorDetail},
        book::{BookDetail, BookShort, BOOK_LIST_CAP},
        book_instance::LoanStatus,
        genre::{CreateGenre, Genre},
        language::{CreateLanguage, Language},
        pagination::{PageRequest, PaginatedResponse},
    },
    repository::Repository,
};

/// Home page figures
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct IndexStats {
    pub num_books: i64,
    pub num_instances: i64,
    pub num_instances_available: i64,
    pub num_authors: i64,
    /// Home page visits in this session before the current one
    pub num_visits: i64,
}

/// Maintenance page figures
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct MaintenanceStats {
    /// Maintenance page visits in this session, kept apart from the home page count
    pub num_visits_2: i64,
}

#[derive(Clone)]
pub struct CatalogService {
    repository: Repository,
    sessions: Arc<dyn SessionStore>,
}

impl CatalogService {
    pub fn new(repository: Repository, sessions: Arc<dyn SessionStore>) -> Self {
        Self {
            repository,
            sessions,
        }
    }

    /// Catalog-wide counts and the session's home page counter
    pub async fn index(&self, session_id: &str) -> AppResult<IndexStats> {
        let num_visits = self
            .sessions
            .next_visit(session_id, VisitCounter::Index)
            .await?;

        Ok(IndexStats {
            num_books: self.repository.books.count().await?,
            num_instances: self.repository.book_instances.count().await?,
            num_instances_available: self
                .repository
                .book_instances
                .count_by_status(LoanStatus::Available)
                .await?,
            num_authors: self.repository.authors.count().await?,
            num_visits,
        })
    }

    pub async fn maintenance(&self, session_id: &str) -> AppResult<MaintenanceStats> {
        let num_visits_2 = self
            .sessions
            .next_visit(session_id, VisitCounter::Maintenance)
            .await?;
        Ok(MaintenanceStats { num_visits_2 })
    }

    /// First books by id, never more than the listing cap
    pub async fn list_books(&self, page: PageRequest) -> AppResult<PaginatedResponse<BookShort>> {
        let (books, total) = self.repository.books.list(BOOK_LIST_CAP, page).await?;

        let mut author_ids: Vec<i32> = books.iter().filter_map(|b| b.author_id).collect();
        author_ids.sort_unstable();
        author_ids.dedup();
        let authors: HashMap<i32, Author> = self
            .repository
            .authors
            .get_many(&author_ids)
            .await?
            .into_iter()
            .map(|a| (a.id, a))
            .collect();

        let items = books
            .iter()
            .map(|b| BookShort::new(b, b.author_id.and_then(|id| authors.get(&id))))
            .collect();
        PaginatedResponse::new(items, total, page)
    }

    pub async fn get_book(&self, id: i32) -> AppResult<BookDetail> {
        let book = self.repository.books.get_by_id(id).await?;
        let author = match book.author_id {
            Some(author_id) => Some(self.repository.authors.get_by_id(author_id).await?),
            None => None,
        };
        let language = match book.language_id {
            Some(language_id) => Some(self.repository.languages.get_by_id(language_id).await?),
            None => None,
        };
        let instances = self.repository.book_instances.list_for_book(id).await?;

        Ok(BookDetail {
            book,
            author,
            language,
            instances,
        })
    }

    pub async fn list_authors(&self, page: PageRequest) -> AppResult<PaginatedResponse<Author>> {
        let (authors, total) = self.repository.authors.list(page).await?;
        PaginatedResponse::new(authors, total, page)
    }

    pub async fn get_author(&self, id: i32) -> AppResult<AuthorDetail> {
        let author = self.repository.authors.get_by_id(id).await?;
        let books = self
            .repository
            .books
            .list_by_author(id)
            .await?
            .iter()
            .map(|b| BookShort::new(b, Some(&author)))
            .collect();
        Ok(AuthorDetail { author, books })
    }

    pub async fn list_genres(&self) -> AppResult<Vec<Genre>> {
        self.repository.genres.list().await
    }

    pub async fn create_genre(&self, genre: CreateGenre) -> AppResult<Genre> {
        genre
            .validate()
            .map_err(|e| AppError::Validation(e.to_string()))?;
        let created = self.repository.genres.create(genre.name.trim()).await?;
        tracing::info!(id = created.id, name = %created.name, "genre created");
        Ok(created)
    }

    /// Delete a genre; books keep their other genres
    pub async fn delete_genre(&self, id: i32) -> AppResult<()> {
        self.repository.genres.delete(id).await?;
        tracing::info!(id, "genre deleted");
        Ok(())
    }

    pub async fn list_languages(&self) -> AppResult<Vec<Language>> {
        self.repository.languages.list().await
    }

    pub async fn create_language(&self, language: CreateLanguage) -> AppResult<Language> {
        language
            .validate()
            .map_err(|e| AppError::Validation(e.to_string()))?;
        let created = self.repository.languages.create(language.name.trim()).await?;
        tracing::info!(id = created.id, name = %created.name, "language created");
        Ok(created)
    }

    /// Delete a language nobody references
    pub async fn delete_language(&self, id: i32) -> AppResult<()> {
        self.repository.languages.get_by_id(id).await?;
        let in_use = self.repository.books.count_by_language(id).await?
            + self.repository.book_instances.count_by_language(id).await?;
        if in_use > 0 {
            return Err(AppError::HasDependents(format!(
                "Language {} is used by {} books or copies",
                id, in_use
            )));
        }
        self.repository.languages.delete(id).await?;
        tracing::info!(id, "language deleted");
        Ok(())
    }
}
