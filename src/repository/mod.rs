//! Repository layer: one storage trait per entity.
//!
//! Two backends implement every trait: PostgreSQL (one `*Repository`
//! per module, sharing a pool) and [`memory::MemoryStore`], which keeps
//! everything in process and backs the test-suite and demo mode.

pub mod authors;
pub mod book_instances;
pub mod books;
pub mod genres;
pub mod languages;
pub mod memory;
pub mod users;

use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::{Pool, Postgres};
use uuid::Uuid;

use crate::{
    error::AppResult,
    models::{
        author::{Author, AuthorForm},
        book::{Book, BookForm},
        book_instance::{BookInstance, BookInstanceDetails, BookInstanceForm, LoanStatus},
        genre::Genre,
        language::Language,
        pagination::PageRequest,
        user::{NewUser, User},
    },
};

#[async_trait]
pub trait AuthorStore: Send + Sync {
    async fn count(&self) -> AppResult<i64>;
    /// Page of authors ordered by last then first name, with the total count
    async fn list(&self, page: PageRequest) -> AppResult<(Vec<Author>, i64)>;
    async fn get_by_id(&self, id: i32) -> AppResult<Author>;
    /// Authors among `ids`, in no particular order
    async fn get_many(&self, ids: &[i32]) -> AppResult<Vec<Author>>;
    async fn create(&self, author: &AuthorForm) -> AppResult<Author>;
    async fn update(&self, id: i32, author: &AuthorForm) -> AppResult<Author>;
    async fn delete(&self, id: i32) -> AppResult<()>;
}

#[async_trait]
pub trait BookStore: Send + Sync {
    async fn count(&self) -> AppResult<i64>;
    /// Page of books by id, never reaching past the first `cap` books.
    /// The returned total is clipped to `cap` as well.
    async fn list(&self, cap: i64, page: PageRequest) -> AppResult<(Vec<Book>, i64)>;
    /// Book with its genres loaded
    async fn get_by_id(&self, id: i32) -> AppResult<Book>;
    async fn list_by_author(&self, author_id: i32) -> AppResult<Vec<Book>>;
    async fn count_by_author(&self, author_id: i32) -> AppResult<i64>;
    async fn count_by_language(&self, language_id: i32) -> AppResult<i64>;
    async fn create(&self, book: &BookForm) -> AppResult<Book>;
    async fn update(&self, id: i32, book: &BookForm) -> AppResult<Book>;
    async fn delete(&self, id: i32) -> AppResult<()>;
}

#[async_trait]
pub trait GenreStore: Send + Sync {
    /// All genres ordered by name
    async fn list(&self) -> AppResult<Vec<Genre>>;
    async fn get_many(&self, ids: &[i32]) -> AppResult<Vec<Genre>>;
    async fn create(&self, name: &str) -> AppResult<Genre>;
    /// Delete a genre, detaching it from every book
    async fn delete(&self, id: i32) -> AppResult<()>;
}

#[async_trait]
pub trait LanguageStore: Send + Sync {
    /// All languages ordered by name
    async fn list(&self) -> AppResult<Vec<Language>>;
    async fn get_by_id(&self, id: i32) -> AppResult<Language>;
    async fn create(&self, name: &str) -> AppResult<Language>;
    async fn delete(&self, id: i32) -> AppResult<()>;
}

/// Filters of the copy listing
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InstanceFilter {
    pub status: Option<LoanStatus>,
    pub borrower_id: Option<i32>,
    pub due_back: Option<NaiveDate>,
}

impl InstanceFilter {
    /// Copies currently on loan, optionally to a single borrower
    pub fn on_loan(borrower_id: Option<i32>) -> Self {
        Self {
            status: Some(LoanStatus::OnLoan),
            borrower_id,
            due_back: None,
        }
    }

    pub fn matches(&self, instance: &BookInstance) -> bool {
        self.status.map_or(true, |s| instance.status == s)
            && self.borrower_id.map_or(true, |b| instance.borrower_id == Some(b))
            && self.due_back.map_or(true, |d| instance.due_back == Some(d))
    }
}

#[async_trait]
pub trait BookInstanceStore: Send + Sync {
    async fn count(&self) -> AppResult<i64>;
    async fn count_by_status(&self, status: LoanStatus) -> AppResult<i64>;
    async fn get_by_id(&self, id: Uuid) -> AppResult<BookInstance>;
    async fn get_details(&self, id: Uuid, today: NaiveDate) -> AppResult<BookInstanceDetails>;
    /// Page of copies matching `filter`, ordered by due date ascending
    /// (copies without one last), then id
    async fn list(
        &self,
        filter: InstanceFilter,
        page: PageRequest,
        today: NaiveDate,
    ) -> AppResult<(Vec<BookInstanceDetails>, i64)>;
    async fn list_for_book(&self, book_id: i32) -> AppResult<Vec<BookInstance>>;
    async fn count_by_book(&self, book_id: i32) -> AppResult<i64>;
    async fn count_by_language(&self, language_id: i32) -> AppResult<i64>;
    /// Insert a copy under a fresh random identifier
    async fn create(&self, instance: &BookInstanceForm) -> AppResult<BookInstance>;
    async fn update(&self, id: Uuid, instance: &BookInstanceForm) -> AppResult<BookInstance>;
    /// Set `due_back` on a copy that is on loan. Returns false, changing
    /// nothing, when the copy is not on loan.
    async fn renew(&self, id: Uuid, due_back: NaiveDate) -> AppResult<bool>;
    async fn delete(&self, id: Uuid) -> AppResult<()>;
}

#[async_trait]
pub trait UserStore: Send + Sync {
    async fn get_by_id(&self, id: i32) -> AppResult<User>;
    async fn get_by_username(&self, username: &str) -> AppResult<Option<User>>;
    async fn create(&self, user: &NewUser) -> AppResult<User>;
    async fn groups(&self, user_id: i32) -> AppResult<Vec<String>>;
    /// Codenames granted directly or through a group
    async fn permissions(&self, user_id: i32) -> AppResult<Vec<String>>;
    /// Create the group if missing and grant it the given codenames
    async fn ensure_group(&self, name: &str, permissions: &[&str]) -> AppResult<()>;
    async fn add_to_group(&self, user_id: i32, group: &str) -> AppResult<()>;
    async fn grant_permission(&self, user_id: i32, codename: &str) -> AppResult<()>;
}

/// Main repository struct holding one store per entity
#[derive(Clone)]
pub struct Repository {
    pool: Option<Pool<Postgres>>,
    pub authors: Arc<dyn AuthorStore>,
    pub books: Arc<dyn BookStore>,
    pub genres: Arc<dyn GenreStore>,
    pub languages: Arc<dyn LanguageStore>,
    pub book_instances: Arc<dyn BookInstanceStore>,
    pub users: Arc<dyn UserStore>,
}

impl Repository {
    /// Create a repository over a PostgreSQL pool
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self {
            authors: Arc::new(authors::AuthorsRepository::new(pool.clone())),
            books: Arc::new(books::BooksRepository::new(pool.clone())),
            genres: Arc::new(genres::GenresRepository::new(pool.clone())),
            languages: Arc::new(languages::LanguagesRepository::new(pool.clone())),
            book_instances: Arc::new(book_instances::BookInstancesRepository::new(pool.clone())),
            users: Arc::new(users::UsersRepository::new(pool.clone())),
            pool: Some(pool),
        }
    }

    /// Create a repository keeping everything in process
    pub fn in_memory() -> Self {
        let store = memory::MemoryStore::default();
        Self {
            pool: None,
            authors: Arc::new(store.clone()),
            books: Arc::new(store.clone()),
            genres: Arc::new(store.clone()),
            languages: Arc::new(store.clone()),
            book_instances: Arc::new(store.clone()),
            users: Arc::new(store),
        }
    }

    /// Check the backing database answers
    pub async fn ping(&self) -> AppResult<()> {
        if let Some(pool) = &self.pool {
            sqlx::query("SELECT 1").execute(pool).await?;
        }
        Ok(())
    }
}

/// Maps a unique-constraint violation to a conflict, passing other errors through
pub(crate) fn map_unique_violation(e: sqlx::Error, message: impl FnOnce() -> String) -> crate::error::AppError {
    match &e {
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            crate::error::AppError::Conflict(message())
        }
        _ => e.into(),
    }
}
