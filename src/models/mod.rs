//! Data models for the catalog

pub mod author;
pub mod book;
pub mod book_instance;
pub mod form;
pub mod genre;
pub mod language;
pub mod pagination;
pub mod user;

// Re-export commonly used types
pub use author::{Author, AuthorDetail, AuthorForm, CreateAuthor};
pub use book::{Book, BookDetail, BookForm, BookShort};
pub use book_instance::{BookInstance, BookInstanceDetails, BookInstanceForm, LoanStatus, RenewBookForm};
pub use genre::Genre;
pub use language::Language;
pub use pagination::{PageQuery, PageRequest, PaginatedResponse};
pub use user::{Permission, User, UserClaims};
