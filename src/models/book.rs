//! Book model and related types

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use validator::Validate;

use super::{
    author::Author, book_instance::BookInstance, genre::Genre, language::Language,
};

/// Book listing is capped at this many records regardless of pagination
pub const BOOK_LIST_CAP: i64 = 20;

/// Number of genre names shown in `display_genre`
const DISPLAY_GENRE_COUNT: usize = 3;

/// Full book model from database
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Book {
    pub id: i32,
    pub title: String,
    pub author_id: Option<i32>,
    pub summary: String,
    pub isbn: String,
    pub language_id: Option<i32>,
    // Relations (loaded separately)
    #[sqlx(skip)]
    #[serde(default)]
    pub genres: Vec<Genre>,
}

/// Short book representation for lists
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct BookShort {
    pub id: i32,
    pub title: String,
    pub author_id: Option<i32>,
    /// "Last, First" of the author, when there is one
    pub author_name: Option<String>,
    /// First genre names, comma separated
    pub display_genre: String,
}

impl BookShort {
    pub fn new(book: &Book, author: Option<&Author>) -> Self {
        let names: Vec<&str> = book.genres.iter().map(|g| g.name.as_str()).collect();
        Self {
            id: book.id,
            title: book.title.clone(),
            author_id: book.author_id,
            author_name: author.map(Author::display_name),
            display_genre: display_genre(&names),
        }
    }
}

/// Joins the first few genre names for display
pub fn display_genre<S: AsRef<str>>(names: &[S]) -> String {
    names
        .iter()
        .take(DISPLAY_GENRE_COUNT)
        .map(|n| n.as_ref())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Book with its author, language and copies
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct BookDetail {
    #[serde(flatten)]
    pub book: Book,
    pub author: Option<Author>,
    pub language: Option<Language>,
    pub instances: Vec<BookInstance>,
}

/// Create/update book request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate, ToSchema)]
pub struct BookForm {
    #[serde(default)]
    #[validate(length(min = 1, max = 200, message = "Title must be 1-200 characters"))]
    pub title: String,
    #[serde(default)]
    pub author_id: Option<i32>,
    #[serde(default)]
    #[validate(length(min = 1, max = 1000, message = "Summary must be 1-1000 characters"))]
    pub summary: String,
    #[serde(default)]
    #[validate(length(equal = 13, message = "ISBN must be exactly 13 characters"))]
    pub isbn: String,
    #[serde(default)]
    #[validate(length(min = 1, message = "Select at least one genre"))]
    pub genre_ids: Vec<i32>,
    #[serde(default)]
    pub language_id: Option<i32>,
}

impl BookForm {
    /// Values of the unbound creation form
    pub fn initial() -> Self {
        Self {
            title: String::new(),
            author_id: None,
            summary: String::new(),
            isbn: String::new(),
            genre_ids: Vec::new(),
            language_id: None,
        }
    }
}

impl From<&Book> for BookForm {
    fn from(book: &Book) -> Self {
        Self {
            title: book.title.clone(),
            author_id: book.author_id,
            summary: book.summary.clone(),
            isbn: book.isbn.clone(),
            genre_ids: book.genres.iter().map(|g| g.id).collect(),
            language_id: book.language_id,
        }
    }
}
