//! Books repository for database operations

use std::collections::HashMap;

use async_trait::async_trait;
use sqlx::{Pool, Postgres, Row, Transaction};

use super::BookStore;
use crate::{
    error::{AppError, AppResult},
    models::{
        book::{Book, BookForm},
        genre::Genre,
        pagination::PageRequest,
    },
};

const BOOK_COLUMNS: &str = "id, title, author_id, summary, isbn, language_id";

fn map_reference_error(e: sqlx::Error) -> AppError {
    match &e {
        sqlx::Error::Database(db) if db.is_foreign_key_violation() => {
            AppError::Validation("Author, language or genre does not exist".to_string())
        }
        _ => e.into(),
    }
}

#[derive(Clone)]
pub struct BooksRepository {
    pool: Pool<Postgres>,
}

impl BooksRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Load genres (ordered by name) for each book via the book_genres junction table
    async fn attach_genres(&self, books: &mut [Book]) -> AppResult<()> {
        if books.is_empty() {
            return Ok(());
        }
        let ids: Vec<i32> = books.iter().map(|b| b.id).collect();

        let rows = sqlx::query(
            r#"
            SELECT bg.book_id, g.id, g.name
            FROM book_genres bg
            JOIN genres g ON g.id = bg.genre_id
            WHERE bg.book_id = ANY($1)
            ORDER BY g.name, g.id
            "#,
        )
        .bind(&ids)
        .fetch_all(&self.pool)
        .await?;

        let mut by_book: HashMap<i32, Vec<Genre>> = HashMap::new();
        for row in rows {
            by_book.entry(row.get("book_id")).or_default().push(Genre {
                id: row.get("id"),
                name: row.get("name"),
            });
        }
        for book in books.iter_mut() {
            book.genres = by_book.remove(&book.id).unwrap_or_default();
        }
        Ok(())
    }

    async fn replace_genres(
        tx: &mut Transaction<'_, Postgres>,
        book_id: i32,
        genre_ids: &[i32],
    ) -> Result<(), sqlx::Error> {
        sqlx::query("DELETE FROM book_genres WHERE book_id = $1")
            .bind(book_id)
            .execute(&mut **tx)
            .await?;

        sqlx::query(
            r#"
            INSERT INTO book_genres (book_id, genre_id)
            SELECT $1, UNNEST($2::int[])
            ON CONFLICT DO NOTHING
            "#,
        )
        .bind(book_id)
        .bind(genre_ids)
        .execute(&mut **tx)
        .await?;
        Ok(())
    }

    async fn count_where(&self, column: &str, id: i32) -> AppResult<i64> {
        let count: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM books WHERE {} = $1", column))
            .bind(id)
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}

#[async_trait]
impl BookStore for BooksRepository {
    async fn count(&self) -> AppResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM books")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    async fn list(&self, cap: i64, page: PageRequest) -> AppResult<(Vec<Book>, i64)> {
        let (offset, limit) = page.window(Some(cap));

        let mut books = sqlx::query_as::<_, Book>(&format!(
            "SELECT {} FROM books ORDER BY id LIMIT $1 OFFSET $2",
            BOOK_COLUMNS
        ))
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;
        self.attach_genres(&mut books).await?;

        let total = self.count().await?.min(cap);
        Ok((books, total))
    }

    async fn get_by_id(&self, id: i32) -> AppResult<Book> {
        let book = sqlx::query_as::<_, Book>(&format!("SELECT {} FROM books WHERE id = $1", BOOK_COLUMNS))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Book with id {} not found", id)))?;

        let mut books = [book];
        self.attach_genres(&mut books).await?;
        let [book] = books;
        Ok(book)
    }

    async fn list_by_author(&self, author_id: i32) -> AppResult<Vec<Book>> {
        let mut books = sqlx::query_as::<_, Book>(&format!(
            "SELECT {} FROM books WHERE author_id = $1 ORDER BY title, id",
            BOOK_COLUMNS
        ))
        .bind(author_id)
        .fetch_all(&self.pool)
        .await?;
        self.attach_genres(&mut books).await?;
        Ok(books)
    }

    async fn count_by_author(&self, author_id: i32) -> AppResult<i64> {
        self.count_where("author_id", author_id).await
    }

    async fn count_by_language(&self, language_id: i32) -> AppResult<i64> {
        self.count_where("language_id", language_id).await
    }

    async fn create(&self, book: &BookForm) -> AppResult<Book> {
        let mut tx = self.pool.begin().await?;

        let id: i32 = sqlx::query_scalar(
            r#"
            INSERT INTO books (title, author_id, summary, isbn, language_id)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id
            "#,
        )
        .bind(&book.title)
        .bind(book.author_id)
        .bind(&book.summary)
        .bind(&book.isbn)
        .bind(book.language_id)
        .fetch_one(&mut *tx)
        .await
        .map_err(map_reference_error)?;

        Self::replace_genres(&mut tx, id, &book.genre_ids)
            .await
            .map_err(map_reference_error)?;
        tx.commit().await?;

        self.get_by_id(id).await
    }

    async fn update(&self, id: i32, book: &BookForm) -> AppResult<Book> {
        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            r#"
            UPDATE books
            SET title = $1, author_id = $2, summary = $3, isbn = $4, language_id = $5
            WHERE id = $6
            "#,
        )
        .bind(&book.title)
        .bind(book.author_id)
        .bind(&book.summary)
        .bind(&book.isbn)
        .bind(book.language_id)
        .bind(id)
        .execute(&mut *tx)
        .await
        .map_err(map_reference_error)?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Book with id {} not found", id)));
        }

        Self::replace_genres(&mut tx, id, &book.genre_ids)
            .await
            .map_err(map_reference_error)?;
        tx.commit().await?;

        self.get_by_id(id).await
    }

    async fn delete(&self, id: i32) -> AppResult<()> {
        let result = sqlx::query("DELETE FROM books WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| match &e {
                sqlx::Error::Database(db) if db.is_foreign_key_violation() => {
                    AppError::HasDependents(format!("Book {} still has copies", id))
                }
                _ => e.into(),
            })?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Book with id {} not found", id)));
        }
        Ok(())
    }
}
