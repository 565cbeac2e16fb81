//! Book instances (copies) repository

use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::{postgres::PgRow, Pool, Postgres, Row};
use uuid::Uuid;

use super::{BookInstanceStore, InstanceFilter};
use crate::{
    error::{AppError, AppResult},
    models::{
        book_instance::{BookInstance, BookInstanceDetails, BookInstanceForm, LoanStatus},
        pagination::PageRequest,
    },
};

const INSTANCE_COLUMNS: &str = "id, book_id, imprint, due_back, borrower_id, language_id, status";

const DETAILS_SELECT: &str = r#"
    SELECT bi.id, bi.book_id, b.title AS book_title, bi.imprint, bi.due_back,
           bi.borrower_id, u.username AS borrower_username, bi.language_id, bi.status
    FROM book_instances bi
    JOIN books b ON b.id = bi.book_id
    LEFT JOIN users u ON u.id = bi.borrower_id
"#;

// $1 status, $2 borrower, $3 due date; NULL disables a condition
const FILTER_CLAUSE: &str = r#"
    WHERE ($1::varchar IS NULL OR bi.status = $1)
      AND ($2::int IS NULL OR bi.borrower_id = $2)
      AND ($3::date IS NULL OR bi.due_back = $3)
"#;

fn details_from_row(row: &PgRow, today: NaiveDate) -> BookInstanceDetails {
    let due_back: Option<NaiveDate> = row.get("due_back");
    BookInstanceDetails {
        id: row.get("id"),
        book_id: row.get("book_id"),
        book_title: row.get("book_title"),
        imprint: row.get("imprint"),
        due_back,
        borrower_id: row.get("borrower_id"),
        borrower_username: row.get("borrower_username"),
        language_id: row.get("language_id"),
        status: row.get("status"),
        is_overdue: due_back.map(|d| d < today).unwrap_or(false),
    }
}

fn map_write_error(e: sqlx::Error) -> AppError {
    match &e {
        sqlx::Error::Database(db) if db.is_foreign_key_violation() => AppError::Validation(
            "Book, borrower or language does not exist".to_string(),
        ),
        sqlx::Error::Database(db) if db.is_check_violation() => AppError::Validation(
            "Due date and borrower do not match the copy status".to_string(),
        ),
        _ => e.into(),
    }
}

#[derive(Clone)]
pub struct BookInstancesRepository {
    pool: Pool<Postgres>,
}

impl BookInstancesRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    async fn count_where(&self, column: &str, id: i32) -> AppResult<i64> {
        let count: i64 = sqlx::query_scalar(&format!(
            "SELECT COUNT(*) FROM book_instances WHERE {} = $1",
            column
        ))
        .bind(id)
        .fetch_one(&self.pool)
        .await?;
        Ok(count)
    }
}

#[async_trait]
impl BookInstanceStore for BookInstancesRepository {
    async fn count(&self) -> AppResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM book_instances")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    async fn count_by_status(&self, status: LoanStatus) -> AppResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM book_instances WHERE status = $1")
            .bind(status)
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    async fn get_by_id(&self, id: Uuid) -> AppResult<BookInstance> {
        sqlx::query_as::<_, BookInstance>(&format!(
            "SELECT {} FROM book_instances WHERE id = $1",
            INSTANCE_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Book instance {} not found", id)))
    }

    async fn get_details(&self, id: Uuid, today: NaiveDate) -> AppResult<BookInstanceDetails> {
        let row = sqlx::query(&format!("{} WHERE bi.id = $1", DETAILS_SELECT))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Book instance {} not found", id)))?;
        Ok(details_from_row(&row, today))
    }

    async fn list(
        &self,
        filter: InstanceFilter,
        page: PageRequest,
        today: NaiveDate,
    ) -> AppResult<(Vec<BookInstanceDetails>, i64)> {
        let (offset, limit) = page.window(None);

        let rows = sqlx::query(&format!(
            "{} {} ORDER BY bi.due_back ASC NULLS LAST, bi.id LIMIT $4 OFFSET $5",
            DETAILS_SELECT, FILTER_CLAUSE
        ))
        .bind(filter.status)
        .bind(filter.borrower_id)
        .bind(filter.due_back)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        let total: i64 = sqlx::query_scalar(&format!(
            "SELECT COUNT(*) FROM book_instances bi {}",
            FILTER_CLAUSE
        ))
        .bind(filter.status)
        .bind(filter.borrower_id)
        .bind(filter.due_back)
        .fetch_one(&self.pool)
        .await?;

        let items = rows.iter().map(|row| details_from_row(row, today)).collect();
        Ok((items, total))
    }

    async fn list_for_book(&self, book_id: i32) -> AppResult<Vec<BookInstance>> {
        let instances = sqlx::query_as::<_, BookInstance>(&format!(
            "SELECT {} FROM book_instances WHERE book_id = $1 ORDER BY due_back NULLS LAST, id",
            INSTANCE_COLUMNS
        ))
        .bind(book_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(instances)
    }

    async fn count_by_book(&self, book_id: i32) -> AppResult<i64> {
        self.count_where("book_id", book_id).await
    }

    async fn count_by_language(&self, language_id: i32) -> AppResult<i64> {
        self.count_where("language_id", language_id).await
    }

    async fn create(&self, instance: &BookInstanceForm) -> AppResult<BookInstance> {
        sqlx::query_as::<_, BookInstance>(&format!(
            r#"
            INSERT INTO book_instances (id, book_id, imprint, due_back, borrower_id, language_id, status)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING {}
            "#,
            INSTANCE_COLUMNS
        ))
        .bind(Uuid::new_v4())
        .bind(instance.book_id)
        .bind(&instance.imprint)
        .bind(instance.due_back)
        .bind(instance.borrower_id)
        .bind(instance.language_id)
        .bind(instance.status)
        .fetch_one(&self.pool)
        .await
        .map_err(map_write_error)
    }

    async fn update(&self, id: Uuid, instance: &BookInstanceForm) -> AppResult<BookInstance> {
        sqlx::query_as::<_, BookInstance>(&format!(
            r#"
            UPDATE book_instances
            SET book_id = $1, imprint = $2, due_back = $3, borrower_id = $4,
                language_id = $5, status = $6
            WHERE id = $7
            RETURNING {}
            "#,
            INSTANCE_COLUMNS
        ))
        .bind(instance.book_id)
        .bind(&instance.imprint)
        .bind(instance.due_back)
        .bind(instance.borrower_id)
        .bind(instance.language_id)
        .bind(instance.status)
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_write_error)?
        .ok_or_else(|| AppError::NotFound(format!("Book instance {} not found", id)))
    }

    async fn renew(&self, id: Uuid, due_back: NaiveDate) -> AppResult<bool> {
        // Single statement: the status check and the write cannot interleave
        let result = sqlx::query(
            "UPDATE book_instances SET due_back = $1 WHERE id = $2 AND status = $3",
        )
        .bind(due_back)
        .bind(id)
        .bind(LoanStatus::OnLoan)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn delete(&self, id: Uuid) -> AppResult<()> {
        let result = sqlx::query("DELETE FROM book_instances WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Book instance {} not found", id)));
        }
        Ok(())
    }
}
