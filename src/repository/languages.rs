//! Languages repository

use async_trait::async_trait;
use sqlx::{Pool, Postgres};

use super::{map_unique_violation, LanguageStore};
use crate::{
    error::{AppError, AppResult},
    models::language::Language,
};

#[derive(Clone)]
pub struct LanguagesRepository {
    pool: Pool<Postgres>,
}

impl LanguagesRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl LanguageStore for LanguagesRepository {
    async fn list(&self) -> AppResult<Vec<Language>> {
        let languages =
            sqlx::query_as::<_, Language>("SELECT id, name FROM languages ORDER BY name, id")
                .fetch_all(&self.pool)
                .await?;
        Ok(languages)
    }

    async fn get_by_id(&self, id: i32) -> AppResult<Language> {
        sqlx::query_as::<_, Language>("SELECT id, name FROM languages WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Language with id {} not found", id)))
    }

    async fn create(&self, name: &str) -> AppResult<Language> {
        sqlx::query_as::<_, Language>("INSERT INTO languages (name) VALUES ($1) RETURNING id, name")
            .bind(name)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| map_unique_violation(e, || format!("Language '{}' already exists", name)))
    }

    async fn delete(&self, id: i32) -> AppResult<()> {
        let result = sqlx::query("DELETE FROM languages WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| match &e {
                sqlx::Error::Database(db) if db.is_foreign_key_violation() => {
                    AppError::HasDependents(format!("Language {} is still in use", id))
                }
                _ => e.into(),
            })?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Language with id {} not found", id)));
        }
        Ok(())
    }
}
