//! Genres repository

use async_trait::async_trait;
use sqlx::{Pool, Postgres};

use super::{map_unique_violation, GenreStore};
use crate::{
    error::{AppError, AppResult},
    models::genre::Genre,
};

#[derive(Clone)]
pub struct GenresRepository {
    pool: Pool<Postgres>,
}

impl GenresRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl GenreStore for GenresRepository {
    async fn list(&self) -> AppResult<Vec<Genre>> {
        let genres = sqlx::query_as::<_, Genre>("SELECT id, name FROM genres ORDER BY name, id")
            .fetch_all(&self.pool)
            .await?;
        Ok(genres)
    }

    async fn get_many(&self, ids: &[i32]) -> AppResult<Vec<Genre>> {
        let genres = sqlx::query_as::<_, Genre>(
            "SELECT id, name FROM genres WHERE id = ANY($1) ORDER BY name, id",
        )
        .bind(ids)
        .fetch_all(&self.pool)
        .await?;
        Ok(genres)
    }

    async fn create(&self, name: &str) -> AppResult<Genre> {
        sqlx::query_as::<_, Genre>("INSERT INTO genres (name) VALUES ($1) RETURNING id, name")
            .bind(name)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| map_unique_violation(e, || format!("Genre '{}' already exists", name)))
    }

    async fn delete(&self, id: i32) -> AppResult<()> {
        // book_genres rows go with the genre (ON DELETE CASCADE)
        let result = sqlx::query("DELETE FROM genres WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Genre with id {} not found", id)));
        }
        Ok(())
    }
}
